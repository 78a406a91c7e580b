use crate::config::{Credentials, MonitorConfig};
use crate::source::{OutletReading, SourceError, TelemetrySource};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const SERVICE_ROOT_PATH: &str = "/redfish/v1";
const OUTLETS_PATH: &str = "/redfish/v1/PowerEquipment/RackPDUs/1/Outlets";

#[derive(Deserialize)]
struct ServiceRoot {
    #[serde(rename = "RedfishVersion", default)]
    redfish_version: Option<String>,
}

#[derive(Deserialize)]
struct OutletCollection {
    #[serde(rename = "Members@odata.count", default)]
    member_count: Option<u64>,
}

#[derive(Deserialize)]
struct OutletResource {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "PowerWatts", default)]
    power_watts: Option<SensorReading>,
}

#[derive(Deserialize)]
struct SensorReading {
    #[serde(rename = "Reading", default)]
    reading: Option<f64>,
}

pub struct RedfishClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
}

impl RedfishClient {
    pub async fn connect(config: &MonitorConfig) -> Result<Self> {
        Self::connect_to(
            config.base_url(),
            config.credentials.clone(),
            config.verify_tls,
            config.probe_timeout(),
        )
        .await
    }

    /// Verifies the service root and the PDU outlet collection are reachable
    /// with the given credentials before handing back a client.
    pub async fn connect_to(
        base_url: impl Into<String>,
        credentials: Credentials,
        verify_tls: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .context("failed to build Redfish HTTP client")?;
        let client = Self {
            http,
            base_url,
            credentials,
        };

        let root_url = client.url(SERVICE_ROOT_PATH);
        let root: ServiceRoot = client
            .get_json(&root_url, timeout)
            .await
            .with_context(|| format!("Redfish service root unavailable at {root_url}"))?;

        let outlets_url = client.url(OUTLETS_PATH);
        let outlets: OutletCollection = client
            .get_json(&outlets_url, timeout)
            .await
            .with_context(|| format!("PDU outlet collection unavailable at {outlets_url}"))?;

        tracing::info!(
            base_url = %client.base_url,
            redfish_version = root.redfish_version.as_deref().unwrap_or("unknown"),
            outlets = outlets.member_count.unwrap_or(0),
            "connected to Redfish service"
        );
        Ok(client)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn outlet_url(&self, outlet: &str) -> String {
        format!("{}{}/{}", self.base_url, OUTLETS_PATH, outlet.trim())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<T, SourceError> {
        let exchange = async {
            let response = self
                .http
                .get(url)
                .basic_auth(&self.credentials.username, Some(&self.credentials.password))
                .send()
                .await
                .map_err(|source| SourceError::Transport {
                    url: url.to_string(),
                    source,
                })?;
            let status = response.status();
            if !status.is_success() {
                return Err(SourceError::Status {
                    url: url.to_string(),
                    status,
                });
            }
            response
                .json::<T>()
                .await
                .map_err(|source| SourceError::Decode {
                    url: url.to_string(),
                    source,
                })
        };
        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| SourceError::Timeout(timeout))?
    }
}

impl TelemetrySource for RedfishClient {
    async fn read_outlet(
        &self,
        outlet: &str,
        timeout: Duration,
    ) -> Result<OutletReading, SourceError> {
        let url = self.outlet_url(outlet);
        let resource: OutletResource = self.get_json(&url, timeout).await?;
        outlet_reading(outlet, resource)
    }

    fn close(self) {
        tracing::debug!(base_url = %self.base_url, "closing Redfish connection");
    }
}

fn outlet_reading(requested: &str, resource: OutletResource) -> Result<OutletReading, SourceError> {
    let requested = requested.trim();
    if resource.id.trim() != requested {
        return Err(SourceError::OutletMismatch {
            requested: requested.to_string(),
            reported: resource.id,
        });
    }
    let power_watts = resource
        .power_watts
        .and_then(|sensor| sensor.reading)
        .ok_or_else(|| SourceError::MissingReading {
            outlet: requested.to_string(),
        })?;
    Ok(OutletReading {
        outlet_id: resource.id,
        power_watts,
    })
}
