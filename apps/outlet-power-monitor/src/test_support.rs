//! Test doubles: a scripted telemetry source and an in-process Redfish PDU.

use crate::config::{Credentials, MonitorConfig, RunConfig, Scheme};
use crate::lifecycle::{StopHandle, StopTrigger};
use crate::source::{OutletReading, SourceError, TelemetrySource};
use axum::extract::{self, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_USER: &str = "labuser";
pub const TEST_PASSWORD: &str = "100Yard-";
// base64("labuser:100Yard-")
const EXPECTED_AUTHORIZATION: &str = "Basic bGFidXNlcjoxMDBZYXJkLQ==";

pub fn monitor_config(output_dir: &Path, interval_secs: u64) -> MonitorConfig {
    MonitorConfig {
        run: RunConfig::new("10.27.242.2", interval_secs, "3"),
        credentials: Credentials {
            username: TEST_USER.to_string(),
            password: TEST_PASSWORD.to_string(),
        },
        scheme: Scheme::Http,
        verify_tls: false,
        probe_timeout_secs: 10,
        output_dir: output_dir.to_path_buf(),
    }
}

pub enum Step {
    /// Report `watts` after `latency`.
    Read(f64, Duration),
    /// Fail after `latency`.
    Fail(Duration),
}

/// Plays back a fixed list of probe outcomes, sleeping on the tokio clock so
/// paused-time tests control probe durations exactly.
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    stop_when_exhausted: Option<StopHandle>,
    closed: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            stop_when_exhausted: None,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Requests a stop as soon as the last scripted step is handed out.
    pub fn stop_when_exhausted(mut self, stop: StopHandle) -> Self {
        self.stop_when_exhausted = Some(stop);
        self
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }
}

impl TelemetrySource for ScriptedSource {
    async fn read_outlet(
        &self,
        outlet: &str,
        _timeout: Duration,
    ) -> Result<OutletReading, SourceError> {
        let (step, exhausted) = {
            let mut steps = self.steps.lock().expect("script lock");
            let step = steps.pop_front().expect("script exhausted");
            (step, steps.is_empty())
        };
        if exhausted {
            if let Some(stop) = self.stop_when_exhausted.as_ref() {
                stop.request_stop(StopTrigger::Interrupt);
            }
        }
        match step {
            Step::Read(power_watts, latency) => {
                tokio::time::sleep(latency).await;
                Ok(OutletReading {
                    outlet_id: outlet.to_string(),
                    power_watts,
                })
            }
            Step::Fail(latency) => {
                tokio::time::sleep(latency).await;
                Err(SourceError::Timeout(latency))
            }
        }
    }

    fn close(self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct FakePdu {
    outlets: HashMap<String, f64>,
    outlet_delay: Duration,
    stop_after: Option<(u64, StopHandle)>,
    outlet_requests: Arc<AtomicU64>,
}

impl FakePdu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outlet(mut self, id: &str, power_watts: f64) -> Self {
        self.outlets.insert(id.to_string(), power_watts);
        self
    }

    pub fn with_outlet_delay(mut self, delay: Duration) -> Self {
        self.outlet_delay = delay;
        self
    }

    /// Requests a stop while answering the `requests`-th outlet read.
    pub fn stop_after(mut self, requests: u64, stop: StopHandle) -> Self {
        self.stop_after = Some((requests, stop));
        self
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value == EXPECTED_AUTHORIZATION)
        .unwrap_or(false)
}

async fn service_root(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "@odata.id": "/redfish/v1",
        "Id": "RootService",
        "RedfishVersion": "1.15.0",
    }))
    .into_response()
}

async fn outlet_collection(State(pdu): State<FakePdu>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let members: Vec<_> = pdu
        .outlets
        .keys()
        .map(|id| json!({"@odata.id": format!("/redfish/v1/PowerEquipment/RackPDUs/1/Outlets/{id}")}))
        .collect();
    Json(json!({
        "Members@odata.count": members.len(),
        "Members": members,
    }))
    .into_response()
}

async fn outlet(
    State(pdu): State<FakePdu>,
    extract::Path(id): extract::Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let served = pdu.outlet_requests.fetch_add(1, Ordering::SeqCst) + 1;
    if !pdu.outlet_delay.is_zero() {
        tokio::time::sleep(pdu.outlet_delay).await;
    }
    if let Some((limit, stop)) = pdu.stop_after.as_ref() {
        if served >= *limit {
            stop.request_stop(StopTrigger::Terminate);
        }
    }
    match pdu.outlets.get(&id) {
        Some(power) => Json(json!({
            "Id": id,
            "Name": format!("Outlet {id}"),
            "PowerWatts": {"Reading": power},
        }))
        .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serves `pdu` on an ephemeral loopback port and returns its base URL.
pub async fn spawn_fake_pdu(pdu: FakePdu) -> String {
    let app = Router::new()
        .route("/redfish/v1", get(service_root))
        .route(
            "/redfish/v1/PowerEquipment/RackPDUs/1/Outlets",
            get(outlet_collection),
        )
        .route(
            "/redfish/v1/PowerEquipment/RackPDUs/1/Outlets/{id}",
            get(outlet),
        )
        .with_state(pdu);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake PDU");
    let addr = listener.local_addr().expect("fake PDU address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}")
}
