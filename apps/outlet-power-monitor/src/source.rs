use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct OutletReading {
    pub outlet_id: String,
    pub power_watts: f64,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("outlet {outlet} reported no power reading")]
    MissingReading { outlet: String },

    #[error("requested outlet {requested} but device reported outlet {reported}")]
    OutletMismatch { requested: String, reported: String },
}

/// Something that can read the present power draw of one outlet.
///
/// Implementations must give up after `timeout` and return
/// [`SourceError::Timeout`]; the sampler relies on this to bound how long a
/// stop request can go unnoticed.
pub trait TelemetrySource {
    fn read_outlet(
        &self,
        outlet: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<OutletReading, SourceError>> + Send;

    /// Releases the connection. Called once, after sampling has finished.
    fn close(self)
    where
        Self: Sized,
    {
    }
}
