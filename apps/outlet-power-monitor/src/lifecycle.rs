use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopTrigger {
    /// SIGTERM, e.g. `kill <pid>`.
    Terminate,
    /// SIGINT / Ctrl-C from the operator.
    Interrupt,
}

impl StopTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopTrigger::Terminate => "terminate",
            StopTrigger::Interrupt => "interrupt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Stopping,
    Stopped,
}

#[derive(Debug, Default)]
struct Shared {
    trigger: OnceLock<StopTrigger>,
    stopped: AtomicBool,
}

/// Cloneable side of the lifecycle used by whoever asks the run to stop.
#[derive(Debug, Clone)]
pub struct StopHandle {
    cancel: CancellationToken,
    shared: Arc<Shared>,
}

impl StopHandle {
    /// Sets the run's single stop flag. Only the first trigger is recorded.
    pub fn request_stop(&self, trigger: StopTrigger) {
        if self.shared.trigger.set(trigger).is_ok() {
            tracing::info!(trigger = trigger.as_str(), "stop requested");
        }
        self.cancel.cancel();
    }

    pub fn phase(&self) -> Phase {
        if self.shared.stopped.load(Ordering::SeqCst) {
            Phase::Stopped
        } else if self.cancel.is_cancelled() {
            Phase::Stopping
        } else {
            Phase::Running
        }
    }
}

#[derive(Debug, Clone)]
pub struct Finalized {
    pub end_mark: Instant,
    pub end_ts: DateTime<Utc>,
    pub trigger: Option<StopTrigger>,
}

/// Owns the run's cancellation flag. Consumed by [`Lifecycle::finalize`], so a
/// run can only be finalized once.
#[derive(Debug)]
pub struct Lifecycle {
    stop: StopHandle,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            stop: StopHandle {
                cancel: CancellationToken::new(),
                shared: Arc::new(Shared::default()),
            },
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.stop.cancel
    }

    pub fn phase(&self) -> Phase {
        self.stop.phase()
    }

    /// Routes SIGTERM and SIGINT into [`StopHandle::request_stop`].
    pub fn spawn_signal_listener(&self) -> JoinHandle<()> {
        let stop = self.stop_handle();
        tokio::spawn(async move {
            let trigger = wait_for_signal().await;
            stop.request_stop(trigger);
        })
    }

    pub fn finalize(self) -> Finalized {
        let end_mark = Instant::now();
        let end_ts = Utc::now();
        self.stop.shared.stopped.store(true, Ordering::SeqCst);
        let trigger = self.stop.shared.trigger.get().copied();
        tracing::debug!(
            trigger = trigger.map(|t| t.as_str()).unwrap_or("none"),
            "sampling finalized"
        );
        Finalized {
            end_mark,
            end_ts,
            trigger,
        }
    }
}

async fn wait_for_signal() -> StopTrigger {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => StopTrigger::Interrupt,
        _ = terminate => StopTrigger::Terminate,
    }
}
