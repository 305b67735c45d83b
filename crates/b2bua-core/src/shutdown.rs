//! Graceful process shutdown
//!
//! Hangs up every live call and gives the engine a bounded amount of time to
//! report the legs as terminated.

use std::time::Duration;

use tracing::{info, warn};

use crate::manager::CallManager;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Outcome of [`shutdown_gracefully`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Calls asked to hang up
    pub signalled: usize,
    /// Calls still registered when the grace period ran out
    pub abandoned: usize,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.abandoned == 0
    }
}

/// Disconnect every call, then wait up to `grace` for the registry to drain.
pub async fn shutdown_gracefully(manager: &CallManager, grace: Duration) -> ShutdownReport {
    let signalled = manager.shutdown();

    let drained = tokio::time::timeout(grace, async {
        while manager.active_calls() > 0 {
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    })
    .await
    .is_ok();

    let abandoned = if drained { 0 } else { manager.active_calls() };
    if abandoned > 0 {
        warn!("Grace period of {:?} elapsed with {} call(s) still active", grace, abandoned);
    } else {
        info!("All {} call(s) cleared", signalled);
    }

    ShutdownReport {
        signalled,
        abandoned,
    }
}

/// Resolves once the process is asked to stop (SIGINT or SIGTERM).
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received");
    Ok(())
}
