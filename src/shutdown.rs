use anyhow::{anyhow, Result};
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::cancellation::CancelToken;
use crate::single_flight::SingleFlight;

/// Graceful shutdown coordinator for flightstage
///
/// Owns the cancel token handed to long-running work and drains
/// single-flight gates before the process exits.
pub struct ShutdownCoordinator {
    token: CancelToken,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            token: CancelToken::new(),
        }
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Cancel the token on Ctrl-C
    pub fn install_signal_handlers(&self) -> Result<()> {
        let runtime = Handle::try_current()
            .map_err(|_| anyhow!("Signal handlers need a running tokio runtime"))?;
        info!("Installing signal handlers for graceful shutdown");

        let token = self.token.clone();
        runtime.spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl-C, stopping at the next safe point");
                    token.cancel();
                }
                Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
            }
        });
        Ok(())
    }

    /// Wait for every in-flight computation of `gate` to hand over its result.
    pub async fn drain<K, A>(gate: &SingleFlight<K, A>, timeout: Duration) -> Result<()>
    where
        K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
        A: Clone + Send + Sync + 'static,
    {
        let pending = gate.in_flight();
        if pending > 0 {
            info!(gate = gate.name(), pending, "Draining in-flight computations...");
        }

        gate.wait_idle(timeout)
            .await
            .map_err(|e| anyhow!("Gate '{}' did not drain: {}", gate.name(), e))?;

        info!(gate = gate.name(), "Gate drained");
        Ok(())
    }
}
