use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Cooperative cancellation flag shared between an orchestrator and the
/// long-running work it drives.
///
/// Work only observes the flag between transition steps and between
/// simulation frames; a step that has started always runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    token: CancellationToken,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::info!("Cancellation requested");
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once `cancel` has been called.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}
