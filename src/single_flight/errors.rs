use thiserror::Error;

/// Faults raised by the single-flight gate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlightError {
    #[error("Completion received for owner {owner} while no computation was in flight")]
    DoubleCompletion { owner: String },
    #[error("Computation for owner {owner} did not complete within {waited_ms}ms")]
    Timeout { owner: String, waited_ms: u64 },
    #[error("Worker computing for owner {owner} failed: {reason}")]
    WorkerFailed { owner: String, reason: String },
    #[error("No tokio runtime available to dispatch the computation onto")]
    RuntimeUnavailable,
    #[error("{pending} computation(s) still in flight when the drain deadline elapsed")]
    Shutdown { pending: u64 },
}

impl FlightError {
    pub(crate) fn owner_label<K: std::fmt::Debug>(owner: &K) -> String {
        format!("{owner:?}")
    }
}
