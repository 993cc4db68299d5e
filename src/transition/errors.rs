use thiserror::Error;

use super::types::ResourceOperation;

/// Faults raised by transition resources and the sequencer.
///
/// None of these are retried; they point at a sequencing defect in whoever
/// drives the resources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{resource}: precondition violated: {rule}")]
    PreconditionViolation { resource: String, rule: String },
    #[error("{resource}: cannot {operation}, an identical operation is already in progress")]
    ConcurrentOperationConflict {
        resource: String,
        operation: ResourceOperation,
    },
    #[error("{resource}: invalid state transition: {reason}")]
    InvalidStateTransition { resource: String, reason: String },
    #[error("Step '{step}' cannot start: {rule}")]
    StepPrecondition { step: String, rule: String },
    #[error("Step '{step}' finished without establishing: {rule}")]
    StepPostcondition { step: String, rule: String },
    #[error("Transition cancelled before step '{before_step}'")]
    Cancelled { before_step: String },
}

impl TransitionError {
    pub fn precondition(resource: &str, rule: impl Into<String>) -> Self {
        Self::PreconditionViolation {
            resource: resource.to_string(),
            rule: rule.into(),
        }
    }

    pub fn conflict(resource: &str, operation: ResourceOperation) -> Self {
        Self::ConcurrentOperationConflict {
            resource: resource.to_string(),
            operation,
        }
    }

    pub fn invalid(resource: &str, reason: impl Into<String>) -> Self {
        Self::InvalidStateTransition {
            resource: resource.to_string(),
            reason: reason.into(),
        }
    }
}
