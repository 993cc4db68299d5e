// Staged transition sequencing
//
// Swaps one resource for another behind a curtain, step by step, with every
// step gated on observed resource state.

pub mod conditions;
pub mod curtain;
pub mod errors;
pub mod lifecycle;
pub mod plan;
pub mod sequencer;
pub mod traits;
pub mod types;


pub use conditions::Condition;
pub use curtain::CurtainGuard;
pub use errors::TransitionError;
pub use lifecycle::{LifecycleEvent, LifecycleGuard};
pub use plan::{ResourceCall, SequenceStep, StepAction, TransitionPlan};
pub use sequencer::StagedTransitionSequencer;
pub use traits::{CurtainResource, TransitionableResource};
pub use types::{
    CurtainPhase, ResourceOperation, ResourcePhase, ResourceStatus, Role, StepRecord,
    TransitionReport, TransitionSnapshot,
};
