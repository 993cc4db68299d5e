use serde::Serialize;

use super::conditions::Condition;
use super::types::{ResourceOperation, Role};

/// One call the sequencer makes on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResourceCall {
    ShowCurtain,
    HideCurtain,
    Load(Role),
    Activate(Role),
    Unload(Role),
}

impl ResourceCall {
    pub fn operation(&self) -> ResourceOperation {
        match self {
            ResourceCall::ShowCurtain => ResourceOperation::Show,
            ResourceCall::HideCurtain => ResourceOperation::Hide,
            ResourceCall::Load(_) => ResourceOperation::Load,
            ResourceCall::Activate(_) => ResourceOperation::Activate,
            ResourceCall::Unload(_) => ResourceOperation::Unload,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepAction {
    Single(ResourceCall),
    /// Two independent calls started together; the step ends when both have
    Join(ResourceCall, ResourceCall),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceStep {
    pub name: &'static str,
    pub preconditions: Vec<Condition>,
    pub action: StepAction,
    pub postconditions: Vec<Condition>,
}

/// Ordered steps run by the sequencer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionPlan {
    steps: Vec<SequenceStep>,
}

impl TransitionPlan {
    pub fn new(steps: Vec<SequenceStep>) -> Self {
        Self { steps }
    }

    /// Curtain up, swap both resources at once, activate, curtain down.
    pub fn scene_swap() -> Self {
        use Condition::*;
        use Role::*;

        Self::new(vec![
            SequenceStep {
                name: "show-curtain",
                preconditions: vec![CurtainHidden],
                action: StepAction::Single(ResourceCall::ShowCurtain),
                postconditions: vec![CurtainShown],
            },
            SequenceStep {
                name: "swap-resources",
                preconditions: vec![CurtainShown, Loaded(Outgoing), NotLoaded(Incoming)],
                action: StepAction::Join(
                    ResourceCall::Unload(Outgoing),
                    ResourceCall::Load(Incoming),
                ),
                postconditions: vec![NotLoaded(Outgoing), Loaded(Incoming)],
            },
            SequenceStep {
                name: "activate-incoming",
                preconditions: vec![CurtainShown, Loaded(Incoming), NotActivated(Incoming)],
                action: StepAction::Single(ResourceCall::Activate(Incoming)),
                postconditions: vec![Activated(Incoming)],
            },
            SequenceStep {
                name: "hide-curtain",
                preconditions: vec![CurtainShown, Activated(Incoming), NotLoaded(Outgoing)],
                action: StepAction::Single(ResourceCall::HideCurtain),
                postconditions: vec![CurtainHidden],
            },
        ])
    }

    pub fn steps(&self) -> &[SequenceStep] {
        &self.steps
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name).collect()
    }
}

impl Default for TransitionPlan {
    fn default() -> Self {
        Self::scene_swap()
    }
}
