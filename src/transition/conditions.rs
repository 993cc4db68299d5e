// Declarative step rules evaluated against a transition snapshot

use serde::Serialize;
use std::fmt;

use super::types::{Role, TransitionSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Condition {
    CurtainShown,
    CurtainHidden,
    Loaded(Role),
    NotLoaded(Role),
    Activated(Role),
    NotActivated(Role),
}

impl Condition {
    pub fn holds(&self, snapshot: &TransitionSnapshot) -> bool {
        match self {
            Condition::CurtainShown => snapshot.curtain_shown,
            Condition::CurtainHidden => !snapshot.curtain_shown,
            Condition::Loaded(role) => snapshot.resource(*role).loaded,
            Condition::NotLoaded(role) => !snapshot.resource(*role).loaded,
            Condition::Activated(role) => snapshot.resource(*role).activated,
            Condition::NotActivated(role) => !snapshot.resource(*role).activated,
        }
    }

    /// First condition in `conditions` that does not hold
    pub fn first_violated<'a>(
        conditions: &'a [Condition],
        snapshot: &TransitionSnapshot,
    ) -> Option<&'a Condition> {
        conditions.iter().find(|condition| !condition.holds(snapshot))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::CurtainShown => write!(f, "curtain is shown"),
            Condition::CurtainHidden => write!(f, "curtain is hidden"),
            Condition::Loaded(role) => write!(f, "{role} resource is loaded"),
            Condition::NotLoaded(role) => write!(f, "{role} resource is not loaded"),
            Condition::Activated(role) => write!(f, "{role} resource is activated"),
            Condition::NotActivated(role) => write!(f, "{role} resource is not activated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::types::ResourceStatus;

    fn snapshot(curtain_shown: bool) -> TransitionSnapshot {
        TransitionSnapshot {
            curtain_shown,
            outgoing: ResourceStatus::ACTIVATED,
            incoming: ResourceStatus::UNLOADED,
        }
    }

    #[test]
    fn test_conditions_read_the_right_role() {
        let snap = snapshot(false);
        assert!(Condition::Activated(Role::Outgoing).holds(&snap));
        assert!(Condition::NotLoaded(Role::Incoming).holds(&snap));
        assert!(!Condition::Loaded(Role::Incoming).holds(&snap));
        assert!(Condition::CurtainHidden.holds(&snap));
    }

    #[test]
    fn test_first_violated_reports_in_order() {
        let rules = [
            Condition::Loaded(Role::Outgoing),
            Condition::CurtainShown,
            Condition::Loaded(Role::Incoming),
        ];

        let violated = Condition::first_violated(&rules, &snapshot(false));
        assert_eq!(violated, Some(&Condition::CurtainShown));
        assert_eq!(violated.unwrap().to_string(), "curtain is shown");
    }
}
