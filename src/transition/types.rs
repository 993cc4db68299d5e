// Core types for staged transitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Operations a transition resource can be asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceOperation {
    Show,
    Hide,
    Load,
    Activate,
    Unload,
}

impl fmt::Display for ResourceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            ResourceOperation::Show => "show",
            ResourceOperation::Hide => "hide",
            ResourceOperation::Load => "load",
            ResourceOperation::Activate => "activate",
            ResourceOperation::Unload => "unload",
        };
        f.write_str(verb)
    }
}

/// Lifecycle phase of a loadable resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourcePhase {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Activating,
    Activated,
    Unloading,
}

/// Phase of the curtain covering a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurtainPhase {
    Hidden,
    Showing,
    Shown,
    Hiding,
}

/// Observable flags of a loadable resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub loaded: bool,
    pub activated: bool,
}

impl ResourceStatus {
    pub const UNLOADED: ResourceStatus = ResourceStatus {
        loaded: false,
        activated: false,
    };
    pub const LOADED: ResourceStatus = ResourceStatus {
        loaded: true,
        activated: false,
    };
    pub const ACTIVATED: ResourceStatus = ResourceStatus {
        loaded: true,
        activated: true,
    };
}

/// Which side of the swap a resource is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Outgoing,
    Incoming,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Outgoing => f.write_str("outgoing"),
            Role::Incoming => f.write_str("incoming"),
        }
    }
}

/// Point-in-time view of everything a step rule can look at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionSnapshot {
    pub curtain_shown: bool,
    pub outgoing: ResourceStatus,
    pub incoming: ResourceStatus,
}

impl TransitionSnapshot {
    pub fn resource(&self, role: Role) -> ResourceStatus {
        match role {
            Role::Outgoing => self.outgoing,
            Role::Incoming => self.incoming,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Outcome of a completed transition run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionReport {
    pub correlation_id: String,
    pub outgoing: String,
    pub incoming: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub steps: Vec<StepRecord>,
}

impl TransitionReport {
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|record| record.step.as_str()).collect()
    }
}
