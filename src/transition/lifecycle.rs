use std::cell::Cell;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use statig::prelude::*;

use super::errors::TransitionError;
use super::types::{ResourceOperation, ResourcePhase, ResourceStatus};

/// Guard events for a loadable resource.
///
/// `Begin*` events are checked before the operation starts; `Finish*` events
/// record that it completed. `Abort` returns an interrupted operation to the
/// phase it started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    BeginLoad,
    FinishLoad,
    BeginActivate { curtain_shown: bool },
    FinishActivate,
    BeginUnload { curtain_shown: bool },
    FinishUnload,
    Abort,
}

#[derive(Default)]
pub struct ResourceLifecycle {
    pub name: String,
    pub phase: ResourcePhase,
    unloading_active: bool,
    rejection: Cell<Option<TransitionError>>,
}

impl ResourceLifecycle {
    pub fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn phase(&self) -> ResourcePhase {
        self.phase
    }

    pub fn status(&self) -> ResourceStatus {
        let phase = self.phase();
        ResourceStatus {
            loaded: matches!(
                phase,
                ResourcePhase::Loaded
                    | ResourcePhase::Activating
                    | ResourcePhase::Activated
                    | ResourcePhase::Unloading
            ),
            activated: phase == ResourcePhase::Activated
                || (phase == ResourcePhase::Unloading && self.unloading_active),
        }
    }

    fn take_rejection(&self) -> Option<TransitionError> {
        self.rejection.take()
    }
}

#[state_machine(initial = "State::unloaded()")]
impl ResourceLifecycle {
    #[state]
    fn unloaded(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::BeginLoad => self.enter(ResourcePhase::Loading, State::loading()),
            LifecycleEvent::BeginActivate { .. } => {
                self.reject_precondition("activate attempted while resource not loaded")
            }
            LifecycleEvent::BeginUnload { .. } => {
                self.reject_invalid("cannot unload, resource is not loaded")
            }
            _ => self.reject_invalid("no operation in progress"),
        }
    }

    #[state]
    fn loading(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::FinishLoad => self.enter(ResourcePhase::Loaded, State::loaded()),
            LifecycleEvent::Abort => self.enter(ResourcePhase::Unloaded, State::unloaded()),
            LifecycleEvent::BeginLoad => self.reject_conflict(ResourceOperation::Load),
            LifecycleEvent::BeginActivate { .. } => {
                self.reject_precondition("activate attempted while resource not loaded")
            }
            LifecycleEvent::BeginUnload { .. } => {
                self.reject_invalid("cannot unload while loading")
            }
            _ => self.reject_invalid("only a load is in progress"),
        }
    }

    #[state]
    fn loaded(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::BeginActivate { curtain_shown } => {
                if !curtain_shown {
                    return self.reject_precondition("activate attempted while curtain not shown");
                }
                self.enter(ResourcePhase::Activating, State::activating())
            }
            LifecycleEvent::BeginUnload { .. } => {
                self.unloading_active = false;
                self.enter(ResourcePhase::Unloading, State::unloading())
            }
            LifecycleEvent::BeginLoad => self.reject_invalid("resource is already loaded"),
            _ => self.reject_invalid("no operation in progress"),
        }
    }

    #[state]
    fn activating(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::FinishActivate => {
                self.enter(ResourcePhase::Activated, State::activated())
            }
            LifecycleEvent::Abort => self.enter(ResourcePhase::Loaded, State::loaded()),
            LifecycleEvent::BeginActivate { .. } => {
                self.reject_conflict(ResourceOperation::Activate)
            }
            LifecycleEvent::BeginLoad => self.reject_invalid("resource is already loaded"),
            // One operation per resource at a time; an unload has to wait for
            // the activation to settle.
            LifecycleEvent::BeginUnload { .. } => self.reject_invalid(
                "cannot unload while activating; operations on a resource never overlap",
            ),
            _ => self.reject_invalid("only an activation is in progress"),
        }
    }

    #[state]
    fn activated(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::BeginUnload { curtain_shown } => {
                if !curtain_shown {
                    return self.reject_precondition(
                        "unload of an activated resource attempted while curtain not shown",
                    );
                }
                self.unloading_active = true;
                self.enter(ResourcePhase::Unloading, State::unloading())
            }
            LifecycleEvent::BeginActivate { .. } => {
                self.reject_invalid("resource is already activated")
            }
            LifecycleEvent::BeginLoad => self.reject_invalid("resource is already loaded"),
            _ => self.reject_invalid("no operation in progress"),
        }
    }

    #[state]
    fn unloading(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::FinishUnload => {
                self.unloading_active = false;
                self.enter(ResourcePhase::Unloaded, State::unloaded())
            }
            LifecycleEvent::Abort => {
                if std::mem::take(&mut self.unloading_active) {
                    self.enter(ResourcePhase::Activated, State::activated())
                } else {
                    self.enter(ResourcePhase::Loaded, State::loaded())
                }
            }
            LifecycleEvent::BeginUnload { .. } => self.reject_conflict(ResourceOperation::Unload),
            LifecycleEvent::BeginLoad => self.reject_invalid("cannot load while unloading"),
            LifecycleEvent::BeginActivate { .. } => {
                self.reject_invalid("cannot activate while unloading")
            }
            _ => self.reject_invalid("only an unload is in progress"),
        }
    }
}

impl ResourceLifecycle {
    fn enter(&mut self, phase: ResourcePhase, next: State) -> Outcome<State> {
        tracing::debug!(resource = %self.name, phase = ?phase, "Resource phase changed");
        self.phase = phase;
        Transition(next)
    }

    fn reject_precondition(&mut self, rule: &str) -> Outcome<State> {
        self.rejection
            .set(Some(TransitionError::precondition(&self.name, rule)));
        Handled
    }

    fn reject_conflict(&mut self, operation: ResourceOperation) -> Outcome<State> {
        self.rejection
            .set(Some(TransitionError::conflict(&self.name, operation)));
        Handled
    }

    fn reject_invalid(&mut self, reason: &str) -> Outcome<State> {
        self.rejection
            .set(Some(TransitionError::invalid(&self.name, reason)));
        Handled
    }
}

/// Thread-safe owner of a resource lifecycle.
///
/// Each `apply` checks and advances the phase under one lock, so two callers
/// can never both begin the same operation.
pub struct LifecycleGuard {
    machine: Mutex<StateMachine<ResourceLifecycle>>,
}

impl LifecycleGuard {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            machine: Mutex::new(ResourceLifecycle::new(name.into()).state_machine()),
        }
    }

    /// Guard for a resource that already reached `status`.
    pub fn starting_in(name: impl Into<String>, status: ResourceStatus) -> Self {
        let guard = Self::new(name);
        {
            let mut machine = guard.lock();
            if status.loaded || status.activated {
                machine.handle(&LifecycleEvent::BeginLoad);
                machine.handle(&LifecycleEvent::FinishLoad);
            }
            if status.activated {
                machine.handle(&LifecycleEvent::BeginActivate {
                    curtain_shown: true,
                });
                machine.handle(&LifecycleEvent::FinishActivate);
            }
        }
        guard
    }

    /// Apply one event; rejected events leave the phase untouched.
    pub fn apply(&self, event: LifecycleEvent) -> Result<ResourcePhase, TransitionError> {
        let mut machine = self.lock();
        machine.handle(&event);
        match machine.inner().take_rejection() {
            Some(rejection) => {
                tracing::warn!(event = ?event, error = %rejection, "Resource operation rejected");
                Err(rejection)
            }
            None => Ok(machine.inner().phase()),
        }
    }

    pub fn phase(&self) -> ResourcePhase {
        self.lock().inner().phase()
    }

    pub fn status(&self) -> ResourceStatus {
        self.lock().inner().status()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StateMachine<ResourceLifecycle>> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
