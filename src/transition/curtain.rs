// Curtain phase guard: Hidden -> Showing -> Shown -> Hiding -> Hidden

use std::sync::{Mutex, PoisonError};

use super::errors::TransitionError;
use super::types::{CurtainPhase, ResourceOperation};

/// Thread-safe phase tracker for a curtain resource.
///
/// The curtain still counts as shown while it fades out, and not yet while
/// it fades in.
#[derive(Debug)]
pub struct CurtainGuard {
    name: String,
    phase: Mutex<CurtainPhase>,
}

impl CurtainGuard {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: Mutex::new(CurtainPhase::Hidden),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> CurtainPhase {
        *self.lock()
    }

    pub fn is_shown(&self) -> bool {
        matches!(self.phase(), CurtainPhase::Shown | CurtainPhase::Hiding)
    }

    pub fn begin_show(&self) -> Result<(), TransitionError> {
        let mut phase = self.lock();
        match *phase {
            CurtainPhase::Hidden => {
                *phase = CurtainPhase::Showing;
                Ok(())
            }
            CurtainPhase::Showing => Err(TransitionError::conflict(&self.name, ResourceOperation::Show)),
            CurtainPhase::Shown => Err(TransitionError::invalid(&self.name, "cannot show, already shown")),
            CurtainPhase::Hiding => Err(TransitionError::invalid(&self.name, "cannot show while hiding")),
        }
    }

    pub fn finish_show(&self) -> Result<(), TransitionError> {
        self.finish(CurtainPhase::Showing, CurtainPhase::Shown)
    }

    pub fn begin_hide(&self) -> Result<(), TransitionError> {
        let mut phase = self.lock();
        match *phase {
            CurtainPhase::Shown => {
                *phase = CurtainPhase::Hiding;
                Ok(())
            }
            CurtainPhase::Hiding => Err(TransitionError::conflict(&self.name, ResourceOperation::Hide)),
            CurtainPhase::Hidden => Err(TransitionError::invalid(&self.name, "cannot hide, already hidden")),
            CurtainPhase::Showing => Err(TransitionError::invalid(&self.name, "cannot hide while showing")),
        }
    }

    pub fn finish_hide(&self) -> Result<(), TransitionError> {
        self.finish(CurtainPhase::Hiding, CurtainPhase::Hidden)
    }

    fn finish(&self, from: CurtainPhase, to: CurtainPhase) -> Result<(), TransitionError> {
        let mut phase = self.lock();
        if *phase != from {
            return Err(TransitionError::invalid(
                &self.name,
                format!("expected {from:?} but curtain is {:?}", *phase),
            ));
        }
        *phase = to;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CurtainPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
