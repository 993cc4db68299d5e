// Simulated loading screen and scenes with fixed latencies

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::journal::Journal;
use crate::config::TransitionTimings;
use crate::transition::curtain::CurtainGuard;
use crate::transition::lifecycle::{LifecycleEvent, LifecycleGuard};
use crate::transition::{
    CurtainResource, ResourcePhase, ResourceStatus, TransitionError, TransitionableResource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneTimings {
    pub load: Duration,
    pub activate: Duration,
    pub unload: Duration,
}

impl From<&TransitionTimings> for SceneTimings {
    fn from(timings: &TransitionTimings) -> Self {
        Self {
            load: Duration::from_millis(timings.scene_load_ms),
            activate: Duration::from_millis(timings.scene_activate_ms),
            unload: Duration::from_millis(timings.scene_unload_ms),
        }
    }
}

/// Loading screen that fades in and out
pub struct SimulatedCurtain {
    guard: Arc<CurtainGuard>,
    fade: Duration,
    journal: Option<Journal>,
}

impl SimulatedCurtain {
    pub fn new(name: impl Into<String>, fade: Duration) -> Self {
        Self {
            guard: Arc::new(CurtainGuard::new(name)),
            fade,
            journal: None,
        }
    }

    /// Acquire a curtain; this alone takes `curtain_acquire_ms`.
    pub async fn acquire(name: impl Into<String>, timings: &TransitionTimings) -> Self {
        let name = name.into();
        info!(resource = %name, "Loading loading screen");
        tokio::time::sleep(Duration::from_millis(timings.curtain_acquire_ms)).await;
        info!(resource = %name, "Loading screen ready");
        Self::new(name, Duration::from_millis(timings.curtain_fade_ms))
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Shared view of the curtain state for scenes that must check it
    pub fn guard(&self) -> Arc<CurtainGuard> {
        Arc::clone(&self.guard)
    }

    fn note(&self, event: &str) {
        if let Some(journal) = &self.journal {
            journal.record(self.guard.name(), event);
        }
    }
}

#[async_trait]
impl CurtainResource for SimulatedCurtain {
    async fn show(&self) -> Result<(), TransitionError> {
        self.guard.begin_show()?;
        self.note("show:start");
        info!(resource = %self.guard.name(), "Starting show animation");
        tokio::time::sleep(self.fade).await;
        self.guard.finish_show()?;
        self.note("show:finish");
        info!(resource = %self.guard.name(), "Finished show animation");
        Ok(())
    }

    async fn hide(&self) -> Result<(), TransitionError> {
        self.guard.begin_hide()?;
        self.note("hide:start");
        info!(resource = %self.guard.name(), "Starting hide animation");
        tokio::time::sleep(self.fade).await;
        self.guard.finish_hide()?;
        self.note("hide:finish");
        info!(resource = %self.guard.name(), "Finished hide animation");
        Ok(())
    }

    fn is_shown(&self) -> bool {
        self.guard.is_shown()
    }
}

/// Scene whose operations take fixed time and obey the resource lifecycle
pub struct SimulatedScene {
    name: String,
    lifecycle: LifecycleGuard,
    curtain: Arc<CurtainGuard>,
    timings: SceneTimings,
    journal: Option<Journal>,
}

impl SimulatedScene {
    pub fn new(
        name: impl Into<String>,
        status: ResourceStatus,
        curtain: Arc<CurtainGuard>,
        timings: SceneTimings,
    ) -> Self {
        let name = name.into();
        Self {
            lifecycle: LifecycleGuard::starting_in(name.clone(), status),
            name,
            curtain,
            timings,
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn phase(&self) -> ResourcePhase {
        self.lifecycle.phase()
    }

    async fn perform(
        &self,
        begin: LifecycleEvent,
        finish: LifecycleEvent,
        latency: Duration,
        label: &str,
    ) -> Result<(), TransitionError> {
        self.lifecycle.apply(begin)?;
        let mut pending = PendingOperation {
            scene: self,
            label,
            armed: true,
        };
        self.note(&format!("{label}:start"));
        info!(resource = %self.name, operation = label, "Scene operation started");

        tokio::time::sleep(latency).await;

        pending.armed = false;
        self.lifecycle.apply(finish)?;
        self.note(&format!("{label}:finish"));
        info!(resource = %self.name, operation = label, "Scene operation finished");
        Ok(())
    }

    fn note(&self, event: &str) {
        if let Some(journal) = &self.journal {
            journal.record(&self.name, event);
        }
    }
}

/// Rolls the lifecycle back if a scene operation is dropped before it finishes.
struct PendingOperation<'a> {
    scene: &'a SimulatedScene,
    label: &'a str,
    armed: bool,
}

impl Drop for PendingOperation<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(phase) = self.scene.lifecycle.apply(LifecycleEvent::Abort) {
            self.scene.note(&format!("{}:aborted", self.label));
            warn!(
                resource = %self.scene.name,
                operation = self.label,
                phase = ?phase,
                "Scene operation dropped before finishing; phase rolled back"
            );
        }
    }
}

#[async_trait]
impl TransitionableResource for SimulatedScene {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<(), TransitionError> {
        self.perform(
            LifecycleEvent::BeginLoad,
            LifecycleEvent::FinishLoad,
            self.timings.load,
            "load",
        )
        .await
    }

    async fn activate(&self) -> Result<(), TransitionError> {
        let curtain_shown = self.curtain.is_shown();
        self.perform(
            LifecycleEvent::BeginActivate { curtain_shown },
            LifecycleEvent::FinishActivate,
            self.timings.activate,
            "activate",
        )
        .await
    }

    async fn unload(&self) -> Result<(), TransitionError> {
        let curtain_shown = self.curtain.is_shown();
        self.perform(
            LifecycleEvent::BeginUnload { curtain_shown },
            LifecycleEvent::FinishUnload,
            self.timings.unload,
            "unload",
        )
        .await
    }

    fn is_loaded(&self) -> bool {
        self.lifecycle.status().loaded
    }

    fn is_activated(&self) -> bool {
        self.lifecycle.status().activated
    }

    fn status(&self) -> ResourceStatus {
        self.lifecycle.status()
    }
}
