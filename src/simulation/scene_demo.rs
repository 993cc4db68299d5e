use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::journal::{Journal, JournalEntry};
use super::resources::{SimulatedCurtain, SimulatedScene};
use crate::cancellation::CancelToken;
use crate::config::TransitionTimings;
use crate::transition::{
    CurtainResource, ResourceStatus, StagedTransitionSequencer, TransitionReport,
    TransitionableResource,
};

#[derive(Debug, Clone, Serialize)]
pub struct SceneDemoReport {
    pub transition: TransitionReport,
    pub outgoing: ResourceStatus,
    pub incoming: ResourceStatus,
    pub curtain_shown: bool,
    pub timeline: Vec<JournalEntry>,
}

/// Swap an active scene for a fresh one behind a simulated loading screen.
pub async fn run_scene_demo(
    timings: &TransitionTimings,
    cancel: &CancelToken,
) -> Result<SceneDemoReport> {
    let journal = Journal::new();
    let curtain = SimulatedCurtain::acquire("loadingScreen", timings)
        .await
        .with_journal(journal.clone());
    let curtain_view = curtain.guard();

    let outgoing = SimulatedScene::new(
        "oldScene",
        ResourceStatus::ACTIVATED,
        Arc::clone(&curtain_view),
        timings.into(),
    )
    .with_journal(journal.clone());
    let incoming = SimulatedScene::new(
        "newScene",
        ResourceStatus::UNLOADED,
        Arc::clone(&curtain_view),
        timings.into(),
    )
    .with_journal(journal.clone());

    let curtain: Arc<dyn CurtainResource> = Arc::new(curtain);
    let sequencer = StagedTransitionSequencer::new(curtain);
    let transition = sequencer
        .run_with_cancel(&outgoing, &incoming, cancel)
        .await
        .context("Scene transition failed")?;

    if outgoing.is_loaded() {
        bail!("{} is still loaded after the transition", outgoing.name());
    }
    if !incoming.is_activated() {
        bail!("{} was not activated by the transition", incoming.name());
    }
    if curtain_view.is_shown() {
        bail!("{} is still shown after the transition", curtain_view.name());
    }

    info!(
        elapsed_ms = transition.elapsed_ms,
        "Scene transition finished, old scene unloaded and new scene active"
    );

    Ok(SceneDemoReport {
        outgoing: outgoing.status(),
        incoming: incoming.status(),
        curtain_shown: curtain_view.is_shown(),
        timeline: journal.entries(),
        transition,
    })
}
