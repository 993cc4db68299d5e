// Integration tests for staged transitions over simulated resources
//
// All tests run on a paused clock, so offsets in the journal are exact.

use async_trait::async_trait;
use flightstage::config::TransitionTimings;
use flightstage::simulation::{Journal, SceneTimings, SimulatedCurtain, SimulatedScene};
use flightstage::transition::{
    Condition, CurtainGuard, ResourceCall, ResourceStatus, Role, SequenceStep, StepAction,
    TransitionPlan, TransitionSnapshot,
};
use flightstage::{
    CancelToken, CurtainResource, StagedTransitionSequencer, TransitionError,
    TransitionableResource,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_pending, assert_ready};

struct Stage {
    journal: Journal,
    curtain_view: Arc<CurtainGuard>,
    sequencer: StagedTransitionSequencer,
    outgoing: SimulatedScene,
    incoming: SimulatedScene,
}

fn stage(outgoing: ResourceStatus, incoming: ResourceStatus) -> Stage {
    let timings = TransitionTimings::default();
    let journal = Journal::new();
    let curtain = SimulatedCurtain::new("curtain", Duration::from_millis(timings.curtain_fade_ms))
        .with_journal(journal.clone());
    let curtain_view = curtain.guard();
    let scene_timings = SceneTimings::from(&timings);

    Stage {
        outgoing: SimulatedScene::new("old", outgoing, Arc::clone(&curtain_view), scene_timings)
            .with_journal(journal.clone()),
        incoming: SimulatedScene::new("new", incoming, Arc::clone(&curtain_view), scene_timings)
            .with_journal(journal.clone()),
        sequencer: StagedTransitionSequencer::new(Arc::new(curtain)),
        curtain_view,
        journal,
    }
}

#[tokio::test(start_paused = true)]
async fn test_scene_swap_reaches_expected_final_state() {
    let stage = stage(ResourceStatus::ACTIVATED, ResourceStatus::UNLOADED);

    let report = stage
        .sequencer
        .run(&stage.outgoing, &stage.incoming)
        .await
        .unwrap();

    assert_eq!(stage.outgoing.status(), ResourceStatus::UNLOADED);
    assert_eq!(stage.incoming.status(), ResourceStatus::ACTIVATED);
    assert!(!stage.curtain_view.is_shown());
    assert_eq!(
        report.step_names(),
        vec!["show-curtain", "swap-resources", "activate-incoming", "hide-curtain"]
    );
    assert_eq!(report.outgoing, "old");
    assert_eq!(report.incoming, "new");
}

#[tokio::test(start_paused = true)]
async fn test_steps_follow_ordering_law() {
    let stage = stage(ResourceStatus::ACTIVATED, ResourceStatus::UNLOADED);
    stage
        .sequencer
        .run(&stage.outgoing, &stage.incoming)
        .await
        .unwrap();

    let at = |resource: &str, event: &str| stage.journal.position(resource, event).unwrap();

    assert!(at("curtain", "show:finish") < at("old", "unload:start"));
    assert!(at("curtain", "show:finish") < at("new", "load:start"));
    assert!(at("new", "load:finish") < at("new", "activate:start"));
    assert!(at("old", "unload:finish") < at("curtain", "hide:start"));
    assert!(at("new", "activate:finish") < at("curtain", "hide:start"));
}

#[tokio::test(start_paused = true)]
async fn test_swap_runs_unload_and_load_together() {
    let stage = stage(ResourceStatus::ACTIVATED, ResourceStatus::UNLOADED);
    let report = stage
        .sequencer
        .run(&stage.outgoing, &stage.incoming)
        .await
        .unwrap();

    let offset = |resource: &str, event: &str| stage.journal.offset_ms(resource, event).unwrap();

    assert_eq!(offset("old", "unload:start"), 150);
    assert_eq!(offset("new", "load:start"), 150);
    assert_eq!(offset("old", "unload:finish"), 450);
    assert_eq!(offset("new", "load:finish"), 750);
    assert_eq!(offset("new", "activate:finish"), 1050);
    assert_eq!(offset("curtain", "hide:finish"), 1200);

    // Swap step lasts as long as its slower branch, not the sum.
    assert_eq!(report.steps[1].elapsed_ms, 600);
    assert_eq!(report.elapsed(), Duration::from_millis(1200));
}

#[tokio::test(start_paused = true)]
async fn test_already_loaded_incoming_is_rejected_at_swap() {
    let stage = stage(ResourceStatus::ACTIVATED, ResourceStatus::LOADED);

    let result = stage.sequencer.run(&stage.outgoing, &stage.incoming).await;

    assert_eq!(
        result,
        Err(TransitionError::StepPrecondition {
            step: "swap-resources".to_string(),
            rule: Condition::NotLoaded(Role::Incoming).to_string(),
        })
    );
    assert_eq!(stage.journal.position("old", "unload:start"), None);
    assert!(stage.curtain_view.is_shown());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_between_steps_leaves_current_step_finished() {
    let stage = stage(ResourceStatus::ACTIVATED, ResourceStatus::UNLOADED);
    let cancel = CancelToken::new();
    let trigger = cancel.clone();

    let canceller = async {
        // Mid-way through the swap step
        tokio::time::sleep(Duration::from_millis(400)).await;
        trigger.cancel();
    };
    let (result, ()) = tokio::join!(
        stage
            .sequencer
            .run_with_cancel(&stage.outgoing, &stage.incoming, &cancel),
        canceller
    );

    assert_eq!(
        result,
        Err(TransitionError::Cancelled {
            before_step: "activate-incoming".to_string()
        })
    );
    assert_eq!(stage.outgoing.status(), ResourceStatus::UNLOADED);
    assert_eq!(stage.incoming.status(), ResourceStatus::LOADED);
}

#[tokio::test(start_paused = true)]
async fn test_transition_is_pending_until_curtain_is_down() {
    let stage = stage(ResourceStatus::ACTIVATED, ResourceStatus::UNLOADED);
    let mut run = tokio_test::task::spawn(stage.sequencer.run(&stage.outgoing, &stage.incoming));

    assert_pending!(run.poll());
    tokio::time::advance(Duration::from_millis(150)).await;
    assert_pending!(run.poll());
    assert!(stage.curtain_view.is_shown());

    // swap, then activate
    tokio::time::advance(Duration::from_millis(600)).await;
    assert_pending!(run.poll());
    assert!(stage.incoming.is_loaded());
    tokio::time::advance(Duration::from_millis(300)).await;
    assert_pending!(run.poll());
    assert!(stage.incoming.is_activated());

    tokio::time::advance(Duration::from_millis(150)).await;
    let report = assert_ready!(run.poll()).unwrap();
    assert_eq!(report.steps.len(), 4);
}

/// Scene whose unload fails immediately while the rest of the swap continues
struct BrokenScene;

#[async_trait]
impl TransitionableResource for BrokenScene {
    fn name(&self) -> &str {
        "broken"
    }

    async fn load(&self) -> Result<(), TransitionError> {
        Ok(())
    }

    async fn activate(&self) -> Result<(), TransitionError> {
        Ok(())
    }

    async fn unload(&self) -> Result<(), TransitionError> {
        Err(TransitionError::invalid("broken", "unload handler crashed"))
    }

    fn is_loaded(&self) -> bool {
        true
    }

    fn is_activated(&self) -> bool {
        true
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_branch_still_waits_for_its_sibling() {
    let stage = stage(ResourceStatus::ACTIVATED, ResourceStatus::UNLOADED);

    let result = stage.sequencer.run(&BrokenScene, &stage.incoming).await;

    assert!(matches!(
        result,
        Err(TransitionError::InvalidStateTransition { .. })
    ));
    assert!(stage.incoming.is_loaded());
    assert_eq!(stage.journal.offset_ms("new", "load:finish"), Some(750));
}

#[tokio::test(start_paused = true)]
async fn test_custom_plan_without_swap() {
    let timings = TransitionTimings::default();
    let curtain = SimulatedCurtain::new("curtain", Duration::from_millis(timings.curtain_fade_ms));
    let curtain_view = curtain.guard();
    let plan = TransitionPlan::new(vec![
        SequenceStep {
            name: "show-curtain",
            preconditions: vec![Condition::CurtainHidden],
            action: StepAction::Single(ResourceCall::ShowCurtain),
            postconditions: vec![Condition::CurtainShown],
        },
        SequenceStep {
            name: "load-incoming",
            preconditions: vec![Condition::NotLoaded(Role::Incoming)],
            action: StepAction::Single(ResourceCall::Load(Role::Incoming)),
            postconditions: vec![Condition::Loaded(Role::Incoming)],
        },
    ]);
    let sequencer = StagedTransitionSequencer::with_plan(Arc::new(curtain), plan);
    let outgoing = SimulatedScene::new(
        "old",
        ResourceStatus::ACTIVATED,
        Arc::clone(&curtain_view),
        SceneTimings::from(&timings),
    );
    let incoming = SimulatedScene::new(
        "new",
        ResourceStatus::UNLOADED,
        Arc::clone(&curtain_view),
        SceneTimings::from(&timings),
    );

    let report = sequencer.run(&outgoing, &incoming).await.unwrap();

    assert_eq!(report.step_names(), vec!["show-curtain", "load-incoming"]);
    assert_eq!(
        sequencer.snapshot(&outgoing, &incoming),
        TransitionSnapshot {
            curtain_shown: true,
            outgoing: ResourceStatus::ACTIVATED,
            incoming: ResourceStatus::LOADED,
        }
    );
    assert!(curtain_view.is_shown());
}

#[tokio::test(start_paused = true)]
async fn test_curtain_trait_object_reports_shown_while_hiding() {
    let curtain = Arc::new(SimulatedCurtain::new("curtain", Duration::from_millis(100)));
    curtain.show().await.unwrap();

    let hiding = Arc::clone(&curtain);
    let hide = tokio::spawn(async move { hiding.hide().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(curtain.is_shown());

    hide.await.unwrap().unwrap();
    assert!(!curtain.is_shown());
}
