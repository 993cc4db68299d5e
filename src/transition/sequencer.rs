use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn, Instrument};

use super::conditions::Condition;
use super::errors::TransitionError;
use super::plan::{ResourceCall, SequenceStep, StepAction, TransitionPlan};
use super::traits::{CurtainResource, TransitionableResource};
use super::types::{Role, StepRecord, TransitionReport, TransitionSnapshot};
use crate::cancellation::CancelToken;
use crate::observability::OperationTimer;
use crate::telemetry::{create_transition_span, generate_correlation_id};

/// Runs a transition plan step by step behind a curtain.
///
/// A step starts only after the previous step's postconditions were
/// observed, and only if its own preconditions hold. Joined calls both run
/// to completion before the step ends, even when one of them fails.
pub struct StagedTransitionSequencer {
    curtain: Arc<dyn CurtainResource>,
    plan: TransitionPlan,
}

impl StagedTransitionSequencer {
    pub fn new(curtain: Arc<dyn CurtainResource>) -> Self {
        Self::with_plan(curtain, TransitionPlan::scene_swap())
    }

    pub fn with_plan(curtain: Arc<dyn CurtainResource>, plan: TransitionPlan) -> Self {
        Self { curtain, plan }
    }

    pub fn plan(&self) -> &TransitionPlan {
        &self.plan
    }

    pub fn snapshot(
        &self,
        outgoing: &dyn TransitionableResource,
        incoming: &dyn TransitionableResource,
    ) -> TransitionSnapshot {
        TransitionSnapshot {
            curtain_shown: self.curtain.is_shown(),
            outgoing: outgoing.status(),
            incoming: incoming.status(),
        }
    }

    /// Swap `outgoing` for `incoming`; returns once the curtain is down again.
    pub async fn run(
        &self,
        outgoing: &dyn TransitionableResource,
        incoming: &dyn TransitionableResource,
    ) -> Result<TransitionReport, TransitionError> {
        self.run_with_cancel(outgoing, incoming, &CancelToken::new())
            .await
    }

    /// Like `run`, but stops between steps once `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        outgoing: &dyn TransitionableResource,
        incoming: &dyn TransitionableResource,
        cancel: &CancelToken,
    ) -> Result<TransitionReport, TransitionError> {
        let correlation_id = generate_correlation_id();
        let span = create_transition_span(outgoing.name(), incoming.name(), &correlation_id);

        async move {
            info!("Starting staged transition");
            let started_at = Utc::now();
            let timer = OperationTimer::new("staged-transition");
            let mut steps = Vec::with_capacity(self.plan.steps().len());

            for step in self.plan.steps() {
                if cancel.is_cancelled() {
                    warn!(step = step.name, "Transition cancelled");
                    return Err(TransitionError::Cancelled {
                        before_step: step.name.to_string(),
                    });
                }
                steps.push(self.run_step(step, outgoing, incoming).await?);
            }

            let elapsed = timer.finish();
            info!(elapsed_ms = elapsed.as_millis() as u64, "Staged transition complete");

            Ok(TransitionReport {
                correlation_id,
                outgoing: outgoing.name().to_string(),
                incoming: incoming.name().to_string(),
                started_at,
                elapsed_ms: elapsed.as_millis() as u64,
                steps,
            })
        }
        .instrument(span)
        .await
    }

    async fn run_step(
        &self,
        step: &SequenceStep,
        outgoing: &dyn TransitionableResource,
        incoming: &dyn TransitionableResource,
    ) -> Result<StepRecord, TransitionError> {
        let before = self.snapshot(outgoing, incoming);
        if let Some(rule) = Condition::first_violated(&step.preconditions, &before) {
            warn!(step = step.name, rule = %rule, "Step precondition violated");
            return Err(TransitionError::StepPrecondition {
                step: step.name.to_string(),
                rule: rule.to_string(),
            });
        }

        info!(step = step.name, "Starting step");
        let started_at = Utc::now();
        let timer = OperationTimer::new(step.name);

        match step.action {
            StepAction::Single(call) => self.invoke(call, outgoing, incoming).await?,
            StepAction::Join(first, second) => {
                let (first, second) = tokio::join!(
                    self.invoke(first, outgoing, incoming),
                    self.invoke(second, outgoing, incoming)
                );
                first?;
                second?;
            }
        }

        let elapsed = timer.finish();
        let after = self.snapshot(outgoing, incoming);
        if let Some(rule) = Condition::first_violated(&step.postconditions, &after) {
            warn!(step = step.name, rule = %rule, "Step postcondition not established");
            return Err(TransitionError::StepPostcondition {
                step: step.name.to_string(),
                rule: rule.to_string(),
            });
        }

        Ok(StepRecord {
            step: step.name.to_string(),
            started_at,
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    async fn invoke(
        &self,
        call: ResourceCall,
        outgoing: &dyn TransitionableResource,
        incoming: &dyn TransitionableResource,
    ) -> Result<(), TransitionError> {
        let resource = |role: Role| match role {
            Role::Outgoing => outgoing,
            Role::Incoming => incoming,
        };

        match call {
            ResourceCall::ShowCurtain => self.curtain.show().await,
            ResourceCall::HideCurtain => self.curtain.hide().await,
            ResourceCall::Load(role) => resource(role).load().await,
            ResourceCall::Activate(role) => resource(role).activate().await,
            ResourceCall::Unload(role) => resource(role).unload().await,
        }
    }
}
