use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, info, Instrument};

use super::errors::FlightError;
use super::slot::{ComputationSlot, FlightTicket, SlotPoll};
use super::traits::ComputationProvider;
use crate::observability::{FlightMetrics, FlightStats};
use crate::telemetry::create_flight_span;

/// Single-flight gate keyed by owner.
///
/// `poll` never blocks: it returns the last completed artifact for an owner,
/// and when there is none and nothing is running it dispatches exactly one
/// computation onto the runtime's blocking pool. Cloning the gate shares it.
pub struct SingleFlight<K, A> {
    inner: Arc<GateInner<K, A>>,
}

struct GateInner<K, A> {
    name: String,
    provider: Arc<dyn ComputationProvider<K, A>>,
    runtime: Handle,
    slots: RwLock<HashMap<K, Arc<ComputationSlot<A>>>>,
    active: watch::Sender<u64>,
    metrics: FlightMetrics,
}

impl<K, A> Clone for SingleFlight<K, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, A> SingleFlight<K, A>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
{
    /// Build a gate that dispatches onto the current tokio runtime.
    pub fn new(
        name: impl Into<String>,
        provider: impl ComputationProvider<K, A>,
    ) -> Result<Self, FlightError> {
        let runtime = Handle::try_current().map_err(|_| FlightError::RuntimeUnavailable)?;
        Ok(Self::with_handle(name, provider, runtime))
    }

    pub fn with_handle(
        name: impl Into<String>,
        provider: impl ComputationProvider<K, A>,
        runtime: Handle,
    ) -> Self {
        let (active, _) = watch::channel(0);
        Self {
            inner: Arc::new(GateInner {
                name: name.into(),
                provider: Arc::new(provider),
                runtime,
                slots: RwLock::new(HashMap::new()),
                active,
                metrics: FlightMetrics::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current result for `owner`, triggering a computation if there is none.
    pub fn poll(&self, owner: &K) -> Option<A> {
        let slot = self.slot(owner);
        match slot.poll() {
            SlotPoll::Ready(artifact) => Some(artifact),
            SlotPoll::Pending => None,
            SlotPoll::Dispatch(ticket) => {
                self.dispatch(owner.clone(), ticket);
                None
            }
        }
    }

    /// Current result for `owner` without triggering anything.
    pub fn peek(&self, owner: &K) -> Option<A> {
        self.existing_slot(owner).and_then(|slot| slot.peek())
    }

    pub fn is_in_flight(&self, owner: &K) -> bool {
        self.existing_slot(owner)
            .map(|slot| slot.is_in_flight())
            .unwrap_or(false)
    }

    /// Claim `owner` for a computation run outside the gate's worker pool.
    ///
    /// Returns `None` while a computation is already in flight. The holder
    /// must finish the claim with `complete`; the next poll after that sees
    /// its artifact.
    pub fn try_claim(&self, owner: &K) -> Option<FlightTicket> {
        let ticket = self.slot(owner).claim()?;
        let in_flight_now = self.enter_flight();
        self.inner.metrics.record_dispatch(in_flight_now);
        debug!(gate = %self.inner.name, owner = ?owner, "Slot claimed for external computation");
        Some(ticket)
    }

    /// Hand a finished artifact to the owner's slot.
    ///
    /// Fails with `DoubleCompletion` unless `ticket` is the claim currently
    /// in flight for `owner`, so a stale or repeated completion never
    /// replaces a newer result.
    pub fn complete(&self, owner: &K, ticket: FlightTicket, artifact: A) -> Result<(), FlightError> {
        let completed = self
            .existing_slot(owner)
            .map(|slot| slot.complete(ticket, artifact))
            .unwrap_or(false);

        if !completed {
            self.inner.metrics.record_rejected_completion();
            error!(gate = %self.inner.name, owner = ?owner, "Completion does not hold the claim in flight");
            return Err(FlightError::DoubleCompletion {
                owner: FlightError::owner_label(owner),
            });
        }

        self.leave_flight();
        self.inner.metrics.record_completion();
        info!(gate = %self.inner.name, owner = ?owner, "Computation completed");
        Ok(())
    }

    /// Release `ticket`'s claim without a result; the next poll retries.
    pub fn abandon(
        &self,
        owner: &K,
        ticket: FlightTicket,
        reason: impl Into<String>,
    ) -> Result<(), FlightError> {
        let reason = reason.into();
        let released = self
            .existing_slot(owner)
            .map(|slot| slot.abandon(ticket, reason.clone()))
            .unwrap_or(false);

        if !released {
            self.inner.metrics.record_rejected_completion();
            return Err(FlightError::DoubleCompletion {
                owner: FlightError::owner_label(owner),
            });
        }

        self.leave_flight();
        self.inner.metrics.record_failure();
        error!(gate = %self.inner.name, owner = ?owner, reason = %reason, "Computation failed; slot released");
        Ok(())
    }

    /// Drop the stored result so the next poll recomputes it.
    pub fn invalidate(&self, owner: &K) -> Option<A> {
        let previous = self.existing_slot(owner).and_then(|slot| slot.invalidate());
        if previous.is_some() {
            debug!(gate = %self.inner.name, owner = ?owner, "Result invalidated");
        }
        previous
    }

    /// Trigger if needed and wait for the owner's artifact, bounded by `timeout`.
    pub async fn wait_ready(&self, owner: &K, timeout: Duration) -> Result<A, FlightError> {
        let slot = self.slot(owner);
        let mut results = slot.subscribe();
        let mut failures = slot.subscribe_failures();

        if let Some(artifact) = self.poll(owner) {
            return Ok(artifact);
        }

        let owner_label = FlightError::owner_label(owner);
        let wait = async {
            loop {
                let current = results.borrow_and_update().clone();
                if let Some(artifact) = current {
                    return Ok(artifact);
                }
                tokio::select! {
                    changed = results.changed() => {
                        if changed.is_err() {
                            return Err(FlightError::WorkerFailed {
                                owner: owner_label.clone(),
                                reason: "slot dropped".to_string(),
                            });
                        }
                    }
                    changed = failures.changed() => {
                        let reason = failures.borrow_and_update().clone();
                        if let (Ok(()), Some(reason)) = (changed, reason) {
                            return Err(FlightError::WorkerFailed {
                                owner: owner_label.clone(),
                                reason,
                            });
                        }
                    }
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FlightError::Timeout {
                owner: owner_label,
                waited_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Wait until no computation is in flight for any owner.
    pub async fn wait_idle(&self, timeout: Duration) -> Result<(), FlightError> {
        let mut active = self.inner.active.subscribe();
        let drained = tokio::time::timeout(timeout, async {
            active.wait_for(|count| *count == 0).await.is_ok()
        })
        .await;

        match drained {
            Ok(true) => Ok(()),
            _ => Err(FlightError::Shutdown {
                pending: self.in_flight(),
            }),
        }
    }

    pub fn in_flight(&self) -> u64 {
        *self.inner.active.borrow()
    }

    pub fn stats(&self) -> FlightStats {
        self.inner.metrics.get_stats(self.in_flight())
    }

    pub fn owners(&self) -> Vec<K> {
        self.inner
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn existing_slot(&self, owner: &K) -> Option<Arc<ComputationSlot<A>>> {
        self.inner
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(owner)
            .cloned()
    }

    fn slot(&self, owner: &K) -> Arc<ComputationSlot<A>> {
        if let Some(slot) = self.existing_slot(owner) {
            return slot;
        }
        let mut slots = self
            .inner
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            slots
                .entry(owner.clone())
                .or_insert_with(|| Arc::new(ComputationSlot::new())),
        )
    }

    fn enter_flight(&self) -> u64 {
        let mut in_flight_now = 0;
        self.inner.active.send_modify(|count| {
            *count += 1;
            in_flight_now = *count;
        });
        in_flight_now
    }

    fn leave_flight(&self) {
        self.inner
            .active
            .send_modify(|count| *count = count.saturating_sub(1));
    }

    fn dispatch(&self, owner: K, ticket: FlightTicket) {
        let in_flight_now = self.enter_flight();
        self.inner.metrics.record_dispatch(in_flight_now);
        info!(gate = %self.inner.name, owner = ?owner, "Dispatching background computation");

        let provider = Arc::clone(&self.inner.provider);
        let worker_owner = owner.clone();
        let worker = self
            .inner
            .runtime
            .spawn_blocking(move || provider.compute(&worker_owner));

        let gate = self.clone();
        let span = create_flight_span(&self.inner.name, &FlightError::owner_label(&owner));
        self.inner.runtime.spawn(
            async move {
                match worker.await {
                    Ok(artifact) => {
                        if let Err(e) = gate.complete(&owner, ticket, artifact) {
                            error!("Worker result discarded: {}", e);
                        }
                    }
                    Err(join_error) => {
                        let reason = if join_error.is_panic() {
                            "computation panicked".to_string()
                        } else {
                            join_error.to_string()
                        };
                        if let Err(e) = gate.abandon(&owner, ticket, reason) {
                            error!("Worker failure discarded: {}", e);
                        }
                    }
                }
            }
            .instrument(span),
        );
    }
}
