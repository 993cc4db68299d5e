// Per-owner computation slot
//
// One word holds both the phase and the generation of the current claim.
// Triggering is IDLE -> RUNNING with a fresh generation; completion is
// RUNNING -> COMPLETING -> IDLE and only succeeds for the generation that
// claimed the slot. The result lives in a watch channel so waiters can await
// the handoff.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

const IDLE: u64 = 0;
const RUNNING: u64 = 1;
const COMPLETING: u64 = 2;
const PHASE_BITS: u32 = 2;
const PHASE_MASK: u64 = (1 << PHASE_BITS) - 1;

fn pack(generation: u64, phase: u64) -> u64 {
    (generation << PHASE_BITS) | phase
}

/// Proof of having claimed a slot; only its holder may complete or abandon
/// that claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlightTicket {
    generation: u64,
}

impl FlightTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Outcome of polling a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotPoll<A> {
    /// A completed artifact is available
    Ready(A),
    /// This caller won the trigger and must dispatch the computation
    Dispatch(FlightTicket),
    /// A computation is already running for this slot
    Pending,
}

#[derive(Debug)]
pub struct ComputationSlot<A> {
    state: AtomicU64,
    result: watch::Sender<Option<A>>,
    failure: watch::Sender<Option<String>>,
}

impl<A: Clone> Default for ComputationSlot<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Clone> ComputationSlot<A> {
    pub fn new() -> Self {
        let (result, _) = watch::channel(None);
        let (failure, _) = watch::channel(None);
        Self {
            state: AtomicU64::new(pack(0, IDLE)),
            result,
            failure,
        }
    }

    /// Read the result, claiming the trigger if there is none and nothing runs.
    pub fn poll(&self) -> SlotPoll<A> {
        if let Some(artifact) = self.peek() {
            return SlotPoll::Ready(artifact);
        }

        match self.claim() {
            None => SlotPoll::Pending,
            Some(ticket) => {
                // A completion may have landed between the read above and the claim.
                if let Some(artifact) = self.peek() {
                    self.state
                        .store(pack(ticket.generation, IDLE), Ordering::Release);
                    return SlotPoll::Ready(artifact);
                }
                SlotPoll::Dispatch(ticket)
            }
        }
    }

    /// Claim the slot whether or not a result is stored.
    pub fn claim(&self) -> Option<FlightTicket> {
        let current = self.state.load(Ordering::Acquire);
        if current & PHASE_MASK != IDLE {
            return None;
        }
        let generation = (current >> PHASE_BITS) + 1;
        self.state
            .compare_exchange(
                current,
                pack(generation, RUNNING),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| FlightTicket { generation })
    }

    /// Hand the artifact over and release the slot.
    ///
    /// Returns `false` unless `ticket` holds the running claim, which callers
    /// treat as a double completion.
    pub fn complete(&self, ticket: FlightTicket, artifact: A) -> bool {
        if self
            .state
            .compare_exchange(
                pack(ticket.generation, RUNNING),
                pack(ticket.generation, COMPLETING),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }
        self.result.send_replace(Some(artifact));
        self.failure.send_if_modified(|failure| failure.take().is_some());
        self.state
            .store(pack(ticket.generation, IDLE), Ordering::Release);
        true
    }

    /// Release a running claim without a result so the next poll retries.
    pub fn abandon(&self, ticket: FlightTicket, reason: impl Into<String>) -> bool {
        if self
            .state
            .compare_exchange(
                pack(ticket.generation, RUNNING),
                pack(ticket.generation, IDLE),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }
        self.failure.send_replace(Some(reason.into()));
        true
    }

    /// Reason the most recent claim failed, cleared by the next completion
    pub fn last_failure(&self) -> Option<String> {
        self.failure.borrow().clone()
    }

    pub fn subscribe_failures(&self) -> watch::Receiver<Option<String>> {
        self.failure.subscribe()
    }

    pub fn peek(&self) -> Option<A> {
        self.result.borrow().clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.load(Ordering::Acquire) & PHASE_MASK != IDLE
    }

    pub fn invalidate(&self) -> Option<A> {
        self.result.send_replace(None)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<A>> {
        self.result.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatched<A: Clone + std::fmt::Debug>(slot: &ComputationSlot<A>) -> FlightTicket {
        match slot.poll() {
            SlotPoll::Dispatch(ticket) => ticket,
            other => panic!("expected to win the trigger, got {other:?}"),
        }
    }

    #[test]
    fn test_first_poll_claims_the_trigger() {
        let slot: ComputationSlot<u32> = ComputationSlot::new();

        dispatched(&slot);
        assert!(slot.is_in_flight());
        assert_eq!(slot.poll(), SlotPoll::Pending);
        assert_eq!(slot.poll(), SlotPoll::Pending);
        assert_eq!(slot.claim(), None);
    }

    #[test]
    fn test_complete_publishes_and_releases() {
        let slot = ComputationSlot::new();
        let ticket = dispatched(&slot);

        assert!(slot.complete(ticket, 7u32));
        assert!(!slot.is_in_flight());
        assert_eq!(slot.poll(), SlotPoll::Ready(7));
        assert_eq!(slot.peek(), Some(7));
    }

    #[test]
    fn test_second_completion_with_same_ticket_is_rejected() {
        let slot = ComputationSlot::new();
        let ticket = dispatched(&slot);

        assert!(slot.complete(ticket, 2u32));
        assert!(!slot.complete(ticket, 3));
        assert_eq!(slot.peek(), Some(2));
    }

    #[test]
    fn test_stale_ticket_cannot_complete_a_newer_claim() {
        let slot = ComputationSlot::new();
        let first = dispatched(&slot);
        assert!(slot.abandon(first, "worker lost"));

        let second = dispatched(&slot);
        assert_ne!(first, second);
        assert!(!slot.complete(first, 1u32));
        assert!(!slot.abandon(first, "late"));
        assert!(slot.is_in_flight());

        assert!(slot.complete(second, 2));
        assert_eq!(slot.peek(), Some(2));
    }

    #[test]
    fn test_invalidate_allows_a_new_trigger() {
        let slot = ComputationSlot::new();
        let ticket = dispatched(&slot);
        assert!(slot.complete(ticket, 1u32));

        assert_eq!(slot.invalidate(), Some(1));
        let next = dispatched(&slot);
        assert_eq!(next.generation(), ticket.generation() + 1);
    }

    #[test]
    fn test_invalidate_while_running_keeps_the_claim() {
        let slot: ComputationSlot<u32> = ComputationSlot::new();
        let ticket = dispatched(&slot);

        assert_eq!(slot.invalidate(), None);
        assert_eq!(slot.poll(), SlotPoll::Pending);
        assert!(slot.complete(ticket, 5));
    }

    #[test]
    fn test_abandon_releases_without_result() {
        let slot: ComputationSlot<u32> = ComputationSlot::new();
        let ticket = dispatched(&slot);

        assert!(slot.abandon(ticket, "provider panicked"));
        assert!(!slot.is_in_flight());
        assert!(!slot.abandon(ticket, "again"));
        assert_eq!(slot.last_failure().as_deref(), Some("provider panicked"));
        dispatched(&slot);
    }

    #[test]
    fn test_success_clears_previous_failure() {
        let slot: ComputationSlot<u32> = ComputationSlot::new();
        let failed = dispatched(&slot);
        assert!(slot.abandon(failed, "provider panicked"));

        let retry = dispatched(&slot);
        assert!(slot.complete(retry, 9));
        assert_eq!(slot.last_failure(), None);
    }
}
