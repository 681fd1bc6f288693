//! One elevator as the registry holds it: the aggregate lock plus everything the dispatch loop
//! needs next to it (dispatching flag, epoch, event stream, clock, store queue).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, MutexGuard};

use crate::config::{self, Timing};
use crate::elevator_logic::timer::SharedClock;
use crate::model::{ElevatorEvent, ElevatorId, ElevatorState, EventKind};
use crate::persistence::{Persister, StatusHistoryEntry, StoreEvent};
use crate::print;

/// Hands out ids for stops, passengers and requests. Shared by every elevator of a registry.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Starts counting at 1.
    pub fn new() -> Self {
        Self { next: AtomicU64::new(1) }
    }

    /// A fresh id.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to one elevator.
pub struct ElevatorHandle {
    id: ElevatorId,
    state: Mutex<ElevatorState>,
    dispatching: AtomicBool,
    epoch: AtomicU64,
    seq: AtomicU64,
    events: broadcast::Sender<ElevatorEvent>,
    clock: SharedClock,
    persister: Persister,
    timing: Timing,
    ids: Arc<IdGenerator>,
}

impl ElevatorHandle {
    pub(crate) fn new(
        id: ElevatorId,
        max_capacity: u32,
        clock: SharedClock,
        persister: Persister,
        timing: Timing,
        ids: Arc<IdGenerator>,
    ) -> Self {
        let (events, _) = broadcast::channel(config::EVENT_CHANNEL_CAPACITY);
        Self {
            id,
            state: Mutex::new(ElevatorState::new(id, max_capacity)),
            dispatching: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            seq: AtomicU64::new(0),
            events,
            clock,
            persister,
            timing,
            ids,
        }
    }

    /// Registry id of the elevator.
    pub fn id(&self) -> ElevatorId {
        self.id
    }

    /// Locks the aggregate.
    pub async fn lock(&self) -> MutexGuard<'_, ElevatorState> {
        self.state.lock().await
    }

    /// Locks the aggregate and runs `f` on it, unless a reset happened since `epoch` was read.
    pub async fn update<R>(&self, epoch: u64, f: impl FnOnce(&mut ElevatorState) -> R) -> Option<R> {
        let mut state = self.state.lock().await;
        if !self.is_current(epoch) {
            return None;
        }
        Some(f(&mut state))
    }

    /// Current reset generation.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// `false` once the elevator was reset after `epoch` was read.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch() == epoch
    }

    /// Whether a dispatch loop is running.
    pub fn is_dispatching(&self) -> bool {
        self.dispatching.load(Ordering::SeqCst)
    }

    /// Claims the dispatch loop. Only one caller sees `true` until [Self::end_dispatch].
    ///
    /// Takes the locked aggregate so the flag only ever flips under the lock.
    pub fn try_begin_dispatch(&self, _locked: &ElevatorState) -> bool {
        self.dispatching
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Releases the dispatch loop.
    pub fn end_dispatch(&self, _locked: &ElevatorState) {
        self.dispatching.store(false, Ordering::SeqCst);
    }

    /// Starts a new generation: any loop of the old one stops at its next check.
    pub(crate) fn invalidate(&self, _locked: &ElevatorState) -> u64 {
        self.dispatching.store(false, Ordering::SeqCst);
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Delays for this elevator.
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Clock driving this elevator.
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Current clock time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// A fresh stop/passenger/request id.
    pub fn next_id(&self) -> u64 {
        self.ids.next()
    }

    /// A receiver for every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ElevatorEvent> {
        self.events.subscribe()
    }

    /// Queues a store write.
    pub fn record(&self, event: StoreEvent) {
        self.persister.record(event);
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Broadcasts an event, traces it and queues it for the store.
    pub fn publish(&self, floor: i32, kind: EventKind) {
        let event = ElevatorEvent {
            elevator_id: self.id,
            seq: self.next_seq(),
            at_ms: self.now_ms(),
            floor,
            kind,
        };
        print::elevator(&event);
        // No subscribers is fine
        let _ = self.events.send(event.clone());
        self.record(StoreEvent::Event(event));
    }

    /// Queues a snapshot of `state` and a status-history row.
    pub fn record_state(&self, state: &ElevatorState) {
        let e = &state.elevator;
        self.record(StoreEvent::StatusHistory(StatusHistoryEntry {
            elevator_id: self.id,
            seq: self.next_seq(),
            at_ms: self.now_ms(),
            floor: e.current_floor,
            direction: e.direction,
            behaviour: e.behaviour,
        }));
        self.record(StoreEvent::ElevatorSnapshot(state.status()));
    }
}

impl std::fmt::Debug for ElevatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevatorHandle")
            .field("id", &self.id)
            .field("dispatching", &self.is_dispatching())
            .field("epoch", &self.epoch())
            .finish_non_exhaustive()
    }
}
