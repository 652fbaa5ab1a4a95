//! Nullable event log — thread-safe in-memory log for testing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use swarm_store::{EventLog, SequencedEvent, StoreError, SwarmEvent};

/// An in-memory append-only log.
///
/// `fail_appends(true)` makes every subsequent append fail without recording
/// anything, which lets tests check that engine operations roll back cleanly.
#[derive(Default)]
pub struct NullEventLog {
    events: Mutex<Vec<SwarmEvent>>,
    failing: AtomicBool,
}

impl NullEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the log with events, e.g. to test replay.
    pub fn with_events(events: Vec<SwarmEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            failing: AtomicBool::new(false),
        }
    }

    /// Toggle append failure injection.
    pub fn fail_appends(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    /// A copy of everything recorded so far.
    pub fn events(&self) -> Vec<SwarmEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventLog for NullEventLog {
    fn append(&self, events: &[SwarmEvent]) -> Result<u64, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("append failure injected".into()));
        }
        let mut log = self.events.lock().unwrap();
        log.extend_from_slice(events);
        Ok(log.len() as u64)
    }

    fn read_all(&self) -> Result<Vec<SequencedEvent>, StoreError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, event)| SequencedEvent {
                sequence: i as u64 + 1,
                event: event.clone(),
            })
            .collect())
    }

    fn len(&self) -> Result<u64, StoreError> {
        Ok(self.events.lock().unwrap().len() as u64)
    }
}
