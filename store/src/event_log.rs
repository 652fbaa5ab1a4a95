//! The append-only log trait.

use crate::{StoreError, SwarmEvent};

/// An event together with its position in the log (1-based, gap-free).
#[derive(Clone, Debug, PartialEq)]
pub struct SequencedEvent {
    pub sequence: u64,
    pub event: SwarmEvent,
}

/// Durable, append-only record of engine events.
///
/// Implementations must be safe to share between threads and must make each
/// `append` call atomic: either every event of the batch becomes visible, or
/// none does.
pub trait EventLog: Send + Sync {
    /// Append a batch of events. Returns the sequence number of the last one.
    fn append(&self, events: &[SwarmEvent]) -> Result<u64, StoreError>;

    /// Read every event in append order.
    fn read_all(&self) -> Result<Vec<SequencedEvent>, StoreError>;

    /// Number of events recorded so far.
    fn len(&self) -> Result<u64, StoreError>;

    /// Whether nothing has been recorded yet.
    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}
