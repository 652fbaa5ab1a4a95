//! LMDB implementation of `EventLog`.

use std::path::Path;

use heed::byteorder::BigEndian;
use heed::types::{Bytes, U64};
use heed::{Database, Env, EnvOpenOptions};

use swarm_store::{EventLog, SequencedEvent, StoreError, SwarmEvent};

use crate::LmdbError;

const EVENTS_DB: &str = "events";

/// Append-only event log in a single LMDB database.
pub struct LmdbEventLog {
    env: Env,
    events: Database<U64<BigEndian>, Bytes>,
}

impl LmdbEventLog {
    /// Open or create an event log in the directory `path`.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        let mut options = EnvOpenOptions::new();
        options.map_size(map_size).max_dbs(1);
        // SAFETY: the environment directory is owned by this process; it is
        // never opened twice in the same process.
        let env = unsafe { options.open(path)? };

        let mut wtxn = env.write_txn()?;
        let events = env.create_database(&mut wtxn, Some(EVENTS_DB))?;
        wtxn.commit()?;

        tracing::info!(path = %path.display(), "opened LMDB event log");
        Ok(Self { env, events })
    }

    fn append_batch(&self, batch: &[SwarmEvent]) -> Result<u64, LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        let mut sequence = match self.events.last(&wtxn)? {
            Some((last, _)) => last,
            None => 0,
        };
        for event in batch {
            sequence += 1;
            let bytes = bincode::serialize(event)?;
            self.events.put(&mut wtxn, &sequence, bytes.as_slice())?;
        }
        wtxn.commit()?;
        Ok(sequence)
    }

    fn read_events(&self) -> Result<Vec<SequencedEvent>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        let mut out = Vec::new();
        for entry in self.events.iter(&rtxn)? {
            let (sequence, bytes) = entry?;
            let expected = out.len() as u64 + 1;
            if sequence != expected {
                return Err(LmdbError::SequenceGap {
                    expected,
                    found: sequence,
                });
            }
            let event: SwarmEvent = bincode::deserialize(bytes)?;
            out.push(SequencedEvent { sequence, event });
        }
        Ok(out)
    }
}

impl EventLog for LmdbEventLog {
    fn append(&self, events: &[SwarmEvent]) -> Result<u64, StoreError> {
        let last = self.append_batch(events)?;
        tracing::trace!(count = events.len(), last, "appended events");
        Ok(last)
    }

    fn read_all(&self) -> Result<Vec<SequencedEvent>, StoreError> {
        Ok(self.read_events()?)
    }

    fn len(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.events.len(&rtxn).map_err(LmdbError::from)?)
    }
}
