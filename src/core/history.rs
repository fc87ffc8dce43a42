//! The append-only per-step state log.
//!
//! Every simulation step produces one opaque state record. The sync controller
//! is the only writer; it fetches records in `[len, reported_step]` ranges so
//! the log stays contiguous and the server remains the source of truth for
//! what is "new".

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One full state snapshot for a single simulation step.
///
/// The `step` tag is server-assigned (zero-based, contiguous); everything else
/// is an arbitrary nested record addressed by chart bindings via key-paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: u64,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

impl StepRecord {
    /// Resolve a dotted key-path against this record's fields.
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        let mut segments = path.splitn(2, '.');
        let first = segments.next()?;
        let node = self.fields.get(first)?;
        match segments.next() {
            Some(rest) => crate::keypath::resolve(node, rest),
            None => Some(node),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("non-contiguous history batch: expected step {expected}, got {got}")]
    NonContiguous { expected: u64, got: u64 },
}

/// Ordered, append-only sequence of [`StepRecord`], indexed by step.
///
/// Invariant: `log[i].step == i`; the length equals the highest known step + 1.
#[derive(Debug, Default)]
pub struct HistoryLog {
    records: Vec<StepRecord>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The next step the log expects, i.e. the `from` of the next range fetch.
    pub fn next_step(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn get(&self, step: u64) -> Option<&StepRecord> {
        self.records.get(step as usize)
    }

    /// Append a fetched batch, enforcing contiguity.
    ///
    /// The batch must start at `next_step()` and be consecutive. A violating
    /// batch is rejected wholesale; the log is never left partially extended.
    pub fn extend(&mut self, records: Vec<StepRecord>) -> Result<usize, HistoryError> {
        let mut expected = self.next_step();
        for r in &records {
            if r.step != expected {
                return Err(HistoryError::NonContiguous {
                    expected,
                    got: r.step,
                });
            }
            expected += 1;
        }
        let appended = records.len();
        self.records.extend(records);
        Ok(appended)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
