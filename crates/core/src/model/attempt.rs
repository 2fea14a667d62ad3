use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ids::QuestionKey;

//
// ─── ATTEMPT RECORD ────────────────────────────────────────────────────────────
//

/// Cumulative answer history for one question identity.
///
/// Missing counters in persisted data default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    #[serde(default)]
    pub correct: u32,
    #[serde(default)]
    pub incorrect: u32,
}

impl AttemptRecord {
    #[must_use]
    pub fn new(correct: u32, incorrect: u32) -> Self {
        Self { correct, incorrect }
    }

    /// Number of times the question was answered at all.
    #[must_use]
    pub fn seen_count(&self) -> u32 {
        self.correct.saturating_add(self.incorrect)
    }

    pub fn record(&mut self, fully_correct: bool) {
        if fully_correct {
            self.correct = self.correct.saturating_add(1);
        } else {
            self.incorrect = self.incorrect.saturating_add(1);
        }
    }
}

//
// ─── ATTEMPT LEDGER ────────────────────────────────────────────────────────────
//

/// In-memory attempt history keyed by serialized question identity (`"<origin>|<id>"`).
///
/// Keys are kept as raw strings so entries for sets that are no longer loaded
/// survive a load/save cycle untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptLedger {
    records: BTreeMap<String, AttemptRecord>,
}

impl AttemptLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_records(records: BTreeMap<String, AttemptRecord>) -> Self {
        Self { records }
    }

    /// Fetch-or-default the record for `key`, bump one counter, and return the new value.
    pub fn record(&mut self, key: &str, fully_correct: bool) -> AttemptRecord {
        let entry = self.records.entry(key.to_owned()).or_default();
        entry.record(fully_correct);
        *entry
    }

    /// Typed wrapper over [`AttemptLedger::record`].
    pub fn record_answer(&mut self, key: &QuestionKey, fully_correct: bool) -> AttemptRecord {
        self.record(&key.to_string(), fully_correct)
    }

    #[must_use]
    pub fn get(&self, key: &QuestionKey) -> Option<&AttemptRecord> {
        self.records.get(&key.to_string())
    }

    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<&AttemptRecord> {
        self.records.get(key)
    }

    /// Seen count for `key`; questions without a record count as unseen.
    #[must_use]
    pub fn seen_count(&self, key: &QuestionKey) -> u32 {
        self.get(key).map_or(0, AttemptRecord::seen_count)
    }

    /// Whether `key` was ever answered incorrectly.
    #[must_use]
    pub fn has_mistakes(&self, key: &QuestionKey) -> bool {
        self.get(key).is_some_and(|r| r.incorrect > 0)
    }

    #[must_use]
    pub fn records(&self) -> &BTreeMap<String, AttemptRecord> {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
