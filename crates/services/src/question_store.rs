use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use log::{debug, warn};
use quiz_core::model::{Question, QuestionDraft, QuestionKey, SetId};
use storage::repository::{QuestionSetRepository, SkippedQuestion, StorageError};

use crate::error::QuestionStoreError;

/// A set that could not be read at all.
#[derive(Debug)]
pub struct SetLoadFailure {
    pub set_id: SetId,
    pub error: StorageError,
}

/// Everything that went wrong while loading, without stopping the load.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub failed_sets: Vec<SetLoadFailure>,
    pub skipped_questions: Vec<(SetId, SkippedQuestion)>,
    /// Keys shared by more than one question; such questions share one attempt record.
    pub duplicate_keys: Vec<QuestionKey>,
}

impl LoadReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed_sets.is_empty()
            && self.skipped_questions.is_empty()
            && self.duplicate_keys.is_empty()
    }
}

/// Canonical questions grouped by origin set.
///
/// Sessions receive clones; nothing here is mutated except through
/// [`QuestionStore::update_question`].
#[derive(Clone)]
pub struct QuestionStore {
    repo: Arc<dyn QuestionSetRepository>,
    sets: BTreeMap<SetId, Vec<Question>>,
}

impl QuestionStore {
    /// Discover every set in the repository and load it.
    ///
    /// # Errors
    ///
    /// Returns `QuestionStoreError::Storage` only when the set listing itself fails.
    /// Failures of individual sets are collected in the `LoadReport`.
    pub fn load(
        repo: Arc<dyn QuestionSetRepository>,
    ) -> Result<(Self, LoadReport), QuestionStoreError> {
        let set_ids = repo.list_sets()?;
        Ok(Self::load_sets(repo, &set_ids))
    }

    /// Load the given sets, continuing past sets that fail to parse.
    #[must_use]
    pub fn load_sets(repo: Arc<dyn QuestionSetRepository>, set_ids: &[SetId]) -> (Self, LoadReport) {
        let mut sets = BTreeMap::new();
        let mut report = LoadReport::default();
        let mut seen_keys = HashSet::new();

        for set_id in set_ids {
            let loaded = match repo.load_set(set_id) {
                Ok(loaded) => loaded,
                Err(error) => {
                    warn!("skipping question set {set_id}: {error}");
                    report.failed_sets.push(SetLoadFailure {
                        set_id: set_id.clone(),
                        error,
                    });
                    continue;
                }
            };

            for skipped in loaded.skipped {
                warn!(
                    "skipping question #{} (id {}) in {set_id}: {}",
                    skipped.position + 1,
                    skipped.id.as_deref().unwrap_or("none"),
                    skipped.error
                );
                report.skipped_questions.push((set_id.clone(), skipped));
            }

            for question in &loaded.questions {
                if !seen_keys.insert(question.key().clone()) {
                    warn!("duplicate question identity {}", question.key());
                    report.duplicate_keys.push(question.key().clone());
                }
            }

            debug!("loaded {} questions from {set_id}", loaded.questions.len());
            sets.insert(set_id.clone(), loaded.questions);
        }

        (Self { repo, sets }, report)
    }

    pub fn set_ids(&self) -> impl Iterator<Item = &SetId> {
        self.sets.keys()
    }

    #[must_use]
    pub fn questions(&self, set_id: &SetId) -> Option<&[Question]> {
        self.sets.get(set_id).map(Vec::as_slice)
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.sets.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_questions() == 0
    }

    /// Independent copy of one set's questions.
    ///
    /// # Errors
    ///
    /// Returns `QuestionStoreError::UnknownSet` if the set was not loaded.
    pub fn pool_for_set(&self, set_id: &SetId) -> Result<Vec<Question>, QuestionStoreError> {
        self.questions(set_id)
            .map(<[Question]>::to_vec)
            .ok_or_else(|| QuestionStoreError::UnknownSet(set_id.clone()))
    }

    /// Union of the chosen sets, in first-seen order; repeated sets count once.
    ///
    /// # Errors
    ///
    /// Returns `QuestionStoreError::NoSetsSelected` for an empty selection and
    /// `QuestionStoreError::UnknownSet` for a set that was not loaded.
    pub fn pool_for_sets(&self, set_ids: &[SetId]) -> Result<Vec<Question>, QuestionStoreError> {
        if set_ids.is_empty() {
            return Err(QuestionStoreError::NoSetsSelected);
        }
        let mut seen = HashSet::new();
        let mut pool = Vec::new();
        for set_id in set_ids.iter().filter(|id| seen.insert(*id)) {
            pool.extend(self.pool_for_set(set_id)?);
        }
        Ok(pool)
    }

    /// Every loaded question, set by set.
    #[must_use]
    pub fn pool_all(&self) -> Vec<Question> {
        self.sets.values().flatten().cloned().collect()
    }

    /// Validate `draft` and write it over the question identified by `key`.
    ///
    /// The backing set is rewritten as a whole; the in-memory copy follows only
    /// after the write succeeded.
    ///
    /// # Errors
    ///
    /// Returns `QuestionStoreError::Validation` for an invalid draft,
    /// `QuestionStoreError::NotFound` if the id vanished from the set, and
    /// `QuestionStoreError::Storage` for read/write failures.
    pub fn update_question(
        &mut self,
        key: &QuestionKey,
        draft: QuestionDraft,
    ) -> Result<Question, QuestionStoreError> {
        let content = draft.validate()?;

        self.repo
            .update_question(key.set_id(), key.question_id(), &content)
            .map_err(|err| match err {
                StorageError::NotFound => QuestionStoreError::NotFound(key.clone()),
                other => QuestionStoreError::Storage(other),
            })?;

        let updated = self
            .sets
            .get_mut(key.set_id())
            .and_then(|set| set.iter_mut().find(|q| q.key() == key))
            .ok_or_else(|| QuestionStoreError::NotFound(key.clone()))?;
        updated.replace_content(content);
        debug!("updated question {key}");
        Ok(updated.clone())
    }
}

impl std::fmt::Debug for QuestionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionStore")
            .field("sets", &self.sets.len())
            .field("questions", &self.total_questions())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
