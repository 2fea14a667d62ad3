use quiz_core::model::{
    AnswerError, AttemptLedger, IdError, Question, QuestionContent, QuestionError, QuestionId,
    SetId,
};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("i/o failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed data in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error(transparent)]
    InvalidId(#[from] IdError),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Why a single persisted question was left out of its set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecordError {
    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("id must be a string, number or boolean")]
    NonScalarId,

    #[error(transparent)]
    Label(#[from] AnswerError),

    #[error(transparent)]
    Invalid(#[from] QuestionError),
}

/// A question entry that failed to load, identified by its position in the set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedQuestion {
    pub position: usize,
    pub id: Option<String>,
    pub error: RecordError,
}

/// Result of reading one question set: valid questions in stored order plus the rejects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedSet {
    pub questions: Vec<Question>,
    pub skipped: Vec<SkippedQuestion>,
}

/// Repository contract for question sets.
pub trait QuestionSetRepository: Send + Sync {
    /// Names of every available set, in presentation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the backing location cannot be listed.
    fn list_sets(&self) -> Result<Vec<SetId>, StorageError>;

    /// Read one set. Entries that violate question invariants are reported in
    /// `LoadedSet::skipped` instead of failing the whole set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` or `StorageError::Parse` when the set as a
    /// whole cannot be read.
    fn load_set(&self, set_id: &SetId) -> Result<LoadedSet, StorageError>;

    /// Replace the text, options and correct answers of one question.
    ///
    /// The whole set is re-read and rewritten; every other entry is preserved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no entry carries `question_id`, or
    /// I/O and parse errors for the read-modify-write cycle.
    fn update_question(
        &self,
        set_id: &SetId,
        question_id: &QuestionId,
        content: &QuestionContent,
    ) -> Result<(), StorageError>;
}

/// Repository contract for the attempt ledger.
pub trait LedgerRepository: Send + Sync {
    /// Read the persisted ledger. `Ok(None)` means nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` or `StorageError::Parse` for unreadable data.
    fn load_ledger(&self) -> Result<Option<AttemptLedger>, StorageError>;

    /// Replace the persisted ledger with `ledger`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the write fails; previous contents stay intact.
    fn save_ledger(&self, ledger: &AttemptLedger) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sets: Arc<Mutex<BTreeMap<SetId, Vec<Question>>>>,
    ledger: Arc<Mutex<Option<AttemptLedger>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a whole set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the lock is poisoned.
    pub fn put_set(&self, set_id: SetId, questions: Vec<Question>) -> Result<(), StorageError> {
        let mut guard = self
            .sets
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        guard.insert(set_id, questions);
        Ok(())
    }
}

impl QuestionSetRepository for InMemoryRepository {
    fn list_sets(&self) -> Result<Vec<SetId>, StorageError> {
        let guard = self
            .sets
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(guard.keys().cloned().collect())
    }

    fn load_set(&self, set_id: &SetId) -> Result<LoadedSet, StorageError> {
        let guard = self
            .sets
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let questions = guard.get(set_id).cloned().ok_or(StorageError::NotFound)?;
        Ok(LoadedSet {
            questions,
            skipped: Vec::new(),
        })
    }

    fn update_question(
        &self,
        set_id: &SetId,
        question_id: &QuestionId,
        content: &QuestionContent,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .sets
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let question = guard
            .get_mut(set_id)
            .and_then(|set| set.iter_mut().find(|q| q.question_id() == question_id))
            .ok_or(StorageError::NotFound)?;
        question.replace_content(content.clone());
        Ok(())
    }
}

impl LedgerRepository for InMemoryRepository {
    fn load_ledger(&self) -> Result<Option<AttemptLedger>, StorageError> {
        let guard = self
            .ledger
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(guard.clone())
    }

    fn save_ledger(&self, ledger: &AttemptLedger) -> Result<(), StorageError> {
        let mut guard = self
            .ledger
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        *guard = Some(ledger.clone());
        Ok(())
    }
}

/// Aggregates question-set and ledger repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sets: Arc<dyn QuestionSetRepository>,
    pub ledger: Arc<dyn LedgerRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(InMemoryRepository::new())
    }

    #[must_use]
    pub fn from_in_memory(repo: InMemoryRepository) -> Self {
        let sets: Arc<dyn QuestionSetRepository> = Arc::new(repo.clone());
        let ledger: Arc<dyn LedgerRepository> = Arc::new(repo);
        Self { sets, ledger }
    }
}
