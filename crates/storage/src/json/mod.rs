use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::repository::{LedgerRepository, QuestionSetRepository, Storage};

mod atomic;
mod ledger_repo;
mod mapping;
mod question_set_repo;

/// File extension of question-set files.
pub const SET_EXTENSION: &str = "json";

/// File-backed repository: one JSON file per question set plus one ledger file.
#[derive(Debug, Clone)]
pub struct JsonRepository {
    sets_dir: PathBuf,
    ledger_path: PathBuf,
}

impl JsonRepository {
    #[must_use]
    pub fn new(sets_dir: impl Into<PathBuf>, ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            sets_dir: sets_dir.into(),
            ledger_path: ledger_path.into(),
        }
    }

    #[must_use]
    pub fn sets_dir(&self) -> &Path {
        &self.sets_dir
    }

    #[must_use]
    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }
}

impl Storage {
    /// Build a `Storage` backed by JSON files.
    ///
    /// Nothing is touched on disk until the first read or write.
    #[must_use]
    pub fn json(sets_dir: impl Into<PathBuf>, ledger_path: impl Into<PathBuf>) -> Self {
        let repo = JsonRepository::new(sets_dir, ledger_path);
        let sets: Arc<dyn QuestionSetRepository> = Arc::new(repo.clone());
        let ledger: Arc<dyn LedgerRepository> = Arc::new(repo);
        Self { sets, ledger }
    }
}
