use std::path::PathBuf;
use std::sync::Arc;

use log::info;
use quiz_core::model::QuizSettings;
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::ledger_service::LedgerService;
use crate::question_store::{LoadReport, QuestionStore};
use crate::sessions::SessionLoopService;

/// Assembles the services a front-end needs from one storage backend.
#[derive(Debug)]
pub struct AppServices {
    session_loop: SessionLoopService,
}

impl AppServices {
    /// Build services backed by JSON question sets in `sets_dir` and the
    /// attempt ledger at `ledger_path`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the question-set directory cannot be listed.
    pub fn new_json(
        sets_dir: impl Into<PathBuf>,
        ledger_path: impl Into<PathBuf>,
        settings: QuizSettings,
        clock: Clock,
    ) -> Result<(Self, LoadReport), AppServicesError> {
        Self::from_storage(&Storage::json(sets_dir, ledger_path), settings, clock)
    }

    /// Build services on top of an already assembled `Storage`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the set listing fails. Broken individual
    /// sets and questions are reported in the returned `LoadReport` instead.
    pub fn from_storage(
        storage: &Storage,
        settings: QuizSettings,
        clock: Clock,
    ) -> Result<(Self, LoadReport), AppServicesError> {
        let (store, report) = QuestionStore::load(Arc::clone(&storage.sets))?;
        info!(
            "loaded {} questions from {} sets",
            store.total_questions(),
            store.set_ids().count()
        );
        let ledger_service = LedgerService::new(Arc::clone(&storage.ledger));
        let session_loop = SessionLoopService::new(clock, settings, store, ledger_service);
        Ok((Self { session_loop }, report))
    }

    #[must_use]
    pub fn session_loop(&self) -> &SessionLoopService {
        &self.session_loop
    }

    pub fn session_loop_mut(&mut self) -> &mut SessionLoopService {
        &mut self.session_loop
    }

    #[must_use]
    pub fn into_session_loop(self) -> SessionLoopService {
        self.session_loop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerSet, Question, QuestionContent, QuestionId, SetId};
    use quiz_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    #[test]
    fn in_memory_storage_wires_store_and_ledger() {
        let repo = InMemoryRepository::new();
        let content = QuestionContent::from_persisted(
            "Q".into(),
            vec!["a".into()],
            AnswerSet::parse_letters("A").unwrap(),
        )
        .unwrap();
        let set = SetId::new("only").unwrap();
        repo.put_set(
            set.clone(),
            vec![Question::new(set, QuestionId::new("1"), content, None)],
        )
        .unwrap();

        let (services, report) = AppServices::from_storage(
            &Storage::from_in_memory(repo),
            QuizSettings::default(),
            fixed_clock(),
        )
        .unwrap();

        assert!(report.is_clean());
        assert_eq!(services.session_loop().store().total_questions(), 1);
        assert!(services.session_loop().ledger().is_empty());
    }
}
