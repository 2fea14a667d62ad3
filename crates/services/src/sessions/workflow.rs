use log::{debug, info};
use rand::Rng;
use rand::seq::SliceRandom;

use quiz_core::model::{
    AnswerSet, AttemptLedger, Question, QuestionDraft, QuestionKey, QuizSettings, SessionSummary,
};

use super::plan::{SessionSource, incorrect_only, select_subset_with_rng};
use super::service::{AnswerOutcome, QuizSession, SessionStep};
use crate::Clock;
use crate::error::{LedgerError, QuestionStoreError, SessionError};
use crate::ledger_service::LedgerService;
use crate::question_store::QuestionStore;

/// Final result of a completed session.
///
/// A failed ledger save never discards the summary; it is reported next to it.
#[derive(Debug)]
pub struct SessionReport {
    pub summary: SessionSummary,
    pub save_warning: Option<LedgerError>,
}

/// Result of moving past a graded question.
#[derive(Debug)]
pub enum SessionAdvance {
    Next,
    Completed(SessionReport),
}

/// Orchestrates session start, answering, and ledger persistence.
///
/// Owns the question store and the single in-memory attempt ledger; sessions
/// are handed out by value and passed back in for every step.
pub struct SessionLoopService {
    clock: Clock,
    settings: QuizSettings,
    store: QuestionStore,
    ledger: AttemptLedger,
    ledger_service: LedgerService,
    /// Attempts recorded since the last successful save.
    unsaved: bool,
}

impl SessionLoopService {
    /// Build the service and load the persisted ledger (empty when missing or unreadable).
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: QuizSettings,
        store: QuestionStore,
        ledger_service: LedgerService,
    ) -> Self {
        let ledger = ledger_service.load();
        Self {
            clock,
            settings,
            store,
            ledger,
            ledger_service,
            unsaved: false,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: QuizSettings) {
        self.settings = settings;
    }

    #[must_use]
    pub fn store(&self) -> &QuestionStore {
        &self.store
    }

    #[must_use]
    pub fn ledger(&self) -> &AttemptLedger {
        &self.ledger
    }

    /// Whether the in-memory ledger holds attempts the last save did not cover.
    #[must_use]
    pub fn has_unsaved_attempts(&self) -> bool {
        self.unsaved
    }

    /// Start a new session for `source`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NothingToReview` when a mistakes session has no
    /// candidates, `SessionError::Empty` when the pool is empty, and
    /// `SessionError::Store` for unknown or missing set selections.
    pub fn start_session(&self, source: SessionSource) -> Result<QuizSession, SessionError> {
        self.start_session_with_rng(source, &mut rand::rng())
    }

    /// [`SessionLoopService::start_session`] with a caller-provided random source.
    ///
    /// # Errors
    ///
    /// Same as [`SessionLoopService::start_session`].
    pub fn start_session_with_rng<R: Rng + ?Sized>(
        &self,
        source: SessionSource,
        rng: &mut R,
    ) -> Result<QuizSession, SessionError> {
        let questions = self.build_pool(&source, rng)?;
        debug!("starting {source:?} session with {} questions", questions.len());
        QuizSession::start_with_rng(
            source,
            questions,
            self.settings.shuffle_options(),
            self.clock.now(),
            rng,
        )
    }

    fn build_pool<R: Rng + ?Sized>(
        &self,
        source: &SessionSource,
        rng: &mut R,
    ) -> Result<Vec<Question>, SessionError> {
        let count = self.settings.question_count() as usize;
        let pool = match source {
            SessionSource::Set(set_id) => self.store.pool_for_set(set_id)?,
            SessionSource::Sets(set_ids) => self.store.pool_for_sets(set_ids)?,
            SessionSource::All => self.store.pool_all(),
            SessionSource::Mistakes => {
                let mut mistakes = incorrect_only(&self.store.pool_all(), &self.ledger);
                if mistakes.is_empty() {
                    return Err(SessionError::NothingToReview);
                }
                mistakes.shuffle(rng);
                return Ok(mistakes);
            }
        };
        Ok(select_subset_with_rng(pool, count, &self.ledger, rng))
    }

    /// Start over with the same source and a fresh selection.
    ///
    /// # Errors
    ///
    /// Same as [`SessionLoopService::start_session`].
    pub fn restart(&self, session: &QuizSession) -> Result<QuizSession, SessionError> {
        self.start_session(session.source().clone())
    }

    /// Grade an answer for the current question and count it in the ledger.
    ///
    /// # Errors
    ///
    /// Propagates `SessionError` from [`QuizSession::submit_answer`].
    pub fn submit_answer(
        &mut self,
        session: &mut QuizSession,
        selected: &AnswerSet,
    ) -> Result<AnswerOutcome, SessionError> {
        let outcome = session.submit_answer(&mut self.ledger, selected)?.clone();
        self.unsaved = true;
        debug!(
            "answered {} ({})",
            outcome.key,
            if outcome.is_correct { "correct" } else { "incorrect" }
        );
        Ok(outcome)
    }

    /// Move past the graded question; on the last one, persist the ledger.
    ///
    /// # Errors
    ///
    /// Propagates `SessionError` from [`QuizSession::advance`]. A failed ledger
    /// save is not an error; it is carried in the [`SessionReport`]. The ledger
    /// is flushed whenever the session ends up completed.
    pub fn advance(&mut self, session: &mut QuizSession) -> Result<SessionAdvance, SessionError> {
        let step = session.advance(self.clock.now());
        let save_warning = if session.is_complete() {
            self.flush_ledger().err()
        } else {
            None
        };
        match step? {
            SessionStep::Next => Ok(SessionAdvance::Next),
            SessionStep::Completed(summary) => {
                info!(
                    "session complete: {}/{} ({}%) in {}",
                    summary.score(),
                    summary.total(),
                    summary.percentage(),
                    summary.elapsed()
                );
                Ok(SessionAdvance::Completed(SessionReport {
                    summary,
                    save_warning,
                }))
            }
        }
    }

    /// Abandon `session`, persisting every attempt not saved yet.
    ///
    /// Attempts left over from an earlier failed save are retried here too.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Save` if the flush failed; recorded attempts stay in memory.
    pub fn abort(&mut self, session: QuizSession) -> Result<(), LedgerError> {
        debug!(
            "aborted session after {} answers",
            session.progress().answered
        );
        if !self.unsaved {
            return Ok(());
        }
        self.flush_ledger()
    }

    /// Edit the question currently shown, in the store and in the session copy.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` when no question is shown, and
    /// `SessionError::Store` for validation or persistence failures.
    pub fn edit_current_question(
        &mut self,
        session: &mut QuizSession,
        draft: QuestionDraft,
    ) -> Result<Question, SessionError> {
        let key = session
            .current_question()
            .map(|q| q.key().clone())
            .ok_or(SessionError::Completed)?;
        let updated = self.store.update_question(&key, draft)?;
        session.replace_current_content(&key, updated.content());
        Ok(updated)
    }

    /// Edit any loaded question outside of a session.
    ///
    /// # Errors
    ///
    /// Propagates `QuestionStoreError` from [`QuestionStore::update_question`].
    pub fn update_question(
        &mut self,
        key: &QuestionKey,
        draft: QuestionDraft,
    ) -> Result<Question, QuestionStoreError> {
        self.store.update_question(key, draft)
    }

    /// Persist the in-memory ledger.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Save` on failure; the attempts stay marked unsaved.
    pub fn flush_ledger(&mut self) -> Result<(), LedgerError> {
        self.ledger_service.save(&self.ledger)?;
        self.unsaved = false;
        Ok(())
    }
}

impl std::fmt::Debug for SessionLoopService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLoopService")
            .field("clock", &self.clock)
            .field("settings", &self.settings)
            .field("store", &self.store)
            .field("ledger_records", &self.ledger.len())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AttemptRecord, QuestionContent, QuestionId, SetId};
    use quiz_core::time::fixed_clock;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::{Arc, Mutex};
    use storage::repository::{InMemoryRepository, LedgerRepository, StorageError};

    fn build_question(set: &str, id: &str) -> Question {
        let content = QuestionContent::from_persisted(
            format!("{set} Q{id}"),
            vec!["a".into(), "b".into(), "c".into()],
            AnswerSet::parse_letters("A").unwrap(),
        )
        .unwrap();
        Question::new(SetId::new(set).unwrap(), QuestionId::new(id), content, None)
    }

    fn seeded_repo() -> Arc<InMemoryRepository> {
        let repo = InMemoryRepository::new();
        for set in ["setA", "setB"] {
            let questions = (1..=4).map(|id| build_question(set, &id.to_string())).collect();
            repo.put_set(SetId::new(set).unwrap(), questions).unwrap();
        }
        Arc::new(repo)
    }

    fn service_with(repo: Arc<InMemoryRepository>, count: u32) -> SessionLoopService {
        let (store, _) = QuestionStore::load(repo.clone()).unwrap();
        SessionLoopService::new(
            fixed_clock(),
            QuizSettings::new(count, false).unwrap(),
            store,
            LedgerService::new(repo),
        )
    }

    fn answer(letters: &str) -> AnswerSet {
        AnswerSet::parse_letters(letters).unwrap()
    }

    fn run_to_end(
        service: &mut SessionLoopService,
        session: &mut QuizSession,
        letters: &str,
    ) -> SessionReport {
        loop {
            service.submit_answer(session, &answer(letters)).unwrap();
            if let SessionAdvance::Completed(report) = service.advance(session).unwrap() {
                return report;
            }
        }
    }

    #[test]
    fn completed_session_persists_ledger() {
        let repo = seeded_repo();
        let mut service = service_with(repo.clone(), 3);
        let mut session = service
            .start_session(SessionSource::Set(SetId::new("setA").unwrap()))
            .unwrap();
        assert_eq!(session.total(), 3);

        let report = run_to_end(&mut service, &mut session, "A");
        assert_eq!(report.summary.score(), 3);
        assert!(report.save_warning.is_none());

        let persisted = repo.load_ledger().unwrap().unwrap();
        assert_eq!(persisted.len(), 3);
        assert!(persisted.records().keys().all(|k| k.starts_with("setA|")));
    }

    #[test]
    fn least_seen_questions_are_picked_first() {
        let repo = seeded_repo();
        let mut seen = AttemptLedger::new();
        for id in ["1", "2", "3"] {
            seen.record(&format!("setA|{id}"), true);
        }
        repo.save_ledger(&seen).unwrap();

        let service = service_with(repo, 1);
        let session = service
            .start_session(SessionSource::Set(SetId::new("setA").unwrap()))
            .unwrap();
        assert_eq!(session.questions()[0].key().to_string(), "setA|4");
    }

    #[test]
    fn mistakes_session_covers_every_incorrect_question_uncapped() {
        let repo = seeded_repo();
        let mut history = AttemptLedger::new();
        history.record("setA|1", false);
        history.record("setB|2", false);
        history.record("setB|3", false);
        history.record("setA|2", true);
        repo.save_ledger(&history).unwrap();

        let service = service_with(repo, 1);
        let session = service
            .start_session_with_rng(SessionSource::Mistakes, &mut StdRng::seed_from_u64(9))
            .unwrap();

        let mut keys: Vec<String> = session
            .questions()
            .iter()
            .map(|q| q.key().to_string())
            .collect();
        keys.sort();
        assert_eq!(keys, ["setA|1", "setB|2", "setB|3"]);
    }

    #[test]
    fn mistakes_session_without_mistakes_is_nothing_to_review() {
        let service = service_with(seeded_repo(), 5);
        let err = service.start_session(SessionSource::Mistakes).unwrap_err();
        assert!(matches!(err, SessionError::NothingToReview));
    }

    #[test]
    fn union_and_all_sources_draw_from_the_right_pools() {
        let service = service_with(seeded_repo(), 100);
        let all = service.start_session(SessionSource::All).unwrap();
        assert_eq!(all.total(), 8);

        let union = service
            .start_session(SessionSource::Sets(vec![SetId::new("setB").unwrap()]))
            .unwrap();
        assert!(union.questions().iter().all(|q| q.set_id().as_str() == "setB"));

        let set_b = SetId::new("setB").unwrap();
        let repeated = service
            .start_session(SessionSource::Sets(vec![set_b.clone(), set_b]))
            .unwrap();
        assert_eq!(repeated.total(), 4);

        let err = service
            .start_session(SessionSource::Sets(Vec::new()))
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Store(QuestionStoreError::NoSetsSelected)
        ));
    }

    #[test]
    fn restart_reuses_the_source() {
        let mut service = service_with(seeded_repo(), 2);
        let mut session = service
            .start_session(SessionSource::Set(SetId::new("setB").unwrap()))
            .unwrap();
        run_to_end(&mut service, &mut session, "B");

        let again = service.restart(&session).unwrap();
        assert_eq!(again.source(), session.source());
        assert_eq!(again.score(), 0);
        assert_eq!(again.total(), 2);
        // The two questions just answered have been seen once; the others not at all.
        assert!(again
            .questions()
            .iter()
            .all(|q| service.ledger().seen_count(q.key()) == 0));
    }

    #[test]
    fn abort_flushes_recorded_attempts() {
        let repo = seeded_repo();
        let mut service = service_with(repo.clone(), 4);
        let mut session = service.start_session(SessionSource::All).unwrap();
        let key = session.current_question().unwrap().key().clone();
        service.submit_answer(&mut session, &answer("C")).unwrap();

        service.abort(session).unwrap();

        let persisted = repo.load_ledger().unwrap().unwrap();
        assert_eq!(persisted.get(&key), Some(&AttemptRecord::new(0, 1)));
    }

    #[test]
    fn abort_before_answering_writes_nothing() {
        let repo = seeded_repo();
        let mut service = service_with(repo.clone(), 4);
        let session = service.start_session(SessionSource::All).unwrap();
        service.abort(session).unwrap();
        assert!(repo.load_ledger().unwrap().is_none());
    }

    struct ReadOnlyLedger;

    impl LedgerRepository for ReadOnlyLedger {
        fn load_ledger(&self) -> Result<Option<AttemptLedger>, StorageError> {
            Ok(None)
        }

        fn save_ledger(&self, _ledger: &AttemptLedger) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("read-only".into()))
        }
    }

    #[test]
    fn save_failure_keeps_the_summary() {
        let (store, _) = QuestionStore::load(seeded_repo()).unwrap();
        let mut service = SessionLoopService::new(
            fixed_clock(),
            QuizSettings::new(2, false).unwrap(),
            store,
            LedgerService::new(Arc::new(ReadOnlyLedger)),
        );
        let mut session = service.start_session(SessionSource::All).unwrap();

        let report = run_to_end(&mut service, &mut session, "A");
        assert_eq!(report.summary.total(), 2);
        assert!(matches!(report.save_warning, Some(LedgerError::Save(_))));
        assert_eq!(service.ledger().len(), 2);
    }

    #[test]
    fn completion_before_start_time_still_reports_and_saves() {
        let repo = seeded_repo();
        let mut service = service_with(repo.clone(), 1);
        let question = service.store().pool_all().remove(0);
        let key = question.key().clone();
        // Session stamped later than the service clock reads at completion.
        let mut session = QuizSession::start(
            SessionSource::All,
            vec![question],
            false,
            fixed_clock().now() + chrono::Duration::seconds(30),
        )
        .unwrap();

        service.submit_answer(&mut session, &answer("A")).unwrap();
        let SessionAdvance::Completed(report) = service.advance(&mut session).unwrap() else {
            panic!("expected completion");
        };

        assert_eq!(report.summary.score(), 1);
        assert_eq!(report.summary.elapsed().total_seconds(), 0);
        assert!(report.save_warning.is_none());
        let persisted = repo.load_ledger().unwrap().unwrap();
        assert_eq!(persisted.get(&key), Some(&AttemptRecord::new(1, 0)));
    }

    /// Ledger store whose first save fails.
    #[derive(Default)]
    struct FailsOnce {
        failed: Mutex<bool>,
        saved: Mutex<Option<AttemptLedger>>,
    }

    impl LedgerRepository for FailsOnce {
        fn load_ledger(&self) -> Result<Option<AttemptLedger>, StorageError> {
            Ok(self.saved.lock().unwrap().clone())
        }

        fn save_ledger(&self, ledger: &AttemptLedger) -> Result<(), StorageError> {
            let mut failed = self.failed.lock().unwrap();
            if !*failed {
                *failed = true;
                return Err(StorageError::Unavailable("disk full".into()));
            }
            *self.saved.lock().unwrap() = Some(ledger.clone());
            Ok(())
        }
    }

    #[test]
    fn abort_retries_a_previously_failed_save() {
        let ledger_repo = Arc::new(FailsOnce::default());
        let (store, _) = QuestionStore::load(seeded_repo()).unwrap();
        let mut service = SessionLoopService::new(
            fixed_clock(),
            QuizSettings::new(2, false).unwrap(),
            store,
            LedgerService::new(ledger_repo.clone()),
        );

        let mut session = service.start_session(SessionSource::All).unwrap();
        let report = run_to_end(&mut service, &mut session, "A");
        assert!(report.save_warning.is_some());
        assert!(service.has_unsaved_attempts());

        let untouched = service.start_session(SessionSource::All).unwrap();
        service.abort(untouched).unwrap();

        assert!(!service.has_unsaved_attempts());
        assert_eq!(ledger_repo.load_ledger().unwrap().unwrap().len(), 2);
    }

    #[test]
    fn editing_current_question_updates_session_and_store() {
        let repo = seeded_repo();
        let mut service = service_with(repo.clone(), 1);
        let mut session = service
            .start_session(SessionSource::Set(SetId::new("setA").unwrap()))
            .unwrap();
        let key = session.current_question().unwrap().key().clone();

        service
            .edit_current_question(
                &mut session,
                QuestionDraft {
                    text: "Fixed wording".into(),
                    options: vec!["x".into(), "y".into()],
                    correct_answers: answer("B"),
                },
            )
            .unwrap();

        assert_eq!(session.current_question().unwrap().text(), "Fixed wording");
        assert_eq!(session.option_order().len(), 2);
        let outcome = service.submit_answer(&mut session, &answer("B")).unwrap();
        assert!(outcome.is_correct);

        let stored = &service.store().questions(key.set_id()).unwrap();
        assert!(stored.iter().any(|q| q.key() == &key && q.text() == "Fixed wording"));
    }
}
