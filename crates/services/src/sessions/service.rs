use chrono::{DateTime, Utc};
use rand::Rng;
use std::fmt;

use quiz_core::model::{
    AnswerSet, AttemptLedger, AttemptRecord, OptionOrder, Question, QuestionContent, QuestionKey,
    SessionSummary,
};

use super::plan::{SessionSource, shuffled_option_order};
use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Where a session stands in the answer loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for an answer to the current question.
    Active,
    /// Answer graded, waiting for the user to move on.
    Grading,
    /// Every question answered. Terminal.
    Completed,
}

/// Grading of one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub key: QuestionKey,
    /// Labels the user picked, in displayed label space.
    pub selected: AnswerSet,
    /// Correct labels in displayed label space.
    pub expected: AnswerSet,
    pub is_correct: bool,
    /// Ledger record after this answer was counted.
    pub record: AttemptRecord,
}

/// Result of moving past a graded question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStep {
    Next,
    Completed(SessionSummary),
}

/// Current question as the presentation layer should show it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedQuestion<'a> {
    pub question: &'a Question,
    /// Option text in displayed order.
    pub options: Vec<&'a str>,
    pub order: &'a OptionOrder,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One run through a fixed, ordered list of questions.
///
/// Holds its own copies of the questions; option shuffling only changes the
/// session-local [`OptionOrder`], never the stored correct answers.
pub struct QuizSession {
    source: SessionSource,
    questions: Vec<Question>,
    cursor: usize,
    score: u32,
    state: SessionState,
    shuffle_options: bool,
    option_order: OptionOrder,
    answers: Vec<AnswerOutcome>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// Start a session on `questions`, in the given order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no questions are provided.
    pub fn start(
        source: SessionSource,
        questions: Vec<Question>,
        shuffle_options: bool,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        Self::start_with_rng(
            source,
            questions,
            shuffle_options,
            started_at,
            &mut rand::rng(),
        )
    }

    /// [`QuizSession::start`] with a caller-provided random source for option shuffling.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no questions are provided.
    pub fn start_with_rng<R: Rng + ?Sized>(
        source: SessionSource,
        questions: Vec<Question>,
        shuffle_options: bool,
        started_at: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        let Some(first) = questions.first() else {
            return Err(SessionError::Empty);
        };
        let option_order = Self::order_for(first, shuffle_options, rng);

        Ok(Self {
            source,
            questions,
            cursor: 0,
            score: 0,
            state: SessionState::Active,
            shuffle_options,
            option_order,
            answers: Vec::new(),
            started_at,
            completed_at: None,
        })
    }

    fn order_for<R: Rng + ?Sized>(question: &Question, shuffle: bool, rng: &mut R) -> OptionOrder {
        let len = question.options().len();
        if shuffle {
            shuffled_option_order(len, rng)
        } else {
            OptionOrder::identity(len)
        }
    }

    #[must_use]
    pub fn source(&self) -> &SessionSource {
        &self.source
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerOutcome] {
        &self.answers
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Completed
    }

    #[must_use]
    pub fn shuffle_options(&self) -> bool {
        self.shuffle_options
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.total(),
            answered: self.answers.len(),
            remaining: self.total().saturating_sub(self.answers.len()),
            is_complete: self.is_complete(),
        }
    }

    /// Question under the cursor; `None` once completed.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.is_complete() {
            return None;
        }
        self.questions.get(self.cursor)
    }

    /// Current question with its options in display order.
    #[must_use]
    pub fn presented(&self) -> Option<PresentedQuestion<'_>> {
        let question = self.current_question()?;
        let options = self
            .option_order
            .iter()
            .filter_map(|original| question.options().get(original).map(String::as_str))
            .collect();
        Some(PresentedQuestion {
            question,
            options,
            order: &self.option_order,
        })
    }

    #[must_use]
    pub fn option_order(&self) -> &OptionOrder {
        &self.option_order
    }

    /// Correct labels of the current question, translated into displayed label space.
    #[must_use]
    pub fn displayed_correct_answers(&self) -> Option<AnswerSet> {
        self.current_question()
            .map(|q| self.option_order.to_displayed(q.correct_answers()))
    }

    /// Replace the display permutation of the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside `Active` and
    /// `SessionError::OptionCountMismatch` if `order` does not cover every option.
    pub fn set_option_order(&mut self, order: OptionOrder) -> Result<(), SessionError> {
        self.expect_state(SessionState::Active)?;
        let expected = self.current_question().map_or(0, |q| q.options().len());
        if order.len() != expected {
            return Err(SessionError::OptionCountMismatch {
                given: order.len(),
                expected,
            });
        }
        self.option_order = order;
        Ok(())
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), SessionError> {
        if self.state == SessionState::Completed {
            return Err(SessionError::Completed);
        }
        if self.state != expected {
            return Err(SessionError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Grade `selected` (displayed labels) against the current question and
    /// record the attempt in `ledger`.
    ///
    /// Only an exact match counts as correct; there is no partial credit.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless the session is `Active`,
    /// `SessionError::Completed` after the last question, and
    /// `SessionError::InvalidLabel` for a label past the last option.
    pub fn submit_answer(
        &mut self,
        ledger: &mut AttemptLedger,
        selected: &AnswerSet,
    ) -> Result<&AnswerOutcome, SessionError> {
        self.expect_state(SessionState::Active)?;
        let question = self.questions.get(self.cursor).ok_or(SessionError::Completed)?;

        let options = question.options().len();
        if let Some(label) = selected.iter().find(|l| l.index() >= options) {
            return Err(SessionError::InvalidLabel { label, options });
        }

        let expected = self.option_order.to_displayed(question.correct_answers());
        let is_correct = *selected == expected;
        let record = ledger.record_answer(question.key(), is_correct);
        if is_correct {
            self.score += 1;
        }

        self.answers.push(AnswerOutcome {
            key: question.key().clone(),
            selected: selected.clone(),
            expected,
            is_correct,
            record,
        });
        self.state = SessionState::Grading;
        self.answers.last().ok_or(SessionError::Completed)
    }

    /// Move past the graded question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless the session is `Grading`.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<SessionStep, SessionError> {
        self.advance_with_rng(now, &mut rand::rng())
    }

    /// [`QuizSession::advance`] with a caller-provided random source.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless the session is `Grading`.
    pub fn advance_with_rng<R: Rng + ?Sized>(
        &mut self,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<SessionStep, SessionError> {
        self.expect_state(SessionState::Grading)?;

        if self.cursor + 1 >= self.questions.len() {
            // A wall clock that stepped backwards must not lose the score.
            let completed_at = now.max(self.started_at);
            let summary = self.build_summary(completed_at)?;
            self.completed_at = Some(completed_at);
            self.state = SessionState::Completed;
            return Ok(SessionStep::Completed(summary));
        }

        self.cursor += 1;
        self.option_order = Self::order_for(&self.questions[self.cursor], self.shuffle_options, rng);
        self.state = SessionState::Active;
        Ok(SessionStep::Next)
    }

    /// Final summary; `None` until the session is complete.
    #[must_use]
    pub fn summary(&self) -> Option<SessionSummary> {
        let completed_at = self.completed_at?;
        self.build_summary(completed_at).ok()
    }

    fn build_summary(&self, completed_at: DateTime<Utc>) -> Result<SessionSummary, SessionError> {
        let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        Ok(SessionSummary::new(
            self.score,
            total,
            self.started_at,
            completed_at,
        )?)
    }

    /// Swap in edited content for the question under the cursor.
    ///
    /// Other copies sharing `key` (id-less questions all resolve to the same id)
    /// keep their content. The display order is reset when the option count changed.
    pub(crate) fn replace_current_content(&mut self, key: &QuestionKey, content: &QuestionContent) {
        if self.is_complete() {
            return;
        }
        let Some(current) = self.questions.get_mut(self.cursor) else {
            return;
        };
        if current.key() != key {
            return;
        }
        current.replace_content(content.clone());
        let len = current.options().len();
        if len != self.option_order.len() {
            self.option_order = OptionOrder::identity(len);
        }
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("source", &self.source)
            .field("questions_len", &self.questions.len())
            .field("cursor", &self.cursor)
            .field("score", &self.score)
            .field("state", &self.state)
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
