use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::model::answer::{AnswerLabel, AnswerSet, MAX_OPTIONS};
use crate::model::ids::{QuestionId, QuestionKey, SetId};

/// Authoring prefix such as `"A. "` or `"3) "` that some imported sets keep on option text.
static OPTION_LABEL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-E0-9][.)]\s*").expect("option label regex is valid"));

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Invariant violations for question content.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question must have at least one option")]
    NoOptions,

    #[error("question has {count} options (max {MAX_OPTIONS})")]
    TooManyOptions { count: usize },

    #[error("option {label} is blank")]
    BlankOption { label: char },

    #[error("question must have at least one correct answer")]
    NoCorrectAnswer,

    #[error("correct answer {label} has no matching option ({options} options)")]
    CorrectAnswerOutOfRange { label: char, options: usize },
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

/// Mutable part of a question: the only fields an edit may replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionContent {
    text: String,
    options: Vec<String>,
    correct_answers: AnswerSet,
}

impl QuestionContent {
    /// Checks the structural invariants shared by loaded and edited questions.
    ///
    /// # Errors
    ///
    /// Returns a `QuestionError` when options are missing or too many, or when
    /// the correct set is empty or points past the last option.
    pub fn from_persisted(
        text: String,
        options: Vec<String>,
        correct_answers: AnswerSet,
    ) -> Result<Self, QuestionError> {
        if options.is_empty() {
            return Err(QuestionError::NoOptions);
        }
        if options.len() > MAX_OPTIONS {
            return Err(QuestionError::TooManyOptions {
                count: options.len(),
            });
        }
        if correct_answers.is_empty() {
            return Err(QuestionError::NoCorrectAnswer);
        }
        if let Some(label) = correct_answers.max_label() {
            if label.index() >= options.len() {
                return Err(QuestionError::CorrectAnswerOutOfRange {
                    label: label.as_char(),
                    options: options.len(),
                });
            }
        }

        Ok(Self {
            text,
            options,
            correct_answers,
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answers(&self) -> &AnswerSet {
        &self.correct_answers
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated edit coming from the question editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub text: String,
    pub options: Vec<String>,
    pub correct_answers: AnswerSet,
}

impl QuestionDraft {
    /// Trims the draft and validates it.
    ///
    /// Trailing blank options are dropped; a blank option followed by a filled
    /// one is rejected because it would shift every later label.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for empty text, blank interior options or any
    /// structural violation from [`QuestionContent::from_persisted`].
    pub fn validate(self) -> Result<QuestionContent, QuestionError> {
        let text = self.text.trim().to_owned();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }

        let mut options: Vec<String> = self
            .options
            .into_iter()
            .map(|opt| opt.trim().to_owned())
            .collect();
        while options.last().is_some_and(String::is_empty) {
            options.pop();
        }
        if let Some(blank) = options.iter().position(String::is_empty) {
            let label = AnswerLabel::from_index(blank).map_or('?', AnswerLabel::as_char);
            return Err(QuestionError::BlankOption { label });
        }

        QuestionContent::from_persisted(text, options, self.correct_answers)
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question tagged with its origin set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    key: QuestionKey,
    content: QuestionContent,
    chapter: Option<String>,
}

impl Question {
    #[must_use]
    pub fn new(
        set_id: SetId,
        question_id: QuestionId,
        content: QuestionContent,
        chapter: Option<String>,
    ) -> Self {
        Self {
            key: QuestionKey::new(set_id, question_id),
            content,
            chapter,
        }
    }

    /// Identity used for attempt tracking.
    #[must_use]
    pub fn key(&self) -> &QuestionKey {
        &self.key
    }

    #[must_use]
    pub fn set_id(&self) -> &SetId {
        self.key.set_id()
    }

    #[must_use]
    pub fn question_id(&self) -> &QuestionId {
        self.key.question_id()
    }

    #[must_use]
    pub fn content(&self) -> &QuestionContent {
        &self.content
    }

    #[must_use]
    pub fn text(&self) -> &str {
        self.content.text()
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        self.content.options()
    }

    /// Correct labels in stored option order.
    #[must_use]
    pub fn correct_answers(&self) -> &AnswerSet {
        self.content.correct_answers()
    }

    /// Grouping carried over from the import tool; not used for selection.
    #[must_use]
    pub fn chapter(&self) -> Option<&str> {
        self.chapter.as_deref()
    }

    pub fn replace_content(&mut self, content: QuestionContent) {
        self.content = content;
    }
}

/// Removes an authoring label prefix from option text for display.
#[must_use]
pub fn strip_option_label(option: &str) -> &str {
    match OPTION_LABEL_PREFIX.find(option) {
        Some(m) => &option[m.end()..],
        None => option,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
