use thiserror::Error;

/// Default number of questions drawn for a new session.
pub const DEFAULT_QUESTION_COUNT: u32 = 20;

/// Upper bound accepted for the per-session question count.
pub const MAX_QUESTION_COUNT: u32 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizSettingsError {
    #[error("question count must be between 1 and {MAX_QUESTION_COUNT}, got {0}")]
    InvalidQuestionCount(u32),
}

/// User-tunable quiz behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSettings {
    question_count: u32,
    shuffle_options: bool,
}

impl QuizSettings {
    /// Creates validated settings.
    ///
    /// # Errors
    ///
    /// Returns `QuizSettingsError::InvalidQuestionCount` when `question_count`
    /// is zero or above [`MAX_QUESTION_COUNT`].
    pub fn new(question_count: u32, shuffle_options: bool) -> Result<Self, QuizSettingsError> {
        if !(1..=MAX_QUESTION_COUNT).contains(&question_count) {
            return Err(QuizSettingsError::InvalidQuestionCount(question_count));
        }
        Ok(Self {
            question_count,
            shuffle_options,
        })
    }

    /// Questions drawn per session by the adaptive selector.
    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    /// Whether options are presented in a fresh random order for each question.
    #[must_use]
    pub fn shuffle_options(&self) -> bool {
        self.shuffle_options
    }

    #[must_use]
    pub fn with_shuffle_options(mut self, shuffle: bool) -> Self {
        self.shuffle_options = shuffle;
        self
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            question_count: DEFAULT_QUESTION_COUNT,
            shuffle_options: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_menu_defaults() {
        let settings = QuizSettings::default();
        assert_eq!(settings.question_count(), 20);
        assert!(!settings.shuffle_options());
    }

    #[test]
    fn question_count_is_bounded() {
        assert!(QuizSettings::new(0, false).is_err());
        assert!(QuizSettings::new(101, false).is_err());
        assert_eq!(QuizSettings::new(100, true).unwrap().question_count(), 100);
    }
}
