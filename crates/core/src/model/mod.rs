mod answer;
mod attempt;
mod ids;
mod question;
mod session;
mod settings;

pub use answer::{AnswerError, AnswerLabel, AnswerSet, MAX_OPTIONS, OptionOrder};
pub use attempt::{AttemptLedger, AttemptRecord};
pub use ids::{IdError, KEY_SEPARATOR, QuestionId, QuestionKey, SetId, key_for};
pub use question::{Question, QuestionContent, QuestionDraft, QuestionError, strip_option_label};
pub use session::{ElapsedTime, SessionSummary, SessionSummaryError};
pub use settings::{DEFAULT_QUESTION_COUNT, MAX_QUESTION_COUNT, QuizSettings, QuizSettingsError};
