mod plan;
mod progress;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use plan::{
    SessionSource, incorrect_only, select_subset, select_subset_with_rng, shuffled_option_order,
};
pub use progress::SessionProgress;
pub use service::{AnswerOutcome, PresentedQuestion, QuizSession, SessionState, SessionStep};
pub use workflow::{SessionAdvance, SessionLoopService, SessionReport};
