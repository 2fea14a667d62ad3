#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod ledger_service;
pub mod question_store;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use error::{AppServicesError, LedgerError, QuestionStoreError, SessionError};
pub use ledger_service::LedgerService;
pub use question_store::{LoadReport, QuestionStore, SetLoadFailure};

pub use sessions::{
    AnswerOutcome, QuizSession, SessionAdvance, SessionLoopService, SessionReport, SessionSource,
    SessionState,
};
