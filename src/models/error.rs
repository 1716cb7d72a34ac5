use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::service::{gateway::GatewayError, repository::RepositoryError};

/// Errors surfaced over HTTP. Chat-facing failures use [`QuizError`] instead.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Api error: {1}")]
    Api(StatusCode, String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ServerError::Api(sc, msg) => {
                warn!("Api error: {} - {}", sc, msg);
                (sc, msg)
            }
        }
        .into_response()
    }
}

pub static UNKNOWN_MSG: &str = "어라..?";
pub static NOT_FOUND_MSG: &str = "모르겠어요.";

/// Failures of quiz commands. Every variant is reported back to the chat room
/// it came from and never crosses into another room.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("A quiz is already running in this room")]
    AlreadyInProgress,

    #[error("No quiz is running in this room")]
    NotRunning,

    #[error("Hint requested {0:?} too early")]
    TooEarly(Duration),

    #[error("No questions match the category filter")]
    EmptyQuestionBank,

    #[error("Question already exists")]
    AlreadyExists,

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

impl QuizError {
    pub fn chat_message(&self) -> String {
        match self {
            QuizError::NotFound(what) => {
                info!("Nothing found for: {}", what);
                NOT_FOUND_MSG.to_string()
            }
            QuizError::AlreadyInProgress => "이미 퀴즈가 진행 중이에요.".to_string(),
            QuizError::NotRunning => "진행 중인 퀴즈가 없어요.".to_string(),
            QuizError::TooEarly(remaining) => {
                // Round up so "0초" is never shown
                let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                format!("힌트는 {}초 뒤에 받을 수 있어요.", secs)
            }
            QuizError::EmptyQuestionBank => {
                warn!("Quiz aborted, question bank is empty for the filter");
                "낼 문제가 없어서 퀴즈를 끝낼게요.".to_string()
            }
            QuizError::AlreadyExists => "이미 알고 있는 문제예요.".to_string(),
            QuizError::InvalidCommand(usage) => usage.clone(),
            QuizError::Repository(e) => {
                error!("Repository failure: {}", e);
                UNKNOWN_MSG.to_string()
            }
            QuizError::Gateway(e) => {
                error!("Gateway failure: {}", e);
                UNKNOWN_MSG.to_string()
            }
        }
    }
}
