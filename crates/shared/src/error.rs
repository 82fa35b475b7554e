use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    NotYourTurn,
    InvalidMove,
    NoSelection,
    NothingToUndo,
    Unauthorized,
    Validation,
    Internal,
}

impl ErrorCode {
    /// Best-effort classification of the free-text reasons the game server sends.
    pub fn classify(status: u16, message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if status == 404 || lower.contains("not found") {
            Self::NotFound
        } else if lower.contains("not your turn") {
            Self::NotYourTurn
        } else if lower.contains("invalid move") {
            Self::InvalidMove
        } else if lower.contains("no piece selected") {
            Self::NoSelection
        } else if lower.contains("no moves to undo") {
            Self::NothingToUndo
        } else if status == 401 || status == 403 || lower.contains("not authorized") {
            Self::Unauthorized
        } else if status >= 500 {
            Self::Internal
        } else {
            Self::Validation
        }
    }
}

/// Error body the game server returns alongside 4xx statuses, and on
/// `success: false` replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A request the server refused, with its reason as sent.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn from_body(status: u16, body: ErrorBody) -> Self {
        Self {
            code: ErrorCode::classify(status, &body.error),
            message: body.error,
        }
    }
}
