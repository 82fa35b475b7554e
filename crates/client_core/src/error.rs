//! Error taxonomy for the session client and the user-facing form it is surfaced in.

use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The server understood the request and refused it.
    #[error("{0}")]
    Declined(ApiError),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("invalid server payload: {0}")]
    InvalidPayload(String),
    #[error("push channel failure: {0}")]
    PushChannel(String),
    #[error("session worker has stopped")]
    Stopped,
}

impl ClientError {
    pub fn declined(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Declined(ApiError::new(code, message))
    }

    pub fn is_declined(&self) -> bool {
        matches!(self, Self::Declined(_))
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Declined(err) => Some(err.code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::InvalidPayload(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidPayload(value.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::PushChannel(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Declined,
    Transport,
    Protocol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorContext {
    StartGame,
    SelectSquare,
    CommitMove,
    Undo,
    Resign,
    Sync,
    PushChannel,
}

impl ErrorContext {
    fn retry_message(self) -> &'static str {
        match self {
            Self::StartGame => "Failed to start game. Please try again.",
            Self::SelectSquare => "Failed to select square. Please try again.",
            Self::CommitMove => "Failed to make move. Please try again.",
            Self::Undo => "Failed to undo move.",
            Self::Resign => "Failed to resign game. Please try again.",
            Self::Sync => "Failed to refresh the board. Please try again.",
            Self::PushChannel => "Connection error",
        }
    }

    fn declined_fallback(self) -> &'static str {
        match self {
            Self::CommitMove => "Invalid move",
            Self::Undo => "Cannot undo",
            Self::Resign => "Failed to resign game",
            _ => self.retry_message(),
        }
    }
}

/// An error in the shape a front end shows it: what kind, during what, and the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfacedError {
    category: ErrorCategory,
    context: ErrorContext,
    message: String,
}

impl SurfacedError {
    pub fn from_client_error(context: ErrorContext, err: &ClientError) -> Self {
        let (category, message) = match err {
            ClientError::Declined(api) if api.message.trim().is_empty() => {
                (ErrorCategory::Declined, context.declined_fallback().to_string())
            }
            ClientError::Declined(api) => (ErrorCategory::Declined, api.message.clone()),
            ClientError::Transport(_) | ClientError::PushChannel(_) | ClientError::Stopped => {
                (ErrorCategory::Transport, context.retry_message().to_string())
            }
            ClientError::InvalidPayload(_) => {
                (ErrorCategory::Protocol, context.retry_message().to_string())
            }
        };
        Self {
            category,
            context,
            message,
        }
    }

    pub fn server_message(context: ErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            context.retry_message().to_string()
        } else {
            message
        };
        Self {
            category: ErrorCategory::Declined,
            context,
            message,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn context(&self) -> ErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
