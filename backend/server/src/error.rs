use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub const INVALID_ID_MESSAGE: &str = "Discord IDs are typically 17-19 digits.";
const REDACTED_MESSAGE: &str = "Something went wrong";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid Discord ID format")]
    InvalidId,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("{context}: {source}")]
    Internal {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("{context}")]
    Redacted { context: &'static str },
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AppError {
    pub fn internal(context: &'static str, source: impl Into<anyhow::Error>) -> Self {
        AppError::Internal {
            context,
            source: source.into(),
        }
    }

    /// Logs internal failures and strips their detail when running in production.
    pub fn for_mode(self, production: bool) -> Self {
        match self {
            AppError::Internal { context, source } => {
                error!("{context}: {source:#}");

                if production {
                    AppError::Redacted { context }
                } else {
                    AppError::Internal { context, source }
                }
            }
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidId => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Internal { .. } | AppError::Redacted { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> ErrorBody {
        let (error, message) = match self {
            AppError::InvalidId => (self.to_string(), INVALID_ID_MESSAGE.to_string()),
            AppError::Unauthenticated => (
                self.to_string(),
                "You need to log in with Discord to view your profile".to_string(),
            ),
            AppError::Internal { context, source } => (context.to_string(), source.to_string()),
            AppError::Redacted { context } => (context.to_string(), REDACTED_MESSAGE.to_string()),
        };

        ErrorBody {
            error,
            message: Some(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
