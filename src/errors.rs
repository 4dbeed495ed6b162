use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::internal(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

/// Failures of the call store. Individual bad documents never end up here;
/// they are skipped while decoding.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read call data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse call data file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database query failed: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set when MONGODB_URI is set")]
    MissingVar(&'static str),

    #[error("unknown timezone '{0}'")]
    InvalidTimezone(String),
}
