use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Round {0} not found")]
    NotFound(u32),

    #[error("Draw source error: {0}")]
    Transport(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed draw for round {round}: {reason}")]
    MalformedDraw { round: u32, reason: String },

    #[error("Latest round resolution failed: all {probes} probes errored")]
    ResolutionFailure { probes: u32 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// True for failures talking to (or decoding) the draw source, as opposed
    /// to a clean "this round has no draw" answer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::Transport(_)
                | AppError::Http(_)
                | AppError::Json(_)
                | AppError::MalformedDraw { .. }
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ResolutionFailure { .. } => StatusCode::BAD_GATEWAY,
            e if e.is_transport() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
