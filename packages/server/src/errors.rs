use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Why a submission was refused. None of these mutate game state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionRejection {
    #[error("actor is not allowed to act in this window: {0}")]
    InvalidActor(String),
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("window is closed")]
    StaleWindow,
}

impl ActionRejection {
    pub fn actor(reason: impl Into<String>) -> Self {
        Self::InvalidActor(reason.into())
    }

    pub fn target(reason: impl Into<String>) -> Self {
        Self::InvalidTarget(reason.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("game store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to (de)serialize game state: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("game {0} not found")]
    NotFound(String),
    #[error("game {0} already running")]
    AlreadyExists(String),
    #[error("invalid setup: {0}")]
    InvalidSetup(String),
    #[error(transparent)]
    Rejected(#[from] ActionRejection),
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
    #[error("game aborted: {0}")]
    Aborted(String),
}

impl IntoResponse for GameError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            GameError::NotFound(_) => StatusCode::NOT_FOUND,
            GameError::AlreadyExists(_) => StatusCode::CONFLICT,
            GameError::InvalidSetup(_) => StatusCode::BAD_REQUEST,
            GameError::Rejected(ActionRejection::InvalidActor(_)) => StatusCode::FORBIDDEN,
            GameError::Rejected(ActionRejection::InvalidTarget(_)) => StatusCode::BAD_REQUEST,
            GameError::Rejected(ActionRejection::StaleWindow) => StatusCode::CONFLICT,
            GameError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            GameError::Aborted(_) => StatusCode::GONE,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
