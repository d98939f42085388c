use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde_json::json;
use tracing::error;

use crate::favorites::FavoritesError;

/// Error returned from API handlers, rendered as `{"error": "..."}`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("You can only have {0} favorite books")]
    CapacityExceeded(usize),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::InvalidQuery(_) | ApiError::CapacityExceeded(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(msg) => {
                error!("Internal error: {msg}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<shelf_dal::Error> for ApiError {
    fn from(error: shelf_dal::Error) -> Self {
        match error {
            shelf_dal::Error::RecordNotFound(_)
            | shelf_dal::Error::DatabaseError(shelf_dal::SqlxError::RowNotFound) => {
                ApiError::NotFound(error.to_string())
            }
            shelf_dal::Error::DuplicateRecord(_) | shelf_dal::Error::InvalidCredentials => {
                ApiError::BadRequest(error.to_string())
            }
            shelf_dal::Error::InvalidOrderByField(field) => {
                ApiError::InvalidQuery(format!("Invalid sort field {field}"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<FavoritesError> for ApiError {
    fn from(error: FavoritesError) -> Self {
        match error {
            FavoritesError::CapacityExceeded { limit } => ApiError::CapacityExceeded(limit),
            FavoritesError::BookNotFound(_) => ApiError::NotFound(error.to_string()),
            FavoritesError::Store(e) => e.into(),
        }
    }
}

impl From<shelf_auth::Error> for ApiError {
    fn from(error: shelf_auth::Error) -> Self {
        if error.is_expired() {
            ApiError::Unauthorized("Token expired")
        } else {
            ApiError::Unauthorized("Invalid token")
        }
    }
}
