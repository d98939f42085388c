use axum::{Json, extract::State, response::IntoResponse, routing::post};
use garde::Validate as _;
use serde::Deserialize;
use serde_json::json;
use shelf_dal::user::{CreateUser, UserRepository};
use shelf_types::{claim::ApiClaim, general::Username};
use tracing::{debug, error};

use crate::{
    error::{ApiError, ApiResult},
    repository_from_request,
    state::AppState,
};

pub mod token;

repository_from_request!(UserRepository);

#[derive(Debug, Deserialize)]
pub struct Credentials {
    username: Option<String>,
    password: Option<String>,
}

impl Credentials {
    fn into_parts(self) -> Option<(String, String)> {
        match (self.username, self.password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u, p)),
            _ => None,
        }
    }
}

pub async fn register(
    users: UserRepository,
    Json(credentials): Json<Credentials>,
) -> ApiResult<impl IntoResponse> {
    let (username, password) = credentials
        .into_parts()
        .ok_or_else(|| ApiError::BadRequest("Missing fields".to_string()))?;
    let username: Username = username.parse().map_err(|e: garde::Report| {
        debug!("Invalid username: {e}");
        ApiError::BadRequest(format!("Invalid username: {e}"))
    })?;
    let payload = CreateUser { username, password };
    payload
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let user = users.create(payload).await?;
    Ok(Json(json!({
        "message": "User registered successfully",
        "user_id": user.id,
    })))
}

pub async fn login(
    State(state): State<AppState>,
    users: UserRepository,
    Json(credentials): Json<Credentials>,
) -> ApiResult<impl IntoResponse> {
    let (username, password) = credentials
        .into_parts()
        .ok_or(shelf_dal::Error::InvalidCredentials)?;
    let user = users.check_password(&username, &password).await?;

    let token = state
        .tokens()
        .issue(ApiClaim::new_expired(user.id))
        .map_err(|e| {
            error!("Failed to issue token: {e}");
            ApiError::Internal(e.to_string())
        })?;
    debug!(user_id = user.id, "User logged in");
    Ok(Json(json!({ "token": token })))
}

pub fn auth_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}
