use axum::{
    Json,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use shelf_dal::user::UserRepository;
use shelf_types::claim::ApiClaim;

use super::{FavoritesEngine, SqlFavoritesStore, ToggleOutcome};
use crate::{
    auth::token::{require_token, user_id},
    error::ApiResult,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    book_id: i64,
}

fn engine(store: SqlFavoritesStore, state: &AppState) -> FavoritesEngine<SqlFavoritesStore> {
    FavoritesEngine::new(store, state.config().favorites)
}

/// Adds book to favorites or removes it, if it's already there
pub async fn toggle(
    State(state): State<AppState>,
    store: SqlFavoritesStore,
    users: UserRepository,
    api_user: ApiClaim,
    Json(request): Json<ToggleRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = users.get(user_id(&api_user)?).await?;
    let outcome = engine(store, &state)
        .toggle_by_id(user.id, request.book_id)
        .await?;
    let response = match outcome {
        ToggleOutcome::Removed => json!({"message": "Book removed from favorites"}),
        ToggleOutcome::Added { recommendations } => json!({
            "message": "Book added to favorites",
            "recommendations": recommendations,
        }),
    };
    Ok(Json(response))
}

pub async fn list(
    State(state): State<AppState>,
    store: SqlFavoritesStore,
    api_user: ApiClaim,
) -> ApiResult<impl IntoResponse> {
    let books = engine(store, &state).favorites(user_id(&api_user)?).await?;
    Ok(Json(books))
}

pub async fn recommendations(
    State(state): State<AppState>,
    store: SqlFavoritesStore,
    api_user: ApiClaim,
) -> ApiResult<impl IntoResponse> {
    let books = engine(store, &state).recommend(user_id(&api_user)?).await?;
    Ok(Json(books))
}

/// All routes need bearer token
pub fn router(state: AppState) -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", post(toggle).get(list))
        .route("/recommendations", get(recommendations))
        .route_layer(middleware::from_fn_with_state(state, require_token))
}
