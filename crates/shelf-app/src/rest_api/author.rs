use crate::{
    auth::token::require_token, error::ApiResult, repository_from_request, rest_api::Paging,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use axum_valid::Garde;
use http::StatusCode;
use serde_json::json;
use shelf_dal::author::{AuthorRepository, CreateAuthor, UpdateAuthor};

repository_from_request!(AuthorRepository);

pub async fn list(
    repository: AuthorRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let params = paging.into_listing_params(state.config().default_page_size)?;
    let authors = repository.list(params).await?;
    Ok(Json(authors))
}

pub async fn count(repository: AuthorRepository) -> ApiResult<impl IntoResponse> {
    let count = repository.count().await?;
    Ok(Json(count))
}

pub async fn get_author(
    Path(id): Path<i64>,
    repository: AuthorRepository,
) -> ApiResult<impl IntoResponse> {
    let author = repository.get(id).await?;
    Ok(Json(author))
}

pub async fn create(
    repository: AuthorRepository,
    Garde(Json(payload)): Garde<Json<CreateAuthor>>,
) -> ApiResult<impl IntoResponse> {
    let author = repository.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Author created", "author": author})),
    ))
}

pub async fn update(
    Path(id): Path<i64>,
    repository: AuthorRepository,
    Garde(Json(payload)): Garde<Json<UpdateAuthor>>,
) -> ApiResult<impl IntoResponse> {
    let author = repository.update(id, payload).await?;
    Ok(Json(json!({"message": "Author updated", "author": author})))
}

/// Deletes also all author's books
pub async fn delete(
    Path(id): Path<i64>,
    repository: AuthorRepository,
) -> ApiResult<impl IntoResponse> {
    repository.delete(id).await?;
    tracing::debug!(author_id = id, "Author deleted");
    Ok(Json(json!({"message": "Author deleted"})))
}

pub fn router(state: AppState) -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", post(create))
        .route("/{id}", put(update).delete(delete))
        .route_layer(middleware::from_fn_with_state(state, require_token))
        .route("/", get(list))
        .route("/count", get(count))
        .route("/{id}", get(get_author))
}
