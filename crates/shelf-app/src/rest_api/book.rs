use axum::{
    Json,
    extract::{Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use axum_valid::Garde;
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use shelf_dal::book::{BookRepository, CreateBook, UpdateBook};
use shelf_types::claim::ApiClaim;
use tracing::debug;

use crate::{
    auth::token::require_token, error::ApiResult, repository_from_request, rest_api::Paging,
    state::AppState,
};

repository_from_request!(BookRepository);

#[derive(Debug, Deserialize)]
pub struct BookSearch {
    search: Option<String>,
}

pub async fn list(
    repository: BookRepository,
    State(state): State<AppState>,
    Query(BookSearch { search }): Query<BookSearch>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let params = paging.into_listing_params(state.config().default_page_size)?;
    let search = search.as_deref().filter(|s| !s.is_empty());
    let books = repository.list(params, search).await?;
    Ok(Json(books))
}

pub async fn get_book(
    Path(id): Path<i64>,
    repository: BookRepository,
) -> ApiResult<impl IntoResponse> {
    let book = repository.get(id).await?;
    Ok(Json(book))
}

pub async fn create(
    repository: BookRepository,
    api_user: ApiClaim,
    Garde(Json(payload)): Garde<Json<CreateBook>>,
) -> ApiResult<impl IntoResponse> {
    let book = repository.create(payload).await?;
    debug!(book_id = book.id, user = %api_user.sub, "Book created");
    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Book created", "book": book})),
    ))
}

pub async fn update(
    Path(id): Path<i64>,
    repository: BookRepository,
    Garde(Json(payload)): Garde<Json<UpdateBook>>,
) -> ApiResult<impl IntoResponse> {
    let book = repository.update(id, payload).await?;
    Ok(Json(json!({"message": "Book updated", "book": book})))
}

pub async fn delete(
    Path(id): Path<i64>,
    repository: BookRepository,
    api_user: ApiClaim,
) -> ApiResult<impl IntoResponse> {
    repository.delete(id).await?;
    debug!(book_id = id, user = %api_user.sub, "Book deleted");
    Ok(Json(json!({"message": "Book deleted"})))
}

/// Reading is public, changes need bearer token
pub fn router(state: AppState) -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", post(create))
        .route("/{id}", put(update).delete(delete))
        .route_layer(middleware::from_fn_with_state(state, require_token))
        .route("/", get(list))
        .route("/{id}", get(get_book))
}
