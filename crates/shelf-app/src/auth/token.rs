use axum::{
    RequestPartsExt,
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use http::request::Parts;
use shelf_types::claim::ApiClaim;
use tracing::debug;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Rejects requests without valid bearer token, valid claim is stored in request extensions
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let (mut parts, body) = request.into_parts();
    let TypedHeader(Authorization(bearer)) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|e| {
            debug!("No bearer token: {e}");
            ApiError::Unauthorized("Unauthorized")
        })?;

    let claim = state.tokens().validate::<ApiClaim>(bearer.token())?;
    if claim.user_id().is_none() {
        debug!(sub = %claim.sub, "Token subject is not user id");
        return Err(ApiError::Unauthorized("Invalid token"));
    }

    parts.extensions.insert(claim);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

impl FromRequestParts<AppState> for ApiClaim {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ApiClaim>()
            .cloned()
            .ok_or(ApiError::Unauthorized("Unauthorized"))
    }
}

/// Id of authenticated user
pub fn user_id(claim: &ApiClaim) -> ApiResult<i64> {
    claim.user_id().ok_or(ApiError::Unauthorized("Invalid token"))
}
