use crate::error::AppError;
use crate::server::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Admin guard for the reconciliation trigger and ledger administration.
/// Stands in for the full role system; only the admin capability lives here.
pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let authorized = bearer_token(req.headers())
        .map(|token| token == state.admin_token.as_str())
        .unwrap_or(false);

    if !authorized {
        warn!(path = %req.uri().path(), "Rejected unauthenticated admin request");
        return AppError::Unauthorized.into_response();
    }

    next.run(req).await
}
