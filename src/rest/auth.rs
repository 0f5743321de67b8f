// rest/auth.rs — Bearer token auth middleware.
//
// Tokens are issued by POST /login and stored hashed (SHA-256) in the
// api_tokens table. The middleware resolves the token to its user and
// threads that user through request extensions as the explicit actor for
// every handler.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::auth::token_hash;
use crate::tasks::TaskStorage;
use crate::AppContext;

pub async fn require_auth(
    State(ctx): State<Arc<AppContext>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    let Some(token) = token else {
        return unauthenticated();
    };

    let storage = TaskStorage::new(ctx.storage.pool());
    match storage.find_user_by_token_hash(&token_hash(&token)).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Ok(None) => unauthenticated(),
        Err(e) => {
            error!(err = %e, "token lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Server error." })),
            )
                .into_response()
        }
    }
}

fn unauthenticated() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Unauthenticated." })),
    )
        .into_response()
}
