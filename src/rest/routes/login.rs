// rest/routes/login.rs — token issuance.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::tasks::{TaskError, TaskStorage};
use crate::AppContext;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub async fn login(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>, TaskError> {
    let storage = TaskStorage::new(ctx.storage.pool());
    let token = crate::auth::login(&storage, req.email.as_deref(), req.password.as_deref()).await?;
    Ok(Json(json!({ "token": token })))
}
