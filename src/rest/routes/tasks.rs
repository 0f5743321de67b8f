// rest/routes/tasks.rs — task REST routes.
//
// Handlers stay thin: deserialize, hand the explicit actor to the
// service, shape the response. All policy and validation lives in the
// service layer.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::tasks::model::{
    AddDependencyRequest, AssignTaskRequest, CreateTaskRequest, TaskDetails, TaskFilters,
    UpdateTaskRequest, UserRow,
};
use crate::tasks::{TaskError, TaskService, TaskStorage};
use crate::AppContext;

fn service(ctx: &AppContext) -> TaskService {
    TaskService::new(TaskStorage::new(ctx.storage.pool()))
}

/// Canonical task shape: related users inline, dependency edges with
/// their target task, and the freshly computed completion gate.
fn task_json(details: &TaskDetails) -> Value {
    json!({
        "id": details.task.id,
        "title": details.task.title,
        "description": details.task.description,
        "status": details.task.status,
        "due_date": details.task.due_date,
        "created_at": details.task.created_at,
        "updated_at": details.task.updated_at,
        "assignee": {
            "id": details.assignee.id,
            "name": details.assignee.name,
            "email": details.assignee.email,
        },
        "creator": {
            "id": details.creator.id,
            "name": details.creator.name,
            "email": details.creator.email,
        },
        "dependencies": details.dependencies.iter().map(|d| json!({
            "id": d.edge.id,
            "dependency_task": {
                "id": d.task.id,
                "title": d.task.title,
                "status": d.task.status,
            },
        })).collect::<Vec<_>>(),
        "can_be_completed": details.can_be_completed,
    })
}

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
    Extension(actor): Extension<UserRow>,
    Query(filters): Query<TaskFilters>,
) -> Result<Json<Value>, TaskError> {
    let tasks = service(&ctx).list(&actor, &filters).await?;
    Ok(Json(Value::Array(tasks.iter().map(task_json).collect())))
}

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    Extension(actor): Extension<UserRow>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Value>), TaskError> {
    let details = service(&ctx).create(&actor, &req).await?;
    Ok((StatusCode::CREATED, Json(task_json(&details))))
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Extension(actor): Extension<UserRow>,
    Path(id): Path<String>,
) -> Result<Json<Value>, TaskError> {
    let details = service(&ctx).get(&actor, &id).await?;
    Ok(Json(task_json(&details)))
}

pub async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    Extension(actor): Extension<UserRow>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Value>, TaskError> {
    let details = service(&ctx).update(&actor, &id, &req).await?;
    Ok(Json(task_json(&details)))
}

pub async fn assign_task(
    State(ctx): State<Arc<AppContext>>,
    Extension(actor): Extension<UserRow>,
    Path(id): Path<String>,
    Json(req): Json<AssignTaskRequest>,
) -> Result<Json<Value>, TaskError> {
    let details = service(&ctx).assign(&actor, &id, &req).await?;
    Ok(Json(task_json(&details)))
}

pub async fn add_dependency(
    State(ctx): State<Arc<AppContext>>,
    Extension(actor): Extension<UserRow>,
    Path(id): Path<String>,
    Json(req): Json<AddDependencyRequest>,
) -> Result<(StatusCode, Json<Value>), TaskError> {
    let dep = service(&ctx).add_dependency(&actor, &id, &req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": dep.edge.id,
            "task_id": dep.edge.task_id,
            "dependency_id": dep.edge.dependency_id,
            "dependency": {
                "id": dep.task.id,
                "title": dep.task.title,
                "status": dep.task.status,
            },
        })),
    ))
}

pub async fn remove_dependency(
    State(ctx): State<Arc<AppContext>>,
    Extension(actor): Extension<UserRow>,
    Path((id, edge_id)): Path<(String, String)>,
) -> Result<Json<Value>, TaskError> {
    service(&ctx).remove_dependency(&actor, &id, &edge_id).await?;
    Ok(Json(json!({ "message": "Dependency removed successfully" })))
}
