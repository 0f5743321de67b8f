//! Task domain data model types.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Generate a new row id (UUIDv4 string).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current UTC timestamp in the canonical response format.
pub fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_salt: String,
    pub password_hash: String,
    pub is_manager: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub assigned_to: String,
    pub created_by: String,
    /// `YYYY-MM-DD`, NULL when the task has no deadline.
    pub due_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Directed edge: `task_id` depends on `dependency_id` completing first.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DependencyRow {
    pub id: String,
    pub task_id: String,
    pub dependency_id: String,
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a wire value. Returns `None` for anything outside the closed set.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─── Write models ─────────────────────────────────────────────────────────────

/// Fully validated input for task creation, including the initial edge set.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assigned_to: String,
    pub created_by: String,
    pub due_date: Option<String>,
    pub dependencies: Vec<String>,
}

/// Optional-field patch: a present field overwrites, an absent field is
/// untouched. `description` and `due_date` distinguish "absent" from
/// "set to null" with the outer/inner Option split.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub assigned_to: Option<String>,
    pub due_date: Option<Option<String>>,
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.assigned_to.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
    }
}

/// The update contract, dispatched by actor role. The two variants carry
/// their own allowed-field sets instead of one patch branching on a flag.
#[derive(Debug, Clone)]
pub enum TaskUpdate {
    Manager(ManagerUpdate),
    Assignee(AssigneeUpdate),
}

/// Managers may mutate any task field and replace the dependency set.
/// `dependencies: Some(ids)` replaces the whole edge set (delete-all,
/// then insert) — edge ids change on every replacement.
#[derive(Debug, Clone)]
pub struct ManagerUpdate {
    pub patch: TaskPatch,
    pub dependencies: Option<Vec<String>>,
}

/// Assignees may only move the status of their own task.
#[derive(Debug, Clone)]
pub struct AssigneeUpdate {
    pub status: TaskStatus,
}

// ─── Request DTOs ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub due_date: Option<String>,
    pub dependencies: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub due_date: Option<Option<String>>,
    pub status: Option<String>,
    pub dependencies: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignTaskRequest {
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddDependencyRequest {
    pub dependency_id: Option<String>,
}

/// Query-string filters for task listing. Absent keys impose no
/// constraint; present keys AND-combine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilters {
    pub status: Option<String>,
    pub assigned_user: Option<String>,
    pub due_date_from: Option<String>,
    pub due_date_to: Option<String>,
}

// ─── Read models ──────────────────────────────────────────────────────────────

/// A dependency edge with its target task resolved.
#[derive(Debug, Clone)]
pub struct DependencyDetails {
    pub edge: DependencyRow,
    pub task: TaskRow,
}

/// A task with its related rows resolved — what every read endpoint
/// ultimately returns.
#[derive(Debug, Clone)]
pub struct TaskDetails {
    pub task: TaskRow,
    pub assignee: UserRow,
    pub creator: UserRow,
    pub dependencies: Vec<DependencyDetails>,
    pub can_be_completed: bool,
}
