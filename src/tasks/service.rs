//! Task service orchestration.
//!
//! Every operation takes the authenticated actor explicitly; the policy
//! module decides, this layer enforces. Validation messages follow the
//! API's documented texts, accumulated per-field so one response reports
//! every invalid input.

use chrono::{NaiveDate, Utc};
use tracing::info;

use crate::policy::{self, UpdateScope};

use super::error::{ErrorBag, TaskError};
use super::gate;
use super::model::{
    AddDependencyRequest, AssignTaskRequest, AssigneeUpdate, CreateTaskRequest, DependencyDetails,
    ManagerUpdate, NewTask, TaskDetails, TaskFilters, TaskPatch, TaskRow, TaskStatus, TaskUpdate,
    UpdateTaskRequest, UserRow,
};
use super::storage::TaskStorage;

pub struct TaskService {
    storage: TaskStorage,
}

impl TaskService {
    pub fn new(storage: TaskStorage) -> Self {
        Self { storage }
    }

    // ─── Create ───────────────────────────────────────────────────────────

    pub async fn create(
        &self,
        actor: &UserRow,
        req: &CreateTaskRequest,
    ) -> Result<TaskDetails, TaskError> {
        if !policy::can_create_tasks(actor) {
            return Err(TaskError::Unauthorized);
        }

        let mut errors = ErrorBag::new();

        let title = req.title.as_deref().map(str::trim).filter(|t| !t.is_empty());
        match title {
            None => errors.add("title", "Task title is required"),
            Some(t) if t.chars().count() > 255 => {
                errors.add("title", "Task title cannot exceed 255 characters");
            }
            _ => {}
        }

        match req.assigned_to.as_deref() {
            None => errors.add("assigned_to", "Please assign the task to a user"),
            Some(id) => {
                if !self.storage.user_exists(id).await? {
                    errors.add("assigned_to", "Selected user does not exist");
                }
            }
        }

        let due_date = match req.due_date.as_deref() {
            Some(raw) => parse_due_date(raw, &mut errors),
            None => None,
        };

        let mut dependencies = Vec::new();
        if let Some(ids) = &req.dependencies {
            for dep_id in ids {
                if self.storage.task_exists(dep_id).await? {
                    dependencies.push(dep_id.clone());
                } else {
                    errors.add("dependencies", "One or more dependency tasks do not exist");
                }
            }
        }

        errors.into_result()?;

        let title = title
            .map(str::to_string)
            .ok_or_else(|| TaskError::validation("title", "Task title is required"))?;
        let assigned_to = req
            .assigned_to
            .clone()
            .ok_or_else(|| TaskError::validation("assigned_to", "Please assign the task to a user"))?;

        let task = self
            .storage
            .create_task(&NewTask {
                title,
                description: req.description.clone(),
                status: TaskStatus::Pending,
                assigned_to,
                created_by: actor.id.clone(),
                due_date,
                dependencies,
            })
            .await?;

        info!(task_id = %task.id, created_by = %actor.id, "task created");
        self.details(task).await
    }

    // ─── Read ─────────────────────────────────────────────────────────────

    /// Fetch one task. Tasks outside a non-manager's assignment resolve as
    /// not-found — existence is never leaked to actors who cannot see them.
    pub async fn get(&self, actor: &UserRow, id: &str) -> Result<TaskDetails, TaskError> {
        let task = self.storage.get_task(id).await?.ok_or(TaskError::NotFound)?;
        if !policy::can_view(actor, &task) {
            return Err(TaskError::NotFound);
        }
        self.details(task).await
    }

    pub async fn list(
        &self,
        actor: &UserRow,
        filters: &TaskFilters,
    ) -> Result<Vec<TaskDetails>, TaskError> {
        let rows = self
            .storage
            .list_tasks(policy::visible_assignee(actor), filters)
            .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.details(row).await?);
        }
        Ok(out)
    }

    // ─── Update ───────────────────────────────────────────────────────────

    pub async fn update(
        &self,
        actor: &UserRow,
        id: &str,
        req: &UpdateTaskRequest,
    ) -> Result<TaskDetails, TaskError> {
        let task = self.storage.get_task(id).await?.ok_or(TaskError::NotFound)?;
        let scope = policy::update_scope(actor, &task).ok_or(TaskError::Unauthorized)?;

        let update = match scope {
            UpdateScope::Manager => {
                TaskUpdate::Manager(self.validate_manager_update(&task, req).await?)
            }
            UpdateScope::Assignee => TaskUpdate::Assignee(validate_assignee_update(req)?),
        };

        self.storage.apply_update(&task.id, &update).await?;

        let task = self.storage.get_task(id).await?.ok_or(TaskError::NotFound)?;
        self.details(task).await
    }

    async fn validate_manager_update(
        &self,
        task: &TaskRow,
        req: &UpdateTaskRequest,
    ) -> Result<ManagerUpdate, TaskError> {
        let mut errors = ErrorBag::new();
        let mut patch = TaskPatch::default();

        if let Some(title) = &req.title {
            if title.chars().count() > 255 {
                errors.add("title", "Task title cannot exceed 255 characters");
            } else {
                patch.title = Some(title.clone());
            }
        }
        if let Some(description) = &req.description {
            patch.description = Some(description.clone());
        }
        if let Some(assigned_to) = &req.assigned_to {
            if self.storage.user_exists(assigned_to).await? {
                patch.assigned_to = Some(assigned_to.clone());
            } else {
                errors.add("assigned_to", "Selected user does not exist");
            }
        }
        if let Some(due_date) = &req.due_date {
            match due_date {
                None => patch.due_date = Some(None),
                Some(raw) => {
                    if let Some(date) = parse_due_date(raw, &mut errors) {
                        patch.due_date = Some(Some(date));
                    }
                }
            }
        }
        if let Some(raw) = &req.status {
            match TaskStatus::parse(raw) {
                Some(status) => patch.status = Some(status),
                None => errors.add("status", "Invalid task status"),
            }
        }

        let mut dependencies = None;
        if let Some(ids) = &req.dependencies {
            let mut list = Vec::with_capacity(ids.len());
            for dep_id in ids {
                if dep_id == &task.id {
                    errors.add("dependencies", "A task cannot depend on itself");
                } else if self.storage.task_exists(dep_id).await? {
                    list.push(dep_id.clone());
                } else {
                    errors.add("dependencies", "One or more dependency tasks do not exist");
                }
            }
            dependencies = Some(list);
        }

        errors.into_result()?;
        Ok(ManagerUpdate {
            patch,
            dependencies,
        })
    }

    // ─── Assign ───────────────────────────────────────────────────────────

    pub async fn assign(
        &self,
        actor: &UserRow,
        id: &str,
        req: &AssignTaskRequest,
    ) -> Result<TaskDetails, TaskError> {
        if !policy::can_assign_tasks(actor) {
            return Err(TaskError::Unauthorized);
        }
        let task = self.storage.get_task(id).await?.ok_or(TaskError::NotFound)?;

        let assigned_to = req
            .assigned_to
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                TaskError::validation("assigned_to", "The assigned to field is required.")
            })?;
        if !self.storage.user_exists(assigned_to).await? {
            return Err(TaskError::validation(
                "assigned_to",
                "The selected assigned to is invalid.",
            ));
        }

        self.storage.set_assignee(&task.id, assigned_to).await?;
        info!(task_id = %task.id, assigned_to = %assigned_to, "task reassigned");

        let task = self.storage.get_task(id).await?.ok_or(TaskError::NotFound)?;
        self.details(task).await
    }

    // ─── Dependency edges ─────────────────────────────────────────────────

    pub async fn add_dependency(
        &self,
        actor: &UserRow,
        task_id: &str,
        req: &AddDependencyRequest,
    ) -> Result<DependencyDetails, TaskError> {
        if !policy::can_manage_dependencies(actor) {
            return Err(TaskError::Unauthorized);
        }
        let task = self
            .storage
            .get_task(task_id)
            .await?
            .ok_or(TaskError::NotFound)?;

        let dep_id = req
            .dependency_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                TaskError::validation("dependency_id", "Please select a task to depend on")
            })?;

        let mut errors = ErrorBag::new();
        if dep_id == task.id {
            errors.add("dependency_id", "A task cannot depend on itself");
        }
        let dep_task = self.storage.get_task(dep_id).await?;
        if dep_task.is_none() {
            errors.add("dependency_id", "Selected task does not exist");
        }
        errors.into_result()?;
        let dep_task = dep_task.ok_or(TaskError::NotFound)?;

        // Duplicates are deliberately not checked.
        let edge = self.storage.insert_dependency(&task.id, dep_id).await?;
        info!(task_id = %task.id, dependency_id = %dep_id, "dependency added");
        Ok(DependencyDetails {
            edge,
            task: dep_task,
        })
    }

    pub async fn remove_dependency(
        &self,
        actor: &UserRow,
        task_id: &str,
        edge_id: &str,
    ) -> Result<(), TaskError> {
        if !policy::can_manage_dependencies(actor) {
            return Err(TaskError::Unauthorized);
        }
        let edge = self
            .storage
            .get_dependency(task_id, edge_id)
            .await?
            .ok_or(TaskError::NotFound)?;
        self.storage.delete_dependency(&edge.id).await?;
        info!(task_id = %task_id, edge_id = %edge_id, "dependency removed");
        Ok(())
    }

    // ─── Shared ───────────────────────────────────────────────────────────

    async fn details(&self, task: TaskRow) -> Result<TaskDetails, TaskError> {
        let assignee = self
            .storage
            .get_user(&task.assigned_to)
            .await?
            .ok_or(TaskError::NotFound)?;
        let creator = self
            .storage
            .get_user(&task.created_by)
            .await?
            .ok_or(TaskError::NotFound)?;

        let edges = self.storage.list_dependencies(&task.id).await?;
        let mut dependencies = Vec::with_capacity(edges.len());
        for edge in edges {
            let dep_task = self
                .storage
                .get_task(&edge.dependency_id)
                .await?
                .ok_or(TaskError::NotFound)?;
            dependencies.push(DependencyDetails {
                edge,
                task: dep_task,
            });
        }

        let can_be_completed =
            gate::deps_satisfied(dependencies.iter().map(|d| d.task.status.as_str()));

        Ok(TaskDetails {
            task,
            assignee,
            creator,
            dependencies,
            can_be_completed,
        })
    }
}

fn validate_assignee_update(req: &UpdateTaskRequest) -> Result<AssigneeUpdate, TaskError> {
    // Fields other than `status` are outside the assignee contract and
    // are ignored when present.
    let raw = req
        .status
        .as_deref()
        .ok_or_else(|| TaskError::validation("status", "Task status is required"))?;
    let status = TaskStatus::parse(raw)
        .ok_or_else(|| TaskError::validation("status", "Invalid task status"))?;
    Ok(AssigneeUpdate { status })
}

/// Parse and range-check a `YYYY-MM-DD` due date. Records errors into the
/// bag and returns the normalized value only when valid.
fn parse_due_date(raw: &str, errors: &mut ErrorBag) -> Option<String> {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Err(_) => {
            errors.add("due_date", "Please provide a valid due date");
            None
        }
        Ok(date) => {
            if date < Utc::now().date_naive() {
                errors.add("due_date", "Due date must be today or in the future");
                None
            } else {
                Some(date.format("%Y-%m-%d").to_string())
            }
        }
    }
}
