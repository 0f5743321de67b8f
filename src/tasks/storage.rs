//! SQLite operations for users, tasks, and dependency edges.

use sqlx::SqlitePool;

use super::error::TaskError;
use super::gate;
use super::model::{
    new_id, now_timestamp, DependencyRow, NewTask, TaskFilters, TaskPatch, TaskRow, TaskStatus,
    TaskUpdate, UserRow,
};

#[derive(Clone)]
pub struct TaskStorage {
    pub(crate) pool: SqlitePool,
}

impl TaskStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ─── Users ────────────────────────────────────────────────────────────

    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_salt: &str,
        password_hash: &str,
        is_manager: bool,
    ) -> Result<UserRow, TaskError> {
        let id = new_id();
        sqlx::query(
            "INSERT INTO users (id, name, email, password_salt, password_hash, is_manager, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(email)
        .bind(password_salt)
        .bind(password_hash)
        .bind(is_manager)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;
        self.get_user(&id).await?.ok_or(TaskError::NotFound)
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<UserRow>, TaskError> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>, TaskError> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn user_exists(&self, id: &str) -> Result<bool, TaskError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    // ─── API tokens ───────────────────────────────────────────────────────

    pub async fn insert_api_token(
        &self,
        user_id: &str,
        token_hash: &str,
    ) -> Result<(), TaskError> {
        sqlx::query(
            "INSERT INTO api_tokens (id, user_id, token_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(new_id())
        .bind(user_id)
        .bind(token_hash)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_user_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<UserRow>, TaskError> {
        Ok(sqlx::query_as(
            "SELECT u.* FROM users u JOIN api_tokens t ON t.user_id = u.id WHERE t.token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?)
    }

    // ─── Tasks ────────────────────────────────────────────────────────────

    /// Insert a task and its initial dependency edges in one transaction.
    pub async fn create_task(&self, new: &NewTask) -> Result<TaskRow, TaskError> {
        let id = new_id();
        let now = now_timestamp();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO tasks \
             (id, title, description, status, assigned_to, created_by, due_date, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.status.as_str())
        .bind(&new.assigned_to)
        .bind(&new.created_by)
        .bind(&new.due_date)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        for dep_id in &new.dependencies {
            sqlx::query(
                "INSERT INTO task_dependencies (id, task_id, dependency_id) VALUES (?, ?, ?)",
            )
            .bind(new_id())
            .bind(&id)
            .bind(dep_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.get_task(&id).await?.ok_or(TaskError::NotFound)
    }

    pub async fn get_task(&self, id: &str) -> Result<Option<TaskRow>, TaskError> {
        Ok(sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn task_exists(&self, id: &str) -> Result<bool, TaskError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// List tasks, optionally restricted to one assignee (the visibility
    /// scope), with AND-composed request filters on top.
    pub async fn list_tasks(
        &self,
        assignee_scope: Option<&str>,
        filters: &TaskFilters,
    ) -> Result<Vec<TaskRow>, TaskError> {
        let mut sql = String::from("SELECT * FROM tasks WHERE 1=1");
        let mut binds: Vec<String> = Vec::new();

        if let Some(assignee) = assignee_scope {
            sql.push_str(" AND assigned_to = ?");
            binds.push(assignee.to_string());
        }
        if let Some(status) = &filters.status {
            sql.push_str(" AND status = ?");
            binds.push(status.clone());
        }
        if let Some(user) = &filters.assigned_user {
            sql.push_str(" AND assigned_to = ?");
            binds.push(user.clone());
        }
        if let Some(from) = &filters.due_date_from {
            sql.push_str(" AND due_date >= ?");
            binds.push(from.clone());
        }
        if let Some(to) = &filters.due_date_to {
            sql.push_str(" AND due_date <= ?");
            binds.push(to.clone());
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");

        let mut query = sqlx::query_as::<_, TaskRow>(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    pub async fn set_assignee(&self, task_id: &str, user_id: &str) -> Result<(), TaskError> {
        sqlx::query("UPDATE tasks SET assigned_to = ?, updated_at = ? WHERE id = ?")
            .bind(user_id)
            .bind(now_timestamp())
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Apply an update atomically: the completion gate, the field writes,
    /// and any dependency-set replacement all run in one transaction, so
    /// no reader sees a half-replaced edge set and the gate can never be
    /// judged against a stale one.
    ///
    /// The gate inspects the edge set as it stands *before* this update —
    /// a request that both replaces dependencies and sets `completed` is
    /// judged against the old edges.
    pub async fn apply_update(
        &self,
        task_id: &str,
        update: &TaskUpdate,
    ) -> Result<(), TaskError> {
        let (patch, dependencies) = match update {
            TaskUpdate::Manager(m) => (m.patch.clone(), m.dependencies.as_deref()),
            TaskUpdate::Assignee(a) => (
                TaskPatch {
                    status: Some(a.status),
                    ..TaskPatch::default()
                },
                None,
            ),
        };

        let mut tx = self.pool.begin().await?;

        if patch.status == Some(TaskStatus::Completed) {
            let statuses: Vec<(String,)> = sqlx::query_as(
                "SELECT t.status FROM task_dependencies d \
                 JOIN tasks t ON t.id = d.dependency_id WHERE d.task_id = ?",
            )
            .bind(task_id)
            .fetch_all(&mut *tx)
            .await?;
            if !gate::deps_satisfied(statuses.iter().map(|(s,)| s.as_str())) {
                // Dropping the transaction rolls everything back.
                return Err(TaskError::validation(
                    "status",
                    "Cannot complete task: dependencies are not completed",
                ));
            }
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut binds: Vec<Option<String>> = Vec::new();
        if let Some(title) = &patch.title {
            sets.push("title = ?");
            binds.push(Some(title.clone()));
        }
        if let Some(description) = &patch.description {
            sets.push("description = ?");
            binds.push(description.clone());
        }
        if let Some(assigned_to) = &patch.assigned_to {
            sets.push("assigned_to = ?");
            binds.push(Some(assigned_to.clone()));
        }
        if let Some(due_date) = &patch.due_date {
            sets.push("due_date = ?");
            binds.push(due_date.clone());
        }
        if let Some(status) = patch.status {
            sets.push("status = ?");
            binds.push(Some(status.as_str().to_string()));
        }

        if !sets.is_empty() {
            sets.push("updated_at = ?");
            binds.push(Some(now_timestamp()));
            let sql = format!("UPDATE tasks SET {} WHERE id = ?", sets.join(", "));
            let mut query = sqlx::query(&sql);
            for bind in &binds {
                query = query.bind(bind);
            }
            query.bind(task_id).execute(&mut *tx).await?;
        }

        if let Some(dep_ids) = dependencies {
            // Delete-all-then-insert, not a diff: edge ids change on
            // every replacement.
            sqlx::query("DELETE FROM task_dependencies WHERE task_id = ?")
                .bind(task_id)
                .execute(&mut *tx)
                .await?;
            for dep_id in dep_ids {
                sqlx::query(
                    "INSERT INTO task_dependencies (id, task_id, dependency_id) VALUES (?, ?, ?)",
                )
                .bind(new_id())
                .bind(task_id)
                .bind(dep_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    // ─── Dependency edges ─────────────────────────────────────────────────

    pub async fn list_dependencies(
        &self,
        task_id: &str,
    ) -> Result<Vec<DependencyRow>, TaskError> {
        Ok(sqlx::query_as(
            "SELECT * FROM task_dependencies WHERE task_id = ? ORDER BY rowid ASC",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn insert_dependency(
        &self,
        task_id: &str,
        dependency_id: &str,
    ) -> Result<DependencyRow, TaskError> {
        let id = new_id();
        sqlx::query("INSERT INTO task_dependencies (id, task_id, dependency_id) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(task_id)
            .bind(dependency_id)
            .execute(&self.pool)
            .await?;
        Ok(
            sqlx::query_as("SELECT * FROM task_dependencies WHERE id = ?")
                .bind(&id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    /// Look up an edge by id, scoped to the owning task.
    pub async fn get_dependency(
        &self,
        task_id: &str,
        edge_id: &str,
    ) -> Result<Option<DependencyRow>, TaskError> {
        Ok(
            sqlx::query_as("SELECT * FROM task_dependencies WHERE id = ? AND task_id = ?")
                .bind(edge_id)
                .bind(task_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn delete_dependency(&self, edge_id: &str) -> Result<(), TaskError> {
        sqlx::query("DELETE FROM task_dependencies WHERE id = ?")
            .bind(edge_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Statuses of a task's direct dependencies, for gate evaluation
    /// outside an update (the `can_be_completed` response field).
    pub async fn dependency_statuses(&self, task_id: &str) -> Result<Vec<String>, TaskError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT t.status FROM task_dependencies d \
             JOIN tasks t ON t.id = d.dependency_id WHERE d.task_id = ?",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(s,)| s).collect())
    }
}
