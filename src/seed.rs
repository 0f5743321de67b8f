//! Demo data: one manager, three regular users, and a six-task graph
//! whose dependency edges exercise the completion gate.

use chrono::{Duration, Utc};
use tracing::info;

use crate::auth;
use crate::storage::Storage;
use crate::tasks::error::TaskError;
use crate::tasks::model::{NewTask, TaskStatus, UserRow};
use crate::tasks::TaskStorage;

/// All seeded accounts share this password.
pub const SEED_PASSWORD: &str = "password";

pub async fn run(storage: &Storage) -> Result<(), TaskError> {
    let s = TaskStorage::new(storage.pool());

    let manager = create_user(&s, "Manager User", "manager@example.com", true).await?;
    let user1 = create_user(&s, "Regular User 1", "user1@example.com", false).await?;
    let user2 = create_user(&s, "Regular User 2", "user2@example.com", false).await?;
    let user3 = create_user(&s, "Regular User 3", "user3@example.com", false).await?;

    let task1 = s
        .create_task(&demo_task(
            "Design Database Schema",
            "Create the initial database schema for the project",
            TaskStatus::Completed,
            &user1.id,
            &manager.id,
            5,
        ))
        .await?;
    let task2 = s
        .create_task(&demo_task(
            "Implement User Authentication",
            "Set up user authentication with opaque API tokens",
            TaskStatus::Completed,
            &user1.id,
            &manager.id,
            7,
        ))
        .await?;
    let task3 = s
        .create_task(&demo_task(
            "Create Task Management API",
            "Develop RESTful API for task management",
            TaskStatus::InProgress,
            &user2.id,
            &manager.id,
            10,
        ))
        .await?;
    let task4 = s
        .create_task(&demo_task(
            "Implement Task Dependencies",
            "Add functionality for task dependencies",
            TaskStatus::Pending,
            &user2.id,
            &manager.id,
            12,
        ))
        .await?;
    let task5 = s
        .create_task(&demo_task(
            "Write API Documentation",
            "Create comprehensive API documentation",
            TaskStatus::Pending,
            &user3.id,
            &manager.id,
            15,
        ))
        .await?;
    let task6 = s
        .create_task(&demo_task(
            "Create Frontend Interface",
            "Develop user interface for task management",
            TaskStatus::Pending,
            &user3.id,
            &manager.id,
            20,
        ))
        .await?;

    s.insert_dependency(&task3.id, &task1.id).await?;
    s.insert_dependency(&task3.id, &task2.id).await?;
    s.insert_dependency(&task4.id, &task3.id).await?;
    s.insert_dependency(&task5.id, &task3.id).await?;
    s.insert_dependency(&task6.id, &task4.id).await?;
    s.insert_dependency(&task6.id, &task5.id).await?;

    info!("seeded 4 users, 6 tasks, 6 dependency edges");
    Ok(())
}

async fn create_user(
    s: &TaskStorage,
    name: &str,
    email: &str,
    is_manager: bool,
) -> Result<UserRow, TaskError> {
    let creds = auth::hash_password(SEED_PASSWORD);
    s.create_user(name, email, &creds.salt, &creds.hash, is_manager)
        .await
}

fn demo_task(
    title: &str,
    description: &str,
    status: TaskStatus,
    assigned_to: &str,
    created_by: &str,
    due_in_days: i64,
) -> NewTask {
    let due = Utc::now().date_naive() + Duration::days(due_in_days);
    NewTask {
        title: title.to_string(),
        description: Some(description.to_string()),
        status,
        assigned_to: assigned_to.to_string(),
        created_by: created_by.to_string(),
        due_date: Some(due.format("%Y-%m-%d").to_string()),
        dependencies: Vec::new(),
    }
}
