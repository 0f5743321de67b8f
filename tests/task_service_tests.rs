//! TaskService integration tests — no running server; tempdir-backed
//! SQLite via Storage::new (same migration path as production).

use taskd::auth;
use taskd::storage::Storage;
use taskd::tasks::error::TaskError;
use taskd::tasks::model::{
    AddDependencyRequest, AssignTaskRequest, CreateTaskRequest, TaskFilters, UpdateTaskRequest,
    UserRow,
};
use taskd::tasks::{TaskService, TaskStorage};

async fn make_service() -> (TaskService, TaskStorage, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let storage = Storage::new(dir.path()).await.expect("Storage::new failed");
    let ts = TaskStorage::new(storage.pool());
    (TaskService::new(TaskStorage::new(storage.pool())), ts, dir)
}

async fn make_user(s: &TaskStorage, email: &str, is_manager: bool) -> UserRow {
    let creds = auth::hash_password("password");
    s.create_user("Test User", email, &creds.salt, &creds.hash, is_manager)
        .await
        .expect("create_user failed")
}

fn create_req(title: &str, assigned_to: &str) -> CreateTaskRequest {
    CreateTaskRequest {
        title: Some(title.to_string()),
        assigned_to: Some(assigned_to.to_string()),
        ..Default::default()
    }
}

fn status_update(status: &str) -> UpdateTaskRequest {
    UpdateTaskRequest {
        status: Some(status.to_string()),
        ..Default::default()
    }
}

fn validation_fields(err: &TaskError) -> Vec<String> {
    match err {
        TaskError::Validation(errors) => errors.keys().cloned().collect(),
        other => panic!("expected validation error, got: {other:?}"),
    }
}

// ─── 1. Creation & authorization ─────────────────────────────────────────────

#[tokio::test]
async fn test_manager_creates_pending_task() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let user = make_user(&ts, "u1@example.com", false).await;

    let details = svc
        .create(&mgr, &create_req("Test Task", &user.id))
        .await
        .expect("create failed");

    assert_eq!(details.task.status, "pending");
    assert_eq!(details.task.created_by, mgr.id);
    assert_eq!(details.assignee.id, user.id);
    assert_eq!(details.creator.id, mgr.id);
    assert!(details.can_be_completed, "no dependencies — gate must pass");
}

#[tokio::test]
async fn test_non_manager_cannot_create_task() {
    let (svc, ts, _dir) = make_service().await;
    let user = make_user(&ts, "u1@example.com", false).await;

    let err = svc
        .create(&user, &create_req("Nope", &user.id))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Unauthorized));

    // No row was created.
    let all = ts
        .list_tasks(None, &TaskFilters::default())
        .await
        .expect("list failed");
    assert!(all.is_empty());
}

#[tokio::test]
async fn test_create_reports_every_invalid_field_at_once() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;

    let req = CreateTaskRequest {
        title: None,
        assigned_to: Some("no-such-user".to_string()),
        due_date: Some("2001-01-01".to_string()),
        dependencies: Some(vec!["no-such-task".to_string()]),
        ..Default::default()
    };
    let err = svc.create(&mgr, &req).await.unwrap_err();
    let fields = validation_fields(&err);
    assert_eq!(
        fields,
        vec!["assigned_to", "dependencies", "due_date", "title"]
    );
}

#[tokio::test]
async fn test_due_date_today_is_allowed() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let user = make_user(&ts, "u1@example.com", false).await;

    let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let mut req = create_req("Due today", &user.id);
    req.due_date = Some(today.clone());

    let details = svc.create(&mgr, &req).await.expect("create failed");
    assert_eq!(details.task.due_date.as_deref(), Some(today.as_str()));
}

// ─── 2. Visibility & filters ─────────────────────────────────────────────────

#[tokio::test]
async fn test_non_manager_sees_only_assigned_tasks() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;
    let u2 = make_user(&ts, "u2@example.com", false).await;

    svc.create(&mgr, &create_req("For U1", &u1.id)).await.unwrap();
    svc.create(&mgr, &create_req("For U2", &u2.id)).await.unwrap();

    let all = svc.list(&mgr, &TaskFilters::default()).await.unwrap();
    assert_eq!(all.len(), 2);

    let mine = svc.list(&u1, &TaskFilters::default()).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert!(mine.iter().all(|d| d.task.assigned_to == u1.id));
}

#[tokio::test]
async fn test_list_filters_and_combine() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;
    let u2 = make_user(&ts, "u2@example.com", false).await;

    svc.create(&mgr, &create_req("Pending U1", &u1.id)).await.unwrap();
    let b = svc.create(&mgr, &create_req("Progress U1", &u1.id)).await.unwrap();
    svc.create(&mgr, &create_req("Pending U2", &u2.id)).await.unwrap();
    svc.update(&mgr, &b.task.id, &status_update("in_progress"))
        .await
        .unwrap();

    let filters = TaskFilters {
        status: Some("pending".to_string()),
        assigned_user: Some(u1.id.clone()),
        ..Default::default()
    };
    let result = svc.list(&mgr, &filters).await.unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].task.title, "Pending U1");
}

#[tokio::test]
async fn test_list_filters_due_date_range() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;

    let today = chrono::Utc::now().date_naive();
    let soon = (today + chrono::Duration::days(3)).format("%Y-%m-%d").to_string();
    let later = (today + chrono::Duration::days(40)).format("%Y-%m-%d").to_string();

    let mut req = create_req("Soon", &u1.id);
    req.due_date = Some(soon.clone());
    svc.create(&mgr, &req).await.unwrap();
    let mut req = create_req("Later", &u1.id);
    req.due_date = Some(later);
    svc.create(&mgr, &req).await.unwrap();

    let filters = TaskFilters {
        due_date_from: Some(today.format("%Y-%m-%d").to_string()),
        due_date_to: Some((today + chrono::Duration::days(30)).format("%Y-%m-%d").to_string()),
        ..Default::default()
    };
    let result = svc.list(&mgr, &filters).await.unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].task.title, "Soon");
}

#[tokio::test]
async fn test_get_outside_visibility_is_not_found() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;
    let u2 = make_user(&ts, "u2@example.com", false).await;

    let t = svc.create(&mgr, &create_req("For U1", &u1.id)).await.unwrap();

    // Existence is not leaked: not-found, not a 403-style denial.
    let err = svc.get(&u2, &t.task.id).await.unwrap_err();
    assert!(matches!(err, TaskError::NotFound));
    assert!(svc.get(&u1, &t.task.id).await.is_ok());
}

// ─── 3. Completion gate ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_gate_blocks_until_dependencies_complete() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;
    let u2 = make_user(&ts, "u2@example.com", false).await;

    let b = svc.create(&mgr, &create_req("Task B", &u2.id)).await.unwrap();
    let mut req = create_req("Task A", &u1.id);
    req.dependencies = Some(vec![b.task.id.clone()]);
    let a = svc.create(&mgr, &req).await.unwrap();
    assert!(!a.can_be_completed);

    // Assignee of A cannot complete while B is pending.
    let err = svc
        .update(&u1, &a.task.id, &status_update("completed"))
        .await
        .unwrap_err();
    assert_eq!(validation_fields(&err), vec!["status"]);
    let unchanged = ts.get_task(&a.task.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, "pending");

    // Manager completes B; the gate now passes for A.
    svc.update(&mgr, &b.task.id, &status_update("completed"))
        .await
        .unwrap();
    let done = svc
        .update(&u1, &a.task.id, &status_update("completed"))
        .await
        .unwrap();
    assert_eq!(done.task.status, "completed");
    assert!(done.can_be_completed);
}

#[tokio::test]
async fn test_cancelled_dependency_still_blocks() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;

    let dep = svc.create(&mgr, &create_req("Dep", &u1.id)).await.unwrap();
    let mut req = create_req("Main", &u1.id);
    req.dependencies = Some(vec![dep.task.id.clone()]);
    let main = svc.create(&mgr, &req).await.unwrap();

    svc.update(&mgr, &dep.task.id, &status_update("cancelled"))
        .await
        .unwrap();
    let err = svc
        .update(&u1, &main.task.id, &status_update("completed"))
        .await
        .unwrap_err();
    assert_eq!(validation_fields(&err), vec!["status"]);
}

#[tokio::test]
async fn test_gate_binds_managers_too() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;

    let dep = svc.create(&mgr, &create_req("Dep", &u1.id)).await.unwrap();
    let mut req = create_req("Main", &u1.id);
    req.dependencies = Some(vec![dep.task.id.clone()]);
    let main = svc.create(&mgr, &req).await.unwrap();

    let err = svc
        .update(&mgr, &main.task.id, &status_update("completed"))
        .await
        .unwrap_err();
    assert_eq!(validation_fields(&err), vec!["status"]);
}

#[tokio::test]
async fn test_completed_task_can_be_reopened() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;

    let t = svc.create(&mgr, &create_req("Task", &u1.id)).await.unwrap();
    svc.update(&mgr, &t.task.id, &status_update("completed"))
        .await
        .unwrap();

    // No terminal-state enforcement: completed → pending is unguarded.
    let reopened = svc
        .update(&mgr, &t.task.id, &status_update("pending"))
        .await
        .unwrap();
    assert_eq!(reopened.task.status, "pending");
}

// ─── 4. Update contracts ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_assignee_cannot_update_foreign_task() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;
    let u2 = make_user(&ts, "u2@example.com", false).await;

    let t = svc.create(&mgr, &create_req("For U1", &u1.id)).await.unwrap();

    // Denied before any validation runs — even a bogus status is irrelevant.
    let err = svc
        .update(&u2, &t.task.id, &status_update("not-a-status"))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Unauthorized));
}

#[tokio::test]
async fn test_assignee_update_requires_status() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;

    let t = svc.create(&mgr, &create_req("For U1", &u1.id)).await.unwrap();
    let err = svc
        .update(&u1, &t.task.id, &UpdateTaskRequest::default())
        .await
        .unwrap_err();
    assert_eq!(validation_fields(&err), vec!["status"]);
}

#[tokio::test]
async fn test_assignee_update_ignores_manager_fields() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;
    let u2 = make_user(&ts, "u2@example.com", false).await;

    let t = svc.create(&mgr, &create_req("For U1", &u1.id)).await.unwrap();
    let req = UpdateTaskRequest {
        title: Some("Hijacked".to_string()),
        assigned_to: Some(u2.id.clone()),
        status: Some("in_progress".to_string()),
        ..Default::default()
    };
    let updated = svc.update(&u1, &t.task.id, &req).await.unwrap();

    assert_eq!(updated.task.status, "in_progress");
    assert_eq!(updated.task.title, "For U1");
    assert_eq!(updated.task.assigned_to, u1.id);
}

#[tokio::test]
async fn test_manager_update_clears_nullable_fields() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;

    let mut req = create_req("Task", &u1.id);
    req.description = Some("initial".to_string());
    let t = svc.create(&mgr, &req).await.unwrap();

    // Explicit null clears; absent leaves untouched.
    let patch = UpdateTaskRequest {
        description: Some(None),
        ..Default::default()
    };
    let updated = svc.update(&mgr, &t.task.id, &patch).await.unwrap();
    assert_eq!(updated.task.description, None);
    assert_eq!(updated.task.title, "Task");
}

// ─── 5. Dependency edges ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_replace_dependency_set_is_idempotent() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;

    let d1 = svc.create(&mgr, &create_req("D1", &u1.id)).await.unwrap();
    let d2 = svc.create(&mgr, &create_req("D2", &u1.id)).await.unwrap();
    let t = svc.create(&mgr, &create_req("Main", &u1.id)).await.unwrap();

    let req = UpdateTaskRequest {
        dependencies: Some(vec![d1.task.id.clone(), d2.task.id.clone()]),
        ..Default::default()
    };
    svc.update(&mgr, &t.task.id, &req).await.unwrap();
    let first = ts.list_dependencies(&t.task.id).await.unwrap();

    svc.update(&mgr, &t.task.id, &req).await.unwrap();
    let second = ts.list_dependencies(&t.task.id).await.unwrap();

    let targets =
        |edges: &[taskd::tasks::model::DependencyRow]| -> Vec<String> {
            edges.iter().map(|e| e.dependency_id.clone()).collect()
        };
    assert_eq!(targets(&first), targets(&second));
    // Delete-then-insert: ids are re-issued on every replacement.
    assert!(first.iter().zip(&second).all(|(a, b)| a.id != b.id));
}

#[tokio::test]
async fn test_self_dependency_rejected_everywhere() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;

    let t = svc.create(&mgr, &create_req("Task", &u1.id)).await.unwrap();

    let req = UpdateTaskRequest {
        dependencies: Some(vec![t.task.id.clone()]),
        ..Default::default()
    };
    let err = svc.update(&mgr, &t.task.id, &req).await.unwrap_err();
    assert_eq!(validation_fields(&err), vec!["dependencies"]);

    let req = AddDependencyRequest {
        dependency_id: Some(t.task.id.clone()),
    };
    let err = svc.add_dependency(&mgr, &t.task.id, &req).await.unwrap_err();
    assert_eq!(validation_fields(&err), vec!["dependency_id"]);

    assert!(ts.list_dependencies(&t.task.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_dependency_permits_duplicates() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;

    let dep = svc.create(&mgr, &create_req("Dep", &u1.id)).await.unwrap();
    let t = svc.create(&mgr, &create_req("Main", &u1.id)).await.unwrap();

    let req = AddDependencyRequest {
        dependency_id: Some(dep.task.id.clone()),
    };
    svc.add_dependency(&mgr, &t.task.id, &req).await.unwrap();
    svc.add_dependency(&mgr, &t.task.id, &req).await.unwrap();

    assert_eq!(ts.list_dependencies(&t.task.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_non_manager_cannot_touch_dependencies() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;

    let dep = svc.create(&mgr, &create_req("Dep", &u1.id)).await.unwrap();
    let t = svc.create(&mgr, &create_req("Main", &u1.id)).await.unwrap();

    let req = AddDependencyRequest {
        dependency_id: Some(dep.task.id.clone()),
    };
    let err = svc.add_dependency(&u1, &t.task.id, &req).await.unwrap_err();
    assert!(matches!(err, TaskError::Unauthorized));

    let edge = svc.add_dependency(&mgr, &t.task.id, &req).await.unwrap();
    let err = svc
        .remove_dependency(&u1, &t.task.id, &edge.edge.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Unauthorized));
}

#[tokio::test]
async fn test_remove_dependency_is_scoped_to_task() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;

    let dep = svc.create(&mgr, &create_req("Dep", &u1.id)).await.unwrap();
    let a = svc.create(&mgr, &create_req("A", &u1.id)).await.unwrap();
    let b = svc.create(&mgr, &create_req("B", &u1.id)).await.unwrap();

    let edge = svc
        .add_dependency(
            &mgr,
            &a.task.id,
            &AddDependencyRequest {
                dependency_id: Some(dep.task.id.clone()),
            },
        )
        .await
        .unwrap();

    // The edge belongs to A — removing it through B is not-found.
    let err = svc
        .remove_dependency(&mgr, &b.task.id, &edge.edge.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::NotFound));

    svc.remove_dependency(&mgr, &a.task.id, &edge.edge.id)
        .await
        .unwrap();
    assert!(ts.list_dependencies(&a.task.id).await.unwrap().is_empty());
}

// ─── 6. Assignment ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_assign_changes_only_the_assignee() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;
    let u2 = make_user(&ts, "u2@example.com", false).await;

    let t = svc.create(&mgr, &create_req("Task", &u1.id)).await.unwrap();
    let req = AssignTaskRequest {
        assigned_to: Some(u2.id.clone()),
    };
    let updated = svc.assign(&mgr, &t.task.id, &req).await.unwrap();

    assert_eq!(updated.assignee.id, u2.id);
    assert_eq!(updated.task.title, "Task");
    assert_eq!(updated.task.status, "pending");
}

#[tokio::test]
async fn test_assign_validates_target_user() {
    let (svc, ts, _dir) = make_service().await;
    let mgr = make_user(&ts, "mgr@example.com", true).await;
    let u1 = make_user(&ts, "u1@example.com", false).await;

    let t = svc.create(&mgr, &create_req("Task", &u1.id)).await.unwrap();
    let req = AssignTaskRequest {
        assigned_to: Some("no-such-user".to_string()),
    };
    let err = svc.assign(&mgr, &t.task.id, &req).await.unwrap_err();
    assert_eq!(validation_fields(&err), vec!["assigned_to"]);

    let err = svc
        .assign(&u1, &t.task.id, &AssignTaskRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Unauthorized));
}
