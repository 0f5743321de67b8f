//! Role-based authorization policy.
//!
//! Pure decisions over an explicit actor — no ambient "current user"
//! lookup. Callers enforce the denial; nothing here touches storage.
//!
//! Managers hold the elevated capabilities (create, assign, edit any
//! field, manage dependency edges). An assignee may only move the status
//! of a task currently assigned to them.

use crate::tasks::model::{TaskRow, UserRow};

/// Which update contract applies to an actor for a given task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateScope {
    /// Full field set plus dependency replacement.
    Manager,
    /// Status only, on the actor's own task.
    Assignee,
}

/// Create, assign, and dependency mutation are manager capabilities.
pub fn can_create_tasks(actor: &UserRow) -> bool {
    actor.is_manager
}

pub fn can_assign_tasks(actor: &UserRow) -> bool {
    actor.is_manager
}

pub fn can_manage_dependencies(actor: &UserRow) -> bool {
    actor.is_manager
}

/// Visibility filter for list/read: `None` means the actor sees all
/// tasks, `Some(id)` restricts to tasks assigned to that user. Always a
/// filter, never a failure.
pub fn visible_assignee(actor: &UserRow) -> Option<&str> {
    if actor.is_manager {
        None
    } else {
        Some(&actor.id)
    }
}

/// Whether the actor may read this specific task.
pub fn can_view(actor: &UserRow, task: &TaskRow) -> bool {
    actor.is_manager || task.assigned_to == actor.id
}

/// Resolve the update contract for an actor on a task.
///
/// `None` is a denial: a non-manager touching a task not assigned to
/// them is refused before any request validation runs.
pub fn update_scope(actor: &UserRow, task: &TaskRow) -> Option<UpdateScope> {
    if actor.is_manager {
        Some(UpdateScope::Manager)
    } else if task.assigned_to == actor.id {
        Some(UpdateScope::Assignee)
    } else {
        None
    }
}
