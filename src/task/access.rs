//! Access control evaluator.
//!
//! A pure predicate over (principal, task, action). The coordinator maps a
//! denial to `Forbidden` without leaking anything about the task.

use uuid::Uuid;

use crate::user::Role;

use super::types::Task;

/// An authenticated actor, derived per-request from a verified credential
/// and a directory lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

/// The operations access control distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Read,
    Mutate,
    Delete,
    SetStatus,
    SetChecklist,
}

/// Decide whether `principal` may perform `action` on `task`.
///
/// Admins may do anything. Members may read tasks they are assigned to, and
/// may mutate tasks they own or are assigned to. Delete follows the mutate
/// rule rather than being open to every authenticated principal.
pub fn can_access(principal: &Principal, task: &Task, action: TaskAction) -> bool {
    if principal.role == Role::Admin {
        return true;
    }

    let is_owner = task.owner == principal.id;
    let is_assignee = task.assigned_to.contains(&principal.id);

    match action {
        TaskAction::Read => is_assignee,
        TaskAction::Mutate
        | TaskAction::Delete
        | TaskAction::SetStatus
        | TaskAction::SetChecklist => is_owner || is_assignee,
    }
}
