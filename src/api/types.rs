//! Request and response types.
//!
//! Wire field names are camelCase to match the dashboard frontend; internal
//! types stay snake_case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::dashboard::{DashboardStats, StatusSummary};
use crate::task::types::{ChecklistItem, TaskDetail, TaskPriority, TaskStatus};
use crate::user::{Role, User, UserSummary};

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub profile_image_url: Option<String>,
    /// Matching the configured invite token grants the admin role.
    pub admin_invite_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Profile plus a fresh bearer token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub profile_image_url: Option<String>,
    pub token: String,
}

impl AuthResponse {
    pub fn new(user: &User, token: String) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            profile_image_url: user.avatar_url.clone(),
            token,
        }
    }
}

/// A user profile without credentials.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub profile_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for ProfileResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            profile_image_url: user.avatar_url.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub image_url: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

/// Assignee display info embedded in task responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummaryView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub profile_image_url: Option<String>,
}

impl From<UserSummary> for UserSummaryView {
    fn from(summary: UserSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            email: summary.email,
            profile_image_url: summary.avatar_url,
        }
    }
}

/// A member with their per-status task counts, for the admin user list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithCounts {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub profile_image_url: Option<String>,
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    pub completed_tasks: usize,
}

impl UserWithCounts {
    pub fn new(user: &User, summary: &StatusSummary) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            profile_image_url: user.avatar_url.clone(),
            pending_tasks: summary.pending_tasks,
            in_progress_tasks: summary.in_progress_tasks,
            completed_tasks: summary.completed_tasks,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tasks
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistUpdateRequest {
    /// Raw JSON; the checklist engine validates the shape.
    pub todo_checklist: serde_json::Value,
}

/// A task with assignees resolved to display info.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub owner: Uuid,
    pub created_by: Uuid,
    pub assigned_to: Vec<UserSummaryView>,
    pub todo_checklist: Vec<ChecklistItem>,
    pub attachments: Vec<String>,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub completed_todo_count: usize,
}

impl From<TaskDetail> for TaskView {
    fn from(detail: TaskDetail) -> Self {
        let TaskDetail {
            task,
            assignees,
            completed_todo_count,
        } = detail;
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            priority: task.priority,
            status: task.status,
            due_date: task.due_date,
            owner: task.owner,
            created_by: task.created_by,
            assigned_to: assignees.into_iter().map(UserSummaryView::from).collect(),
            todo_checklist: task.todo_checklist,
            attachments: task.attachments,
            progress: task.progress,
            created_at: task.created_at,
            completed_todo_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListResponse {
    pub tasks: Vec<TaskView>,
    pub status_summary: StatusSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub stats: DashboardStats,
    pub latest_tasks: Vec<TaskView>,
    /// Present on the role-scoped dashboard, absent on the member one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_members: Option<Vec<UserSummaryView>>,
}
