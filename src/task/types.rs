//! Task domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::UserSummary;

/// Task urgency bucket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl std::str::FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Task state, normally derived from checklist progress.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "In Progress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// A single trackable sub-task. Owned by exactly one task; it has no
/// identity of its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChecklistItem {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

/// A tracked task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    /// Creator of record; set once at creation.
    pub owner: Uuid,
    pub created_by: Uuid,
    pub assigned_to: Vec<Uuid>,
    pub todo_checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Percentage of checklist items completed, 0-100.
    pub progress: u8,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Number of completed checklist items.
    pub fn completed_todo_count(&self) -> usize {
        self.todo_checklist.iter().filter(|i| i.completed).count()
    }
}

/// Payload for creating a task.
///
/// `assigned_to` and `todo_checklist` arrive as raw JSON so the lifecycle
/// coordinator can reject malformed shapes with a validation error instead
/// of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assigned_to: serde_json::Value,
    pub todo_checklist: Option<serde_json::Value>,
    pub attachments: Option<Vec<String>>,
}

/// Merge patch for a task: a field is applied only when present, so an
/// omitted field always preserves the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    /// Replaces the checklist verbatim without re-deriving progress; only the
    /// dedicated checklist operation recomputes.
    pub todo_checklist: Option<Vec<ChecklistItem>>,
    pub attachments: Option<Vec<String>>,
    /// Raw JSON; must be an array of user ids when present.
    pub assigned_to: Option<serde_json::Value>,
}

/// A task resolved with assignee display info.
#[derive(Debug, Clone)]
pub struct TaskDetail {
    pub task: Task,
    pub assignees: Vec<UserSummary>,
    pub completed_todo_count: usize,
}

impl TaskDetail {
    pub fn new(task: Task, assignees: Vec<UserSummary>) -> Self {
        let completed_todo_count = task.completed_todo_count();
        Self {
            task,
            assignees,
            completed_todo_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_wire_strings() {
        for status in [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Completed] {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("Done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn status_serializes_with_space() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
    }

    #[test]
    fn checklist_item_completed_defaults_to_false() {
        let item: ChecklistItem = serde_json::from_str(r#"{"text":"write docs"}"#).unwrap();
        assert!(!item.completed);
    }
}
