//! Store contracts.
//!
//! The core treats persistence as a key-indexed mapping with
//! query-by-predicate. Two backends implement these traits: an in-memory
//! store and a SQLite store.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::task::types::{Task, TaskPriority, TaskStatus};
use crate::user::{Role, User};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Predicate for task queries: equality filters plus ordering and a limit.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    /// Matches tasks whose assignee set contains this user.
    pub assignee: Option<Uuid>,
    pub newest_first: bool,
    pub limit: Option<usize>,
}

impl TaskFilter {
    /// Match every task.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match tasks assigned to the given user.
    pub fn assigned_to(user_id: Uuid) -> Self {
        Self {
            assignee: Some(user_id),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn newest_first(mut self, limit: usize) -> Self {
        self.newest_first = true;
        self.limit = Some(limit);
        self
    }

    /// Whether the equality part of the predicate matches a task. Ordering
    /// and limit are applied by the backend.
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        if let Some(assignee) = self.assignee {
            if !task.assigned_to.contains(&assignee) {
                return false;
            }
        }
        true
    }
}

/// Task persistence contract.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Task>>;
    async fn find(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>>;
    async fn count(&self, filter: &TaskFilter) -> StoreResult<usize>;
    /// Insert or replace; the task id is the key.
    async fn put(&self, task: Task) -> StoreResult<Task>;
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

/// User persistence and display-info resolution.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Users with the given role, most recently created first.
    async fn find_by_role(&self, role: Role, limit: Option<usize>) -> StoreResult<Vec<User>>;
    async fn insert(&self, user: User) -> StoreResult<User>;
    async fn update(&self, user: User) -> StoreResult<User>;
}
