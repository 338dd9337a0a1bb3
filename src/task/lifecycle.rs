//! Task lifecycle coordinator.
//!
//! Orchestrates fetch, authorize, mutate, recompute and persist for every
//! task operation. Each operation is fail-fast: validation and access checks
//! run before anything is written, so a rejected call leaves the stored task
//! unchanged.
//!
//! Every store call carries the configured deadline and surfaces
//! `StoreUnavailable` on expiry. Idempotent reads are retried once; writes
//! never are, since a replayed merge is not idempotent.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::store::{StoreResult, TaskFilter, TaskStore, UserDirectory};
use crate::user::{Role, UserSummary};

use super::access::{can_access, Principal, TaskAction};
use super::dashboard::StatusSummary;
use super::progress;
use super::types::{Task, TaskDetail, TaskDraft, TaskPatch, TaskStatus};

/// Coordinates task operations against the store and the user directory.
pub struct TaskService {
    pub(crate) store: Arc<dyn TaskStore>,
    pub(crate) users: Arc<dyn UserDirectory>,
    store_timeout: Duration,
}

/// One page of tasks plus the status summary over the same base filter.
#[derive(Debug)]
pub struct TaskList {
    pub tasks: Vec<TaskDetail>,
    pub status_summary: StatusSummary,
}

impl TaskService {
    pub fn new(
        store: Arc<dyn TaskStore>,
        users: Arc<dyn UserDirectory>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            users,
            store_timeout,
        }
    }

    /// Run one store call under the configured deadline.
    pub(crate) async fn store_call<T>(
        &self,
        fut: impl Future<Output = StoreResult<T>> + Send,
    ) -> ServiceResult<T> {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(ServiceError::StoreUnavailable(
                "store call timed out".to_string(),
            )),
        }
    }

    /// Run an idempotent read, retrying once if the store was unavailable.
    pub(crate) async fn store_read<T, F, Fut>(&self, mut op: F) -> ServiceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>> + Send,
    {
        match self.store_call(op()).await {
            Err(ServiceError::StoreUnavailable(_)) => {
                tracing::warn!("store read timed out, retrying once");
                self.store_call(op()).await
            }
            other => other,
        }
    }

    async fn fetch(&self, id: Uuid) -> ServiceResult<Task> {
        self.store_read(|| self.store.get(id))
            .await?
            .ok_or(ServiceError::NotFound("task"))
    }

    /// `assignedTo` payloads must be an array of user ids.
    fn parse_assignees(value: &Value) -> ServiceResult<Vec<Uuid>> {
        let items = value.as_array().ok_or_else(|| {
            ServiceError::Validation("assignedTo must be an array of user ids".to_string())
        })?;
        items
            .iter()
            .map(|v| {
                v.as_str()
                    .and_then(|s| Uuid::parse_str(s).ok())
                    .ok_or_else(|| {
                        ServiceError::Validation(
                            "assignedTo must be an array of user ids".to_string(),
                        )
                    })
            })
            .collect()
    }

    /// Create a task owned by the calling principal.
    pub async fn create(&self, principal: &Principal, draft: TaskDraft) -> ServiceResult<Task> {
        if draft.title.trim().is_empty() {
            return Err(ServiceError::Validation("title is required".to_string()));
        }
        let assigned_to = Self::parse_assignees(&draft.assigned_to)?;

        let mut task = Task {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            status: TaskStatus::Pending,
            due_date: draft.due_date,
            owner: principal.id,
            created_by: principal.id,
            assigned_to,
            todo_checklist: Vec::new(),
            attachments: draft.attachments.unwrap_or_default(),
            progress: 0,
            created_at: Utc::now(),
        };
        if let Some(checklist) = &draft.todo_checklist {
            progress::apply_checklist(&mut task, checklist)?;
        }

        let task = self.store_call(self.store.put(task)).await?;
        tracing::info!(task = %task.id, owner = %task.owner, "task created");
        Ok(task)
    }

    /// Merge-patch a task: only fields present in the patch are applied.
    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        patch: TaskPatch,
    ) -> ServiceResult<Task> {
        let mut task = self.fetch(id).await?;
        if !can_access(principal, &task, TaskAction::Mutate) {
            return Err(ServiceError::Forbidden);
        }

        // Validate before touching anything so a rejected patch leaves the
        // stored task unchanged.
        let assigned_to = patch
            .assigned_to
            .as_ref()
            .map(Self::parse_assignees)
            .transpose()?;

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(todo_checklist) = patch.todo_checklist {
            // Verbatim replacement; progress is only re-derived by the
            // dedicated checklist operation.
            task.todo_checklist = todo_checklist;
        }
        if let Some(attachments) = patch.attachments {
            task.attachments = attachments;
        }
        if let Some(assigned_to) = assigned_to {
            task.assigned_to = assigned_to;
        }

        let task = self.store_call(self.store.put(task)).await?;
        tracing::debug!(task = %task.id, "task updated");
        Ok(task)
    }

    /// Set the status verbatim, bypassing progress derivation.
    pub async fn set_status(
        &self,
        principal: &Principal,
        id: Uuid,
        status: &str,
    ) -> ServiceResult<Task> {
        let status: TaskStatus = status.parse().map_err(|_| {
            ServiceError::Validation(
                "status must be one of: Pending, In Progress, Completed".to_string(),
            )
        })?;

        let mut task = self.fetch(id).await?;
        if !can_access(principal, &task, TaskAction::SetStatus) {
            return Err(ServiceError::Forbidden);
        }

        task.status = status;
        let task = self.store_call(self.store.put(task)).await?;
        tracing::debug!(task = %task.id, status = status.as_str(), "status overridden");
        Ok(task)
    }

    /// Replace the checklist and re-derive progress and status.
    pub async fn set_checklist(
        &self,
        principal: &Principal,
        id: Uuid,
        checklist: &Value,
    ) -> ServiceResult<Task> {
        let mut task = self.fetch(id).await?;
        if !can_access(principal, &task, TaskAction::SetChecklist) {
            return Err(ServiceError::Forbidden);
        }

        progress::apply_checklist(&mut task, checklist)?;
        let task = self.store_call(self.store.put(task)).await?;
        tracing::debug!(task = %task.id, progress = task.progress, "checklist replaced");
        Ok(task)
    }

    /// Delete a task. Follows the mutate access rule.
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> ServiceResult<()> {
        let task = self.fetch(id).await?;
        if !can_access(principal, &task, TaskAction::Delete) {
            return Err(ServiceError::Forbidden);
        }

        self.store_call(self.store.delete(id)).await?;
        tracing::info!(task = %id, "task deleted");
        Ok(())
    }

    /// Fetch one task with resolved assignee info. Applies the same read
    /// policy as list filtering.
    pub async fn get(&self, principal: &Principal, id: Uuid) -> ServiceResult<TaskDetail> {
        let task = self.fetch(id).await?;
        if !can_access(principal, &task, TaskAction::Read) {
            return Err(ServiceError::Forbidden);
        }
        let assignees = self.resolve_assignees(&task).await?;
        Ok(TaskDetail::new(task, assignees))
    }

    /// List tasks visible to the principal, optionally filtered by status,
    /// with a status summary over the unfiltered visible set.
    pub async fn list(
        &self,
        principal: &Principal,
        status: Option<TaskStatus>,
    ) -> ServiceResult<TaskList> {
        let base = self.visible_filter(principal);
        let filter = match status {
            Some(status) => base.clone().with_status(status),
            None => base.clone(),
        };

        let tasks = self.store_read(|| self.store.find(&filter)).await?;
        let mut details = Vec::with_capacity(tasks.len());
        for task in tasks {
            let assignees = self.resolve_assignees(&task).await?;
            details.push(TaskDetail::new(task, assignees));
        }

        let status_summary = self.status_summary(&base).await?;
        Ok(TaskList {
            tasks: details,
            status_summary,
        })
    }

    /// The base filter for what a principal may see: admins everything,
    /// members their assigned tasks.
    pub(crate) fn visible_filter(&self, principal: &Principal) -> TaskFilter {
        match principal.role {
            Role::Admin => TaskFilter::all(),
            Role::Member => TaskFilter::assigned_to(principal.id),
        }
    }

    /// Resolve assignee ids to display info, skipping ids the directory no
    /// longer knows.
    pub(crate) async fn resolve_assignees(&self, task: &Task) -> ServiceResult<Vec<UserSummary>> {
        let lookups = task
            .assigned_to
            .iter()
            .map(|&id| self.store_read(move || self.users.find_by_id(id)));
        let users = futures::future::try_join_all(lookups).await?;
        Ok(users
            .iter()
            .flatten()
            .map(UserSummary::from)
            .collect())
    }
}
