//! Aggregation and dashboard reduction.
//!
//! Folds the visible task set into status/priority summaries. The count
//! queries are independent and read-only, so they are issued concurrently
//! and combined once all of them have answered.

use serde::Serialize;
use uuid::Uuid;

use crate::error::ServiceResult;
use crate::store::TaskFilter;
use crate::user::{Role, UserSummary};

use super::access::Principal;
use super::lifecycle::TaskService;
use super::types::{TaskDetail, TaskPriority, TaskStatus};

/// How many recent tasks/members a dashboard shows.
const RECENT_LIMIT: usize = 5;

/// Whose tasks a dashboard aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardScope {
    /// Every task in the system.
    Admin,
    /// Tasks assigned to one member.
    Member(Uuid),
}

impl DashboardScope {
    /// Scope implied by the caller's role.
    pub fn for_principal(principal: &Principal) -> Self {
        match principal.role {
            Role::Admin => Self::Admin,
            Role::Member => Self::Member(principal.id),
        }
    }

    fn base_filter(&self) -> TaskFilter {
        match self {
            Self::Admin => TaskFilter::all(),
            Self::Member(id) => TaskFilter::assigned_to(*id),
        }
    }
}

/// Status counts plus the total, as returned with task lists.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub all: usize,
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    pub completed_tasks: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PriorityCounts {
    pub low_priority: usize,
    pub medium_priority: usize,
    pub high_priority: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    pub completed_tasks: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_tasks: usize,
    pub priority: PriorityCounts,
    pub status: StatusCounts,
}

/// A reduced dashboard for one scope.
#[derive(Debug)]
pub struct Dashboard {
    pub stats: DashboardStats,
    /// Most recently created tasks in scope, newest first.
    pub latest_tasks: Vec<TaskDetail>,
    /// Most recently registered members; empty outside the admin scope.
    pub latest_members: Vec<UserSummary>,
}

impl TaskService {
    /// Status summary over a base filter. The four counts run concurrently.
    pub async fn status_summary(&self, base: &TaskFilter) -> ServiceResult<StatusSummary> {
        let pending = base.clone().with_status(TaskStatus::Pending);
        let in_progress = base.clone().with_status(TaskStatus::InProgress);
        let completed = base.clone().with_status(TaskStatus::Completed);

        let (all, pending, in_progress, completed) = tokio::join!(
            self.store_read(|| self.store.count(base)),
            self.store_read(|| self.store.count(&pending)),
            self.store_read(|| self.store.count(&in_progress)),
            self.store_read(|| self.store.count(&completed)),
        );

        Ok(StatusSummary {
            all: all?,
            pending_tasks: pending?,
            in_progress_tasks: in_progress?,
            completed_tasks: completed?,
        })
    }

    /// Reduce the scope's tasks into dashboard data.
    pub async fn dashboard(&self, scope: DashboardScope) -> ServiceResult<Dashboard> {
        let base = scope.base_filter();

        let low = base.clone().with_priority(TaskPriority::Low);
        let medium = base.clone().with_priority(TaskPriority::Medium);
        let high = base.clone().with_priority(TaskPriority::High);
        let pending = base.clone().with_status(TaskStatus::Pending);
        let in_progress = base.clone().with_status(TaskStatus::InProgress);
        let completed = base.clone().with_status(TaskStatus::Completed);

        let (total, low, medium, high, pending, in_progress, completed) = tokio::join!(
            self.store_read(|| self.store.count(&base)),
            self.store_read(|| self.store.count(&low)),
            self.store_read(|| self.store.count(&medium)),
            self.store_read(|| self.store.count(&high)),
            self.store_read(|| self.store.count(&pending)),
            self.store_read(|| self.store.count(&in_progress)),
            self.store_read(|| self.store.count(&completed)),
        );

        let stats = DashboardStats {
            total_tasks: total?,
            priority: PriorityCounts {
                low_priority: low?,
                medium_priority: medium?,
                high_priority: high?,
            },
            status: StatusCounts {
                pending_tasks: pending?,
                in_progress_tasks: in_progress?,
                completed_tasks: completed?,
            },
        };

        let recent = base.clone().newest_first(RECENT_LIMIT);
        let tasks = self.store_read(|| self.store.find(&recent)).await?;
        let mut latest_tasks = Vec::with_capacity(tasks.len());
        for task in tasks {
            let assignees = self.resolve_assignees(&task).await?;
            latest_tasks.push(TaskDetail::new(task, assignees));
        }

        let latest_members = match scope {
            DashboardScope::Admin => self
                .store_read(|| self.users.find_by_role(Role::Member, Some(RECENT_LIMIT)))
                .await?
                .iter()
                .map(UserSummary::from)
                .collect(),
            DashboardScope::Member(_) => Vec::new(),
        };

        Ok(Dashboard {
            stats,
            latest_tasks,
            latest_members,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, TaskStore, UserDirectory};
    use crate::task::types::Task;
    use crate::user::User;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::Arc;
    use std::time::Duration;

    fn service() -> (TaskService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = TaskService::new(
            store.clone(),
            store.clone(),
            Duration::from_secs(1),
        );
        (service, store)
    }

    fn seed_task(
        minutes_ago: i64,
        priority: TaskPriority,
        status: TaskStatus,
        assignee: Option<Uuid>,
    ) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: format!("seed {minutes_ago}"),
            description: String::new(),
            priority,
            status,
            due_date: None,
            owner: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            assigned_to: assignee.into_iter().collect(),
            todo_checklist: Vec::new(),
            attachments: Vec::new(),
            progress: 0,
            created_at: Utc::now() - ChronoDuration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn admin_dashboard_counts_everything() {
        let (service, store) = service();
        let me = Uuid::new_v4();

        store
            .put(seed_task(1, TaskPriority::Low, TaskStatus::Pending, Some(me)))
            .await
            .unwrap();
        store
            .put(seed_task(2, TaskPriority::High, TaskStatus::Completed, None))
            .await
            .unwrap();
        store
            .put(seed_task(3, TaskPriority::High, TaskStatus::InProgress, None))
            .await
            .unwrap();

        let dashboard = service.dashboard(DashboardScope::Admin).await.unwrap();
        assert_eq!(dashboard.stats.total_tasks, 3);
        assert_eq!(dashboard.stats.priority.low_priority, 1);
        assert_eq!(dashboard.stats.priority.medium_priority, 0);
        assert_eq!(dashboard.stats.priority.high_priority, 2);
        assert_eq!(dashboard.stats.status.pending_tasks, 1);
        assert_eq!(dashboard.stats.status.in_progress_tasks, 1);
        assert_eq!(dashboard.stats.status.completed_tasks, 1);
        assert_eq!(dashboard.latest_tasks.len(), 3);
        // Newest first.
        assert_eq!(dashboard.latest_tasks[0].task.title, "seed 1");
    }

    #[tokio::test]
    async fn member_dashboard_only_counts_assigned_tasks() {
        let (service, store) = service();
        let me = Uuid::new_v4();

        store
            .put(seed_task(1, TaskPriority::Low, TaskStatus::Pending, Some(me)))
            .await
            .unwrap();
        store
            .put(seed_task(2, TaskPriority::High, TaskStatus::Completed, None))
            .await
            .unwrap();

        let dashboard = service
            .dashboard(DashboardScope::Member(me))
            .await
            .unwrap();
        assert_eq!(dashboard.stats.total_tasks, 1);
        assert_eq!(dashboard.stats.status.completed_tasks, 0);
        assert_eq!(dashboard.latest_tasks.len(), 1);
        assert!(dashboard.latest_members.is_empty());
    }

    #[tokio::test]
    async fn latest_tasks_are_capped_at_five() {
        let (service, store) = service();
        for minutes in 0..8 {
            store
                .put(seed_task(minutes, TaskPriority::Medium, TaskStatus::Pending, None))
                .await
                .unwrap();
        }

        let dashboard = service.dashboard(DashboardScope::Admin).await.unwrap();
        assert_eq!(dashboard.stats.total_tasks, 8);
        assert_eq!(dashboard.latest_tasks.len(), 5);
        assert_eq!(dashboard.latest_tasks[0].task.title, "seed 0");
        assert_eq!(dashboard.latest_tasks[4].task.title, "seed 4");
    }

    #[tokio::test]
    async fn admin_dashboard_lists_recent_members_only() {
        let (service, store) = service();

        for (name, role, minutes) in [
            ("ada", Role::Member, 50),
            ("bob", Role::Member, 40),
            ("cal", Role::Admin, 1),
            ("dee", Role::Member, 30),
            ("eli", Role::Member, 20),
            ("fay", Role::Member, 10),
            ("gus", Role::Member, 5),
        ] {
            let mut user = User::new(
                name.to_string(),
                format!("{name}@example.com"),
                "hash".to_string(),
                role,
                None,
            );
            user.created_at = Utc::now() - ChronoDuration::minutes(minutes);
            store.insert(user).await.unwrap();
        }

        let dashboard = service.dashboard(DashboardScope::Admin).await.unwrap();
        let names: Vec<&str> = dashboard
            .latest_members
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["gus", "fay", "eli", "dee", "bob"]);
    }
}
