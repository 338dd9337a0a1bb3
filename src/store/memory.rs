//! In-memory store, used by tests and ephemeral runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::task::types::Task;
use crate::user::{Role, User};

use super::{StoreResult, TaskFilter, TaskStore, UserDirectory};

/// Volatile store backed by two maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply_order_and_limit(mut tasks: Vec<Task>, filter: &TaskFilter) -> Vec<Task> {
    if filter.newest_first {
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    } else {
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    }
    if let Some(limit) = filter.limit {
        tasks.truncate(limit);
    }
    tasks
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn find(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let tasks = self.tasks.read().await;
        let matched: Vec<Task> = tasks.values().filter(|t| filter.matches(t)).cloned().collect();
        Ok(apply_order_and_limit(matched, filter))
    }

    async fn count(&self, filter: &TaskFilter) -> StoreResult<usize> {
        let tasks = self.tasks.read().await;
        Ok(tasks.values().filter(|t| filter.matches(t)).count())
    }

    async fn put(&self, task: Task) -> StoreResult<Task> {
        self.tasks.write().await.insert(task.id, task.clone());
        Ok(task)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.tasks.write().await.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_role(&self, role: Role, limit: Option<usize>) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        let mut matched: Vec<User> = users.values().filter(|u| u.role == role).cloned().collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn insert(&self, user: User) -> StoreResult<User> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> StoreResult<User> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::types::{TaskPriority, TaskStatus};
    use chrono::{Duration, Utc};

    fn task_at(minutes_ago: i64, status: TaskStatus, assignee: Option<Uuid>) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: format!("task {minutes_ago}m ago"),
            description: String::new(),
            priority: TaskPriority::Medium,
            status,
            due_date: None,
            owner: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            assigned_to: assignee.into_iter().collect(),
            todo_checklist: Vec::new(),
            attachments: Vec::new(),
            progress: 0,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn find_filters_by_status_and_assignee() {
        let store = MemoryStore::new();
        let me = Uuid::new_v4();
        store.put(task_at(1, TaskStatus::Pending, Some(me))).await.unwrap();
        store.put(task_at(2, TaskStatus::Completed, Some(me))).await.unwrap();
        store.put(task_at(3, TaskStatus::Pending, None)).await.unwrap();

        let mine = store.find(&TaskFilter::assigned_to(me)).await.unwrap();
        assert_eq!(mine.len(), 2);

        let mine_pending = store
            .find(&TaskFilter::assigned_to(me).with_status(TaskStatus::Pending))
            .await
            .unwrap();
        assert_eq!(mine_pending.len(), 1);

        assert_eq!(store.count(&TaskFilter::all()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn find_orders_newest_first_with_limit() {
        let store = MemoryStore::new();
        for minutes in [30, 10, 20] {
            store.put(task_at(minutes, TaskStatus::Pending, None)).await.unwrap();
        }

        let latest = store.find(&TaskFilter::all().newest_first(2)).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert!(latest[0].created_at > latest[1].created_at);
        assert_eq!(latest[0].title, "task 10m ago");
    }

    #[tokio::test]
    async fn put_replaces_by_id() {
        let store = MemoryStore::new();
        let mut task = task_at(1, TaskStatus::Pending, None);
        store.put(task.clone()).await.unwrap();
        task.title = "renamed".to_string();
        store.put(task.clone()).await.unwrap();

        let stored = store.get(task.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "renamed");
        assert_eq!(store.count(&TaskFilter::all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn users_by_role_are_newest_first() {
        let store = MemoryStore::new();
        for (name, role, minutes) in [
            ("ada", Role::Member, 30),
            ("bob", Role::Member, 10),
            ("cal", Role::Admin, 5),
        ] {
            let mut user = User::new(
                name.to_string(),
                format!("{name}@example.com"),
                "hash".to_string(),
                role,
                None,
            );
            user.created_at = Utc::now() - Duration::minutes(minutes);
            store.insert(user).await.unwrap();
        }

        let members = store.find_by_role(Role::Member, None).await.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name, "bob");

        let limited = store.find_by_role(Role::Member, Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
    }
}
