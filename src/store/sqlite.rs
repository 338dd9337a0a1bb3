//! SQLite-backed store.
//!
//! Tasks and users live in their own tables; assignment membership is a join
//! table so predicate queries stay indexable. The checklist and attachments
//! are stored inline as JSON because they have no identity outside their
//! task. Timestamps are unix milliseconds so creation-time ordering is a
//! plain integer sort.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::task::types::{Task, TaskPriority, TaskStatus};
use crate::user::{Role, User};

use super::{StoreError, StoreResult, TaskFilter, TaskStore, UserDirectory};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL,
    avatar_url    TEXT,
    created_at    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id             TEXT PRIMARY KEY,
    title          TEXT NOT NULL,
    description    TEXT NOT NULL DEFAULT '',
    priority       TEXT NOT NULL,
    status         TEXT NOT NULL,
    due_date       INTEGER,
    owner          TEXT NOT NULL,
    created_by     TEXT NOT NULL,
    todo_checklist TEXT NOT NULL,
    attachments    TEXT NOT NULL,
    progress       INTEGER NOT NULL,
    created_at     INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS task_assignees (
    task_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    PRIMARY KEY (task_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);
CREATE INDEX IF NOT EXISTS idx_task_assignees_user ON task_assignees(user_id);
";

const TASK_COLUMNS: &str = "id, title, description, priority, status, due_date, owner, \
                            created_by, todo_checklist, attachments, progress, created_at";

/// Store backed by a single SQLite database file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn parse_uuid(raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| StoreError::Corrupt(format!("invalid uuid: {raw}")))
}

fn millis_to_datetime(millis: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::Corrupt(format!("invalid timestamp: {millis}")))
}

/// Column values of one task row, before parsing.
struct RawTask {
    id: String,
    title: String,
    description: String,
    priority: String,
    status: String,
    due_date: Option<i64>,
    owner: String,
    created_by: String,
    todo_checklist: String,
    attachments: String,
    progress: i64,
    created_at: i64,
}

fn raw_task_from_row(row: &Row<'_>) -> rusqlite::Result<RawTask> {
    Ok(RawTask {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        priority: row.get(3)?,
        status: row.get(4)?,
        due_date: row.get(5)?,
        owner: row.get(6)?,
        created_by: row.get(7)?,
        todo_checklist: row.get(8)?,
        attachments: row.get(9)?,
        progress: row.get(10)?,
        created_at: row.get(11)?,
    })
}

impl RawTask {
    fn into_task(self, conn: &Connection) -> StoreResult<Task> {
        let id = parse_uuid(&self.id)?;
        let assigned_to = assignees_for(conn, &self.id)?;
        let todo_checklist = serde_json::from_str(&self.todo_checklist)
            .map_err(|e| StoreError::Corrupt(format!("checklist for task {id}: {e}")))?;
        let attachments = serde_json::from_str(&self.attachments)
            .map_err(|e| StoreError::Corrupt(format!("attachments for task {id}: {e}")))?;
        Ok(Task {
            id,
            title: self.title,
            description: self.description,
            priority: self
                .priority
                .parse::<TaskPriority>()
                .map_err(StoreError::Corrupt)?,
            status: self.status.parse::<TaskStatus>().map_err(StoreError::Corrupt)?,
            due_date: self.due_date.map(millis_to_datetime).transpose()?,
            owner: parse_uuid(&self.owner)?,
            created_by: parse_uuid(&self.created_by)?,
            assigned_to,
            todo_checklist,
            attachments,
            progress: self.progress as u8,
            created_at: millis_to_datetime(self.created_at)?,
        })
    }
}

fn assignees_for(conn: &Connection, task_id: &str) -> StoreResult<Vec<Uuid>> {
    let mut stmt =
        conn.prepare("SELECT user_id FROM task_assignees WHERE task_id = ?1 ORDER BY rowid")?;
    let rows = stmt.query_map(params![task_id], |row| row.get::<_, String>(0))?;
    let mut ids = Vec::new();
    for raw in rows {
        ids.push(parse_uuid(&raw?)?);
    }
    Ok(ids)
}

/// WHERE clause and positional parameters for a task filter.
fn filter_clauses(filter: &TaskFilter) -> (String, Vec<String>) {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<String> = Vec::new();

    if let Some(status) = filter.status {
        clauses.push("status = ?");
        values.push(status.as_str().to_string());
    }
    if let Some(priority) = filter.priority {
        clauses.push("priority = ?");
        values.push(priority.as_str().to_string());
    }
    if let Some(assignee) = filter.assignee {
        clauses.push(
            "EXISTS (SELECT 1 FROM task_assignees a \
             WHERE a.task_id = tasks.id AND a.user_id = ?)",
        );
        values.push(assignee.to_string());
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (where_sql, values)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String, String, Option<String>, i64)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn parse_user(
    (id, name, email, password_hash, role, avatar_url, created_at): (
        String,
        String,
        String,
        String,
        String,
        Option<String>,
        i64,
    ),
) -> StoreResult<User> {
    Ok(User {
        id: parse_uuid(&id)?,
        name,
        email,
        password_hash,
        role: role.parse::<Role>().map_err(StoreError::Corrupt)?,
        avatar_url,
        created_at: millis_to_datetime(created_at)?,
    })
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, avatar_url, created_at";

#[async_trait]
impl TaskStore for SqliteStore {
    async fn get(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let conn = self.conn.lock().await;
        let raw = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id.to_string()],
                raw_task_from_row,
            )
            .optional()?;
        raw.map(|r| r.into_task(&conn)).transpose()
    }

    async fn find(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let conn = self.conn.lock().await;
        let (where_sql, values) = filter_clauses(filter);
        let order = if filter.newest_first { "DESC" } else { "ASC" };
        let mut sql =
            format!("SELECT {TASK_COLUMNS} FROM tasks{where_sql} ORDER BY created_at {order}");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), raw_task_from_row)?;
        let mut tasks = Vec::new();
        for raw in rows {
            tasks.push(raw?.into_task(&conn)?);
        }
        Ok(tasks)
    }

    async fn count(&self, filter: &TaskFilter) -> StoreResult<usize> {
        let conn = self.conn.lock().await;
        let (where_sql, values) = filter_clauses(filter);
        let sql = format!("SELECT COUNT(*) FROM tasks{where_sql}");
        let count: i64 =
            conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn put(&self, task: Task) -> StoreResult<Task> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let checklist_json = serde_json::to_string(&task.todo_checklist)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let attachments_json = serde_json::to_string(&task.attachments)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        tx.execute(
            "INSERT INTO tasks (id, title, description, priority, status, due_date, owner, \
             created_by, todo_checklist, attachments, progress, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
             ON CONFLICT(id) DO UPDATE SET \
             title = excluded.title, description = excluded.description, \
             priority = excluded.priority, status = excluded.status, \
             due_date = excluded.due_date, todo_checklist = excluded.todo_checklist, \
             attachments = excluded.attachments, progress = excluded.progress",
            params![
                task.id.to_string(),
                task.title,
                task.description,
                task.priority.as_str(),
                task.status.as_str(),
                task.due_date.map(|d| d.timestamp_millis()),
                task.owner.to_string(),
                task.created_by.to_string(),
                checklist_json,
                attachments_json,
                task.progress as i64,
                task.created_at.timestamp_millis(),
            ],
        )?;

        tx.execute(
            "DELETE FROM task_assignees WHERE task_id = ?1",
            params![task.id.to_string()],
        )?;
        for user_id in &task.assigned_to {
            tx.execute(
                "INSERT OR IGNORE INTO task_assignees (task_id, user_id) VALUES (?1, ?2)",
                params![task.id.to_string(), user_id.to_string()],
            )?;
        }

        tx.commit()?;
        Ok(task)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM task_assignees WHERE task_id = ?1",
            params![id.to_string()],
        )?;
        tx.execute("DELETE FROM tasks WHERE id = ?1", params![id.to_string()])?;
        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for SqliteStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().await;
        let raw = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                user_from_row,
            )
            .optional()?;
        raw.map(parse_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().await;
        let raw = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                user_from_row,
            )
            .optional()?;
        raw.map(parse_user).transpose()
    }

    async fn find_by_role(&self, role: Role, limit: Option<usize>) -> StoreResult<Vec<User>> {
        let conn = self.conn.lock().await;
        let mut sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY created_at DESC"
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![role.as_str()], user_from_row)?;
        let mut users = Vec::new();
        for raw in rows {
            users.push(parse_user(raw?)?);
        }
        Ok(users)
    }

    async fn insert(&self, user: User) -> StoreResult<User> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, role, avatar_url, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                user.password_hash,
                user.role.as_str(),
                user.avatar_url,
                user.created_at.timestamp_millis(),
            ],
        )?;
        Ok(user)
    }

    async fn update(&self, user: User) -> StoreResult<User> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE users SET name = ?2, email = ?3, password_hash = ?4, role = ?5, \
             avatar_url = ?6 WHERE id = ?1",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                user.password_hash,
                user.role.as_str(),
                user.avatar_url,
            ],
        )?;
        Ok(user)
    }
}
