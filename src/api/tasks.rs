//! Task endpoints: thin glue between HTTP and the lifecycle coordinator.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::task::{DashboardScope, TaskDraft, TaskPatch};

use super::auth::CurrentUser;
use super::routes::AppState;
use super::types::{
    ChecklistUpdateRequest, DashboardResponse, ListTasksQuery, StatusUpdateRequest,
    TaskListResponse, TaskView,
};

/// GET /api/tasks - Tasks visible to the caller, plus a status summary.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<TaskListResponse>, ServiceError> {
    let page = state
        .service
        .list(&current.principal(), query.status)
        .await?;
    Ok(Json(TaskListResponse {
        tasks: page.tasks.into_iter().map(TaskView::from).collect(),
        status_summary: page.status_summary,
    }))
}

/// GET /api/tasks/:id - One task with resolved assignees.
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskView>, ServiceError> {
    let detail = state.service.get(&current.principal(), id).await?;
    Ok(Json(detail.into()))
}

/// POST /api/tasks - Create a task owned by the caller.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(draft): Json<TaskDraft>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let task = state.service.create(&current.principal(), draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "Task created successfully", "task": task })),
    ))
}

/// PUT /api/tasks/:id - Merge-patch a task.
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let task = state.service.update(&current.principal(), id, patch).await?;
    Ok(Json(
        serde_json::json!({ "message": "Task updated successfully", "task": task }),
    ))
}

/// DELETE /api/tasks/:id
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    state.service.delete(&current.principal(), id).await?;
    Ok(Json(
        serde_json::json!({ "message": "Task deleted successfully" }),
    ))
}

/// PUT /api/tasks/:id/status - Direct status override.
pub async fn update_task_status(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let task = state
        .service
        .set_status(&current.principal(), id, &req.status)
        .await?;
    Ok(Json(
        serde_json::json!({ "message": "Status updated", "task": task }),
    ))
}

/// PUT /api/tasks/:id/todo - Replace the checklist and re-derive progress.
pub async fn update_task_checklist(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChecklistUpdateRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let task = state
        .service
        .set_checklist(&current.principal(), id, &req.todo_checklist)
        .await?;
    Ok(Json(
        serde_json::json!({ "message": "Checklist updated", "task": task }),
    ))
}

/// GET /api/tasks/dashboard-data - Role-scoped dashboard.
pub async fn dashboard_data(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<DashboardResponse>, ServiceError> {
    let scope = DashboardScope::for_principal(&current.principal());
    let dashboard = state.service.dashboard(scope).await?;
    Ok(Json(DashboardResponse {
        stats: dashboard.stats,
        latest_tasks: dashboard
            .latest_tasks
            .into_iter()
            .map(TaskView::from)
            .collect(),
        latest_members: Some(
            dashboard
                .latest_members
                .into_iter()
                .map(Into::into)
                .collect(),
        ),
    }))
}

/// GET /api/tasks/user-dashboard-data - The caller's own dashboard.
pub async fn user_dashboard_data(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<DashboardResponse>, ServiceError> {
    let scope = DashboardScope::Member(current.0.id);
    let dashboard = state.service.dashboard(scope).await?;
    Ok(Json(DashboardResponse {
        stats: dashboard.stats,
        latest_tasks: dashboard
            .latest_tasks
            .into_iter()
            .map(TaskView::from)
            .collect(),
        latest_members: None,
    }))
}
