//! User management endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::store::TaskFilter;
use crate::user::Role;

use super::auth::{ensure_admin, CurrentUser};
use super::routes::AppState;
use super::types::{ProfileResponse, UserWithCounts};

/// GET /api/users - All members with their task counts. Admin only.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<UserWithCounts>>, ServiceError> {
    ensure_admin(&current)?;

    let members = state.users.find_by_role(Role::Member, None).await?;

    // The per-user summaries are independent reads; run them concurrently.
    let summaries = futures::future::try_join_all(members.iter().map(|member| {
        let filter = TaskFilter::assigned_to(member.id);
        let service = &state.service;
        async move { service.status_summary(&filter).await }
    }))
    .await?;

    let users = members
        .iter()
        .zip(summaries.iter())
        .map(|(user, summary)| UserWithCounts::new(user, summary))
        .collect();
    Ok(Json(users))
}

/// GET /api/users/:id - One user's public profile.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProfileResponse>, ServiceError> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or(ServiceError::NotFound("user"))?;
    Ok(Json(ProfileResponse::from(&user)))
}
