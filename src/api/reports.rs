//! CSV report exports. Admin only.

use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension,
};

use crate::error::ServiceError;
use crate::store::TaskFilter;
use crate::user::Role;

use super::auth::{ensure_admin, CurrentUser};
use super::routes::AppState;

/// GET /api/reports/export/tasks - Every task with assignees and progress.
pub async fn export_tasks(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Response, ServiceError> {
    ensure_admin(&current)?;

    let page = state.service.list(&current.principal(), None).await?;

    let mut csv = String::from("id,title,priority,status,progress,due_date,assigned_to,checklist_done\n");
    for detail in &page.tasks {
        let task = &detail.task;
        let assignees = detail
            .assignees
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        let due = task
            .due_date
            .map(|d| d.to_rfc3339())
            .unwrap_or_default();
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{} of {}\n",
            task.id,
            csv_field(&task.title),
            task.priority.as_str(),
            csv_field(task.status.as_str()),
            task.progress,
            due,
            csv_field(&assignees),
            detail.completed_todo_count,
            task.todo_checklist.len(),
        ));
    }

    Ok(csv_attachment("tasks_report.csv", csv))
}

/// GET /api/reports/export/users - Members with their task counts.
pub async fn export_users(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Response, ServiceError> {
    ensure_admin(&current)?;

    let members = state.users.find_by_role(Role::Member, None).await?;
    let summaries = futures::future::try_join_all(members.iter().map(|member| {
        let filter = TaskFilter::assigned_to(member.id);
        let service = &state.service;
        async move { service.status_summary(&filter).await }
    }))
    .await?;

    let mut csv =
        String::from("name,email,total_tasks,pending_tasks,in_progress_tasks,completed_tasks\n");
    for (user, summary) in members.iter().zip(summaries.iter()) {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            csv_field(&user.name),
            csv_field(&user.email),
            summary.all,
            summary.pending_tasks,
            summary.in_progress_tasks,
            summary.completed_tasks,
        ));
    }

    Ok(csv_attachment("users_report.csv", csv))
}

/// Quote a field when it contains a delimiter, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_attachment(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::csv_field;

    #[test]
    fn plain_fields_pass_through() {
        assert_eq!(csv_field("deploy api"), "deploy api");
    }

    #[test]
    fn delimiters_and_quotes_are_escaped() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("line\nbreak"), "\"line\nbreak\"");
    }
}
