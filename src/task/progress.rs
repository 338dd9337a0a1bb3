//! Checklist progress engine.
//!
//! Pure functions: parsing and normalizing a checklist payload, computing
//! the completion percentage, and deriving the task status from it. The
//! caller persists the result.

use serde_json::Value;

use crate::error::{ServiceError, ServiceResult};

use super::types::{ChecklistItem, Task, TaskStatus};

/// Parse a raw checklist payload into normalized items.
///
/// The payload must be an array of objects with a non-blank `text`.
/// `completed` follows JSON truthiness: absent, null, false, 0 and "" all
/// normalize to false.
pub fn parse_checklist(value: &Value) -> ServiceResult<Vec<ChecklistItem>> {
    let items = value.as_array().ok_or_else(|| {
        ServiceError::Validation("todoChecklist must be an array of objects".to_string())
    })?;

    let mut checklist = Vec::with_capacity(items.len());
    for item in items {
        let text = item.get("text").and_then(Value::as_str).unwrap_or("");
        if text.trim().is_empty() {
            return Err(ServiceError::Validation(
                "each checklist item needs a non-empty text".to_string(),
            ));
        }
        checklist.push(ChecklistItem {
            text: text.to_string(),
            completed: is_truthy(item.get("completed")),
        });
    }
    Ok(checklist)
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Completion percentage of a checklist. An empty checklist is 0, not an
/// error: the divisor is clamped to 1.
pub fn progress_of(checklist: &[ChecklistItem]) -> u8 {
    let total = checklist.len().max(1);
    let finished = checklist.iter().filter(|i| i.completed).count();
    ((finished as f64 / total as f64) * 100.0).round() as u8
}

/// Status derived from a progress percentage.
pub fn status_for(progress: u8) -> TaskStatus {
    if progress == 100 {
        TaskStatus::Completed
    } else if progress > 0 {
        TaskStatus::InProgress
    } else {
        TaskStatus::Pending
    }
}

/// Replace the task's checklist with the given payload and recompute the
/// derived progress and status.
pub fn apply_checklist(task: &mut Task, value: &Value) -> ServiceResult<()> {
    let checklist = parse_checklist(value)?;
    task.todo_checklist = checklist;
    task.progress = progress_of(&task.todo_checklist);
    task.status = status_for(task.progress);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn sample_task() -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "Ship release".to_string(),
            description: String::new(),
            priority: Default::default(),
            status: TaskStatus::Pending,
            due_date: None,
            owner: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            assigned_to: Vec::new(),
            todo_checklist: Vec::new(),
            attachments: Vec::new(),
            progress: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn half_completed_checklist_is_in_progress() {
        let mut task = sample_task();
        let payload = json!([
            { "text": "a", "completed": true },
            { "text": "b", "completed": false },
        ]);
        apply_checklist(&mut task, &payload).unwrap();
        assert_eq!(task.progress, 50);
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    #[test]
    fn empty_checklist_is_pending_with_zero_progress() {
        let mut task = sample_task();
        task.status = TaskStatus::Completed;
        task.progress = 100;
        apply_checklist(&mut task, &json!([])).unwrap();
        assert_eq!(task.progress, 0);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.todo_checklist.is_empty());
    }

    #[test]
    fn fully_completed_checklist_is_completed() {
        let mut task = sample_task();
        let payload = json!([
            { "text": "a", "completed": true },
            { "text": "b", "completed": true },
            { "text": "c", "completed": true },
        ]);
        apply_checklist(&mut task, &payload).unwrap();
        assert_eq!(task.progress, 100);
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn progress_rounds_to_nearest_integer() {
        let items = vec![
            ChecklistItem { text: "a".into(), completed: true },
            ChecklistItem { text: "b".into(), completed: false },
            ChecklistItem { text: "c".into(), completed: false },
        ];
        // 1/3 rounds to 33.
        assert_eq!(progress_of(&items), 33);
        let items: Vec<ChecklistItem> = (0..3)
            .map(|i| ChecklistItem { text: "x".into(), completed: i < 2 })
            .collect();
        // 2/3 rounds to 67.
        assert_eq!(progress_of(&items), 67);
    }

    #[test]
    fn rejects_non_array_payload() {
        let mut task = sample_task();
        let err = apply_checklist(&mut task, &json!({ "text": "a" })).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn rejects_blank_item_text() {
        let mut task = sample_task();
        for payload in [
            json!([{ "text": "   " }]),
            json!([{ "text": 7 }]),
            json!([{ "completed": true }]),
        ] {
            let err = apply_checklist(&mut task, &payload).unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
        // A failed replace leaves the task untouched.
        assert!(task.todo_checklist.is_empty());
        assert_eq!(task.progress, 0);
    }

    #[test]
    fn completed_follows_json_truthiness() {
        let payload = json!([
            { "text": "bool", "completed": true },
            { "text": "string", "completed": "yes" },
            { "text": "number", "completed": 1 },
            { "text": "empty string", "completed": "" },
            { "text": "zero", "completed": 0 },
            { "text": "null", "completed": null },
            { "text": "absent" },
        ]);
        let items = parse_checklist(&payload).unwrap();
        let flags: Vec<bool> = items.iter().map(|i| i.completed).collect();
        assert_eq!(flags, vec![true, true, true, false, false, false, false]);
    }
}
