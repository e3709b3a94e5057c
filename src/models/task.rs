use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Task lifecycle status, stored as text in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<NaiveDate>,
}

/// Partial update. A field left out of the request body means "leave
/// unchanged"; `due_date` additionally distinguishes an explicit `null`
/// (clear the date) from an omitted key.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    /// `None` = unchanged, `Some(None)` = clear, `Some(Some(d))` = set.
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl Task {
    /// Merge a validated patch into the task. Absent fields are left
    /// untouched; `due_date` follows its three-way contract.
    pub fn apply_patch(&mut self, patch: UpdateTaskRequest) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
    }
}

/// Wraps the inner value so that an explicit `null` deserializes to
/// `Some(None)` while an absent key stays `None` (via `#[serde(default)]`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Buy milk".to_string(),
            description: Some("2 liters".to_string()),
            status: TaskStatus::Todo,
            due_date: NaiveDate::from_ymd_opt(2025, 3, 1),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_due_date_tri_state_deserialization() {
        let absent: UpdateTaskRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.due_date, None);

        let cleared: UpdateTaskRequest = serde_json::from_str(r#"{"dueDate": null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));

        let set: UpdateTaskRequest = serde_json::from_str(r#"{"dueDate": "2025-03-01"}"#).unwrap();
        assert_eq!(set.due_date, Some(NaiveDate::from_ymd_opt(2025, 3, 1)));
    }

    #[test]
    fn test_empty_patch_leaves_task_unchanged() {
        let mut task = sample_task();
        let before = task.clone();

        task.apply_patch(UpdateTaskRequest::default());

        assert_eq!(task.title, before.title);
        assert_eq!(task.description, before.description);
        assert_eq!(task.status, before.status);
        assert_eq!(task.due_date, before.due_date);
    }

    #[test]
    fn test_patch_clears_due_date_only_on_explicit_null() {
        let mut task = sample_task();
        assert!(task.due_date.is_some());

        // Absent key: date untouched.
        task.apply_patch(UpdateTaskRequest {
            title: Some("Buy oat milk".to_string()),
            ..Default::default()
        });
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(task.title, "Buy oat milk");

        // Explicit null: date cleared.
        task.apply_patch(UpdateTaskRequest {
            due_date: Some(None),
            ..Default::default()
        });
        assert_eq!(task.due_date, None);

        // Explicit value: date set.
        task.apply_patch(UpdateTaskRequest {
            due_date: Some(NaiveDate::from_ymd_opt(2025, 4, 15)),
            ..Default::default()
        });
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2025, 4, 15));
    }

    #[test]
    fn test_patch_sets_empty_description() {
        // A deliberately-empty string is a real value, not "unset".
        let mut task = sample_task();
        task.apply_patch(UpdateTaskRequest {
            description: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(task.description, Some(String::new()));
    }

    #[test]
    fn test_patch_updates_status_and_keeps_title() {
        let mut task = sample_task();
        task.apply_patch(UpdateTaskRequest {
            status: Some(TaskStatus::Done),
            ..Default::default()
        });
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.title, "Buy milk");
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            r#""in-progress""#
        );
        assert_eq!(serde_json::to_string(&TaskStatus::Todo).unwrap(), r#""todo""#);
        assert_eq!(serde_json::to_string(&TaskStatus::Done).unwrap(), r#""done""#);

        let status: TaskStatus = serde_json::from_str(r#""in-progress""#).unwrap();
        assert_eq!(status, TaskStatus::InProgress);
        assert!(serde_json::from_str::<TaskStatus>(r#""archived""#).is_err());
    }

    #[test]
    fn test_task_json_shape() {
        let task = sample_task();
        let value = serde_json::to_value(&task).unwrap();

        assert!(value.get("id").is_some());
        assert_eq!(value["user"], serde_json::json!(task.user_id));
        assert_eq!(value["status"], "todo");
        assert_eq!(value["dueDate"], "2025-03-01");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("user_id").is_none());
        assert!(value.get("due_date").is_none());
    }

    #[test]
    fn test_task_due_date_serializes_as_null_when_absent() {
        let mut task = sample_task();
        task.due_date = None;
        let value = serde_json::to_value(&task).unwrap();
        assert!(value["dueDate"].is_null());
    }
}
