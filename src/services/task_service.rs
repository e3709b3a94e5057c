use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CreateTaskRequest, Task, TaskStatus, UpdateTaskRequest};

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{0}")]
    Validation(String),
    #[error("Task not found")]
    NotFound,
    #[error("Unauthorized")]
    Forbidden,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<JsonRejection> for TaskError {
    fn from(rejection: JsonRejection) -> Self {
        TaskError::Validation(rejection.body_text())
    }
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            TaskError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation failed"),
            TaskError::NotFound => (StatusCode::NOT_FOUND, "Task not found"),
            TaskError::Forbidden => (StatusCode::FORBIDDEN, "Unauthorized"),
            TaskError::Database(err) => {
                tracing::error!("Database error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
        };

        // Internal failures keep their detail server-side.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error_message.to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": error_message,
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[derive(Clone)]
pub struct TaskService {
    db: PgPool,
}

impl TaskService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All tasks owned by the requester, newest first, optionally
    /// restricted to one status.
    pub async fn list_tasks(
        &self,
        user_id: Uuid,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, TaskError> {
        let tasks = match status {
            Some(status) => {
                sqlx::query_as::<_, Task>(
                    "SELECT id, user_id, title, description, status, due_date, created_at
                     FROM tasks
                     WHERE user_id = $1 AND status = $2
                     ORDER BY created_at DESC",
                )
                .bind(user_id)
                .bind(status)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, Task>(
                    "SELECT id, user_id, title, description, status, due_date, created_at
                     FROM tasks
                     WHERE user_id = $1
                     ORDER BY created_at DESC",
                )
                .bind(user_id)
                .fetch_all(&self.db)
                .await?
            }
        };

        Ok(tasks)
    }

    pub async fn create_task(
        &self,
        user_id: Uuid,
        request: CreateTaskRequest,
    ) -> Result<Task, TaskError> {
        // Validation happens before any storage access
        validate_title(&request.title)?;

        let task = sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (id, user_id, title, description, status, due_date, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, user_id, title, description, status, due_date, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.status.unwrap_or_default())
        .bind(request.due_date)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;

        Ok(task)
    }

    /// Apply a partial update to a task the requester owns. The whole
    /// patch is validated before the single-row write, so the update
    /// either fully applies or changes nothing.
    pub async fn update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        patch: UpdateTaskRequest,
    ) -> Result<Task, TaskError> {
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }

        let mut task = self.get_task(task_id).await?;
        ensure_owner(&task, user_id)?;

        task.apply_patch(patch);

        sqlx::query(
            "UPDATE tasks SET title = $2, description = $3, status = $4, due_date = $5
             WHERE id = $1",
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.due_date)
        .execute(&self.db)
        .await?;

        Ok(task)
    }

    pub async fn delete_task(&self, user_id: Uuid, task_id: Uuid) -> Result<(), TaskError> {
        let task = self.get_task(task_id).await?;
        ensure_owner(&task, user_id)?;

        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    // Existence is checked on the bare id so a missing task and a
    // foreign task stay distinguishable.
    async fn get_task(&self, task_id: Uuid) -> Result<Task, TaskError> {
        let task = sqlx::query_as::<_, Task>(
            "SELECT id, user_id, title, description, status, due_date, created_at
             FROM tasks WHERE id = $1",
        )
        .bind(task_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(TaskError::NotFound)?;

        Ok(task)
    }
}

/// Only the stored owner may mutate or delete a task
fn ensure_owner(task: &Task, user_id: Uuid) -> Result<(), TaskError> {
    if task.user_id != user_id {
        return Err(TaskError::Forbidden);
    }

    Ok(())
}

fn validate_title(title: &str) -> Result<(), TaskError> {
    if title.trim().is_empty() {
        return Err(TaskError::Validation("Title is required".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn task_owned_by(user_id: Uuid) -> Task {
        Task {
            id: Uuid::new_v4(),
            user_id,
            title: "Buy milk".to_string(),
            description: None,
            status: TaskStatus::Todo,
            due_date: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_owner_may_mutate() {
        let owner = Uuid::new_v4();
        let task = task_owned_by(owner);

        assert!(ensure_owner(&task, owner).is_ok());
    }

    #[test]
    fn test_non_owner_is_rejected() {
        let task = task_owned_by(Uuid::new_v4());

        assert!(matches!(
            ensure_owner(&task, Uuid::new_v4()),
            Err(TaskError::Forbidden)
        ));
    }

    #[test]
    fn test_title_validation() {
        assert!(validate_title("Buy milk").is_ok());
        assert!(matches!(
            validate_title(""),
            Err(TaskError::Validation(_))
        ));
        assert!(matches!(
            validate_title("   "),
            Err(TaskError::Validation(_))
        ));
    }

    #[test]
    fn test_validated_patch_merges_into_task() {
        let owner = Uuid::new_v4();
        let mut task = task_owned_by(owner);
        task.due_date = NaiveDate::from_ymd_opt(2025, 6, 1);

        let patch: UpdateTaskRequest =
            serde_json::from_str(r#"{"status": "done", "dueDate": null}"#).unwrap();
        assert!(patch.title.is_none());

        task.apply_patch(patch);

        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.due_date, None);
        assert_eq!(task.title, "Buy milk");
    }
}
