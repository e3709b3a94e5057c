use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, put},
    Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{jwt_auth_middleware, AuthService, MessageResponse, UserSession};
use crate::models::{CreateTaskRequest, Task, TaskStatus, UpdateTaskRequest};
use crate::services::{TaskError, TaskService};

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
}

/// Task routes, all behind bearer authentication
pub fn task_routes(db: PgPool, auth_service: AuthService) -> Router {
    let task_service = TaskService::new(db);

    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/:task_id", put(update_task).delete(delete_task))
        .route_layer(middleware::from_fn_with_state(
            auth_service,
            jwt_auth_middleware,
        ))
        .with_state(task_service)
}

/// List the requester's tasks, optionally filtered by status
#[tracing::instrument(skip(task_service))]
async fn list_tasks(
    State(task_service): State<TaskService>,
    Extension(session): Extension<UserSession>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<Task>>, TaskError> {
    let tasks = task_service
        .list_tasks(session.user_id, query.status)
        .await?;
    Ok(Json(tasks))
}

/// Create a task owned by the requester
#[tracing::instrument(skip(task_service, request))]
async fn create_task(
    State(task_service): State<TaskService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<CreateTaskRequest>, TaskError>,
) -> Result<(StatusCode, Json<Task>), TaskError> {
    let task = task_service.create_task(session.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Partially update a task the requester owns
#[tracing::instrument(skip(task_service, patch))]
async fn update_task(
    State(task_service): State<TaskService>,
    Extension(session): Extension<UserSession>,
    Path(task_id): Path<Uuid>,
    WithRejection(Json(patch), _): WithRejection<Json<UpdateTaskRequest>, TaskError>,
) -> Result<Json<Task>, TaskError> {
    let task = task_service
        .update_task(session.user_id, task_id, patch)
        .await?;
    Ok(Json(task))
}

/// Delete a task the requester owns
#[tracing::instrument(skip(task_service))]
async fn delete_task(
    State(task_service): State<TaskService>,
    Extension(session): Extension<UserSession>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, TaskError> {
    task_service.delete_task(session.user_id, task_id).await?;
    Ok(Json(MessageResponse {
        message: "Task deleted".to_string(),
    }))
}
