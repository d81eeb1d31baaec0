/// Task CRUD endpoints
///
/// - `GET /tasks` - Cached, paginated list of the caller's tasks
/// - `POST /tasks` - Create a task
/// - `GET /tasks/:id` - Fetch one task
/// - `PATCH /tasks/:id` - Partial update
/// - `DELETE /tasks/:id` - Delete
///
/// Every query is scoped to the authenticated user; another user's task is
/// indistinguishable from a missing one (404). The list response is cached
/// under `task_list_{user_id}` and returned verbatim on a hit; every write
/// deletes that key before responding. Due dates are truncated to the
/// minute on create and update so the reminder scheduler can match them by
/// exact equality.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use taskdeck_shared::{
    auth::middleware::AuthUser,
    cache::store,
    models::task::{CreateTask, Task, TaskStatus, UpdateTask},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

/// Tasks per page
pub const PAGE_SIZE: i64 = 5;

/// Fallback for title/description when the client omits them
const NOT_AVAILABLE: &str = "Not available";

/// Task response payload
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    /// Task ID
    pub id: String,

    /// Title
    pub title: String,

    /// Description
    pub description: String,

    /// Status
    pub status: TaskStatus,

    /// Due timestamp (minute granularity)
    pub due_date: DateTime<Utc>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last-update timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        TaskResponse {
            id: task.id.to_string(),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            due_date: task.due_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Page-number pagination envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total number of items across all pages
    pub count: i64,

    /// Relative URL of the next page, if any
    pub next: Option<String>,

    /// Relative URL of the previous page, if any
    pub previous: Option<String>,

    /// Items on this page
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Builds a page envelope for the given page number (1-based)
    pub fn new(count: i64, page: i64, results: Vec<T>) -> Self {
        let has_next = page * PAGE_SIZE < count;
        let has_previous = page > 1;

        Page {
            count,
            next: has_next.then(|| format!("/tasks?page={}", page + 1)),
            previous: has_previous.then(|| format!("/tasks?page={}", page - 1)),
            results,
        }
    }
}

/// Query parameters for the list endpoint
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// 1-based page number (default 1)
    pub page: Option<i64>,
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Title (defaults to "Not available")
    #[validate(length(max = 128, message = "Title must be at most 128 characters"))]
    pub title: Option<String>,

    /// Description (defaults to "Not available")
    #[validate(length(max = 256, message = "Description must be at most 256 characters"))]
    pub description: Option<String>,

    /// Initial status (defaults to draft)
    pub status: Option<TaskStatus>,

    /// Due timestamp (defaults to now; truncated to the minute)
    pub due_date: Option<DateTime<Utc>>,
}

/// Update task request
///
/// All fields optional; only provided fields are changed.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    /// New title
    #[validate(length(max = 128, message = "Title must be at most 128 characters"))]
    pub title: Option<String>,

    /// New description
    #[validate(length(max = 256, message = "Description must be at most 256 characters"))]
    pub description: Option<String>,

    /// New status
    pub status: Option<TaskStatus>,

    /// New due timestamp (truncated to the minute)
    pub due_date: Option<DateTime<Utc>>,
}

/// Cached, paginated task list
///
/// # Endpoint
///
/// ```text
/// GET /tasks?page=2
/// Authorization: Bearer <access token>
/// ```
///
/// # Response
///
/// ```json
/// {
///   "count": 12,
///   "next": "/tasks?page=3",
///   "previous": "/tasks?page=1",
///   "results": [ ... ]
/// }
/// ```
///
/// The cached payload is whatever page populated the key; it is returned
/// verbatim until a write invalidates it or the TTL lapses.
///
/// # Errors
///
/// - `404 Not Found`: page beyond the last one
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<JsonValue>> {
    let page = params.page.unwrap_or(1);
    if page < 1 {
        return Err(ApiError::NotFound("Invalid page.".to_string()));
    }

    let cache_key = store::task_list_key(auth.user_id);

    match store::get_json(&state.cache, &cache_key).await {
        Ok(Some(cached)) => return Ok(Json(cached)),
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(error = %e, key = %cache_key, "Cache read failed, falling back to database");
        }
    }

    let count = Task::count_by_user(&state.db, auth.user_id).await?;
    let offset = (page - 1) * PAGE_SIZE;

    if page > 1 && offset >= count {
        return Err(ApiError::NotFound("Invalid page.".to_string()));
    }

    let tasks = Task::list_by_user(&state.db, auth.user_id, PAGE_SIZE, offset).await?;
    let results: Vec<TaskResponse> = tasks.iter().map(TaskResponse::from).collect();

    let envelope = Page::new(count, page, results);
    let payload = serde_json::to_value(&envelope)
        .map_err(|e| ApiError::InternalError(format!("Serialization failed: {}", e)))?;

    if let Err(e) = store::set_json(&state.cache, &cache_key, &payload).await {
        tracing::warn!(error = %e, key = %cache_key, "Cache populate failed");
    }

    Ok(Json(payload))
}

/// Create a task
///
/// # Endpoint
///
/// ```text
/// POST /tasks
/// Authorization: Bearer <access token>
/// Content-Type: application/json
///
/// {
///   "title": "Write report",
///   "description": "Quarterly numbers",
///   "status": "pending",
///   "due_date": "2024-07-01T09:35:00Z"
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: validation failed
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    req.validate()?;

    let task = Task::create(
        &state.db,
        CreateTask {
            user_id: auth.user_id,
            title: req.title.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            description: req.description.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            status: req.status.unwrap_or_default(),
            due_date: req.due_date.unwrap_or_else(Utc::now),
        },
    )
    .await?;

    store::delete(&state.cache, &store::task_list_key(auth.user_id)).await?;

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, "Task created");

    Ok((StatusCode::CREATED, Json(TaskResponse::from(&task))))
}

/// Fetch one task
///
/// # Errors
///
/// - `404 Not Found`: task absent or owned by another user
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = Task::find_by_id_and_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found.".to_string()))?;

    Ok(Json(TaskResponse::from(&task)))
}

/// Partial task update
///
/// A provided due date is truncated to the minute before it is stored.
/// Invalidates the cached task list before responding.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: validation failed
/// - `404 Not Found`: task absent or owned by another user
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    req.validate()?;

    let task = Task::update_by_id_and_user(
        &state.db,
        id,
        auth.user_id,
        UpdateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            due_date: req.due_date,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found.".to_string()))?;

    store::delete(&state.cache, &store::task_list_key(auth.user_id)).await?;

    Ok(Json(TaskResponse::from(&task)))
}

/// Delete a task
///
/// Invalidates the cached task list before responding.
///
/// # Errors
///
/// - `404 Not Found`: task absent or owned by another user
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let deleted = Task::delete_by_id_and_user(&state.db, id, auth.user_id).await?;

    if !deleted {
        return Err(ApiError::NotFound("Task not found.".to_string()));
    }

    store::delete(&state.cache, &store::task_list_key(auth.user_id)).await?;

    tracing::info!(task_id = %id, user_id = %auth.user_id, "Task deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task_response(n: i32) -> TaskResponse {
        TaskResponse {
            id: Uuid::new_v4().to_string(),
            title: format!("task {}", n),
            description: "desc".to_string(),
            status: TaskStatus::Pending,
            due_date: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_page_first_of_many() {
        let results: Vec<_> = (0..5).map(sample_task_response).collect();
        let page = Page::new(12, 1, results);

        assert_eq!(page.count, 12);
        assert_eq!(page.next.as_deref(), Some("/tasks?page=2"));
        assert!(page.previous.is_none());
    }

    #[test]
    fn test_page_middle() {
        let results: Vec<_> = (0..5).map(sample_task_response).collect();
        let page = Page::new(12, 2, results);

        assert_eq!(page.next.as_deref(), Some("/tasks?page=3"));
        assert_eq!(page.previous.as_deref(), Some("/tasks?page=1"));
    }

    #[test]
    fn test_page_last() {
        let results: Vec<_> = (0..2).map(sample_task_response).collect();
        let page = Page::new(12, 3, results);

        assert!(page.next.is_none());
        assert_eq!(page.previous.as_deref(), Some("/tasks?page=2"));
    }

    #[test]
    fn test_page_single() {
        let results: Vec<_> = (0..3).map(sample_task_response).collect();
        let page = Page::new(3, 1, results);

        assert!(page.next.is_none());
        assert!(page.previous.is_none());
    }

    #[test]
    fn test_page_size_is_five() {
        assert_eq!(PAGE_SIZE, 5);
    }
}
