/// Task model and database operations
///
/// This module provides the Task model representing a user's to-do item.
/// Tasks are the core entity of the TaskDeck system.
///
/// # Due dates
///
/// `due_date` is stored truncated to the minute (seconds and sub-seconds
/// zeroed). The reminder scheduler matches tasks by exact equality against
/// the 5- and 10-minute-ahead instants of each tick, so truncation is
/// applied on every create and update.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM (
///     'draft', 'pending', 'in_progress', 'completed'
/// );
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(128) NOT NULL DEFAULT 'Not available',
///     description VARCHAR(256) NOT NULL DEFAULT 'Not available',
///     status task_status NOT NULL DEFAULT 'draft',
///     due_date TIMESTAMPTZ NOT NULL DEFAULT date_trunc('minute', NOW()),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::models::task::{Task, CreateTask, TaskStatus};
/// use taskdeck_shared::db::pool::{create_pool, DatabaseConfig};
/// use chrono::Utc;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, CreateTask {
///     user_id: Uuid::new_v4(),
///     title: "Write report".to_string(),
///     description: "Quarterly numbers".to_string(),
///     status: TaskStatus::Pending,
///     due_date: Utc::now(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

use crate::time::truncate_to_minute;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet actionable
    Draft,

    /// Ready to be worked on
    Pending,

    /// Currently being worked on
    InProgress,

    /// Done
    Completed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Draft
    }
}

impl TaskStatus {
    /// Converts status to its database/wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Draft => "draft",
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Task model representing a single to-do item
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// User who owns this task
    pub user_id: Uuid,

    /// Short title (max 128 chars)
    pub title: String,

    /// Longer description (max 256 chars)
    pub description: String,

    /// Current status
    pub status: TaskStatus,

    /// When the task is due, truncated to the minute
    pub due_date: DateTime<Utc>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// A due task joined with its owner's delivery address
///
/// Returned by the reminder query; carries just enough of the user row to
/// render and address the notification email.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DueTask {
    /// Task ID
    pub id: Uuid,

    /// Task title
    pub title: String,

    /// Task status
    pub status: TaskStatus,

    /// Due timestamp (minute granularity)
    pub due_date: DateTime<Utc>,

    /// Owner's username (for the greeting line)
    pub username: String,

    /// Owner's email address
    pub email: String,
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    /// Owner
    pub user_id: Uuid,

    /// Title
    pub title: String,

    /// Description
    pub description: String,

    /// Initial status
    pub status: TaskStatus,

    /// Due timestamp; truncated to the minute before insert
    pub due_date: DateTime<Utc>,
}

/// Input for updating a task
///
/// All fields optional; only non-None fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    /// New title
    pub title: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New status
    pub status: Option<TaskStatus>,

    /// New due timestamp; truncated to the minute before write
    pub due_date: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a new task
    ///
    /// The due date is truncated to the minute before insert.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (user_id, title, description, status, due_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, title, description, status, due_date,
                      created_at, updated_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(truncate_to_minute(data.due_date))
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID, scoped to its owner
    ///
    /// This is the only finder API handlers should use: another user's task
    /// is indistinguishable from a missing one.
    pub async fn find_by_id_and_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, status, due_date,
                   created_at, updated_at
            FROM tasks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists a user's tasks with pagination, newest first
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, status, due_date,
                   created_at, updated_at
            FROM tasks
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Counts a user's tasks
    pub async fn count_by_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Updates a task, scoped to its owner
    ///
    /// Only non-None fields are written; a new due date is truncated to the
    /// minute. `updated_at` is always bumped.
    ///
    /// # Returns
    ///
    /// The updated task if found and owned by `user_id`, None otherwise.
    pub async fn update_by_id_and_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 AND user_id = $2 RETURNING id, user_id, title, description, status, due_date, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id).bind(user_id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(truncate_to_minute(due_date));
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Deletes a task, scoped to its owner
    ///
    /// # Returns
    ///
    /// True if a task was deleted, false if no task matched.
    pub async fn delete_by_id_and_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Finds tasks due at exactly one of the given instants, joined with
    /// the owner's email
    ///
    /// Used by the reminder scheduler with the truncated `now + 5min` and
    /// `now + 10min` timestamps. Matching is set membership, not a range:
    /// a task due 6 minutes out matches neither instant.
    pub async fn find_due_with_owner(
        pool: &PgPool,
        instants: &[DateTime<Utc>],
    ) -> Result<Vec<DueTask>, sqlx::Error> {
        let due = sqlx::query_as::<_, DueTask>(
            r#"
            SELECT t.id, t.title, t.status, t.due_date, u.username, u.email
            FROM tasks t
            JOIN users u ON u.id = t.user_id
            WHERE t.due_date = ANY($1)
            ORDER BY t.due_date ASC
            "#,
        )
        .bind(instants)
        .fetch_all(pool)
        .await?;

        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_as_str() {
        assert_eq!(TaskStatus::Draft.as_str(), "draft");
        assert_eq!(TaskStatus::Pending.as_str(), "pending");
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
        assert_eq!(TaskStatus::Completed.as_str(), "completed");
    }

    #[test]
    fn test_task_status_default() {
        assert_eq!(TaskStatus::default(), TaskStatus::Draft);
    }

    #[test]
    fn test_task_status_serde_roundtrip() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");

        let status: TaskStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(status, TaskStatus::Completed);
    }

    #[test]
    fn test_update_task_default() {
        let update = UpdateTask::default();
        assert!(update.title.is_none());
        assert!(update.description.is_none());
        assert!(update.status.is_none());
        assert!(update.due_date.is_none());
    }

    // Integration tests for database operations are in the api crate's tests/
}
