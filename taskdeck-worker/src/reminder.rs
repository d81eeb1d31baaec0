/// Due-task reminder job
///
/// Once per minute the scheduler computes the current time truncated to the
/// minute and selects every task whose due date equals exactly `now + 5min`
/// or `now + 10min` (set membership, not a range — a task due 6 minutes out
/// matches nothing). Each match produces one email, rendered as plain text
/// and HTML, sent to the owner's registered address.
///
/// Delivery is isolated per task: one failure is logged and retried a
/// bounded number of times, and never aborts the remaining sends in the
/// batch.

use crate::mailer::{EmailMessage, Mailer, MailerError};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use taskdeck_shared::models::task::{DueTask, Task};
use taskdeck_shared::time::due_soon_instants;

/// Subject line for every reminder email
pub const SUBJECT_TASK_DUE: &str = "Task Due Soon";

/// Outcome of one reminder tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderRunStats {
    /// Tasks matched by the due-soon query
    pub matched: usize,

    /// Emails delivered
    pub sent: usize,

    /// Tasks whose email could not be delivered after retries
    pub failed: usize,
}

/// Reminder job configuration and dependencies
pub struct ReminderJob {
    db: PgPool,
    mailer: Arc<dyn Mailer>,

    /// Delivery attempts beyond the first
    max_retries: u32,

    /// Pause between delivery attempts
    retry_backoff: Duration,
}

impl ReminderJob {
    /// Creates a reminder job with default retry policy (2 retries, 500 ms
    /// backoff)
    pub fn new(db: PgPool, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db,
            mailer,
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }

    /// Overrides the retry policy
    pub fn with_retry_policy(mut self, max_retries: u32, retry_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = retry_backoff;
        self
    }

    /// Runs one reminder tick
    ///
    /// # Errors
    ///
    /// Returns an error only if the due-task query itself fails; delivery
    /// failures are captured in the returned stats.
    pub async fn run_once(&self, now: DateTime<Utc>) -> anyhow::Result<ReminderRunStats> {
        let instants = due_soon_instants(now);
        let due_tasks = Task::find_due_with_owner(&self.db, &instants).await?;

        if due_tasks.is_empty() {
            return Ok(ReminderRunStats::default());
        }

        tracing::info!(count = due_tasks.len(), "Found due-soon tasks");

        let stats = deliver_reminders(
            &due_tasks,
            self.mailer.as_ref(),
            self.max_retries,
            self.retry_backoff,
        )
        .await;

        Ok(stats)
    }
}

/// Delivers one reminder per due task, isolating failures
///
/// Each task's email is attempted up to `1 + max_retries` times; a task
/// that still fails is logged and skipped, never blocking the rest of the
/// batch.
pub async fn deliver_reminders(
    due_tasks: &[DueTask],
    mailer: &dyn Mailer,
    max_retries: u32,
    retry_backoff: Duration,
) -> ReminderRunStats {
    let mut stats = ReminderRunStats {
        matched: due_tasks.len(),
        ..Default::default()
    };

    for task in due_tasks {
        let message = render_reminder(task);

        match send_with_retry(mailer, &message, max_retries, retry_backoff).await {
            Ok(()) => {
                tracing::info!(task_id = %task.id, to = %task.email, "Reminder sent");
                stats.sent += 1;
            }
            Err(e) => {
                tracing::error!(
                    task_id = %task.id,
                    to = %task.email,
                    error = %e,
                    "Reminder delivery failed after retries"
                );
                stats.failed += 1;
            }
        }
    }

    stats
}

/// Attempts delivery with a bounded retry loop
async fn send_with_retry(
    mailer: &dyn Mailer,
    message: &EmailMessage,
    max_retries: u32,
    retry_backoff: Duration,
) -> Result<(), MailerError> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            tokio::time::sleep(retry_backoff).await;
            tracing::debug!(attempt, to = %message.to, "Retrying reminder delivery");
        }

        match mailer.send(message).await {
            Ok(()) => return Ok(()),
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err.unwrap_or_else(|| MailerError::DeliveryFailed("no attempts made".to_string())))
}

/// Renders the reminder email for one due task
pub fn render_reminder(task: &DueTask) -> EmailMessage {
    EmailMessage {
        to: task.email.clone(),
        subject: SUBJECT_TASK_DUE.to_string(),
        text_body: render_text(task),
        html_body: render_html(task),
    }
}

fn render_text(task: &DueTask) -> String {
    format!(
        "Tasks Due Soon\n\n\
         Title: {}\n\
         Due Date: {}\n\
         Status: {}\n",
        task.title,
        task.due_date.format("%Y-%m-%d %H:%M UTC"),
        task.status.as_str(),
    )
}

fn render_html(task: &DueTask) -> String {
    format!(
        "<html>\n\
         <body>\n\
         <h2>Task Due Soon</h2>\n\
         <p>Hi {},</p>\n\
         <p>The following task is due soon:</p>\n\
         <ul>\n\
         <li><strong>Title:</strong> {}</li>\n\
         <li><strong>Due Date:</strong> {}</li>\n\
         <li><strong>Status:</strong> {}</li>\n\
         </ul>\n\
         </body>\n\
         </html>",
        escape_html(&task.username),
        escape_html(&task.title),
        task.due_date.format("%Y-%m-%d %H:%M UTC"),
        task.status.as_str(),
    )
}

/// Minimal HTML escaping for user-supplied fields
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::MockMailer;
    use chrono::TimeZone;
    use taskdeck_shared::models::task::TaskStatus;
    use uuid::Uuid;

    fn due_task(title: &str, email: &str) -> DueTask {
        DueTask {
            id: Uuid::new_v4(),
            title: title.to_string(),
            status: TaskStatus::Pending,
            due_date: Utc.with_ymd_and_hms(2024, 7, 1, 9, 35, 0).unwrap(),
            username: "jdoe".to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_one_email_per_due_task() {
        let mailer = MockMailer::new();
        let tasks = vec![
            due_task("first", "a@example.com"),
            due_task("second", "b@example.com"),
        ];

        let stats = deliver_reminders(&tasks, &mailer, 2, Duration::ZERO).await;

        assert_eq!(stats.matched, 2);
        assert_eq!(stats.sent, 2);
        assert_eq!(stats.failed, 0);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "a@example.com");
        assert_eq!(sent[1].to, "b@example.com");
        assert!(sent.iter().all(|m| m.subject == SUBJECT_TASK_DUE));
    }

    #[tokio::test]
    async fn test_no_due_tasks_sends_nothing() {
        let mailer = MockMailer::new();

        let stats = deliver_reminders(&[], &mailer, 2, Duration::ZERO).await;

        assert_eq!(stats, ReminderRunStats::default());
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        // First two attempts fail, third succeeds; 2 retries cover it
        let mailer = MockMailer::failing(2);
        let tasks = vec![due_task("flaky", "a@example.com")];

        let stats = deliver_reminders(&tasks, &mailer, 2, Duration::ZERO).await;

        assert_eq!(stats.sent, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_batch() {
        // Exhausts all 3 attempts for the first task, then delivers the rest
        let mailer = MockMailer::failing(3);
        let tasks = vec![
            due_task("doomed", "a@example.com"),
            due_task("fine", "b@example.com"),
            due_task("also fine", "c@example.com"),
        ];

        let stats = deliver_reminders(&tasks, &mailer, 2, Duration::ZERO).await;

        assert_eq!(stats.matched, 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.sent, 2);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "b@example.com");
        assert_eq!(sent[1].to, "c@example.com");
    }

    #[test]
    fn test_render_text_contains_fields() {
        let task = due_task("Write report", "a@example.com");
        let text = render_text(&task);

        assert!(text.contains("Write report"));
        assert!(text.contains("2024-07-01 09:35 UTC"));
        assert!(text.contains("pending"));
    }

    #[test]
    fn test_render_html_escapes_user_input() {
        let mut task = due_task("<script>alert(1)</script>", "a@example.com");
        task.username = "j<d>oe".to_string();

        let html = render_html(&task);

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("j&lt;d&gt;oe"));
    }

    #[test]
    fn test_render_reminder_addresses_owner() {
        let task = due_task("Write report", "owner@example.com");
        let message = render_reminder(&task);

        assert_eq!(message.to, "owner@example.com");
        assert_eq!(message.subject, "Task Due Soon");
        assert!(!message.text_body.is_empty());
        assert!(!message.html_body.is_empty());
    }
}
