/// Email delivery seam
///
/// All outbound mail goes through the [`Mailer`] trait so the reminder job
/// can be exercised without a live mail service. Two implementations:
///
/// - [`HttpMailer`]: delivers via an HTTP mail-service API
/// - [`MockMailer`]: records sends in memory for tests
///
/// # Example
///
/// ```no_run
/// use taskdeck_worker::mailer::{EmailMessage, Mailer, MockMailer};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mailer = MockMailer::new();
///
/// mailer.send(&EmailMessage {
///     to: "user@example.com".to_string(),
///     subject: "Task Due Soon".to_string(),
///     text_body: "Your task is due in 5 minutes".to_string(),
///     html_body: "<p>Your task is due in 5 minutes</p>".to_string(),
/// }).await?;
///
/// assert_eq!(mailer.sent().len(), 1);
/// # Ok(())
/// # }
/// ```

pub mod http;
pub mod mock;

pub use http::{HttpMailer, MailerConfig};
pub use mock::MockMailer;

use async_trait::async_trait;

/// Mailer error types
#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    /// Delivery request could not be sent
    #[error("Email delivery failed: {0}")]
    DeliveryFailed(String),

    /// The mail service rejected the message
    #[error("Mail service rejected message: {0}")]
    Rejected(String),

    /// Configuration error
    #[error("Mailer configuration error: {0}")]
    ConfigError(String),
}

/// A rendered email ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient address
    pub to: String,

    /// Subject line
    pub subject: String,

    /// Plain-text body
    pub text_body: String,

    /// HTML body
    pub html_body: String,
}

/// Email delivery contract
///
/// Implementations must be safe to share across tasks; the scheduler holds
/// a single mailer behind an `Arc`.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Returns the mailer name, used in logs
    fn name(&self) -> &str;

    /// Delivers one message
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails; the caller decides whether to
    /// retry.
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError>;
}
