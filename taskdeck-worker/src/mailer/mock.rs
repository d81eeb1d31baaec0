/// Mock mailer for tests
///
/// Records every delivered message in memory and can be configured to fail
/// a number of initial sends, which is how the reminder job's retry and
/// per-task isolation behavior is exercised without a live mail service.

use super::{EmailMessage, Mailer, MailerError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Mailer that records sends instead of delivering them
pub struct MockMailer {
    sent: Mutex<Vec<EmailMessage>>,
    failures_remaining: AtomicUsize,
}

impl MockMailer {
    /// Creates a mock mailer where every send succeeds
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failures_remaining: AtomicUsize::new(0),
        }
    }

    /// Creates a mock mailer that fails the first `n` sends, then succeeds
    pub fn failing(n: usize) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failures_remaining: AtomicUsize::new(n),
        }
    }

    /// Returns a copy of every message delivered so far
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("mock mailer lock poisoned").clone()
    }
}

impl Default for MockMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(MailerError::DeliveryFailed(
                "mock failure requested".to_string(),
            ));
        }

        self.sent
            .lock()
            .expect("mock mailer lock poisoned")
            .push(message.clone());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> EmailMessage {
        EmailMessage {
            to: "user@example.com".to_string(),
            subject: "Task Due Soon".to_string(),
            text_body: "plain".to_string(),
            html_body: "<p>html</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mock_records_sends() {
        let mailer = MockMailer::new();

        mailer.send(&sample_message()).await.unwrap();
        mailer.send(&sample_message()).await.unwrap();

        assert_eq!(mailer.sent().len(), 2);
        assert_eq!(mailer.sent()[0].to, "user@example.com");
    }

    #[tokio::test]
    async fn test_mock_fails_then_succeeds() {
        let mailer = MockMailer::failing(2);

        assert!(mailer.send(&sample_message()).await.is_err());
        assert!(mailer.send(&sample_message()).await.is_err());
        assert!(mailer.send(&sample_message()).await.is_ok());

        assert_eq!(mailer.sent().len(), 1);
    }
}
