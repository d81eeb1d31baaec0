/// HTTP mail-service transport
///
/// Delivers email by POSTing a JSON payload to a mail-service API
/// (SendGrid-style: bearer-authenticated endpoint accepting from/to/
/// subject/text/html fields). Credentials come from the environment.
///
/// # Environment Variables
///
/// - `MAIL_API_URL`: delivery endpoint (required)
/// - `MAIL_API_TOKEN`: bearer token (required)
/// - `MAIL_FROM`: sender address (required)

use super::{EmailMessage, Mailer, MailerError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Mailer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    /// Mail-service delivery endpoint
    pub api_url: String,

    /// Bearer token for the mail service
    pub api_token: String,

    /// Sender address stamped on every message
    pub from_address: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl MailerConfig {
    /// Loads mailer configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing.
    pub fn from_env() -> Result<Self, MailerError> {
        dotenvy::dotenv().ok();

        let api_url = env::var("MAIL_API_URL").map_err(|_| {
            MailerError::ConfigError("MAIL_API_URL environment variable is required".to_string())
        })?;

        let api_token = env::var("MAIL_API_TOKEN").map_err(|_| {
            MailerError::ConfigError("MAIL_API_TOKEN environment variable is required".to_string())
        })?;

        let from_address = env::var("MAIL_FROM").map_err(|_| {
            MailerError::ConfigError("MAIL_FROM environment variable is required".to_string())
        })?;

        let timeout_secs = env::var("MAIL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            api_url,
            api_token,
            from_address,
            timeout_secs,
        })
    }
}

/// Delivery payload sent to the mail service
#[derive(Debug, Serialize)]
struct DeliveryPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

/// Mailer delivering via an HTTP mail-service API
pub struct HttpMailer {
    client: reqwest::Client,
    config: MailerConfig,
}

impl HttpMailer {
    /// Creates a new HTTP mailer
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: MailerConfig) -> Result<Self, MailerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MailerError::ConfigError(format!("HTTP client build failed: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        let payload = DeliveryPayload {
            from: &self.config.from_address,
            to: &message.to,
            subject: &message.subject,
            text: &message.text_body,
            html: &message.html_body,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MailerError::DeliveryFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Rejected(format!("{}: {}", status, body)));
        }

        tracing::debug!(to = %message.to, "Email delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mailer_name() {
        let mailer = HttpMailer::new(MailerConfig {
            api_url: "https://mail.example.com/send".to_string(),
            api_token: "token".to_string(),
            from_address: "noreply@example.com".to_string(),
            timeout_secs: 10,
        })
        .unwrap();

        assert_eq!(mailer.name(), "http");
    }

    #[test]
    fn test_delivery_payload_serialization() {
        let payload = DeliveryPayload {
            from: "noreply@example.com",
            to: "user@example.com",
            subject: "Task Due Soon",
            text: "plain",
            html: "<p>html</p>",
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["from"], "noreply@example.com");
        assert_eq!(json["to"], "user@example.com");
        assert_eq!(json["subject"], "Task Due Soon");
    }
}
