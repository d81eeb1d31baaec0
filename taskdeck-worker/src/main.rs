//! # TaskDeck Worker
//!
//! Background worker for the TaskDeck service:
//! - Every minute, emails reminders for tasks due in exactly 5 or 10 minutes
//! - Every day, retires expired refresh tokens into the blacklist
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskdeck-worker
//! ```

use std::sync::Arc;
use taskdeck_shared::db::pool::{create_pool, DatabaseConfig};
use taskdeck_worker::mailer::{HttpMailer, MailerConfig};
use taskdeck_worker::scheduler::Scheduler;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskdeck_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "TaskDeck Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

    let db = create_pool(DatabaseConfig {
        url: database_url,
        ..Default::default()
    })
    .await?;

    let mailer = HttpMailer::new(MailerConfig::from_env()?)?;

    let scheduler = Scheduler::new(db, Arc::new(mailer));
    let shutdown_token = scheduler.shutdown_token();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    scheduler.run().await?;

    Ok(())
}
