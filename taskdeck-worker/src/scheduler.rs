/// Periodic job scheduler
///
/// Runs the background jobs on fixed intervals:
///
/// ```text
/// Scheduler
///   ├─> ReminderJob: every minute, email tasks due in exactly 5 or 10 min
///   └─> TokenCleanupJob: every day, retire expired refresh tokens
/// ```
///
/// Jobs run sequentially inside the scheduler loop; a failing run is logged
/// and the next tick proceeds normally. Shutdown is signalled through a
/// CancellationToken, so in-flight runs finish before the loop exits.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskdeck_worker::mailer::MockMailer;
/// use taskdeck_worker::scheduler::Scheduler;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> anyhow::Result<()> {
/// let scheduler = Scheduler::new(pool, Arc::new(MockMailer::new()));
/// scheduler.run().await?;
/// # Ok(())
/// # }
/// ```

use crate::mailer::Mailer;
use crate::reminder::ReminderJob;
use crate::token_cleanup::TokenCleanupJob;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Reminder tick interval in seconds
    pub reminder_interval_secs: u64,

    /// Token cleanup interval in seconds
    pub cleanup_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            reminder_interval_secs: 60,
            cleanup_interval_secs: 60 * 60 * 24,
        }
    }
}

/// Periodic job scheduler
pub struct Scheduler {
    reminder: ReminderJob,
    cleanup: TokenCleanupJob,
    config: SchedulerConfig,
    shutdown_token: CancellationToken,
}

impl Scheduler {
    /// Creates a scheduler with default intervals
    pub fn new(db: PgPool, mailer: Arc<dyn Mailer>) -> Self {
        Self::with_config(db, mailer, SchedulerConfig::default())
    }

    /// Creates a scheduler with custom intervals
    pub fn with_config(db: PgPool, mailer: Arc<dyn Mailer>, config: SchedulerConfig) -> Self {
        Scheduler {
            reminder: ReminderJob::new(db.clone(), mailer),
            cleanup: TokenCleanupJob::new(db),
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Gets the shutdown token
    ///
    /// Used to signal graceful shutdown from external handlers.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs the scheduler loop until shutdown
    ///
    /// # Errors
    ///
    /// Job failures are logged, not propagated; this only returns once the
    /// shutdown token fires.
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!(
            reminder_interval_secs = self.config.reminder_interval_secs,
            cleanup_interval_secs = self.config.cleanup_interval_secs,
            "Scheduler starting"
        );

        let mut reminder_tick = interval(Duration::from_secs(self.config.reminder_interval_secs));
        reminder_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut cleanup_tick = interval(Duration::from_secs(self.config.cleanup_interval_secs));
        cleanup_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Shutdown requested, scheduler stopping");
                    break;
                }
                _ = reminder_tick.tick() => {
                    match self.reminder.run_once(Utc::now()).await {
                        Ok(stats) if stats.matched > 0 => {
                            tracing::info!(
                                matched = stats.matched,
                                sent = stats.sent,
                                failed = stats.failed,
                                "Reminder tick completed"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "Reminder tick failed");
                        }
                    }
                }
                _ = cleanup_tick.tick() => {
                    if let Err(e) = self.cleanup.run_once(Utc::now()).await {
                        tracing::error!(error = %e, "Token cleanup failed");
                    }
                }
            }
        }

        tracing::info!("Scheduler shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.reminder_interval_secs, 60);
        assert_eq!(config.cleanup_interval_secs, 86400);
    }
}
