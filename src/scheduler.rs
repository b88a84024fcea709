use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::HistoryConfig;
use crate::services::HistoryService;

/// Background retention of the activity log.
pub struct Scheduler {
    history: Arc<HistoryService>,
    config: HistoryConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(history: Arc<HistoryService>, config: HistoryConfig) -> Self {
        Self {
            history,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Runs until [`Scheduler::stop`] is called.
    pub async fn start(&self) -> Result<()> {
        if !self.config.prune_enabled {
            info!("History pruning is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        let mut sched = JobScheduler::new().await?;

        let history = Arc::clone(&self.history);
        let running = Arc::clone(&self.running);
        let retention_days = self.config.retention_days;

        let job = Job::new_async(self.config.prune_cron.as_str(), move |_uuid, _lock| {
            let history = Arc::clone(&history);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                let start = std::time::Instant::now();
                info!(event = "job_started", job_name = "prune_history", "Starting scheduled history pruning");

                match history.prune(retention_days).await {
                    Ok(removed) => info!(
                        event = "job_finished",
                        job_name = "prune_history",
                        removed,
                        duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "Scheduled history pruning finished"
                    ),
                    Err(e) => {
                        error!(event = "job_failed", job_name = "prune_history", error = %e, "Scheduled history pruning failed");
                    }
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!(
            "History pruning scheduled: {} (retention {} days)",
            self.config.prune_cron, retention_days
        );

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    /// Prune once, outside the schedule.
    pub async fn run_once(&self) -> Result<u64> {
        info!("Running manual history pruning...");
        self.history.prune(self.config.retention_days).await
    }
}
