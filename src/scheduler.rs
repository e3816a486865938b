//! Cron-driven trigger for automatic sync cycles.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cron::Schedule;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{HeraldError, Result};
use crate::sync::{CycleReport, SyncEngine};

/// Fires [`SyncEngine::run_automatic`] on a cron schedule.
pub struct CronScheduler {
    expression: String,
    schedule: Schedule,
    last_run: RwLock<Option<DateTime<Utc>>>,
}

impl CronScheduler {
    /// Parse a six-field cron expression (seconds first).
    pub fn new(expression: &str) -> Result<Self> {
        let schedule = Schedule::from_str(expression).map_err(|e| {
            HeraldError::Config(format!("invalid cron expression '{expression}': {e}"))
        })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
            last_run: RwLock::new(None),
        })
    }

    /// The cron expression as configured.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Next fire time after now.
    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.schedule.upcoming(Utc).next()
    }

    /// When the scheduler last fired, if ever.
    pub async fn last_run(&self) -> Option<DateTime<Utc>> {
        *self.last_run.read().await
    }

    /// Spawn the scheduling loop.
    pub fn start(self: Arc<Self>, engine: Arc<SyncEngine>) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(engine).await;
        })
    }

    async fn run(&self, engine: Arc<SyncEngine>) {
        info!("Scheduler started ({})", self.expression);

        loop {
            let Some(next) = self.next_run() else {
                warn!("Cron expression '{}' has no upcoming runs", self.expression);
                return;
            };

            let wait = (next - Utc::now()).to_std().unwrap_or_default();
            debug!("Next scheduled check at {} (in {}s)", next, wait.as_secs());
            tokio::time::sleep(wait).await;

            let now = Utc::now();
            if now < next {
                continue;
            }

            *self.last_run.write().await = Some(now);
            match engine.run_automatic(now).await {
                CycleReport::Completed(summary) => {
                    let posted = summary.attempts.iter().filter(|a| a.is_posted()).count();
                    info!(
                        "Scheduled check done: {} attempted, {} posted",
                        summary.attempts.len(),
                        posted
                    );
                }
                CycleReport::GateClosed { .. } => {
                    debug!("Scheduled check skipped by publish gate");
                }
                CycleReport::Baseline { tracked } => {
                    info!("Scheduled check took baseline of {} items", tracked);
                }
                CycleReport::FetchFailed(e) => {
                    error!("Scheduled check failed: {}", e);
                }
            }
        }
    }
}
