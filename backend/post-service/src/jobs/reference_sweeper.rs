//! Reference sweeper background job
//!
//! Mutations are multi-step sagas without a spanning transaction, so a crash
//! or a failed step can leave identifiers pointing at records that no longer
//! exist. This job periodically removes:
//! - comments whose post is gone
//! - post `comments` entries for missing comments
//! - user `posts`/`reposts` entries for missing posts and `replies` entries
//!   for missing comments

use crate::db::{ConsistencySweeper, SweepReport};
use crate::error::Result;
use crate::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, MissedTickBehavior};

/// Delay before the first sweep after startup
const INITIAL_DELAY: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct ReferenceSweepJob {
    sweeper: Arc<dyn ConsistencySweeper>,
    interval: Duration,
}

impl ReferenceSweepJob {
    pub fn new(sweeper: Arc<dyn ConsistencySweeper>, interval: Duration) -> Self {
        Self { sweeper, interval }
    }

    /// Run one sweep and record what it repaired
    pub async fn run_once(&self) -> Result<SweepReport> {
        let started = Instant::now();
        let report = self.sweeper.sweep_dangling_references().await?;

        metrics::record_sweeper_repaired("orphaned_comments", report.orphaned_comments);
        metrics::record_sweeper_repaired("post_comment_refs", report.posts_repaired);
        metrics::record_sweeper_repaired("user_refs", report.users_repaired);

        if report.is_clean() {
            tracing::debug!(duration_ms = started.elapsed().as_millis() as u64, "reference sweep found nothing to repair");
        } else {
            tracing::info!(
                orphaned_comments = report.orphaned_comments,
                posts_repaired = report.posts_repaired,
                users_repaired = report.users_repaired,
                duration_ms = started.elapsed().as_millis() as u64,
                "reference sweep repaired dangling references"
            );
        }

        Ok(report)
    }

    /// Sweep loop. Runs until the task is aborted.
    pub async fn run(self) {
        let mut ticker = interval_at(tokio::time::Instant::now() + INITIAL_DELAY, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.interval.as_secs(), "reference sweeper started");

        loop {
            ticker.tick().await;

            if let Err(e) = self.run_once().await {
                tracing::error!(error = %e, "reference sweep failed");
            }
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
