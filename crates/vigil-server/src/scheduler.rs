use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{interval, Duration};
use vigil_alert::checker::{CheckerContext, TriggerChecker};
use vigil_common::types::Trigger;

/// Outcome counts of one check cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub checked: usize,
    pub failed: usize,
}

/// Checks every configured trigger once per tick.
///
/// A trigger is checked by at most one task at a time: each cycle waits for
/// all of its checks before the next tick is taken.
pub struct TriggerScheduler {
    ctx: CheckerContext,
    triggers: Arc<Vec<Trigger>>,
    tick_secs: u64,
    max_concurrent: usize,
}

impl TriggerScheduler {
    pub fn new(ctx: CheckerContext, triggers: Vec<Trigger>, tick_secs: u64, max_concurrent: usize) -> Self {
        Self {
            ctx,
            triggers: Arc::new(triggers),
            tick_secs,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub async fn run(&self) {
        tracing::info!(
            triggers = self.triggers.len(),
            tick_secs = self.tick_secs,
            max_concurrent = self.max_concurrent,
            "Trigger check scheduler started"
        );

        let mut tick = interval(Duration::from_secs(self.tick_secs));
        loop {
            tick.tick().await;
            match self.check_all(Utc::now().timestamp()).await {
                Ok(summary) => tracing::info!(
                    checked = summary.checked,
                    failed = summary.failed,
                    total_checks = self.ctx.metrics.checks(),
                    total_errors = self.ctx.metrics.check_errors(),
                    "Trigger check cycle finished"
                ),
                Err(e) => tracing::error!(error = %e, "Trigger check cycle failed"),
            }
        }
    }

    /// Checks every trigger with the window ending at `now`.
    pub async fn check_all(&self, now: i64) -> Result<CycleSummary> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(self.triggers.len());

        for index in 0..self.triggers.len() {
            let permit = semaphore.clone().acquire_owned().await?;
            let triggers = self.triggers.clone();
            let ctx = self.ctx.clone();

            let handle = tokio::task::spawn_blocking(move || {
                let trigger = &triggers[index];
                let result = TriggerChecker::new(trigger.clone(), ctx, now).and_then(|checker| checker.check());
                if let Err(e) = &result {
                    tracing::error!(trigger_id = %trigger.id, error = %e, "Trigger check failed");
                }
                drop(permit);
                result.is_ok()
            });
            handles.push(handle);
        }

        let mut summary = CycleSummary::default();
        for handle in handles {
            match handle.await {
                Ok(true) => summary.checked += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(error = %e, "Trigger check task panicked");
                }
            }
        }
        Ok(summary)
    }
}
