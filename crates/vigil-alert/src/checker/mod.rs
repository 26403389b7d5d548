//! Trigger check orchestration.
//!
//! One [`TriggerChecker::check`] call reads the trigger's last persisted
//! [`CheckData`], resolves its targets over the check window, folds every
//! metric's new states into a fresh snapshot, applies the TTL policy, and
//! persists the result together with the notification events it produced.

pub mod event;
pub mod steps;
pub mod ttl;

use crate::error::{CheckError, Result};
use crate::expression::TriggerRule;
use crate::metrics::CheckerMetrics;
use crate::score::{DefaultScore, ScoreRule};
use crate::timeseries::assemble;
use std::sync::Arc;
use steps::Stepper;
use ttl::Staleness;
use vigil_common::types::{CheckData, NotificationEvent, State, Trigger};
use vigil_storage::TriggerStore;
use vigil_target::TargetResolver;

/// Samples within this many seconds before a metric's last state are
/// evaluated again on the next check.
pub const CHECK_POINT_GAP: i64 = 120;

/// Look-back of the check window when the trigger has no TTL.
const DEFAULT_WINDOW_SECS: i64 = 600;

/// Age given to the baseline state of a metric seen for the first time,
/// relative to the start of its series.
const NEW_METRIC_LOOKBACK_SECS: i64 = 3600;

const DEFAULT_METRICS_TTL_SECS: i64 = 3 * 3600;

const EVALUATION_EXCEPTION_MESSAGE: &str = "Trigger evaluation exception";

/// Collaborators shared by every check.
#[derive(Clone)]
pub struct CheckerContext {
    pub store: Arc<dyn TriggerStore>,
    pub resolver: Arc<dyn TargetResolver>,
    pub metrics: Arc<CheckerMetrics>,
    pub score_rule: Arc<dyn ScoreRule>,
    /// Raw values older than this many seconds before the window end are pruned.
    pub metrics_ttl_secs: i64,
}

impl CheckerContext {
    pub fn new(store: Arc<dyn TriggerStore>, resolver: Arc<dyn TargetResolver>) -> Self {
        Self {
            store,
            resolver,
            metrics: Arc::new(CheckerMetrics::new()),
            score_rule: Arc::new(DefaultScore),
            metrics_ttl_secs: DEFAULT_METRICS_TTL_SECS,
        }
    }

    pub fn with_score_rule(mut self, score_rule: Arc<dyn ScoreRule>) -> Self {
        self.score_rule = score_rule;
        self
    }

    pub fn with_metrics_ttl(mut self, metrics_ttl_secs: i64) -> Self {
        self.metrics_ttl_secs = metrics_ttl_secs;
        self
    }
}

/// Checks one trigger over the window ending at `until`.
pub struct TriggerChecker {
    trigger: Trigger,
    ctx: CheckerContext,
    last_check: CheckData,
    from: i64,
    until: i64,
    ttl: i64,
    ttl_state: State,
}

impl TriggerChecker {
    /// Loads the trigger's last check and derives the check window ending at
    /// `now` (unix seconds).
    pub fn new(trigger: Trigger, ctx: CheckerContext, now: i64) -> Result<Self> {
        let last_check = ctx
            .store
            .get_last_check(&trigger.id)?
            .unwrap_or_else(|| CheckData::initial(now - NEW_METRIC_LOOKBACK_SECS));
        let ttl = trigger.ttl_secs();
        let window = if ttl > 0 { ttl } else { DEFAULT_WINDOW_SECS };
        let from = last_check.timestamp - window;
        let ttl_state = trigger.ttl_state;

        Ok(Self {
            trigger,
            ctx,
            last_check,
            from,
            until: now,
            ttl,
            ttl_state,
        })
    }

    pub fn trigger_id(&self) -> &str {
        &self.trigger.id
    }

    /// The `[from, until]` window this checker evaluates.
    pub fn window(&self) -> (i64, i64) {
        (self.from, self.until)
    }

    /// Runs one check cycle and persists its result.
    ///
    /// Soft conditions are folded into the persisted state; hard errors are
    /// returned and leave the previous check and the event queue untouched.
    pub fn check(&self) -> Result<()> {
        tracing::debug!(trigger_id = %self.trigger.id, from = self.from, until = self.until, "Checking trigger");
        self.ctx.metrics.mark_check();

        let mut check_data = self.seed_check_data();
        let mut events = Vec::new();
        let decided = match self.handle_trigger(&mut check_data, &mut events) {
            Ok(()) => true,
            Err(err) => self.handle_error_check(&mut check_data, err)?,
        };
        if decided {
            self.compare_checks(&mut check_data, &mut events);
        }
        check_data.score = self.ctx.score_rule.score(&check_data);
        self.ctx.store.save_check(&self.trigger.id, &check_data, &events)?;
        Ok(())
    }

    /// New snapshot carrying the previous metrics and score forward.
    fn seed_check_data(&self) -> CheckData {
        CheckData {
            metrics: self.last_check.metrics.clone(),
            state: State::Ok,
            timestamp: self.until,
            event_timestamp: self.last_check.event_timestamp,
            score: self.last_check.score,
            message: None,
        }
    }

    fn handle_trigger(&self, check_data: &mut CheckData, events: &mut Vec<NotificationEvent>) -> Result<()> {
        let (series, metrics) = assemble(
            self.ctx.resolver.as_ref(),
            &self.trigger,
            self.from,
            self.until,
        )?;

        self.cleanup_metrics_values(&metrics);

        if series.main.is_empty() {
            return Err(CheckError::NoMetrics);
        }
        if series.has_only_wildcards() {
            return Err(CheckError::OnlyWildcards);
        }

        let rule = TriggerRule::resolve(&self.trigger)?;
        let stepper = Stepper {
            trigger: &self.trigger,
            rule: &rule,
            series: &series,
            until: self.until,
        };

        for time_series in series.main.iter().filter(|s| !s.wildcard) {
            let name = time_series.name.as_str();
            tracing::debug!(
                trigger_id = %self.trigger.id,
                metric = name,
                start = time_series.start_time,
                stop = time_series.stop_time,
                step = time_series.step_time,
                "Checking time series"
            );

            let persisted = self
                .last_check
                .get_or_create_metric_state(name, time_series.start_time - NEW_METRIC_LOOKBACK_SECS);
            let new_states = stepper.step_metric(time_series, &persisted)?;

            let mut folded = persisted;
            for state in new_states {
                let current = self.compare_states(name, state, &folded, events);
                check_data.metrics.insert(name.to_string(), current.clone());
                folded = current;
            }

            match ttl::evaluate_staleness(&folded, self.ttl, self.ttl_state, self.until) {
                Staleness::Fresh => {}
                Staleness::Delete => {
                    tracing::info!(trigger_id = %self.trigger.id, metric = name, "Remove metric");
                    check_data.metrics.remove(name);
                    self.ctx.store.remove_patterns_metrics(&self.trigger.patterns)?;
                }
                Staleness::Substitute(stale) => {
                    tracing::debug!(
                        trigger_id = %self.trigger.id,
                        metric = name,
                        last_timestamp = folded.timestamp,
                        "Metric TTL expired"
                    );
                    let current = self.compare_states(name, stale, &folded, events);
                    check_data.metrics.insert(name.to_string(), current);
                }
            }
        }
        Ok(())
    }

    /// Folds a failed [`handle_trigger`](Self::handle_trigger) into the
    /// trigger-level state.
    ///
    /// Returns `Ok(false)` when the snapshot is left exactly as seeded, which
    /// skips the trigger-level comparison. Hard errors are passed through.
    fn handle_error_check(&self, check_data: &mut CheckData, err: CheckError) -> Result<bool> {
        if err.is_hard() {
            return Err(err);
        }
        match err {
            CheckError::NoMetrics => {
                tracing::debug!(trigger_id = %self.trigger.id, "{err}");
                if self.ttl == 0 {
                    return Ok(false);
                }
                check_data.state = self.ttl_state;
                check_data.message = Some(err.to_string());
            }
            CheckError::OnlyWildcards => {
                tracing::debug!(trigger_id = %self.trigger.id, "{err}");
                if check_data.metrics.is_empty() {
                    check_data.state = State::Nodata;
                }
            }
            err if err.is_unknown_function() => {
                tracing::warn!(trigger_id = %self.trigger.id, error = %err, "Trigger uses an unknown function");
                check_data.state = State::Exception;
                check_data.message = Some(err.to_string());
            }
            err => {
                self.ctx.metrics.mark_check_error();
                tracing::error!(trigger_id = %self.trigger.id, error = %err, "Trigger check failed");
                check_data.state = State::Exception;
                check_data.message = Some(EVALUATION_EXCEPTION_MESSAGE.to_string());
            }
        }
        Ok(true)
    }

    /// Best-effort pruning of raw values that fell out of the metrics TTL.
    fn cleanup_metrics_values(&self, metrics: &[String]) {
        let older_than = self.until - self.ctx.metrics_ttl_secs;
        for metric in metrics {
            if let Err(e) = self.ctx.store.remove_metric_values(metric, older_than) {
                tracing::error!(trigger_id = %self.trigger.id, metric = %metric, error = %e, "Failed to remove old metric values");
            }
        }
    }
}
