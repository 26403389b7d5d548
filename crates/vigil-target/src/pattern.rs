use crate::{Result, TargetError, TargetResolver, TargetResult};
use std::sync::Arc;
use vigil_common::types::TimeSeries;
use vigil_storage::TriggerStore;

/// Default series resolution in seconds.
pub const DEFAULT_STEP_SECS: i64 = 60;

/// Resolves plain metric patterns through the store's pattern index.
///
/// A pattern that matches no metric resolves to a single wildcard series
/// named after the pattern, so callers can tell "matched nothing real" apart
/// from "evaluated to nothing".
pub struct PatternResolver {
    store: Arc<dyn TriggerStore>,
    step_secs: i64,
}

impl PatternResolver {
    pub fn new(store: Arc<dyn TriggerStore>) -> Self {
        Self::with_step(store, DEFAULT_STEP_SECS)
    }

    pub fn with_step(store: Arc<dyn TriggerStore>, step_secs: i64) -> Self {
        Self {
            store,
            step_secs: step_secs.max(1),
        }
    }

    fn build_series(&self, metric: &str, from: i64, until: i64, allow_realtime: bool) -> Result<TimeSeries> {
        let step = self.step_secs;
        let start = from - from.rem_euclid(step);
        let open_step = until - until.rem_euclid(step);
        let len = ((open_step - start) / step + 1).max(0) as usize;

        let mut values = vec![None; len];
        for point in self.store.get_metric_values(metric, start, until)? {
            let index = ((point.timestamp - start) / step) as usize;
            if let Some(slot) = values.get_mut(index) {
                *slot = Some(point.value);
            }
        }
        if !allow_realtime {
            if let Some(last) = values.last_mut() {
                *last = None;
            }
        }
        Ok(TimeSeries::new(metric, start, step, values))
    }
}

impl TargetResolver for PatternResolver {
    fn evaluate_target(&self, target: &str, from: i64, until: i64, allow_realtime: bool) -> Result<TargetResult> {
        let pattern = parse_pattern(target)?;

        let metrics = self.store.get_pattern_metrics(pattern)?;
        if metrics.is_empty() {
            tracing::debug!(pattern, "Pattern matched no metrics");
            let step = self.step_secs;
            let start = from - from.rem_euclid(step);
            let stop = until - until.rem_euclid(step) + step;
            return Ok(TargetResult {
                series: vec![TimeSeries::wildcard(pattern, start, stop, step)],
                metrics: Vec::new(),
            });
        }

        let mut series = Vec::with_capacity(metrics.len());
        for metric in &metrics {
            series.push(self.build_series(metric, from, until, allow_realtime)?);
        }
        Ok(TargetResult { series, metrics })
    }
}

/// Extracts the metric pattern of a target, rejecting function calls.
fn parse_pattern(target: &str) -> Result<&str> {
    let target = target.trim();
    if target.is_empty() {
        return Err(TargetError::InvalidTarget {
            target: target.to_string(),
            reason: "empty target".to_string(),
        });
    }
    if let Some(open) = target.find('(') {
        return Err(TargetError::UnknownFunction(target[..open].trim().to_string()));
    }
    if target.contains(char::is_whitespace) {
        return Err(TargetError::InvalidTarget {
            target: target.to_string(),
            reason: "patterns may not contain whitespace".to_string(),
        });
    }
    Ok(target)
}
