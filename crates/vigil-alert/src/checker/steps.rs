use super::CHECK_POINT_GAP;
use crate::error::Result;
use crate::expression::TriggerRule;
use crate::timeseries::TriggerTimeSeries;
use vigil_common::types::{MetricState, TimeSeries, Trigger};

/// Walks one metric's series forward from its checkpoint.
pub struct Stepper<'a> {
    pub trigger: &'a Trigger,
    pub rule: &'a TriggerRule,
    pub series: &'a TriggerTimeSeries,
    /// End of the check window.
    pub until: i64,
}

impl Stepper<'_> {
    /// Evaluates every unprocessed, gap-free timestamp of `main` in order.
    ///
    /// Each evaluation sees the state produced by the previous one as
    /// `PREV_STATE`; the first sees `last_known`. An evaluation error aborts
    /// the whole metric.
    pub fn step_metric(&self, main: &TimeSeries, last_known: &MetricState) -> Result<Vec<MetricState>> {
        let check_point = last_known.check_point(CHECK_POINT_GAP);
        let step = main.step_time.max(1);
        let mut previous = last_known.clone();
        let mut states = Vec::new();

        let mut timestamp = main.start_time;
        while timestamp < self.until + step {
            let candidate = timestamp;
            timestamp += step;

            if candidate <= check_point {
                continue;
            }
            let Some(values) = self.series.values_at(main, candidate) else {
                continue;
            };

            let value = values.main;
            let state = values
                .into_expression(self.trigger, previous.state)
                .evaluate(self.rule)?;

            let next = MetricState {
                state,
                timestamp: candidate,
                value: Some(value),
                event_timestamp: previous.event_timestamp,
                maintenance: previous.maintenance,
                suppressed: previous.suppressed,
                message: None,
            };
            states.push(next.clone());
            previous = next;
        }

        Ok(states)
    }
}
