use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Health state of a metric or of a whole trigger.
///
/// `Del` is a transient marker telling the checker to drop a metric; it is
/// never persisted as a metric's resting state. `Test` only exists for the
/// notifier.
///
/// # Examples
///
/// ```
/// use vigil_common::types::State;
///
/// let state: State = "crit".parse().unwrap();
/// assert_eq!(state, State::Crit);
/// assert_eq!(state.to_string(), "CRIT");
/// assert_eq!("ERROR".parse::<State>().unwrap(), State::Crit);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Ok,
    Warn,
    #[serde(alias = "ERROR")]
    Crit,
    Nodata,
    Exception,
    Del,
    Test,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Ok => write!(f, "OK"),
            State::Warn => write!(f, "WARN"),
            State::Crit => write!(f, "CRIT"),
            State::Nodata => write!(f, "NODATA"),
            State::Exception => write!(f, "EXCEPTION"),
            State::Del => write!(f, "DEL"),
            State::Test => write!(f, "TEST"),
        }
    }
}

impl std::str::FromStr for State {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OK" => Ok(State::Ok),
            "WARN" | "WARNING" => Ok(State::Warn),
            "CRIT" | "ERROR" => Ok(State::Crit),
            "NODATA" => Ok(State::Nodata),
            "EXCEPTION" => Ok(State::Exception),
            "DEL" => Ok(State::Del),
            "TEST" => Ok(State::Test),
            _ => Err(format!("unknown state: {s}")),
        }
    }
}

/// State of one metric of a trigger at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricState {
    pub state: State,
    /// Timestamp (unix seconds) of the sample this state was computed from.
    pub timestamp: i64,
    /// Observed main-target value; absent for synthesized stale states.
    #[serde(default)]
    pub value: Option<f64>,
    /// Last time the state of this metric actually changed.
    #[serde(default)]
    pub event_timestamp: i64,
    /// End of the maintenance window (unix seconds), 0 when none.
    #[serde(default)]
    pub maintenance: i64,
    #[serde(default)]
    pub suppressed: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl MetricState {
    pub fn new(state: State, timestamp: i64) -> Self {
        Self {
            state,
            timestamp,
            value: None,
            event_timestamp: 0,
            maintenance: 0,
            suppressed: false,
            message: None,
        }
    }

    /// Timestamp up to which this metric's history is considered processed.
    ///
    /// Samples within `gap` seconds before the state's timestamp are evaluated
    /// again so late points are not lost, but never before the last state
    /// change. An `event_timestamp` of 0 means the state never changed.
    ///
    /// ```
    /// use vigil_common::types::{MetricState, State};
    ///
    /// let mut state = MetricState::new(State::Ok, 1000);
    /// assert_eq!(state.check_point(120), 880);
    /// state.event_timestamp = 950;
    /// assert_eq!(state.check_point(120), 950);
    ///
    /// let baseline = MetricState::new(State::Nodata, -3600);
    /// assert_eq!(baseline.check_point(120), -3720);
    /// ```
    pub fn check_point(&self, gap: i64) -> i64 {
        let check_point = self.timestamp - gap;
        if self.event_timestamp == 0 {
            return check_point;
        }
        check_point.max(self.event_timestamp)
    }
}

/// Snapshot of one check cycle of a trigger, persisted after every check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckData {
    #[serde(default)]
    pub metrics: HashMap<String, MetricState>,
    pub state: State,
    /// End of the check window this snapshot was computed for.
    pub timestamp: i64,
    /// Last time the trigger-level state changed.
    #[serde(default)]
    pub event_timestamp: i64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub message: Option<String>,
}

impl CheckData {
    /// Snapshot used for a trigger that has never been checked.
    pub fn initial(timestamp: i64) -> Self {
        Self {
            metrics: HashMap::new(),
            state: State::Nodata,
            timestamp,
            event_timestamp: 0,
            score: 0,
            message: None,
        }
    }

    /// Returns the stored state of `metric`, or a NODATA state stamped at
    /// `empty_timestamp` when the metric has not been seen yet.
    pub fn get_or_create_metric_state(&self, metric: &str, empty_timestamp: i64) -> MetricState {
        self.metrics
            .get(metric)
            .cloned()
            .unwrap_or_else(|| MetricState::new(State::Nodata, empty_timestamp))
    }
}

/// A raw sample of a metric as written by the ingest path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub timestamp: i64,
    pub value: f64,
}

/// A fixed-step series of samples produced by target resolution.
///
/// Missing samples are `None`; NaN samples are normalized to `None` on
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub name: String,
    pub start_time: i64,
    pub stop_time: i64,
    pub step_time: i64,
    pub values: Vec<Option<f64>>,
    /// Placeholder for a pattern that matched no concrete metric.
    pub wildcard: bool,
}

impl TimeSeries {
    pub fn new(name: impl Into<String>, start_time: i64, step_time: i64, values: Vec<Option<f64>>) -> Self {
        let step_time = step_time.max(1);
        let values: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        Self {
            name: name.into(),
            start_time,
            stop_time: start_time + step_time * values.len() as i64,
            step_time,
            values,
            wildcard: false,
        }
    }

    /// An all-empty series standing in for a pattern without matches.
    pub fn wildcard(name: impl Into<String>, start_time: i64, stop_time: i64, step_time: i64) -> Self {
        let step_time = step_time.max(1);
        let len = ((stop_time - start_time) / step_time).max(0) as usize;
        Self {
            name: name.into(),
            start_time,
            stop_time,
            step_time,
            values: vec![None; len],
            wildcard: true,
        }
    }

    /// Sample of the step containing `timestamp`.
    ///
    /// ```
    /// use vigil_common::types::TimeSeries;
    ///
    /// let series = TimeSeries::new("cpu", 0, 60, vec![Some(1.0), None, Some(f64::NAN)]);
    /// assert_eq!(series.value_at(0), Some(1.0));
    /// assert_eq!(series.value_at(59), Some(1.0));
    /// assert_eq!(series.value_at(60), None);
    /// assert_eq!(series.value_at(120), None);
    /// assert_eq!(series.value_at(-60), None);
    /// assert_eq!(series.value_at(600), None);
    /// ```
    pub fn value_at(&self, timestamp: i64) -> Option<f64> {
        if timestamp < self.start_time {
            return None;
        }
        let index = ((timestamp - self.start_time) / self.step_time) as usize;
        self.values.get(index).copied().flatten()
    }
}

/// An alerting rule over one or more metric-query targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub id: String,
    pub name: String,
    /// Query targets; the first is the main target, later ones are referenced
    /// as `t2`, `t3`, ... in custom expressions.
    pub targets: Vec<String>,
    #[serde(default)]
    pub warn_value: Option<f64>,
    #[serde(default)]
    pub error_value: Option<f64>,
    #[serde(default)]
    pub expression: Option<String>,
    /// Plain metric patterns the targets read from.
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Seconds without data before a metric is considered stale.
    #[serde(default)]
    pub ttl: Option<i64>,
    #[serde(default = "default_ttl_state")]
    pub ttl_state: State,
}

fn default_ttl_state() -> State {
    State::Nodata
}

impl Trigger {
    /// A trigger with a single target and plain warn/error thresholds.
    /// A blank expression counts as none.
    pub fn is_simple(&self) -> bool {
        self.targets.len() == 1 && self.custom_expression().is_none()
    }

    /// The custom expression, trimmed, when one is set and not blank.
    pub fn custom_expression(&self) -> Option<&str> {
        self.expression
            .as_deref()
            .map(str::trim)
            .filter(|expression| !expression.is_empty())
    }

    /// Configured TTL in seconds, 0 when disabled.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl.filter(|ttl| *ttl > 0).unwrap_or(0)
    }
}

/// A state transition recorded for the notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: String,
    pub trigger_id: String,
    /// Metric name, or the trigger name for trigger-level events.
    pub metric: String,
    pub state: State,
    pub old_state: State,
    pub timestamp: i64,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    pub is_trigger_event: bool,
}
