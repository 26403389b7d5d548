use vigil_common::types::{CheckData, State};

/// Severity aggregation used for a trigger's score.
///
/// Implementations must be monotonic: raising the severity of any metric must
/// never lower the score.
pub trait ScoreRule: Send + Sync {
    /// Weight contributed by one state.
    fn weight(&self, state: State) -> i64;

    /// Score of a whole check: the trigger-level weight plus every metric's.
    fn score(&self, check: &CheckData) -> i64 {
        check
            .metrics
            .values()
            .fold(self.weight(check.state), |acc, metric| {
                acc.saturating_add(self.weight(metric.state))
            })
    }
}

/// Default weights, one order of magnitude or more per severity level.
///
/// ```
/// use vigil_alert::score::{DefaultScore, ScoreRule};
/// use vigil_common::types::State;
///
/// assert!(DefaultScore.weight(State::Crit) > DefaultScore.weight(State::Warn));
/// assert_eq!(DefaultScore.weight(State::Ok), 0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultScore;

impl ScoreRule for DefaultScore {
    fn weight(&self, state: State) -> i64 {
        match state {
            State::Ok | State::Del | State::Test => 0,
            State::Warn => 1,
            State::Crit => 100,
            State::Nodata => 1000,
            State::Exception => 100_000,
        }
    }
}
