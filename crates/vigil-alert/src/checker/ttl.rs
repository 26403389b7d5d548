use vigil_common::types::{MetricState, State};

/// Outcome of the TTL policy for one metric.
#[derive(Debug, Clone, PartialEq)]
pub enum Staleness {
    Fresh,
    /// Drop the metric from the check and forget its pattern index.
    Delete,
    /// Fold this synthesized state in place of missing data.
    Substitute(MetricState),
}

/// Applies the trigger TTL to a metric's last folded state.
///
/// `ttl` of 0 disables the policy. A stale metric is deleted only when
/// `ttl_state` is [`State::Del`] and it has changed state before; otherwise a
/// value-less state is synthesized at `until - ttl`. `Del` is never persisted,
/// so a synthesized DEL state becomes NODATA.
pub fn evaluate_staleness(last: &MetricState, ttl: i64, ttl_state: State, until: i64) -> Staleness {
    if ttl <= 0 || last.timestamp + ttl >= until {
        return Staleness::Fresh;
    }
    if ttl_state == State::Del && last.event_timestamp != 0 {
        return Staleness::Delete;
    }
    let state = if ttl_state == State::Del {
        State::Nodata
    } else {
        ttl_state
    };
    Staleness::Substitute(MetricState {
        state,
        timestamp: until - ttl,
        value: None,
        event_timestamp: last.event_timestamp,
        maintenance: last.maintenance,
        suppressed: last.suppressed,
        message: None,
    })
}
