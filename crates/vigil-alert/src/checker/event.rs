use super::TriggerChecker;
use vigil_common::id::next_id;
use vigil_common::types::{CheckData, MetricState, NotificationEvent};

impl TriggerChecker {
    /// Compares a metric's new state with its previous one and appends a
    /// notification event to `events` on a state change.
    ///
    /// A change inside the metric's maintenance window is recorded as
    /// suppressed instead. A `maintenance` of 0 means no window.
    pub(super) fn compare_states(
        &self,
        metric: &str,
        mut current: MetricState,
        last: &MetricState,
        events: &mut Vec<NotificationEvent>,
    ) -> MetricState {
        current.event_timestamp = last.event_timestamp;
        if current.state == last.state {
            return current;
        }

        current.event_timestamp = current.timestamp;
        if current.maintenance > 0 && current.maintenance >= current.timestamp {
            tracing::debug!(
                trigger_id = %self.trigger.id,
                metric,
                state = %current.state,
                maintenance = current.maintenance,
                "State change suppressed by maintenance"
            );
            current.suppressed = true;
            return current;
        }
        current.suppressed = false;

        events.push(NotificationEvent {
            id: next_id(),
            trigger_id: self.trigger.id.clone(),
            metric: metric.to_string(),
            state: current.state,
            old_state: last.state,
            timestamp: current.timestamp,
            value: current.value,
            message: current.message.clone(),
            is_trigger_event: false,
        });
        tracing::info!(
            trigger_id = %self.trigger.id,
            metric,
            old_state = %last.state,
            state = %current.state,
            timestamp = current.timestamp,
            "Metric state changed"
        );
        current
    }

    /// Compares the trigger-level state with the last persisted check.
    pub(super) fn compare_checks(&self, current: &mut CheckData, events: &mut Vec<NotificationEvent>) {
        let last = &self.last_check;
        current.event_timestamp = last.event_timestamp;
        if current.state == last.state {
            return;
        }
        current.event_timestamp = current.timestamp;

        events.push(NotificationEvent {
            id: next_id(),
            trigger_id: self.trigger.id.clone(),
            metric: self.trigger.name.clone(),
            state: current.state,
            old_state: last.state,
            timestamp: current.timestamp,
            value: None,
            message: current.message.clone(),
            is_trigger_event: true,
        });
        tracing::info!(
            trigger_id = %self.trigger.id,
            old_state = %last.state,
            state = %current.state,
            "Trigger state changed"
        );
    }
}
