use crate::error::Result;
use crate::TriggerStore;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use vigil_common::types::{CheckData, MetricValue, NotificationEvent};

#[derive(Default)]
struct Inner {
    checks: HashMap<String, CheckData>,
    values: HashMap<String, BTreeMap<i64, f64>>,
    pattern_metrics: HashMap<String, BTreeSet<String>>,
    events: Vec<NotificationEvent>,
}

/// In-process [`TriggerStore`] keeping everything behind one mutex.
///
/// # Examples
///
/// ```
/// use vigil_common::types::MetricValue;
/// use vigil_storage::memory::MemoryStore;
/// use vigil_storage::TriggerStore;
///
/// let store = MemoryStore::new();
/// store.save_metric_value("web-01.cpu", MetricValue { timestamp: 60, value: 1.5 }).unwrap();
/// let values = store.get_metric_values("web-01.cpu", 0, 120).unwrap();
/// assert_eq!(values.len(), 1);
/// ```
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the state, recovering from a poisoned Mutex if necessary.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TriggerStore for MemoryStore {
    fn get_last_check(&self, trigger_id: &str) -> Result<Option<CheckData>> {
        Ok(self.lock().checks.get(trigger_id).cloned())
    }

    fn set_last_check(&self, trigger_id: &str, check: &CheckData) -> Result<()> {
        self.lock()
            .checks
            .insert(trigger_id.to_string(), check.clone());
        Ok(())
    }

    fn save_check(&self, trigger_id: &str, check: &CheckData, events: &[NotificationEvent]) -> Result<()> {
        let mut inner = self.lock();
        inner.checks.insert(trigger_id.to_string(), check.clone());
        inner.events.extend_from_slice(events);
        Ok(())
    }

    fn save_metric_value(&self, metric: &str, value: MetricValue) -> Result<()> {
        self.lock()
            .values
            .entry(metric.to_string())
            .or_default()
            .insert(value.timestamp, value.value);
        Ok(())
    }

    fn get_metric_values(&self, metric: &str, from: i64, until: i64) -> Result<Vec<MetricValue>> {
        let inner = self.lock();
        let Some(values) = inner.values.get(metric) else {
            return Ok(Vec::new());
        };
        if from > until {
            return Ok(Vec::new());
        }
        Ok(values
            .range(from..=until)
            .map(|(timestamp, value)| MetricValue {
                timestamp: *timestamp,
                value: *value,
            })
            .collect())
    }

    fn remove_metric_values(&self, metric: &str, older_than: i64) -> Result<()> {
        if let Some(values) = self.lock().values.get_mut(metric) {
            values.retain(|timestamp, _| *timestamp > older_than);
        }
        Ok(())
    }

    fn add_pattern_metric(&self, pattern: &str, metric: &str) -> Result<()> {
        self.lock()
            .pattern_metrics
            .entry(pattern.to_string())
            .or_default()
            .insert(metric.to_string());
        Ok(())
    }

    fn get_pattern_metrics(&self, pattern: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()
            .pattern_metrics
            .get(pattern)
            .map(|metrics| metrics.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn remove_patterns_metrics(&self, patterns: &[String]) -> Result<()> {
        let mut inner = self.lock();
        for pattern in patterns {
            inner.pattern_metrics.remove(pattern);
        }
        Ok(())
    }

    fn push_notification_event(&self, event: &NotificationEvent) -> Result<()> {
        self.lock().events.push(event.clone());
        Ok(())
    }

    fn fetch_notification_events(&self) -> Result<Vec<NotificationEvent>> {
        Ok(std::mem::take(&mut self.lock().events))
    }
}
