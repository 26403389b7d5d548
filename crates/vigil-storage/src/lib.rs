//! Persistence layer for trigger checks and raw metric values.
//!
//! [`TriggerStore`] is the contract the checker relies on. Two backends are
//! provided: [`memory::MemoryStore`] for tests and single-process use, and
//! [`engine::SqliteStore`], a WAL-mode SQLite database used by the service.

pub mod engine;
pub mod error;
pub mod memory;


use error::Result;
use vigil_common::types::{CheckData, MetricValue, NotificationEvent};

/// Storage backend consumed by the trigger checker and the ingest path.
///
/// Each call is expected to be atomic on its own. The "read last check,
/// compute, save check" sequence is not; callers must not run two checks of
/// the same trigger concurrently.
pub trait TriggerStore: Send + Sync {
    /// Returns the last persisted check of a trigger, if any.
    fn get_last_check(&self, trigger_id: &str) -> Result<Option<CheckData>>;

    /// Replaces the persisted check of a trigger.
    fn set_last_check(&self, trigger_id: &str, check: &CheckData) -> Result<()>;

    /// Replaces the persisted check of a trigger and queues the notification
    /// events it produced, all or nothing.
    fn save_check(&self, trigger_id: &str, check: &CheckData, events: &[NotificationEvent]) -> Result<()>;

    /// Appends one raw sample. A sample at an existing timestamp replaces it.
    fn save_metric_value(&self, metric: &str, value: MetricValue) -> Result<()>;

    /// Raw samples of `metric` with `from <= timestamp <= until`, oldest first.
    fn get_metric_values(&self, metric: &str, from: i64, until: i64) -> Result<Vec<MetricValue>>;

    /// Drops every sample of `metric` with `timestamp <= older_than`.
    fn remove_metric_values(&self, metric: &str, older_than: i64) -> Result<()>;

    /// Records that `metric` matched `pattern` on ingest.
    fn add_pattern_metric(&self, pattern: &str, metric: &str) -> Result<()>;

    /// Concrete metric names known to match `pattern`, sorted.
    fn get_pattern_metrics(&self, pattern: &str) -> Result<Vec<String>>;

    /// Forgets the metric index of every given pattern. Metrics still
    /// reporting are re-indexed on their next ingest.
    fn remove_patterns_metrics(&self, patterns: &[String]) -> Result<()>;

    /// Queues a state transition for the notifier.
    fn push_notification_event(&self, event: &NotificationEvent) -> Result<()>;

    /// Drains queued notification events, oldest first.
    fn fetch_notification_events(&self) -> Result<Vec<NotificationEvent>>;
}
