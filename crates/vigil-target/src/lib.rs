//! Target resolution: turns a trigger target into named time series.
//!
//! The checker only depends on the [`TargetResolver`] trait. The bundled
//! [`pattern::PatternResolver`] understands plain metric glob patterns such as
//! `servers.*.cpu.user`; any function call in a target is reported as
//! [`TargetError::UnknownFunction`].

pub mod pattern;


use vigil_common::types::TimeSeries;
use vigil_storage::error::StorageError;

/// Errors returned while resolving a target.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// The target calls a function the resolver does not provide. This is a
    /// trigger misconfiguration, not a system fault.
    #[error("Unknown graphite function: \"{0}\"")]
    UnknownFunction(String),

    /// The target cannot be parsed at all.
    #[error("Invalid target \"{target}\": {reason}")]
    InvalidTarget { target: String, reason: String },

    /// The store failed while reading metric data.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Convenience `Result` alias for target resolution.
pub type Result<T> = std::result::Result<T, TargetError>;

/// Series and concrete metric names produced by one target.
#[derive(Debug, Clone, Default)]
pub struct TargetResult {
    pub series: Vec<TimeSeries>,
    /// Every concrete metric the target matched, whether or not it produced
    /// samples in the window.
    pub metrics: Vec<String>,
}

/// Resolves a target query over a time window.
pub trait TargetResolver: Send + Sync {
    /// Evaluates `target` over `[from, until]`. With `allow_realtime` unset,
    /// the sample of the step that is still open at `until` is dropped.
    fn evaluate_target(&self, target: &str, from: i64, until: i64, allow_realtime: bool) -> Result<TargetResult>;
}

/// Returns true if `metric` matches the glob `pattern`.
///
/// # Examples
///
/// ```
/// use vigil_target::matches_pattern;
///
/// assert!(matches_pattern("servers.*.cpu", "servers.web-01.cpu"));
/// assert!(matches_pattern("*", "anything"));
/// assert!(!matches_pattern("servers.*.cpu", "servers.web-01.mem"));
/// ```
pub fn matches_pattern(pattern: &str, metric: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    glob_match::glob_match(pattern, metric)
}
