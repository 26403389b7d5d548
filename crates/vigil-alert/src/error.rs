use crate::expression::ExpressionError;
use vigil_storage::error::StorageError;
use vigil_target::TargetError;

/// Why a trigger check did not complete normally.
///
/// `NoMetrics`, `OnlyWildcards` and unknown functions are soft: the check still
/// persists a [`CheckData`](vigil_common::types::CheckData). `InvalidTarget` and
/// `Storage` are hard and abort the cycle with nothing persisted.
///
/// # Examples
///
/// ```
/// use vigil_alert::error::CheckError;
///
/// assert!(!CheckError::NoMetrics.is_hard());
/// assert!(CheckError::InvalidTarget("Target #2 has more than one timeseries".into()).is_hard());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("Trigger has no metrics")]
    NoMetrics,

    #[error("Trigger has only wildcards")]
    OnlyWildcards,

    /// An additional target resolved to an unusable number of series.
    #[error("{0}")]
    InvalidTarget(String),

    #[error(transparent)]
    Target(TargetError),

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<TargetError> for CheckError {
    fn from(err: TargetError) -> Self {
        match err {
            TargetError::Storage(err) => CheckError::Storage(err),
            other => CheckError::Target(other),
        }
    }
}

impl CheckError {
    /// The trigger references a function that does not exist, either in a
    /// target or in its expression.
    pub fn is_unknown_function(&self) -> bool {
        matches!(
            self,
            CheckError::Target(TargetError::UnknownFunction(_))
                | CheckError::Expression(ExpressionError::UnknownFunction(_))
        )
    }

    /// Errors that abort the check instead of being folded into its state.
    pub fn is_hard(&self) -> bool {
        matches!(self, CheckError::InvalidTarget(_) | CheckError::Storage(_))
    }
}

/// Convenience `Result` alias for checker operations.
pub type Result<T> = std::result::Result<T, CheckError>;
