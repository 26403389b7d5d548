//! Trigger evaluation engine.
//!
//! A [`checker::TriggerChecker`] resolves a trigger's targets into time series
//! ([`timeseries`]), steps every metric through the trigger's rule
//! ([`expression`]) from its last checkpoint, applies the trigger's TTL policy,
//! and persists the resulting [`CheckData`](vigil_common::types::CheckData)
//! with a severity [`score`].

pub mod checker;
pub mod error;
pub mod expression;
pub mod metrics;
pub mod score;
pub mod timeseries;

#[cfg(test)]
mod tests;
