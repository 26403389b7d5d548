//! Domain types shared by every vigil crate: trigger definitions, metric and
//! trigger states, the persisted [`types::CheckData`] snapshot and the
//! [`types::TimeSeries`] produced by target resolution.

pub mod id;
pub mod types;
