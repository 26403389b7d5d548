//! Trigger checker service.
//!
//! Wires a [`SqliteStore`](vigil_storage::engine::SqliteStore), a
//! [`PatternResolver`](vigil_target::pattern::PatternResolver) and the checker
//! together: [`scheduler::TriggerScheduler`] checks every configured trigger
//! on a fixed tick, and [`ingest`] feeds Graphite plaintext metric lines into
//! the store.

pub mod config;
pub mod ingest;
pub mod scheduler;
