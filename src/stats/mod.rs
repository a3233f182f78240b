//! Runtime counters

pub mod metrics;

pub use metrics::{ClientStats, ServerStats};
