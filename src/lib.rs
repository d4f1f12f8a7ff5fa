//! Library crate for tls-latency-rank exposing reusable modules.
pub mod error;
pub mod input;
pub mod limiter;
pub mod prober;
pub mod progress;
pub mod report;
pub mod scheduler;
pub mod types;
