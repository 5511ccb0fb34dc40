//! Observability for the Roster service.
//!
//! # Components
//!
//! - `metrics` - Prometheus metric definitions and recorder setup

pub mod metrics;
