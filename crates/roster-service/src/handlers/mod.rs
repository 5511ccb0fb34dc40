//! HTTP request handlers.
//!
//! # Components
//!
//! - `person` - person CRUD endpoints
//! - `health` - dependency health endpoint
//! - `metrics` - Prometheus exposition endpoint

pub mod health;
pub mod metrics;
pub mod person;

pub use health::health_check;
pub use metrics::metrics_handler;
pub use person::{create_person, delete_person, get_person, list_people, update_person};
