//! HTTP handlers for the NER service.

pub mod entities;
pub mod health;
pub mod metrics;

pub use entities::extract_entities;
pub use health::{health_check, not_found, readiness_check};
pub use metrics::metrics_endpoint;
