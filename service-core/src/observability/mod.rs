pub mod logging;

pub use logging::{TracingConfig, init_tracing};
