//! Observability utilities.

mod logging;
mod timer;

pub use logging::{init_tracing, LogConfig, LogFormat, LOG_ENV_VAR};
pub use timer::SpanTimer;
