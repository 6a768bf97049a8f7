//! Common utilities and helpers

pub mod logging;
pub mod time;

pub use logging::{LogFormat, LogLevel, LoggingConfig, LoggingSystem, ProgressReporter};
pub use time::format_clock;
