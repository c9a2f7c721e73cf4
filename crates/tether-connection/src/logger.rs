//! Application-facing log sink for connection events

use tracing::{debug, error, info, warn};

/// Receives the connection's diagnostic text.
///
/// `log` carries message tracing output when tracing is switched on.
pub trait Logger: Send + Sync {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn log(&self, message: &str);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn error(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn log(&self, _message: &str) {}
}

/// Forwards to the `tracing` macros, `log` at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, message: &str) {
        error!(target: "tether_connection", "{}", message);
    }

    fn warn(&self, message: &str) {
        warn!(target: "tether_connection", "{}", message);
    }

    fn info(&self, message: &str) {
        info!(target: "tether_connection", "{}", message);
    }

    fn log(&self, message: &str) {
        debug!(target: "tether_connection", "{}", message);
    }
}
