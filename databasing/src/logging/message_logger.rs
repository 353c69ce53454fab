//! Message logger
//!
//! Renders catalog messages and emits them as `tracing` events, filtered by a
//! per-executor threshold that can be changed at runtime.

use std::fmt::Display;
use std::time::Duration;

use crate::error::Result;
use crate::logging::catalog::{render, MessageCatalog};
use crate::logging::level::LogLevel;

/// Emit a `tracing` event at a level only known at runtime
macro_rules! emit {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            tracing::Level::ERROR => tracing::error!($($arg)+),
            tracing::Level::WARN => tracing::warn!($($arg)+),
            tracing::Level::INFO => tracing::info!($($arg)+),
            tracing::Level::DEBUG => tracing::debug!($($arg)+),
            tracing::Level::TRACE => tracing::trace!($($arg)+),
        }
    };
}

/// Short text for an operation's outcome in exit traces
pub fn outcome<T>(result: &Result<T>) -> String {
    match result {
        Ok(_) => "ok".to_string(),
        Err(error) => error.to_string(),
    }
}

/// Leveled logger for one executor
#[derive(Debug, Clone)]
pub struct MessageLogger {
    product_id: u32,
    level: LogLevel,
}

impl MessageLogger {
    pub fn new(product_id: u32, level: LogLevel) -> Self {
        Self { product_id, level }
    }

    pub fn product_id(&self) -> u32 {
        self.product_id
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.level = level;
    }

    /// True exactly when the threshold is the most verbose tier
    pub fn is_trace(&self) -> bool {
        self.level == LogLevel::Trace
    }

    /// Whether a message of this id passes the threshold
    pub fn is_enabled(&self, message_id: u32) -> bool {
        LogLevel::for_message_id(message_id) >= self.level
    }

    /// Stable code for a message, e.g. `databasing-64220003`
    pub fn code(&self, message_id: u32) -> String {
        format!("databasing-{:04}{:04}", self.product_id, message_id)
    }

    /// Log a catalog message; its level follows from its id
    pub fn log<M: MessageCatalog>(&self, message: M, details: &[&dyn Display]) {
        self.emit(message, details, None);
    }

    /// Record entry into an operation
    pub fn trace_entry<M: MessageCatalog>(&self, message: M, details: &[&dyn Display]) {
        self.emit(message, details, None);
    }

    /// Record exit from an operation along with how long it took
    pub fn trace_exit<M: MessageCatalog>(
        &self,
        message: M,
        details: &[&dyn Display],
        elapsed: Duration,
    ) {
        self.emit(message, details, Some(elapsed));
    }

    fn emit<M: MessageCatalog>(&self, message: M, details: &[&dyn Display], elapsed: Option<Duration>) {
        let message_id = message.id();
        if !self.is_enabled(message_id) {
            return;
        }

        let level = LogLevel::for_message_id(message_id);
        let code = self.code(message_id);
        let text = render(message.template(), details);
        let details = details
            .iter()
            .map(|detail| detail.to_string())
            .collect::<Vec<_>>()
            .join("|");
        let elapsed_ns = elapsed.map(|elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX));

        emit!(
            level.as_tracing_level(),
            code = %code,
            message_id,
            severity = level.as_str(),
            details = %details,
            elapsed_ns,
            "{}",
            text
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use databasing_macros::MessageCatalog;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, MessageCatalog)]
    enum Sample {
        #[message(id = 1, text = "Enter Sample({}).")]
        Enter,
        #[message(id = 3001, text = "Sample failed on line {}.")]
        Failed,
    }

    #[test]
    fn trace_flag_follows_level() {
        let mut logger = MessageLogger::new(6422, LogLevel::Info);
        assert!(!logger.is_trace());

        logger.set_level(LogLevel::Trace);
        assert!(logger.is_trace());

        logger.set_level(LogLevel::Debug);
        assert!(!logger.is_trace());
    }

    #[test]
    fn threshold_filters_by_message_id() {
        let logger = MessageLogger::new(6422, LogLevel::Warn);
        assert!(!logger.is_enabled(Sample::Enter.id()));
        assert!(logger.is_enabled(Sample::Failed.id()));
    }

    #[test]
    fn outcome_describes_results() {
        assert_eq!(outcome(&Ok::<(), _>(())), "ok");
        assert_eq!(
            outcome::<()>(&Err(crate::error::Error::Cancelled)),
            "Context cancelled"
        );
    }

    #[test]
    fn codes_are_zero_padded() {
        let logger = MessageLogger::new(6422, LogLevel::Info);
        assert_eq!(logger.code(3), "databasing-64220003");
        assert_eq!(logger.code(8001), "databasing-64228001");
    }

    #[test]
    fn derived_catalog_resolves_ids() {
        assert_eq!(Sample::from_id(1), Some(Sample::Enter));
        assert_eq!(Sample::from_id(2), None);
        assert_eq!(Sample::Failed.template(), "Sample failed on line {}.");
    }
}
