//! databasing: SQL executors with message tracing and observer notification
//!
//! A [`Connector`] describes a PostgreSQL or SQLite target. Executors bound to
//! a connector open one connection per operation, trace entry and exit through
//! an injected [`MessageLogger`], and notify registered observers without
//! waiting on them.

// Lets derive output refer to `databasing::...` from inside this crate.
extern crate self as databasing;

pub mod config;
pub mod connector;
pub mod context;
pub mod error;
pub mod logging;
pub mod observer;
pub mod postgresql;
pub mod sqlexecutor;

// Re-export main types for easier access
pub use config::Config;
pub use connector::{Connector, DatabaseHandle, Driver};
pub use context::{CancelHandle, Context};
pub use databasing_macros::MessageCatalog;
pub use error::{Error, Result};
pub use logging::{LogLevel, MessageLogger};
pub use observer::{ChannelObserver, LoggingObserver, NullObserver, Observer, Subject};
pub use postgresql::{PostgresqlExecutor, Watermark};
pub use sqlexecutor::{ScanSummary, SqlExecutor, SqlExecutorImpl};
