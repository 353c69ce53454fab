//! Logging and tracing for databasing
//!
//! Executors receive a [`MessageLogger`] at construction. Messages come from
//! per-module catalogs; trace entry/exit pairs use ids below 1000, failures the
//! 3000s, and observer notifications the 8000s.

pub mod catalog;
pub mod level;
pub mod message_logger;
pub mod subscriber;

pub use catalog::{render, MessageCatalog};
pub use level::LogLevel;
pub use message_logger::{outcome, MessageLogger};
pub use subscriber::init_logging;
