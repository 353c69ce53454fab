//! SQL executor interface
//!
//! The capability every statement-running component offers: feed it a file or
//! a line source of SQL and manage its observers and log level.

pub mod executor;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncBufRead;

use databasing_macros::MessageCatalog;

use crate::context::Context;
use crate::error::Result;
use crate::logging::LogLevel;
use crate::observer::Observer;

pub use executor::{ScanSummary, SqlExecutorImpl};

/// Identifier of this component in log codes and notifications
pub const PRODUCT_ID: u32 = 6422;

/// Generic contract for components that execute SQL
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Execute every statement in a file
    async fn process_file_name(&self, ctx: &Context, filename: &Path) -> Result<()>;

    /// Execute every statement produced by a line source
    async fn process_scanner(
        &self,
        ctx: &Context,
        scanner: &mut (dyn AsyncBufRead + Unpin + Send),
    ) -> Result<()>;

    async fn register_observer(&mut self, ctx: &Context, observer: Arc<dyn Observer>)
        -> Result<()>;

    async fn set_log_level(&mut self, ctx: &Context, level: LogLevel) -> Result<()>;

    async fn unregister_observer(&mut self, ctx: &Context, observer: &dyn Observer)
        -> Result<()>;
}

/// Messages emitted by [`SqlExecutorImpl`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, MessageCatalog)]
pub enum Message {
    #[message(id = 1, text = "Enter ProcessFileName({}).")]
    EnterProcessFileName,
    #[message(id = 2, text = "Exit  ProcessFileName({}) returned ({}).")]
    ExitProcessFileName,
    #[message(id = 3, text = "Enter ProcessScanner().")]
    EnterProcessScanner,
    #[message(id = 4, text = "Exit  ProcessScanner() processed {} lines having {} failures. ({}).")]
    ExitProcessScanner,
    #[message(id = 5, text = "Enter RegisterObserver({}).")]
    EnterRegisterObserver,
    #[message(id = 6, text = "Exit  RegisterObserver({}) returned ({}).")]
    ExitRegisterObserver,
    #[message(id = 7, text = "Enter SetLogLevel({}).")]
    EnterSetLogLevel,
    #[message(id = 8, text = "Exit  SetLogLevel({}) returned ({}).")]
    ExitSetLogLevel,
    #[message(id = 9, text = "Enter UnregisterObserver({}).")]
    EnterUnregisterObserver,
    #[message(id = 10, text = "Exit  UnregisterObserver({}) returned ({}).")]
    ExitUnregisterObserver,
    #[message(id = 1001, text = "Executing line {}: {}")]
    ExecutingLine,
    #[message(id = 3001, text = "SQL.Exec failure number {} on line {}. Error: {}")]
    ExecFailure,
    #[message(id = 8001, text = "ProcessFileName")]
    ProcessFileName,
    #[message(id = 8002, text = "ProcessScanner.Exec")]
    ProcessScannerExec,
    #[message(id = 8003, text = "ProcessScanner")]
    ProcessScanner,
    #[message(id = 8004, text = "RegisterObserver")]
    RegisterObserver,
    #[message(id = 8005, text = "SetLogLevel")]
    SetLogLevel,
    #[message(id = 8006, text = "UnregisterObserver")]
    UnregisterObserver,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MessageCatalog;
    use rstest::rstest;

    #[rstest]
    #[case(1, Message::EnterProcessFileName)]
    #[case(4, Message::ExitProcessScanner)]
    #[case(3001, Message::ExecFailure)]
    #[case(8006, Message::UnregisterObserver)]
    fn ids_resolve_to_messages(#[case] id: u32, #[case] expected: Message) {
        assert_eq!(Message::from_id(id), Some(expected));
        assert_eq!(expected.id(), id);
    }

    #[test]
    fn unknown_ids_resolve_to_nothing() {
        assert_eq!(Message::from_id(2000), None);
        assert_eq!(Message::from_id(8007), None);
    }
}
