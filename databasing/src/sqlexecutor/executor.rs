//! Line-oriented SQL executor
//!
//! Runs each statement line of a file or reader against one connection,
//! counting failures instead of stopping at the first one.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::connector::{Connector, DatabaseHandle};
use crate::context::Context;
use crate::error::Result;
use crate::logging::{outcome, LogLevel, MessageCatalog, MessageLogger};
use crate::observer::{Notification, Observer, Subject};
use crate::sqlexecutor::{Message, SqlExecutor, PRODUCT_ID};

/// Counts from one pass over a statement source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Statements executed, excluding blank and comment lines
    pub lines: u64,
    pub failures: u64,
}

/// Default implementation of [`SqlExecutor`]
#[derive(Debug)]
pub struct SqlExecutorImpl {
    connector: Connector,
    logger: MessageLogger,
    observers: Subject,
}

impl SqlExecutorImpl {
    pub fn new(connector: Connector, logger: MessageLogger) -> Self {
        Self {
            connector,
            logger,
            observers: Subject::new(),
        }
    }

    /// Executor with the default logger for this component
    pub fn with_connector(connector: Connector) -> Self {
        Self::new(connector, MessageLogger::new(PRODUCT_ID, LogLevel::default()))
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    pub fn log_level(&self) -> LogLevel {
        self.logger.level()
    }

    pub fn has_observers(&self) -> bool {
        self.observers.has_observers()
    }

    /// Execute every statement from `scanner` and report what happened
    pub async fn scan(
        &self,
        ctx: &Context,
        scanner: &mut (dyn AsyncBufRead + Unpin + Send),
    ) -> Result<ScanSummary> {
        let mut handle = self.connector.connect(ctx).await?;
        let executed = self.execute_lines(ctx, &mut handle, scanner).await;
        let closed = handle.close().await;

        let summary = executed?;
        closed?;
        Ok(summary)
    }

    /// Execute every statement line of a file.
    ///
    /// The file goes through the same traces and notifications as
    /// [`SqlExecutor::process_scanner`] before the file itself is reported.
    pub async fn process_file(&self, ctx: &Context, filename: &Path) -> Result<ScanSummary> {
        if self.logger.is_trace() {
            self.logger
                .trace_entry(Message::EnterProcessFileName, &[&filename.display()]);
        }
        let entry_time = Instant::now();

        let result = async {
            let file = tokio::fs::File::open(filename).await?;
            let mut reader = BufReader::new(file);
            self.scan_reporting(ctx, &mut reader).await
        }
        .await;

        let mut notification = Notification::new(PRODUCT_ID, Message::ProcessFileName.id())
            .detail("filename", filename.display());
        if let Ok(summary) = &result {
            notification = notification
                .detail("lines", summary.lines)
                .detail("failures", summary.failures);
        }
        self.observers.notify(
            ctx,
            notification.error(result.as_ref().err().map(|e| e as &dyn std::fmt::Display)),
        );

        if self.logger.is_trace() {
            self.logger.trace_exit(
                Message::ExitProcessFileName,
                &[&filename.display(), &outcome(&result)],
                entry_time.elapsed(),
            );
        }
        result
    }

    /// Scan with entry/exit traces and a summary notification
    async fn scan_reporting(
        &self,
        ctx: &Context,
        scanner: &mut (dyn AsyncBufRead + Unpin + Send),
    ) -> Result<ScanSummary> {
        if self.logger.is_trace() {
            self.logger.trace_entry(Message::EnterProcessScanner, &[]);
        }
        let entry_time = Instant::now();

        let result = self.scan(ctx, scanner).await;
        let summary = result.as_ref().copied().unwrap_or_default();

        self.observers.notify(
            ctx,
            Notification::new(PRODUCT_ID, Message::ProcessScanner.id())
                .detail("lines", summary.lines)
                .detail("failures", summary.failures)
                .error(result.as_ref().err().map(|e| e as &dyn std::fmt::Display)),
        );

        if self.logger.is_trace() {
            self.logger.trace_exit(
                Message::ExitProcessScanner,
                &[&summary.lines, &summary.failures, &outcome(&result)],
                entry_time.elapsed(),
            );
        }
        result
    }

    async fn execute_lines(
        &self,
        ctx: &Context,
        handle: &mut DatabaseHandle,
        scanner: &mut (dyn AsyncBufRead + Unpin + Send),
    ) -> Result<ScanSummary> {
        let mut lines = scanner.lines();
        let mut summary = ScanSummary::default();
        let mut line_number: u64 = 0;

        while let Some(line) = ctx.run(async { Ok(lines.next_line().await?) }).await? {
            line_number += 1;
            let statement = line.trim();
            if statement.is_empty() || statement.starts_with("--") {
                continue;
            }

            summary.lines += 1;
            self.logger
                .log(Message::ExecutingLine, &[&line_number, &statement]);

            if let Err(error) = handle.execute(ctx, statement).await {
                if error.is_context_error() {
                    return Err(error);
                }
                summary.failures += 1;
                self.logger.log(
                    Message::ExecFailure,
                    &[&summary.failures, &line_number, &error],
                );
                self.observers.notify(
                    ctx,
                    Notification::new(PRODUCT_ID, Message::ProcessScannerExec.id())
                        .detail("line", line_number)
                        .detail("failures", summary.failures)
                        .error(Some(&error)),
                );
            }
        }

        Ok(summary)
    }
}

#[async_trait]
impl SqlExecutor for SqlExecutorImpl {
    async fn process_file_name(&self, ctx: &Context, filename: &Path) -> Result<()> {
        self.process_file(ctx, filename).await.map(|_| ())
    }

    async fn process_scanner(
        &self,
        ctx: &Context,
        scanner: &mut (dyn AsyncBufRead + Unpin + Send),
    ) -> Result<()> {
        self.scan_reporting(ctx, scanner).await.map(|_| ())
    }

    async fn register_observer(
        &mut self,
        ctx: &Context,
        observer: Arc<dyn Observer>,
    ) -> Result<()> {
        let observer_id = observer.observer_id(ctx);
        if self.logger.is_trace() {
            self.logger
                .trace_entry(Message::EnterRegisterObserver, &[&observer_id]);
        }
        let entry_time = Instant::now();

        self.observers.register_observer(ctx, observer);
        self.observers.notify(
            ctx,
            Notification::new(PRODUCT_ID, Message::RegisterObserver.id())
                .detail("observerID", &observer_id),
        );

        if self.logger.is_trace() {
            self.logger.trace_exit(
                Message::ExitRegisterObserver,
                &[&observer_id, &"ok"],
                entry_time.elapsed(),
            );
        }
        Ok(())
    }

    async fn set_log_level(&mut self, ctx: &Context, level: LogLevel) -> Result<()> {
        if self.logger.is_trace() {
            self.logger.trace_entry(Message::EnterSetLogLevel, &[&level]);
        }
        let entry_time = Instant::now();

        self.logger.set_level(level);
        self.observers.notify(
            ctx,
            Notification::new(PRODUCT_ID, Message::SetLogLevel.id()).detail("logLevel", level),
        );

        if self.logger.is_trace() {
            self.logger.trace_exit(
                Message::ExitSetLogLevel,
                &[&level, &"ok"],
                entry_time.elapsed(),
            );
        }
        Ok(())
    }

    async fn unregister_observer(&mut self, ctx: &Context, observer: &dyn Observer) -> Result<()> {
        let observer_id = observer.observer_id(ctx);
        if self.logger.is_trace() {
            self.logger
                .trace_entry(Message::EnterUnregisterObserver, &[&observer_id]);
        }
        let entry_time = Instant::now();

        // Dispatch before removal so the departing observer is notified too.
        self.observers.notify(
            ctx,
            Notification::new(PRODUCT_ID, Message::UnregisterObserver.id())
                .detail("observerID", &observer_id),
        );
        let result = self.observers.unregister_observer(&observer_id);

        if self.logger.is_trace() {
            self.logger.trace_exit(
                Message::ExitUnregisterObserver,
                &[&observer_id, &outcome(&result)],
                entry_time.elapsed(),
            );
        }
        result
    }
}
