//! PostgreSQL helpers
//!
//! [`PostgresqlExecutor`] reports the transaction-id watermark: the eligible
//! relation whose frozen transaction id is oldest.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use databasing_macros::MessageCatalog;

use crate::connector::{Connector, DatabaseHandle};
use crate::context::Context;
use crate::error::Result;
use crate::logging::{outcome, LogLevel, MessageCatalog, MessageLogger};
use crate::observer::{Notification, Observer, Subject};

/// Identifier of this component in log codes and notifications
pub const PRODUCT_ID: u32 = 6423;

/// Oldest relation by `age(relfrozenxid)`, skipping the `pg_toast` namespace
pub const WATERMARK_SQL: &str = "SELECT c.oid::regclass::text, age(c.relfrozenxid)::bigint, \
    pg_size_pretty(pg_total_relation_size(c.oid)) \
    FROM pg_class c JOIN pg_namespace n ON c.relnamespace = n.oid \
    WHERE relkind IN ('r', 't', 'm') AND n.nspname NOT IN ('pg_toast') \
    ORDER BY 2 DESC LIMIT 1";

/// Messages emitted by [`PostgresqlExecutor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, MessageCatalog)]
pub enum Message {
    #[message(id = 1, text = "Enter GetCurrentWatermark().")]
    EnterGetCurrentWatermark,
    #[message(id = 2, text = "Exit  GetCurrentWatermark() returned ({}, {}, {}).")]
    ExitGetCurrentWatermark,
    #[message(id = 3, text = "Enter RegisterObserver({}).")]
    EnterRegisterObserver,
    #[message(id = 4, text = "Exit  RegisterObserver({}) returned ({}).")]
    ExitRegisterObserver,
    #[message(id = 5, text = "Enter SetLogLevel({}).")]
    EnterSetLogLevel,
    #[message(id = 6, text = "Exit  SetLogLevel({}) returned ({}).")]
    ExitSetLogLevel,
    #[message(id = 7, text = "Enter UnregisterObserver({}).")]
    EnterUnregisterObserver,
    #[message(id = 8, text = "Exit  UnregisterObserver({}) returned ({}).")]
    ExitUnregisterObserver,
    #[message(id = 8001, text = "GetCurrentWatermark")]
    GetCurrentWatermark,
    #[message(id = 8002, text = "RegisterObserver")]
    RegisterObserver,
    #[message(id = 8003, text = "SetLogLevel")]
    SetLogLevel,
    #[message(id = 8004, text = "UnregisterObserver")]
    UnregisterObserver,
}

/// The most stale eligible relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    /// Relation name as rendered by `regclass`
    pub oid: String,
    /// Transaction-id age of the relation
    pub age: i64,
    /// Human-readable total relation size
    pub size: String,
}

/// Watermark reader bound to one connector
#[derive(Debug)]
pub struct PostgresqlExecutor {
    connector: Connector,
    logger: MessageLogger,
    observers: Subject,
}

impl PostgresqlExecutor {
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

    /// Find the relation with the oldest frozen transaction id.
    ///
    /// Opens one connection, pings it, runs [`WATERMARK_SQL`] and closes the
    /// connection whatever the outcome. No eligible relation surfaces as a
    /// "row not found" database error.
    pub async fn get_current_watermark(&self, ctx: &Context) -> Result<Watermark> {
        if self.logger.is_trace() {
            self.logger.trace_entry(Message::EnterGetCurrentWatermark, &[]);
        }
        let entry_time = Instant::now();

        let result = match self.connector.connect(ctx).await {
            Ok(mut handle) => {
                let queried = Self::query_watermark(ctx, &mut handle).await;
                if let Err(error) = handle.close().await {
                    tracing::warn!(error = %error, "Failed to close watermark connection");
                }
                queried
            }
            Err(error) => Err(error),
        };

        if let Ok(watermark) = &result {
            self.observers.notify(
                ctx,
                Notification::new(PRODUCT_ID, Message::GetCurrentWatermark.id())
                    .detail("oid", &watermark.oid)
                    .detail("age", watermark.age),
            );
        }

        if self.logger.is_trace() {
            let (oid, age) = match &result {
                Ok(watermark) => (watermark.oid.as_str(), watermark.age),
                Err(_) => ("", 0),
            };
            self.logger.trace_exit(
                Message::ExitGetCurrentWatermark,
                &[&oid, &age, &outcome(&result)],
                entry_time.elapsed(),
            );
        }
        result
    }

    async fn query_watermark(ctx: &Context, handle: &mut DatabaseHandle) -> Result<Watermark> {
        handle.ping(ctx).await?;
        let (oid, age, size): (String, i64, String) = handle.fetch_one(ctx, WATERMARK_SQL).await?;
        Ok(Watermark { oid, age, size })
    }

    /// Add an observer and tell every observer about it
    pub async fn register_observer(
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

    /// Change the log threshold; tracing is on exactly at [`LogLevel::Trace`]
    pub async fn set_log_level(&mut self, ctx: &Context, level: LogLevel) -> Result<()> {
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

    /// Notify every observer, the departing one included, then remove it
    pub async fn unregister_observer(&mut self, ctx: &Context, observer: &dyn Observer) -> Result<()> {
        let observer_id = observer.observer_id(ctx);
        if self.logger.is_trace() {
            self.logger
                .trace_entry(Message::EnterUnregisterObserver, &[&observer_id]);
        }
        let entry_time = Instant::now();

        // Delivery tasks hold their own references, so clearing the
        // registry below cannot cut this notification short.
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
