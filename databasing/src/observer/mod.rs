//! Observer notification
//!
//! Executors tell registered observers about the operations they perform.
//! Delivery is fire-and-forget: every notification is handed to each observer
//! on its own detached task.

pub mod notification;
pub mod subject;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::context::Context;
use crate::error::{Error, Result};

pub use notification::Notification;
pub use subject::Subject;

/// An external subscriber identified by a stable id
#[async_trait]
pub trait Observer: Send + Sync {
    /// Stable key for registry membership and payload labeling
    fn observer_id(&self, ctx: &Context) -> String;

    /// Receive one serialized notification
    async fn update_observer(&self, ctx: &Context, message: &str) -> Result<()>;
}

/// Observer that discards everything it receives
#[derive(Debug, Clone)]
pub struct NullObserver {
    pub id: String,
}

impl NullObserver {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl Observer for NullObserver {
    fn observer_id(&self, _ctx: &Context) -> String {
        self.id.clone()
    }

    async fn update_observer(&self, _ctx: &Context, _message: &str) -> Result<()> {
        Ok(())
    }
}

/// Observer that writes every notification to the log
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    id: String,
}

impl LoggingObserver {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new(format!("observer-{}", uuid::Uuid::new_v4()))
    }
}

#[async_trait]
impl Observer for LoggingObserver {
    fn observer_id(&self, _ctx: &Context) -> String {
        self.id.clone()
    }

    async fn update_observer(&self, _ctx: &Context, message: &str) -> Result<()> {
        tracing::info!(observer_id = %self.id, notification = message, "Observer notified");
        Ok(())
    }
}

/// Observer that forwards notifications into a channel.
///
/// Once the observer has been unregistered and every other clone dropped, the
/// receiver yields `None` after the last in-flight delivery, which lets
/// callers wait for notification quiescence.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    id: String,
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelObserver {
    pub fn new(id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                id: id.into(),
                sender,
            },
            receiver,
        )
    }
}

#[async_trait]
impl Observer for ChannelObserver {
    fn observer_id(&self, _ctx: &Context) -> String {
        self.id.clone()
    }

    async fn update_observer(&self, _ctx: &Context, message: &str) -> Result<()> {
        self.sender
            .send(message.to_string())
            .map_err(|_| Error::Delivery(format!("receiver for {} is closed", self.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_observer_forwards_messages() {
        let ctx = Context::background();
        let (observer, mut receiver) = ChannelObserver::new("Observer 1");

        observer.update_observer(&ctx, "hello").await.unwrap();
        assert_eq!(receiver.recv().await.as_deref(), Some("hello"));
        assert_eq!(observer.observer_id(&ctx), "Observer 1");
    }

    #[tokio::test]
    async fn channel_observer_reports_closed_receiver() {
        let ctx = Context::background();
        let (observer, receiver) = ChannelObserver::new("Observer 1");
        drop(receiver);

        let result = observer.update_observer(&ctx, "hello").await;
        assert!(matches!(result, Err(Error::Delivery(_))));
    }

    #[test]
    fn default_logging_observers_have_distinct_ids() {
        let ctx = Context::background();
        let first = LoggingObserver::default();
        let second = LoggingObserver::default();
        assert_ne!(first.observer_id(&ctx), second.observer_id(&ctx));
    }
}
