//! Cancellation and deadlines for database operations
//!
//! Every operation takes a [`Context`]. Driver calls that may block (connect,
//! ping, query) are raced against the context so that a cancelled or expired
//! context aborts the call promptly.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{Error, Result};

/// Lifecycle control passed to every operation
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    /// Own signal last, inherited signals before it
    cancel: Vec<watch::Receiver<bool>>,
}

/// Cancels every [`Context`] derived from the one that created it
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers may all be gone already; nothing to cancel then.
        let _ = self.sender.send(true);
    }
}

impl Context {
    /// A context that never expires and cannot be cancelled
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().with_deadline(Instant::now() + timeout)
    }

    /// Set the deadline, keeping the earlier one if a deadline already exists
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Attach a cancel signal and return the handle that fires it.
    ///
    /// Signals inherited from `self` keep applying to the new context.
    pub fn with_cancel(mut self) -> (Self, CancelHandle) {
        let (sender, receiver) = watch::channel(false);
        self.cancel.push(receiver);
        (self, CancelHandle { sender })
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The error this context is done with, if it is done
    pub fn err(&self) -> Option<Error> {
        if self.cancel.iter().any(|cancel| *cancel.borrow()) {
            return Some(Error::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Error::DeadlineExceeded),
            _ => None,
        }
    }

    /// Run `work` until it completes or the context is done, whichever is first
    pub async fn run<F, T>(&self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if let Some(error) = self.err() {
            return Err(error);
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        let cancelled = async {
            let mut receivers = self.cancel.clone();
            loop {
                if receivers
                    .iter_mut()
                    .any(|receiver| *receiver.borrow_and_update())
                {
                    break;
                }
                if receivers.is_empty() {
                    std::future::pending::<()>().await;
                }

                let changes = receivers
                    .iter_mut()
                    .map(|receiver| Box::pin(receiver.changed()));
                let (changed, index, pending) = futures::future::select_all(changes).await;
                drop(pending);
                if changed.is_err() {
                    // Handle dropped without cancelling.
                    receivers.swap_remove(index);
                }
            }
        };

        tokio::select! {
            result = work => result,
            _ = deadline => Err(Error::DeadlineExceeded),
            _ = cancelled => Err(Error::Cancelled),
        }
    }
}
