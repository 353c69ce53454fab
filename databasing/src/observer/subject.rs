//! Observer registry
//!
//! A [`Subject`] is either absent or holds a non-empty, insertion-ordered set
//! of observers keyed by observer id. It becomes absent again the moment its
//! last observer is removed.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::observer::notification::Notification;
use crate::observer::Observer;

/// Non-empty set of observers. Only [`Subject`] creates and empties it.
struct ObserverRegistry {
    observers: IndexMap<String, Arc<dyn Observer>>,
}

impl ObserverRegistry {
    fn with_observer(id: String, observer: Arc<dyn Observer>) -> Self {
        let mut observers = IndexMap::new();
        observers.insert(id, observer);
        Self { observers }
    }

    fn notify_observers(&self, ctx: &Context, message: &str) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("No async runtime available; observer notification dropped");
                return;
            }
        };

        for (id, observer) in &self.observers {
            let id = id.clone();
            let observer = Arc::clone(observer);
            let ctx = ctx.clone();
            let message = message.to_string();

            runtime.spawn(async move {
                if let Err(error) = observer.update_observer(&ctx, &message).await {
                    tracing::warn!(observer_id = %id, error = %error, "Observer delivery failed");
                }
            });
        }
    }
}

/// Optional observer registry owned by an executor
#[derive(Default)]
pub struct Subject {
    registry: Option<ObserverRegistry>,
}

impl Subject {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if and only if at least one observer is registered
    pub fn has_observers(&self) -> bool {
        self.registry.is_some()
    }

    pub fn len(&self) -> usize {
        self.registry
            .as_ref()
            .map_or(0, |registry| registry.observers.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered observer ids in registration order
    pub fn observer_ids(&self) -> Vec<String> {
        self.registry
            .as_ref()
            .map(|registry| registry.observers.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Add an observer, creating the registry if needed.
    ///
    /// Returns false when an observer with the same id was already present; the
    /// registry is left as it was in that case.
    pub fn register_observer(&mut self, ctx: &Context, observer: Arc<dyn Observer>) -> bool {
        let id = observer.observer_id(ctx);
        if let Some(registry) = self.registry.as_mut() {
            if registry.observers.contains_key(&id) {
                return false;
            }
            registry.observers.insert(id, observer);
            return true;
        }
        self.registry = Some(ObserverRegistry::with_observer(id, observer));
        true
    }

    /// Remove an observer, clearing the registry if it was the last one.
    ///
    /// Unknown observers leave the registry unchanged and yield
    /// [`Error::ObserverNotFound`].
    pub fn unregister_observer(&mut self, observer_id: &str) -> Result<()> {
        let registry = self
            .registry
            .as_mut()
            .ok_or_else(|| Error::ObserverNotFound(observer_id.to_string()))?;

        if registry.observers.shift_remove(observer_id).is_none() {
            return Err(Error::ObserverNotFound(observer_id.to_string()));
        }

        if registry.observers.is_empty() {
            self.registry = None;
        }
        Ok(())
    }

    /// Hand a raw message to every observer on its own detached task
    pub fn notify_observers(&self, ctx: &Context, message: &str) {
        if let Some(registry) = &self.registry {
            registry.notify_observers(ctx, message);
        }
    }

    /// Serialize and dispatch a notification; serialization failures are only logged
    pub fn notify(&self, ctx: &Context, notification: Notification) {
        if !self.has_observers() {
            return;
        }
        match notification.to_json() {
            Ok(message) => self.notify_observers(ctx, &message),
            Err(error) => tracing::error!(
                message_id = notification.message_id(),
                error = %error,
                "Failed to serialize observer notification"
            ),
        }
    }
}

impl std::fmt::Debug for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subject")
            .field("observers", &self.observer_ids())
            .finish()
    }
}
