use alloc::boxed::Box;
use axerrno::AxResult;

use crate::types::{RemoteId, TypeKey};

/// A hook fired when interest in a `(remote, type)` pair appears or disappears.
pub type SubscriptionAction = Box<dyn Fn(RemoteId, &TypeKey) -> AxResult + Send + Sync>;

/// Configuration of a [`NotificationManager`](crate::NotificationManager).
///
/// Both actions are optional; a missing action behaves as one that always succeeds.
#[derive(Default)]
pub struct ManagerConfig {
    /// Fired once when the first listener for a `(remote, type)` pair is added.
    pub subscribe: Option<SubscriptionAction>,
    /// Fired once when the last listener for a `(remote, type)` pair is removed.
    pub unsubscribe: Option<SubscriptionAction>,
}

impl ManagerConfig {
    /// Creates a configuration without hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subscribe action.
    pub fn with_subscribe<F>(mut self, action: F) -> Self
    where
        F: Fn(RemoteId, &TypeKey) -> AxResult + Send + Sync + 'static,
    {
        self.subscribe = Some(Box::new(action));
        self
    }

    /// Sets the unsubscribe action.
    pub fn with_unsubscribe<F>(mut self, action: F) -> Self
    where
        F: Fn(RemoteId, &TypeKey) -> AxResult + Send + Sync + 'static,
    {
        self.unsubscribe = Some(Box::new(action));
        self
    }

    pub(crate) fn subscribe(&self, remote_id: RemoteId, key: &TypeKey) -> AxResult {
        match &self.subscribe {
            Some(action) => action(remote_id, key),
            None => Ok(()),
        }
    }

    pub(crate) fn unsubscribe(&self, remote_id: RemoteId, key: &TypeKey) -> AxResult {
        match &self.unsubscribe {
            Some(action) => action(remote_id, key),
            None => Ok(()),
        }
    }
}
