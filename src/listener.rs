//! Listener trait and the type-erased form listeners are stored in.
//!
//! Listener tables hold listeners of many payload types side by side, so a
//! [`ListenerRef<T>`] is erased into an [`ErasedListener`] on registration and
//! recovered once, at dispatch, by [`ErasedListener::downcast`].

use alloc::sync::Arc;
use core::any::Any;

use crate::types::Notification;

/// Receives notifications of payload type `T`.
///
/// Any `Fn(&Notification<T>) + Send + Sync` closure is a listener.
pub trait NotificationListener<T>: Send + Sync {
    /// Handles a single notification.
    fn handle(&self, notification: &Notification<T>);
}

impl<T, F> NotificationListener<T> for F
where
    F: Fn(&Notification<T>) + Send + Sync,
{
    fn handle(&self, notification: &Notification<T>) {
        self(notification)
    }
}

/// Shared handle to a listener. Registration and removal identify a listener by
/// the allocation this handle points to.
pub type ListenerRef<T> = Arc<dyn NotificationListener<T>>;

/// Identity of a listener, derived from its allocation address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(usize);

impl ListenerId {
    /// Returns the identity of `listener`. Clones of the same `Arc` share it.
    #[inline]
    pub fn of<T>(listener: &ListenerRef<T>) -> Self {
        Self(Arc::as_ptr(listener) as *const () as usize)
    }
}

/// A listener with its payload type erased.
#[derive(Clone)]
pub(crate) struct ErasedListener {
    id: ListenerId,
    inner: Arc<dyn Any + Send + Sync>,
}

impl ErasedListener {
    pub(crate) fn new<T: 'static>(listener: ListenerRef<T>) -> Self {
        Self {
            id: ListenerId::of(&listener),
            inner: Arc::new(listener),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> ListenerId {
        self.id
    }

    /// Recovers the typed listener, or `None` if it was not erased from a
    /// `ListenerRef<T>`.
    pub(crate) fn downcast<T: 'static>(&self) -> Option<&ListenerRef<T>> {
        self.inner.downcast_ref::<ListenerRef<T>>()
    }
}
