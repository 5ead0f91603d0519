//! Identity types shared by the manager and the tracker.

use alloc::sync::Arc;
use core::any::TypeId;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

/// Identifier of a remotely managed resource that emits notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RemoteId(pub i64);

impl From<i64> for RemoteId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type-erased identity of a [`NotificationType`].
///
/// Two keys are equal when both the name and the payload type match, so the
/// same name used with two payload types yields two distinct categories.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeKey {
    name: Arc<str>,
    payload: TypeId,
}

impl TypeKey {
    /// The category name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeKey").field(&self.name).finish()
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Typed category of notification carrying payloads of type `T`.
///
/// # Example
///
/// ```rust,ignore
/// static STATE_CHANGED: LazyLock<NotificationType<JobState>> =
///     LazyLock::new(|| NotificationType::new("job.state"));
/// ```
pub struct NotificationType<T> {
    key: TypeKey,
    _payload: PhantomData<fn() -> T>,
}

impl<T: 'static> NotificationType<T> {
    /// Creates a notification type named `name` for payloads of type `T`.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            key: TypeKey {
                name: name.into(),
                payload: TypeId::of::<T>(),
            },
            _payload: PhantomData,
        }
    }
}

impl<T> NotificationType<T> {
    /// The category name.
    pub fn name(&self) -> &str {
        self.key.name()
    }

    /// The erased identity used as a map key.
    pub fn key(&self) -> &TypeKey {
        &self.key
    }
}

impl<T> Clone for NotificationType<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            _payload: PhantomData,
        }
    }
}

impl<T> PartialEq for NotificationType<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for NotificationType<T> {}

impl<T> Hash for NotificationType<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T> fmt::Debug for NotificationType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationType")
            .field("name", &self.key.name)
            .field("payload", &core::any::type_name::<T>())
            .finish()
    }
}

/// A notification emitted by a remote resource.
#[derive(Debug, Clone)]
pub struct Notification<T> {
    /// The resource the notification originates from.
    pub remote_id: RemoteId,
    /// The category of the notification.
    pub notification_type: NotificationType<T>,
    /// Event data.
    pub payload: T,
}

impl<T> Notification<T> {
    /// Creates a new notification.
    pub fn new(remote_id: RemoteId, notification_type: NotificationType<T>, payload: T) -> Self {
        Self {
            remote_id,
            notification_type,
            payload,
        }
    }
}
