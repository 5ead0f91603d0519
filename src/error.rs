//! Error type of the registry.

use alloc::boxed::Box;
use core::fmt;

use axerrno::AxError;

use crate::types::{RemoteId, TypeKey};

/// Errors raised by listener registration and removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// A listener is already registered under the key.
    AlreadyRegistered {
        /// The remote the registration targeted.
        remote_id: RemoteId,
        /// The notification category.
        notification_type: TypeKey,
    },
    /// No listener is registered under the key.
    NotRegistered {
        /// The remote the removal targeted.
        remote_id: RemoteId,
        /// The notification category.
        notification_type: TypeKey,
    },
    /// The remote side failed to apply a subscription change.
    Remote {
        /// The remote whose call failed.
        remote_id: RemoteId,
        /// The failure reported by the transport.
        source: AxError,
    },
    /// A bulk teardown in which at least one removal failed.
    ///
    /// Every registration was still attempted; only the last failure is kept.
    Teardown {
        /// Number of removals attempted.
        attempted: usize,
        /// Number of removals that failed.
        failed: usize,
        /// The last failure observed.
        last: Box<NotifyError>,
    },
}

/// Result alias used throughout the crate.
pub type NotifyResult<T = ()> = Result<T, NotifyError>;

impl NotifyError {
    pub(crate) fn already_registered(remote_id: RemoteId, notification_type: &TypeKey) -> Self {
        Self::AlreadyRegistered {
            remote_id,
            notification_type: notification_type.clone(),
        }
    }

    pub(crate) fn not_registered(remote_id: RemoteId, notification_type: &TypeKey) -> Self {
        Self::NotRegistered {
            remote_id,
            notification_type: notification_type.clone(),
        }
    }

    /// Tags a transport failure with the remote it concerns.
    pub fn remote(remote_id: RemoteId, source: AxError) -> Self {
        Self::Remote { remote_id, source }
    }

    /// The remote id the error concerns. For a teardown, the remote of the last failure.
    pub fn remote_id(&self) -> RemoteId {
        match self {
            Self::AlreadyRegistered { remote_id, .. }
            | Self::NotRegistered { remote_id, .. }
            | Self::Remote { remote_id, .. } => *remote_id,
            Self::Teardown { last, .. } => last.remote_id(),
        }
    }

    /// Whether this is a registration conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyRegistered { .. })
    }
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRegistered {
                remote_id,
                notification_type,
            } => write!(
                f,
                "listener already registered for {notification_type} on remote {remote_id}"
            ),
            Self::NotRegistered {
                remote_id,
                notification_type,
            } => write!(
                f,
                "no listener registered for {notification_type} on remote {remote_id}"
            ),
            Self::Remote { remote_id, source } => {
                write!(f, "remote {remote_id} failed: {source:?}")
            }
            Self::Teardown {
                attempted,
                failed,
                last,
            } => write!(
                f,
                "{failed} of {attempted} removals failed, last error: {last}"
            ),
        }
    }
}

impl core::error::Error for NotifyError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Teardown { last, .. } => Some(last.as_ref()),
            _ => None,
        }
    }
}

impl From<NotifyError> for AxError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::AlreadyRegistered { .. } => AxError::AlreadyExists,
            NotifyError::NotRegistered { .. } => AxError::NotFound,
            NotifyError::Remote { source, .. } => source,
            NotifyError::Teardown { last, .. } => (*last).into(),
        }
    }
}
