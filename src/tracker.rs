//! Grouped listener registrations with bulk teardown.
//!
//! A [`NotificationListenerTracker`] wraps any [`RemoteNotifier`] and records
//! each registration under an application-chosen group key, such as a session
//! or a UI panel. [`remove_all`](NotificationListenerTracker::remove_all)
//! releases everything a group registered, across every remote id and type, in
//! one call.
//!
//! # Structure
//!
//! ```text
//! groups: group ──> remotes: remote_id ──> types: type ──> registration
//!                   (OnEmptyMap)            (OnEmptyMap)
//! ```
//!
//! The two inner levels prune themselves from their parent when a removal
//! empties them, so no empty entry outlives the removal that emptied it.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::error::{NotifyError, NotifyResult};
use crate::listener::{ListenerId, ListenerRef};
use crate::notify::RemoteNotifier;
use crate::on_empty::{OnEmptyMap, Retired};
use crate::types::{NotificationType, RemoteId, TypeKey};

/// A registration whose payload type has been erased, so that bulk teardown
/// can remove it from the wrapped notifier.
trait Tracked<N>: Send + Sync {
    fn listener_id(&self) -> ListenerId;

    fn remove_from(&self, notifier: &N, remote_id: RemoteId) -> NotifyResult;
}

struct Registration<T> {
    notification_type: NotificationType<T>,
    listener: ListenerRef<T>,
}

impl<T: 'static, N: RemoteNotifier> Tracked<N> for Registration<T> {
    fn listener_id(&self) -> ListenerId {
        ListenerId::of(&self.listener)
    }

    fn remove_from(&self, notifier: &N, remote_id: RemoteId) -> NotifyResult {
        notifier.remove_notification_listener(remote_id, &self.notification_type, &self.listener)
    }
}

type TypeMap<N> = OnEmptyMap<TypeKey, Arc<dyn Tracked<N>>>;
type RemoteMap<N> = OnEmptyMap<RemoteId, Arc<TypeMap<N>>>;

/// Records listener registrations per group and tears them down per group.
///
/// At most one listener is registered per `(group, remote_id, type)`.
///
/// # Consistency
///
/// The tracker never claims a registration that the wrapped notifier rejected:
/// a failed add is rolled back locally. Removal is the opposite: the local
/// record is dropped before the wrapped notifier is called, and stays dropped
/// if that call fails.
///
/// # Usage
///
/// ```rust,ignore
/// let tracker = NotificationListenerTracker::new(Arc::clone(&manager));
///
/// tracker.add_notification_listener("session-1", RemoteId(5), &STATE_CHANGED, listener)?;
/// tracker.add_notification_listener("session-1", RemoteId(6), &ICON_CHANGED, other)?;
///
/// // Session closed: release everything it registered.
/// tracker.remove_all(&"session-1")?;
/// ```
pub struct NotificationListenerTracker<G, N> {
    /// The notifier registrations are forwarded to.
    notifier: N,

    /// Registrations indexed by group, then remote id, then type.
    groups: Arc<OnEmptyMap<G, Arc<RemoteMap<N>>>>,
}

impl<G, N> NotificationListenerTracker<G, N>
where
    G: Ord + Clone + Send + Sync + 'static,
    N: RemoteNotifier + 'static,
{
    /// Creates a tracker forwarding to `notifier`.
    pub fn new(notifier: N) -> Self {
        Self {
            notifier,
            groups: Arc::new(OnEmptyMap::new()),
        }
    }

    /// Gets the wrapped notifier.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Registers `listener` under `group` and forwards it to the wrapped notifier.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A listener is already registered for `(group, remote_id, notification_type)`
    /// - The wrapped notifier rejects the listener; the local record is then
    ///   removed again and the notifier's error is returned
    pub fn add_notification_listener<T: 'static>(
        &self,
        group: G,
        remote_id: RemoteId,
        notification_type: &NotificationType<T>,
        listener: ListenerRef<T>,
    ) -> NotifyResult {
        let key = notification_type.key();
        let registration: Arc<dyn Tracked<N>> = Arc::new(Registration {
            notification_type: notification_type.clone(),
            listener: Arc::clone(&listener),
        });

        let types = self.record(group, remote_id, key, &registration)?;

        if let Err(err) = self
            .notifier
            .add_notification_listener(remote_id, notification_type, listener)
        {
            warn!(
                "Remote {} rejected listener for {:?}, rolling back: {}",
                remote_id, key, err
            );
            types.remove_if(key, |current| Arc::ptr_eq(current, &registration));
            return Err(err);
        }

        debug!(
            "Tracking listener {:?} for {:?} on remote {}",
            registration.listener_id(),
            key,
            remote_id
        );
        Ok(())
    }

    /// Inserts `registration` into the tree, creating intermediate maps.
    ///
    /// Returns the type map the registration was stored in.
    fn record(
        &self,
        group: G,
        remote_id: RemoteId,
        key: &TypeKey,
        registration: &Arc<dyn Tracked<N>>,
    ) -> NotifyResult<Arc<TypeMap<N>>> {
        // A map detached by a concurrent prune or `remove_all` rejects the
        // insert with `Retired`; start over from the root.
        loop {
            let Ok(remotes) = self
                .groups
                .get_or_insert_with(group.clone(), || OnEmptyMap::new_child(&self.groups, group.clone()))
            else {
                continue;
            };
            let Ok(types) = remotes
                .get_or_insert_with(remote_id, || OnEmptyMap::new_child(&remotes, remote_id))
            else {
                continue;
            };
            match types.insert_new(key.clone(), Arc::clone(registration)) {
                Ok(true) => return Ok(types),
                Ok(false) => return Err(NotifyError::already_registered(remote_id, key)),
                Err(Retired) => continue,
            }
        }
    }

    /// Unregisters the listener recorded for `(group, remote_id, notification_type)`.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is recorded for the key, or if the wrapped
    /// notifier fails. In the latter case the local record is already gone.
    pub fn remove_notification_listener<T>(
        &self,
        group: &G,
        remote_id: RemoteId,
        notification_type: &NotificationType<T>,
    ) -> NotifyResult {
        let key = notification_type.key();
        let registration = self
            .groups
            .get(group)
            .and_then(|remotes| remotes.get(&remote_id))
            .and_then(|types| types.remove(key))
            .ok_or_else(|| NotifyError::not_registered(remote_id, key))?;

        debug!(
            "Untracking listener {:?} for {:?} on remote {}",
            registration.listener_id(),
            key,
            remote_id
        );
        registration.remove_from(&self.notifier, remote_id)
    }

    /// Removes every registration recorded under `group`.
    ///
    /// The group's subtree is detached in one step; registrations added to the
    /// group afterwards start a new subtree and are not affected. Every
    /// detached registration is then removed from the wrapped notifier, even
    /// if earlier removals fail.
    ///
    /// Returns `Ok(false)` if nothing was registered under `group`.
    ///
    /// # Errors
    ///
    /// If any removal failed, returns [`NotifyError::Teardown`] carrying the
    /// last failure. All other registrations were still removed, so callers
    /// may see an error although most of the group was torn down.
    pub fn remove_all(&self, group: &G) -> NotifyResult<bool> {
        let Some(remotes) = self.groups.remove(group) else {
            return Ok(false);
        };

        let mut attempted = 0;
        let mut failed = 0;
        let mut last_error = None;

        for (remote_id, types) in remotes.retire() {
            for (key, registration) in types.retire() {
                attempted += 1;
                if let Err(err) = registration.remove_from(&self.notifier, remote_id) {
                    warn!(
                        "Failed to remove listener for {:?} on remote {}: {}",
                        key, remote_id, err
                    );
                    failed += 1;
                    last_error = Some(err);
                }
            }
        }

        debug!("Removed {} registrations ({} failed)", attempted, failed);
        match last_error {
            Some(last) => Err(NotifyError::Teardown {
                attempted,
                failed,
                last: Box::new(last),
            }),
            None => Ok(attempted > 0),
        }
    }

    /// Checks if a listener is recorded for `(group, remote_id, key)`.
    pub fn is_registered(&self, group: &G, remote_id: RemoteId, key: &TypeKey) -> bool {
        self.groups
            .get(group)
            .and_then(|remotes| remotes.get(&remote_id))
            .is_some_and(|types| types.contains_key(key))
    }

    /// Gets the number of registrations recorded under `group`.
    pub fn registration_count(&self, group: &G) -> usize {
        self.groups.get(group).map_or(0, |remotes| {
            remotes
                .snapshot()
                .iter()
                .map(|(_, types)| types.len())
                .sum()
        })
    }

    /// Lists the groups that currently hold registrations.
    pub fn groups(&self) -> Vec<G> {
        self.groups.keys()
    }

    /// Checks if no registration is recorded.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
