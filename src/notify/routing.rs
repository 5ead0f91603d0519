//! Per-remote dispatch table.
//!
//! A [`DispatchTable`] multiplexes the listeners of one remote id by
//! notification type. It invokes the caller's subscribe action when a type
//! gains its first listener and the unsubscribe action when it loses its last
//! one. Actions and listeners always run with the table unlocked.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use axerrno::AxResult;
use spin::RwLock;

use crate::error::{NotifyError, NotifyResult};
use crate::listener::{ErasedListener, ListenerId, ListenerRef, NotificationListener};
use crate::on_empty::{Retire, Retired};
use crate::types::{Notification, NotificationType, RemoteId, TypeKey};

struct TableState {
    /// Listener sets indexed by type. A set is never stored empty.
    types: BTreeMap<TypeKey, Vec<ErasedListener>>,
    /// Set once the owner has detached this table.
    retired: bool,
}

/// Listener table for a single remote id.
pub(crate) struct DispatchTable {
    remote_id: RemoteId,
    state: RwLock<TableState>,
}

impl DispatchTable {
    pub(crate) fn new(remote_id: RemoteId) -> Self {
        Self {
            remote_id,
            state: RwLock::new(TableState {
                types: BTreeMap::new(),
                retired: false,
            }),
        }
    }

    /// Adds `listener` for `notification_type`.
    ///
    /// If the listener set for the type is created by this call, `subscribe`
    /// runs afterwards. When it fails the listener is taken back out and the
    /// failure is returned, tagged with this table's remote id.
    ///
    /// # Errors
    ///
    /// The outer [`Retired`] means the owner detached the table and the caller
    /// must retry on a fresh one. The inner error reports a duplicate listener
    /// or a failed subscribe action.
    pub(crate) fn add<T, S>(
        &self,
        notification_type: &NotificationType<T>,
        listener: ListenerRef<T>,
        subscribe: S,
    ) -> Result<NotifyResult, Retired>
    where
        T: 'static,
        S: FnOnce(&TypeKey) -> AxResult,
    {
        let key = notification_type.key();
        let listener = ErasedListener::new(listener);
        let id = listener.id();

        let created = {
            let mut state = self.state.write();
            if state.retired {
                return Err(Retired);
            }

            let mut created = false;
            let listeners = state.types.entry(key.clone()).or_insert_with(|| {
                created = true;
                Vec::new()
            });
            if listeners.iter().any(|l| l.id() == id) {
                return Ok(Err(NotifyError::already_registered(self.remote_id, key)));
            }
            listeners.push(listener);
            created
        };

        if created {
            if let Err(err) = subscribe(key) {
                self.rollback(key, id);
                return Ok(Err(NotifyError::remote(self.remote_id, err)));
            }
        }
        Ok(Ok(()))
    }

    /// Takes back a listener whose subscription could not be established.
    fn rollback(&self, key: &TypeKey, id: ListenerId) {
        let mut state = self.state.write();
        if let Some(listeners) = state.types.get_mut(key) {
            listeners.retain(|l| l.id() != id);
            if listeners.is_empty() {
                state.types.remove(key);
            }
        }
    }

    /// Removes the listener `id` for `key`.
    ///
    /// If that empties the listener set, the type entry is dropped and
    /// `unsubscribe` runs. Returns whether the whole table is now empty, which
    /// tells the owner to prune it.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener is not registered or the unsubscribe
    /// action fails. The listener is removed in the latter case.
    pub(crate) fn remove<U>(&self, key: &TypeKey, id: ListenerId, unsubscribe: U) -> NotifyResult<bool>
    where
        U: FnOnce(&TypeKey) -> AxResult,
    {
        let (emptied, table_empty) = {
            let mut state = self.state.write();
            let Some(listeners) = state.types.get_mut(key) else {
                return Err(NotifyError::not_registered(self.remote_id, key));
            };
            let Some(pos) = listeners.iter().position(|l| l.id() == id) else {
                return Err(NotifyError::not_registered(self.remote_id, key));
            };
            listeners.swap_remove(pos);

            let emptied = listeners.is_empty();
            if emptied {
                state.types.remove(key);
            }
            (emptied, state.types.is_empty())
        };

        if emptied {
            unsubscribe(key).map_err(|err| NotifyError::remote(self.remote_id, err))?;
        }
        Ok(table_empty)
    }

    /// Delivers `notification` to every listener registered for its type.
    ///
    /// Listeners are invoked over a snapshot taken under the read lock; a
    /// listener added or removed while the notification is in flight may or
    /// may not see it. Returns the number of listeners invoked.
    pub(crate) fn dispatch<T: 'static>(&self, notification: &Notification<T>) -> usize {
        let listeners = match self
            .state
            .read()
            .types
            .get(notification.notification_type.key())
        {
            Some(listeners) => listeners.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for listener in &listeners {
            match listener.downcast::<T>() {
                Some(listener) => {
                    listener.handle(notification);
                    delivered += 1;
                }
                None => warn!(
                    "Listener {:?} on remote {} does not accept {:?}",
                    listener.id(),
                    self.remote_id,
                    notification.notification_type
                ),
            }
        }
        delivered
    }

    /// Gets the number of listeners registered for `key`.
    pub(crate) fn listener_count(&self, key: &TypeKey) -> usize {
        self.state.read().types.get(key).map_or(0, Vec::len)
    }

    /// Checks if the table holds no listeners.
    pub(crate) fn is_empty(&self) -> bool {
        self.state.read().types.is_empty()
    }
}

impl Retire for DispatchTable {
    fn retire_if_empty(&self) -> bool {
        let mut state = self.state.write();
        if state.types.is_empty() {
            state.retired = true;
        }
        state.retired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::sync::Arc;
    use axerrno::{AxError, ax_err};
    use core::sync::atomic::{AtomicU32, Ordering};
    use spin::Mutex;

    fn counting_listener(counter: &Arc<AtomicU32>) -> ListenerRef<u32> {
        let counter = Arc::clone(counter);
        Arc::new(move |_: &Notification<u32>| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_subscribe_runs_on_first_listener_only() {
        let table = DispatchTable::new(RemoteId(1));
        let ty = NotificationType::<u32>::new("state");
        let counter = Arc::new(AtomicU32::new(0));
        let subscribed = AtomicU32::new(0);
        let subscribe = |_: &TypeKey| {
            subscribed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        table.add(&ty, counting_listener(&counter), subscribe).unwrap().unwrap();
        table.add(&ty, counting_listener(&counter), subscribe).unwrap().unwrap();

        assert_eq!(subscribed.load(Ordering::SeqCst), 1);
        assert_eq!(table.listener_count(ty.key()), 2);
    }

    #[test]
    fn test_duplicate_listener_rejected() {
        let table = DispatchTable::new(RemoteId(1));
        let ty = NotificationType::<u32>::new("state");
        let counter = Arc::new(AtomicU32::new(0));
        let listener = counting_listener(&counter);

        table.add(&ty, Arc::clone(&listener), |_| Ok(())).unwrap().unwrap();
        let err = table
            .add(&ty, Arc::clone(&listener), |_| Ok(()))
            .unwrap()
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(err.remote_id(), RemoteId(1));
        assert_eq!(table.listener_count(ty.key()), 1);
    }

    #[test]
    fn test_unsubscribe_runs_on_last_listener_only() {
        let table = DispatchTable::new(RemoteId(1));
        let ty = NotificationType::<u32>::new("state");
        let counter = Arc::new(AtomicU32::new(0));
        let first = counting_listener(&counter);
        let second = counting_listener(&counter);
        let log = Mutex::new(alloc::vec::Vec::<String>::new());
        let unsubscribe = |key: &TypeKey| {
            log.lock().push(String::from(key.name()));
            Ok(())
        };

        table.add(&ty, Arc::clone(&first), |_| Ok(())).unwrap().unwrap();
        table.add(&ty, Arc::clone(&second), |_| Ok(())).unwrap().unwrap();

        let empty = table.remove(ty.key(), ListenerId::of(&first), unsubscribe).unwrap();
        assert!(!empty);
        assert!(log.lock().is_empty());

        let empty = table.remove(ty.key(), ListenerId::of(&second), unsubscribe).unwrap();
        assert!(empty);
        assert_eq!(*log.lock(), alloc::vec![String::from("state")]);
    }

    #[test]
    fn test_remove_unknown_listener() {
        let table = DispatchTable::new(RemoteId(9));
        let ty = NotificationType::<u32>::new("state");
        let counter = Arc::new(AtomicU32::new(0));
        let listener = counting_listener(&counter);

        let err = table
            .remove(ty.key(), ListenerId::of(&listener), |_| Ok(()))
            .unwrap_err();
        assert_eq!(err, NotifyError::not_registered(RemoteId(9), ty.key()));
    }

    #[test]
    fn test_failed_subscribe_rolls_back() {
        let table = DispatchTable::new(RemoteId(2));
        let ty = NotificationType::<u32>::new("state");
        let counter = Arc::new(AtomicU32::new(0));

        let err = table
            .add(&ty, counting_listener(&counter), |_| ax_err!(ConnectionRefused))
            .unwrap()
            .unwrap_err();

        assert_eq!(err, NotifyError::remote(RemoteId(2), AxError::ConnectionRefused));
        assert!(table.is_empty());
    }

    #[test]
    fn test_dispatch_by_type() {
        let table = DispatchTable::new(RemoteId(1));
        let state = NotificationType::<u32>::new("state");
        let icon = NotificationType::<u32>::new("icon");
        let state_hits = Arc::new(AtomicU32::new(0));
        let icon_hits = Arc::new(AtomicU32::new(0));

        table.add(&state, counting_listener(&state_hits), |_| Ok(())).unwrap().unwrap();
        table.add(&state, counting_listener(&state_hits), |_| Ok(())).unwrap().unwrap();
        table.add(&icon, counting_listener(&icon_hits), |_| Ok(())).unwrap().unwrap();

        let delivered = table.dispatch(&Notification::new(RemoteId(1), state.clone(), 0));
        assert_eq!(delivered, 2);
        assert_eq!(state_hits.load(Ordering::SeqCst), 2);
        assert_eq!(icon_hits.load(Ordering::SeqCst), 0);

        let other = NotificationType::<u32>::new("other");
        assert_eq!(table.dispatch(&Notification::new(RemoteId(1), other, 0)), 0);
    }

    #[test]
    fn test_retired_table_rejects_add() {
        let table = DispatchTable::new(RemoteId(1));
        let ty = NotificationType::<u32>::new("state");
        let counter = Arc::new(AtomicU32::new(0));

        assert!(table.retire_if_empty());
        assert!(table.add(&ty, counting_listener(&counter), |_| Ok(())).is_err());
    }
}
