//! Concurrent map with cascading cleanup.
//!
//! An [`OnEmptyMap`] invokes a callback the moment an explicit removal leaves it
//! empty. Nested maps use this to remove themselves from their parent without
//! the parent polling and without the child storing more than a weak parent
//! handle and its own key.
//!
//! # Races with concurrent growth
//!
//! Between a child becoming empty and the parent pruning it, another thread may
//! fetch the same child through get-or-create and insert into it. The prune
//! therefore happens in a single critical section on the parent: the child is
//! removed only if it is still the child stored under that key *and* still
//! empty, and it is marked retired while both locks are held. Any later insert
//! into a retired map fails with [`Retired`], and the caller retries from the
//! root, where get-or-create yields a fresh child.
//!
//! ```text
//!  remove(k) ──> child empty ──> on_empty(child) ──> parent.prune(key, child)
//!                                                     │ same child && empty?
//!                                                     ├─ yes: retire + remove
//!                                                     └─ no:  keep (regrown)
//! ```

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ptr;

use spin::RwLock;

/// Returned when mutating a map that has been detached from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retired;

/// A nested container that its parent can detach once it is empty.
pub trait Retire {
    /// Marks the container retired if it holds no entries.
    ///
    /// Returns `true` if the container is now retired.
    fn retire_if_empty(&self) -> bool;
}

struct Slots<K, V> {
    entries: BTreeMap<K, V>,
    retired: bool,
}

type EmptyCallback<K, V> = Box<dyn Fn(&OnEmptyMap<K, V>) + Send + Sync>;

/// A lock-protected map that reports when a removal empties it.
pub struct OnEmptyMap<K, V> {
    slots: RwLock<Slots<K, V>>,
    on_empty: Option<EmptyCallback<K, V>>,
}

impl<K: Ord, V> OnEmptyMap<K, V> {
    /// Creates an empty map without an empty-callback.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Slots {
                entries: BTreeMap::new(),
                retired: false,
            }),
            on_empty: None,
        }
    }

    /// Creates an empty map that calls `on_empty` whenever a removal empties it.
    ///
    /// The callback runs on the removing thread after the map's lock has been
    /// released. It is not called for maps that have been retired.
    pub fn with_on_empty<F>(on_empty: F) -> Self
    where
        F: Fn(&OnEmptyMap<K, V>) + Send + Sync + 'static,
    {
        Self {
            on_empty: Some(Box::new(on_empty)),
            ..Self::new()
        }
    }

    /// Gets the number of entries.
    pub fn len(&self) -> usize {
        self.slots.read().entries.len()
    }

    /// Checks if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.read().entries.is_empty()
    }

    /// Checks if the map has been detached from its parent.
    pub fn is_retired(&self) -> bool {
        self.slots.read().retired
    }

    /// Checks if `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.slots.read().entries.contains_key(key)
    }

    /// Gets a clone of the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.slots.read().entries.get(key).cloned()
    }

    /// Lists the keys currently present.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.slots.read().entries.keys().cloned().collect()
    }

    /// Copies out every entry.
    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.slots
            .read()
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Inserts `value` under `key` unless the key is occupied.
    ///
    /// Returns `Ok(true)` if the value was inserted and `Ok(false)` if the key
    /// was already present, in which case the map is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Retired`] if the map has been detached.
    pub fn insert_new(&self, key: K, value: V) -> Result<bool, Retired> {
        let mut slots = self.slots.write();
        if slots.retired {
            return Err(Retired);
        }
        if slots.entries.contains_key(&key) {
            return Ok(false);
        }
        slots.entries.insert(key, value);
        Ok(true)
    }

    /// Returns the value under `key`, inserting `make()` if absent.
    ///
    /// Lookup and insertion are atomic with respect to other mutations.
    ///
    /// # Errors
    ///
    /// Returns [`Retired`] if the map has been detached.
    pub fn get_or_insert_with<F>(&self, key: K, make: F) -> Result<V, Retired>
    where
        V: Clone,
        F: FnOnce() -> V,
    {
        {
            let slots = self.slots.read();
            if slots.retired {
                return Err(Retired);
            }
            if let Some(value) = slots.entries.get(&key) {
                return Ok(value.clone());
            }
        }

        let mut slots = self.slots.write();
        if slots.retired {
            return Err(Retired);
        }
        Ok(slots.entries.entry(key).or_insert_with(make).clone())
    }

    /// Removes the value under `key`.
    ///
    /// If the map is left empty, the empty-callback runs before this returns.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.remove_if(key, |_| true)
    }

    /// Removes the value under `key` if `predicate` accepts it.
    ///
    /// The predicate runs while the map is locked for writing. If the removal
    /// leaves the map empty, the empty-callback runs before this returns.
    pub fn remove_if<P>(&self, key: &K, predicate: P) -> Option<V>
    where
        P: FnOnce(&V) -> bool,
    {
        let (removed, emptied) = {
            let mut slots = self.slots.write();
            if !slots.entries.get(key).is_some_and(predicate) {
                return None;
            }
            let removed = slots.entries.remove(key);
            let emptied = slots.entries.is_empty() && !slots.retired;
            (removed, emptied)
        };

        if emptied {
            if let Some(on_empty) = &self.on_empty {
                on_empty(self);
            }
        }
        removed
    }

    /// Detaches the map: marks it retired and hands back every entry.
    ///
    /// Inserts after this point fail with [`Retired`]. The empty-callback does
    /// not run.
    pub fn retire(&self) -> Vec<(K, V)> {
        let mut slots = self.slots.write();
        slots.retired = true;
        core::mem::take(&mut slots.entries).into_iter().collect()
    }
}

impl<K: Ord, V> Default for OnEmptyMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> Retire for OnEmptyMap<K, V> {
    fn retire_if_empty(&self) -> bool {
        let mut slots = self.slots.write();
        if slots.entries.is_empty() {
            slots.retired = true;
        }
        slots.retired
    }
}

impl<K: Ord, C: Retire> OnEmptyMap<K, Arc<C>> {
    /// Removes the child stored under `key` if it is `child` and is empty.
    ///
    /// Returns `true` if the child was detached. A child that was regrown or
    /// replaced since it reported empty is left in place.
    pub fn prune(&self, key: &K, child: &C) -> bool {
        self.remove_if(key, |current| {
            ptr::eq(Arc::as_ptr(current), child) && current.retire_if_empty()
        })
        .is_some()
    }
}

impl<K, K2, V2> OnEmptyMap<K, Arc<OnEmptyMap<K2, V2>>>
where
    K: Ord + Clone + Send + Sync + 'static,
    K2: Ord + Send + Sync + 'static,
    V2: Send + Sync + 'static,
{
    /// Creates a child map for `key` that prunes itself from `parent` once emptied.
    ///
    /// Only a weak handle to `parent` is kept.
    pub fn new_child(parent: &Arc<Self>, key: K) -> Arc<OnEmptyMap<K2, V2>> {
        let parent = Arc::downgrade(parent);
        Arc::new(OnEmptyMap::with_on_empty(move |emptied| {
            if let Some(parent) = parent.upgrade() {
                parent.prune(&key, emptied);
            }
        }))
    }
}
