use core::sync::atomic::{AtomicU64, Ordering};

/// Counters describing the activity of a notification manager.
#[derive(Debug, Default)]
pub struct ManagerStats {
    /// Subscribe actions that succeeded.
    pub subscribe_count: AtomicU64,
    /// Unsubscribe actions that succeeded.
    pub unsubscribe_count: AtomicU64,
    /// Subscribe or unsubscribe actions that failed.
    pub hook_error_count: AtomicU64,
    /// Notifications that reached at least one listener table.
    pub dispatch_count: AtomicU64,
    /// Individual listener invocations.
    pub delivery_count: AtomicU64,
    /// Notifications for which no listener was registered.
    pub unmatched_count: AtomicU64,
}

impl ManagerStats {
    /// Creates a new statistics tracker.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_subscribe(&self) {
        self.subscribe_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_unsubscribe(&self) {
        self.unsubscribe_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_hook_error(&self) {
        self.hook_error_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dispatch(&self, deliveries: usize) {
        self.dispatch_count.fetch_add(1, Ordering::Relaxed);
        self.delivery_count
            .fetch_add(deliveries as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_unmatched(&self) {
        self.unmatched_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the number of successful subscribe actions.
    #[inline]
    pub fn subscribes(&self) -> u64 {
        self.subscribe_count.load(Ordering::Relaxed)
    }

    /// Gets the number of successful unsubscribe actions.
    #[inline]
    pub fn unsubscribes(&self) -> u64 {
        self.unsubscribe_count.load(Ordering::Relaxed)
    }

    /// Gets the number of failed hook invocations.
    #[inline]
    pub fn hook_errors(&self) -> u64 {
        self.hook_error_count.load(Ordering::Relaxed)
    }

    /// Gets the number of dispatched notifications.
    #[inline]
    pub fn dispatches(&self) -> u64 {
        self.dispatch_count.load(Ordering::Relaxed)
    }

    /// Gets the number of listener invocations.
    #[inline]
    pub fn deliveries(&self) -> u64 {
        self.delivery_count.load(Ordering::Relaxed)
    }

    /// Gets the number of notifications nobody listened to.
    #[inline]
    pub fn unmatched(&self) -> u64 {
        self.unmatched_count.load(Ordering::Relaxed)
    }
}
