//! Shared container core
//!
//! Both container variants wrap the same [`Shared`] value: the current value,
//! the ordered subscriber map, and a version counter. The variants only differ
//! in what their set operation hands back to the caller.

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use crate::subscriber::{Listener, Subscriber};
use crate::subscription::{Registry, SubscriptionHandle, SubscriptionId};

/// Subscribers in registration order
type SubscriberMap<T> = IndexMap<SubscriptionId, Arc<Subscriber<T>>, FxBuildHasher>;

pub(crate) struct Shared<T> {
    value: RwLock<Arc<T>>,
    subscribers: Mutex<SubscriberMap<T>>,
    next_id: AtomicU64,
    version: AtomicU64,
}

impl<T: Send + Sync + 'static> Shared<T> {
    pub(crate) fn new(value: T) -> Arc<Self> {
        Arc::new(Self {
            value: RwLock::new(Arc::new(value)),
            subscribers: Mutex::new(IndexMap::default()),
            next_id: AtomicU64::new(0),
            version: AtomicU64::new(0),
        })
    }

    pub(crate) fn get(&self) -> Arc<T> {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    /// Register a subscriber under a fresh id
    pub(crate) fn insert(self: &Arc<Self>, subscriber: Subscriber<T>) -> SubscriptionHandle {
        let id = SubscriptionId::from_raw(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.subscribers().insert(id, Arc::new(subscriber));
        tracing::trace!(subscription = id.to_raw(), "subscribed");
        self.handle(id)
    }

    /// Register a plain listener, reusing the entry if it is already present
    pub(crate) fn insert_listener(self: &Arc<Self>, listener: Listener<T>) -> SubscriptionHandle {
        let existing = self
            .subscribers()
            .iter()
            .find(|(_, sub)| sub.is_listener(&listener))
            .map(|(id, _)| *id);

        match existing {
            Some(id) => {
                tracing::trace!(subscription = id.to_raw(), "listener already subscribed");
                self.handle(id)
            }
            None => self.insert(Subscriber::Plain(listener)),
        }
    }

    /// Replace the value and notify subscribers
    ///
    /// Subscribers are snapshotted before the pass so callbacks are free to
    /// subscribe, unsubscribe, or set the value again. A subscriber removed
    /// during the pass is skipped. Returns the new version.
    pub(crate) fn replace(&self, next: Arc<T>) -> u64 {
        let prev = {
            let mut value = self.value.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *value, next.clone())
        };
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;

        let snapshot: SmallVec<[(SubscriptionId, Arc<Subscriber<T>>); 4]> = self
            .subscribers()
            .iter()
            .map(|(id, sub)| (*id, sub.clone()))
            .collect();

        tracing::debug!(
            version,
            subscribers = snapshot.len(),
            same_value = Arc::ptr_eq(&prev, &next),
            "container value replaced"
        );

        for (id, subscriber) in snapshot {
            if !self.subscribers().contains_key(&id) {
                continue;
            }
            if subscriber.notify(&prev, &next) {
                tracing::trace!(subscription = id.to_raw(), version, "subscriber notified");
            }
        }

        version
    }

    fn handle(self: &Arc<Self>, id: SubscriptionId) -> SubscriptionHandle {
        let owner: Weak<dyn Registry> = Arc::downgrade(self) as Weak<dyn Registry>;
        SubscriptionHandle::new(id, owner)
    }

    fn subscribers(&self) -> MutexGuard<'_, SubscriberMap<T>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Send + Sync + 'static> Registry for Shared<T> {
    fn remove(&self, id: SubscriptionId) -> bool {
        // shift_remove keeps the remaining subscribers in registration order
        self.subscribers().shift_remove(&id).is_some()
    }

    fn contains(&self, id: SubscriptionId) -> bool {
        self.subscribers().contains_key(&id)
    }
}
