//! Asynchronous state container
//!
//! [`AsyncContainer`] behaves like [`Container`](crate::Container) except that
//! setting a value hands back a [`Notified`] future. Awaiting it guarantees
//! that every subscriber registered at the time of the set has already been
//! called with the new value, which lets callers sequence dependent updates:
//!
//! ```ignore
//! let settings = create_async_container(Settings::default());
//! let session = create_async_container(Session::default());
//!
//! settings.set_value(new_settings).await;
//! // every settings subscriber has seen `new_settings` here
//! session.update(|s| s.with_locale(&new_locale)).await;
//! ```
//!
//! The value is stored and subscribers are notified inside the set call
//! itself, so dropping the future without awaiting it loses nothing. Two sets
//! racing without an await in between are last-write-wins.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::container::{ContainerId, StateContainer};
use crate::shared::Shared;
use crate::subscriber::{partial_eq, Listener, Selection, Subscriber};
use crate::subscription::SubscriptionHandle;

/// Completion of an [`AsyncContainer`] set
///
/// Resolves once all subscribers have been notified of the update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notified {
    version: u64,
}

impl Notified {
    /// Container version produced by the update
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl Future for Notified {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        // Notification already ran to completion when the future was created
        Poll::Ready(())
    }
}

/// A shared value with subscription support and awaitable updates
pub struct AsyncContainer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for AsyncContainer<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> AsyncContainer<T> {
    /// Create a container holding `value`
    pub fn new(value: T) -> Self {
        Self {
            shared: Shared::new(value),
        }
    }

    /// Create a container from a producer, which runs once, right away
    pub fn new_with<F>(init: F) -> Self
    where
        F: FnOnce() -> T,
    {
        Self::new(init())
    }

    /// Identity of this container
    pub fn id(&self) -> ContainerId {
        ContainerId::of(&self.shared)
    }

    /// Check whether two handles refer to the same container
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.shared, &other.shared)
    }

    /// Get the current value (not reactive)
    pub fn get_value(&self) -> Arc<T> {
        self.shared.get()
    }

    /// Subscribe to whole-value changes
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Arc<T>) + Send + Sync + 'static,
    {
        self.shared.insert(Subscriber::Plain(Arc::new(callback)))
    }

    /// Subscribe a shared listener, deduplicated by `Arc` identity
    pub fn subscribe_listener(&self, listener: Listener<T>) -> SubscriptionHandle {
        self.shared.insert_listener(listener)
    }

    /// Subscribe to changes of a selected part of the value
    pub fn selected_subscribe<P, S, F>(&self, selector: S, callback: F) -> SubscriptionHandle
    where
        P: PartialEq + Send + Sync + 'static,
        S: Fn(&T) -> P + Send + Sync + 'static,
        F: Fn(P) + Send + Sync + 'static,
    {
        let selection = Selection::new(selector, callback, partial_eq());
        self.shared.insert(Subscriber::Selected(Box::new(selection)))
    }

    /// Subscribe to a selected part of the value with a custom equality check
    pub fn selected_subscribe_with<P, S, F, E>(
        &self,
        selector: S,
        callback: F,
        is_equal: E,
    ) -> SubscriptionHandle
    where
        P: Send + Sync + 'static,
        S: Fn(&T) -> P + Send + Sync + 'static,
        F: Fn(P) + Send + Sync + 'static,
        E: Fn(&P, &P) -> bool + Send + Sync + 'static,
    {
        let selection = Selection::new(selector, callback, Arc::new(is_equal));
        self.shared.insert(Subscriber::Selected(Box::new(selection)))
    }

    /// Replace the value and notify subscribers
    pub fn set_value(&self, value: impl Into<Arc<T>>) -> Notified {
        Notified {
            version: self.shared.replace(value.into()),
        }
    }

    /// Replace the value with a transform of the current one
    pub fn update<F, R>(&self, f: F) -> Notified
    where
        F: FnOnce(&T) -> R,
        R: Into<Arc<T>>,
    {
        let current = self.shared.get();
        self.set_value(f(&current))
    }

    /// Number of sets applied so far
    pub fn version(&self) -> u64 {
        self.shared.version()
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscriber_count()
    }
}

impl<T: Send + Sync + 'static> StateContainer for AsyncContainer<T> {
    type Value = T;
    type Completion = Notified;

    fn id(&self) -> ContainerId {
        ContainerId::of(&self.shared)
    }

    fn get_value(&self) -> Arc<T> {
        self.shared.get()
    }

    fn subscribe_listener(&self, listener: Listener<T>) -> SubscriptionHandle {
        self.shared.insert_listener(listener)
    }

    fn set_value(&self, value: Arc<T>) -> Notified {
        Notified {
            version: self.shared.replace(value),
        }
    }
}

impl<T: fmt::Debug + Send + Sync + 'static> fmt::Debug for AsyncContainer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncContainer")
            .field("id", &self.id())
            .field("value", &self.get_value())
            .field("version", &self.version())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<T: Default + Send + Sync + 'static> Default for AsyncContainer<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Create an asynchronous container holding `value`
pub fn create_async_container<T: Send + Sync + 'static>(value: T) -> AsyncContainer<T> {
    AsyncContainer::new(value)
}

/// Create an asynchronous container whose value is produced by `init`
pub fn create_async_container_with<T, F>(init: F) -> AsyncContainer<T>
where
    T: Send + Sync + 'static,
    F: FnOnce() -> T,
{
    AsyncContainer::new_with(init)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Clone, Debug, PartialEq)]
    struct Pair {
        a: i32,
        b: i32,
    }

    #[test]
    fn test_await_after_notification() {
        let container = create_async_container(42);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let plain_seen = seen.clone();
        let _plain = container.subscribe(move |v| plain_seen.lock().unwrap().push(("plain", **v)));
        let selected_seen = seen.clone();
        let _selected = container.selected_subscribe(
            |v: &i32| v % 2,
            move |parity| selected_seen.lock().unwrap().push(("parity", parity)),
        );

        pollster::block_on(async {
            container.update(|v| v + 1).await;
            assert_eq!(*seen.lock().unwrap(), vec![("plain", 43), ("parity", 1)]);
        });
        assert_eq!(*container.get_value(), 43);
    }

    #[test]
    fn test_concurrent_updates_to_independent_containers() {
        let counter = create_async_container(42);
        let pair = create_async_container(Pair { a: 1, b: 1 });
        let notifications = Arc::new(AtomicUsize::new(0));

        for handle_calls in [notifications.clone(), notifications.clone()] {
            let _ = counter.subscribe(move |_| {
                handle_calls.fetch_add(1, Ordering::SeqCst);
            });
        }
        let pair_calls = notifications.clone();
        let _ = pair.subscribe(move |_| {
            pair_calls.fetch_add(1, Ordering::SeqCst);
        });

        pollster::block_on(async {
            futures::join!(counter.set_value(0), pair.set_value(Pair { a: 0, b: 0 }));
        });

        assert_eq!(*counter.get_value(), 0);
        assert_eq!(*pair.get_value(), Pair { a: 0, b: 0 });
        assert_eq!(notifications.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_unawaited_set_still_applies() {
        let container = create_async_container(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let _handle = container.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let first = container.set_value(1);
        let second = container.set_value(2);

        assert_eq!(*container.get_value(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!((first.version(), second.version()), (1, 2));
    }

    #[test]
    fn test_same_value_is_silent() {
        let container = create_async_container_with(|| Pair { a: 1, b: 1 });
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let _handle = container.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        pollster::block_on(container.set_value(container.get_value()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(container.version(), 1);
    }
}
