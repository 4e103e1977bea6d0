//! Synchronous state container
//!
//! A [`Container`] owns one value and notifies subscribers when it is
//! replaced. Cloning a container clones a handle: every clone shares the same
//! value, subscribers and [`ContainerId`].
//!
//! # Example
//!
//! ```ignore
//! use stash_core::create_container;
//!
//! #[derive(Debug)]
//! struct Counts { a: i32, b: i32 }
//!
//! let counts = create_container(Counts { a: 1, b: 1 });
//!
//! // Whole-value subscription, gated on identity
//! let unsub = counts.subscribe(|c| println!("counts: {:?}", c));
//!
//! // Derived subscription, fires only when `a + b` changes
//! let sum = counts.selected_subscribe(|c| c.a + c.b, |sum| println!("sum: {sum}"));
//!
//! counts.update(|c| Counts { a: c.a + 1, ..*c });
//!
//! unsub.unsubscribe();
//! sum.unsubscribe();
//! ```

use std::fmt;
use std::sync::Arc;

use crate::shared::Shared;
use crate::subscriber::{partial_eq, EqualityFn, Listener, Selection, Subscriber};
use crate::subscription::SubscriptionHandle;

/// Identity of a container
///
/// Two handles have the same id exactly when they are clones of one another.
/// Used to key caches that must be invalidated when the container changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContainerId(usize);

impl ContainerId {
    pub(crate) fn of<T>(shared: &Arc<Shared<T>>) -> Self {
        Self(Arc::as_ptr(shared) as *const () as usize)
    }
}

/// Common interface of the container variants
///
/// Hooks are written against this trait so they work with both the
/// synchronous [`Container`] and the asynchronous
/// [`AsyncContainer`](crate::AsyncContainer). `Completion` is what a set hands
/// back: `()` for the synchronous variant, an awaitable for the asynchronous
/// one.
pub trait StateContainer: Clone + Send + Sync + 'static {
    /// The stored value type
    type Value: Send + Sync + 'static;

    /// What a set operation returns
    type Completion;

    /// Identity of the underlying container
    fn id(&self) -> ContainerId;

    /// Current value (not reactive)
    fn get_value(&self) -> Arc<Self::Value>;

    /// Register a plain listener, deduplicated by `Arc` identity
    fn subscribe_listener(&self, listener: Listener<Self::Value>) -> SubscriptionHandle;

    /// Replace the value and notify subscribers
    fn set_value(&self, value: Arc<Self::Value>) -> Self::Completion;
}

/// A shared value with subscription support
pub struct Container<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Container<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Container<T> {
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

    /// Get the current value
    ///
    /// This is not reactive. Subscribe to hear about changes.
    pub fn get_value(&self) -> Arc<T> {
        self.shared.get()
    }

    /// Subscribe to whole-value changes
    ///
    /// The callback runs whenever a set stores a value that is not the same
    /// `Arc` as the previous one. Each call registers a new subscriber.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Arc<T>) + Send + Sync + 'static,
    {
        self.shared.insert(Subscriber::Plain(Arc::new(callback)))
    }

    /// Subscribe a shared listener
    ///
    /// Subscribing the same `Arc` twice keeps a single entry and returns a
    /// handle to it.
    pub fn subscribe_listener(&self, listener: Listener<T>) -> SubscriptionHandle {
        self.shared.insert_listener(listener)
    }

    /// Subscribe to changes of a selected part of the value
    ///
    /// The callback receives the new selection whenever it differs from the
    /// previous one according to `PartialEq`.
    pub fn selected_subscribe<P, S, F>(&self, selector: S, callback: F) -> SubscriptionHandle
    where
        P: PartialEq + Send + Sync + 'static,
        S: Fn(&T) -> P + Send + Sync + 'static,
        F: Fn(P) + Send + Sync + 'static,
    {
        self.selected_subscribe_inner(selector, callback, partial_eq())
    }

    /// Subscribe to a selected part of the value with a custom equality check
    ///
    /// `is_equal(prev, next)` returning `true` suppresses the notification.
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
        self.selected_subscribe_inner(selector, callback, Arc::new(is_equal))
    }

    fn selected_subscribe_inner<P, S, F>(
        &self,
        selector: S,
        callback: F,
        is_equal: EqualityFn<P>,
    ) -> SubscriptionHandle
    where
        P: Send + Sync + 'static,
        S: Fn(&T) -> P + Send + Sync + 'static,
        F: Fn(P) + Send + Sync + 'static,
    {
        let selection = Selection::new(selector, callback, is_equal);
        self.shared.insert(Subscriber::Selected(Box::new(selection)))
    }

    /// Replace the value and notify subscribers
    ///
    /// Passing the `Arc` returned by [`get_value`](Self::get_value) is a no-op
    /// for plain subscribers.
    pub fn set_value(&self, value: impl Into<Arc<T>>) {
        self.shared.replace(value.into());
    }

    /// Replace the value with a transform of the current one
    pub fn update<F, R>(&self, f: F)
    where
        F: FnOnce(&T) -> R,
        R: Into<Arc<T>>,
    {
        let current = self.shared.get();
        self.shared.replace(f(&current).into());
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

impl<T: Send + Sync + 'static> StateContainer for Container<T> {
    type Value = T;
    type Completion = ();

    fn id(&self) -> ContainerId {
        ContainerId::of(&self.shared)
    }

    fn get_value(&self) -> Arc<T> {
        self.shared.get()
    }

    fn subscribe_listener(&self, listener: Listener<T>) -> SubscriptionHandle {
        self.shared.insert_listener(listener)
    }

    fn set_value(&self, value: Arc<T>) {
        self.shared.replace(value);
    }
}

impl<T: fmt::Debug + Send + Sync + 'static> fmt::Debug for Container<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id())
            .field("value", &self.get_value())
            .field("version", &self.version())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<T: Default + Send + Sync + 'static> Default for Container<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Create a container holding `value`
pub fn create_container<T: Send + Sync + 'static>(value: T) -> Container<T> {
    Container::new(value)
}

/// Create a container whose value is produced by `init`
pub fn create_container_with<T, F>(init: F) -> Container<T>
where
    T: Send + Sync + 'static,
    F: FnOnce() -> T,
{
    Container::new_with(init)
}
