//! External-store subscription primitive
//!
//! The host-side contract that lets components read state living outside the
//! runtime. A store is described by three callbacks bundled in
//! [`StoreBindings`]:
//!
//! - `subscribe(on_store_change)` registers a change callback and returns a
//!   handle to cancel it
//! - `get_snapshot()` reads the current value
//! - `get_server_snapshot()` reads the value used for server rendering
//!
//! [`use_sync_external_store`] returns the snapshot and re-renders the
//! component when a different snapshot (by `Arc` identity) is published.
//! [`use_sync_external_store_with_selector`] additionally projects the
//! snapshot and only re-renders when the projection changes according to an
//! equality function.
//!
//! The subscription is tied to the identity of the bindings: rendering again
//! with the same bindings keeps the subscription, passing different bindings
//! moves it. Bindings are therefore meant to be memoized, see
//! [`use_store_bindings`](crate::hooks::use_store_bindings).

use stash_core::{EqualityFn, StateContainer, SubscriptionHandle};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::config::RenderMode;
use crate::context::{Invalidator, RenderContext};

/// Callback handed to a store's subscribe function
pub type OnStoreChange = Arc<dyn Fn() + Send + Sync>;

/// Registers an [`OnStoreChange`] callback with a store
pub type SubscribeFn = Arc<dyn Fn(OnStoreChange) -> SubscriptionHandle + Send + Sync>;

/// Reads a snapshot of a store
pub type SnapshotFn<T> = Arc<dyn Fn() -> Arc<T> + Send + Sync>;

/// Projects a snapshot to the part a component renders
pub type SelectorFn<T, P> = Arc<dyn Fn(&Arc<T>) -> P + Send + Sync>;

/// The three callbacks describing an external store
pub struct StoreBindings<T> {
    pub subscribe: SubscribeFn,
    pub get_snapshot: SnapshotFn<T>,
    pub get_server_snapshot: SnapshotFn<T>,
}

impl<T> Clone for StoreBindings<T> {
    fn clone(&self) -> Self {
        Self {
            subscribe: self.subscribe.clone(),
            get_snapshot: self.get_snapshot.clone(),
            get_server_snapshot: self.get_server_snapshot.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> StoreBindings<T> {
    /// Bundle store callbacks
    pub fn new(
        subscribe: SubscribeFn,
        get_snapshot: SnapshotFn<T>,
        get_server_snapshot: SnapshotFn<T>,
    ) -> Self {
        Self {
            subscribe,
            get_snapshot,
            get_server_snapshot,
        }
    }

    /// Bind a container
    ///
    /// The server snapshot is the same as the client snapshot: containers
    /// have no separate server-side value.
    pub fn from_container<C>(container: &C) -> Self
    where
        C: StateContainer<Value = T>,
    {
        let subscriber = container.clone();
        let subscribe: SubscribeFn = Arc::new(move |on_change: OnStoreChange| {
            subscriber.subscribe_listener(Arc::new(move |_: &Arc<T>| on_change()))
        });

        let reader = container.clone();
        let get_snapshot: SnapshotFn<T> = Arc::new(move || reader.get_value());

        Self {
            subscribe,
            get_server_snapshot: get_snapshot.clone(),
            get_snapshot,
        }
    }

    /// Check whether both bindings are the same callbacks
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.subscribe, &other.subscribe)
            && Arc::ptr_eq(&self.get_snapshot, &other.get_snapshot)
    }

    fn snapshot(&self, mode: RenderMode) -> Arc<T> {
        match mode {
            RenderMode::Client => (self.get_snapshot)(),
            RenderMode::Server => (self.get_server_snapshot)(),
        }
    }
}

/// Read a store and re-render when its snapshot changes
pub fn use_sync_external_store<T>(cx: &mut RenderContext<'_>, bindings: &StoreBindings<T>) -> Arc<T>
where
    T: Send + Sync + 'static,
{
    let select: SelectorFn<T, Arc<T>> = Arc::new(|snapshot: &Arc<T>| snapshot.clone());
    let is_equal: EqualityFn<Arc<T>> = Arc::new(|a: &Arc<T>, b: &Arc<T>| Arc::ptr_eq(a, b));
    use_external_store(cx, bindings, select, is_equal)
}

/// Read a projection of a store and re-render when the projection changes
///
/// `is_equal(prev, next)` returning `true` keeps the previous projection and
/// skips the re-render. The selector and equality function of the latest
/// render are the ones used to judge later store changes.
pub fn use_sync_external_store_with_selector<T, P, S, E>(
    cx: &mut RenderContext<'_>,
    bindings: &StoreBindings<T>,
    selector: S,
    is_equal: E,
) -> P
where
    T: Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
    S: Fn(&T) -> P + Send + Sync + 'static,
    E: Fn(&P, &P) -> bool + Send + Sync + 'static,
{
    let select: SelectorFn<T, P> = Arc::new(move |snapshot: &Arc<T>| selector(&**snapshot));
    use_external_store(cx, bindings, select, Arc::new(is_equal))
}

/// Last rendered selection, shared with the change callback
struct Selection<T, P> {
    select: SelectorFn<T, P>,
    is_equal: EqualityFn<P>,
    snapshot: Option<Arc<T>>,
    selected: Option<P>,
}

impl<T, P: Clone> Selection<T, P> {
    /// Copy out what is needed to select without holding the lock
    fn selector(&self) -> Selector<T, P> {
        Selector {
            select: self.select.clone(),
            is_equal: self.is_equal.clone(),
            previous: self.selected.clone(),
        }
    }
}

struct Selector<T, P> {
    select: SelectorFn<T, P>,
    is_equal: EqualityFn<P>,
    previous: Option<P>,
}

impl<T, P> Selector<T, P> {
    /// Select from `snapshot`, keeping the previous selection if it is equal
    ///
    /// The flag is `true` when the selection changed.
    fn run(self, snapshot: &Arc<T>) -> (P, bool) {
        let next = (self.select)(snapshot);
        match self.previous {
            Some(prev) if (self.is_equal)(&prev, &next) => (prev, false),
            _ => (next, true),
        }
    }
}

/// Hook slot of one external-store read
struct ExternalStoreSlot<T, P> {
    selection: Arc<Mutex<Selection<T, P>>>,
    bindings: Option<StoreBindings<T>>,
    subscription: SubscriptionHandle,
}

impl<T, P> ExternalStoreSlot<T, P> {
    fn new(select: SelectorFn<T, P>, is_equal: EqualityFn<P>) -> Self {
        Self {
            selection: Arc::new(Mutex::new(Selection {
                select,
                is_equal,
                snapshot: None,
                selected: None,
            })),
            bindings: None,
            subscription: SubscriptionHandle::detached(),
        }
    }
}

impl<T, P> Drop for ExternalStoreSlot<T, P> {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

fn lock<T, P>(selection: &Mutex<Selection<T, P>>) -> MutexGuard<'_, Selection<T, P>> {
    selection.lock().unwrap_or_else(PoisonError::into_inner)
}

fn use_external_store<T, P>(
    cx: &mut RenderContext<'_>,
    bindings: &StoreBindings<T>,
    select: SelectorFn<T, P>,
    is_equal: EqualityFn<P>,
) -> P
where
    T: Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    let mode = cx.render_mode();
    let invalidator = cx.invalidator();
    let slot = cx.slot(|| ExternalStoreSlot::new(select.clone(), is_equal.clone()));

    let snapshot = bindings.snapshot(mode);

    // The selector runs without the lock held
    let selector = {
        let mut selection = lock(&slot.selection);
        selection.select = select;
        selection.is_equal = is_equal;
        selection.selector()
    };
    let (selected, _) = selector.run(&snapshot);

    {
        let mut selection = lock(&slot.selection);
        selection.snapshot = Some(snapshot.clone());
        selection.selected = Some(selected.clone());
    }

    if mode == RenderMode::Client {
        let rebind = match &slot.bindings {
            Some(current) => !current.same_as(bindings),
            None => true,
        };
        if rebind {
            slot.subscription.unsubscribe();
            let on_change = store_change_callback(
                Arc::downgrade(&slot.selection),
                bindings.get_snapshot.clone(),
                invalidator.clone(),
            );
            slot.subscription = (bindings.subscribe)(on_change);
            slot.bindings = Some(bindings.clone());
            tracing::trace!(component = ?invalidator.component(), "store subscribed");

            // A change could have landed between reading and subscribing
            if !Arc::ptr_eq(&(bindings.get_snapshot)(), &snapshot) {
                invalidator.invalidate();
            }
        }
    }

    selected
}

/// Build the callback that decides whether a store change needs a re-render
fn store_change_callback<T, P>(
    selection: Weak<Mutex<Selection<T, P>>>,
    get_snapshot: SnapshotFn<T>,
    invalidator: Invalidator,
) -> OnStoreChange
where
    T: Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    Arc::new(move || {
        let Some(selection) = selection.upgrade() else {
            return;
        };
        let snapshot = get_snapshot();

        let selector = {
            let selection = lock(&selection);
            if let Some(rendered) = &selection.snapshot {
                if Arc::ptr_eq(rendered, &snapshot) {
                    return;
                }
            }
            selection.selector()
        };

        let (_, changed) = selector.run(&snapshot);
        if changed {
            invalidator.invalidate();
        }
    })
}
