//! Container hooks
//!
//! Read hooks subscribe the calling component to a container and return the
//! current value; the update hook returns a stable setter. All hooks accept
//! either container variant through [`StateContainer`].

use stash_core::{SetState, StateContainer};
use std::fmt;
use std::sync::Arc;

use crate::context::RenderContext;
use crate::external_store::{
    use_sync_external_store, use_sync_external_store_with_selector, StoreBindings,
};

/// Store bindings for a container, memoized on its identity
///
/// Rendering again with the same container returns the same bindings, so the
/// component keeps its subscription. A different container yields new
/// bindings and moves the subscription.
pub fn use_store_bindings<C>(cx: &mut RenderContext<'_>, container: &C) -> StoreBindings<C::Value>
where
    C: StateContainer,
{
    // The cached bindings hold a clone of the container, so its id cannot be
    // reused by another container while cached
    cx.use_memo(container.id(), || StoreBindings::from_container(container))
}

/// Read a container's value and re-render whenever it changes
pub fn use_value<C>(cx: &mut RenderContext<'_>, container: &C) -> Arc<C::Value>
where
    C: StateContainer,
{
    let bindings = use_store_bindings(cx, container);
    use_sync_external_store(cx, &bindings)
}

/// Read a value computed from a container
///
/// The component re-renders only when the computed value changes.
pub fn use_computed_value<C, P, F>(cx: &mut RenderContext<'_>, container: &C, compute: F) -> P
where
    C: StateContainer,
    P: PartialEq + Clone + Send + Sync + 'static,
    F: Fn(&C::Value) -> P + Send + Sync + 'static,
{
    use_computed_value_with(cx, container, compute, |a: &P, b: &P| a == b)
}

/// Read a value computed from a container, compared with `is_equal`
pub fn use_computed_value_with<C, P, F, E>(
    cx: &mut RenderContext<'_>,
    container: &C,
    compute: F,
    is_equal: E,
) -> P
where
    C: StateContainer,
    P: Clone + Send + Sync + 'static,
    F: Fn(&C::Value) -> P + Send + Sync + 'static,
    E: Fn(&P, &P) -> bool + Send + Sync + 'static,
{
    let bindings = use_store_bindings(cx, container);
    use_sync_external_store_with_selector(cx, &bindings, compute, is_equal)
}

/// Get a setter for a container
///
/// The returned [`Updater`] is the same instance across renders for as long
/// as the container is the same.
pub fn use_update<C>(cx: &mut RenderContext<'_>, container: &C) -> Updater<C>
where
    C: StateContainer,
{
    cx.use_memo(container.id(), || Updater::new(container.clone()))
}

/// Setter returned by [`use_update`]
///
/// Each call reads the container's current value at call time, so transforms
/// never see a stale value.
pub struct Updater<C> {
    container: Arc<C>,
}

impl<C: StateContainer> Updater<C> {
    /// Wrap a container in a new setter
    pub fn new(container: C) -> Self {
        Self {
            container: Arc::new(container),
        }
    }

    /// Replace the value
    pub fn set(&self, value: impl Into<Arc<C::Value>>) -> C::Completion {
        self.container.set_value(value.into())
    }

    /// Compute the next value from the current one
    pub fn update<F, R>(&self, f: F) -> C::Completion
    where
        F: FnOnce(&C::Value) -> R,
        R: Into<Arc<C::Value>>,
    {
        let next = f(&*self.container.get_value()).into();
        self.container.set_value(next)
    }

    /// Apply a replacement or a transform
    pub fn apply(&self, action: SetState<C::Value>) -> C::Completion {
        action.apply_to(&*self.container)
    }

    /// The container this updater writes to
    pub fn container(&self) -> &C {
        &self.container
    }

    /// Check whether both updaters are the same instance
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.container, &other.container)
    }
}

impl<C> Clone for Updater<C> {
    fn clone(&self) -> Self {
        Self {
            container: self.container.clone(),
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for Updater<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Updater")
            .field("container", &self.container)
            .finish()
    }
}
