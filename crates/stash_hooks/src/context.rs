//! Render context and hook slots
//!
//! Hooks are identified by call order, like in React: the n-th hook called
//! during a render owns the n-th slot of the component. Slots are stored
//! type-erased and checked on every access, so calling hooks conditionally is
//! caught instead of silently handing one hook another hook's state.
//!
//! Slots are plain values; anything a slot must release on unmount (such as a
//! store subscription) is released by its `Drop` impl.

use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;
use std::any::{type_name, Any};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::config::RenderMode;
use crate::runtime::ComponentId;

/// Type-erased hook slot
pub(crate) type HookSlot = Box<dyn Any + Send>;

/// Queue of components waiting to re-render, in scheduling order
#[derive(Default)]
pub(crate) struct Scheduler {
    dirty: Mutex<IndexSet<ComponentId, FxBuildHasher>>,
}

impl Scheduler {
    pub(crate) fn schedule(&self, component: ComponentId) -> bool {
        self.dirty().insert(component)
    }

    pub(crate) fn cancel(&self, component: ComponentId) {
        self.dirty().shift_remove(&component);
    }

    pub(crate) fn take(&self) -> Vec<ComponentId> {
        self.dirty().drain(..).collect()
    }

    pub(crate) fn is_scheduled(&self, component: ComponentId) -> bool {
        self.dirty().contains(&component)
    }

    fn dirty(&self) -> MutexGuard<'_, IndexSet<ComponentId, FxBuildHasher>> {
        self.dirty.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Schedules a re-render of one component
///
/// Cheap to clone and safe to call from store callbacks. Does nothing once the
/// runtime has been dropped.
#[derive(Clone)]
pub struct Invalidator {
    scheduler: Weak<Scheduler>,
    component: ComponentId,
}

impl Invalidator {
    pub(crate) fn new(scheduler: &Arc<Scheduler>, component: ComponentId) -> Self {
        Self {
            scheduler: Arc::downgrade(scheduler),
            component,
        }
    }

    /// Mark the component dirty; it re-renders on the next flush
    pub fn invalidate(&self) {
        if let Some(scheduler) = self.scheduler.upgrade() {
            if scheduler.schedule(self.component) {
                tracing::trace!(component = ?self.component, "component scheduled");
            }
        }
    }

    /// The component this invalidator schedules
    pub fn component(&self) -> ComponentId {
        self.component
    }
}

impl std::fmt::Debug for Invalidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invalidator")
            .field("component", &self.component)
            .finish()
    }
}

/// Context handed to a component's render function
///
/// All hooks take `&mut RenderContext` as their first argument.
pub struct RenderContext<'a> {
    component: ComponentId,
    mode: RenderMode,
    hooks: &'a mut Vec<HookSlot>,
    cursor: usize,
    first_render: bool,
    invalidator: Invalidator,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(
        component: ComponentId,
        mode: RenderMode,
        hooks: &'a mut Vec<HookSlot>,
        first_render: bool,
        invalidator: Invalidator,
    ) -> Self {
        Self {
            component,
            mode,
            hooks,
            cursor: 0,
            first_render,
            invalidator,
        }
    }

    /// The component being rendered
    pub fn component_id(&self) -> ComponentId {
        self.component
    }

    /// Snapshot strategy of the runtime
    pub fn render_mode(&self) -> RenderMode {
        self.mode
    }

    /// Handle that schedules a re-render of this component
    pub fn invalidator(&self) -> Invalidator {
        self.invalidator.clone()
    }

    /// Claim the next hook slot, creating it with `init` on the first render
    ///
    /// # Panics
    ///
    /// Panics if the slot holds a different type than on the previous render,
    /// or if more hooks are called than on the first render. Both mean hooks
    /// were called conditionally.
    pub fn slot<S, F>(&mut self, init: F) -> &mut S
    where
        S: Any + Send,
        F: FnOnce() -> S,
    {
        let index = self.cursor;
        self.cursor += 1;

        if index == self.hooks.len() {
            if !self.first_render {
                panic!(
                    "component {:?} called more hooks than during its first render (slot {index})",
                    self.component
                );
            }
            self.hooks.push(Box::new(init()));
        }

        let component = self.component;
        match self.hooks[index].downcast_mut::<S>() {
            Some(slot) => slot,
            None => panic!(
                "component {component:?} hook slot {index} is not a {}; hooks must be called in the same order on every render",
                type_name::<S>()
            ),
        }
    }

    /// Memoize a value on a key
    ///
    /// `init` runs on the first render and whenever `key` differs from the
    /// key of the previous render. Otherwise the cached value is cloned out.
    pub fn use_memo<K, V, F>(&mut self, key: K, init: F) -> V
    where
        K: PartialEq + Send + 'static,
        V: Clone + Send + 'static,
        F: FnOnce() -> V,
    {
        let slot = self.slot::<Option<MemoSlot<K, V>>, _>(|| None);
        if let Some(memo) = slot.as_ref() {
            if memo.key == key {
                return memo.value.clone();
            }
        }

        let value = init();
        *slot = Some(MemoSlot {
            key,
            value: value.clone(),
        });
        value
    }

    /// Number of hook slots claimed so far in this render
    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }
}

struct MemoSlot<K, V> {
    key: K,
    value: V,
}
