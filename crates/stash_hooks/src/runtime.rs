//! Component runtime
//!
//! A minimal host for components that read stash containers. It owns the
//! mounted components, their hook slots, and the queue of components waiting
//! to re-render.
//!
//! Store notifications never render anything directly. They mark components
//! dirty, and [`Runtime::flush`] re-renders each dirty component once. All
//! changes made inside one [`Runtime::act`] therefore cost at most one render
//! per component:
//!
//! ```ignore
//! let runtime = Runtime::new();
//! let count = create_container(0);
//!
//! let view = runtime.mount({
//!     let count = count.clone();
//!     move |cx| *use_value(cx, &count)
//! })?;
//!
//! runtime.act(|| {
//!     count.set_value(1);
//!     count.set_value(2);
//! })?;
//!
//! assert_eq!(view.output(), Some(2));
//! assert_eq!(view.render_count(), 2);
//! ```

use slotmap::{new_key_type, SlotMap};
use std::any::Any;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::RuntimeConfig;
use crate::context::{HookSlot, Invalidator, RenderContext, Scheduler};
use crate::error::{Result, RuntimeError};

new_key_type! {
    /// Unique identifier for a mounted component
    pub struct ComponentId;
}

type RenderFn = Box<dyn FnMut(&mut RenderContext<'_>) -> Box<dyn Any + Send> + Send>;

/// Internal component storage
struct ComponentNode {
    /// Render function; `None` while the component is rendering
    render: Option<RenderFn>,
    /// Hook slots in call order
    hooks: Vec<HookSlot>,
    /// Output of the last render
    output: Option<Box<dyn Any + Send>>,
    render_count: usize,
}

struct RuntimeInner {
    config: RuntimeConfig,
    components: Mutex<SlotMap<ComponentId, ComponentNode>>,
    scheduler: Arc<Scheduler>,
    flushing: AtomicBool,
}

/// The component runtime
///
/// Cloning a runtime clones a handle to the same set of components.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime with the default configuration
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with a custom configuration
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                config,
                components: Mutex::new(SlotMap::with_key()),
                scheduler: Arc::new(Scheduler::default()),
                flushing: AtomicBool::new(false),
            }),
        }
    }

    /// The runtime configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Mount a component and render it once
    pub fn mount<V, F>(&self, mut render: F) -> Result<ComponentHandle<V>>
    where
        V: Send + 'static,
        F: FnMut(&mut RenderContext<'_>) -> V + Send + 'static,
    {
        let render: RenderFn = Box::new(move |cx: &mut RenderContext<'_>| {
            Box::new(render(cx)) as Box<dyn Any + Send>
        });
        let id = self.components().insert(ComponentNode {
            render: Some(render),
            hooks: Vec::new(),
            output: None,
            render_count: 0,
        });
        tracing::debug!(component = ?id, "component mounted");

        self.render(id)?;

        Ok(ComponentHandle {
            id,
            runtime: self.clone(),
            _marker: PhantomData,
        })
    }

    /// Unmount a component, releasing its hooks
    ///
    /// Dropping the hook slots unsubscribes every store the component
    /// subscribed to.
    pub fn unmount(&self, id: ComponentId) -> Result<()> {
        let node = self
            .components()
            .remove(id)
            .ok_or(RuntimeError::ComponentNotFound(id))?;
        self.inner.scheduler.cancel(id);

        // Drop outside the components lock; slot teardown talks to containers
        drop(node);
        tracing::debug!(component = ?id, "component unmounted");
        Ok(())
    }

    /// Re-render every dirty component once
    ///
    /// Components dirtied by those renders are picked up by further passes,
    /// up to `max_flush_passes`. Returns the number of renders performed.
    pub fn flush(&self) -> Result<usize> {
        if self.inner.flushing.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::Reentrant);
        }
        let _flushing = FlushingGuard(&self.inner.flushing);
        self.flush_passes()
    }

    fn flush_passes(&self) -> Result<usize> {
        let max_passes = self.inner.config.max_flush_passes;
        let mut renders = 0;
        let mut passes = 0;

        loop {
            let dirty = self.inner.scheduler.take();
            if dirty.is_empty() {
                break;
            }

            if passes == max_passes {
                tracing::warn!(passes, pending = dirty.len(), "flush did not settle");
                self.reschedule(&dirty);
                return Err(RuntimeError::FlushLimitExceeded { passes });
            }
            passes += 1;

            tracing::debug!(pass = passes, components = dirty.len(), "flush pass");
            for (index, &id) in dirty.iter().enumerate() {
                match panic::catch_unwind(AssertUnwindSafe(|| self.render(id))) {
                    Ok(Ok(())) => renders += 1,
                    // Unmounted after being scheduled
                    Ok(Err(RuntimeError::ComponentNotFound(_))) => {}
                    Ok(Err(err)) => {
                        self.reschedule(&dirty[index + 1..]);
                        return Err(err);
                    }
                    Err(payload) => {
                        self.reschedule(&dirty[index + 1..]);
                        panic::resume_unwind(payload);
                    }
                }
            }
        }

        Ok(renders)
    }

    /// Run `f`, then flush
    ///
    /// Every container change made inside `f` results in at most one
    /// re-render per affected component.
    pub fn act<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce() -> R,
    {
        let result = f();
        self.flush()?;
        Ok(result)
    }

    /// Put components taken from the queue back, ahead of anything newer
    fn reschedule(&self, ids: &[ComponentId]) {
        let pending = self.inner.scheduler.take();
        for &id in ids.iter().chain(&pending) {
            self.inner.scheduler.schedule(id);
        }
    }

    /// Check whether a component is waiting to re-render
    pub fn is_dirty(&self, id: ComponentId) -> bool {
        self.inner.scheduler.is_scheduled(id)
    }

    /// Number of mounted components
    pub fn component_count(&self) -> usize {
        self.components().len()
    }

    /// Render one component
    ///
    /// The render function and hook slots are taken out of the node for the
    /// duration of the render so that no runtime lock is held while user code
    /// runs. They are put back even if the render panics.
    fn render(&self, id: ComponentId) -> Result<()> {
        let (mut render, mut hooks, first_render) = {
            let mut components = self.components();
            let node = components
                .get_mut(id)
                .ok_or(RuntimeError::ComponentNotFound(id))?;
            let render = node.render.take().ok_or(RuntimeError::Reentrant)?;
            (render, std::mem::take(&mut node.hooks), node.render_count == 0)
        };

        let invalidator = Invalidator::new(&self.inner.scheduler, id);
        let slots_before = hooks.len();
        let mode = self.inner.config.render_mode;
        let output = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut cx = RenderContext::new(id, mode, &mut hooks, first_render, invalidator);
            let output = render(&mut cx);
            if cx.cursor() < slots_before {
                tracing::warn!(
                    component = ?id,
                    called = cx.cursor(),
                    expected = slots_before,
                    "render called fewer hooks than its first render"
                );
            }
            output
        }));

        let mut components = self.components();
        let Some(node) = components.get_mut(id) else {
            // Unmounted from inside its own render
            drop(components);
            drop(hooks);
            return match output {
                Ok(_) => Ok(()),
                Err(payload) => panic::resume_unwind(payload),
            };
        };
        node.render = Some(render);
        node.hooks = hooks;

        match output {
            Ok(output) => {
                node.output = Some(output);
                node.render_count += 1;
                tracing::trace!(component = ?id, renders = node.render_count, "component rendered");
                Ok(())
            }
            Err(payload) => {
                drop(components);
                tracing::error!(component = ?id, "component render panicked");
                panic::resume_unwind(payload)
            }
        }
    }

    fn output<V: Clone + 'static>(&self, id: ComponentId) -> Option<V> {
        self.components()
            .get(id)
            .and_then(|node| node.output.as_ref())
            .and_then(|output| output.downcast_ref::<V>().cloned())
    }

    fn render_count(&self, id: ComponentId) -> usize {
        self.components()
            .get(id)
            .map(|node| node.render_count)
            .unwrap_or(0)
    }

    fn components(&self) -> MutexGuard<'_, SlotMap<ComponentId, ComponentNode>> {
        self.inner
            .components
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the flushing flag when a flush ends, including by unwinding
struct FlushingGuard<'a>(&'a AtomicBool);

impl Drop for FlushingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("components", &self.component_count())
            .finish()
    }
}

/// Handle to a mounted component
///
/// `V` is the type the render function returns.
pub struct ComponentHandle<V> {
    id: ComponentId,
    runtime: Runtime,
    _marker: PhantomData<fn() -> V>,
}

impl<V: Clone + 'static> ComponentHandle<V> {
    /// Output of the last render, or `None` once unmounted
    pub fn output(&self) -> Option<V> {
        self.runtime.output(self.id)
    }
}

impl<V> ComponentHandle<V> {
    /// The component id
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Number of completed renders
    pub fn render_count(&self) -> usize {
        self.runtime.render_count(self.id)
    }

    /// Schedule a re-render on the next flush
    pub fn invalidate(&self) {
        self.runtime.inner.scheduler.schedule(self.id);
    }

    /// Unmount the component
    pub fn unmount(self) -> Result<()> {
        self.runtime.unmount(self.id)
    }
}

impl<V> std::fmt::Debug for ComponentHandle<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("id", &self.id)
            .field("render_count", &self.render_count())
            .finish()
    }
}
