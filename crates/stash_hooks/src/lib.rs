//! Stash Hooks
//!
//! Component-side bindings for [`stash_core`] containers:
//!
//! - **Runtime**: mounts components, stores their hook slots and batches
//!   re-renders ([`Runtime`], [`RenderContext`])
//! - **External stores**: the subscribe / snapshot contract hooks are built on
//!   ([`use_sync_external_store`], [`use_sync_external_store_with_selector`])
//! - **Container hooks**: [`use_value`], [`use_computed_value`] and
//!   [`use_update`]
//!
//! # Example
//!
//! ```rust
//! use stash_hooks::{create_container, use_update, use_value, Runtime};
//!
//! let runtime = Runtime::new();
//! let count = create_container(42);
//!
//! let view = runtime
//!     .mount({
//!         let count = count.clone();
//!         move |cx| {
//!             let value = use_value(cx, &count);
//!             let update = use_update(cx, &count);
//!             (*value, update)
//!         }
//!     })
//!     .unwrap();
//!
//! let (value, update) = view.output().unwrap();
//! assert_eq!(value, 42);
//!
//! runtime.act(|| update.update(|v| v + 1)).unwrap();
//! assert_eq!(view.output().unwrap().0, 43);
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod external_store;
pub mod hooks;
pub mod runtime;

pub use config::{RenderMode, RuntimeConfig};
pub use context::{Invalidator, RenderContext};
pub use error::{Result, RuntimeError};
pub use external_store::{
    use_sync_external_store, use_sync_external_store_with_selector, OnStoreChange, SnapshotFn,
    StoreBindings, SubscribeFn,
};
pub use hooks::{
    use_computed_value, use_computed_value_with, use_store_bindings, use_update, use_value,
    Updater,
};
pub use runtime::{ComponentHandle, ComponentId, Runtime};

pub use stash_core::{
    create_async_container, create_container, AsyncContainer, Container, SetState,
    StateContainer,
};
