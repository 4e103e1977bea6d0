//! Stash Core
//!
//! Shared state containers for component-based UIs:
//!
//! - **Containers**: one mutable value, many subscribers
//! - **Selected subscriptions**: hear only about changes to a derived value
//! - **Sync and async variants**: [`Container`] returns nothing from a set,
//!   [`AsyncContainer`] returns a future that resolves after notification
//!
//! Plain subscribers are gated on value identity: a set that stores the same
//! `Arc` as before is silent, while a rebuilt value notifies even if it is
//! structurally equal.
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use std::sync::Arc;
//! use stash_core::create_container;
//!
//! let count = create_container(42);
//! let seen = Arc::new(AtomicI32::new(0));
//!
//! let seen_clone = seen.clone();
//! let handle = count.subscribe(move |v| seen_clone.store(**v, Ordering::SeqCst));
//!
//! count.update(|v| v + 1);
//! assert_eq!(*count.get_value(), 43);
//! assert_eq!(seen.load(Ordering::SeqCst), 43);
//!
//! handle.unsubscribe();
//! ```

pub mod async_container;
pub mod container;
pub mod set_state;
pub mod subscriber;
pub mod subscription;

mod shared;

pub use async_container::{
    create_async_container, create_async_container_with, AsyncContainer, Notified,
};
pub use container::{create_container, create_container_with, Container, ContainerId, StateContainer};
pub use set_state::{SetState, Transform};
pub use subscriber::{EqualityFn, Listener};
pub use subscription::{SubscriptionHandle, SubscriptionId};
