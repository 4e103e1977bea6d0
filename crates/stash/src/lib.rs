//! Stash
//!
//! Shared state containers and the hooks that read them.
//!
//! The `core` feature re-exports [`stash_core`] (containers), the `hooks`
//! feature re-exports [`stash_hooks`] (component runtime and hooks). Both are
//! on by default.

#[cfg(feature = "core")]
pub use stash_core;

#[cfg(feature = "hooks")]
pub use stash_hooks;

#[cfg(feature = "core")]
pub use stash_core::{
    create_async_container, create_async_container_with, create_container,
    create_container_with, AsyncContainer, Container, Notified, SetState, StateContainer,
    SubscriptionHandle,
};

#[cfg(feature = "hooks")]
pub use stash_hooks::{
    use_computed_value, use_computed_value_with, use_update, use_value, ComponentHandle,
    RenderContext, Runtime, RuntimeConfig, Updater,
};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a global `tracing` subscriber
///
/// Filtering follows `RUST_LOG` and falls back to `info`. Fails if a global
/// subscriber is already installed.
pub fn init_logging() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer())
        .try_init()?;
    tracing::debug!("logging initialized");
    Ok(())
}
