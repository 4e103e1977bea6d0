//! Error types for stash_hooks

use thiserror::Error;

use crate::runtime::ComponentId;

/// Errors that can occur while driving components
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The component was never mounted or has been unmounted
    #[error("Component not found: {0:?}")]
    ComponentNotFound(ComponentId),

    /// Re-renders kept scheduling more re-renders
    #[error("Flush did not settle after {passes} passes")]
    FlushLimitExceeded {
        /// Number of passes that ran before giving up
        passes: usize,
    },

    /// A flush or render was requested from inside a render
    #[error("Render requested while a render is in progress")]
    Reentrant,

    /// Failed to parse a runtime configuration
    #[error("Invalid runtime config: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for stash_hooks operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
