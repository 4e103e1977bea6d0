//! Runtime configuration

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which snapshot the external-store hooks read
///
/// `Client` reads the live snapshot and subscribes for changes. `Server`
/// reads the server snapshot and never subscribes, for one-shot rendering
/// where nothing can change after the render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Client,
    Server,
}

/// Runtime configuration
///
/// Every field has a default, so a partial TOML document is enough:
///
/// ```toml
/// render_mode = "server"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Snapshot strategy used by the external-store hooks
    pub render_mode: RenderMode,
    /// Maximum re-render passes per flush before giving up
    pub max_flush_passes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::Client,
            max_flush_passes: 16,
        }
    }
}

impl RuntimeConfig {
    /// Default configuration with server rendering
    pub fn server() -> Self {
        Self {
            render_mode: RenderMode::Server,
            ..Self::default()
        }
    }

    /// Parse a configuration from TOML
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
