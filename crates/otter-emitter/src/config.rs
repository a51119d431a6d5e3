//! Emitter configuration.
//!
//! Loaded from TOML, every field optional:
//!
//! ```toml
//! max_listeners = 20
//! removal_matching = "legacy"
//! meta_events = false
//! ```

use crate::error::EmitterResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default maximum number of listeners per event before a leak warning.
pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// How `remove_listener` decides which entries to drop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalMatching {
    /// Drop entries whose callback is the given one and, when a context is
    /// given, whose context is that context.
    #[default]
    Exact,
    /// Keep an entry only if both the given callback and the given context
    /// differ from it. Removing by callback alone clears the event.
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitterConfig {
    /// Per-event listener count above which a warning is logged (0 = unlimited).
    #[serde(default = "default_max_listeners")]
    pub max_listeners: usize,

    #[serde(default)]
    pub removal_matching: RemovalMatching,

    /// Broadcast `_addListener` / `_removeListener` on registry changes.
    #[serde(default = "default_meta_events")]
    pub meta_events: bool,
}

fn default_max_listeners() -> usize {
    DEFAULT_MAX_LISTENERS
}

fn default_meta_events() -> bool {
    true
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            max_listeners: DEFAULT_MAX_LISTENERS,
            removal_matching: RemovalMatching::default(),
            meta_events: true,
        }
    }
}

impl EmitterConfig {
    pub fn with_max_listeners(mut self, n: usize) -> Self {
        self.max_listeners = n;
        self
    }

    pub fn with_removal_matching(mut self, matching: RemovalMatching) -> Self {
        self.removal_matching = matching;
        self
    }

    pub fn with_meta_events(mut self, enabled: bool) -> Self {
        self.meta_events = enabled;
        self
    }

    pub fn from_toml_str(contents: &str) -> EmitterResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> EmitterResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Load from a TOML file, or return defaults if it is missing or broken.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to load emitter config, using defaults");
                Self::default()
            }
        }
    }
}
