//! The emitter capability.
//!
//! Any type becomes an event source by handing out a [`ListenerRegistry`]:
//!
//! ```
//! use otter_emitter::{impl_emitter, Callback, Emitter, ListenerRegistry};
//!
//! #[derive(Default)]
//! struct Socket {
//!     events: ListenerRegistry,
//! }
//!
//! impl_emitter!(Socket, events);
//!
//! let socket = Socket::default();
//! socket
//!     .on("close", Callback::new(|_, _| Ok(())), None)?
//!     .emit("close", &[])?;
//! # Ok::<(), otter_emitter::EmitterError>(())
//! ```

use crate::config::EmitterConfig;
use crate::error::EmitterResult;
use crate::listener::{Callback, Context};
use crate::registry::ListenerRegistry;
use serde_json::Value;

/// Event source behavior shared by every host.
///
/// Implementors only provide [`Emitter::registry`]; each host must own its
/// registry so listeners never leak between instances.
pub trait Emitter {
    /// The registry owned by this host.
    fn registry(&self) -> &ListenerRegistry;

    /// Register `callback` for `event`, optionally bound to `context`.
    fn add_listener(
        &self,
        event: &str,
        callback: Callback,
        context: Option<Context>,
    ) -> EmitterResult<&Self> {
        self.registry().add_listener(event, callback, context)?;
        Ok(self)
    }

    /// Alias of [`Emitter::add_listener`].
    fn on(&self, event: &str, callback: Callback, context: Option<Context>) -> EmitterResult<&Self> {
        self.add_listener(event, callback, context)
    }

    /// Drop the listeners on `event` matched by `callback` and `context`.
    fn remove_listener(
        &self,
        event: &str,
        callback: Option<&Callback>,
        context: Option<&Context>,
    ) -> EmitterResult<&Self> {
        self.registry().remove_listener(event, callback, context)?;
        Ok(self)
    }

    /// Alias of [`Emitter::remove_listener`].
    fn off(
        &self,
        event: &str,
        callback: Option<&Callback>,
        context: Option<&Context>,
    ) -> EmitterResult<&Self> {
        self.remove_listener(event, callback, context)
    }

    /// Clear one event, or every event when `event` is `None`.
    fn remove_all_listeners(&self, event: Option<&str>) -> EmitterResult<&Self> {
        self.registry().remove_all_listeners(event)?;
        Ok(self)
    }

    /// Whether `event` (or any public event, for `None`) has listeners.
    fn has_listener(&self, event: Option<&str>) -> bool {
        self.registry().has_listener(event)
    }

    /// Call every listener of `event` in registration order.
    fn emit(&self, event: &str, args: &[Value]) -> EmitterResult<&Self> {
        self.registry().emit(event, args)?;
        Ok(self)
    }

    /// Register a listener that removes itself after its first call.
    fn once(&self, event: &str, callback: Callback, context: Option<Context>) -> EmitterResult<&Self> {
        self.registry().once(event, callback, context)?;
        Ok(self)
    }

    /// Number of listeners registered for `event`.
    fn listener_count(&self, event: &str) -> usize {
        self.registry().listener_count(event)
    }

    /// Names of events that currently have listeners.
    fn event_names(&self) -> Vec<String> {
        self.registry().event_names()
    }

    /// Change the soft listener limit that triggers a warning.
    fn set_max_listeners(&self, n: usize) -> &Self {
        self.registry().set_max_listeners(n);
        self
    }

    /// The current soft listener limit.
    fn max_listeners(&self) -> usize {
        self.registry().max_listeners()
    }
}

/// Implement [`Emitter`] for a struct by pointing at its registry field.
#[macro_export]
macro_rules! impl_emitter {
    ($host:ty, $field:ident) => {
        impl $crate::Emitter for $host {
            fn registry(&self) -> &$crate::ListenerRegistry {
                &self.$field
            }
        }
    };
}

/// Free-standing event emitter.
#[derive(Debug, Default)]
pub struct EventEmitter {
    registry: ListenerRegistry,
}

impl EventEmitter {
    /// Create an emitter with the default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an emitter with the given config.
    pub fn with_config(config: EmitterConfig) -> Self {
        Self {
            registry: ListenerRegistry::with_config(config),
        }
    }
}

crate::impl_emitter!(EventEmitter, registry);
