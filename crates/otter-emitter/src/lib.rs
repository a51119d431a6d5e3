//! Otter Emitter - observer capability for any host type
//!
//! Gives a type per-instance listener storage and synchronous dispatch:
//! register callbacks against named events (optionally bound to a context),
//! then broadcast to them in registration order.
//!
//! # Usage
//!
//! ```
//! use otter_emitter::{Callback, Context, Emitter, EventEmitter};
//! use serde_json::json;
//!
//! let emitter = EventEmitter::new();
//!
//! emitter.on("data", Callback::new(|ctx, args| {
//!     let owner = ctx.and_then(|c| c.downcast_ref::<&str>());
//!     println!("{owner:?} got {args:?}");
//!     Ok(())
//! }), Some(Context::new("reader")))?;
//!
//! emitter.emit("data", &[json!(1), json!(2)])?;
//! assert!(emitter.has_listener(Some("data")));
//! # Ok::<(), otter_emitter::EmitterError>(())
//! ```
//!
//! # Meta-events
//!
//! Every `add_listener` broadcasts [`ADD_LISTENER_EVENT`] and every
//! `remove_listener` broadcasts [`REMOVE_LISTENER_EVENT`], both carrying the
//! event name. Names starting with `_` are internal and are ignored by
//! `has_listener(None)`.

mod config;
mod emitter;
mod error;
mod listener;
mod registry;

pub use config::{DEFAULT_MAX_LISTENERS, EmitterConfig, RemovalMatching};
pub use emitter::{Emitter, EventEmitter};
pub use error::{EmitterError, EmitterResult, ListenerError, ListenerResult};
pub use listener::{Callback, Context};
pub use registry::{
    ADD_LISTENER_EVENT, INTERNAL_EVENT_PREFIX, ListenerRegistry, REMOVE_LISTENER_EVENT,
};
