//! Per-host listener storage and dispatch.
//!
//! [`ListenerRegistry`] is the standalone implementation behind the
//! [`Emitter`](crate::Emitter) capability. It maps event names to ordered
//! listener entries and never holds its lock while a callback runs, so
//! listeners are free to add, remove, or emit on the same registry.

use crate::config::{EmitterConfig, RemovalMatching};
use crate::error::{EmitterError, EmitterResult};
use crate::listener::{Callback, Context, ListenerEntry, WeakCallback};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

/// Meta-event broadcast after every successful `add_listener`.
pub const ADD_LISTENER_EVENT: &str = "_addListener";

/// Meta-event broadcast after every `remove_listener` call.
pub const REMOVE_LISTENER_EVENT: &str = "_removeListener";

/// Prefix marking internal events, skipped by `has_listener(None)`.
pub const INTERNAL_EVENT_PREFIX: char = '_';

#[derive(Debug, Default)]
struct RegistryState {
    /// Entries by event name. Keys stay once created, possibly empty.
    listeners: HashMap<String, Vec<ListenerEntry>>,

    config: EmitterConfig,

    /// Events already reported as over the listener limit.
    warned: HashSet<String>,
}

/// Listener storage owned by exactly one host.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    state: Arc<Mutex<RegistryState>>,
}

/// Registry handle that does not keep the registry alive.
#[derive(Debug, Clone)]
pub(crate) struct WeakRegistry {
    state: Weak<Mutex<RegistryState>>,
}

impl WeakRegistry {
    fn upgrade(&self) -> Option<ListenerRegistry> {
        self.state.upgrade().map(|state| ListenerRegistry { state })
    }
}

impl ListenerRegistry {
    /// Create an empty registry with the default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with the given config.
    pub fn with_config(config: EmitterConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState {
                config,
                ..RegistryState::default()
            })),
        }
    }

    /// Current config, including any `set_max_listeners` change.
    pub fn config(&self) -> EmitterConfig {
        self.state.lock().config.clone()
    }

    pub(crate) fn downgrade(&self) -> WeakRegistry {
        WeakRegistry {
            state: Arc::downgrade(&self.state),
        }
    }

    /// Append a listener to `event`, then broadcast `_addListener`.
    pub fn add_listener(
        &self,
        event: &str,
        callback: Callback,
        context: Option<Context>,
    ) -> EmitterResult<()> {
        if event.is_empty() {
            return Err(EmitterError::missing_parameter("event"));
        }

        let meta_events = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let max = state.config.max_listeners;

            let entries = state.listeners.entry(event.to_string()).or_default();
            entries.push(ListenerEntry::new(callback, context));
            let count = entries.len();

            if max > 0 && count > max && state.warned.insert(event.to_string()) {
                tracing::warn!(
                    event,
                    listeners = count,
                    max,
                    "Possible listener leak detected, raise max_listeners if this is intended"
                );
            }
            tracing::trace!(event, listeners = count, "Listener added");

            state.config.meta_events
        };

        if meta_events {
            self.emit(ADD_LISTENER_EVENT, &[Value::from(event)])?;
        }
        Ok(())
    }

    /// Drop the entries of `event` selected by the configured
    /// [`RemovalMatching`], then broadcast `_removeListener` regardless of
    /// whether anything matched.
    pub fn remove_listener(
        &self,
        event: &str,
        callback: Option<&Callback>,
        context: Option<&Context>,
    ) -> EmitterResult<()> {
        let meta_events = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let matching = state.config.removal_matching;

            if let Some(entries) = state.listeners.get_mut(event) {
                let before = entries.len();
                entries.retain(|entry| !entry.is_removed_by(matching, callback, context));
                tracing::trace!(
                    event,
                    removed = before - entries.len(),
                    listeners = entries.len(),
                    "Listeners removed"
                );

                if entries.len() <= state.config.max_listeners {
                    state.warned.remove(event);
                }
            }

            state.config.meta_events
        };

        if meta_events {
            self.emit(REMOVE_LISTENER_EVENT, &[Value::from(event)])?;
        }
        Ok(())
    }

    /// Clear one event, or every event when `event` is `None`. Keys are kept.
    ///
    /// Broadcasts `_removeListener` once per cleared name after the clear, to
    /// the `_removeListener` listeners registered before it.
    pub fn remove_all_listeners(&self, event: Option<&str>) -> EmitterResult<()> {
        let (cleared, notify) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            // Taken before the clear, which may empty this very list.
            let notify = if state.config.meta_events {
                state
                    .listeners
                    .get(REMOVE_LISTENER_EVENT)
                    .cloned()
                    .unwrap_or_default()
            } else {
                Vec::new()
            };

            let cleared = match event {
                Some(event) => {
                    if let Some(entries) = state.listeners.get_mut(event) {
                        entries.clear();
                    }
                    state.warned.remove(event);
                    vec![event.to_string()]
                }
                None => {
                    let mut names: Vec<String> = state
                        .listeners
                        .iter_mut()
                        .map(|(name, entries)| {
                            entries.clear();
                            name.clone()
                        })
                        .collect();
                    names.sort();
                    state.warned.clear();
                    names
                }
            };
            tracing::trace!(events = cleared.len(), "All listeners removed");

            (cleared, notify)
        };

        for name in cleared {
            dispatch(REMOVE_LISTENER_EVENT, &notify, &[Value::from(name)])?;
        }
        Ok(())
    }

    /// Whether `event` has listeners, or with `None` (or an empty name)
    /// whether any non-internal event does.
    pub fn has_listener(&self, event: Option<&str>) -> bool {
        let state = self.state.lock();
        match event.filter(|e| !e.is_empty()) {
            Some(event) => state
                .listeners
                .get(event)
                .is_some_and(|entries| !entries.is_empty()),
            None => state.listeners.iter().any(|(name, entries)| {
                !name.starts_with(INTERNAL_EVENT_PREFIX) && !entries.is_empty()
            }),
        }
    }

    /// Invoke every listener of `event` in registration order.
    ///
    /// Listeners run against a snapshot taken at call time; registry changes
    /// they make apply from the next emit on. The first listener error stops
    /// the dispatch and is returned.
    pub fn emit(&self, event: &str, args: &[Value]) -> EmitterResult<()> {
        let snapshot = {
            let state = self.state.lock();
            match state.listeners.get(event) {
                Some(entries) if !entries.is_empty() => entries.clone(),
                _ => return Ok(()),
            }
        };

        tracing::trace!(event, listeners = snapshot.len(), "Emitting event");
        dispatch(event, &snapshot, args)
    }

    /// Register `callback` to run on the next `event` only.
    ///
    /// The registered guard removes itself on its first call, before the
    /// wrapped callback runs.
    pub fn once(
        &self,
        event: &str,
        callback: Callback,
        context: Option<Context>,
    ) -> EmitterResult<()> {
        let registry = self.downgrade();
        let event_name = event.to_string();
        let guard_context = context.clone();
        let fired = AtomicBool::new(false);
        let this: Arc<OnceLock<WeakCallback>> = Arc::new(OnceLock::new());
        let guard_this = Arc::clone(&this);

        let guard = Callback::new(move |ctx: Option<&Context>, args: &[Value]| {
            let me = guard_this.get().and_then(WeakCallback::upgrade);
            if let (Some(registry), Some(me)) = (registry.upgrade(), me) {
                registry.remove_listener(&event_name, Some(&me), guard_context.as_ref())?;
            }
            if fired.swap(true, Ordering::SeqCst) {
                return Ok(());
            }
            callback.call(ctx, args)
        });
        let _ = this.set(guard.downgrade());

        self.add_listener(event, guard, context)
    }

    /// Number of entries currently registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.state
            .lock()
            .listeners
            .get(event)
            .map_or(0, |entries| entries.len())
    }

    /// Names with at least one listener, internal ones included, sorted.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .lock()
            .listeners
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Change the per-event warning threshold (0 = unlimited).
    pub fn set_max_listeners(&self, n: usize) {
        let mut state = self.state.lock();
        state.config.max_listeners = n;
        state.warned.clear();
    }

    /// Current per-event warning threshold.
    pub fn max_listeners(&self) -> usize {
        self.state.lock().config.max_listeners
    }

    /// How `remove_listener` selects entries.
    pub fn removal_matching(&self) -> RemovalMatching {
        self.state.lock().config.removal_matching
    }
}

/// Invoke `entries` in order, stopping at the first listener error.
fn dispatch(event: &str, entries: &[ListenerEntry], args: &[Value]) -> EmitterResult<()> {
    for entry in entries {
        if let Err(source) = entry.invoke(args) {
            tracing::debug!(event, error = %source, "Listener failed, dispatch aborted");
            return Err(EmitterError::Listener {
                event: event.to_string(),
                source,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, Callback) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let callback = Callback::new(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        (hits, callback)
    }

    #[test]
    fn test_add_and_count() {
        let registry = ListenerRegistry::new();
        let (_, a) = counter();
        let (_, b) = counter();

        registry.add_listener("test", a, None).unwrap();
        registry.add_listener("test", b, None).unwrap();

        assert_eq!(registry.listener_count("test"), 2);
        assert_eq!(registry.listener_count("other"), 0);
    }

    #[test]
    fn test_empty_event_rejected_before_mutation() {
        let registry = ListenerRegistry::new();
        let (_, cb) = counter();

        let err = registry.add_listener("", cb, None).unwrap_err();
        assert!(matches!(err, EmitterError::InvalidArgument(_)));
        assert!(registry.event_names().is_empty());
    }

    #[test]
    fn test_key_kept_after_removal() {
        let registry = ListenerRegistry::new();
        let (_, cb) = counter();

        registry.add_listener("test", cb.clone(), None).unwrap();
        registry.remove_listener("test", Some(&cb), None).unwrap();

        assert!(!registry.has_listener(Some("test")));
        assert!(registry.state.lock().listeners.contains_key("test"));
        assert!(registry.event_names().is_empty());
    }

    #[test]
    fn test_emit_snapshot_ignores_listeners_added_during_dispatch() {
        let registry = Arc::new(ListenerRegistry::new());
        let (late_hits, late) = counter();

        let weak = Arc::downgrade(&registry);
        let adder = Callback::new(move |_, _| {
            if let Some(registry) = weak.upgrade() {
                registry.add_listener("tick", late.clone(), None)?;
            }
            Ok(())
        });
        registry.add_listener("tick", adder, None).unwrap();

        registry.emit("tick", &[]).unwrap();
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);
        assert_eq!(registry.listener_count("tick"), 2);

        registry.emit("tick", &[]).unwrap();
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_once_guard_does_not_keep_registry_alive() {
        let registry = ListenerRegistry::new();
        let weak = registry.downgrade();
        let (_, cb) = counter();

        registry.once("test", cb, None).unwrap();
        drop(registry);

        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_max_listeners_warning_is_soft() {
        let registry = ListenerRegistry::with_config(EmitterConfig::default().with_max_listeners(2));

        for _ in 0..3 {
            let (_, cb) = counter();
            registry.add_listener("test", cb, None).unwrap();
        }

        assert_eq!(registry.listener_count("test"), 3);
        assert!(registry.state.lock().warned.contains("test"));

        registry.set_max_listeners(0);
        assert_eq!(registry.max_listeners(), 0);
        assert!(registry.state.lock().warned.is_empty());
    }

    #[test]
    fn test_meta_events_can_be_disabled() {
        let registry =
            ListenerRegistry::with_config(EmitterConfig::default().with_meta_events(false));
        let (meta_hits, meta) = counter();
        let (_, cb) = counter();

        registry.add_listener(ADD_LISTENER_EVENT, meta.clone(), None).unwrap();
        registry.add_listener(REMOVE_LISTENER_EVENT, meta, None).unwrap();
        registry.add_listener("test", cb.clone(), None).unwrap();
        registry.remove_listener("test", Some(&cb), None).unwrap();

        assert_eq!(meta_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_remove_all_listeners() {
        let registry = ListenerRegistry::new();
        for event in ["event1", "event1", "event2"] {
            let (_, cb) = counter();
            registry.add_listener(event, cb, None).unwrap();
        }

        registry.remove_all_listeners(Some("event1")).unwrap();
        assert_eq!(registry.listener_count("event1"), 0);
        assert_eq!(registry.listener_count("event2"), 1);

        registry.remove_all_listeners(None).unwrap();
        assert!(registry.event_names().is_empty());
        assert!(!registry.has_listener(None));
    }

    #[test]
    fn test_event_names_sorted_and_include_internal() {
        let registry = ListenerRegistry::new();
        for event in ["data", "_debug", "end"] {
            let (_, cb) = counter();
            registry.add_listener(event, cb, None).unwrap();
        }

        assert_eq!(registry.event_names(), vec!["_debug", "data", "end"]);
    }

    #[test]
    fn test_config_roundtrips_through_registry() {
        let config = EmitterConfig::default().with_removal_matching(RemovalMatching::Legacy);
        let registry = ListenerRegistry::with_config(config.clone());

        assert_eq!(registry.config(), config);
        assert_eq!(registry.removal_matching(), RemovalMatching::Legacy);
    }
}
