//! Listener entries and the callback/context handles they are built from.
//!
//! Both [`Callback`] and [`Context`] are shared handles compared by identity:
//! two clones of the same handle are "the same listener" for removal, while
//! two separately created handles never are, even if they wrap equal values.

use crate::config::RemovalMatching;
use crate::error::ListenerResult;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

type CallbackFn = dyn Fn(Option<&Context>, &[Value]) -> ListenerResult + Send + Sync;

/// A listener callback.
///
/// Invoked with the context it was registered with (if any) and the
/// arguments passed to `emit`.
#[derive(Clone)]
pub struct Callback(Arc<CallbackFn>);

impl Callback {
    /// Wrap a closure as a new, distinct callback.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Option<&Context>, &[Value]) -> ListenerResult + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the callback directly.
    pub fn call(&self, context: Option<&Context>, args: &[Value]) -> ListenerResult {
        (self.0)(context, args)
    }

    /// Whether both handles refer to the same callback.
    pub fn ptr_eq(&self, other: &Callback) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> WeakCallback {
        WeakCallback(Arc::downgrade(&self.0))
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Arc::as_ptr(&self.0))
    }
}

/// Non-owning handle used by once-guards to refer to themselves.
pub(crate) struct WeakCallback(Weak<CallbackFn>);

impl WeakCallback {
    pub(crate) fn upgrade(&self) -> Option<Callback> {
        self.0.upgrade().map(Callback)
    }
}

/// The receiver a callback runs against.
#[derive(Clone)]
pub struct Context(Arc<dyn Any + Send + Sync>);

impl Context {
    /// Move `value` into a new, distinct context.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Wrap an existing shared value without copying it.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(value)
    }

    /// Borrow the context value as `T`, if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.0).downcast_ref::<T>()
    }

    /// Whether both handles refer to the same context value.
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Context({:p})", Arc::as_ptr(&self.0))
    }
}

/// A registered `(callback, context)` pair. Never mutated after creation.
#[derive(Debug, Clone)]
pub(crate) struct ListenerEntry {
    callback: Callback,
    context: Option<Context>,
}

impl ListenerEntry {
    pub(crate) fn new(callback: Callback, context: Option<Context>) -> Self {
        Self { callback, context }
    }

    /// Run the callback against this entry's context.
    pub(crate) fn invoke(&self, args: &[Value]) -> ListenerResult {
        self.callback.call(self.context.as_ref(), args)
    }

    /// Whether a `remove_listener(callback, context)` request drops this entry.
    pub(crate) fn is_removed_by(
        &self,
        matching: RemovalMatching,
        callback: Option<&Callback>,
        context: Option<&Context>,
    ) -> bool {
        match matching {
            RemovalMatching::Exact => {
                let Some(callback) = callback else {
                    return false;
                };
                self.callback.ptr_eq(callback)
                    && context.is_none_or(|ctx| self.same_context(ctx))
            }
            // Kept only when both a differing callback and a differing
            // context were supplied; everything else goes.
            RemovalMatching::Legacy => {
                let callback_differs = callback.is_some_and(|cb| !self.callback.ptr_eq(cb));
                let context_differs = context.is_some_and(|ctx| !self.same_context(ctx));
                !(callback_differs && context_differs)
            }
        }
    }

    fn same_context(&self, other: &Context) -> bool {
        self.context.as_ref().is_some_and(|own| own.ptr_eq(other))
    }
}
