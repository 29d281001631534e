//! Callback registry
//!
//! Holds the active [`CallbackSet`]. Registration replaces the whole set at
//! once and cannot fail; the registry does not check that the set is complete.
//!
//! Callers are expected to register before any handle using the protocol is
//! opened and to leave the registry alone while handles are open. A handle
//! dispatching in [`DispatchMode::Live`](crate::config::DispatchMode::Live)
//! sees whatever set is current at the time of each call, so re-registering
//! mid-stream makes later calls on an already-open handle run against the new
//! set.

use crate::callbacks::{
    CallbackSet, CloseCallback, OpenCallback, ReadCallback, SeekCallback, WriteCallback,
};
use once_cell::sync::Lazy;
use std::sync::{Arc, RwLock};

/// Source of the currently active callbacks
pub trait CallbackProvider: Send + Sync {
    /// The set in effect right now
    fn current(&self) -> Arc<CallbackSet>;
}

/// A replaceable callback set
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    active: RwLock<Arc<CallbackSet>>,
}

impl CallbackRegistry {
    /// Create a registry with every slot unregistered
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that starts out with `callbacks`
    pub fn with_callbacks(callbacks: CallbackSet) -> Self {
        Self {
            active: RwLock::new(Arc::new(callbacks)),
        }
    }

    /// Replace every slot, including with unregistered ones
    pub fn set(&self, callbacks: CallbackSet) {
        log::debug!("Registering memory protocol callbacks: {:?}", callbacks);
        let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
        *active = Arc::new(callbacks);
    }

    /// Unregister every slot
    pub fn reset(&self) {
        log::debug!("Clearing memory protocol callbacks");
        let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
        *active = Arc::new(CallbackSet::default());
    }
}

impl CallbackProvider for CallbackRegistry {
    fn current(&self) -> Arc<CallbackSet> {
        let active = self.active.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&active)
    }
}

impl<P: CallbackProvider + ?Sized> CallbackProvider for Arc<P> {
    fn current(&self) -> Arc<CallbackSet> {
        (**self).current()
    }
}

impl<P: CallbackProvider + ?Sized> CallbackProvider for &'static P {
    fn current(&self) -> Arc<CallbackSet> {
        (**self).current()
    }
}

static GLOBAL_REGISTRY: Lazy<CallbackRegistry> = Lazy::new(CallbackRegistry::new);

/// The process-wide registry used by [`MemoryProtocol::legacy`](crate::MemoryProtocol::legacy)
pub fn global_registry() -> &'static CallbackRegistry {
    &GLOBAL_REGISTRY
}

/// Replace the process-wide callbacks; any argument may be `None`
pub fn register_callbacks(
    open: Option<OpenCallback>,
    read: Option<ReadCallback>,
    write: Option<WriteCallback>,
    seek: Option<SeekCallback>,
    close: Option<CloseCallback>,
) {
    set_callbacks(CallbackSet {
        open,
        read,
        write,
        seek,
        close,
    });
}

/// Replace the process-wide callbacks with `callbacks`
pub fn set_callbacks(callbacks: CallbackSet) {
    global_registry().set(callbacks);
}

/// Disable the protocol until callbacks are registered again
pub fn clear_callbacks() {
    global_registry().reset();
}
