//! Per-handle state
//!
//! [`UrlContext`] stands in for the host-allocated handle passed to every
//! operation. It owns an [`AdapterState`] for its whole lifetime; no two
//! handles share one.

use crate::callbacks::CallbackSet;
use crate::types::OpenFlags;
use std::any::Any;
use std::ffi::{CStr, CString};
use std::fmt;
use std::sync::Arc;

/// Extension slot carried by every handle
///
/// The adapter itself never reads these fields. It clears them on every open
/// and otherwise leaves them to the registered callbacks.
#[derive(Default)]
pub struct AdapterState {
    /// Back-reference to whatever owns this handle
    pub owner: Option<String>,
    /// Application bookkeeping
    pub opaque: Option<Box<dyn Any + Send>>,
    pub flags: i32,
}

impl AdapterState {
    /// Reset every field to empty
    pub fn clear(&mut self) {
        self.owner = None;
        self.opaque = None;
        self.flags = 0;
    }

    /// True when no field carries a value
    pub fn is_empty(&self) -> bool {
        self.owner.is_none() && self.opaque.is_none() && self.flags == 0
    }

    /// Store application data in the opaque slot, replacing any previous value
    pub fn set_opaque<T: Any + Send>(&mut self, value: T) {
        self.opaque = Some(Box::new(value));
    }

    pub fn opaque_ref<T: Any + Send>(&self) -> Option<&T> {
        self.opaque.as_ref().and_then(|b| b.downcast_ref::<T>())
    }

    pub fn opaque_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.opaque.as_mut().and_then(|b| b.downcast_mut::<T>())
    }

    /// Remove and return the opaque value if it has type `T`
    pub fn take_opaque<T: Any + Send>(&mut self) -> Option<T> {
        match self.opaque.take()?.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(other) => {
                self.opaque = Some(other);
                None
            }
        }
    }
}

impl fmt::Debug for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterState")
            .field("owner", &self.owner)
            .field("opaque", &self.opaque.as_ref().map(|_| "<opaque>"))
            .field("flags", &self.flags)
            .finish()
    }
}

/// Handle passed to every protocol operation
pub struct UrlContext {
    identifier: String,
    c_identifier: CString,
    /// Flags the handle was created with
    pub flags: OpenFlags,
    /// Protocol-private state
    pub priv_data: AdapterState,
    /// Callbacks captured at open time (snapshot dispatch only)
    pub(crate) snapshot: Option<Arc<CallbackSet>>,
}

impl UrlContext {
    /// Allocate a handle for `identifier` with zeroed private state
    ///
    /// Interior NUL bytes are dropped from the C view of the identifier.
    pub fn new(identifier: impl Into<String>, flags: OpenFlags) -> Self {
        let identifier = identifier.into();
        let c_identifier = CString::new(identifier.replace('\0', "")).unwrap_or_default();
        Self {
            identifier,
            c_identifier,
            flags,
            priv_data: AdapterState::default(),
            snapshot: None,
        }
    }

    /// Full identifier, including the protocol prefix
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub(crate) fn c_identifier(&self) -> &CStr {
        &self.c_identifier
    }

    /// True when callbacks were captured by a snapshot-mode open
    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }
}

impl fmt::Debug for UrlContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlContext")
            .field("identifier", &self.identifier)
            .field("flags", &self.flags)
            .field("priv_data", &self.priv_data)
            .field("snapshot", &self.snapshot.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_is_zeroed() {
        let ctx = UrlContext::new("memory:a", OpenFlags::READ);
        assert!(ctx.priv_data.is_empty());
        assert!(!ctx.has_snapshot());
        assert_eq!(ctx.identifier(), "memory:a");
        assert_eq!(ctx.c_identifier().to_str().unwrap(), "memory:a");
    }

    #[test]
    fn test_opaque_accessors() {
        let mut state = AdapterState::default();
        state.set_opaque(42u64);
        assert_eq!(state.opaque_ref::<u64>(), Some(&42));
        assert_eq!(state.opaque_ref::<String>(), None);

        *state.opaque_mut::<u64>().unwrap() += 1;
        assert_eq!(state.take_opaque::<String>(), None);
        assert_eq!(state.take_opaque::<u64>(), Some(43));
        assert!(state.opaque.is_none());
    }

    #[test]
    fn test_clear() {
        let mut state = AdapterState {
            owner: Some("demuxer".to_string()),
            opaque: Some(Box::new(vec![1u8, 2, 3])),
            flags: 7,
        };
        assert!(!state.is_empty());
        state.clear();
        assert!(state.is_empty());
    }

    #[test]
    fn test_interior_nul_identifier() {
        let ctx = UrlContext::new("memory:a\0b", OpenFlags::READ);
        assert_eq!(ctx.identifier(), "memory:a\0b");
        assert_eq!(ctx.c_identifier().to_str().unwrap(), "memory:ab");
    }
}
