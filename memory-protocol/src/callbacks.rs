//! Callback slots
//!
//! A [`CallbackSet`] holds zero or one function per operation. An empty slot
//! is `None`, never a placeholder function, so it cannot be mistaken for a
//! valid handler.

use crate::handle::UrlContext;
use crate::types::{OpenFlags, Operation, Result, Whence};
use std::fmt;
use std::sync::Arc;

/// Initialize per-handle resources
pub type OpenCallback = Arc<dyn Fn(&mut UrlContext, &str, OpenFlags) -> Result<i32> + Send + Sync>;
/// Fill the buffer, returning the number of bytes read
pub type ReadCallback = Arc<dyn Fn(&mut UrlContext, &mut [u8]) -> Result<usize> + Send + Sync>;
/// Consume the buffer, returning the number of bytes written
pub type WriteCallback = Arc<dyn Fn(&mut UrlContext, &[u8]) -> Result<usize> + Send + Sync>;
/// Reposition or query the size
pub type SeekCallback = Arc<dyn Fn(&mut UrlContext, i64, Whence) -> Result<i64> + Send + Sync>;
/// Release per-handle resources
pub type CloseCallback = Arc<dyn Fn(&mut UrlContext) -> Result<i32> + Send + Sync>;

/// The five optional operation slots
///
/// A set is always replaced as a whole; there is no partial update through
/// the registry.
#[derive(Clone, Default)]
pub struct CallbackSet {
    pub open: Option<OpenCallback>,
    pub read: Option<ReadCallback>,
    pub write: Option<WriteCallback>,
    pub seek: Option<SeekCallback>,
    pub close: Option<CloseCallback>,
}

impl CallbackSet {
    /// Create a set with every slot unregistered
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: register the open callback
    pub fn with_open<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut UrlContext, &str, OpenFlags) -> Result<i32> + Send + Sync + 'static,
    {
        self.open = Some(Arc::new(f));
        self
    }

    /// Builder method: register the read callback
    pub fn with_read<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut UrlContext, &mut [u8]) -> Result<usize> + Send + Sync + 'static,
    {
        self.read = Some(Arc::new(f));
        self
    }

    /// Builder method: register the write callback
    pub fn with_write<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut UrlContext, &[u8]) -> Result<usize> + Send + Sync + 'static,
    {
        self.write = Some(Arc::new(f));
        self
    }

    /// Builder method: register the seek callback
    pub fn with_seek<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut UrlContext, i64, Whence) -> Result<i64> + Send + Sync + 'static,
    {
        self.seek = Some(Arc::new(f));
        self
    }

    /// Builder method: register the close callback
    pub fn with_close<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut UrlContext) -> Result<i32> + Send + Sync + 'static,
    {
        self.close = Some(Arc::new(f));
        self
    }

    /// Check whether a callback is present for `operation`
    pub fn is_registered(&self, operation: Operation) -> bool {
        match operation {
            Operation::Open => self.open.is_some(),
            Operation::Read => self.read.is_some(),
            Operation::Write => self.write.is_some(),
            Operation::Seek => self.seek.is_some(),
            Operation::Close => self.close.is_some(),
        }
    }

    /// Operations that have a callback
    pub fn registered(&self) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| self.is_registered(*op))
            .collect()
    }

    /// True when no slot is registered
    pub fn is_empty(&self) -> bool {
        self.registered().is_empty()
    }
}

impl fmt::Debug for CallbackSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSet")
            .field("open", &self.open.is_some())
            .field("read", &self.read.is_some())
            .field("write", &self.write.is_some())
            .field("seek", &self.seek.is_some())
            .field("close", &self.close.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set() {
        let set = CallbackSet::new();
        assert!(set.is_empty());
        for op in Operation::ALL {
            assert!(!set.is_registered(op));
        }
    }

    #[test]
    fn test_builder_registers_slots() {
        let set = CallbackSet::new()
            .with_read(|_, _| Ok(0))
            .with_seek(|_, _, _| Ok(0));

        assert_eq!(set.registered(), vec![Operation::Read, Operation::Seek]);
        assert!(!set.is_empty());
    }

    #[test]
    fn test_debug_shows_presence() {
        let set = CallbackSet::new().with_close(|_| Ok(0));
        let text = format!("{:?}", set);
        assert!(text.contains("close: true"));
        assert!(text.contains("open: false"));
    }
}
