//! Protocol adapter
//!
//! Implements the host's five-operation plugin contract by forwarding each
//! call to the registered callback. When the slot is empty the call fails
//! with [`ProtocolError::InvalidArgument`] and one error-level log line naming
//! the slot.
//!
//! The adapter does not track handle state. The host guarantees that open
//! precedes read/write/seek, which precede close.

use crate::callbacks::CallbackSet;
use crate::config::{DispatchMode, ProtocolConfig};
use crate::handle::UrlContext;
use crate::registry::{global_registry, CallbackProvider};
use crate::types::{OpenFlags, Operation, ProtocolError, Result, Whence};
use std::fmt;
use std::sync::Arc;

/// Log target for adapter diagnostics
pub const LOG_TARGET: &str = "memory";

/// Plugin contract the host framework addresses protocols through
pub trait UrlProtocol: Send + Sync {
    /// Scheme this protocol answers to
    fn name(&self) -> &str;

    /// Comma-separated list of protocols allowed to open this one implicitly
    fn default_whitelist(&self) -> &str;

    fn url_open(&self, h: &mut UrlContext, identifier: &str, flags: OpenFlags) -> Result<i32>;

    fn url_read(&self, h: &mut UrlContext, buf: &mut [u8]) -> Result<usize>;

    fn url_write(&self, h: &mut UrlContext, buf: &[u8]) -> Result<usize>;

    /// Reposition, or report the size for [`Whence::Size`]
    fn url_seek(&self, h: &mut UrlContext, pos: i64, whence: Whence) -> Result<i64>;

    fn url_close(&self, h: &mut UrlContext) -> Result<i32>;
}

/// Protocol that dispatches to externally registered callbacks
#[derive(Clone)]
pub struct MemoryProtocol {
    provider: Arc<dyn CallbackProvider>,
    config: ProtocolConfig,
}

impl MemoryProtocol {
    /// Create a protocol reading its callbacks from `provider`
    pub fn new(provider: Arc<dyn CallbackProvider>, config: ProtocolConfig) -> Self {
        Self { provider, config }
    }

    /// Protocol bound to the process-wide registry with default settings
    pub fn legacy() -> Self {
        Self::with_global_registry(ProtocolConfig::default())
    }

    /// Protocol bound to the process-wide registry
    pub fn with_global_registry(config: ProtocolConfig) -> Self {
        Self::new(Arc::new(global_registry()), config)
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Check whether `identifier` has the form `<name>:<suffix>`
    pub fn matches(&self, identifier: &str) -> bool {
        identifier
            .strip_prefix(self.config.name.as_str())
            .map_or(false, |rest| rest.starts_with(':'))
    }

    /// Callbacks a call on `h` dispatches to
    fn callbacks(&self, h: &UrlContext) -> Arc<CallbackSet> {
        match &h.snapshot {
            Some(snapshot) => Arc::clone(snapshot),
            None => self.provider.current(),
        }
    }

    fn unregistered(h: &UrlContext, operation: Operation) -> ProtocolError {
        log::error!(
            target: LOG_TARGET,
            "[{}] {}_callback() is NULL.",
            h.identifier(),
            operation
        );
        ProtocolError::InvalidArgument { operation }
    }
}

impl UrlProtocol for MemoryProtocol {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn default_whitelist(&self) -> &str {
        self.config.whitelist()
    }

    fn url_open(&self, h: &mut UrlContext, identifier: &str, flags: OpenFlags) -> Result<i32> {
        // Cleared on every open, including the failure path.
        h.priv_data.clear();
        h.snapshot = match self.config.dispatch {
            DispatchMode::Live => None,
            DispatchMode::SnapshotOnOpen => Some(self.provider.current()),
        };

        let Some(open) = self.callbacks(h).open.clone() else {
            return Err(Self::unregistered(h, Operation::Open));
        };
        log::trace!(target: LOG_TARGET, "open {} (flags {})", identifier, flags.bits());
        open(h, identifier, flags)
    }

    fn url_read(&self, h: &mut UrlContext, buf: &mut [u8]) -> Result<usize> {
        let Some(read) = self.callbacks(h).read.clone() else {
            return Err(Self::unregistered(h, Operation::Read));
        };
        read(h, buf)
    }

    fn url_write(&self, h: &mut UrlContext, buf: &[u8]) -> Result<usize> {
        let Some(write) = self.callbacks(h).write.clone() else {
            return Err(Self::unregistered(h, Operation::Write));
        };
        write(h, buf)
    }

    fn url_seek(&self, h: &mut UrlContext, pos: i64, whence: Whence) -> Result<i64> {
        let Some(seek) = self.callbacks(h).seek.clone() else {
            return Err(Self::unregistered(h, Operation::Seek));
        };
        seek(h, pos, whence)
    }

    fn url_close(&self, h: &mut UrlContext) -> Result<i32> {
        let Some(close) = self.callbacks(h).close.clone() else {
            return Err(Self::unregistered(h, Operation::Close));
        };
        log::trace!(target: LOG_TARGET, "close {}", h.identifier());
        close(h)
    }
}

impl Default for MemoryProtocol {
    fn default() -> Self {
        Self::legacy()
    }
}

impl fmt::Debug for MemoryProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryProtocol")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
