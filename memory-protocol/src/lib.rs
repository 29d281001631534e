//! Memory Protocol
//!
//! A stream protocol backend that stores nothing itself. Every open, read,
//! write, seek and close issued by the host framework is forwarded to
//! callbacks registered by the embedding application, so the application can
//! plug in an in-process buffer, a custom transport or a test double while
//! the host keeps addressing it as `memory:<suffix>`.
//!
//! # Architecture
//!
//! - [`CallbackRegistry`] holds the active [`CallbackSet`]. One process-wide
//!   instance backs the legacy free functions ([`register_callbacks`],
//!   [`clear_callbacks`]); independent instances can be injected.
//! - [`MemoryProtocol`] implements [`UrlProtocol`] by dispatching each call to
//!   the matching slot, failing with `-EINVAL` when the slot is empty.
//! - [`ffi`] exposes the registration API to C.
//!
//! # Example Usage
//!
//! ```
//! use memory_protocol::{
//!     clear_callbacks, set_callbacks, CallbackSet, MemoryProtocol, OpenFlags, UrlContext,
//!     UrlProtocol, Whence,
//! };
//!
//! set_callbacks(
//!     CallbackSet::new()
//!         .with_open(|_h, _ident, _flags| Ok(0))
//!         .with_seek(|_h, _pos, whence| match whence {
//!             Whence::Size => Ok(1000),
//!             _ => Ok(0),
//!         })
//!         .with_close(|_h| Ok(0)),
//! );
//!
//! let protocol = MemoryProtocol::legacy();
//! let mut h = UrlContext::new("memory:clip", OpenFlags::READ);
//! protocol.url_open(&mut h, "memory:clip", OpenFlags::READ).unwrap();
//! assert_eq!(protocol.url_seek(&mut h, 0, Whence::Size), Ok(1000));
//! protocol.url_close(&mut h).unwrap();
//!
//! clear_callbacks();
//! ```

// Public modules
pub mod callbacks;
pub mod config;
pub mod ffi;
pub mod handle;
pub mod protocol;
pub mod registry;
pub mod types;

// Re-export main types for convenience
pub use callbacks::{
    CallbackSet, CloseCallback, OpenCallback, ReadCallback, SeekCallback, WriteCallback,
};
pub use config::{DispatchMode, ProtocolConfig, DEFAULT_PROTOCOL_NAME};
pub use handle::{AdapterState, UrlContext};
pub use protocol::{MemoryProtocol, UrlProtocol};
pub use registry::{
    clear_callbacks, global_registry, register_callbacks, set_callbacks, CallbackProvider,
    CallbackRegistry,
};
pub use types::{OpenFlags, Operation, ProtocolError, Result, Whence, AVSEEK_SIZE, EINVAL};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
