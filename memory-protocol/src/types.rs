//! Core types for the memory protocol
//!
//! This module defines the error convention shared with the host framework,
//! the seek mode enumeration and the open flags passed through to callbacks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// POSIX `EINVAL`
pub const EINVAL: i32 = 22;

/// Seek mode that queries the total size without moving the position
pub const AVSEEK_SIZE: i32 = 0x10000;

/// The five operations a protocol handle supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Open,
    Read,
    Write,
    Seek,
    Close,
}

impl Operation {
    /// All operations, in registration order
    pub const ALL: [Operation; 5] = [
        Operation::Open,
        Operation::Read,
        Operation::Write,
        Operation::Seek,
        Operation::Close,
    ];

    /// Lowercase operation name as used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Open => "open",
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Seek => "seek",
            Operation::Close => "close",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors surfaced to the host framework
///
/// Every variant maps to a negative POSIX-like code through [`ProtocolError::code`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// No callback is registered for the operation
    #[error("{operation}_callback() is NULL")]
    InvalidArgument { operation: Operation },

    /// Error code returned by a registered callback, passed through unchanged
    #[error("callback failed with code {0}")]
    Callback(i32),
}

impl ProtocolError {
    /// Negative error code following the host convention
    pub fn code(&self) -> i32 {
        match self {
            ProtocolError::InvalidArgument { .. } => -EINVAL,
            ProtocolError::Callback(code) => *code,
        }
    }

    /// Wrap a raw error code returned by a callback
    ///
    /// Positive errno values are negated so that `from_code(EIO)` and
    /// `from_code(-EIO)` describe the same failure.
    pub fn from_code(code: i32) -> Self {
        if code > 0 {
            ProtocolError::Callback(-code)
        } else {
            ProtocolError::Callback(code)
        }
    }

    /// True for the unregistered-slot failure
    pub fn is_unregistered(&self) -> bool {
        matches!(self, ProtocolError::InvalidArgument { .. })
    }
}

/// Reference point for a seek
///
/// The adapter never interprets this value; unknown raw values survive as
/// [`Whence::Other`] so the callback sees exactly what the host passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Whence {
    /// Absolute offset from the start
    Set,
    /// Relative to the current position
    Cur,
    /// Relative to the end
    End,
    /// Report the total size without moving
    Size,
    /// Any other raw value
    Other(i32),
}

impl Whence {
    /// Conventional integer value (`SEEK_SET`, `SEEK_CUR`, `SEEK_END`, `AVSEEK_SIZE`)
    pub fn as_raw(&self) -> i32 {
        match self {
            Whence::Set => 0,
            Whence::Cur => 1,
            Whence::End => 2,
            Whence::Size => AVSEEK_SIZE,
            Whence::Other(raw) => *raw,
        }
    }
}

impl From<i32> for Whence {
    fn from(raw: i32) -> Self {
        match raw {
            0 => Whence::Set,
            1 => Whence::Cur,
            2 => Whence::End,
            AVSEEK_SIZE => Whence::Size,
            other => Whence::Other(other),
        }
    }
}

impl From<Whence> for i32 {
    fn from(whence: Whence) -> Self {
        whence.as_raw()
    }
}

/// Access flags the host passes to `open`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct OpenFlags(pub i32);

impl OpenFlags {
    pub const READ: OpenFlags = OpenFlags(1);
    pub const WRITE: OpenFlags = OpenFlags(2);
    pub const READ_WRITE: OpenFlags = OpenFlags(3);

    /// Raw integer value
    pub fn bits(&self) -> i32 {
        self.0
    }

    pub fn is_readable(&self) -> bool {
        self.0 & Self::READ.0 != 0
    }

    pub fn is_writable(&self) -> bool {
        self.0 & Self::WRITE.0 != 0
    }
}
