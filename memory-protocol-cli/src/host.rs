//! Minimal host driver
//!
//! Plays the role of the media framework: allocates a handle for an
//! identifier, enforces open-before-use and close-once, and exposes the
//! handle through `std::io` traits.

use memory_protocol::{OpenFlags, ProtocolError, UrlContext, UrlProtocol, Whence};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Convert a protocol failure into an OS-style I/O error
pub fn to_io_error(err: ProtocolError) -> io::Error {
    match err.code().checked_neg() {
        Some(errno) if errno > 0 => io::Error::from_raw_os_error(errno),
        _ => io::Error::new(io::ErrorKind::Other, err),
    }
}

/// An open protocol handle
pub struct Stream<'a, P: UrlProtocol + ?Sized> {
    protocol: &'a P,
    ctx: UrlContext,
    closed: bool,
}

impl<'a, P: UrlProtocol + ?Sized> Stream<'a, P> {
    /// Allocate a handle for `identifier` and open it
    pub fn open(protocol: &'a P, identifier: &str, flags: OpenFlags) -> io::Result<Self> {
        match identifier.split_once(':') {
            Some((scheme, _)) if scheme == protocol.name() => {}
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("'{}' is not a {} identifier", identifier, protocol.name()),
                ))
            }
        }

        let mut ctx = UrlContext::new(identifier, flags);
        protocol
            .url_open(&mut ctx, identifier, flags)
            .map_err(to_io_error)?;
        log::debug!("Opened {}", identifier);

        Ok(Self {
            protocol,
            ctx,
            closed: false,
        })
    }

    pub fn identifier(&self) -> &str {
        self.ctx.identifier()
    }

    /// Total size as reported by the protocol, without moving the position
    pub fn size(&mut self) -> io::Result<u64> {
        let size = self
            .protocol
            .url_seek(&mut self.ctx, 0, Whence::Size)
            .map_err(to_io_error)?;
        u64::try_from(size).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "negative size"))
    }

    /// Close the handle, reporting the close result
    pub fn close(mut self) -> io::Result<()> {
        self.closed = true;
        self.protocol
            .url_close(&mut self.ctx)
            .map(|_| ())
            .map_err(to_io_error)
    }
}

impl<P: UrlProtocol + ?Sized> Read for Stream<'_, P> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.protocol.url_read(&mut self.ctx, buf).map_err(to_io_error)?;
        if n > buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("read callback reported {} bytes for a {} byte buffer", n, buf.len()),
            ));
        }
        Ok(n)
    }
}

impl<P: UrlProtocol + ?Sized> Write for Stream<'_, P> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.protocol.url_write(&mut self.ctx, buf).map_err(to_io_error)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<P: UrlProtocol + ?Sized> Seek for Stream<'_, P> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            SeekFrom::Start(offset) => (
                i64::try_from(offset)
                    .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset too large"))?,
                Whence::Set,
            ),
            SeekFrom::Current(offset) => (offset, Whence::Cur),
            SeekFrom::End(offset) => (offset, Whence::End),
        };
        let position = self
            .protocol
            .url_seek(&mut self.ctx, offset, whence)
            .map_err(to_io_error)?;
        u64::try_from(position)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "negative position"))
    }
}

impl<P: UrlProtocol + ?Sized> Drop for Stream<'_, P> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.protocol.url_close(&mut self.ctx) {
                log::warn!("Failed to close {}: {}", self.ctx.identifier(), e);
            }
        }
    }
}
