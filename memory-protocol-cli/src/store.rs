//! In-process byte store backing the memory protocol
//!
//! Each identifier suffix names one buffer. Every open handle keeps its own
//! cursor in the handle's opaque slot, so several handles can address the
//! same buffer independently.

use memory_protocol::{CallbackSet, OpenFlags, ProtocolError, UrlContext, Whence, EINVAL};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// POSIX `ENOENT`
pub const ENOENT: i32 = 2;

/// POSIX `EFBIG`
pub const EFBIG: i32 = 27;

/// Largest buffer a write may grow to
pub const MAX_BUFFER_LEN: usize = isize::MAX as usize;

/// Per-handle position within a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
struct Cursor {
    key: String,
    pos: u64,
}

/// Shared map from buffer name to contents
#[derive(Debug, Clone, Default)]
pub struct BufferStore {
    buffers: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl BufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.buffers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or replace a buffer
    pub fn insert(&self, key: impl Into<String>, data: Vec<u8>) {
        self.lock().insert(key.into(), data);
    }

    /// Copy of a buffer's contents
    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Callbacks serving handles from this store
    pub fn callbacks(&self) -> CallbackSet {
        let open_store = self.clone();
        let read_store = self.clone();
        let write_store = self.clone();
        let seek_store = self.clone();

        CallbackSet::new()
            .with_open(move |h, identifier, flags| open_store.open(h, identifier, flags))
            .with_read(move |h, buf| read_store.read(h, buf))
            .with_write(move |h, buf| write_store.write(h, buf))
            .with_seek(move |h, pos, whence| seek_store.seek(h, pos, whence))
            .with_close(|h| {
                match h.priv_data.take_opaque::<Cursor>() {
                    Some(cursor) => {
                        log::debug!("Closed buffer '{}' at offset {}", cursor.key, cursor.pos);
                        Ok(0)
                    }
                    None => Err(ProtocolError::Callback(-EINVAL)),
                }
            })
    }

    fn open(&self, h: &mut UrlContext, identifier: &str, flags: OpenFlags) -> memory_protocol::Result<i32> {
        let key = match identifier.split_once(':') {
            Some((_, suffix)) => suffix,
            None => identifier,
        };

        let mut buffers = self.lock();
        if flags.is_writable() && !flags.is_readable() {
            buffers.insert(key.to_string(), Vec::new());
        } else if flags.is_writable() {
            buffers.entry(key.to_string()).or_default();
        } else if !buffers.contains_key(key) {
            log::warn!("No buffer named '{}'", key);
            return Err(ProtocolError::Callback(-ENOENT));
        }

        log::debug!("Opened buffer '{}' ({} bytes)", key, buffers[key].len());
        h.priv_data.owner = Some(key.to_string());
        h.priv_data.set_opaque(Cursor {
            key: key.to_string(),
            pos: 0,
        });
        Ok(0)
    }

    fn cursor(h: &mut UrlContext) -> memory_protocol::Result<&mut Cursor> {
        h.priv_data
            .opaque_mut::<Cursor>()
            .ok_or(ProtocolError::Callback(-EINVAL))
    }

    fn read(&self, h: &mut UrlContext, buf: &mut [u8]) -> memory_protocol::Result<usize> {
        let cursor = Self::cursor(h)?;
        let buffers = self.lock();
        let data = buffers
            .get(&cursor.key)
            .ok_or(ProtocolError::Callback(-ENOENT))?;

        let start = usize::try_from(cursor.pos).unwrap_or(usize::MAX).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        cursor.pos += n as u64;
        Ok(n)
    }

    fn write(&self, h: &mut UrlContext, buf: &[u8]) -> memory_protocol::Result<usize> {
        let cursor = Self::cursor(h)?;
        let mut buffers = self.lock();
        let data = buffers.entry(cursor.key.clone()).or_default();

        let end = usize::try_from(cursor.pos)
            .ok()
            .and_then(|start| start.checked_add(buf.len()))
            .filter(|end| *end <= MAX_BUFFER_LEN)
            .ok_or(ProtocolError::Callback(-EFBIG))?;
        let start = end - buf.len();
        if data.len() < end {
            data.try_reserve(end - data.len())
                .map_err(|_| ProtocolError::Callback(-EFBIG))?;
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        cursor.pos = end as u64;
        Ok(buf.len())
    }

    fn seek(&self, h: &mut UrlContext, pos: i64, whence: Whence) -> memory_protocol::Result<i64> {
        let cursor = Self::cursor(h)?;
        let size = self.lock().get(&cursor.key).map_or(0, |data| data.len()) as i64;

        let target = match whence {
            Whence::Size => return Ok(size),
            Whence::Set => Some(pos),
            Whence::Cur => (cursor.pos as i64).checked_add(pos),
            Whence::End => size.checked_add(pos),
            Whence::Other(raw) => {
                log::warn!("Unsupported seek mode {}", raw);
                None
            }
        };

        match target {
            Some(target) if target >= 0 => {
                cursor.pos = target as u64;
                Ok(target)
            }
            _ => Err(ProtocolError::Callback(-EINVAL)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_protocol::{CallbackRegistry, MemoryProtocol, ProtocolConfig, UrlProtocol};

    fn protocol(store: &BufferStore) -> MemoryProtocol {
        let registry = CallbackRegistry::with_callbacks(store.callbacks());
        MemoryProtocol::new(Arc::new(registry), ProtocolConfig::default())
    }

    #[test]
    fn test_write_then_read_back() {
        let store = BufferStore::new();
        let protocol = protocol(&store);

        let mut w = UrlContext::new("memory:clip", OpenFlags::WRITE);
        protocol.url_open(&mut w, "memory:clip", OpenFlags::WRITE).unwrap();
        assert_eq!(protocol.url_write(&mut w, b"hello "), Ok(6));
        assert_eq!(protocol.url_write(&mut w, b"world"), Ok(5));
        assert_eq!(w.priv_data.owner.as_deref(), Some("clip"));
        protocol.url_close(&mut w).unwrap();
        assert_eq!(store.get("clip").unwrap(), b"hello world");

        let mut r = UrlContext::new("memory:clip", OpenFlags::READ);
        protocol.url_open(&mut r, "memory:clip", OpenFlags::READ).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(protocol.url_read(&mut r, &mut buf), Ok(8));
        assert_eq!(&buf, b"hello wo");
        assert_eq!(protocol.url_read(&mut r, &mut buf), Ok(3));
        assert_eq!(&buf[..3], b"rld");
        assert_eq!(protocol.url_read(&mut r, &mut buf), Ok(0));
        protocol.url_close(&mut r).unwrap();
    }

    #[test]
    fn test_open_missing_for_read() {
        let store = BufferStore::new();
        let protocol = protocol(&store);
        let mut h = UrlContext::new("memory:absent", OpenFlags::READ);

        let err = protocol.url_open(&mut h, "memory:absent", OpenFlags::READ).unwrap_err();
        assert_eq!(err.code(), -ENOENT);
        assert!(store.is_empty());
    }

    #[test]
    fn test_seek_modes() {
        let store = BufferStore::new();
        store.insert("data", (0u8..100).collect());
        let protocol = protocol(&store);
        let mut h = UrlContext::new("memory:data", OpenFlags::READ);
        protocol.url_open(&mut h, "memory:data", OpenFlags::READ).unwrap();

        assert_eq!(protocol.url_seek(&mut h, 0, Whence::Size), Ok(100));
        assert_eq!(protocol.url_seek(&mut h, 10, Whence::Set), Ok(10));
        assert_eq!(protocol.url_seek(&mut h, 5, Whence::Cur), Ok(15));
        assert_eq!(protocol.url_seek(&mut h, -1, Whence::End), Ok(99));
        // Size queries do not move the position
        assert_eq!(protocol.url_seek(&mut h, 0, Whence::Size), Ok(100));
        assert_eq!(protocol.url_seek(&mut h, 0, Whence::Cur), Ok(99));

        let mut buf = [0u8; 4];
        assert_eq!(protocol.url_read(&mut h, &mut buf), Ok(1));
        assert_eq!(buf[0], 99);

        assert_eq!(protocol.url_seek(&mut h, -200, Whence::Cur).unwrap_err().code(), -EINVAL);
        assert_eq!(protocol.url_seek(&mut h, 0, Whence::from(42)).unwrap_err().code(), -EINVAL);
    }

    #[test]
    fn test_independent_cursors() {
        let store = BufferStore::new();
        store.insert("shared", b"abcdef".to_vec());
        let protocol = protocol(&store);

        let mut a = UrlContext::new("memory:shared", OpenFlags::READ);
        let mut b = UrlContext::new("memory:shared", OpenFlags::READ);
        protocol.url_open(&mut a, "memory:shared", OpenFlags::READ).unwrap();
        protocol.url_open(&mut b, "memory:shared", OpenFlags::READ).unwrap();

        let mut buf = [0u8; 3];
        protocol.url_read(&mut a, &mut buf).unwrap();
        assert_eq!(&buf, b"abc");
        protocol.url_read(&mut b, &mut buf).unwrap();
        assert_eq!(&buf, b"abc");
    }

    #[test]
    fn test_write_past_end_zero_fills() {
        let store = BufferStore::new();
        let protocol = protocol(&store);
        let mut h = UrlContext::new("memory:gap", OpenFlags::READ_WRITE);
        protocol.url_open(&mut h, "memory:gap", OpenFlags::READ_WRITE).unwrap();

        protocol.url_seek(&mut h, 4, Whence::Set).unwrap();
        protocol.url_write(&mut h, b"xy").unwrap();
        assert_eq!(store.get("gap").unwrap(), vec![0, 0, 0, 0, b'x', b'y']);
    }

    #[test]
    fn test_write_far_past_end_fails_without_growing() {
        let store = BufferStore::new();
        let protocol = protocol(&store);
        let mut h = UrlContext::new("memory:far", OpenFlags::READ_WRITE);
        protocol.url_open(&mut h, "memory:far", OpenFlags::READ_WRITE).unwrap();

        assert_eq!(protocol.url_seek(&mut h, i64::MAX - 1, Whence::Set), Ok(i64::MAX - 1));
        assert_eq!(protocol.url_write(&mut h, b"xy").unwrap_err().code(), -EFBIG);
        assert!(store.get("far").unwrap().is_empty());

        // The handle stays usable once the cursor is back in range
        protocol.url_seek(&mut h, 0, Whence::Set).unwrap();
        assert_eq!(protocol.url_write(&mut h, b"xy"), Ok(2));
        assert_eq!(store.get("far").unwrap(), b"xy");
    }

    #[test]
    fn test_close_without_open_fails() {
        let store = BufferStore::new();
        let protocol = protocol(&store);
        let mut h = UrlContext::new("memory:x", OpenFlags::READ);
        assert_eq!(protocol.url_close(&mut h).unwrap_err().code(), -EINVAL);
    }
}
