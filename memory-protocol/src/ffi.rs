//! C ABI registration surface
//!
//! Lets a C embedding application register plain function pointers. Each
//! pointer is nullable; a null pointer leaves its slot unregistered. C
//! callbacks receive the handle as an opaque pointer and return raw integers
//! where a negative value is an error code.

use crate::callbacks::{
    CallbackSet, CloseCallback, OpenCallback, ReadCallback, SeekCallback, WriteCallback,
};
use crate::handle::UrlContext;
use crate::registry::{clear_callbacks, set_callbacks};
use crate::types::{OpenFlags, ProtocolError, Result, Whence};
use std::ffi::{c_void, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::sync::Arc;

pub type COpenFn = unsafe extern "C" fn(h: *mut UrlContext, identifier: *const c_char, flags: c_int) -> c_int;
pub type CReadFn = unsafe extern "C" fn(h: *mut UrlContext, buf: *mut u8, size: c_int) -> c_int;
pub type CWriteFn = unsafe extern "C" fn(h: *mut UrlContext, buf: *const u8, size: c_int) -> c_int;
pub type CSeekFn = unsafe extern "C" fn(h: *mut UrlContext, pos: i64, whence: c_int) -> i64;
pub type CCloseFn = unsafe extern "C" fn(h: *mut UrlContext) -> c_int;

/// Pointer stored in the opaque slot on behalf of C callbacks
struct ForeignOpaque(*mut c_void);

// The pointer is only handed back to the same C code that stored it.
unsafe impl Send for ForeignOpaque {}

fn int_result(ret: c_int) -> Result<c_int> {
    if ret < 0 {
        Err(ProtocolError::from_code(ret))
    } else {
        Ok(ret)
    }
}

/// Error codes share the `int` convention of the other callbacks, so a
/// negative seek result outside `c_int` range is reported as `c_int::MIN`.
/// Every in-range code is passed through as returned.
fn seek_result(ret: i64) -> Result<i64> {
    if ret < 0 {
        Err(ProtocolError::from_code(c_int::try_from(ret).unwrap_or(c_int::MIN)))
    } else {
        Ok(ret)
    }
}

fn buffer_len(len: usize) -> c_int {
    c_int::try_from(len).unwrap_or(c_int::MAX)
}

/// Wrap C function pointers into a [`CallbackSet`]
pub fn callbacks_from_c(
    open: Option<COpenFn>,
    read: Option<CReadFn>,
    write: Option<CWriteFn>,
    seek: Option<CSeekFn>,
    close: Option<CCloseFn>,
) -> CallbackSet {
    CallbackSet {
        open: open.map(|f| {
            Arc::new(move |h: &mut UrlContext, identifier: &str, flags: OpenFlags| {
                let c_identifier = CString::new(identifier.replace('\0', "")).unwrap_or_default();
                int_result(unsafe { f(h, c_identifier.as_ptr(), flags.bits()) })
            }) as OpenCallback
        }),
        read: read.map(|f| {
            Arc::new(move |h: &mut UrlContext, buf: &mut [u8]| {
                let size = buffer_len(buf.len());
                int_result(unsafe { f(h, buf.as_mut_ptr(), size) }).map(|n| n as usize)
            }) as ReadCallback
        }),
        write: write.map(|f| {
            Arc::new(move |h: &mut UrlContext, buf: &[u8]| {
                let size = buffer_len(buf.len());
                int_result(unsafe { f(h, buf.as_ptr(), size) }).map(|n| n as usize)
            }) as WriteCallback
        }),
        seek: seek.map(|f| {
            Arc::new(move |h: &mut UrlContext, pos: i64, whence: Whence| {
                seek_result(unsafe { f(h, pos, whence.as_raw()) })
            }) as SeekCallback
        }),
        close: close.map(|f| {
            Arc::new(move |h: &mut UrlContext| int_result(unsafe { f(h) })) as CloseCallback
        }),
    }
}

/// Replace the process-wide callbacks with C function pointers
#[no_mangle]
pub extern "C" fn memory_protocol_set_callbacks(
    open: Option<COpenFn>,
    read: Option<CReadFn>,
    write: Option<CWriteFn>,
    seek: Option<CSeekFn>,
    close: Option<CCloseFn>,
) {
    set_callbacks(callbacks_from_c(open, read, write, seek, close));
}

/// Unregister every process-wide callback
#[no_mangle]
pub extern "C" fn memory_protocol_reset_callbacks() {
    clear_callbacks();
}

/// Identifier of the handle, valid while the handle lives
///
/// # Safety
/// `h` must be null or point to a live handle.
#[no_mangle]
pub unsafe extern "C" fn memory_protocol_context_identifier(h: *const UrlContext) -> *const c_char {
    match h.as_ref() {
        Some(ctx) => ctx.c_identifier().as_ptr(),
        None => ptr::null(),
    }
}

/// Pointer stored with [`memory_protocol_context_set_opaque`], or null
///
/// # Safety
/// `h` must be null or point to a live handle.
#[no_mangle]
pub unsafe extern "C" fn memory_protocol_context_opaque(h: *const UrlContext) -> *mut c_void {
    h.as_ref()
        .and_then(|ctx| ctx.priv_data.opaque_ref::<ForeignOpaque>())
        .map_or(ptr::null_mut(), |p| p.0)
}

/// Store a pointer in the handle's opaque slot
///
/// The handle does not take ownership; the C side frees it in its close
/// callback.
///
/// # Safety
/// `h` must be null or point to a live handle not borrowed elsewhere.
#[no_mangle]
pub unsafe extern "C" fn memory_protocol_context_set_opaque(h: *mut UrlContext, opaque: *mut c_void) {
    if let Some(ctx) = h.as_mut() {
        ctx.priv_data.set_opaque(ForeignOpaque(opaque));
    }
}

/// Application flags of the handle's extension slot
///
/// # Safety
/// `h` must be null or point to a live handle.
#[no_mangle]
pub unsafe extern "C" fn memory_protocol_context_flags(h: *const UrlContext) -> c_int {
    h.as_ref().map_or(0, |ctx| ctx.priv_data.flags)
}

/// # Safety
/// `h` must be null or point to a live handle not borrowed elsewhere.
#[no_mangle]
pub unsafe extern "C" fn memory_protocol_context_set_flags(h: *mut UrlContext, flags: c_int) {
    if let Some(ctx) = h.as_mut() {
        ctx.priv_data.flags = flags;
    }
}

/// Version of [`MemoryHostApi`] handed to callback libraries
pub const HOST_API_VERSION: c_int = 1;

/// Handle accessors passed to a dynamically loaded callback library
///
/// A library cannot always resolve the `memory_protocol_context_*` symbols
/// from the executable that loads it, so the loader hands it this table
/// instead. The table is static and outlives every handle.
#[repr(C)]
pub struct MemoryHostApi {
    pub version: c_int,
    pub context_identifier: unsafe extern "C" fn(*const UrlContext) -> *const c_char,
    pub context_opaque: unsafe extern "C" fn(*const UrlContext) -> *mut c_void,
    pub context_set_opaque: unsafe extern "C" fn(*mut UrlContext, *mut c_void),
    pub context_flags: unsafe extern "C" fn(*const UrlContext) -> c_int,
    pub context_set_flags: unsafe extern "C" fn(*mut UrlContext, c_int),
}

pub static HOST_API: MemoryHostApi = MemoryHostApi {
    version: HOST_API_VERSION,
    context_identifier: memory_protocol_context_identifier,
    context_opaque: memory_protocol_context_opaque,
    context_set_opaque: memory_protocol_context_set_opaque,
    context_flags: memory_protocol_context_flags,
    context_set_flags: memory_protocol_context_set_flags,
};

/// Entry point a callback library exports to receive [`HOST_API`]
///
/// A negative return rejects the table.
pub type CBindFn = unsafe extern "C" fn(api: *const MemoryHostApi) -> c_int;

/// The accessor table, for C code linked into the same binary
#[no_mangle]
pub extern "C" fn memory_protocol_host_api() -> *const MemoryHostApi {
    &HOST_API
}
