//! Process-wide registry used through the legacy free functions

mod common;

use memory_protocol::{
    clear_callbacks, global_registry, register_callbacks, set_callbacks, CallbackProvider,
    CallbackSet, MemoryProtocol, OpenFlags, Operation, Result, UrlContext, UrlProtocol, Whence, EINVAL,
};
use std::sync::{Arc, Mutex, MutexGuard};

static GLOBAL_LOCK: Mutex<()> = Mutex::new(());

/// Serialize access to the global registry and start from a cleared state
fn exclusive() -> MutexGuard<'static, ()> {
    let guard = GLOBAL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_callbacks();
    common::init();
    guard
}

#[test]
fn test_before_any_registration() {
    let _guard = exclusive();
    let protocol = MemoryProtocol::legacy();
    let mut h = UrlContext::new("memory:unset", OpenFlags::READ);

    let err = protocol.url_open(&mut h, "memory:unset", OpenFlags::READ).unwrap_err();
    assert_eq!(err.code(), -EINVAL);

    let diagnostics = common::take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("open_callback() is NULL"));
}

#[test]
fn test_register_individual_slots() {
    let _guard = exclusive();

    register_callbacks(
        Some(Arc::new(|_: &mut UrlContext, _: &str, _: OpenFlags| -> Result<i32> { Ok(0) })),
        None,
        None,
        Some(Arc::new(|_: &mut UrlContext, _: i64, whence: Whence| -> Result<i64> {
            match whence {
                Whence::Size => Ok(1000),
                _ => Ok(0),
            }
        })),
        None,
    );

    assert_eq!(
        global_registry().current().registered(),
        vec![Operation::Open, Operation::Seek]
    );

    let protocol = MemoryProtocol::legacy();
    let mut h = UrlContext::new("memory:sized", OpenFlags::READ);
    let mut buf = [0u8; 8];

    assert_eq!(protocol.url_open(&mut h, "memory:sized", OpenFlags::READ), Ok(0));
    assert_eq!(protocol.url_seek(&mut h, 0, Whence::Size), Ok(1000));
    assert_eq!(protocol.url_read(&mut h, &mut buf).unwrap_err().code(), -EINVAL);
    assert_eq!(protocol.url_close(&mut h).unwrap_err().code(), -EINVAL);

    let diagnostics = common::take_diagnostics();
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics[0].message.contains("read"));
    assert!(diagnostics[1].message.contains("close"));
}

#[test]
fn test_clear_disables_every_instance() {
    let _guard = exclusive();
    set_callbacks(CallbackSet::new().with_write(|_, buf| Ok(buf.len())));

    let first = MemoryProtocol::legacy();
    let second = MemoryProtocol::default();
    let mut h = UrlContext::new("memory:w", OpenFlags::WRITE);

    assert_eq!(first.url_write(&mut h, b"abc"), Ok(3));
    assert_eq!(second.url_write(&mut h, b"abcd"), Ok(4));

    clear_callbacks();

    assert_eq!(first.url_write(&mut h, b"abc").unwrap_err().code(), -EINVAL);
    assert_eq!(second.url_write(&mut h, b"abc").unwrap_err().code(), -EINVAL);
}

#[test]
fn test_registry_logs_changes_at_debug() {
    let _guard = exclusive();
    common::take();

    set_callbacks(CallbackSet::new());
    let records = common::take();
    assert_eq!(records.len(), 1);
    assert!(records[0].message.contains("Registering"));

    clear_callbacks();
    let records = common::take();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, log::Level::Debug);
    assert!(records[0].message.contains("Clearing"));
}
