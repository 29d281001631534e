//! Shared test helpers: a logger that records per thread

#![allow(dead_code)]

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::cell::RefCell;
use std::sync::Once;

#[derive(Debug, Clone)]
pub struct CapturedRecord {
    pub level: Level,
    pub target: String,
    pub message: String,
}

thread_local! {
    static RECORDS: RefCell<Vec<CapturedRecord>> = RefCell::new(Vec::new());
}

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|records| {
            records.borrow_mut().push(CapturedRecord {
                level: record.level(),
                target: record.target().to_string(),
                message: record.args().to_string(),
            })
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

/// Install the capturing logger and discard anything this thread recorded so far
pub fn init() {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).expect("logger already installed");
        log::set_max_level(LevelFilter::Trace);
    });
    take();
}

/// Drain the records captured on this thread
pub fn take() -> Vec<CapturedRecord> {
    RECORDS.with(|records| std::mem::take(&mut *records.borrow_mut()))
}

/// Drain and keep only error-level adapter diagnostics
pub fn take_diagnostics() -> Vec<CapturedRecord> {
    take()
        .into_iter()
        .filter(|r| r.level == Level::Error && r.target == memory_protocol::protocol::LOG_TARGET)
        .collect()
}
