//! Callbacks loaded from a C dynamic library
//!
//! Resolves the five operation symbols from a shared library and registers
//! them through the C ABI entry point. A missing symbol leaves its slot
//! unregistered. If the library exports a bind entry point it receives the
//! handle accessor table first.

use crate::config::SymbolNames;
use anyhow::{bail, Context, Result};
use libloading::{Library, Symbol};
use memory_protocol::ffi::{
    memory_protocol_reset_callbacks, memory_protocol_set_callbacks, CBindFn, CCloseFn, COpenFn,
    CReadFn, CSeekFn, CWriteFn, HOST_API,
};
use std::path::Path;

/// A loaded callback library
///
/// The process-wide callbacks point into the library, so they are cleared
/// before the library is unloaded.
pub struct ForeignCallbacks {
    library: Library,
    registered: bool,
}

impl ForeignCallbacks {
    /// Load a library without registering anything yet
    pub fn load(path: &Path) -> Result<Self> {
        log::info!("Loading callback library: {:?}", path);
        let library = unsafe { Library::new(path) }
            .with_context(|| format!("Failed to load callback library: {:?}", path))?;
        Ok(Self {
            library,
            registered: false,
        })
    }

    fn resolve<T: Copy>(&self, name: &str) -> Option<T> {
        let symbol: std::result::Result<Symbol<T>, _> = unsafe { self.library.get(name.as_bytes()) };
        match symbol {
            Ok(symbol) => Some(*symbol),
            Err(e) => {
                log::warn!("Callback symbol '{}' not found: {}", name, e);
                None
            }
        }
    }

    /// Hand the accessor table to the library's bind entry point, if any
    fn bind(&self, name: &str) -> Result<()> {
        let symbol: std::result::Result<Symbol<CBindFn>, _> = unsafe { self.library.get(name.as_bytes()) };
        let bind = match symbol {
            Ok(symbol) => *symbol,
            Err(_) => {
                log::debug!("Library exports no '{}', handle accessors not bound", name);
                return Ok(());
            }
        };

        let ret = unsafe { bind(&HOST_API) };
        if ret < 0 {
            bail!("Callback library rejected host API v{} ({})", HOST_API.version, ret);
        }
        log::debug!("Bound host API v{} via '{}'", HOST_API.version, name);
        Ok(())
    }

    /// Resolve every symbol and register the result process-wide
    ///
    /// Returns how many slots were filled.
    pub fn register(&mut self, names: &SymbolNames) -> Result<usize> {
        self.bind(&names.bind)?;
        let open = self.resolve::<COpenFn>(&names.open);
        let read = self.resolve::<CReadFn>(&names.read);
        let write = self.resolve::<CWriteFn>(&names.write);
        let seek = self.resolve::<CSeekFn>(&names.seek);
        let close = self.resolve::<CCloseFn>(&names.close);

        let count = [
            open.is_some(),
            read.is_some(),
            write.is_some(),
            seek.is_some(),
            close.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count();

        memory_protocol_set_callbacks(open, read, write, seek, close);
        self.registered = true;
        log::info!("Registered {} of 5 callbacks from library", count);
        Ok(count)
    }
}

impl Drop for ForeignCallbacks {
    fn drop(&mut self) {
        if self.registered {
            memory_protocol_reset_callbacks();
            log::debug!("Callback library unregistered");
        }
    }
}
