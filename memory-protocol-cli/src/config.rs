//! Configuration loading and parsing

use anyhow::{Context, Result};
use memory_protocol::ProtocolConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration (loaded from a TOML file)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub callbacks: CallbacksConfig,
}

/// Where the protocol callbacks come from
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CallbacksConfig {
    /// C library providing the callbacks; the in-process store is used when absent
    pub library: Option<PathBuf>,
    #[serde(default)]
    pub symbols: SymbolNames,
}

/// Exported symbol names for each operation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SymbolNames {
    #[serde(default = "default_open")]
    pub open: String,
    #[serde(default = "default_read")]
    pub read: String,
    #[serde(default = "default_write")]
    pub write: String,
    #[serde(default = "default_seek")]
    pub seek: String,
    #[serde(default = "default_close")]
    pub close: String,
    /// Optional entry point receiving the handle accessor table
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_open() -> String {
    "memory_open".to_string()
}

fn default_read() -> String {
    "memory_read".to_string()
}

fn default_write() -> String {
    "memory_write".to_string()
}

fn default_seek() -> String {
    "memory_seek".to_string()
}

fn default_close() -> String {
    "memory_close".to_string()
}

fn default_bind() -> String {
    "memory_bind".to_string()
}

impl Default for SymbolNames {
    fn default() -> Self {
        Self {
            open: default_open(),
            read: default_read(),
            write: default_write(),
            seek: default_seek(),
            close: default_close(),
            bind: default_bind(),
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_protocol::DispatchMode;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [protocol]
            name = "buffer"
            dispatch = "snapshot_on_open"

            [callbacks]
            library = "libcallbacks.so"

            [callbacks.symbols]
            read = "my_read"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.protocol.name, "buffer");
        assert_eq!(config.protocol.whitelist(), "buffer");
        assert_eq!(config.protocol.dispatch, DispatchMode::SnapshotOnOpen);
        assert_eq!(config.callbacks.library, Some(PathBuf::from("libcallbacks.so")));
        assert_eq!(config.callbacks.symbols.read, "my_read");
        assert_eq!(config.callbacks.symbols.open, "memory_open");
    }

    #[test]
    fn test_empty_config() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.protocol, ProtocolConfig::default());
        assert!(config.callbacks.library.is_none());
        assert_eq!(config.callbacks.symbols, SymbolNames::default());
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memio.toml");
        fs::write(&path, "[protocol]\ndispatch = \"live\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.protocol.dispatch, DispatchMode::Live);
        assert!(load_config(&dir.path().join("missing.toml")).is_err());
    }
}
