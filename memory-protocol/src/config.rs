//! Protocol configuration types

use serde::{Deserialize, Serialize};

/// Default protocol name
pub const DEFAULT_PROTOCOL_NAME: &str = "memory";

/// How a handle finds its callbacks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Read the registry on every call
    #[default]
    Live,
    /// Capture the registry on open and use that set until close
    SnapshotOnOpen,
}

/// Configuration for a protocol instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Scheme used in identifiers (`<name>:<suffix>`)
    #[serde(default = "default_name")]
    pub name: String,

    /// Protocols allowed to instantiate this one implicitly (defaults to `name`)
    #[serde(default)]
    pub whitelist: Option<String>,

    #[serde(default)]
    pub dispatch: DispatchMode,
}

fn default_name() -> String {
    DEFAULT_PROTOCOL_NAME.to_string()
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            whitelist: None,
            dispatch: DispatchMode::default(),
        }
    }
}

impl ProtocolConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the protocol name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder method: set an explicit whitelist
    pub fn with_whitelist(mut self, whitelist: impl Into<String>) -> Self {
        self.whitelist = Some(whitelist.into());
        self
    }

    /// Builder method: set the dispatch mode
    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Effective whitelist
    pub fn whitelist(&self) -> &str {
        self.whitelist.as_deref().unwrap_or(&self.name)
    }
}
