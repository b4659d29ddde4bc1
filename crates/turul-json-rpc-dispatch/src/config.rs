//! Dispatch configuration
//!
//! Plain serde struct with defaults, loadable from TOML:
//!
//! ```toml
//! debug = true
//! notification_errors = false
//! strict_version = true
//! convert_camel_case = false
//! trim_log_values = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the dispatch pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Include fault detail (panic text, validation detail) as error `data`
    pub debug: bool,
    /// Answer failed notifications with an error response (`id: null`)
    pub notification_errors: bool,
    /// Require `"jsonrpc": "2.0"` on every request
    pub strict_version: bool,
    /// Rewrite camelCase method names and keyword-param keys to snake_case
    pub convert_camel_case: bool,
    /// Run the items of a batch concurrently
    pub concurrent_batches: bool,
    /// Log every inbound payload
    pub log_requests: bool,
    /// Log every outbound response
    pub log_responses: bool,
    /// Shorten long strings and lists in log lines; on unless disabled
    pub trim_log_values: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            debug: false,
            notification_errors: false,
            strict_version: true,
            convert_camel_case: false,
            concurrent_batches: true,
            log_requests: true,
            log_responses: true,
            trim_log_values: true,
        }
    }
}

impl DispatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Load a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn debug(mut self, enable: bool) -> Self {
        self.debug = enable;
        self
    }

    pub fn notification_errors(mut self, enable: bool) -> Self {
        self.notification_errors = enable;
        self
    }

    pub fn strict_version(mut self, enable: bool) -> Self {
        self.strict_version = enable;
        self
    }

    pub fn convert_camel_case(mut self, enable: bool) -> Self {
        self.convert_camel_case = enable;
        self
    }

    pub fn concurrent_batches(mut self, enable: bool) -> Self {
        self.concurrent_batches = enable;
        self
    }

    pub fn log_requests(mut self, enable: bool) -> Self {
        self.log_requests = enable;
        self
    }

    pub fn log_responses(mut self, enable: bool) -> Self {
        self.log_responses = enable;
        self
    }

    pub fn trim_log_values(mut self, enable: bool) -> Self {
        self.trim_log_values = enable;
        self
    }
}
