//! Service configuration (spec §6): defaults, TOML loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::processor::FilterPolicy;

fn default_max_events_per_tag() -> usize {
    1000
}
fn default_pipe_name() -> String {
    "ProcTailIPC".to_string()
}
fn default_max_concurrent_connections() -> usize {
    10
}
fn default_response_timeout_seconds() -> u64 {
    30
}
fn default_connection_timeout_seconds() -> u64 {
    10
}
fn default_min_process_id() -> i32 {
    0
}

/// Full service configuration (spec §6). Loaded from TOML with every field
/// optional; absent fields take the documented default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_events_per_tag: usize,
    pub pipe_name: String,
    pub max_concurrent_connections: usize,
    pub response_timeout_seconds: u64,
    pub connection_timeout_seconds: u64,
    pub enabled_providers: Vec<String>,
    pub enabled_event_names: Vec<String>,
    pub exclude_system_processes: bool,
    pub min_process_id: i32,
    pub excluded_process_names: Vec<String>,
    pub include_file_extensions: Vec<String>,
    pub exclude_file_patterns: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_events_per_tag: default_max_events_per_tag(),
            pipe_name: default_pipe_name(),
            max_concurrent_connections: default_max_concurrent_connections(),
            response_timeout_seconds: default_response_timeout_seconds(),
            connection_timeout_seconds: default_connection_timeout_seconds(),
            enabled_providers: Vec::new(),
            enabled_event_names: Vec::new(),
            exclude_system_processes: false,
            min_process_id: default_min_process_id(),
            excluded_process_names: Vec::new(),
            include_file_extensions: Vec::new(),
            exclude_file_patterns: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file, falling back to defaults for
    /// any field the file omits.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
        let config: Config = toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Loads from `path` if it exists, otherwise returns the default
    /// configuration (spec §6 — config is optional).
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }

    #[must_use]
    pub fn filter_policy(&self) -> FilterPolicy {
        FilterPolicy {
            enabled_providers: self.enabled_providers.clone(),
            enabled_event_names: self.enabled_event_names.clone(),
            exclude_system_processes: self.exclude_system_processes,
            min_process_id: self.min_process_id,
            excluded_process_names: self.excluded_process_names.clone(),
            include_file_extensions: self.include_file_extensions.clone(),
            exclude_file_patterns: self.exclude_file_patterns.clone(),
        }
    }
}
