// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::bridge::abi::ClockUnit;
use crate::channel::Topology;
use crate::config::consts::{
    DEFAULT_INPUT_CAPACITY, DEFAULT_LOG_FILTER, DEFAULT_MODULE_SOURCE, MAX_INPUT_CAPACITY,
};
use crate::errors::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Host configuration.
///
/// Every section is optional; a missing file section takes its defaults, so
/// an empty document is a valid configuration.
///
/// # Fields
/// * `module` - Where to fetch the interpreter binary
/// * `topology` - Run the module inline or on a worker thread
/// * `abi` - Host-side ABI settings the binary cannot declare itself
/// * `log_filter` - Tracing filter used when `RUST_LOG` is unset
///
/// # Example
/// ```yaml
/// module:
///   source: ./loxi.wasm
/// topology: isolated
/// abi:
///   input_capacity: 4096
///   clock_unit: nanoseconds
/// log_filter: warn
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub module: ModuleConfig,
    #[serde(default)]
    pub topology: Topology,
    #[serde(default)]
    pub abi: AbiConfig,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            module: ModuleConfig::default(),
            topology: Topology::default(),
            abi: AbiConfig::default(),
            log_filter: default_log_filter(),
        }
    }
}

/// Interpreter binary location: a filesystem path or an `http(s)://` URL.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModuleConfig {
    #[serde(default = "default_module_source")]
    pub source: String,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            source: default_module_source(),
        }
    }
}

/// ABI settings.
///
/// # Fields
/// * `input_capacity` - Bytes the legacy `read_in(ptr)` import may write
/// * `clock_unit` - Unit returned by `time_now`
///
/// # Example
/// ```
/// use loxi_host::bridge::abi::ClockUnit;
/// use loxi_host::config::AbiConfig;
///
/// let abi = AbiConfig::default();
/// assert_eq!(abi.input_capacity, 4096);
/// assert_eq!(abi.clock_unit, ClockUnit::Nanoseconds);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AbiConfig {
    #[serde(default = "default_input_capacity")]
    pub input_capacity: usize,
    #[serde(default)]
    pub clock_unit: ClockUnit,
}

impl Default for AbiConfig {
    fn default() -> Self {
        Self {
            input_capacity: default_input_capacity(),
            clock_unit: ClockUnit::default(),
        }
    }
}

fn default_module_source() -> String {
    DEFAULT_MODULE_SOURCE.to_string()
}

fn default_input_capacity() -> usize {
    DEFAULT_INPUT_CAPACITY
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl HostConfig {
    /// Reject values that parse but cannot work.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.module.source.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "module.source",
                reason: "must name a path or URL".to_string(),
            });
        }
        if self.abi.input_capacity == 0 || self.abi.input_capacity > MAX_INPUT_CAPACITY {
            return Err(ConfigError::InvalidValue {
                field: "abi.input_capacity",
                reason: format!(
                    "{} is outside 1..={}",
                    self.abi.input_capacity, MAX_INPUT_CAPACITY
                ),
            });
        }
        Ok(())
    }
}

/// Load a config from a YAML or TOML file, chosen by extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> ConfigResult<HostConfig> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match extension.as_str() {
        "yaml" | "yml" => parse_yaml(&content),
        "toml" => parse_toml(&content),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Load a config and validate its values.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> ConfigResult<HostConfig> {
    let cfg = load_config(path)?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn parse_yaml(content: &str) -> ConfigResult<HostConfig> {
    // serde_yaml reads an empty document as null rather than an empty map.
    if content.trim().is_empty() {
        return Ok(HostConfig::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

pub fn parse_toml(content: &str) -> ConfigResult<HostConfig> {
    Ok(toml::from_str(content)?)
}
