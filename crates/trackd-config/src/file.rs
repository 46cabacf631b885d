//! Configuration file loading and daemon-level settings.

use std::path::Path;
use std::time::Duration;

use serde_yaml::{Mapping, Value};
use tracing::debug;
use trackd_errors::{ConfigError, ConfigResult};

use crate::section::ConfigSection;

/// Top-level keys of a daemon configuration file.
pub mod keys {
    pub const DEVICE_NAMES: &str = "deviceNames";
    pub const CYCLE_TIMEOUT_MS: &str = "cycleTimeoutMs";
    pub const NOTIFY_WAITERS: &str = "notifyWaiters";
    pub const VIRTUAL_DEVICE_NAMES: &str = "virtualDeviceNames";
}

/// A parsed configuration file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    source: String,
    root: ConfigSection,
}

impl ConfigFile {
    /// Read and parse a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: source.clone(),
            message: e.to_string(),
        })?;
        debug!(path = %source, bytes = text.len(), "Loaded configuration file");
        Self::parse(source, &text)
    }

    /// Parse YAML text; `source` names it in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the text is not a YAML mapping.
    pub fn parse(source: impl Into<String>, text: &str) -> ConfigResult<Self> {
        let source = source.into();
        let value: Value = serde_yaml::from_str(text).map_err(|e| ConfigError::Load {
            path: source.clone(),
            message: e.to_string(),
        })?;
        let map = match value {
            Value::Mapping(map) => map,
            Value::Null => Mapping::new(),
            _ => {
                return Err(ConfigError::Load {
                    path: source,
                    message: "top level must be a mapping".to_string(),
                });
            }
        };
        Ok(Self {
            root: ConfigSection::new("", map),
            source,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &ConfigSection {
        &self.root
    }

    /// Top-level section named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSection`] if there is no such section.
    pub fn section(&self, name: &str) -> ConfigResult<ConfigSection> {
        self.root.subsection(name)
    }

    /// Daemon-level settings.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed top-level values or an empty device list.
    pub fn daemon(&self) -> ConfigResult<DaemonConfig> {
        DaemonConfig::from_section(&self.root)
    }
}

/// Settings that apply to the whole daemon rather than one device.
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonConfig {
    pub device_names: Vec<String>,
    /// Force-complete a cycle that has been open this long; `None` waits forever.
    pub cycle_timeout: Option<Duration>,
    pub notify_waiters: bool,
    pub virtual_device_names: Vec<String>,
}

impl DaemonConfig {
    /// Read daemon settings from the root section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] if `deviceNames` is missing or empty.
    pub fn from_section(root: &ConfigSection) -> ConfigResult<Self> {
        let device_names = root.string_list(keys::DEVICE_NAMES)?;
        if device_names.is_empty() {
            return Err(ConfigError::missing_key(root.name(), keys::DEVICE_NAMES));
        }
        let cycle_timeout = match root.get::<u64>(keys::CYCLE_TIMEOUT_MS)? {
            Some(0) => {
                return Err(root.invalid(keys::CYCLE_TIMEOUT_MS, "must be positive"));
            }
            other => other.map(Duration::from_millis),
        };
        Ok(Self {
            device_names,
            cycle_timeout,
            notify_waiters: root.get_or(keys::NOTIFY_WAITERS, true)?,
            virtual_device_names: root.string_list(keys::VIRTUAL_DEVICE_NAMES)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_daemon_defaults() -> TestResult {
        let file = ConfigFile::parse("inline", "deviceNames: [sim]\nsim:\n  type: simulated\n")?;
        let daemon = file.daemon()?;
        assert_eq!(daemon.device_names, vec!["sim"]);
        assert_eq!(daemon.cycle_timeout, None);
        assert!(daemon.notify_waiters);
        assert!(daemon.virtual_device_names.is_empty());
        assert_eq!(file.section("sim")?.require::<String>("type")?, "simulated");
        Ok(())
    }

    #[test]
    fn test_cycle_timeout() -> TestResult {
        let file = ConfigFile::parse("inline", "deviceNames: [a]\ncycleTimeoutMs: 250\n")?;
        assert_eq!(file.daemon()?.cycle_timeout, Some(Duration::from_millis(250)));

        let zero = ConfigFile::parse("inline", "deviceNames: [a]\ncycleTimeoutMs: 0\n")?;
        assert!(zero.daemon().is_err());
        Ok(())
    }

    #[test]
    fn test_missing_device_list() -> TestResult {
        let file = ConfigFile::parse("inline", "notifyWaiters: false\n")?;
        assert!(matches!(file.daemon(), Err(ConfigError::MissingKey { .. })));
        Ok(())
    }

    #[test]
    fn test_missing_section() -> TestResult {
        let file = ConfigFile::parse("inline", "deviceNames: [a]\n")?;
        assert_eq!(
            file.section("a").unwrap_err(),
            ConfigError::MissingSection("a".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_non_mapping_rejected() {
        assert!(ConfigFile::parse("inline", "- a\n- b\n").is_err());
    }
}
