//! Typed views on one configuration mapping.

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use trackd_errors::{ConfigError, ConfigResult};
use trackd_types::RigidTransform;

use crate::transform::TransformConfig;

/// A named YAML mapping with typed lookups.
///
/// Every failed lookup produces a [`ConfigError`] carrying the section name
/// and the key, so startup errors point at the offending line of the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigSection {
    name: String,
    map: Mapping,
}

impl ConfigSection {
    /// Wrap a mapping under `name`.
    pub fn new(name: impl Into<String>, map: Mapping) -> Self {
        Self {
            name: name.into(),
            map,
        }
    }

    /// Build a section from YAML text, mainly for tests and embedders.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the text is not a YAML mapping.
    pub fn from_yaml(name: impl Into<String>, yaml: &str) -> ConfigResult<Self> {
        let name = name.into();
        let value: Value = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Load {
            path: name.clone(),
            message: e.to_string(),
        })?;
        match value {
            Value::Mapping(map) => Ok(Self::new(name, map)),
            Value::Null => Ok(Self::new(name, Mapping::new())),
            _ => Err(ConfigError::Load {
                path: name,
                message: "expected a mapping".to_string(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Keys in file order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().filter_map(Value::as_str)
    }

    /// Optional typed value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the key exists but does not
    /// deserialize as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> ConfigResult<Option<T>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_yaml::from_value(value.clone())
                .map(Some)
                .map_err(|e| ConfigError::invalid_value(&self.name, key, e.to_string())),
        }
    }

    /// Typed value with a default for a missing key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a malformed value.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> ConfigResult<T> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Mandatory typed value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] if absent, or
    /// [`ConfigError::InvalidValue`] if malformed.
    pub fn require<T: DeserializeOwned>(&self, key: &str) -> ConfigResult<T> {
        self.get(key)?
            .ok_or_else(|| ConfigError::missing_key(&self.name, key))
    }

    /// Deserialize the whole section as one struct.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the mapping does not match `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        serde_yaml::from_value(Value::Mapping(self.map.clone()))
            .map_err(|e| ConfigError::invalid_value(&self.name, "<section>", e.to_string()))
    }

    /// Per-slot value: looks up `key<i>` first, then `key` as the shared default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a malformed value.
    pub fn indexed<T: DeserializeOwned>(&self, key: &str, index: usize) -> ConfigResult<Option<T>> {
        let slot_key = format!("{key}{index}");
        match self.get(&slot_key)? {
            Some(value) => Ok(Some(value)),
            None => self.get(key),
        }
    }

    /// Per-slot value with a default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a malformed value.
    pub fn indexed_or<T: DeserializeOwned>(
        &self,
        key: &str,
        index: usize,
        default: T,
    ) -> ConfigResult<T> {
        Ok(self.indexed(key, index)?.unwrap_or(default))
    }

    /// Nested section; a missing key yields [`ConfigError::MissingSection`].
    ///
    /// # Errors
    ///
    /// Returns an error if the key is absent or not a mapping.
    pub fn subsection(&self, key: &str) -> ConfigResult<ConfigSection> {
        self.subsection_opt(key)?
            .ok_or_else(|| ConfigError::MissingSection(self.child_name(key)))
    }

    /// Nested section if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the key is not a mapping.
    pub fn subsection_opt(&self, key: &str) -> ConfigResult<Option<ConfigSection>> {
        let name = self.child_name(key);
        match self.map.get(key) {
            None => Ok(None),
            Some(Value::Mapping(map)) => Ok(Some(ConfigSection::new(name, map.clone()))),
            Some(Value::Null) => Ok(Some(ConfigSection::new(name, Mapping::new()))),
            Some(_) => Err(ConfigError::invalid_value(
                &self.name,
                key,
                "expected a mapping",
            )),
        }
    }

    /// Optional rigid transform in `{translation, rotation}` form.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the value is not a transform.
    pub fn transform(&self, key: &str) -> ConfigResult<Option<RigidTransform>> {
        Ok(self
            .get::<TransformConfig>(key)?
            .map(|t| t.to_transform()))
    }

    /// Per-slot transform, `key<i>` then `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the value is not a transform.
    pub fn indexed_transform(&self, key: &str, index: usize) -> ConfigResult<Option<RigidTransform>> {
        Ok(self
            .indexed::<TransformConfig>(key, index)?
            .map(|t| t.to_transform()))
    }

    /// List of strings, empty if absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the value is not a string list.
    pub fn string_list(&self, key: &str) -> ConfigResult<Vec<String>> {
        self.get_or(key, Vec::new())
    }

    fn child_name(&self, key: &str) -> String {
        if self.name.is_empty() {
            key.to_string()
        } else {
            format!("{}/{key}", self.name)
        }
    }

    /// Error for an out-of-bounds value of `key`.
    pub fn invalid(&self, key: &str, message: impl Into<String>) -> ConfigError {
        ConfigError::invalid_value(&self.name, key, message)
    }
}
