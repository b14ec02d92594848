//! Configuration values and the merged configuration set.

use crate::ProfileError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Errors raised by the configuration store or when reading options.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The backing store has not been initialized or could not be opened.
    #[error("configuration store unavailable: {0}")]
    StoreUnavailable(String),

    /// The backing store failed while reading or writing.
    #[error("configuration storage error: {0}")]
    Storage(String),

    /// A single option was requested but is not set.
    #[error("missing configuration option '{0}'")]
    MissingOption(String),

    /// Options required before the runtime phase are not set.
    #[error("missing required configuration options: {}", .0.join(", "))]
    MissingOptions(Vec<String>),

    /// An option holds a value of a different type than requested.
    #[error("option '{key}' is {found}, expected {expected}")]
    TypeMismatch {
        /// Option name.
        key: String,
        /// Requested type.
        expected: &'static str,
        /// Stored type.
        found: &'static str,
    },

    /// A `key=value` override could not be parsed.
    #[error("invalid override '{0}', expected key=value")]
    InvalidOverride(String),

    /// The store refused a value.
    #[error("option '{key}' rejected: {reason}")]
    Rejected {
        /// Option name.
        key: String,
        /// Why the store refused it.
        reason: String,
    },

    /// A configuration profile could not be resolved.
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// A typed configuration scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Free-form text.
    Text(String),
}

impl ConfigValue {
    /// Parse a literal from the command line or a profile.
    ///
    /// `true`/`false` become booleans, integers and floats are recognized,
    /// anything else is kept as text.
    pub fn parse_literal(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed {
            "true" => return ConfigValue::Bool(true),
            "false" => return ConfigValue::Bool(false),
            _ => {}
        }
        if let Ok(int) = trimmed.parse::<i64>() {
            return ConfigValue::Int(int);
        }
        if let Ok(float) = trimmed.parse::<f64>() {
            if float.is_finite() {
                return ConfigValue::Float(float);
            }
        }
        ConfigValue::Text(trimmed.to_string())
    }

    /// Human-readable type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Int(_) => "int",
            ConfigValue::Float(_) => "float",
            ConfigValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(v) => write!(f, "{v}"),
            ConfigValue::Int(v) => write!(f, "{v}"),
            ConfigValue::Float(v) => write!(f, "{v}"),
            ConfigValue::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

/// Mapping from option name to value.
///
/// Ordered by option name so that dumps are identical across ranks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationSet {
    options: BTreeMap<String, ConfigValue>,
}

impl ConfigurationSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from `key=value` overrides.
    pub fn from_overrides<I, S>(overrides: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for raw in overrides {
            set.parse_override(raw.as_ref())?;
        }
        Ok(set)
    }

    /// Set an option, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Option<ConfigValue> {
        self.options.insert(key.into(), value.into())
    }

    /// Set an option only if it is not already present.
    ///
    /// Returns true if the value was inserted.
    pub fn set_if_absent(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> bool {
        match self.options.entry(key.into()) {
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(value.into());
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Apply a `key=value` override.
    pub fn parse_override(&mut self, raw: &str) -> Result<(), ConfigError> {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidOverride(raw.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::InvalidOverride(raw.to_string()));
        }
        self.set(key, ConfigValue::parse_literal(value));
        Ok(())
    }

    /// Overlay every option of `other` onto this set.
    pub fn extend(&mut self, other: ConfigurationSet) {
        self.options.extend(other.options);
    }

    /// Get a raw value.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.options.get(key)
    }

    /// Check if an option is present.
    pub fn contains(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    /// Get a text option.
    pub fn get_text(&self, key: &str) -> Result<&str, ConfigError> {
        match self.require(key)? {
            ConfigValue::Text(v) => Ok(v),
            other => Err(mismatch(key, "text", other)),
        }
    }

    /// Get an integer option.
    pub fn get_int(&self, key: &str) -> Result<i64, ConfigError> {
        match self.require(key)? {
            ConfigValue::Int(v) => Ok(*v),
            other => Err(mismatch(key, "int", other)),
        }
    }

    /// Get a float option. Integers are widened.
    pub fn get_float(&self, key: &str) -> Result<f64, ConfigError> {
        match self.require(key)? {
            ConfigValue::Float(v) => Ok(*v),
            ConfigValue::Int(v) => Ok(*v as f64),
            other => Err(mismatch(key, "float", other)),
        }
    }

    /// Get a boolean option.
    pub fn get_bool(&self, key: &str) -> Result<bool, ConfigError> {
        match self.require(key)? {
            ConfigValue::Bool(v) => Ok(*v),
            other => Err(mismatch(key, "bool", other)),
        }
    }

    /// Names from `required` that are not present, in the order given.
    pub fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|key| !self.contains(key))
            .collect()
    }

    /// Iterate options in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of options.
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    fn require(&self, key: &str) -> Result<&ConfigValue, ConfigError> {
        self.options
            .get(key)
            .ok_or_else(|| ConfigError::MissingOption(key.to_string()))
    }
}

fn mismatch(key: &str, expected: &'static str, found: &ConfigValue) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: found.type_name(),
    }
}

impl<K: Into<String>, V: Into<ConfigValue>> FromIterator<(K, V)> for ConfigurationSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            options: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal() {
        assert_eq!(ConfigValue::parse_literal("true"), ConfigValue::Bool(true));
        assert_eq!(ConfigValue::parse_literal(" 42 "), ConfigValue::Int(42));
        assert_eq!(ConfigValue::parse_literal("2.5"), ConfigValue::Float(2.5));
        assert_eq!(
            ConfigValue::parse_literal("calendar"),
            ConfigValue::Text("calendar".into())
        );
        // Non-finite floats stay text.
        assert_eq!(
            ConfigValue::parse_literal("inf"),
            ConfigValue::Text("inf".into())
        );
    }

    #[test]
    fn test_typed_getters() {
        let set: ConfigurationSet = [
            ("log.level", ConfigValue::from("debug")),
            ("rng.seed", ConfigValue::from(7i64)),
            ("sched.end_time", ConfigValue::from(10.5)),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.get_text("log.level").unwrap(), "debug");
        assert_eq!(set.get_int("rng.seed").unwrap(), 7);
        assert_eq!(set.get_float("rng.seed").unwrap(), 7.0);
        assert_eq!(set.get_float("sched.end_time").unwrap(), 10.5);

        assert_eq!(
            set.get_int("log.level"),
            Err(ConfigError::TypeMismatch {
                key: "log.level".into(),
                expected: "int",
                found: "text",
            })
        );
        assert_eq!(
            set.get_bool("absent"),
            Err(ConfigError::MissingOption("absent".into()))
        );
    }

    #[test]
    fn test_set_if_absent_keeps_existing() {
        let mut set = ConfigurationSet::new();
        set.set("log.level", "warn");

        assert!(!set.set_if_absent("log.level", "info"));
        assert!(set.set_if_absent("output.dir", "out"));
        assert_eq!(set.get_text("log.level").unwrap(), "warn");
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_overrides() {
        let set = ConfigurationSet::from_overrides(["sched.algorithm=heap", "rng.seed = 3"]).unwrap();

        assert_eq!(set.get_text("sched.algorithm").unwrap(), "heap");
        assert_eq!(set.get_int("rng.seed").unwrap(), 3);

        assert_eq!(
            ConfigurationSet::from_overrides(["no-equals"]),
            Err(ConfigError::InvalidOverride("no-equals".into()))
        );
        assert_eq!(
            ConfigurationSet::from_overrides(["=value"]),
            Err(ConfigError::InvalidOverride("=value".into()))
        );
    }

    #[test]
    fn test_missing_reports_in_order() {
        let mut set = ConfigurationSet::new();
        set.set("b", 1i64);

        assert_eq!(set.missing(&["a", "b", "c"]), vec!["a", "c"]);
    }

    #[test]
    fn test_json_is_flat_map() {
        let mut set = ConfigurationSet::new();
        set.set("log.level", "info");
        set.set("rng.seed", 0i64);

        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"log.level":"info","rng.seed":0}"#);

        let back: ConfigurationSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
