//! Named profile sets with parent inheritance.
//!
//! A profile is a partial configuration that may name a `PARENT` profile in the
//! same set. Resolving a profile walks the parent chain to its root and merges
//! from the root down, so descendants override their ancestors.

use crate::{ConfigValue, ConfigurationSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Option naming a profile's parent.
pub const PARENT_KEY: &str = "PARENT";

/// Errors resolving a profile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    /// A profile in the chain does not exist.
    #[error("profile '{profile}' does not exist in set '{set}'")]
    Missing {
        /// Profile set name.
        set: String,
        /// Missing profile id.
        profile: String,
    },

    /// The parent chain loops back on itself.
    #[error("profile '{profile}' in set '{set}' has a cyclic PARENT chain")]
    Cycle {
        /// Profile set name.
        set: String,
        /// First profile seen twice.
        profile: String,
    },
}

/// A named collection of profiles keyed by profile id.
///
/// Serializes as `{"name": ..., "profiles": {id: {option: value}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSet {
    name: String,
    profiles: BTreeMap<String, ConfigurationSet>,
}

impl ProfileSet {
    /// Create an empty profile set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profiles: BTreeMap::new(),
        }
    }

    /// Name of this set.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a profile, returning the one it replaced.
    ///
    /// A replaced profile usually means the same id was declared twice.
    pub fn insert(&mut self, id: impl Into<String>, profile: ConfigurationSet) -> Option<ConfigurationSet> {
        self.profiles.insert(id.into(), profile)
    }

    /// Get a profile without resolving its parents.
    pub fn get(&self, id: &str) -> Option<&ConfigurationSet> {
        self.profiles.get(id)
    }

    /// Number of profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Resolve a profile and all of its ancestors into one flat set.
    ///
    /// The returned set never contains the `PARENT` key.
    pub fn resolve(&self, id: &str) -> Result<ConfigurationSet, ProfileError> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = id.to_string();

        loop {
            if !seen.insert(current.clone()) {
                return Err(ProfileError::Cycle {
                    set: self.name.clone(),
                    profile: current,
                });
            }
            let profile = self.profiles.get(&current).ok_or_else(|| ProfileError::Missing {
                set: self.name.clone(),
                profile: current.clone(),
            })?;
            chain.push(profile);

            match profile.get(PARENT_KEY) {
                Some(parent) => current = parent_id(parent),
                None => break,
            }
        }

        let mut resolved = ConfigurationSet::new();
        for profile in chain.into_iter().rev() {
            for (key, value) in profile.iter() {
                if key != PARENT_KEY {
                    resolved.set(key, value.clone());
                }
            }
        }
        Ok(resolved)
    }
}

fn parent_id(value: &ConfigValue) -> String {
    match value {
        ConfigValue::Text(text) => text.trim().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(pairs: &[(&str, &str)]) -> ConfigurationSet {
        pairs
            .iter()
            .map(|(k, v)| (*k, ConfigValue::parse_literal(v)))
            .collect()
    }

    #[test]
    fn test_resolve_merges_root_first() {
        let mut set = ProfileSet::new("hosts");
        set.insert("1", profile(&[("speed", "10"), ("name", "base")]));
        set.insert("2", profile(&[("PARENT", "1"), ("speed", "20")]));
        set.insert("3", profile(&[("PARENT", "2"), ("name", "leaf")]));

        let resolved = set.resolve("3").unwrap();

        assert_eq!(resolved.get_int("speed").unwrap(), 20);
        assert_eq!(resolved.get_text("name").unwrap(), "leaf");
        assert!(!resolved.contains(PARENT_KEY));
    }

    #[test]
    fn test_missing_parent_is_error() {
        let mut set = ProfileSet::new("hosts");
        set.insert("2", profile(&[("PARENT", "1")]));

        assert_eq!(
            set.resolve("2"),
            Err(ProfileError::Missing {
                set: "hosts".into(),
                profile: "1".into(),
            })
        );
    }

    #[test]
    fn test_cycle_is_error() {
        let mut set = ProfileSet::new("hosts");
        set.insert("a", profile(&[("PARENT", "b")]));
        set.insert("b", profile(&[("PARENT", "a")]));

        assert!(matches!(set.resolve("a"), Err(ProfileError::Cycle { .. })));
    }

    #[test]
    fn test_duplicate_insert_returns_previous() {
        let mut set = ProfileSet::new("hosts");
        assert!(set.insert("1", profile(&[("speed", "1")])).is_none());
        assert!(set.insert("1", profile(&[("speed", "2")])).is_some());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_load_from_json() {
        let set: ProfileSet = serde_json::from_str(
            r#"{"name": "runs", "profiles": {"base": {"sched.end_time": 50.0}, "fast": {"PARENT": "base", "sched.algorithm": "heap"}}}"#,
        )
        .unwrap();

        let resolved = set.resolve("fast").unwrap();

        assert_eq!(set.name(), "runs");
        assert_eq!(resolved.get_float("sched.end_time").unwrap(), 50.0);
        assert_eq!(resolved.get_text("sched.algorithm").unwrap(), "heap");
    }
}
