//! Manager configuration
//!
//! Loadable from JSON, every field optional:
//!
//! ```json
//! { "stopRoles": ["section", "paragraph", "listitem"], "criteriaCacheCapacity": 64 }
//! ```

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for a [`Manager`](crate::Manager)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ManagerConfig {
    /// Container roles navigation stops inside of (landing on the leaf
    /// rather than on the container)
    pub stop_roles: Vec<String>,
    /// Parsed criterion keys kept in the LRU cache
    pub criteria_cache_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            stop_roles: vec!["section".to_string(), "paragraph".to_string()],
            criteria_cache_capacity: 64,
        }
    }
}

impl ManagerConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ManagerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.criteria_cache_capacity == 0 {
            return Err(ConfigError::Invalid("criteriaCacheCapacity must be at least 1"));
        }
        Ok(())
    }

    #[inline]
    pub fn is_stop_role(&self, role: &str) -> bool {
        self.stop_roles.iter().any(|r| r == role)
    }

    pub(crate) fn cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.criteria_cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert!(config.is_stop_role("paragraph"));
        assert!(!config.is_stop_role("link"));
        assert_eq!(config.cache_capacity().get(), 64);
    }

    #[test]
    fn test_from_json_partial() {
        let config = ManagerConfig::from_json(r#"{"stopRoles": ["listitem"]}"#).unwrap();
        assert_eq!(config.stop_roles, vec!["listitem"]);
        assert_eq!(config.criteria_cache_capacity, 64);
    }

    #[test]
    fn test_from_json_rejects_zero_capacity() {
        let err = ManagerConfig::from_json(r#"{"criteriaCacheCapacity": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(matches!(
            ManagerConfig::from_json("{not json").unwrap_err(),
            ConfigError::Json(_)
        ));
    }
}
