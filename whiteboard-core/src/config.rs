//! Configuration for filtered publishers

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WhiteboardError};
use crate::filter::PropertyFilter;

/// Name used when none is configured
pub const DEFAULT_PUBLISHER_NAME: &str = "filtered-publisher";

/// Publisher configuration
///
/// ```json
/// {
///   "name": "jaxrs-resources",
///   "filter": {
///     "conditions": [
///       {"op": "present", "key": "osgi.jaxrs.resource"},
///       {"op": "like", "key": "osgi.jaxrs.name", "pattern": "app.*"}
///     ]
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Name attached to log events
    #[serde(default = "default_name")]
    pub name: String,

    /// Filter entities must match to be published. Absent means match-all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<PropertyFilter>,
}

fn default_name() -> String {
    DEFAULT_PUBLISHER_NAME.to_string()
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            filter: None,
        }
    }
}

impl PublisherConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: PropertyFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| WhiteboardError::IoError {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(WhiteboardError::InvalidConfig {
                reason: "name must not be empty".to_string(),
            });
        }
        if let Some(filter) = &self.filter {
            filter.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: PublisherConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PublisherConfig::default());
        assert_eq!(config.name, DEFAULT_PUBLISHER_NAME);
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = PublisherConfig::from_json(r#"{"name": "  "}"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_round_trip_skips_absent_filter() {
        let json = serde_json::to_string(&PublisherConfig::new("apps")).unwrap();
        assert_eq!(json, r#"{"name":"apps"}"#);
    }
}
