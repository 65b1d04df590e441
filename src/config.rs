//! Agent configuration
//!
//! Identity values stamped onto every span. Resolution order mirrors the
//! usual agent deployment: explicit config file, then environment, then
//! built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Error type for configuration loading
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read
    Io(std::io::Error),
    /// Config file content failed to parse
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "failed to parse config file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

/// Component name used in span naming and the component tag
pub const DEFAULT_COMPONENT: &str = "Couchbase";

/// SDK version tagged when dynamic extraction is unavailable
pub const DEFAULT_SDK_VERSION: &str = "3.7.9";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Component identity (first segment of every span name)
    pub component: String,
    /// SDK version fallback for the version tag
    pub sdk_version: String,
    /// Service name reported in agent diagnostics
    pub service_name: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            component: DEFAULT_COMPONENT.to_string(),
            sdk_version: DEFAULT_SDK_VERSION.to_string(),
            service_name: "couchbase-agent".to_string(),
        }
    }
}

impl AgentConfig {
    /// Build from environment variables, falling back to defaults.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `CB_AGENT_COMPONENT` | `Couchbase` |
    /// | `CB_AGENT_SDK_VERSION` | `3.7.9` |
    /// | `CB_AGENT_SERVICE` | `couchbase-agent` |
    pub fn from_env() -> Self {
        let defaults = AgentConfig::default();
        AgentConfig {
            component: std::env::var("CB_AGENT_COMPONENT").unwrap_or(defaults.component),
            sdk_version: std::env::var("CB_AGENT_SDK_VERSION").unwrap_or(defaults.sdk_version),
            service_name: std::env::var("CB_AGENT_SERVICE").unwrap_or(defaults.service_name),
        }
    }

    /// Parse from TOML content
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load from a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content).map_err(ConfigError::Parse)
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    pub fn with_sdk_version(mut self, sdk_version: impl Into<String>) -> Self {
        self.sdk_version = sdk_version.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.component, "Couchbase");
        assert_eq!(config.sdk_version, "3.7.9");
    }

    #[test]
    fn test_from_toml_partial() {
        let config = AgentConfig::from_toml_str("sdk_version = \"3.8.0\"\n").unwrap();
        assert_eq!(config.sdk_version, "3.8.0");
        assert_eq!(config.component, "Couchbase");
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "component = \"Couchbase\"").unwrap();
        writeln!(file, "service_name = \"orders-api\"").unwrap();
        let config = AgentConfig::load(file.path()).unwrap();
        assert_eq!(config.service_name, "orders-api");

        assert!(AgentConfig::load("/nonexistent/agent.toml").is_err());
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "component = [not toml").unwrap();
        assert!(matches!(
            AgentConfig::load(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_builders() {
        let config = AgentConfig::default()
            .with_component("CouchbaseTest")
            .with_sdk_version("0.0.1");
        assert_eq!(config.component, "CouchbaseTest");
        assert_eq!(config.sdk_version, "0.0.1");
    }
}
