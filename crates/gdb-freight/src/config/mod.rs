//! Configuration loading and validation.

mod types;

pub use types::{Config, ExchangeConfig, WorkspaceConfig};

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ExchangeError, Result};

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ExchangeError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml(&content)?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Config> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ExchangeError::Config(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that don't touch the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.source.workspace.as_os_str().is_empty() {
            return Err(ExchangeError::Config(
                "source.workspace must not be empty".to_string(),
            ));
        }
        if self.target.workspace.as_os_str().is_empty() {
            return Err(ExchangeError::Config(
                "target.workspace must not be empty".to_string(),
            ));
        }
        if self.source.workspace == self.target.workspace {
            return Err(ExchangeError::Config(
                "source and target must be different workspaces".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
source:
  workspace: spoke.yaml
target:
  workspace: hub.yaml
"#;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.source.workspace.to_str(), Some("spoke.yaml"));
        assert_eq!(config.exchange.log_file.to_str(), Some("gdb-freight.log"));
        assert!(!config.exchange.notify);
        assert!(config.exchange.persist_target);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
source:
  workspace: /data/spoke.yaml
  label: county spoke
target:
  workspace: /data/hub.yaml
exchange:
  log_file: /var/log/exchange.log
  notify: true
  subject_prefix: "County exchange"
  persist_target: false
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.source.display_name(), "county spoke");
        assert_eq!(config.target.display_name(), "/data/hub.yaml");
        assert!(config.exchange.notify);
        assert!(!config.exchange.persist_target);
    }

    #[test]
    fn test_same_workspace_on_both_sides_rejected() {
        let yaml = r#"
source:
  workspace: same.yaml
target:
  workspace: same.yaml
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ExchangeError::Config(_)));
        assert!(err.to_string().contains("different"));
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = Config::from_yaml("source: [").unwrap_err();
        assert!(matches!(err, ExchangeError::Config(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::load("/nonexistent/config.yaml").unwrap_err();
        assert!(matches!(err, ExchangeError::Config(_)));
    }
}
