//! Configuration types, deserialized from YAML.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration for one exchange run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where objects are read from.
    pub source: WorkspaceConfig,
    /// Where objects are written to.
    pub target: WorkspaceConfig,
    /// Run behavior knobs.
    #[serde(default)]
    pub exchange: ExchangeConfig,
}

/// One side's workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Path to the workspace snapshot file.
    pub workspace: PathBuf,
    /// Display name used in logs; defaults to the path.
    #[serde(default)]
    pub label: Option<String>,
}

impl WorkspaceConfig {
    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.workspace.display().to_string())
    }
}

/// Run behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Append the run report here.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// Deliver the run report through the notifier when the run finishes
    /// (or fails).
    #[serde(default)]
    pub notify: bool,
    /// Subject-line prefix for notifications.
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
    /// Write the target snapshot back to its file after a successful run.
    #[serde(default = "default_true")]
    pub persist_target: bool,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            notify: false,
            subject_prefix: default_subject_prefix(),
            persist_target: true,
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("gdb-freight.log")
}

fn default_subject_prefix() -> String {
    "Geodata exchange".to_string()
}

fn default_true() -> bool {
    true
}
