use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "merge.config.json";

/// Merge configuration file format. Every field is optional; command-line
/// flags take precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Build output directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<String>,

    /// JSON file providing the merge context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Dev server port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Pretty print build output
    #[serde(default = "default_pretty")]
    pub pretty: bool,

    #[serde(default = "default_indent")]
    pub indent: String,
}

fn default_pretty() -> bool {
    true
}

fn default_indent() -> String {
    "  ".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Invalid config file {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn out_dir(&self, cwd: &Path) -> Option<PathBuf> {
        self.out_dir.as_ref().map(|dir| cwd.join(dir))
    }

    pub fn state(&self, cwd: &Path) -> Option<PathBuf> {
        self.state.as_ref().map(|file| cwd.join(file))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            out_dir: None,
            state: None,
            port: None,
            pretty: default_pretty(),
            indent: default_indent(),
        }
    }
}
