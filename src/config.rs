//! Session configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, ScenarioError};
use crate::networks::read_json_file;

fn default_network() -> String {
    "development".to_string()
}

fn default_base_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_accounts() -> usize {
    10
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,
    /// Registry directory; `<base_path>/networks` when unset.
    #[serde(default)]
    pub networks_dir: Option<PathBuf>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub verbose: bool,
    /// Macro file loaded once at startup.
    #[serde(default)]
    pub macros: Option<PathBuf>,
    /// Accounts created on the in-memory dev chain.
    #[serde(default = "default_accounts")]
    pub accounts: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            network: default_network(),
            base_path: default_base_path(),
            networks_dir: None,
            dry_run: false,
            verbose: false,
            macros: None,
            accounts: default_accounts(),
        }
    }
}

impl SessionConfig {
    /// Reads a JSON config file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<SessionConfig> {
        let json = read_json_file(path)?;
        serde_json::from_value(json).map_err(|err| ScenarioError::persistence(path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = SessionConfig::load(&dir.path().join("scenario.json"))?;
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.network, "development");
        assert_eq!(config.accounts, 10);
        Ok(())
    }

    #[test]
    fn fields_override_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scenario.json");
        std::fs::write(&path, r#"{"network": "kovan", "dryRun": true, "macros": "macros.txt"}"#)?;
        let config = SessionConfig::load(&path)?;
        assert_eq!(config.network, "kovan");
        assert!(config.dry_run);
        assert_eq!(config.macros, Some(PathBuf::from("macros.txt")));
        assert_eq!(config.base_path, PathBuf::from("."));
        Ok(())
    }
}
