use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScenarioError};
use crate::networks::{read_json_file, write_json_file};
use crate::value::Address;

/// Named address aliases persisted per network in `<network>-settings.json`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub aliases: BTreeMap<String, Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
}

pub fn settings_path(dir: &Path, network: &str) -> PathBuf {
    dir.join(format!("{network}-settings.json"))
}

impl Settings {
    pub fn load(dir: &Path, network: &str) -> Result<Settings> {
        let path = settings_path(dir, network);
        let json = read_json_file(&path)?;
        serde_json::from_value(json).map_err(|err| ScenarioError::persistence(&path, err))
    }

    pub fn save(&self, dir: &Path, network: &str) -> Result<()> {
        let path = settings_path(dir, network);
        let json = serde_json::to_value(self).map_err(|err| ScenarioError::persistence(&path, err))?;
        write_json_file(&path, &json)
    }

    pub fn with_alias(&self, name: &str, address: Address) -> Settings {
        let mut next = self.clone();
        next.aliases.insert(name.to_string(), address);
        next
    }

    pub fn lookup_alias(&self, name: &str) -> Option<Address> {
        self.aliases.get(name).copied().or_else(|| {
            self.aliases
                .iter()
                .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
                .map(|(_, address)| *address)
        })
    }

    /// Every alias that points at `address`.
    pub fn lookup_aliases(&self, address: &Address) -> Vec<String> {
        self.aliases
            .iter()
            .filter(|(_, target)| *target == address)
            .map(|(alias, _)| alias.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_defaults() -> Result<()> {
        let dir = tempdir().map_err(|err| ScenarioError::persistence("tmp", err))?;
        assert_eq!(Settings::load(dir.path(), "development")?, Settings::default());
        Ok(())
    }

    #[test]
    fn aliases_round_trip_through_disk() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let oracle = Address([7; 20]);
        let settings = Settings::default().with_alias("Oracle", oracle);
        settings.save(dir.path(), "development")?;
        let loaded = Settings::load(dir.path(), "development")?;
        assert_eq!(loaded.lookup_alias("oracle"), Some(oracle));
        assert_eq!(loaded.lookup_aliases(&oracle), vec!["Oracle".to_string()]);
        let text = std::fs::read_to_string(settings_path(dir.path(), "development"))?;
        assert!(text.contains("\n        \"Oracle\""));
        Ok(())
    }
}
