//! Names of the persisted collections and the initial board layout.

use crate::{
    domain::Collection,
    error::{BoardError, Result},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path};

/// Local cache keys, one per collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalKeys {
    pub boards: String,
    pub deleted: String,
    pub archive: String,
}

impl Default for LocalKeys {
    fn default() -> Self {
        Self {
            boards: "trello-clone-to-dos".to_string(),
            deleted: "deleted-cards".to_string(),
            archive: "archive-cards".to_string(),
        }
    }
}

impl LocalKeys {
    pub fn key_for(&self, collection: Collection) -> &str {
        match collection {
            Collection::Boards => &self.boards,
            Collection::Deleted => &self.deleted,
            Collection::Archive => &self.archive,
        }
    }
}

/// Remote names: a document for the boards, a collection for each record set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteNames {
    pub boards_document: String,
    pub deleted_collection: String,
    pub archive_collection: String,
}

impl Default for RemoteNames {
    fn default() -> Self {
        let local = LocalKeys::default();
        Self {
            boards_document: local.boards,
            deleted_collection: local.deleted,
            archive_collection: local.archive,
        }
    }
}

impl RemoteNames {
    pub fn name_for(&self, collection: Collection) -> &str {
        match collection {
            Collection::Boards => &self.boards_document,
            Collection::Deleted => &self.deleted_collection,
            Collection::Archive => &self.archive_collection,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub local: LocalKeys,
    pub remote: RemoteNames,
    /// Titles of the boards created when no tier has any
    pub default_boards: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            local: LocalKeys::default(),
            remote: RemoteNames::default(),
            default_boards: vec!["To Do".to_string(), "Doing".to_string(), "Done".to_string()],
        }
    }
}

impl SyncConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| BoardError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Keys must be non-empty and distinct within each tier
    pub fn validate(&self) -> Result<()> {
        check_names(
            "local key",
            Collection::ALL.iter().map(|c| self.local.key_for(*c)),
        )?;
        check_names(
            "remote name",
            Collection::ALL.iter().map(|c| self.remote.name_for(*c)),
        )?;
        Ok(())
    }
}

fn check_names<'a>(what: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(BoardError::ConfigError(format!("empty {}", what)));
        }
        if !seen.insert(name) {
            return Err(BoardError::ConfigError(format!("duplicate {} '{}'", what, name)));
        }
    }
    Ok(())
}
