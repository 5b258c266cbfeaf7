use crate::{
    error::{BoardError, Result},
    storage::LocalCache,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// File-backed local cache: one JSON file per key
pub struct FileCache {
    root_path: PathBuf,
}

impl FileCache {
    const CACHE_DIR: &'static str = ".cardboard";
    const EXTENSION: &'static str = "json";

    /// Creates a cache rooted in `.cardboard` under the given directory
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            root_path: project_root.as_ref().join(Self::CACHE_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_path
    }

    fn entry_file(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(BoardError::ConfigError(format!(
                "cache key '{}' is not usable as a file name",
                key
            )));
        }
        Ok(self
            .root_path
            .join(format!("{}.{}", key, Self::EXTENSION)))
    }

    fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_path.exists() {
            fs::create_dir_all(&self.root_path)?;
        }
        Ok(())
    }
}

impl LocalCache for FileCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let file_path = self.entry_file(key)?;

        if !file_path.exists() {
            return Ok(None);
        }

        Ok(Some(fs::read_to_string(file_path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let file_path = self.entry_file(key)?;
        self.ensure_directory_exists()
            .map_err(|e| BoardError::PersistenceWriteFailed(e.to_string()))?;

        // Write then rename so a crash never leaves a truncated entry
        let staging = file_path.with_extension("tmp");
        fs::write(&staging, value)
            .and_then(|_| fs::rename(&staging, &file_path))
            .map_err(|e| BoardError::PersistenceWriteFailed(e.to_string()))
    }
}
