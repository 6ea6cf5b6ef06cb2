//! JSON-backed category store
//!
//! One `<category_id>.json` document per category inside a directory.
//! Every write goes to a temporary file in the same directory which is then
//! renamed over the original, so a crash never leaves a half-written file.
//! Concurrent writers are not coordinated: the last rename wins.

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{OpenCastError, Result};
use crate::types::{Category, Entry};

const BACKUP_MARKER: &str = ".backup-";

/// Summary of one category, as printed by `opencast stats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub category_id: String,
    pub name: String,
    pub language: String,
    pub topic_count: usize,
    pub total_entries: usize,
}

#[derive(Debug, Clone)]
pub struct CategoryStore {
    dir: PathBuf,
}

impl CategoryStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Category store opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, category_id: &str) -> Result<PathBuf> {
        if category_id.is_empty()
            || category_id.contains(['/', '\\'])
            || category_id.starts_with('.')
        {
            return Err(OpenCastError::InvalidData(format!(
                "'{}' is not a valid category id",
                category_id
            )));
        }
        Ok(self.dir.join(format!("{}.json", category_id)))
    }

    pub fn exists(&self, category_id: &str) -> bool {
        self.path_for(category_id)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Ids of every category file, sorted
    pub fn list_categories(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for dir_entry in std::fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.contains(BACKUP_MARKER) || stem.starts_with('.') {
                continue;
            }
            ids.push(stem.to_string());
        }
        ids.sort();
        debug!(count = ids.len(), "Listed categories");
        Ok(ids)
    }

    pub fn load(&self, category_id: &str) -> Result<Category> {
        let path = self.path_for(category_id)?;
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(category_id, path = %path.display(), "Category file not found");
                return Err(OpenCastError::NotFound(format!(
                    "category '{}'",
                    category_id
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let category: Category = serde_json::from_str(&raw).map_err(|e| {
            OpenCastError::InvalidData(format!("{}: {}", path.display(), e))
        })?;
        category.check()?;
        if category.category_id != category_id {
            return Err(OpenCastError::InvalidData(format!(
                "{}: category_id '{}' does not match the file name",
                path.display(),
                category.category_id
            )));
        }

        debug!(
            category_id,
            topics = category.topics.len(),
            "Category loaded"
        );
        Ok(category)
    }

    /// Write a whole category atomically
    pub fn save(&self, category: &Category) -> Result<()> {
        category.check()?;
        let path = self.path_for(&category.category_id)?;
        let json = serde_json::to_string_pretty(category)
            .map_err(|e| OpenCastError::InvalidData(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        // The temp file is created private; keep the mode of the file it replaces
        if let Ok(existing) = std::fs::metadata(&path) {
            tmp.as_file().set_permissions(existing.permissions())?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| OpenCastError::StoreIo(e.error))?;

        debug!(
            category_id = %category.category_id,
            path = %path.display(),
            "Category saved"
        );
        Ok(())
    }

    /// Append an entry under an existing topic and persist the category
    pub fn append_entry(&self, category_id: &str, topic_name: &str, entry: Entry) -> Result<()> {
        let mut category = self.load(category_id)?;
        let topic = category.topic_mut(topic_name).ok_or_else(|| {
            OpenCastError::NotFound(format!(
                "topic '{}' in category '{}'",
                topic_name, category_id
            ))
        })?;
        topic.entries.push(entry);
        let entry_count = topic.entries.len();
        category.updated_at = chrono::Utc::now();
        self.save(&category)?;

        info!(
            category_id,
            topic = topic_name,
            entries = entry_count,
            "Entry appended"
        );
        Ok(())
    }

    pub fn stats(&self, category_id: &str) -> Result<CategoryStats> {
        let category = self.load(category_id)?;
        Ok(CategoryStats {
            total_entries: category.total_entries(),
            topic_count: category.topics.len(),
            category_id: category.category_id,
            name: category.name,
            language: category.language,
        })
    }

    /// Copy a category file next to itself with a timestamped name
    pub fn backup(&self, category_id: &str) -> Result<PathBuf> {
        let path = self.path_for(category_id)?;
        if !self.exists(category_id) {
            return Err(OpenCastError::NotFound(format!(
                "category '{}'",
                category_id
            )));
        }
        let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        let backup_path = self
            .dir
            .join(format!("{}{}{}.json", category_id, BACKUP_MARKER, stamp));
        std::fs::copy(&path, &backup_path)?;

        info!(
            category_id,
            backup = %backup_path.display(),
            "Category backup created"
        );
        Ok(backup_path)
    }
}
