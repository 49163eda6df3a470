//! Memory collaborator
//!
//! The prompt compiler only needs `has_memories` and `get_recent_facts`; the
//! rest of the trait is what a cartridge's owner uses to teach it things.
//! `FileMemory` is the default store: a JSON file of key/value facts next to
//! the cartridge, or a purely in-process store when no path is set.

use eyre::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::schema;

pub const DEFAULT_CATEGORY: &str = "general";

/// Persistent fact store consumed by a cartridge
pub trait MemoryStore {
    /// Store or update a fact
    fn remember(&mut self, key: &str, value: &str, category: Option<&str>, confidence: Option<f64>) -> Result<()>;

    /// Retrieve a fact's value
    fn recall(&self, key: &str) -> Option<String>;

    /// Remove a fact; returns whether it existed
    fn forget(&mut self, key: &str) -> Result<bool>;

    /// Facts as "key: value", most recently updated first
    fn get_recent_facts(&self, limit: usize) -> Vec<String>;

    fn has_memories(&self) -> bool;

    /// Write pending changes to backing storage
    fn flush(&mut self) -> Result<()>;

    /// Give a store without backing storage a location to flush to.
    /// Stores that already have one keep it.
    fn bind_path(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub key: String,
    pub value: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_confidence() -> f64 {
    1.0
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MemoryFile {
    #[serde(default)]
    facts: Vec<Fact>,
}

/// JSON-file backed fact store. Facts are kept in update order.
#[derive(Debug, Default)]
pub struct FileMemory {
    path: Option<PathBuf>,
    facts: IndexMap<String, Fact>,
    dirty: bool,
}

impl FileMemory {
    /// A store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`, reading existing facts if the file exists
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let mut facts = IndexMap::new();

        if path.exists() {
            let content =
                fs::read_to_string(&path).with_context(|| format!("Failed to read memory: {}", path.display()))?;
            let file: MemoryFile = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse memory: {}", path.display()))?;
            for fact in file.facts {
                facts.insert(fact.key.clone(), fact);
            }
            log::debug!("Loaded {} facts from {}", facts.len(), path.display());
        }

        Ok(Self {
            path: Some(path),
            facts,
            dirty: false,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts.values()
    }

    /// Facts in one category, most recently updated first
    pub fn facts_in(&self, category: &str, limit: usize) -> Vec<&Fact> {
        self.facts
            .values()
            .rev()
            .filter(|f| f.category == category)
            .take(limit)
            .collect()
    }
}

impl MemoryStore for FileMemory {
    fn remember(&mut self, key: &str, value: &str, category: Option<&str>, confidence: Option<f64>) -> Result<()> {
        let now = schema::now_timestamp();
        let created_at = self
            .facts
            .shift_remove(key)
            .map(|existing| existing.created_at)
            .unwrap_or_else(|| now.clone());

        // Re-inserting moves the fact to the end, so iteration order is update order
        self.facts.insert(
            key.to_string(),
            Fact {
                key: key.to_string(),
                value: value.to_string(),
                category: category.unwrap_or(DEFAULT_CATEGORY).to_string(),
                confidence: confidence.unwrap_or(1.0).clamp(0.0, 1.0),
                created_at,
                updated_at: now,
            },
        );
        self.dirty = true;
        Ok(())
    }

    fn recall(&self, key: &str) -> Option<String> {
        self.facts.get(key).map(|f| f.value.clone())
    }

    fn forget(&mut self, key: &str) -> Result<bool> {
        let existed = self.facts.shift_remove(key).is_some();
        if existed {
            self.dirty = true;
        }
        Ok(existed)
    }

    fn get_recent_facts(&self, limit: usize) -> Vec<String> {
        self.facts
            .values()
            .rev()
            .take(limit)
            .map(|f| format!("{}: {}", f.key, f.value))
            .collect()
    }

    fn has_memories(&self) -> bool {
        !self.facts.is_empty()
    }

    fn flush(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }

        let file = MemoryFile {
            facts: self.facts.values().cloned().collect(),
        };
        let content = serde_json::to_string_pretty(&file)?;

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(content.as_bytes()).context("Failed to write memory")?;
        temp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to save memory: {}", path.display()))?;

        log::debug!("Flushed {} facts to {}", self.facts.len(), path.display());
        self.dirty = false;
        Ok(())
    }

    fn bind_path(&mut self, path: &Path) -> Result<()> {
        if self.path.is_some() {
            return Ok(());
        }

        // Facts already on disk stay; in-process facts are newer and win
        let pending = std::mem::take(&mut self.facts);
        self.facts = Self::open(path)?.facts;
        if !pending.is_empty() {
            self.dirty = true;
        }
        for (key, fact) in pending {
            self.facts.shift_remove(&key);
            self.facts.insert(key, fact);
        }

        log::debug!("Bound in-process memory to {}", path.display());
        self.path = Some(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_remember_and_recall() {
        let mut memory = FileMemory::in_memory();
        assert!(!memory.has_memories());

        memory.remember("user_name", "Dustin", None, None).unwrap();
        memory.remember("favorite_color", "lime green", Some("preferences"), Some(0.9)).unwrap();

        assert!(memory.has_memories());
        assert_eq!(memory.recall("user_name"), Some("Dustin".to_string()));
        assert_eq!(memory.recall("favorite_color"), Some("lime green".to_string()));
        assert_eq!(memory.recall("missing"), None);
    }

    #[test]
    fn test_recent_facts_most_recent_first() {
        let mut memory = FileMemory::in_memory();
        memory.remember("a", "1", None, None).unwrap();
        memory.remember("b", "2", None, None).unwrap();
        memory.remember("c", "3", None, None).unwrap();
        // updating moves a fact to the front
        memory.remember("a", "4", None, None).unwrap();

        assert_eq!(memory.get_recent_facts(10), vec!["a: 4", "c: 3", "b: 2"]);
        assert_eq!(memory.get_recent_facts(2), vec!["a: 4", "c: 3"]);
    }

    #[test]
    fn test_update_keeps_created_at() {
        let mut memory = FileMemory::in_memory();
        memory.remember("k", "v1", None, None).unwrap();
        let created = memory.facts().next().unwrap().created_at.clone();
        memory.remember("k", "v2", None, None).unwrap();
        assert_eq!(memory.facts().next().unwrap().created_at, created);
    }

    #[test]
    fn test_forget() {
        let mut memory = FileMemory::in_memory();
        memory.remember("k", "v", None, None).unwrap();
        assert!(memory.forget("k").unwrap());
        assert!(!memory.forget("k").unwrap());
        assert!(!memory.has_memories());
    }

    #[test]
    fn test_facts_in_category() {
        let mut memory = FileMemory::in_memory();
        memory.remember("a", "1", Some("work"), None).unwrap();
        memory.remember("b", "2", None, None).unwrap();
        memory.remember("c", "3", Some("work"), None).unwrap();

        let work: Vec<&str> = memory.facts_in("work", 5).iter().map(|f| f.key.as_str()).collect();
        assert_eq!(work, vec!["c", "a"]);
    }

    #[test]
    fn test_flush_and_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("atlas.memory");

        let mut memory = FileMemory::open(&path).unwrap();
        memory.remember("first", "one", None, None).unwrap();
        memory.remember("second", "two", None, None).unwrap();
        memory.flush().unwrap();

        let reopened = FileMemory::open(&path).unwrap();
        assert_eq!(reopened.get_recent_facts(5), vec!["second: two", "first: one"]);
    }

    #[test]
    fn test_flush_in_memory_is_noop() {
        let mut memory = FileMemory::in_memory();
        memory.remember("k", "v", None, None).unwrap();
        assert!(memory.flush().is_ok());
        assert!(memory.path().is_none());
    }

    #[test]
    fn test_bind_path_persists_in_process_facts() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("scout.memory");

        let mut memory = FileMemory::in_memory();
        memory.remember("pet", "a cat named Io", None, None).unwrap();
        memory.bind_path(&path).unwrap();
        memory.flush().unwrap();

        assert_eq!(memory.path(), Some(path.as_path()));
        let reopened = FileMemory::open(&path).unwrap();
        assert_eq!(reopened.recall("pet").as_deref(), Some("a cat named Io"));
    }

    #[test]
    fn test_bind_path_merges_over_existing_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("scout.memory");

        let mut on_disk = FileMemory::open(&path).unwrap();
        on_disk.remember("city", "Lisbon", None, None).unwrap();
        on_disk.remember("pet", "a dog", None, None).unwrap();
        on_disk.flush().unwrap();

        let mut memory = FileMemory::in_memory();
        memory.remember("pet", "a cat named Io", None, None).unwrap();
        memory.bind_path(&path).unwrap();
        memory.flush().unwrap();

        let reopened = FileMemory::open(&path).unwrap();
        assert_eq!(reopened.get_recent_facts(5), vec!["pet: a cat named Io", "city: Lisbon"]);
    }

    #[test]
    fn test_bind_path_keeps_existing_location() {
        let temp = tempdir().unwrap();
        let first = temp.path().join("first.memory");
        let second = temp.path().join("second.memory");

        let mut memory = FileMemory::open(&first).unwrap();
        memory.bind_path(&second).unwrap();
        assert_eq!(memory.path(), Some(first.as_path()));
    }
}
