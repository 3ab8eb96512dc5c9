//! Persisted document storage for the meal list.
//!
//! The whole list lives under a single named document; every mutation is a
//! full read-modify-write. Backends only move opaque strings around - the
//! store owns the JSON encoding.

use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A single named slot holding the serialized meal list.
pub trait PersistedDocumentStore: Send + Sync {
  /// Read the document. `None` means nothing has been persisted yet.
  fn read(&self) -> Result<Option<String>>;

  /// Replace the document.
  fn write(&self, document: &str) -> Result<()>;
}

impl PersistedDocumentStore for Box<dyn PersistedDocumentStore> {
  fn read(&self) -> Result<Option<String>> {
    (**self).read()
  }

  fn write(&self, document: &str) -> Result<()> {
    (**self).write(document)
  }
}

/// File-backed store: one JSON file in the platform data directory.
pub struct JsonFileStore {
  path: PathBuf,
}

impl JsonFileStore {
  /// Open the store at the default location.
  pub fn open_default() -> Result<Self> {
    Ok(Self::at(Self::default_path()?))
  }

  /// Open the store at an explicit path.
  pub fn at(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// Get the default document path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("mealpal").join("meals.json"))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl PersistedDocumentStore for JsonFileStore {
  fn read(&self) -> Result<Option<String>> {
    match std::fs::read_to_string(&self.path) {
      Ok(contents) => Ok(Some(contents)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(eyre!("Failed to read {}: {}", self.path.display(), e)),
    }
  }

  fn write(&self, document: &str) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create data directory: {}", e))?;
    }

    std::fs::write(&self.path, document)
      .map_err(|e| eyre!("Failed to write {}: {}", self.path.display(), e))
  }
}

/// In-memory store for ephemeral sessions and tests.
#[derive(Default)]
pub struct MemoryStore {
  document: Mutex<Option<String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start from pre-seeded content, as if it had been persisted earlier.
  pub fn seeded(document: impl Into<String>) -> Self {
    Self {
      document: Mutex::new(Some(document.into())),
    }
  }
}

impl PersistedDocumentStore for MemoryStore {
  fn read(&self) -> Result<Option<String>> {
    let doc = self
      .document
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(doc.clone())
  }

  fn write(&self, document: &str) -> Result<()> {
    let mut doc = self
      .document
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *doc = Some(document.to_string());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::at(dir.path().join("nested").join("meals.json"));

    // Nothing persisted yet is a miss, not an error.
    assert_eq!(store.read().unwrap(), None);

    store.write("[]").unwrap();
    assert_eq!(store.read().unwrap().as_deref(), Some("[]"));
  }

  #[test]
  fn memory_store_replaces_document() {
    let store = MemoryStore::new();
    assert_eq!(store.read().unwrap(), None);

    store.write("a").unwrap();
    store.write("b").unwrap();
    assert_eq!(store.read().unwrap().as_deref(), Some("b"));
  }
}
