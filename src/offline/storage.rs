//! Cache generation storage: sqlite on disk, hash maps in memory.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use url::Url;

use super::traits::CacheStore;
use super::types::FetchResponse;

/// SQLite-backed cache store.
///
/// One row per (generation, URL); URLs are keyed by hash so arbitrary-length
/// cross-origin URLs stay fixed-width in the primary key.
pub struct SqliteCacheStore {
  conn: Mutex<Connection>,
}

/// Schema for the response cache.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS response_cache (
    generation TEXT NOT NULL,
    url_hash TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    content_type TEXT,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (generation, url_hash)
);

CREATE INDEX IF NOT EXISTS idx_response_cache_url ON response_cache(url_hash);
"#;

impl SqliteCacheStore {
  /// Open the store at the default location.
  pub fn open_default() -> Result<Self> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Self::open(&data_dir.join("mealpal").join("cache.db"))
  }

  /// Open or create the cache database at a path.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// SHA256 hash of the full URL for stable, fixed-length keys.
fn url_hash(url: &Url) -> String {
  let mut hasher = Sha256::new();
  hasher.update(url.as_str().as_bytes());
  hex::encode(hasher.finalize())
}

impl CacheStore for SqliteCacheStore {
  fn put(&self, generation: &str, url: &Url, response: &FetchResponse) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO response_cache (generation, url_hash, url, status, content_type, body, cached_at)
         VALUES (?, ?, ?, ?, ?, ?, datetime('now'))",
        params![
          generation,
          url_hash(url),
          url.as_str(),
          response.status,
          response.content_type,
          response.body,
        ],
      )
      .map_err(|e| eyre!("Failed to store cached response: {}", e))?;

    Ok(())
  }

  fn get(&self, url: &Url) -> Result<Option<FetchResponse>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row = conn
      .query_row(
        "SELECT status, content_type, body FROM response_cache
         WHERE url_hash = ? ORDER BY generation LIMIT 1",
        params![url_hash(url)],
        |row| {
          Ok(FetchResponse {
            status: row.get(0)?,
            content_type: row.get(1)?,
            body: row.get(2)?,
          })
        },
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up cached response: {}", e))?;

    Ok(row)
  }

  fn get_from(&self, generation: &str, url: &Url) -> Result<Option<FetchResponse>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row = conn
      .query_row(
        "SELECT status, content_type, body FROM response_cache
         WHERE generation = ? AND url_hash = ?",
        params![generation, url_hash(url)],
        |row| {
          Ok(FetchResponse {
            status: row.get(0)?,
            content_type: row.get(1)?,
            body: row.get(2)?,
          })
        },
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up cached response: {}", e))?;

    Ok(row)
  }

  fn list_generations(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT DISTINCT generation FROM response_cache ORDER BY generation")
      .map_err(|e| eyre!("Failed to prepare generation query: {}", e))?;

    let generations = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list generations: {}", e))?
      .collect::<std::result::Result<Vec<String>, _>>()
      .map_err(|e| eyre!("Failed to read generation row: {}", e))?;

    Ok(generations)
  }

  fn delete_generation(&self, generation: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "DELETE FROM response_cache WHERE generation = ?",
        params![generation],
      )
      .map_err(|e| eyre!("Failed to delete generation: {}", e))?;

    Ok(())
  }
}

/// In-memory cache store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryCacheStore {
  entries: Mutex<BTreeMap<(String, String), FetchResponse>>,
}

impl MemoryCacheStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStore for MemoryCacheStore {
  fn put(&self, generation: &str, url: &Url, response: &FetchResponse) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(
      (generation.to_string(), url.as_str().to_string()),
      response.clone(),
    );
    Ok(())
  }

  fn get(&self, url: &Url) -> Result<Option<FetchResponse>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(
      entries
        .iter()
        .find(|((_, entry_url), _)| entry_url == url.as_str())
        .map(|(_, response)| response.clone()),
    )
  }

  fn get_from(&self, generation: &str, url: &Url) -> Result<Option<FetchResponse>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(
      entries
        .get(&(generation.to_string(), url.as_str().to_string()))
        .cloned(),
    )
  }

  fn list_generations(&self) -> Result<Vec<String>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let mut generations: Vec<String> = entries.keys().map(|(g, _)| g.clone()).collect();
    generations.dedup();
    Ok(generations)
  }

  fn delete_generation(&self, generation: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.retain(|(g, _), _| g != generation);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn response(body: &str) -> FetchResponse {
    FetchResponse {
      status: 200,
      content_type: Some("text/plain".to_string()),
      body: body.as_bytes().to_vec(),
    }
  }

  fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
  }

  fn exercise_store(store: &dyn CacheStore) {
    let shell = url("https://mealpal.example/index.html");
    let icon = url("https://mealpal.example/icons/icon-192x192.jpg");

    store.put("static-v2", &shell, &response("shell")).unwrap();
    store.put("dynamic-v2", &icon, &response("icon")).unwrap();

    // Lookup across any generation finds both.
    assert_eq!(store.get(&shell).unwrap().unwrap().body, b"shell");
    assert_eq!(store.get(&icon).unwrap().unwrap().body, b"icon");
    assert_eq!(store.get(&url("https://mealpal.example/missing")).unwrap(), None);

    // Scoped lookup only sees its own generation.
    assert!(store.get_from("static-v2", &shell).unwrap().is_some());
    assert!(store.get_from("static-v2", &icon).unwrap().is_none());

    // Re-putting the same URL replaces the entry.
    store.put("static-v2", &shell, &response("shell2")).unwrap();
    assert_eq!(store.get(&shell).unwrap().unwrap().body, b"shell2");

    let mut generations = store.list_generations().unwrap();
    generations.sort();
    assert_eq!(generations, vec!["dynamic-v2", "static-v2"]);

    store.delete_generation("dynamic-v2").unwrap();
    assert_eq!(store.get(&icon).unwrap(), None);
    assert_eq!(store.list_generations().unwrap(), vec!["static-v2"]);
  }

  #[test]
  fn memory_store_behaviour() {
    exercise_store(&MemoryCacheStore::new());
  }

  #[test]
  fn sqlite_store_behaviour() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteCacheStore::open(&dir.path().join("cache.db")).unwrap();
    exercise_store(&store);
  }

  #[test]
  fn sqlite_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let shell = url("https://mealpal.example/");

    {
      let store = SqliteCacheStore::open(&path).unwrap();
      store.put("static-v2", &shell, &response("shell")).unwrap();
    }

    let store = SqliteCacheStore::open(&path).unwrap();
    assert_eq!(store.get(&shell).unwrap().unwrap().body, b"shell");
  }
}
