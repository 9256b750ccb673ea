//! Blob storage trait and its SQLite and in-memory implementations.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Trait for durable key-value blob backends.
pub trait BlobStorage: Send + Sync {
  /// Read the blob stored under `key`.
  fn get(&self, key: &str) -> Result<Option<String>>;

  /// Replace the blob stored under `key`.
  fn put(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: BlobStorage + ?Sized> BlobStorage for Box<T> {
  fn get(&self, key: &str) -> Result<Option<String>> {
    (**self).get(key)
  }

  fn put(&self, key: &str, value: &str) -> Result<()> {
    (**self).put(key, value)
  }
}

/// Read and decode a JSON snapshot, falling back to `T::default()`.
///
/// Storage and decode failures are logged and swallowed: callers get an empty
/// dataset instead of an error.
pub fn read_snapshot<S, T>(storage: &S, key: &str) -> T
where
  S: BlobStorage + ?Sized,
  T: DeserializeOwned + Default,
{
  let raw = match storage.get(key) {
    Ok(Some(raw)) => raw,
    Ok(None) => return T::default(),
    Err(e) => {
      warn!(key, error = %e, "failed to load blob, using empty data");
      return T::default();
    }
  };

  match serde_json::from_str(&raw) {
    Ok(value) => value,
    Err(e) => {
      warn!(key, error = %e, "failed to decode blob, using empty data");
      T::default()
    }
  }
}

/// Encode and store a JSON snapshot. Failures are logged and swallowed.
pub fn write_snapshot<S, T>(storage: &S, key: &str, value: &T)
where
  S: BlobStorage + ?Sized,
  T: Serialize,
{
  let raw = match serde_json::to_string(value) {
    Ok(raw) => raw,
    Err(e) => {
      warn!(key, error = %e, "failed to encode blob");
      return;
    }
  };

  if let Err(e) = storage.put(key, &raw) {
    warn!(key, error = %e, "failed to save blob");
  }
}

/// Storage that lives only as long as the process.
/// Used when persistence is disabled.
#[derive(Default)]
pub struct MemoryStorage {
  blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl BlobStorage for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let blobs = self
      .blobs
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(blobs.get(key).cloned())
  }

  fn put(&self, key: &str, value: &str) -> Result<()> {
    let mut blobs = self
      .blobs
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    blobs.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// SQLite-based blob storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
  path: PathBuf,
}

impl SqliteStorage {
  /// Open the storage at `path`, or at the default location when `None`.
  pub fn open(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create fallback store directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open fallback store at {}: {}", path.display(), e))?;

    let storage = Self {
      conn: Mutex::new(conn),
      path,
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("hrms").join("fallback.db"))
  }

  /// Location of the database file.
  pub fn path(&self) -> &Path {
    &self.path
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(BLOB_SCHEMA)
      .map_err(|e| eyre!("Failed to run fallback store migrations: {}", e))?;

    Ok(())
  }
}

const BLOB_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS blobs (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl BlobStorage for SqliteStorage {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM blobs WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read blob {}: {}", key, e))
  }

  fn put(&self, key: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO blobs (key, value, updated_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write blob {}: {}", key, e))?;

    Ok(())
  }
}
