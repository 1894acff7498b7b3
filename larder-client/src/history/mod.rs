//! Bounded, most-recent-first history of generated recipe sets.
//!
//! The whole history is one JSON document stored under [`HISTORY_KEY`] in a
//! [`KeyValueStore`]. Every operation reads, modifies and writes that document
//! before returning.

mod memory;
mod sqlite;

use std::sync::Mutex;

use anyhow::Result;
use larder::basic_models::{RecipeSet, StoredRecipeSet};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const HISTORY_KEY: &str = "recipe_history_v1";
pub const HISTORY_CAPACITY: usize = 20;

/// A string-keyed store holding string documents.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        (**self).put(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Reading history: {0:#}")]
    Read(#[source] anyhow::Error),
    #[error("Writing history: {0:#}")]
    Write(#[source] anyhow::Error),
    #[error("Serializing history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The history of recipe sets, over an explicitly provided store.
pub struct HistoryStore<S> {
    store: S,
    capacity: usize,
    // Serializes read-modify-write cycles
    writer: Mutex<()>,
}

impl<S: KeyValueStore> HistoryStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_capacity(store, HISTORY_CAPACITY)
    }

    pub fn with_capacity(store: S, capacity: usize) -> Self {
        Self {
            store,
            capacity,
            writer: Mutex::new(()),
        }
    }

    /// Give the underlying store back, e.g. to close it.
    pub fn into_inner(self) -> S {
        self.store
    }

    /// Stamp a recipe set with an id and the current time, and put it first.
    ///
    /// Entries beyond the capacity, oldest first, are dropped.
    pub fn save(&self, recipe_set: RecipeSet) -> Result<StoredRecipeSet, StorageError> {
        let _guard = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = StoredRecipeSet {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            recipe_set,
        };
        let mut history = self.list_all()?;
        history.insert(0, entry.clone());
        history.truncate(self.capacity);
        self.write(&history)?;
        tracing::info!("Saved recipe set {} ({} in history)", entry.id, history.len());
        Ok(entry)
    }

    /// Every stored recipe set, most recent first.
    ///
    /// A document that no longer parses is logged and treated as an empty history.
    pub fn list_all(&self) -> Result<Vec<StoredRecipeSet>, StorageError> {
        let Some(document) = self.store.get(HISTORY_KEY).map_err(StorageError::Read)? else {
            return Ok(vec![]);
        };
        match serde_json::from_str(&document) {
            Ok(history) => Ok(history),
            Err(err) => {
                tracing::error!("Failed to parse history, ignoring it: {}", err);
                Ok(vec![])
            }
        }
    }

    /// Remove one entry. Returns whether anything was removed; unknown ids are a no-op.
    pub fn delete_by_id(&self, id: &str) -> Result<bool, StorageError> {
        let _guard = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut history = self.list_all()?;
        let before = history.len();
        history.retain(|entry| entry.id != id);
        if history.len() == before {
            return Ok(false);
        }
        self.write(&history)?;
        Ok(true)
    }

    pub fn clear_all(&self) -> Result<(), StorageError> {
        let _guard = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.store.remove(HISTORY_KEY).map_err(StorageError::Write)
    }

    /// The full history as pretty-printed JSON, for download.
    pub fn export(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(&self.list_all()?)?)
    }

    fn write(&self, history: &[StoredRecipeSet]) -> Result<(), StorageError> {
        let document = serde_json::to_string(history)?;
        self.store
            .put(HISTORY_KEY, &document)
            .map_err(StorageError::Write)
    }
}

/// The file name an export made on `date` is offered under.
pub fn export_file_name(date: chrono::NaiveDate) -> String {
    format!("recipe_history_export_{}.json", date.format("%Y-%m-%d"))
}
