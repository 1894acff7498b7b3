use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use super::KeyValueStore;

pub fn sqlite_current_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// A key-value store kept in a SQLite file.
#[derive(Clone)]
pub struct SqliteStore {
    pool: r2d2::Pool<r2d2_sqlite::SqliteConnectionManager>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and bring its schema up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let manager = r2d2_sqlite::SqliteConnectionManager::file(path);
        let pool = r2d2::Pool::new(manager)
            .with_context(|| format!("Opening history database {}", path.display()))?;
        let me = Self { pool };
        me.migrate()?;
        Ok(me)
    }

    /// Release every pooled connection.
    pub fn close(self) {
        tracing::debug!("Closing history database");
        drop(self.pool);
    }

    /// Migrate the database to the latest version.
    fn migrate(&self) -> Result<()> {
        let migrations = [include_str!("migrations/01-initial.sql")];
        // Without a metadata table, every migration still needs to run.
        let conn = self.pool.get()?;
        let current_version: String = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'schema_version'",
                params![],
                |row| row.get(0),
            )
            .unwrap_or("0".to_string());
        let current_version = current_version.parse::<usize>().unwrap_or(0);
        tracing::debug!("Current schema version: {}", current_version);
        for migration in migrations.iter().skip(current_version) {
            tracing::info!("Applying migration: {}", migration);
            conn.execute_batch(migration)?;
        }
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.pool.get()?;
        Ok(conn
            .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_on) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_on = excluded.updated_on",
            params![key, value, sqlite_current_timestamp()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM kv WHERE key = ?", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{HistoryStore, HISTORY_KEY};

    #[test]
    fn values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let store = SqliteStore::open(&path).unwrap();
        store.put("greeting", "hello").unwrap();
        store.put("greeting", "namaste").unwrap();
        store.close();

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("greeting").unwrap().as_deref(), Some("namaste"));
        store.remove("greeting").unwrap();
        assert_eq!(store.get("greeting").unwrap(), None);
    }

    #[test]
    fn missing_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("history.db")).unwrap();
        assert_eq!(store.get(HISTORY_KEY).unwrap(), None);
        // Removing something that isn't there is fine
        store.remove(HISTORY_KEY).unwrap();
    }

    #[test]
    fn history_persists_in_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let recipe_set = serde_json::from_value(serde_json::json!({
            "analysis": {"categorization": {"edible": ["bread"]}},
            "recipes": [{
                "dishName": "Toast",
                "ingredients": [{"item": "bread", "amount": "2 slices"}],
                "steps": ["Toast the bread."],
                "nutrition": {"calories": "160", "protein": "5g", "carbs": "30g", "fats": "2g"}
            }]
        }))
        .unwrap();

        let history = HistoryStore::new(SqliteStore::open(&path).unwrap());
        let stored = history.save(recipe_set).unwrap();
        history.into_inner().close();

        let history = HistoryStore::new(SqliteStore::open(&path).unwrap());
        assert_eq!(history.list_all().unwrap(), vec![stored]);
    }
}
