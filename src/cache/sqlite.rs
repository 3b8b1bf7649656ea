use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, Row, params, params_from_iter};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::{CacheKey, CacheStats, CacheStore, NewEntry, TranslationEntry};

/// Keys per statement. Each key adds one `OR` term to the WHERE clause and
/// SQLite refuses expression trees deeper than 1000.
const MAX_KEYS_PER_STATEMENT: usize = 200;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ENTRY_COLUMNS: &str = "entity_type, entity_id, field, target_lang, source_lang, \
     source_hash, translated_text, provider, model, created_at, updated_at, last_used_at";

/// `SQLite`-backed [`CacheStore`].
///
/// Opens a short-lived connection per operation, so a single store can be
/// shared by every task of an orchestration pass.
pub struct SqliteCacheStore {
    db_path: PathBuf,
}

impl SqliteCacheStore {
    /// Opens (or creates) the cache database at `db_path`.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }

        let store = Self { db_path };
        store.init_db()?;

        debug!(path = %store.db_path.display(), "translation cache opened");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn init_db(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .context("Failed to configure cache database")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS translation_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_type VARCHAR(50) NOT NULL,
                entity_id BIGINT NOT NULL,
                field VARCHAR(100) NOT NULL,
                source_lang VARCHAR(10) NOT NULL,
                target_lang VARCHAR(10) NOT NULL,
                source_hash CHAR(64) NOT NULL,
                translated_text TEXT NOT NULL,
                provider VARCHAR(50) NOT NULL,
                model VARCHAR(100) NOT NULL DEFAULT '',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                last_used_at TIMESTAMP
            )",
            [],
        )
        .context("Failed to create translation_entries table")?;

        conn.execute_batch(
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_translation_entry
                ON translation_entries(entity_type, entity_id, field, target_lang);
             CREATE INDEX IF NOT EXISTS idx_translation_source_hash
                ON translation_entries(source_hash);
             CREATE INDEX IF NOT EXISTS idx_translation_last_used
                ON translation_entries(last_used_at);",
        )
        .context("Failed to create indexes")?;

        Ok(())
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path).with_context(|| {
            format!("Failed to open cache database: {}", self.db_path.display())
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

/// `(a = ? AND b = ? ...) OR (...)` over `count` keys.
fn key_predicate(count: usize) -> String {
    vec!["(entity_type = ? AND entity_id = ? AND field = ? AND target_lang = ?)"; count]
        .join(" OR ")
}

fn key_params(keys: &[CacheKey]) -> Vec<Value> {
    keys.iter()
        .flat_map(|key| {
            [
                Value::Text(key.entity_type.clone()),
                Value::Integer(key.entity_id),
                Value::Text(key.field.clone()),
                Value::Text(key.target_lang.clone()),
            ]
        })
        .collect()
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<TranslationEntry> {
    Ok(TranslationEntry {
        key: CacheKey {
            entity_type: row.get(0)?,
            entity_id: row.get(1)?,
            field: row.get(2)?,
            target_lang: row.get(3)?,
        },
        source_lang: row.get(4)?,
        source_hash: row.get(5)?,
        translated_text: row.get(6)?,
        provider: row.get(7)?,
        model: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        last_used_at: row.get(11)?,
    })
}

impl CacheStore for SqliteCacheStore {
    fn lookup(&self, keys: &[CacheKey]) -> Result<Vec<TranslationEntry>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.connect()?;
        let mut entries = Vec::new();

        for batch in keys.chunks(MAX_KEYS_PER_STATEMENT) {
            let sql = format!(
                "SELECT {ENTRY_COLUMNS} FROM translation_entries WHERE {}",
                key_predicate(batch.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(key_params(batch)), entry_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("Failed to read cached translations")?;
            entries.extend(rows);
        }

        Ok(entries)
    }

    fn delete(&self, keys: &[CacheKey]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let conn = self.connect()?;
        let mut removed = 0;

        for batch in keys.chunks(MAX_KEYS_PER_STATEMENT) {
            let sql = format!(
                "DELETE FROM translation_entries WHERE {}",
                key_predicate(batch.len())
            );
            removed += conn
                .execute(&sql, params_from_iter(key_params(batch)))
                .context("Failed to delete cached translations")?;
        }

        Ok(removed)
    }

    fn touch(&self, keys: &[CacheKey]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let conn = self.connect()?;

        for batch in keys.chunks(MAX_KEYS_PER_STATEMENT) {
            let sql = format!(
                "UPDATE translation_entries SET last_used_at = CURRENT_TIMESTAMP WHERE {}",
                key_predicate(batch.len())
            );
            conn.execute(&sql, params_from_iter(key_params(batch)))
                .context("Failed to refresh last_used_at")?;
        }

        Ok(())
    }

    fn insert_ignore(&self, entries: &[NewEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let conn = self.connect()?;
        let mut inserted = 0;

        for batch in entries.chunks(MAX_KEYS_PER_STATEMENT) {
            let placeholders = vec!["(?, ?, ?, ?, ?, ?, ?, ?, ?)"; batch.len()].join(", ");
            let sql = format!(
                "INSERT OR IGNORE INTO translation_entries
                 (entity_type, entity_id, field, source_lang, target_lang,
                  source_hash, translated_text, provider, model)
                 VALUES {placeholders}"
            );

            let values = batch.iter().flat_map(|entry| {
                [
                    Value::Text(entry.key.entity_type.clone()),
                    Value::Integer(entry.key.entity_id),
                    Value::Text(entry.key.field.clone()),
                    Value::Text(entry.source_lang.clone()),
                    Value::Text(entry.key.target_lang.clone()),
                    Value::Text(entry.source_hash.clone()),
                    Value::Text(entry.translated_text.clone()),
                    Value::Text(entry.provider.clone()),
                    Value::Text(entry.model.clone()),
                ]
            });

            inserted += conn
                .execute(&sql, params_from_iter(values))
                .context("Failed to insert translations into cache")?;
        }

        Ok(inserted)
    }

    fn invalidate_entity(&self, entity_type: &str, entity_id: i64) -> Result<usize> {
        let conn = self.connect()?;

        conn.execute(
            "DELETE FROM translation_entries WHERE entity_type = ?1 AND entity_id = ?2",
            params![entity_type, entity_id],
        )
        .context("Failed to invalidate entity translations")
    }

    fn stats(&self) -> Result<CacheStats> {
        let conn = self.connect()?;

        let (total, never_used): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(last_used_at IS NULL), 0) FROM translation_entries",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = conn.prepare(
            "SELECT target_lang, COUNT(*) FROM translation_entries
             GROUP BY target_lang ORDER BY target_lang",
        )?;
        let by_target_lang: BTreeMap<String, u64> = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .map(|row| row.map(|(lang, count)| (lang, count as u64)))
            .collect::<rusqlite::Result<_>>()
            .context("Failed to read cache statistics")?;

        Ok(CacheStats {
            total: total as u64,
            never_used: never_used as u64,
            by_target_lang,
        })
    }
}
