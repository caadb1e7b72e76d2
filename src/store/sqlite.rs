//! SQLite-based glossary and bucket store.
//!
//! Both collaborators share one database file with the schema:
//!
//! - `meta(key TEXT PRIMARY KEY, value TEXT NOT NULL)`
//! - `keywords(value TEXT PRIMARY KEY, num_buckets INTEGER NOT NULL)`
//! - `buckets(id TEXT PRIMARY KEY, item_ids TEXT NOT NULL)`
//!
//! Bucket contents are stored as a JSON array so that the bucket row is
//! a single opaque blob, mirroring what a remote store would hold. Each
//! collaborator owns its own connection, configured with:
//!
//! - `journal_mode = WAL` for concurrent readers and a single writer.
//! - `synchronous = NORMAL` as a balance between safety and speed.
//! - `busy_timeout` to avoid transient `database is locked` errors.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::store::backend::{BucketStore, SearchGlossary};
use crate::store::models::{
    BucketId, SearchBucket, SearchKeyword, StoreMeta, DEFAULT_MAX_ITEMS_PER_BUCKET,
    STORE_SCHEMA_VERSION,
};

/// Open (or create) a SQLite store at `db_path`.
pub fn open(
    db_path: &Path,
    requested_capacity: Option<u32>,
) -> Result<(SqliteGlossary, SqliteBucketStore, StoreMeta)> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let glossary_conn = open_connection(db_path)?;
    initialize_schema(&glossary_conn)?;

    let meta = match read_meta(&glossary_conn)? {
        Some(meta) => {
            super::check_capacity(db_path, &meta, requested_capacity)?;
            meta
        }
        None => {
            let meta =
                StoreMeta::fresh(requested_capacity.unwrap_or(DEFAULT_MAX_ITEMS_PER_BUCKET));
            write_meta(&glossary_conn, &meta)?;
            meta
        }
    };

    let bucket_conn = open_connection(db_path)?;

    Ok((
        SqliteGlossary {
            conn: glossary_conn,
        },
        SqliteBucketStore {
            conn: bucket_conn,
            max_items_per_bucket: meta.max_items_per_bucket,
        },
        meta,
    ))
}

/// Read store metadata from an existing database without creating the file.
pub fn load_meta(db_path: &Path) -> Result<Option<StoreMeta>> {
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_WRITE)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    read_meta(&conn)
}

/// Persist store metadata.
pub fn save_meta(db_path: &Path, meta: &StoreMeta) -> Result<()> {
    let conn = open_connection(db_path)?;
    write_meta(&conn, meta)
}

fn open_connection(db_path: &Path) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
    let conn = Connection::open_with_flags(db_path, flags)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(std::time::Duration::from_millis(5000))?;

    Ok(conn)
}

fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS keywords (
            value       TEXT PRIMARY KEY,
            num_buckets INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS buckets (
            id       TEXT PRIMARY KEY,
            item_ids TEXT NOT NULL
        );
    "#,
    )?;

    Ok(())
}

fn read_meta(conn: &Connection) -> Result<Option<StoreMeta>> {
    let has_table: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'meta'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    if has_table.is_none() {
        return Ok(None);
    }

    let mut stmt = conn.prepare("SELECT key, value FROM meta")?;
    let rows = stmt.query_map([], |row| {
        let key: String = row.get(0)?;
        let value: String = row.get(1)?;
        Ok((key, value))
    })?;

    let mut map = HashMap::new();
    for row in rows {
        let (key, value) = row?;
        map.insert(key, value);
    }

    if map.is_empty() {
        return Ok(None);
    }

    let schema_version = map
        .remove("schema_version")
        .unwrap_or_else(|| STORE_SCHEMA_VERSION.to_string());
    if schema_version != STORE_SCHEMA_VERSION {
        bail!(
            "unsupported store schema version {}; expected {}",
            schema_version,
            STORE_SCHEMA_VERSION
        );
    }

    let tool_version = map.remove("tool_version").unwrap_or_default();
    let max_items_per_bucket = match map.remove("max_items_per_bucket") {
        Some(value) => value
            .parse::<u32>()
            .with_context(|| format!("invalid max_items_per_bucket in sqlite store: {value}"))?,
        None => bail!("sqlite store is missing max_items_per_bucket metadata"),
    };
    let created_at = parse_timestamp(map.remove("created_at"));
    let updated_at = parse_timestamp(map.remove("updated_at"));

    Ok(Some(StoreMeta {
        schema_version,
        tool_version,
        max_items_per_bucket,
        created_at,
        updated_at,
    }))
}

fn write_meta(conn: &Connection, meta: &StoreMeta) -> Result<()> {
    let entries = [
        ("schema_version", meta.schema_version.clone()),
        ("tool_version", meta.tool_version.clone()),
        ("max_items_per_bucket", meta.max_items_per_bucket.to_string()),
        ("created_at", meta.created_at.to_string()),
        ("updated_at", meta.updated_at.to_string()),
    ];

    for (key, value) in entries {
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
    }

    Ok(())
}

fn parse_timestamp(value: Option<String>) -> u64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}

/// Glossary backed by the `keywords` table.
pub struct SqliteGlossary {
    conn: Connection,
}

impl SearchGlossary for SqliteGlossary {
    fn get_keywords(&self) -> Result<Vec<SearchKeyword>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value, num_buckets FROM keywords ORDER BY value ASC")?;

        let rows = stmt.query_map([], |row| {
            let value: String = row.get(0)?;
            let num_buckets: i64 = row.get(1)?;
            Ok(SearchKeyword {
                value,
                num_buckets: num_buckets as u32,
            })
        })?;

        let mut keywords = Vec::new();
        for row in rows {
            keywords.push(row?);
        }

        Ok(keywords)
    }

    fn get_or_add_keyword(&mut self, token: &str) -> Result<SearchKeyword> {
        self.conn.execute(
            "INSERT OR IGNORE INTO keywords (value, num_buckets) VALUES (?1, 0)",
            params![token],
        )?;

        match self.find_keyword(token)? {
            Some(keyword) => Ok(keyword),
            None => bail!("keyword {token} vanished after insert"),
        }
    }

    fn save_keyword(&mut self, keyword: &SearchKeyword) -> Result<()> {
        self.conn.execute(
            "INSERT INTO keywords (value, num_buckets) VALUES (?1, ?2)
             ON CONFLICT(value) DO UPDATE SET num_buckets = excluded.num_buckets",
            params![keyword.value, keyword.num_buckets as i64],
        )?;
        Ok(())
    }

    fn find_keyword(&self, token: &str) -> Result<Option<SearchKeyword>> {
        let keyword = self
            .conn
            .query_row(
                "SELECT value, num_buckets FROM keywords WHERE value = ?1",
                params![token],
                |row| {
                    let value: String = row.get(0)?;
                    let num_buckets: i64 = row.get(1)?;
                    Ok(SearchKeyword {
                        value,
                        num_buckets: num_buckets as u32,
                    })
                },
            )
            .optional()?;
        Ok(keyword)
    }
}

/// Bucket store backed by the `buckets` table.
pub struct SqliteBucketStore {
    conn: Connection,
    max_items_per_bucket: u32,
}

impl<I> BucketStore<I> for SqliteBucketStore
where
    I: Serialize + DeserializeOwned,
{
    fn max_items_per_bucket(&self) -> u32 {
        self.max_items_per_bucket
    }

    fn load_bucket(&self, bucket_id: &BucketId) -> Result<Option<SearchBucket<I>>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT item_ids FROM buckets WHERE id = ?1",
                params![bucket_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        let item_ids: Vec<I> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse bucket {bucket_id}"))?;
        Ok(Some(SearchBucket {
            id: bucket_id.clone(),
            item_ids,
        }))
    }

    fn save_bucket(&mut self, bucket: &SearchBucket<I>) -> Result<()> {
        let raw = serde_json::to_string(&bucket.item_ids)?;
        self.conn.execute(
            "INSERT INTO buckets (id, item_ids) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET item_ids = excluded.item_ids",
            params![bucket.id.as_str(), raw],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sqlite_store_persists_keywords_and_buckets() {
        let dir = tempdir().expect("tempdir");
        let db_path = dir.path().join("index.sqlite");

        {
            let (mut glossary, mut buckets, meta) = open(&db_path, Some(3)).expect("open");
            assert_eq!(meta.max_items_per_bucket, 3);

            let keyword = glossary.get_or_add_keyword("coffee").expect("keyword");
            assert_eq!(keyword.num_buckets, 0);
            glossary
                .save_keyword(&keyword.with_num_buckets(2))
                .expect("save keyword");

            let bucket = SearchBucket {
                id: BucketId::new("coffee", 1),
                item_ids: vec![7_u64, 9, 7],
            };
            buckets.save_bucket(&bucket).expect("save bucket");
        }

        let (mut glossary, buckets, meta) = open(&db_path, None).expect("reopen");
        assert_eq!(meta.max_items_per_bucket, 3);

        let keyword = glossary.get_or_add_keyword("coffee").expect("keyword");
        assert_eq!(keyword.num_buckets, 2);
        assert!(glossary.find_keyword("tea").expect("find").is_none());

        let loaded: SearchBucket<u64> = buckets
            .load_bucket(&BucketId::new("coffee", 1))
            .expect("load")
            .expect("bucket");
        assert_eq!(loaded.item_ids, vec![7, 9, 7]);
    }

    #[test]
    fn sqlite_store_rejects_capacity_mismatch() {
        let dir = tempdir().expect("tempdir");
        let db_path = dir.path().join("index.sqlite");

        open(&db_path, Some(5)).expect("open");
        let err = open(&db_path, Some(6)).err().expect("capacity mismatch");
        assert!(err.to_string().contains("bucket capacity mismatch"));

        let meta = load_meta(&db_path).expect("meta").expect("present");
        assert_eq!(meta.max_items_per_bucket, 5);
    }
}
