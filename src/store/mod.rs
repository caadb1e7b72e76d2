//! Storage collaborators and related types.
//!
//! This module defines the logical storage model (keywords, bucket
//! ids, buckets), the `SearchGlossary`/`BucketStore` trait pair the
//! engine consumes, and three implementations: in-memory, JSON files,
//! and SQLite.

mod backend;
pub mod file;
pub mod memory;
pub mod models;
pub mod sqlite;

pub use backend::{BucketStore, SearchGlossary};
pub use memory::{MemoryBucketStore, MemoryGlossary};
pub use models::{BucketId, SearchBucket, SearchKeyword, StoreMeta};

pub use crate::search::direction::SearchDirection;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Result};

use crate::models::{StoreConfig, StoreKind, StoreSummary};
use crate::search::direction::bucket_ids;

/// A glossary and bucket store opened from a `StoreConfig`.
pub struct OpenedStore {
    pub handle: StoreHandle,
    pub glossary: Box<dyn SearchGlossary>,
    pub buckets: Box<dyn BucketStore<String>>,
}

/// Location and metadata of an opened store.
pub struct StoreHandle {
    pub kind: StoreKind,
    pub path: PathBuf,
    pub meta: StoreMeta,
}

impl StoreHandle {
    /// Record that the store was written to.
    pub fn touch(&mut self) -> Result<()> {
        self.meta.updated_at = current_epoch_seconds();
        match self.kind {
            StoreKind::File => file::save_meta(&self.path, &self.meta),
            StoreKind::Sqlite => sqlite::save_meta(&self.path, &self.meta),
        }
    }
}

/// Open (or create) the store described by `config`.
pub fn open_store(config: &StoreConfig) -> Result<OpenedStore> {
    match config.kind {
        StoreKind::File => {
            let (glossary, buckets, meta) = file::open(&config.path, config.max_items_per_bucket)?;
            Ok(OpenedStore {
                handle: StoreHandle {
                    kind: StoreKind::File,
                    path: config.path.clone(),
                    meta,
                },
                glossary: Box::new(glossary),
                buckets: Box::new(buckets),
            })
        }
        StoreKind::Sqlite => {
            let (glossary, buckets, meta) =
                sqlite::open(&config.path, config.max_items_per_bucket)?;
            Ok(OpenedStore {
                handle: StoreHandle {
                    kind: StoreKind::Sqlite,
                    path: config.path.clone(),
                    meta,
                },
                glossary: Box::new(glossary),
                buckets: Box::new(buckets),
            })
        }
    }
}

/// Open a store that must already exist.
///
/// Fails with `store not found at ...` instead of creating anything
/// when the configured path holds no store.
pub fn open_existing_store(config: &StoreConfig) -> Result<OpenedStore> {
    ensure_store_exists(config)?;
    open_store(config)
}

fn ensure_store_exists(config: &StoreConfig) -> Result<()> {
    if !config.path.exists() {
        bail!("store not found at {}", config.path.display());
    }

    let meta = match config.kind {
        StoreKind::File => {
            if !config.path.is_dir() {
                bail!(
                    "file store requires path to be a directory; got {}",
                    config.path.display()
                );
            }
            file::load_meta(&config.path)?
        }
        StoreKind::Sqlite => {
            if !config.path.is_file() {
                bail!(
                    "sqlite store requires path to be a file; got {}",
                    config.path.display()
                );
            }
            sqlite::load_meta(&config.path)?
        }
    };

    if meta.is_none() {
        bail!("store not found at {}", config.path.display());
    }
    Ok(())
}

/// Read-only helper to inspect an existing store without modifying it.
///
/// Walks every bucket to count postings.
pub fn get_store_info(config: &StoreConfig) -> Result<StoreSummary> {
    let store = open_existing_store(config)?;

    let keywords = store.glossary.get_keywords()?;
    let mut buckets: u64 = 0;
    let mut postings: u64 = 0;
    for keyword in &keywords {
        for bucket_id in bucket_ids(keyword, SearchDirection::OldestFirst) {
            if let Some(bucket) = store.buckets.load_bucket(&bucket_id)? {
                buckets += 1;
                postings += bucket.len() as u64;
            }
        }
    }

    let handle = &store.handle;
    Ok(StoreSummary {
        kind: handle.kind,
        path: handle.path.clone(),
        max_items_per_bucket: handle.meta.max_items_per_bucket,
        keywords: keywords.len() as u64,
        buckets,
        postings,
        schema_version: Some(handle.meta.schema_version.clone()),
        tool_version: Some(handle.meta.tool_version.clone()),
        created_at: format_timestamp_iso8601(handle.meta.created_at),
        updated_at: format_timestamp_iso8601(handle.meta.updated_at),
    })
}

pub(crate) fn check_capacity(
    location: &Path,
    meta: &StoreMeta,
    requested_capacity: Option<u32>,
) -> Result<()> {
    if let Some(requested) = requested_capacity {
        if requested != meta.max_items_per_bucket {
            bail!(
                "bucket capacity mismatch: store at {} was created with max_items_per_bucket = {}, but {} was requested",
                location.display(),
                meta.max_items_per_bucket,
                requested
            );
        }
    }
    Ok(())
}

pub(crate) fn current_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn format_timestamp_iso8601(secs: u64) -> Option<String> {
    use time::{format_description::well_known::Rfc3339, OffsetDateTime};

    let ts = secs as i64;
    let dt = OffsetDateTime::from_unix_timestamp(ts).ok()?;
    Some(dt.format(&Rfc3339).unwrap_or_else(|_| dt.to_string()))
}
