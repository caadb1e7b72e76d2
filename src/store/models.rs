//! Shared logical storage model used by glossary and bucket stores.
//!
//! These types represent what the engine reads and writes through the
//! collaborator traits. Concrete stores (memory, file, SQLite) persist
//! them in whatever physical layout suits the backend.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Schema version written by the file and SQLite stores.
pub const STORE_SCHEMA_VERSION: &str = "1";

/// Bucket capacity used when a new store is created without an
/// explicit `max_items_per_bucket`.
pub const DEFAULT_MAX_ITEMS_PER_BUCKET: u32 = 32;

/// Glossary record for a unique token.
///
/// Buckets for the keyword are numbered `0..num_buckets` without
/// gaps. `num_buckets` only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchKeyword {
    /// The keyword value (a normalized token).
    pub value: String,
    /// Number of buckets allocated for this keyword.
    pub num_buckets: u32,
}

impl SearchKeyword {
    /// A keyword that has never been given a bucket.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            num_buckets: 0,
        }
    }

    /// Copy of this keyword with a different bucket count.
    pub fn with_num_buckets(&self, num_buckets: u32) -> Self {
        Self {
            value: self.value.clone(),
            num_buckets,
        }
    }
}

/// Opaque bucket handle, formatted as `{keyword}:{index}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketId(String);

impl BucketId {
    /// Build the id of bucket `index` for `keyword`.
    pub fn new(keyword: &str, index: u32) -> Self {
        Self(format!("{keyword}:{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BucketId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One partition of a keyword's postings list.
///
/// Duplicate item ids are allowed: indexing the same item twice for a
/// token without an intervening deindex appends it twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchBucket<I> {
    pub id: BucketId,
    pub item_ids: Vec<I>,
}

impl<I> SearchBucket<I> {
    /// An empty bucket with the given id.
    pub fn empty(id: BucketId) -> Self {
        Self {
            id,
            item_ids: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.item_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }
}

impl<I: PartialEq> SearchBucket<I> {
    /// Remove the first occurrence of `item_id`, returning whether
    /// anything was removed.
    pub fn remove_first(&mut self, item_id: &I) -> bool {
        match self.item_ids.iter().position(|id| id == item_id) {
            Some(pos) => {
                self.item_ids.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Metadata for an on-disk store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    /// Schema version for the store on disk.
    pub schema_version: String,
    /// Version of the zksearch tool that wrote the store.
    pub tool_version: String,
    /// Bucket capacity fixed when the store was created.
    pub max_items_per_bucket: u32,
    /// Unix timestamp (seconds since epoch) when the store was created.
    pub created_at: u64,
    /// Unix timestamp (seconds since epoch) when the store was last written.
    pub updated_at: u64,
}

impl StoreMeta {
    pub(crate) fn fresh(max_items_per_bucket: u32) -> Self {
        let now = crate::store::current_epoch_seconds();
        Self {
            schema_version: STORE_SCHEMA_VERSION.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            max_items_per_bucket,
            created_at: now,
            updated_at: now,
        }
    }
}
