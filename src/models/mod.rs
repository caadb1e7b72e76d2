//! Shared data models for store configs, operation requests, and results.
//!
//! These types form the stable JSON API surface used by the CLI and
//! the daemon/server mode.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use crate::search::direction::SearchDirection;

/// Schema version for `SearchResult` JSON payloads.
///
/// This version follows semver semantics (MAJOR.MINOR.PATCH):
/// - MAJOR: Breaking changes to required fields or field semantics.
/// - MINOR: Backward-compatible additions (new optional fields).
/// - PATCH: Documentation or internal changes only.
pub const SEARCH_RESULT_VERSION: &str = "1.0.0";

/// Kind of on-disk store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    File,
    Sqlite,
}

/// Where the glossary and buckets live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Directory for the file store, database file for SQLite.
    pub path: PathBuf,
    /// Bucket capacity to create the store with, or to verify against
    /// an existing store. `None` accepts whatever the store has.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items_per_bucket: Option<u32>,
}

/// Add an item's text to the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRequest {
    pub store: StoreConfig,
    pub item_id: String,
    pub text: String,
}

/// Differentially update an item from `old_text` to `new_text`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReindexRequest {
    pub store: StoreConfig,
    pub item_id: String,
    pub old_text: String,
    pub new_text: String,
}

/// Remove an item, given the text it was indexed with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeindexRequest {
    pub store: StoreConfig,
    pub item_id: String,
    pub text: String,
}

/// A single record of a bulk import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecord {
    pub id: String,
    pub text: String,
}

/// Index many items in one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
    pub store: StoreConfig,
    pub records: Vec<ImportRecord>,
}

/// Query the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub store: StoreConfig,
    pub terms: String,
    #[serde(default)]
    pub direction: SearchDirection,
    /// Substring matching of query tokens against keywords.
    #[serde(default = "default_fuzzy")]
    pub fuzzy: bool,
}

fn default_fuzzy() -> bool {
    true
}

/// List glossary entries, optionally filtered by substring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsRequest {
    pub store: StoreConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// Outcome of an index, reindex, deindex, or import call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
    /// Number of items touched.
    pub items: u64,
    /// Tokens whose buckets received the item.
    pub tokens_added: u64,
    /// Tokens whose buckets had the item removed.
    pub tokens_removed: u64,
    /// Tokens left untouched by a reindex.
    pub tokens_unchanged: u64,
}

/// Counters describing how a search was answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub matched_keywords: u64,
    pub buckets_visited: u64,
    pub total_items: u64,
}

/// Result of a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub version: String,
    pub query: String,
    pub direction: SearchDirection,
    pub fuzzy: bool,
    /// Matching item ids, deduplicated, in bucket traversal order.
    pub item_ids: Vec<String>,
    pub summary: SearchSummary,
}

/// A glossary entry as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub value: String,
    pub num_buckets: u32,
}

/// Glossary listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordList {
    pub keywords: Vec<KeywordEntry>,
}

/// Store introspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSummary {
    pub kind: StoreKind,
    pub path: PathBuf,
    pub max_items_per_bucket: u32,
    pub keywords: u64,
    pub buckets: u64,
    pub postings: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}
