//! Zero-knowledge oriented inverted search index.
//!
//! Text is tokenized client-side, each distinct token gets a glossary
//! entry, and the item ids matching a token are partitioned into
//! size-bounded buckets addressed as `{keyword}:{index}`. Storage is
//! delegated to two pluggable collaborators ([`store::SearchGlossary`]
//! and [`store::BucketStore`]) so that keyword and bucket blobs can be
//! persisted anywhere, including backends that only ever see
//! pre-encrypted values.

pub mod cli;
pub mod models;
pub mod search;
pub mod server;
pub mod store;

pub use search::engine::SearchEngine;
pub use search::tokenizer::tokenize;
pub use store::{BucketId, BucketStore, SearchBucket, SearchDirection, SearchGlossary, SearchKeyword};
