//! Storage collaborator abstractions.
//!
//! The search engine never touches persistence directly. It talks to a
//! `SearchGlossary` for keyword metadata and a `BucketStore` for the
//! bucketed postings lists, so any backend (in-memory map, JSON files,
//! SQLite, an encrypted remote blob store) can sit behind it.

use anyhow::Result;

use crate::store::models::{BucketId, SearchBucket, SearchKeyword};

/// Keyword metadata store.
pub trait SearchGlossary {
    /// Every known keyword with its current bucket count.
    fn get_keywords(&self) -> Result<Vec<SearchKeyword>>;

    /// Return the existing entry for `token`, or create one with zero
    /// buckets.
    fn get_or_add_keyword(&mut self, token: &str) -> Result<SearchKeyword>;

    /// Upsert a keyword's metadata.
    fn save_keyword(&mut self, keyword: &SearchKeyword) -> Result<()>;

    /// Look up a keyword without creating it.
    ///
    /// The default scans `get_keywords`; stores with keyed access
    /// should override it.
    fn find_keyword(&self, token: &str) -> Result<Option<SearchKeyword>> {
        Ok(self
            .get_keywords()?
            .into_iter()
            .find(|keyword| keyword.value == token))
    }
}

/// Fixed-capacity bucket store for item ids of type `I`.
pub trait BucketStore<I> {
    /// Bucket capacity; constant for the lifetime of the store.
    fn max_items_per_bucket(&self) -> u32;

    /// Fetch a bucket, or `None` if it was never saved.
    fn load_bucket(&self, bucket_id: &BucketId) -> Result<Option<SearchBucket<I>>>;

    /// Create or overwrite the bucket identified by `bucket.id`.
    fn save_bucket(&mut self, bucket: &SearchBucket<I>) -> Result<()>;
}

impl<G: SearchGlossary + ?Sized> SearchGlossary for Box<G> {
    fn get_keywords(&self) -> Result<Vec<SearchKeyword>> {
        (**self).get_keywords()
    }

    fn get_or_add_keyword(&mut self, token: &str) -> Result<SearchKeyword> {
        (**self).get_or_add_keyword(token)
    }

    fn save_keyword(&mut self, keyword: &SearchKeyword) -> Result<()> {
        (**self).save_keyword(keyword)
    }

    fn find_keyword(&self, token: &str) -> Result<Option<SearchKeyword>> {
        (**self).find_keyword(token)
    }
}

impl<I, B: BucketStore<I> + ?Sized> BucketStore<I> for Box<B> {
    fn max_items_per_bucket(&self) -> u32 {
        (**self).max_items_per_bucket()
    }

    fn load_bucket(&self, bucket_id: &BucketId) -> Result<Option<SearchBucket<I>>> {
        (**self).load_bucket(bucket_id)
    }

    fn save_bucket(&mut self, bucket: &SearchBucket<I>) -> Result<()> {
        (**self).save_bucket(bucket)
    }
}
