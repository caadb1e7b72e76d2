//! In-memory glossary and bucket store.
//!
//! Nothing is persisted. Both stores keep a journal of the writes they
//! received so callers can see exactly which keywords and buckets a
//! storage-layer observer would have seen change.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;

use crate::store::backend::{BucketStore, SearchGlossary};
use crate::store::models::{BucketId, SearchBucket, SearchKeyword};

/// Glossary held in a sorted map.
#[derive(Debug, Default, Clone)]
pub struct MemoryGlossary {
    keywords: BTreeMap<String, SearchKeyword>,
    saved: Vec<SearchKeyword>,
}

impl MemoryGlossary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keywords passed to `save_keyword`, oldest first.
    pub fn saved_keywords(&self) -> &[SearchKeyword] {
        &self.saved
    }
}

impl SearchGlossary for MemoryGlossary {
    fn get_keywords(&self) -> Result<Vec<SearchKeyword>> {
        Ok(self.keywords.values().cloned().collect())
    }

    fn get_or_add_keyword(&mut self, token: &str) -> Result<SearchKeyword> {
        let keyword = self
            .keywords
            .entry(token.to_string())
            .or_insert_with(|| SearchKeyword::new(token));
        Ok(keyword.clone())
    }

    fn save_keyword(&mut self, keyword: &SearchKeyword) -> Result<()> {
        self.keywords.insert(keyword.value.clone(), keyword.clone());
        self.saved.push(keyword.clone());
        Ok(())
    }

    fn find_keyword(&self, token: &str) -> Result<Option<SearchKeyword>> {
        Ok(self.keywords.get(token).cloned())
    }
}

/// Bucket store held in a hash map.
#[derive(Debug, Clone)]
pub struct MemoryBucketStore<I> {
    max_items_per_bucket: u32,
    buckets: HashMap<BucketId, SearchBucket<I>>,
    saved: Vec<BucketId>,
}

impl<I> MemoryBucketStore<I> {
    pub fn new(max_items_per_bucket: u32) -> Self {
        Self {
            max_items_per_bucket,
            buckets: HashMap::new(),
            saved: Vec::new(),
        }
    }

    /// Direct read access for inspection.
    pub fn bucket(&self, bucket_id: &BucketId) -> Option<&SearchBucket<I>> {
        self.buckets.get(bucket_id)
    }

    /// Number of buckets ever saved.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Ids passed to `save_bucket`, oldest first.
    pub fn saved_ids(&self) -> &[BucketId] {
        &self.saved
    }
}

impl<I: Clone> BucketStore<I> for MemoryBucketStore<I> {
    fn max_items_per_bucket(&self) -> u32 {
        self.max_items_per_bucket
    }

    fn load_bucket(&self, bucket_id: &BucketId) -> Result<Option<SearchBucket<I>>> {
        Ok(self.buckets.get(bucket_id).cloned())
    }

    fn save_bucket(&mut self, bucket: &SearchBucket<I>) -> Result<()> {
        self.buckets.insert(bucket.id.clone(), bucket.clone());
        self.saved.push(bucket.id.clone());
        Ok(())
    }
}
