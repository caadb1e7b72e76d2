//! Bucketed inverted index engine.
//!
//! The engine keeps no state of its own: every call re-reads what it
//! needs from the glossary and bucket store it was constructed with.
//! It performs no locking. Two overlapping mutations of the same
//! keyword can lose updates (both observe `num_buckets = N` and both
//! write bucket `N`), so callers must serialize mutations per keyword
//! or use a store with compare-and-swap saves.

use std::collections::HashSet;
use std::hash::Hash;
use std::marker::PhantomData;

use anyhow::Result;
use tracing::debug;

use crate::search::direction::{bucket_ids, SearchDirection};
use crate::search::tokenizer::tokenize;
use crate::store::{BucketId, BucketStore, SearchBucket, SearchGlossary, SearchKeyword};

/// Search engine over a glossary `G` and a bucket store `B` holding
/// item ids of type `I`.
pub struct SearchEngine<G, B, I> {
    glossary: G,
    buckets: B,
    _item: PhantomData<fn() -> I>,
}

impl<G, B, I> SearchEngine<G, B, I>
where
    G: SearchGlossary,
    B: BucketStore<I>,
    I: Eq + Hash + Clone,
{
    pub fn new(glossary: G, buckets: B) -> Self {
        Self {
            glossary,
            buckets,
            _item: PhantomData,
        }
    }

    pub fn glossary(&self) -> &G {
        &self.glossary
    }

    pub fn buckets(&self) -> &B {
        &self.buckets
    }

    /// Give the collaborators back.
    pub fn into_parts(self) -> (G, B) {
        (self.glossary, self.buckets)
    }

    /// Index every token of `text` for `item_id`.
    ///
    /// Calling this twice with the same item and text without a
    /// `deindex` in between appends the item twice.
    pub fn add_index(&mut self, item_id: &I, text: &str) -> Result<()> {
        for token in tokenize(text) {
            self.add_index_token(item_id, &token)?;
        }
        Ok(())
    }

    /// Move `item_id` from `old_text` to `new_text`.
    ///
    /// Only tokens that disappeared are deindexed and only tokens that
    /// appeared are indexed. Tokens present in both texts cause no
    /// glossary or bucket writes at all.
    pub fn reindex(&mut self, item_id: &I, old_text: &str, new_text: &str) -> Result<()> {
        let old_tokens = tokenize(old_text);
        let new_tokens = tokenize(new_text);

        for token in old_tokens.difference(&new_tokens) {
            self.deindex_token(item_id, token)?;
        }

        for token in new_tokens.difference(&old_tokens) {
            self.add_index_token(item_id, token)?;
        }

        Ok(())
    }

    /// Remove `item_id` from the buckets of every token of `text`.
    ///
    /// `text` must be what the item was indexed with; tokens it lacks
    /// are left alone.
    pub fn deindex(&mut self, item_id: &I, text: &str) -> Result<()> {
        for token in tokenize(text) {
            self.deindex_token(item_id, &token)?;
        }
        Ok(())
    }

    /// Items matching any token of `terms`, without duplicates.
    ///
    /// With `fuzzy`, a keyword matches when it contains a query token
    /// (`"hel"` finds `"hello"`); otherwise it must equal one.
    pub fn search(
        &self,
        terms: &str,
        direction: SearchDirection,
        fuzzy: bool,
    ) -> Result<HashSet<I>> {
        Ok(self
            .search_ordered(terms, direction, fuzzy)?
            .into_iter()
            .collect())
    }

    /// Like `search`, but keeps the order in which items were first
    /// seen while walking buckets in `direction`.
    ///
    /// Keywords are visited in glossary order.
    pub fn search_ordered(
        &self,
        terms: &str,
        direction: SearchDirection,
        fuzzy: bool,
    ) -> Result<Vec<I>> {
        let keywords = self.matching_keywords(terms, fuzzy)?;
        let results = self.collect_items(&keywords, direction)?;

        debug!(
            terms,
            keywords = keywords.len(),
            results = results.len(),
            "search finished"
        );

        Ok(results)
    }

    /// Union of the buckets of `keywords`, deduplicated in traversal
    /// order.
    pub fn collect_items(
        &self,
        keywords: &[SearchKeyword],
        direction: SearchDirection,
    ) -> Result<Vec<I>> {
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        for keyword in keywords {
            for bucket_id in bucket_ids(keyword, direction) {
                let Some(bucket) = self.buckets.load_bucket(&bucket_id)? else {
                    continue;
                };
                for item_id in bucket.item_ids {
                    if seen.insert(item_id.clone()) {
                        results.push(item_id);
                    }
                }
            }
        }

        Ok(results)
    }

    /// Glossary keywords selected by the tokens of `terms`.
    pub fn matching_keywords(&self, terms: &str, fuzzy: bool) -> Result<Vec<SearchKeyword>> {
        let tokens = tokenize(terms);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let keywords = self.glossary.get_keywords()?;
        Ok(keywords
            .into_iter()
            .filter(|keyword| {
                tokens.iter().any(|token| {
                    if fuzzy {
                        keyword.value.contains(token.as_str())
                    } else {
                        keyword.value == *token
                    }
                })
            })
            .collect())
    }

    fn add_index_token(&mut self, item_id: &I, token: &str) -> Result<()> {
        let keyword = self.glossary.get_or_add_keyword(token)?;

        let mut bucket = if keyword.num_buckets == 0 {
            self.glossary.save_keyword(&keyword.with_num_buckets(1))?;
            SearchBucket::empty(BucketId::new(&keyword.value, 0))
        } else {
            let last_id = BucketId::new(&keyword.value, keyword.num_buckets - 1);
            let last = self
                .buckets
                .load_bucket(&last_id)?
                .unwrap_or_else(|| SearchBucket::empty(last_id));

            // Capacity is checked before the append so a bucket fills
            // up exactly to the limit and no empty trailing bucket is
            // ever allocated.
            if last.len() >= self.buckets.max_items_per_bucket() as usize {
                let next_id = BucketId::new(&keyword.value, keyword.num_buckets);
                debug!(keyword = %keyword.value, bucket = %next_id, "allocating bucket");
                self.glossary
                    .save_keyword(&keyword.with_num_buckets(keyword.num_buckets + 1))?;
                SearchBucket::empty(next_id)
            } else {
                last
            }
        };

        bucket.item_ids.push(item_id.clone());
        self.buckets.save_bucket(&bucket)
    }

    fn deindex_token(&mut self, item_id: &I, token: &str) -> Result<()> {
        let Some(keyword) = self.glossary.find_keyword(token)? else {
            return Ok(());
        };

        // Emptied buckets stay and num_buckets never shrinks, so the
        // store cannot tell how many or when items were removed.
        for bucket_id in bucket_ids(&keyword, SearchDirection::LatestFirst) {
            let Some(mut bucket) = self.buckets.load_bucket(&bucket_id)? else {
                continue;
            };

            if bucket.remove_first(item_id) {
                debug!(bucket = %bucket_id, "removed item from bucket");
                self.buckets.save_bucket(&bucket)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryBucketStore, MemoryGlossary};

    type MemoryEngine<I> = SearchEngine<MemoryGlossary, MemoryBucketStore<I>, I>;

    fn engine(max_items_per_bucket: u32) -> MemoryEngine<String> {
        SearchEngine::new(
            MemoryGlossary::new(),
            MemoryBucketStore::new(max_items_per_bucket),
        )
    }

    fn id(value: &str) -> String {
        value.to_string()
    }

    fn ids(values: &[&str]) -> HashSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn search(engine: &MemoryEngine<String>, terms: &str) -> HashSet<String> {
        engine
            .search(terms, SearchDirection::LatestFirst, true)
            .expect("search")
    }

    fn keyword(engine: &MemoryEngine<String>, value: &str) -> SearchKeyword {
        engine
            .glossary()
            .find_keyword(value)
            .expect("lookup")
            .expect("keyword present")
    }

    #[test]
    fn add_index_creates_one_keyword_per_token() {
        let mut engine = engine(10);
        engine
            .add_index(&id("item1"), "Hello, World! Test@123")
            .expect("index");

        let values: Vec<String> = engine
            .glossary()
            .get_keywords()
            .expect("keywords")
            .into_iter()
            .map(|k| k.value)
            .collect();
        assert_eq!(values, vec!["123", "hello", "test", "world"]);
    }

    #[test]
    fn indexed_item_is_found_by_each_token() {
        let mut engine = engine(10);
        engine.add_index(&id("item1"), "Hello World").expect("index");

        assert_eq!(search(&engine, "hello"), ids(&["item1"]));
        assert_eq!(search(&engine, "world"), ids(&["item1"]));
        assert!(search(&engine, "nonexistent").is_empty());
    }

    #[test]
    fn buckets_fill_to_capacity_before_a_new_one_is_allocated() {
        let mut engine = engine(2);
        for item in ["item1", "item2", "item3"] {
            engine.add_index(&id(item), "hello").expect("index");
        }

        assert_eq!(keyword(&engine, "hello").num_buckets, 2);

        let first = engine
            .buckets()
            .bucket(&BucketId::new("hello", 0))
            .expect("bucket 0");
        assert_eq!(first.item_ids, vec!["item1", "item2"]);

        let second = engine
            .buckets()
            .bucket(&BucketId::new("hello", 1))
            .expect("bucket 1");
        assert_eq!(second.item_ids, vec!["item3"]);

        assert_eq!(search(&engine, "hello"), ids(&["item1", "item2", "item3"]));
    }

    #[test]
    fn bucket_reaching_capacity_does_not_allocate_until_next_insert() {
        let mut engine = engine(2);
        engine.add_index(&id("item1"), "hello").expect("index");
        engine.add_index(&id("item2"), "hello").expect("index");

        assert_eq!(keyword(&engine, "hello").num_buckets, 1);
        assert_eq!(engine.buckets().len(), 1);
    }

    #[test]
    fn missing_last_bucket_is_treated_as_empty() {
        let mut glossary = MemoryGlossary::new();
        glossary
            .save_keyword(&SearchKeyword {
                value: "hello".to_string(),
                num_buckets: 3,
            })
            .expect("save");
        let mut engine: MemoryEngine<String> =
            SearchEngine::new(glossary, MemoryBucketStore::new(2));

        engine.add_index(&id("item1"), "hello").expect("index");

        assert_eq!(keyword(&engine, "hello").num_buckets, 3);
        let bucket = engine
            .buckets()
            .bucket(&BucketId::new("hello", 2))
            .expect("bucket 2");
        assert_eq!(bucket.item_ids, vec!["item1"]);
        assert_eq!(search(&engine, "hello"), ids(&["item1"]));
    }

    #[test]
    fn search_uses_or_semantics_across_tokens() {
        let mut engine = engine(10);
        engine.add_index(&id("item1"), "Hello World").expect("index");
        engine.add_index(&id("item2"), "Hello Universe").expect("index");
        engine.add_index(&id("item3"), "Goodbye World").expect("index");

        assert_eq!(
            search(&engine, "hello world"),
            ids(&["item1", "item2", "item3"])
        );
        assert_eq!(search(&engine, "hello"), ids(&["item1", "item2"]));
    }

    #[test]
    fn exact_search_requires_whole_keyword() {
        let mut engine = engine(10);
        engine.add_index(&id("item1"), "Hello World").expect("index");
        engine.add_index(&id("item2"), "Help").expect("index");

        let exact = engine
            .search("hel", SearchDirection::LatestFirst, false)
            .expect("search");
        assert!(exact.is_empty());

        let fuzzy = engine
            .search("hel", SearchDirection::LatestFirst, true)
            .expect("search");
        assert_eq!(fuzzy, ids(&["item1", "item2"]));
    }

    #[test]
    fn fuzzy_match_is_query_inside_keyword_not_the_reverse() {
        let mut engine = engine(10);
        engine.add_index(&id("item1"), "hel").expect("index");

        assert!(search(&engine, "hello").is_empty());
    }

    #[test]
    fn item_matching_several_tokens_is_returned_once() {
        let mut engine = engine(10);
        engine.add_index(&id("item1"), "Hello World").expect("index");

        let ordered = engine
            .search_ordered("hello world", SearchDirection::LatestFirst, true)
            .expect("search");
        assert_eq!(ordered, vec!["item1"]);
    }

    #[test]
    fn direction_controls_traversal_order() {
        let mut engine = engine(2);
        for item in ["item1", "item2", "item3", "item4", "item5"] {
            engine.add_index(&id(item), "test").expect("index");
        }

        let latest = engine
            .search_ordered("test", SearchDirection::LatestFirst, true)
            .expect("search");
        assert_eq!(latest, vec!["item5", "item3", "item4", "item1", "item2"]);

        let oldest = engine
            .search_ordered("test", SearchDirection::OldestFirst, true)
            .expect("search");
        assert_eq!(oldest, vec!["item1", "item2", "item3", "item4", "item5"]);
    }

    #[test]
    fn reindex_only_touches_changed_tokens() {
        let mut engine = engine(10);
        engine
            .add_index(&id("item1"), "Buy coffee at Starbucks")
            .expect("index");

        let (glossary, buckets) = engine.into_parts();
        let bucket_writes_before = buckets.saved_ids().len();
        let keyword_writes_before = glossary.saved_keywords().len();
        let mut engine: MemoryEngine<String> = SearchEngine::new(glossary, buckets);

        engine
            .reindex(
                &id("item1"),
                "Buy coffee at Starbucks",
                "Buy coffee at McDonald's",
            )
            .expect("reindex");

        assert!(search(&engine, "starbucks").is_empty());
        assert_eq!(search(&engine, "mcdonald"), ids(&["item1"]));
        assert_eq!(search(&engine, "coffee"), ids(&["item1"]));
        assert_eq!(search(&engine, "buy"), ids(&["item1"]));

        let new_bucket_writes: Vec<String> = engine.buckets().saved_ids()[bucket_writes_before..]
            .iter()
            .map(|id| id.to_string())
            .collect();
        let mut sorted = new_bucket_writes.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["mcdonald's:0", "starbucks:0"]);

        let new_keyword_writes: Vec<&str> = engine.glossary().saved_keywords()
            [keyword_writes_before..]
            .iter()
            .map(|k| k.value.as_str())
            .collect();
        assert_eq!(new_keyword_writes, vec!["mcdonald's"]);
    }

    #[test]
    fn reindex_with_completely_different_text_replaces_everything() {
        let mut engine = engine(10);
        engine.add_index(&id("item1"), "Buy coffee").expect("index");

        engine
            .reindex(&id("item1"), "Buy coffee", "Sell books")
            .expect("reindex");

        assert!(search(&engine, "coffee").is_empty());
        assert!(search(&engine, "buy").is_empty());
        assert_eq!(search(&engine, "sell"), ids(&["item1"]));
        assert_eq!(search(&engine, "books"), ids(&["item1"]));
    }

    #[test]
    fn deindex_removes_item_but_keeps_others() {
        let mut engine = engine(10);
        engine.add_index(&id("item1"), "Hello World").expect("index");
        engine.add_index(&id("item2"), "Hello Universe").expect("index");

        engine.deindex(&id("item1"), "Hello World").expect("deindex");

        assert_eq!(search(&engine, "hello"), ids(&["item2"]));
        assert!(search(&engine, "world").is_empty());
        assert_eq!(search(&engine, "hello world"), ids(&["item2"]));
    }

    #[test]
    fn deindex_keeps_empty_buckets_and_bucket_count() {
        let mut engine = engine(1);
        engine.add_index(&id("item1"), "hello").expect("index");
        engine.add_index(&id("item2"), "hello").expect("index");

        engine.deindex(&id("item1"), "hello").expect("deindex");
        engine.deindex(&id("item2"), "hello").expect("deindex");

        assert_eq!(keyword(&engine, "hello").num_buckets, 2);
        for index in 0..2 {
            let bucket = engine
                .buckets()
                .bucket(&BucketId::new("hello", index))
                .expect("bucket kept");
            assert!(bucket.is_empty());
        }
    }

    #[test]
    fn deindex_removes_a_single_duplicate_posting() {
        let mut engine = engine(10);
        engine.add_index(&id("item1"), "hello").expect("index");
        engine.add_index(&id("item1"), "hello").expect("index");

        let bucket = engine
            .buckets()
            .bucket(&BucketId::new("hello", 0))
            .expect("bucket");
        assert_eq!(bucket.item_ids, vec!["item1", "item1"]);

        engine.deindex(&id("item1"), "hello").expect("deindex");
        assert_eq!(search(&engine, "hello"), ids(&["item1"]));

        engine.deindex(&id("item1"), "hello").expect("deindex");
        assert!(search(&engine, "hello").is_empty());
    }

    #[test]
    fn deindex_of_unknown_token_writes_nothing() {
        let mut engine = engine(10);
        engine.deindex(&id("item1"), "never indexed").expect("deindex");

        assert!(engine.glossary().get_keywords().expect("keywords").is_empty());
        assert!(engine.buckets().saved_ids().is_empty());
    }

    #[test]
    fn blank_text_is_a_no_op() {
        let mut engine = engine(10);
        engine.add_index(&id("item1"), "").expect("index");
        engine.add_index(&id("item1"), "   \t\n   ").expect("index");

        assert!(engine.glossary().get_keywords().expect("keywords").is_empty());
        assert!(search(&engine, "").is_empty());
    }

    #[test]
    fn works_with_integer_item_ids() {
        let mut engine: MemoryEngine<u32> =
            SearchEngine::new(MemoryGlossary::new(), MemoryBucketStore::new(10));
        engine.add_index(&1, "Hello World").expect("index");
        engine.add_index(&2, "Goodbye World").expect("index");

        let results = engine
            .search("world", SearchDirection::LatestFirst, true)
            .expect("search");
        assert_eq!(results, HashSet::from([1, 2]));
    }
}
