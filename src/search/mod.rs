//! Tokenizer, bucketed index engine, and the operation entry points.
//!
//! The `run_*` functions open the configured store, run a single
//! engine operation against it, and return a serializable result. They
//! are shared by the CLI and the daemon so both paths behave
//! identically.

pub mod direction;
pub mod engine;
pub mod tokenizer;

use std::collections::HashSet;

use anyhow::Result;
use tracing::{info, warn};

use crate::models::{
    DeindexRequest, ImportRequest, IndexRequest, IndexSummary, KeywordEntry, KeywordList,
    KeywordsRequest, ReindexRequest, SearchRequest, SearchResult, SearchSummary, StoreConfig,
    SEARCH_RESULT_VERSION,
};
use crate::store::{open_existing_store, open_store, BucketStore, OpenedStore, SearchGlossary};

use self::engine::SearchEngine;
use self::tokenizer::tokenize;

type StoreEngine = SearchEngine<Box<dyn SearchGlossary>, Box<dyn BucketStore<String>>, String>;

/// Index `text` for `item_id`.
pub fn run_index(request: IndexRequest) -> Result<IndexSummary> {
    let tokens = tokenize(&request.text).len() as u64;
    mutate(&request.store, |engine| {
        engine.add_index(&request.item_id, &request.text)
    })?;

    info!(item = %request.item_id, tokens, "indexed item");
    Ok(IndexSummary {
        items: 1,
        tokens_added: tokens,
        tokens_removed: 0,
        tokens_unchanged: 0,
    })
}

/// Move `item_id` from `old_text` to `new_text`, touching only the
/// tokens that differ.
pub fn run_reindex(request: ReindexRequest) -> Result<IndexSummary> {
    let old_tokens = tokenize(&request.old_text);
    let new_tokens = tokenize(&request.new_text);
    let summary = IndexSummary {
        items: 1,
        tokens_added: new_tokens.difference(&old_tokens).count() as u64,
        tokens_removed: old_tokens.difference(&new_tokens).count() as u64,
        tokens_unchanged: old_tokens.intersection(&new_tokens).count() as u64,
    };

    mutate(&request.store, |engine| {
        engine.reindex(&request.item_id, &request.old_text, &request.new_text)
    })?;

    info!(
        item = %request.item_id,
        added = summary.tokens_added,
        removed = summary.tokens_removed,
        "reindexed item"
    );
    Ok(summary)
}

/// Remove `item_id` from the buckets of every token of `text`.
pub fn run_deindex(request: DeindexRequest) -> Result<IndexSummary> {
    let tokens = tokenize(&request.text).len() as u64;
    mutate(&request.store, |engine| {
        engine.deindex(&request.item_id, &request.text)
    })?;

    info!(item = %request.item_id, tokens, "deindexed item");
    Ok(IndexSummary {
        items: 1,
        tokens_added: 0,
        tokens_removed: tokens,
        tokens_unchanged: 0,
    })
}

/// Index every record in order. Records are applied one by one; a
/// failure leaves earlier records indexed.
pub fn run_import(request: ImportRequest) -> Result<IndexSummary> {
    let mut tokens_added = 0_u64;
    mutate(&request.store, |engine| {
        for record in &request.records {
            engine.add_index(&record.id, &record.text)?;
            tokens_added += tokenize(&record.text).len() as u64;
        }
        Ok(())
    })?;

    info!(records = request.records.len(), tokens_added, "imported records");
    Ok(IndexSummary {
        items: request.records.len() as u64,
        tokens_added,
        tokens_removed: 0,
        tokens_unchanged: 0,
    })
}

/// Query the index.
///
/// Item ids come back deduplicated in the order the bucket walk first
/// produced them. The store must already exist.
pub fn run_search(request: SearchRequest) -> Result<SearchResult> {
    let OpenedStore {
        glossary, buckets, ..
    } = open_existing_store(&request.store)?;
    let engine: StoreEngine = SearchEngine::new(glossary, buckets);

    let keywords = engine.matching_keywords(&request.terms, request.fuzzy)?;
    let item_ids = engine.collect_items(&keywords, request.direction)?;
    let buckets_visited = keywords.iter().map(|k| k.num_buckets as u64).sum();

    Ok(SearchResult {
        version: SEARCH_RESULT_VERSION.to_string(),
        query: request.terms,
        direction: request.direction,
        fuzzy: request.fuzzy,
        summary: SearchSummary {
            matched_keywords: keywords.len() as u64,
            buckets_visited,
            total_items: item_ids.len() as u64,
        },
        item_ids,
    })
}

/// List glossary entries, optionally restricted to keywords containing
/// every token of `filter`. The store must already exist.
pub fn list_keywords(request: KeywordsRequest) -> Result<KeywordList> {
    let store = open_existing_store(&request.store)?;
    let filter: HashSet<String> = request
        .filter
        .as_deref()
        .map(tokenize)
        .unwrap_or_default();

    let keywords = store
        .glossary
        .get_keywords()?
        .into_iter()
        .filter(|keyword| filter.iter().all(|token| keyword.value.contains(token.as_str())))
        .map(|keyword| KeywordEntry {
            value: keyword.value,
            num_buckets: keyword.num_buckets,
        })
        .collect();

    Ok(KeywordList { keywords })
}

fn mutate<F>(config: &StoreConfig, op: F) -> Result<()>
where
    F: FnOnce(&mut StoreEngine) -> Result<()>,
{
    let OpenedStore {
        mut handle,
        glossary,
        buckets,
    } = open_store(config)?;
    let mut engine: StoreEngine = SearchEngine::new(glossary, buckets);

    let outcome = op(&mut engine);
    // Record partial writes even when the operation failed.
    match (outcome, handle.touch()) {
        (Err(err), Err(touch_err)) => {
            warn!(path = %handle.path.display(), error = %touch_err, "failed to update store metadata");
            Err(err)
        }
        (outcome, touched) => outcome.and(touched),
    }
}
