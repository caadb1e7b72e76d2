use std::cmp;

use anyhow::Result;

use crate::models::{IndexSummary, KeywordList, SearchDirection, SearchResult, StoreKind, StoreSummary};

/// Render a `SearchResult` as one item id per line.
pub fn print_search_text(result: &SearchResult) -> Result<()> {
    for item_id in &result.item_ids {
        println!("{item_id}");
    }
    Ok(())
}

/// Render a `SearchResult` as a numbered table.
pub fn print_search_table(result: &SearchResult) -> Result<()> {
    if result.item_ids.is_empty() {
        return Ok(());
    }

    const MAX_ITEM_WIDTH: usize = 60;

    let rank_header = "#";
    let item_header = "ITEM";

    let rank_width = cmp::max(rank_header.len(), result.item_ids.len().to_string().len());
    let max_item_len = result
        .item_ids
        .iter()
        .map(|id| id.chars().count())
        .max()
        .unwrap_or(0);
    let item_width = cmp::min(cmp::max(item_header.len(), max_item_len), MAX_ITEM_WIDTH);

    let direction = match result.direction {
        SearchDirection::LatestFirst => "latest",
        SearchDirection::OldestFirst => "oldest",
    };
    println!(
        "{:>rank_width$} {:<item_width$}  ({direction} first)",
        rank_header, item_header
    );

    for (idx, item_id) in result.item_ids.iter().enumerate() {
        println!(
            "{:>rank_width$} {:<item_width$}",
            idx + 1,
            truncate(item_id, item_width)
        );
    }

    Ok(())
}

/// Render a `KeywordList` as `keyword<TAB>num_buckets` lines.
pub fn print_keywords_text(list: &KeywordList) -> Result<()> {
    for keyword in &list.keywords {
        println!("{}\t{}", keyword.value, keyword.num_buckets);
    }
    Ok(())
}

/// Render a `KeywordList` as a simple table.
///
/// Columns:
/// - KEYWORD
/// - BUCKETS
pub fn print_keywords_table(list: &KeywordList) -> Result<()> {
    if list.keywords.is_empty() {
        return Ok(());
    }

    const MAX_KEYWORD_WIDTH: usize = 40;

    let keyword_header = "KEYWORD";
    let buckets_header = "BUCKETS";

    let max_keyword_len = list
        .keywords
        .iter()
        .map(|k| k.value.chars().count())
        .max()
        .unwrap_or(0);
    let max_buckets_len = list
        .keywords
        .iter()
        .map(|k| k.num_buckets.to_string().len())
        .max()
        .unwrap_or(0);

    let keyword_width = cmp::min(
        cmp::max(keyword_header.len(), max_keyword_len),
        MAX_KEYWORD_WIDTH,
    );
    let buckets_width = cmp::max(buckets_header.len(), max_buckets_len);

    println!(
        "{:<keyword_width$} {:>buckets_width$}",
        keyword_header, buckets_header
    );

    for keyword in &list.keywords {
        println!(
            "{:<keyword_width$} {:>buckets_width$}",
            truncate(&keyword.value, keyword_width),
            keyword.num_buckets
        );
    }

    Ok(())
}

/// Render an `IndexSummary` as a single status line.
pub fn print_index_summary_text(verb: &str, summary: &IndexSummary) -> Result<()> {
    let noun = if summary.items == 1 { "item" } else { "items" };
    println!(
        "{verb} {} {noun}: {} tokens added, {} removed, {} unchanged",
        summary.items, summary.tokens_added, summary.tokens_removed, summary.tokens_unchanged
    );
    Ok(())
}

/// Render a `StoreSummary` in human-readable text form.
pub fn print_store_summary_text(summary: &StoreSummary) -> Result<()> {
    let kind_str = match summary.kind {
        StoreKind::File => "file",
        StoreKind::Sqlite => "sqlite",
    };

    println!("store        : {kind_str}");
    println!("path         : {}", summary.path.display());
    println!("capacity     : {}", summary.max_items_per_bucket);

    if let Some(schema) = &summary.schema_version {
        println!("schema       : {schema}");
    }
    if let Some(tool) = &summary.tool_version {
        println!("tool_version : {tool}");
    }
    if let Some(created) = &summary.created_at {
        println!("created_at   : {created}");
    }
    if let Some(updated) = &summary.updated_at {
        println!("updated_at   : {updated}");
    }

    println!("keywords     : {}", summary.keywords);
    println!("buckets      : {}", summary.buckets);
    println!("postings     : {}", summary.postings);

    Ok(())
}

fn truncate(s: &str, max_width: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_width {
        s.to_string()
    } else if max_width <= 1 {
        "…".to_string()
    } else {
        s.chars()
            .take(max_width.saturating_sub(1))
            .collect::<String>()
            + "…"
    }
}
