//! Bucket traversal order.

use serde::{Deserialize, Serialize};

use crate::store::models::{BucketId, SearchKeyword};

/// Order in which a keyword's buckets are visited.
///
/// Higher-numbered buckets hold more recently indexed items, so
/// `LatestFirst` surfaces recent items before older ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchDirection {
    /// Highest bucket index down to 0.
    #[default]
    #[serde(rename = "latest")]
    LatestFirst,
    /// Bucket 0 up to the highest index.
    #[serde(rename = "oldest")]
    OldestFirst,
}

/// Indices `0..num_buckets` in `direction` order.
pub fn bucket_indices(
    num_buckets: u32,
    direction: SearchDirection,
) -> Box<dyn Iterator<Item = u32>> {
    match direction {
        SearchDirection::LatestFirst => Box::new((0..num_buckets).rev()),
        SearchDirection::OldestFirst => Box::new(0..num_buckets),
    }
}

/// Bucket ids of `keyword` in `direction` order.
pub fn bucket_ids(keyword: &SearchKeyword, direction: SearchDirection) -> Vec<BucketId> {
    bucket_indices(keyword.num_buckets, direction)
        .map(|index| BucketId::new(&keyword.value, index))
        .collect()
}
