//! File-based glossary and bucket store.
//!
//! Data lives under a `.zksearch/` style directory:
//! - `meta.json`
//! - `glossary.jsonl` (one keyword per line)
//! - `buckets/<sha256 of bucket id>.json` (one file per bucket)
//!
//! Bucket file names are the hex SHA-256 digest of the bucket id, so
//! they have a fixed length whatever the token. The id itself is kept
//! in the bucket body. The glossary is rewritten in full on each
//! `save_keyword` through a temp file and rename; keywords with no
//! buckets yet stay in memory.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::store::backend::{BucketStore, SearchGlossary};
use crate::store::models::{
    BucketId, SearchBucket, SearchKeyword, StoreMeta, DEFAULT_MAX_ITEMS_PER_BUCKET,
    STORE_SCHEMA_VERSION,
};

const META_FILE: &str = "meta.json";
const GLOSSARY_FILE: &str = "glossary.jsonl";
const BUCKETS_DIR: &str = "buckets";

/// Open (or create) a file store rooted at `root`.
///
/// When `requested_capacity` is set and the store already exists, it
/// must match the capacity the store was created with.
pub fn open(
    root: &Path,
    requested_capacity: Option<u32>,
) -> Result<(FileGlossary, FileBucketStore, StoreMeta)> {
    fs::create_dir_all(root.join(BUCKETS_DIR))
        .with_context(|| format!("failed to create store directory {}", root.display()))?;

    let meta = match load_meta(root)? {
        Some(meta) => {
            super::check_capacity(root, &meta, requested_capacity)?;
            meta
        }
        None => {
            let meta =
                StoreMeta::fresh(requested_capacity.unwrap_or(DEFAULT_MAX_ITEMS_PER_BUCKET));
            save_meta(root, &meta)?;
            meta
        }
    };

    let glossary = FileGlossary::open(root)?;
    let buckets = FileBucketStore {
        root: root.to_path_buf(),
        max_items_per_bucket: meta.max_items_per_bucket,
    };

    Ok((glossary, buckets, meta))
}

/// Read `meta.json` if present.
pub fn load_meta(root: &Path) -> Result<Option<StoreMeta>> {
    let path = root.join(META_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
    let meta: StoreMeta = serde_json::from_reader(file)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    if meta.schema_version != STORE_SCHEMA_VERSION {
        bail!(
            "unsupported store schema version {}; expected {}",
            meta.schema_version,
            STORE_SCHEMA_VERSION
        );
    }

    Ok(Some(meta))
}

/// Persist `meta.json`.
pub fn save_meta(root: &Path, meta: &StoreMeta) -> Result<()> {
    let path = root.join(META_FILE);
    write_atomically(&path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, meta)?;
        writeln!(writer)?;
        Ok(())
    })
}

/// Glossary kept in memory and mirrored to `glossary.jsonl`.
pub struct FileGlossary {
    root: PathBuf,
    keywords: BTreeMap<String, SearchKeyword>,
}

impl FileGlossary {
    fn open(root: &Path) -> Result<Self> {
        let path = root.join(GLOSSARY_FILE);
        let mut keywords = BTreeMap::new();

        if path.exists() {
            let file =
                File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
            let reader = BufReader::new(file);

            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }

                let keyword: SearchKeyword = serde_json::from_str(&line)
                    .with_context(|| format!("invalid glossary record in {}", path.display()))?;
                keywords.insert(keyword.value.clone(), keyword);
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            keywords,
        })
    }

    fn persist(&self) -> Result<()> {
        let path = self.root.join(GLOSSARY_FILE);
        write_atomically(&path, |writer| {
            for keyword in self.keywords.values() {
                serde_json::to_writer(&mut *writer, keyword)?;
                writeln!(writer)?;
            }
            Ok(())
        })
    }
}

impl SearchGlossary for FileGlossary {
    fn get_keywords(&self) -> Result<Vec<SearchKeyword>> {
        Ok(self.keywords.values().cloned().collect())
    }

    fn get_or_add_keyword(&mut self, token: &str) -> Result<SearchKeyword> {
        if let Some(existing) = self.keywords.get(token) {
            return Ok(existing.clone());
        }

        let keyword = SearchKeyword::new(token);
        self.keywords.insert(token.to_string(), keyword.clone());
        Ok(keyword)
    }

    fn save_keyword(&mut self, keyword: &SearchKeyword) -> Result<()> {
        self.keywords.insert(keyword.value.clone(), keyword.clone());
        self.persist()
    }

    fn find_keyword(&self, token: &str) -> Result<Option<SearchKeyword>> {
        Ok(self.keywords.get(token).cloned())
    }
}

/// One JSON file per bucket.
pub struct FileBucketStore {
    root: PathBuf,
    max_items_per_bucket: u32,
}

impl FileBucketStore {
    fn bucket_path(&self, bucket_id: &BucketId) -> PathBuf {
        self.root
            .join(BUCKETS_DIR)
            .join(format!("{}.json", bucket_file_stem(bucket_id)))
    }
}

impl<I> BucketStore<I> for FileBucketStore
where
    I: Serialize + DeserializeOwned,
{
    fn max_items_per_bucket(&self) -> u32 {
        self.max_items_per_bucket
    }

    fn load_bucket(&self, bucket_id: &BucketId) -> Result<Option<SearchBucket<I>>> {
        let path = self.bucket_path(bucket_id);
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
        let bucket: SearchBucket<I> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse bucket {bucket_id}"))?;
        Ok(Some(bucket))
    }

    fn save_bucket(&mut self, bucket: &SearchBucket<I>) -> Result<()> {
        let path = self.bucket_path(&bucket.id);
        write_atomically(&path, |writer| {
            serde_json::to_writer(&mut *writer, bucket)?;
            Ok(())
        })
    }
}

fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)
            .with_context(|| format!("failed to create {}", tmp_path.display()))?;
        let mut writer = BufWriter::new(file);
        write(&mut writer)?;
        writer.flush()?;
    }
    fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

fn bucket_file_stem(bucket_id: &BucketId) -> String {
    hex::encode(Sha256::digest(bucket_id.as_str().as_bytes()))
}
