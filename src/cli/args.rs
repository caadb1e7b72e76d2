use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use crate::models::{
    DeindexRequest, ImportRecord, ImportRequest, IndexRequest, KeywordsRequest, ReindexRequest,
    SearchDirection, SearchRequest, StoreConfig, StoreKind,
};

/// Top-level CLI entrypoint for `zksearch`.
#[derive(Parser, Debug)]
#[command(
    name = "zksearch",
    about = "Bucketed inverted search index CLI",
    author = "zksearch developers",
    subcommand_required = false,
    arg_required_else_help = false
)]
pub struct Cli {
    /// Print the JSON schema version used for `--format=json` search
    /// output and exit.
    #[arg(long = "schema-version")]
    pub schema_version: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index an item's text.
    Index(IndexArgs),
    /// Move an item from its old text to its new text.
    Reindex(ReindexArgs),
    /// Remove an item, given the text it was indexed with.
    Deindex(DeindexArgs),
    /// Search the index.
    Search(SearchArgs),
    /// List glossary keywords.
    Keywords(KeywordsArgs),
    /// Index every record of a JSONL file.
    Import(ImportArgs),
    /// Inspect an existing store without modifying it.
    StoreInfo(StoreInfoArgs),
    /// Run a long-lived HTTP+JSON daemon.
    Serve(ServeArgs),
}

/// CLI representation of output format.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Table,
    Json,
}

/// CLI representation of store kind.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKindArg {
    File,
    Sqlite,
}

/// CLI representation of bucket traversal order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionArg {
    Latest,
    Oldest,
}

impl DirectionArg {
    pub fn to_model(self) -> SearchDirection {
        match self {
            DirectionArg::Latest => SearchDirection::LatestFirst,
            DirectionArg::Oldest => SearchDirection::OldestFirst,
        }
    }
}

/// Flags selecting the store every data subcommand operates on.
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Store kind.
    ///
    /// When omitted, a `--store-path` ending in `.sqlite` selects the
    /// SQLite store and anything else the file store.
    #[arg(long = "store", value_enum)]
    pub kind: Option<StoreKindArg>,

    /// Location of the store.
    ///
    /// For the file store this is a directory (default ".zksearch").
    /// For the SQLite store this is a database file (default
    /// ".zksearch/index.sqlite").
    #[arg(long = "store-path")]
    pub path: Option<PathBuf>,

    /// Bucket capacity for a new store. An existing store must have
    /// been created with the same value.
    #[arg(long = "max-items-per-bucket")]
    pub max_items_per_bucket: Option<u32>,
}

/// Flags for delegating to a running daemon.
#[derive(Args, Debug, Clone, Default)]
pub struct RemoteArgs {
    /// Optional server URL for delegating the operation to a daemon.
    ///
    /// When set (either via this flag or the `ZKSEARCH_SERVER_URL`
    /// environment variable), the CLI sends the request to the HTTP
    /// server instead of opening the store locally. Use `--no-server`
    /// to override this and force local execution.
    #[arg(long = "server", env = "ZKSEARCH_SERVER_URL")]
    pub server: Option<String>,

    /// Disable use of any configured server and force local execution.
    #[arg(long = "no-server")]
    pub no_server: bool,
}

/// Arguments specific to the `index` subcommand.
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Opaque item identifier.
    pub item_id: String,

    /// Text to index.
    pub text: Option<String>,

    /// Read the text to index from a file instead.
    #[arg(long = "text-file", conflicts_with = "text")]
    pub text_file: Option<PathBuf>,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

/// Arguments specific to the `reindex` subcommand.
#[derive(Args, Debug)]
pub struct ReindexArgs {
    /// Opaque item identifier.
    pub item_id: String,

    /// Text the item is currently indexed with.
    #[arg(long = "old", conflicts_with = "old_file")]
    pub old: Option<String>,

    /// Read the current text from a file.
    #[arg(long = "old-file")]
    pub old_file: Option<PathBuf>,

    /// Text the item should be indexed with afterwards.
    #[arg(long = "new", conflicts_with = "new_file")]
    pub new: Option<String>,

    /// Read the new text from a file.
    #[arg(long = "new-file")]
    pub new_file: Option<PathBuf>,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

/// Arguments specific to the `deindex` subcommand.
#[derive(Args, Debug)]
pub struct DeindexArgs {
    /// Opaque item identifier.
    pub item_id: String,

    /// Text the item was indexed with.
    pub text: Option<String>,

    /// Read the text from a file instead.
    #[arg(long = "text-file", conflicts_with = "text")]
    pub text_file: Option<PathBuf>,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

/// Arguments specific to the `search` subcommand.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search terms; an item matches when any term matches.
    pub terms: String,

    /// Bucket traversal order [default: latest].
    #[arg(long = "direction", value_enum)]
    pub direction: Option<DirectionArg>,

    /// Require keywords to equal a term instead of containing it.
    #[arg(long = "exact")]
    pub exact: bool,

    /// Maximum number of item ids to print.
    #[arg(long = "limit")]
    pub limit: Option<usize>,

    /// Output format (text, table, or json).
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

/// Arguments specific to the `keywords` subcommand.
#[derive(Args, Debug)]
pub struct KeywordsArgs {
    /// Only list keywords containing every token of this filter.
    #[arg(long = "filter")]
    pub filter: Option<String>,

    /// Output format (text, table, or json).
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

/// Arguments specific to the `import` subcommand.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSONL file with one `{"id": ..., "text": ...}` object per line.
    pub file: PathBuf,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

/// Arguments specific to the `store-info` subcommand.
#[derive(Args, Debug)]
pub struct StoreInfoArgs {
    /// Output format (text or json).
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

/// Arguments specific to the `serve` subcommand.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to, e.g. "127.0.0.1:7878".
    #[arg(long = "addr", default_value = "127.0.0.1:7878")]
    pub addr: String,
}

/// Build a `StoreConfig` from the shared store flags.
pub fn store_config_from_args(args: &StoreArgs) -> StoreConfig {
    let kind_arg = match (&args.kind, &args.path) {
        (Some(kind), _) => *kind,
        (None, Some(path)) => {
            if path
                .extension()
                .and_then(|e| e.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("sqlite"))
                .unwrap_or(false)
            {
                StoreKindArg::Sqlite
            } else {
                StoreKindArg::File
            }
        }
        (None, None) => StoreKindArg::File,
    };

    let kind = match kind_arg {
        StoreKindArg::File => StoreKind::File,
        StoreKindArg::Sqlite => StoreKind::Sqlite,
    };

    let path = match (&args.path, kind_arg) {
        (Some(path), _) => path.clone(),
        (None, StoreKindArg::File) => PathBuf::from(".zksearch"),
        (None, StoreKindArg::Sqlite) => PathBuf::from(".zksearch").join("index.sqlite"),
    };

    StoreConfig {
        kind,
        path,
        max_items_per_bucket: args.max_items_per_bucket,
    }
}

pub fn index_request_from_args(args: &IndexArgs) -> Result<IndexRequest> {
    Ok(IndexRequest {
        store: store_config_from_args(&args.store),
        item_id: args.item_id.clone(),
        text: resolve_text("TEXT", "--text-file", &args.text, &args.text_file)?,
    })
}

pub fn reindex_request_from_args(args: &ReindexArgs) -> Result<ReindexRequest> {
    Ok(ReindexRequest {
        store: store_config_from_args(&args.store),
        item_id: args.item_id.clone(),
        old_text: resolve_text("--old", "--old-file", &args.old, &args.old_file)?,
        new_text: resolve_text("--new", "--new-file", &args.new, &args.new_file)?,
    })
}

pub fn deindex_request_from_args(args: &DeindexArgs) -> Result<DeindexRequest> {
    Ok(DeindexRequest {
        store: store_config_from_args(&args.store),
        item_id: args.item_id.clone(),
        text: resolve_text("TEXT", "--text-file", &args.text, &args.text_file)?,
    })
}

pub fn search_request_from_args(args: &SearchArgs) -> SearchRequest {
    SearchRequest {
        store: store_config_from_args(&args.store),
        terms: args.terms.clone(),
        direction: args.direction.unwrap_or(DirectionArg::Latest).to_model(),
        fuzzy: !args.exact,
    }
}

pub fn keywords_request_from_args(args: &KeywordsArgs) -> KeywordsRequest {
    KeywordsRequest {
        store: store_config_from_args(&args.store),
        filter: args.filter.clone(),
    }
}

/// Build an `ImportRequest` by reading every record of the JSONL file.
pub fn import_request_from_args(args: &ImportArgs) -> Result<ImportRequest> {
    Ok(ImportRequest {
        store: store_config_from_args(&args.store),
        records: read_import_records(&args.file)?,
    })
}

fn read_import_records(path: &Path) -> Result<Vec<ImportRecord>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record: ImportRecord = serde_json::from_str(&line).with_context(|| {
            format!("invalid import record on line {} of {}", idx + 1, path.display())
        })?;
        records.push(record);
    }

    Ok(records)
}

fn resolve_text(
    inline_name: &str,
    file_name: &str,
    inline: &Option<String>,
    file: &Option<PathBuf>,
) -> Result<String> {
    match (inline, file) {
        (Some(_), Some(_)) => bail!("{inline_name} and {file_name} are mutually exclusive"),
        (Some(text), None) => Ok(text.clone()),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        (None, None) => bail!("either {inline_name} or {file_name} is required"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_config_defaults_to_file_store() {
        let config = store_config_from_args(&StoreArgs::default());

        assert_eq!(config.kind, StoreKind::File);
        assert_eq!(config.path, PathBuf::from(".zksearch"));
        assert_eq!(config.max_items_per_bucket, None);
    }

    #[test]
    fn store_config_infers_sqlite_from_extension() {
        let args = StoreArgs {
            kind: None,
            path: Some(PathBuf::from("data/notes.SQLite")),
            max_items_per_bucket: Some(8),
        };
        let config = store_config_from_args(&args);

        assert_eq!(config.kind, StoreKind::Sqlite);
        assert_eq!(config.path, PathBuf::from("data/notes.SQLite"));
        assert_eq!(config.max_items_per_bucket, Some(8));
    }

    #[test]
    fn store_config_uses_default_sqlite_path() {
        let args = StoreArgs {
            kind: Some(StoreKindArg::Sqlite),
            ..StoreArgs::default()
        };
        let config = store_config_from_args(&args);

        assert_eq!(config.path, PathBuf::from(".zksearch").join("index.sqlite"));
    }

    #[test]
    fn search_request_maps_exact_and_direction() {
        let args = SearchArgs {
            terms: "hello".to_string(),
            direction: Some(DirectionArg::Oldest),
            exact: true,
            limit: Some(3),
            format: OutputFormat::Json,
            store: StoreArgs::default(),
            remote: RemoteArgs::default(),
        };
        let request = search_request_from_args(&args);

        assert_eq!(request.terms, "hello");
        assert_eq!(request.direction, SearchDirection::OldestFirst);
        assert!(!request.fuzzy);
    }

    #[test]
    fn index_request_requires_text() {
        let args = IndexArgs {
            item_id: "item1".to_string(),
            text: None,
            text_file: None,
            store: StoreArgs::default(),
            remote: RemoteArgs::default(),
        };

        let err = index_request_from_args(&args).expect_err("missing text");
        assert!(err.to_string().contains("either TEXT or --text-file"));
    }

    #[test]
    fn import_records_skip_blank_lines_and_report_bad_ones() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("items.jsonl");
        fs::write(
            &path,
            "{\"id\":\"a\",\"text\":\"hello\"}\n\n{\"id\":\"b\",\"text\":\"world\"}\n",
        )
        .expect("write");

        let records = read_import_records(&path).expect("records");
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        fs::write(&path, "{\"id\":\"a\"}\n").expect("write");
        let err = read_import_records(&path).expect_err("missing text field");
        assert!(err.to_string().contains("line 1"));
    }
}
