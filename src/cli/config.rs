use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::args::{DirectionArg, OutputFormat, RemoteArgs, StoreArgs, StoreKindArg};
use crate::cli::{SearchArgs, ServeArgs};

/// Top-level representation of `.zksearch/config.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub store: Option<StoreSection>,

    #[serde(default)]
    pub search: Option<SearchSection>,

    #[serde(default)]
    pub serve: Option<ServeSection>,

    #[serde(default)]
    pub http: Option<HttpSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreSection {
    #[serde(default)]
    pub kind: Option<StoreKindArg>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub max_items_per_bucket: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchSection {
    #[serde(default)]
    pub direction: Option<DirectionArg>,
    #[serde(default)]
    pub exact: Option<bool>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServeSection {
    #[serde(default)]
    pub addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HttpSection {
    #[serde(default)]
    pub server_url: Option<String>,
}

/// Discover and load a project-local `.zksearch/config.toml` (or
/// `.zksearch/zksearch.toml`) starting from the current working
/// directory and walking up parent directories.
pub fn load_cli_config() -> Result<Option<CliConfig>> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let config_path = find_project_config(&cwd);

    let Some(path) = config_path else {
        return Ok(None);
    };

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: CliConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse TOML config at {}", path.display()))?;

    Ok(Some(config))
}

fn find_project_config(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);

    while let Some(current) = dir {
        let zksearch_dir = current.join(".zksearch");
        let config_toml = zksearch_dir.join("config.toml");
        if config_toml.is_file() {
            return Some(config_toml);
        }

        let zksearch_toml = zksearch_dir.join("zksearch.toml");
        if zksearch_toml.is_file() {
            return Some(zksearch_toml);
        }

        dir = current.parent();
    }

    None
}

/// Fill unset store and server flags from `[store]` and `[http]`.
pub fn apply_common_config_defaults(
    config: &CliConfig,
    store: &mut StoreArgs,
    remote: &mut RemoteArgs,
) {
    if let Some(section) = &config.store {
        if store.kind.is_none() {
            store.kind = section.kind;
        }

        if store.path.is_none() {
            if let Some(path) = &section.path {
                store.path = Some(path.clone());
            }
        }

        if store.max_items_per_bucket.is_none() {
            store.max_items_per_bucket = section.max_items_per_bucket;
        }
    }

    if remote.server.is_none() {
        if let Some(http) = &config.http {
            if let Some(url) = &http.server_url {
                remote.server = Some(url.clone());
            }
        }
    }
}

pub fn apply_search_config_defaults(config: &CliConfig, args: &mut SearchArgs) {
    apply_common_config_defaults(config, &mut args.store, &mut args.remote);

    let Some(search) = &config.search else {
        return;
    };

    if args.direction.is_none() {
        args.direction = search.direction;
    }

    if !args.exact {
        if let Some(true) = search.exact {
            args.exact = true;
        }
    }

    if args.limit.is_none() {
        if let Some(limit) = search.limit {
            args.limit = Some(limit);
        }
    }

    if matches!(args.format, OutputFormat::Text) {
        if let Some(format) = search.format {
            args.format = format;
        }
    }
}

pub fn apply_serve_config_defaults(config: &CliConfig, args: &mut ServeArgs) {
    if let Some(serve) = &config.serve {
        if args.addr == "127.0.0.1:7878" {
            if let Some(addr) = &serve.addr {
                args.addr = addr.clone();
            }
        }
    }
}
