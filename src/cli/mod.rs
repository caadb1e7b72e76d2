use std::net::SocketAddr;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use crate::models::SEARCH_RESULT_VERSION;
use crate::search;
use crate::server;
use crate::store;

mod args;
mod config;
mod format;
mod http_backend;

pub use args::{
    Cli, Commands, DeindexArgs, DirectionArg, ImportArgs, IndexArgs, KeywordsArgs, OutputFormat,
    ReindexArgs, RemoteArgs, SearchArgs, ServeArgs, StoreArgs, StoreInfoArgs, StoreKindArg,
};

use config::{
    apply_common_config_defaults, apply_search_config_defaults, apply_serve_config_defaults,
    load_cli_config,
};
use http_backend::HttpSearchBackend;

/// Entry point for the CLI binary.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.schema_version {
        println!(
            "Search result JSON schema version: {}",
            SEARCH_RESULT_VERSION
        );
        return Ok(());
    }

    let cli_config = load_cli_config()?;

    match cli.command {
        Some(Commands::Index(mut index_args)) => {
            if let Some(ref config) = cli_config {
                apply_common_config_defaults(config, &mut index_args.store, &mut index_args.remote);
            }

            let request = args::index_request_from_args(&index_args)?;
            let summary = match remote_backend(&index_args.remote)? {
                Some(backend) => backend.index(request)?,
                None => search::run_index(request)?,
            };

            format::print_index_summary_text("Indexed", &summary)
        }
        Some(Commands::Reindex(mut reindex_args)) => {
            if let Some(ref config) = cli_config {
                apply_common_config_defaults(
                    config,
                    &mut reindex_args.store,
                    &mut reindex_args.remote,
                );
            }

            let request = args::reindex_request_from_args(&reindex_args)?;
            let summary = match remote_backend(&reindex_args.remote)? {
                Some(backend) => backend.reindex(request)?,
                None => search::run_reindex(request)?,
            };

            format::print_index_summary_text("Reindexed", &summary)
        }
        Some(Commands::Deindex(mut deindex_args)) => {
            if let Some(ref config) = cli_config {
                apply_common_config_defaults(
                    config,
                    &mut deindex_args.store,
                    &mut deindex_args.remote,
                );
            }

            let request = args::deindex_request_from_args(&deindex_args)?;
            let summary = match remote_backend(&deindex_args.remote)? {
                Some(backend) => backend.deindex(request)?,
                None => search::run_deindex(request)?,
            };

            format::print_index_summary_text("Deindexed", &summary)
        }
        Some(Commands::Import(mut import_args)) => {
            if let Some(ref config) = cli_config {
                apply_common_config_defaults(
                    config,
                    &mut import_args.store,
                    &mut import_args.remote,
                );
            }

            let request = args::import_request_from_args(&import_args)?;
            let summary = match remote_backend(&import_args.remote)? {
                Some(backend) => backend.import(request)?,
                None => search::run_import(request)?,
            };

            format::print_index_summary_text("Imported", &summary)
        }
        Some(Commands::Search(mut search_args)) => {
            if let Some(ref config) = cli_config {
                apply_search_config_defaults(config, &mut search_args);
            }

            let request = args::search_request_from_args(&search_args);
            let mut result = match remote_backend(&search_args.remote)? {
                Some(backend) => backend.search(request)?,
                None => search::run_search(request)?,
            };

            if let Some(limit) = search_args.limit {
                result.item_ids.truncate(limit);
            }

            match search_args.format {
                OutputFormat::Text => format::print_search_text(&result),
                OutputFormat::Table => format::print_search_table(&result),
                OutputFormat::Json => {
                    serde_json::to_writer(std::io::stdout(), &result)?;
                    println!();
                    Ok(())
                }
            }
        }
        Some(Commands::Keywords(mut keywords_args)) => {
            if let Some(ref config) = cli_config {
                apply_common_config_defaults(
                    config,
                    &mut keywords_args.store,
                    &mut keywords_args.remote,
                );
            }

            let request = args::keywords_request_from_args(&keywords_args);
            let list = match remote_backend(&keywords_args.remote)? {
                Some(backend) => backend.keywords(request)?,
                None => search::list_keywords(request)?,
            };

            match keywords_args.format {
                OutputFormat::Text => format::print_keywords_text(&list),
                OutputFormat::Table => format::print_keywords_table(&list),
                OutputFormat::Json => {
                    serde_json::to_writer(std::io::stdout(), &list)?;
                    println!();
                    Ok(())
                }
            }
        }
        Some(Commands::StoreInfo(mut info_args)) => {
            if let Some(ref config) = cli_config {
                apply_common_config_defaults(config, &mut info_args.store, &mut info_args.remote);
            }

            let config = args::store_config_from_args(&info_args.store);
            let summary = match remote_backend(&info_args.remote)? {
                Some(backend) => backend.store_info(config)?,
                None => store::get_store_info(&config)?,
            };

            match info_args.format {
                OutputFormat::Text | OutputFormat::Table => {
                    format::print_store_summary_text(&summary)
                }
                OutputFormat::Json => {
                    serde_json::to_writer(std::io::stdout(), &summary)?;
                    println!();
                    Ok(())
                }
            }
        }
        Some(Commands::Serve(mut serve_args)) => {
            if let Some(ref config) = cli_config {
                apply_serve_config_defaults(config, &mut serve_args);
            }

            let addr: SocketAddr = serve_args.addr.parse()?;
            println!("Starting zksearch HTTP server on http://{addr}");

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;

            runtime.block_on(server::run(addr))?;
            Ok(())
        }
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn remote_backend(remote: &RemoteArgs) -> Result<Option<HttpSearchBackend>> {
    effective_server_url(remote.server.as_deref(), remote.no_server)
        .map(HttpSearchBackend::new)
        .transpose()
}

fn effective_server_url(server_flag: Option<&str>, no_server: bool) -> Option<String> {
    if no_server {
        None
    } else {
        server_flag.map(|s| s.to_string())
    }
}
