use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod places;
mod query;
mod search;
mod semantic;
#[cfg(test)]
mod tests;
mod web;

use config::Config;
use query::{enhance_query_with_keywords, KeywordIndex};
use search::SearchOrchestrator;
use semantic::FastembedLoader;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vibe=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

fn load_config() -> anyhow::Result<Config> {
    let base_path = Config::default_base_path()?;
    Config::load_with(&base_path)
        .with_context(|| format!("failed to load config from {}", base_path.display()))
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = cli::Args::parse();

    match args.command {
        cli::Command::Keywords { text } => {
            let keywords = KeywordIndex::global().find_keywords(&text);
            println!("{}", serde_json::to_string_pretty(&keywords)?);
        }

        cli::Command::Enhance { query, notes } => {
            println!(
                "{}",
                enhance_query_with_keywords(&query, notes.as_deref().unwrap_or_default())
            );
        }

        cli::Command::Search {
            query,
            notes,
            notes_file,
            all,
        } => {
            let notes = match notes_file {
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?,
                ),
                None => notes,
            };

            let config = load_config()?;
            let places = places::from_config(&config.places)?;
            let loader = Arc::new(FastembedLoader::new(
                &config.embedding.model,
                config.base_path().to_path_buf(),
                Some(config.embedding.download_timeout()),
            ));
            let orchestrator = SearchOrchestrator::new(loader, places, &config);

            let outcome = runtime()?.block_on(async {
                match notes.as_deref() {
                    Some(notes) => orchestrator.search_with_context(&query, notes).await,
                    None => orchestrator.search_locations(&query).await,
                }
            })?;

            log::info!("contextual query: {}", outcome.contextual_query);
            for session in orchestrator.sessions() {
                log::debug!("session: {}", serde_json::to_string(&session)?);
            }

            if all {
                println!("{}", serde_json::to_string_pretty(&outcome.results)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&outcome.best())?);
            }
        }

        cli::Command::Serve { addr } => {
            let config = load_config()?;
            runtime()?.block_on(web::serve(&config, &addr))?;
        }
    }

    Ok(())
}
