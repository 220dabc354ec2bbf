//! Command line surface of gitcms.
//!
//! Every subcommand loads a YAML config, talks to GitHub through
//! [`gitcms_core::GitCms`] and prints its result as pretty JSON on stdout.
//! Business logic stays in `gitcms-core`.

use crate::load_config::{load_config, CliConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gitcms_core::github::GitHubClient;
use gitcms_core::{GitCms, ListOptions, SortField};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// CLI for gitcms: list markdown content straight from a GitHub repository.
#[derive(Parser)]
#[clap(
    name = "gitcms",
    version,
    about = "List and fetch markdown documents from a GitHub repository"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every matching document under a folder, newest first by default
    List {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Folder to list instead of the configured src_path
        #[clap(long)]
        path: Option<String>,
        /// Descend into sub-folders
        #[clap(long)]
        recursive: bool,
        /// File suffix to keep; repeatable
        #[clap(long = "ext", default_value = ".md")]
        extensions: Vec<String>,
        /// Leave document bodies out of the output
        #[clap(long)]
        no_content: bool,
        #[clap(long)]
        ascending: bool,
        #[clap(long, value_enum, default_value_t = SortBy::Created)]
        sort_by: SortBy,
    },
    /// Fetch one document by its repository path
    Get {
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        path: String,
    },
    /// Print the decoded text of a blob
    Raw {
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortBy {
    Created,
    Updated,
}

impl From<SortBy> for SortField {
    fn from(value: SortBy) -> Self {
        match value {
            SortBy::Created => SortField::Created,
            SortBy::Updated => SortField::Updated,
        }
    }
}

fn connect(config: &Path) -> Result<GitCms<GitHubClient>> {
    let CliConfig { cms, schema } = load_config(config)?;
    GitCms::from_config(cms, schema.as_ref()).context("Failed to set up GitHub client")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}

/// Async entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::List {
            config,
            path,
            recursive,
            extensions,
            no_content,
            ascending,
            sort_by,
        } => {
            let cms = connect(&config)?;
            tracing::info!(command = "list", "Listing items");
            let options = ListOptions {
                extensions,
                path,
                recursive,
                include_content: !no_content,
                ascending,
                sort_by: sort_by.into(),
            };
            let records = cms.list_items(options).await.map_err(|e| {
                tracing::error!(command = "list", error = %e, "Listing failed");
                anyhow::Error::new(e)
            })?;
            tracing::info!(command = "list", records = records.len(), "Listing complete");
            print_json(&records)
        }
        Commands::Get { config, path } => {
            let cms = connect(&config)?;
            let record = cms
                .get_item_by_path(&path, None)
                .await
                .with_context(|| format!("Failed to fetch {path}"))?;
            print_json(&record)
        }
        Commands::Raw { config, id } => {
            let cms = connect(&config)?;
            let text = cms
                .get_raw_content(&id)
                .await
                .with_context(|| format!("Failed to fetch blob {id}"))?;
            print!("{text}");
            Ok(())
        }
    }
}
