//! # Command-line surface
//!
//! Every command loads the stored drafts, runs one edit-session operation
//! and writes the drafts back, so edits accumulate across invocations the
//! same way they do across page visits in an interactive editor.
//!
//! Settings come from flags or the environment:
//!
//! - `CURATOR_API_URL` - backend base URL
//! - `CURATOR_ACCESS_TOKEN` - bearer token issued by the login flow
//! - `CURATOR_DATA_DIR` - where drafts are kept (default `.curator`)

pub mod commands;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::gateway::GatewayConfig;
use crate::session::DEFAULT_PAGE_SIZE;
use crate::storage::DEFAULT_DATA_DIR;

/// Edit pinned products ("constants") of commerce collections.
#[derive(Debug, Parser)]
#[command(name = "curator")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Backend base URL.
    #[arg(long, env = "CURATOR_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Bearer token for the backend.
    #[arg(long, env = "CURATOR_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Directory holding the draft database.
    #[arg(long, env = "CURATOR_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Request timeout in seconds (0 disables it).
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Page size for available-product queries.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn config(&self) -> Config {
        Config {
            api_url: self.api_url.clone(),
            access_token: self.access_token.clone(),
            data_dir: self.data_dir.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            page_size: self.page_size,
            format: self.format,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List collections on the backend.
    Collections {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        page_size: u32,
    },
    /// Show the edit state of one collection.
    Show { collection_id: String },
    /// Summarize every collection with drafts.
    Status,
    /// Load and print the filter catalog of a collection.
    Filters { collection_id: String },
    /// Query products that can be pinned, using the applied filters.
    Products {
        collection_id: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Apply a filter value from the collection's catalog.
    FilterAdd {
        collection_id: String,
        filter_id: String,
        value: String,
    },
    /// Remove one applied filter value.
    FilterRemove {
        collection_id: String,
        filter_id: String,
        value: String,
    },
    /// Remove every applied filter.
    FilterClear { collection_id: String },
    /// Pin a product to the collection.
    Pin {
        collection_id: String,
        product_code: String,
        #[arg(long)]
        color: Option<String>,
    },
    /// Unpin a product.
    Unpin {
        collection_id: String,
        product_code: String,
        #[arg(long)]
        color: Option<String>,
    },
    /// Move a pinned product between 1-based positions.
    Move {
        collection_id: String,
        from: usize,
        to: usize,
    },
    /// Persist the pinned order to the backend.
    Save { collection_id: String },
    /// Drop unsaved edits of a collection.
    Discard { collection_id: String },
    /// Forget a collection's drafts entirely.
    Forget { collection_id: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub access_token: Option<String>,
    pub data_dir: PathBuf,
    pub timeout: Duration,
    pub page_size: u32,
    pub format: OutputFormat,
}

impl Config {
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.api_url.clone(),
            access_token: self.access_token.clone(),
            timeout: self.timeout,
        }
    }
}
