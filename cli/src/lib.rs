//! Library side of the `rload` binary: argument types, output rendering and the run loop.
//!
//! Kept out of `main.rs` so the rendering and query building can be unit tested.

mod output;
mod run;

use std::path::PathBuf;

use clap::Parser;
use resource_loader::{FetchError, Query};
use thiserror::Error;

pub use output::{limit_value, project_field, render_text, Output};
pub use run::{run, RunSummary};

#[derive(Parser, Debug, Clone)]
#[command(name = "rload")]
#[command(about = "Load API endpoints and print each {data, loading, error} transition")]
pub struct Args {
    /// Endpoints to load, relative to the base URL (e.g. `dashboard`, `collection`)
    #[arg(required = true, value_name = "ENDPOINT")]
    pub endpoints: Vec<String>,

    /// API root (default: LOADER_BASE_URL or http://localhost:3000/api/)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Query parameter sent with every endpoint; repeatable
    #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Show at most N items of a list payload
    #[arg(short, long, value_name = "N")]
    pub limit: Option<usize>,

    /// Show only this field of each list item (e.g. `name`)
    #[arg(short, long, value_name = "NAME")]
    pub field: Option<String>,

    /// Retry a failed endpoint up to N times
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub retries: u32,

    /// Print load events as JSON lines instead of text
    #[arg(long)]
    pub json: bool,

    /// When using --json, pretty-print (multi-line)
    #[arg(long)]
    pub pretty: bool,

    /// When using --json, append output to this file instead of stdout
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

impl Args {
    /// One query per endpoint, all carrying the `--param` pairs.
    pub fn queries(&self) -> Vec<Query> {
        self.endpoints
            .iter()
            .map(|endpoint| {
                Query::new(endpoint.as_str())
                    .with_params(self.params.iter().map(|(k, v)| (k.clone(), v.clone())))
            })
            .collect()
    }
}

/// Parses `KEY=VALUE`; the value may itself contain `=`.
pub fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {:?}", s)),
    }
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("http client: {0}")]
    Client(#[from] FetchError),
    #[error("write output: {0}")]
    Output(#[from] std::io::Error),
    #[error("encode output: {0}")]
    Encode(#[from] serde_json::Error),
}
