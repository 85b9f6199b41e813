//! `rload`: load API endpoints and print each `{data, loading, error}` transition.
//!
//! Settings come from `LOADER_*` variables, a project `.env`, or
//! `~/.config/rload/config.toml` (existing env wins). Exits non-zero when any endpoint
//! ends up failed.

use std::process::ExitCode;

use clap::Parser;
use cli::Args;
use resource_loader::LoaderConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let applied = config::load_and_apply("rload", None);
    let _log_guard = match config::init_tracing("warn") {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("rload: logging: {}", e);
            None
        }
    };

    match applied {
        Ok(keys) => tracing::debug!(?keys, "applied config"),
        Err(e) => eprintln!("rload: config: {}", e),
    }

    let args = Args::parse();
    let loader_config = LoaderConfig::from_env();

    match cli::run(&args, &loader_config).await {
        Ok(summary) if summary.failed == 0 => ExitCode::SUCCESS,
        Ok(summary) => {
            tracing::info!(loaded = summary.loaded, failed = summary.failed, "done");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("rload: {}", e);
            ExitCode::FAILURE
        }
    }
}
