//! Builds one loader per endpoint over a shared HTTP fetcher and waits for them to settle.

use std::sync::{Arc, Mutex, PoisonError};

use resource_loader::{
    Cache, CoalescingFetcher, Fetcher, HttpFetcher, InMemoryCache, LoadState, Loader,
    LoaderConfig, Query, Selector, Snapshot,
};
use serde_json::Value;

use crate::output::{limit_value, project_field, Output};
use crate::{Args, CliError};

/// How the endpoints ended up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub loaded: usize,
    pub failed: usize,
}

/// Loads every endpoint of `args` concurrently, printing transitions as they happen.
/// Per-endpoint failures are counted in the summary; `Err` is only for setup failures.
pub async fn run(args: &Args, config: &LoaderConfig) -> Result<RunSummary, CliError> {
    let mut config = config.clone();
    if let Some(url) = &args.base_url {
        config.base_url = url.clone();
    }

    let http: HttpFetcher<Value> = HttpFetcher::from_config(&config)?;
    tracing::info!(base_url = %http.base_url(), coalesce = config.coalesce, "starting");
    let fetcher: Arc<dyn Fetcher<Query, Value>> = if config.coalesce {
        Arc::new(CoalescingFetcher::new(http))
    } else {
        Arc::new(http)
    };
    let cache: Option<Arc<dyn Cache<Query, Value>>> = config
        .cache_ttl
        .map(|_| Arc::new(InMemoryCache::new()) as Arc<dyn Cache<Query, Value>>);
    let output = Arc::new(Mutex::new(Output::new(
        args.json,
        args.pretty,
        args.file.clone(),
    )));

    let loaders: Vec<(Query, Loader<Query, Value>)> = args
        .queries()
        .into_iter()
        .map(|query| {
            let mut builder = Loader::builder(Arc::clone(&fetcher)).name(query.to_string());
            if let Some(cache) = &cache {
                builder = builder.cache(Arc::clone(cache));
            }
            let loader = builder.config(&config).build();
            attach_output(&loader, args, Arc::clone(&output));
            (query, loader)
        })
        .collect();

    for (query, loader) in &loaders {
        loader.initialize(query.clone());
    }
    let outcomes = futures::future::join_all(
        loaders
            .iter()
            .map(|(query, loader)| settle_with_retries(loader, query, args.retries)),
    )
    .await;

    let loaded = outcomes.iter().filter(|ok| **ok).count();
    Ok(RunSummary {
        loaded,
        failed: outcomes.len() - loaded,
    })
}

/// Prints every transition of `loader`, with list payloads shaped by `--field` / `--limit`.
fn attach_output(loader: &Loader<Query, Value>, args: &Args, output: Arc<Mutex<Output>>) {
    let field = args.field.clone();
    let limit = args.limit;
    let mut shape = Selector::new(move |data: &Value| {
        let data = match &field {
            Some(field) => project_field(data, field),
            None => data.clone(),
        };
        match limit {
            Some(n) => limit_value(data, n),
            None => data,
        }
    });
    let loader_id = loader.name().to_string();
    loader.on_snapshot(move |snapshot: &Snapshot<Query, Value>| {
        let shaped = Snapshot {
            generation: snapshot.generation,
            query: snapshot.query.clone(),
            state: match &snapshot.state {
                LoadState::Loaded(data) => LoadState::Loaded(shape.select(data)),
                other => other.clone(),
            },
        };
        let mut out = output.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = out.emit(&loader_id, &shaped) {
            tracing::warn!(loader = %loader_id, error = %e, "output failed");
        }
    });
}

/// True once the loader is Loaded. A failure is retried by re-initializing the same query.
async fn settle_with_retries(loader: &Loader<Query, Value>, query: &Query, retries: u32) -> bool {
    let mut attempt = 0;
    loop {
        match loader.settled().await {
            Some(snapshot) if snapshot.state.is_loaded() => return true,
            Some(snapshot) if attempt < retries => {
                attempt += 1;
                tracing::info!(
                    loader = %loader.name(),
                    attempt,
                    error = ?snapshot.state.error(),
                    "retrying"
                );
                loader.initialize(query.clone());
            }
            _ => return false,
        }
    }
}
