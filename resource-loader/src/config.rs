//! Loader settings read from the environment.

use std::time::Duration;

/// Default API root the HTTP fetcher resolves endpoints against.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/";

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by loaders built from config (CLI, embedding apps).
#[derive(Clone, Debug, PartialEq)]
pub struct LoaderConfig {
    /// API root for [`HttpFetcher`](crate::HttpFetcher).
    pub base_url: String,
    /// TTL for cached payloads. `None` disables the cache.
    pub cache_ttl: Option<Duration>,
    /// Abort the superseded request's task instead of only ignoring its outcome.
    pub abort_superseded: bool,
    /// Share one in-flight request between loaders asking for the same query.
    pub coalesce: bool,
    pub http_timeout: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl: None,
            abort_superseded: false,
            coalesce: false,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl LoaderConfig {
    /// Builds config from environment variables. None is required; unset or unparsable
    /// values fall back to the defaults above. Load `.env` / XDG config first (see the
    /// `config` crate) if desired.
    ///
    /// Reads: `LOADER_BASE_URL`, `LOADER_CACHE_TTL_SECS` (0 disables the cache),
    /// `LOADER_ABORT_SUPERSEDED`, `LOADER_COALESCE`, `LOADER_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("LOADER_BASE_URL").unwrap_or(defaults.base_url),
            cache_ttl: env_parse::<u64>("LOADER_CACHE_TTL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            abort_superseded: env_flag("LOADER_ABORT_SUPERSEDED")
                .unwrap_or(defaults.abort_superseded),
            coalesce: env_flag("LOADER_COALESCE").unwrap_or(defaults.coalesce),
            http_timeout: env_parse::<u64>("LOADER_HTTP_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
