//! Load configuration from XDG `config.toml` and project `.env`, then apply to the process
//! environment with priority: **existing env > .env > XDG**.
//!
//! Loaders read their settings from `LOADER_*` variables, so every source ends up as
//! environment variables. The XDG file may spell them either way:
//!
//! ```toml
//! [env]
//! RUST_LOG = "resource_loader=debug"
//!
//! [loader]
//! base_url = "http://localhost:3000/api/"   # -> LOADER_BASE_URL
//! cache_ttl_secs = 60                       # -> LOADER_CACHE_TTL_SECS
//! ```

mod dotenv;
#[cfg(feature = "tracing-init")]
mod logging;
mod xdg_toml;

use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[cfg(feature = "tracing-init")]
pub use logging::{init_tracing, InitError};

/// Tests that mutate `XDG_CONFIG_HOME` hold this so they run one at a time.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("xdg [loader].{key}: expected a string, number or boolean")]
    XdgValue { key: String },
    #[error("read .env: {0}")]
    DotenvRead(std::io::Error),
}

/// Loads config from XDG `config.toml` and optional project `.env`, then sets environment
/// variables only for keys that are **not** already set.
///
/// When a key is missing in the process environment:
/// 1. Value from project `.env` (current directory or `override_dir` if given)
/// 2. Value from `$XDG_CONFIG_HOME/<app_name>/config.toml` (`[env]`, then `[loader]`)
///
/// Returns the keys that were set.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<Vec<String>, LoadError> {
    let xdg_map = xdg_toml::load_env_map(app_name)?;
    let dotenv_map = dotenv::load_env_map(override_dir).map_err(LoadError::DotenvRead)?;

    let mut keys: HashSet<&String> = xdg_map.keys().collect();
    keys.extend(dotenv_map.keys());

    let mut applied = Vec::new();
    for key in keys {
        if std::env::var_os(key).is_some() {
            continue;
        }
        if let Some(v) = dotenv_map.get(key).or_else(|| xdg_map.get(key)) {
            std::env::set_var(key, v);
            applied.push(key.clone());
        }
    }
    applied.sort();
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ENV_LOCK;
    use std::env;

    fn restore_var(key: &str, prev: Option<String>) {
        match prev {
            Some(v) => env::set_var(key, v),
            None => env::remove_var(key),
        }
    }

    fn write_xdg(app: &str, body: &str) -> tempfile::TempDir {
        let xdg_dir = tempfile::tempdir().unwrap();
        let app_dir = xdg_dir.path().join(app);
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join("config.toml"), body).unwrap();
        xdg_dir
    }

    #[test]
    fn existing_env_wins() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "CONFIG_TEST_EXISTING=from_dotenv\n").unwrap();
        env::set_var("CONFIG_TEST_EXISTING", "from_env");

        let applied = load_and_apply("config-crate-nonexistent-app-xyz", Some(dir.path())).unwrap();
        assert_eq!(env::var("CONFIG_TEST_EXISTING").as_deref(), Ok("from_env"));
        assert!(applied.is_empty());
        env::remove_var("CONFIG_TEST_EXISTING");
    }

    #[test]
    fn no_config_is_ok() {
        let _guard = ENV_LOCK.lock().unwrap();
        let empty = tempfile::tempdir().unwrap();
        let r = load_and_apply("config-crate-nonexistent-app-xyz", Some(empty.path()));
        assert!(r.unwrap().is_empty());
    }

    #[test]
    fn dotenv_overrides_xdg() {
        let _guard = ENV_LOCK.lock().unwrap();
        let xdg_dir = write_xdg("rload", "[loader]\nbase_url = \"http://xdg/api/\"\n");
        let dotenv_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dotenv_dir.path().join(".env"),
            "LOADER_BASE_URL=http://dotenv/api/\n",
        )
        .unwrap();

        let prev_xdg = env::var("XDG_CONFIG_HOME").ok();
        env::set_var("XDG_CONFIG_HOME", xdg_dir.path());
        env::remove_var("LOADER_BASE_URL");

        let applied = load_and_apply("rload", Some(dotenv_dir.path())).unwrap();
        let val = env::var("LOADER_BASE_URL").unwrap();
        env::remove_var("LOADER_BASE_URL");
        restore_var("XDG_CONFIG_HOME", prev_xdg);

        assert_eq!(val, "http://dotenv/api/");
        assert_eq!(applied, vec!["LOADER_BASE_URL".to_string()]);
    }

    #[test]
    fn xdg_applied_when_no_dotenv() {
        let _guard = ENV_LOCK.lock().unwrap();
        let xdg_dir = write_xdg(
            "rload",
            "[env]\nCONFIG_TEST_XDG_ONLY = \"from_xdg\"\n\n[loader]\ncache_ttl_secs = 60\n",
        );
        let empty_dir = tempfile::tempdir().unwrap();

        let prev_xdg = env::var("XDG_CONFIG_HOME").ok();
        env::set_var("XDG_CONFIG_HOME", xdg_dir.path());
        env::remove_var("CONFIG_TEST_XDG_ONLY");
        env::remove_var("LOADER_CACHE_TTL_SECS");

        let _ = load_and_apply("rload", Some(empty_dir.path()));
        let plain = env::var("CONFIG_TEST_XDG_ONLY").unwrap();
        let ttl = env::var("LOADER_CACHE_TTL_SECS").unwrap();
        env::remove_var("CONFIG_TEST_XDG_ONLY");
        env::remove_var("LOADER_CACHE_TTL_SECS");
        restore_var("XDG_CONFIG_HOME", prev_xdg);

        assert_eq!(plain, "from_xdg");
        assert_eq!(ttl, "60");
    }

    #[test]
    fn invalid_xdg_toml_fails_with_xdg_parse_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        let xdg_dir = write_xdg("rload", "invalid [[[\n");

        let prev_xdg = env::var("XDG_CONFIG_HOME").ok();
        env::set_var("XDG_CONFIG_HOME", xdg_dir.path());
        let result = load_and_apply("rload", None);
        restore_var("XDG_CONFIG_HOME", prev_xdg);

        assert!(matches!(result, Err(LoadError::XdgParse(_))));
    }
}
