//! Reads `$XDG_CONFIG_HOME/<app>/config.toml` into environment key-value pairs.
//!
//! `[env]` entries are taken as-is. `[loader]` entries become `LOADER_<KEY>` variables
//! (`cache_ttl_secs = 60` sets `LOADER_CACHE_TTL_SECS=60`); `[env]` wins on conflict.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::LoadError;

/// `$XDG_CONFIG_HOME` when set, else the platform config dir.
fn xdg_config_path(app_name: &str) -> Option<PathBuf> {
    let config_dir = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)?;
    let path = config_dir.join(app_name).join("config.toml");
    path.is_file().then_some(path)
}

#[derive(serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    loader: HashMap<String, toml::Value>,
}

fn loader_var(key: &str, value: &toml::Value) -> Result<(String, String), LoadError> {
    let value = match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        _ => {
            return Err(LoadError::XdgValue {
                key: key.to_string(),
            })
        }
    };
    Ok((format!("LOADER_{}", key.to_ascii_uppercase()), value))
}

/// Missing file or empty sections return an empty map.
pub fn load_env_map(app_name: &str) -> Result<HashMap<String, String>, LoadError> {
    let Some(path) = xdg_config_path(app_name) else {
        return Ok(HashMap::new());
    };
    let content = std::fs::read_to_string(&path).map_err(LoadError::XdgRead)?;
    let config: ConfigFile = toml::from_str(&content)?;

    let mut out = HashMap::with_capacity(config.env.len() + config.loader.len());
    for (key, value) in &config.loader {
        let (var, value) = loader_var(key, value)?;
        out.insert(var, value);
    }
    out.extend(config.env);
    Ok(out)
}
