use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::warn;

use crate::view::DEFAULT_GREETING;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub backend_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Option<Duration>,
    pub greeting: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            request_timeout: None,
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

/// `config.toml` contents. Every key is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    backend_url: Option<String>,
    poll_interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    greeting: Option<String>,
}

/// Values given on the command line; they win over everything else.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub backend_url: Option<String>,
    pub poll_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
}

pub fn load(overrides: &Overrides) -> Result<Config> {
    let env = |key: &str| std::env::var(key).ok();
    let path = overrides
        .config_path
        .clone()
        .or_else(|| non_empty_env(&env, "CELLSYNC_CONFIG_PATH").map(PathBuf::from))
        .unwrap_or_else(default_config_path);
    let file = load_file(&path)?;
    Ok(resolve(overrides, &env, file))
}

fn load_file(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("failed to parse config {}", path.display()))
}

fn resolve(overrides: &Overrides, env: &dyn Fn(&str) -> Option<String>, file: FileConfig) -> Config {
    let defaults = Config::default();

    let backend_url = overrides
        .backend_url
        .clone()
        .or_else(|| non_empty_env(env, "CELLSYNC_BACKEND_URL"))
        .or_else(|| non_empty_env(env, "BACKEND_URL"))
        .or(file.backend_url)
        .unwrap_or(defaults.backend_url);

    let poll_ms = overrides
        .poll_ms
        .or_else(|| numeric_env(env, "CELLSYNC_POLL_MS"))
        .or(file.poll_interval_ms);
    let poll_interval = match poll_ms {
        Some(0) => {
            warn!(event = "config_invalid", key = "poll_interval_ms", value = 0);
            defaults.poll_interval
        }
        Some(ms) => Duration::from_millis(ms),
        None => defaults.poll_interval,
    };

    let request_timeout = overrides
        .request_timeout_ms
        .or_else(|| numeric_env(env, "CELLSYNC_REQUEST_TIMEOUT_MS"))
        .or(file.request_timeout_ms)
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis);

    let greeting = file.greeting.unwrap_or(defaults.greeting);

    Config {
        backend_url,
        poll_interval,
        request_timeout,
        greeting,
    }
}

fn non_empty_env(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn numeric_env(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = non_empty_env(env, key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(event = "config_invalid", key, value = %raw);
            None
        }
    }
}

fn default_config_path() -> PathBuf {
    config_dir().join("cellsync/config.toml")
}

fn config_dir() -> PathBuf {
    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    std::env::var("HOME")
        .map(|home| PathBuf::from(home).join(".config"))
        .unwrap_or_else(|_| PathBuf::from("."))
}
