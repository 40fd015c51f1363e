//! Exporter configuration.
//!
//! One [`ExporterConfig`] describes the whole process; each scheduled worker
//! gets its own [`WorkerSettings`]. With a populated settings directory the
//! exporter runs one worker per collection file found there, all sharing the
//! process-wide defaults; otherwise a single worker runs the configured
//! default collection.

use std::path::PathBuf;

use thiserror::Error;

/// Environment prefix for runtime variables passed through to the engine.
/// `POSTMAN_FOO=bar` becomes the collection variable `FOO=bar`.
pub const RUNTIME_VAR_PREFIX: &str = "POSTMAN_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings directory {}: {source}", dir.display())]
    SettingsDir {
        dir: PathBuf,
        source: std::io::Error,
    },
}

/// Process-wide configuration, normally sourced from CLI flags and
/// environment variables in `main`.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub collection_file: PathBuf,
    pub collection_url: Option<String>,
    pub environment_file: Option<PathBuf>,
    pub environment_url: Option<String>,
    pub port: u16,
    pub interval_secs: u64,
    pub iterations: u64,
    pub bail: bool,
    pub request_metrics: bool,
    pub settings_dir: PathBuf,
    pub work_dir: PathBuf,
    pub newman_bin: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            collection_file: PathBuf::from("./collection.json"),
            collection_url: None,
            environment_file: None,
            environment_url: None,
            port: 8080,
            interval_secs: 30,
            iterations: 1,
            bail: false,
            request_metrics: true,
            settings_dir: PathBuf::from("./settings"),
            work_dir: PathBuf::from("."),
            newman_bin: "newman".to_string(),
        }
    }
}

/// Per-worker settings: which collection to run, against which environment,
/// and the run cadence.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSettings {
    pub collection_file: PathBuf,
    pub collection_url: Option<String>,
    pub environment_file: Option<PathBuf>,
    pub environment_url: Option<String>,
    pub interval_secs: u64,
    pub iterations: u64,
    pub bail: bool,
    pub request_metrics: bool,
}

impl WorkerSettings {
    fn defaults_from(config: &ExporterConfig) -> Self {
        Self {
            collection_file: config.collection_file.clone(),
            collection_url: config.collection_url.clone(),
            environment_file: config.environment_file.clone(),
            environment_url: config.environment_url.clone(),
            interval_secs: config.interval_secs,
            iterations: config.iterations,
            bail: config.bail,
            request_metrics: config.request_metrics,
        }
    }
}

/// Decide which collections this process will run.
///
/// A settings directory containing at least one file overrides the default
/// collection entirely: every file is treated as a collection, sorted by
/// path for a stable worker order, and any configured collection URL is
/// dropped so it cannot shadow the directory entries.
pub fn discover_worker_settings(
    config: &ExporterConfig,
) -> Result<Vec<WorkerSettings>, ConfigError> {
    let defaults = WorkerSettings::defaults_from(config);

    if config.settings_dir.is_dir() {
        let entries = std::fs::read_dir(&config.settings_dir).map_err(|source| {
            ConfigError::SettingsDir {
                dir: config.settings_dir.clone(),
                source,
            }
        })?;
        let mut collections = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ConfigError::SettingsDir {
                dir: config.settings_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() {
                collections.push(path);
            }
        }
        collections.sort();

        if !collections.is_empty() {
            return Ok(collections
                .into_iter()
                .map(|collection_file| WorkerSettings {
                    collection_file,
                    collection_url: None,
                    ..defaults.clone()
                })
                .collect());
        }
    }

    Ok(vec![defaults])
}

/// Collect runtime variables for the engine from the process environment:
/// every `POSTMAN_`-prefixed variable, prefix stripped, sorted by name so the
/// engine invocation is deterministic. Entries whose key or value is not
/// valid Unicode (POSIX allows arbitrary bytes) are skipped; `env::vars()`
/// would panic on them mid-iteration.
pub fn runtime_variables(prefix: &str) -> Vec<(String, String)> {
    let mut vars: Vec<(String, String)> = std::env::vars_os()
        .filter_map(|(key, value)| {
            let key = key.into_string().ok()?;
            let stripped = key.strip_prefix(prefix)?;
            let value = value.into_string().ok()?;
            Some((stripped.to_string(), value))
        })
        .collect();
    vars.sort();
    vars
}
