use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::SyncError;

/// Resolved configuration for one run.
///
/// Built once in `main` from an optional TOML file plus `LOGSYNC_*`
/// environment overrides, then passed by reference.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// SQLite connection string, e.g. `sqlite://data/logs.db`. Required.
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_op_timeout_secs")]
    pub op_timeout_secs: u64,
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            database: default_database(),
            collection: default_collection(),
            connect_timeout_secs: default_connect_timeout_secs(),
            op_timeout_secs: default_op_timeout_secs(),
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

fn default_database() -> String {
    "logs_db".to_string()
}
fn default_collection() -> String {
    "logs".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_op_timeout_secs() -> u64 {
    30
}
fn default_run_timeout_secs() -> u64 {
    300
}

impl StoreConfig {
    /// `<database>.<collection>`, the key documents are filed under.
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_secs(self.op_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_source")]
    pub source: PathBuf,
    #[serde(default = "default_export_csv")]
    pub export_csv: PathBuf,
    #[serde(default = "default_aggregate_csv")]
    pub aggregate_csv: PathBuf,
    #[serde(default = "default_report_csv")]
    pub report_csv: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            export_csv: default_export_csv(),
            aggregate_csv: default_aggregate_csv(),
            report_csv: default_report_csv(),
        }
    }
}

fn default_source() -> PathBuf {
    PathBuf::from("logs.json")
}
fn default_export_csv() -> PathBuf {
    PathBuf::from("logs.csv")
}
fn default_aggregate_csv() -> PathBuf {
    PathBuf::from("stats_actions.csv")
}
fn default_report_csv() -> PathBuf {
    PathBuf::from("sync_report.csv")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default = "default_group_by")]
    pub group_by: String,
    #[serde(default)]
    pub clear_policy: ClearPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            id_field: default_id_field(),
            group_by: default_group_by(),
            clear_policy: ClearPolicy::default(),
        }
    }
}

fn default_id_field() -> String {
    "_id".to_string()
}
fn default_group_by() -> String {
    "action".to_string()
}

/// When the source file is truncated to `[]` after a sync.
///
/// Never applies after a load failure: malformed input is left in place.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClearPolicy {
    /// Keep the source file as is.
    Never,
    /// Clear only when every record was written or already present.
    #[default]
    OnFullSuccess,
    /// Clear once the file loaded, even if some records failed.
    AfterLoad,
}

impl ClearPolicy {
    pub fn should_clear(&self, failed: usize) -> bool {
        match self {
            ClearPolicy::Never => false,
            ClearPolicy::OnFullSuccess => failed == 0,
            ClearPolicy::AfterLoad => true,
        }
    }
}

/// Load configuration from `path` (if given, it must exist) or from
/// `./config/logsync.toml` when present, then apply environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<Config, SyncError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// [`load_config`] with an explicit environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, env: F) -> Result<Config, SyncError>
where
    F: Fn(&str) -> Option<String>,
{
    let default_path = Path::new("./config/logsync.toml");
    let file = match path {
        Some(p) => Some(p),
        None if default_path.exists() => Some(default_path),
        None => None,
    };

    let mut config = match file {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|e| {
                SyncError::Configuration(format!(
                    "failed to read config file {}: {}",
                    p.display(),
                    e
                ))
            })?;
            toml::from_str(&content).map_err(|e| {
                SyncError::Configuration(format!(
                    "failed to parse config file {}: {}",
                    p.display(),
                    e
                ))
            })?
        }
        None => Config::default(),
    };

    apply_env(&mut config, &env);
    validate(&config)?;
    Ok(config)
}

fn apply_env<F>(config: &mut Config, env: &F)
where
    F: Fn(&str) -> Option<String>,
{
    let set = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = set("LOGSYNC_DATABASE_URL") {
        config.store.url = url;
    }
    if let Some(db) = set("LOGSYNC_DATABASE") {
        config.store.database = db;
    }
    if let Some(coll) = set("LOGSYNC_COLLECTION") {
        config.store.collection = coll;
    }
    if let Some(source) = set("LOGSYNC_SOURCE") {
        config.paths.source = PathBuf::from(source);
    }
    if let Some(keep) = set("LOGSYNC_KEEP_SOURCE") {
        if is_truthy(&keep) {
            config.sync.clear_policy = ClearPolicy::Never;
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn validate(config: &Config) -> Result<(), SyncError> {
    let bail = |msg: String| Err(SyncError::Configuration(msg));

    if config.store.url.trim().is_empty() {
        return bail(
            "store connection string is not set (set LOGSYNC_DATABASE_URL or store.url)".into(),
        );
    }
    if !config.store.url.starts_with("sqlite:") {
        return bail(format!(
            "unsupported store url '{}': expected a sqlite: connection string",
            config.store.url
        ));
    }
    if config.store.database.is_empty() || config.store.collection.is_empty() {
        return bail("store.database and store.collection must not be empty".into());
    }
    if config.store.connect_timeout_secs == 0
        || config.store.op_timeout_secs == 0
        || config.store.run_timeout_secs == 0
    {
        return bail("store timeouts must be > 0".into());
    }
    if config.sync.id_field.is_empty() {
        return bail("sync.id_field must not be empty".into());
    }
    if config.sync.group_by.is_empty() || config.sync.group_by.contains('"') {
        return bail("sync.group_by must be a non-empty field name without quotes".into());
    }
    Ok(())
}
