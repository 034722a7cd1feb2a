use crate::error::{Error, Result};
use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ARCHIVE_ROOT: &str = "/mnt/nfs/photos/MasterImages";
pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_SLEEP_INTERVAL_SECS: u64 = 90;
pub const DEFAULT_METRICS_PORT: u16 = 9102;
/// Queue slots per worker; bounds memory and blocks the scanner when full.
pub const QUEUE_DEPTH_PER_WORKER: usize = 40;

const ENV_PREFIX: &str = "PHOTOIMPORTD";

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: DEFAULT_METRICS_PORT,
        }
    }
}

fn default_metrics_port() -> u16 {
    DEFAULT_METRICS_PORT
}

/// Immutable daemon configuration, built once at startup and shared by
/// reference with every component.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub source_root: PathBuf,
    pub archive_root: PathBuf,
    pub db_path: PathBuf,
    pub workers: usize,
    pub sleep_interval_secs: u64,
    /// Log every decision but write nothing to the archive or the index.
    #[serde(default)]
    pub dry_run: bool,
    /// Walk both trees completely once before the periodic cycle starts.
    #[serde(default)]
    pub rescan: bool,
    /// Walk the whole source tree every cycle instead of the current month.
    #[serde(default)]
    pub walk_all_source: bool,
    /// Terminate the process on the first file read failure.
    #[serde(default)]
    pub fail_fast: bool,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Values from the command line; `None` leaves lower layers untouched.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub source_root: Option<String>,
    pub archive_root: Option<String>,
    pub db_path: Option<String>,
    pub workers: Option<usize>,
    pub sleep_interval_secs: Option<u64>,
    pub dry_run: Option<bool>,
    pub rescan: Option<bool>,
    pub walk_all_source: Option<bool>,
    pub fail_fast: Option<bool>,
    pub log_level: Option<String>,
    pub log_json: Option<bool>,
    pub metrics_enabled: Option<bool>,
    pub metrics_port: Option<u16>,
}

impl AppConfig {
    /// Defaults for everything except the three locations.
    pub fn new(
        source_root: impl Into<PathBuf>,
        archive_root: impl Into<PathBuf>,
        db_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            archive_root: archive_root.into(),
            db_path: db_path.into(),
            workers: DEFAULT_WORKERS,
            sleep_interval_secs: DEFAULT_SLEEP_INTERVAL_SECS,
            dry_run: false,
            rescan: false,
            walk_all_source: false,
            fail_fast: false,
            ignore_patterns: Vec::new(),
            log_level: "info".to_string(),
            log_json: false,
            metrics: MetricsConfig::default(),
        }
    }

    pub fn sleep_interval(&self) -> Duration {
        Duration::from_secs(self.sleep_interval_secs)
    }

    pub fn queue_capacity(&self) -> usize {
        self.workers * QUEUE_DEPTH_PER_WORKER
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::InvalidConfig("workers must be at least 1".into()));
        }
        if self.sleep_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "sleep_interval_secs must be at least 1".into(),
            ));
        }
        for (name, path) in [
            ("source_root", &self.source_root),
            ("archive_root", &self.archive_root),
            ("db_path", &self.db_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(Error::InvalidConfig(format!("{} must not be empty", name)));
            }
        }
        if overlapping(&self.source_root, &self.archive_root) {
            return Err(Error::InvalidConfig(format!(
                "source_root {} and archive_root {} must not contain each other",
                self.source_root.display(),
                self.archive_root.display()
            )));
        }
        Ok(())
    }
}

/// True when either directory is the other or one of its subdirectories.
pub fn overlapping(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

fn home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn to_i64<T: TryInto<i64>>(value: Option<T>) -> Option<i64> {
    value.and_then(|v| v.try_into().ok())
}

/// Layer defaults, `Config.toml` (or `overrides.config_file`), `PHOTOIMPORTD_*`
/// environment variables and command-line overrides, in that order.
pub fn load_configuration(overrides: &Overrides) -> Result<AppConfig> {
    let home = home_dir();
    let default_source = home.join("Pictures/Photos Library.photoslibrary/Masters");
    let default_db = home.join(".photoimportd.db");

    let file_source = match &overrides.config_file {
        Some(path) => ConfigFile::from(path.as_path()).required(true),
        None => ConfigFile::with_name("Config").required(false),
    };

    let builder = Config::builder()
        .set_default("source_root", default_source.to_string_lossy().into_owned())?
        .set_default("archive_root", DEFAULT_ARCHIVE_ROOT)?
        .set_default("db_path", default_db.to_string_lossy().into_owned())?
        .set_default("workers", DEFAULT_WORKERS as i64)?
        .set_default("sleep_interval_secs", DEFAULT_SLEEP_INTERVAL_SECS as i64)?
        .set_default("log_level", "info")?
        .set_default("metrics.port", i64::from(DEFAULT_METRICS_PORT))?
        .add_source(file_source)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_patterns"),
        )
        .set_override_option("source_root", overrides.source_root.clone())?
        .set_override_option("archive_root", overrides.archive_root.clone())?
        .set_override_option("db_path", overrides.db_path.clone())?
        .set_override_option("workers", to_i64(overrides.workers))?
        .set_override_option("sleep_interval_secs", to_i64(overrides.sleep_interval_secs))?
        .set_override_option("dry_run", overrides.dry_run)?
        .set_override_option("rescan", overrides.rescan)?
        .set_override_option("walk_all_source", overrides.walk_all_source)?
        .set_override_option("fail_fast", overrides.fail_fast)?
        .set_override_option("log_level", overrides.log_level.clone())?
        .set_override_option("log_json", overrides.log_json)?
        .set_override_option("metrics.enabled", overrides.metrics_enabled)?
        .set_override_option("metrics.port", overrides.metrics_port.map(i64::from))?
        .build()?;

    let config = builder.try_deserialize::<AppConfig>()?;
    config.validate()?;
    Ok(config)
}
