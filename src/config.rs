use log::{info, LevelFilter};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{day::DEFAULT_START_OF_DAY_HOUR, error::ConfigError, scheduler::Schedule, service::TrackingOptions};

const APP_DIR: &str = "focus_time_tracker";
const DB_FILE: &str = "focus_time.sqlite3";
const LOG_FILE: &str = "application.log";

/// On-disk form of the settings. Every field is optional in the file;
/// missing ones take the built-in default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    pub log_level: i64,
    pub window_check_interval_seconds: i64,
    pub save_interval_seconds: i64,
    pub record_window_titles: bool,
    pub start_of_day_hour: i64,
    pub shutdown_timeout_seconds: i64,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            database_url: None,
            log_level: -4,
            window_check_interval_seconds: 5,
            save_interval_seconds: 300,
            record_window_titles: false,
            start_of_day_hour: i64::from(DEFAULT_START_OF_DAY_HOUR),
            shutdown_timeout_seconds: 10,
        }
    }
}

/// Validated settings the process runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_level: LevelFilter,
    pub window_check_interval: Duration,
    pub save_interval: Duration,
    pub record_window_titles: bool,
    pub start_of_day_hour: u32,
    pub shutdown_timeout: Duration,
}

impl Config {
    /// Defaults, then the JSON file named by `CONFIG_PATH`, then environment
    /// variables (including a `.env` file loaded by the caller).
    pub fn load() -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();
        let path = lookup("CONFIG_PATH").map(PathBuf::from);
        Self::load_from(path.as_deref(), lookup)
    }

    pub fn load_from(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut file = match path {
            Some(path) => read_or_create(path)?,
            None => ConfigFile::default(),
        };
        apply_env(&mut file, &lookup)?;
        Self::validate(file)
    }

    pub fn validate(file: ConfigFile) -> Result<Self, ConfigError> {
        let db_path = match file.database_url {
            Some(url) => expand_app_data(&url),
            None => default_database_path()?,
        };
        let start_of_day_hour = u32::try_from(file.start_of_day_hour)
            .ok()
            .filter(|hour| *hour <= 23)
            .ok_or(ConfigError::StartOfDayHour(file.start_of_day_hour))?;

        Ok(Self {
            db_path,
            log_level: level_from_number(file.log_level)?,
            window_check_interval: positive_secs("windowCheckIntervalSeconds", file.window_check_interval_seconds)?,
            save_interval: positive_secs("saveIntervalSeconds", file.save_interval_seconds)?,
            record_window_titles: file.record_window_titles,
            start_of_day_hour,
            shutdown_timeout: positive_secs("shutdownTimeoutSeconds", file.shutdown_timeout_seconds)?,
        })
    }

    pub fn log_path(&self) -> PathBuf {
        self.db_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(LOG_FILE)
    }

    pub fn tracking_options(&self) -> TrackingOptions {
        TrackingOptions {
            record_window_titles: self.record_window_titles,
            start_of_day_hour: self.start_of_day_hour,
        }
    }

    pub fn schedule(&self) -> Schedule {
        Schedule {
            window_check_interval: self.window_check_interval,
            save_interval: self.save_interval,
            shutdown_timeout: self.shutdown_timeout,
        }
    }

    /// Effective settings without the database location.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "logLevel": self.log_level.to_string(),
            "windowCheckIntervalSeconds": self.window_check_interval.as_secs(),
            "saveIntervalSeconds": self.save_interval.as_secs(),
            "recordWindowTitles": self.record_window_titles,
            "startOfDayHour": self.start_of_day_hour,
            "shutdownTimeoutSeconds": self.shutdown_timeout.as_secs(),
        })
    }

    pub fn log_summary(&self) {
        info!("Loaded configuration: {}", self.summary());
    }
}

fn read_or_create(path: &Path) -> Result<ConfigFile, ConfigError> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let defaults = ConfigFile::default();
        fs::write(path, serde_json::to_string_pretty(&defaults)?)?;
        info!("Created config file with defaults at {}", path.display());
        return Ok(defaults);
    }
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn apply_env(file: &mut ConfigFile, lookup: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
    if let Some(url) = lookup("DATABASE_URL") {
        file.database_url = Some(url);
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        file.log_level = parse_log_level(&level)?;
    }
    if let Some(value) = lookup("WINDOW_CHECK_INTERVAL") {
        file.window_check_interval_seconds = parse_int("WINDOW_CHECK_INTERVAL", &value)?;
    }
    if let Some(value) = lookup("SAVE_INTERVAL") {
        file.save_interval_seconds = parse_int("SAVE_INTERVAL", &value)?;
    }
    if let Some(value) = lookup("RECORD_WINDOW_TITLES") {
        file.record_window_titles = parse_bool("RECORD_WINDOW_TITLES", &value)?;
    }
    if let Some(value) = lookup("START_OF_DAY_HOUR") {
        file.start_of_day_hour = parse_int("START_OF_DAY_HOUR", &value)?;
    }
    if let Some(value) = lookup("SHUTDOWN_TIMEOUT") {
        file.shutdown_timeout_seconds = parse_int("SHUTDOWN_TIMEOUT", &value)?;
    }
    Ok(())
}

fn parse_int(name: &'static str, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        }),
    }
}

/// Accepts the numeric levels (-4, 0, 4, 8) or their names.
fn parse_log_level(value: &str) -> Result<i64, ConfigError> {
    let level = match value.trim().to_ascii_lowercase().as_str() {
        "debug" => -4,
        "info" => 0,
        "warn" => 4,
        "error" => 8,
        other => other
            .parse()
            .map_err(|_| ConfigError::LogLevel(value.to_string()))?,
    };
    level_from_number(level)?;
    Ok(level)
}

fn level_from_number(level: i64) -> Result<LevelFilter, ConfigError> {
    match level {
        -4 => Ok(LevelFilter::Debug),
        0 => Ok(LevelFilter::Info),
        4 => Ok(LevelFilter::Warn),
        8 => Ok(LevelFilter::Error),
        other => Err(ConfigError::LogLevel(other.to_string())),
    }
}

fn positive_secs(name: &'static str, value: i64) -> Result<Duration, ConfigError> {
    u64::try_from(value)
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .ok_or(ConfigError::NonPositive { name, value })
}

fn expand_app_data(url: &str) -> PathBuf {
    if url.contains("%AppData%") {
        let app_data = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        PathBuf::from(url.replace("%AppData%", &app_data.to_string_lossy()))
    } else {
        PathBuf::from(url)
    }
}

fn default_database_path() -> Result<PathBuf, ConfigError> {
    let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
    Ok(data_dir.join(APP_DIR).join(DB_FILE))
}
