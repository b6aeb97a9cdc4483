use thiserror::Error;

/// The platform collaborator could not tell which window has focus.
/// Never leaves the `platform` module; pollers turn it into `None`.
#[derive(Error, Debug)]
pub enum PollError {
    #[error("no window currently holds focus")]
    NoActiveWindow,
    #[error("window system request failed: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("unable to write events to the data store")]
    Write(#[from] rusqlite::Error),
    #[error("data store unavailable: {0}")]
    Unavailable(String),
    #[error("persistence worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("unable to fetch from data store")]
    Read(#[from] rusqlite::Error),
    #[error("data store unavailable: {0}")]
    Unavailable(String),
    #[error("query worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be greater than zero (got {value})")]
    NonPositive { name: &'static str, value: i64 },
    #[error("start of day hour must be within 0..=23 (got {0})")]
    StartOfDayHour(i64),
    #[error("{0} is not a valid log level (expected one of -4, 0, 4, 8)")]
    LogLevel(String),
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
    #[error("unable to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unable to resolve the data directory")]
    NoDataDir,
}

/// The final flush could not complete; buffered events would be lost.
#[derive(Error, Debug)]
pub enum ShutdownError {
    #[error("final flush failed: {0}")]
    Flush(#[from] PersistError),
    #[error("final flush did not finish within {0:?}")]
    TimedOut(std::time::Duration),
}
