use std::time::Duration;

use thiserror::Error;

/// Failures that abort startup. Never retried.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("failed to open browser session: {0}")]
    BrowserSession(#[source] FetchError),
    #[error("failed to prepare calendar selectors: {0}")]
    Selectors(#[source] ExtractError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config line {line}: {content}")]
    InvalidLine { line: usize, content: String },
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("webdriver request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webdriver returned {status}: {message}")]
    WebDriver { status: u16, message: String },
    #[error("unexpected webdriver response: {0}")]
    Protocol(String),
    #[error("calendar marker did not render within {0:?}")]
    MarkerTimeout(Duration),
    #[error("browser session is closed")]
    SessionClosed,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector {selector:?}: {message}")]
    Selector {
        selector: &'static str,
        message: String,
    },
    #[error("calendar container not found on page")]
    MissingCalendar,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("messaging request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("messaging api returned {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected messaging response: {0}")]
    Protocol(String),
}

/// An error that escaped a monitor cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("calendar check did not finish within {0:?}")]
    TimedOut(Duration),
}
