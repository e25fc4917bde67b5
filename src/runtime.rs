use std::env;
use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::clients::twilio_client::TwilioSender;
use crate::clients::webdriver_client::{WebDriverClient, WebDriverFetcher};
use crate::config::{AppConfig, MonitorConfig};
use crate::error::{ConfigError, SetupError};
use crate::models::calendar_status::CalendarStatus;
use crate::service::calendar_parser::CalendarParser;
use crate::service::calendar_service::CalendarService;
use crate::service::status_notifier::{NotifyOutcome, StatusNotifier};
use crate::tasks::monitor_loop::{Monitor, MonitorSchedule, MonitorSummary};

const DEFAULT_CONFIG_FILE: &str = ".env";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub type LiveMonitor = Monitor<WebDriverFetcher, TwilioSender>;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Reads the config file (explicit path, `CONFIG_FILE`, or `.env` when present)
/// and falls back to the process environment for anything it lacks.
pub fn load_config(path: Option<&str>) -> Result<MonitorConfig, ConfigError> {
    let path = path
        .map(str::to_string)
        .or_else(|| env::var("CONFIG_FILE").ok());
    let file = match path {
        Some(path) => AppConfig::from_file(&path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => AppConfig::from_file(DEFAULT_CONFIG_FILE)?,
        None => AppConfig::default(),
    };

    let config = MonitorConfig::from_lookup(|key| file.get(key).or_else(|| env::var(key).ok()))?;
    info!(
        account_sid = %config.twilio.masked_sid(),
        whatsapp_from = %config.twilio.whatsapp_from,
        recipients = ?config.recipients,
        "configuration loaded"
    );
    Ok(config)
}

/// Opens the browser session and messaging client. Any failure here is fatal.
pub async fn build_monitor(config: &MonitorConfig) -> Result<LiveMonitor, SetupError> {
    let parser = CalendarParser::new().map_err(SetupError::Selectors)?;
    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(SetupError::HttpClient)?;

    let driver = WebDriverClient::connect(http.clone(), &config.webdriver_url)
        .await
        .map_err(SetupError::BrowserSession)?;
    let fetcher = WebDriverFetcher::new(driver, config.page_settle, config.calendar_wait);

    info!("initializing twilio client");
    let sender = TwilioSender::new(http, config.twilio.clone());

    let calendar = CalendarService::new(config.target_url.clone(), parser);
    let notifier = StatusNotifier::new(
        config.recipients.clone(),
        config.target_url.clone(),
        config.calendar_label.clone(),
    );
    info!("initialization complete");

    Ok(Monitor::new(
        fetcher,
        sender,
        calendar,
        notifier,
        MonitorSchedule::from(config),
        config.timezone,
    ))
}

/// Runs the monitor until Ctrl-C.
pub async fn run_watch(config: MonitorConfig) -> Result<MonitorSummary, SetupError> {
    let monitor = build_monitor(&config).await?;

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("monitoring stopped by user");
                signal_token.cancel();
            }
            Err(e) => error!(error = %e, "unable to listen for shutdown signal"),
        }
    });

    Ok(monitor.run(token).await)
}

/// Runs a single check, optionally notifying, and closes the browser.
pub async fn run_check(
    config: MonitorConfig,
    notify: bool,
) -> Result<(CalendarStatus, NotifyOutcome), SetupError> {
    let monitor = build_monitor(&config).await?;
    let status = monitor.check_only().await;
    let outcome = if notify {
        monitor.notify(&status).await
    } else {
        NotifyOutcome::Skipped
    };
    monitor.shutdown().await;
    Ok((status, outcome))
}
