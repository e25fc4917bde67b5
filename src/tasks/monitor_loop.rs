use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::MonitorConfig;
use crate::error::CycleError;
use crate::models::calendar_status::CalendarStatus;
use crate::service::calendar_service::{CalendarService, PageFetcher};
use crate::service::status_notifier::{MessageSender, NotifyOutcome, StatusNotifier};

#[derive(Debug, Clone)]
pub struct MonitorSchedule {
    pub interval: Duration,
    pub retry_delay: Duration,
    pub check_timeout: Duration,
}

impl From<&MonitorConfig> for MonitorSchedule {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            interval: config.interval,
            retry_delay: config.retry_delay,
            check_timeout: config.check_timeout,
        }
    }
}

impl MonitorSchedule {
    pub fn delay_for(&self, state: MonitorState) -> Duration {
        match state {
            MonitorState::Polling => self.interval,
            MonitorState::BackingOff => self.retry_delay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Polling,
    BackingOff,
}

impl MonitorState {
    /// State to sit in until the next cycle starts.
    pub fn after(result: &Result<CycleReport, CycleError>) -> Self {
        match result {
            Ok(_) => MonitorState::Polling,
            Err(_) => MonitorState::BackingOff,
        }
    }
}

#[derive(Debug)]
pub struct CycleReport {
    pub status: CalendarStatus,
    pub notification: NotifyOutcome,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSummary {
    pub cycles: usize,
    pub backoffs: usize,
}

/// Owns the browser and messaging handles for the life of the process.
pub struct Monitor<F, S> {
    fetcher: F,
    sender: S,
    calendar: CalendarService,
    notifier: StatusNotifier,
    schedule: MonitorSchedule,
    timezone: Tz,
}

impl<F: PageFetcher, S: MessageSender> Monitor<F, S> {
    pub fn new(
        fetcher: F,
        sender: S,
        calendar: CalendarService,
        notifier: StatusNotifier,
        schedule: MonitorSchedule,
        timezone: Tz,
    ) -> Self {
        Self {
            fetcher,
            sender,
            calendar,
            notifier,
            schedule,
            timezone,
        }
    }

    /// Fetch, extract and notify once. Only the calendar check is bounded by
    /// `check_timeout`; delivery always runs through the whole recipient list.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let status = timeout(self.schedule.check_timeout, self.check_only())
            .await
            .map_err(|_| CycleError::TimedOut(self.schedule.check_timeout))?;
        let notification = self.notify(&status).await;
        Ok(CycleReport {
            status,
            notification,
        })
    }

    /// Runs cycles until `token` is cancelled, then releases the browser.
    pub async fn run(self, token: CancellationToken) -> MonitorSummary {
        info!(
            started_at = %self.now().format("%Y-%m-%d %H:%M:%S"),
            "starting monitoring"
        );
        let mut summary = MonitorSummary::default();

        loop {
            let span = info_span!("cycle", id = %Uuid::new_v4());
            let result = tokio::select! {
                _ = token.cancelled() => break,
                result = self.run_cycle().instrument(span) => result,
            };
            summary.cycles += 1;

            let state = MonitorState::after(&result);
            let delay = self.schedule.delay_for(state);
            match &result {
                Err(e) => {
                    error!(error = %e, "error in monitoring loop");
                    warn!(retry_in = ?delay, "retrying after pause");
                    summary.backoffs += 1;
                }
                Ok(_) => info!(sleep_for = ?delay, "cycle complete, sleeping"),
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = sleep(delay) => {}
            }
        }

        info!(cycles = summary.cycles, "monitoring stopped");
        self.shutdown().await;
        summary
    }

    /// Fetch and extract without notifying anyone.
    pub async fn check_only(&self) -> CalendarStatus {
        self.calendar.check(&self.fetcher).await.into_status()
    }

    pub fn now(&self) -> chrono::DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone)
    }

    pub async fn notify(&self, status: &CalendarStatus) -> NotifyOutcome {
        self.notifier.notify(&self.sender, status, &self.now()).await
    }

    /// Releases the browser session.
    pub async fn shutdown(&self) {
        if let Err(e) = self.fetcher.close().await {
            error!(error = %e, "error in cleanup");
        }
    }
}
