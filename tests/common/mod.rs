#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bookingMonitor::error::{DeliveryError, FetchError};
use bookingMonitor::service::calendar_service::PageFetcher;
use bookingMonitor::service::status_notifier::MessageSender;
use tokio::time::sleep;

pub fn calendar_page(cells: &str) -> String {
    format!(
        "<html><body><div class=\"datepicker datepicker-inline\"><div class=\"datepicker-days\">\
         <table class=\"table-condensed\"><thead><tr><th class=\"datepicker-switch\">January 2025</th></tr></thead>\
         <tbody><tr>{}</tr></tbody></table></div></div></body></html>",
        cells
    )
}

/// Serves one fixed page and counts how it is used.
pub struct FakeFetcher {
    pub html: String,
    pub delay: Duration,
    pub fail_navigation: bool,
    pub fetches: Arc<AtomicUsize>,
    pub source_reads: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl FakeFetcher {
    pub fn serving(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            delay: Duration::ZERO,
            fail_navigation: false,
            fetches: Arc::new(AtomicUsize::new(0)),
            source_reads: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch_until(
        &self,
        _url: &str,
        ready: &(dyn for<'s> Fn(&'s str) -> bool + Send + Sync),
    ) -> Result<String, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        if self.fail_navigation {
            return Err(FetchError::WebDriver {
                status: 500,
                message: "unknown error: net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        if ready(&self.html) {
            Ok(self.html.clone())
        } else {
            Err(FetchError::MarkerTimeout(Duration::from_secs(20)))
        }
    }

    async fn page_source(&self) -> Result<String, FetchError> {
        self.source_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.html.clone())
    }

    async fn close(&self) -> Result<(), FetchError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records every dispatch; recipients listed in `failing` are rejected and
/// recipients listed in `stalling` take `stall` before answering.
pub struct MockSender {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
    pub failing: Vec<String>,
    pub stalling: Vec<String>,
    pub stall: Duration,
}

impl MockSender {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failing: Vec::new(),
            stalling: Vec::new(),
            stall: Duration::ZERO,
        }
    }

    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failing: recipients.iter().map(|r| r.to_string()).collect(),
            stalling: Vec::new(),
            stall: Duration::ZERO,
        }
    }

    pub fn stalling_for(recipients: &[&str], stall: Duration) -> Self {
        Self {
            stalling: recipients.iter().map(|r| r.to_string()).collect(),
            stall,
            ..Self::new()
        }
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(to, _)| to.clone())
            .collect()
    }
}

#[async_trait]
impl MessageSender for MockSender {
    async fn send_message(&self, recipient: &str, body: &str) -> Result<String, DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), body.to_string()));
        if self.stalling.iter().any(|r| r == recipient) {
            sleep(self.stall).await;
        }
        if self.failing.iter().any(|r| r == recipient) {
            return Err(DeliveryError::Rejected {
                status: 400,
                message: "The 'To' number is not a valid phone number.".to_string(),
            });
        }
        Ok(format!("SM{}", recipient.trim_start_matches('+')))
    }
}
