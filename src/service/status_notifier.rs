use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use tracing::{error, info};

use crate::error::DeliveryError;
use crate::models::calendar_status::CalendarStatus;

pub const MESSAGE_TITLE: &str = "🕉 Temple Booking Status Update 🕉";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const NONE_MARKER: &str = "None";

/// Messaging seam. Returns the provider's id for the delivered message.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, recipient: &str, body: &str) -> Result<String, DeliveryError>;
}

/// Text built once per notification event and sent unchanged to every recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    body: String,
}

impl NotificationMessage {
    /// `None` when the status has no available dates.
    pub fn build<Tz: TimeZone>(
        status: &CalendarStatus,
        now: &DateTime<Tz>,
        booking_url: &str,
        calendar_label: Option<&str>,
    ) -> Option<Self>
    where
        Tz::Offset: std::fmt::Display,
    {
        if !status.has_availability() {
            return None;
        }
        let booked = if status.booked.is_empty() {
            NONE_MARKER.to_string()
        } else {
            status.booked.join(", ")
        };
        let heading = match calendar_label {
            Some(label) => format!("{} Calendar Status:", label),
            None => "Calendar Status:".to_string(),
        };
        let body = format!(
            "{title}\n\
             Time: {time}\n\n\
             ✨ DATES AVAILABLE! ✨\n\n\
             {heading}\n\
             ----------------------------\n\
             🟢 Available Dates: {available}\n\n\
             🔴 Booked Dates: {booked}\n\n\
             Book now at:\n{url}",
            title = MESSAGE_TITLE,
            time = now.format(TIMESTAMP_FORMAT),
            heading = heading,
            available = status.available.join(", "),
            booked = booked,
            url = booking_url,
        );
        Some(Self { body })
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

#[derive(Debug)]
pub struct DeliveryReport {
    pub recipient: String,
    pub result: Result<String, DeliveryError>,
}

#[derive(Debug)]
pub enum NotifyOutcome {
    /// No available dates, nothing sent.
    Skipped,
    Dispatched(Vec<DeliveryReport>),
}

impl NotifyOutcome {
    pub fn delivered_count(&self) -> usize {
        match self {
            NotifyOutcome::Skipped => 0,
            NotifyOutcome::Dispatched(reports) => {
                reports.iter().filter(|r| r.result.is_ok()).count()
            }
        }
    }
}

pub struct StatusNotifier {
    recipients: Vec<String>,
    booking_url: String,
    calendar_label: Option<String>,
}

impl StatusNotifier {
    pub fn new(recipients: Vec<String>, booking_url: String, calendar_label: Option<String>) -> Self {
        Self {
            recipients,
            booking_url,
            calendar_label,
        }
    }

    /// Sends the status report to every recipient when dates are available.
    /// A failed recipient is logged and recorded; the rest are still tried.
    pub async fn notify<S, Tz>(
        &self,
        sender: &S,
        status: &CalendarStatus,
        now: &DateTime<Tz>,
    ) -> NotifyOutcome
    where
        S: MessageSender + ?Sized,
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let Some(message) = NotificationMessage::build(
            status,
            now,
            &self.booking_url,
            self.calendar_label.as_deref(),
        ) else {
            info!("no available dates found, skipping notification");
            return NotifyOutcome::Skipped;
        };

        info!(
            recipients = self.recipients.len(),
            "available dates found, sending message:\n{}",
            message.body()
        );

        let mut reports = Vec::with_capacity(self.recipients.len());
        for recipient in &self.recipients {
            let result = sender.send_message(recipient, message.body()).await;
            match &result {
                Ok(sid) => info!(recipient = %recipient, sid = %sid, "message sent"),
                Err(e) => error!(recipient = %recipient, error = %e, "error sending message"),
            }
            reports.push(DeliveryReport {
                recipient: recipient.clone(),
                result,
            });
        }
        NotifyOutcome::Dispatched(reports)
    }
}
