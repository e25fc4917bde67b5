use async_trait::async_trait;
use tracing::{error, info};

use crate::error::FetchError;
use crate::models::calendar_status::CalendarStatus;
use crate::service::calendar_parser::CalendarParser;

const PAGE_DUMP_CHARS: usize = 500;

/// Browser seam: something that can load a page and hand back its rendered source.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Navigates to `url` and waits until `ready` accepts the rendered source,
    /// returning that source. Gives up with `FetchError::MarkerTimeout`.
    async fn fetch_until(
        &self,
        url: &str,
        ready: &(dyn for<'s> Fn(&'s str) -> bool + Send + Sync),
    ) -> Result<String, FetchError>;

    /// Current page source, used for diagnostics.
    async fn page_source(&self) -> Result<String, FetchError>;

    async fn close(&self) -> Result<(), FetchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarCheck {
    Rendered(CalendarStatus),
    /// Nothing usable this cycle.
    Degraded { reason: String },
}

impl CalendarCheck {
    pub fn into_status(self) -> CalendarStatus {
        match self {
            CalendarCheck::Rendered(status) => status,
            CalendarCheck::Degraded { .. } => CalendarStatus::default(),
        }
    }
}

pub struct CalendarService {
    target_url: String,
    parser: CalendarParser,
}

impl CalendarService {
    pub fn new(target_url: String, parser: CalendarParser) -> Self {
        Self { target_url, parser }
    }

    /// Loads the calendar page and extracts its status. Never fails: any
    /// fetch or parse problem degrades to an empty result after dumping the
    /// start of the page source to the log.
    pub async fn check<F: PageFetcher + ?Sized>(&self, fetcher: &F) -> CalendarCheck {
        info!(url = %self.target_url, "loading calendar page");
        let ready = |html: &str| self.parser.has_calendar(html);
        let extracted = match fetcher.fetch_until(&self.target_url, &ready).await {
            Ok(html) => {
                info!("calendar found on page");
                self.parser.extract(&html).map_err(|e| e.to_string())
            }
            Err(e) => Err(e.to_string()),
        };

        match extracted {
            Ok(status) => {
                info!(
                    booked = ?status.booked,
                    available = ?status.available,
                    "calendar status"
                );
                CalendarCheck::Rendered(status)
            }
            Err(reason) => {
                error!(error = %reason, "error checking calendar status");
                match fetcher.page_source().await {
                    Ok(source) => error!(page = %truncate_dump(&source), "page source"),
                    Err(e) => error!(error = %e, "could not get page source"),
                }
                CalendarCheck::Degraded { reason }
            }
        }
    }
}

fn truncate_dump(source: &str) -> String {
    let mut dump: String = source.chars().take(PAGE_DUMP_CHARS).collect();
    dump.push_str("...");
    dump
}
