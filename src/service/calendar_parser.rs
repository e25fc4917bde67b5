use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::models::calendar_status::CalendarStatus;

/// Class the datepicker puts on its day table once it has rendered.
pub const CALENDAR_MARKER: &str = ".table-condensed";
const BOOKED_SELECTOR: &str = ".bookedClass";
const AVAILABLE_SELECTOR: &str = "td.day:not(.disabled):not(.bookedClass):not(.old):not(.new)";
// Booked cells spilling over from the next month render with this text.
const PLACEHOLDER_PREFIX: &str = "new";

/// Compiled selectors for the ticketing site's datepicker widget.
pub struct CalendarParser {
    marker: Selector,
    booked: Selector,
    available: Selector,
}

impl CalendarParser {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            marker: compile(CALENDAR_MARKER)?,
            booked: compile(BOOKED_SELECTOR)?,
            available: compile(AVAILABLE_SELECTOR)?,
        })
    }

    pub fn has_calendar(&self, html: &str) -> bool {
        Html::parse_document(html).select(&self.marker).next().is_some()
    }

    /// Reads booked and available days out of a rendered page.
    ///
    /// Cells whose text is not a positive day number are skipped.
    pub fn extract(&self, html: &str) -> Result<CalendarStatus, ExtractError> {
        let document = Html::parse_document(html);
        if document.select(&self.marker).next().is_none() {
            return Err(ExtractError::MissingCalendar);
        }

        let mut booked = Vec::new();
        for cell in document.select(&self.booked) {
            let text = cell_text(cell);
            debug!(text = %text, "found booked date element");
            if text.is_empty() || text.starts_with(PLACEHOLDER_PREFIX) {
                continue;
            }
            if let Some(day) = parse_day(&text) {
                booked.push(day);
            }
        }

        let mut available = Vec::new();
        for cell in document.select(&self.available) {
            let text = cell_text(cell);
            debug!(text = %text, "found available date element");
            if text.is_empty() {
                continue;
            }
            if let Some(day) = parse_day(&text) {
                available.push(day);
            }
        }

        Ok(CalendarStatus::from_days(booked, available))
    }
}

fn compile(selector: &'static str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::Selector {
        selector,
        message: format!("{:?}", e),
    })
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn parse_day(text: &str) -> Option<u32> {
    match text.parse::<u32>() {
        Ok(day) if day > 0 => Some(day),
        _ => {
            warn!(text = %text, "skipping calendar cell that is not a day number");
            None
        }
    }
}
