use serde::Serialize;

/// Booked and available day-of-month numbers read from one page snapshot.
/// Both lists are ascending and hold the decimal form of each day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CalendarStatus {
    pub booked: Vec<String>,
    pub available: Vec<String>,
}

impl CalendarStatus {
    pub fn from_days(mut booked: Vec<u32>, mut available: Vec<u32>) -> Self {
        booked.sort_unstable();
        available.sort_unstable();
        Self {
            booked: booked.iter().map(u32::to_string).collect(),
            available: available.iter().map(u32::to_string).collect(),
        }
    }

    pub fn has_availability(&self) -> bool {
        !self.available.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.booked.is_empty() && self.available.is_empty()
    }
}
