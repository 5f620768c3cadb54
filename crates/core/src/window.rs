//! Incremental fetch window.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Query format for upstream date parameters.
pub const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

/// The `[last_fetched, today]` range requested from upstream.
///
/// Each poll rolls `today` forward to the current date; a successful poll
/// then moves `last_fetched` up to it, so the next poll only asks for what
/// changed since.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub last_fetched: NaiveDate,
    pub today: NaiveDate,
}

impl DateWindow {
    /// Initial window: yesterday → `today`.
    pub fn starting(today: NaiveDate) -> Self {
        Self {
            last_fetched: today.pred_opt().unwrap_or(today),
            today,
        }
    }

    /// Move the upper bound to `today`. Never moves backwards past
    /// `last_fetched`.
    pub fn roll_to(&mut self, today: NaiveDate) {
        self.today = today.max(self.last_fetched);
    }

    /// Record a successful fetch of the current window.
    pub fn advance(&mut self) {
        self.last_fetched = self.today;
    }

    /// `dateFrom` / `dateTo` query parameters.
    pub fn query(&self) -> [(&'static str, String); 2] {
        [
            ("dateFrom", self.last_fetched.format(QUERY_DATE_FORMAT).to_string()),
            ("dateTo", self.today.format(QUERY_DATE_FORMAT).to_string()),
        ]
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.last_fetched, self.today)
    }
}
