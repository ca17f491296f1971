use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use std::fmt;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The night shift covered by a run: 18:00 the day before to 06:00 on the
/// run date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportTimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ReportTimeWindow {
    pub fn for_run_date(date: NaiveDate) -> Self {
        let previous = date.pred_opt().unwrap_or(date);
        Self {
            start: previous.and_time(NaiveTime::MIN) + TimeDelta::hours(18),
            end: date.and_time(NaiveTime::MIN) + TimeDelta::hours(6),
        }
    }

    pub fn start_text(&self) -> String {
        self.start.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn end_text(&self) -> String {
        self.end.format(TIMESTAMP_FORMAT).to_string()
    }
}

impl fmt::Display for ReportTimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start_text(), self.end_text())
    }
}
