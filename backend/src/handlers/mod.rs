//! HTTP handlers for the POS inventory API

pub mod adjustment;
pub mod auth;
pub mod cash_register;
pub mod catalog;
pub mod dashboard;
pub mod expense;
pub mod health;
pub mod inventory;
pub mod notification;
pub mod reporting;
pub mod sale;

pub use adjustment::*;
pub use auth::*;
pub use cash_register::*;
pub use catalog::*;
pub use dashboard::*;
pub use expense::*;
pub use health::*;
pub use inventory::*;
pub use notification::*;
pub use reporting::*;
pub use sale::*;

use chrono::NaiveDate;
use serde::Deserialize;
use shared::DateRange;

use crate::error::{AppError, AppResult};

/// `?start=YYYY-MM-DD&end=YYYY-MM-DD`, both inclusive, in the business timezone
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRangeQuery {
    /// `None` when no bounds were given; a lone `start` selects that day
    pub fn range(&self) -> AppResult<Option<DateRange>> {
        let range = match (self.start, self.end) {
            (None, None) => return Ok(None),
            (Some(start), None) => DateRange::single_day(start),
            (Some(start), Some(end)) => DateRange::new(start, end),
            (None, Some(_)) => return Err(AppError::validation("start", "start is required when end is given")),
        };
        if !range.is_valid() {
            return Err(AppError::validation("end", "end must not be before start"));
        }
        Ok(Some(range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_date_range_query() {
        assert!(DateRangeQuery::default().range().unwrap().is_none());

        let single = DateRangeQuery { start: Some(day(3)), end: None }.range().unwrap().unwrap();
        assert_eq!((single.start, single.end), (day(3), day(3)));

        let span = DateRangeQuery { start: Some(day(1)), end: Some(day(7)) }.range().unwrap().unwrap();
        assert_eq!((span.start, span.end), (day(1), day(7)));

        assert!(DateRangeQuery { start: Some(day(7)), end: Some(day(1)) }.range().is_err());
        assert!(DateRangeQuery { start: None, end: Some(day(1)) }.range().is_err());
    }
}
