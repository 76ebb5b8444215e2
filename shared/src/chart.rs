//! Time-bucketed sale series for dashboard charts

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::DateRange;

/// Chart window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChartPeriod {
    /// Monday to Sunday of the current week, one bucket per day
    Week,
    /// Every day of the current month
    Month,
    /// Every month of the current year
    All,
}

impl ChartPeriod {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "week" => Some(ChartPeriod::Week),
            "month" => Some(ChartPeriod::Month),
            "all" => Some(ChartPeriod::All),
            _ => None,
        }
    }

    /// Local date range covered by the chart
    pub fn range(self, today: NaiveDate) -> DateRange {
        match self {
            ChartPeriod::Week => {
                let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                DateRange::new(monday, monday + Duration::days(6))
            }
            ChartPeriod::Month => {
                let first = today.with_day(1).unwrap_or(today);
                DateRange::new(first, last_day_of_month(first))
            }
            ChartPeriod::All => {
                let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                let last = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
                DateRange::new(first, last)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChartPoint {
    pub label: String,
    pub count: i64,
    pub total: Decimal,
}

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (y, m) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .map(|next| next - Duration::days(1))
        .unwrap_or(first)
}

/// Bucket `(sold_at, total)` pairs into the chart for `period`.
///
/// Timestamps are converted to the business timezone before bucketing; sales
/// outside the window are ignored. Every bucket is present, empty or not.
pub fn chart_series(
    period: ChartPeriod,
    today: NaiveDate,
    offset: FixedOffset,
    sales: &[(DateTime<Utc>, Decimal)],
) -> Vec<ChartPoint> {
    let range = period.range(today);

    let mut points: Vec<ChartPoint> = match period {
        ChartPeriod::Week => WEEKDAYS.iter().map(|d| point(d.to_string())).collect(),
        ChartPeriod::Month => (1..=range.end.day()).map(|d| point(d.to_string())).collect(),
        ChartPeriod::All => MONTHS.iter().map(|m| point(m.to_string())).collect(),
    };

    for (sold_at, total) in sales {
        let local = sold_at.with_timezone(&offset).date_naive();
        if local < range.start || local > range.end {
            continue;
        }
        let index = match period {
            ChartPeriod::Week => local.weekday().num_days_from_monday() as usize,
            ChartPeriod::Month => local.day0() as usize,
            ChartPeriod::All => local.month0() as usize,
        };
        if let Some(p) = points.get_mut(index) {
            p.count += 1;
            p.total += *total;
        }
    }

    points
}

fn point(label: String) -> ChartPoint {
    ChartPoint {
        label,
        count: 0,
        total: Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{business_offset, local_day_start};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_range_starts_on_monday() {
        // 2024-05-16 is a Thursday
        let range = ChartPeriod::Week.range(date(2024, 5, 16));
        assert_eq!(range.start, date(2024, 5, 13));
        assert_eq!(range.end, date(2024, 5, 19));
    }

    #[test]
    fn test_month_range_handles_leap_february() {
        let range = ChartPeriod::Month.range(date(2024, 2, 10));
        assert_eq!(range.end, date(2024, 2, 29));
        let december = ChartPeriod::Month.range(date(2024, 12, 3));
        assert_eq!(december.end, date(2024, 12, 31));
    }

    #[test]
    fn test_week_series_buckets_by_local_day() {
        let offset = business_offset(-4);
        let today = date(2024, 5, 16);
        // 02:00 UTC on Tuesday is still Monday evening locally
        let late_monday = local_day_start(date(2024, 5, 14), business_offset(0)) + Duration::hours(2);
        let thursday = local_day_start(today, offset) + Duration::hours(10);

        let series = chart_series(
            ChartPeriod::Week,
            today,
            offset,
            &[(late_monday, dec!(10)), (thursday, dec!(5)), (thursday, dec!(7))],
        );

        assert_eq!(series.len(), 7);
        assert_eq!(series[0].count, 1);
        assert_eq!(series[3].count, 2);
        assert_eq!(series[3].total, dec!(12));
    }

    #[test]
    fn test_all_series_has_twelve_months_and_skips_other_years() {
        let offset = business_offset(0);
        let today = date(2024, 7, 1);
        let march = local_day_start(date(2024, 3, 5), offset);
        let last_year = local_day_start(date(2023, 3, 5), offset);

        let series = chart_series(ChartPeriod::All, today, offset, &[(march, dec!(1)), (last_year, dec!(1))]);
        assert_eq!(series.len(), 12);
        assert_eq!(series[2].label, "Mar");
        assert_eq!(series[2].count, 1);
        assert_eq!(series.iter().map(|p| p.count).sum::<i64>(), 1);
    }

    #[test]
    fn test_parse_period() {
        assert_eq!(ChartPeriod::parse("week"), Some(ChartPeriod::Week));
        assert_eq!(ChartPeriod::parse("year"), None);
    }
}
