//! Common types used across the platform

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// User roles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

/// Prefixes of the human-readable codes, one per sequenced entity
pub mod code_prefix {
    pub const SALE: &str = "V";
    pub const ADJUSTMENT: &str = "AJ";
    pub const CASH_REGISTER: &str = "CA";
    pub const EXPENSE: &str = "G";
    pub const PRODUCT: &str = "P";
    pub const CLIENT: &str = "CL";
    pub const SUPPLIER: &str = "PVR";
}

/// Build a code such as `V0001` from a prefix and a sequence number.
///
/// Sequences above 9999 keep all their digits (`V12345`).
pub fn format_code(prefix: &str, seq: i64) -> String {
    format!("{}{:04}", prefix, seq)
}

/// Round a quantity or amount to two decimal places, half away from zero as
/// Postgres `NUMERIC(_, 2)` columns do
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether `value` fits a two-decimal column without rounding
pub fn has_at_most_two_decimals(value: Decimal) -> bool {
    value.normalize().scale() <= 2
}

/// Fixed business timezone from an hour offset (e.g. -4).
///
/// Out-of-range offsets fall back to UTC.
pub fn business_offset(utc_offset_hours: i32) -> FixedOffset {
    FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Current calendar date in the business timezone
pub fn business_today(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

/// Start of a business-local day expressed in UTC
pub fn local_day_start(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN) - Duration::seconds(offset.local_minus_utc() as i64);
    Utc.from_utc_datetime(&naive)
}

/// Inclusive date range in business-local days
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Half-open UTC bounds `[start, end)` covering every local day of the range
    pub fn utc_bounds(&self, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = local_day_start(self.start, offset);
        let end = local_day_start(self.end, offset) + Duration::days(1);
        (start, end)
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_code_pads_to_four_digits() {
        assert_eq!(format_code(code_prefix::SALE, 1), "V0001");
        assert_eq!(format_code(code_prefix::ADJUSTMENT, 42), "AJ0042");
        assert_eq!(format_code(code_prefix::CLIENT, 12345), "CL12345");
        assert_eq!(format_code(code_prefix::SUPPLIER, 3), "PVR0003");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(dec!(1.005)), dec!(1.01));
        assert_eq!(round2(dec!(2.345)), dec!(2.35));
        assert_eq!(round2(dec!(-2.345)), dec!(-2.35));
        assert_eq!(round2(dec!(2.344)), dec!(2.34));
        assert_eq!(round2(dec!(7)), dec!(7));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("root"), None);
        assert_eq!(Role::Admin.as_str(), "admin");
    }

    #[test]
    fn test_business_offset_fallback() {
        assert_eq!(business_offset(-4).local_minus_utc(), -4 * 3600);
        assert_eq!(business_offset(99).local_minus_utc(), 0);
    }

    #[test]
    fn test_date_range_utc_bounds() {
        let offset = business_offset(-4);
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let (start, end) = DateRange::single_day(date).utc_bounds(offset);

        assert_eq!(start.date_naive(), date);
        assert_eq!(start.hour(), 4);
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn test_date_range_validity() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert!(DateRange::new(a, b).is_valid());
        assert!(!DateRange::new(b, a).is_valid());
    }
}
