//! Date-aware comparison.
//!
//! A date field goes in as an ISO-8601 string and comes back out of Avro as
//! the number of days since the Unix epoch. Both describe the same calendar
//! day, so they are compared as dates rather than as JSON.

use crate::error::AcceptanceError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Parse the calendar date out of an ISO-8601 date or date-time string.
///
/// Date-times with an offset keep the date in their own offset.
pub fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

/// Days since 1970-01-01
pub fn epoch_day(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

/// Calendar date for a day count since 1970-01-01
pub fn from_epoch_day(days: i64) -> Option<NaiveDate> {
    NaiveDate::default().checked_add_signed(chrono::Duration::try_days(days)?)
}

fn to_calendar_date(value: &Value) -> Result<NaiveDate, AcceptanceError> {
    let date = match value {
        Value::String(s) => parse_calendar_date(s),
        Value::Number(n) => n.as_i64().and_then(from_epoch_day),
        _ => None,
    };
    date.ok_or_else(|| AcceptanceError::Conversion(format!("{} is not a date", value)))
}

/// Require `expected` and `actual` to name the same calendar date
pub fn assert_date(expected: &Value, actual: &Value) -> Result<(), AcceptanceError> {
    if to_calendar_date(expected)? == to_calendar_date(actual)? {
        Ok(())
    } else {
        Err(AcceptanceError::ValueMismatch {
            key: "date".to_string(),
            expected: expected.clone(),
            actual: actual.clone(),
        })
    }
}
