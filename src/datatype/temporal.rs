// used for dates and timestamps
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use lazy_static::lazy_static;
use proptest::prelude::*;
use regex::Regex;

use crate::constraint::{ConstraintKind, ConstraintSchema, Constraints};
use crate::contract::{CastResult, ResourceType, StorageType};
use crate::error::Failure;
use crate::value::Value;

lazy_static! {
    static ref DATE_ONLY: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    static ref NAIVE_DATETIME: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2}(\.\d{1,9})?)?$").unwrap();
}

// 1970-01-01 and 2100-01-01 as days from the common era
const EPOCH_DAYS: i32 = 719_163;
const END_DAYS: i32 = 766_645;

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if DATE_ONLY.is_match(s) {
        return s.parse().ok();
    }
    parse_datetime(s).map(|dt| dt.date_naive())
}

/// RFC 3339, naive date-times taken as UTC, and bare dates at midnight UTC.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if NAIVE_DATETIME.is_match(s) {
        let normalized = s.replacen(' ', "T", 1);
        let naive = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M"))
            .ok()?;
        return Some(naive.and_utc());
    }
    if DATE_ONLY.is_match(s) {
        let date: NaiveDate = s.parse().ok()?;
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

// ------------- Date -------------

#[derive(Debug, Clone, Copy, Default)]
pub struct DateType;

impl ResourceType for DateType {
    fn name(&self) -> &str {
        "Date"
    }
    fn storage_type(&self, _constraints: &Constraints) -> StorageType {
        StorageType::Date
    }
    fn cast_input(&self, value: Value, _constraints: &Constraints) -> CastResult {
        match value {
            Value::Date(_) => Ok(value),
            Value::DateTime(dt) => Ok(Value::Date(dt.date_naive())),
            Value::String(s) => parse_date(&s).map(Value::Date).ok_or(Failure::Invalid),
            _ => Err(Failure::Invalid),
        }
    }
    fn cast_stored(&self, value: Value, _constraints: &Constraints) -> CastResult {
        match value {
            Value::Date(_) => Ok(value),
            Value::String(s) => s.parse().map(Value::Date).map_err(|_| Failure::Invalid),
            _ => Err(Failure::Invalid),
        }
    }
    fn dump_to_native(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::Date(_)))
    }
    fn dump_to_embedded(&self, value: Value, _constraints: &Constraints) -> CastResult {
        match value {
            Value::Date(d) => Ok(Value::String(d.format("%Y-%m-%d").to_string())),
            _ => Err(Failure::Invalid),
        }
    }
    fn generator(&self, _constraints: &Constraints) -> Option<BoxedStrategy<Value>> {
        Some(
            (EPOCH_DAYS..END_DAYS)
                .prop_filter_map("day out of range", NaiveDate::from_num_days_from_ce_opt)
                .prop_map(Value::Date)
                .boxed(),
        )
    }
}

// ------------- UtcDatetime -------------

/// A UTC timestamp, truncated to whole seconds unless `precision` is
/// `"microsecond"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtcDatetimeType;

fn microseconds(constraints: &Constraints) -> bool {
    constraints.str("precision") == Some("microsecond")
}

fn truncate(dt: DateTime<Utc>, constraints: &Constraints) -> DateTime<Utc> {
    dt.trunc_subsecs(if microseconds(constraints) { 6 } else { 0 })
}

impl ResourceType for UtcDatetimeType {
    fn name(&self) -> &str {
        "UtcDatetime"
    }
    fn storage_type(&self, constraints: &Constraints) -> StorageType {
        if microseconds(constraints) {
            StorageType::UtcDatetimeUsec
        } else {
            StorageType::UtcDatetime
        }
    }
    fn cast_input(&self, value: Value, constraints: &Constraints) -> CastResult {
        let dt = match value {
            Value::DateTime(dt) => dt,
            Value::Date(d) => d.and_hms_opt(0, 0, 0).ok_or(Failure::Invalid)?.and_utc(),
            Value::String(s) => parse_datetime(&s).ok_or(Failure::Invalid)?,
            _ => return Err(Failure::Invalid),
        };
        Ok(Value::DateTime(truncate(dt, constraints)))
    }
    fn cast_stored(&self, value: Value, constraints: &Constraints) -> CastResult {
        match value {
            Value::DateTime(dt) => Ok(Value::DateTime(truncate(dt, constraints))),
            Value::String(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| Value::DateTime(truncate(dt.with_timezone(&Utc), constraints)))
                .map_err(|_| Failure::Invalid),
            _ => Err(Failure::Invalid),
        }
    }
    fn dump_to_native(&self, value: Value, _constraints: &Constraints) -> CastResult {
        super::expect(value, |v| matches!(v, Value::DateTime(_)))
    }
    fn dump_to_embedded(&self, value: Value, constraints: &Constraints) -> CastResult {
        let format = if microseconds(constraints) {
            SecondsFormat::Micros
        } else {
            SecondsFormat::Secs
        };
        match value {
            Value::DateTime(dt) => Ok(Value::String(dt.to_rfc3339_opts(format, true))),
            _ => Err(Failure::Invalid),
        }
    }
    fn constraints(&self) -> ConstraintSchema {
        ConstraintSchema::new().option_with_default(
            "precision",
            ConstraintKind::OneOf(&["second", "microsecond"]),
            "second",
        )
    }
    fn generator(&self, constraints: &Constraints) -> Option<BoxedStrategy<Value>> {
        let micros = microseconds(constraints);
        let seconds = 0i64..i64::from(END_DAYS - EPOCH_DAYS) * 86_400;
        Some(
            (seconds, 0u32..1_000_000)
                .prop_filter_map("timestamp out of range", move |(secs, us)| {
                    DateTime::from_timestamp(secs, if micros { us * 1_000 } else { 0 })
                })
                .prop_map(Value::DateTime)
                .boxed(),
        )
    }
}
