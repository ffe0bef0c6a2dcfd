//! Conversion of raw result cells into typed field values.
//!
//! InfluxDB returns every number as a double, timestamps either as RFC 3339
//! text or as epoch numbers, and booleans either natively or as the strings
//! `"true"`/`"false"`. The rules here absorb those encodings:
//!
//! - text fields take the textual form of any value
//! - instant fields take RFC 3339 text (fraction up to 6 digits, explicit
//!   offset) or an epoch number in the configured [`TimePrecision`]
//! - float fields take doubles as they are
//! - integer fields take doubles truncated toward zero (saturating)
//! - boolean fields are `true` only for the exact text `true`
//!
//! Null cells never touch the target field.

use std::{fmt, str::FromStr, sync::OnceLock};

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    cache::FieldHandle,
    error::{MapperError, Result},
    record::{FieldKind, FieldSetter, Record},
    value::{FieldValue, RawValue},
};

/// Unit of numeric epoch timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePrecision {
    #[serde(alias = "ns")]
    Nanoseconds,
    #[serde(alias = "u", alias = "us")]
    Microseconds,
    #[default]
    #[serde(alias = "ms")]
    Milliseconds,
    #[serde(alias = "s")]
    Seconds,
    #[serde(alias = "m")]
    Minutes,
    #[serde(alias = "h")]
    Hours,
}

impl TimePrecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimePrecision::Nanoseconds => "ns",
            TimePrecision::Microseconds => "us",
            TimePrecision::Milliseconds => "ms",
            TimePrecision::Seconds => "s",
            TimePrecision::Minutes => "m",
            TimePrecision::Hours => "h",
        }
    }

    /// Instant `value` units after the Unix epoch, `None` when out of range.
    pub fn instant_from_epoch(&self, value: i64) -> Option<DateTime<Utc>> {
        match self {
            TimePrecision::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
            TimePrecision::Microseconds => DateTime::from_timestamp_micros(value),
            TimePrecision::Milliseconds => DateTime::from_timestamp_millis(value),
            TimePrecision::Seconds => DateTime::from_timestamp(value, 0),
            TimePrecision::Minutes => DateTime::from_timestamp(value.checked_mul(60)?, 0),
            TimePrecision::Hours => DateTime::from_timestamp(value.checked_mul(3_600)?, 0),
        }
    }
}

impl fmt::Display for TimePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimePrecision {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ns" | "nanoseconds" => Ok(TimePrecision::Nanoseconds),
            "u" | "us" | "microseconds" => Ok(TimePrecision::Microseconds),
            "ms" | "milliseconds" => Ok(TimePrecision::Milliseconds),
            "s" | "seconds" => Ok(TimePrecision::Seconds),
            "m" | "minutes" => Ok(TimePrecision::Minutes),
            "h" | "hours" => Ok(TimePrecision::Hours),
            other => Err(format!("Unknown time precision '{other}'")),
        }
    }
}

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"^([0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2})",
            r"(?:\.([0-9]{1,6}))?",
            r"(Z|[+-][0-9]{2}(?::?[0-9]{2})?)$",
        ))
        .expect("timestamp pattern is valid")
    })
}

/// Parses `yyyy-MM-ddTHH:mm:ss[.ffffff](Z|±HH[[:]mm])` into an instant.
pub fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    let captures = timestamp_pattern()
        .captures(value)
        .ok_or_else(|| "expected yyyy-MM-ddTHH:mm:ss[.ffffff] with a zone offset".to_string())?;

    let mut naive = NaiveDateTime::parse_from_str(&captures[1], "%Y-%m-%dT%H:%M:%S")
        .map_err(|err| err.to_string())?;
    if let Some(fraction) = captures.get(2) {
        let digits = fraction.as_str();
        let micros: i64 = format!("{digits:0<6}")
            .parse()
            .map_err(|_| format!("invalid fraction '{digits}'"))?;
        naive += chrono::Duration::microseconds(micros);
    }

    let offset = parse_offset(&captures[3])?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| "local time does not exist in the given offset".to_string())
}

fn parse_offset(token: &str) -> std::result::Result<FixedOffset, String> {
    if token == "Z" {
        return FixedOffset::east_opt(0).ok_or_else(|| "invalid UTC offset".to_string());
    }
    let sign = if token.starts_with('-') { -1 } else { 1 };
    let invalid = || format!("invalid offset '{token}'");
    let digits: String = token.chars().skip(1).filter(|c| *c != ':').collect();
    let hours: i32 = digits
        .get(..2)
        .ok_or_else(invalid)?
        .parse()
        .map_err(|_| invalid())?;
    let minutes: i32 = match digits.get(2..).ok_or_else(invalid)? {
        "" => 0,
        rest => rest.parse().map_err(|_| invalid())?,
    };
    FixedOffset::east_opt(sign * (hours * 3_600 + minutes * 60))
        .ok_or_else(|| format!("offset '{token}' is out of range"))
}

#[derive(Debug, Clone, PartialEq)]
enum Failure {
    Mismatch { expected: &'static str },
    Timestamp(String),
}

impl Failure {
    fn into_error(self, record: &str, field: &str, raw: &RawValue) -> MapperError {
        match self {
            Failure::Mismatch { expected } => MapperError::TypeMismatch {
                record: record.to_string(),
                field: field.to_string(),
                expected,
                actual: raw.kind_name(),
                value: raw.as_text(),
            },
            Failure::Timestamp(reason) => MapperError::InvalidTimestamp {
                record: record.to_string(),
                field: field.to_string(),
                value: raw.as_text(),
                reason,
            },
        }
    }
}

/// Stateless coercion rules, parameterised by the epoch unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueCoercer {
    precision: TimePrecision,
}

impl ValueCoercer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_precision(precision: TimePrecision) -> Self {
        ValueCoercer { precision }
    }

    /// Writes `raw` into the field of `target` described by `handle`.
    ///
    /// Null is a no-op. Unsupported declarations fail for every non-null value.
    pub fn set_value<T: Record>(
        &self,
        target: &mut T,
        handle: &FieldHandle<T>,
        raw: &RawValue,
    ) -> Result<()> {
        if raw.is_null() {
            return Ok(());
        }
        let fail = |failure: Failure| failure.into_error(T::type_name(), handle.field, raw);
        match handle.setter {
            FieldSetter::Text(set) | FieldSetter::TextObject(set) => set(target, raw.as_text()),
            FieldSetter::Instant(set) | FieldSetter::InstantObject(set) => {
                set(target, self.instant(raw).map_err(fail)?)
            }
            FieldSetter::Float(set) | FieldSetter::FloatObject(set) => {
                set(target, require_float(raw).map_err(fail)?)
            }
            FieldSetter::Int(set) | FieldSetter::IntObject(set) => {
                set(target, require_float(raw).map_err(fail)? as i32)
            }
            FieldSetter::Long(set) | FieldSetter::LongObject(set) => {
                set(target, require_float(raw).map_err(fail)? as i64)
            }
            FieldSetter::Bool(set) | FieldSetter::BoolObject(set) => set(target, lenient_bool(raw)),
            FieldSetter::Unsupported { declared } => {
                return Err(MapperError::UnsupportedFieldType {
                    record: T::type_name().to_string(),
                    field: handle.field.to_string(),
                    declared: declared.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Converts `raw` into a value of `kind`; `None` for null cells.
    ///
    /// `record` and `field` only label errors.
    pub fn coerce(
        &self,
        record: &str,
        field: &str,
        kind: FieldKind,
        raw: &RawValue,
    ) -> Result<Option<FieldValue>> {
        if raw.is_null() {
            return Ok(None);
        }
        let fail = |failure: Failure| failure.into_error(record, field, raw);
        let value = match kind {
            FieldKind::Text => FieldValue::Text(raw.as_text()),
            FieldKind::Instant => FieldValue::Instant(self.instant(raw).map_err(fail)?),
            FieldKind::Float | FieldKind::FloatObject => {
                FieldValue::Float(require_float(raw).map_err(fail)?)
            }
            FieldKind::Int | FieldKind::IntObject => {
                FieldValue::Int(require_float(raw).map_err(fail)? as i32)
            }
            FieldKind::Long | FieldKind::LongObject => {
                FieldValue::Long(require_float(raw).map_err(fail)? as i64)
            }
            FieldKind::Bool | FieldKind::BoolObject => FieldValue::Bool(lenient_bool(raw)),
        };
        Ok(Some(value))
    }

    fn instant(&self, raw: &RawValue) -> std::result::Result<DateTime<Utc>, Failure> {
        match raw {
            RawValue::String(text) => parse_timestamp(text).map_err(Failure::Timestamp),
            RawValue::Integer(epoch) => self.epoch_instant(*epoch),
            RawValue::Float(epoch) => {
                let truncated = epoch.trunc();
                if !truncated.is_finite()
                    || truncated < i64::MIN as f64
                    || truncated >= i64::MAX as f64
                {
                    return Err(Failure::Timestamp(format!(
                        "epoch value is outside the {} range",
                        self.precision
                    )));
                }
                self.epoch_instant(truncated as i64)
            }
            _ => Err(Failure::Mismatch {
                expected: "timestamp (string or epoch number)",
            }),
        }
    }

    fn epoch_instant(&self, epoch: i64) -> std::result::Result<DateTime<Utc>, Failure> {
        self.precision.instant_from_epoch(epoch).ok_or_else(|| {
            Failure::Timestamp(format!(
                "epoch value is outside the {} range",
                self.precision
            ))
        })
    }
}

fn require_float(raw: &RawValue) -> std::result::Result<f64, Failure> {
    match raw {
        RawValue::Float(value) => Ok(*value),
        _ => Err(Failure::Mismatch { expected: "float" }),
    }
}

/// `true` only for the exact text `true`; every other value is `false`.
fn lenient_bool(raw: &RawValue) -> bool {
    raw.as_text() == "true"
}
