//! Error family returned by the mapping core.

use thiserror::Error;

/// Errors raised while mapping a query result into typed records.
///
/// Every variant aborts the mapping call that produced it; no partial list of
/// records is ever returned alongside an error.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MapperError {
    /// The target record type does not declare a measurement name.
    #[error("Type {record} does not declare a measurement name")]
    InvalidArgument { record: String },

    /// The query result, or one of its series, carries an upstream error.
    #[error("{context}: {message}")]
    ResultError {
        context: &'static str,
        message: String,
    },

    /// The declared type of a bound field has no coercion rule.
    #[error("Type '{record}' field '{field}' is from an unsupported type '{declared}'")]
    UnsupportedFieldType {
        record: String,
        field: String,
        declared: String,
    },

    /// The raw value's representation does not match what the field expects.
    #[error(
        "Type '{record}' field '{field}' expects a {expected} value but received {actual} '{value}'"
    )]
    TypeMismatch {
        record: String,
        field: String,
        expected: &'static str,
        actual: &'static str,
        value: String,
    },

    /// A timestamp value could not be turned into an instant.
    #[error("Type '{record}' field '{field}' cannot interpret '{value}' as a timestamp: {reason}")]
    InvalidTimestamp {
        record: String,
        field: String,
        value: String,
        reason: String,
    },

    /// A row is narrower or wider than its series' column list.
    #[error("Series '{series}' row {row} has {found} value(s) but {expected} column(s)")]
    RowWidth {
        series: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The target record type refused to produce a zero-value instance.
    #[error("Type '{record}' could not be instantiated: {reason}")]
    Instantiation { record: String, reason: String },
}

impl MapperError {
    pub(crate) fn query(message: &str) -> Self {
        MapperError::ResultError {
            context: "InfluxDB returned an error",
            message: message.to_string(),
        }
    }

    pub(crate) fn series(message: &str) -> Self {
        MapperError::ResultError {
            context: "InfluxDB returned an error with Series",
            message: message.to_string(),
        }
    }

    /// Upstream message for result errors, `None` for every other kind.
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            MapperError::ResultError { message, .. } => Some(message),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MapperError>;
