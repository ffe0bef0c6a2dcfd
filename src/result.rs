//! Query result model and the InfluxDB 1.x JSON response decoder.
//!
//! The mapper consumes a flat list of named [`Series`]. InfluxDB answers with
//! one entry per statement, each holding its own series and error, so
//! [`QueryResult::from_json`] flattens statements in order while keeping every
//! statement error visible on the series it came with.

use std::collections::BTreeMap;
use std::io::Read;

use serde::Deserialize;
use thiserror::Error;

use crate::value::RawValue;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed query response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Series '{series}' row {row} has {found} value(s) but {expected} column(s)")]
    RowWidth {
        series: String,
        row: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub error: Option<String>,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Series {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default, rename = "values")]
    pub rows: Vec<Vec<RawValue>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl QueryResult {
    pub fn new(series: Vec<Series>) -> Self {
        QueryResult {
            error: None,
            series,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        QueryResult {
            error: Some(error.into()),
            series: Vec::new(),
        }
    }

    pub fn from_json(input: &str) -> Result<Self, DecodeError> {
        let response: QueryResponse = serde_json::from_str(input)?;
        response.into_result()
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DecodeError> {
        let response: QueryResponse = serde_json::from_reader(reader)?;
        response.into_result()
    }

    /// Names of the series in the order they were received.
    pub fn series_names(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn total_rows(&self) -> usize {
        self.series.iter().map(|s| s.rows.len()).sum()
    }
}

impl Series {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Series {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ..Series::default()
        }
    }

    /// Series that only carries an upstream error.
    pub fn failed(error: impl Into<String>) -> Self {
        Series {
            error: Some(error.into()),
            ..Series::default()
        }
    }

    pub fn with_row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RawValue>,
    {
        self.rows.push(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Checks that every row is as wide as the column list.
    pub fn validate(&self) -> Result<(), DecodeError> {
        for (idx, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(DecodeError::RowWidth {
                    series: self.name.clone(),
                    row: idx,
                    expected: self.columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResponse>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    #[serde(default)]
    series: Vec<Series>,
    #[serde(default)]
    error: Option<String>,
}

impl QueryResponse {
    fn into_result(self) -> Result<QueryResult, DecodeError> {
        let mut series = Vec::new();
        for statement in self.results {
            match statement.error {
                Some(error) if statement.series.is_empty() => series.push(Series::failed(error)),
                Some(error) => series.extend(statement.series.into_iter().map(|mut s| {
                    s.error.get_or_insert_with(|| error.clone());
                    s
                })),
                None => series.extend(statement.series),
            }
        }
        for entry in &series {
            entry.validate()?;
        }
        Ok(QueryResult {
            error: self.error,
            series,
        })
    }
}
