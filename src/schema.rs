//! Schema files describing a measurement for mapping without a Rust type.
//!
//! ```yaml
//! measurement: cpu
//! columns:
//!   - name: time
//!     type: instant
//!   - name: host
//!     type: text
//!   - name: usage_idle
//!     type: float
//!     field: idle
//! ```

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
};

use anyhow::{Context, Result as AnyResult, bail, ensure};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

use crate::{
    coerce::ValueCoercer,
    config::{Format, MapperConfig, config_format},
    error::Result,
    mapper::{check_errors, walk_series},
    record::FieldKind,
    result::QueryResult,
    value::FieldValue,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Output name; defaults to the column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl SchemaColumn {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        SchemaColumn {
            name: name.to_string(),
            kind,
            field: None,
        }
    }

    pub fn output_name(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DynamicSchema {
    pub measurement: String,
    pub columns: Vec<SchemaColumn>,
}

impl DynamicSchema {
    pub fn new(measurement: &str, columns: Vec<SchemaColumn>) -> Self {
        DynamicSchema {
            measurement: measurement.to_string(),
            columns,
        }
    }

    pub fn load(path: &Path) -> AnyResult<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening schema file {path:?}"))?;
        let schema: DynamicSchema = match config_format(path) {
            Some(Format::Json) => serde_json::from_str(&raw)
                .with_context(|| format!("Parsing JSON schema {path:?}"))?,
            Some(Format::Yaml) | None => serde_yaml::from_str(&raw)
                .with_context(|| format!("Parsing YAML schema {path:?}"))?,
        };
        schema
            .validate()
            .with_context(|| format!("Validating schema {path:?}"))?;
        Ok(schema)
    }

    pub fn validate(&self) -> AnyResult<()> {
        ensure!(
            !self.measurement.trim().is_empty(),
            "Schema measurement name must not be empty"
        );
        let mut columns = HashSet::new();
        let mut outputs = HashSet::new();
        for column in &self.columns {
            if !columns.insert(column.name.as_str()) {
                bail!("Column '{}' is declared more than once", column.name);
            }
            if !outputs.insert(column.output_name()) {
                bail!("Output field '{}' is declared more than once", column.output_name());
            }
        }
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&SchemaColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Record produced from a schema: output field names with their typed values,
/// in the order they were set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRecord {
    values: Vec<(String, FieldValue)>,
}

impl DynamicRecord {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn set(&mut self, field: &str, value: FieldValue) {
        match self.values.iter_mut().find(|(name, _)| name == field) {
            Some(slot) => slot.1 = value,
            None => self.values.push((field.to_string(), value)),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for DynamicRecord {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

pub fn map_dynamic(
    result: &QueryResult,
    schema: &DynamicSchema,
    config: &MapperConfig,
) -> Result<Vec<DynamicRecord>> {
    check_errors(result)?;
    let coercer = ValueCoercer::with_precision(config.precision);
    let bound: HashMap<&str, &SchemaColumn> = schema
        .columns
        .iter()
        .map(|column| (column.name.as_str(), column))
        .collect();

    let mut records = Vec::new();
    for series in result
        .series
        .iter()
        .filter(|s| s.name == schema.measurement)
    {
        walk_series(
            series,
            config.apply_tags,
            |column| bound.get(column).copied(),
            || Ok(DynamicRecord::default()),
            |record, column, raw| {
                let coerced =
                    coercer.coerce(&schema.measurement, column.output_name(), column.kind, raw)?;
                if let Some(value) = coerced {
                    record.set(column.output_name(), value);
                }
                Ok(())
            },
            &mut records,
        )?;
    }
    Ok(records)
}
