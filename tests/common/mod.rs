#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use influx_mapper::{FieldSet, Record};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Record covering every supported field kind plus one unbound field.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CustomMeasurement {
    pub time: Option<DateTime<Utc>>,
    pub uuid: Option<String>,
    pub double_object: Option<f64>,
    pub long_object: Option<i64>,
    pub integer_object: Option<i32>,
    pub double_primitive: f64,
    pub long_primitive: i64,
    pub integer_primitive: i32,
    pub boolean_object: Option<bool>,
    pub boolean_primitive: bool,
    pub non_column: Option<String>,
}

impl Record for CustomMeasurement {
    fn measurement() -> Option<&'static str> {
        Some("CustomMeasurement")
    }

    fn declare(fields: &mut FieldSet<Self>) {
        fields
            .instant_object("time", "time", |r, v| r.time = Some(v))
            .text_object("uuid", "uuid", |r, v| r.uuid = Some(v))
            .float_object("double_object", "doubleObject", |r, v| {
                r.double_object = Some(v)
            })
            .long_object("long_object", "longObject", |r, v| r.long_object = Some(v))
            .int_object("integer_object", "integerObject", |r, v| {
                r.integer_object = Some(v)
            })
            .float("double_primitive", "doublePrimitive", |r, v| {
                r.double_primitive = v
            })
            .long("long_primitive", "longPrimitive", |r, v| r.long_primitive = v)
            .int("integer_primitive", "integerPrimitive", |r, v| {
                r.integer_primitive = v
            })
            .bool_object("boolean_object", "booleanObject", |r, v| {
                r.boolean_object = Some(v)
            })
            .bool("boolean_primitive", "booleanPrimitive", |r, v| {
                r.boolean_primitive = v
            });
    }

    fn instantiate() -> Result<Self, String> {
        Ok(Self::default())
    }
}

/// Record binding a column to a field type with no coercion rule.
#[derive(Debug, Default)]
pub struct WithUnsupportedField {
    pub my_date: Option<chrono::NaiveDate>,
}

impl Record for WithUnsupportedField {
    fn measurement() -> Option<&'static str> {
        Some("foo")
    }

    fn declare(fields: &mut FieldSet<Self>) {
        fields.unsupported("my_date", "bar", "chrono::NaiveDate");
    }

    fn instantiate() -> Result<Self, String> {
        Ok(Self::default())
    }
}

/// Record that never declared a measurement.
#[derive(Debug, Default)]
pub struct Undeclared {
    pub value: f64,
}

impl Record for Undeclared {
    fn measurement() -> Option<&'static str> {
        None
    }

    fn declare(fields: &mut FieldSet<Self>) {
        fields.float("value", "value", |r, v| r.value = v);
    }

    fn instantiate() -> Result<Self, String> {
        Ok(Self::default())
    }
}
