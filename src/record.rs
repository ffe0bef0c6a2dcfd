//! Declaration surface for target record types.
//!
//! ```
//! use chrono::{DateTime, Utc};
//! use influx_mapper::record::{FieldSet, Record};
//!
//! #[derive(Debug, Default)]
//! struct Cpu {
//!     time: Option<DateTime<Utc>>,
//!     host: Option<String>,
//!     load: f64,
//! }
//!
//! impl Record for Cpu {
//!     fn measurement() -> Option<&'static str> {
//!         Some("cpu")
//!     }
//!
//!     fn declare(fields: &mut FieldSet<Self>) {
//!         fields
//!             .instant_object("time", "time", |r, v| r.time = Some(v))
//!             .text_object("host", "host", |r, v| r.host = Some(v))
//!             .float("load", "load", |r, v| r.load = v);
//!     }
//!
//!     fn instantiate() -> Result<Self, String> {
//!         Ok(Self::default())
//!     }
//! }
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Semantic kind of a bound field. `*Object` kinds are optional fields that
/// stay `None` until a non-null value arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[serde(alias = "string")]
    Text,
    #[serde(alias = "timestamp", alias = "time")]
    Instant,
    #[serde(alias = "double")]
    Float,
    #[serde(alias = "double_object")]
    FloatObject,
    #[serde(alias = "integer")]
    Int,
    #[serde(alias = "integer_object")]
    IntObject,
    Long,
    LongObject,
    #[serde(alias = "boolean")]
    Bool,
    #[serde(alias = "boolean_object")]
    BoolObject,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Instant => "instant",
            FieldKind::Float => "float",
            FieldKind::FloatObject => "float_object",
            FieldKind::Int => "int",
            FieldKind::IntObject => "int_object",
            FieldKind::Long => "long",
            FieldKind::LongObject => "long_object",
            FieldKind::Bool => "bool",
            FieldKind::BoolObject => "bool_object",
        }
    }

    pub fn rust_type(&self) -> &'static str {
        match self {
            FieldKind::Text => "String",
            FieldKind::Instant => "DateTime<Utc>",
            FieldKind::Float => "f64",
            FieldKind::FloatObject => "Option<f64>",
            FieldKind::Int => "i32",
            FieldKind::IntObject => "Option<i32>",
            FieldKind::Long => "i64",
            FieldKind::LongObject => "Option<i64>",
            FieldKind::Bool => "bool",
            FieldKind::BoolObject => "Option<bool>",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed accessor used to store a coerced value into a record.
///
/// Optional (`*Object`) setters receive the unwrapped value; leaving the
/// field untouched is how null cells are represented.
pub enum FieldSetter<T> {
    Text(fn(&mut T, String)),
    TextObject(fn(&mut T, String)),
    Instant(fn(&mut T, DateTime<Utc>)),
    InstantObject(fn(&mut T, DateTime<Utc>)),
    Float(fn(&mut T, f64)),
    FloatObject(fn(&mut T, f64)),
    Int(fn(&mut T, i32)),
    IntObject(fn(&mut T, i32)),
    Long(fn(&mut T, i64)),
    LongObject(fn(&mut T, i64)),
    Bool(fn(&mut T, bool)),
    BoolObject(fn(&mut T, bool)),
    Unsupported { declared: &'static str },
}

impl<T> FieldSetter<T> {
    pub fn kind(&self) -> Option<FieldKind> {
        let kind = match self {
            FieldSetter::Text(_) | FieldSetter::TextObject(_) => FieldKind::Text,
            FieldSetter::Instant(_) | FieldSetter::InstantObject(_) => FieldKind::Instant,
            FieldSetter::Float(_) => FieldKind::Float,
            FieldSetter::FloatObject(_) => FieldKind::FloatObject,
            FieldSetter::Int(_) => FieldKind::Int,
            FieldSetter::IntObject(_) => FieldKind::IntObject,
            FieldSetter::Long(_) => FieldKind::Long,
            FieldSetter::LongObject(_) => FieldKind::LongObject,
            FieldSetter::Bool(_) => FieldKind::Bool,
            FieldSetter::BoolObject(_) => FieldKind::BoolObject,
            FieldSetter::Unsupported { .. } => return None,
        };
        Some(kind)
    }

    pub fn declared_type(&self) -> &'static str {
        match self {
            FieldSetter::TextObject(_) => "Option<String>",
            FieldSetter::InstantObject(_) => "Option<DateTime<Utc>>",
            FieldSetter::Unsupported { declared } => declared,
            other => other.kind().map(|k| k.rust_type()).unwrap_or("unknown"),
        }
    }
}

impl<T> Clone for FieldSetter<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldSetter<T> {}

impl<T> fmt::Debug for FieldSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldSetter({})", self.declared_type())
    }
}

#[derive(Debug)]
pub struct FieldDecl<T> {
    pub field: &'static str,
    pub column: Option<&'static str>,
    pub setter: FieldSetter<T>,
}

#[derive(Debug)]
pub struct FieldSet<T> {
    decls: Vec<FieldDecl<T>>,
}

impl<T> Default for FieldSet<T> {
    fn default() -> Self {
        FieldSet { decls: Vec::new() }
    }
}

impl<T> FieldSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(
        &mut self,
        field: &'static str,
        column: Option<&'static str>,
        setter: FieldSetter<T>,
    ) -> &mut Self {
        self.decls.push(FieldDecl {
            field,
            column,
            setter,
        });
        self
    }

    pub fn unbound(&mut self, field: &'static str, setter: FieldSetter<T>) -> &mut Self {
        self.declare(field, None, setter)
    }

    pub fn text(
        &mut self,
        field: &'static str,
        column: &'static str,
        set: fn(&mut T, String),
    ) -> &mut Self {
        self.declare(field, Some(column), FieldSetter::Text(set))
    }

    pub fn text_object(
        &mut self,
        field: &'static str,
        column: &'static str,
        set: fn(&mut T, String),
    ) -> &mut Self {
        self.declare(field, Some(column), FieldSetter::TextObject(set))
    }

    pub fn instant(
        &mut self,
        field: &'static str,
        column: &'static str,
        set: fn(&mut T, DateTime<Utc>),
    ) -> &mut Self {
        self.declare(field, Some(column), FieldSetter::Instant(set))
    }

    pub fn instant_object(
        &mut self,
        field: &'static str,
        column: &'static str,
        set: fn(&mut T, DateTime<Utc>),
    ) -> &mut Self {
        self.declare(field, Some(column), FieldSetter::InstantObject(set))
    }

    pub fn float(
        &mut self,
        field: &'static str,
        column: &'static str,
        set: fn(&mut T, f64),
    ) -> &mut Self {
        self.declare(field, Some(column), FieldSetter::Float(set))
    }

    pub fn float_object(
        &mut self,
        field: &'static str,
        column: &'static str,
        set: fn(&mut T, f64),
    ) -> &mut Self {
        self.declare(field, Some(column), FieldSetter::FloatObject(set))
    }

    pub fn int(
        &mut self,
        field: &'static str,
        column: &'static str,
        set: fn(&mut T, i32),
    ) -> &mut Self {
        self.declare(field, Some(column), FieldSetter::Int(set))
    }

    pub fn int_object(
        &mut self,
        field: &'static str,
        column: &'static str,
        set: fn(&mut T, i32),
    ) -> &mut Self {
        self.declare(field, Some(column), FieldSetter::IntObject(set))
    }

    pub fn long(
        &mut self,
        field: &'static str,
        column: &'static str,
        set: fn(&mut T, i64),
    ) -> &mut Self {
        self.declare(field, Some(column), FieldSetter::Long(set))
    }

    pub fn long_object(
        &mut self,
        field: &'static str,
        column: &'static str,
        set: fn(&mut T, i64),
    ) -> &mut Self {
        self.declare(field, Some(column), FieldSetter::LongObject(set))
    }

    pub fn bool(
        &mut self,
        field: &'static str,
        column: &'static str,
        set: fn(&mut T, bool),
    ) -> &mut Self {
        self.declare(field, Some(column), FieldSetter::Bool(set))
    }

    pub fn bool_object(
        &mut self,
        field: &'static str,
        column: &'static str,
        set: fn(&mut T, bool),
    ) -> &mut Self {
        self.declare(field, Some(column), FieldSetter::BoolObject(set))
    }

    pub fn unsupported(
        &mut self,
        field: &'static str,
        column: &'static str,
        declared: &'static str,
    ) -> &mut Self {
        self.declare(field, Some(column), FieldSetter::Unsupported { declared })
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn into_decls(self) -> Vec<FieldDecl<T>> {
        self.decls
    }
}

/// A type that query result rows can be mapped into.
pub trait Record: Sized + Send + 'static {
    /// Name of the series this type is built from. `None` means the type was
    /// never declared as a measurement and cannot be mapped.
    fn measurement() -> Option<&'static str>;

    fn declare(fields: &mut FieldSet<Self>);

    fn instantiate() -> Result<Self, String>;

    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}
