//! Typed document values as stored in the database.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Field name to value, ordered so that documents print and encode stably.
pub type Fields = BTreeMap<String, FieldValue>;

/// A reference to another document, stored as its path below the database's
/// document root (e.g. `knowledge/k1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    path: String,
}

impl DocumentRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn to(collection: &str, id: &str) -> Self {
        Self::new(format!("{collection}/{id}"))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The referenced document's identifier (last path segment).
    pub fn id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// The collection the referenced document lives in.
    pub fn collection(&self) -> Option<&str> {
        let mut segments = self.path.rsplit('/');
        segments.next();
        segments.next()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(DateTime<Utc>),
    String(String),
    /// Base64 text, kept opaque.
    Bytes(String),
    Reference(DocumentRef),
    GeoPoint { latitude: f64, longitude: f64 },
    Array(Vec<FieldValue>),
    Map(Fields),
}

impl FieldValue {
    /// Numeric view of the value. Only integers and doubles have one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&DocumentRef> {
        match self {
            FieldValue::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// Converts a JSON payload value. Integers that fit `i64` stay integers;
    /// every other number becomes a double.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => FieldValue::String(s.clone()),
            Value::Array(values) => FieldValue::Array(values.iter().map(Self::from_json).collect()),
            Value::Object(map) => FieldValue::Map(
                map.iter()
                    .map(|(name, value)| (name.clone(), Self::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Orders two values the way query filters do.
    ///
    /// Integers and doubles compare numerically with each other; every other
    /// type only compares with itself. `None` means the values are not
    /// comparable and a filter between them never matches.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => Some(Ordering::Equal),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
            (FieldValue::String(a), FieldValue::String(b)) => Some(a.cmp(b)),
            (FieldValue::Reference(a), FieldValue::Reference(b)) => Some(a.path.cmp(&b.path)),
            (a, b) => a.as_number()?.partial_cmp(&b.as_number()?),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl From<DocumentRef> for FieldValue {
    fn from(value: DocumentRef) -> Self {
        FieldValue::Reference(value)
    }
}

impl From<Fields> for FieldValue {
    fn from(value: Fields) -> Self {
        FieldValue::Map(value)
    }
}

/// A document read from a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Looks up a dotted field path (`quarter.month`) through nested maps.
    pub fn get(&self, path: &str) -> Option<&FieldValue> {
        lookup(&self.fields, path)
    }

    /// The numeric value at `path`. Absent, null and non-numeric values are
    /// all `None`.
    pub fn number(&self, path: &str) -> Option<f64> {
        self.get(path)?.as_number()
    }

    pub fn reference(&self, path: &str) -> Option<&DocumentRef> {
        self.get(path)?.as_reference()
    }
}

pub(crate) fn lookup<'a>(fields: &'a Fields, path: &str) -> Option<&'a FieldValue> {
    let mut segments = path.split('.');
    let mut current = fields.get(segments.next()?)?;
    for segment in segments {
        match current {
            FieldValue::Map(inner) => current = inner.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}
