//! Firestore's tagged JSON value encoding.
//!
//! Every value is an object with exactly one key naming its type, e.g.
//! `{"integerValue": "3"}` or `{"mapValue": {"fields": {...}}}`. Integers
//! travel as decimal strings.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::store::{Document, DocumentRef, FieldValue, Fields};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum WireValue {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String),
    #[serde(with = "double")]
    DoubleValue(f64),
    TimestampValue(DateTime<Utc>),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(WireLatLng),
    ArrayValue(WireArray),
    MapValue(WireMap),
}

/// `doubleValue` is a JSON number, except that NaN and the infinities travel
/// as the strings `"NaN"`, `"Infinity"` and `"-Infinity"`.
mod double {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub(super) fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "Infinity" } else { "-Infinity" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(text) => match text.as_str() {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid doubleValue '{other}'"))),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WireLatLng {
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WireArray {
    #[serde(default)]
    values: Vec<WireValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WireMap {
    #[serde(default)]
    fields: BTreeMap<String, WireValue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireDocument {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) fields: BTreeMap<String, WireValue>,
}

impl WireDocument {
    pub(crate) fn into_document(self) -> Result<Document> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let fields = decode_fields(self.fields)
            .with_context(|| format!("failed to decode document '{}'", self.name))?;
        Ok(Document::new(id, fields))
    }
}

/// Strips `projects/{p}/databases/{d}/documents/` from a resource name.
pub(crate) fn relative_path(name: &str) -> &str {
    name.split_once("/documents/")
        .map(|(_, rest)| rest)
        .unwrap_or(name)
}

pub(crate) fn decode(value: WireValue) -> Result<FieldValue> {
    Ok(match value {
        WireValue::NullValue(()) => FieldValue::Null,
        WireValue::BooleanValue(b) => FieldValue::Boolean(b),
        WireValue::IntegerValue(s) => FieldValue::Integer(
            s.parse()
                .with_context(|| format!("invalid integerValue '{s}'"))?,
        ),
        WireValue::DoubleValue(d) => FieldValue::Double(d),
        WireValue::TimestampValue(ts) => FieldValue::Timestamp(ts),
        WireValue::StringValue(s) => FieldValue::String(s),
        WireValue::BytesValue(b) => FieldValue::Bytes(b),
        WireValue::ReferenceValue(name) => {
            FieldValue::Reference(DocumentRef::new(relative_path(&name)))
        }
        WireValue::GeoPointValue(p) => FieldValue::GeoPoint {
            latitude: p.latitude,
            longitude: p.longitude,
        },
        WireValue::ArrayValue(a) => FieldValue::Array(
            a.values
                .into_iter()
                .map(decode)
                .collect::<Result<Vec<_>>>()?,
        ),
        WireValue::MapValue(m) => FieldValue::Map(decode_fields(m.fields)?),
    })
}

pub(crate) fn decode_fields(fields: BTreeMap<String, WireValue>) -> Result<Fields> {
    fields
        .into_iter()
        .map(|(name, value)| decode(value).map(|value| (name, value)))
        .collect()
}

/// Encodes a value; references are expanded against `root`
/// (`projects/{p}/databases/{d}/documents`).
pub(crate) fn encode(value: &FieldValue, root: &str) -> WireValue {
    match value {
        FieldValue::Null => WireValue::NullValue(()),
        FieldValue::Boolean(b) => WireValue::BooleanValue(*b),
        FieldValue::Integer(i) => WireValue::IntegerValue(i.to_string()),
        FieldValue::Double(d) => WireValue::DoubleValue(*d),
        FieldValue::Timestamp(ts) => WireValue::TimestampValue(*ts),
        FieldValue::String(s) => WireValue::StringValue(s.clone()),
        FieldValue::Bytes(b) => WireValue::BytesValue(b.clone()),
        FieldValue::Reference(r) => WireValue::ReferenceValue(format!("{root}/{}", r.path())),
        FieldValue::GeoPoint {
            latitude,
            longitude,
        } => WireValue::GeoPointValue(WireLatLng {
            latitude: *latitude,
            longitude: *longitude,
        }),
        FieldValue::Array(values) => WireValue::ArrayValue(WireArray {
            values: values.iter().map(|v| encode(v, root)).collect(),
        }),
        FieldValue::Map(fields) => WireValue::MapValue(WireMap {
            fields: encode_fields(fields, root),
        }),
    }
}

pub(crate) fn encode_fields(fields: &Fields, root: &str) -> BTreeMap<String, WireValue> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), encode(value, root)))
        .collect()
}
