// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Read-only span and resource model handed to the converter.
//!
//! The tracing SDK owns these values. The converter only borrows them, so every type here is
//! plain data with serde support for feeding spans from JSON files.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// A dynamically typed attribute value.
///
/// Scalars (`Bool`, `I64`, `F64`, `String`) can be indexed as annotations, compound values
/// (`Array`, `Map`) only ever land in metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Array(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            AttributeValue::Bool(_)
                | AttributeValue::I64(_)
                | AttributeValue::F64(_)
                | AttributeValue::String(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Renders a scalar as text. Numbers and booleans are formatted, compound values have no
    /// textual form.
    pub fn to_text(&self) -> Option<Cow<'_, str>> {
        match self {
            AttributeValue::String(value) => Some(Cow::Borrowed(value)),
            AttributeValue::Bool(value) => Some(Cow::Owned(value.to_string())),
            AttributeValue::I64(value) => Some(Cow::Owned(value.to_string())),
            AttributeValue::F64(value) => Some(Cow::Owned(value.to_string())),
            AttributeValue::Array(_) | AttributeValue::Map(_) => None,
        }
    }

    /// Reads the value as an integer, accepting numeric strings and whole floats in range.
    /// Anything else yields `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::I64(value) => Some(*value),
            // NaN and infinities fail the fract check
            AttributeValue::F64(value)
                if value.fract() == 0.0
                    && *value >= i64::MIN as f64
                    && *value < i64::MAX as f64 =>
            {
                Some(*value as i64)
            }
            AttributeValue::String(value) => value.trim().parse::<i64>().ok(),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::I64(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::I64(i64::from(value))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::F64(value)
    }
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(values: Vec<T>) -> Self {
        AttributeValue::Array(values.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: AttributeValue,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Process-wide attributes describing the entity producing spans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub attributes: Vec<KeyValue>,
}

impl Resource {
    pub fn new(attributes: impl IntoIterator<Item = KeyValue>) -> Self {
        Resource {
            attributes: attributes.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Resource::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    #[default]
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "lowercase")]
pub enum Status {
    #[default]
    Unset,
    Ok,
    Error {
        #[serde(default)]
        description: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub time_unix_nano: u64,
    #[serde(default)]
    pub attributes: Vec<KeyValue>,
}

impl Event {
    pub fn new(name: impl Into<String>, attributes: Vec<KeyValue>) -> Self {
        Event {
            name: name.into(),
            time_unix_nano: 0,
            attributes,
        }
    }
}

/// A finished span as recorded by the tracing SDK.
///
/// `parent_span_id` is zero for spans without a parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(with = "hex_u128")]
    pub trace_id: u128,
    #[serde(with = "hex_u64")]
    pub span_id: u64,
    #[serde(default, with = "hex_u64")]
    pub parent_span_id: u64,
    #[serde(default)]
    pub kind: SpanKind,
    pub name: String,
    #[serde(default)]
    pub operation_name: Option<String>,
    pub start_time_unix_nano: u64,
    pub end_time_unix_nano: u64,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub attributes: Vec<KeyValue>,
}

impl Span {
    pub fn has_parent(&self) -> bool {
        self.parent_span_id != 0
    }

    /// The operation name, falling back to the display name.
    pub fn operation_name(&self) -> &str {
        self.operation_name.as_deref().unwrap_or(&self.name)
    }

    pub fn start_time_secs(&self) -> f64 {
        self.start_time_unix_nano as f64 / 1e9
    }

    pub fn end_time_secs(&self) -> f64 {
        self.end_time_unix_nano as f64 / 1e9
    }
}

/// A batch of spans sharing one resource, the unit the forwarder reads from its input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub resource: Resource,
    #[serde(default)]
    pub spans: Vec<Span>,
}

mod hex_u128 {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:032x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let text = String::deserialize(deserializer)?;
        u128::from_str_radix(&text, 16).map_err(D::Error::custom)
    }
}

mod hex_u64 {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:016x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let text = String::deserialize(deserializer)?;
        u64::from_str_radix(&text, 16).map_err(D::Error::custom)
    }
}
