//! Key/value attributes attached to columns and tables.
//!
//! Attributes carry units, descriptions and other small annotations.  They
//! are a flat map from unicode keys to unicode-representable scalars;
//! anything else is rejected when the map is built, not when it is written.

use std::fmt::{self, Display};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::data::Scalar;
use crate::error::{Error, Result};

/// A single attribute value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(v) => write!(f, "{v}"),
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_owned())
    }
}

/// Ordered attribute map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(IndexMap<String, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds attributes from loosely typed pairs, applying the key and
    /// string guards: keys must be text, or bytes that decode as UTF-8;
    /// values must be booleans, numbers, text or UTF-8 bytes.
    pub fn try_from_pairs<K, V, I>(pairs: I) -> Result<Self>
    where
        K: Into<Scalar>,
        V: Into<Scalar>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut attributes = Self::new();
        for (key, value) in pairs {
            let key = key_guard(key.into())?;
            let value = value_guard(&key, value.into())?;
            attributes.0.insert(key, value);
        }
        Ok(attributes)
    }

    /// Builds attributes from a JSON object whose values are all scalars.
    pub fn try_from_json(value: &JsonValue) -> Result<Self> {
        let JsonValue::Object(map) = value else {
            return Err(Error::InvalidAttributeKey(format!(
                "expected an object of attributes, got {value}"
            )));
        };
        let mut attributes = Self::new();
        for (key, value) in map {
            let value = match value {
                JsonValue::Bool(v) => AttrValue::Bool(*v),
                JsonValue::String(v) => AttrValue::Text(v.clone()),
                JsonValue::Number(n) => match n.as_i64() {
                    Some(v) => AttrValue::Int(v),
                    None => AttrValue::Float(n.as_f64().ok_or_else(|| {
                        Error::InvalidAttributeValue {
                            key: key.clone(),
                            reason: format!("{n} is not representable"),
                        }
                    })?),
                },
                other => {
                    return Err(Error::InvalidAttributeValue {
                        key: key.clone(),
                        reason: format!("{other} is not a scalar"),
                    })
                }
            };
            attributes.0.insert(key.clone(), value);
        }
        Ok(attributes)
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.0.get(key)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn del_attribute(&mut self, key: &str) -> Option<AttrValue> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Adds every attribute of `other`, which wins on conflicts.
    pub fn merge(&mut self, other: &Attributes) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn key_guard(key: Scalar) -> Result<String> {
    match key {
        Scalar::Text(key) => Ok(key),
        Scalar::Bytes(bytes) => String::from_utf8(bytes).map_err(|e| {
            Error::InvalidAttributeKey(format!("{:?} is not valid UTF-8", e.as_bytes()))
        }),
        other => Err(Error::InvalidAttributeKey(format!("{other} is not a string"))),
    }
}

fn value_guard(key: &str, value: Scalar) -> Result<AttrValue> {
    let invalid = |reason: String| Error::InvalidAttributeValue {
        key: key.to_owned(),
        reason,
    };
    match value {
        Scalar::Bool(v) => Ok(AttrValue::Bool(v)),
        Scalar::Int(v) => Ok(AttrValue::Int(v)),
        Scalar::Float(v) => Ok(AttrValue::Float(v)),
        Scalar::Text(v) => Ok(AttrValue::Text(v)),
        Scalar::Bytes(bytes) => String::from_utf8(bytes)
            .map(AttrValue::Text)
            .map_err(|e| invalid(format!("{:?} is not valid UTF-8", e.as_bytes()))),
        other => Err(invalid(format!("{other} is not a string or a number"))),
    }
}
