//! Column element types and the one-dimensional vectors that hold them.
//!
//! Date and time values are stored as microseconds, since the Unix epoch for
//! [`DataType::DateTime`] and as a plain duration for [`DataType::TimeDelta`].
//! A missing date or time is the [`NAT`] sentinel, in the same way that a
//! missing float is `NaN`.

use std::fmt::{self, Display};
use std::ops::Range;

use chrono::{DateTime, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// "Not a time": missing value sentinel for date and time columns.
pub const NAT: i64 = i64::MIN;

/// Element type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    DateTime,
    TimeDelta,
}

impl DataType {
    pub fn name(self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Text => "text",
            DataType::Bytes => "bytes",
            DataType::DateTime => "datetime",
            DataType::TimeDelta => "timedelta",
        }
    }

    pub fn is_numeric(self) -> bool {
        self.numeric_rank().is_some()
    }

    fn numeric_rank(self) -> Option<u8> {
        match self {
            DataType::Bool => Some(0),
            DataType::Int => Some(1),
            DataType::Float => Some(2),
            _ => None,
        }
    }

    /// Returns the type that can hold values of both `self` and `other`, if
    /// there is one.  Only numeric types promote (`bool < int < float`).
    pub fn promote(self, other: DataType) -> Option<DataType> {
        if self == other {
            return Some(self);
        }
        match (self.numeric_rank(), other.numeric_rank()) {
            (Some(a), Some(b)) => Some(if a >= b { self } else { other }),
            _ => None,
        }
    }

    /// Type of the filler used in place of a missing column of this type.
    /// Numeric columns are filled with `NaN` and therefore become floats.
    pub fn fill_type(self) -> DataType {
        match self {
            DataType::Bool | DataType::Int | DataType::Float => DataType::Float,
            other => other,
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single dynamically typed value.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
    TimeDelta(TimeDelta),
    /// Missing date or time.
    Null,
}

impl Scalar {
    /// Column type of the value, `None` for [`Scalar::Null`].
    pub fn dtype(&self) -> Option<DataType> {
        match self {
            Scalar::Bool(_) => Some(DataType::Bool),
            Scalar::Int(_) => Some(DataType::Int),
            Scalar::Float(_) => Some(DataType::Float),
            Scalar::Text(_) => Some(DataType::Text),
            Scalar::Bytes(_) => Some(DataType::Bytes),
            Scalar::DateTime(_) => Some(DataType::DateTime),
            Scalar::TimeDelta(_) => Some(DataType::TimeDelta),
            Scalar::Null => None,
        }
    }

    fn type_name(&self) -> &'static str {
        self.dtype().map_or("null", DataType::name)
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(v) => write!(f, "{v}"),
            Scalar::Bytes(v) => write!(f, "{}", String::from_utf8_lossy(v)),
            Scalar::DateTime(v) => write!(f, "{v}"),
            Scalar::TimeDelta(v) => write!(f, "{v}"),
            Scalar::Null => f.write_str("NaT"),
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Scalar {
            fn from(value: $ty) -> Self {
                Scalar::$variant(value.into())
            }
        })*
    };
}

scalar_from! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    f64 => Float,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
    NaiveDateTime => DateTime,
    TimeDelta => TimeDelta,
}

fn datetime_to_micros(value: &NaiveDateTime) -> i64 {
    value.and_utc().timestamp_micros()
}

fn micros_to_datetime(value: i64) -> Scalar {
    if value == NAT {
        return Scalar::Null;
    }
    DateTime::from_timestamp_micros(value).map_or(Scalar::Null, |dt| {
        Scalar::DateTime(dt.naive_utc())
    })
}

fn timedelta_to_micros(value: &TimeDelta) -> i64 {
    value.num_microseconds().unwrap_or(NAT)
}

fn micros_to_timedelta(value: i64) -> Scalar {
    if value == NAT {
        Scalar::Null
    } else {
        Scalar::TimeDelta(TimeDelta::microseconds(value))
    }
}

/// One column worth of values.
///
/// Always one-dimensional; the variant determines the [`DataType`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
    Text(Vec<String>),
    Bytes(Vec<Vec<u8>>),
    DateTime(Vec<i64>),
    TimeDelta(Vec<i64>),
}

/// Applies `$body` to the vector inside `$data`, bound as `$v`.
macro_rules! with_values {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ColumnData::Bool($v) => $body,
            ColumnData::Int($v) => $body,
            ColumnData::Float($v) => $body,
            ColumnData::Text($v) => $body,
            ColumnData::Bytes($v) => $body,
            ColumnData::DateTime($v) => $body,
            ColumnData::TimeDelta($v) => $body,
        }
    };
}

/// Like [`with_values`], but wraps the vector produced by `$body` back into
/// the same variant.
macro_rules! map_values {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ColumnData::Bool($v) => ColumnData::Bool($body),
            ColumnData::Int($v) => ColumnData::Int($body),
            ColumnData::Float($v) => ColumnData::Float($body),
            ColumnData::Text($v) => ColumnData::Text($body),
            ColumnData::Bytes($v) => ColumnData::Bytes($body),
            ColumnData::DateTime($v) => ColumnData::DateTime($body),
            ColumnData::TimeDelta($v) => ColumnData::TimeDelta($body),
        }
    };
}

impl ColumnData {
    /// An empty column of type `dtype`.
    pub fn empty(dtype: DataType) -> Self {
        match dtype {
            DataType::Bool => ColumnData::Bool(Vec::new()),
            DataType::Int => ColumnData::Int(Vec::new()),
            DataType::Float => ColumnData::Float(Vec::new()),
            DataType::Text => ColumnData::Text(Vec::new()),
            DataType::Bytes => ColumnData::Bytes(Vec::new()),
            DataType::DateTime => ColumnData::DateTime(Vec::new()),
            DataType::TimeDelta => ColumnData::TimeDelta(Vec::new()),
        }
    }

    /// A column of `len` fill values standing in for a column of type
    /// `dtype`: `NaN` for numbers, empty strings, and [`NAT`] for dates and
    /// times.
    pub fn filled(dtype: DataType, len: usize) -> Self {
        match dtype.fill_type() {
            DataType::Text => ColumnData::Text(vec![String::new(); len]),
            DataType::Bytes => ColumnData::Bytes(vec![Vec::new(); len]),
            DataType::DateTime => ColumnData::DateTime(vec![NAT; len]),
            DataType::TimeDelta => ColumnData::TimeDelta(vec![NAT; len]),
            _ => ColumnData::Float(vec![f64::NAN; len]),
        }
    }

    /// Builds a column from loosely typed values.
    ///
    /// The element type is taken from the first value, every other value
    /// must have the same type.  No values give an empty float column.
    pub fn from_objects(values: Vec<Scalar>) -> Result<Self> {
        let Some(first) = values.first() else {
            return Ok(ColumnData::Float(Vec::new()));
        };
        let dtype = first.dtype().ok_or_else(|| {
            Error::InvalidColumnType("can not infer a column type from a missing value".into())
        })?;
        let mut data = ColumnData::empty(dtype);
        for (i, value) in values.into_iter().enumerate() {
            data.push(value).map_err(|value| {
                Error::InvalidColumnType(format!(
                    "element {i} is {} in a column of {dtype} values",
                    value.type_name()
                ))
            })?;
        }
        Ok(data)
    }

    /// Appends `value` if it has the column's type, returning it otherwise.
    /// Missing values are accepted by date and time columns.
    fn push(&mut self, value: Scalar) -> std::result::Result<(), Scalar> {
        match (self, value) {
            (ColumnData::Bool(v), Scalar::Bool(x)) => v.push(x),
            (ColumnData::Int(v), Scalar::Int(x)) => v.push(x),
            (ColumnData::Float(v), Scalar::Float(x)) => v.push(x),
            (ColumnData::Text(v), Scalar::Text(x)) => v.push(x),
            (ColumnData::Bytes(v), Scalar::Bytes(x)) => v.push(x),
            (ColumnData::DateTime(v), Scalar::DateTime(x)) => v.push(datetime_to_micros(&x)),
            (ColumnData::TimeDelta(v), Scalar::TimeDelta(x)) => v.push(timedelta_to_micros(&x)),
            (ColumnData::DateTime(v) | ColumnData::TimeDelta(v), Scalar::Null) => v.push(NAT),
            (_, value) => return Err(value),
        }
        Ok(())
    }

    pub fn dtype(&self) -> DataType {
        match self {
            ColumnData::Bool(_) => DataType::Bool,
            ColumnData::Int(_) => DataType::Int,
            ColumnData::Float(_) => DataType::Float,
            ColumnData::Text(_) => DataType::Text,
            ColumnData::Bytes(_) => DataType::Bytes,
            ColumnData::DateTime(_) => DataType::DateTime,
            ColumnData::TimeDelta(_) => DataType::TimeDelta,
        }
    }

    pub fn len(&self) -> usize {
        with_values!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at row `index`.
    pub fn value(&self, index: usize) -> Option<Scalar> {
        if index >= self.len() {
            return None;
        }
        Some(match self {
            ColumnData::Bool(v) => Scalar::Bool(v[index]),
            ColumnData::Int(v) => Scalar::Int(v[index]),
            ColumnData::Float(v) => Scalar::Float(v[index]),
            ColumnData::Text(v) => Scalar::Text(v[index].clone()),
            ColumnData::Bytes(v) => Scalar::Bytes(v[index].clone()),
            ColumnData::DateTime(v) => micros_to_datetime(v[index]),
            ColumnData::TimeDelta(v) => micros_to_timedelta(v[index]),
        })
    }

    /// Gathers the rows at `indices`, which must all be in range.
    pub fn take(&self, indices: &[usize]) -> Self {
        map_values!(self, v => indices.iter().map(|&i| v[i].clone()).collect())
    }

    /// Contiguous rows in `range`, which must be in range.
    pub fn slice(&self, range: Range<usize>) -> Self {
        map_values!(self, v => v[range].to_vec())
    }

    /// Converts to `dtype`, allowing only widening numeric conversions.
    pub fn cast(&self, dtype: DataType) -> Result<Self> {
        let mismatch = || Error::ColumnTypeMismatch {
            expected: dtype,
            found: self.dtype(),
        };
        if self.dtype() == dtype {
            return Ok(self.clone());
        }
        if self.dtype().promote(dtype) != Some(dtype) {
            return Err(mismatch());
        }
        Ok(match (self, dtype) {
            (ColumnData::Bool(v), DataType::Int) => {
                ColumnData::Int(v.iter().map(|&x| i64::from(x)).collect())
            }
            (ColumnData::Bool(v), DataType::Float) => {
                ColumnData::Float(v.iter().map(|&x| f64::from(u8::from(x))).collect())
            }
            (ColumnData::Int(v), DataType::Float) => {
                ColumnData::Float(v.iter().map(|&x| x as f64).collect())
            }
            _ => return Err(mismatch()),
        })
    }

    /// Concatenates `parts` in order, promoting numeric types to their common
    /// type.  Mixing non-numeric types is an error.
    pub fn concat(parts: &[ColumnData]) -> Result<Self> {
        let Some(first) = parts.first() else {
            return Ok(ColumnData::Float(Vec::new()));
        };
        let mut dtype = first.dtype();
        for part in &parts[1..] {
            dtype = dtype
                .promote(part.dtype())
                .ok_or(Error::ColumnTypeMismatch {
                    expected: dtype,
                    found: part.dtype(),
                })?;
        }
        let mut result = ColumnData::empty(dtype);
        for part in parts {
            result.extend(part.cast(dtype)?);
        }
        Ok(result)
    }

    /// Appends `other`, which must have the same type.
    fn extend(&mut self, other: ColumnData) {
        match (self, other) {
            (ColumnData::Bool(a), ColumnData::Bool(b)) => a.extend(b),
            (ColumnData::Int(a), ColumnData::Int(b)) => a.extend(b),
            (ColumnData::Float(a), ColumnData::Float(b)) => a.extend(b),
            (ColumnData::Text(a), ColumnData::Text(b)) => a.extend(b),
            (ColumnData::Bytes(a), ColumnData::Bytes(b)) => a.extend(b),
            (ColumnData::DateTime(a), ColumnData::DateTime(b)) => a.extend(b),
            (ColumnData::TimeDelta(a), ColumnData::TimeDelta(b)) => a.extend(b),
            (a, b) => unreachable!("extend {} with {}", a.dtype(), b.dtype()),
        }
    }

    /// Overwrites the rows at `indices` with `values`, converted to this
    /// column's type.
    pub fn assign(&mut self, indices: &[usize], values: &ColumnData) -> Result<()> {
        if indices.len() != values.len() {
            return Err(Error::ShapeMismatch {
                expected: (indices.len(), 1),
                found: (values.len(), 1),
            });
        }
        let values = values.cast(self.dtype())?;
        match (self, values) {
            (ColumnData::Bool(a), ColumnData::Bool(b)) => scatter(a, indices, b),
            (ColumnData::Int(a), ColumnData::Int(b)) => scatter(a, indices, b),
            (ColumnData::Float(a), ColumnData::Float(b)) => scatter(a, indices, b),
            (ColumnData::Text(a), ColumnData::Text(b)) => scatter(a, indices, b),
            (ColumnData::Bytes(a), ColumnData::Bytes(b)) => scatter(a, indices, b),
            (ColumnData::DateTime(a), ColumnData::DateTime(b)) => scatter(a, indices, b),
            (ColumnData::TimeDelta(a), ColumnData::TimeDelta(b)) => scatter(a, indices, b),
            (a, b) => unreachable!("assign {} to {}", b.dtype(), a.dtype()),
        }
        Ok(())
    }

    /// Interprets the column as integer group labels.
    ///
    /// Float columns qualify when every value is a whole number.  `NaN` is
    /// not a label.
    pub fn to_index(&self) -> Result<Vec<i64>> {
        match self {
            ColumnData::Int(v) => Ok(v.clone()),
            ColumnData::Bool(v) => Ok(v.iter().map(|&x| i64::from(x)).collect()),
            ColumnData::Float(v) => v
                .iter()
                .map(|&x| {
                    if x.is_finite() && x.fract() == 0.0 {
                        Ok(x as i64)
                    } else {
                        Err(Error::InvalidIndex(format!("{x} is not a whole number")))
                    }
                })
                .collect(),
            other => Err(Error::InvalidIndex(format!(
                "{} column can not be used as an index",
                other.dtype()
            ))),
        }
    }
}

fn scatter<T>(target: &mut [T], indices: &[usize], values: Vec<T>) {
    for (&i, value) in indices.iter().zip(values) {
        target[i] = value;
    }
}

macro_rules! data_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<Vec<$ty>> for ColumnData {
            fn from(value: Vec<$ty>) -> Self {
                ColumnData::$variant(value)
            }
        })*
    };
}

data_from! {
    bool => Bool,
    i64 => Int,
    f64 => Float,
    String => Text,
    Vec<u8> => Bytes,
}

impl From<Vec<&str>> for ColumnData {
    fn from(value: Vec<&str>) -> Self {
        ColumnData::Text(value.into_iter().map(str::to_owned).collect())
    }
}
