//! Detection of columns that only hold fill values.
//!
//! A vertical join fills in for missing columns, see
//! [`ColumnData::filled`].  A vertical split can drop such columns again.
//! Which values count as fill depends on the column type only:
//!
//! | type               | fill value  |
//! |--------------------|-------------|
//! | text               | `""`        |
//! | bytes              | empty       |
//! | float              | `NaN`       |
//! | datetime/timedelta | [`NAT`]     |
//! | bool/int           | none        |
//!
//! A column without rows is always fill.

use crate::data::{ColumnData, DataType, NAT};

/// Predicate for a single fill value, per column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    EmptyText,
    EmptyBytes,
    NotANumber,
    NotATime,
    /// Integers and booleans have no fill value.
    Never,
}

impl FillRule {
    pub fn for_type(dtype: DataType) -> Self {
        match dtype {
            DataType::Text => FillRule::EmptyText,
            DataType::Bytes => FillRule::EmptyBytes,
            DataType::Float => FillRule::NotANumber,
            DataType::DateTime | DataType::TimeDelta => FillRule::NotATime,
            DataType::Bool | DataType::Int => FillRule::Never,
        }
    }
}

/// True if every value of `data` is a fill value.
pub fn is_fill(data: &ColumnData) -> bool {
    if data.is_empty() {
        return true;
    }
    match (FillRule::for_type(data.dtype()), data) {
        (FillRule::EmptyText, ColumnData::Text(values)) => values.iter().all(String::is_empty),
        (FillRule::EmptyBytes, ColumnData::Bytes(values)) => values.iter().all(Vec::is_empty),
        (FillRule::NotANumber, ColumnData::Float(values)) => values.iter().all(|v| v.is_nan()),
        (FillRule::NotATime, ColumnData::DateTime(values) | ColumnData::TimeDelta(values)) => {
            values.iter().all(|&v| v == NAT)
        }
        _ => false,
    }
}
