use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::io::ErrorKind;
use thiserror::Error;

use crate::data::DataType;

/// An error raised by the container layer.
///
/// Errors fall into four families (see [`ErrorFamily`]).  None of them are
/// recovered from internally: validation happens eagerly where data is
/// mutated and everything propagates to the caller.
#[derive(Clone, Debug, Error, PartialEq, Serialize)]
pub enum Error {
    /// Writeback was attempted to a destination that does not accept writes.
    #[error("Cannot write back to a read-only destination.")]
    WritebackReadOnly,

    /// Writeback violated the datasource protocol.
    #[error("Writeback failed: {0}")]
    Writeback(String),

    /// A visitor was applied to a kind of group it does not handle.
    #[error("{visitor} does not support {variant} groups")]
    UnsupportedVariant {
        visitor: &'static str,
        variant: &'static str,
    },

    /// Column name can not be stored.
    #[error("Invalid column name {0:?}.")]
    InvalidColumnName(String),

    /// Attribute key is not a unicode string.
    #[error("Invalid attribute key: {0}.")]
    InvalidAttributeKey(String),

    /// Attribute value is not a unicode representable scalar.
    #[error("Invalid value for attribute {key:?}: {reason}.")]
    InvalidAttributeValue { key: String, reason: String },

    /// Values can not be stored as a single column type.
    #[error("Unsupported column values: {0}.")]
    InvalidColumnType(String),

    /// Column length does not match the number of rows of the table.
    #[error("Column {name:?} has {found} rows, the table has {expected}.")]
    ColumnLength {
        name: String,
        expected: usize,
        found: usize,
    },

    /// Column data can not be converted to the required type.
    #[error("Can not combine {found} data with {expected} data.")]
    ColumnTypeMismatch { expected: DataType, found: DataType },

    /// Malformed row or column selection.
    #[error("Invalid selection: {0}.")]
    InvalidSelection(String),

    /// Assignment through a slice with negative step.
    #[error("Assignment requires a non-negative slice step.")]
    NegativeStep,

    /// Container type differs from the declared type.
    #[error("Expected container of type {expected}, got {found}.")]
    TypeMismatch { expected: String, found: String },

    /// Assigned table has the wrong shape (rows, columns).
    #[error("Expected shape {expected:?}, got {found:?}.")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Column can not be used as an index.
    #[error("Invalid index column {0:?}.")]
    InvalidIndex(String),

    /// Missing column.
    #[error("No column named {0:?}.")]
    ColumnNotFound(String),

    /// Missing key in a keyed container or datasource.
    #[error("No item with key {0:?}.")]
    KeyNotFound(String),

    /// Positional access outside of a container.
    #[error("Index {index} is out of range for length {len}.")]
    IndexOutOfRange { index: isize, len: usize },

    /// I/O error.
    #[error("{0}")]
    #[serde(serialize_with = "serialize_io_error")]
    StdIo(ErrorKind),

    /// Failed to serialize stored data.
    #[error("Failed to encode: {0}")]
    Encode(String),

    /// Failed to deserialize stored data.
    #[error("Failed to decode: {0}")]
    Decode(String),

    /// Malformed configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Classification of [`Error`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorFamily {
    /// Programming errors: misuse of the protocol between containers and
    /// datasources.
    Contract,
    /// Bad names, values, shapes or types supplied by the caller.
    Validation,
    /// Missing columns, keys or positions.
    Lookup,
    /// Failures of the backing store.
    Storage,
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::StdIo(value.kind())
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(value: rmp_serde::encode::Error) -> Self {
        Self::Encode(value.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(value: rmp_serde::decode::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

fn serialize_io_error<S>(kind: &ErrorKind, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut ser = serializer.serialize_struct("IOError", 1)?;
    ser.serialize_field("kind", &kind.to_string())?;
    ser.end()
}

impl Error {
    pub fn family(&self) -> ErrorFamily {
        match self {
            Error::WritebackReadOnly | Error::Writeback(_) | Error::UnsupportedVariant { .. } => {
                ErrorFamily::Contract
            }
            Error::InvalidColumnName(_)
            | Error::InvalidAttributeKey(_)
            | Error::InvalidAttributeValue { .. }
            | Error::InvalidColumnType(_)
            | Error::ColumnLength { .. }
            | Error::ColumnTypeMismatch { .. }
            | Error::InvalidSelection(_)
            | Error::NegativeStep
            | Error::TypeMismatch { .. }
            | Error::ShapeMismatch { .. }
            | Error::InvalidIndex(_)
            | Error::Config(_) => ErrorFamily::Validation,
            Error::ColumnNotFound(_) | Error::KeyNotFound(_) | Error::IndexOutOfRange { .. } => {
                ErrorFamily::Lookup
            }
            Error::StdIo(_) | Error::Encode(_) | Error::Decode(_) => ErrorFamily::Storage,
        }
    }

    /// Returns true for the writeback errors, both of which are contract
    /// violations.
    pub fn is_writeback(&self) -> bool {
        matches!(self, Error::WritebackReadOnly | Error::Writeback(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
