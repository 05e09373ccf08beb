use serde::Serialize;
use thiserror::Error;

/// An error raised by the ADAF layer.
#[derive(Clone, Debug, Error, PartialEq, Serialize)]
pub enum AdafError {
    /// The underlying container operation failed.
    #[error(transparent)]
    Data(#[from] sydata::Error),

    #[error("No system named {0:?}.")]
    SystemNotFound(String),

    #[error("No raster named {0:?}.")]
    RasterNotFound(String),

    #[error("No signal named {0:?}.")]
    SignalNotFound(String),

    /// Signals can only be added to a raster that has a basis.
    #[error("Raster has no basis.")]
    MissingBasis,

    #[error("Signal {name:?} has {found} values, the basis has {expected}.")]
    SignalLength {
        name: String,
        expected: usize,
        found: usize,
    },

    /// The name is used by the raster itself.
    #[error("{0:?} is reserved and can not name a signal.")]
    ReservedName(String),

    /// Splitting requires an index column.
    #[error("Splitting an ADAF requires an input index.")]
    MissingIndex,

    /// A stored group does not have the layout of an ADAF.
    #[error("Not an ADAF: {0}.")]
    InvalidStructure(String),
}

pub type Result<T, E = AdafError> = std::result::Result<T, E>;
