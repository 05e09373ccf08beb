//! Options for the join and split operations and for memory stores.
//!
//! Every options structure can be deserialized on its own, or as part of a
//! [`SydataConfig`] loaded from YAML or JSON.  Omitted fields take their
//! defaults.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Options for vertically joining tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VJoinOptions {
    /// Column holding each input table's own group index.  Tables without
    /// the column count as a single group.
    pub input_index: Option<String>,

    /// Name of the synthesized index column.  If unset, no index column is
    /// produced.
    pub output_index: Option<String>,

    /// Take the union of columns and fill missing values, rather than the
    /// intersection.
    pub fill: bool,

    /// Index increment for an input table without rows.
    pub minimum_increment: i64,
}

impl Default for VJoinOptions {
    fn default() -> Self {
        Self {
            input_index: None,
            output_index: None,
            fill: true,
            minimum_increment: 1,
        }
    }
}

impl VJoinOptions {
    /// Options that read group indexes from and write them to `column`.
    pub fn indexed(column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            input_index: Some(column.clone()),
            output_index: Some(column),
            ..Self::default()
        }
    }
}

/// Options for vertically splitting a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VSplitOptions {
    /// Column holding the group index of each row.  Without it every row
    /// becomes its own group.  The column must hold integers, booleans, or
    /// floats that are all whole numbers.
    pub input_index: Option<String>,

    /// Drop, per group, the columns that hold nothing but fill values.
    pub remove_fill: bool,
}

/// Options for a [`MemoryStore`](crate::datasource::MemoryStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStoreOptions {
    /// Reject every write.
    pub read_only: bool,

    /// Allow other stores to link to data held by this one.
    pub can_link: bool,
}

impl Default for MemoryStoreOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            can_link: true,
        }
    }
}

/// All of the options, as read from a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SydataConfig {
    pub vjoin: VJoinOptions,
    pub vsplit: VSplitOptions,
    pub store: MemoryStoreOptions,
}

impl SydataConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }
}
