//! Lazy, typed containers over a column store.
//!
//! The basic container is the [`Table`]: named columns of equal length,
//! with attributes.  Tables nest in lists, dicts, tuples and records, all
//! described by a [`ContainerType`] and held as a [`Group`].  Containers read
//! from a [`DataSource`] load their content only when it is asked for, and
//! write back only what changed, linking unchanged data between stores that
//! allow it.
//!
//! The [`visitor`] module joins and splits containers: [`hjoin`] adds
//! containers side by side, [`vjoin`] stacks the rows of tables, [`vsplit`]
//! takes them apart again and [`spinecopy`] copies the nesting while sharing
//! the tables.

pub mod attributes;
pub mod column;
pub mod config;
pub mod data;
pub mod datasource;
pub mod error;
pub mod group;
pub mod selection;
pub mod table;
pub mod visitor;

#[cfg(test)]
mod test;

pub use attributes::{AttrValue, Attributes};
pub use column::{Column, ColumnSource};
pub use config::{MemoryStoreOptions, SydataConfig, VJoinOptions, VSplitOptions};
pub use data::{ColumnData, DataType, Scalar};
pub use datasource::{ColumnHandle, DataSource, MemorySource, MemoryStore, StoreStats};
pub use error::{Error, ErrorFamily, Result};
pub use group::{ContainerType, Dict, Group, List, Record, Text, Tuple};
pub use selection::Selection;
pub use table::Table;
pub use visitor::{hjoin, spinecopy, vjoin, vsplit, GroupVisitor};
