//! Datasource APIs.
//!
//! A [`DataSource`] is a handle to one node of a backing store: a table, a
//! text, or a group of further nodes.  Containers read from a datasource
//! lazily and write to one during writeback.  Writeback is bracketed by
//! [`DataSource::write_started`] and [`DataSource::write_finished`] and
//! consists of one `write_column` or `transfer` per column in between; there
//! is no rollback if a write in between fails.
//!
//! Datasources of the same backend family may support zero-copy transfer of
//! columns and groups ("linking"), negotiated with
//! [`DataSource::transferable`] and [`DataSource::shares_origin`].
#![warn(missing_docs)]

use std::any::Any;
use std::fmt::Debug;
use std::rc::Rc;

use crate::attributes::Attributes;
use crate::data::{ColumnData, DataType};
use crate::error::{Error, Result};
use crate::group::ContainerType;
use crate::selection::Resolved;

pub mod memory;
pub mod metrics;

pub use memory::{MemorySource, MemoryStore, StoreStats};

/// The stored data and attributes of one column.
///
/// The data is shared with the store, not copied.  A handle keeps the data
/// it was taken with even when the store later replaces or drops the column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnHandle {
    /// Values of the column.
    pub data: Rc<ColumnData>,
    /// Attributes stored with the values.
    pub attributes: Attributes,
}

impl ColumnHandle {
    /// Whether `data` and `attributes` are exactly what this handle holds,
    /// the data being the same allocation.
    pub fn holds(&self, data: &Rc<ColumnData>, attributes: &Attributes) -> bool {
        Rc::ptr_eq(&self.data, data) && &self.attributes == attributes
    }
}

/// A handle to a node of a backing store.
pub trait DataSource: Debug {
    /// Names of the columns of a table node, in order.
    fn columns(&self) -> Result<Vec<String>>;

    /// Reads column `key`, or only the rows in `index`.
    fn read_column(&self, key: &str, index: Option<&Resolved>) -> Result<ColumnData>;

    /// Writes column `key`, replacing any previous column of that name.
    fn write_column(&self, key: &str, data: &ColumnData) -> Result<()>;

    /// Returns a handle to the stored column `key`, or `None` if this
    /// datasource does not share its data.
    fn column_handle(&self, _key: &str) -> Result<Option<ColumnHandle>> {
        Ok(None)
    }

    /// Returns the type of column `key`.
    fn column_type(&self, key: &str) -> Result<DataType> {
        self.read_column(key, Some(&Resolved::from_indices(Vec::new())))
            .map(|data| data.dtype())
    }

    /// Reads the attributes of column `key`.
    fn read_column_attributes(&self, key: &str) -> Result<Attributes>;

    /// Writes the attributes of column `key`, which must exist.
    fn write_column_attributes(&self, key: &str, attributes: &Attributes) -> Result<()>;

    /// Reads the table-level attributes.
    fn read_table_attributes(&self) -> Result<Attributes>;

    /// Writes the table-level attributes.
    fn write_table_attributes(&self, attributes: &Attributes) -> Result<()>;

    /// Reads the table name.
    fn read_name(&self) -> Result<Option<String>>;

    /// Writes the table name.
    fn write_name(&self, name: Option<&str>) -> Result<()>;

    /// Number of rows of a table node.
    fn number_of_rows(&self) -> Result<usize>;

    /// Number of columns of a table node.
    fn number_of_columns(&self) -> Result<usize>;

    /// Whether writes are accepted.  `None` means that the datasource is not
    /// a destination at all.
    fn can_write(&self) -> Option<bool>;

    /// Whether other datasources may link to data held here.
    fn can_link(&self) -> bool;

    /// Whether data held by `other` can be linked into this datasource.
    fn transferable(&self, other: &dyn DataSource) -> bool;

    /// Links `data`, taken from a datasource for which
    /// [`DataSource::transferable`] holds, into this table as column `name`
    /// with `attributes`.
    fn transfer(&self, name: &str, data: &Rc<ColumnData>, attributes: &Attributes) -> Result<()>;

    /// Whether this datasource and `other` refer to the same stored node.
    fn shares_origin(&self, other: &dyn DataSource) -> bool;

    /// Begins a writeback of `rows` rows into the columns (or child keys)
    /// `names`.
    fn write_started(&self, rows: usize, names: &[String]) -> Result<()>;

    /// Ends a writeback; anything not named in the matching
    /// [`DataSource::write_started`] is dropped.
    fn write_finished(&self) -> Result<()>;

    /// Child keys of a group node, in order.
    fn keys(&self) -> Result<Vec<String>>;

    /// Number of children of a group node.
    fn size(&self) -> Result<usize>;

    /// Opens child `key` as a container of type `ty`; `None` if there is no
    /// such child.
    fn read_with_type(&self, key: &str, ty: &ContainerType) -> Result<Option<Rc<dyn DataSource>>>;

    /// Creates (or replaces) child `key` for a container of type `ty`.
    fn write_with_type(&self, key: &str, ty: &ContainerType) -> Result<Rc<dyn DataSource>>;

    /// Links the node `other` in as child `key`.  Returns `false` if that is
    /// not possible, in which case the caller has to copy.
    fn link_with(&self, key: &str, other: &dyn DataSource) -> Result<bool>;

    /// Reads the content of a text node.
    fn read_text(&self) -> Result<Option<String>>;

    /// Writes the content of a text node.
    fn write_text(&self, text: &str) -> Result<()>;

    /// Allows backends to recognize their own datasources.
    fn as_any(&self) -> &dyn Any;
}

/// The datasource of containers that are not backed by any store.
///
/// Reads find nothing, it is not a writeback destination and it never links.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSource;

impl DataSource for NullSource {
    fn columns(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn read_column(&self, key: &str, _index: Option<&Resolved>) -> Result<ColumnData> {
        Err(Error::ColumnNotFound(key.to_owned()))
    }

    fn write_column(&self, _key: &str, _data: &ColumnData) -> Result<()> {
        Ok(())
    }

    fn column_type(&self, key: &str) -> Result<DataType> {
        Err(Error::ColumnNotFound(key.to_owned()))
    }

    fn read_column_attributes(&self, _key: &str) -> Result<Attributes> {
        Ok(Attributes::new())
    }

    fn write_column_attributes(&self, _key: &str, _attributes: &Attributes) -> Result<()> {
        Ok(())
    }

    fn read_table_attributes(&self) -> Result<Attributes> {
        Ok(Attributes::new())
    }

    fn write_table_attributes(&self, _attributes: &Attributes) -> Result<()> {
        Ok(())
    }

    fn read_name(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn write_name(&self, _name: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn number_of_rows(&self) -> Result<usize> {
        Ok(0)
    }

    fn number_of_columns(&self) -> Result<usize> {
        Ok(0)
    }

    fn can_write(&self) -> Option<bool> {
        None
    }

    fn can_link(&self) -> bool {
        false
    }

    fn transferable(&self, _other: &dyn DataSource) -> bool {
        false
    }

    fn transfer(&self, _name: &str, _data: &Rc<ColumnData>, _attributes: &Attributes) -> Result<()> {
        Ok(())
    }

    fn shares_origin(&self, _other: &dyn DataSource) -> bool {
        false
    }

    fn write_started(&self, _rows: usize, _names: &[String]) -> Result<()> {
        Ok(())
    }

    fn write_finished(&self) -> Result<()> {
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn size(&self) -> Result<usize> {
        Ok(0)
    }

    fn read_with_type(
        &self,
        _key: &str,
        _ty: &ContainerType,
    ) -> Result<Option<Rc<dyn DataSource>>> {
        Ok(None)
    }

    fn write_with_type(&self, _key: &str, _ty: &ContainerType) -> Result<Rc<dyn DataSource>> {
        Ok(null_source())
    }

    fn link_with(&self, _key: &str, _other: &dyn DataSource) -> Result<bool> {
        Ok(false)
    }

    fn read_text(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn write_text(&self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Returns the thread's shared [`NullSource`].
pub fn null_source() -> Rc<dyn DataSource> {
    thread_local! {
        static NULL_SOURCE: Rc<dyn DataSource> = Rc::new(NullSource);
    }
    NULL_SOURCE.with(Rc::clone)
}

/// Returns true if `source` is the [`NullSource`].
pub fn is_null(source: &dyn DataSource) -> bool {
    source.as_any().is::<NullSource>()
}
