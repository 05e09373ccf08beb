//! Columns and the sources that hold their data.
//!
//! A [`Column`] does not own its values: it refers to a [`ColumnSource`],
//! which either holds the data in memory or knows where to read it from a
//! [`DataSource`].  Sources are immutable and shared by [`Rc`], so a column
//! can be linked into any number of tables without copying, and a change to
//! one table's column replaces that table's source rather than modifying the
//! shared one.

use std::any::Any;
use std::fmt::Debug;
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use tracing::trace;

use crate::attributes::Attributes;
use crate::data::{ColumnData, DataType};
use crate::datasource::{ColumnHandle, DataSource};
use crate::error::Result;
use crate::selection::Resolved;

/// Where the values of a column live.
pub trait ColumnSource: Debug {
    /// All values, or the rows in `index`.
    fn get(&self, index: Option<&Resolved>) -> Result<Rc<ColumnData>>;

    fn len(&self) -> Result<usize>;

    fn dtype(&self) -> Result<DataType>;

    /// Attributes as stored with the data.
    fn attrs(&self) -> Result<Attributes>;

    /// Stores the column in `dest` as `name`, linking if the two stores
    /// allow it.  Returns `true` if the data was linked and `false` if it
    /// was written.
    fn link(&self, name: &str, attrs: &Attributes, dest: &dyn DataSource) -> Result<bool>;

    /// Writes the values and `attrs` to `dest` as `name`.
    fn write(&self, name: &str, attrs: &Attributes, dest: &dyn DataSource) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

fn write_data(name: &str, data: &ColumnData, attrs: &Attributes, dest: &dyn DataSource) -> Result<()> {
    dest.write_column(name, data)?;
    if !attrs.is_empty() {
        dest.write_column_attributes(name, attrs)?;
    }
    Ok(())
}

/// Values held in memory.
#[derive(Debug)]
pub struct InMemoryColumnSource {
    data: Rc<ColumnData>,
}

impl InMemoryColumnSource {
    pub fn new(data: Rc<ColumnData>) -> Self {
        Self { data }
    }
}

impl ColumnSource for InMemoryColumnSource {
    fn get(&self, index: Option<&Resolved>) -> Result<Rc<ColumnData>> {
        Ok(select_rows(&self.data, index))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.data.len())
    }

    fn dtype(&self) -> Result<DataType> {
        Ok(self.data.dtype())
    }

    fn attrs(&self) -> Result<Attributes> {
        Ok(Attributes::new())
    }

    /// There is nothing to link to, so this always writes.
    fn link(&self, name: &str, attrs: &Attributes, dest: &dyn DataSource) -> Result<bool> {
        self.write(name, attrs, dest)?;
        Ok(false)
    }

    fn write(&self, name: &str, attrs: &Attributes, dest: &dyn DataSource) -> Result<()> {
        write_data(name, &self.data, attrs, dest)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn select_rows(data: &Rc<ColumnData>, index: Option<&Resolved>) -> Rc<ColumnData> {
    match index {
        None => data.clone(),
        Some(index) if index.is_whole(data.len()) => data.clone(),
        Some(index) => Rc::new(match index.as_range() {
            Some(range) => data.slice(range),
            None => data.take(index.indices()),
        }),
    }
}

/// Values stored under `key` in a datasource.
///
/// If the datasource hands out [`ColumnHandle`]s, the stored data is pinned
/// when the source is created: later writes to the datasource are not seen,
/// and linking transfers the pinned data.  Otherwise values are read from
/// the datasource when needed.
#[derive(Debug)]
pub struct OnDiskColumnSource {
    datasource: Rc<dyn DataSource>,
    key: String,
    pinned: Option<ColumnHandle>,
    len: OnceCell<usize>,
    dtype: OnceCell<DataType>,
}

impl OnDiskColumnSource {
    pub fn new(datasource: Rc<dyn DataSource>, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let pinned = datasource.column_handle(&key)?;
        Ok(Self {
            datasource,
            key,
            pinned,
            len: OnceCell::new(),
            dtype: OnceCell::new(),
        })
    }

    pub fn datasource(&self) -> &Rc<dyn DataSource> {
        &self.datasource
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the stored data is pinned.
    pub fn is_pinned(&self) -> bool {
        self.pinned.is_some()
    }
}

impl ColumnSource for OnDiskColumnSource {
    fn get(&self, index: Option<&Resolved>) -> Result<Rc<ColumnData>> {
        if let Some(handle) = &self.pinned {
            return Ok(select_rows(&handle.data, index));
        }
        trace!("reading column {:?}", self.key);
        self.datasource.read_column(&self.key, index).map(Rc::new)
    }

    fn len(&self) -> Result<usize> {
        if let Some(handle) = &self.pinned {
            return Ok(handle.data.len());
        }
        self.len
            .get_or_try_init(|| self.datasource.number_of_rows())
            .copied()
    }

    fn dtype(&self) -> Result<DataType> {
        if let Some(handle) = &self.pinned {
            return Ok(handle.data.dtype());
        }
        self.dtype
            .get_or_try_init(|| self.datasource.column_type(&self.key))
            .copied()
    }

    fn attrs(&self) -> Result<Attributes> {
        match &self.pinned {
            Some(handle) => Ok(handle.attributes.clone()),
            None => self.datasource.read_column_attributes(&self.key),
        }
    }

    fn link(&self, name: &str, attrs: &Attributes, dest: &dyn DataSource) -> Result<bool> {
        let origin = self.datasource.as_ref();
        let handle = match &self.pinned {
            Some(handle) if dest.transferable(origin) => handle,
            _ => {
                self.write(name, attrs, dest)?;
                return Ok(false);
            }
        };
        let in_place = dest.shares_origin(origin)
            && name == self.key
            && dest
                .column_handle(name)
                .ok()
                .flatten()
                .is_some_and(|stored| stored.holds(&handle.data, attrs));
        if in_place {
            trace!("column {name:?} is already in place");
        } else {
            dest.transfer(name, &handle.data, attrs)?;
        }
        Ok(true)
    }

    fn write(&self, name: &str, attrs: &Attributes, dest: &dyn DataSource) -> Result<()> {
        let data = self.get(None)?;
        write_data(name, &data, attrs, dest)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One column of a table.
///
/// Cloning a column is shallow: the clone shares the source.
#[derive(Clone, Debug)]
pub struct Column {
    source: Rc<dyn ColumnSource>,
    /// Set when the values or attributes may differ from what is stored at
    /// the column's origin.
    dirty: bool,
    attrs: OnceCell<Rc<Attributes>>,
}

impl Column {
    /// A new column holding `data`.
    pub fn from_data(data: ColumnData) -> Self {
        Self::from_shared(Rc::new(data))
    }

    pub fn from_shared(data: Rc<ColumnData>) -> Self {
        Self {
            source: Rc::new(InMemoryColumnSource::new(data)),
            dirty: true,
            attrs: OnceCell::new(),
        }
    }

    /// A clean column backed by column `key` of `datasource`.
    pub fn from_datasource(datasource: Rc<dyn DataSource>, key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            source: Rc::new(OnDiskColumnSource::new(datasource, key)?),
            dirty: false,
            attrs: OnceCell::new(),
        })
    }

    /// Replaces the attributes of a new column; used when deriving one
    /// column from another.
    pub(crate) fn with_attrs(mut self, attrs: Rc<Attributes>) -> Self {
        self.attrs = OnceCell::with_value(attrs);
        self
    }

    pub fn get(&self, index: Option<&Resolved>) -> Result<Rc<ColumnData>> {
        self.source.get(index)
    }

    pub fn len(&self) -> Result<usize> {
        self.source.len()
    }

    pub fn dtype(&self) -> Result<DataType> {
        self.source.dtype()
    }

    pub fn attrs(&self) -> Result<Rc<Attributes>> {
        self.attrs
            .get_or_try_init(|| self.source.attrs().map(Rc::new))
            .cloned()
    }

    pub fn set_attrs(&mut self, attrs: Rc<Attributes>) {
        self.attrs = OnceCell::with_value(attrs);
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn source(&self) -> &Rc<dyn ColumnSource> {
        &self.source
    }

    /// Whether both columns refer to the same source.
    pub fn shares_source(&self, other: &Column) -> bool {
        Rc::ptr_eq(&self.source, &other.source)
    }

    /// Stores the column in `dest`, linking when possible.  See
    /// [`ColumnSource::link`].
    pub fn link(&self, name: &str, dest: &dyn DataSource) -> Result<bool> {
        let attrs = self.attrs()?;
        self.source.link(name, &attrs, dest)
    }

    pub fn write(&self, name: &str, dest: &dyn DataSource) -> Result<()> {
        let attrs = self.attrs()?;
        self.source.write(name, &attrs, dest)
    }
}
