//! The table container.
//!
//! A [`Table`] is an ordered mapping from column names to [`Column`]s that
//! all have the same number of rows.  A table built over a datasource
//! registers the stored columns without reading them; values are read when
//! asked for.
//!
//! Columns are shared between tables wherever that is possible: updating one
//! table from another, or selecting every row of a table, links the columns
//! instead of copying them.  A linked column that is never changed stays
//! clean, so that writing the table back to a compatible store can link the
//! stored data too, instead of writing it again.

use std::fmt::{self, Display};
use std::rc::Rc;

use indexmap::IndexMap;
use itertools::Itertools;
use once_cell::unsync::OnceCell;
use tracing::debug;

use crate::attributes::Attributes;
use crate::column::Column;
use crate::data::{ColumnData, DataType, Scalar};
use crate::datasource::{is_null, null_source, DataSource};
use crate::error::{Error, Result};
use crate::selection::{Resolved, Selection};


/// Number of rows shown by the [`Display`] implementation.
const DISPLAY_ROWS: usize = 10;

/// An ordered collection of equally long, named columns.
#[derive(Clone, Debug)]
pub struct Table {
    datasource: Rc<dyn DataSource>,
    name: OnceCell<Option<String>>,
    attributes: OnceCell<Rc<Attributes>>,
    columns: IndexMap<String, Column>,
    rows: usize,
    /// Set when the name, the attributes or the set of columns changed.
    dirty: bool,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

fn column_name_guard(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('\0') {
        return Err(Error::InvalidColumnName(name.to_owned()));
    }
    Ok(())
}

impl Table {
    /// An empty table that is not backed by any store.
    pub fn new() -> Self {
        Self {
            datasource: null_source(),
            name: OnceCell::with_value(None),
            attributes: OnceCell::with_value(Rc::new(Attributes::new())),
            columns: IndexMap::new(),
            rows: 0,
            dirty: false,
        }
    }

    /// A table over the table stored at `datasource`.  The columns are
    /// registered but not read.
    ///
    /// What is stored when the table is created is what the table holds:
    /// later writes to `datasource`, by this table or any other, do not
    /// change it.
    pub fn from_source(datasource: Rc<dyn DataSource>) -> Result<Self> {
        let columns: IndexMap<String, Column> = datasource
            .columns()?
            .into_iter()
            .map(|key| Ok((key.clone(), Column::from_datasource(datasource.clone(), key)?)))
            .collect::<Result<_>>()?;
        let rows = if columns.is_empty() {
            0
        } else {
            datasource.number_of_rows()?
        };
        let name = datasource.read_name()?;
        let attributes = Rc::new(datasource.read_table_attributes()?);
        Ok(Self {
            datasource,
            name: OnceCell::with_value(name),
            attributes: OnceCell::with_value(attributes),
            columns,
            rows,
            dirty: false,
        })
    }

    pub fn datasource(&self) -> &Rc<dyn DataSource> {
        &self.datasource
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn number_of_rows(&self) -> usize {
        self.rows
    }

    pub fn number_of_columns(&self) -> usize {
        self.columns.len()
    }

    /// True if the table has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// True if the table or any of its columns differ from what is stored at
    /// the table's datasource.
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.columns.values().any(Column::is_dirty)
    }

    pub fn name(&self) -> Result<Option<String>> {
        self.name
            .get_or_try_init(|| self.datasource.read_name())
            .cloned()
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = OnceCell::with_value(name.map(str::to_owned));
        self.dirty = true;
    }

    pub fn table_attributes(&self) -> Result<Rc<Attributes>> {
        self.attributes
            .get_or_try_init(|| self.datasource.read_table_attributes().map(Rc::new))
            .cloned()
    }

    pub fn set_table_attributes(&mut self, attributes: Attributes) {
        self.attributes = OnceCell::with_value(Rc::new(attributes));
        self.dirty = true;
    }

    pub(crate) fn share_table_attributes(&mut self, attributes: Rc<Attributes>) {
        self.attributes = OnceCell::with_value(attributes);
        self.dirty = true;
    }

    /// Sets the table attributes from loosely typed pairs, which are
    /// validated first.
    pub fn set_table_attribute_pairs<K, V, I>(&mut self, pairs: I) -> Result<()>
    where
        K: Into<Scalar>,
        V: Into<Scalar>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.set_table_attributes(Attributes::try_from_pairs(pairs)?);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_owned()))
    }

    fn column_mut(&mut self, name: &str) -> Result<&mut Column> {
        self.columns
            .get_mut(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_owned()))
    }

    /// The values of column `name`.
    pub fn get_column(&self, name: &str) -> Result<Rc<ColumnData>> {
        self.column(name)?.get(None)
    }

    pub fn column_type(&self, name: &str) -> Result<DataType> {
        self.column(name)?.dtype()
    }

    pub fn column_attributes(&self, name: &str) -> Result<Rc<Attributes>> {
        self.column(name)?.attrs()
    }

    pub fn set_column_attributes(&mut self, name: &str, attributes: Attributes) -> Result<()> {
        self.column_mut(name)?.set_attrs(Rc::new(attributes));
        Ok(())
    }

    /// Sets the attributes of column `name` from loosely typed pairs, which
    /// are validated first.
    pub fn set_column_attribute_pairs<K, V, I>(&mut self, name: &str, pairs: I) -> Result<()>
    where
        K: Into<Scalar>,
        V: Into<Scalar>,
        I: IntoIterator<Item = (K, V)>,
    {
        let attributes = Attributes::try_from_pairs(pairs)?;
        self.set_column_attributes(name, attributes)
    }

    /// Checks that a column of `len` rows can be stored as `name`.
    ///
    /// Any length goes while the table is empty, or when the column replaces
    /// the table's only column.
    fn length_guard(&self, name: &str, len: usize) -> Result<()> {
        let replaces_all = self.columns.len() == 1 && self.columns.contains_key(name);
        if self.columns.is_empty() || replaces_all || len == self.rows {
            return Ok(());
        }
        Err(Error::ColumnLength {
            name: name.to_owned(),
            expected: self.rows,
            found: len,
        })
    }

    fn insert_column(&mut self, name: &str, column: Column, len: usize) -> Result<()> {
        self.length_guard(name, len)?;
        self.columns.insert(name.to_owned(), column);
        self.rows = len;
        self.dirty = true;
        Ok(())
    }

    /// Stores `data` as column `name`, replacing any column of that name.
    pub fn set_column(&mut self, name: &str, data: impl Into<ColumnData>) -> Result<()> {
        column_name_guard(name)?;
        let data = data.into();
        let len = data.len();
        self.insert_column(name, Column::from_data(data), len)
    }

    /// Stores `data` as column `name` with `attributes`, sharing both.
    pub fn set_column_with_attributes(
        &mut self,
        name: &str,
        data: Rc<ColumnData>,
        attributes: Rc<Attributes>,
    ) -> Result<()> {
        column_name_guard(name)?;
        let len = data.len();
        self.insert_column(name, Column::from_shared(data).with_attrs(attributes), len)
    }

    /// Stores loosely typed values as column `name`.  See
    /// [`ColumnData::from_objects`].
    pub fn set_column_from_objects(&mut self, name: &str, values: Vec<Scalar>) -> Result<()> {
        self.set_column(name, ColumnData::from_objects(values)?)
    }

    /// Links column `other_name` of `other` in as column `name`.
    pub fn update_column(&mut self, name: &str, other: &Table, other_name: &str) -> Result<()> {
        column_name_guard(name)?;
        let column = other.column(other_name)?.clone();
        self.insert_column(name, column, other.rows)
    }

    /// Links every column of `other` into this table, replacing columns of
    /// the same names.  The table attributes are merged, `other`'s winning.
    ///
    /// Fails if this table keeps any column of its own and the numbers of
    /// rows differ.
    pub fn update(&mut self, other: &Table) -> Result<()> {
        if !other.is_empty() {
            if let Some(kept) = self.columns.keys().find(|name| !other.has_column(name)) {
                if self.rows != other.rows {
                    return Err(Error::ColumnLength {
                        name: kept.clone(),
                        expected: other.rows,
                        found: self.rows,
                    });
                }
            }
            for (name, column) in &other.columns {
                self.columns.insert(name.clone(), column.clone());
            }
            self.rows = other.rows;
        }

        let other_attributes = other.table_attributes()?;
        if !other_attributes.is_empty() {
            let mut attributes = (*self.table_attributes()?).clone();
            attributes.merge(&other_attributes);
            self.attributes = OnceCell::with_value(Rc::new(attributes));
        }
        if self.name()?.is_none() {
            self.name = OnceCell::with_value(other.name()?);
        }
        self.dirty = true;
        Ok(())
    }

    /// Removes column `name`.
    pub fn delete_column(&mut self, name: &str) -> Result<Column> {
        let column = self
            .columns
            .shift_remove(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_owned()))?;
        if self.columns.is_empty() {
            self.rows = 0;
        }
        self.dirty = true;
        Ok(column)
    }

    /// Replaces the entire content of this table by `other`'s, linking every
    /// column.
    pub fn source(&mut self, other: &Table) -> Result<()> {
        self.name = OnceCell::with_value(other.name()?);
        self.attributes = OnceCell::with_value(other.table_attributes()?);
        self.columns = other.columns.clone();
        self.rows = other.rows;
        self.dirty = true;
        Ok(())
    }

    /// Removes every column, the name and the attributes.
    pub fn clear(&mut self) {
        self.name = OnceCell::with_value(None);
        self.attributes = OnceCell::with_value(Rc::new(Attributes::new()));
        self.columns.clear();
        self.rows = 0;
        self.dirty = true;
    }

    fn resolve_columns(&self, cols: &Selection) -> Result<Vec<String>> {
        let resolved = cols.resolve(self.columns.len())?;
        resolved
            .indices()
            .iter()
            .map(|&i| {
                self.columns
                    .get_index(i)
                    .map(|(name, _)| name.clone())
                    .ok_or(Error::IndexOutOfRange {
                        index: i as isize,
                        len: self.columns.len(),
                    })
            })
            .collect()
    }

    /// An empty table with this table's name and attributes.
    fn empty_like(&self) -> Result<Table> {
        let mut table = Table::new();
        table.name = OnceCell::with_value(self.name()?);
        table.attributes = OnceCell::with_value(self.table_attributes()?);
        table.dirty = true;
        Ok(table)
    }

    /// Selects rows and columns, like `table[rows, cols]`.
    ///
    /// Selecting every row links the selected columns.  Any other row
    /// selection reads the rows into new columns that keep the attributes.
    pub fn select(&self, rows: Selection, cols: Selection) -> Result<Table> {
        let names = self.resolve_columns(&cols)?;
        let rows = rows.resolve(self.rows)?;
        let mut table = self.empty_like()?;
        if rows.is_whole(self.rows) {
            for name in &names {
                table.update_column(name, self, name)?;
            }
        } else {
            for name in &names {
                let column = self.column(name)?;
                let data = column.get(Some(&rows))?;
                table
                    .columns
                    .insert(name.clone(), Column::from_shared(data).with_attrs(column.attrs()?));
            }
            table.rows = if names.is_empty() { 0 } else { rows.len() };
        }
        Ok(table)
    }

    /// Selects every row of the named columns, linking them.
    pub fn select_columns(&self, names: &[&str]) -> Result<Table> {
        let mut table = self.empty_like()?;
        for name in names {
            table.update_column(name, self, name)?;
        }
        Ok(table)
    }

    /// Assigns `other` to the selected rows and columns, like
    /// `table[rows, cols] = other`.  `other` must have exactly the selected
    /// shape; its columns are matched to the selected ones by position.
    ///
    /// Whole columns are linked from `other` and a contiguous block of rows
    /// is spliced in.  Any other selection is assigned element by element
    /// into new copies of the affected columns.
    pub fn assign(&mut self, rows: Selection, cols: Selection, other: &Table) -> Result<()> {
        if rows.has_negative_step() || cols.has_negative_step() {
            return Err(Error::NegativeStep);
        }
        let names = self.resolve_columns(&cols)?;
        let row_sel = rows.resolve(self.rows)?;
        let expected = (row_sel.len(), names.len());
        let found = (other.rows, other.columns.len());
        if expected != found {
            return Err(Error::ShapeMismatch { expected, found });
        }
        let pairs: Vec<(String, String)> = names.into_iter().zip(other.column_names()).collect();

        let whole_rows = row_sel.is_whole(self.rows);
        let col_sel = cols.resolve(self.columns.len())?;
        let whole_cols = col_sel.is_whole(self.columns.len());

        match (whole_rows, whole_cols) {
            (true, true) => self.source(other),
            (true, false) if col_sel.as_range().is_some() => {
                for (name, other_name) in &pairs {
                    self.update_column(name, other, other_name)?;
                }
                Ok(())
            }
            (false, true) if row_sel.as_range().is_some() => self.splice_rows(&row_sel, &pairs, other),
            _ => self.assign_elements(&row_sel, &pairs, other),
        }
    }

    /// Replaces the contiguous rows of `row_sel` by the rows of `other`.
    fn splice_rows(
        &mut self,
        row_sel: &Resolved,
        pairs: &[(String, String)],
        other: &Table,
    ) -> Result<()> {
        let range = row_sel.as_range().unwrap_or(0..0);
        for (name, other_name) in pairs {
            let column = self.column(name)?;
            let data = column.get(None)?;
            let spliced = ColumnData::concat(&[
                data.slice(0..range.start),
                (*other.get_column(other_name)?).clone(),
                data.slice(range.end..data.len()),
            ])?;
            let column = Column::from_data(spliced).with_attrs(column.attrs()?);
            self.columns.insert(name.clone(), column);
        }
        self.dirty = true;
        Ok(())
    }

    fn assign_elements(
        &mut self,
        row_sel: &Resolved,
        pairs: &[(String, String)],
        other: &Table,
    ) -> Result<()> {
        debug!(
            "assigning {} rows of {} columns element by element",
            row_sel.len(),
            pairs.len()
        );
        for (name, other_name) in pairs {
            let column = self.column(name)?;
            let mut data = (*column.get(None)?).clone();
            data.assign(row_sel.indices(), &*other.get_column(other_name)?)?;
            let column = Column::from_data(data).with_attrs(column.attrs()?);
            self.columns.insert(name.clone(), column);
        }
        self.dirty = true;
        Ok(())
    }

    /// Writes the table back to its own datasource.
    pub fn writeback(&self) -> Result<()> {
        self.writeback_to(self.datasource.clone().as_ref())
    }

    /// Writes the table to `dest`.
    ///
    /// Nothing is written when `dest` shares origin with the table's
    /// datasource and nothing changed.  Otherwise clean columns are linked
    /// and changed ones written.
    pub fn writeback_to(&self, dest: &dyn DataSource) -> Result<()> {
        if dest.can_write() != Some(true) {
            return Err(Error::WritebackReadOnly);
        }
        if dest.shares_origin(self.datasource.as_ref()) && !self.is_dirty() {
            debug!("table is unchanged, skipping writeback");
            return Ok(());
        }
        self.write_into(dest)
    }

    /// Writes everything to `dest`, without checking whether it is needed.
    pub(crate) fn write_into(&self, dest: &dyn DataSource) -> Result<()> {
        dest.write_started(self.rows, &self.column_names())?;
        dest.write_name(self.name()?.as_deref())?;
        dest.write_table_attributes(&*self.table_attributes()?)?;
        for (name, column) in &self.columns {
            if column.is_dirty() {
                column.write(name, dest)?;
            } else if column.link(name, dest)? {
                debug!("linked column {name:?}");
            } else {
                debug!("copied column {name:?}");
            }
        }
        dest.write_finished()
    }

    /// Links the stored table in as child `key` of `target`, if the table is
    /// unchanged and its store allows it.
    pub(crate) fn writeback_into(&self, target: &dyn DataSource, key: &str) -> Result<bool> {
        if self.is_dirty() || is_null(self.datasource.as_ref()) {
            return Ok(false);
        }
        target.link_with(key, self.datasource.as_ref())
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name().ok().flatten().unwrap_or_default();
        writeln!(
            f,
            "Table {name:?}: {} rows x {} columns",
            self.rows,
            self.columns.len()
        )?;
        if self.columns.is_empty() {
            return Ok(());
        }
        writeln!(f, "{}", self.columns.keys().join(" | "))?;
        let shown = self.rows.min(DISPLAY_ROWS);
        let data = self
            .columns
            .values()
            .map(|column| column.get(Some(&Resolved::contiguous(0..shown))))
            .collect::<Result<Vec<_>>>()
            .map_err(|_| fmt::Error)?;
        for row in 0..shown {
            let values = data
                .iter()
                .map(|column| column.value(row).map(|v| v.to_string()).unwrap_or_default());
            writeln!(f, "{}", values.format(" | "))?;
        }
        if self.rows > shown {
            writeln!(f, "... {} more rows", self.rows - shown)?;
        }
        Ok(())
    }
}
