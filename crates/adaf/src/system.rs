use std::rc::Rc;

use indexmap::IndexMap;
use sydata::{Attributes, ColumnData, Table};

use crate::error::{AdafError, Result};

/// Signals sampled over a common basis, such as a time axis.
///
/// A raster is a table: the basis is the column [`Raster::BASIS`] and every
/// other column is a signal of the same length.
#[derive(Clone, Debug, Default)]
pub struct Raster {
    table: Table,
}

impl Raster {
    /// Name of the basis column.
    pub const BASIS: &'static str = "!basis";

    pub fn new() -> Self {
        Self::default()
    }

    /// A raster over a stored or joined table.
    pub fn from_table(table: Table) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    pub fn number_of_rows(&self) -> usize {
        self.table.number_of_rows()
    }

    /// True if the raster has neither basis nor signals.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn attributes(&self) -> Result<Rc<Attributes>> {
        Ok(self.table.table_attributes()?)
    }

    pub fn set_attributes(&mut self, attributes: Attributes) {
        self.table.set_table_attributes(attributes);
    }

    /// Sets the basis.  Once there are signals the basis must keep their
    /// length.
    pub fn create_basis(&mut self, data: impl Into<ColumnData>, attributes: Attributes) -> Result<()> {
        self.table.set_column(Self::BASIS, data)?;
        self.table.set_column_attributes(Self::BASIS, attributes)?;
        Ok(())
    }

    pub fn has_basis(&self) -> bool {
        self.table.has_column(Self::BASIS)
    }

    pub fn basis(&self) -> Result<Rc<ColumnData>> {
        if !self.has_basis() {
            return Err(AdafError::MissingBasis);
        }
        Ok(self.table.get_column(Self::BASIS)?)
    }

    pub fn basis_attributes(&self) -> Result<Rc<Attributes>> {
        if !self.has_basis() {
            return Err(AdafError::MissingBasis);
        }
        Ok(self.table.column_attributes(Self::BASIS)?)
    }

    /// Adds or replaces signal `name`, which must be as long as the basis.
    pub fn add_signal(
        &mut self,
        name: &str,
        data: impl Into<ColumnData>,
        attributes: Attributes,
    ) -> Result<()> {
        if name == Self::BASIS {
            return Err(AdafError::ReservedName(name.to_owned()));
        }
        let data = data.into();
        let expected = self.basis()?.len();
        if data.len() != expected {
            return Err(AdafError::SignalLength {
                name: name.to_owned(),
                expected,
                found: data.len(),
            });
        }
        self.table.set_column(name, data)?;
        self.table.set_column_attributes(name, attributes)?;
        Ok(())
    }

    fn signal_guard(&self, name: &str) -> Result<()> {
        if name == Self::BASIS || !self.table.has_column(name) {
            return Err(AdafError::SignalNotFound(name.to_owned()));
        }
        Ok(())
    }

    pub fn signal(&self, name: &str) -> Result<Rc<ColumnData>> {
        self.signal_guard(name)?;
        Ok(self.table.get_column(name)?)
    }

    pub fn signal_attributes(&self, name: &str) -> Result<Rc<Attributes>> {
        self.signal_guard(name)?;
        Ok(self.table.column_attributes(name)?)
    }

    pub fn signal_names(&self) -> Vec<String> {
        self.table
            .column_names()
            .into_iter()
            .filter(|name| name != Self::BASIS)
            .collect()
    }
}

/// Named rasters.
#[derive(Clone, Debug, Default)]
pub struct System {
    rasters: IndexMap<String, Raster>,
}

impl System {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates raster `name`, replacing any raster of that name.
    pub fn create_raster(&mut self, name: &str) -> &mut Raster {
        self.insert_raster(name, Raster::new())
    }

    pub fn insert_raster(&mut self, name: &str, raster: Raster) -> &mut Raster {
        let (index, _) = self.rasters.insert_full(name.to_owned(), raster);
        &mut self.rasters[index]
    }

    pub fn raster(&self, name: &str) -> Result<&Raster> {
        self.rasters
            .get(name)
            .ok_or_else(|| AdafError::RasterNotFound(name.to_owned()))
    }

    pub fn raster_mut(&mut self, name: &str) -> Result<&mut Raster> {
        self.rasters
            .get_mut(name)
            .ok_or_else(|| AdafError::RasterNotFound(name.to_owned()))
    }

    pub fn remove_raster(&mut self, name: &str) -> Result<Raster> {
        self.rasters
            .shift_remove(name)
            .ok_or_else(|| AdafError::RasterNotFound(name.to_owned()))
    }

    pub fn raster_names(&self) -> impl Iterator<Item = &str> {
        self.rasters.keys().map(String::as_str)
    }

    pub fn rasters(&self) -> impl Iterator<Item = (&str, &Raster)> {
        self.rasters.iter().map(|(name, raster)| (name.as_str(), raster))
    }

    pub fn len(&self) -> usize {
        self.rasters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rasters.is_empty()
    }
}
