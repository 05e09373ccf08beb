use std::rc::Rc;

use once_cell::unsync::OnceCell;

use super::{assert_type, materialized, read_child, write_child, ContainerType, Group};
use crate::datasource::{null_source, DataSource};
use crate::error::{Error, Result};

/// Named fields, each with its own declared type.  Like a [`Tuple`], a
/// field that was never written reads as an empty container of its type.
///
/// [`Tuple`]: super::Tuple
#[derive(Clone, Debug)]
pub struct Record {
    fields: Vec<(String, ContainerType)>,
    datasource: Rc<dyn DataSource>,
    items: Vec<OnceCell<Group>>,
    dirty: bool,
}

impl Record {
    pub fn new(fields: Vec<(String, ContainerType)>) -> Self {
        Self::from_source(fields, null_source())
    }

    pub fn from_source(fields: Vec<(String, ContainerType)>, datasource: Rc<dyn DataSource>) -> Self {
        let items = vec![OnceCell::new(); fields.len()];
        Self {
            fields,
            datasource,
            items,
            dirty: false,
        }
    }

    pub fn fields(&self) -> &[(String, ContainerType)] {
        &self.fields
    }

    pub fn container_type(&self) -> ContainerType {
        ContainerType::Record(self.fields.clone())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn datasource(&self) -> &Rc<dyn DataSource> {
        &self.datasource
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|(field, _)| field == name)
            .ok_or_else(|| Error::KeyNotFound(name.to_owned()))
    }

    fn load(&self, index: usize) -> Result<Group> {
        let (name, ty) = &self.fields[index];
        Ok(read_child(&self.datasource, name, ty)?.unwrap_or_else(|| Group::new_empty(ty)))
    }

    /// Field `name`.  Only names that are not fields of the record are an
    /// error.
    pub fn get(&self, name: &str) -> Result<&Group> {
        let index = self.position(name)?;
        self.items[index].get_or_try_init(|| self.load(index))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Group> {
        let index = self.position(name)?;
        self.get(name)?;
        materialized(&mut self.items[index])
    }

    /// True if field `name` holds a value, as opposed to reading as the
    /// default.
    pub fn has_value(&self, name: &str) -> Result<bool> {
        let index = self.position(name)?;
        if self.items[index].get().is_some() {
            return Ok(true);
        }
        let (name, ty) = &self.fields[index];
        Ok(read_child(&self.datasource, name, ty)?.is_some())
    }

    /// Stores `value` as field `name`, whose declared type it must have.
    pub fn set(&mut self, name: &str, value: Group) -> Result<()> {
        let index = self.position(name)?;
        assert_type(&self.fields[index].1, &value.container_type())?;
        self.items[index] = OnceCell::with_value(value);
        self.dirty = true;
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
            || self
                .items
                .iter()
                .filter_map(OnceCell::get)
                .any(Group::is_dirty)
    }

    pub(crate) fn write_into(&self, datasource: &dyn DataSource) -> Result<()> {
        let keys: Vec<String> = self.field_names().map(str::to_owned).collect();
        datasource.write_started(0, &keys)?;
        for key in &keys {
            write_child(datasource, key, self.get(key)?)?;
        }
        datasource.write_finished()
    }
}
