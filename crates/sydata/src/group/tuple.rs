use std::rc::Rc;

use once_cell::unsync::OnceCell;

use super::{assert_type, materialized, read_child, write_child, ContainerType, Group};
use crate::datasource::{null_source, DataSource};
use crate::error::{Error, Result};

/// A fixed number of slots, each with its own declared type.
///
/// Slot `i` is stored under key `i`.  A slot that was never written reads as
/// an empty container of its type.
#[derive(Clone, Debug)]
pub struct Tuple {
    types: Vec<ContainerType>,
    datasource: Rc<dyn DataSource>,
    items: Vec<OnceCell<Group>>,
    dirty: bool,
}

impl Tuple {
    pub fn new(types: Vec<ContainerType>) -> Self {
        Self::from_source(types, null_source())
    }

    pub fn from_source(types: Vec<ContainerType>, datasource: Rc<dyn DataSource>) -> Self {
        let items = vec![OnceCell::new(); types.len()];
        Self {
            types,
            datasource,
            items,
            dirty: false,
        }
    }

    pub fn types(&self) -> &[ContainerType] {
        &self.types
    }

    pub fn container_type(&self) -> ContainerType {
        ContainerType::Tuple(self.types.clone())
    }

    pub fn datasource(&self) -> &Rc<dyn DataSource> {
        &self.datasource
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.types.len() {
            return Err(Error::IndexOutOfRange {
                index: index as isize,
                len: self.types.len(),
            });
        }
        Ok(())
    }

    fn load(&self, index: usize) -> Result<Group> {
        let ty = &self.types[index];
        Ok(read_child(&self.datasource, &index.to_string(), ty)?
            .unwrap_or_else(|| Group::new_empty(ty)))
    }

    pub fn get(&self, index: usize) -> Result<&Group> {
        self.check_index(index)?;
        self.items[index].get_or_try_init(|| self.load(index))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Group> {
        self.get(index)?;
        materialized(&mut self.items[index])
    }

    /// True if slot `index` holds a value, as opposed to reading as the
    /// default.
    pub fn has_value(&self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        if self.items[index].get().is_some() {
            return Ok(true);
        }
        Ok(read_child(&self.datasource, &index.to_string(), &self.types[index])?.is_some())
    }

    /// Stores `value` in slot `index`, whose declared type it must have.
    pub fn set(&mut self, index: usize, value: Group) -> Result<()> {
        self.check_index(index)?;
        assert_type(&self.types[index], &value.container_type())?;
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

    /// Writes every slot, including those that read as defaults.
    pub(crate) fn write_into(&self, datasource: &dyn DataSource) -> Result<()> {
        let keys: Vec<String> = (0..self.len()).map(|i| i.to_string()).collect();
        datasource.write_started(0, &keys)?;
        for (i, key) in keys.iter().enumerate() {
            write_child(datasource, key, self.get(i)?)?;
        }
        datasource.write_finished()
    }
}
