use std::rc::Rc;

use once_cell::unsync::OnceCell;

use super::{assert_type, materialized, read_child, write_child, ContainerType, Group};
use crate::datasource::{null_source, DataSource};
use crate::error::{Error, Result};

/// An ordered sequence of containers of one type.
///
/// Item `i` is stored under key `i`.  Unlike a [`Tuple`], a list has no
/// defaults: an item missing from the datasource is an error.
///
/// [`Tuple`]: super::Tuple
#[derive(Clone, Debug)]
pub struct List {
    content: ContainerType,
    datasource: Rc<dyn DataSource>,
    items: Vec<OnceCell<Group>>,
    dirty: bool,
}

impl List {
    pub fn new(content: ContainerType) -> Self {
        Self {
            content,
            datasource: null_source(),
            items: Vec::new(),
            dirty: false,
        }
    }

    pub fn from_source(content: ContainerType, datasource: Rc<dyn DataSource>) -> Result<Self> {
        let len = datasource.size()?;
        Ok(Self {
            content,
            datasource,
            items: vec![OnceCell::new(); len],
            dirty: false,
        })
    }

    pub fn content_type(&self) -> &ContainerType {
        &self.content
    }

    pub fn container_type(&self) -> ContainerType {
        ContainerType::list(self.content.clone())
    }

    pub fn datasource(&self) -> &Rc<dyn DataSource> {
        &self.datasource
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.items.len() {
            return Err(Error::IndexOutOfRange {
                index: index as isize,
                len: self.items.len(),
            });
        }
        Ok(())
    }

    fn load(&self, index: usize) -> Result<Group> {
        let key = index.to_string();
        read_child(&self.datasource, &key, &self.content)?.ok_or(Error::KeyNotFound(key))
    }

    pub fn get(&self, index: usize) -> Result<&Group> {
        self.check_index(index)?;
        self.items[index].get_or_try_init(|| self.load(index))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Group> {
        self.get(index)?;
        materialized(&mut self.items[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<&Group>> {
        (0..self.items.len()).map(|i| self.get(i))
    }

    /// Appends `value`, which must have the list's content type.
    pub fn push(&mut self, value: Group) -> Result<()> {
        assert_type(&self.content, &value.container_type())?;
        self.items.push(OnceCell::with_value(value));
        self.dirty = true;
        Ok(())
    }

    pub fn set(&mut self, index: usize, value: Group) -> Result<()> {
        self.check_index(index)?;
        assert_type(&self.content, &value.container_type())?;
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
        let keys: Vec<String> = (0..self.len()).map(|i| i.to_string()).collect();
        datasource.write_started(0, &keys)?;
        for (i, key) in keys.iter().enumerate() {
            write_child(datasource, key, self.get(i)?)?;
        }
        datasource.write_finished()
    }
}
