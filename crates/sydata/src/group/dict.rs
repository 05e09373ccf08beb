use std::rc::Rc;

use indexmap::IndexMap;
use once_cell::unsync::OnceCell;

use super::{assert_type, materialized, read_child, write_child, ContainerType, Group};
use crate::datasource::{null_source, DataSource};
use crate::error::{Error, Result};

/// Containers of one type by key, in insertion order.  A missing key is an
/// error.
#[derive(Clone, Debug)]
pub struct Dict {
    content: ContainerType,
    datasource: Rc<dyn DataSource>,
    items: IndexMap<String, OnceCell<Group>>,
    dirty: bool,
}

impl Dict {
    pub fn new(content: ContainerType) -> Self {
        Self {
            content,
            datasource: null_source(),
            items: IndexMap::new(),
            dirty: false,
        }
    }

    pub fn from_source(content: ContainerType, datasource: Rc<dyn DataSource>) -> Result<Self> {
        let items = datasource
            .keys()?
            .into_iter()
            .map(|key| (key, OnceCell::new()))
            .collect();
        Ok(Self {
            content,
            datasource,
            items,
            dirty: false,
        })
    }

    pub fn content_type(&self) -> &ContainerType {
        &self.content
    }

    pub fn container_type(&self) -> ContainerType {
        ContainerType::dict(self.content.clone())
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

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    fn load(&self, key: &str) -> Result<Group> {
        read_child(&self.datasource, key, &self.content)?
            .ok_or_else(|| Error::KeyNotFound(key.to_owned()))
    }

    pub fn get(&self, key: &str) -> Result<&Group> {
        self.items
            .get(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_owned()))?
            .get_or_try_init(|| self.load(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Result<&mut Group> {
        self.get(key)?;
        let cell = self
            .items
            .get_mut(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_owned()))?;
        materialized(cell)
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<(&str, &Group)>> {
        self.items
            .keys()
            .map(|key| self.get(key).map(|value| (key.as_str(), value)))
    }

    /// Stores `value` as `key`, which must have the dict's content type.
    pub fn insert(&mut self, key: impl Into<String>, value: Group) -> Result<()> {
        assert_type(&self.content, &value.container_type())?;
        self.items.insert(key.into(), OnceCell::with_value(value));
        self.dirty = true;
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<Group> {
        self.get(key)?;
        let cell = self
            .items
            .shift_remove(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_owned()))?;
        self.dirty = true;
        cell.into_inner()
            .ok_or_else(|| Error::KeyNotFound(key.to_owned()))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
            || self
                .items
                .values()
                .filter_map(OnceCell::get)
                .any(Group::is_dirty)
    }

    pub(crate) fn write_into(&self, datasource: &dyn DataSource) -> Result<()> {
        let keys: Vec<String> = self.items.keys().cloned().collect();
        datasource.write_started(0, &keys)?;
        for key in &keys {
            write_child(datasource, key, self.get(key)?)?;
        }
        datasource.write_finished()
    }
}
