use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::datasource::{null_source, DataSource};
use crate::error::Result;

/// An opaque string.
#[derive(Clone, Debug)]
pub struct Text {
    datasource: Rc<dyn DataSource>,
    value: OnceCell<String>,
    dirty: bool,
}

impl Default for Text {
    fn default() -> Self {
        Self::new()
    }
}

impl Text {
    pub fn new() -> Self {
        Self {
            datasource: null_source(),
            value: OnceCell::with_value(String::new()),
            dirty: false,
        }
    }

    pub fn from_source(datasource: Rc<dyn DataSource>) -> Self {
        Self {
            datasource,
            value: OnceCell::new(),
            dirty: false,
        }
    }

    pub fn datasource(&self) -> &Rc<dyn DataSource> {
        &self.datasource
    }

    pub fn get(&self) -> Result<&str> {
        self.value
            .get_or_try_init(|| Ok(self.datasource.read_text()?.unwrap_or_default()))
            .map(String::as_str)
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = OnceCell::with_value(value.into());
        self.dirty = true;
    }

    /// Takes over `other`'s value, sharing its origin.
    pub fn update(&mut self, other: &Text) {
        self.datasource = other.datasource.clone();
        self.value = other.value.clone();
        self.dirty = other.dirty;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn write_into(&self, datasource: &dyn DataSource) -> Result<()> {
        datasource.write_text(self.get()?)
    }
}
