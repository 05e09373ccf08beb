//! Helpers shared by the tests of this crate.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::attributes::Attributes;
use crate::data::{ColumnData, DataType};
use crate::datasource::{ColumnHandle, DataSource};
use crate::error::Result;
use crate::group::ContainerType;
use crate::selection::Resolved;

pub(crate) fn init_test_logger() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("debug"))
        .expect("valid default filter");

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .with(env_filter)
        .try_init();
}

/// Wraps a datasource and records the name of every call made to it.
///
/// [`DataSource::as_any`] is forwarded, so the wrapped source is recognized
/// by its backend as if it were unwrapped.
#[derive(Debug)]
pub(crate) struct RecordingSource {
    inner: Rc<dyn DataSource>,
    calls: RefCell<Vec<String>>,
    can_write: Option<Option<bool>>,
}

impl RecordingSource {
    pub fn new(inner: Rc<dyn DataSource>) -> Rc<Self> {
        Rc::new(Self {
            inner,
            calls: RefCell::new(Vec::new()),
            can_write: None,
        })
    }

    /// Like [`RecordingSource::new`], but reports `can_write` instead of
    /// asking the wrapped source.
    pub fn with_can_write(inner: Rc<dyn DataSource>, can_write: Option<bool>) -> Rc<Self> {
        Rc::new(Self {
            inner,
            calls: RefCell::new(Vec::new()),
            can_write: Some(can_write),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == call).count()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: &str) {
        self.calls.borrow_mut().push(call.to_owned());
    }
}

impl DataSource for RecordingSource {
    fn columns(&self) -> Result<Vec<String>> {
        self.record("columns");
        self.inner.columns()
    }

    fn read_column(&self, key: &str, index: Option<&Resolved>) -> Result<ColumnData> {
        self.record("read_column");
        self.inner.read_column(key, index)
    }

    fn write_column(&self, key: &str, data: &ColumnData) -> Result<()> {
        self.record("write_column");
        self.inner.write_column(key, data)
    }

    fn column_handle(&self, key: &str) -> Result<Option<ColumnHandle>> {
        self.record("column_handle");
        self.inner.column_handle(key)
    }

    fn column_type(&self, key: &str) -> Result<DataType> {
        self.record("column_type");
        self.inner.column_type(key)
    }

    fn read_column_attributes(&self, key: &str) -> Result<Attributes> {
        self.record("read_column_attributes");
        self.inner.read_column_attributes(key)
    }

    fn write_column_attributes(&self, key: &str, attributes: &Attributes) -> Result<()> {
        self.record("write_column_attributes");
        self.inner.write_column_attributes(key, attributes)
    }

    fn read_table_attributes(&self) -> Result<Attributes> {
        self.record("read_table_attributes");
        self.inner.read_table_attributes()
    }

    fn write_table_attributes(&self, attributes: &Attributes) -> Result<()> {
        self.record("write_table_attributes");
        self.inner.write_table_attributes(attributes)
    }

    fn read_name(&self) -> Result<Option<String>> {
        self.record("read_name");
        self.inner.read_name()
    }

    fn write_name(&self, name: Option<&str>) -> Result<()> {
        self.record("write_name");
        self.inner.write_name(name)
    }

    fn number_of_rows(&self) -> Result<usize> {
        self.record("number_of_rows");
        self.inner.number_of_rows()
    }

    fn number_of_columns(&self) -> Result<usize> {
        self.record("number_of_columns");
        self.inner.number_of_columns()
    }

    fn can_write(&self) -> Option<bool> {
        self.can_write.unwrap_or_else(|| self.inner.can_write())
    }

    fn can_link(&self) -> bool {
        self.inner.can_link()
    }

    fn transferable(&self, other: &dyn DataSource) -> bool {
        self.record("transferable");
        self.inner.transferable(other)
    }

    fn transfer(&self, name: &str, data: &Rc<ColumnData>, attributes: &Attributes) -> Result<()> {
        self.record("transfer");
        self.inner.transfer(name, data, attributes)
    }

    fn shares_origin(&self, other: &dyn DataSource) -> bool {
        self.record("shares_origin");
        self.inner.shares_origin(other)
    }

    fn write_started(&self, rows: usize, names: &[String]) -> Result<()> {
        self.record("write_started");
        self.inner.write_started(rows, names)
    }

    fn write_finished(&self) -> Result<()> {
        self.record("write_finished");
        self.inner.write_finished()
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.record("keys");
        self.inner.keys()
    }

    fn size(&self) -> Result<usize> {
        self.record("size");
        self.inner.size()
    }

    fn read_with_type(&self, key: &str, ty: &ContainerType) -> Result<Option<Rc<dyn DataSource>>> {
        self.record("read_with_type");
        self.inner.read_with_type(key, ty)
    }

    fn write_with_type(&self, key: &str, ty: &ContainerType) -> Result<Rc<dyn DataSource>> {
        self.record("write_with_type");
        self.inner.write_with_type(key, ty)
    }

    fn link_with(&self, key: &str, other: &dyn DataSource) -> Result<bool> {
        self.record("link_with");
        self.inner.link_with(key, other)
    }

    fn read_text(&self) -> Result<Option<String>> {
        self.record("read_text");
        self.inner.read_text()
    }

    fn write_text(&self, text: &str) -> Result<()> {
        self.record("write_text");
        self.inner.write_text(text)
    }

    fn as_any(&self) -> &dyn Any {
        self.inner.as_any()
    }
}
