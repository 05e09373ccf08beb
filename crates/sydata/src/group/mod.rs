//! Containers of containers.
//!
//! A [`Group`] is any of the container kinds: keyed [`Dict`]s, homogeneous
//! [`List`]s, fixed [`Record`]s and [`Tuple`]s of differently typed fields,
//! and the leaves, [`Table`] and [`Text`].  Containers nest arbitrarily, as
//! described by a [`ContainerType`].
//!
//! Containers built over a datasource materialize their children on first
//! access.  What happens when a child is missing depends on the container: a
//! [`Tuple`] or [`Record`] slot that was never written reads as an empty
//! default, while a missing [`List`] item or [`Dict`] key is an error.

use std::fmt::{self, Display};
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::datasource::{is_null, DataSource};
use crate::error::{Error, Result};
use crate::table::Table;
use crate::visitor::GroupVisitor;

mod dict;
mod list;
mod record;
mod text;
mod tuple;

pub use dict::Dict;
pub use list::List;
pub use record::Record;
pub use text::Text;
pub use tuple::Tuple;

/// Type of a (possibly nested) container.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerType {
    Table,
    Text,
    List(Box<ContainerType>),
    Dict(Box<ContainerType>),
    Tuple(Vec<ContainerType>),
    Record(Vec<(String, ContainerType)>),
}

impl ContainerType {
    pub fn list(content: ContainerType) -> Self {
        ContainerType::List(Box::new(content))
    }

    pub fn dict(content: ContainerType) -> Self {
        ContainerType::Dict(Box::new(content))
    }

    pub fn record<S: Into<String>>(fields: impl IntoIterator<Item = (S, ContainerType)>) -> Self {
        ContainerType::Record(
            fields
                .into_iter()
                .map(|(name, ty)| (name.into(), ty))
                .collect(),
        )
    }
}

impl Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerType::Table => f.write_str("table"),
            ContainerType::Text => f.write_str("text"),
            ContainerType::List(content) => write!(f, "[{content}]"),
            ContainerType::Dict(content) => write!(f, "{{{content}}}"),
            ContainerType::Tuple(types) => {
                f.write_str("(")?;
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str(")")
            }
            ContainerType::Record(fields) => {
                f.write_str("(")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Fails unless `found` is exactly `expected`.
pub fn assert_type(expected: &ContainerType, found: &ContainerType) -> Result<()> {
    if expected != found {
        return Err(Error::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

/// Any container.
#[derive(Clone, Debug)]
pub enum Group {
    Dict(Dict),
    List(List),
    Record(Record),
    Tuple(Tuple),
    Table(Table),
    Text(Text),
}

impl Group {
    /// An empty container of type `ty`.
    pub fn new_empty(ty: &ContainerType) -> Self {
        match ty {
            ContainerType::Table => Group::Table(Table::new()),
            ContainerType::Text => Group::Text(Text::new()),
            ContainerType::List(content) => Group::List(List::new((**content).clone())),
            ContainerType::Dict(content) => Group::Dict(Dict::new((**content).clone())),
            ContainerType::Tuple(types) => Group::Tuple(Tuple::new(types.clone())),
            ContainerType::Record(fields) => Group::Record(Record::new(fields.clone())),
        }
    }

    /// A container of type `ty` over `datasource`.
    pub fn from_source(ty: &ContainerType, datasource: Rc<dyn DataSource>) -> Result<Self> {
        Ok(match ty {
            ContainerType::Table => Group::Table(Table::from_source(datasource)?),
            ContainerType::Text => Group::Text(Text::from_source(datasource)),
            ContainerType::List(content) => {
                Group::List(List::from_source((**content).clone(), datasource)?)
            }
            ContainerType::Dict(content) => {
                Group::Dict(Dict::from_source((**content).clone(), datasource)?)
            }
            ContainerType::Tuple(types) => {
                Group::Tuple(Tuple::from_source(types.clone(), datasource))
            }
            ContainerType::Record(fields) => {
                Group::Record(Record::from_source(fields.clone(), datasource))
            }
        })
    }

    pub fn container_type(&self) -> ContainerType {
        match self {
            Group::Dict(dict) => dict.container_type(),
            Group::List(list) => list.container_type(),
            Group::Record(record) => record.container_type(),
            Group::Tuple(tuple) => tuple.container_type(),
            Group::Table(_) => ContainerType::Table,
            Group::Text(_) => ContainerType::Text,
        }
    }

    /// Name of the variant, as used in errors.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Group::Dict(_) => "dict",
            Group::List(_) => "list",
            Group::Record(_) => "record",
            Group::Tuple(_) => "tuple",
            Group::Table(_) => "table",
            Group::Text(_) => "text",
        }
    }

    /// Calls the `visit_*` method of `visitor` for this variant.
    pub fn accept(&self, visitor: &mut dyn GroupVisitor) -> Result<()> {
        match self {
            Group::Dict(dict) => visitor.visit_dict(dict),
            Group::List(list) => visitor.visit_list(list),
            Group::Record(record) => visitor.visit_record(record),
            Group::Tuple(tuple) => visitor.visit_tuple(tuple),
            Group::Table(table) => visitor.visit_table(table),
            Group::Text(text) => visitor.visit_text(text),
        }
    }

    pub fn datasource(&self) -> &Rc<dyn DataSource> {
        match self {
            Group::Dict(dict) => dict.datasource(),
            Group::List(list) => list.datasource(),
            Group::Record(record) => record.datasource(),
            Group::Tuple(tuple) => tuple.datasource(),
            Group::Table(table) => table.datasource(),
            Group::Text(text) => text.datasource(),
        }
    }

    /// True if this container, or anything it holds, differs from what is
    /// stored at its datasource.
    pub fn is_dirty(&self) -> bool {
        match self {
            Group::Dict(dict) => dict.is_dirty(),
            Group::List(list) => list.is_dirty(),
            Group::Record(record) => record.is_dirty(),
            Group::Tuple(tuple) => tuple.is_dirty(),
            Group::Table(table) => table.is_dirty(),
            Group::Text(text) => text.is_dirty(),
        }
    }

    /// Tries to link the stored container in as child `key` of `target`.
    /// Returns `false` if it has to be written instead.
    pub fn writeback_into(&self, target: &dyn DataSource, key: &str) -> Result<bool> {
        match self {
            Group::Table(table) => table.writeback_into(target, key),
            other => link_group(other.is_dirty(), other.datasource(), target, key),
        }
    }

    /// Materializes the children of every changed container.  Writing a
    /// container in place can then move children around without any child
    /// reading what another has just written.
    fn load_changed(&self) -> Result<()> {
        if !self.is_dirty() {
            return Ok(());
        }
        let children: Vec<&Group> = match self {
            Group::Dict(dict) => dict
                .iter()
                .map(|item| item.map(|(_, child)| child))
                .collect::<Result<_>>()?,
            Group::List(list) => list.iter().collect::<Result<_>>()?,
            Group::Record(record) => record
                .field_names()
                .map(|name| record.get(name))
                .collect::<Result<_>>()?,
            Group::Tuple(tuple) => (0..tuple.len())
                .map(|i| tuple.get(i))
                .collect::<Result<_>>()?,
            Group::Table(_) | Group::Text(_) => Vec::new(),
        };
        for child in children {
            child.load_changed()?;
        }
        Ok(())
    }

    /// Writes the entire container to `datasource`.
    pub fn write_into(&self, datasource: &dyn DataSource) -> Result<()> {
        self.load_changed()?;
        match self {
            Group::Dict(dict) => dict.write_into(datasource),
            Group::List(list) => list.write_into(datasource),
            Group::Record(record) => record.write_into(datasource),
            Group::Tuple(tuple) => tuple.write_into(datasource),
            Group::Table(table) => table.write_into(datasource),
            Group::Text(text) => text.write_into(datasource),
        }
    }

    /// Writes the container back to its own datasource, if it changed.
    pub fn writeback(&self) -> Result<()> {
        if let Group::Table(table) = self {
            return table.writeback();
        }
        let datasource = self.datasource().clone();
        if datasource.can_write() != Some(true) {
            return Err(Error::WritebackReadOnly);
        }
        if !self.is_dirty() {
            debug!("{} is unchanged, skipping writeback", self.variant_name());
            return Ok(());
        }
        self.write_into(datasource.as_ref())
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Group::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Group::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Group::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Group::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut List> {
        match self {
            Group::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Group::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Group::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Group::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Group::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&Tuple> {
        match self {
            Group::Tuple(tuple) => Some(tuple),
            _ => None,
        }
    }

    pub fn into_table(self) -> Option<Table> {
        match self {
            Group::Table(table) => Some(table),
            _ => None,
        }
    }
}

impl From<Table> for Group {
    fn from(value: Table) -> Self {
        Group::Table(value)
    }
}

impl From<Text> for Group {
    fn from(value: Text) -> Self {
        Group::Text(value)
    }
}

impl From<List> for Group {
    fn from(value: List) -> Self {
        Group::List(value)
    }
}

impl From<Dict> for Group {
    fn from(value: Dict) -> Self {
        Group::Dict(value)
    }
}

impl From<Record> for Group {
    fn from(value: Record) -> Self {
        Group::Record(value)
    }
}

impl From<Tuple> for Group {
    fn from(value: Tuple) -> Self {
        Group::Tuple(value)
    }
}

/// Links `source` in as child `key` of `target`, unless the container is
/// dirty or not backed by a store.
fn link_group(
    dirty: bool,
    source: &Rc<dyn DataSource>,
    target: &dyn DataSource,
    key: &str,
) -> Result<bool> {
    if dirty || is_null(source.as_ref()) {
        return Ok(false);
    }
    target.link_with(key, source.as_ref())
}

/// Stores `child` as `key` of `target`: linked if possible, written
/// otherwise.  An existing child of the same type is written over in place,
/// so that a container can be written back over the data it was read from.
fn write_child(target: &dyn DataSource, key: &str, child: &Group) -> Result<()> {
    if child.writeback_into(target, key)? {
        debug!("linked {} {key:?}", child.variant_name());
        return Ok(());
    }
    let ty = child.container_type();
    let datasource = match target.read_with_type(key, &ty) {
        Ok(Some(datasource)) => datasource,
        Ok(None) | Err(Error::KeyNotFound(_)) => target.write_with_type(key, &ty)?,
        Err(e) => return Err(e),
    };
    child.write_into(datasource.as_ref())
}

/// The value of a slot that has been materialized.
fn materialized(cell: &mut OnceCell<Group>) -> Result<&mut Group> {
    cell.get_mut()
        .ok_or_else(|| Error::Writeback("container slot is empty".into()))
}

/// Reads child `key` of `datasource`, or `None` if there is no such child.
fn read_child(
    datasource: &Rc<dyn DataSource>,
    key: &str,
    ty: &ContainerType,
) -> Result<Option<Group>> {
    match datasource.read_with_type(key, ty) {
        Ok(Some(child)) => {
            tracing::trace!("materializing {ty} {key:?}");
            Group::from_source(ty, child).map(Some)
        }
        Ok(None) | Err(Error::KeyNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests;
