//! Implementation of the datasource APIs using memory.
//!
//! A [`MemoryStore`] is a tree of groups, tables and texts.  Column data is
//! held behind [`Rc`], so linking a column or a whole subtree from one place
//! in a store to another (or into a different store) shares the bytes rather
//! than copying them.  A store can be saved to and loaded from a file.

use std::any::Any;
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use indexmap::IndexMap;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use super::metrics::{
    describe_datasource_metrics, COLUMNS_TRANSFERRED, COLUMNS_WRITTEN, COLUMN_ATTRIBUTES_WRITTEN,
    GROUPS_LINKED, NAMES_WRITTEN, ROWS_WRITTEN, TABLE_ATTRIBUTES_WRITTEN, TEXTS_WRITTEN,
};
use super::{ColumnHandle, DataSource};
use crate::attributes::Attributes;
use crate::config::MemoryStoreOptions;
use crate::data::{ColumnData, DataType};
use crate::error::{Error, Result};
use crate::group::ContainerType;
use crate::selection::Resolved;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredColumn {
    data: Rc<ColumnData>,
    attributes: Attributes,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct TableNode {
    name: Option<String>,
    attributes: Attributes,
    rows: usize,
    columns: IndexMap<String, StoredColumn>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
enum Node {
    Group(IndexMap<String, Node>),
    Table(TableNode),
    Text(String),
}

impl Node {
    fn empty(ty: &ContainerType) -> Self {
        match ty {
            ContainerType::Table => Node::Table(TableNode::default()),
            ContainerType::Text => Node::Text(String::new()),
            _ => Node::Group(IndexMap::new()),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Node::Group(_) => "group",
            Node::Table(_) => "table",
            Node::Text(_) => "text",
        }
    }

    fn holds(&self, ty: &ContainerType) -> bool {
        matches!(
            (self, ty),
            (Node::Table(_), ContainerType::Table)
                | (Node::Text(_), ContainerType::Text)
                | (
                    Node::Group(_),
                    ContainerType::List(_)
                        | ContainerType::Dict(_)
                        | ContainerType::Tuple(_)
                        | ContainerType::Record(_)
                )
        )
    }
}

fn kind_mismatch(expected: &str, node: &Node) -> Error {
    Error::TypeMismatch {
        expected: expected.to_owned(),
        found: node.kind().to_owned(),
    }
}

/// Counters of the writes one store has received.
///
/// The same events are also reported to the global [`metrics`] recorder,
/// under the names in [`super::metrics`], summed over every store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Columns written with their values.
    pub columns_written: u64,
    /// Column attribute writes.
    pub column_attributes_written: u64,
    /// Columns linked instead of written.
    pub columns_transferred: u64,
    /// Table attribute writes.
    pub table_attributes_written: u64,
    /// Table name writes.
    pub names_written: u64,
    /// Containers linked instead of written.
    pub groups_linked: u64,
    /// Text writes.
    pub texts_written: u64,
}

/// State of an in-memory store.
#[derive(Debug)]
pub struct MemoryStore {
    /// Identifies the store; two datasources share an origin only within one
    /// store.
    id: Uuid,
    root: RefCell<Node>,
    options: MemoryStoreOptions,
    stats: RefCell<StoreStats>,
    /// Groups being written, as they were when their write started,
    /// outermost first.  Links from inside a group being written read from
    /// here, so that writing one child can not change the source of another.
    snapshots: RefCell<Vec<(Vec<String>, Node)>>,
}

impl MemoryStore {
    /// Creates an empty store whose root is a group.
    pub fn new() -> Rc<Self> {
        Self::with_options(MemoryStoreOptions::default())
    }

    /// Like [`MemoryStore::new`], with `options`.
    pub fn with_options(options: MemoryStoreOptions) -> Rc<Self> {
        Self::with_root(&ContainerType::Dict(Box::new(ContainerType::Table)), options)
    }

    /// Creates an empty store whose root node holds a container of type
    /// `ty`.
    pub fn with_root(ty: &ContainerType, options: MemoryStoreOptions) -> Rc<Self> {
        Self::from_node(Node::empty(ty), options)
    }

    fn from_node(root: Node, options: MemoryStoreOptions) -> Rc<Self> {
        describe_datasource_metrics();
        Rc::new(Self {
            id: Uuid::now_v7(),
            root: RefCell::new(root),
            options,
            stats: RefCell::new(StoreStats::default()),
            snapshots: RefCell::new(Vec::new()),
        })
    }

    /// Unique identifier of the store.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns a datasource for the root node.
    pub fn root(self: &Rc<Self>) -> Rc<dyn DataSource> {
        Rc::new(MemorySource::new(self.clone(), Vec::new()))
    }

    /// Returns a datasource for the node at `path`, which need not exist
    /// yet.
    pub fn source(self: &Rc<Self>, path: &[&str]) -> Rc<MemorySource> {
        Rc::new(MemorySource::new(
            self.clone(),
            path.iter().map(|s| (*s).to_owned()).collect(),
        ))
    }

    /// Counts of the writes the store received since it was created or
    /// since the last [`MemoryStore::reset_stats`].
    pub fn stats(&self) -> StoreStats {
        *self.stats.borrow()
    }

    /// Sets every count of [`MemoryStore::stats`] back to zero.
    pub fn reset_stats(&self) {
        *self.stats.borrow_mut() = StoreStats::default();
    }

    fn count(&self, f: impl FnOnce(&mut StoreStats)) {
        f(&mut self.stats.borrow_mut());
    }

    /// Records `node`, the group at `path`, before it is written.  Returns
    /// `false` if a write around it already did.
    fn push_snapshot(&self, path: &[String], node: Node) -> bool {
        let mut snapshots = self.snapshots.borrow_mut();
        // Left over by writes that failed.
        snapshots.retain(|(prefix, _)| !prefix.starts_with(path));
        if snapshots.iter().any(|(prefix, _)| path.starts_with(prefix)) {
            return false;
        }
        snapshots.push((path.to_vec(), node));
        true
    }

    fn pop_snapshot(&self, path: &[String]) {
        self.snapshots
            .borrow_mut()
            .retain(|(prefix, _)| prefix.as_slice() != path);
    }

    /// The node at `path` as it was when a write in progress around it
    /// started.
    fn snapshot_of(&self, path: &[String]) -> Option<Node> {
        let snapshots = self.snapshots.borrow();
        let (prefix, node) = snapshots
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix))?;
        resolve(node, &path[prefix.len()..]).ok().cloned()
    }

    /// Returns the stored data of column `key` in the table at `path`.
    ///
    /// Stored data is shared between every place it has been linked to,
    /// which can be observed with [`Rc::ptr_eq`].
    pub fn column_data(&self, path: &[&str], key: &str) -> Result<Rc<ColumnData>> {
        let root = self.root.borrow();
        let path: Vec<String> = path.iter().map(|s| (*s).to_owned()).collect();
        match resolve(&root, &path)? {
            Node::Table(table) => table
                .columns
                .get(key)
                .map(|column| column.data.clone())
                .ok_or_else(|| Error::ColumnNotFound(key.to_owned())),
            other => Err(kind_mismatch("table", other)),
        }
    }

    /// Writes the store to `path` in MessagePack.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = rmp_serde::to_vec(&*self.root.borrow())?;
        fs::write(path, bytes)?;
        debug!("saved memory store {} to {}", self.id, path.display());
        Ok(())
    }

    /// Loads a store previously written with [`MemoryStore::save`].  The
    /// loaded store is a new origin: nothing in it shares an origin with the
    /// store it was saved from.
    pub fn open(path: &Path, options: MemoryStoreOptions) -> Result<Rc<Self>> {
        let bytes = fs::read(path)?;
        let root: Node = rmp_serde::from_slice(&bytes)?;
        Ok(Self::from_node(root, options))
    }
}

fn resolve<'a>(mut node: &'a Node, path: &[String]) -> Result<&'a Node> {
    for (depth, segment) in path.iter().enumerate() {
        node = match node {
            Node::Group(children) => children.get(segment),
            _ => None,
        }
        .ok_or_else(|| Error::KeyNotFound(path[..=depth].join("/")))?;
    }
    Ok(node)
}

fn resolve_mut<'a>(mut node: &'a mut Node, path: &[String]) -> Result<&'a mut Node> {
    for (depth, segment) in path.iter().enumerate() {
        node = match node {
            Node::Group(children) => children.get_mut(segment),
            _ => None,
        }
        .ok_or_else(|| Error::KeyNotFound(path[..=depth].join("/")))?;
    }
    Ok(node)
}

/// State of a write between `write_started` and `write_finished`.
#[derive(Debug)]
struct Pending {
    /// Names to keep, in order.
    names: Vec<String>,
    /// Set when this write recorded a snapshot of the node.
    snapshot: bool,
}

/// A datasource for one node of a [`MemoryStore`].
#[derive(Debug)]
pub struct MemorySource {
    store: Rc<MemoryStore>,
    path: Vec<String>,
    pending: RefCell<Option<Pending>>,
}

impl MemorySource {
    fn new(store: Rc<MemoryStore>, path: Vec<String>) -> Self {
        Self {
            store,
            path,
            pending: RefCell::new(None),
        }
    }

    /// The store this datasource belongs to.
    pub fn store(&self) -> &Rc<MemoryStore> {
        &self.store
    }

    /// Keys leading from the root of the store to the node.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    fn child(&self, key: &str) -> Rc<dyn DataSource> {
        let mut path = self.path.clone();
        path.push(key.to_owned());
        Rc::new(MemorySource::new(self.store.clone(), path))
    }

    fn check_writable(&self) -> Result<()> {
        if self.store.options.read_only {
            return Err(Error::WritebackReadOnly);
        }
        Ok(())
    }

    fn with_node<R>(&self, f: impl FnOnce(&Node) -> Result<R>) -> Result<R> {
        let root = self.store.root.borrow();
        f(resolve(&root, &self.path)?)
    }

    fn with_node_mut<R>(&self, f: impl FnOnce(&mut Node) -> Result<R>) -> Result<R> {
        self.check_writable()?;
        let mut root = self.store.root.borrow_mut();
        f(resolve_mut(&mut root, &self.path)?)
    }

    fn with_table<R>(&self, f: impl FnOnce(&TableNode) -> Result<R>) -> Result<R> {
        self.with_node(|node| match node {
            Node::Table(table) => f(table),
            other => Err(kind_mismatch("table", other)),
        })
    }

    fn with_table_mut<R>(&self, f: impl FnOnce(&mut TableNode) -> Result<R>) -> Result<R> {
        self.with_node_mut(|node| match node {
            Node::Table(table) => f(table),
            other => Err(kind_mismatch("table", other)),
        })
    }

    fn with_group<R>(&self, f: impl FnOnce(&IndexMap<String, Node>) -> Result<R>) -> Result<R> {
        self.with_node(|node| match node {
            Node::Group(children) => f(children),
            other => Err(kind_mismatch("group", other)),
        })
    }

    fn with_group_mut<R>(
        &self,
        f: impl FnOnce(&mut IndexMap<String, Node>) -> Result<R>,
    ) -> Result<R> {
        self.with_node_mut(|node| match node {
            Node::Group(children) => f(children),
            other => Err(kind_mismatch("group", other)),
        })
    }

    fn downcast(other: &dyn DataSource) -> Option<&MemorySource> {
        other.as_any().downcast_ref::<MemorySource>()
    }
}

impl DataSource for MemorySource {
    fn columns(&self) -> Result<Vec<String>> {
        self.with_table(|table| Ok(table.columns.keys().cloned().collect()))
    }

    fn read_column(&self, key: &str, index: Option<&Resolved>) -> Result<ColumnData> {
        self.with_table(|table| {
            let column = table
                .columns
                .get(key)
                .ok_or_else(|| Error::ColumnNotFound(key.to_owned()))?;
            trace!("reading column {key:?} of /{}", self.path.join("/"));
            Ok(match index {
                None => (*column.data).clone(),
                Some(index) => match index.as_range() {
                    Some(range) => column.data.slice(range),
                    None => column.data.take(index.indices()),
                },
            })
        })
    }

    fn write_column(&self, key: &str, data: &ColumnData) -> Result<()> {
        let in_transaction = self.pending.borrow().is_some();
        self.with_table_mut(|table| {
            if !in_transaction {
                table.rows = data.len();
            }
            table.columns.insert(
                key.to_owned(),
                StoredColumn {
                    data: Rc::new(data.clone()),
                    attributes: Attributes::new(),
                },
            );
            Ok(())
        })?;
        self.store.count(|stats| stats.columns_written += 1);
        counter!(COLUMNS_WRITTEN).increment(1);
        counter!(ROWS_WRITTEN).increment(data.len() as u64);
        Ok(())
    }

    fn column_handle(&self, key: &str) -> Result<Option<ColumnHandle>> {
        self.with_table(|table| {
            let column = table
                .columns
                .get(key)
                .ok_or_else(|| Error::ColumnNotFound(key.to_owned()))?;
            Ok(Some(ColumnHandle {
                data: column.data.clone(),
                attributes: column.attributes.clone(),
            }))
        })
    }

    fn column_type(&self, key: &str) -> Result<DataType> {
        self.with_table(|table| {
            table
                .columns
                .get(key)
                .map(|column| column.data.dtype())
                .ok_or_else(|| Error::ColumnNotFound(key.to_owned()))
        })
    }

    fn read_column_attributes(&self, key: &str) -> Result<Attributes> {
        self.with_table(|table| {
            table
                .columns
                .get(key)
                .map(|column| column.attributes.clone())
                .ok_or_else(|| Error::ColumnNotFound(key.to_owned()))
        })
    }

    fn write_column_attributes(&self, key: &str, attributes: &Attributes) -> Result<()> {
        self.with_table_mut(|table| {
            let column = table
                .columns
                .get_mut(key)
                .ok_or_else(|| Error::ColumnNotFound(key.to_owned()))?;
            column.attributes = attributes.clone();
            Ok(())
        })?;
        self.store.count(|stats| stats.column_attributes_written += 1);
        counter!(COLUMN_ATTRIBUTES_WRITTEN).increment(1);
        Ok(())
    }

    fn read_table_attributes(&self) -> Result<Attributes> {
        self.with_table(|table| Ok(table.attributes.clone()))
    }

    fn write_table_attributes(&self, attributes: &Attributes) -> Result<()> {
        self.with_table_mut(|table| {
            table.attributes = attributes.clone();
            Ok(())
        })?;
        self.store.count(|stats| stats.table_attributes_written += 1);
        counter!(TABLE_ATTRIBUTES_WRITTEN).increment(1);
        Ok(())
    }

    fn read_name(&self) -> Result<Option<String>> {
        self.with_table(|table| Ok(table.name.clone()))
    }

    fn write_name(&self, name: Option<&str>) -> Result<()> {
        self.with_table_mut(|table| {
            table.name = name.map(str::to_owned);
            Ok(())
        })?;
        self.store.count(|stats| stats.names_written += 1);
        counter!(NAMES_WRITTEN).increment(1);
        Ok(())
    }

    fn number_of_rows(&self) -> Result<usize> {
        self.with_table(|table| Ok(table.rows))
    }

    fn number_of_columns(&self) -> Result<usize> {
        self.with_table(|table| Ok(table.columns.len()))
    }

    fn can_write(&self) -> Option<bool> {
        Some(!self.store.options.read_only)
    }

    fn can_link(&self) -> bool {
        self.store.options.can_link
    }

    fn transferable(&self, other: &dyn DataSource) -> bool {
        self.can_link() && Self::downcast(other).is_some_and(|other| other.can_link())
    }

    fn transfer(&self, name: &str, data: &Rc<ColumnData>, attributes: &Attributes) -> Result<()> {
        let in_transaction = self.pending.borrow().is_some();
        self.with_table_mut(|table| {
            if !in_transaction {
                table.rows = data.len();
            }
            table.columns.insert(
                name.to_owned(),
                StoredColumn {
                    data: data.clone(),
                    attributes: attributes.clone(),
                },
            );
            Ok(())
        })?;
        trace!("linked column {name:?} into /{}", self.path.join("/"));
        self.store.count(|stats| stats.columns_transferred += 1);
        counter!(COLUMNS_TRANSFERRED).increment(1);
        Ok(())
    }

    fn shares_origin(&self, other: &dyn DataSource) -> bool {
        Self::downcast(other)
            .is_some_and(|other| Rc::ptr_eq(&self.store, &other.store) && self.path == other.path)
    }

    fn write_started(&self, rows: usize, names: &[String]) -> Result<()> {
        let group = self.with_node_mut(|node| {
            if let Node::Table(table) = node {
                table.rows = rows;
                return Ok(None);
            }
            if matches!(node, Node::Group(_)) {
                return Ok(Some(node.clone()));
            }
            Err(kind_mismatch("table or group", node))
        })?;
        let snapshot = match group {
            Some(node) => self.store.push_snapshot(&self.path, node),
            None => false,
        };
        *self.pending.borrow_mut() = Some(Pending {
            names: names.to_vec(),
            snapshot,
        });
        Ok(())
    }

    fn write_finished(&self) -> Result<()> {
        let Some(Pending { names, snapshot }) = self.pending.borrow_mut().take() else {
            return Err(Error::Writeback(
                "write_finished without write_started".into(),
            ));
        };
        if snapshot {
            self.store.pop_snapshot(&self.path);
        }
        self.with_node_mut(|node| {
            match node {
                Node::Table(table) => {
                    let mut columns = std::mem::take(&mut table.columns);
                    table.columns = names
                        .iter()
                        .filter_map(|name| columns.shift_remove_entry(name))
                        .collect();
                }
                Node::Group(children) => {
                    let mut old = std::mem::take(children);
                    *children = names
                        .iter()
                        .filter_map(|name| old.shift_remove_entry(name))
                        .collect();
                }
                Node::Text(_) => (),
            }
            Ok(())
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.with_group(|children| Ok(children.keys().cloned().collect()))
    }

    fn size(&self) -> Result<usize> {
        self.with_group(|children| Ok(children.len()))
    }

    fn read_with_type(&self, key: &str, ty: &ContainerType) -> Result<Option<Rc<dyn DataSource>>> {
        let found = self.with_group(|children| match children.get(key) {
            None => Ok(false),
            Some(node) if node.holds(ty) => Ok(true),
            Some(node) => Err(Error::TypeMismatch {
                expected: ty.to_string(),
                found: node.kind().to_owned(),
            }),
        })?;
        Ok(found.then(|| self.child(key)))
    }

    fn write_with_type(&self, key: &str, ty: &ContainerType) -> Result<Rc<dyn DataSource>> {
        self.with_group_mut(|children| {
            children.insert(key.to_owned(), Node::empty(ty));
            Ok(())
        })?;
        Ok(self.child(key))
    }

    fn link_with(&self, key: &str, other: &dyn DataSource) -> Result<bool> {
        if !self.transferable(other) {
            return Ok(false);
        }
        let Some(other) = Self::downcast(other) else {
            return Ok(false);
        };
        if Rc::ptr_eq(&self.store, &other.store)
            && other.path.len() == self.path.len() + 1
            && other.path.starts_with(&self.path)
            && other.path.last().map(String::as_str) == Some(key)
        {
            trace!("/{} is already in place", other.path.join("/"));
            return Ok(true);
        }
        let node = match other.store.snapshot_of(&other.path) {
            Some(node) => node,
            None => other.with_node(|node| Ok(node.clone()))?,
        };
        self.with_group_mut(|children| {
            children.insert(key.to_owned(), node);
            Ok(())
        })?;
        self.store.count(|stats| stats.groups_linked += 1);
        counter!(GROUPS_LINKED).increment(1);
        Ok(true)
    }

    fn read_text(&self) -> Result<Option<String>> {
        self.with_node(|node| match node {
            Node::Text(text) => Ok(Some(text.clone())),
            other => Err(kind_mismatch("text", other)),
        })
    }

    fn write_text(&self, text: &str) -> Result<()> {
        self.with_node_mut(|node| match node {
            Node::Text(value) => {
                *value = text.to_owned();
                Ok(())
            }
            other => Err(kind_mismatch("text", other)),
        })?;
        self.store.count(|stats| stats.texts_written += 1);
        counter!(TEXTS_WRITTEN).increment(1);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
