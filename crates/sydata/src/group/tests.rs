use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::{ContainerType, Dict, Group, List, Record, Text, Tuple};
use crate::config::MemoryStoreOptions;
use crate::data::ColumnData;
use crate::datasource::{DataSource, MemoryStore};
use crate::error::Error;
use crate::table::Table;
use crate::test::init_test_logger;

fn xy() -> Table {
    let mut table = Table::new();
    table.set_column("x", vec![1i64, 2, 3]).unwrap();
    table.set_column("y", vec![0.5, 1.5, 2.5]).unwrap();
    table
}

/// A store holding the dict `{"a": xy()}` at its root.
fn stored_dict() -> Rc<MemoryStore> {
    let store = MemoryStore::new();
    let mut dict = Dict::from_source(ContainerType::Table, store.root()).unwrap();
    dict.insert("a", xy().into()).unwrap();
    Group::Dict(dict).writeback().unwrap();
    store
}

#[test]
fn container_type_display() {
    let adaf = ContainerType::record([
        ("meta", ContainerType::Table),
        (
            "sys",
            ContainerType::dict(ContainerType::dict(ContainerType::Table)),
        ),
    ]);
    assert_eq!(adaf.to_string(), "(meta: table, sys: {{table}})");
    assert_eq!(ContainerType::list(ContainerType::Text).to_string(), "[text]");
    assert_eq!(
        ContainerType::Tuple(vec![ContainerType::Table, ContainerType::Text]).to_string(),
        "(table, text)"
    );
}

#[test]
fn tuples_and_records_default_missing_values() {
    let types = vec![ContainerType::Table, ContainerType::Text];
    let store = MemoryStore::with_root(
        &ContainerType::Tuple(types.clone()),
        MemoryStoreOptions::default(),
    );
    let tuple = Tuple::from_source(types, store.root());
    assert!(!tuple.has_value(0).unwrap());
    assert!(tuple.get(0).unwrap().as_table().unwrap().is_empty());
    assert_eq!(tuple.get(1).unwrap().as_text().unwrap().get().unwrap(), "");
    assert!(matches!(
        tuple.get(2).unwrap_err(),
        Error::IndexOutOfRange { index: 2, len: 2 }
    ));

    let record = Record::new(vec![("meta".to_owned(), ContainerType::Table)]);
    assert!(record.get("meta").unwrap().as_table().unwrap().is_empty());
    assert_eq!(
        record.get("res").unwrap_err(),
        Error::KeyNotFound("res".into())
    );
}

#[test]
fn lists_and_dicts_have_no_defaults() {
    let list = List::new(ContainerType::Table);
    assert!(matches!(
        list.get(0).unwrap_err(),
        Error::IndexOutOfRange { index: 0, len: 0 }
    ));

    let dict = Dict::from_source(ContainerType::Table, stored_dict().root()).unwrap();
    assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(dict.get("b").unwrap_err(), Error::KeyNotFound("b".into()));
}

#[test]
fn values_must_have_the_declared_type() {
    let mut tuple = Tuple::new(vec![ContainerType::Table]);
    assert_eq!(
        tuple.set(0, Text::new().into()).unwrap_err(),
        Error::TypeMismatch {
            expected: "table".into(),
            found: "text".into(),
        }
    );

    let mut list = List::new(ContainerType::list(ContainerType::Table));
    assert!(list.push(List::new(ContainerType::Text).into()).is_err());
    assert!(list.push(List::new(ContainerType::Table).into()).is_ok());

    let mut dict = Dict::new(ContainerType::Text);
    assert!(dict.insert("t", xy().into()).is_err());
    assert!(dict.is_empty());
}

#[test]
fn dict_round_trip() {
    init_test_logger();
    let store = stored_dict();
    let dict = Dict::from_source(ContainerType::Table, store.root()).unwrap();
    let table = dict.get("a").unwrap().as_table().unwrap();
    assert_eq!(table.column_names(), vec!["x", "y"]);
    assert_eq!(*table.get_column("x").unwrap(), ColumnData::Int(vec![1, 2, 3]));
    assert!(!dict.is_dirty());
}

#[test]
fn unchanged_containers_are_not_written() {
    let store = stored_dict();
    store.reset_stats();
    let group = Group::from_source(&ContainerType::dict(ContainerType::Table), store.root()).unwrap();
    group.as_dict().unwrap().get("a").unwrap();
    group.writeback().unwrap();
    assert_eq!(store.stats().columns_written, 0);
    assert_eq!(store.stats().groups_linked, 0);
}

#[test]
fn changed_tables_are_written_in_place() {
    let store = stored_dict();
    let x = store.column_data(&["a"], "x").unwrap();
    store.reset_stats();

    let mut group =
        Group::from_source(&ContainerType::dict(ContainerType::Table), store.root()).unwrap();
    group
        .as_dict_mut()
        .unwrap()
        .get_mut("a")
        .unwrap()
        .as_table_mut()
        .unwrap()
        .set_column("z", vec!["p", "q", "r"])
        .unwrap();
    assert!(group.is_dirty());
    group.writeback().unwrap();

    let stats = store.stats();
    assert_eq!(stats.columns_written, 1);
    assert_eq!(stats.columns_transferred, 0);
    assert!(Rc::ptr_eq(&x, &store.column_data(&["a"], "x").unwrap()));
    let source = store.source(&["a"]);
    assert_eq!(source.columns().unwrap(), vec!["x", "y", "z"]);
}

#[test]
fn clean_groups_link_into_other_stores() {
    let first = stored_dict();
    let second = MemoryStore::new();
    let group =
        Group::from_source(&ContainerType::dict(ContainerType::Table), first.root()).unwrap();
    group.write_into(second.root().as_ref()).unwrap();

    assert_eq!(second.stats().groups_linked, 1);
    assert_eq!(second.stats().columns_written, 0);
    assert!(Rc::ptr_eq(
        &first.column_data(&["a"], "x").unwrap(),
        &second.column_data(&["a"], "x").unwrap()
    ));
}

#[test]
fn nested_record_round_trip() {
    let ty = ContainerType::record([
        ("meta", ContainerType::Table),
        ("notes", ContainerType::list(ContainerType::Text)),
    ]);
    let store = MemoryStore::with_root(&ty, MemoryStoreOptions::default());
    let mut group = Group::from_source(&ty, store.root()).unwrap();
    let record = group.as_record_mut().unwrap();
    record.set("meta", xy().into()).unwrap();
    let mut note = Text::new();
    note.set("first");
    record
        .get_mut("notes")
        .unwrap()
        .as_list_mut()
        .unwrap()
        .push(note.into())
        .unwrap();
    group.writeback().unwrap();

    let read = Group::from_source(&ty, store.root()).unwrap();
    let record = read.as_record().unwrap();
    assert!(record.has_value("meta").unwrap());
    assert_eq!(record.get("meta").unwrap().as_table().unwrap().number_of_rows(), 3);
    let notes = record.get("notes").unwrap().as_list().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes.get(0).unwrap().as_text().unwrap().get().unwrap(), "first");
}

#[test]
fn dict_remove_and_iterate() {
    let store = stored_dict();
    let mut dict = Dict::from_source(ContainerType::Table, store.root()).unwrap();
    dict.insert("b", xy().into()).unwrap();
    let keys: Vec<String> = dict
        .iter()
        .map(|item| item.unwrap().0.to_owned())
        .collect();
    assert_eq!(keys, vec!["a", "b"]);

    let removed = dict.remove("a").unwrap();
    assert_eq!(removed.as_table().unwrap().number_of_rows(), 3);
    assert_eq!(dict.remove("a").unwrap_err(), Error::KeyNotFound("a".into()));
    Group::Dict(dict).writeback().unwrap();
    assert_eq!(store.root().keys().unwrap(), vec!["b"]);
}

#[test]
fn read_only_groups() {
    let store = MemoryStore::with_options(MemoryStoreOptions {
        read_only: true,
        ..MemoryStoreOptions::default()
    });
    let mut dict = Dict::from_source(ContainerType::Table, store.root()).unwrap();
    dict.insert("a", xy().into()).unwrap();
    assert_eq!(
        Group::Dict(dict).writeback().unwrap_err(),
        Error::WritebackReadOnly
    );
    assert_eq!(
        Group::Table(xy()).writeback().unwrap_err(),
        Error::WritebackReadOnly
    );
}

fn values(v: i64) -> Group {
    let mut table = Table::new();
    table.set_column("v", vec![v]).unwrap();
    table.into()
}

fn stored_v(group: &Group, index: usize) -> ColumnData {
    let table = match group {
        Group::List(list) => list.get(index).unwrap().as_table().unwrap().clone(),
        other => panic!("expected a list, found {}", other.variant_name()),
    };
    (*table.get_column("v").unwrap()).clone()
}

#[test]
fn swapped_list_items_are_written_back() {
    init_test_logger();
    let ty = ContainerType::list(ContainerType::Table);
    let store = MemoryStore::with_root(&ty, MemoryStoreOptions::default());
    let mut list = List::from_source(ContainerType::Table, store.root()).unwrap();
    list.push(values(1)).unwrap();
    list.push(values(2)).unwrap();
    Group::List(list).writeback().unwrap();

    let mut list = List::from_source(ContainerType::Table, store.root()).unwrap();
    let first = list.get(0).unwrap().clone();
    let second = list.get(1).unwrap().clone();
    list.set(0, second).unwrap();
    list.set(1, first).unwrap();
    store.reset_stats();
    Group::List(list).writeback().unwrap();

    assert_eq!(store.stats().columns_written, 0);
    assert_eq!(store.stats().groups_linked, 2);
    let read = Group::from_source(&ty, store.root()).unwrap();
    assert_eq!(stored_v(&read, 0), ColumnData::Int(vec![2]));
    assert_eq!(stored_v(&read, 1), ColumnData::Int(vec![1]));
}

#[test]
fn swapped_and_renamed_dict_values_are_written_back() {
    let store = MemoryStore::new();
    let mut dict = Dict::from_source(ContainerType::Table, store.root()).unwrap();
    dict.insert("a", values(1)).unwrap();
    dict.insert("b", values(2)).unwrap();
    Group::Dict(dict).writeback().unwrap();

    let mut dict = Dict::from_source(ContainerType::Table, store.root()).unwrap();
    let a = dict.remove("a").unwrap();
    let b = dict.get("b").unwrap().clone();
    dict.insert("b", a.clone()).unwrap();
    dict.insert("a", b).unwrap();
    dict.insert("c", a).unwrap();
    Group::Dict(dict).writeback().unwrap();

    assert_eq!(store.root().keys().unwrap(), vec!["b", "a", "c"]);
    for (key, v) in [("a", 2), ("b", 1), ("c", 1)] {
        assert_eq!(
            *store.column_data(&[key], "v").unwrap(),
            ColumnData::Int(vec![v]),
            "{key}"
        );
    }
}

#[test]
fn moved_children_of_changed_items_keep_their_data() {
    let ty = ContainerType::list(ContainerType::dict(ContainerType::Table));
    let store = MemoryStore::with_root(&ty, MemoryStoreOptions::default());
    let mut list = List::from_source(ContainerType::dict(ContainerType::Table), store.root()).unwrap();
    for v in [1, 2] {
        let mut dict = Dict::new(ContainerType::Table);
        dict.insert("t", values(v)).unwrap();
        list.push(dict.into()).unwrap();
    }
    Group::List(list).writeback().unwrap();

    let mut list = List::from_source(ContainerType::dict(ContainerType::Table), store.root()).unwrap();
    let mut first = list.get(0).unwrap().clone();
    let second = list.get(1).unwrap().clone();
    first.as_dict_mut().unwrap().insert("u", values(3)).unwrap();
    list.set(0, second).unwrap();
    list.set(1, first).unwrap();
    Group::List(list).writeback().unwrap();

    assert_eq!(*store.column_data(&["0", "t"], "v").unwrap(), ColumnData::Int(vec![2]));
    assert_eq!(*store.column_data(&["1", "t"], "v").unwrap(), ColumnData::Int(vec![1]));
    assert_eq!(*store.column_data(&["1", "u"], "v").unwrap(), ColumnData::Int(vec![3]));
}

#[test]
fn children_of_another_kind_are_not_replaced() {
    let store = MemoryStore::new();
    store
        .root()
        .write_with_type("a", &ContainerType::Text)
        .unwrap();
    let mut dict = Dict::new(ContainerType::Table);
    dict.insert("a", xy().into()).unwrap();
    assert!(matches!(
        Group::Dict(dict).write_into(store.root().as_ref()).unwrap_err(),
        Error::TypeMismatch { .. }
    ));
    assert!(store
        .root()
        .read_with_type("a", &ContainerType::Text)
        .unwrap()
        .is_some());
}
