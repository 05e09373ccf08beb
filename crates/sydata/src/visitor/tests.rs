use std::collections::BTreeSet;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::{hjoin, spinecopy, vjoin, vsplit, IndexOffsets};
use crate::attributes::AttrValue;
use crate::config::{VJoinOptions, VSplitOptions};
use crate::data::ColumnData;
use crate::error::Error;
use crate::group::{ContainerType, Dict, Group, List, Record, Text, Tuple};
use crate::table::Table;
use crate::test::init_test_logger;

fn table(columns: Vec<(&str, ColumnData)>) -> Table {
    let mut table = Table::new();
    for (name, data) in columns {
        table.set_column(name, data).unwrap();
    }
    table
}

fn ints(table: &Table, name: &str) -> Vec<i64> {
    match &*table.get_column(name).unwrap() {
        ColumnData::Int(values) => values.clone(),
        other => panic!("{name} is {}", other.dtype()),
    }
}

fn floats(table: &Table, name: &str) -> Vec<f64> {
    match &*table.get_column(name).unwrap() {
        ColumnData::Float(values) => values.clone(),
        other => panic!("{name} is {}", other.dtype()),
    }
}

fn texts(table: &Table, name: &str) -> Vec<String> {
    match &*table.get_column(name).unwrap() {
        ColumnData::Text(values) => values.clone(),
        other => panic!("{name} is {}", other.dtype()),
    }
}

/// Two rows of `a` and `b`.
fn t1() -> Table {
    table(vec![
        ("a", vec![1i64, 2].into()),
        ("b", vec!["x", "y"].into()),
    ])
}

/// Three rows of `a` and `c`.
fn t2() -> Table {
    table(vec![
        ("a", vec![3i64, 4, 5].into()),
        ("c", vec![1.5, 2.5, 3.5].into()),
    ])
}

fn table_list(tables: Vec<Table>) -> Group {
    let mut list = List::new(ContainerType::Table);
    for table in tables {
        list.push(table.into()).unwrap();
    }
    list.into()
}

#[test]
fn vjoin_fills_the_union_of_columns() {
    init_test_logger();
    let joined = Table::vjoin(&[&t1(), &t2()], &VJoinOptions::default()).unwrap();

    assert_eq!(joined.column_names(), vec!["a", "b", "c"]);
    assert_eq!(joined.number_of_rows(), 5);
    assert_eq!(ints(&joined, "a"), vec![1, 2, 3, 4, 5]);
    assert_eq!(texts(&joined, "b"), vec!["x", "y", "", "", ""]);
    let c = floats(&joined, "c");
    assert!(c[..2].iter().all(|v| v.is_nan()));
    assert_eq!(c[2..], [1.5, 2.5, 3.5]);
}

#[test]
fn vjoin_without_fill_keeps_common_columns() {
    let options = VJoinOptions {
        fill: false,
        ..VJoinOptions::default()
    };
    let joined = Table::vjoin(&[&t1(), &t2()], &options).unwrap();
    assert_eq!(joined.column_names(), vec!["a"]);
    assert_eq!(joined.number_of_rows(), 5);

    let nothing = Table::vjoin(&[&Table::new(), &Table::new()], &options).unwrap();
    assert!(nothing.is_empty());
}

#[test]
fn vjoin_of_integers_and_fill_gives_floats() {
    let with_ints = table(vec![("n", vec![7i64].into())]);
    let without = table(vec![("m", vec![true, false].into())]);
    let joined = Table::vjoin(&[&with_ints, &without], &VJoinOptions::default()).unwrap();
    let n = floats(&joined, "n");
    assert_eq!(n[0], 7.0);
    assert!(n[1].is_nan() && n[2].is_nan());
}

#[test]
fn vjoin_index_defaults_to_one_group_per_table() {
    let options = VJoinOptions {
        output_index: Some("idx".into()),
        ..VJoinOptions::default()
    };
    let joined = Table::vjoin(&[&t1(), &t2()], &options).unwrap();
    assert_eq!(joined.column_names(), vec!["a", "b", "c", "idx"]);
    assert_eq!(ints(&joined, "idx"), vec![0, 0, 1, 1, 1]);
}

#[test]
fn vjoin_index_counts_tables_without_columns() {
    let mut options = VJoinOptions {
        output_index: Some("idx".into()),
        ..VJoinOptions::default()
    };
    let tables = [&t1(), &Table::new(), &t2()];
    let joined = Table::vjoin(&tables, &options).unwrap();
    assert_eq!(ints(&joined, "idx"), vec![0, 0, 2, 2, 2]);

    options.minimum_increment = 5;
    let joined = Table::vjoin(&tables, &options).unwrap();
    assert_eq!(ints(&joined, "idx"), vec![0, 0, 6, 6, 6]);

    let empty = Table::vjoin(&[&Table::new()], &options).unwrap();
    assert!(empty.is_empty());
}

#[test]
fn vjoin_renumbers_input_indexes() {
    let first = table(vec![
        ("v", vec![1i64, 2, 3].into()),
        ("idx", vec![3i64, 3, 5].into()),
    ]);
    let second = table(vec![
        ("v", vec![4i64, 5].into()),
        ("idx", vec![0i64, 1].into()),
    ]);
    let joined = Table::vjoin(&[&first, &second], &VJoinOptions::indexed("idx")).unwrap();
    assert_eq!(joined.column_names(), vec!["v", "idx"]);
    assert_eq!(ints(&joined, "v"), vec![1, 2, 3, 4, 5]);
    assert_eq!(ints(&joined, "idx"), vec![0, 0, 2, 3, 4]);
}

#[test]
fn vjoin_merges_attributes() {
    let mut first = t1();
    first
        .set_column_attribute_pairs("a", [("unit", "m"), ("description", "first")])
        .unwrap();
    first.set_table_attribute_pairs([("source", "one")]).unwrap();
    first.set_name(Some("first"));
    let mut second = t2();
    second.set_column_attribute_pairs("a", [("unit", "km")]).unwrap();
    second
        .set_table_attribute_pairs([("source", "two"), ("kind", "log")])
        .unwrap();

    let joined = Table::vjoin(&[&first, &second], &VJoinOptions::default()).unwrap();
    let a = joined.column_attributes("a").unwrap();
    assert_eq!(a.get("unit"), Some(&AttrValue::from("km")));
    assert_eq!(a.get("description"), Some(&AttrValue::from("first")));
    assert!(joined.column_attributes("c").unwrap().is_empty());

    let attributes = joined.table_attributes().unwrap();
    assert_eq!(attributes.keys().collect::<Vec<_>>(), vec!["source", "kind"]);
    assert_eq!(attributes.get("source"), Some(&AttrValue::from("two")));
    assert_eq!(joined.name().unwrap().as_deref(), Some("first"));
}

#[test]
fn vjoin_rejects_incompatible_columns() {
    let texts = table(vec![("a", vec!["x"].into())]);
    assert_eq!(
        Table::vjoin(&[&t1(), &texts], &VJoinOptions::default()).unwrap_err(),
        Error::ColumnTypeMismatch {
            expected: crate::data::DataType::Int,
            found: crate::data::DataType::Text,
        }
    );
}

#[test]
fn vjoin_visitor_updates_current() {
    let mut current = table(vec![("a", vec![0i64; 5].into()), ("z", vec![9i64; 5].into())]);
    vjoin(&mut current, &table_list(vec![t1(), t2()]), &VJoinOptions::default()).unwrap();
    assert_eq!(current.column_names(), vec!["a", "z", "b", "c"]);
    assert_eq!(ints(&current, "a"), vec![1, 2, 3, 4, 5]);
    assert_eq!(ints(&current, "z"), vec![9; 5]);

    assert_eq!(
        vjoin(&mut current, &Group::Table(t1()), &VJoinOptions::default()).unwrap_err(),
        Error::UnsupportedVariant {
            visitor: "VJoinVisitor",
            variant: "table"
        }
    );
    let texts: Group = List::new(ContainerType::Text).into();
    assert!(matches!(
        vjoin(&mut current, &texts, &VJoinOptions::default()).unwrap_err(),
        Error::TypeMismatch { .. }
    ));
}

fn labelled() -> Table {
    table(vec![
        ("v", vec![10i64, 20, 30, 40].into()),
        ("idx", vec![2i64, 0, 2, 1].into()),
    ])
}

#[test]
fn vsplit_groups_rows_by_index() {
    init_test_logger();
    let options = VSplitOptions {
        input_index: Some("idx".into()),
        ..VSplitOptions::default()
    };
    let parts = labelled().vsplit(&options).unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(ints(&parts[0], "v"), vec![20]);
    assert_eq!(ints(&parts[1], "v"), vec![40]);
    assert_eq!(ints(&parts[2], "v"), vec![10, 30]);
    assert_eq!(ints(&parts[2], "idx"), vec![2, 2]);
    assert_eq!(parts[2].column_names(), vec!["v", "idx"]);
}

#[test]
fn vsplit_without_index_splits_rows() {
    let parts = t2().vsplit(&VSplitOptions::default()).unwrap();
    assert_eq!(parts.len(), 3);
    for (part, expected) in parts.iter().zip([3, 4, 5]) {
        assert_eq!(part.number_of_rows(), 1);
        assert_eq!(ints(part, "a"), vec![expected]);
    }
    assert!(Table::new().vsplit(&VSplitOptions::default()).unwrap().is_empty());
}

#[test]
fn vsplit_missing_index_column() {
    let options = VSplitOptions {
        input_index: Some("nope".into()),
        ..VSplitOptions::default()
    };
    assert_eq!(
        t1().vsplit(&options).unwrap_err(),
        Error::ColumnNotFound("nope".into())
    );
}

#[test]
fn vsplit_accepts_whole_float_indexes() {
    let labelled = table(vec![("v", vec![1i64, 2].into()), ("idx", vec![0i64, 1].into())]);
    let options = VSplitOptions {
        input_index: Some("idx".into()),
        ..VSplitOptions::default()
    };

    let float_labels = table(vec![("v", vec![3i64].into()), ("idx", vec![1.0].into())]);
    let joined = Table::vjoin(&[&labelled, &float_labels], &VJoinOptions::default()).unwrap();
    assert_eq!(floats(&joined, "idx"), vec![0.0, 1.0, 1.0]);
    let parts = joined.vsplit(&options).unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(ints(&parts[1], "v"), vec![2, 3]);

    let unlabelled = table(vec![("v", vec![3i64].into())]);
    let joined = Table::vjoin(&[&labelled, &unlabelled], &VJoinOptions::default()).unwrap();
    assert!(matches!(
        joined.vsplit(&options).unwrap_err(),
        Error::InvalidIndex(_)
    ));
}

#[test]
fn vsplit_removes_fill() {
    let joined = Table::vjoin(
        &[&t1(), &t2()],
        &VJoinOptions {
            output_index: Some("idx".into()),
            ..VJoinOptions::default()
        },
    )
    .unwrap();
    let mut options = VSplitOptions {
        input_index: Some("idx".into()),
        remove_fill: true,
    };
    let parts = joined.vsplit(&options).unwrap();
    assert_eq!(parts[0].column_names(), vec!["a", "b", "idx"]);
    assert_eq!(parts[1].column_names(), vec!["a", "c", "idx"]);

    options.remove_fill = false;
    let parts = joined.vsplit(&options).unwrap();
    assert_eq!(parts[0].column_names(), vec!["a", "b", "c", "idx"]);
}

#[test]
fn vsplit_shares_attributes() {
    let mut source = labelled();
    source.set_column_attribute_pairs("v", [("unit", "s")]).unwrap();
    source.set_table_attribute_pairs([("kind", "log")]).unwrap();
    let parts = source
        .vsplit(&VSplitOptions {
            input_index: Some("idx".into()),
            ..VSplitOptions::default()
        })
        .unwrap();
    let first = parts[0].column_attributes("v").unwrap();
    for part in &parts[1..] {
        assert!(Rc::ptr_eq(&first, &part.column_attributes("v").unwrap()));
        assert!(Rc::ptr_eq(
            &parts[0].table_attributes().unwrap(),
            &part.table_attributes().unwrap()
        ));
    }
    assert_eq!(first.get("unit"), Some(&AttrValue::from("s")));
}

#[test]
fn vsplit_visitor_appends_tables() {
    let mut output = List::new(ContainerType::Table);
    output.push(t1().into()).unwrap();
    vsplit(&Group::Table(t2()), &mut output, &VSplitOptions::default()).unwrap();
    assert_eq!(output.len(), 4);

    assert_eq!(
        vsplit(
            &Dict::new(ContainerType::Table).into(),
            &mut output,
            &VSplitOptions::default()
        )
        .unwrap_err(),
        Error::UnsupportedVariant {
            visitor: "VSplitVisitor",
            variant: "dict"
        }
    );

    let mut texts = List::new(ContainerType::Text);
    assert!(vsplit(&Group::Table(t2()), &mut texts, &VSplitOptions::default()).is_err());
}

#[test]
fn hjoin_dicts_and_lists() {
    let mut current = Dict::new(ContainerType::Text);
    let mut hello = Text::new();
    hello.set("hello");
    current.insert("a", hello.into()).unwrap();
    let mut other = Dict::new(ContainerType::Text);
    let mut world = Text::new();
    world.set("world");
    other.insert("a", world.clone().into()).unwrap();
    other.insert("b", world.into()).unwrap();

    let mut current = Group::Dict(current);
    hjoin(&mut current, &other.into()).unwrap();
    let dict = current.as_dict().unwrap();
    assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(dict.get("a").unwrap().as_text().unwrap().get().unwrap(), "world");

    let mut empty = Group::List(List::new(ContainerType::Table));
    hjoin(&mut empty, &table_list(vec![t1(), t2()])).unwrap();
    assert_eq!(empty.as_list().unwrap().len(), 2);

    let mut short = table_list(vec![table(vec![("z", vec![0i64, 0].into())])]);
    hjoin(&mut short, &table_list(vec![t1(), t2()])).unwrap();
    let list = short.as_list().unwrap();
    assert_eq!(list.len(), 1);
    let first = list.get(0).unwrap().as_table().unwrap();
    assert_eq!(first.column_names(), vec!["z", "a", "b"]);
}

#[test]
fn hjoin_records_and_tuples() {
    let fields = vec![
        ("meta".to_owned(), ContainerType::Table),
        ("note".to_owned(), ContainerType::Text),
    ];
    let mut current = Record::new(fields.clone());
    current.set("meta", t1().into()).unwrap();
    let mut other = Record::new(fields);
    other
        .set("meta", table(vec![("d", vec![0.5, 0.25].into())]).into())
        .unwrap();
    let mut note = Text::new();
    note.set("joined");
    other.set("note", note.into()).unwrap();

    let mut current = Group::Record(current);
    hjoin(&mut current, &other.into()).unwrap();
    let record = current.as_record().unwrap();
    let meta = record.get("meta").unwrap().as_table().unwrap();
    assert_eq!(meta.column_names(), vec!["a", "b", "d"]);
    assert_eq!(
        record.get("note").unwrap().as_text().unwrap().get().unwrap(),
        "joined"
    );

    let mut current = Group::Tuple(Tuple::new(vec![ContainerType::Table]));
    let mut other = Tuple::new(vec![ContainerType::Table]);
    other.set(0, t2().into()).unwrap();
    hjoin(&mut current, &other.into()).unwrap();
    let tuple = current.as_tuple().unwrap();
    assert!(tuple.has_value(0).unwrap());
    assert_eq!(tuple.get(0).unwrap().as_table().unwrap().number_of_rows(), 3);
}

#[test]
fn hjoin_mismatched_variants() {
    let mut current = Group::Table(t1());
    let err = hjoin(&mut current, &Text::new().into()).unwrap_err();
    assert_eq!(
        err,
        Error::TypeMismatch {
            expected: "table".into(),
            found: "text".into(),
        }
    );

    let mut current = Group::Table(t1());
    assert!(matches!(
        hjoin(&mut current, &Group::Table(t2())).unwrap_err(),
        Error::ColumnLength { .. }
    ));
}

#[test]
fn spinecopy_links_leaves() {
    let mut dict = Dict::new(ContainerType::Table);
    dict.insert("t", t1().into()).unwrap();
    let original = Group::Dict(dict);

    let mut copy = spinecopy(&original).unwrap();
    let copied = copy.as_dict().unwrap().get("t").unwrap().as_table().unwrap();
    let source = original.as_dict().unwrap().get("t").unwrap().as_table().unwrap();
    assert!(copied.column("a").unwrap().shares_source(source.column("a").unwrap()));

    copy.as_dict_mut()
        .unwrap()
        .get_mut("t")
        .unwrap()
        .as_table_mut()
        .unwrap()
        .set_column("a", vec![0i64, 0])
        .unwrap();
    assert_eq!(ints(source, "a"), vec![1, 2]);
}

#[test]
fn spinecopy_keeps_unset_fields_unset() {
    let mut record = Record::new(vec![
        ("meta".to_owned(), ContainerType::Table),
        ("res".to_owned(), ContainerType::Table),
    ]);
    record.set("meta", t1().into()).unwrap();
    let copy = spinecopy(&record.into()).unwrap();
    let copy = copy.as_record().unwrap();
    assert!(copy.has_value("meta").unwrap());
    assert!(!copy.has_value("res").unwrap());
}

proptest! {
    #[test]
    fn vsplit_then_vjoin_regroups_rows(rows in prop::collection::vec((0i64..5, any::<i64>()), 1..40)) {
        let labels: Vec<i64> = rows.iter().map(|(label, _)| *label).collect();
        let values: Vec<i64> = rows.iter().map(|(_, value)| *value).collect();
        let source = table(vec![("v", values.into()), ("idx", labels.clone().into())]);

        let parts = source
            .vsplit(&VSplitOptions { input_index: Some("idx".into()), remove_fill: false })
            .unwrap();
        let refs: Vec<&Table> = parts.iter().collect();
        let joined = Table::vjoin(&refs, &VJoinOptions::indexed("idx")).unwrap();

        let distinct: Vec<i64> = labels.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let mut expected_values = Vec::new();
        let mut expected_index = Vec::new();
        for (rank, label) in distinct.iter().enumerate() {
            for (l, v) in &rows {
                if l == label {
                    expected_values.push(*v);
                    expected_index.push(rank as i64);
                }
            }
        }
        prop_assert_eq!(ints(&joined, "v"), expected_values);
        prop_assert_eq!(ints(&joined, "idx"), expected_index);
    }

    #[test]
    fn index_offsets_never_collide(
        tables in prop::collection::vec(
            prop::option::of(prop::collection::vec(-50i64..50, 0..6)),
            1..12,
        ),
        minimum_increment in 1i64..4,
        len in 0usize..4,
    ) {
        let mut offsets = IndexOffsets::new(minimum_increment);
        let mut previous_max = None;
        for own in &tables {
            let start = offsets.offset();
            let renumbered = offsets.push(own.as_deref(), len);
            let expected_len = own.as_ref().map_or(len, Vec::len);
            prop_assert_eq!(renumbered.len(), expected_len);
            if let Some(&min) = renumbered.iter().min() {
                prop_assert_eq!(min, start);
                if let Some(max) = previous_max {
                    prop_assert!(min > max);
                }
                previous_max = renumbered.iter().max().copied();
            } else {
                prop_assert_eq!(offsets.offset(), start + minimum_increment);
            }
            if let Some(own) = own {
                for (a, b) in own.iter().zip(&renumbered) {
                    prop_assert_eq!(b - a, renumbered[0] - own[0]);
                }
            }
        }
    }
}
