use std::rc::Rc;

use itertools::{Itertools, MinMaxResult};
use tracing::debug;

use super::GroupVisitor;
use crate::attributes::Attributes;
use crate::config::VJoinOptions;
use crate::data::ColumnData;
use crate::error::{Error, Result};
use crate::group::{assert_type, ContainerType, List};
use crate::table::Table;

/// Vertical join: stacks the rows of the visited list of tables and adds the
/// result to `current`.
pub struct VJoinVisitor<'a> {
    current: &'a mut Table,
    options: &'a VJoinOptions,
}

impl<'a> VJoinVisitor<'a> {
    pub fn new(current: &'a mut Table, options: &'a VJoinOptions) -> Self {
        Self { current, options }
    }
}

impl GroupVisitor for VJoinVisitor<'_> {
    fn name(&self) -> &'static str {
        "VJoinVisitor"
    }

    fn visit_list(&mut self, list: &List) -> Result<()> {
        assert_type(&ContainerType::Table, list.content_type())?;
        let tables = list
            .iter()
            .map(|item| {
                let item = item?;
                item.as_table().ok_or_else(|| Error::TypeMismatch {
                    expected: ContainerType::Table.to_string(),
                    found: item.container_type().to_string(),
                })
            })
            .collect::<Result<Vec<&Table>>>()?;
        let joined = Table::vjoin(&tables, self.options)?;
        self.current.update(&joined)
    }
}

/// Renumbers the group indexes of consecutive tables so that the indexes of
/// different tables never collide.
///
/// Each table's indexes are shifted to start at the running offset, which
/// then moves past the table's range of indexes.  A table without rows moves
/// the offset by the minimum increment.
#[derive(Debug, Clone)]
pub struct IndexOffsets {
    offset: i64,
    minimum_increment: i64,
}

impl IndexOffsets {
    pub fn new(minimum_increment: i64) -> Self {
        Self {
            offset: 0,
            minimum_increment,
        }
    }

    /// The next free index.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Renumbers the indexes of the next table, which has `len` rows.
    ///
    /// `own` holds the table's own indexes and decides the number of rows
    /// when given; a table without them counts as a single group 0.
    pub fn push(&mut self, own: Option<&[i64]>, len: usize) -> Vec<i64> {
        let zeros;
        let own = match own {
            Some(own) => own,
            None => {
                zeros = vec![0; len];
                &zeros
            }
        };
        let (min, max) = match own.iter().minmax() {
            MinMaxResult::NoElements => {
                self.offset += self.minimum_increment;
                return Vec::new();
            }
            MinMaxResult::OneElement(&only) => (only, only),
            MinMaxResult::MinMax(&min, &max) => (min, max),
        };
        let renumbered = own.iter().map(|&i| i - min + self.offset).collect();
        self.offset += max - min + 1;
        renumbered
    }
}

impl Table {
    /// Stacks the rows of `tables` in order.
    ///
    /// With `fill` the result has the union of the tables' columns, in the
    /// order they are first seen, and a table lacking a column contributes
    /// fill values for it.  Without `fill` only the columns every table has
    /// are kept.  Tables without columns only count towards the index.
    ///
    /// Column attributes and table attributes are merged over the tables, the
    /// later ones winning.
    pub fn vjoin(tables: &[&Table], options: &VJoinOptions) -> Result<Table> {
        let reserved: Vec<&str> = match &options.output_index {
            Some(output) => [Some(output.as_str()), options.input_index.as_deref()]
                .into_iter()
                .flatten()
                .collect(),
            None => Vec::new(),
        };
        let filled: Vec<&Table> = tables.iter().copied().filter(|t| !t.is_empty()).collect();

        let names: Vec<String> = if options.fill {
            filled
                .iter()
                .flat_map(|table| table.column_names())
                .unique()
                .collect()
        } else {
            match filled.split_first() {
                Some((first, rest)) => first
                    .column_names()
                    .into_iter()
                    .filter(|name| rest.iter().all(|table| table.has_column(name)))
                    .collect(),
                None => Vec::new(),
            }
        };
        let names: Vec<String> = names
            .into_iter()
            .filter(|name| !reserved.contains(&name.as_str()))
            .collect();

        let mut result = Table::new();
        for name in &names {
            let (data, attributes) = join_column(name, &filled)?;
            result.set_column_with_attributes(name, Rc::new(data), Rc::new(attributes))?;
        }

        if let Some(output) = &options.output_index {
            if !result.is_empty() {
                let index = join_index(tables, options)?;
                result.set_column(output, index)?;
            }
        }

        let mut attributes = Attributes::new();
        let mut name = None;
        for table in tables {
            attributes.merge(&*table.table_attributes()?);
            if name.is_none() {
                name = table.name()?;
            }
        }
        result.set_table_attributes(attributes);
        result.set_name(name.as_deref());
        debug!(
            "joined {} tables into {} rows of {} columns",
            tables.len(),
            result.number_of_rows(),
            result.number_of_columns()
        );
        Ok(result)
    }
}

/// Concatenates column `name` over `tables`, filling in for the tables that
/// lack it.
fn join_column(name: &str, tables: &[&Table]) -> Result<(ColumnData, Attributes)> {
    let dtype = match tables.iter().find(|table| table.has_column(name)) {
        Some(table) => table.column_type(name)?,
        None => return Err(Error::ColumnNotFound(name.to_owned())),
    };
    let mut parts = Vec::with_capacity(tables.len());
    let mut attributes = Attributes::new();
    for table in tables {
        if table.has_column(name) {
            parts.push((*table.get_column(name)?).clone());
            attributes.merge(&*table.column_attributes(name)?);
        } else if table.number_of_rows() > 0 {
            parts.push(ColumnData::filled(dtype, table.number_of_rows()));
        }
    }
    Ok((ColumnData::concat(&parts)?, attributes))
}

fn join_index(tables: &[&Table], options: &VJoinOptions) -> Result<Vec<i64>> {
    let mut offsets = IndexOffsets::new(options.minimum_increment);
    let mut index = Vec::new();
    for table in tables {
        let own = match &options.input_index {
            Some(input) if table.has_column(input) => Some(table.get_column(input)?.to_index()?),
            _ => None,
        };
        index.extend(offsets.push(own.as_deref(), table.number_of_rows()));
    }
    Ok(index)
}
