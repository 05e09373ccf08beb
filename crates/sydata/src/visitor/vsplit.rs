use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use super::fill::is_fill;
use super::GroupVisitor;
use crate::attributes::Attributes;
use crate::config::VSplitOptions;
use crate::error::Result;
use crate::group::{Group, List};
use crate::selection::Resolved;
use crate::table::Table;

/// Vertical split: appends one table per group of rows of the visited table
/// to `output`.
pub struct VSplitVisitor<'a> {
    output: &'a mut List,
    options: &'a VSplitOptions,
}

impl<'a> VSplitVisitor<'a> {
    pub fn new(output: &'a mut List, options: &'a VSplitOptions) -> Self {
        Self { output, options }
    }
}

impl GroupVisitor for VSplitVisitor<'_> {
    fn name(&self) -> &'static str {
        "VSplitVisitor"
    }

    fn visit_table(&mut self, table: &Table) -> Result<()> {
        for part in table.vsplit(self.options)? {
            self.output.push(Group::Table(part))?;
        }
        Ok(())
    }
}

impl Table {
    /// Splits the rows into groups by the `input_index` column, one table per
    /// distinct index value in increasing order.  Without an index column
    /// every row is a group of its own.
    ///
    /// Every part keeps all columns, the index column included, except that
    /// `remove_fill` drops the columns a part only has fill values for.  The
    /// parts share the column attributes and the table attributes.
    pub fn vsplit(&self, options: &VSplitOptions) -> Result<Vec<Table>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let groups: Vec<Vec<usize>> = match &options.input_index {
            Some(input) => {
                let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
                for (row, label) in self.get_column(input)?.to_index()?.into_iter().enumerate() {
                    groups.entry(label).or_default().push(row);
                }
                groups.into_values().collect()
            }
            None => (0..self.number_of_rows()).map(|row| vec![row]).collect(),
        };

        let names = self.column_names();
        let column_attributes = names
            .iter()
            .map(|name| self.column_attributes(name))
            .collect::<Result<Vec<Rc<Attributes>>>>()?;
        let table_attributes = self.table_attributes()?;
        let name = self.name()?;

        let mut parts = Vec::with_capacity(groups.len());
        for rows in groups {
            let rows = Resolved::from_indices(rows);
            let mut part = Table::new();
            part.set_name(name.as_deref());
            part.share_table_attributes(table_attributes.clone());
            for (column, attributes) in names.iter().zip(&column_attributes) {
                let data = self.column(column)?.get(Some(&rows))?;
                if options.remove_fill && is_fill(&data) {
                    continue;
                }
                part.set_column_with_attributes(column, data, attributes.clone())?;
            }
            parts.push(part);
        }
        debug!("split {} rows into {} tables", self.number_of_rows(), parts.len());
        Ok(parts)
    }
}
