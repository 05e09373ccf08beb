//! Structural operations over nested containers.
//!
//! Every operation is a [`GroupVisitor`]: [`Group::accept`] calls the
//! `visit_*` method for the visited variant.  A visitor only implements the
//! variants its operation is defined for; the others fail with
//! [`Error::UnsupportedVariant`].
//!
//! | visitor              | dict | list | record | tuple | table | text |
//! |----------------------|------|------|--------|-------|-------|------|
//! | [`HJoinVisitor`]     | yes  | yes  | yes    | yes   | yes   | yes  |
//! | [`VJoinVisitor`]     |      | yes  |        |       |       |      |
//! | [`VSplitVisitor`]    |      |      |        |       | yes   |      |
//! | [`SpineCopyVisitor`] | yes  | yes  | yes    | yes   | yes   | yes  |

use crate::config::{VJoinOptions, VSplitOptions};
use crate::error::{Error, Result};
use crate::group::{ContainerType, Dict, Group, List, Record, Text, Tuple};
use crate::table::Table;

pub mod fill;
mod hjoin;
mod spinecopy;
mod vjoin;
mod vsplit;

#[cfg(test)]
mod tests;

pub use hjoin::HJoinVisitor;
pub use spinecopy::SpineCopyVisitor;
pub use vjoin::{IndexOffsets, VJoinVisitor};
pub use vsplit::VSplitVisitor;

/// An operation over the variants of [`Group`].
pub trait GroupVisitor {
    /// Name of the visitor, as used in errors.
    fn name(&self) -> &'static str;

    fn visit_dict(&mut self, _dict: &Dict) -> Result<()> {
        Err(unsupported(self.name(), "dict"))
    }

    fn visit_list(&mut self, _list: &List) -> Result<()> {
        Err(unsupported(self.name(), "list"))
    }

    fn visit_record(&mut self, _record: &Record) -> Result<()> {
        Err(unsupported(self.name(), "record"))
    }

    fn visit_tuple(&mut self, _tuple: &Tuple) -> Result<()> {
        Err(unsupported(self.name(), "tuple"))
    }

    fn visit_table(&mut self, _table: &Table) -> Result<()> {
        Err(unsupported(self.name(), "table"))
    }

    fn visit_text(&mut self, _text: &Text) -> Result<()> {
        Err(unsupported(self.name(), "text"))
    }
}

fn unsupported(visitor: &'static str, variant: &'static str) -> Error {
    Error::UnsupportedVariant { visitor, variant }
}

/// Error for a visited container whose type does not match the current
/// one.
fn mismatch(current: &Group, found: ContainerType) -> Error {
    Error::TypeMismatch {
        expected: current.container_type().to_string(),
        found: found.to_string(),
    }
}

/// Adds the content of `other` to `current`, `other` winning on conflicts.
pub fn hjoin(current: &mut Group, other: &Group) -> Result<()> {
    other.accept(&mut HJoinVisitor::new(current))
}

/// Stacks the rows of the tables in the list `other` and adds the result to
/// `current`.
pub fn vjoin(current: &mut Table, other: &Group, options: &VJoinOptions) -> Result<()> {
    other.accept(&mut VJoinVisitor::new(current, options))
}

/// Splits the rows of the table `table` into groups, appending one table
/// per group to `output`.
pub fn vsplit(table: &Group, output: &mut List, options: &VSplitOptions) -> Result<()> {
    table.accept(&mut VSplitVisitor::new(output, options))
}

/// Copies the structure of `group`, linking the tables and texts it holds.
pub fn spinecopy(group: &Group) -> Result<Group> {
    let mut visitor = SpineCopyVisitor::new();
    group.accept(&mut visitor)?;
    visitor
        .into_output()
        .ok_or_else(|| unsupported("SpineCopyVisitor", group.variant_name()))
}
