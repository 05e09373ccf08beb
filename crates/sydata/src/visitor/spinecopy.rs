use super::{spinecopy, GroupVisitor};
use crate::error::Result;
use crate::group::{Dict, Group, List, Record, Text, Tuple};
use crate::table::Table;

/// Copies the nested containers of the visited group.  Tables and texts at
/// the leaves are not copied: the copies link their content.
#[derive(Debug, Default)]
pub struct SpineCopyVisitor {
    output: Option<Group>,
}

impl SpineCopyVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The copy of the last visited group.
    pub fn into_output(self) -> Option<Group> {
        self.output
    }
}

impl GroupVisitor for SpineCopyVisitor {
    fn name(&self) -> &'static str {
        "SpineCopyVisitor"
    }

    fn visit_dict(&mut self, dict: &Dict) -> Result<()> {
        let mut copy = Dict::new(dict.content_type().clone());
        for item in dict.iter() {
            let (key, value) = item?;
            copy.insert(key, spinecopy(value)?)?;
        }
        self.output = Some(copy.into());
        Ok(())
    }

    fn visit_list(&mut self, list: &List) -> Result<()> {
        let mut copy = List::new(list.content_type().clone());
        for item in list.iter() {
            copy.push(spinecopy(item?)?)?;
        }
        self.output = Some(copy.into());
        Ok(())
    }

    /// Fields that read as defaults stay unset in the copy.
    fn visit_record(&mut self, record: &Record) -> Result<()> {
        let mut copy = Record::new(record.fields().to_vec());
        for name in record.field_names() {
            if record.has_value(name)? {
                copy.set(name, spinecopy(record.get(name)?)?)?;
            }
        }
        self.output = Some(copy.into());
        Ok(())
    }

    fn visit_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let mut copy = Tuple::new(tuple.types().to_vec());
        for i in 0..tuple.len() {
            if tuple.has_value(i)? {
                copy.set(i, spinecopy(tuple.get(i)?)?)?;
            }
        }
        self.output = Some(copy.into());
        Ok(())
    }

    fn visit_table(&mut self, table: &Table) -> Result<()> {
        let mut copy = Table::new();
        copy.source(table)?;
        self.output = Some(copy.into());
        Ok(())
    }

    fn visit_text(&mut self, text: &Text) -> Result<()> {
        let mut copy = Text::new();
        copy.update(text);
        self.output = Some(copy.into());
        Ok(())
    }
}
