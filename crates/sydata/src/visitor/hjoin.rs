use super::{hjoin, mismatch, GroupVisitor};
use crate::error::Result;
use crate::group::{assert_type, ContainerType, Dict, Group, List, Record, Text, Tuple};
use crate::table::Table;

/// Horizontal join: adds the visited container's content to `current`.
///
/// Dicts take every key, lists are joined item by item (an empty list takes
/// the other list as a whole), records and tuples are joined field by field,
/// and tables and texts are updated.
pub struct HJoinVisitor<'a> {
    current: &'a mut Group,
}

impl<'a> HJoinVisitor<'a> {
    pub fn new(current: &'a mut Group) -> Self {
        Self { current }
    }
}

impl GroupVisitor for HJoinVisitor<'_> {
    fn name(&self) -> &'static str {
        "HJoinVisitor"
    }

    fn visit_dict(&mut self, other: &Dict) -> Result<()> {
        match &mut *self.current {
            Group::Dict(current) => {
                for item in other.iter() {
                    let (key, value) = item?;
                    current.insert(key, value.clone())?;
                }
                Ok(())
            }
            current => Err(mismatch(current, other.container_type())),
        }
    }

    /// Items past the end of the shorter list are ignored.
    fn visit_list(&mut self, other: &List) -> Result<()> {
        match &mut *self.current {
            Group::List(current) if current.is_empty() => {
                assert_type(current.content_type(), other.content_type())?;
                *current = other.clone();
                Ok(())
            }
            Group::List(current) => {
                for i in 0..current.len().min(other.len()) {
                    hjoin(current.get_mut(i)?, other.get(i)?)?;
                }
                Ok(())
            }
            current => Err(mismatch(current, other.container_type())),
        }
    }

    fn visit_record(&mut self, other: &Record) -> Result<()> {
        match &mut *self.current {
            Group::Record(current) => {
                for name in other.field_names() {
                    if !other.has_value(name)? {
                        continue;
                    }
                    if current.has_value(name)? {
                        hjoin(current.get_mut(name)?, other.get(name)?)?;
                    } else {
                        current.set(name, other.get(name)?.clone())?;
                    }
                }
                Ok(())
            }
            current => Err(mismatch(current, other.container_type())),
        }
    }

    fn visit_tuple(&mut self, other: &Tuple) -> Result<()> {
        match &mut *self.current {
            Group::Tuple(current) => {
                for i in 0..current.len().min(other.len()) {
                    if !other.has_value(i)? {
                        continue;
                    }
                    if current.has_value(i)? {
                        hjoin(current.get_mut(i)?, other.get(i)?)?;
                    } else {
                        current.set(i, other.get(i)?.clone())?;
                    }
                }
                Ok(())
            }
            current => Err(mismatch(current, other.container_type())),
        }
    }

    fn visit_table(&mut self, other: &Table) -> Result<()> {
        match &mut *self.current {
            Group::Table(current) => current.update(other),
            current => Err(mismatch(current, ContainerType::Table)),
        }
    }

    fn visit_text(&mut self, other: &Text) -> Result<()> {
        match &mut *self.current {
            Group::Text(current) => {
                current.update(other);
                Ok(())
            }
            current => Err(mismatch(current, ContainerType::Text)),
        }
    }
}
