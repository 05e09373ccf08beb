//! ADAF: hierarchical time-series containers.
//!
//! An [`Adaf`] holds a `meta` table and a `res` (results) table, both with
//! one row per measurement, and systems of rasters of signals.  Everything
//! is stored as sydata tables, so ADAFs are read lazily, written back by
//! linking what did not change, and joined and split with the same table
//! algebra.

use std::rc::Rc;

use indexmap::IndexMap;
use sydata::{ContainerType, DataSource, Dict, Group, Record, Table};

mod error;
mod join;
mod system;


pub use error::{AdafError, Result};
pub use system::{Raster, System};

const META: &str = "meta";
const RES: &str = "res";
const SYS: &str = "sys";

#[derive(Clone, Debug, Default)]
pub struct Adaf {
    meta: Table,
    res: Table,
    systems: IndexMap<String, System>,
}

impl Adaf {
    pub fn new() -> Self {
        Self::default()
    }

    fn fields() -> Vec<(String, ContainerType)> {
        vec![
            (META.to_owned(), ContainerType::Table),
            (RES.to_owned(), ContainerType::Table),
            (
                SYS.to_owned(),
                ContainerType::dict(ContainerType::dict(ContainerType::Table)),
            ),
        ]
    }

    /// Container type of a stored ADAF.
    pub fn container_type() -> ContainerType {
        ContainerType::Record(Self::fields())
    }

    pub fn meta(&self) -> &Table {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut Table {
        &mut self.meta
    }

    pub fn res(&self) -> &Table {
        &self.res
    }

    pub fn res_mut(&mut self) -> &mut Table {
        &mut self.res
    }

    /// Creates system `name`, replacing any system of that name.
    pub fn create_system(&mut self, name: &str) -> &mut System {
        let (index, _) = self.systems.insert_full(name.to_owned(), System::new());
        &mut self.systems[index]
    }

    pub fn system(&self, name: &str) -> Result<&System> {
        self.systems
            .get(name)
            .ok_or_else(|| AdafError::SystemNotFound(name.to_owned()))
    }

    pub fn system_mut(&mut self, name: &str) -> Result<&mut System> {
        self.systems
            .get_mut(name)
            .ok_or_else(|| AdafError::SystemNotFound(name.to_owned()))
    }

    pub fn system_names(&self) -> impl Iterator<Item = &str> {
        self.systems.keys().map(String::as_str)
    }

    pub fn systems(&self) -> impl Iterator<Item = (&str, &System)> {
        self.systems.iter().map(|(name, system)| (name.as_str(), system))
    }

    fn system_or_create(&mut self, name: &str) -> &mut System {
        self.systems.entry(name.to_owned()).or_default()
    }

    /// The ADAF as a record of type [`Adaf::container_type`].  Tables are
    /// shared, not copied.
    pub fn to_group(&self) -> Result<Group> {
        let mut sys = Dict::new(ContainerType::dict(ContainerType::Table));
        for (name, system) in &self.systems {
            let mut rasters = Dict::new(ContainerType::Table);
            for (raster_name, raster) in system.rasters() {
                rasters.insert(raster_name, raster.table().clone().into())?;
            }
            sys.insert(name.as_str(), rasters.into())?;
        }
        let mut record = Record::new(Self::fields());
        record.set(META, self.meta.clone().into())?;
        record.set(RES, self.res.clone().into())?;
        record.set(SYS, sys.into())?;
        Ok(record.into())
    }

    pub fn from_group(group: &Group) -> Result<Self> {
        let record = group
            .as_record()
            .filter(|record| record.container_type() == Self::container_type())
            .ok_or_else(|| {
                AdafError::InvalidStructure(format!("found {}", group.container_type()))
            })?;
        let mut adaf = Self::new();
        adaf.meta = table_field(record, META)?;
        adaf.res = table_field(record, RES)?;
        let sys = record.get(SYS)?.as_dict().ok_or_else(|| {
            AdafError::InvalidStructure(format!("{SYS} is not a dict"))
        })?;
        for item in sys.iter() {
            let (name, rasters) = item?;
            let rasters = rasters.as_dict().ok_or_else(|| {
                AdafError::InvalidStructure(format!("system {name:?} is not a dict"))
            })?;
            let system = adaf.system_or_create(name);
            for raster in rasters.iter() {
                let (raster_name, table) = raster?;
                let table = table.as_table().ok_or_else(|| {
                    AdafError::InvalidStructure(format!("raster {raster_name:?} is not a table"))
                })?;
                system.insert_raster(raster_name, Raster::from_table(table.clone()));
            }
        }
        Ok(adaf)
    }

    /// Reads the ADAF stored at `datasource`.
    pub fn open(datasource: Rc<dyn DataSource>) -> Result<Self> {
        Self::from_group(&Group::from_source(&Self::container_type(), datasource)?)
    }

    /// Writes the ADAF to `dest`, linking the tables that are unchanged.
    pub fn write_to(&self, dest: &dyn DataSource) -> Result<()> {
        if dest.can_write() != Some(true) {
            return Err(sydata::Error::WritebackReadOnly.into());
        }
        Ok(self.to_group()?.write_into(dest)?)
    }
}

fn table_field(record: &Record, name: &str) -> Result<Table> {
    record
        .get(name)?
        .as_table()
        .cloned()
        .ok_or_else(|| AdafError::InvalidStructure(format!("{name} is not a table")))
}
