use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use sydata::visitor::IndexOffsets;
use sydata::{Table, VJoinOptions, VSplitOptions};
use tracing::debug;

use crate::error::{AdafError, Result};
use crate::{Adaf, Raster};

/// Where the index of one joined file starts.
#[derive(Debug, Clone, Copy)]
struct FileOffset {
    /// First index of the file in the joined result.
    offset: i64,
    /// Smallest own index of the file's `meta` rows.
    min: i64,
}

fn own_index(table: &Table, input_index: Option<&str>) -> Result<Option<Vec<i64>>> {
    match input_index {
        Some(input) if table.has_column(input) => Ok(Some(table.get_column(input)?.to_index()?)),
        _ => Ok(None),
    }
}

/// Follows the numbering [`Table::vjoin`] gives the `meta` tables.
fn file_offsets(files: &[&Adaf], options: &VJoinOptions) -> Result<Vec<FileOffset>> {
    let mut offsets = IndexOffsets::new(options.minimum_increment);
    let mut result = Vec::with_capacity(files.len());
    for file in files {
        let own = own_index(&file.meta, options.input_index.as_deref())?;
        let min = own
            .as_ref()
            .and_then(|own| own.iter().min().copied())
            .unwrap_or(0);
        result.push(FileOffset {
            offset: offsets.offset(),
            min,
        });
        offsets.push(own.as_deref(), file.meta.number_of_rows());
    }
    Ok(result)
}

impl Adaf {
    /// Joins `files` into one ADAF.
    ///
    /// `meta` and `res` are joined as tables.  Rasters are matched by system
    /// and raster name, and each is joined over the files that have it.
    /// With an `output_index`, the rows of every raster are numbered with the
    /// index of their file's `meta` rows, so that [`Adaf::vsplit`] can take
    /// the result apart again.
    pub fn vjoin(files: &[&Adaf], options: &VJoinOptions) -> Result<Adaf> {
        let metas: Vec<&Table> = files.iter().map(|file| &file.meta).collect();
        let results: Vec<&Table> = files.iter().map(|file| &file.res).collect();
        let mut joined = Adaf::new();
        joined.meta = Table::vjoin(&metas, options)?;
        joined.res = Table::vjoin(&results, options)?;

        let mut rasters: IndexMap<(&str, &str), Vec<(usize, &Raster)>> = IndexMap::new();
        for (k, file) in files.iter().enumerate() {
            for (system_name, system) in file.systems() {
                for (raster_name, raster) in system.rasters() {
                    rasters
                        .entry((system_name, raster_name))
                        .or_default()
                        .push((k, raster));
                }
            }
        }

        let offsets = file_offsets(files, options)?;
        let plain = VJoinOptions {
            input_index: None,
            output_index: None,
            ..options.clone()
        };
        for ((system_name, raster_name), parts) in rasters {
            let tables: Vec<&Table> = parts.iter().map(|(_, raster)| raster.table()).collect();
            let mut table = Table::vjoin(&tables, &plain)?;
            if let Some(output) = &options.output_index {
                if !table.is_empty() {
                    let mut index = Vec::with_capacity(table.number_of_rows());
                    for (k, raster) in &parts {
                        let FileOffset { offset, min } = offsets[*k];
                        let rows = raster.number_of_rows();
                        match own_index(raster.table(), options.input_index.as_deref())? {
                            Some(own) => index.extend(own.into_iter().map(|i| i - min + offset)),
                            None => index.extend(std::iter::repeat(offset).take(rows)),
                        }
                    }
                    if let Some(input) = &options.input_index {
                        if input != output && table.has_column(input) {
                            table.delete_column(input)?;
                        }
                    }
                    table.set_column(output, index)?;
                }
            }
            joined
                .system_or_create(system_name)
                .insert_raster(raster_name, Raster::from_table(table));
        }
        debug!(
            "joined {} ADAFs into {} systems",
            files.len(),
            joined.systems.len()
        );
        Ok(joined)
    }

    /// Splits the ADAF by the `input_index` column of its tables, one ADAF
    /// per index value in increasing order.
    ///
    /// A table without the index column is shared by every part.  A raster
    /// that has no rows for an index value is left out of that part, while
    /// its system is kept.
    pub fn vsplit(&self, options: &VSplitOptions) -> Result<Vec<Adaf>> {
        let input = options.input_index.as_deref().ok_or(AdafError::MissingIndex)?;

        let mut labels = BTreeSet::new();
        let mut tables = vec![&self.meta, &self.res];
        for (_, system) in self.systems() {
            tables.extend(system.rasters().map(|(_, raster)| raster.table()));
        }
        for table in tables {
            if let Some(own) = own_index(table, Some(input))? {
                labels.extend(own);
            }
        }

        let meta = split_by_label(&self.meta, input, options)?;
        let res = split_by_label(&self.res, input, options)?;
        let mut parts: Vec<Adaf> = labels
            .iter()
            .map(|label| {
                let mut part = Adaf::new();
                part.meta = pick(meta.as_ref(), &self.meta, *label);
                part.res = pick(res.as_ref(), &self.res, *label);
                for name in self.system_names() {
                    part.create_system(name);
                }
                part
            })
            .collect();

        for (system_name, system) in self.systems() {
            for (raster_name, raster) in system.rasters() {
                let split = split_by_label(raster.table(), input, options)?;
                for (part, label) in parts.iter_mut().zip(&labels) {
                    let table = match &split {
                        Some(split) => match split.get(label) {
                            Some(table) => table.clone(),
                            None => continue,
                        },
                        None => raster.table().clone(),
                    };
                    part.system_or_create(system_name)
                        .insert_raster(raster_name, Raster::from_table(table));
                }
            }
        }
        debug!("split ADAF into {} parts", parts.len());
        Ok(parts)
    }
}

/// Splits `table` into its parts by index value, or `None` if it has no
/// index column.
fn split_by_label(
    table: &Table,
    input: &str,
    options: &VSplitOptions,
) -> Result<Option<BTreeMap<i64, Table>>> {
    let Some(own) = own_index(table, Some(input))? else {
        return Ok(None);
    };
    let labels: BTreeSet<i64> = own.into_iter().collect();
    let parts = table.vsplit(options)?;
    Ok(Some(labels.into_iter().zip(parts).collect()))
}

fn pick(split: Option<&BTreeMap<i64, Table>>, whole: &Table, label: i64) -> Table {
    match split {
        Some(split) => split.get(&label).cloned().unwrap_or_default(),
        None => whole.clone(),
    }
}
