//! Row and column selections.
//!
//! A [`Selection`] is what the caller asks for; it is resolved against the
//! length of an axis into a [`Resolved`] list of positions.  Slices follow
//! the usual conventions: bounds are clamped, negative bounds count from the
//! end and a negative step walks backwards.

use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use crate::error::{Error, Result};

/// Positions selected along one axis of a table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Selection {
    /// Every position.
    #[default]
    All,
    /// A single position; negative values count from the end.
    Int(isize),
    /// `start:stop:step`.
    Slice {
        start: Option<isize>,
        stop: Option<isize>,
        step: Option<isize>,
    },
    /// Explicit positions, in order; negative values count from the end.
    Indices(Vec<isize>),
    /// One flag per position.
    Mask(Vec<bool>),
}

impl Selection {
    pub fn all() -> Self {
        Selection::All
    }

    pub fn at(index: isize) -> Self {
        Selection::Int(index)
    }

    /// `start:stop` with unit step.
    pub fn range(start: isize, stop: isize) -> Self {
        Selection::Slice {
            start: Some(start),
            stop: Some(stop),
            step: None,
        }
    }

    pub fn slice(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
        Selection::Slice { start, stop, step }
    }

    pub fn indices(indices: impl IntoIterator<Item = isize>) -> Self {
        Selection::Indices(indices.into_iter().collect())
    }

    pub fn has_negative_step(&self) -> bool {
        matches!(self, Selection::Slice { step: Some(step), .. } if *step < 0)
    }

    /// Resolves the selection against an axis of `len` positions.
    pub fn resolve(&self, len: usize) -> Result<Resolved> {
        match self {
            Selection::All => Ok(Resolved::contiguous(0..len)),
            Selection::Int(index) => {
                let i = normalize(*index, len)?;
                Ok(Resolved::contiguous(i..i + 1))
            }
            Selection::Slice { start, stop, step } => resolve_slice(*start, *stop, *step, len),
            Selection::Indices(indices) => Ok(Resolved {
                indices: indices
                    .iter()
                    .map(|&i| normalize(i, len))
                    .collect::<Result<_>>()?,
                contiguous: None,
            }),
            Selection::Mask(mask) => {
                if mask.len() != len {
                    return Err(Error::InvalidSelection(format!(
                        "mask of length {} for axis of length {len}",
                        mask.len()
                    )));
                }
                Ok(Resolved {
                    indices: mask
                        .iter()
                        .enumerate()
                        .filter_map(|(i, &keep)| keep.then_some(i))
                        .collect(),
                    contiguous: None,
                })
            }
        }
    }
}

impl From<usize> for Selection {
    fn from(value: usize) -> Self {
        Selection::Int(value as isize)
    }
}

impl From<Range<usize>> for Selection {
    fn from(value: Range<usize>) -> Self {
        Selection::range(value.start as isize, value.end as isize)
    }
}

impl From<RangeFrom<usize>> for Selection {
    fn from(value: RangeFrom<usize>) -> Self {
        Selection::slice(Some(value.start as isize), None, None)
    }
}

impl From<RangeTo<usize>> for Selection {
    fn from(value: RangeTo<usize>) -> Self {
        Selection::slice(None, Some(value.end as isize), None)
    }
}

impl From<RangeFull> for Selection {
    fn from(_: RangeFull) -> Self {
        Selection::All
    }
}

impl From<Vec<bool>> for Selection {
    fn from(value: Vec<bool>) -> Self {
        Selection::Mask(value)
    }
}

fn normalize(index: isize, len: usize) -> Result<usize> {
    let resolved = if index < 0 {
        index + len as isize
    } else {
        index
    };
    if resolved < 0 || resolved >= len as isize {
        return Err(Error::IndexOutOfRange { index, len });
    }
    Ok(resolved as usize)
}

fn resolve_slice(
    start: Option<isize>,
    stop: Option<isize>,
    step: Option<isize>,
    len: usize,
) -> Result<Resolved> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(Error::InvalidSelection("slice step can not be zero".into()));
    }
    let len = len as isize;
    let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };
    let clamp = |bound: Option<isize>, default: isize| match bound {
        None => default,
        Some(b) if b < 0 => (b + len).max(lower),
        Some(b) => b.min(upper),
    };
    let start = clamp(start, if step > 0 { lower } else { upper });
    let stop = clamp(stop, if step > 0 { upper } else { lower });

    let mut indices = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        indices.push(i as usize);
        i += step;
    }
    let contiguous = (step == 1).then(|| start as usize..(stop.max(start)) as usize);
    Ok(Resolved {
        indices,
        contiguous,
    })
}

/// A selection resolved to concrete positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    indices: Vec<usize>,
    /// Set when the selection was a unit-step slice (or a single position),
    /// which permits splicing instead of element-wise assignment.
    contiguous: Option<Range<usize>>,
}

impl Resolved {
    pub fn contiguous(range: Range<usize>) -> Self {
        Self {
            indices: range.clone().collect(),
            contiguous: Some(range),
        }
    }

    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self {
            indices,
            contiguous: None,
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The contiguous range, for unit-step slices.
    pub fn as_range(&self) -> Option<Range<usize>> {
        self.contiguous.clone()
    }

    /// True when this selects every position of an axis of length `len`, in
    /// order.
    pub fn is_whole(&self, len: usize) -> bool {
        self.indices.len() == len && self.indices.iter().enumerate().all(|(i, &j)| i == j)
    }
}
