//! Index newtypes for the two index spaces a renderer deals with.
use core::fmt;

/// Row position in the full data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FullIndex(pub usize);

/// Position within the rows a view selected from its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SubsetIndex(pub usize);

impl fmt::Display for FullIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "full #{}", self.0)
    }
}

impl fmt::Display for SubsetIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subset #{}", self.0)
    }
}

impl From<FullIndex> for usize {
    fn from(value: FullIndex) -> Self {
        value.0
    }
}

impl From<SubsetIndex> for usize {
    fn from(value: SubsetIndex) -> Self {
        value.0
    }
}

pub(crate) fn raw<I: Copy + Into<usize>>(indices: &[I]) -> Vec<usize> {
    indices.iter().map(|&i| i.into()).collect()
}
