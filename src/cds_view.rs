//! Filtered views over a data source and the index-space conversions they imply.
use crate::{
    factor::Factor,
    index::{FullIndex, SubsetIndex},
    selection::Selection,
    source::{ColumnDataSource, DataError},
};

/// A row filter over a [`ColumnDataSource`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    #[default]
    All,
    Indices(Vec<usize>),
    Boolean(Vec<bool>),
    /// Rows whose factor column equals `group`.
    Group { column: String, group: Factor },
    Intersection(Vec<Filter>),
    Union(Vec<Filter>),
    Inversion(Box<Filter>),
}

impl Filter {
    /// Ascending full indices passing the filter.
    pub fn compute_indices(&self, source: &ColumnDataSource) -> Result<Vec<usize>, DataError> {
        let mask = self.mask(source)?;
        Ok(mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect())
    }

    fn mask(&self, source: &ColumnDataSource) -> Result<Vec<bool>, DataError> {
        let n = source.len();
        Ok(match self {
            Self::All => vec![true; n],
            Self::Indices(indices) => {
                let mut mask = vec![false; n];
                for &i in indices {
                    if let Some(slot) = mask.get_mut(i) {
                        *slot = true;
                    }
                }
                mask
            }
            Self::Boolean(booleans) => {
                if booleans.len() != n {
                    log::warn!(
                        "boolean filter has {} entries for {} rows, missing rows are excluded",
                        booleans.len(),
                        n
                    );
                }
                (0..n)
                    .map(|i| booleans.get(i).copied().unwrap_or(false))
                    .collect()
            }
            Self::Group { column, group } => source
                .factors(column)?
                .iter()
                .map(|factor| factor == group)
                .collect(),
            Self::Intersection(filters) => {
                let mut mask = vec![true; n];
                for filter in filters {
                    for (m, keep) in mask.iter_mut().zip(filter.mask(source)?) {
                        *m &= keep;
                    }
                }
                mask
            }
            Self::Union(filters) => {
                let mut mask = vec![false; n];
                for filter in filters {
                    for (m, keep) in mask.iter_mut().zip(filter.mask(source)?) {
                        *m |= keep;
                    }
                }
                mask
            }
            Self::Inversion(inner) => inner.mask(source)?.into_iter().map(|m| !m).collect(),
        })
    }
}

/// The rows of a source a renderer displays.
///
/// Subset index `k` is the `k`-th visible row; its full index is `indices()[k]`.
#[derive(Debug, Clone, Default)]
pub struct CdsView {
    filter: Filter,
    indices: Vec<FullIndex>,
    version: u64,
}

impl CdsView {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            indices: Vec::new(),
            version: 0,
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Replace the filter. Takes effect on the next [`CdsView::compute`].
    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
        self.version += 1;
    }

    pub fn compute(&mut self, source: &ColumnDataSource) -> Result<(), DataError> {
        let indices: Vec<FullIndex> = self
            .filter
            .compute_indices(source)?
            .into_iter()
            .map(FullIndex)
            .collect();
        if indices != self.indices {
            self.indices = indices;
            self.version += 1;
        }
        Ok(())
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Visible full indices, ascending.
    pub fn indices(&self) -> &[FullIndex] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn to_full(&self, index: SubsetIndex) -> Option<FullIndex> {
        self.indices.get(index.0).copied()
    }

    pub fn to_subset(&self, index: FullIndex) -> Option<SubsetIndex> {
        self.indices.binary_search(&index).ok().map(SubsetIndex)
    }

    pub fn convert_indices_from_subset(&self, indices: &[SubsetIndex]) -> Vec<FullIndex> {
        indices.iter().filter_map(|&i| self.to_full(i)).collect()
    }

    /// Full indices outside the view are dropped.
    pub fn convert_indices_to_subset(&self, indices: &[FullIndex]) -> Vec<SubsetIndex> {
        indices.iter().filter_map(|&i| self.to_subset(i)).collect()
    }

    pub fn convert_selection_from_subset(&self, selection: &Selection<SubsetIndex>) -> Selection {
        selection.map_indices(|i| self.to_full(i))
    }

    pub fn convert_selection_to_subset(&self, selection: &Selection) -> Selection<SubsetIndex> {
        selection.map_indices(|i| self.to_subset(i))
    }
}
