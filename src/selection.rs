//! Hit-test results and the selection state shared through a data source.
use core::hash::Hash;

use indexmap::{IndexMap, IndexSet};

use crate::{glyphs::GlyphId, index::FullIndex};

/// How a new hit combines with the existing selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Replace,
    Append,
    Intersect,
    Subtract,
    Xor,
}

/// Three levels of hit result.
///
/// - `glyphs`: glyphs hit as a whole (0-D).
/// - `indices` and `line_indices`: rows or segments (1-D).
/// - `multiline_indices`: row to sub-indices of a multi-part row (2-D).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<I: Hash + Eq = FullIndex> {
    pub indices: Vec<I>,
    pub line_indices: Vec<I>,
    pub multiline_indices: IndexMap<I, Vec<usize>>,
    pub glyphs: Vec<GlyphId>,
}

impl<I: Hash + Eq> Default for Selection<I> {
    fn default() -> Self {
        Self {
            indices: Vec::new(),
            line_indices: Vec::new(),
            multiline_indices: IndexMap::new(),
            glyphs: Vec::new(),
        }
    }
}

impl<I: Copy + Hash + Ord> Selection<I> {
    pub fn from_indices(indices: impl IntoIterator<Item = I>) -> Self {
        Self {
            indices: indices.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
            && self.line_indices.is_empty()
            && self.multiline_indices.is_empty()
            && self.glyphs.is_empty()
    }

    /// Combine `other` into `self` according to `mode`.
    pub fn update(&mut self, other: &Self, mode: SelectionMode) {
        if mode == SelectionMode::Replace {
            *self = other.clone();
            return;
        }
        self.indices = combine(&self.indices, &other.indices, mode);
        self.line_indices = combine(&self.line_indices, &other.line_indices, mode);

        let keys: Vec<I> = self.multiline_indices.keys().copied().collect();
        let other_keys: Vec<I> = other.multiline_indices.keys().copied().collect();
        let kept = combine(&keys, &other_keys, mode);
        let mut multiline = IndexMap::with_capacity(kept.len());
        for key in kept {
            let mut parts: IndexSet<usize> = IndexSet::new();
            if let Some(mine) = self.multiline_indices.get(&key) {
                parts.extend(mine.iter().copied());
            }
            if mode == SelectionMode::Append
                && let Some(theirs) = other.multiline_indices.get(&key)
            {
                parts.extend(theirs.iter().copied());
            }
            if parts.is_empty()
                && let Some(theirs) = other.multiline_indices.get(&key)
            {
                parts.extend(theirs.iter().copied());
            }
            multiline.insert(key, parts.into_iter().collect());
        }
        self.multiline_indices = multiline;

        for glyph in &other.glyphs {
            if !self.glyphs.contains(glyph) {
                self.glyphs.push(*glyph);
            }
        }
    }

    /// Convert the indices of every level, dropping the ones `f` rejects.
    pub fn map_indices<J: Copy + Hash + Eq>(&self, f: impl Fn(I) -> Option<J>) -> Selection<J> {
        Selection {
            indices: self.indices.iter().filter_map(|&i| f(i)).collect(),
            line_indices: self.line_indices.iter().filter_map(|&i| f(i)).collect(),
            multiline_indices: self
                .multiline_indices
                .iter()
                .filter_map(|(&i, parts)| Some((f(i)?, parts.clone())))
                .collect(),
            glyphs: self.glyphs.clone(),
        }
    }

    /// Rows hit at either the 1-D or 2-D level.
    pub fn rows(&self) -> IndexSet<I> {
        self.indices
            .iter()
            .chain(self.multiline_indices.keys())
            .copied()
            .collect()
    }
}

/// Sorted, deduplicated set combination.
fn combine<I: Copy + Hash + Ord>(mine: &[I], theirs: &[I], mode: SelectionMode) -> Vec<I> {
    let a: IndexSet<I> = mine.iter().copied().collect();
    let b: IndexSet<I> = theirs.iter().copied().collect();
    let mut out: Vec<I> = match mode {
        SelectionMode::Replace => b.into_iter().collect(),
        SelectionMode::Append => a.union(&b).copied().collect(),
        SelectionMode::Intersect => a.intersection(&b).copied().collect(),
        SelectionMode::Subtract => a.difference(&b).copied().collect(),
        SelectionMode::Xor => a.symmetric_difference(&b).copied().collect(),
    };
    out.sort_unstable();
    out
}
