//! Glyphs: per-type data mapping, painting and hit testing.
//!
//! A [`Glyph`] owns its data-space and screen-space arrays. A [`GlyphView`] wraps one
//! with the spatial index built from its data and the transform it was last mapped
//! through.
use core::fmt;

use thiserror::Error;

use crate::{
    bbox::Rect,
    context::Context2d,
    factor::FactorError,
    factor_range::FactorRange,
    geometry::{Geometry, GeometryKind},
    index::{FullIndex, SubsetIndex},
    scale::ScaleError,
    selection::Selection,
    source::{ColumnDataSource, DataError},
    spatial::{IndexBox, SpatialIndex},
    transform::CoordinateTransform,
    visuals::Visuals,
};

pub mod line;
pub mod multi_line;
pub mod patches;
pub mod rect;
pub mod scatter;

pub use line::Line;
pub use multi_line::MultiLine;
pub use patches::Patches;
pub use rect::{RectGlyph, SpatialUnits};
pub use scatter::{MarkerType, Scatter};

/// Unique identifier for a glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphId(u64);

impl GlyphId {
    pub(crate) fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for GlyphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Glyph({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphKind {
    Scatter,
    Rect,
    Line,
    MultiLine,
    Patches,
}

/// Which rows a glyph's arrays are indexed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSpace {
    /// One entry per visible row of the view.
    Subset,
    /// One entry per row of the source.
    Full,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GlyphError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Factor(#[from] FactorError),
    #[error(transparent)]
    Scale(#[from] ScaleError),
    #[error("{field} has {found} values, expected {expected}")]
    Length {
        field: &'static str,
        expected: usize,
        found: usize,
    },
}

/// What a glyph reads when its data changes.
#[derive(Debug, Clone, Copy)]
pub struct DataContext<'a> {
    pub source: &'a ColumnDataSource,
    /// Source rows backing the glyph's entries, in order.
    pub rows: &'a [FullIndex],
    /// Factor ranges for categorical axes.
    pub x_factors: Option<&'a FactorRange>,
    pub y_factors: Option<&'a FactorRange>,
}

/// What a glyph can consult while hit testing.
#[derive(Debug, Clone, Copy)]
pub struct HitContext<'a> {
    pub id: GlyphId,
    pub index: &'a SpatialIndex,
    pub transform: &'a CoordinateTransform,
}

pub trait Glyph: fmt::Debug {
    fn kind(&self) -> GlyphKind;

    fn index_space(&self) -> IndexSpace {
        IndexSpace::Subset
    }

    fn supports(&self, geometry: GeometryKind) -> bool;

    /// Number of entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn set_data(&mut self, data: &DataContext<'_>) -> Result<(), GlyphError>;

    /// Boxes for the spatial index, in data space.
    fn index_data(&self, out: &mut Vec<IndexBox>);

    fn map_data(&mut self, transform: &CoordinateTransform);

    /// Half extents in data units beyond the indexed boxes.
    fn bounds_margin(&self) -> (f64, f64) {
        (0.0, 0.0)
    }

    /// Whether render indices can be limited to the viewport through the index.
    fn supports_masking(&self) -> bool {
        false
    }

    /// Data-space margin for viewport masking. Only called after `map_data`.
    fn mask_margin(&self, _transform: &CoordinateTransform) -> (f64, f64) {
        self.bounds_margin()
    }

    fn render(&self, ctx: &mut dyn Context2d, indices: &[usize], visuals: &Visuals);

    /// `geometry` is in screen space. Only called for supported kinds.
    fn hit_test(&self, geometry: &Geometry, hit: &HitContext<'_>) -> Selection<usize>;
}

/// A hit result in the glyph's own index space.
#[derive(Debug, Clone, PartialEq)]
pub enum GlyphHit {
    Subset(Selection<SubsetIndex>),
    Full(Selection<FullIndex>),
}

#[derive(Debug)]
pub struct GlyphView {
    id: GlyphId,
    glyph: Box<dyn Glyph>,
    index: SpatialIndex,
    transform: Option<CoordinateTransform>,
}

impl GlyphView {
    pub fn new(glyph: impl Glyph + 'static) -> Self {
        Self::from_boxed(Box::new(glyph))
    }

    pub fn from_boxed(glyph: Box<dyn Glyph>) -> Self {
        Self {
            id: GlyphId::new(),
            glyph,
            index: SpatialIndex::default(),
            transform: None,
        }
    }

    pub fn id(&self) -> GlyphId {
        self.id
    }

    pub fn kind(&self) -> GlyphKind {
        self.glyph.kind()
    }

    pub fn index_space(&self) -> IndexSpace {
        self.glyph.index_space()
    }

    pub fn glyph(&self) -> &dyn Glyph {
        self.glyph.as_ref()
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn transform(&self) -> Option<&CoordinateTransform> {
        self.transform.as_ref()
    }

    pub fn len(&self) -> usize {
        self.glyph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyph.is_empty()
    }

    pub fn supports(&self, geometry: GeometryKind) -> bool {
        self.glyph.supports(geometry)
    }

    /// Load new data and rebuild the spatial index.
    pub fn set_data(&mut self, data: &DataContext<'_>) -> Result<(), GlyphError> {
        self.glyph.set_data(data)?;
        let mut boxes = Vec::with_capacity(self.glyph.len());
        self.glyph.index_data(&mut boxes);
        self.index = SpatialIndex::build(boxes);
        log::debug!(
            "{} ({:?}): rebuilt spatial index with {} boxes for {} entries",
            self.id,
            self.glyph.kind(),
            self.index.len(),
            self.glyph.len()
        );
        if let Some(transform) = &self.transform {
            self.glyph.map_data(transform);
        }
        Ok(())
    }

    /// Project to screen space.
    pub fn map_data(&mut self, transform: CoordinateTransform) {
        self.glyph.map_data(&transform);
        self.transform = Some(transform);
    }

    pub fn bounds(&self) -> Rect {
        let (dx, dy) = self.glyph.bounds_margin();
        self.index.bounds().expand(dx, dy)
    }

    pub fn log_bounds(&self) -> Rect {
        let (dx, dy) = self.glyph.bounds_margin();
        self.index.log_bounds().expand(dx, dy)
    }

    /// Entries that may be visible in the current viewport, or `None` to paint all.
    pub fn mask_data(&self) -> Option<Vec<usize>> {
        if !self.glyph.supports_masking() {
            return None;
        }
        let transform = self.transform.as_ref()?;
        let (dx, dy) = self.glyph.mask_margin(transform);
        let viewport = transform.data_viewport().expand(dx, dy);
        let mut indices = self.index.indices(&viewport);
        indices.sort_unstable();
        Some(indices)
    }

    pub fn render(&self, ctx: &mut dyn Context2d, indices: &[usize], visuals: &Visuals) {
        if self.transform.is_none() || indices.is_empty() {
            return;
        }
        self.glyph.render(ctx, indices, visuals);
    }

    /// `None` if the geometry kind is unsupported or the glyph was never mapped.
    pub fn hit_test(&self, geometry: &Geometry) -> Option<GlyphHit> {
        if !self.glyph.supports(geometry.kind()) {
            return None;
        }
        let transform = self.transform.as_ref()?;
        let hit = HitContext {
            id: self.id,
            index: &self.index,
            transform,
        };
        let selection = self.glyph.hit_test(geometry, &hit);
        Some(match self.glyph.index_space() {
            IndexSpace::Subset => GlyphHit::Subset(selection.map_indices(|i| Some(SubsetIndex(i)))),
            IndexSpace::Full => GlyphHit::Full(selection.map_indices(|i| Some(FullIndex(i)))),
        })
    }
}

/// Checks that every materialized array has `expected` entries.
pub(crate) fn check_len(field: &'static str, expected: usize, found: usize) -> Result<(), GlyphError> {
    if expected == found {
        Ok(())
    } else {
        Err(GlyphError::Length {
            field,
            expected,
            found,
        })
    }
}

/// Index candidates around a screen point, `radius` pixels on each side.
pub(crate) fn candidates_near(hit: &HitContext<'_>, sx: f64, sy: f64, radius: f64) -> Vec<usize> {
    let query = hit
        .transform
        .invert_rect(sx - radius, sy - radius, sx + radius, sy + radius);
    let mut indices = hit.index.indices(&query);
    indices.sort_unstable();
    indices
}

/// Data-space size of `pixels` along each axis, measured at the screen origin of the targets.
pub(crate) fn pixels_to_data(transform: &CoordinateTransform, pixels: f64) -> (f64, f64) {
    let (xt, yt) = (transform.x.target(), transform.y.target());
    let dx = (transform.x.invert(xt.start + pixels) - transform.x.invert(xt.start)).abs();
    let dy = (transform.y.invert(yt.start - pixels) - transform.y.invert(yt.start)).abs();
    (
        if dx.is_finite() { dx } else { 0.0 },
        if dy.is_finite() { dy } else { 0.0 },
    )
}

pub(crate) fn is_finite(x: f64, y: f64) -> bool {
    x.is_finite() && y.is_finite()
}
