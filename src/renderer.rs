//! Glyph renderers: styling variants, level of detail and index-space bookkeeping.
//!
//! A [`GlyphRenderer`] sits between a data source and a [`GlyphView`]. It filters the source
//! through a [`CdsView`], keeps the glyph mapped through its coordinate system, decides which
//! styling variant paints which rows, and converts hit results back to source rows.
use core::fmt;
use std::{collections::HashSet, time::Duration};

use indexmap::IndexSet;

use crate::{
    cds_view::{CdsView, Filter},
    context::Context2d,
    geometry::{Geometry, GeometryKind},
    glyphs::{DataContext, Glyph, GlyphError, GlyphHit, GlyphView, IndexSpace},
    index::{FullIndex, SubsetIndex, raw},
    range::{Range, RangeId, Ranges},
    selection::Selection,
    source::ColumnDataSource,
    transform::{CoordinateMapping, CoordinateSystem, Frame},
    visuals::Visuals,
};

/// Unique identifier for a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RendererId(u64);

impl RendererId {
    fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RendererId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Renderer({})", self.0)
    }
}

/// Styling of one glyph variant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum VariantStyle {
    /// Derived from the base styling.
    #[default]
    Auto,
    Custom(Visuals),
    /// The variant does not exist.
    Disabled,
}

impl VariantStyle {
    fn resolve(&self, derived: Visuals) -> Option<Visuals> {
        match self {
            Self::Auto => Some(derived),
            Self::Custom(visuals) => Some(*visuals),
            Self::Disabled => None,
        }
    }
}

/// Level-of-detail settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodPolicy {
    /// Stride of the decimated subsample.
    pub factor: usize,
    /// Minimum number of visible rows before decimating. `None` never decimates.
    pub threshold: Option<usize>,
    /// How long after an interactive gesture painting stays decimated.
    pub interval: Duration,
    /// Delay of the full-resolution paint that follows an interactive one.
    pub timeout: Duration,
}

impl Default for LodPolicy {
    fn default() -> Self {
        Self {
            factor: 10,
            threshold: Some(2000),
            interval: Duration::from_millis(300),
            timeout: Duration::from_millis(500),
        }
    }
}

impl LodPolicy {
    pub fn with_factor(mut self, factor: usize) -> Self {
        self.factor = factor;
        self
    }

    pub fn with_threshold(mut self, threshold: Option<usize>) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Per-frame inputs to [`GlyphRenderer::paint`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderState {
    /// Time since the last interactive gesture, while it is recent.
    pub interactive_duration: Option<Duration>,
    /// Whether a GPU path paints the glyph. Disables decimation.
    pub gpu_accelerated: bool,
}

/// Every `factor`-th position of `0..len`, in subset space. A zero factor is treated as 1.
pub fn decimate(len: usize, factor: usize) -> Vec<SubsetIndex> {
    let factor = factor.max(1);
    (0..len / factor).map(|k| SubsetIndex(k * factor)).collect()
}

/// Versions seen by the last sync.
#[derive(Debug, Clone, Default, PartialEq)]
struct Seen {
    data: Option<u64>,
    view: Option<u64>,
    factors: Vec<Option<u64>>,
    ranges: Vec<Option<u64>>,
}

#[derive(Debug)]
pub struct GlyphRenderer {
    id: RendererId,
    view: GlyphView,
    coordinates: CoordinateSystem,
    sub_coordinates: Option<CoordinateMapping>,
    cds_view: CdsView,
    visuals: Visuals,
    selection: VariantStyle,
    nonselection: VariantStyle,
    hover: VariantStyle,
    muted_style: VariantStyle,
    lod: LodPolicy,
    visible: bool,
    muted: bool,
    all_indices: Vec<FullIndex>,
    decimated: Vec<SubsetIndex>,
    seen: Seen,
    lod_active: bool,
    warned: HashSet<GeometryKind>,
}

impl GlyphRenderer {
    pub fn new(glyph: impl Glyph + 'static, coordinates: CoordinateSystem) -> Self {
        Self {
            id: RendererId::new(),
            view: GlyphView::new(glyph),
            coordinates,
            sub_coordinates: None,
            cds_view: CdsView::default(),
            visuals: Visuals::default(),
            selection: VariantStyle::Auto,
            nonselection: VariantStyle::Auto,
            hover: VariantStyle::Disabled,
            muted_style: VariantStyle::Auto,
            lod: LodPolicy::default(),
            visible: true,
            muted: false,
            all_indices: Vec::new(),
            decimated: Vec::new(),
            seen: Seen::default(),
            lod_active: false,
            warned: HashSet::new(),
        }
    }

    pub fn with_view(mut self, view: CdsView) -> Self {
        self.cds_view = view;
        self
    }

    pub fn with_visuals(mut self, visuals: Visuals) -> Self {
        self.visuals = visuals;
        self
    }

    pub fn with_selection(mut self, style: VariantStyle) -> Self {
        self.selection = style;
        self
    }

    pub fn with_nonselection(mut self, style: VariantStyle) -> Self {
        self.nonselection = style;
        self
    }

    pub fn with_hover(mut self, style: VariantStyle) -> Self {
        self.hover = style;
        self
    }

    pub fn with_muted(mut self, style: VariantStyle) -> Self {
        self.muted_style = style;
        self
    }

    pub fn with_lod(mut self, lod: LodPolicy) -> Self {
        self.lod = lod;
        self
    }

    /// Map the glyph's data through a sub-coordinate system nested in the plot's.
    pub fn with_sub_coordinates(mut self, mapping: CoordinateMapping) -> Self {
        self.sub_coordinates = Some(mapping);
        self
    }

    pub fn id(&self) -> RendererId {
        self.id
    }

    pub fn glyph_view(&self) -> &GlyphView {
        &self.view
    }

    pub fn cds_view(&self) -> &CdsView {
        &self.cds_view
    }

    /// Replace the view filter. Takes effect on the next sync.
    pub fn set_filter(&mut self, filter: Filter) {
        self.cds_view.set_filter(filter);
    }

    pub fn coordinates(&self) -> &CoordinateSystem {
        &self.coordinates
    }

    pub fn sub_coordinates(&self) -> Option<&CoordinateMapping> {
        self.sub_coordinates.as_ref()
    }

    pub fn visuals(&self) -> &Visuals {
        &self.visuals
    }

    pub fn lod(&self) -> &LodPolicy {
        &self.lod
    }

    pub(crate) fn set_lod(&mut self, lod: LodPolicy) {
        if lod.factor != self.lod.factor {
            self.decimated = decimate(self.all_indices.len(), lod.factor);
        }
        self.lod = lod;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Visible source rows, ascending.
    pub fn all_indices(&self) -> &[FullIndex] {
        &self.all_indices
    }

    pub fn decimated(&self) -> &[SubsetIndex] {
        &self.decimated
    }

    /// Ranges the glyph's data coordinates live in, when they are the plot's own.
    pub fn data_ranges(&self) -> Option<(RangeId, RangeId)> {
        self.sub_coordinates
            .is_none()
            .then_some((self.coordinates.x_scale.source, self.coordinates.y_scale.source))
    }

    /// Ranges whose factors feed the glyph's coordinates.
    fn factor_ranges(&self) -> (RangeId, RangeId) {
        match &self.sub_coordinates {
            Some(m) => (m.x_source, m.y_source),
            None => (self.coordinates.x_scale.source, self.coordinates.y_scale.source),
        }
    }

    /// Every range the screen mapping depends on.
    fn transform_ranges(&self) -> Vec<RangeId> {
        let mut ids = vec![self.coordinates.x_scale.source, self.coordinates.y_scale.source];
        if let Some(mapping) = &self.sub_coordinates {
            ids.extend(mapping.ranges());
        }
        ids
    }

    /// Recompute the view filter, the visible rows and the glyph's data.
    ///
    /// `changed` lists source rows known to have changed; the rebuild is complete either way.
    /// `request_render` is called once the new data is mapped.
    pub fn set_data(
        &mut self,
        source: &ColumnDataSource,
        ranges: &Ranges,
        changed: Option<&[FullIndex]>,
        request_render: Option<&mut dyn FnMut()>,
    ) -> Result<(), GlyphError> {
        self.cds_view.compute(source)?;
        self.all_indices = self.cds_view.indices().to_vec();
        self.decimated = decimate(self.all_indices.len(), self.lod.factor);

        let full_rows: Vec<FullIndex>;
        let rows: &[FullIndex] = match self.view.index_space() {
            IndexSpace::Subset => &self.all_indices,
            IndexSpace::Full => {
                full_rows = (0..source.len()).map(FullIndex).collect();
                &full_rows
            }
        };
        let (x_id, y_id) = self.factor_ranges();
        let data = DataContext {
            source,
            rows,
            x_factors: ranges.get(x_id).and_then(Range::as_factor),
            y_factors: ranges.get(y_id).and_then(Range::as_factor),
        };
        self.view.set_data(&data)?;

        if let Some(changed) = changed {
            log::debug!("{}: {} changed rows", self.id, changed.len());
        }
        if self.view.transform().is_none() {
            self.update_transform(ranges)?;
        }

        self.seen.data = Some(source.data_version());
        self.seen.view = Some(self.cds_view.version());
        self.seen.factors = [x_id, y_id].iter().map(|&id| factor_version(ranges, id)).collect();
        if let Some(request_render) = request_render {
            request_render();
        }
        Ok(())
    }

    /// Re-resolve the coordinate system and re-map the glyph.
    pub fn update_transform(&mut self, ranges: &Ranges) -> Result<(), GlyphError> {
        let parent = self.coordinates.resolve(ranges)?;
        let transform = match &self.sub_coordinates {
            Some(mapping) => mapping.resolve(ranges, &parent)?,
            None => parent,
        };
        self.view.map_data(transform);
        self.seen.ranges = self.range_versions(ranges);
        Ok(())
    }

    fn range_versions(&self, ranges: &Ranges) -> Vec<Option<u64>> {
        self.transform_ranges()
            .into_iter()
            .map(|id| ranges.version(id))
            .collect()
    }

    /// Re-run `set_data` if the source, the view filter or a factor range changed.
    pub fn sync_data(&mut self, source: &ColumnDataSource, ranges: &Ranges) -> Result<bool, GlyphError> {
        let (x_id, y_id) = self.factor_ranges();
        let factors: Vec<Option<u64>> = [x_id, y_id]
            .iter()
            .map(|&id| factor_version(ranges, id))
            .collect();
        let stale = self.seen.data != Some(source.data_version())
            || self.seen.view != Some(self.cds_view.version())
            || self.seen.factors != factors;
        if stale {
            self.set_data(source, ranges, None, None)?;
        }
        Ok(stale)
    }

    /// Re-map the glyph if a range it depends on changed.
    pub fn sync_transform(&mut self, ranges: &Ranges) -> Result<bool, GlyphError> {
        let stale = self.view.transform().is_none() || self.seen.ranges != self.range_versions(ranges);
        if stale {
            self.update_transform(ranges)?;
        }
        Ok(stale)
    }

    /// Bring data and screen mapping up to date. Returns whether anything changed.
    pub fn sync(&mut self, source: &ColumnDataSource, ranges: &Ranges) -> Result<bool, GlyphError> {
        let data = self.sync_data(source, ranges)?;
        let transform = self.sync_transform(ranges)?;
        Ok(data || transform)
    }

    /// Re-target the coordinate system. The glyph is re-mapped on the next sync.
    pub fn set_frame(&mut self, frame: &Frame) {
        self.coordinates = self.coordinates.with_frame(frame);
        self.seen.ranges.clear();
    }

    /// Paint the glyph, choosing a styling variant for every visible row.
    pub fn paint(&mut self, ctx: &mut dyn Context2d, source: &ColumnDataSource, state: &RenderState) {
        if !self.visible || self.view.transform().is_none() {
            return;
        }
        let id = self.view.id();
        let full_space = self.view.index_space() == IndexSpace::Full;

        let mut indices: Vec<usize> = self
            .view
            .mask_data()
            .unwrap_or_else(|| (0..self.all_indices.len()).collect());

        let selected = source.selection_preview();
        let selected_full: IndexSet<FullIndex> = if full_space && selected.glyphs.contains(&id) {
            self.all_indices.iter().copied().collect()
        } else {
            selected.indices.iter().copied().collect()
        };

        let inspected = source.inspected();
        let inspected_full: IndexSet<FullIndex> = if full_space && inspected.glyphs.contains(&id) {
            self.all_indices.iter().copied().collect()
        } else {
            inspected.rows()
        };
        let inspected_subset: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| {
                self.all_indices
                    .get(i)
                    .is_some_and(|f| inspected_full.contains(f))
            })
            .collect();

        let base = self.visuals;
        let mut selection = self.selection.resolve(base);
        let mut nonselection = self.nonselection.resolve(base.nonselection());
        let hover = self.hover.resolve(base);

        let lod = state.interactive_duration.is_some_and(|d| !d.is_zero())
            && !state.gpu_accelerated
            && self
                .lod
                .threshold
                .is_some_and(|threshold| self.all_indices.len() > threshold);
        if lod != self.lod_active {
            log::debug!(
                "{}: level of detail {} ({} of {} rows)",
                self.id,
                if lod { "on" } else { "off" },
                self.decimated.len(),
                self.all_indices.len()
            );
            self.lod_active = lod;
        }

        let glyph = if lod {
            indices = raw(&self.decimated);
            let decimated = base.decimated();
            selection = selection.map(|_| decimated);
            nonselection = nonselection.map(|_| decimated);
            decimated
        } else if self.muted
            && let Some(muted) = self.muted_style.resolve(base.muted())
        {
            muted
        } else {
            base
        };

        if hover.is_some() {
            let skip: HashSet<usize> = inspected_subset.iter().copied().collect();
            indices.retain(|i| !skip.contains(i));
        }

        log::trace!(
            "{}: painting {} rows, {} selected, {} inspected, lod {}",
            self.id,
            indices.len(),
            selected_full.len(),
            inspected_subset.len(),
            lod
        );

        let partition = !selected.is_empty();
        match (selection, nonselection) {
            (Some(selection), Some(nonselection)) if partition => {
                let (chosen, others): (Vec<usize>, Vec<usize>) = if full_space {
                    raw(&self.all_indices)
                        .into_iter()
                        .partition(|&i| selected_full.contains(&FullIndex(i)))
                } else {
                    indices.iter().copied().partition(|&i| {
                        self.all_indices
                            .get(i)
                            .is_some_and(|f| selected_full.contains(f))
                    })
                };
                self.view.render(ctx, &others, &nonselection);
                self.view.render(ctx, &chosen, &selection);
                if let Some(hover) = &hover {
                    self.view.render(ctx, &self.hover_rows(&inspected_subset), hover);
                }
            }
            _ if full_space => match &hover {
                Some(hover) if !inspected_subset.is_empty() => {
                    self.view.render(ctx, &self.hover_rows(&inspected_subset), hover);
                }
                _ => self.view.render(ctx, &raw(&self.all_indices), &glyph),
            },
            _ => {
                self.view.render(ctx, &indices, &glyph);
                if let Some(hover) = &hover {
                    self.view.render(ctx, &inspected_subset, hover);
                }
            }
        }
    }

    /// Inspected positions in the glyph's own index space.
    fn hover_rows(&self, inspected_subset: &[usize]) -> Vec<usize> {
        match self.view.index_space() {
            IndexSpace::Subset => inspected_subset.to_vec(),
            IndexSpace::Full => inspected_subset
                .iter()
                .filter_map(|&i| self.all_indices.get(i).map(|f| f.0))
                .collect(),
        }
    }

    /// Hit test in screen space, with the result in source rows.
    ///
    /// `None` if the renderer is hidden or the glyph does not handle this kind of geometry.
    pub fn hit_test(&mut self, geometry: &Geometry) -> Option<Selection> {
        if !self.visible {
            return None;
        }
        let kind = geometry.kind();
        if !self.view.supports(kind) {
            if self.warned.insert(kind) {
                log::warn!(
                    "{}: {:?} glyph does not support {:?} hit testing",
                    self.id,
                    self.view.kind(),
                    kind
                );
            }
            return None;
        }
        match self.view.hit_test(geometry)? {
            GlyphHit::Subset(selection) => Some(self.cds_view.convert_selection_from_subset(&selection)),
            GlyphHit::Full(selection) => Some(selection),
        }
    }
}

fn factor_version(ranges: &Ranges, id: RangeId) -> Option<u64> {
    ranges
        .get(id)
        .filter(|range| range.is_categorical())
        .and_then(|_| ranges.version(id))
}
