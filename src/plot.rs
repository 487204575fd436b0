//! A plot: ranges, data sources and renderers tied to one frame.
use core::fmt;
use std::time::Duration;

use iced::{Rectangle, time::Instant};
use indexmap::IndexMap;
use thiserror::Error;

use crate::{
    context::Context2d,
    geometry::Geometry,
    glyphs::GlyphError,
    range::{DataRange1d, Interval, Range, RangeId, Ranges, ScaleHint},
    renderer::{GlyphRenderer, LodPolicy, RenderState, RendererId},
    scale::{ScaleError, ScaleKind},
    selection::{Selection, SelectionMode},
    source::{ColumnDataSource, DataError},
    tools::{InteractionClock, pan_interval, zoom_interval},
    transform::{CoordinateSystem, CoordinateTransform, Frame},
};

/// Handle to a data source added to a [`Plot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(usize);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Source({})", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlotError {
    #[error(transparent)]
    Glyph(#[from] GlyphError),
    #[error(transparent)]
    Scale(#[from] ScaleError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("no data source {0}")]
    MissingSource(SourceId),
    #[error("no renderer {0}")]
    MissingRenderer(RendererId),
}

/// Builder for configuring and constructing a [`Plot`].
///
/// Ranges default to [`DataRange1d`]s fitted to the data, with linear scales.
///
/// # Example
///
/// ```ignore
/// let plot = PlotBuilder::new()
///     .with_frame(Rectangle::new(Point::ORIGIN, Size::new(600.0, 400.0)))
///     .with_x_range(Range1d::new(0.0, 10.0))
///     .with_y_scale(ScaleKind::Log)
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct PlotBuilder {
    frame: Option<Rectangle>,
    x_range: Option<Range>,
    y_range: Option<Range>,
    x_scale: ScaleKind,
    y_scale: ScaleKind,
    lod: Option<LodPolicy>,
}

impl PlotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the plot area in screen pixels.
    pub fn with_frame(mut self, bounds: Rectangle) -> Self {
        self.frame = Some(bounds);
        self
    }

    pub fn with_x_range(mut self, range: impl Into<Range>) -> Self {
        self.x_range = Some(range.into());
        self
    }

    pub fn with_y_range(mut self, range: impl Into<Range>) -> Self {
        self.y_range = Some(range.into());
        self
    }

    pub fn with_x_scale(mut self, kind: ScaleKind) -> Self {
        self.x_scale = kind;
        self
    }

    pub fn with_y_scale(mut self, kind: ScaleKind) -> Self {
        self.y_scale = kind;
        self
    }

    pub fn with_lod(mut self, lod: LodPolicy) -> Self {
        self.lod = Some(lod);
        self
    }

    /// Build the plot, checking that each scale fits its range.
    pub fn build(self) -> Result<Plot, PlotError> {
        let frame = Frame::new(self.frame.unwrap_or(Rectangle {
            x: 0.0,
            y: 0.0,
            width: 600.0,
            height: 400.0,
        }));
        let mut ranges = Ranges::new();
        let x = ranges.insert(self.x_range.unwrap_or_else(|| fitted(self.x_scale)));
        let y = ranges.insert(self.y_range.unwrap_or_else(|| fitted(self.y_scale)));
        let coordinates = CoordinateSystem::for_frame(&frame, x, self.x_scale, y, self.y_scale);
        coordinates.resolve(&ranges)?;

        Ok(Plot {
            ranges,
            frame,
            coordinates,
            sources: Vec::new(),
            renderers: IndexMap::new(),
            clock: InteractionClock::new(),
            lod: self.lod.unwrap_or_default(),
        })
    }
}

fn fitted(kind: ScaleKind) -> Range {
    let hint = match kind {
        ScaleKind::Log => ScaleHint::Log,
        _ => ScaleHint::Linear,
    };
    DataRange1d::new().with_scale_hint(hint).into()
}

#[derive(Debug)]
struct Entry {
    source: SourceId,
    renderer: GlyphRenderer,
}

#[derive(Debug)]
pub struct Plot {
    ranges: Ranges,
    frame: Frame,
    coordinates: CoordinateSystem,
    sources: Vec<ColumnDataSource>,
    renderers: IndexMap<RendererId, Entry>,
    clock: InteractionClock,
    lod: LodPolicy,
}

impl Plot {
    pub fn ranges(&self) -> &Ranges {
        &self.ranges
    }

    /// Direct access to the range arena. Changes are picked up by the next sync.
    pub fn ranges_mut(&mut self) -> &mut Ranges {
        &mut self.ranges
    }

    pub fn x_range(&self) -> RangeId {
        self.coordinates.x_scale.source
    }

    pub fn y_range(&self) -> RangeId {
        self.coordinates.y_scale.source
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn set_frame(&mut self, bounds: Rectangle) {
        self.frame = Frame::new(bounds);
        self.coordinates = self.coordinates.with_frame(&self.frame);
        for entry in self.renderers.values_mut() {
            entry.renderer.set_frame(&self.frame);
        }
    }

    /// The plot's own coordinate system, for building renderers.
    pub fn coordinates(&self) -> CoordinateSystem {
        self.coordinates
    }

    pub fn transform(&self) -> Result<CoordinateTransform, PlotError> {
        Ok(self.coordinates.resolve(&self.ranges)?)
    }

    pub fn lod(&self) -> &LodPolicy {
        &self.lod
    }

    pub fn add_source(&mut self, source: ColumnDataSource) -> SourceId {
        self.sources.push(source);
        SourceId(self.sources.len() - 1)
    }

    pub fn source(&self, id: SourceId) -> Option<&ColumnDataSource> {
        self.sources.get(id.0)
    }

    /// Mutable access for streaming, patching and selection changes.
    pub fn source_mut(&mut self, id: SourceId) -> Option<&mut ColumnDataSource> {
        self.sources.get_mut(id.0)
    }

    /// Add a renderer drawing from `source`. It takes on the plot's level-of-detail policy.
    pub fn add_renderer(
        &mut self,
        source: SourceId,
        mut renderer: GlyphRenderer,
    ) -> Result<RendererId, PlotError> {
        if self.source(source).is_none() {
            return Err(PlotError::MissingSource(source));
        }
        renderer.set_lod(self.lod);
        let id = renderer.id();
        self.renderers.insert(id, Entry { source, renderer });
        Ok(id)
    }

    pub fn renderer(&self, id: RendererId) -> Option<&GlyphRenderer> {
        self.renderers.get(&id).map(|entry| &entry.renderer)
    }

    pub fn renderer_mut(&mut self, id: RendererId) -> Option<&mut GlyphRenderer> {
        self.renderers.get_mut(&id).map(|entry| &mut entry.renderer)
    }

    pub fn renderers(&self) -> impl Iterator<Item = &GlyphRenderer> {
        self.renderers.values().map(|entry| &entry.renderer)
    }

    /// Bring every renderer up to date with its source and the ranges.
    ///
    /// Data is refreshed first, then auto-ranging ranges are refitted to the new bounds, then
    /// glyphs are re-mapped. Returns whether anything changed.
    pub fn sync(&mut self) -> Result<bool, PlotError> {
        let mut changed = false;
        for entry in self.renderers.values_mut() {
            let source = self
                .sources
                .get(entry.source.0)
                .ok_or(PlotError::MissingSource(entry.source))?;
            changed |= entry.renderer.sync_data(source, &self.ranges)?;
        }
        changed |= self.fit_ranges();
        for entry in self.renderers.values_mut() {
            changed |= entry.renderer.sync_transform(&self.ranges)?;
        }
        Ok(changed)
    }

    /// Refit every non-interactive [`DataRange1d`] to the bounds of the renderers using it.
    fn fit_ranges(&mut self) -> bool {
        let fitted: Vec<(RangeId, DataRange1d)> = self
            .ranges
            .iter()
            .filter_map(|(id, range)| match range {
                Range::Data(data) if !data.is_interactive() => Some((id, data.clone())),
                _ => None,
            })
            .collect();

        let mut changed = false;
        for (id, mut data) in fitted {
            let log = data.scale_hint == ScaleHint::Log;
            let extents: Vec<Interval> = self
                .renderers
                .values()
                .map(|entry| &entry.renderer)
                .filter(|renderer| renderer.is_visible())
                .flat_map(|renderer| {
                    let view = renderer.glyph_view();
                    let bounds = if log { view.log_bounds() } else { view.bounds() };
                    let (x, y) = renderer.data_ranges().unzip();
                    [
                        (x == Some(id)).then(|| Interval::new(bounds.x0, bounds.x1)),
                        (y == Some(id)).then(|| Interval::new(bounds.y0, bounds.y1)),
                    ]
                })
                .flatten()
                .collect();
            if data.update(extents) {
                log::debug!("{id}: fitted to {:?}", data.interval());
                self.ranges.update(id, |range| *range = Range::Data(data));
                changed = true;
            }
        }
        changed
    }

    /// Paint every renderer, clipped to the frame.
    ///
    /// Returns the delay after which a follow-up paint is needed, while an interaction is
    /// recent enough for level-of-detail painting.
    pub fn paint(&mut self, ctx: &mut dyn Context2d, now: Instant) -> Option<Duration> {
        let interactive_duration = self.clock.duration(now, self.lod.interval);
        let state = RenderState {
            interactive_duration,
            gpu_accelerated: false,
        };
        log::trace!("paint, interactive for {interactive_duration:?}");

        let b = self.frame.bounds;
        ctx.save();
        ctx.begin_path();
        ctx.rect(b.x, b.y, b.width, b.height);
        ctx.clip();
        for entry in self.renderers.values_mut() {
            if let Some(source) = self.sources.get(entry.source.0) {
                entry.renderer.paint(ctx, source, &state);
            }
        }
        ctx.restore();

        interactive_duration.map(|_| self.lod.timeout)
    }

    /// Hit test one renderer. The result is in its source's rows.
    pub fn hit_test(
        &mut self,
        renderer: RendererId,
        geometry: &Geometry,
    ) -> Result<Option<Selection>, PlotError> {
        let entry = self
            .renderers
            .get_mut(&renderer)
            .ok_or(PlotError::MissingRenderer(renderer))?;
        Ok(entry.renderer.hit_test(geometry))
    }

    /// Hits of every renderer, merged per source.
    fn hits(&mut self, geometry: &Geometry) -> IndexMap<SourceId, Selection> {
        let mut hits: IndexMap<SourceId, Selection> = IndexMap::new();
        for entry in self.renderers.values_mut() {
            if let Some(hit) = entry.renderer.hit_test(geometry) {
                hits.entry(entry.source)
                    .or_default()
                    .update(&hit, SelectionMode::Append);
            }
        }
        hits
    }

    /// Select what `geometry` hits in every source.
    ///
    /// Updates before the `final_` one preview the gesture without committing it. Returns the
    /// sources that were updated.
    pub fn select(&mut self, geometry: &Geometry, mode: SelectionMode, final_: bool) -> Vec<SourceId> {
        let hits = self.hits(geometry);
        for (id, hit) in &hits {
            if let Some(source) = self.sources.get_mut(id.0) {
                source.apply_selection(hit, mode, final_);
            }
        }
        hits.into_keys().collect()
    }

    /// Replace the inspected rows of every source with what `geometry` hits.
    pub fn inspect(&mut self, geometry: &Geometry) {
        let mut hits = self.hits(geometry);
        for (i, source) in self.sources.iter_mut().enumerate() {
            source.set_inspected(hits.swap_remove(&SourceId(i)).unwrap_or_default());
        }
    }

    /// Drag the view by `dx`, `dy` pixels.
    pub fn pan(&mut self, dx: f64, dy: f64, now: Instant) -> Result<(), PlotError> {
        let transform = self.transform()?;
        let (x, y) = (self.x_range(), self.y_range());
        self.move_range(x, |i| pan_interval(i, transform.x.as_ref(), dx));
        self.move_range(y, |i| pan_interval(i, transform.y.as_ref(), dy));
        self.clock.start(now);
        Ok(())
    }

    /// Scale the view by `factor` about the screen point `(sx, sy)`. A factor below 1 zooms in.
    pub fn zoom(&mut self, factor: f64, sx: f64, sy: f64, now: Instant) -> Result<(), PlotError> {
        let transform = self.transform()?;
        let (x, y) = (self.x_range(), self.y_range());
        self.move_range(x, |i| zoom_interval(i, transform.x.as_ref(), factor, sx));
        self.move_range(y, |i| zoom_interval(i, transform.y.as_ref(), factor, sy));
        self.clock.start(now);
        Ok(())
    }

    fn move_range(&mut self, id: RangeId, f: impl FnOnce(Interval) -> Interval) {
        let Some(range) = self.ranges.get(id) else {
            return;
        };
        let next = f(range.interval());
        if next.is_finite() {
            self.ranges.set_interval(id, next.start, next.end);
        }
    }

    /// Restore every range and stop level-of-detail painting.
    pub fn reset(&mut self) {
        let ids: Vec<RangeId> = self.ranges.iter().map(|(id, _)| id).collect();
        for id in ids {
            self.ranges.reset(id);
        }
        self.clock.stop();
    }
}

#[cfg(test)]
mod tests {
    use iced::{Point, Size};

    use super::*;
    use crate::{
        context::{DisplayList, DrawCommand},
        factor::Factor,
        factor_range::FactorRange,
        glyphs::{Line, Scatter},
        index::FullIndex,
        range::Range1d,
    };

    fn frame() -> Rectangle {
        Rectangle::new(Point::ORIGIN, Size::new(100.0, 100.0))
    }

    fn plot_with_points(xs: Vec<f64>, ys: Vec<f64>) -> (Plot, SourceId, RendererId) {
        let mut plot = PlotBuilder::new().with_frame(frame()).build().expect("plot");
        let source = ColumnDataSource::new()
            .with_column("x", xs)
            .expect("x")
            .with_column("y", ys)
            .expect("y");
        let source = plot.add_source(source);
        let renderer = GlyphRenderer::new(Scatter::new("x", "y"), plot.coordinates());
        let renderer = plot.add_renderer(source, renderer).expect("renderer");
        (plot, source, renderer)
    }

    #[test]
    fn data_ranges_fit_renderer_bounds() {
        let (mut plot, source, _) = plot_with_points(vec![0.0, 10.0], vec![-1.0, 1.0]);
        assert!(plot.sync().expect("sync"));
        let x = plot.ranges().get(plot.x_range()).expect("x").interval();
        assert_eq!((x.start, x.end), (-0.5, 10.5));
        assert!(!plot.sync().expect("sync"));

        plot.source_mut(source)
            .expect("source")
            .stream([("x".to_owned(), vec![20.0].into()), ("y".to_owned(), vec![0.0].into())], None)
            .expect("stream");
        assert!(plot.sync().expect("sync"));
        let x = plot.ranges().get(plot.x_range()).expect("x").interval();
        assert_eq!((x.start, x.end), (-1.0, 21.0));
    }

    #[test]
    fn categorical_scale_requires_factor_range() {
        let err = PlotBuilder::new()
            .with_x_scale(ScaleKind::Categorical)
            .with_x_range(Range1d::new(0.0, 1.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, PlotError::Scale(_)));

        let factors = FactorRange::new(["a", "b", "c"]).expect("factors");
        let mut plot = PlotBuilder::new()
            .with_frame(frame())
            .with_x_scale(ScaleKind::Categorical)
            .with_x_range(factors)
            .with_y_range(Range1d::new(0.0, 10.0))
            .build()
            .expect("plot");
        let source = ColumnDataSource::new()
            .with_column("x", vec![Factor::from("b"), Factor::from("c")])
            .expect("x")
            .with_column("y", vec![5.0, 5.0])
            .expect("y");
        let source = plot.add_source(source);
        let renderer = GlyphRenderer::new(Scatter::new("x", "y"), plot.coordinates());
        let renderer = plot.add_renderer(source, renderer).expect("renderer");
        plot.sync().expect("sync");

        // "b" sits at synthetic 1.5 of [0, 3].
        let hit = plot
            .hit_test(renderer, &Geometry::Point { sx: 50.0, sy: 50.0 })
            .expect("renderer")
            .expect("supported");
        assert_eq!(hit.indices, vec![FullIndex(0)]);
    }

    #[test]
    fn paint_clips_to_frame_and_reports_follow_up() {
        let (mut plot, _, _) = plot_with_points(vec![1.0, 2.0], vec![1.0, 2.0]);
        plot.sync().expect("sync");

        let t0 = Instant::now();
        let mut list = DisplayList::new();
        assert_eq!(plot.paint(&mut list, t0), None);
        assert_eq!(&list.commands()[..4], &[
            DrawCommand::Save,
            DrawCommand::BeginPath,
            DrawCommand::Rect {
                x: 0.0,
                y: 0.0,
                width: 100.0,
                height: 100.0
            },
            DrawCommand::Clip,
        ]);
        assert_eq!(list.commands().last(), Some(&DrawCommand::Restore));

        plot.pan(10.0, 0.0, t0).expect("pan");
        let mut list = DisplayList::new();
        let timeout = plot.lod().timeout;
        assert_eq!(
            plot.paint(&mut list, t0 + Duration::from_millis(50)),
            Some(timeout)
        );
        assert_eq!(plot.paint(&mut list, t0 + Duration::from_secs(1)), None);
    }

    #[test]
    fn pan_stops_fitting_until_reset() {
        let (mut plot, source, _) = plot_with_points(vec![0.0, 10.0], vec![0.0, 10.0]);
        plot.sync().expect("sync");
        let before = plot.ranges().get(plot.x_range()).expect("x").interval();

        plot.pan(-10.0, 0.0, Instant::now()).expect("pan");
        let panned = plot.ranges().get(plot.x_range()).expect("x").interval();
        assert!(panned.start > before.start);
        plot.source_mut(source)
            .expect("source")
            .patch("x", [(1, 50.0.into())])
            .expect("patch");
        plot.sync().expect("sync");
        assert_eq!(plot.ranges().get(plot.x_range()).expect("x").interval(), panned);

        plot.reset();
        plot.sync().expect("sync");
        let refit = plot.ranges().get(plot.x_range()).expect("x").interval();
        assert!((refit.start + 2.5).abs() < 1e-9 && (refit.end - 52.5).abs() < 1e-9);
    }

    #[test]
    fn select_merges_renderers_of_a_source() {
        let (mut plot, source, _) = plot_with_points(vec![0.0, 5.0, 10.0], vec![0.0, 5.0, 10.0]);
        let line = GlyphRenderer::new(Line::new("x", "y"), plot.coordinates());
        plot.add_renderer(source, line).expect("line");
        plot.sync().expect("sync");

        let transform = plot.transform().expect("transform");
        let (sx, sy) = transform.compute(5.0, 5.0);
        let updated = plot.select(&Geometry::Point { sx, sy }, SelectionMode::Replace, false);
        assert_eq!(updated, vec![source]);
        let src = plot.source(source).expect("source");
        assert!(src.selected().is_empty());
        let preview = src.selection_preview();
        assert_eq!(preview.indices, vec![FullIndex(1)]);
        assert!(!preview.line_indices.is_empty());

        plot.select(&Geometry::Point { sx, sy }, SelectionMode::Replace, true);
        assert_eq!(
            plot.source(source).expect("source").selected().indices,
            vec![FullIndex(1)]
        );

        plot.inspect(&Geometry::Point { sx: -50.0, sy: -50.0 });
        assert!(plot.source(source).expect("source").inspected().is_empty());
    }

    #[test]
    fn unknown_handles_are_errors() {
        let (mut plot, _, renderer) = plot_with_points(vec![0.0], vec![0.0]);
        let other = GlyphRenderer::new(Scatter::new("x", "y"), plot.coordinates());
        assert!(matches!(
            plot.add_renderer(SourceId(9), other),
            Err(PlotError::MissingSource(SourceId(9)))
        ));
        assert!(plot.hit_test(renderer, &Geometry::Point { sx: 0.0, sy: 0.0 }).is_ok());
    }
}
