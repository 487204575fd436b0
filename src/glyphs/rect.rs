use glam::DVec2;

use super::{
    DataContext, Glyph, GlyphError, GlyphKind, HitContext, candidates_near, check_len,
    is_finite, pixels_to_data,
};
use crate::{
    bbox::Rect,
    context::Context2d,
    dataspec::NumberSpec,
    geometry::{Geometry, GeometryKind, point_in_poly},
    selection::Selection,
    spatial::IndexBox,
    transform::CoordinateTransform,
    visuals::Visuals,
};

/// Units a size is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpatialUnits {
    #[default]
    Data,
    /// Pixels.
    Screen,
}

/// Rectangles given by center, size and rotation.
///
/// `angle` is in radians, counterclockwise on screen.
#[derive(Debug, Clone)]
pub struct RectGlyph {
    pub x: NumberSpec,
    pub y: NumberSpec,
    pub width: NumberSpec,
    pub height: NumberSpec,
    pub angle: NumberSpec,
    pub width_units: SpatialUnits,
    pub height_units: SpatialUnits,
    xs: Vec<f64>,
    ys: Vec<f64>,
    widths: Vec<f64>,
    heights: Vec<f64>,
    angles: Vec<f64>,
    sx: Vec<f64>,
    sy: Vec<f64>,
    sw: Vec<f64>,
    sh: Vec<f64>,
    /// Largest half diagonal on screen.
    max_radius: f64,
}

impl RectGlyph {
    pub fn new(
        x: impl Into<NumberSpec>,
        y: impl Into<NumberSpec>,
        width: impl Into<NumberSpec>,
        height: impl Into<NumberSpec>,
    ) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            width: width.into(),
            height: height.into(),
            angle: NumberSpec::Value(0.0),
            width_units: SpatialUnits::Data,
            height_units: SpatialUnits::Data,
            xs: Vec::new(),
            ys: Vec::new(),
            widths: Vec::new(),
            heights: Vec::new(),
            angles: Vec::new(),
            sx: Vec::new(),
            sy: Vec::new(),
            sw: Vec::new(),
            sh: Vec::new(),
            max_radius: 0.0,
        }
    }

    pub fn with_angle(mut self, angle: impl Into<NumberSpec>) -> Self {
        self.angle = angle.into();
        self
    }

    pub fn with_units(mut self, width: SpatialUnits, height: SpatialUnits) -> Self {
        self.width_units = width;
        self.height_units = height;
        self
    }

    /// Screen widths and heights from the last `map_data`.
    pub fn screen_sizes(&self) -> (&[f64], &[f64]) {
        (&self.sw, &self.sh)
    }

    fn contains(&self, i: usize, p: DVec2) -> bool {
        let center = DVec2::new(self.sx[i], self.sy[i]);
        let local = DVec2::from_angle(self.angles[i]).rotate(p - center);
        local.x.abs() <= self.sw[i] / 2.0 && local.y.abs() <= self.sh[i] / 2.0
    }
}

fn max_finite(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max)
}

/// Screen length of `size` centered on `center`, along one axis.
fn screen_length(
    units: SpatialUnits,
    center: f64,
    size: f64,
    compute: impl Fn(f64) -> f64,
) -> f64 {
    match units {
        SpatialUnits::Screen => size,
        SpatialUnits::Data => (compute(center + size / 2.0) - compute(center - size / 2.0)).abs(),
    }
}

impl Glyph for RectGlyph {
    fn kind(&self) -> GlyphKind {
        GlyphKind::Rect
    }

    fn supports(&self, geometry: GeometryKind) -> bool {
        geometry != GeometryKind::Span
    }

    fn len(&self) -> usize {
        self.xs.len()
    }

    fn set_data(&mut self, data: &DataContext<'_>) -> Result<(), GlyphError> {
        let xs = self
            .x
            .materialize_coordinates(data.source, data.rows, data.x_factors)?;
        let ys = self
            .y
            .materialize_coordinates(data.source, data.rows, data.y_factors)?;
        let widths = self.width.materialize(data.source, data.rows)?;
        let heights = self.height.materialize(data.source, data.rows)?;
        let angles = self.angle.materialize(data.source, data.rows)?;
        check_len("y", xs.len(), ys.len())?;
        check_len("width", xs.len(), widths.len())?;
        check_len("height", xs.len(), heights.len())?;
        check_len("angle", xs.len(), angles.len())?;

        self.xs = xs;
        self.ys = ys;
        self.widths = widths;
        self.heights = heights;
        self.angles = angles;
        Ok(())
    }

    fn index_data(&self, out: &mut Vec<IndexBox>) {
        out.extend(
            self.xs
                .iter()
                .zip(&self.ys)
                .enumerate()
                .filter(|(_, (x, y))| is_finite(**x, **y))
                .map(|(i, (&x, &y))| IndexBox::point(x, y, i)),
        );
    }

    fn map_data(&mut self, transform: &CoordinateTransform) {
        transform.map_to_screen_into(&self.xs, &self.ys, &mut self.sx, &mut self.sy);

        self.sw = self
            .xs
            .iter()
            .zip(&self.widths)
            .map(|(&x, &w)| screen_length(self.width_units, x, w, |v| transform.x.compute(v)))
            .collect();
        self.sh = self
            .ys
            .iter()
            .zip(&self.heights)
            .map(|(&y, &h)| screen_length(self.height_units, y, h, |v| transform.y.compute(v)))
            .collect();

        self.max_radius = self
            .sw
            .iter()
            .zip(&self.sh)
            .map(|(w, h)| w.hypot(*h) / 2.0)
            .filter(|r| r.is_finite())
            .fold(0.0, f64::max);
    }

    fn bounds_margin(&self) -> (f64, f64) {
        let dx = match self.width_units {
            SpatialUnits::Data => max_finite(&self.widths) / 2.0,
            SpatialUnits::Screen => 0.0,
        };
        let dy = match self.height_units {
            SpatialUnits::Data => max_finite(&self.heights) / 2.0,
            SpatialUnits::Screen => 0.0,
        };
        (dx, dy)
    }

    fn supports_masking(&self) -> bool {
        true
    }

    fn mask_margin(&self, transform: &CoordinateTransform) -> (f64, f64) {
        pixels_to_data(transform, self.max_radius)
    }

    fn render(&self, ctx: &mut dyn Context2d, indices: &[usize], visuals: &Visuals) {
        for &i in indices {
            let (Some(&sx), Some(&sy), Some(&sw), Some(&sh)) =
                (self.sx.get(i), self.sy.get(i), self.sw.get(i), self.sh.get(i))
            else {
                continue;
            };
            let angle = self.angles.get(i).copied().unwrap_or(0.0);
            if !(is_finite(sx, sy) && is_finite(sw, sh) && angle.is_finite()) {
                continue;
            }
            let (w, h) = (sw as f32, sh as f32);

            ctx.save();
            ctx.translate(sx as f32, sy as f32);
            if angle != 0.0 {
                ctx.rotate(-angle as f32);
            }
            ctx.begin_path();
            ctx.rect(-w / 2.0, -h / 2.0, w, h);
            if let Some(fill) = &visuals.fill {
                ctx.fill(fill);
            }
            if let Some(line) = &visuals.line {
                ctx.stroke(line);
            }
            ctx.restore();
        }
    }

    fn hit_test(&self, geometry: &Geometry, hit: &HitContext<'_>) -> Selection<usize> {
        let mut indices: Vec<usize> = match geometry {
            Geometry::Point { sx, sy } => {
                let p = DVec2::new(*sx, *sy);
                candidates_near(hit, *sx, *sy, self.max_radius)
                    .into_iter()
                    .filter(|&i| self.contains(i, p))
                    .collect()
            }
            Geometry::Rect { sx0, sy0, sx1, sy1 } => hit
                .index
                .indices(&hit.transform.invert_rect(*sx0, *sy0, *sx1, *sy1)),
            Geometry::Poly { sx, sy } => {
                let bounds = sx
                    .iter()
                    .zip(sy)
                    .fold(Rect::EMPTY, |acc, (&x, &y)| acc.union(&Rect::point(x, y)));
                hit.index
                    .indices(
                        &hit.transform
                            .invert_rect(bounds.x0, bounds.y0, bounds.x1, bounds.y1),
                    )
                    .into_iter()
                    .filter(|&i| point_in_poly(self.sx[i], self.sy[i], sx, sy))
                    .collect()
            }
            Geometry::Span { .. } => Vec::new(),
        };
        indices.sort_unstable();
        Selection::from_indices(indices)
    }
}

#[cfg(test)]
mod tests {
    use core::f64::consts::FRAC_PI_2;

    use super::*;
    use crate::{
        context::{DisplayList, DrawCommand},
        glyphs::{GlyphHit, GlyphView, testing::unit_transform},
        index::{FullIndex, SubsetIndex},
        source::ColumnDataSource,
    };

    fn view(glyph: RectGlyph, xs: Vec<f64>, ys: Vec<f64>) -> GlyphView {
        let rows: Vec<FullIndex> = (0..xs.len()).map(FullIndex).collect();
        let source = ColumnDataSource::new()
            .with_column("x", xs)
            .expect("x")
            .with_column("y", ys)
            .expect("y");
        let mut view = GlyphView::new(glyph);
        view.set_data(&DataContext {
            source: &source,
            rows: &rows,
            x_factors: None,
            y_factors: None,
        })
        .expect("data");
        view.map_data(unit_transform());
        view
    }

    fn hit(view: &GlyphView, geometry: Geometry) -> Vec<usize> {
        match view.hit_test(&geometry) {
            Some(GlyphHit::Subset(s)) => s.indices.iter().map(|SubsetIndex(i)| *i).collect(),
            other => panic!("unexpected hit {other:?}"),
        }
    }

    #[test]
    fn data_unit_sizes_pad_bounds() {
        let v = view(
            RectGlyph::new("x", "y", 10.0, 20.0),
            vec![0.0, 1.0, 2.0, 3.0],
            vec![0.0, 1.0, 2.0, 3.0],
        );
        assert_eq!(v.bounds(), Rect::new(-5.0, -10.0, 8.0, 13.0));
        assert_eq!(v.log_bounds(), Rect::new(-4.0, -9.0, 8.0, 13.0));
    }

    #[test]
    fn screen_unit_sizes_do_not_pad_bounds() {
        let v = view(
            RectGlyph::new("x", "y", 10.0, 20.0)
                .with_units(SpatialUnits::Screen, SpatialUnits::Screen),
            vec![0.0, 3.0],
            vec![0.0, 3.0],
        );
        assert_eq!(v.bounds(), Rect::new(0.0, 0.0, 3.0, 3.0));
    }

    #[test]
    fn point_hit_respects_rotation() {
        let v = view(
            RectGlyph::new("x", "y", 20.0, 4.0).with_angle(FRAC_PI_2),
            vec![50.0],
            vec![50.0],
        );
        // Rotated upright: 4 px wide, 20 px tall.
        assert_eq!(hit(&v, Geometry::Point { sx: 50.0, sy: 41.0 }), vec![0]);
        assert!(hit(&v, Geometry::Point { sx: 59.0, sy: 50.0 }).is_empty());

        let flat = view(RectGlyph::new("x", "y", 20.0, 4.0), vec![50.0], vec![50.0]);
        assert_eq!(hit(&flat, Geometry::Point { sx: 59.0, sy: 50.0 }), vec![0]);
    }

    #[test]
    fn rect_hits_test_centers_and_span_is_unsupported() {
        let v = view(
            RectGlyph::new("x", "y", 30.0, 30.0),
            vec![10.0, 50.0, 90.0],
            vec![50.0, 50.0, 50.0],
        );
        let rect = Geometry::Rect {
            sx0: 20.0,
            sy0: 0.0,
            sx1: 95.0,
            sy1: 100.0,
        };
        assert_eq!(hit(&v, rect), vec![1, 2]);
        let span = Geometry::Span {
            sx: 50.0,
            sy: 50.0,
            direction: crate::geometry::Direction::H,
        };
        assert!(v.hit_test(&span).is_none());
    }

    #[test]
    fn render_rotates_about_the_center() {
        let v = view(
            RectGlyph::new("x", "y", 10.0, 4.0).with_angle(0.5),
            vec![20.0],
            vec![30.0],
        );
        let mut list = DisplayList::new();
        v.render(&mut list, &[0], &Visuals::default());
        assert_eq!(
            &list.commands()[..5],
            &[
                DrawCommand::Save,
                DrawCommand::Translate { x: 20.0, y: 70.0 },
                DrawCommand::Rotate(-0.5),
                DrawCommand::BeginPath,
                DrawCommand::Rect {
                    x: -5.0,
                    y: -2.0,
                    width: 10.0,
                    height: 4.0
                },
            ]
        );
        assert_eq!(list.commands().last(), Some(&DrawCommand::Restore));
    }
}
