use glam::DVec2;

use super::{
    DataContext, Glyph, GlyphError, GlyphKind, HitContext, IndexSpace, candidates_near, check_len,
    is_finite,
};
use crate::{
    context::Context2d,
    dataspec::NumberSpec,
    geometry::{Direction, Geometry, GeometryKind, dist_to_segment},
    selection::Selection,
    spatial::IndexBox,
    transform::CoordinateTransform,
    visuals::Visuals,
};

/// A polyline through every row of the source, in row order.
///
/// Works in full index space: entry `i` is source row `i`, whatever the view filter.
#[derive(Debug, Clone)]
pub struct Line {
    pub x: NumberSpec,
    pub y: NumberSpec,
    /// Stroke width used for point hits, in pixels.
    pub line_width: f64,
    xs: Vec<f64>,
    ys: Vec<f64>,
    sx: Vec<f64>,
    sy: Vec<f64>,
}

impl Line {
    pub fn new(x: impl Into<NumberSpec>, y: impl Into<NumberSpec>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            line_width: 1.0,
            xs: Vec::new(),
            ys: Vec::new(),
            sx: Vec::new(),
            sy: Vec::new(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }

    /// Segment `i -> i + 1`, if both ends are finite on screen.
    fn segment(&self, i: usize) -> Option<(DVec2, DVec2)> {
        let (x0, y0) = (*self.sx.get(i)?, *self.sy.get(i)?);
        let (x1, y1) = (*self.sx.get(i + 1)?, *self.sy.get(i + 1)?);
        (is_finite(x0, y0) && is_finite(x1, y1))
            .then_some((DVec2::new(x0, y0), DVec2::new(x1, y1)))
    }
}

/// Whether `value` lies between `a` and `b`, in either order.
fn brackets(a: f64, b: f64, value: f64) -> bool {
    a.min(b) <= value && value <= a.max(b)
}

impl Glyph for Line {
    fn kind(&self) -> GlyphKind {
        GlyphKind::Line
    }

    fn index_space(&self) -> IndexSpace {
        IndexSpace::Full
    }

    fn supports(&self, geometry: GeometryKind) -> bool {
        matches!(geometry, GeometryKind::Point | GeometryKind::Span)
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
        check_len("y", xs.len(), ys.len())?;
        self.xs = xs;
        self.ys = ys;
        Ok(())
    }

    /// One box per finite point `i`, stretched over segment `i -> i + 1` when that is finite.
    fn index_data(&self, out: &mut Vec<IndexBox>) {
        let n = self.xs.len().min(self.ys.len());
        for i in 0..n {
            let (x0, y0) = (self.xs[i], self.ys[i]);
            if !is_finite(x0, y0) {
                continue;
            }
            let (x1, y1) = match (self.xs.get(i + 1), self.ys.get(i + 1)) {
                (Some(&x1), Some(&y1)) if is_finite(x1, y1) => (x1, y1),
                _ => (x0, y0),
            };
            out.push(IndexBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1), i));
        }
    }

    fn map_data(&mut self, transform: &CoordinateTransform) {
        transform.map_to_screen_into(&self.xs, &self.ys, &mut self.sx, &mut self.sy);
    }

    /// Strokes one path, broken wherever indices are not consecutive or a point is NaN.
    fn render(&self, ctx: &mut dyn Context2d, indices: &[usize], visuals: &Visuals) {
        let Some(line) = &visuals.line else {
            return;
        };

        ctx.begin_path();
        let mut previous: Option<usize> = None;
        for &i in indices {
            let (Some(&sx), Some(&sy)) = (self.sx.get(i), self.sy.get(i)) else {
                previous = None;
                continue;
            };
            if !is_finite(sx, sy) {
                previous = None;
                continue;
            }
            match previous {
                Some(p) if p + 1 == i => ctx.line_to(sx as f32, sy as f32),
                _ => ctx.move_to(sx as f32, sy as f32),
            }
            previous = Some(i);
        }
        ctx.stroke(line);
    }

    fn hit_test(&self, geometry: &Geometry, hit: &HitContext<'_>) -> Selection<usize> {
        let mut selection = Selection::default();
        match geometry {
            Geometry::Point { sx, sy } => {
                let p = DVec2::new(*sx, *sy);
                let threshold = (self.line_width / 2.0).max(2.0);
                let closest = candidates_near(hit, *sx, *sy, threshold)
                    .into_iter()
                    .filter_map(|i| self.segment(i).map(|(a, b)| (i, dist_to_segment(p, a, b))))
                    .filter(|(_, d)| *d < threshold)
                    .min_by(|a, b| a.1.total_cmp(&b.1));
                if let Some((i, _)) = closest {
                    selection.line_indices.push(i);
                }
            }
            Geometry::Span { sx, sy, direction } => {
                let (values, value) = match direction {
                    Direction::H => (&self.xs, hit.transform.x.invert(*sx)),
                    Direction::V => (&self.ys, hit.transform.y.invert(*sy)),
                };
                selection.line_indices = (0..values.len().saturating_sub(1))
                    .filter(|&i| brackets(values[i], values[i + 1], value))
                    .collect();
            }
            Geometry::Rect { .. } | Geometry::Poly { .. } => {}
        }
        if !selection.line_indices.is_empty() {
            selection.glyphs.push(hit.id);
        }
        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::{DisplayList, DrawCommand},
        glyphs::{GlyphHit, GlyphView, testing::unit_transform},
        index::FullIndex,
        source::ColumnDataSource,
    };

    fn view(xs: Vec<f64>, ys: Vec<f64>) -> GlyphView {
        let rows: Vec<FullIndex> = (0..xs.len()).map(FullIndex).collect();
        let source = ColumnDataSource::new()
            .with_column("x", xs)
            .expect("x")
            .with_column("y", ys)
            .expect("y");
        let mut view = GlyphView::new(Line::new("x", "y").with_line_width(6.0));
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

    fn hit(view: &GlyphView, geometry: Geometry) -> Selection<FullIndex> {
        match view.hit_test(&geometry) {
            Some(GlyphHit::Full(s)) => s,
            other => panic!("unexpected hit {other:?}"),
        }
    }

    #[test]
    fn point_picks_closest_segment() {
        // Screen points (0,100) (50,50) (100,100).
        let v = view(vec![0.0, 50.0, 100.0], vec![0.0, 50.0, 0.0]);
        let s = hit(&v, Geometry::Point { sx: 52.0, sy: 51.0 });
        assert_eq!(crate::index::raw(&s.line_indices), vec![1]);
        assert_eq!(s.glyphs, vec![v.id()]);
        assert!(s.indices.is_empty());

        let miss = hit(&v, Geometry::Point { sx: 50.0, sy: 80.0 });
        assert!(miss.is_empty());
    }

    #[test]
    fn point_finds_long_segments_through_the_index() {
        // One box per finite point; the lone point at 3 gets a degenerate box.
        let v = view(
            vec![0.0, 100.0, f64::NAN, 50.0, f64::NAN, 0.0, 100.0],
            vec![10.0, 10.0, f64::NAN, 50.0, f64::NAN, 90.0, 90.0],
        );
        assert_eq!(v.index().len(), 5);

        // Both ends of segment 5 are 50px away from the pointer.
        let s = hit(&v, Geometry::Point { sx: 50.0, sy: 11.0 });
        assert_eq!(crate::index::raw(&s.line_indices), vec![5]);
        let s = hit(&v, Geometry::Point { sx: 50.0, sy: 89.0 });
        assert_eq!(crate::index::raw(&s.line_indices), vec![0]);
        // Near the lone point, which has no segment.
        assert!(hit(&v, Geometry::Point { sx: 50.0, sy: 50.0 }).is_empty());
    }

    #[test]
    fn span_collects_every_bracketing_segment() {
        let v = view(vec![0.0, 40.0, 20.0, 60.0], vec![0.0, 10.0, 20.0, 30.0]);
        let s = hit(
            &v,
            Geometry::Span {
                sx: 30.0,
                sy: 0.0,
                direction: Direction::H,
            },
        );
        assert_eq!(crate::index::raw(&s.line_indices), vec![0, 1, 2]);

        let s = hit(
            &v,
            Geometry::Span {
                sx: 0.0,
                sy: 85.0,
                direction: Direction::V,
            },
        );
        assert_eq!(crate::index::raw(&s.line_indices), vec![1]);
    }

    #[test]
    fn render_breaks_at_gaps_and_nan() {
        let v = view(vec![0.0, 1.0, f64::NAN, 3.0, 4.0, 5.0], vec![0.0; 6]);
        let mut list = DisplayList::new();
        v.render(&mut list, &[0, 1, 2, 3, 5], &Visuals::default());
        let moves = list
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::MoveTo { .. }))
            .count();
        let lines = list
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::LineTo { .. }))
            .count();
        assert_eq!((moves, lines), (3, 1));
        assert_eq!(list.paint_calls(), 1);
    }

    #[test]
    fn rect_geometry_is_unsupported() {
        let v = view(vec![0.0, 1.0], vec![0.0, 1.0]);
        let rect = Geometry::Rect {
            sx0: 0.0,
            sy0: 0.0,
            sx1: 100.0,
            sy1: 100.0,
        };
        assert!(v.hit_test(&rect).is_none());
    }
}
