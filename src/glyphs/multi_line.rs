use glam::DVec2;

use super::{
    DataContext, Glyph, GlyphError, GlyphKind, HitContext, candidates_near, check_len, is_finite,
};
use crate::{
    bbox::Rect,
    context::Context2d,
    dataspec::RaggedSpec,
    geometry::{Direction, Geometry, GeometryKind, dist_to_segment},
    selection::Selection,
    spatial::{IndexBox, run_boxes},
    transform::CoordinateTransform,
    visuals::Visuals,
};

/// One polyline per row, from list-valued `xs` and `ys`. NaN breaks a line.
#[derive(Debug, Clone)]
pub struct MultiLine {
    pub xs: RaggedSpec,
    pub ys: RaggedSpec,
    /// Stroke width used for point hits, in pixels.
    pub line_width: f64,
    data_xs: Vec<Vec<f64>>,
    data_ys: Vec<Vec<f64>>,
    sxs: Vec<Vec<f64>>,
    sys: Vec<Vec<f64>>,
}

impl MultiLine {
    pub fn new(xs: impl Into<RaggedSpec>, ys: impl Into<RaggedSpec>) -> Self {
        Self {
            xs: xs.into(),
            ys: ys.into(),
            line_width: 1.0,
            data_xs: Vec::new(),
            data_ys: Vec::new(),
            sxs: Vec::new(),
            sys: Vec::new(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }

    /// Finite screen segments `j -> j + 1` of row `i`.
    fn segments(&self, i: usize) -> impl Iterator<Item = (usize, DVec2, DVec2)> + '_ {
        let (sx, sy) = (&self.sxs[i], &self.sys[i]);
        let n = sx.len().min(sy.len());
        (0..n.saturating_sub(1)).filter_map(move |j| {
            let (x0, y0, x1, y1) = (sx[j], sy[j], sx[j + 1], sy[j + 1]);
            (is_finite(x0, y0) && is_finite(x1, y1))
                .then_some((j, DVec2::new(x0, y0), DVec2::new(x1, y1)))
        })
    }

    fn hit_point(&self, sx: f64, sy: f64, hit: &HitContext<'_>) -> Selection<usize> {
        let p = DVec2::new(sx, sy);
        let threshold = (self.line_width / 2.0).max(2.0);
        let mut selection = Selection::default();
        for i in candidates_near(hit, sx, sy, threshold) {
            let closest = self
                .segments(i)
                .map(|(j, a, b)| (j, dist_to_segment(p, a, b)))
                .filter(|(_, d)| *d < threshold)
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((j, _)) = closest {
                selection.indices.push(i);
                selection.multiline_indices.insert(i, vec![j]);
            }
        }
        selection
    }

    fn hit_span(&self, sx: f64, sy: f64, direction: Direction, hit: &HitContext<'_>) -> Selection<usize> {
        let (value, query) = match direction {
            Direction::H => {
                let x = hit.transform.x.invert(sx);
                (x, Rect::new(x, f64::NEG_INFINITY, x, f64::INFINITY))
            }
            Direction::V => {
                let y = hit.transform.y.invert(sy);
                (y, Rect::new(f64::NEG_INFINITY, y, f64::INFINITY, y))
            }
        };
        let mut rows = hit.index.indices(&query);
        rows.sort_unstable();

        let mut selection = Selection::default();
        for i in rows {
            let values = match direction {
                Direction::H => &self.data_xs[i],
                Direction::V => &self.data_ys[i],
            };
            let hits: Vec<usize> = (0..values.len().saturating_sub(1))
                .filter(|&j| {
                    let (a, b) = (values[j], values[j + 1]);
                    a.is_finite() && b.is_finite() && a.min(b) <= value && value <= a.max(b)
                })
                .collect();
            if !hits.is_empty() {
                selection.indices.push(i);
                selection.multiline_indices.insert(i, hits);
            }
        }
        selection
    }
}

impl Glyph for MultiLine {
    fn kind(&self) -> GlyphKind {
        GlyphKind::MultiLine
    }

    fn supports(&self, geometry: GeometryKind) -> bool {
        matches!(geometry, GeometryKind::Point | GeometryKind::Span)
    }

    fn len(&self) -> usize {
        self.data_xs.len()
    }

    fn set_data(&mut self, data: &DataContext<'_>) -> Result<(), GlyphError> {
        let xs = self.xs.materialize(data.source, data.rows)?;
        let ys = self.ys.materialize(data.source, data.rows)?;
        check_len("ys", xs.len(), ys.len())?;
        for (x, y) in xs.iter().zip(&ys) {
            check_len("ys", x.len(), y.len())?;
        }
        self.data_xs = xs;
        self.data_ys = ys;
        Ok(())
    }

    fn index_data(&self, out: &mut Vec<IndexBox>) {
        for (i, (xs, ys)) in self.data_xs.iter().zip(&self.data_ys).enumerate() {
            run_boxes(xs, ys, i, out);
        }
    }

    fn map_data(&mut self, transform: &CoordinateTransform) {
        let (sxs, sys) = self
            .data_xs
            .iter()
            .zip(&self.data_ys)
            .map(|(xs, ys)| transform.map_to_screen(xs, ys))
            .unzip();
        self.sxs = sxs;
        self.sys = sys;
    }

    fn render(&self, ctx: &mut dyn Context2d, indices: &[usize], visuals: &Visuals) {
        let Some(line) = &visuals.line else {
            return;
        };
        for &i in indices {
            let (Some(sx), Some(sy)) = (self.sxs.get(i), self.sys.get(i)) else {
                continue;
            };
            ctx.begin_path();
            let mut pen_down = false;
            for (&x, &y) in sx.iter().zip(sy) {
                if !is_finite(x, y) {
                    pen_down = false;
                    continue;
                }
                if pen_down {
                    ctx.line_to(x as f32, y as f32);
                } else {
                    ctx.move_to(x as f32, y as f32);
                    pen_down = true;
                }
            }
            ctx.stroke(line);
        }
    }

    fn hit_test(&self, geometry: &Geometry, hit: &HitContext<'_>) -> Selection<usize> {
        match geometry {
            Geometry::Point { sx, sy } => self.hit_point(*sx, *sy, hit),
            Geometry::Span { sx, sy, direction } => self.hit_span(*sx, *sy, *direction, hit),
            Geometry::Rect { .. } | Geometry::Poly { .. } => Selection::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::{DisplayList, DrawCommand},
        glyphs::{GlyphHit, GlyphView, testing::unit_transform},
        index::{FullIndex, SubsetIndex},
        source::ColumnDataSource,
    };

    fn view(xs: Vec<Vec<f64>>, ys: Vec<Vec<f64>>) -> GlyphView {
        let rows: Vec<FullIndex> = (0..xs.len()).map(FullIndex).collect();
        let source = ColumnDataSource::new()
            .with_column("xs", xs)
            .expect("xs")
            .with_column("ys", ys)
            .expect("ys");
        let mut view = GlyphView::new(MultiLine::new("xs", "ys"));
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

    fn hit(view: &GlyphView, geometry: Geometry) -> Selection<SubsetIndex> {
        match view.hit_test(&geometry) {
            Some(GlyphHit::Subset(s)) => s,
            other => panic!("unexpected hit {other:?}"),
        }
    }

    #[test]
    fn nan_splits_index_boxes() {
        let v = view(
            vec![vec![0.0, 10.0, f64::NAN, 50.0, 60.0], vec![20.0, 30.0]],
            vec![vec![0.0, 10.0, f64::NAN, 50.0, 60.0], vec![80.0, 90.0]],
        );
        assert_eq!(v.index().len(), 3);
        assert_eq!(v.bounds(), Rect::new(0.0, 0.0, 60.0, 90.0));
    }

    #[test]
    fn point_reports_closest_segment_per_line() {
        let v = view(
            vec![vec![0.0, 50.0, 100.0], vec![0.0, 100.0]],
            vec![vec![50.0, 50.0, 50.0], vec![49.0, 49.0]],
        );
        let s = hit(&v, Geometry::Point { sx: 70.0, sy: 50.5 });
        assert_eq!(s.indices, vec![SubsetIndex(0), SubsetIndex(1)]);
        assert_eq!(s.multiline_indices[&SubsetIndex(0)], vec![1]);
        assert_eq!(s.multiline_indices[&SubsetIndex(1)], vec![0]);

        assert!(hit(&v, Geometry::Point { sx: 70.0, sy: 20.0 }).is_empty());
    }

    #[test]
    fn span_reports_all_bracketing_segments() {
        let v = view(
            vec![vec![0.0, 40.0, 20.0, f64::NAN, 35.0], vec![50.0, 90.0]],
            vec![vec![0.0, 10.0, 20.0, 30.0, 40.0], vec![0.0, 0.0]],
        );
        let s = hit(
            &v,
            Geometry::Span {
                sx: 30.0,
                sy: 0.0,
                direction: Direction::H,
            },
        );
        assert_eq!(s.indices, vec![SubsetIndex(0)]);
        assert_eq!(s.multiline_indices[&SubsetIndex(0)], vec![0, 1]);
    }

    #[test]
    fn render_strokes_each_line() {
        let v = view(
            vec![vec![0.0, 1.0, f64::NAN, 3.0], vec![5.0, 6.0]],
            vec![vec![0.0, 1.0, 2.0, 3.0], vec![5.0, 6.0]],
        );
        let mut list = DisplayList::new();
        v.render(&mut list, &[0, 1], &Visuals::default());
        let moves = list
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::MoveTo { .. }))
            .count();
        assert_eq!(moves, 3);
        assert_eq!(list.paint_calls(), 2);
    }
}
