use super::{
    DataContext, Glyph, GlyphError, GlyphKind, HitContext, candidates_near, check_len, is_finite,
};
use crate::{
    bbox::Rect,
    context::Context2d,
    dataspec::RaggedSpec,
    geometry::{Geometry, GeometryKind, point_in_poly},
    selection::Selection,
    spatial::{IndexBox, run_boxes},
    transform::CoordinateTransform,
    visuals::Visuals,
};

/// Filled polygons, one per row. NaN in `xs`/`ys` separates the parts of a patch.
#[derive(Debug, Clone)]
pub struct Patches {
    pub xs: RaggedSpec,
    pub ys: RaggedSpec,
    data_xs: Vec<Vec<f64>>,
    data_ys: Vec<Vec<f64>>,
    sxs: Vec<Vec<f64>>,
    sys: Vec<Vec<f64>>,
}

impl Patches {
    pub fn new(xs: impl Into<RaggedSpec>, ys: impl Into<RaggedSpec>) -> Self {
        Self {
            xs: xs.into(),
            ys: ys.into(),
            data_xs: Vec::new(),
            data_ys: Vec::new(),
            sxs: Vec::new(),
            sys: Vec::new(),
        }
    }

    /// Screen-space parts of patch `i`, as `(start, end)` vertex ranges.
    fn parts(&self, i: usize) -> Vec<(usize, usize)> {
        let (sx, sy) = (&self.sxs[i], &self.sys[i]);
        let n = sx.len().min(sy.len());
        let mut parts = Vec::new();
        let mut start = 0;
        for j in 0..=n {
            if j == n || !is_finite(sx[j], sy[j]) {
                if j > start {
                    parts.push((start, j));
                }
                start = j + 1;
            }
        }
        parts
    }

    fn contains(&self, i: usize, x: f64, y: f64) -> bool {
        let (sx, sy) = (&self.sxs[i], &self.sys[i]);
        self.parts(i)
            .into_iter()
            .any(|(a, b)| point_in_poly(x, y, &sx[a..b], &sy[a..b]))
    }

    /// Whether every finite vertex of patch `i` lies inside `rect`.
    fn inside(&self, i: usize, rect: &Rect) -> bool {
        let mut any = false;
        for (&x, &y) in self.sxs[i].iter().zip(&self.sys[i]) {
            if !is_finite(x, y) {
                continue;
            }
            if !rect.contains(x, y) {
                return false;
            }
            any = true;
        }
        any
    }
}

impl Glyph for Patches {
    fn kind(&self) -> GlyphKind {
        GlyphKind::Patches
    }

    fn supports(&self, geometry: GeometryKind) -> bool {
        matches!(geometry, GeometryKind::Point | GeometryKind::Rect)
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
        for &i in indices {
            if i >= self.sxs.len() {
                continue;
            }
            let (sx, sy) = (&self.sxs[i], &self.sys[i]);
            for (a, b) in self.parts(i) {
                ctx.begin_path();
                ctx.move_to(sx[a] as f32, sy[a] as f32);
                for j in a + 1..b {
                    ctx.line_to(sx[j] as f32, sy[j] as f32);
                }
                ctx.close_path();
                if let Some(fill) = &visuals.fill {
                    ctx.fill(fill);
                }
                if let Some(line) = &visuals.line {
                    ctx.stroke(line);
                }
            }
        }
    }

    fn hit_test(&self, geometry: &Geometry, hit: &HitContext<'_>) -> Selection<usize> {
        let indices: Vec<usize> = match geometry {
            Geometry::Point { sx, sy } => candidates_near(hit, *sx, *sy, 0.0)
                .into_iter()
                .filter(|&i| self.contains(i, *sx, *sy))
                .collect(),
            Geometry::Rect { sx0, sy0, sx1, sy1 } => {
                let screen = Rect::new(*sx0, *sy0, *sx1, *sy1);
                let mut rows = hit
                    .index
                    .indices(&hit.transform.invert_rect(*sx0, *sy0, *sx1, *sy1));
                rows.sort_unstable();
                rows.into_iter()
                    .filter(|&i| self.inside(i, &screen))
                    .collect()
            }
            Geometry::Span { .. } | Geometry::Poly { .. } => Vec::new(),
        };
        Selection::from_indices(indices)
    }
}
