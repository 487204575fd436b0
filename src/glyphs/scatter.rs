use core::f64::consts::{FRAC_PI_2, TAU};

use glam::DVec2;

use super::{
    DataContext, Glyph, GlyphError, GlyphKind, HitContext, candidates_near, check_len,
    is_finite, pixels_to_data,
};
use crate::{
    bbox::Rect,
    context::Context2d,
    dataspec::NumberSpec,
    geometry::{Direction, Geometry, GeometryKind, point_in_poly},
    selection::Selection,
    spatial::IndexBox,
    transform::CoordinateTransform,
    visuals::Visuals,
};

/// Marker shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerType {
    /// A filled circle.
    #[default]
    FilledCircle,
    /// An empty circle (ring).
    EmptyCircle,
    Square,
    Star,
    Triangle,
}

/// Markers of a pixel size centered on data points.
#[derive(Debug, Clone)]
pub struct Scatter {
    pub x: NumberSpec,
    pub y: NumberSpec,
    /// Marker size in pixels.
    pub size: NumberSpec,
    pub marker: MarkerType,
    xs: Vec<f64>,
    ys: Vec<f64>,
    sizes: Vec<f64>,
    max_size: f64,
    sx: Vec<f64>,
    sy: Vec<f64>,
}

impl Scatter {
    pub fn new(x: impl Into<NumberSpec>, y: impl Into<NumberSpec>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            size: NumberSpec::Value(5.0),
            marker: MarkerType::FilledCircle,
            xs: Vec::new(),
            ys: Vec::new(),
            sizes: Vec::new(),
            max_size: 0.0,
            sx: Vec::new(),
            sy: Vec::new(),
        }
    }

    pub fn with_size(mut self, size: impl Into<NumberSpec>) -> Self {
        self.size = size.into();
        self
    }

    pub fn with_marker(mut self, marker: MarkerType) -> Self {
        self.marker = marker;
        self
    }

    /// Screen positions from the last `map_data`.
    pub fn screen_positions(&self) -> (&[f64], &[f64]) {
        (&self.sx, &self.sy)
    }

    fn contains(&self, i: usize, p: DVec2) -> bool {
        let center = DVec2::new(self.sx[i], self.sy[i]);
        let r = self.sizes[i] / 2.0;
        let d = p - center;
        match self.marker {
            MarkerType::FilledCircle | MarkerType::EmptyCircle => d.length() <= r,
            _ => d.x.abs() <= r && d.y.abs() <= r,
        }
    }

    fn hit_span(&self, sx: f64, sy: f64, direction: Direction, hit: &HitContext<'_>) -> Vec<usize> {
        let r = self.max_size / 2.0;
        let t = hit.transform;
        let query = match direction {
            Direction::H => {
                let (x0, x1) = (t.x.invert(sx - r), t.x.invert(sx + r));
                Rect {
                    x0: x0.min(x1),
                    x1: x0.max(x1),
                    ..band()
                }
            }
            Direction::V => {
                let (y0, y1) = (t.y.invert(sy - r), t.y.invert(sy + r));
                Rect {
                    y0: y0.min(y1),
                    y1: y0.max(y1),
                    ..band()
                }
            }
        };
        let mut indices: Vec<usize> = hit
            .index
            .indices(&query)
            .into_iter()
            .filter(|&i| {
                let half = self.sizes[i] / 2.0;
                match direction {
                    Direction::H => (self.sx[i] - sx).abs() <= half,
                    Direction::V => (self.sy[i] - sy).abs() <= half,
                }
            })
            .collect();
        indices.sort_unstable();
        indices
    }
}

fn band() -> Rect {
    Rect {
        x0: f64::NEG_INFINITY,
        y0: f64::NEG_INFINITY,
        x1: f64::INFINITY,
        y1: f64::INFINITY,
    }
}

impl Glyph for Scatter {
    fn kind(&self) -> GlyphKind {
        GlyphKind::Scatter
    }

    fn supports(&self, _geometry: GeometryKind) -> bool {
        true
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
        let sizes = self.size.materialize(data.source, data.rows)?;
        check_len("y", xs.len(), ys.len())?;
        check_len("size", xs.len(), sizes.len())?;

        self.max_size = sizes
            .iter()
            .copied()
            .filter(|s| s.is_finite())
            .fold(0.0, f64::max);
        self.xs = xs;
        self.ys = ys;
        self.sizes = sizes;
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
    }

    fn supports_masking(&self) -> bool {
        true
    }

    fn mask_margin(&self, transform: &CoordinateTransform) -> (f64, f64) {
        pixels_to_data(transform, self.max_size / 2.0)
    }

    fn render(&self, ctx: &mut dyn Context2d, indices: &[usize], visuals: &Visuals) {
        for &i in indices {
            let (Some(&sx), Some(&sy), Some(&size)) =
                (self.sx.get(i), self.sy.get(i), self.sizes.get(i))
            else {
                continue;
            };
            if !(is_finite(sx, sy) && size.is_finite()) {
                continue;
            }
            let (x, y, r) = (sx as f32, sy as f32, (size / 2.0) as f32);

            ctx.begin_path();
            match self.marker {
                MarkerType::FilledCircle | MarkerType::EmptyCircle => {
                    ctx.arc(x, y, r, 0.0, TAU as f32);
                }
                MarkerType::Square => ctx.rect(x - r, y - r, 2.0 * r, 2.0 * r),
                MarkerType::Triangle => polygon(ctx, x, y, &[r; 3], -FRAC_PI_2),
                MarkerType::Star => {
                    let radii: Vec<f32> = (0..10)
                        .map(|k| if k % 2 == 0 { r } else { 0.4 * r })
                        .collect();
                    polygon(ctx, x, y, &radii, -FRAC_PI_2);
                }
            }

            if self.marker != MarkerType::EmptyCircle
                && let Some(fill) = &visuals.fill
            {
                ctx.fill(fill);
            }
            if let Some(line) = &visuals.line {
                ctx.stroke(line);
            }
        }
    }

    fn hit_test(&self, geometry: &Geometry, hit: &HitContext<'_>) -> Selection<usize> {
        let indices = match geometry {
            Geometry::Point { sx, sy } => {
                let p = DVec2::new(*sx, *sy);
                candidates_near(hit, *sx, *sy, self.max_size / 2.0)
                    .into_iter()
                    .filter(|&i| self.contains(i, p))
                    .collect()
            }
            Geometry::Span { sx, sy, direction } => self.hit_span(*sx, *sy, *direction, hit),
            Geometry::Rect { sx0, sy0, sx1, sy1 } => {
                let query = hit.transform.invert_rect(*sx0, *sy0, *sx1, *sy1);
                let mut indices = hit.index.indices(&query);
                indices.sort_unstable();
                indices
            }
            Geometry::Poly { sx, sy } => {
                let bounds = sx
                    .iter()
                    .zip(sy)
                    .fold(Rect::EMPTY, |acc, (&x, &y)| acc.union(&Rect::point(x, y)));
                let query = hit
                    .transform
                    .invert_rect(bounds.x0, bounds.y0, bounds.x1, bounds.y1);
                let mut indices: Vec<usize> = hit
                    .index
                    .indices(&query)
                    .into_iter()
                    .filter(|&i| point_in_poly(self.sx[i], self.sy[i], sx, sy))
                    .collect();
                indices.sort_unstable();
                indices
            }
        };
        Selection::from_indices(indices)
    }
}

/// Closed polygon with evenly spaced vertices at the given radii from the center.
fn polygon(ctx: &mut dyn Context2d, x: f32, y: f32, radii: &[f32], start: f64) {
    let step = TAU / radii.len() as f64;
    for (k, &radius) in radii.iter().enumerate() {
        let angle = (start + step * k as f64) as f32;
        let (px, py) = (x + radius * angle.cos(), y + radius * angle.sin());
        if k == 0 {
            ctx.move_to(px, py);
        } else {
            ctx.line_to(px, py);
        }
    }
    ctx.close_path();
}
