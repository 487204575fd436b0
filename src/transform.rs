//! Paired x/y scales and the transforms they resolve to.
use std::sync::Arc;

use iced::Rectangle;

use crate::{
    bbox::Rect,
    range::{Interval, RangeId, Ranges},
    scale::{CompositeMapper, CoordinateMapper, Scale, ScaleError, ScaleKind},
};

/// The plot area in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub bounds: Rectangle,
}

impl Frame {
    pub fn new(bounds: Rectangle) -> Self {
        Self { bounds }
    }

    /// Left to right.
    pub fn x_target(&self) -> Interval {
        let b = self.bounds;
        Interval::new(b.x as f64, (b.x + b.width) as f64)
    }

    /// Bottom to top, so larger data values sit higher on screen.
    pub fn y_target(&self) -> Interval {
        let b = self.bounds;
        Interval::new((b.y + b.height) as f64, b.y as f64)
    }
}

/// An x and a y scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateSystem {
    pub x_scale: Scale,
    pub y_scale: Scale,
}

impl CoordinateSystem {
    pub fn new(x_scale: Scale, y_scale: Scale) -> Self {
        Self { x_scale, y_scale }
    }

    /// Scales of the given kinds over `x_range` and `y_range`, targeting `frame`.
    pub fn for_frame(
        frame: &Frame,
        x_range: RangeId,
        x_kind: ScaleKind,
        y_range: RangeId,
        y_kind: ScaleKind,
    ) -> Self {
        Self {
            x_scale: Scale::new(x_kind, x_range, frame.x_target()),
            y_scale: Scale::new(y_kind, y_range, frame.y_target()),
        }
    }

    pub fn with_frame(self, frame: &Frame) -> Self {
        Self {
            x_scale: self.x_scale.with_target(frame.x_target()),
            y_scale: self.y_scale.with_target(frame.y_target()),
        }
    }

    pub fn resolve(&self, ranges: &Ranges) -> Result<CoordinateTransform, ScaleError> {
        Ok(CoordinateTransform {
            x: self.x_scale.resolve(ranges)?,
            y: self.y_scale.resolve(ranges)?,
        })
    }
}

/// Resolved mappers for both axes.
#[derive(Debug, Clone)]
pub struct CoordinateTransform {
    pub x: Arc<dyn CoordinateMapper>,
    pub y: Arc<dyn CoordinateMapper>,
}

impl CoordinateTransform {
    pub fn new(x: Arc<dyn CoordinateMapper>, y: Arc<dyn CoordinateMapper>) -> Self {
        Self { x, y }
    }

    pub fn compute(&self, x: f64, y: f64) -> (f64, f64) {
        (self.x.compute(x), self.y.compute(y))
    }

    pub fn invert(&self, sx: f64, sy: f64) -> (f64, f64) {
        (self.x.invert(sx), self.y.invert(sy))
    }

    pub fn map_to_screen(&self, xs: &[f64], ys: &[f64]) -> (Vec<f64>, Vec<f64>) {
        (self.x.v_compute(xs), self.y.v_compute(ys))
    }

    pub fn map_to_screen_into(
        &self,
        xs: &[f64],
        ys: &[f64],
        sxs: &mut Vec<f64>,
        sys: &mut Vec<f64>,
    ) {
        self.x.v_compute_into(xs, sxs);
        self.y.v_compute_into(ys, sys);
    }

    pub fn map_from_screen(&self, sxs: &[f64], sys: &[f64]) -> (Vec<f64>, Vec<f64>) {
        (self.x.v_invert(sxs), self.y.v_invert(sys))
    }

    /// Project through `outer` after this transform.
    pub fn compose(&self, outer: &CoordinateTransform) -> CoordinateTransform {
        CoordinateTransform {
            x: Arc::new(CompositeMapper::new(self.x.clone(), outer.x.clone())),
            y: Arc::new(CompositeMapper::new(self.y.clone(), outer.y.clone())),
        }
    }

    /// Data-space box of the screen rectangle spanned by the two corners.
    pub fn invert_rect(&self, sx0: f64, sy0: f64, sx1: f64, sy1: f64) -> Rect {
        let (x0, y0) = self.invert(sx0, sy0);
        let (x1, y1) = self.invert(sx1, sy1);
        Rect::new(x0, y0, x1, y1)
    }

    /// Data-space extent of the screen targets.
    pub fn data_viewport(&self) -> Rect {
        let (xt, yt) = (self.x.target(), self.y.target());
        self.invert_rect(xt.start, yt.start, xt.end, yt.end)
    }
}

/// A sub-coordinate system: data in the `*_source` ranges is mapped onto the
/// `*_target` ranges of the parent's data space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapping {
    pub x_source: RangeId,
    pub x_kind: ScaleKind,
    pub x_target: RangeId,
    pub y_source: RangeId,
    pub y_kind: ScaleKind,
    pub y_target: RangeId,
}

impl CoordinateMapping {
    pub fn ranges(&self) -> [RangeId; 4] {
        [self.x_source, self.x_target, self.y_source, self.y_target]
    }

    /// The transform from sub-coordinate data space to the parent's screen space.
    pub fn resolve(
        &self,
        ranges: &Ranges,
        parent: &CoordinateTransform,
    ) -> Result<CoordinateTransform, ScaleError> {
        let x = Scale::new(self.x_kind, self.x_source, target(ranges, self.x_target)?);
        let y = Scale::new(self.y_kind, self.y_source, target(ranges, self.y_target)?);
        Ok(CoordinateSystem::new(x, y).resolve(ranges)?.compose(parent))
    }
}

fn target(ranges: &Ranges, id: RangeId) -> Result<Interval, ScaleError> {
    let range = ranges.get(id).ok_or(ScaleError::MissingRange(id))?;
    if range.is_categorical() {
        return Err(ScaleError::CategoricalTarget(id));
    }
    Ok(range.interval())
}
