//! Pointer gestures turned into hit geometry and range updates.
use std::time::Duration;

use iced::time::Instant;

use crate::{
    geometry::{Direction, Geometry},
    range::Interval,
    scale::CoordinateMapper,
    transform::Frame,
};

/// Tracks the last interactive gesture, for level-of-detail painting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InteractionClock {
    started: Option<Instant>,
}

impl InteractionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an interactive gesture at `now`.
    pub fn start(&mut self, now: Instant) {
        self.started = Some(now);
    }

    pub fn stop(&mut self) {
        self.started = None;
    }

    pub fn is_active(&self) -> bool {
        self.started.is_some()
    }

    /// Time since the last gesture, while it is below `interval`.
    ///
    /// Once `interval` has passed the clock stops and this returns `None`.
    pub fn duration(&mut self, now: Instant, interval: Duration) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.started?);
        if elapsed < interval {
            Some(elapsed)
        } else {
            self.stop();
            None
        }
    }
}

/// Which axes a gesture acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dimensions {
    #[default]
    Both,
    /// Along x only. The other axis spans the whole frame.
    Width,
    /// Along y only.
    Height,
}

/// Rubber-band selection between a drag's start and current position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxSelect {
    pub dimensions: Dimensions,
    anchor: Option<(f64, f64)>,
    current: Option<(f64, f64)>,
}

impl BoxSelect {
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            ..Self::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn begin(&mut self, sx: f64, sy: f64) {
        self.anchor = Some((sx, sy));
        self.current = Some((sx, sy));
    }

    /// Move the free corner and return the box so far.
    pub fn update(&mut self, sx: f64, sy: f64, frame: &Frame) -> Option<Geometry> {
        self.anchor?;
        self.current = Some((sx, sy));
        self.geometry(frame)
    }

    /// Finish the gesture and return the final box.
    pub fn end(&mut self, frame: &Frame) -> Option<Geometry> {
        let geometry = self.geometry(frame);
        self.anchor = None;
        self.current = None;
        geometry
    }

    pub fn geometry(&self, frame: &Frame) -> Option<Geometry> {
        let ((x0, y0), (x1, y1)) = (self.anchor?, self.current?);
        let b = frame.bounds;
        let (left, right) = (b.x as f64, (b.x + b.width) as f64);
        let (top, bottom) = (b.y as f64, (b.y + b.height) as f64);
        let (sx0, sx1, sy0, sy1) = match self.dimensions {
            Dimensions::Both => (x0, x1, y0, y1),
            Dimensions::Width => (x0, x1, top, bottom),
            Dimensions::Height => (left, right, y0, y1),
        };
        Some(Geometry::Rect {
            sx0: sx0.min(sx1),
            sy0: sy0.min(sy1),
            sx1: sx0.max(sx1),
            sy1: sy0.max(sy1),
        })
    }
}

/// Free-hand polygon selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LassoSelect {
    sx: Vec<f64>,
    sy: Vec<f64>,
    active: bool,
}

impl LassoSelect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn begin(&mut self, sx: f64, sy: f64) {
        self.sx.clear();
        self.sy.clear();
        self.active = true;
        self.push(sx, sy);
    }

    /// Add a vertex and return the polygon so far.
    pub fn push(&mut self, sx: f64, sy: f64) -> Option<Geometry> {
        if !self.active {
            return None;
        }
        if self.sx.last() != Some(&sx) || self.sy.last() != Some(&sy) {
            self.sx.push(sx);
            self.sy.push(sy);
        }
        self.geometry()
    }

    pub fn end(&mut self) -> Option<Geometry> {
        let geometry = self.geometry();
        self.active = false;
        self.sx.clear();
        self.sy.clear();
        geometry
    }

    /// The polygon, once it has at least three vertices.
    pub fn geometry(&self) -> Option<Geometry> {
        (self.sx.len() >= 3).then(|| Geometry::Poly {
            sx: self.sx.clone(),
            sy: self.sy.clone(),
        })
    }
}

pub fn tap(sx: f64, sy: f64) -> Geometry {
    Geometry::Point { sx, sy }
}

/// What a hover inspects around the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoverMode {
    /// Under the pointer.
    #[default]
    Mouse,
    /// Along a vertical rule through the pointer.
    VLine,
    /// Along a horizontal rule through the pointer.
    HLine,
}

pub fn hover_geometry(mode: HoverMode, sx: f64, sy: f64) -> Geometry {
    match mode {
        HoverMode::Mouse => Geometry::Point { sx, sy },
        HoverMode::VLine => Geometry::Span {
            sx,
            sy,
            direction: Direction::H,
        },
        HoverMode::HLine => Geometry::Span {
            sx,
            sy,
            direction: Direction::V,
        },
    }
}

/// The interval after dragging its screen image by `delta` pixels.
pub fn pan_interval(interval: Interval, mapper: &dyn CoordinateMapper, delta: f64) -> Interval {
    Interval::new(
        mapper.invert(mapper.compute(interval.start) - delta),
        mapper.invert(mapper.compute(interval.end) - delta),
    )
}

/// The interval after scaling its screen image by `factor` about `anchor` pixels.
///
/// A factor below 1 zooms in.
pub fn zoom_interval(
    interval: Interval,
    mapper: &dyn CoordinateMapper,
    factor: f64,
    anchor: f64,
) -> Interval {
    let scaled = |v: f64| mapper.invert(anchor + (mapper.compute(v) - anchor) * factor);
    Interval::new(scaled(interval.start), scaled(interval.end))
}

#[cfg(test)]
mod tests {
    use iced::{Point, Rectangle, Size};

    use super::*;
    use crate::scale::{LinearMapper, LogMapper};

    #[test]
    fn clock_reports_recent_gestures_only() {
        let t0 = Instant::now();
        let interval = Duration::from_millis(300);
        let mut clock = InteractionClock::new();
        assert_eq!(clock.duration(t0, interval), None);

        clock.start(t0);
        assert_eq!(
            clock.duration(t0 + Duration::from_millis(100), interval),
            Some(Duration::from_millis(100))
        );
        assert!(clock.is_active());
        assert_eq!(clock.duration(t0 + Duration::from_millis(300), interval), None);
        assert!(!clock.is_active());
    }

    #[test]
    fn box_select_spans_frame_for_one_dimension() {
        let frame = Frame::new(Rectangle::new(Point::new(10.0, 20.0), Size::new(100.0, 50.0)));
        let mut tool = BoxSelect::new(Dimensions::Width);
        assert!(tool.update(5.0, 5.0, &frame).is_none());

        tool.begin(60.0, 40.0);
        let geometry = tool.update(30.0, 45.0, &frame);
        assert_eq!(
            geometry,
            Some(Geometry::Rect {
                sx0: 30.0,
                sy0: 20.0,
                sx1: 60.0,
                sy1: 70.0
            })
        );
        assert_eq!(tool.end(&frame), geometry);
        assert!(!tool.is_active());
    }

    #[test]
    fn lasso_needs_three_vertices() {
        let mut lasso = LassoSelect::new();
        assert!(lasso.push(0.0, 0.0).is_none());
        lasso.begin(0.0, 0.0);
        assert!(lasso.push(10.0, 0.0).is_none());
        assert!(lasso.push(10.0, 0.0).is_none());
        let Some(Geometry::Poly { sx, .. }) = lasso.push(10.0, 10.0) else {
            panic!("expected a polygon");
        };
        assert_eq!(sx, vec![0.0, 10.0, 10.0]);
        assert!(lasso.end().is_some());
        assert!(lasso.geometry().is_none());
    }

    #[test]
    fn hover_modes_map_to_spans() {
        assert_eq!(hover_geometry(HoverMode::Mouse, 1.0, 2.0), tap(1.0, 2.0));
        assert!(matches!(
            hover_geometry(HoverMode::VLine, 1.0, 2.0),
            Geometry::Span {
                direction: Direction::H,
                ..
            }
        ));
    }

    #[test]
    fn pan_and_zoom_act_in_screen_space() {
        let linear = LinearMapper::new(Interval::new(0.0, 10.0), Interval::new(0.0, 100.0));
        let panned = pan_interval(Interval::new(0.0, 10.0), &linear, 20.0);
        assert!((panned.start + 2.0).abs() < 1e-9 && (panned.end - 8.0).abs() < 1e-9);

        let zoomed = zoom_interval(Interval::new(0.0, 10.0), &linear, 0.5, 100.0);
        assert!((zoomed.start - 5.0).abs() < 1e-9 && (zoomed.end - 10.0).abs() < 1e-9);

        // Log panning shifts by whole decades per decade of pixels.
        let log = LogMapper::new(Interval::new(1.0, 1000.0), Interval::new(0.0, 300.0));
        let panned = pan_interval(Interval::new(1.0, 1000.0), &log, -100.0);
        assert!((panned.start - 10.0).abs() < 1e-6 && (panned.end - 10000.0).abs() < 1e-3);
    }
}
