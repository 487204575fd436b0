//! Data ranges and the arena that owns them.
//!
//! Scales and transforms never hold a range directly. They keep a [`RangeId`] and
//! look the range up in a [`Ranges`] arena, which versions every mutation and
//! notifies subscribers synchronously.
use core::fmt;

use crate::{
    factor_range::FactorRange,
    signal::{Connection, Signal},
};

/// A plain numeric interval. `start` may be greater than `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Signed length, `end - start`.
    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    pub fn min(&self) -> f64 {
        self.start.min(self.end)
    }

    pub fn max(&self) -> f64 {
        self.start.max(self.end)
    }

    pub fn is_reversed(&self) -> bool {
        self.start > self.end
    }

    pub fn is_finite(&self) -> bool {
        self.start.is_finite() && self.end.is_finite()
    }

    pub fn contains(&self, x: f64) -> bool {
        self.min() <= x && x <= self.max()
    }
}

/// How range padding is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddingUnits {
    /// Fraction of the span.
    #[default]
    Percent,
    /// Data units.
    Absolute,
}

/// Clamp policy applied when a [`Range1d`] is moved.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Bounds {
    #[default]
    Unbounded,
    /// Clamp to the extent the range was created with.
    Auto,
    Explicit {
        min: Option<f64>,
        max: Option<f64>,
    },
}

/// A user-configured numeric range.
#[derive(Debug, Clone, PartialEq)]
pub struct Range1d {
    start: f64,
    end: f64,
    bounds: Bounds,
    initial: Interval,
}

impl Range1d {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            bounds: Bounds::Unbounded,
            initial: Interval::new(start, end),
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        let (start, end) = self.clamp(self.start, self.end);
        self.start = start;
        self.end = end;
        self
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Move the range, respecting its bounds.
    pub fn set(&mut self, start: f64, end: f64) {
        let (start, end) = self.clamp(start, end);
        self.start = start;
        self.end = end;
    }

    /// Restore the extent given at construction.
    pub fn reset(&mut self) {
        self.start = self.initial.start;
        self.end = self.initial.end;
    }

    fn limits(&self) -> (Option<f64>, Option<f64>) {
        match self.bounds {
            Bounds::Unbounded => (None, None),
            Bounds::Auto => (Some(self.initial.min()), Some(self.initial.max())),
            Bounds::Explicit { min, max } => (min, max),
        }
    }

    /// Panning into a bound keeps the span; a span wider than the bounds is cut to them.
    fn clamp(&self, start: f64, end: f64) -> (f64, f64) {
        let (lo, hi) = self.limits();
        if lo.is_none() && hi.is_none() {
            return (start, end);
        }
        let reversed = start > end;
        let (mut min, mut max) = if reversed { (end, start) } else { (start, end) };
        let span = max - min;

        match (lo, hi) {
            (Some(lo), Some(hi)) if span > hi - lo => {
                min = lo;
                max = hi;
            }
            _ => {
                if let Some(lo) = lo
                    && min < lo
                {
                    min = lo;
                    max = lo + span;
                }
                if let Some(hi) = hi
                    && max > hi
                {
                    max = hi;
                    min = hi - span;
                }
            }
        }

        if reversed { (max, min) } else { (min, max) }
    }
}

/// Which end a following [`DataRange1d`] keeps pinned to the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Follow {
    Start,
    End,
}

/// Hint for the scale a [`DataRange1d`] will be displayed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleHint {
    #[default]
    Linear,
    Log,
}

/// A range fitted to the bounds of the data it displays.
///
/// Starts out invalid (`NaN` endpoints) until [`DataRange1d::update`] sees finite data.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRange1d {
    start: f64,
    end: f64,
    pub range_padding: f64,
    pub range_padding_units: PaddingUnits,
    /// Span used when the data collapses to a single value.
    pub default_span: f64,
    pub flipped: bool,
    pub follow: Option<Follow>,
    pub follow_interval: Option<f64>,
    pub scale_hint: ScaleHint,
    interactive: bool,
}

impl Default for DataRange1d {
    fn default() -> Self {
        Self {
            start: f64::NAN,
            end: f64::NAN,
            range_padding: 0.1,
            range_padding_units: PaddingUnits::Percent,
            default_span: 2.0,
            flipped: false,
            follow: None,
            follow_interval: None,
            scale_hint: ScaleHint::Linear,
            interactive: false,
        }
    }
}

impl DataRange1d {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range_padding(mut self, padding: f64, units: PaddingUnits) -> Self {
        self.range_padding = padding;
        self.range_padding_units = units;
        self
    }

    pub fn with_default_span(mut self, span: f64) -> Self {
        self.default_span = span;
        self
    }

    pub fn with_flipped(mut self, flipped: bool) -> Self {
        self.flipped = flipped;
        self
    }

    pub fn with_follow(mut self, follow: Follow, interval: f64) -> Self {
        self.follow = Some(follow);
        self.follow_interval = Some(interval);
        self
    }

    pub fn with_scale_hint(mut self, hint: ScaleHint) -> Self {
        self.scale_hint = hint;
        self
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    pub fn is_valid(&self) -> bool {
        self.interval().is_finite()
    }

    /// Whether the user has moved this range since the last reset.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Endpoints for data spanning `[min, max]`, after padding, flipping and following.
    pub fn compute_range(&self, min: f64, max: f64) -> (f64, f64) {
        let pad = self.range_padding;
        let (mut start, mut end) = match self.scale_hint {
            ScaleHint::Log => {
                let mut min = min;
                let mut max = max;
                if !min.is_finite() || min <= 0.0 {
                    min = if max.is_finite() && max > 0.0 {
                        max / 100.0
                    } else {
                        0.1
                    };
                }
                if !max.is_finite() || max <= 0.0 {
                    max = min * 100.0;
                }
                let (center, span) = if max == min {
                    (min.log10(), self.default_span + 0.001)
                } else {
                    let (log_min, log_max, span) = match self.range_padding_units {
                        PaddingUnits::Percent => {
                            let (lo, hi) = (min.log10(), max.log10());
                            (lo, hi, (hi - lo) * (1.0 + pad))
                        }
                        PaddingUnits::Absolute => {
                            let (lo, hi) = ((min - pad).log10(), (max + pad).log10());
                            (lo, hi, hi - lo)
                        }
                    };
                    ((log_min + log_max) / 2.0, span)
                };
                (
                    10f64.powf(center - span / 2.0),
                    10f64.powf(center + span / 2.0),
                )
            }
            ScaleHint::Linear => {
                let span = if max == min {
                    self.default_span
                } else {
                    match self.range_padding_units {
                        PaddingUnits::Percent => (max - min) * (1.0 + pad),
                        PaddingUnits::Absolute => (max - min) + 2.0 * pad,
                    }
                };
                let center = (max + min) / 2.0;
                (center - span / 2.0, center + span / 2.0)
            }
        };

        let mut sign = 1.0;
        if self.flipped {
            core::mem::swap(&mut start, &mut end);
            sign = -1.0;
        }

        if let Some(interval) = self.follow_interval
            && (start - end).abs() > interval
        {
            match self.follow {
                Some(Follow::Start) => end = start + sign * interval,
                Some(Follow::End) => start = end - sign * interval,
                None => {}
            }
        }

        (start, end)
    }

    /// Refit to the union of `extents`. Returns `true` if the endpoints changed.
    ///
    /// Non-finite extents are ignored, and a range the user has moved is left alone.
    pub fn update(&mut self, extents: impl IntoIterator<Item = Interval>) -> bool {
        if self.interactive {
            return false;
        }
        let (min, max) = extents
            .into_iter()
            .filter(Interval::is_finite)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| {
                (lo.min(e.min()), hi.max(e.max()))
            });
        if min > max {
            return false;
        }
        let (start, end) = self.compute_range(min, max);
        if !(start.is_finite() && end.is_finite()) || (start == self.start && end == self.end) {
            return false;
        }
        self.start = start;
        self.end = end;
        true
    }

    /// Move the range interactively. Auto-fitting stops until [`DataRange1d::reset`].
    pub fn set(&mut self, start: f64, end: f64) {
        self.start = start;
        self.end = end;
        self.interactive = true;
    }

    pub fn reset(&mut self) {
        self.interactive = false;
    }
}

/// Any range a scale can use as its source.
#[derive(Debug, Clone, PartialEq)]
pub enum Range {
    Numeric(Range1d),
    Data(DataRange1d),
    Factor(FactorRange),
}

impl From<Range1d> for Range {
    fn from(value: Range1d) -> Self {
        Self::Numeric(value)
    }
}

impl From<DataRange1d> for Range {
    fn from(value: DataRange1d) -> Self {
        Self::Data(value)
    }
}

impl From<FactorRange> for Range {
    fn from(value: FactorRange) -> Self {
        Self::Factor(value)
    }
}

impl Range {
    pub fn start(&self) -> f64 {
        self.interval().start
    }

    pub fn end(&self) -> f64 {
        self.interval().end
    }

    pub fn interval(&self) -> Interval {
        match self {
            Self::Numeric(r) => r.interval(),
            Self::Data(r) => r.interval(),
            Self::Factor(r) => r.interval(),
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::Factor(_))
    }

    pub fn as_factor(&self) -> Option<&FactorRange> {
        match self {
            Self::Factor(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_factor_mut(&mut self) -> Option<&mut FactorRange> {
        match self {
            Self::Factor(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_data_mut(&mut self) -> Option<&mut DataRange1d> {
        match self {
            Self::Data(r) => Some(r),
            _ => None,
        }
    }

    /// Move the range as a pan or zoom would.
    pub fn set_interval(&mut self, start: f64, end: f64) {
        match self {
            Self::Numeric(r) => r.set(start, end),
            Self::Data(r) => r.set(start, end),
            Self::Factor(r) => r.set_interval(start, end),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Self::Numeric(r) => r.reset(),
            Self::Data(r) => r.reset(),
            Self::Factor(r) => r.reset(),
        }
    }
}

/// Handle to a range stored in a [`Ranges`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeId(usize);

impl fmt::Display for RangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Range({})", self.0)
    }
}

#[derive(Debug)]
struct Slot {
    range: Range,
    version: u64,
    changed: Signal<RangeId>,
}

/// Arena of ranges addressed by [`RangeId`].
#[derive(Debug, Default)]
pub struct Ranges {
    slots: Vec<Slot>,
}

impl Ranges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, range: impl Into<Range>) -> RangeId {
        let id = RangeId(self.slots.len());
        self.slots.push(Slot {
            range: range.into(),
            version: 0,
            changed: Signal::new(),
        });
        id
    }

    pub fn get(&self, id: RangeId) -> Option<&Range> {
        self.slots.get(id.0).map(|slot| &slot.range)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RangeId, &Range)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (RangeId(i), &slot.range))
    }

    /// Mutate a range, bump its version and notify its subscribers.
    pub fn update<R>(&mut self, id: RangeId, f: impl FnOnce(&mut Range) -> R) -> Option<R> {
        let slot = self.slots.get_mut(id.0)?;
        let out = f(&mut slot.range);
        slot.version = slot.version.wrapping_add(1);
        slot.changed.emit(&id);
        Some(out)
    }

    pub fn set_interval(&mut self, id: RangeId, start: f64, end: f64) -> bool {
        self.update(id, |r| r.set_interval(start, end)).is_some()
    }

    pub fn reset(&mut self, id: RangeId) -> bool {
        self.update(id, Range::reset).is_some()
    }

    /// Change counter of a range, for cheap staleness checks.
    pub fn version(&self, id: RangeId) -> Option<u64> {
        self.slots.get(id.0).map(|slot| slot.version)
    }

    pub fn subscribe(
        &mut self,
        id: RangeId,
        listener: impl FnMut(&RangeId) + 'static,
    ) -> Option<Connection> {
        let slot = self.slots.get_mut(id.0)?;
        Some(slot.changed.connect(listener))
    }

    pub fn unsubscribe(&mut self, id: RangeId, connection: Connection) -> bool {
        self.slots
            .get_mut(id.0)
            .is_some_and(|slot| slot.changed.disconnect(connection))
    }
}
