//! Scales map a source range onto a pixel interval and back.
use core::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::{
    factor::{FactorError, FactorMapper, FactorValue},
    range::{Interval, Range, RangeId, Ranges},
};

/// A resolved one-dimensional mapping between data and screen space.
pub trait CoordinateMapper: fmt::Debug + Send + Sync {
    fn compute(&self, x: f64) -> f64;

    fn invert(&self, sx: f64) -> f64;

    /// Screen interval this mapper projects onto.
    fn target(&self) -> Interval;

    fn v_compute_into(&self, xs: &[f64], out: &mut Vec<f64>) {
        out.clear();
        out.extend(xs.iter().map(|&x| self.compute(x)));
    }

    fn v_invert_into(&self, sxs: &[f64], out: &mut Vec<f64>) {
        out.clear();
        out.extend(sxs.iter().map(|&sx| self.invert(sx)));
    }

    fn v_compute(&self, xs: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(xs.len());
        self.v_compute_into(xs, &mut out);
        out
    }

    fn v_invert(&self, sxs: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(sxs.len());
        self.v_invert_into(sxs, &mut out);
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearMapper {
    factor: f64,
    offset: f64,
    target: Interval,
}

impl LinearMapper {
    /// A degenerate source yields `NaN` coefficients.
    pub fn new(source: Interval, target: Interval) -> Self {
        let factor = target.span() / source.span();
        Self {
            factor,
            offset: target.start - factor * source.start,
            target,
        }
    }

    pub fn coefficients(&self) -> (f64, f64) {
        (self.factor, self.offset)
    }
}

impl CoordinateMapper for LinearMapper {
    fn compute(&self, x: f64) -> f64 {
        self.factor * x + self.offset
    }

    fn invert(&self, sx: f64) -> f64 {
        (sx - self.offset) / self.factor
    }

    fn target(&self) -> Interval {
        self.target
    }

    fn v_compute_into(&self, xs: &[f64], out: &mut Vec<f64>) {
        let (factor, offset) = (self.factor, self.offset);
        out.clear();
        out.extend(xs.iter().map(|&x| factor * x + offset));
    }
}

/// Natural-log mapping. Values at or below zero map to `NaN`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogMapper {
    inter_factor: f64,
    inter_offset: f64,
    target: Interval,
}

impl LogMapper {
    pub fn new(source: Interval, target: Interval) -> Self {
        let (start, end) = safe_log_interval(source.start, source.end);
        let (inter_factor, inter_offset) = if start == 0.0 {
            (end.ln(), 0.0)
        } else {
            (end.ln() - start.ln(), start.ln())
        };
        Self {
            inter_factor,
            inter_offset,
            target,
        }
    }
}

/// Clamp a source interval to something a log scale can span.
fn safe_log_interval(start: f64, end: f64) -> (f64, f64) {
    let start = start.max(0.0);
    let end = end.max(0.0);
    if start != end {
        return (start, end);
    }
    if start == 0.0 {
        return (1.0, 10.0);
    }
    let decade = start.log10();
    let (lo, hi) = (decade.floor(), decade.ceil());
    let hi = if hi == lo { hi + 1.0 } else { hi };
    (10f64.powf(lo), 10f64.powf(hi))
}

impl CoordinateMapper for LogMapper {
    fn compute(&self, x: f64) -> f64 {
        if self.inter_factor == 0.0 {
            return 0.0;
        }
        let t = (x.ln() - self.inter_offset) / self.inter_factor;
        if t.is_finite() {
            t * self.target.span() + self.target.start
        } else {
            f64::NAN
        }
    }

    fn invert(&self, sx: f64) -> f64 {
        let t = (sx - self.target.start) / self.target.span();
        (self.inter_factor * t + self.inter_offset).exp()
    }

    fn target(&self) -> Interval {
        self.target
    }
}

/// Maps factors to synthetic positions, then synthetic positions linearly to pixels.
#[derive(Debug, Clone)]
pub struct CategoricalMapper {
    linear: LinearMapper,
    factors: Arc<FactorMapper>,
}

impl CategoricalMapper {
    pub fn new(source: Interval, target: Interval, factors: Arc<FactorMapper>) -> Self {
        Self {
            linear: LinearMapper::new(source, target),
            factors,
        }
    }

    pub fn compute_factor(&self, value: &FactorValue) -> Result<f64, FactorError> {
        Ok(self.linear.compute(self.factors.map(value)?))
    }

    pub fn v_compute_factors(&self, values: &[FactorValue]) -> Result<Vec<f64>, FactorError> {
        values.iter().map(|v| self.compute_factor(v)).collect()
    }

    pub fn factors(&self) -> &FactorMapper {
        &self.factors
    }
}

impl CoordinateMapper for CategoricalMapper {
    fn compute(&self, x: f64) -> f64 {
        self.linear.compute(x)
    }

    fn invert(&self, sx: f64) -> f64 {
        self.linear.invert(sx)
    }

    fn target(&self) -> Interval {
        self.linear.target
    }
}

/// `outer ∘ inner`: data goes through `inner` first.
#[derive(Debug, Clone)]
pub struct CompositeMapper {
    inner: Arc<dyn CoordinateMapper>,
    outer: Arc<dyn CoordinateMapper>,
}

impl CompositeMapper {
    pub fn new(inner: Arc<dyn CoordinateMapper>, outer: Arc<dyn CoordinateMapper>) -> Self {
        Self { inner, outer }
    }
}

impl CoordinateMapper for CompositeMapper {
    fn compute(&self, x: f64) -> f64 {
        self.outer.compute(self.inner.compute(x))
    }

    fn invert(&self, sx: f64) -> f64 {
        self.inner.invert(self.outer.invert(sx))
    }

    fn target(&self) -> Interval {
        self.outer.target()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScaleKind {
    #[default]
    Linear,
    Log,
    Categorical,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScaleError {
    #[error("unknown range {0}")]
    MissingRange(RangeId),
    #[error("{range} is categorical but is paired with a {kind:?} scale")]
    CategoricalRange { range: RangeId, kind: ScaleKind },
    #[error("categorical scale needs a factor range, {0} is numeric")]
    NotCategorical(RangeId),
    #[error("{0} is categorical and cannot be a sub-coordinate target")]
    CategoricalTarget(RangeId),
}

/// A scale configuration: which range it reads and where it projects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub kind: ScaleKind,
    pub source: RangeId,
    pub target: Interval,
}

impl Scale {
    pub fn new(kind: ScaleKind, source: RangeId, target: Interval) -> Self {
        Self {
            kind,
            source,
            target,
        }
    }

    pub fn linear(source: RangeId, target: Interval) -> Self {
        Self::new(ScaleKind::Linear, source, target)
    }

    pub fn log(source: RangeId, target: Interval) -> Self {
        Self::new(ScaleKind::Log, source, target)
    }

    pub fn categorical(source: RangeId, target: Interval) -> Self {
        Self::new(ScaleKind::Categorical, source, target)
    }

    pub fn with_source(mut self, source: RangeId) -> Self {
        self.source = source;
        self
    }

    pub fn with_target(mut self, target: Interval) -> Self {
        self.target = target;
        self
    }

    /// Snapshot the current state of the source range into a mapper.
    pub fn resolve(&self, ranges: &Ranges) -> Result<Arc<dyn CoordinateMapper>, ScaleError> {
        let range = ranges
            .get(self.source)
            .ok_or(ScaleError::MissingRange(self.source))?;
        let source = range.interval();
        match (self.kind, range) {
            (ScaleKind::Categorical, Range::Factor(factors)) => Ok(Arc::new(
                CategoricalMapper::new(source, self.target, factors.mapper().clone()),
            )),
            (ScaleKind::Categorical, _) => Err(ScaleError::NotCategorical(self.source)),
            (kind, Range::Factor(_)) => Err(ScaleError::CategoricalRange {
                range: self.source,
                kind,
            }),
            (ScaleKind::Linear, _) => Ok(Arc::new(LinearMapper::new(source, self.target))),
            (ScaleKind::Log, _) => Ok(Arc::new(LogMapper::new(source, self.target))),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand_distr::{Distribution, Uniform};

    use super::*;
    use crate::{factor_range::FactorRange, range::Range1d};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn linear_round_trip() {
        let m = LinearMapper::new(Interval::new(-5.0, 20.0), Interval::new(0.0, 640.0));
        let mut rng = rand::rng();
        let dist = Uniform::new(-5.0, 20.0).expect("uniform");
        for _ in 0..200 {
            let x: f64 = dist.sample(&mut rng);
            assert!(close(m.invert(m.compute(x)), x));
        }
        assert_eq!(m.compute(-5.0), 0.0);
        assert_eq!(m.compute(20.0), 640.0);
    }

    #[test]
    fn linear_degenerate_source_is_nan() {
        let m = LinearMapper::new(Interval::new(1.0, 1.0), Interval::new(0.0, 100.0));
        assert!(m.compute(1.0).is_nan());
    }

    fn bits(values: &[f64]) -> Vec<u64> {
        values.iter().map(|v| v.to_bits()).collect()
    }

    /// Vectorized forms agree bit for bit with the scalar ones, and `_into` drops stale entries.
    fn assert_vectorized(m: &dyn CoordinateMapper, xs: &[f64], sxs: &[f64]) {
        let computed = m.v_compute(xs);
        let expected: Vec<f64> = xs.iter().map(|&x| m.compute(x)).collect();
        assert_eq!(bits(&computed), bits(&expected), "{m:?} compute");

        let inverted = m.v_invert(sxs);
        let expected: Vec<f64> = sxs.iter().map(|&sx| m.invert(sx)).collect();
        assert_eq!(bits(&inverted), bits(&expected), "{m:?} invert");

        let mut reused = vec![1.0; 3];
        m.v_compute_into(xs, &mut reused);
        assert_eq!(bits(&reused), bits(&computed));
        m.v_invert_into(sxs, &mut reused);
        assert_eq!(bits(&reused), bits(&inverted));
    }

    #[test]
    fn vectorized_matches_scalar() {
        let mut rng = rand::rng();
        let data = Uniform::new(-10.0, 2000.0).expect("uniform");
        let screen = Uniform::new(-200.0, 600.0).expect("uniform");
        let mut xs: Vec<f64> = (0..100).map(|_| data.sample(&mut rng)).collect();
        let mut sxs: Vec<f64> = (0..100).map(|_| screen.sample(&mut rng)).collect();
        xs.extend([f64::NAN, f64::INFINITY, -1e12, 0.0]);
        sxs.extend([f64::NAN, f64::NEG_INFINITY, -1e12, 1e12]);

        let linear = LinearMapper::new(Interval::new(0.0, 100.0), Interval::new(0.0, 400.0));
        assert_vectorized(&linear, &xs, &sxs);

        let log = LogMapper::new(Interval::new(1.0, 1000.0), Interval::new(400.0, 0.0));
        assert_vectorized(&log, &xs, &sxs);

        let factors = FactorRange::new(["a", "b", "c", "d"]).expect("range");
        let categorical: Arc<dyn CoordinateMapper> = Arc::new(CategoricalMapper::new(
            factors.interval(),
            Interval::new(0.0, 1.0),
            factors.mapper().clone(),
        ));
        assert_vectorized(categorical.as_ref(), &xs, &sxs);

        let outer: Arc<dyn CoordinateMapper> =
            Arc::new(LinearMapper::new(Interval::new(0.0, 1.0), Interval::new(50.0, 450.0)));
        let composite = CompositeMapper::new(categorical, outer);
        assert_vectorized(&composite, &xs, &sxs);
    }

    #[test]
    fn log_mapping_and_round_trip() {
        let m = LogMapper::new(Interval::new(1.0, 100.0), Interval::new(0.0, 200.0));
        assert!(close(m.compute(10.0), 100.0));
        assert!(close(m.invert(100.0), 10.0));
        assert!(m.compute(0.0).is_nan());
        assert!(m.compute(-1.0).is_nan());
        assert_eq!(m.invert(-1e9), 0.0);

        let mut rng = rand::rng();
        let dist = Uniform::new(1e-3, 1e6).expect("uniform");
        for _ in 0..200 {
            let x: f64 = dist.sample(&mut rng);
            assert!(close(m.invert(m.compute(x)), x));
            assert!(m.invert(m.compute(x)) > 0.0);
        }
    }

    #[test]
    fn log_safe_intervals() {
        assert_eq!(safe_log_interval(0.0, 0.0), (1.0, 10.0));
        assert_eq!(safe_log_interval(-3.0, -3.0), (1.0, 10.0));
        assert_eq!(safe_log_interval(5.0, 5.0), (1.0, 10.0));
        assert_eq!(safe_log_interval(100.0, 100.0), (100.0, 1000.0));
        assert_eq!(safe_log_interval(-1.0, 50.0), (0.0, 50.0));

        let from_zero = LogMapper::new(Interval::new(0.0, 100.0), Interval::new(0.0, 200.0));
        assert!(close(from_zero.compute(1.0), 0.0));
        assert!(close(from_zero.compute(100.0), 200.0));
    }

    #[test]
    fn categorical_goes_through_synthetic_space() {
        let mut ranges = Ranges::new();
        let factors = FactorRange::new(["a", "b", "c", "d"]).expect("range");
        let id = ranges.insert(factors);
        let scale = Scale::categorical(id, Interval::new(0.0, 400.0));
        let m = scale.resolve(&ranges).expect("categorical");
        assert!(close(m.compute(0.5), 50.0));
        assert!(close(m.invert(350.0), 3.5));

        let Some(Range::Factor(range)) = ranges.get(id) else {
            panic!("factor range")
        };
        let categorical = CategoricalMapper::new(
            range.interval(),
            Interval::new(0.0, 400.0),
            range.mapper().clone(),
        );
        assert!(close(
            categorical.compute_factor(&"c".into()).expect("known"),
            250.0
        ));
        assert!(categorical
            .compute_factor(&"zzz".into())
            .expect("unknown is not an error")
            .is_nan());
    }

    #[test]
    fn composite_is_literal_composition() {
        let inner: Arc<dyn CoordinateMapper> =
            Arc::new(LinearMapper::new(Interval::new(0.0, 1.0), Interval::new(10.0, 20.0)));
        let outer: Arc<dyn CoordinateMapper> =
            Arc::new(LinearMapper::new(Interval::new(0.0, 100.0), Interval::new(0.0, 500.0)));
        let composite = CompositeMapper::new(inner.clone(), outer.clone());
        for x in [0.0, 0.25, 1.0, 3.0] {
            assert!(close(composite.compute(x), outer.compute(inner.compute(x))));
            assert!(close(composite.invert(composite.compute(x)), x));
        }
        assert_eq!(composite.target(), Interval::new(0.0, 500.0));
    }

    #[test]
    fn resolve_rejects_bad_pairings() {
        let mut ranges = Ranges::new();
        let numeric = ranges.insert(Range1d::new(0.0, 1.0));
        let factors = ranges.insert(FactorRange::new(["a"]).expect("range"));
        let target = Interval::new(0.0, 1.0);

        assert_eq!(
            Scale::categorical(numeric, target).resolve(&ranges).unwrap_err(),
            ScaleError::NotCategorical(numeric)
        );
        assert_eq!(
            Scale::log(factors, target).resolve(&ranges).unwrap_err(),
            ScaleError::CategoricalRange {
                range: factors,
                kind: ScaleKind::Log
            }
        );

        let mut other = Ranges::new();
        other.insert(Range1d::new(0.0, 1.0));
        let missing = other.insert(Range1d::new(0.0, 1.0));
        assert_eq!(
            Scale::linear(missing, target).resolve(&ranges).unwrap_err(),
            ScaleError::MissingRange(missing)
        );
    }
}
