//! Categorical ranges.
use std::sync::Arc;

use crate::{
    factor::{Factor, FactorError, FactorMapper, FactorPadding, FactorValue},
    range::{Interval, PaddingUnits},
};

/// Layout and outer padding of a [`FactorRange`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FactorRangeConfig {
    pub padding: FactorPadding,
    /// Extra space added outside the first and last factor.
    pub range_padding: f64,
    pub range_padding_units: PaddingUnits,
}

impl FactorRangeConfig {
    pub fn with_factor_padding(mut self, padding: f64) -> Self {
        self.padding.factor = padding;
        self
    }

    pub fn with_group_padding(mut self, padding: f64) -> Self {
        self.padding.group = padding;
        self
    }

    pub fn with_subgroup_padding(mut self, padding: f64) -> Self {
        self.padding.subgroup = padding;
        self
    }

    pub fn with_range_padding(mut self, padding: f64, units: PaddingUnits) -> Self {
        self.range_padding = padding;
        self.range_padding_units = units;
        self
    }
}

/// An ordered set of factors laid out on a synthetic numeric axis.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorRange {
    factors: Vec<Factor>,
    config: FactorRangeConfig,
    mapper: Arc<FactorMapper>,
    computed: Interval,
    start: f64,
    end: f64,
}

impl FactorRange {
    pub fn new<I, F>(factors: I) -> Result<Self, FactorError>
    where
        I: IntoIterator<Item = F>,
        F: Into<Factor>,
    {
        Self::with_config(factors, FactorRangeConfig::default())
    }

    pub fn with_config<I, F>(factors: I, config: FactorRangeConfig) -> Result<Self, FactorError>
    where
        I: IntoIterator<Item = F>,
        F: Into<Factor>,
    {
        let factors: Vec<Factor> = factors.into_iter().map(Into::into).collect();
        let mapper = FactorMapper::new(&factors, config.padding)?;
        let computed = padded_extent(&mapper, &config);
        Ok(Self {
            factors,
            config,
            mapper: Arc::new(mapper),
            computed,
            start: computed.start,
            end: computed.end,
        })
    }

    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    pub fn config(&self) -> &FactorRangeConfig {
        &self.config
    }

    /// Shared mapper, handed out to categorical scales.
    pub fn mapper(&self) -> &Arc<FactorMapper> {
        &self.mapper
    }

    /// Replace the factors. On error the range is left untouched.
    pub fn set_factors<I, F>(&mut self, factors: I) -> Result<(), FactorError>
    where
        I: IntoIterator<Item = F>,
        F: Into<Factor>,
    {
        *self = Self::with_config(factors, self.config)?;
        Ok(())
    }

    pub fn set_config(&mut self, config: FactorRangeConfig) -> Result<(), FactorError> {
        *self = Self::with_config(self.factors.clone(), config)?;
        Ok(())
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

    /// Extent derived from the factors and padding, ignoring interaction.
    pub fn computed_interval(&self) -> Interval {
        self.computed
    }

    pub fn set_interval(&mut self, start: f64, end: f64) {
        self.start = start;
        self.end = end;
    }

    pub fn reset(&mut self) {
        self.start = self.computed.start;
        self.end = self.computed.end;
    }

    /// Synthetic coordinate of a factor value.
    pub fn synthetic(&self, value: &FactorValue) -> Result<f64, FactorError> {
        self.mapper.map(value)
    }

    pub fn v_synthetic(&self, values: &[FactorValue]) -> Result<Vec<f64>, FactorError> {
        self.mapper.v_map(values)
    }

    /// Leaf factor under synthetic coordinate `x`.
    pub fn factor(&self, x: f64) -> Option<&Factor> {
        self.mapper.leaf_at(x)
    }

    pub fn tops(&self) -> Option<&[String]> {
        self.mapper.tops()
    }

    pub fn mids(&self) -> Option<&[(String, String)]> {
        self.mapper.mids()
    }
}

fn padded_extent(mapper: &FactorMapper, config: &FactorRangeConfig) -> Interval {
    let end = mapper.leaf_count() as f64 + mapper.inner_padding();
    let half = match config.range_padding_units {
        PaddingUnits::Percent => end * config.range_padding / 2.0,
        PaddingUnits::Absolute => config.range_padding,
    };
    Interval::new(-half, end + half)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn extent_covers_leaves_and_padding() {
        let r = FactorRange::new(["a", "b", "c", "d"]).expect("range");
        assert_eq!(r.interval(), Interval::new(0.0, 4.0));

        let config = FactorRangeConfig::default().with_range_padding(0.1, PaddingUnits::Percent);
        let r = FactorRange::with_config(["a", "b", "c", "d"], config).expect("range");
        assert!(close(r.start(), -0.2));
        assert!(close(r.end(), 4.2));

        let config = FactorRangeConfig::default().with_range_padding(1.0, PaddingUnits::Absolute);
        let r = FactorRange::with_config(["a", "b", "c", "d"], config).expect("range");
        assert_eq!(r.interval(), Interval::new(-1.0, 5.0));
    }

    #[test]
    fn two_level_extent_includes_inner_padding() {
        let config = FactorRangeConfig::default()
            .with_factor_padding(0.1)
            .with_group_padding(0.0);
        let r = FactorRange::with_config([("A", "1"), ("A", "2"), ("C", "1")], config)
            .expect("range");
        assert!(close(r.end(), 3.1));
        assert_eq!(r.tops(), Some(&["A".to_owned(), "C".to_owned()][..]));
        assert!(r.mids().is_none());
    }

    #[test]
    fn synthetic_lookup_and_inverse() {
        let r = FactorRange::new([("g1", "a"), ("g1", "b"), ("g2", "a")]).expect("range");
        let values = vec![
            FactorValue::from(("g1", "b")),
            FactorValue::from("g1").with_offset(-0.25),
            FactorValue::from(("g3", "x")),
            FactorValue::from(7.0),
        ];
        let xs = r.v_synthetic(&values).expect("synthetic");
        assert!(close(xs[0], 1.5));
        assert!(close(xs[1], 0.75));
        assert!(xs[2].is_nan());
        assert_eq!(xs[3], 7.0);

        for (value, x) in values.iter().zip(&xs) {
            let scalar = r.synthetic(value).expect("synthetic");
            assert!(scalar.to_bits() == x.to_bits());
        }

        assert_eq!(r.factor(1.2), Some(&Factor::from(("g1", "b"))));
        assert_eq!(r.factor(3.9), Some(&Factor::from(("g2", "a"))));
        assert_eq!(r.factor(2.6), None);
    }

    #[test]
    fn failed_update_keeps_previous_factors() {
        let mut r = FactorRange::new(["a", "b"]).expect("range");
        r.set_interval(0.5, 1.0);
        let err = r.set_factors(["a", "a"]).unwrap_err();
        assert_eq!(err, FactorError::Duplicate("a".into()));
        assert_eq!(r.factors().len(), 2);
        assert_eq!(r.interval(), Interval::new(0.5, 1.0));

        r.reset();
        assert_eq!(r.interval(), Interval::new(0.0, 2.0));

        r.set_factors(["x", "y", "z"]).expect("factors");
        assert_eq!(r.interval(), Interval::new(0.0, 3.0));
    }
}
