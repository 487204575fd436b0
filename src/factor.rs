//! Categorical factors and the layout that turns them into synthetic positions.
//!
//! Factors are laid out bottom-up: the leaves of one group occupy unit-width slots,
//! a group is centered on the mean of its children, and groups are placed left to
//! right separated by the configured padding. Group order is first-seen order.
use core::fmt;

use indexmap::IndexMap;
use thiserror::Error;

/// A categorical label of one, two or three levels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Factor {
    L1(String),
    L2(String, String),
    L3(String, String, String),
}

impl Factor {
    /// Number of strings in this factor.
    pub fn levels(&self) -> usize {
        match self {
            Self::L1(..) => 1,
            Self::L2(..) => 2,
            Self::L3(..) => 3,
        }
    }

    pub fn parts(&self) -> Vec<&str> {
        match self {
            Self::L1(a) => vec![a.as_str()],
            Self::L2(a, b) => vec![a.as_str(), b.as_str()],
            Self::L3(a, b, c) => vec![a.as_str(), b.as_str(), c.as_str()],
        }
    }

    fn from_parts(parts: &[&str]) -> Option<Self> {
        match *parts {
            [a] => Some(Self::L1(a.into())),
            [a, b] => Some(Self::L2(a.into(), b.into())),
            [a, b, c] => Some(Self::L3(a.into(), b.into(), c.into())),
            _ => None,
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts().join(":"))
    }
}

impl From<&str> for Factor {
    fn from(value: &str) -> Self {
        Self::L1(value.to_owned())
    }
}

impl From<String> for Factor {
    fn from(value: String) -> Self {
        Self::L1(value)
    }
}

impl From<(&str, &str)> for Factor {
    fn from((a, b): (&str, &str)) -> Self {
        Self::L2(a.to_owned(), b.to_owned())
    }
}

impl From<(&str, &str, &str)> for Factor {
    fn from((a, b, c): (&str, &str, &str)) -> Self {
        Self::L3(a.to_owned(), b.to_owned(), c.to_owned())
    }
}

/// A value on a categorical axis: either an already-synthetic number or a
/// (possibly partial) factor key plus an additive offset.
#[derive(Debug, Clone, PartialEq)]
pub enum FactorValue {
    Number(f64),
    Key { parts: Vec<String>, offset: f64 },
}

impl FactorValue {
    pub fn key<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Key {
            parts: parts.into_iter().map(Into::into).collect(),
            offset: 0.0,
        }
    }

    /// Shift the looked-up position, e.g. to dodge a bar inside its category.
    pub fn with_offset(self, delta: f64) -> Self {
        match self {
            Self::Number(x) => Self::Number(x + delta),
            Self::Key { parts, offset } => Self::Key {
                parts,
                offset: offset + delta,
            },
        }
    }
}

impl From<f64> for FactorValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for FactorValue {
    fn from(value: &str) -> Self {
        Self::key([value])
    }
}

impl From<(&str, &str)> for FactorValue {
    fn from((a, b): (&str, &str)) -> Self {
        Self::key([a, b])
    }
}

impl From<(&str, &str, &str)> for FactorValue {
    fn from((a, b, c): (&str, &str, &str)) -> Self {
        Self::key([a, b, c])
    }
}

impl From<Factor> for FactorValue {
    fn from(value: Factor) -> Self {
        match value {
            Factor::L1(a) => Self::key([a]),
            Factor::L2(a, b) => Self::key([a, b]),
            Factor::L3(a, b, c) => Self::key([a, b, c]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FactorError {
    #[error("factor `{factor}` has {found} levels, expected {expected}")]
    MixedLevels {
        expected: usize,
        found: usize,
        factor: Factor,
    },
    #[error("duplicate factor `{0}`")]
    Duplicate(String),
    #[error("lookup uses {given} levels but the range only has {levels}")]
    TooManyLevels { levels: usize, given: usize },
    #[error("empty factor lookup")]
    EmptyKey,
}

/// A positioned factor and, for group factors, its laid-out children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub value: f64,
    pub children: Mapping,
}

pub type Mapping = IndexMap<String, Node>;

/// Result of laying out one level of factors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    pub mapping: Mapping,
    /// Total padding inserted between slots, in synthetic units.
    pub inner_padding: f64,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    sum / n as f64
}

pub fn map_one_level<S: AsRef<str>>(
    factors: &[S],
    padding: f64,
    offset: f64,
) -> Result<Layout, FactorError> {
    let mut mapping = Mapping::with_capacity(factors.len());
    for (i, factor) in factors.iter().enumerate() {
        let factor = factor.as_ref();
        if mapping.contains_key(factor) {
            return Err(FactorError::Duplicate(factor.to_owned()));
        }
        let value = 0.5 + i as f64 * (1.0 + padding) + offset;
        mapping.insert(
            factor.to_owned(),
            Node {
                value,
                children: Mapping::new(),
            },
        );
    }
    Ok(Layout {
        mapping,
        inner_padding: factors.len().saturating_sub(1) as f64 * padding,
    })
}

pub fn map_two_levels<S: AsRef<str>>(
    factors: &[(S, S)],
    outer_pad: f64,
    factor_pad: f64,
    offset: f64,
) -> Result<Layout, FactorError> {
    let mut groups: IndexMap<&str, Vec<&str>> = IndexMap::new();
    for (f0, f1) in factors {
        groups.entry(f0.as_ref()).or_default().push(f1.as_ref());
    }

    let mut mapping = Mapping::with_capacity(groups.len());
    let mut suboffset = offset;
    let mut total_subpad = 0.0;
    for (top, children) in &groups {
        let sub = map_one_level(children, factor_pad, suboffset)?;
        total_subpad += sub.inner_padding;
        let value = mean(sub.mapping.values().map(|node| node.value));
        suboffset += children.len() as f64 + outer_pad + sub.inner_padding;
        mapping.insert(
            (*top).to_owned(),
            Node {
                value,
                children: sub.mapping,
            },
        );
    }

    Ok(Layout {
        mapping,
        inner_padding: groups.len().saturating_sub(1) as f64 * outer_pad + total_subpad,
    })
}

pub fn map_three_levels<S: AsRef<str>>(
    factors: &[(S, S, S)],
    outer_pad: f64,
    inner_pad: f64,
    factor_pad: f64,
    offset: f64,
) -> Result<Layout, FactorError> {
    let mut groups: IndexMap<&str, Vec<(&str, &str)>> = IndexMap::new();
    for (f0, f1, f2) in factors {
        groups
            .entry(f0.as_ref())
            .or_default()
            .push((f1.as_ref(), f2.as_ref()));
    }

    let mut mapping = Mapping::with_capacity(groups.len());
    let mut suboffset = offset;
    let mut total_subpad = 0.0;
    for (top, children) in &groups {
        let sub = map_two_levels(children, inner_pad, factor_pad, suboffset)?;
        total_subpad += sub.inner_padding;
        // Weighted by leaf count: every leaf contributes its mid group's center.
        let value = mean(
            children
                .iter()
                .filter_map(|(mid, _)| sub.mapping.get(*mid))
                .map(|node| node.value),
        );
        suboffset += children.len() as f64 + outer_pad + sub.inner_padding;
        mapping.insert(
            (*top).to_owned(),
            Node {
                value,
                children: sub.mapping,
            },
        );
    }

    Ok(Layout {
        mapping,
        inner_padding: groups.len().saturating_sub(1) as f64 * outer_pad + total_subpad,
    })
}

/// Padding between factors and between groups of factors, in synthetic units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorPadding {
    /// Between leaves of the same group.
    pub factor: f64,
    /// Between top-level groups.
    pub group: f64,
    /// Between mid-level groups of a three-level range.
    pub subgroup: f64,
}

impl Default for FactorPadding {
    fn default() -> Self {
        Self {
            factor: 0.0,
            group: 1.4,
            subgroup: 0.8,
        }
    }
}

/// Maps factors of a single level to synthetic positions.
///
/// Built once per `(factors, padding)` combination.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorMapper {
    levels: usize,
    layout: Layout,
    /// Leaves in ascending position order.
    leaves: Vec<(Factor, f64)>,
    tops: Option<Vec<String>>,
    mids: Option<Vec<(String, String)>>,
}

impl FactorMapper {
    pub fn new(factors: &[Factor], padding: FactorPadding) -> Result<Self, FactorError> {
        let levels = check_levels(factors)?;
        let layout = match levels {
            1 => {
                let keys: Vec<&str> = factors
                    .iter()
                    .filter_map(|f| match f {
                        Factor::L1(a) => Some(a.as_str()),
                        _ => None,
                    })
                    .collect();
                map_one_level(&keys, padding.factor, 0.0)?
            }
            2 => {
                let keys: Vec<(&str, &str)> = factors
                    .iter()
                    .filter_map(|f| match f {
                        Factor::L2(a, b) => Some((a.as_str(), b.as_str())),
                        _ => None,
                    })
                    .collect();
                map_two_levels(&keys, padding.group, padding.factor, 0.0)?
            }
            _ => {
                let keys: Vec<(&str, &str, &str)> = factors
                    .iter()
                    .filter_map(|f| match f {
                        Factor::L3(a, b, c) => Some((a.as_str(), b.as_str(), c.as_str())),
                        _ => None,
                    })
                    .collect();
                map_three_levels(
                    &keys,
                    padding.group,
                    padding.subgroup,
                    padding.factor,
                    0.0,
                )?
            }
        };

        let mut leaves = Vec::with_capacity(factors.len());
        collect_leaves(&layout.mapping, &mut Vec::new(), &mut leaves);

        let tops = (levels > 1).then(|| layout.mapping.keys().cloned().collect());
        let mids = (levels > 2).then(|| {
            layout
                .mapping
                .iter()
                .flat_map(|(top, node)| {
                    node.children
                        .keys()
                        .map(move |mid| (top.clone(), mid.clone()))
                })
                .collect()
        });

        Ok(Self {
            levels,
            layout,
            leaves,
            tops,
            mids,
        })
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn inner_padding(&self) -> f64 {
        self.layout.inner_padding
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Top-level group keys, for two and three level factors.
    pub fn tops(&self) -> Option<&[String]> {
        self.tops.as_deref()
    }

    /// Mid-level `(top, mid)` group keys, for three level factors.
    pub fn mids(&self) -> Option<&[(String, String)]> {
        self.mids.as_deref()
    }

    /// Synthetic position of `value`.
    ///
    /// Partial keys resolve to the group center, unknown keys to `NaN`.
    pub fn map(&self, value: &FactorValue) -> Result<f64, FactorError> {
        let (parts, offset) = match value {
            FactorValue::Number(x) => return Ok(*x),
            FactorValue::Key { parts, offset } => (parts, *offset),
        };
        if parts.is_empty() {
            return Err(FactorError::EmptyKey);
        }
        if parts.len() > self.levels {
            return Err(FactorError::TooManyLevels {
                levels: self.levels,
                given: parts.len(),
            });
        }

        let mut mapping = &self.layout.mapping;
        let mut position = f64::NAN;
        for part in parts {
            let Some(node) = mapping.get(part.as_str()) else {
                return Ok(f64::NAN);
            };
            position = node.value;
            mapping = &node.children;
        }
        Ok(position + offset)
    }

    pub fn v_map(&self, values: &[FactorValue]) -> Result<Vec<f64>, FactorError> {
        values.iter().map(|v| self.map(v)).collect()
    }

    /// The leaf whose unit slot `[center - 0.5, center + 0.5)` contains `x`.
    pub fn leaf_at(&self, x: f64) -> Option<&Factor> {
        if !x.is_finite() {
            return None;
        }
        let i = self.leaves.partition_point(|(_, center)| center + 0.5 <= x);
        let (factor, center) = self.leaves.get(i)?;
        (x >= center - 0.5).then_some(factor)
    }
}

fn check_levels(factors: &[Factor]) -> Result<usize, FactorError> {
    let Some(first) = factors.first() else {
        return Ok(1);
    };
    let expected = first.levels();
    match factors.iter().find(|f| f.levels() != expected) {
        Some(factor) => Err(FactorError::MixedLevels {
            expected,
            found: factor.levels(),
            factor: factor.clone(),
        }),
        None => Ok(expected),
    }
}

fn collect_leaves<'a>(
    mapping: &'a Mapping,
    prefix: &mut Vec<&'a str>,
    out: &mut Vec<(Factor, f64)>,
) {
    for (key, node) in mapping {
        prefix.push(key.as_str());
        if node.children.is_empty() {
            if let Some(factor) = Factor::from_parts(prefix.as_slice()) {
                out.push((factor, node.value));
            }
        } else {
            collect_leaves(&node.children, prefix, out);
        }
        prefix.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn values(layout: &Layout) -> Vec<f64> {
        layout.mapping.values().map(|n| n.value).collect()
    }

    #[test]
    fn one_level_slots_are_unit_spaced() {
        let layout = map_one_level(&["a", "b", "c"], 0.0, 0.0).expect("layout");
        assert_eq!(values(&layout), vec![0.5, 1.5, 2.5]);
        assert_eq!(layout.inner_padding, 0.0);

        let layout = map_one_level(&["a", "b", "c"], 0.5, 1.0).expect("layout");
        assert_eq!(values(&layout), vec![1.5, 3.0, 4.5]);
        assert_eq!(layout.inner_padding, 1.0);
    }

    #[test]
    fn one_level_rejects_duplicates() {
        let err = map_one_level(&["a", "b", "a"], 0.0, 0.0).unwrap_err();
        assert_eq!(err, FactorError::Duplicate("a".into()));
    }

    #[test]
    fn two_levels_keep_first_seen_group_order() {
        let layout = map_two_levels(&[("b", "1"), ("a", "1"), ("b", "2")], 0.0, 0.0, 0.0)
            .expect("layout");
        let tops: Vec<&str> = layout.mapping.keys().map(String::as_str).collect();
        assert_eq!(tops, vec!["b", "a"]);
        assert!(close(layout.mapping["b"].value, 1.0));
        assert!(close(layout.mapping["a"].value, 2.5));
    }

    #[test]
    fn two_levels_with_factor_padding() {
        let layout =
            map_two_levels(&[("A", "1"), ("A", "2"), ("C", "1")], 0.0, 0.1, 0.0).expect("layout");
        let a = &layout.mapping["A"];
        assert!(close(a.children["1"].value, 0.5));
        assert!(close(a.children["2"].value, 1.6));
        assert!(close(layout.mapping["C"].children["1"].value, 2.6));
        assert!(close(layout.inner_padding, 0.1));
    }

    #[test]
    fn two_levels_with_group_padding() {
        let layout =
            map_two_levels(&[("A", "1"), ("A", "2"), ("C", "1")], 0.1, 0.0, 0.0).expect("layout");
        let a = &layout.mapping["A"];
        assert!(close(a.children["1"].value, 0.5));
        assert!(close(a.children["2"].value, 1.5));
        assert!(close(layout.mapping["C"].children["1"].value, 2.6));
        assert!(close(layout.inner_padding, 0.1));
    }

    #[test]
    fn group_center_is_mean_of_children() {
        let factors: Vec<Factor> = vec![("g1", "a").into(), ("g1", "b").into(), ("g2", "a").into()];
        let mapper = FactorMapper::new(&factors, FactorPadding::default()).expect("mapper");
        assert!(close(mapper.map(&("g1", "a").into()).unwrap(), 0.5));
        assert!(close(mapper.map(&("g1", "b").into()).unwrap(), 1.5));
        assert!(close(mapper.map(&"g1".into()).unwrap(), 1.0));
        assert!(close(mapper.map(&("g2", "a").into()).unwrap(), 3.9));
        assert!(close(mapper.inner_padding(), 1.4));
    }

    #[test]
    fn three_levels_weight_top_center_by_leaf_count() {
        let factors: Vec<Factor> = vec![
            ("A", "1", "foo").into(),
            ("A", "1", "bar").into(),
            ("A", "2", "foo").into(),
            ("B", "1", "foo").into(),
        ];
        let mapper = FactorMapper::new(&factors, FactorPadding::default()).expect("mapper");

        assert!(close(mapper.map(&("A", "1").into()).unwrap(), 1.0));
        assert!(close(mapper.map(&("A", "2", "foo").into()).unwrap(), 3.3));
        assert!(close(mapper.map(&"A".into()).unwrap(), 5.3 / 3.0));
        assert!(close(mapper.map(&("B", "1", "foo").into()).unwrap(), 5.7));
        assert!(close(mapper.inner_padding(), 2.2));

        assert_eq!(mapper.tops(), Some(&["A".to_string(), "B".to_string()][..]));
        let mids: Vec<(&str, &str)> = mapper
            .mids()
            .expect("mids")
            .iter()
            .map(|(t, m)| (t.as_str(), m.as_str()))
            .collect();
        assert_eq!(mids, vec![("A", "1"), ("A", "2"), ("B", "1")]);
    }

    #[test]
    fn three_levels_without_padding_and_offsets() {
        let factors: Vec<Factor> = vec![
            ("A", "1", "foo").into(),
            ("A", "1", "bar").into(),
            ("C", "1", "foo").into(),
        ];
        let padding = FactorPadding {
            factor: 0.0,
            group: 0.0,
            subgroup: 0.0,
        };
        let mapper = FactorMapper::new(&factors, padding).expect("mapper");
        assert!(close(mapper.map(&"A".into()).unwrap(), 1.0));
        assert!(close(mapper.map(&("A", "1").into()).unwrap(), 1.0));
        let dodged = FactorValue::from(("A", "1")).with_offset(0.1);
        assert!(close(mapper.map(&dodged).unwrap(), 1.1));
        assert!(close(mapper.map(&FactorValue::Number(7.25)).unwrap(), 7.25));
    }

    #[test]
    fn every_leaf_is_unique() {
        let factors: Vec<Factor> = ["x", "y"]
            .iter()
            .flat_map(|t| ["1", "2", "3"].iter().map(move |m| Factor::from((*t, *m))))
            .collect();
        let mapper = FactorMapper::new(&factors, FactorPadding::default()).expect("mapper");
        let keys: Vec<FactorValue> = factors.iter().cloned().map(FactorValue::from).collect();
        let mut positions = mapper.v_map(&keys).expect("positions");
        positions.sort_by(f64::total_cmp);
        positions.dedup();
        assert_eq!(positions.len(), factors.len());
    }

    #[test]
    fn configuration_errors() {
        let mixed: Vec<Factor> = vec!["a".into(), ("a", "b").into()];
        assert!(matches!(
            FactorMapper::new(&mixed, FactorPadding::default()),
            Err(FactorError::MixedLevels { expected: 1, found: 2, .. })
        ));

        let dup: Vec<Factor> = vec![("a", "1").into(), ("a", "1").into()];
        assert_eq!(
            FactorMapper::new(&dup, FactorPadding::default()).unwrap_err(),
            FactorError::Duplicate("1".into())
        );

        let mapper = FactorMapper::new(&["a".into()], FactorPadding::default()).expect("mapper");
        assert_eq!(
            mapper.map(&("a", "b").into()).unwrap_err(),
            FactorError::TooManyLevels { levels: 1, given: 2 }
        );
        assert_eq!(
            mapper.map(&FactorValue::key(Vec::<String>::new())).unwrap_err(),
            FactorError::EmptyKey
        );
        assert!(mapper.map(&"missing".into()).unwrap().is_nan());
    }

    #[test]
    fn leaf_lookup_uses_half_open_slots() {
        let factors: Vec<Factor> = vec!["A".into(), "B".into(), "C".into()];
        let mapper = FactorMapper::new(&factors, FactorPadding::default()).expect("mapper");
        assert_eq!(mapper.leaf_at(0.999), Some(&Factor::from("A")));
        assert_eq!(mapper.leaf_at(1.0), Some(&Factor::from("B")));
        assert_eq!(mapper.leaf_at(2.99), Some(&Factor::from("C")));
        assert_eq!(mapper.leaf_at(3.0), None);
        assert_eq!(mapper.leaf_at(-1.0), None);
        assert_eq!(mapper.leaf_at(f64::NAN), None);
    }
}
