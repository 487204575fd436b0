//! Per-point property specs and their materialization from a data source.
use crate::{
    factor::FactorValue,
    factor_range::FactorRange,
    index::FullIndex,
    source::{Column, ColumnDataSource, ColumnKind, DataError},
};

/// A numeric property: a column reference or a constant.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberSpec {
    Field(String),
    Value(f64),
}

impl NumberSpec {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// One value per row in `rows`.
    pub fn materialize(
        &self,
        source: &ColumnDataSource,
        rows: &[FullIndex],
    ) -> Result<Vec<f64>, DataError> {
        match self {
            Self::Value(v) => Ok(vec![*v; rows.len()]),
            Self::Field(name) => {
                let values = source.numbers(name)?;
                Ok(gather(values, rows))
            }
        }
    }

    /// Like [`NumberSpec::materialize`], but factor columns are converted to synthetic
    /// coordinates through `range`.
    pub fn materialize_coordinates(
        &self,
        source: &ColumnDataSource,
        rows: &[FullIndex],
        range: Option<&FactorRange>,
    ) -> Result<Vec<f64>, DataError> {
        let Self::Field(name) = self else {
            return self.materialize(source, rows);
        };
        match (source.column(name)?, range) {
            (Column::Factor(factors), Some(range)) => rows
                .iter()
                .map(|&FullIndex(i)| match factors.get(i) {
                    Some(factor) => range.synthetic(&FactorValue::from(factor.clone())),
                    None => Ok(f64::NAN),
                })
                .map(|r| r.map_err(DataError::from))
                .collect(),
            (Column::Factor(_), None) => Err(DataError::ColumnType {
                name: name.clone(),
                expected: ColumnKind::Number,
                found: ColumnKind::Factor,
            }),
            _ => self.materialize(source, rows),
        }
    }
}

impl From<f64> for NumberSpec {
    fn from(value: f64) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for NumberSpec {
    fn from(value: &str) -> Self {
        Self::Field(value.to_owned())
    }
}

/// A list-valued property, e.g. the vertices of a patch.
#[derive(Debug, Clone, PartialEq)]
pub enum RaggedSpec {
    Field(String),
    Value(Vec<f64>),
}

impl RaggedSpec {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn materialize(
        &self,
        source: &ColumnDataSource,
        rows: &[FullIndex],
    ) -> Result<Vec<Vec<f64>>, DataError> {
        match self {
            Self::Value(v) => Ok(vec![v.clone(); rows.len()]),
            Self::Field(name) => {
                let values = source.ragged(name)?;
                Ok(rows
                    .iter()
                    .map(|&FullIndex(i)| values.get(i).cloned().unwrap_or_default())
                    .collect())
            }
        }
    }
}

impl From<&str> for RaggedSpec {
    fn from(value: &str) -> Self {
        Self::Field(value.to_owned())
    }
}

fn gather(values: &[f64], rows: &[FullIndex]) -> Vec<f64> {
    rows.iter()
        .map(|&FullIndex(i)| values.get(i).copied().unwrap_or(f64::NAN))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor::Factor;

    fn rows(indices: &[usize]) -> Vec<FullIndex> {
        indices.iter().map(|&i| FullIndex(i)).collect()
    }

    #[test]
    fn fields_gather_rows_and_values_broadcast() {
        let source = ColumnDataSource::new()
            .with_column("x", vec![10.0, 11.0, 12.0])
            .expect("x");
        let x = NumberSpec::from("x").materialize(&source, &rows(&[2, 0]));
        assert_eq!(x.expect("x"), vec![12.0, 10.0]);
        let size = NumberSpec::from(4.0).materialize(&source, &rows(&[0, 1, 2]));
        assert_eq!(size.expect("size"), vec![4.0; 3]);
        assert_eq!(
            NumberSpec::from("nope").materialize(&source, &[]).unwrap_err(),
            DataError::MissingColumn("nope".into())
        );
    }

    #[test]
    fn factor_columns_need_a_factor_range() {
        let cats: Vec<Factor> = ["b", "a", "zzz"].into_iter().map(Factor::from).collect();
        let source = ColumnDataSource::new().with_column("cat", cats).expect("cat");
        let range = FactorRange::new(["a", "b"]).expect("range");
        let spec = NumberSpec::field("cat");

        let xs = spec
            .materialize_coordinates(&source, &rows(&[0, 1, 2]), Some(&range))
            .expect("synthetic");
        assert_eq!(&xs[..2], &[1.5, 0.5]);
        assert!(xs[2].is_nan());

        assert!(matches!(
            spec.materialize_coordinates(&source, &rows(&[0]), None),
            Err(DataError::ColumnType { .. })
        ));
    }

    #[test]
    fn ragged_rows() {
        let source = ColumnDataSource::new()
            .with_column("xs", vec![vec![0.0, 1.0], vec![2.0]])
            .expect("xs");
        let xs = RaggedSpec::from("xs")
            .materialize(&source, &rows(&[1, 0]))
            .expect("xs");
        assert_eq!(xs, vec![vec![2.0], vec![0.0, 1.0]]);
    }
}
