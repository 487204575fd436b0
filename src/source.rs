//! Columnar data sources and their shared selection state.
use indexmap::IndexMap;
use thiserror::Error;

use crate::{
    factor::{Factor, FactorError},
    index::FullIndex,
    selection::{Selection, SelectionMode},
    signal::{Connection, Signal},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Number,
    Factor,
    Ragged,
}

/// One named column. All columns of a source have the same length.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Number(Vec<f64>),
    Factor(Vec<Factor>),
    /// A list of numbers per row, e.g. the vertices of a patch.
    Ragged(Vec<Vec<f64>>),
}

/// A single cell, used by [`ColumnDataSource::patch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Factor(Factor),
    Ragged(Vec<f64>),
}

impl From<Vec<f64>> for Column {
    fn from(value: Vec<f64>) -> Self {
        Self::Number(value)
    }
}

impl From<Vec<Factor>> for Column {
    fn from(value: Vec<Factor>) -> Self {
        Self::Factor(value)
    }
}

impl From<Vec<Vec<f64>>> for Column {
    fn from(value: Vec<Vec<f64>>) -> Self {
        Self::Ragged(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Factor> for Cell {
    fn from(value: Factor) -> Self {
        Self::Factor(value)
    }
}

impl From<Vec<f64>> for Cell {
    fn from(value: Vec<f64>) -> Self {
        Self::Ragged(value)
    }
}

impl Cell {
    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Number(_) => ColumnKind::Number,
            Self::Factor(_) => ColumnKind::Factor,
            Self::Ragged(_) => ColumnKind::Ragged,
        }
    }
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Self::Number(v) => v.len(),
            Self::Factor(v) => v.len(),
            Self::Ragged(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Number(_) => ColumnKind::Number,
            Self::Factor(_) => ColumnKind::Factor,
            Self::Ragged(_) => ColumnKind::Ragged,
        }
    }

    fn append(&mut self, other: Column) {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.extend(b),
            (Self::Factor(a), Self::Factor(b)) => a.extend(b),
            (Self::Ragged(a), Self::Ragged(b)) => a.extend(b),
            _ => {}
        }
    }

    fn drop_front(&mut self, n: usize) {
        match self {
            Self::Number(v) => drop(v.drain(..n.min(v.len()))),
            Self::Factor(v) => drop(v.drain(..n.min(v.len()))),
            Self::Ragged(v) => drop(v.drain(..n.min(v.len()))),
        }
    }

    fn set(&mut self, row: usize, cell: Cell) {
        match (self, cell) {
            (Self::Number(v), Cell::Number(x)) => v[row] = x,
            (Self::Factor(v), Cell::Factor(x)) => v[row] = x,
            (Self::Ragged(v), Cell::Ragged(x)) => v[row] = x,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("no column named {0:?}")]
    MissingColumn(String),
    #[error("column {name:?} holds {found:?} values, expected {expected:?}")]
    ColumnType {
        name: String,
        expected: ColumnKind,
        found: ColumnKind,
    },
    #[error("column {name:?} has {found} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("patch row {row} is out of bounds for column {name:?} with {len} rows")]
    PatchOutOfBounds { name: String, row: usize, len: usize },
    #[error(transparent)]
    Factor(#[from] FactorError),
}

/// What changed in a [`ColumnDataSource`].
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Columns,
    Streamed { rows: usize, rolled_over: usize },
    Patched { column: String, rows: Vec<usize> },
    Selected,
    Inspected,
}

/// Named columns of equal length, plus the selection and inspection state of their rows.
///
/// Selection state is always in full source index space.
#[derive(Debug, Default)]
pub struct ColumnDataSource {
    columns: IndexMap<String, Column>,
    selected: Selection,
    inspected: Selection,
    /// Selection at the start of the current gesture.
    snapshot: Option<Selection>,
    preview: Option<Selection>,
    data_version: u64,
    selection_version: u64,
    inspect_version: u64,
    changed: Signal<SourceEvent>,
}

impl ColumnDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(
        mut self,
        name: impl Into<String>,
        column: impl Into<Column>,
    ) -> Result<Self, DataError> {
        self.insert_column(name, column)?;
        Ok(self)
    }

    /// Add or replace a column.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        column: impl Into<Column>,
    ) -> Result<(), DataError> {
        let name = name.into();
        let column = column.into();
        if let Some(expected) = self
            .columns
            .iter()
            .find(|(other, _)| **other != name)
            .map(|(_, c)| c.len())
            && column.len() != expected
        {
            return Err(DataError::LengthMismatch {
                name,
                expected,
                found: column.len(),
            });
        }
        self.columns.insert(name, column);
        self.bump_data(SourceEvent::Columns);
        Ok(())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns.values().next().map_or(0, Column::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, name: &str) -> Result<&Column, DataError> {
        self.columns
            .get(name)
            .ok_or_else(|| DataError::MissingColumn(name.to_owned()))
    }

    pub fn numbers(&self, name: &str) -> Result<&[f64], DataError> {
        match self.column(name)? {
            Column::Number(v) => Ok(v),
            other => Err(type_error(name, ColumnKind::Number, other.kind())),
        }
    }

    pub fn factors(&self, name: &str) -> Result<&[Factor], DataError> {
        match self.column(name)? {
            Column::Factor(v) => Ok(v),
            other => Err(type_error(name, ColumnKind::Factor, other.kind())),
        }
    }

    pub fn ragged(&self, name: &str) -> Result<&[Vec<f64>], DataError> {
        match self.column(name)? {
            Column::Ragged(v) => Ok(v),
            other => Err(type_error(name, ColumnKind::Ragged, other.kind())),
        }
    }

    /// Append rows to every column, then keep only the last `rollover` rows.
    ///
    /// Selected and inspected rows are shifted so they keep pointing at the same data.
    pub fn stream(
        &mut self,
        rows: impl IntoIterator<Item = (String, Column)>,
        rollover: Option<usize>,
    ) -> Result<(), DataError> {
        let mut new: IndexMap<String, Column> = rows.into_iter().collect();
        let mut added = None;
        for (name, existing) in &self.columns {
            let column = new
                .get(name)
                .ok_or_else(|| DataError::MissingColumn(name.clone()))?;
            if column.kind() != existing.kind() {
                return Err(type_error(name, existing.kind(), column.kind()));
            }
            match added {
                None => added = Some(column.len()),
                Some(expected) if expected != column.len() => {
                    return Err(DataError::LengthMismatch {
                        name: name.clone(),
                        expected,
                        found: column.len(),
                    });
                }
                Some(_) => {}
            }
        }
        if let Some(extra) = new.keys().find(|name| !self.columns.contains_key(*name)) {
            return Err(DataError::MissingColumn(extra.clone()));
        }

        for (name, column) in &mut self.columns {
            if let Some(rows) = new.swap_remove(name) {
                column.append(rows);
            }
        }

        let len = self.len();
        let rolled_over = rollover.map_or(0, |keep| len.saturating_sub(keep));
        if rolled_over > 0 {
            for column in self.columns.values_mut() {
                column.drop_front(rolled_over);
            }
            let shift = |s: &Selection| {
                s.map_indices(|FullIndex(i)| i.checked_sub(rolled_over).map(FullIndex))
            };
            self.selected = shift(&self.selected);
            self.inspected = shift(&self.inspected);
            self.snapshot = self.snapshot.as_ref().map(shift);
            self.preview = self.preview.as_ref().map(shift);
            self.selection_version += 1;
            self.inspect_version += 1;
        }

        self.bump_data(SourceEvent::Streamed {
            rows: added.unwrap_or(0),
            rolled_over,
        });
        Ok(())
    }

    /// Replace single cells of one column. Nothing is written if any patch is invalid.
    pub fn patch(
        &mut self,
        name: &str,
        patches: impl IntoIterator<Item = (usize, Cell)>,
    ) -> Result<(), DataError> {
        let patches: Vec<(usize, Cell)> = patches.into_iter().collect();
        let column = self
            .columns
            .get_mut(name)
            .ok_or_else(|| DataError::MissingColumn(name.to_owned()))?;
        let len = column.len();
        for (row, cell) in &patches {
            if *row >= len {
                return Err(DataError::PatchOutOfBounds {
                    name: name.to_owned(),
                    row: *row,
                    len,
                });
            }
            if cell.kind() != column.kind() {
                return Err(type_error(name, column.kind(), cell.kind()));
            }
        }

        let rows = patches.iter().map(|(row, _)| *row).collect();
        for (row, cell) in patches {
            column.set(row, cell);
        }
        self.bump_data(SourceEvent::Patched {
            column: name.to_owned(),
            rows,
        });
        Ok(())
    }

    /// Committed selection.
    pub fn selected(&self) -> &Selection {
        &self.selected
    }

    /// Selection including an in-progress gesture.
    pub fn selection_preview(&self) -> &Selection {
        self.preview.as_ref().unwrap_or(&self.selected)
    }

    pub fn inspected(&self) -> &Selection {
        &self.inspected
    }

    /// Combine `selection` with the selection as it was when the gesture started.
    ///
    /// Only a `final_` update is committed to [`ColumnDataSource::selected`].
    pub fn apply_selection(&mut self, selection: &Selection, mode: SelectionMode, final_: bool) {
        let mut next = self
            .snapshot
            .get_or_insert_with(|| self.selected.clone())
            .clone();
        next.update(selection, mode);
        if final_ {
            self.selected = next;
            self.snapshot = None;
            self.preview = None;
            self.selection_version += 1;
            self.changed.emit(&SourceEvent::Selected);
        } else {
            self.preview = Some(next);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = Selection::default();
        self.snapshot = None;
        self.preview = None;
        self.selection_version += 1;
        self.changed.emit(&SourceEvent::Selected);
    }

    pub fn set_inspected(&mut self, inspected: Selection) {
        if inspected == self.inspected {
            return;
        }
        self.inspected = inspected;
        self.inspect_version += 1;
        self.changed.emit(&SourceEvent::Inspected);
    }

    pub fn data_version(&self) -> u64 {
        self.data_version
    }

    pub fn selection_version(&self) -> u64 {
        self.selection_version
    }

    pub fn inspect_version(&self) -> u64 {
        self.inspect_version
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SourceEvent) + 'static) -> Connection {
        self.changed.connect(listener)
    }

    pub fn unsubscribe(&mut self, connection: Connection) -> bool {
        self.changed.disconnect(connection)
    }

    fn bump_data(&mut self, event: SourceEvent) {
        self.data_version += 1;
        self.changed.emit(&event);
    }
}

fn type_error(name: &str, expected: ColumnKind, found: ColumnKind) -> DataError {
    DataError::ColumnType {
        name: name.to_owned(),
        expected,
        found,
    }
}
