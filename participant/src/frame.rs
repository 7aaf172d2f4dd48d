use std::collections::HashMap;

use crate::error::FrameErr;

/// One value in a local data table.
///
/// Loaders (outside this system) may hand over mixed-typed columns; the
/// numeric coercion rules live in `as_numeric`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Bool(bool),
    Text(String),
    Missing,
}

impl Cell {
    /// Coerces a cell to a numeric value.
    ///
    /// Boolean-like cells (booleans and the strings "True"/"False" in any
    /// casing) become 1.0/0.0; text is parsed as a number where possible;
    /// everything else is treated as missing.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Cell::Number(x) if x.is_finite() => Some(*x),
            Cell::Number(_) => None,
            Cell::Bool(b) => Some(f64::from(u8::from(*b))),
            Cell::Text(s) => match s.trim() {
                t if t.eq_ignore_ascii_case("true") => Some(1.0),
                t if t.eq_ignore_ascii_case("false") => Some(0.0),
                t => t.parse::<f64>().ok().filter(|x| x.is_finite()),
            },
            Cell::Missing => None,
        }
    }

    /// A stable lookup key for join matching; `None` for unkeyable cells.
    fn join_key(&self) -> Option<String> {
        match self {
            Cell::Number(x) if x.is_finite() => Some(format!("n:{x}")),
            Cell::Number(_) => None,
            Cell::Bool(b) => Some(format!("b:{b}")),
            Cell::Text(s) => Some(format!("t:{}", s.trim())),
            Cell::Missing => None,
        }
    }
}

impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        Cell::Number(x)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Bool(b)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_owned())
    }
}

/// A named-column table of cells. All columns have the same row count.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    columns: Vec<(String, Vec<Cell>)>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column, checking the row-count invariant.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        cells: Vec<Cell>,
    ) -> Result<(), FrameErr> {
        let name = name.into();
        if let Some(expected) = self.columns.first().map(|(_, c)| c.len()) {
            if cells.len() != expected {
                return Err(FrameErr::RaggedColumn {
                    column: name,
                    got: cells.len(),
                    expected,
                });
            }
        }
        self.columns.push((name, cells));
        Ok(())
    }

    /// Builder-style `push_column` for loaders and tests.
    ///
    /// # Panics
    /// On a row-count mismatch; use `push_column` to handle it instead.
    pub fn with_column(mut self, name: impl Into<String>, cells: Vec<Cell>) -> Self {
        self.push_column(name, cells).unwrap();
        self
    }

    pub fn rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, c)| c.len())
    }

    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.as_slice())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Outer-joins two frames on a shared key column.
    ///
    /// The result carries every key present on either side, in
    /// left-then-right order; cells for the missing side are `Missing`.
    /// Rows whose key is itself missing are dropped. Keys are assumed
    /// unique per side — with duplicates, the first occurrence wins.
    ///
    /// # Errors
    /// `MissingColumn` when either frame lacks the key, `DuplicateColumn`
    /// when a non-key column exists on both sides.
    pub fn outer_join(&self, other: &Frame, key: &str) -> Result<Frame, FrameErr> {
        let left_keys = self
            .column(key)
            .ok_or_else(|| FrameErr::MissingColumn(key.to_owned()))?;
        let right_keys = other
            .column(key)
            .ok_or_else(|| FrameErr::MissingColumn(key.to_owned()))?;

        for (name, _) in &other.columns {
            if name != key && self.has_column(name) {
                return Err(FrameErr::DuplicateColumn(name.clone()));
            }
        }

        let index_of = |cells: &[Cell]| -> HashMap<String, usize> {
            let mut index = HashMap::new();
            for (i, cell) in cells.iter().enumerate() {
                if let Some(k) = cell.join_key() {
                    index.entry(k).or_insert(i);
                }
            }
            index
        };
        let left_index = index_of(left_keys);
        let right_index = index_of(right_keys);

        // Row plan: all left keys in order, then right-only keys.
        let mut rows: Vec<(Option<usize>, Option<usize>)> = Vec::new();
        for (i, cell) in left_keys.iter().enumerate() {
            let Some(k) = cell.join_key() else { continue };
            if left_index[&k] != i {
                continue;
            }
            rows.push((Some(i), right_index.get(&k).copied()));
        }
        for (i, cell) in right_keys.iter().enumerate() {
            let Some(k) = cell.join_key() else { continue };
            if right_index[&k] != i || left_index.contains_key(&k) {
                continue;
            }
            rows.push((None, Some(i)));
        }

        let mut joined = Frame::new();
        let key_cells = rows
            .iter()
            .map(|&(li, ri)| match (li, ri) {
                (Some(i), _) => left_keys[i].clone(),
                (None, Some(i)) => right_keys[i].clone(),
                (None, None) => Cell::Missing,
            })
            .collect();
        joined.push_column(key, key_cells)?;

        let mut append_side = |columns: &[(String, Vec<Cell>)],
                               pick: fn(&(Option<usize>, Option<usize>)) -> Option<usize>|
         -> Result<(), FrameErr> {
            for (name, cells) in columns {
                if name == key {
                    continue;
                }
                let projected = rows
                    .iter()
                    .map(|row| match pick(row) {
                        Some(i) => cells[i].clone(),
                        None => Cell::Missing,
                    })
                    .collect();
                joined.push_column(name.clone(), projected)?;
            }
            Ok(())
        };
        append_side(&self.columns, |&(li, _)| li)?;
        append_side(&other.columns, |&(_, ri)| ri)?;

        Ok(joined)
    }

    /// Aligns two frames positionally (no merge key configured).
    ///
    /// # Errors
    /// `RowCountMismatch` when the frames disagree on row count,
    /// `DuplicateColumn` on a shared column name.
    pub fn zip(&self, other: &Frame) -> Result<Frame, FrameErr> {
        if self.rows() != other.rows() {
            return Err(FrameErr::RowCountMismatch {
                left: self.rows(),
                right: other.rows(),
            });
        }

        let mut joined = self.clone();
        for (name, cells) in &other.columns {
            if joined.has_column(name) {
                return Err(FrameErr::DuplicateColumn(name.clone()));
            }
            joined.push_column(name.clone(), cells.clone())?;
        }
        Ok(joined)
    }
}
