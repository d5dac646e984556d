use crate::error::{Result, ScrubError};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A single cell.
///
/// Empty workbook cells and blank strings load as `Missing`; the cleaning
/// stage decides what happens to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Text(String),
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Stringified form used for label encoding and mode counting.
    /// `None` for missing cells.
    pub fn as_label(&self) -> Option<String> {
        match self {
            Value::Number(n) => Some(format_number(*n)),
            Value::Bool(b) => Some(b.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Missing => None,
        }
    }

    /// Rendering used by the CSV writer; missing cells become empty fields.
    pub fn render(&self) -> String {
        self.as_label().unwrap_or_default()
    }
}

/// Canonical text form of a number (integral values print without a
/// fractional part, matching `f64`'s shortest display form).
pub fn format_number(n: f64) -> String {
    n.to_string()
}

// Duplicate detection is exact-match: numbers compare by bit pattern, never
// by tolerance.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Missing, Value::Missing) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Number(n) => {
                0u8.hash(state);
                n.to_bits().hash(state);
            }
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Text(s) => {
                2u8.hash(state);
                s.hash(state);
            }
            Value::Missing => 3u8.hash(state),
        }
    }
}

/// Derived column type; there is no declared schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Textual,
}

/// A named column of cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Numeric when at least one value is present and every present value is
    /// a number. Booleans count as textual, and so does an all-missing
    /// column (it carries no numeric evidence).
    pub fn kind(&self) -> ColumnKind {
        let mut saw_value = false;
        for value in &self.values {
            match value {
                Value::Number(_) => saw_value = true,
                Value::Missing => {}
                _ => return ColumnKind::Textual,
            }
        }
        if saw_value {
            ColumnKind::Numeric
        } else {
            ColumnKind::Textual
        }
    }
}

/// In-memory rectangular dataset: ordered named columns aligned by row index.
///
/// Invariant: every column has the same length. `Table::new` rejects ragged
/// input, and the mutating helpers preserve alignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let len = first.values.len();
            if let Some(bad) = columns.iter().find(|c| c.values.len() != len) {
                return Err(ScrubError::Data(format!(
                    "column '{}' has {} rows, expected {}",
                    bad.name,
                    bad.values.len(),
                    len
                )));
            }
        }
        Ok(Self { columns })
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn set_headers(&mut self, names: Vec<String>) {
        debug_assert_eq!(names.len(), self.columns.len());
        for (column, name) in self.columns.iter_mut().zip(names) {
            column.name = name;
        }
    }

    /// One row as a cell slice, cloned in column order.
    pub fn row(&self, index: usize) -> Vec<Value> {
        self.columns
            .iter()
            .map(|c| c.values[index].clone())
            .collect()
    }

    /// Keep only the rows whose mask entry is true. Order is preserved.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.row_count());
        for column in &mut self.columns {
            let mut i = 0;
            column.values.retain(|_| {
                let kept = keep[i];
                i += 1;
                kept
            });
        }
    }
}
