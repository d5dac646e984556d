use crate::table::{ColumnKind, Table, Value};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

/// Label encoder for one column: distinct stringified values are sorted by
/// ordinal byte comparison and assigned codes `0..k-1` in that order, so
/// code assignment is deterministic across runs and platforms.
#[derive(Debug, Clone, Serialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<I>(labels: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let classes: Vec<String> = labels
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self { classes }
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn code_for(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .ok()
    }

    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }
}

/// An encoded column's name together with its code -> label mapping, kept in
/// memory for reverse lookup by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct EncodedColumn {
    pub name: String,
    pub encoder: LabelEncoder,
}

/// Replaces every textual column's cells with integer codes. Numeric
/// columns are untouched. Every value is stringified before fitting, so the
/// stage cannot fail on mixed content.
pub fn encode_table(table: &mut Table) -> Vec<EncodedColumn> {
    let mut encoded = Vec::new();
    for column in table.columns_mut() {
        if column.kind() == ColumnKind::Numeric {
            continue;
        }

        let labels: Vec<String> = column
            .values
            .iter()
            .map(|v| v.as_label().unwrap_or_default())
            .collect();
        let encoder = LabelEncoder::fit(labels.iter().cloned());

        for (value, label) in column.values.iter_mut().zip(&labels) {
            // The fit covered every label in the column, so the lookup
            // cannot miss.
            let code = encoder.code_for(label).unwrap_or(0);
            *value = Value::Number(code as f64);
        }

        info!(
            "Label encoded: {} -> {} unique values",
            column.name,
            encoder.len()
        );
        println!(
            "Label encoded: {} -> {} unique values",
            column.name,
            encoder.len()
        );
        encoded.push(EncodedColumn {
            name: column.name.clone(),
            encoder,
        });
    }
    encoded
}
