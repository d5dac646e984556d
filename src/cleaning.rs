use crate::constants::MISSING_LABEL;
use crate::error::{Result, ScrubError};
use crate::table::{Column, ColumnKind, Table, Value};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// How rows with missing cells are handled after deduplication.
///
/// `Drop` reproduces the original batch job's behavior; `Impute` fills
/// numeric columns with the column mean and textual columns with the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissingValuePolicy {
    Drop,
    #[default]
    Impute,
}

/// Row accounting for one cleaning pass.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningSummary {
    pub rows_in: usize,
    pub duplicate_rows_removed: usize,
    pub rows_dropped_missing: usize,
    pub rows_out: usize,
}

/// Normalizes the table in place: deduplication, the missing-value policy,
/// whitespace trimming, then header normalization.
pub fn clean_table(table: &mut Table, policy: MissingValuePolicy) -> Result<CleaningSummary> {
    if table.column_count() == 0 {
        return Err(ScrubError::Data(
            "table has no columns, nothing to clean".into(),
        ));
    }

    let rows_in = table.row_count();
    let duplicate_rows_removed = deduplicate(table);
    info!(
        "Deduplicated: {} rows, {} columns ({} duplicates removed)",
        table.row_count(),
        table.column_count(),
        duplicate_rows_removed
    );
    println!(
        "Deduplicated: {} rows, {} columns",
        table.row_count(),
        table.column_count()
    );

    let rows_dropped_missing = match policy {
        MissingValuePolicy::Drop => drop_missing_rows(table),
        MissingValuePolicy::Impute => {
            impute_missing(table);
            0
        }
    };

    trim_text_cells(table);
    normalize_headers(table);

    info!(
        "Preprocessing complete: {} rows, {} columns",
        table.row_count(),
        table.column_count()
    );
    println!(
        "Preprocessing complete: {} rows, {} columns",
        table.row_count(),
        table.column_count()
    );

    Ok(CleaningSummary {
        rows_in,
        duplicate_rows_removed,
        rows_dropped_missing,
        rows_out: table.row_count(),
    })
}

/// Removes rows that exactly duplicate an earlier row, comparing every
/// column. First occurrence wins; order is preserved.
fn deduplicate(table: &mut Table) -> usize {
    let rows = table.row_count();
    let mut seen: HashSet<Vec<Value>> = HashSet::with_capacity(rows);
    let mut keep = Vec::with_capacity(rows);
    for i in 0..rows {
        keep.push(seen.insert(table.row(i)));
    }
    table.retain_rows(&keep);
    rows - table.row_count()
}

fn drop_missing_rows(table: &mut Table) -> usize {
    let rows = table.row_count();
    let keep: Vec<bool> = (0..rows)
        .map(|i| table.columns().iter().all(|c| !c.values[i].is_missing()))
        .collect();
    table.retain_rows(&keep);
    let dropped = rows - table.row_count();
    debug!("Dropped {} rows with missing values", dropped);
    dropped
}

/// Per column: numeric columns get the mean of their present values,
/// textual columns the most frequent present value (first occurrence breaks
/// ties), or "Unknown" when the column holds nothing at all.
fn impute_missing(table: &mut Table) {
    for column in table.columns_mut() {
        if !column.values.iter().any(Value::is_missing) {
            continue;
        }
        match column.kind() {
            ColumnKind::Numeric => {
                // Column-kind inference guarantees at least one number here.
                let (sum, count) = column
                    .values
                    .iter()
                    .filter_map(|v| match v {
                        Value::Number(n) => Some(*n),
                        _ => None,
                    })
                    .fold((0.0, 0usize), |(s, c), n| (s + n, c + 1));
                let mean = sum / count as f64;
                for value in &mut column.values {
                    if value.is_missing() {
                        *value = Value::Number(mean);
                    }
                }
            }
            ColumnKind::Textual => {
                let fill = column_mode(column).unwrap_or_else(|| MISSING_LABEL.to_string());
                for value in &mut column.values {
                    if value.is_missing() {
                        *value = Value::Text(fill.clone());
                    }
                }
            }
        }
    }
}

/// Most frequent stringified value; ties go to the value seen first in the
/// column. `None` when every cell is missing.
fn column_mode(column: &Column) -> Option<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (i, value) in column.values.iter().enumerate() {
        if let Some(label) = value.as_label() {
            let entry = counts.entry(label).or_insert((0, i));
            entry.0 += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(label, _)| label)
}

fn trim_text_cells(table: &mut Table) {
    for column in table.columns_mut() {
        for value in &mut column.values {
            if let Value::Text(s) = value {
                let trimmed = s.trim();
                if trimmed.len() != s.len() {
                    *value = Value::Text(trimmed.to_string());
                }
            }
        }
    }
}

/// Lowercases headers and replaces spaces with underscores.
fn normalize_headers(table: &mut Table) {
    let names = table
        .headers()
        .iter()
        .map(|h| h.to_lowercase().replace(' ', "_"))
        .collect();
    table.set_headers(names);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people_table() -> Table {
        Table::new(vec![
            Column::new(
                "Name",
                vec![
                    Value::Text("Alice".into()),
                    Value::Text("alice ".into()),
                    Value::Missing,
                ],
            ),
            Column::new(
                "Age",
                vec![Value::Number(30.0), Value::Number(30.0), Value::Number(25.0)],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn zero_columns_is_a_data_error() {
        let mut table = Table::default();
        let result = clean_table(&mut table, MissingValuePolicy::Impute);
        assert!(matches!(result, Err(ScrubError::Data(_))));
    }

    #[test]
    fn dedup_is_exact_match_and_keeps_first() {
        let mut table = Table::new(vec![
            Column::new(
                "Name",
                vec![
                    Value::Text("Alice".into()),
                    Value::Text("alice ".into()),
                    Value::Text("Alice".into()),
                ],
            ),
            Column::new(
                "Age",
                vec![Value::Number(30.0), Value::Number(30.0), Value::Number(30.0)],
            ),
        ])
        .unwrap();

        let removed = deduplicate(&mut table);
        assert_eq!(removed, 1);
        // Near-miss "alice " differs in case and whitespace, so it survives.
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.columns()[0].values,
            vec![Value::Text("Alice".into()), Value::Text("alice ".into())]
        );
    }

    #[test]
    fn impute_fills_mean_and_mode() {
        let mut table = Table::new(vec![
            Column::new(
                "Name",
                vec![
                    Value::Text("Alice".into()),
                    Value::Text("Alice".into()),
                    Value::Missing,
                    Value::Text("Bob".into()),
                ],
            ),
            Column::new(
                "Age",
                vec![
                    Value::Number(30.0),
                    Value::Number(30.0),
                    Value::Number(25.0),
                    Value::Missing,
                ],
            ),
        ])
        .unwrap();

        impute_missing(&mut table);
        let mean = (30.0 + 30.0 + 25.0) / 3.0;
        assert_eq!(table.columns()[1].values[3], Value::Number(mean));
        assert_eq!(table.columns()[0].values[2], Value::Text("Alice".into()));
    }

    #[test]
    fn mode_tie_breaks_on_first_occurrence() {
        let column = Column::new(
            "c",
            vec![
                Value::Text("b".into()),
                Value::Text("a".into()),
                Value::Text("a".into()),
                Value::Text("b".into()),
            ],
        );
        // Both appear twice; "b" was seen first.
        assert_eq!(column_mode(&column), Some("b".to_string()));
    }

    #[test]
    fn all_missing_textual_column_falls_back_to_unknown() {
        let mut table = Table::new(vec![
            Column::new("note", vec![Value::Missing, Value::Missing]),
            Column::new("age", vec![Value::Number(1.0), Value::Number(2.0)]),
        ])
        .unwrap();

        impute_missing(&mut table);
        assert_eq!(
            table.columns()[0].values,
            vec![Value::Text("Unknown".into()), Value::Text("Unknown".into())]
        );
    }

    #[test]
    fn drop_policy_removes_rows_with_any_missing_cell() {
        let mut table = people_table();
        let summary = clean_table(&mut table, MissingValuePolicy::Drop).unwrap();
        assert_eq!(summary.rows_in, 3);
        assert_eq!(summary.rows_dropped_missing, 1);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn near_miss_duplicates_survive_and_get_trimmed() {
        let mut table = people_table();
        let summary = clean_table(&mut table, MissingValuePolicy::Impute).unwrap();

        // "alice " is not an exact duplicate of "Alice", so nothing dedups,
        // but the whitespace is trimmed afterwards and the missing name
        // takes the column mode.
        assert_eq!(summary.duplicate_rows_removed, 0);
        assert_eq!(summary.rows_out, 3);
        assert_eq!(
            table.columns()[0].values,
            vec![
                Value::Text("Alice".into()),
                Value::Text("alice".into()),
                Value::Text("Alice".into()),
            ]
        );
        assert_eq!(table.headers(), vec!["name", "age"]);
    }

    #[test]
    fn headers_are_lowercased_and_underscored() {
        let mut table = Table::new(vec![Column::new(
            "First Name",
            vec![Value::Text("x".into())],
        )])
        .unwrap();
        normalize_headers(&mut table);
        assert_eq!(table.headers(), vec!["first_name"]);
    }

    #[test]
    fn trimming_leaves_no_edge_whitespace() {
        let mut table = Table::new(vec![Column::new(
            "c",
            vec![Value::Text("  padded  ".into()), Value::Text("ok".into())],
        )])
        .unwrap();
        trim_text_cells(&mut table);
        assert_eq!(
            table.columns()[0].values,
            vec![Value::Text("padded".into()), Value::Text("ok".into())]
        );
    }

    #[test]
    fn imputed_mean_matches_precomputed_mean() {
        let mut table = Table::new(vec![Column::new(
            "Age",
            vec![
                Value::Number(30.0),
                Value::Number(30.0),
                Value::Number(25.0),
                Value::Missing,
            ],
        )])
        .unwrap();
        impute_missing(&mut table);
        let expected = (30.0 + 30.0 + 25.0) / 3.0;
        assert_eq!(table.columns()[0].values[3], Value::Number(expected));
        assert!(!table.columns()[0].values.iter().any(Value::is_missing));
    }
}
