//! Uniform tabular representation of query results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Column names plus rows of JSON cells.
///
/// Every row holds exactly `columns.len()` cells; [`Table::new`] pads or
/// widens as needed so the invariant holds for any input. Deserialization
/// goes through [`Table::new`] as well.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "TableParts")]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

static NULL: Value = Value::Null;

#[derive(Deserialize)]
struct TableParts {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

impl From<TableParts> for Table {
    fn from(parts: TableParts) -> Self {
        Table::new(parts.columns, parts.rows)
    }
}

impl Table {
    /// Creates a table, generating names for unnamed columns and padding
    /// short rows with nulls.
    pub fn new(mut columns: Vec<String>, mut rows: Vec<Vec<Value>>) -> Self {
        let width = rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(columns.len());

        for i in columns.len()..width {
            columns.push(format!("column{i}"));
        }
        for row in &mut rows {
            row.resize(width, Value::Null);
        }

        Self { columns, rows }
    }

    /// A one-row, one-column table.
    pub fn single(column: impl Into<String>, value: Value) -> Self {
        Self {
            columns: vec![column.into()],
            rows: vec![vec![value]],
        }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first row's first cell, if any.
    pub fn first_cell(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }

    /// Index of the named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cells of the named column, in row order. Missing cells read as null.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).unwrap_or(&NULL))
                .collect(),
        )
    }

    /// All cells of the first column rendered as strings.
    pub fn first_column_strings(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first())
            .map(display_value)
            .collect()
    }
}

/// Renders a cell for humans: strings unquoted, null as `NULL`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reads an integer cell. Numeric strings are accepted since `JSONCompact`
/// quotes 64-bit integers. Values outside the `i64` range give `None`.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) if n.is_u64() => n.as_u64().and_then(|u| i64::try_from(u).ok()),
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a floating-point cell, accepting numeric strings.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(display_value).collect())
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                cells
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |values: &[String]| -> String {
            values
                .iter()
                .zip(&widths)
                .map(|(v, w)| format!("{v:<w$}"))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        writeln!(f, "{}", line(&self.columns))?;
        let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", separator.join("-+-"))?;
        for row in &cells {
            writeln!(f, "{}", line(row))?;
        }
        let noun = if self.rows.len() == 1 { "row" } else { "rows" };
        write!(f, "({} {noun})", self.rows.len())
    }
}
