//! Query response types and normalization.
//!
//! The service does not commit to one response format, so every 200 body is
//! classified exactly once into a [`QueryResponse`] and can then be reshaped
//! into a uniform [`Table`] without further shape-sniffing.

mod table;

pub use table::{display_value, value_as_f64, value_as_i64, Table};

use serde_json::{Map, Value};

/// A successful response from the query service, classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResponse {
    /// Column names plus row arrays (`{columns, data}` or `JSONCompact`).
    Tabular {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },

    /// A list of row objects keyed by column name.
    Records(Vec<Map<String, Value>>),

    /// Any other JSON value.
    Scalar(Value),

    /// A 200 body that was not JSON.
    RawText(String),
}

impl QueryResponse {
    /// Classifies a decoded JSON body.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => match tabular_parts(&map) {
                Some((columns, rows)) => Self::Tabular { columns, rows },
                None => Self::Scalar(Value::Object(map)),
            },
            Value::Array(items) if items.iter().all(Value::is_object) => Self::Records(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .collect(),
            ),
            other => Self::Scalar(other),
        }
    }

    /// Classifies a raw 200 body: JSON if it parses, plain text otherwise.
    pub fn from_body(body: String) -> Self {
        match serde_json::from_str::<Value>(&body) {
            Ok(value) => Self::from_json(value),
            Err(_) => Self::RawText(body),
        }
    }

    /// Returns a short name for the response shape, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tabular { .. } => "tabular",
            Self::Records(_) => "records",
            Self::Scalar(_) => "scalar",
            Self::RawText(_) => "text",
        }
    }

    /// Reshapes the response into a uniform table. Never fails.
    pub fn into_table(self) -> Table {
        match self {
            Self::Tabular { columns, rows } => Table::new(columns, rows),
            Self::Records(records) => records_to_table(records),
            Self::Scalar(value) => scalar_to_table(value),
            Self::RawText(text) => Table::single("result", Value::String(text)),
        }
    }
}

impl From<QueryResponse> for Table {
    fn from(response: QueryResponse) -> Self {
        response.into_table()
    }
}

/// Extracts `(columns, rows)` from an object that carries a row matrix.
fn tabular_parts(map: &Map<String, Value>) -> Option<(Vec<String>, Vec<Vec<Value>>)> {
    let rows = ["data", "rows"]
        .iter()
        .filter_map(|key| map.get(*key))
        .find_map(|value| match value {
            Value::Array(items) if items.iter().all(Value::is_array) => Some(items),
            _ => None,
        })?;

    let rows = rows
        .iter()
        .map(|row| row.as_array().cloned().unwrap_or_default())
        .collect();

    let columns = ["columns", "meta"]
        .iter()
        .filter_map(|key| map.get(*key))
        .find_map(|value| value.as_array().map(|items| column_names(items)))
        .unwrap_or_default();

    Some((columns, rows))
}

/// Column names from either plain strings or `{"name": ...}` descriptors.
fn column_names(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .map(|item| match item {
            Value::String(name) => name.clone(),
            Value::Object(desc) => desc
                .get("name")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| item.to_string()),
            other => other.to_string(),
        })
        .collect()
}

fn records_to_table(records: Vec<Map<String, Value>>) -> Table {
    let mut columns: Vec<String> = Vec::new();
    for record in &records {
        for key in record.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|column| record.get(column).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Table::new(columns, rows)
}

fn scalar_to_table(value: Value) -> Table {
    match value {
        Value::Object(map) if map.is_empty() => Table::single("value", Value::Object(map)),
        Value::Object(map) => {
            let (columns, row) = map.into_iter().unzip();
            Table::new(columns, vec![row])
        }
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_array) => {
            let rows = items
                .into_iter()
                .map(|item| match item {
                    Value::Array(row) => row,
                    other => vec![other],
                })
                .collect();
            Table::new(Vec::new(), rows)
        }
        Value::Array(items) if items.iter().all(|v| !v.is_array() && !v.is_object()) => {
            Table::new(
                vec!["value".to_string()],
                items.into_iter().map(|v| vec![v]).collect(),
            )
        }
        other => Table::single("value", other),
    }
}
