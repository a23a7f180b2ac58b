//! SQL string builders for common catalog and federated-join queries.
//!
//! These are plain string concatenations: identifiers and conditions are
//! inserted verbatim, with no quoting or escaping.

use crate::error::{FqeError, Result};

/// Catalog query used when no database is given to [`table_list`].
pub const FEDERATED_TABLES_QUERY: &str = "SELECT * FROM federated_tables";

/// Lists attached databases.
pub fn show_databases() -> String {
    "SHOW DATABASES".to_string()
}

/// Returns the engine version.
pub fn version() -> String {
    "SELECT version()".to_string()
}

/// Lists tables in `database`, or all federated tables.
pub fn table_list(database: Option<&str>) -> String {
    match database {
        Some(db) => format!("SHOW TABLES FROM {db}"),
        None => FEDERATED_TABLES_QUERY.to_string(),
    }
}

/// Describes the columns of `table` (`database.schema.table`).
pub fn describe(table: &str) -> String {
    format!("DESCRIBE {table}")
}

/// Counts the rows of `table`.
pub fn row_count(table: &str) -> String {
    format!("SELECT COUNT(*) AS count FROM {table}")
}

/// A multi-table join across attached catalogs.
///
/// `join_conditions[i]` is the `ON` clause for `tables[i + 1]`. Tables past
/// the last condition are appended as a plain cross join; surplus conditions
/// are ignored. Callers are expected to pass matching counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FederatedJoin {
    pub tables: Vec<String>,
    pub join_conditions: Vec<String>,
    pub select_columns: Vec<String>,
    pub where_conditions: Vec<String>,
    pub order_by: Vec<String>,
    pub limit: Option<u64>,
}

impl FederatedJoin {
    /// Creates a join over `tables` with the given `ON` conditions.
    pub fn new<T, C>(tables: T, join_conditions: C) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
            join_conditions: join_conditions.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Sets the selected columns (default `*`).
    pub fn select<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.select_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the `WHERE` conditions, joined with `AND`.
    pub fn filter<I>(mut self, conditions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.where_conditions = conditions.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the `ORDER BY` expressions.
    pub fn order_by<I>(mut self, expressions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.order_by = expressions.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the row limit. A limit of zero is treated as no limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Builds the SQL statement.
    pub fn to_sql(&self) -> Result<String> {
        let (first, rest) = self
            .tables
            .split_first()
            .ok_or_else(|| FqeError::invalid_request("federated join needs at least one table"))?;

        let select_clause = if self.select_columns.is_empty() {
            "*".to_string()
        } else {
            self.select_columns.join(", ")
        };

        let mut from_clause = first.clone();
        for (i, table) in rest.iter().enumerate() {
            match self.join_conditions.get(i) {
                Some(condition) => {
                    from_clause.push_str(&format!(" JOIN {table} ON {condition}"));
                }
                None => from_clause.push_str(&format!(", {table}")),
            }
        }

        let mut sql = format!("SELECT {select_clause} FROM {from_clause}");

        if !self.where_conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_conditions.join(" AND "));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        if let Some(limit) = self.limit.filter(|n| *n > 0) {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        Ok(sql)
    }
}
