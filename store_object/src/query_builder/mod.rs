//! Query builder utilities
//!
//! Composes listing and aggregate statements on top of a model's compiled
//! select template.

pub mod pagination;

use type_mapping::SqlValue;

use crate::errors::StoreError;
use crate::schema::ModelSchema;

pub use pagination::Page;

/// Alias the aggregate column is read back from
pub const NUMBER_ALIAS: &str = "_num_";

/// LIMIT clause shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Count(i64),
    Window { offset: i64, count: i64 },
}

impl Limit {
    fn validate(&self) -> Result<(), StoreError> {
        match *self {
            Limit::Count(count) if count < 0 => {
                Err(StoreError::InvalidLimit(format!("{}", count)))
            }
            Limit::Window { offset, count } if offset < 0 || count < 0 => {
                Err(StoreError::InvalidLimit(format!("({}, {})", offset, count)))
            }
            _ => Ok(()),
        }
    }
}

impl TryFrom<&serde_json::Value> for Limit {
    type Error = StoreError;

    /// Accepts `n` or `[offset, count]`
    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        let invalid = || StoreError::InvalidLimit(value.to_string());
        let limit = match value {
            serde_json::Value::Number(n) => Limit::Count(n.as_i64().ok_or_else(invalid)?),
            serde_json::Value::Array(pair) if pair.len() == 2 => Limit::Window {
                offset: pair[0].as_i64().ok_or_else(invalid)?,
                count: pair[1].as_i64().ok_or_else(invalid)?,
            },
            _ => return Err(invalid()),
        };
        limit.validate()?;
        Ok(limit)
    }
}

/// Options for a listing query
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    where_clause: Option<String>,
    args: Vec<SqlValue>,
    order_by: Option<String>,
    limit: Option<Limit>,
}

impl FindQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw WHERE fragment with `?` markers and its arguments
    pub fn filter(mut self, where_clause: &str, args: Vec<SqlValue>) -> Self {
        self.where_clause = Some(where_clause.to_string());
        self.args = args;
        self
    }

    pub fn order_by(mut self, order_by: &str) -> Self {
        self.order_by = Some(order_by.to_string());
        self
    }

    pub fn limit(mut self, limit: Limit) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Statement text and arguments for this query against `schema`
    pub fn build(&self, schema: &ModelSchema) -> Result<(String, Vec<SqlValue>), StoreError> {
        let mut sql = vec![schema.select_sql().to_string()];
        let mut args = self.args.clone();

        if let Some(where_clause) = &self.where_clause {
            sql.push("WHERE".to_string());
            sql.push(where_clause.clone());
        }
        if let Some(order_by) = &self.order_by {
            sql.push("ORDER BY".to_string());
            sql.push(order_by.clone());
        }
        if let Some(limit) = self.limit {
            limit.validate()?;
            match limit {
                Limit::Count(count) => {
                    sql.push("LIMIT ?".to_string());
                    args.push(SqlValue::Int(count));
                }
                Limit::Window { offset, count } => {
                    sql.push("LIMIT ? OFFSET ?".to_string());
                    args.push(SqlValue::Int(count));
                    args.push(SqlValue::Int(offset));
                }
            }
        }

        Ok((sql.join(" "), args))
    }
}

/// Select statement looking a record up by primary key
pub fn find_by_key_sql(schema: &ModelSchema) -> String {
    format!(
        "{} WHERE {}=?",
        schema.select_sql(),
        schema.quoted_primary_key()
    )
}

/// `SELECT <expression> AS _num_ FROM <table> [WHERE ...]`
pub fn find_number_sql(schema: &ModelSchema, expression: &str, where_clause: Option<&str>) -> String {
    let mut sql = format!(
        "SELECT {} AS {} FROM {}",
        expression,
        NUMBER_ALIAS,
        schema.quoted_table()
    );
    if let Some(where_clause) = where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(where_clause);
    }
    sql
}
