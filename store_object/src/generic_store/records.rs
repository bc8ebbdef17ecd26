//! Record operations
//!
//! Each operation is exactly one executor call built from the model's
//! compiled templates. Insert, update and delete check that one row was
//! affected, but only log a warning when it wasn't: the count is handed back
//! so callers that care can act on it.

use super::core::ModelStore;
use crate::errors::StoreError;
use crate::model::Model;
use crate::query_builder::{find_by_key_sql, find_number_sql, FindQuery, NUMBER_ALIAS};
use type_mapping::SqlValue;

impl<T: Model> ModelStore<T> {
    /// Look a record up by primary key
    pub async fn find(&self, key: impl Into<SqlValue> + Send) -> Result<Option<T>, StoreError> {
        let sql = find_by_key_sql(T::schema());
        let rows = self.executor.select(&sql, &[key.into()], Some(1)).await?;
        rows.into_iter().next().map(T::from_row).transpose()
    }

    /// Records matching `query`
    pub async fn find_all(&self, query: FindQuery) -> Result<Vec<T>, StoreError> {
        let (sql, args) = query.build(T::schema())?;
        let rows = self.executor.select(&sql, &args, None).await?;
        rows.into_iter().map(T::from_row).collect()
    }

    /// Single aggregate value, e.g. `count(id)`; `None` when no row came back
    pub async fn find_number(
        &self,
        expression: &str,
        where_clause: Option<&str>,
        args: Vec<SqlValue>,
    ) -> Result<Option<SqlValue>, StoreError> {
        let sql = find_number_sql(T::schema(), expression, where_clause);
        let rows = self.executor.select(&sql, &args, Some(1)).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.get(NUMBER_ALIAS).cloned()))
    }

    /// Insert `record`, filling absent fields from their defaults
    pub async fn save(&self, record: &mut T) -> Result<u64, StoreError> {
        let schema = T::schema();
        let mut args = Vec::with_capacity(schema.fields().len() + 1);
        for field in schema.fields() {
            args.push(record.value_or_default(field)?);
        }
        args.push(record.value_or_default(schema.primary_key())?);

        let rows = self.executor.execute(schema.insert_sql(), &args, false).await?;
        if rows != 1 {
            tracing::warn!("failed to insert record: affected rows: {}", rows);
        }
        Ok(rows)
    }

    /// Write every field's current value back under the record's key
    pub async fn update(&self, record: &T) -> Result<u64, StoreError> {
        let schema = T::schema();
        let mut args: Vec<SqlValue> = schema
            .fields()
            .iter()
            .map(|field| record.value(field).unwrap_or(SqlValue::Null))
            .collect();
        args.push(record.value(schema.primary_key()).unwrap_or(SqlValue::Null));

        let rows = self.executor.execute(schema.update_sql(), &args, false).await?;
        if rows != 1 {
            tracing::warn!("failed to update by primary key: affected rows: {}", rows);
        }
        Ok(rows)
    }

    /// Delete the row stored under the record's key
    pub async fn remove(&self, record: &T) -> Result<u64, StoreError> {
        let schema = T::schema();
        let key = record.value(schema.primary_key()).unwrap_or(SqlValue::Null);

        let rows = self.executor.execute(schema.delete_sql(), &[key], false).await?;
        if rows != 1 {
            tracing::warn!("failed to remove by primary key: affected rows: {}", rows);
        }
        Ok(rows)
    }
}
