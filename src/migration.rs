//! Database migration functionality
//!
//! Creates model tables from their compiled schemas.

use store_object::{Model, QueryExecutor};

use crate::debug_log;
use crate::errors::WeblogError;

/// Create the table for `T` if it doesn't exist.
/// If recreate is true, drops the existing table first.
pub async fn auto_migrate<T: Model>(
    executor: &QueryExecutor,
    recreate: bool,
) -> Result<(), WeblogError> {
    let schema = T::register()?;

    if recreate {
        let drop_sql = schema.drop_table_sql();
        tracing::info!("Dropping table with SQL: {}", drop_sql);
        executor.execute(&drop_sql, &[], false).await?;
    }

    let create_table_sql = schema.create_table_sql();
    tracing::info!("Creating table with SQL: {}", create_table_sql);
    executor.execute(&create_table_sql, &[], false).await?;
    debug_log!("table {} ready", schema.table_name());

    Ok(())
}
