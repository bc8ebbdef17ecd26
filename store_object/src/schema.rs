//! Schema compilation
//!
//! A model is declared as an ordered list of [`FieldDescriptor`]s. Compiling
//! the list produces a [`ModelSchema`]: the primary key, the ordered non-key
//! fields, the field/column mapping and the four statement templates every
//! record operation is built from. Templates use `?` as the portable
//! placeholder; the executor rewrites them for the backing store.

use std::collections::HashMap;
use std::fmt;

use type_mapping::{default_ddl, quote_identifier, SqlValue, StorageType};

use crate::errors::SchemaError;
use crate::validation::validate_identifier;

/// Default applied to a field that is absent when a record is inserted
#[derive(Clone)]
pub enum DefaultValue {
    Literal(SqlValue),
    /// Evaluated lazily, once per record, at insert time
    Producer(fn() -> SqlValue),
}

impl DefaultValue {
    pub fn resolve(&self) -> SqlValue {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Producer(produce) => produce(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Declaration of one model field
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    column: String,
    storage: StorageType,
    ddl: String,
    primary_key: bool,
    default: Option<DefaultValue>,
    held: Option<StorageType>,
}

impl FieldDescriptor {
    /// New field with the storage kind's default DDL type and default value.
    ///
    /// Boolean, integer and float fields default to their zero value; string
    /// and text fields have no default.
    pub fn new(name: &str, storage: StorageType) -> Self {
        let default = match storage {
            StorageType::Boolean => Some(DefaultValue::Literal(SqlValue::Bool(false))),
            StorageType::Integer => Some(DefaultValue::Literal(SqlValue::Int(0))),
            StorageType::Float => Some(DefaultValue::Literal(SqlValue::Float(0.0))),
            StorageType::String | StorageType::Text => None,
        };
        Self {
            name: name.to_string(),
            column: name.to_string(),
            storage,
            ddl: default_ddl(storage).to_string(),
            primary_key: false,
            default,
            held: None,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, StorageType::String)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, StorageType::Boolean)
    }

    pub fn integer(name: &str) -> Self {
        Self::new(name, StorageType::Integer)
    }

    pub fn float(name: &str) -> Self {
        Self::new(name, StorageType::Float)
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, StorageType::Text)
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<SqlValue>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    pub fn default_with(mut self, produce: fn() -> SqlValue) -> Self {
        self.default = Some(DefaultValue::Producer(produce));
        self
    }

    pub fn no_default(mut self) -> Self {
        self.default = None;
        self
    }

    /// Store the field under a different column name
    pub fn column(mut self, column: &str) -> Self {
        self.column = column.to_string();
        self
    }

    /// Record the storage kind of the Rust type backing this field
    pub fn held_as(mut self, held: StorageType) -> Self {
        self.held = Some(held);
        self
    }

    pub fn ddl(mut self, ddl: &str) -> Self {
        self.ddl = ddl.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_name(&self) -> &str {
        &self.column
    }

    pub fn storage(&self) -> StorageType {
        self.storage
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }
}

/// Compiled, immutable SQL metadata for one model type
#[derive(Debug)]
pub struct ModelSchema {
    table_name: String,
    primary_key: String,
    fields: Vec<String>,
    declared: Vec<String>,
    mappings: HashMap<String, FieldDescriptor>,
    columns: HashMap<String, String>,
    select_sql: String,
    insert_sql: String,
    update_sql: String,
    delete_sql: String,
}

/// `?, ?, ?` with `count` markers
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

impl ModelSchema {
    pub fn compile(table_name: &str, declared: Vec<FieldDescriptor>) -> Result<Self, SchemaError> {
        validate_identifier(table_name)?;

        let mut primary_key: Option<String> = None;
        let mut fields = Vec::new();
        let mut order = Vec::with_capacity(declared.len());
        let mut mappings = HashMap::with_capacity(declared.len());
        let mut columns = HashMap::with_capacity(declared.len());

        for field in declared {
            validate_identifier(&field.name)?;
            validate_identifier(&field.column)?;
            if mappings.contains_key(&field.name) || columns.contains_key(&field.column) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }

            if let Some(held) = field.held.filter(|held| !field.storage.accepts(*held)) {
                return Err(SchemaError::KindMismatch {
                    field: field.name.clone(),
                    declared: field.storage,
                    held,
                });
            }

            tracing::debug!("found mapping: {} ==> {:?}", field.name, field.storage);
            if field.primary_key {
                if primary_key.is_some() {
                    return Err(SchemaError::DuplicatePrimaryKey(field.name.clone()));
                }
                primary_key = Some(field.name.clone());
            } else {
                fields.push(field.name.clone());
            }
            order.push(field.name.clone());
            columns.insert(field.column.clone(), field.name.clone());
            mappings.insert(field.name.clone(), field);
        }

        let primary_key =
            primary_key.ok_or_else(|| SchemaError::MissingPrimaryKey(table_name.to_string()))?;

        let quote = |field: &String| quote_identifier(&mappings[field].column);
        let table = quote_identifier(table_name);
        let key = quote(&primary_key);
        let escaped: Vec<String> = fields.iter().map(quote).collect();

        let select_sql = if escaped.is_empty() {
            format!("SELECT {} FROM {}", key, table)
        } else {
            format!("SELECT {}, {} FROM {}", key, escaped.join(", "), table)
        };
        let insert_columns: Vec<&str> = escaped
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(key.as_str()))
            .collect();
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            insert_columns.join(", "),
            placeholders(insert_columns.len())
        );
        let assignments: Vec<String> = escaped.iter().map(|c| format!("{}=?", c)).collect();
        let update_sql = format!(
            "UPDATE {} SET {} WHERE {}=?",
            table,
            assignments.join(", "),
            key
        );
        let delete_sql = format!("DELETE FROM {} WHERE {}=?", table, key);

        tracing::info!("found model table: {} (primary key: {})", table_name, primary_key);

        Ok(Self {
            table_name: table_name.to_string(),
            primary_key,
            fields,
            declared: order,
            mappings,
            columns,
            select_sql,
            insert_sql,
            update_sql,
            delete_sql,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Non-key field names in declaration order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.mappings.get(name)
    }

    /// Field name stored under `column`
    pub fn field_for_column(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    pub fn quoted_table(&self) -> String {
        quote_identifier(&self.table_name)
    }

    pub fn quoted_primary_key(&self) -> String {
        quote_identifier(&self.mappings[&self.primary_key].column)
    }

    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    pub fn update_sql(&self) -> &str {
        &self.update_sql
    }

    pub fn delete_sql(&self) -> &str {
        &self.delete_sql
    }

    /// Generate CREATE TABLE SQL statement
    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self
            .declared
            .iter()
            .map(|name| {
                let field = &self.mappings[name];
                if field.primary_key {
                    format!(
                        "{} {} NOT NULL PRIMARY KEY",
                        quote_identifier(&field.column),
                        field.ddl
                    )
                } else {
                    format!("{} {}", quote_identifier(&field.column), field.ddl)
                }
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.quoted_table(),
            columns.join(", ")
        )
    }

    /// Generate DROP TABLE SQL statement
    pub fn drop_table_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quoted_table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn user_fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::string("id").primary_key().ddl("varchar(50)"),
            FieldDescriptor::string("email").ddl("varchar(50)"),
            FieldDescriptor::boolean("admin"),
            FieldDescriptor::float("created_at"),
        ]
    }

    fn marker_count(sql: &str) -> usize {
        sql.matches('?').count()
    }

    #[test]
    fn test_templates() {
        let schema = ModelSchema::compile("users", user_fields()).unwrap();

        assert_eq!(schema.primary_key(), "id");
        assert_eq!(schema.fields(), &["email", "admin", "created_at"]);
        assert_eq!(
            schema.select_sql(),
            r#"SELECT "id", "email", "admin", "created_at" FROM "users""#
        );
        assert_eq!(
            schema.insert_sql(),
            r#"INSERT INTO "users" ("email", "admin", "created_at", "id") VALUES (?, ?, ?, ?)"#
        );
        assert_eq!(
            schema.update_sql(),
            r#"UPDATE "users" SET "email"=?, "admin"=?, "created_at"=? WHERE "id"=?"#
        );
        assert_eq!(schema.delete_sql(), r#"DELETE FROM "users" WHERE "id"=?"#);
    }

    #[test]
    fn test_placeholder_counts_match_columns() {
        let schema = ModelSchema::compile("users", user_fields()).unwrap();
        let columns = schema.fields().len() + 1;

        assert_eq!(marker_count(schema.select_sql()), 0);
        assert_eq!(marker_count(schema.insert_sql()), columns);
        assert_eq!(marker_count(schema.update_sql()), columns);
        assert_eq!(marker_count(schema.delete_sql()), 1);
    }

    #[test]
    fn test_duplicate_primary_key() {
        let result = ModelSchema::compile(
            "users",
            vec![
                FieldDescriptor::string("id").primary_key(),
                FieldDescriptor::string("email").primary_key(),
            ],
        );
        assert_eq!(
            result.unwrap_err(),
            SchemaError::DuplicatePrimaryKey("email".into())
        );
    }

    #[test]
    fn test_missing_primary_key() {
        let result = ModelSchema::compile("users", vec![FieldDescriptor::string("email")]);
        assert_eq!(
            result.unwrap_err(),
            SchemaError::MissingPrimaryKey("users".into())
        );
    }

    #[test]
    fn test_invalid_identifier_rejected() {
        let result = ModelSchema::compile(
            "users",
            vec![
                FieldDescriptor::string("id").primary_key(),
                FieldDescriptor::string("name\"; --"),
            ],
        );
        assert!(matches!(result, Err(SchemaError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_declared_kind_must_accept_rust_type() {
        let result = ModelSchema::compile(
            "users",
            vec![
                FieldDescriptor::string("id").primary_key().held_as(StorageType::String),
                FieldDescriptor::boolean("admin").held_as(StorageType::Integer),
            ],
        );
        assert_eq!(
            result.unwrap_err(),
            SchemaError::KindMismatch {
                field: "admin".into(),
                declared: StorageType::Boolean,
                held: StorageType::Integer,
            }
        );

        // String values fit both string and text columns
        let schema = ModelSchema::compile(
            "users",
            vec![
                FieldDescriptor::string("id").primary_key().held_as(StorageType::String),
                FieldDescriptor::text("bio").held_as(StorageType::String),
            ],
        );
        assert!(schema.is_ok());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = ModelSchema::compile(
            "users",
            vec![
                FieldDescriptor::string("id").primary_key(),
                FieldDescriptor::string("email"),
                FieldDescriptor::text("email"),
            ],
        );
        assert_eq!(result.unwrap_err(), SchemaError::DuplicateField("email".into()));
    }

    #[test]
    fn test_column_rename_used_everywhere() {
        let schema = ModelSchema::compile(
            "blogs",
            vec![
                FieldDescriptor::string("id").primary_key(),
                FieldDescriptor::text("content").column("body"),
            ],
        )
        .unwrap();

        assert_eq!(schema.select_sql(), r#"SELECT "id", "body" FROM "blogs""#);
        assert_eq!(schema.update_sql(), r#"UPDATE "blogs" SET "body"=? WHERE "id"=?"#);
        assert_eq!(schema.field_for_column("body"), Some("content"));
        assert_eq!(schema.field_for_column("content"), None);
    }

    #[test]
    fn test_kind_defaults() {
        assert!(FieldDescriptor::string("s").default().is_none());
        assert!(FieldDescriptor::text("t").default().is_none());
        assert_eq!(
            FieldDescriptor::integer("i").default().map(DefaultValue::resolve),
            Some(SqlValue::Int(0))
        );
        assert_eq!(
            FieldDescriptor::boolean("b").default().map(DefaultValue::resolve),
            Some(SqlValue::Bool(false))
        );
    }

    #[test]
    fn test_create_table_sql() {
        let schema = ModelSchema::compile("users", user_fields()).unwrap();
        assert_eq!(
            schema.create_table_sql(),
            r#"CREATE TABLE IF NOT EXISTS "users" ("id" varchar(50) NOT NULL PRIMARY KEY, "email" varchar(50), "admin" boolean, "created_at" double precision)"#
        );
    }
}
