//! Model declaration
//!
//! Records are plain structs with typed fields. Alongside the values each
//! record tracks which fields are still unset, so inserts can tell an absent
//! value (default applies) from a present zero value (kept as is).
//!
//! ```
//! use store_object::model;
//!
//! model! {
//!     /// A tag attached to posts
//!     pub struct Tag in "tags" {
//!         id: String => string.primary_key(),
//!         label: String => string.ddl("varchar(30)"),
//!         uses: i64 => integer,
//!     }
//! }
//!
//! use store_object::Model;
//! let mut tag = Tag::new();
//! tag.set("label", "rust").unwrap();
//! assert_eq!(tag.label().map(String::as_str), Some("rust"));
//! assert!(tag.uses().is_none());
//! ```

use std::collections::BTreeSet;
use std::sync::OnceLock;

use type_mapping::SqlValue;

use crate::errors::{SchemaError, StoreError};
use crate::executor::Row;
use crate::schema::{FieldDescriptor, ModelSchema};

/// Names of fields that hold no value yet
pub type FieldSet = BTreeSet<&'static str>;

/// A record type backed by a compiled schema
pub trait Model: Sized + Send + Sync + 'static {
    /// Compile the schema if needed and return it, or the declaration error
    fn register() -> Result<&'static ModelSchema, SchemaError>;

    /// The compiled schema.
    ///
    /// Panics if the declaration is invalid; call [`Model::register`] at
    /// startup to surface that as an error instead.
    fn schema() -> &'static ModelSchema;

    /// A record with every field unset
    fn blank() -> Self;

    /// Current value of `field`, `None` when unset or unknown
    fn value(&self, field: &str) -> Option<SqlValue>;

    /// Assign `field`. A NULL value marks the field unset again.
    fn set(&mut self, field: &str, value: impl Into<SqlValue>) -> Result<(), StoreError>;

    /// Materialize a record from a result row keyed by column name
    fn from_row(row: Row) -> Result<Self, StoreError> {
        let schema = Self::schema();
        let mut record = Self::blank();
        for (column, value) in row {
            let field = schema
                .field_for_column(&column)
                .ok_or_else(|| StoreError::UnknownField {
                    table: schema.table_name().to_string(),
                    field: column.clone(),
                })?;
            record.set(field, value)?;
        }
        Ok(record)
    }

    /// Current value, or the field's default when unset.
    ///
    /// A resolved default is written back onto the record, so a producer runs
    /// at most once per record.
    fn value_or_default(&mut self, field: &str) -> Result<SqlValue, StoreError> {
        if let Some(value) = self.value(field) {
            return Ok(value);
        }
        let default = Self::schema().field(field).and_then(FieldDescriptor::default);
        match default {
            Some(default) => {
                let value = default.resolve();
                tracing::debug!("using default value for {}: {}", field, value);
                self.set(field, value.clone())?;
                Ok(value)
            }
            None => Ok(SqlValue::Null),
        }
    }
}

/// Compile the schema into `cell` once
pub fn register_schema(
    cell: &'static OnceLock<ModelSchema>,
    table: &str,
    declare: fn() -> Vec<FieldDescriptor>,
) -> Result<&'static ModelSchema, SchemaError> {
    if let Some(schema) = cell.get() {
        return Ok(schema);
    }
    let compiled = ModelSchema::compile(table, declare())?;
    Ok(cell.get_or_init(|| compiled))
}

/// Schema in `cell`, compiling it on first use
pub fn force_schema(
    cell: &'static OnceLock<ModelSchema>,
    table: &str,
    declare: fn() -> Vec<FieldDescriptor>,
) -> &'static ModelSchema {
    cell.get_or_init(|| {
        ModelSchema::compile(table, declare())
            .unwrap_or_else(|e| panic!("invalid model declaration for {}: {}", table, e))
    })
}

/// Declare a model struct and its schema.
///
/// Each field is `name: RustType => constructor` where the constructor is one
/// of the [`FieldDescriptor`] kind constructors (`string`, `boolean`,
/// `integer`, `float`, `text`) optionally followed by builder calls.
#[macro_export]
macro_rules! model {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident in $table:literal {
            $( $field:ident : $ty:ty => $kind:ident $( . $builder:ident ( $($arg:expr),* ) )* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            $( $field: $ty, )+
            unset: $crate::model::FieldSet,
        }

        impl $name {
            /// A new record with every field unset
            pub fn new() -> Self {
                Self {
                    $( $field: <$ty as ::std::default::Default>::default(), )+
                    unset: [$( stringify!($field) ),+].into_iter().collect(),
                }
            }

            $(
                pub fn $field(&self) -> ::std::option::Option<&$ty> {
                    if self.unset.contains(stringify!($field)) {
                        ::std::option::Option::None
                    } else {
                        ::std::option::Option::Some(&self.$field)
                    }
                }
            )+

            fn schema_cell() -> &'static ::std::sync::OnceLock<$crate::schema::ModelSchema> {
                static CELL: ::std::sync::OnceLock<$crate::schema::ModelSchema> =
                    ::std::sync::OnceLock::new();
                &CELL
            }

            fn declare() -> ::std::vec::Vec<$crate::schema::FieldDescriptor> {
                ::std::vec![
                    $(
                        $crate::schema::FieldDescriptor::$kind(stringify!($field))
                            $( .$builder($($arg),*) )*
                            .held_as(<$ty as $crate::type_mapping::FieldValue>::STORAGE)
                    ),+
                ]
            }
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $crate::model::Model for $name {
            fn register() -> ::std::result::Result<&'static $crate::schema::ModelSchema, $crate::errors::SchemaError> {
                $crate::model::register_schema(Self::schema_cell(), $table, Self::declare)
            }

            fn schema() -> &'static $crate::schema::ModelSchema {
                $crate::model::force_schema(Self::schema_cell(), $table, Self::declare)
            }

            fn blank() -> Self {
                Self::new()
            }

            fn value(&self, field: &str) -> ::std::option::Option<$crate::type_mapping::SqlValue> {
                match field {
                    $(
                        stringify!($field) if !self.unset.contains(stringify!($field)) => {
                            ::std::option::Option::Some(
                                $crate::type_mapping::FieldValue::into_sql(self.$field.clone()),
                            )
                        }
                    )+
                    _ => ::std::option::Option::None,
                }
            }

            fn set(
                &mut self,
                field: &str,
                value: impl ::std::convert::Into<$crate::type_mapping::SqlValue>,
            ) -> ::std::result::Result<(), $crate::errors::StoreError> {
                let value = value.into();
                match field {
                    $(
                        stringify!($field) => {
                            if value.is_null() {
                                self.$field = <$ty as ::std::default::Default>::default();
                                self.unset.insert(stringify!($field));
                            } else {
                                self.$field = <$ty as $crate::type_mapping::FieldValue>::from_sql(value)
                                    .map_err(|e| $crate::errors::StoreError::field_type(field, e))?;
                                self.unset.remove(stringify!($field));
                            }
                            ::std::result::Result::Ok(())
                        }
                    )+
                    _ => ::std::result::Result::Err($crate::errors::StoreError::UnknownField {
                        table: $table.to_string(),
                        field: field.to_string(),
                    }),
                }
            }
        }

        impl $crate::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: $crate::serde::Serializer,
            {
                use $crate::serde::ser::SerializeMap;
                use $crate::model::Model;
                let mut map = serializer.serialize_map(None)?;
                $(
                    map.serialize_entry(
                        stringify!($field),
                        &self.value(stringify!($field)).unwrap_or($crate::type_mapping::SqlValue::Null),
                    )?;
                )+
                map.end()
            }
        }
    };
}
