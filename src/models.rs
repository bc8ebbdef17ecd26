//! Blog models
//!
//! Ids are 50 characters: 15 digits of epoch milliseconds, a v4 uuid in
//! hex and a `000` suffix, so they sort by creation time.

use chrono::Utc;
use store_object::model;
use type_mapping::SqlValue;
use uuid::Uuid;

/// Fresh time-prefixed record id
pub fn next_id() -> String {
    format!(
        "{:015}{}000",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

/// Current time as float seconds since the epoch
pub fn now_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

fn id_default() -> SqlValue {
    SqlValue::Text(next_id())
}

fn created_default() -> SqlValue {
    SqlValue::Float(now_seconds())
}

model! {
    /// A registered account
    pub struct User in "users" {
        id: String => string.primary_key().default_with(id_default).ddl("varchar(50)"),
        email: String => string.ddl("varchar(50)"),
        passwd: String => string.ddl("varchar(50)"),
        admin: bool => boolean,
        name: String => string.ddl("varchar(50)"),
        image: String => string.ddl("varchar(500)"),
        created_at: f64 => float.default_with(created_default),
    }
}

model! {
    pub struct Blog in "blogs" {
        id: String => string.primary_key().default_with(id_default).ddl("varchar(50)"),
        user_id: String => string.ddl("varchar(50)"),
        user_name: String => string.ddl("varchar(50)"),
        user_image: String => string.ddl("varchar(500)"),
        name: String => string.ddl("varchar(50)"),
        summary: String => string.ddl("varchar(200)"),
        content: String => text,
        created_at: f64 => float.default_with(created_default),
    }
}

model! {
    pub struct Comment in "comments" {
        id: String => string.primary_key().default_with(id_default).ddl("varchar(50)"),
        blog_id: String => string.ddl("varchar(50)"),
        user_id: String => string.ddl("varchar(50)"),
        user_name: String => string.ddl("varchar(50)"),
        user_image: String => string.ddl("varchar(500)"),
        content: String => text,
        created_at: f64 => float.default_with(created_default),
    }
}
