//! Template value filters
//!
//! [`AgeAnnotator`] wraps the application's [`TemplateRenderer`]: every
//! object in the template context that carries a numeric `created_at` gets a
//! `created_ago` string next to it, so templates print ages without a filter
//! language of their own.

use std::sync::Arc;

use chrono::{DateTime, Datelike};
use dispatcher::{RenderError, TemplateRenderer};
use serde_json::{Map, Value};

use crate::models::now_seconds;

/// Human-readable age of a `created_at` timestamp relative to `now`
pub fn time_ago(created_at: f64, now: f64) -> String {
    let delta = (now - created_at).max(0.0) as i64;
    match delta {
        d if d < 60 => "1 minute ago".to_string(),
        d if d < 3600 => format!("{} minutes ago", d / 60),
        d if d < 86400 => format!("{} hours ago", d / 3600),
        d if d < 604800 => format!("{} days ago", d / 86400),
        _ => match DateTime::from_timestamp(created_at as i64, 0) {
            Some(date) => format!("{}-{:02}-{:02}", date.year(), date.month(), date.day()),
            None => String::new(),
        },
    }
}

fn annotate_object(object: &mut Map<String, Value>, now: f64) {
    if let Some(created_at) = object.get("created_at").and_then(Value::as_f64) {
        object.insert(
            "created_ago".to_string(),
            Value::String(time_ago(created_at, now)),
        );
    }
    object.values_mut().for_each(|child| annotate(child, now));
}

fn annotate(value: &mut Value, now: f64) {
    match value {
        Value::Object(object) => annotate_object(object, now),
        Value::Array(items) => items.iter_mut().for_each(|item| annotate(item, now)),
        _ => {}
    }
}

/// Renderer decorator adding `created_ago` beside every `created_at`
pub struct AgeAnnotator {
    inner: Arc<dyn TemplateRenderer>,
    clock: fn() -> f64,
}

impl AgeAnnotator {
    pub fn new(inner: Arc<dyn TemplateRenderer>) -> Self {
        Self {
            inner,
            clock: now_seconds,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> f64) -> Self {
        self.clock = clock;
        self
    }
}

impl TemplateRenderer for AgeAnnotator {
    fn render(&self, name: &str, context: &Map<String, Value>) -> Result<String, RenderError> {
        let mut context = context.clone();
        annotate_object(&mut context, (self.clock)());
        self.inner.render(name, &context)
    }
}
