//! # Schema Registry
//!
//! Assigns stable identifiers to the content types and fields a life block
//! declares, and (optionally) checks content entries against them.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{ContentData, ContentType, ContentTypeDraft, Field, FieldDraft, FieldKind};

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

/// Keeps an existing id, generates one otherwise. Empty strings count as missing.
fn assign_id(id: Option<String>) -> String {
    id.filter(|id| !id.is_empty()).unwrap_or_else(fresh_id)
}

/// Gives every content type and field an id, leaving existing ids untouched.
///
/// Idempotent: normalizing an already normalized schema returns it unchanged.
/// Duplicate type or field names are kept as-is.
pub fn normalize_schema(content_types: Vec<ContentTypeDraft>) -> Vec<ContentType> {
    content_types
        .into_iter()
        .map(|ct| ContentType {
            id: assign_id(ct.id),
            name: ct.name,
            icon: ct.icon,
            fields: ct.fields.into_iter().map(normalize_field).collect(),
        })
        .collect()
}

fn normalize_field(field: FieldDraft) -> Field {
    Field {
        id: assign_id(field.id),
        name: field.name,
        required: field.required,
        kind: field.kind,
    }
}

/// Checks `data` against the fields of `content_type`.
///
/// Required fields must be present and non-empty. Present values must fit
/// the field kind; numbers may arrive as numeric strings since that is what
/// HTML number inputs submit. Keys not declared by the schema are allowed.
pub fn validate_content(content_type: &ContentType, data: &ContentData) -> Result<()> {
    for field in &content_type.fields {
        let value = data.get(&field.name).filter(|v| !is_blank(v));
        match value {
            None if field.required => {
                return Err(AppError::ValidationError(format!(
                    "field '{}' of '{}' is required",
                    field.name, content_type.name
                )));
            }
            None => {}
            Some(value) => check_kind(field, value)?,
        }
    }
    Ok(())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn check_kind(field: &Field, value: &Value) -> Result<()> {
    let ok = match (&field.kind, value) {
        (FieldKind::Text | FieldKind::Textarea, Value::String(_)) => true,
        (FieldKind::Number, Value::Number(_)) => true,
        (FieldKind::Number, Value::String(s)) => s.trim().parse::<f64>().is_ok(),
        (FieldKind::Boolean, Value::Bool(_)) => true,
        (FieldKind::Date, Value::String(s)) => {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(s).is_ok()
        }
        (FieldKind::Select { options }, Value::String(s)) => options.is_empty() || options.contains(s),
        _ => false,
    };

    if ok {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!(
            "value {} does not fit field '{}' ({})",
            value,
            field.name,
            kind_name(&field.kind)
        )))
    }
}

fn kind_name(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::Text => "text",
        FieldKind::Textarea => "textarea",
        FieldKind::Number => "number",
        FieldKind::Date => "date",
        FieldKind::Boolean => "boolean",
        FieldKind::Select { .. } => "select",
    }
}
