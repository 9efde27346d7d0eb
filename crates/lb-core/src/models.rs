//! # Domain Models
//!
//! A life block is a single document: its schema (`content_types`) and its
//! entries (`contents`) are embedded, ordered collections.
//! Life blocks are keyed by UUID v7; every embedded id is an opaque string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Field values of one content entry, keyed by field name.
pub type ContentData = Map<String, Value>;

/// A user-defined container for one area of life (recipes, reading list, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifeBlock {
    pub id: Uuid,
    pub owner_user_id: String,
    pub name: String,
    pub description: String,
    /// Presentation hint, usually a CSS class or hex colour.
    pub color: String,
    pub icon: String,
    pub content_types: Vec<ContentType>,
    /// Insertion ordered.
    pub contents: Vec<Content>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LifeBlock {
    pub fn content(&self, content_id: &str) -> Option<&Content> {
        self.contents.iter().find(|c| c.id == content_id)
    }

    pub fn content_type(&self, content_type_id: &str) -> Option<&ContentType> {
        self.content_types.iter().find(|ct| ct.id == content_type_id)
    }
}

/// A record schema declared by the owner of a life block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// The closed set of field types. Serialized as the `type` tag of the field;
/// `options` only exists on `select`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Date,
    Boolean,
    Select {
        #[serde(default)]
        options: Vec<String>,
    },
}

/// A content type as submitted by a client, ids optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentTypeDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub fields: Vec<FieldDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl From<ContentType> for ContentTypeDraft {
    fn from(ct: ContentType) -> Self {
        Self {
            id: Some(ct.id),
            name: ct.name,
            icon: ct.icon,
            fields: ct.fields.into_iter().map(FieldDraft::from).collect(),
        }
    }
}

impl From<Field> for FieldDraft {
    fn from(f: Field) -> Self {
        Self {
            id: Some(f.id),
            name: f.name,
            required: f.required,
            kind: f.kind,
        }
    }
}

/// One data entry conforming (loosely) to a content type of its block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: String,
    /// Not checked against the block's content types; may dangle.
    #[serde(default)]
    pub content_type_id: String,
    #[serde(default)]
    pub data: ContentData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Content {
    /// A fresh entry with a generated id, created and updated at `now`.
    pub fn new(content_type_id: String, data: ContentData, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content_type_id,
            data,
            created_at: now,
            updated_at: now,
        }
    }
}

fn default_color() -> String {
    "#000000".to_string()
}

fn default_icon() -> String {
    "default".to_string()
}

/// Payload for creating a life block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLifeBlock {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub content_types: Vec<ContentTypeDraft>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<Content>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl NewLifeBlock {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            color: default_color(),
            icon: default_icon(),
            content_types: Vec::new(),
            contents: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_content_types(mut self, content_types: Vec<ContentTypeDraft>) -> Self {
        self.content_types = content_types;
        self
    }
}

/// Partial update of a life block. Absent fields are left alone;
/// `content_types`, when present, replaces the whole schema.
///
/// Contents, ids, owner and creation time are not patchable here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifeBlockPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_types: Option<Vec<ContentTypeDraft>>,
}

/// A patch whose schema has already been normalized; what the repository applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifeBlockUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub content_types: Option<Vec<ContentType>>,
}

/// Payload for adding a content entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContent {
    #[serde(default)]
    pub content_type_id: String,
    #[serde(default)]
    pub data: ContentData,
}

/// Payload for replacing the data of a content entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentUpdate {
    #[serde(default)]
    pub data: ContentData,
}
