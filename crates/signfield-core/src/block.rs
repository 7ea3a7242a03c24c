//! Blocks: entries of the persisted, ordered document schema.

use crate::field::{Alignment, Field, FieldId};
use crate::registry::FieldKindRegistry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Block identifier. Field blocks share their field's id.
pub type BlockId = Uuid;

/// A document-schema entry.
///
/// `field_schema` is present exactly when the block stands for a field.
/// Other blocks (headings, paragraphs, ...) carry opaque `content` and are
/// only ever moved by reconciliation, never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,
    /// Position in the document; equals the array index after every pass.
    pub order: usize,
    /// Grouping tag, e.g. the signing party a field belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_schema: Option<FieldSchema>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub content: Value,
}

impl Block {
    /// A non-field block with a fresh id.
    pub fn content(content: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            order: 0,
            owner_group_id: None,
            field_schema: None,
            content,
        }
    }

    /// Synthesize the block for a newly seen field.
    ///
    /// Registry defaults come first, then the field's geometry, then any
    /// metadata staged for the field at creation time.
    pub fn for_field(
        field: &Field,
        staged: Option<StagedMetadata>,
        registry: &dyn FieldKindRegistry,
    ) -> Self {
        let mut schema = FieldSchema::from_field(field);
        schema.label = registry.label(&field.kind);

        let mut owner_group_id = None;
        if let Some(staged) = staged {
            if staged.label.is_some() {
                schema.label = staged.label;
            }
            schema.metadata.extend(staged.metadata);
            owner_group_id = staged.owner_group_id;
        }

        Self {
            id: field.id,
            order: 0,
            owner_group_id,
            field_schema: Some(schema),
            content: Value::Null,
        }
    }

    pub fn is_field(&self) -> bool {
        self.field_schema.is_some()
    }

    /// Overwrite the schema's geometry from a field. Returns whether
    /// anything changed. Non-field blocks are left alone.
    pub fn sync_geometry(&mut self, field: &Field) -> bool {
        match &mut self.field_schema {
            Some(schema) => schema.sync_geometry(field),
            None => false,
        }
    }
}

/// Field geometry plus domain metadata, as stored on a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub kind: String,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_hint: Option<f64>,
    #[serde(default)]
    pub wrap: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Validators, placeholders and anything else the host attaches.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl FieldSchema {
    pub fn from_field(field: &Field) -> Self {
        Self {
            kind: field.kind.clone(),
            page: field.page,
            x: field.x,
            y: field.y,
            w: field.w,
            h: field.h,
            alignment: field.alignment,
            size_hint: field.size_hint,
            wrap: field.wrap,
            label: None,
            metadata: Map::new(),
        }
    }

    /// Rebuild the field this schema was synced from.
    pub fn to_field(&self, id: FieldId) -> Field {
        Field {
            id,
            kind: self.kind.clone(),
            page: self.page,
            x: self.x,
            y: self.y,
            w: self.w,
            h: self.h,
            alignment: self.alignment,
            size_hint: self.size_hint,
            wrap: self.wrap,
        }
    }

    /// Copy kind, page, geometry and presentation hints from a field.
    /// Label and metadata are kept.
    pub fn sync_geometry(&mut self, field: &Field) -> bool {
        let unchanged = self.kind == field.kind
            && self.page == field.page
            && self.x == field.x
            && self.y == field.y
            && self.w == field.w
            && self.h == field.h
            && self.alignment == field.alignment
            && self.size_hint == field.size_hint
            && self.wrap == field.wrap;
        if unchanged {
            return false;
        }
        self.kind.clone_from(&field.kind);
        self.page = field.page;
        self.x = field.x;
        self.y = field.y;
        self.w = field.w;
        self.h = field.h;
        self.alignment = field.alignment;
        self.size_hint = field.size_hint;
        self.wrap = field.wrap;
        true
    }
}

/// Metadata attached to a field before its block exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}
