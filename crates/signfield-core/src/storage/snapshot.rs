//! The persisted form of one document.

use crate::block::Block;
use crate::field::Field;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A document as handed to and from storage: its block schema plus the
/// field working set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Omitted by producers that only keep blocks; see
    /// [`DocumentSnapshot::working_fields`].
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl DocumentSnapshot {
    /// An empty document with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            blocks: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Fields to edit: the stored working set, or, when none was stored,
    /// the fields described by field blocks in block order.
    pub fn working_fields(&self) -> Vec<Field> {
        if !self.fields.is_empty() {
            return self.fields.clone();
        }
        self.blocks
            .iter()
            .filter_map(|block| block.field_schema.as_ref().map(|schema| schema.to_field(block.id)))
            .collect()
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticRegistry;
    use kurbo::Rect;
    use serde_json::json;

    #[test]
    fn test_fields_derived_from_blocks() {
        let field = Field::new("date", 3, Rect::new(5.0, 5.0, 125.0, 35.0));
        let mut doc = DocumentSnapshot::new("Lease");
        doc.blocks.push(Block::content(json!({"type": "paragraph"})));
        doc.blocks.push(Block::for_field(&field, None, &StaticRegistry::new()));

        assert_eq!(doc.working_fields(), vec![field]);
    }

    #[test]
    fn test_stored_fields_take_precedence() {
        let field = Field::new("text", 1, Rect::new(0.0, 0.0, 50.0, 20.0));
        let mut doc = DocumentSnapshot::new("Lease");
        doc.fields.push(field.clone());
        doc.blocks.push(Block::content(json!("intro")));

        assert_eq!(doc.working_fields(), vec![field]);
    }

    #[test]
    fn test_json_defaults() {
        let doc = DocumentSnapshot::from_json(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(doc.id, "abc");
        assert!(doc.blocks.is_empty());
        assert!(doc.working_fields().is_empty());
    }

    #[test]
    fn test_json_round_trip() {
        let mut doc = DocumentSnapshot::new("Contract");
        doc.blocks.push(Block::content(json!({"type": "heading", "text": "Parties"})));
        let loaded = DocumentSnapshot::from_json(&doc.to_json().unwrap()).unwrap();
        assert_eq!(loaded, doc);
    }
}
