//! Placed fields: the editable rectangles of an editing session.
//!
//! Geometry is kept in document space with a top-left origin and y growing
//! downward, independent of zoom and device pixel ratio.

use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a field. Block ids reuse it for field blocks.
pub type FieldId = Uuid;

/// Horizontal text alignment inside a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical text alignment inside a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// Presentational alignment. Has no effect on geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Alignment {
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
}

/// A placed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Stable identifier. A nil id asks the store to assign one.
    pub id: FieldId,
    /// Kind tag resolved through the field-kind registry (text, signature, ...).
    pub kind: String,
    /// 1-based page index.
    pub page: u32,
    /// Left edge in document units.
    pub x: f64,
    /// Top edge in document units.
    pub y: f64,
    /// Width in document units.
    pub w: f64,
    /// Height in document units.
    pub h: f64,
    #[serde(default)]
    pub alignment: Alignment,
    /// Font size hint for renderers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_hint: Option<f64>,
    #[serde(default)]
    pub wrap: bool,
}

impl Field {
    /// Create a field with a fresh id.
    pub fn new(kind: impl Into<String>, page: u32, rect: Rect) -> Self {
        let rect = rect.abs();
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            page,
            x: rect.x0,
            y: rect.y0,
            w: rect.width(),
            h: rect.height(),
            alignment: Alignment::default(),
            size_hint: None,
            wrap: false,
        }
    }

    /// Replace the id.
    pub fn with_id(mut self, id: FieldId) -> Self {
        self.id = id;
        self
    }

    /// Top-left corner.
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }

    /// Bounds as a kurbo rectangle.
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.origin(), self.size())
    }

    /// Check if a document-space point on this field's page lies inside it.
    pub fn contains(&self, page: u32, point: Point) -> bool {
        self.page == page && self.rect().contains(point)
    }

    /// Whether the geometry is usable: finite, non-negative position and
    /// strictly positive size.
    pub fn has_valid_geometry(&self) -> bool {
        let finite = [self.x, self.y, self.w, self.h].iter().all(|v| v.is_finite());
        finite && self.x >= 0.0 && self.y >= 0.0 && self.w > 0.0 && self.h > 0.0
    }

    /// Return a copy with the patch applied.
    pub fn patched(&self, patch: &FieldPatch) -> Self {
        let mut field = self.clone();
        field.apply(patch);
        field
    }

    /// Shallow-merge a patch into this field.
    pub fn apply(&mut self, patch: &FieldPatch) {
        if let Some(kind) = &patch.kind {
            self.kind.clone_from(kind);
        }
        if let Some(page) = patch.page {
            self.page = page;
        }
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(w) = patch.w {
            self.w = w;
        }
        if let Some(h) = patch.h {
            self.h = h;
        }
        if let Some(alignment) = patch.alignment {
            self.alignment = alignment;
        }
        if let Some(size_hint) = patch.size_hint {
            self.size_hint = size_hint;
        }
        if let Some(wrap) = patch.wrap {
            self.wrap = wrap;
        }
    }
}

/// Sparse update for a field. Only present members are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    /// `Some(None)` clears the hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_hint: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrap: Option<bool>,
}

impl FieldPatch {
    /// Patch that moves the top-left corner.
    pub fn position(origin: Point) -> Self {
        Self {
            x: Some(origin.x),
            y: Some(origin.y),
            ..Default::default()
        }
    }

    /// Patch that replaces position and size.
    pub fn geometry(rect: Rect) -> Self {
        Self {
            x: Some(rect.x0),
            y: Some(rect.y0),
            w: Some(rect.width()),
            h: Some(rect.height()),
            ..Default::default()
        }
    }
}
