//! Field store: the working set of fields for one editing session.
//!
//! Mutations are visible synchronously. Each one also appends a
//! [`FieldChange`] to a change log; the session drains the log after every
//! event and arms the reconciliation debounce from it.

use crate::config::EditorConfig;
use crate::field::{Field, FieldId, FieldPatch};
use kurbo::{Point, Vec2};
use uuid::Uuid;

/// A mutation observed on the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldChange {
    Created(FieldId),
    Updated(FieldId),
    Removed(FieldId),
    /// The whole working set was replaced by a document load.
    Loaded,
}

impl FieldChange {
    /// The field this change concerns, if it concerns a single one.
    pub fn id(&self) -> Option<FieldId> {
        match self {
            FieldChange::Created(id) | FieldChange::Updated(id) | FieldChange::Removed(id) => {
                Some(*id)
            }
            FieldChange::Loaded => None,
        }
    }

    /// Whether reconciliation has to run for this change.
    pub fn needs_reconcile(&self) -> bool {
        !matches!(self, FieldChange::Loaded)
    }
}

/// Working set of fields, in creation order (back to front).
#[derive(Debug, Clone)]
pub struct FieldStore {
    fields: Vec<Field>,
    active: Option<FieldId>,
    changes: Vec<FieldChange>,
    min_size: f64,
    duplicate_offset: Vec2,
}

impl Default for FieldStore {
    fn default() -> Self {
        Self::with_config(&EditorConfig::default())
    }
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store using the size limits from a config.
    pub fn with_config(config: &EditorConfig) -> Self {
        Self {
            fields: Vec::new(),
            active: None,
            changes: Vec::new(),
            min_size: config.min_field_size,
            duplicate_offset: Vec2::new(config.duplicate_offset, config.duplicate_offset),
        }
    }

    /// Replace the working set, e.g. when a document is opened.
    ///
    /// Fields with duplicate ids keep only their first occurrence.
    pub fn load(&mut self, fields: Vec<Field>) {
        self.fields.clear();
        self.active = None;
        for field in fields {
            if self.contains(field.id) {
                log::warn!("dropping loaded field with duplicate id {}", field.id);
                continue;
            }
            self.fields.push(field);
        }
        self.changes.clear();
        self.changes.push(FieldChange::Loaded);
    }

    /// Add a field and make it the active selection.
    ///
    /// A nil or already-used id is replaced with a fresh one. Size is
    /// raised to the minimum and position to the page origin if needed.
    pub fn create(&mut self, mut field: Field) -> FieldId {
        if field.id.is_nil() || self.contains(field.id) {
            field.id = Uuid::new_v4();
        }
        field.w = sanitize(field.w, self.min_size).max(self.min_size);
        field.h = sanitize(field.h, self.min_size).max(self.min_size);
        field.x = sanitize(field.x, 0.0).max(0.0);
        field.y = sanitize(field.y, 0.0).max(0.0);

        let id = field.id;
        log::debug!("field {id} created ({} on page {})", field.kind, field.page);
        self.fields.push(field);
        self.active = Some(id);
        self.record(FieldChange::Created(id));
        id
    }

    /// Shallow-merge a patch into a field.
    ///
    /// Returns whether the field changed. Unknown ids and patches that would
    /// produce invalid geometry are dropped without error.
    pub fn update(&mut self, id: FieldId, patch: &FieldPatch) -> bool {
        let Some(index) = self.index_of(id) else {
            log::debug!("ignoring update of stale field {id}");
            return false;
        };
        let next = self.fields[index].patched(patch);
        if !next.has_valid_geometry() {
            log::warn!("dropping update of field {id} with invalid geometry {:?}", next.rect());
            return false;
        }
        if next == self.fields[index] {
            return false;
        }
        self.fields[index] = next;
        self.record(FieldChange::Updated(id));
        true
    }

    /// Remove a field, clearing the selection if it pointed at it.
    pub fn remove(&mut self, id: FieldId) -> Option<Field> {
        let Some(index) = self.index_of(id) else {
            log::debug!("ignoring removal of stale field {id}");
            return None;
        };
        let field = self.fields.remove(index);
        if self.active == Some(id) {
            self.active = None;
        }
        self.record(FieldChange::Removed(id));
        Some(field)
    }

    /// Clone a field under a new id, nudged by the duplicate offset.
    ///
    /// The copy becomes the active selection.
    pub fn duplicate(&mut self, id: FieldId) -> Option<FieldId> {
        let Some(original) = self.get(id) else {
            log::debug!("ignoring duplicate of stale field {id}");
            return None;
        };
        let mut copy = original.clone().with_id(Uuid::new_v4());
        copy.x += self.duplicate_offset.x;
        copy.y += self.duplicate_offset.y;
        Some(self.create(copy))
    }

    /// Make a field the active selection. Unknown ids clear it.
    pub fn select(&mut self, id: FieldId) {
        self.active = self.contains(id).then_some(id);
    }

    pub fn clear_selection(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<FieldId> {
        self.active
    }

    pub fn active_field(&self) -> Option<&Field> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: FieldId) -> Option<&Field> {
        self.fields.iter().find(|field| field.id == id)
    }

    pub fn contains(&self, id: FieldId) -> bool {
        self.index_of(id).is_some()
    }

    /// Fields in creation order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Topmost field under a document point on a page.
    pub fn hit_test(&self, page: u32, point: Point) -> Option<FieldId> {
        self.fields
            .iter()
            .rev()
            .find(|field| field.contains(page, point))
            .map(|field| field.id)
    }

    /// Drain the change log.
    pub fn take_changes(&mut self) -> Vec<FieldChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    fn index_of(&self, id: FieldId) -> Option<usize> {
        self.fields.iter().position(|field| field.id == id)
    }

    fn record(&mut self, change: FieldChange) {
        self.changes.push(change);
    }
}

fn sanitize(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}
