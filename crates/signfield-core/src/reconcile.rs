//! Reconciliation of the field working set into the ordered block list.
//!
//! A pass removes field blocks whose field is gone, syncs the geometry of
//! the rest, appends blocks for new fields and renumbers `order`. Non-field
//! blocks keep their relative position. The block list is shared behind an
//! [`Arc`] and only replaced when the pass changed its content, so
//! downstream writers can skip work with a pointer comparison.

use crate::block::{Block, StagedMetadata};
use crate::field::{Field, FieldId};
use crate::registry::FieldKindRegistry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Counts of what a pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub added: usize,
    pub removed: usize,
    pub updated: usize,
    /// Blocks whose `order` had to be rewritten.
    pub reordered: usize,
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Skipped because the blocks were just edited directly.
    Suppressed,
    /// Blocks already matched the fields; the list was not replaced.
    Unchanged,
    Changed(ReconcileStats),
}

/// Diffs fields into blocks, honouring the one-shot suppression flag.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    suppress_next: bool,
    staged: HashMap<FieldId, StagedMetadata>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the blocks were edited by something other than field
    /// sync. The next pass is skipped.
    pub fn mark_external_edit(&mut self) {
        self.suppress_next = true;
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppress_next
    }

    /// Attach creation metadata to a field whose block does not exist yet.
    /// Consumed when the block is synthesized.
    pub fn stage(&mut self, id: FieldId, metadata: StagedMetadata) {
        self.staged.insert(id, metadata);
    }

    pub fn staged(&self, id: FieldId) -> Option<&StagedMetadata> {
        self.staged.get(&id)
    }

    /// Forget suppression and staged metadata, e.g. on document switch.
    pub fn clear(&mut self) {
        self.suppress_next = false;
        self.staged.clear();
    }

    /// Run one pass over the current fields.
    pub fn reconcile(
        &mut self,
        fields: &[Field],
        blocks: &mut Arc<Vec<Block>>,
        registry: &dyn FieldKindRegistry,
    ) -> ReconcileOutcome {
        if std::mem::take(&mut self.suppress_next) {
            log::info!("reconciliation skipped after direct block edit");
            return ReconcileOutcome::Suppressed;
        }

        let by_id: HashMap<FieldId, &Field> =
            fields.iter().map(|field| (field.id, field)).collect();
        // Staged entries for fields that no longer exist can never be used.
        self.staged.retain(|id, _| by_id.contains_key(id));

        let mut stats = ReconcileStats::default();
        let mut next = Vec::with_capacity(blocks.len() + fields.len());
        let mut synced = HashSet::new();

        for block in blocks.iter() {
            if !block.is_field() {
                next.push(block.clone());
                continue;
            }
            let Some(field) = by_id.get(&block.id) else {
                stats.removed += 1;
                continue;
            };
            if !synced.insert(block.id) {
                log::warn!("dropping duplicate block for field {}", block.id);
                stats.removed += 1;
                continue;
            }
            let mut block = block.clone();
            if block.sync_geometry(field) {
                stats.updated += 1;
            }
            next.push(block);
        }

        for field in fields {
            if synced.contains(&field.id) {
                continue;
            }
            let staged = self.staged.remove(&field.id);
            next.push(Block::for_field(field, staged, registry));
            stats.added += 1;
        }

        for (index, block) in next.iter_mut().enumerate() {
            if block.order != index {
                block.order = index;
                stats.reordered += 1;
            }
        }

        if next == **blocks {
            log::debug!("reconciliation found nothing to change");
            return ReconcileOutcome::Unchanged;
        }
        log::debug!(
            "reconciled {} blocks: {} added, {} removed, {} updated, {} reordered",
            next.len(),
            stats.added,
            stats.removed,
            stats.updated,
            stats.reordered
        );
        *blocks = Arc::new(next);
        ReconcileOutcome::Changed(stats)
    }
}

/// Rewrite every block's `order` to its index. Returns whether any changed.
pub fn renumber(blocks: &mut [Block]) -> bool {
    let mut changed = false;
    for (index, block) in blocks.iter_mut().enumerate() {
        if block.order != index {
            block.order = index;
            changed = true;
        }
    }
    changed
}
