//! Editing session: one open document and everything needed to edit it.
//!
//! The session owns the field store, the block list, the viewports and the
//! interaction controller. Every entry point that can mutate fields takes
//! the current [`Instant`] and arms the reconciliation debounce; the host
//! calls [`EditorSession::tick`] once per frame to let it fire.

use crate::block::{Block, BlockId, StagedMetadata};
use crate::config::EditorConfig;
use crate::debounce::Debouncer;
use crate::error::MapResult;
use crate::field::{Field, FieldId, FieldPatch};
use crate::input::{KeyEvent, PointerEvent};
use crate::interaction::{InteractionContext, InteractionController, Outcome, PointerCapture};
use crate::reconcile::{self, ReconcileOutcome, Reconciler};
use crate::registry::{FieldKindRegistry, StaticRegistry};
use crate::storage::{DocumentSnapshot, Storage, StorageError, StorageResult};
use crate::store::{FieldChange, FieldStore};
use crate::viewport::Viewport;
use crate::viewports::{ProjectionCache, Viewports};
use kurbo::Rect;
use std::rc::Rc;
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Identity of the open document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub id: String,
    pub name: String,
}

pub struct EditorSession<S: Storage> {
    config: EditorConfig,
    storage: Arc<S>,
    registry: Box<dyn FieldKindRegistry>,
    document: Option<DocumentInfo>,
    store: FieldStore,
    blocks: Arc<Vec<Block>>,
    viewports: Viewports,
    projections: ProjectionCache,
    interaction: InteractionController,
    reconciler: Reconciler,
    debounce: Debouncer,
    /// Field changes not yet merged into the blocks.
    unsynced: bool,
    /// Blocks changed since the last save.
    dirty: bool,
}

impl<S: Storage> EditorSession<S> {
    pub fn new(config: EditorConfig, storage: Arc<S>) -> Self {
        Self {
            store: FieldStore::with_config(&config),
            interaction: InteractionController::new(&config),
            debounce: Debouncer::new(config.debounce_window()),
            config,
            storage,
            registry: Box::new(StaticRegistry::new()),
            document: None,
            blocks: Arc::new(Vec::new()),
            viewports: Viewports::new(),
            projections: ProjectionCache::new(),
            reconciler: Reconciler::new(),
            unsynced: false,
            dirty: false,
        }
    }

    /// Use a host-provided field-kind registry.
    pub fn with_registry(mut self, registry: impl FieldKindRegistry + 'static) -> Self {
        self.registry = Box::new(registry);
        self
    }

    pub fn set_pointer_capture(&mut self, capture: Rc<dyn PointerCapture>) {
        self.interaction.set_pointer_capture(capture);
    }

    // --- Lifecycle ---

    /// Start editing a document, discarding whatever was open.
    ///
    /// The block `order` values are repaired on load. Fields come from the
    /// snapshot's working set or, failing that, from its field blocks.
    pub fn load(&mut self, snapshot: DocumentSnapshot) {
        self.reset();
        let fields = snapshot.working_fields();
        let mut blocks = snapshot.blocks;
        reconcile::renumber(&mut blocks);

        log::info!(
            "opened document {} with {} fields and {} blocks",
            snapshot.id,
            fields.len(),
            blocks.len()
        );
        self.store.load(fields);
        self.store.take_changes();
        self.blocks = Arc::new(blocks);
        self.document = Some(DocumentInfo {
            id: snapshot.id,
            name: snapshot.name,
        });
    }

    /// Load a document from storage.
    pub fn open(&mut self, id: &str) -> StorageResult<()> {
        let snapshot = self.storage.load(id)?;
        self.load(snapshot);
        Ok(())
    }

    /// Leave the current document and open another from storage.
    ///
    /// Unsaved work in the current document is dropped; call
    /// [`EditorSession::save`] first to keep it. If loading fails the
    /// session is left with no document.
    pub fn switch_document(&mut self, id: &str) -> StorageResult<()> {
        self.unmount();
        if let Err(err) = self.open(id) {
            log::warn!("failed to open document {id}: {err}");
            self.reset();
            return Err(err);
        }
        Ok(())
    }

    /// Start a new, empty document. Returns its id.
    pub fn create_document(&mut self, name: impl Into<String>) -> String {
        let snapshot = DocumentSnapshot::new(name);
        let id = snapshot.id.clone();
        self.load(snapshot);
        self.dirty = true;
        id
    }

    /// Tear down the editing surface: cancel the pending pass, discard any
    /// in-flight gesture and forget every viewport.
    pub fn unmount(&mut self) {
        if self.debounce.cancel() {
            log::debug!("pending reconciliation cancelled by unmount");
        }
        self.interaction.abort(&mut self.store);
        // A reverted live gesture waits for the next pass or save.
        if self.store.take_changes().iter().any(FieldChange::needs_reconcile) {
            self.unsynced = true;
        }
        self.viewports.clear();
        self.projections.invalidate();
    }

    fn reset(&mut self) {
        self.unmount();
        self.reconciler.clear();
        self.store = FieldStore::with_config(&self.config);
        self.blocks = Arc::new(Vec::new());
        self.document = None;
        self.unsynced = false;
        self.dirty = false;
    }

    // --- Rendering surface ---

    /// Record the viewport a render pass produced.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewports.set(viewport);
    }

    pub fn remove_viewport(&mut self, page: u32) {
        self.viewports.remove(page);
    }

    /// Change the zoom scale, clamped to the configured range. Returns the
    /// scale actually applied.
    pub fn set_scale(&mut self, scale: f64) -> f64 {
        let scale = self.config.clamp_scale(scale);
        self.viewports.set_scale(scale);
        self.projections.invalidate();
        scale
    }

    /// Current screen rectangle of a field, or `None` if the field is gone.
    pub fn screen_rect(&mut self, id: FieldId) -> Option<MapResult<Rect>> {
        let field = self.store.get(id)?;
        Some(self.projections.screen_rect(&self.viewports, field))
    }

    // --- Interaction ---

    pub fn handle_pointer(&mut self, event: PointerEvent, now: Instant) -> Outcome {
        let mut ctx = InteractionContext {
            store: &mut self.store,
            viewports: &self.viewports,
            registry: self.registry.as_ref(),
        };
        let outcome = self.interaction.handle_pointer(event, &mut ctx);
        self.after_mutation(now);
        outcome
    }

    pub fn handle_key(&mut self, event: &KeyEvent, now: Instant) -> Outcome {
        let outcome = self.interaction.handle_key(event, &mut self.store);
        self.after_mutation(now);
        outcome
    }

    pub fn start_placement(&mut self, kind: impl Into<String>) {
        self.interaction.start_placement(kind);
    }

    /// Leave placement mode. Also cancels the pending reconciliation; the
    /// changes it would have merged stay queued for the next pass.
    pub fn cancel_placement(&mut self) -> bool {
        let cancelled = self.interaction.cancel_placement();
        if cancelled && self.debounce.cancel() {
            log::debug!("pending reconciliation cancelled with placement");
        }
        cancelled
    }

    // --- Field commands ---

    pub fn create_field(&mut self, field: Field, now: Instant) -> FieldId {
        let id = self.store.create(field);
        self.after_mutation(now);
        id
    }

    pub fn update_field(&mut self, id: FieldId, patch: &FieldPatch, now: Instant) -> bool {
        let changed = self.store.update(id, patch);
        self.after_mutation(now);
        changed
    }

    pub fn remove_field(&mut self, id: FieldId, now: Instant) -> bool {
        let removed = self.store.remove(id).is_some();
        self.after_mutation(now);
        removed
    }

    pub fn duplicate_field(&mut self, id: FieldId, now: Instant) -> Option<FieldId> {
        let copy = self.store.duplicate(id);
        self.after_mutation(now);
        copy
    }

    pub fn select(&mut self, id: Option<FieldId>) {
        match id {
            Some(id) => self.store.select(id),
            None => self.store.clear_selection(),
        }
    }

    /// Attach label, owner group and metadata to a field's block-to-be.
    pub fn stage_metadata(&mut self, id: FieldId, metadata: StagedMetadata) {
        self.reconciler.stage(id, metadata);
    }

    // --- Direct block edits ---

    /// Edit the block list directly, e.g. from a content or party panel.
    ///
    /// Orders are renumbered afterwards. If anything changed, the next
    /// reconciliation pass is skipped.
    pub fn apply_external_edit<R>(&mut self, edit: impl FnOnce(&mut Vec<Block>) -> R) -> R {
        let mut blocks = self.blocks.as_ref().clone();
        let result = edit(&mut blocks);
        reconcile::renumber(&mut blocks);
        if blocks != *self.blocks {
            self.blocks = Arc::new(blocks);
            self.reconciler.mark_external_edit();
            self.dirty = true;
        }
        result
    }

    /// Insert a block at `index` (clamped to the end). Returns its id.
    pub fn insert_block(&mut self, index: usize, block: Block) -> BlockId {
        let id = block.id;
        self.apply_external_edit(|blocks| {
            let index = index.min(blocks.len());
            blocks.insert(index, block);
        });
        id
    }

    /// Move the block at `from` to `to`. Returns false if `from` is out of
    /// range.
    pub fn move_block(&mut self, from: usize, to: usize) -> bool {
        self.apply_external_edit(|blocks| {
            if from >= blocks.len() {
                return false;
            }
            let block = blocks.remove(from);
            let to = to.min(blocks.len());
            blocks.insert(to, block);
            true
        })
    }

    /// Reassign a block to another owner group.
    pub fn set_owner_group(&mut self, id: BlockId, owner_group_id: Option<String>) -> bool {
        self.apply_external_edit(|blocks| match blocks.iter_mut().find(|block| block.id == id) {
            Some(block) => {
                block.owner_group_id = owner_group_id;
                true
            }
            None => false,
        })
    }

    // --- Reconciliation and persistence ---

    /// Drive the debounce timer. Returns the outcome if a pass ran.
    pub fn tick(&mut self, now: Instant) -> Option<ReconcileOutcome> {
        if !self.debounce.poll(now) {
            return None;
        }
        let outcome = self.run_pass();
        if outcome == ReconcileOutcome::Suppressed && self.unsynced {
            // The skipped changes still have to land.
            self.debounce.schedule(now);
        }
        Some(outcome)
    }

    /// Run a pass now, whether or not one was scheduled.
    pub fn flush(&mut self) -> ReconcileOutcome {
        self.debounce.cancel();
        self.run_pass()
    }

    /// Merge pending field changes and write the document to storage.
    pub fn save(&mut self) -> StorageResult<()> {
        let Some(document) = self.document.clone() else {
            return Err(StorageError::Other("No document is open".to_string()));
        };
        // A pass skipped for a direct block edit still leaves the fields to merge.
        let pending = self.unsynced || self.debounce.is_pending();
        if pending && self.flush() == ReconcileOutcome::Suppressed {
            self.flush();
        }
        let snapshot = self.snapshot(&document);
        self.storage.save(&document.id, &snapshot).inspect_err(|e| {
            log::warn!("saving document {} failed: {e}", document.id);
        })?;
        self.dirty = false;
        log::info!("saved document {} ({} blocks)", document.id, snapshot.blocks.len());
        Ok(())
    }

    fn snapshot(&self, document: &DocumentInfo) -> DocumentSnapshot {
        DocumentSnapshot {
            id: document.id.clone(),
            name: document.name.clone(),
            blocks: self.blocks.as_ref().clone(),
            fields: self.store.fields().to_vec(),
        }
    }

    fn run_pass(&mut self) -> ReconcileOutcome {
        let outcome = self
            .reconciler
            .reconcile(self.store.fields(), &mut self.blocks, self.registry.as_ref());
        match outcome {
            ReconcileOutcome::Suppressed => {}
            ReconcileOutcome::Unchanged => self.unsynced = false,
            ReconcileOutcome::Changed(_) => {
                self.unsynced = false;
                self.dirty = true;
            }
        }
        outcome
    }

    /// Drain the store's change log and arm the debounce if any change
    /// needs merging.
    fn after_mutation(&mut self, now: Instant) {
        let mut schedule = false;
        for change in self.store.take_changes() {
            if let Some(id) = change.id() {
                self.projections.forget(id);
            }
            schedule |= change.needs_reconcile();
        }
        if schedule {
            self.unsynced = true;
            self.debounce.schedule(now);
        }
    }

    // --- Accessors ---

    /// The reconciled block list. The `Arc` is only replaced when its
    /// content changes.
    pub fn blocks(&self) -> &Arc<Vec<Block>> {
        &self.blocks
    }

    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    pub fn viewports(&self) -> &Viewports {
        &self.viewports
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn document(&self) -> Option<&DocumentInfo> {
        self.document.as_ref()
    }

    /// Whether a reconciliation pass is waiting on the debounce window.
    pub fn is_reconcile_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Whether field changes have not been merged into the blocks yet.
    pub fn has_unsynced_changes(&self) -> bool {
        self.unsynced
    }

    /// Whether the blocks changed since the last save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}
