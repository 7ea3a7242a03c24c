//! End-to-end behaviour of an editing session: pointer input through the
//! controller, debounced reconciliation and persistence.

use kurbo::{Point, Rect, Size};
use serde_json::json;
use signfield_core::{
    Block, DocumentSnapshot, DragMode, EditorConfig, EditorSession, Field, FieldPatch, FileStorage,
    KeyEvent, MemoryStorage, Outcome, PointerEvent, ReconcileOutcome, StagedMetadata, Storage,
    StorageError, Viewport,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_millis(100);

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn session_with(config: EditorConfig) -> EditorSession<MemoryStorage> {
    init_logger();
    let mut session = EditorSession::new(config, Arc::new(MemoryStorage::new()));
    session.create_document("Purchase agreement");
    session.set_viewport(Viewport::new(1, Size::new(612.0, 792.0), 1.0, 1.0));
    session.set_viewport(
        Viewport::new(2, Size::new(612.0, 792.0), 1.0, 1.0).with_css_origin(Point::new(0.0, 802.0)),
    );
    session
}

fn session() -> EditorSession<MemoryStorage> {
    session_with(EditorConfig::default())
}

fn field(x: f64, y: f64) -> Field {
    Field::new("text", 1, Rect::new(x, y, x + 50.0, y + 20.0))
}

fn assert_contiguous(blocks: &[Block]) {
    for (index, block) in blocks.iter().enumerate() {
        assert_eq!(block.order, index, "block {} out of order", block.id);
    }
}

#[test]
fn reconciliation_is_idempotent() {
    let mut session = session();
    let now = Instant::now();
    for x in [10.0, 100.0, 200.0] {
        session.create_field(field(x, 10.0), now);
    }

    assert!(matches!(session.flush(), ReconcileOutcome::Changed(_)));
    let first = serde_json::to_string(session.blocks().as_ref()).unwrap();
    let before = Arc::clone(session.blocks());

    assert_eq!(session.flush(), ReconcileOutcome::Unchanged);
    let second = serde_json::to_string(session.blocks().as_ref()).unwrap();
    assert_eq!(first, second);
    assert!(Arc::ptr_eq(&before, session.blocks()));
}

#[test]
fn add_then_remove_settles_to_survivor() {
    let mut session = session();
    let start = Instant::now();
    let a = session.create_field(field(10.0, 10.0), start);
    let b = session.create_field(field(100.0, 10.0), start + Duration::from_millis(10));
    session.remove_field(a, start + Duration::from_millis(20));

    // One pass, after the window following the last mutation.
    assert_eq!(session.tick(start + Duration::from_millis(100)), None);
    assert!(session.tick(start + Duration::from_millis(120)).is_some());
    assert_eq!(session.tick(start + Duration::from_millis(500)), None);

    let blocks = session.blocks();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].id, b);
    assert_eq!(blocks[0].order, 0);
}

#[test]
fn orders_stay_contiguous() {
    let mut session = session();
    let mut now = Instant::now();
    let ids: Vec<_> = (0..4)
        .map(|i| session.create_field(field(i as f64 * 60.0, 10.0), now))
        .collect();
    session.insert_block(2, Block::content(json!({"type": "paragraph"})));
    session.flush();
    assert_contiguous(session.blocks());

    now += Duration::from_secs(1);
    session.remove_field(ids[1], now);
    session.duplicate_field(ids[3], now);
    session.move_block(0, 3);
    session.flush();
    session.flush();
    assert_contiguous(session.blocks());
    assert_eq!(session.blocks().len(), 5);
}

#[test]
fn direct_edit_suppresses_exactly_one_pass() {
    let mut session = session();
    let start = Instant::now();
    let a = session.create_field(field(10.0, 10.0), start);
    session.tick(start + WINDOW);

    let heading =
        session.insert_block(0, Block::content(json!({"type": "heading", "text": "Terms"})));
    let t1 = start + Duration::from_secs(1);
    session.update_field(a, &FieldPatch::position(Point::new(200.0, 10.0)), t1);

    assert_eq!(session.tick(t1 + WINDOW), Some(ReconcileOutcome::Suppressed));
    let blocks = session.blocks();
    assert_eq!(blocks[0].id, heading);
    assert!((blocks[1].field_schema.as_ref().unwrap().x - 10.0).abs() < f64::EPSILON);

    // The skipped changes are rescheduled and the following pass syncs them.
    assert!(session.is_reconcile_pending());
    assert!(matches!(session.tick(t1 + WINDOW * 2), Some(ReconcileOutcome::Changed(_))));
    let blocks = session.blocks();
    assert_eq!(blocks[0].id, heading);
    assert!((blocks[1].field_schema.as_ref().unwrap().x - 200.0).abs() < f64::EPSILON);
    assert_contiguous(blocks);
}

#[test]
fn owner_group_edit_survives_sync() {
    let mut session = session();
    let now = Instant::now();
    let a = session.create_field(field(10.0, 10.0), now);
    session.flush();

    assert!(session.set_owner_group(a, Some("buyer".to_string())));
    session.update_field(a, &FieldPatch::position(Point::new(30.0, 30.0)), now);
    session.flush();
    session.flush();

    let block = &session.blocks()[0];
    assert_eq!(block.owner_group_id.as_deref(), Some("buyer"));
    assert!((block.field_schema.as_ref().unwrap().x - 30.0).abs() < f64::EPSILON);
}

#[test]
fn place_and_drag_with_pointer() {
    let mut session = session();
    let start = Instant::now();

    session.start_placement("checkbox");
    session.handle_pointer(PointerEvent::moved(100.0, 900.0), start);
    let Outcome::Created(id) = session.handle_pointer(PointerEvent::down(100.0, 900.0), start)
    else {
        panic!("placement click did not create a field");
    };
    let placed = session.store().get(id).unwrap().clone();
    assert_eq!(placed.page, 2);
    assert!((placed.x - 90.0).abs() < 1e-9);
    assert!((placed.y - 88.0).abs() < 1e-9);

    // Zoomed in, a 40 px drag is 20 document units. The second page moves
    // down below the enlarged first one.
    session.set_scale(2.0);
    let second = session.viewports().get(2).unwrap();
    assert!((second.css_origin.y - 1594.0).abs() < 1e-9);
    let grab = session.screen_rect(id).unwrap().unwrap().center();
    let t = start + Duration::from_millis(30);
    session.handle_pointer(PointerEvent::down(grab.x, grab.y), t);
    for step in 1..=4 {
        session.handle_pointer(PointerEvent::moved(grab.x + 10.0 * step as f64, grab.y), t);
    }
    assert_eq!(
        session.handle_pointer(PointerEvent::up(grab.x + 40.0, grab.y), t),
        Outcome::Moved(id)
    );

    assert!(session.tick(t + WINDOW).is_some());
    let schema = session.blocks()[0].field_schema.clone().unwrap();
    assert_eq!(schema.kind, "checkbox");
    assert_eq!(schema.label.as_deref(), Some("Checkbox"));
    assert!((schema.x - 110.0).abs() < 1e-9);
    assert!((schema.y - 88.0).abs() < 1e-9);
}

#[test]
fn batched_drag_reconciles_once() {
    let mut session = session_with(EditorConfig {
        drag_mode: DragMode::Batched,
        ..EditorConfig::default()
    });
    let start = Instant::now();
    let id = session.create_field(field(10.0, 10.0), start);
    session.tick(start + WINDOW);

    let t = start + Duration::from_secs(1);
    session.handle_pointer(PointerEvent::down(20.0, 20.0), t);
    session.handle_pointer(PointerEvent::moved(60.0, 20.0), t);
    assert!(!session.is_reconcile_pending());
    session.handle_pointer(PointerEvent::up(60.0, 20.0), t);
    assert!(session.is_reconcile_pending());

    session.tick(t + WINDOW);
    assert!((session.blocks()[0].field_schema.as_ref().unwrap().x - 50.0).abs() < 1e-9);
    assert!((session.store().get(id).unwrap().x - 50.0).abs() < 1e-9);
}

#[test]
fn escape_restores_geometry() {
    let mut session = session();
    let now = Instant::now();
    let id = session.create_field(field(10.0, 10.0), now);
    session.handle_pointer(PointerEvent::down(20.0, 20.0), now);
    session.handle_pointer(PointerEvent::moved(80.0, 70.0), now);

    assert_eq!(session.handle_key(&KeyEvent::pressed("Escape"), now), Outcome::Cancelled);
    let restored = session.store().get(id).unwrap();
    assert!((restored.x - 10.0).abs() < 1e-9);
    assert!((restored.y - 10.0).abs() < 1e-9);
}

#[test]
fn staged_metadata_lands_on_new_block() {
    let mut session = session();
    let now = Instant::now();
    let signature = Field::new("signature", 1, Rect::new(0.0, 0.0, 200.0, 60.0));
    let id = session.create_field(signature, now);
    let mut metadata = serde_json::Map::new();
    metadata.insert("required".to_string(), json!(true));
    session.stage_metadata(
        id,
        StagedMetadata {
            label: Some("Seller".to_string()),
            owner_group_id: Some("seller".to_string()),
            metadata,
        },
    );
    session.flush();

    let block = &session.blocks()[0];
    assert_eq!(block.owner_group_id.as_deref(), Some("seller"));
    let schema = block.field_schema.as_ref().unwrap();
    assert_eq!(schema.label.as_deref(), Some("Seller"));
    assert_eq!(schema.metadata["required"], json!(true));
}

#[test]
fn switching_documents_cancels_pending_work() {
    init_logger();
    let storage = Arc::new(MemoryStorage::new());
    let mut other = DocumentSnapshot::new("Addendum");
    other.blocks.push(Block::content(json!({"type": "paragraph"})));
    storage.save(&other.id, &other).unwrap();

    let mut session = EditorSession::new(EditorConfig::default(), Arc::clone(&storage));
    session.create_document("Draft");
    session.set_viewport(Viewport::new(1, Size::new(612.0, 792.0), 1.0, 1.0));
    let now = Instant::now();
    session.create_field(field(10.0, 10.0), now);
    session.handle_pointer(PointerEvent::down(20.0, 20.0), now);

    session.switch_document(&other.id).unwrap();
    assert!(!session.is_reconcile_pending());
    assert!(session.interaction().is_idle());
    assert!(session.store().is_empty());
    assert_eq!(session.blocks().len(), 1);
    assert_eq!(session.document().unwrap().name, "Addendum");
    assert_eq!(session.tick(now + Duration::from_secs(5)), None);
}

#[test]
fn save_merges_pending_changes() {
    let mut session = session();
    let now = Instant::now();
    let id = session.create_field(field(10.0, 10.0), now);
    session.save().unwrap();

    let doc_id = session.document().unwrap().id.clone();
    let saved = session.storage().load(&doc_id).unwrap();
    assert_eq!(saved.blocks.len(), 1);
    assert_eq!(saved.blocks[0].id, id);
    assert_eq!(saved.fields.len(), 1);
    assert!(!session.is_dirty());
    assert!(!session.is_reconcile_pending());
}

#[test]
fn documents_persist_through_files() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()).unwrap());
    let mut session = EditorSession::new(EditorConfig::default(), Arc::clone(&storage));
    let doc_id = session.create_document("Lease");
    let now = Instant::now();
    let id = session.create_field(field(40.0, 40.0), now);
    session.insert_block(0, Block::content(json!({"type": "heading", "text": "Lease"})));
    session.save().unwrap();

    let mut reopened = EditorSession::new(EditorConfig::default(), storage);
    reopened.open(&doc_id).unwrap();
    assert_eq!(reopened.store().get(id).unwrap().x, 40.0);
    assert_eq!(reopened.blocks().len(), 2);
    assert_eq!(reopened.blocks()[1].id, id);
    assert_contiguous(reopened.blocks());
}

#[test]
fn failed_save_keeps_changes_dirty() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path().join("docs")).unwrap());
    let mut session = EditorSession::new(EditorConfig::default(), storage);
    session.create_document("Lease");
    let id = session.create_field(field(40.0, 40.0), Instant::now());
    std::fs::remove_dir_all(dir.path().join("docs")).unwrap();

    assert!(matches!(session.save(), Err(StorageError::Io(_))));
    assert!(session.is_dirty());
    assert_eq!(session.blocks()[0].id, id);
}
