//! Interaction controller: placement, drag and resize gestures.
//!
//! States are Idle, Placing, Dragging and Resizing. Drag and resize
//! gestures remember the field's geometry at pointer-down and the pixel
//! displacement accumulated since, and derive the new geometry from those
//! two on every move. Only deltas are accumulated, so the pointer may leave
//! and re-enter the page without the field jumping.

use crate::config::{DragMode, EditorConfig};
use crate::error::MapError;
use crate::field::{Field, FieldId, FieldPatch};
use crate::handles::{self, Corner};
use crate::input::{KeyEvent, MouseButton, PointerEvent};
use crate::registry::FieldKindRegistry;
use crate::store::FieldStore;
use crate::viewport::Origin;
use crate::viewports::Viewports;
use kurbo::{Point, Rect, Size, Vec2};
use std::fmt;
use std::rc::Rc;

/// Host hook for routing pointer events to window-level listeners.
///
/// Acquired when a drag or resize begins and released when it ends, on
/// every exit path.
pub trait PointerCapture {
    fn acquire(&self);
    fn release(&self);
}

/// Holds pointer capture for the lifetime of a gesture.
pub struct CaptureGuard {
    surface: Rc<dyn PointerCapture>,
}

impl CaptureGuard {
    fn acquire(surface: &Rc<dyn PointerCapture>) -> Self {
        surface.acquire();
        Self {
            surface: Rc::clone(surface),
        }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.surface.release();
    }
}

impl fmt::Debug for CaptureGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CaptureGuard")
    }
}

/// Ghost rectangle shown while placing a field. Never committed on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub kind: String,
    pub page: u32,
    /// Document-space bounds.
    pub rect: Rect,
}

/// An in-flight drag or resize.
#[derive(Debug)]
pub struct Gesture {
    pub id: FieldId,
    pub page: u32,
    /// Geometry at pointer-down.
    pub original: Rect,
    /// Geometry derived from the latest pointer position.
    pub current: Rect,
    last_screen: Point,
    /// Pixel displacement since pointer-down.
    accumulated: Vec2,
    _capture: Option<CaptureGuard>,
}

impl Gesture {
    fn begin(field: &Field, screen: Point, capture: Option<&Rc<dyn PointerCapture>>) -> Self {
        Self {
            id: field.id,
            page: field.page,
            original: field.rect(),
            current: field.rect(),
            last_screen: screen,
            accumulated: Vec2::ZERO,
            _capture: capture.map(CaptureGuard::acquire),
        }
    }

    /// Fold a pointer position into the gesture. Returns whether `current`
    /// changed.
    fn advance(
        &mut self,
        screen: Point,
        corner: Option<Corner>,
        viewports: &Viewports,
        min_size: f64,
    ) -> Result<bool, MapError> {
        self.accumulated += screen - self.last_screen;
        self.last_screen = screen;
        let viewport = viewports.get(self.page)?;
        let delta = viewport.screen_delta_to_document_delta(self.accumulated)?;
        let next = match corner {
            None => handles::apply_move(self.original, delta),
            Some(corner) => {
                let corner = match viewport.origin {
                    Origin::TopLeft => corner,
                    Origin::BottomLeft => corner.mirrored_vertically(),
                };
                handles::apply_resize(self.original, corner, delta, min_size)
            }
        };
        let changed = next != self.current;
        self.current = next;
        Ok(changed)
    }

    pub fn is_noop(&self) -> bool {
        self.current == self.original
    }
}

/// Controller state.
#[derive(Debug, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Placing {
        kind: String,
        preview: Option<Preview>,
    },
    Dragging(Gesture),
    Resizing {
        corner: Corner,
        gesture: Gesture,
    },
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Placing { .. } => "placing",
            InteractionState::Dragging(_) => "dragging",
            InteractionState::Resizing { .. } => "resizing",
        }
    }

    /// The in-flight drag or resize, if any.
    pub fn gesture(&self) -> Option<&Gesture> {
        match self {
            InteractionState::Dragging(gesture) | InteractionState::Resizing { gesture, .. } => {
                Some(gesture)
            }
            _ => None,
        }
    }
}

/// What an event did, for the host to redraw or react to.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    None,
    PreviewMoved(Preview),
    PreviewHidden,
    Created(FieldId),
    Selected(Option<FieldId>),
    /// A drag or resize moved; `rect` is the geometry to draw.
    Tracking { id: FieldId, rect: Rect },
    Moved(FieldId),
    Resized(FieldId),
    Removed(FieldId),
    Cancelled,
    /// The page was not mapped yet. Nothing changed; try again next frame.
    Retry(MapError),
}

/// Everything a handler may read or mutate.
pub struct InteractionContext<'a> {
    pub store: &'a mut FieldStore,
    pub viewports: &'a Viewports,
    pub registry: &'a dyn FieldKindRegistry,
}

/// Pointer-driven state machine over the field store.
pub struct InteractionController {
    state: InteractionState,
    capture: Option<Rc<dyn PointerCapture>>,
    drag_mode: DragMode,
    min_field_size: f64,
    handle_hit_radius: f64,
    default_field_size: Size,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl InteractionController {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            state: InteractionState::Idle,
            capture: None,
            drag_mode: config.drag_mode,
            min_field_size: config.min_field_size,
            handle_hit_radius: config.handle_hit_radius_px,
            default_field_size: config.default_field_size,
        }
    }

    /// Install the host's pointer capture hook.
    pub fn set_pointer_capture(&mut self, capture: Rc<dyn PointerCapture>) {
        self.capture = Some(capture);
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, InteractionState::Idle)
    }

    pub fn preview(&self) -> Option<&Preview> {
        match &self.state {
            InteractionState::Placing { preview, .. } => preview.as_ref(),
            _ => None,
        }
    }

    /// CSS cursor for the current state.
    pub fn cursor(&self) -> &'static str {
        match &self.state {
            InteractionState::Idle => "default",
            InteractionState::Placing { .. } => "crosshair",
            InteractionState::Dragging(_) => "move",
            InteractionState::Resizing { corner, .. } => corner.cursor(),
        }
    }

    /// Enter placement mode for a field kind.
    pub fn start_placement(&mut self, kind: impl Into<String>) {
        let kind = kind.into();
        if self.state.gesture().is_some() {
            log::debug!("abandoning {} to place {kind}", self.state.name());
        }
        log::debug!("placing {kind}");
        self.state = InteractionState::Placing { kind, preview: None };
    }

    /// Leave placement mode without committing. Returns whether it was active.
    pub fn cancel_placement(&mut self) -> bool {
        if matches!(self.state, InteractionState::Placing { .. }) {
            log::debug!("placement cancelled");
            self.state = InteractionState::Idle;
            true
        } else {
            false
        }
    }

    /// Drop any in-flight state. A live gesture's geometry is put back, so
    /// nothing half-done outlives the abort.
    pub fn abort(&mut self, store: &mut FieldStore) {
        if !self.is_idle() {
            log::debug!("aborting {}", self.state.name());
        }
        let state = std::mem::take(&mut self.state);
        if let Some(gesture) = state.gesture() {
            self.revert(gesture, store);
        }
    }

    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        ctx: &mut InteractionContext<'_>,
    ) -> Outcome {
        match event {
            PointerEvent::Move { position } => self.pointer_move(position, ctx),
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
            } => self.pointer_down(position, ctx),
            PointerEvent::Up {
                position,
                button: MouseButton::Left,
            } => {
                if self.state.gesture().is_none() {
                    return Outcome::None;
                }
                // The up position may differ from the last move.
                if let Outcome::Retry(err) = self.pointer_move(position, ctx) {
                    log::debug!("final pointer position unmapped: {err}");
                }
                self.finish(ctx.store)
            }
            PointerEvent::Cancel => self.pointer_cancel(),
            PointerEvent::Down { .. } | PointerEvent::Up { .. } => Outcome::None,
        }
    }

    pub fn handle_key(&mut self, event: &KeyEvent, store: &mut FieldStore) -> Outcome {
        if event.is_press_of("Escape") {
            return self.escape(store);
        }
        if (event.is_press_of("Delete") || event.is_press_of("Backspace")) && self.is_idle() {
            if let Some(id) = store.active() {
                store.remove(id);
                return Outcome::Removed(id);
            }
        }
        Outcome::None
    }

    fn pointer_move(&mut self, position: Point, ctx: &mut InteractionContext<'_>) -> Outcome {
        let fallback_size = self.default_field_size;
        let min_size = self.min_field_size;
        let live = self.drag_mode == DragMode::Live;

        let (gesture, corner) = match &mut self.state {
            InteractionState::Idle => return Outcome::None,
            InteractionState::Placing { kind, preview } => {
                let Some(page) = ctx.viewports.page_at(position) else {
                    return if preview.take().is_some() {
                        Outcome::PreviewHidden
                    } else {
                        Outcome::None
                    };
                };
                return match placement_rect(kind, page, position, ctx, fallback_size) {
                    Ok(rect) => {
                        let next = Preview {
                            kind: kind.clone(),
                            page,
                            rect,
                        };
                        *preview = Some(next.clone());
                        Outcome::PreviewMoved(next)
                    }
                    Err(err) => Outcome::Retry(err),
                };
            }
            InteractionState::Dragging(gesture) => (gesture, None),
            InteractionState::Resizing { corner, gesture } => (gesture, Some(*corner)),
        };

        if !ctx.store.contains(gesture.id) {
            log::debug!("field {} vanished mid-gesture", gesture.id);
            self.state = InteractionState::Idle;
            return Outcome::Cancelled;
        }
        match gesture.advance(position, corner, ctx.viewports, min_size) {
            Ok(true) => {
                if live {
                    ctx.store.update(gesture.id, &FieldPatch::geometry(gesture.current));
                }
                Outcome::Tracking {
                    id: gesture.id,
                    rect: gesture.current,
                }
            }
            Ok(false) => Outcome::None,
            Err(err) => Outcome::Retry(err),
        }
    }

    fn pointer_down(&mut self, position: Point, ctx: &mut InteractionContext<'_>) -> Outcome {
        if self.state.gesture().is_some() {
            // The previous up never arrived.
            log::debug!("pointer-down during {}; closing it", self.state.name());
            self.finish(ctx.store);
        }

        if let InteractionState::Placing { kind, .. } = &self.state {
            let Some(page) = ctx.viewports.page_at(position) else {
                return Outcome::None;
            };
            let kind = kind.clone();
            return match placement_rect(&kind, page, position, ctx, self.default_field_size) {
                Ok(rect) => {
                    let id = ctx.store.create(Field::new(kind, page, rect));
                    self.state = InteractionState::Idle;
                    Outcome::Created(id)
                }
                Err(err) => Outcome::Retry(err),
            };
        }

        // Handles of the active field take precedence over field bodies.
        if let Some(field) = ctx.store.active_field() {
            if let Ok(screen) = ctx.viewports.to_screen_rect(field.page, field.rect()) {
                let hit = handles::hit_test_handles(screen, position, self.handle_hit_radius);
                if let Some(corner) = hit {
                    let id = field.id;
                    let gesture = Gesture::begin(field, position, self.capture.as_ref());
                    log::debug!("resizing {id} from {corner:?}");
                    self.state = InteractionState::Resizing { corner, gesture };
                    return Outcome::Selected(Some(id));
                }
            }
        }

        let Some(page) = ctx.viewports.page_at(position) else {
            return self.deselect(ctx.store);
        };
        let point = match ctx.viewports.to_document_point(page, position) {
            Ok(point) => point,
            Err(err) => return Outcome::Retry(err),
        };
        let Some(id) = ctx.store.hit_test(page, point) else {
            return self.deselect(ctx.store);
        };
        ctx.store.select(id);
        if let Some(field) = ctx.store.get(id) {
            log::debug!("dragging {id}");
            let gesture = Gesture::begin(field, position, self.capture.as_ref());
            self.state = InteractionState::Dragging(gesture);
        }
        Outcome::Selected(Some(id))
    }

    /// Close a drag or resize, committing it in batched mode.
    fn finish(&mut self, store: &mut FieldStore) -> Outcome {
        let (gesture, resized) = match std::mem::take(&mut self.state) {
            InteractionState::Dragging(gesture) => (gesture, false),
            InteractionState::Resizing { gesture, .. } => (gesture, true),
            other => {
                self.state = other;
                return Outcome::None;
            }
        };
        if gesture.is_noop() {
            return Outcome::Selected(Some(gesture.id));
        }
        if self.drag_mode == DragMode::Batched {
            store.update(gesture.id, &FieldPatch::geometry(gesture.current));
        }
        if !store.contains(gesture.id) {
            return Outcome::Cancelled;
        }
        let verb = if resized { "resized" } else { "moved" };
        log::debug!("{verb} {} to {:?}", gesture.id, gesture.current);
        if resized {
            Outcome::Resized(gesture.id)
        } else {
            Outcome::Moved(gesture.id)
        }
    }

    /// The pointer was taken away. Live edits stay applied, batched ones
    /// are discarded.
    fn pointer_cancel(&mut self) -> Outcome {
        match &mut self.state {
            InteractionState::Placing { preview, .. } => {
                if preview.take().is_some() {
                    Outcome::PreviewHidden
                } else {
                    Outcome::None
                }
            }
            InteractionState::Dragging(_) | InteractionState::Resizing { .. } => {
                log::debug!("pointer cancelled during {}", self.state.name());
                self.state = InteractionState::Idle;
                Outcome::Cancelled
            }
            InteractionState::Idle => Outcome::None,
        }
    }

    fn escape(&mut self, store: &mut FieldStore) -> Outcome {
        match std::mem::take(&mut self.state) {
            InteractionState::Placing { .. } => {
                log::debug!("placement cancelled");
                Outcome::Cancelled
            }
            InteractionState::Dragging(gesture) | InteractionState::Resizing { gesture, .. } => {
                self.revert(&gesture, store);
                Outcome::Cancelled
            }
            InteractionState::Idle => self.deselect(store),
        }
    }

    fn revert(&self, gesture: &Gesture, store: &mut FieldStore) {
        if self.drag_mode == DragMode::Live && !gesture.is_noop() {
            store.update(gesture.id, &FieldPatch::geometry(gesture.original));
        }
    }

    fn deselect(&self, store: &mut FieldStore) -> Outcome {
        if store.active().is_some() {
            store.clear_selection();
            Outcome::Selected(None)
        } else {
            Outcome::None
        }
    }
}

/// Default-sized rectangle centred on the pointer, kept inside the page.
fn placement_rect(
    kind: &str,
    page: u32,
    screen: Point,
    ctx: &InteractionContext<'_>,
    fallback: Size,
) -> Result<Rect, MapError> {
    let viewport = ctx.viewports.get(page)?;
    let point = viewport.to_document_point(screen)?;
    let size = ctx.registry.default_size(kind).unwrap_or(fallback);
    let page_size = viewport.page_size();
    let x = (point.x - size.width / 2.0).min(page_size.width - size.width).max(0.0);
    let y = (point.y - size.height / 2.0).min(page_size.height - size.height).max(0.0);
    Ok(Rect::from_origin_size(Point::new(x, y), size))
}
