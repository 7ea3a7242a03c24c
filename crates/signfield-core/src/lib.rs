//! Signfield Core Library
//!
//! Coordinate mapping, field interaction and block reconciliation for a
//! document-field editor. Fields are placed, dragged and resized on
//! rendered pages; after a short debounce they are merged into the ordered
//! block schema that gets persisted.
//!
//! The crate is host-agnostic: the rendering surface supplies
//! [`Viewport`]s, the host forwards [`PointerEvent`]s and calls
//! [`EditorSession::tick`] once per frame.

pub mod block;
pub mod config;
pub mod debounce;
pub mod error;
pub mod field;
pub mod handles;
pub mod input;
pub mod interaction;
pub mod reconcile;
pub mod registry;
pub mod session;
pub mod storage;
pub mod store;
pub mod viewport;
pub mod viewports;

pub use block::{Block, BlockId, FieldSchema, StagedMetadata};
pub use config::{DragMode, EditorConfig};
pub use debounce::Debouncer;
pub use error::{ConfigError, MapError, MapResult, StorageError, StorageResult};
pub use field::{Alignment, Field, FieldId, FieldPatch, HorizontalAlign, VerticalAlign};
pub use handles::Corner;
pub use input::{KeyEvent, MouseButton, PointerEvent};
pub use interaction::{InteractionController, InteractionState, Outcome, PointerCapture, Preview};
pub use reconcile::{ReconcileOutcome, ReconcileStats, Reconciler};
pub use registry::{FieldKindRegistry, KindInfo, StaticRegistry};
pub use session::{DocumentInfo, EditorSession};
pub use storage::{DocumentSnapshot, MemoryStorage, Storage};
pub use store::{FieldChange, FieldStore};
pub use viewport::{Origin, Viewport};
pub use viewports::{ProjectionCache, Viewports};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;
