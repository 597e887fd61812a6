//! Core engine for datapaint: staged edits, undo/redo, and viewport
//! rendering over a SQLite-backed point store.
//! This crate is the single source of truth for editing invariants.

pub mod db;
pub mod engine;
pub mod export;
pub mod logging;
pub mod model;
pub mod repo;
pub mod script;

pub use engine::aggregate::{glyph, CellContent, CellGrid, FORBIDDEN_GLYPH};
pub use engine::edit_log::EditLog;
pub use engine::save::save_edits;
pub use engine::viewport::{Cell, Cursor, Direction, Viewport};
pub use engine::{Command, Session};
pub use export::{export_csv, ExportError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{Bounds, EditAction, Point, PointKind, StagedEdit, TableMeta, ValidRange};
pub use repo::edit_repo::{EditRepository, SqliteEditRepository};
pub use repo::meta_repo::{MetaRepository, SqliteMetaRepository};
pub use repo::point_repo::{PointRepository, SqlitePointRepository};
pub use repo::{RepoError, RepoResult};
pub use script::{action_for_key, parse_key, parse_script, Key, KeyAction, ScriptError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
