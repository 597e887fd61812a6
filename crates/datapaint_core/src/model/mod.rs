//! Domain model for committed points, table metadata, and staged edits.
//!
//! # Responsibility
//! - Define canonical data structures used by the engine and repositories.
//! - Keep the mapping between point kinds and their per-table meaning
//!   strings in one place.
//!
//! # Invariants
//! - Committed points are identified by their SQLite rowid.
//! - A staged edit never mutates committed storage until saved.

pub mod edit;
pub mod point;

pub use edit::{EditAction, StagedEdit};
pub use point::{Bounds, Point, PointKind, TableMeta, ValidRange};
