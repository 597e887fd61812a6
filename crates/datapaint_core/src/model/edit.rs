//! Staged edit types: tentative, undoable mutations layered over the
//! committed point store.
//!
//! # Invariants
//! - `seq` is the rowid of the mirrored `staged_edits` row; strictly
//!   increasing in recording order.
//! - `active == false` marks an edit that has been undone; it stays in the
//!   log so redo can reactivate it in order.

use serde::{Deserialize, Serialize};

use super::point::PointKind;

/// One tentative mutation against the committed store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EditAction {
    /// A brand-new point; no committed id exists until save.
    Create { x: f64, y: f64, kind: PointKind },
    /// Removal of a committed point. Position is captured at record time
    /// so the durable shadow row locates the cell without a lookup.
    Delete { data_id: i64, x: f64, y: f64 },
    /// Type change of a committed point.
    Retype { data_id: i64, to: PointKind },
}

impl EditAction {
    /// The committed point this edit references, if any.
    pub fn data_id(&self) -> Option<i64> {
        match self {
            Self::Create { .. } => None,
            Self::Delete { data_id, .. } | Self::Retype { data_id, .. } => Some(*data_id),
        }
    }
}

/// A log entry: an action plus its position in the undo machinery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StagedEdit {
    pub seq: i64,
    #[serde(flatten)]
    pub action: EditAction,
    pub active: bool,
}
