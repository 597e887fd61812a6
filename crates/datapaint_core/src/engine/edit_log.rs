//! Staged edit log: an append-only sequence of tentative mutations plus a
//! single undo cursor.
//!
//! # Responsibility
//! - Track every tentative edit of the open session in recording order.
//! - Implement undo/redo as cursor movement over retained entries.
//! - Mirror every mutation to the durable shadow table.
//!
//! # Invariants
//! - Entries below the cursor are exactly the active ones; everything at
//!   or beyond the cursor has been undone.
//! - `seq` values are strictly increasing in recording order.
//! - Recording a new edit discards the undone tail permanently, in memory
//!   and in the shadow.

use crate::model::{EditAction, PointKind, StagedEdit};
use crate::repo::edit_repo::EditRepository;
use crate::repo::{RepoError, RepoResult};

/// Undo/redo-capable log of staged edits for one open session.
#[derive(Debug, Default)]
pub struct EditLog {
    edits: Vec<StagedEdit>,
    cursor: usize,
}

impl EditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the shadow rows left for this table. Active rows come first
    /// and the cursor lands after the last of them, so a log abandoned in
    /// any state reopens consistently.
    pub fn load<R: EditRepository>(repo: &R) -> RepoResult<Self> {
        let edits = repo.load()?;
        let cursor = edits.iter().filter(|edit| edit.active).count();
        Ok(Self { edits, cursor })
    }

    /// Appends a new active edit, discarding any redo tail first.
    pub fn record<R: EditRepository>(&mut self, repo: &R, action: EditAction) -> RepoResult<i64> {
        if self.cursor < self.edits.len() {
            repo.clear_inactive()?;
            self.edits.truncate(self.cursor);
        }

        let seq = repo.append(&action)?;
        self.edits.push(StagedEdit {
            seq,
            action,
            active: true,
        });
        self.cursor = self.edits.len();
        Ok(seq)
    }

    /// Deactivates the most recent active edit. No-op when nothing is
    /// left to undo; returns whether an edit was undone.
    pub fn undo<R: EditRepository>(&mut self, repo: &R) -> RepoResult<bool> {
        if self.cursor == 0 {
            return Ok(false);
        }

        self.cursor -= 1;
        let edit = &mut self.edits[self.cursor];
        edit.active = false;
        repo.set_active(edit.seq, false)?;
        Ok(true)
    }

    /// Reactivates the most recently undone edit. No-op when nothing is
    /// available for redo; returns whether an edit was restored.
    pub fn redo<R: EditRepository>(&mut self, repo: &R) -> RepoResult<bool> {
        if self.cursor == self.edits.len() {
            return Ok(false);
        }

        let edit = &mut self.edits[self.cursor];
        edit.active = true;
        repo.set_active(edit.seq, true)?;
        self.cursor += 1;
        Ok(true)
    }

    /// Reverses a pending create: the entry is deactivated and moved to
    /// the redo boundary, so the very next redo restores exactly this
    /// create and the next recorded edit purges it with the rest of the
    /// tail. Not a new log entry.
    pub fn reverse_create<R: EditRepository>(&mut self, repo: &R, seq: i64) -> RepoResult<()> {
        let index = self.edits[..self.cursor]
            .iter()
            .position(|edit| edit.seq == seq)
            .ok_or(RepoError::NotFound(seq))?;
        debug_assert!(matches!(
            self.edits[index].action,
            EditAction::Create { .. }
        ));

        let mut edit = self.edits.remove(index);
        edit.active = false;
        repo.set_active(edit.seq, false)?;

        self.cursor -= 1;
        self.edits.insert(self.cursor, edit);
        Ok(())
    }

    /// Rewrites the kind of a pending create in place, in memory and in
    /// the shadow row. Not a new log entry: a later undo removes the
    /// create in its latest kind.
    pub fn retype_create<R: EditRepository>(
        &mut self,
        repo: &R,
        seq: i64,
        to: PointKind,
    ) -> RepoResult<()> {
        let edit = self.edits[..self.cursor]
            .iter_mut()
            .find(|edit| edit.seq == seq)
            .ok_or(RepoError::NotFound(seq))?;

        match &mut edit.action {
            EditAction::Create { kind, .. } => {
                *kind = to;
                repo.retarget_create(seq, to)?;
                Ok(())
            }
            _ => Err(RepoError::InvalidData(format!(
                "staged edit {seq} is not a create"
            ))),
        }
    }

    /// Empties the log after a successful save.
    pub fn reset(&mut self) {
        self.edits.clear();
        self.cursor = 0;
    }

    /// Active edits in ascending seq order.
    pub fn active_edits(&self) -> &[StagedEdit] {
        &self.edits[..self.cursor]
    }

    /// Every retained edit, active or undone.
    pub fn all_edits(&self) -> &[StagedEdit] {
        &self.edits
    }

    pub fn active_count(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.edits.len()
    }
}
