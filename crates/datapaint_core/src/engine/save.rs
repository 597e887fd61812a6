//! Commit (save) transaction: applies every active staged edit to the
//! committed store atomically, then clears the log.
//!
//! # Invariants
//! - One transaction per save; any storage failure rolls back completely
//!   and leaves the in-memory log untouched for retry.
//! - Active edits apply in ascending seq order.
//! - After a successful save the log is empty; saved state is not
//!   undoable.

use crate::engine::edit_log::EditLog;
use crate::model::{EditAction, TableMeta};
use crate::repo::edit_repo::{EditRepository, SqliteEditRepository};
use crate::repo::point_repo::{PointRepository, SqlitePointRepository};
use crate::repo::RepoResult;
use log::{debug, info};
use rusqlite::Connection;

/// Applies all active staged edits and returns how many were committed.
///
/// A save with zero active edits is a successful no-op returning 0;
/// leftover undone entries are still dropped so a saved session always
/// ends with an empty log.
pub fn save_edits(
    conn: &mut Connection,
    meta: &TableMeta,
    log: &mut EditLog,
) -> RepoResult<usize> {
    if log.active_count() == 0 {
        if !log.is_empty() {
            SqliteEditRepository::try_new(conn, meta)?.clear_all()?;
            log.reset();
        }
        info!(
            "event=save_commit module=engine status=ok table={} count=0",
            meta.table_name
        );
        return Ok(0);
    }

    let tx = conn.transaction()?;
    let mut applied = 0usize;
    {
        let points = SqlitePointRepository::try_new(&tx, &meta.table_name)?;
        for edit in log.active_edits() {
            match edit.action {
                EditAction::Create { x, y, kind } => {
                    let id = points.insert(x, y, kind.target(meta))?;
                    debug!(
                        "event=save_apply module=engine action=create seq={} id={id}",
                        edit.seq
                    );
                }
                EditAction::Delete { data_id, .. } => points.delete(data_id)?,
                EditAction::Retype { data_id, to } => {
                    points.update_target(data_id, to.target(meta))?;
                }
            }
            applied += 1;
        }

        SqliteEditRepository::try_new(&tx, meta)?.clear_all()?;
    }
    tx.commit()?;

    log.reset();
    info!(
        "event=save_commit module=engine status=ok table={} count={applied}",
        meta.table_name
    );
    Ok(applied)
}
