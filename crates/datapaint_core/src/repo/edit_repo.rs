//! Durable shadow of the staged edit log.
//!
//! # Responsibility
//! - Mirror every in-memory log mutation to the `staged_edits` table so
//!   pending work survives inspection by external tooling and the
//!   non-interactive commit command.
//!
//! # Invariants
//! - The shadow is written through the in-memory log, never the other way
//!   around; loading happens once, when a session or commit opens.
//! - `new_target` holds a meaning string; translation to `PointKind` goes
//!   through the owning table's metadata.

use crate::model::{EditAction, PointKind, StagedEdit, TableMeta};
use crate::repo::{validate_table_name, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

/// Repository interface for the staged-edit shadow table.
pub trait EditRepository {
    /// Inserts an active row and returns its sequence number (rowid).
    fn append(&self, action: &EditAction) -> RepoResult<i64>;
    fn set_active(&self, seq: i64, active: bool) -> RepoResult<()>;
    /// Rewrites the stored label of a pending create edit.
    fn retarget_create(&self, seq: i64, to: PointKind) -> RepoResult<()>;
    /// Deletes every inactive row for this table (redo-tail truncation).
    fn clear_inactive(&self) -> RepoResult<usize>;
    /// Deletes every row for this table (post-save reset).
    fn clear_all(&self) -> RepoResult<usize>;
    /// Loads the shadow, active rows first, each group in seq order.
    fn load(&self) -> RepoResult<Vec<StagedEdit>>;
}

/// SQLite-backed shadow repository for one table's staged edits.
pub struct SqliteEditRepository<'conn, 'meta> {
    conn: &'conn Connection,
    meta: &'meta TableMeta,
}

impl<'conn, 'meta> SqliteEditRepository<'conn, 'meta> {
    pub fn try_new(conn: &'conn Connection, meta: &'meta TableMeta) -> RepoResult<Self> {
        validate_table_name(&meta.table_name)?;
        Ok(Self { conn, meta })
    }
}

impl EditRepository for SqliteEditRepository<'_, '_> {
    fn append(&self, action: &EditAction) -> RepoResult<i64> {
        match *action {
            EditAction::Create { x, y, kind } => {
                self.conn.execute(
                    "INSERT INTO staged_edits (table_name, action, x, y, new_target, is_active)
                     VALUES (?1, 'create', ?2, ?3, ?4, 1);",
                    params![self.meta.table_name, x, y, kind.target(self.meta)],
                )?;
            }
            EditAction::Delete { data_id, x, y } => {
                self.conn.execute(
                    "INSERT INTO staged_edits (table_name, action, data_id, x, y, is_active)
                     VALUES (?1, 'delete', ?2, ?3, ?4, 1);",
                    params![self.meta.table_name, data_id, x, y],
                )?;
            }
            EditAction::Retype { data_id, to } => {
                self.conn.execute(
                    "INSERT INTO staged_edits (table_name, action, data_id, new_target, is_active)
                     VALUES (?1, 'retype', ?2, ?3, 1);",
                    params![self.meta.table_name, data_id, to.target(self.meta)],
                )?;
            }
        }
        Ok(self.conn.last_insert_rowid())
    }

    fn set_active(&self, seq: i64, active: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE staged_edits SET is_active = ?1 WHERE id = ?2 AND table_name = ?3;",
            params![active as i64, seq, self.meta.table_name],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(seq));
        }
        Ok(())
    }

    fn retarget_create(&self, seq: i64, to: PointKind) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE staged_edits SET new_target = ?1
             WHERE id = ?2 AND table_name = ?3 AND action = 'create';",
            params![to.target(self.meta), seq, self.meta.table_name],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(seq));
        }
        Ok(())
    }

    fn clear_inactive(&self) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM staged_edits WHERE table_name = ?1 AND is_active = 0;",
            [&self.meta.table_name],
        )?;
        Ok(removed)
    }

    fn clear_all(&self) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM staged_edits WHERE table_name = ?1;",
            [&self.meta.table_name],
        )?;
        Ok(removed)
    }

    fn load(&self) -> RepoResult<Vec<StagedEdit>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, action, data_id, x, y, new_target, is_active
             FROM staged_edits
             WHERE table_name = ?1
             ORDER BY is_active DESC, id ASC;",
        )?;
        let mut rows = stmt.query([&self.meta.table_name])?;

        let mut edits = Vec::new();
        while let Some(row) = rows.next()? {
            edits.push(parse_edit_row(self.meta, row)?);
        }
        Ok(edits)
    }
}

/// Discards the staged edits of every table.
pub fn clear_all_tables(conn: &Connection) -> RepoResult<usize> {
    let removed = conn.execute("DELETE FROM staged_edits;", [])?;
    Ok(removed)
}

fn parse_edit_row(meta: &TableMeta, row: &Row<'_>) -> RepoResult<StagedEdit> {
    let seq: i64 = row.get("id")?;
    let action_text: String = row.get("action")?;
    let active = row.get::<_, i64>("is_active")? != 0;

    let action = match action_text.as_str() {
        "create" => EditAction::Create {
            x: row.get("x")?,
            y: row.get("y")?,
            kind: parse_kind(meta, row, seq)?,
        },
        "delete" => EditAction::Delete {
            data_id: require_data_id(row, seq)?,
            x: row.get("x")?,
            y: row.get("y")?,
        },
        "retype" => EditAction::Retype {
            data_id: require_data_id(row, seq)?,
            to: parse_kind(meta, row, seq)?,
        },
        other => {
            return Err(RepoError::InvalidData(format!(
                "unknown action `{other}` in staged_edits row {seq}"
            )));
        }
    };

    Ok(StagedEdit { seq, action, active })
}

fn require_data_id(row: &Row<'_>, seq: i64) -> RepoResult<i64> {
    row.get::<_, Option<i64>>("data_id")?.ok_or_else(|| {
        RepoError::InvalidData(format!("missing data_id in staged_edits row {seq}"))
    })
}

fn parse_kind(meta: &TableMeta, row: &Row<'_>, seq: i64) -> RepoResult<PointKind> {
    let target: Option<String> = row.get("new_target")?;
    let target = target.ok_or_else(|| {
        RepoError::InvalidData(format!("missing new_target in staged_edits row {seq}"))
    })?;
    PointKind::from_target(meta, &target).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "label `{target}` in staged_edits row {seq} matches neither meaning of table `{}`",
            meta.table_name
        ))
    })
}
