//! The engine: an explicit session object owning viewport, cursor, and
//! staged edit log, driven by commands.
//!
//! # Responsibility
//! - Apply one command at a time: log mutation, viewport/cursor update.
//! - Keep edit targeting rules (topmost point first) in one place.
//!
//! # Invariants
//! - Single-threaded and synchronous; a command is fully applied before
//!   the next is accepted.
//! - Point creation outside the valid range is a silent no-op, never an
//!   error.

use log::{debug, info};
use rusqlite::Connection;

pub mod aggregate;
pub mod edit_log;
pub mod save;
pub mod viewport;

use crate::model::{Bounds, EditAction, PointKind, TableMeta};
use crate::repo::edit_repo::SqliteEditRepository;
use crate::repo::meta_repo::{MetaRepository, SqliteMetaRepository};
use crate::repo::point_repo::{PointRepository, SqlitePointRepository};
use crate::repo::{RepoError, RepoResult};
use aggregate::CellGrid;
use edit_log::EditLog;
use viewport::{Cell, Cursor, Direction, Viewport};

/// One fully-applied user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    ZoomIn,
    ZoomOut,
    ResetView,
    Create(PointKind),
    Delete,
    Retype(PointKind),
    Flip,
    Undo,
    Redo,
    Save,
}

/// One logical point visible at a cell, most recent first.
#[derive(Debug, Clone, Copy, PartialEq)]
enum StackEntry {
    /// An unsaved staged create.
    Pending { seq: i64, kind: PointKind },
    /// A committed point, with its effective kind after active retypes.
    /// `kind` is `None` for rows whose label matches neither meaning.
    Committed {
        id: i64,
        x: f64,
        y: f64,
        kind: Option<PointKind>,
    },
}

/// Mutable state of one open editing session.
///
/// All session state lives here and is passed explicitly; there are no
/// ambient globals, which keeps the engine testable away from any
/// terminal layer.
pub struct Session<'conn> {
    conn: &'conn mut Connection,
    meta: TableMeta,
    viewport: Viewport,
    cursor: Cursor,
    log: EditLog,
}

impl<'conn> Session<'conn> {
    /// Opens a session on an existing table with a `cols` x `rows` cell
    /// grid. The viewport starts fitted to the valid range, the cursor at
    /// its center.
    pub fn open(
        conn: &'conn mut Connection,
        table: &str,
        cols: i32,
        rows: i32,
    ) -> RepoResult<Self> {
        let meta = SqliteMetaRepository::new(&*conn)
            .read(table)?
            .ok_or_else(|| RepoError::UnknownTable(table.to_string()))?;

        let viewport = Viewport::new(meta.valid_range(), cols, rows);
        let cursor = Cursor::centered(&viewport);
        let log = EditLog::load(&SqliteEditRepository::try_new(&*conn, &meta)?)?;

        info!(
            "event=session_open module=engine status=ok table={table} cols={cols} rows={rows} staged={}",
            log.len()
        );

        Ok(Self {
            conn,
            meta,
            viewport,
            cursor,
            log,
        })
    }

    pub fn meta(&self) -> &TableMeta {
        &self.meta
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn log(&self) -> &EditLog {
        &self.log
    }

    /// Data-space coordinates under the cursor.
    pub fn cursor_data(&self) -> (f64, f64) {
        self.viewport.to_data(self.cursor.cell)
    }

    /// Applies one command. User-input rejections (forbidden create,
    /// undo/redo at the ends, empty cells) are silent no-ops; only
    /// storage failures surface as errors.
    pub fn apply(&mut self, command: Command) -> RepoResult<()> {
        match command {
            Command::Move(direction) => {
                self.move_cursor(direction);
                Ok(())
            }
            Command::ZoomIn => {
                self.viewport.zoom_in();
                Ok(())
            }
            Command::ZoomOut => {
                self.viewport.zoom_out();
                Ok(())
            }
            Command::ResetView => {
                self.viewport.reset_full();
                self.cursor = Cursor::centered(&self.viewport);
                Ok(())
            }
            Command::Create(kind) => self.create_at_cursor(kind),
            Command::Delete => self.delete_at_cursor(),
            Command::Retype(kind) => self.retype_at_cursor(kind),
            Command::Flip => self.flip_at_cursor(),
            Command::Undo => {
                let repo = SqliteEditRepository::try_new(&*self.conn, &self.meta)?;
                self.log.undo(&repo)?;
                Ok(())
            }
            Command::Redo => {
                let repo = SqliteEditRepository::try_new(&*self.conn, &self.meta)?;
                self.log.redo(&repo)?;
                Ok(())
            }
            Command::Save => self.save().map(|_| ()),
        }
    }

    /// Commits all active staged edits; see [`save::save_edits`].
    pub fn save(&mut self) -> RepoResult<usize> {
        save::save_edits(&mut *self.conn, &self.meta, &mut self.log)
    }

    /// Aggregates the visible cells for rendering.
    pub fn aggregate(&self) -> RepoResult<CellGrid> {
        let points = SqlitePointRepository::try_new(&*self.conn, &self.meta.table_name)?;
        aggregate::aggregate(&points, &self.viewport, &self.log, &self.meta)
    }

    /// Renders the visible grid as one string per row.
    pub fn render(&self) -> RepoResult<Vec<String>> {
        Ok(aggregate::render_rows(&self.aggregate()?, &self.viewport))
    }

    /// Moves the cursor one cell; at a grid edge the viewport pans one
    /// cell instead and the cursor stays pinned.
    fn move_cursor(&mut self, direction: Direction) {
        let next = self.cursor.cell.step(direction);
        if self.viewport.contains_cell(next) {
            self.cursor.cell = next;
        } else {
            self.viewport.pan(direction);
        }
    }

    fn create_at_cursor(&mut self, kind: PointKind) -> RepoResult<()> {
        let (x, y) = self.cursor_data();
        if self.viewport.is_forbidden(x, y) {
            debug!(
                "event=create_rejected module=engine table={} x={x} y={y}",
                self.meta.table_name
            );
            return Ok(());
        }

        let repo = SqliteEditRepository::try_new(&*self.conn, &self.meta)?;
        self.log.record(&repo, EditAction::Create { x, y, kind })?;
        Ok(())
    }

    /// Deletes the topmost logical point at the cursor. An unsaved create
    /// is reversed outright; a committed point gets a delete edit.
    fn delete_at_cursor(&mut self) -> RepoResult<()> {
        match self.stack_at(self.cursor.cell)?.into_iter().next() {
            Some(StackEntry::Pending { seq, .. }) => {
                let repo = SqliteEditRepository::try_new(&*self.conn, &self.meta)?;
                self.log.reverse_create(&repo, seq)
            }
            Some(StackEntry::Committed { id, x, y, .. }) => {
                let repo = SqliteEditRepository::try_new(&*self.conn, &self.meta)?;
                self.log
                    .record(&repo, EditAction::Delete { data_id: id, x, y })?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Retypes the topmost point at the cursor whose effective kind
    /// differs from `to`. A pending create is rewritten in place; a
    /// committed point gets a retype edit.
    fn retype_at_cursor(&mut self, to: PointKind) -> RepoResult<()> {
        let target = self
            .stack_at(self.cursor.cell)?
            .into_iter()
            .find(|entry| match entry {
                StackEntry::Pending { kind, .. } => *kind != to,
                StackEntry::Committed { kind, .. } => *kind == Some(to.flipped()),
            });

        match target {
            Some(StackEntry::Pending { seq, .. }) => {
                let repo = SqliteEditRepository::try_new(&*self.conn, &self.meta)?;
                self.log.retype_create(&repo, seq, to)
            }
            Some(StackEntry::Committed { id, .. }) => {
                let repo = SqliteEditRepository::try_new(&*self.conn, &self.meta)?;
                self.log
                    .record(&repo, EditAction::Retype { data_id: id, to })?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Flips the topmost point at the cursor to its opposite kind.
    fn flip_at_cursor(&mut self) -> RepoResult<()> {
        match self.stack_at(self.cursor.cell)?.into_iter().next() {
            Some(StackEntry::Pending { seq, kind }) => {
                let repo = SqliteEditRepository::try_new(&*self.conn, &self.meta)?;
                self.log.retype_create(&repo, seq, kind.flipped())
            }
            Some(StackEntry::Committed {
                id,
                kind: Some(kind),
                ..
            }) => {
                let repo = SqliteEditRepository::try_new(&*self.conn, &self.meta)?;
                self.log.record(
                    &repo,
                    EditAction::Retype {
                        data_id: id,
                        to: kind.flipped(),
                    },
                )?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// The logical points visible at `cell`, most recently created first:
    /// pending creates (newest first), then committed points (highest id
    /// first) that are not deleted by an active edit, with active retypes
    /// applied.
    fn stack_at(&self, cell: Cell) -> RepoResult<Vec<StackEntry>> {
        let mut stack = Vec::new();

        for edit in self.log.active_edits().iter().rev() {
            if let EditAction::Create { x, y, kind } = edit.action {
                if self.viewport.to_cell(x, y) == Some(cell) {
                    stack.push(StackEntry::Pending {
                        seq: edit.seq,
                        kind,
                    });
                }
            }
        }

        for point in self.committed_in(cell)? {
            match self.latest_edit_for(point.id) {
                Some(EditAction::Delete { .. }) => continue,
                Some(EditAction::Retype { to, .. }) => stack.push(StackEntry::Committed {
                    id: point.id,
                    x: point.x,
                    y: point.y,
                    kind: Some(*to),
                }),
                _ => stack.push(StackEntry::Committed {
                    id: point.id,
                    x: point.x,
                    y: point.y,
                    kind: PointKind::from_target(&self.meta, &point.target),
                }),
            }
        }

        Ok(stack)
    }

    /// Committed points whose coordinates round into `cell`, newest id
    /// first. One bounded query over the cell's catchment area.
    fn committed_in(&self, cell: Cell) -> RepoResult<Vec<crate::model::Point>> {
        let (x, y) = self.viewport.to_data(cell);
        let half = self.viewport.units_per_cell() / 2.0;
        let bounds = Bounds {
            x_min: x - half,
            x_max: x + half,
            y_min: y - half,
            y_max: y + half,
        };

        let repo = SqlitePointRepository::try_new(&*self.conn, &self.meta.table_name)?;
        let mut points = repo.query_range(&bounds)?;
        points.retain(|point| self.viewport.to_cell(point.x, point.y) == Some(cell));
        points.sort_by_key(|point| std::cmp::Reverse(point.id));
        Ok(points)
    }

    /// The latest active delete/retype edit referencing `data_id`; later
    /// edits supersede earlier ones for visibility.
    fn latest_edit_for(&self, data_id: i64) -> Option<&EditAction> {
        self.log
            .active_edits()
            .iter()
            .rev()
            .find_map(|edit| match &edit.action {
                action @ (EditAction::Delete { data_id: id, .. }
                | EditAction::Retype { data_id: id, .. })
                    if *id == data_id =>
                {
                    Some(action)
                }
                _ => None,
            })
    }
}
