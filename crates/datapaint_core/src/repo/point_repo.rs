//! Committed point store: CRUD and bounded range queries over one
//! dataset's data table.
//!
//! # Responsibility
//! - Own every read and write of committed point rows.
//! - Keep range queries bounded by the caller's data-space rectangle so
//!   render cost never depends on total table size.
//!
//! # Invariants
//! - Writes happen only from the save transaction and the non-interactive
//!   CLI point operations; the interactive engine stages edits instead.

use crate::model::{Bounds, Point};
use crate::repo::{validate_table_name, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

/// Repository interface for committed points.
pub trait PointRepository {
    fn insert(&self, x: f64, y: f64, target: &str) -> RepoResult<i64>;
    fn delete(&self, id: i64) -> RepoResult<()>;
    fn update_target(&self, id: i64, target: &str) -> RepoResult<()>;
    /// All points whose coordinates fall inside `bounds` (inclusive).
    fn query_range(&self, bounds: &Bounds) -> RepoResult<Vec<Point>>;
    /// Every point, ordered by id ascending. Used by CSV export.
    fn all_ordered(&self) -> RepoResult<Vec<Point>>;
}

/// SQLite-backed point repository for one data table.
#[derive(Debug)]
pub struct SqlitePointRepository<'conn> {
    conn: &'conn Connection,
    table: String,
}

impl<'conn> SqlitePointRepository<'conn> {
    pub fn try_new(conn: &'conn Connection, table: &str) -> RepoResult<Self> {
        validate_table_name(table)?;
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }
}

impl PointRepository for SqlitePointRepository<'_> {
    fn insert(&self, x: f64, y: f64, target: &str) -> RepoResult<i64> {
        self.conn.execute(
            &format!(
                "INSERT INTO \"{}\" (x, y, target) VALUES (?1, ?2, ?3);",
                self.table
            ),
            params![x, y, target],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn delete(&self, id: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM \"{}\" WHERE id = ?1;", self.table),
            [id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn update_target(&self, id: i64, target: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE \"{}\" SET target = ?1 WHERE id = ?2;",
                self.table
            ),
            params![target, id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn query_range(&self, bounds: &Bounds) -> RepoResult<Vec<Point>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, x, y, target FROM \"{}\"
             WHERE x >= ?1 AND x <= ?2 AND y >= ?3 AND y <= ?4;",
            self.table
        ))?;
        let mut rows = stmt.query(params![
            bounds.x_min,
            bounds.x_max,
            bounds.y_min,
            bounds.y_max
        ])?;

        let mut points = Vec::new();
        while let Some(row) = rows.next()? {
            points.push(parse_point_row(row)?);
        }
        Ok(points)
    }

    fn all_ordered(&self) -> RepoResult<Vec<Point>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, x, y, target FROM \"{}\" ORDER BY id;",
            self.table
        ))?;
        let mut rows = stmt.query([])?;

        let mut points = Vec::new();
        while let Some(row) = rows.next()? {
            points.push(parse_point_row(row)?);
        }
        Ok(points)
    }
}

fn parse_point_row(row: &Row<'_>) -> rusqlite::Result<Point> {
    Ok(Point {
        id: row.get("id")?,
        x: row.get("x")?,
        y: row.get("y")?,
        target: row.get("target")?,
    })
}
