//! Table metadata repository: per-table metadata CRUD plus creation of the
//! dynamic per-table data tables.
//!
//! # Responsibility
//! - Keep the `metadata` record and the data table for a dataset in step.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - A data table and its metadata row are created together.
//! - Data tables carry indexes on `x` and on `y` so viewport range queries
//!   stay proportional to visible density, not table size.

use crate::model::TableMeta;
use crate::repo::{validate_table_name, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for table metadata and table lifecycle.
pub trait MetaRepository {
    /// Creates the data table, its indexes, and the metadata record.
    fn create_table(&self, meta: &TableMeta) -> RepoResult<()>;
    fn read(&self, table_name: &str) -> RepoResult<Option<TableMeta>>;
    fn update(&self, meta: &TableMeta) -> RepoResult<()>;
    fn list_tables(&self) -> RepoResult<Vec<String>>;
    /// Drops the data table and removes its metadata record.
    fn drop_table(&self, table_name: &str) -> RepoResult<()>;
}

/// SQLite-backed metadata repository.
pub struct SqliteMetaRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMetaRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MetaRepository for SqliteMetaRepository<'_> {
    fn create_table(&self, meta: &TableMeta) -> RepoResult<()> {
        validate_table_name(&meta.table_name)?;

        let table = meta.table_name.as_str();
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" (
                id INTEGER PRIMARY KEY,
                x REAL NOT NULL,
                y REAL NOT NULL,
                target TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS \"{table}_x\" ON \"{table}\" (x);
            CREATE INDEX IF NOT EXISTS \"{table}_y\" ON \"{table}\" (y);"
        ))?;

        self.conn.execute(
            "INSERT INTO metadata (
                table_name,
                target_col_name,
                x_axis_name,
                y_axis_name,
                x_meaning,
                o_meaning,
                min_x,
                max_x,
                min_y,
                max_y
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                meta.table_name,
                meta.target_col_name,
                meta.x_axis_name,
                meta.y_axis_name,
                meta.x_meaning,
                meta.o_meaning,
                meta.min_x,
                meta.max_x,
                meta.min_y,
                meta.max_y,
            ],
        )?;

        Ok(())
    }

    fn read(&self, table_name: &str) -> RepoResult<Option<TableMeta>> {
        let meta = self
            .conn
            .query_row(
                "SELECT table_name, target_col_name, x_axis_name, y_axis_name,
                        x_meaning, o_meaning, min_x, max_x, min_y, max_y
                 FROM metadata
                 WHERE table_name = ?1;",
                [table_name],
                parse_meta_row,
            )
            .optional()?;
        Ok(meta)
    }

    fn update(&self, meta: &TableMeta) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE metadata
             SET
                target_col_name = ?1,
                x_axis_name = ?2,
                y_axis_name = ?3,
                x_meaning = ?4,
                o_meaning = ?5,
                min_x = ?6,
                max_x = ?7,
                min_y = ?8,
                max_y = ?9
             WHERE table_name = ?10;",
            params![
                meta.target_col_name,
                meta.x_axis_name,
                meta.y_axis_name,
                meta.x_meaning,
                meta.o_meaning,
                meta.min_x,
                meta.max_x,
                meta.min_y,
                meta.max_y,
                meta.table_name,
            ],
        )?;

        if changed == 0 {
            return Err(crate::repo::RepoError::UnknownTable(
                meta.table_name.clone(),
            ));
        }

        Ok(())
    }

    fn list_tables(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT table_name FROM metadata ORDER BY table_name;")?;
        let mut rows = stmt.query([])?;
        let mut tables = Vec::new();
        while let Some(row) = rows.next()? {
            tables.push(row.get(0)?);
        }
        Ok(tables)
    }

    fn drop_table(&self, table_name: &str) -> RepoResult<()> {
        validate_table_name(table_name)?;

        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS \"{table_name}\";"))?;
        self.conn
            .execute("DELETE FROM metadata WHERE table_name = ?1;", [table_name])?;
        self.conn.execute(
            "DELETE FROM staged_edits WHERE table_name = ?1;",
            [table_name],
        )?;

        Ok(())
    }
}

fn parse_meta_row(row: &Row<'_>) -> rusqlite::Result<TableMeta> {
    Ok(TableMeta {
        table_name: row.get("table_name")?,
        target_col_name: row.get("target_col_name")?,
        x_axis_name: row.get("x_axis_name")?,
        y_axis_name: row.get("y_axis_name")?,
        x_meaning: row.get("x_meaning")?,
        o_meaning: row.get("o_meaning")?,
        min_x: row.get("min_x")?,
        max_x: row.get("max_x")?,
        min_y: row.get("min_y")?,
        max_y: row.get("max_y")?,
    })
}
