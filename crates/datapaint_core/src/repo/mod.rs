//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQL details from the engine state machine.
//!
//! # Invariants
//! - Table names are interpolated into SQL (SQLite cannot bind
//!   identifiers), so every repository validates them on construction.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod edit_repo;
pub mod meta_repo;
pub mod point_repo;

pub type RepoResult<T> = Result<T, RepoError>;

static TABLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").expect("table name pattern is valid"));

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// No committed point with this id exists.
    NotFound(i64),
    /// The table name is not a safe SQL identifier.
    InvalidTableName(String),
    /// No metadata record exists for this table.
    UnknownTable(String),
    /// Persisted state violates a model invariant.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "point not found: {id}"),
            Self::InvalidTableName(name) => write!(f, "invalid table name `{name}`"),
            Self::UnknownTable(name) => write!(f, "no such table: {name}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Checks that `name` is usable as a SQL identifier.
pub fn validate_table_name(name: &str) -> RepoResult<()> {
    if TABLE_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(RepoError::InvalidTableName(name.to_string()))
    }
}
