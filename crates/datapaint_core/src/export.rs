//! CSV export of committed point data.
//!
//! # Contract
//! - Header `x,y,target`, rows ordered by id ascending.
//! - Fields containing a comma, double quote, or newline are wrapped in
//!   double quotes with inner quotes doubled.
//! - Integral coordinates keep one decimal (`3.0`, never `3`).

use crate::repo::point_repo::PointRepository;
use crate::repo::RepoError;
use std::borrow::Cow;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;

#[derive(Debug)]
pub enum ExportError {
    Repo(RepoError),
    Io(std::io::Error),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "failed to write CSV output: {err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<RepoError> for ExportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Writes all committed points as CSV; returns the number of data rows.
pub fn export_csv<P: PointRepository, W: Write>(
    points: &P,
    out: &mut W,
) -> Result<usize, ExportError> {
    writeln!(out, "x,y,target")?;

    let rows = points.all_ordered()?;
    for point in &rows {
        writeln!(
            out,
            "{},{},{}",
            format_coordinate(point.x),
            format_coordinate(point.y),
            csv_field(&point.target)
        )?;
    }

    Ok(rows.len())
}

fn format_coordinate(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{csv_field, format_coordinate};

    #[test]
    fn integral_coordinates_keep_one_decimal() {
        assert_eq!(format_coordinate(3.0), "3.0");
        assert_eq!(format_coordinate(-2.0), "-2.0");
        assert_eq!(format_coordinate(1.5), "1.5");
        assert_eq!(format_coordinate(0.25), "0.25");
    }

    #[test]
    fn fields_with_separators_are_quoted() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("value,with,commas"), "\"value,with,commas\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }
}
