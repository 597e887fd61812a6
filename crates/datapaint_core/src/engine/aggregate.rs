//! Cell aggregator / renderer feed.
//!
//! Merges one bounded committed-store range query with the active staged
//! edits into a per-cell multiset of live point types, from which the
//! display glyph is derived.
//!
//! # Invariants
//! - Exactly one range query per evaluation, bounded by the viewport's
//!   data-space box; cost tracks visible density, never table size.
//! - Pure read/merge projection, re-evaluated on demand; nothing is
//!   cached across edits and nothing is written.
//! - For delete/retype edits against the same committed id, the latest
//!   active edit wins for visibility.

use crate::engine::edit_log::EditLog;
use crate::engine::viewport::{Cell, Viewport};
use crate::model::{EditAction, PointKind, TableMeta};
use crate::repo::point_repo::PointRepository;
use crate::repo::RepoResult;
use std::collections::HashMap;

/// Marker rendered for cells outside the valid range, whatever they hold.
pub const FORBIDDEN_GLYPH: char = '!';

/// Live point counts for one visible cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellContent {
    pub count_x: u32,
    pub count_o: u32,
}

impl CellContent {
    fn add(&mut self, kind: PointKind) {
        match kind {
            PointKind::X => self.count_x += 1,
            PointKind::O => self.count_o += 1,
        }
    }

    fn remove(&mut self, kind: PointKind) {
        match kind {
            PointKind::X => self.count_x = self.count_x.saturating_sub(1),
            PointKind::O => self.count_o = self.count_o.saturating_sub(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count_x == 0 && self.count_o == 0
    }
}

/// Aggregated contents of every visible cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellGrid {
    cols: i32,
    rows: i32,
    cells: Vec<CellContent>,
}

impl CellGrid {
    fn new(cols: i32, rows: i32) -> Self {
        Self {
            cols,
            rows,
            cells: vec![CellContent::default(); (cols as usize) * (rows as usize)],
        }
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn get(&self, cell: Cell) -> CellContent {
        self.cells[self.index(cell)]
    }

    fn get_mut(&mut self, cell: Cell) -> &mut CellContent {
        let index = self.index(cell);
        &mut self.cells[index]
    }

    fn index(&self, cell: Cell) -> usize {
        (cell.row as usize) * (self.cols as usize) + (cell.col as usize)
    }
}

/// Builds the cell grid for the current viewport: one bounded range query
/// against the committed store, then the active staged edits overlaid.
pub fn aggregate<P: PointRepository>(
    points: &P,
    viewport: &Viewport,
    log: &EditLog,
    meta: &TableMeta,
) -> RepoResult<CellGrid> {
    let committed = points.query_range(&viewport.query_bounds())?;

    let mut grid = CellGrid::new(viewport.cols(), viewport.rows());
    let mut visible: HashMap<i64, (Cell, Option<PointKind>)> = HashMap::new();

    for point in &committed {
        let Some(cell) = viewport.to_cell(point.x, point.y) else {
            continue;
        };
        let kind = PointKind::from_target(meta, &point.target);
        if let Some(kind) = kind {
            grid.get_mut(cell).add(kind);
        }
        visible.insert(point.id, (cell, kind));
    }

    // Creates apply directly; for delete/retype the latest active edit per
    // committed id supersedes earlier ones.
    let mut latest: HashMap<i64, &EditAction> = HashMap::new();
    for edit in log.active_edits() {
        match &edit.action {
            EditAction::Create { x, y, kind } => {
                if let Some(cell) = viewport.to_cell(*x, *y) {
                    grid.get_mut(cell).add(*kind);
                }
            }
            action @ (EditAction::Delete { data_id, .. } | EditAction::Retype { data_id, .. }) => {
                latest.insert(*data_id, action);
            }
        }
    }

    for (data_id, action) in latest {
        // Edits whose referenced point is outside the viewport (or not of
        // a known kind) have no visible effect.
        let Some((cell, Some(kind))) = visible.get(&data_id).copied() else {
            continue;
        };
        match action {
            EditAction::Delete { .. } => grid.get_mut(cell).remove(kind),
            EditAction::Retype { to, .. } => {
                if *to != kind {
                    grid.get_mut(cell).remove(kind);
                    grid.get_mut(cell).add(*to);
                }
            }
            EditAction::Create { .. } => unreachable!("creates are applied above"),
        }
    }

    Ok(grid)
}

/// Display glyph for one cell's contents. Mixed cells show `#`; two or
/// more points of a single type show the uppercase letter.
pub fn glyph(content: CellContent) -> char {
    if content.count_x > 0 && content.count_o > 0 {
        '#'
    } else if content.count_x > 1 {
        'X'
    } else if content.count_o > 1 {
        'O'
    } else if content.count_x == 1 {
        'x'
    } else if content.count_o == 1 {
        'o'
    } else {
        ' '
    }
}

/// Renders the grid to one string per screen row. Forbidden cells always
/// show the forbidden marker, occupied or not.
pub fn render_rows(grid: &CellGrid, viewport: &Viewport) -> Vec<String> {
    let mut rows = Vec::with_capacity(grid.rows() as usize);
    for row in 0..grid.rows() {
        let mut line = String::with_capacity(grid.cols() as usize);
        for col in 0..grid.cols() {
            let cell = Cell { col, row };
            let (x, y) = viewport.to_data(cell);
            if viewport.is_forbidden(x, y) {
                line.push(FORBIDDEN_GLYPH);
            } else {
                line.push(glyph(grid.get(cell)));
            }
        }
        rows.push(line);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::{glyph, CellContent};

    #[test]
    fn glyph_ladder_is_deterministic() {
        let cases = [
            ((0, 0), ' '),
            ((1, 0), 'x'),
            ((0, 1), 'o'),
            ((2, 0), 'X'),
            ((0, 3), 'O'),
            ((1, 1), '#'),
            ((4, 2), '#'),
        ];
        for ((count_x, count_o), expected) in cases {
            assert_eq!(glyph(CellContent { count_x, count_o }), expected);
        }
    }
}
