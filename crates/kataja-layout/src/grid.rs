#![forbid(unsafe_code)]

//! Sparse two-dimensional cell grid used by the tree layouts.
//!
//! Coordinates are signed. Writing outside the current extent grows the
//! grid in that direction; growing towards negative indices shifts the
//! storage, never the logical coordinates of cells already set.
//!
//! ```text
//!   x:  -2 -1  0  1  2
//!   y=0  .  .  O  .  .        O  node
//!   y=1  .  /  .  \  .        /  path going down-left
//!   y=2  .  O  .  .  O        \  path going down-right
//! ```
//!
//! # Invariants
//!
//! 1. Every stored row has exactly `width()` cells.
//! 2. `get` outside the extent is [`Cell::Empty`].

use std::fmt;

use kataja_forest::NodeId;
use serde::{Deserialize, Serialize};

/// Direction an edge runs through a path cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slant {
    DownLeft,
    Down,
    DownRight,
}

impl Slant {
    /// Slant of an edge from a parent at column `from` to a child at `to`.
    #[must_use]
    pub fn between(from: i32, to: i32) -> Self {
        match to.cmp(&from) {
            std::cmp::Ordering::Less => Self::DownLeft,
            std::cmp::Ordering::Equal => Self::Down,
            std::cmp::Ordering::Greater => Self::DownRight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Node(NodeId),
    /// Part of a node wider or taller than one cell.
    Filler,
    Path(Slant),
}

impl Cell {
    #[inline]
    #[must_use]
    pub fn is_filled(self) -> bool {
        self != Self::Empty
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
    width: usize,
    /// Logical x of storage column 0.
    origin_x: i32,
    /// Logical y of storage row 0.
    origin_y: i32,
}

impl Grid {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Logical x of the leftmost column.
    #[must_use]
    pub fn min_x(&self) -> i32 {
        self.origin_x
    }

    /// Logical y of the top row.
    #[must_use]
    pub fn min_y(&self) -> i32 {
        self.origin_y
    }

    /// Logical x one past the rightmost column.
    #[must_use]
    pub fn end_x(&self) -> i32 {
        self.origin_x + self.width as i32
    }

    /// Logical y one past the bottom row.
    #[must_use]
    pub fn end_y(&self) -> i32 {
        self.origin_y + self.rows.len() as i32
    }

    fn index(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        let col = usize::try_from(x - self.origin_x).ok()?;
        let row = usize::try_from(y - self.origin_y).ok()?;
        (col < self.width && row < self.rows.len()).then_some((col, row))
    }

    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Cell {
        self.index(x, y)
            .map_or(Cell::Empty, |(col, row)| self.rows[row][col])
    }

    fn ensure(&mut self, x: i32, y: i32) {
        if self.rows.is_empty() {
            self.origin_x = x;
            self.origin_y = y;
            self.width = 1;
            self.rows.push(vec![Cell::Empty]);
            return;
        }
        if x < self.origin_x {
            let grow = (self.origin_x - x) as usize;
            for row in &mut self.rows {
                row.splice(0..0, std::iter::repeat_n(Cell::Empty, grow));
            }
            self.width += grow;
            self.origin_x = x;
        }
        if x >= self.end_x() {
            let grow = (x - self.end_x() + 1) as usize;
            for row in &mut self.rows {
                row.extend(std::iter::repeat_n(Cell::Empty, grow));
            }
            self.width += grow;
        }
        if y < self.origin_y {
            let grow = (self.origin_y - y) as usize;
            let blank = vec![Cell::Empty; self.width];
            self.rows.splice(0..0, std::iter::repeat_n(blank, grow));
            self.origin_y = y;
        }
        if y >= self.end_y() {
            let grow = (y - self.end_y() + 1) as usize;
            let blank = vec![Cell::Empty; self.width];
            self.rows.extend(std::iter::repeat_n(blank, grow));
        }
    }

    /// Put `cell` at `(x, y)`.
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) {
        self.ensure(x, y);
        if let Some((col, row)) = self.index(x, y) {
            self.rows[row][col] = cell;
        }
    }

    /// Put `cell` at `(x, y)` and reserve a `w` by `h` block around it.
    pub fn set_sized(&mut self, x: i32, y: i32, cell: Cell, w: u32, h: u32) {
        if w > 1 || h > 1 {
            let half_w = (w.max(1) as i32 - 1) / 2;
            let half_h = (h.max(1) as i32 - 1) / 2;
            for ny in y - half_h..=y + half_h {
                for nx in x - half_w..=x + half_w {
                    self.set(nx, ny, Cell::Filler);
                }
            }
        }
        self.set(x, y, cell);
    }

    /// Logical x of the first filled cell in row `y`.
    #[must_use]
    pub fn first_filled_column(&self, y: i32) -> Option<i32> {
        let (_, row) = self.index(self.origin_x, y)?;
        self.rows[row]
            .iter()
            .position(|c| c.is_filled())
            .map(|col| self.origin_x + col as i32)
    }

    /// Logical x of the last filled cell in row `y`.
    #[must_use]
    pub fn last_filled_column(&self, y: i32) -> Option<i32> {
        let (_, row) = self.index(self.origin_x, y)?;
        self.rows[row]
            .iter()
            .rposition(|c| c.is_filled())
            .map(|col| self.origin_x + col as i32)
    }

    /// Where `node` sits, if it is in the grid.
    #[must_use]
    pub fn find(&self, node: NodeId) -> Option<(i32, i32)> {
        self.cells()
            .find(|(_, _, c)| *c == Cell::Node(node))
            .map(|(x, y, _)| (x, y))
    }

    /// Filled cells as `(x, y, cell)`, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32, Cell)> + '_ {
        self.rows.iter().enumerate().flat_map(move |(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(_, c)| c.is_filled())
                .map(move |(col, c)| {
                    (
                        self.origin_x + col as i32,
                        self.origin_y + row as i32,
                        *c,
                    )
                })
        })
    }

    /// Cells a straight segment from `start` to `end` passes through,
    /// endpoints excluded.
    ///
    /// Steep segments yield one cell per integer row strictly between the
    /// endpoints; flat segments one cell per integer column.
    #[must_use]
    pub fn pixelated_path(start: (i32, i32), end: (i32, i32)) -> Vec<(i32, i32)> {
        let (x0, y0) = start;
        let (x1, y1) = end;
        let dx = x1 - x0;
        let dy = y1 - y0;
        let mut path = Vec::new();
        if dx == 0 && dy == 0 {
            return path;
        }
        if dy.abs() >= dx.abs() {
            let step = dy.signum();
            let mut y = y0 + step;
            while y != y1 {
                let x = f64::from(x0) + f64::from(dx) * f64::from(y - y0) / f64::from(dy);
                path.push((x.round() as i32, y));
                y += step;
            }
        } else {
            let step = dx.signum();
            let mut x = x0 + step;
            while x != x1 {
                let y = f64::from(y0) + f64::from(dy) * f64::from(x - x0) / f64::from(dx);
                path.push((x, y.round() as i32));
                x += step;
            }
        }
        path
    }

    #[must_use]
    pub fn is_path_blocked(&self, path: &[(i32, i32)]) -> bool {
        path.iter().any(|(x, y)| self.get(*x, *y).is_filled())
    }

    /// Mark the empty cells of `path`; filled cells are left alone.
    pub fn fill_path(&mut self, path: &[(i32, i32)], slant: Slant) {
        for (x, y) in path {
            if !self.get(*x, *y).is_filled() {
                self.set(*x, *y, Cell::Path(slant));
            }
        }
    }

    /// Copy `other` to the right of this grid.
    ///
    /// `other` is shifted right by the least amount that puts, on every row
    /// both grids use, its first filled cell past this grid's last filled
    /// cell; then by `extra_padding` more columns. Returns the shift applied
    /// to `other`'s x coordinates.
    pub fn merge_grids(&mut self, other: &Grid, extra_padding: i32) -> i32 {
        if other.rows.is_empty() {
            return 0;
        }
        if self.rows.is_empty() {
            self.clone_from(other);
            return 0;
        }
        let shift = (other.origin_y..other.end_y())
            .filter_map(|y| {
                let last = self.last_filled_column(y)?;
                let first = other.first_filled_column(y)?;
                Some(last - first + 1)
            })
            .max()
            .unwrap_or_else(|| self.end_x() - other.origin_x)
            + extra_padding;
        for (x, y, cell) in other.cells() {
            self.set(x + shift, y, cell);
        }
        shift
    }

    /// Copy every filled cell of `other`, offset by `(dx, dy)`.
    pub fn overlay(&mut self, other: &Grid, dx: i32, dy: i32) {
        for (x, y, cell) in other.cells() {
            self.set(x + dx, y + dy, cell);
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            for cell in row {
                let c = match cell {
                    Cell::Empty => '.',
                    Cell::Node(_) => 'O',
                    Cell::Filler => '#',
                    Cell::Path(Slant::DownLeft) => '/',
                    Cell::Path(Slant::Down) => '|',
                    Cell::Path(Slant::DownRight) => '\\',
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_grows_in_every_direction() {
        let mut g = Grid::new();
        g.set(0, 0, Cell::Node(NodeId(0)));
        g.set(2, 1, Cell::Node(NodeId(1)));
        assert_eq!((g.width(), g.height()), (3, 2));
        g.set(-2, -1, Cell::Node(NodeId(2)));
        assert_eq!((g.min_x(), g.min_y()), (-2, -1));
        assert_eq!((g.width(), g.height()), (5, 3));
        assert_eq!(g.get(0, 0), Cell::Node(NodeId(0)));
        assert_eq!(g.get(2, 1), Cell::Node(NodeId(1)));
        assert_eq!(g.get(99, 99), Cell::Empty);
    }

    #[test]
    fn filled_columns_are_logical() {
        let mut g = Grid::new();
        g.set(-1, 0, Cell::Filler);
        g.set(3, 0, Cell::Node(NodeId(0)));
        assert_eq!(g.first_filled_column(0), Some(-1));
        assert_eq!(g.last_filled_column(0), Some(3));
        assert_eq!(g.first_filled_column(5), None);
    }

    #[test]
    fn diagonal_path_excludes_endpoints() {
        assert_eq!(Grid::pixelated_path((0, 0), (2, 2)), [(1, 1)]);
        assert_eq!(Grid::pixelated_path((0, 0), (-4, 2)), [(-1, 1), (-2, 1), (-3, 2)]);
        assert!(Grid::pixelated_path((0, 0), (1, 1)).is_empty());
    }

    #[test]
    fn paths_block_and_fill() {
        let mut g = Grid::new();
        let path = Grid::pixelated_path((0, 0), (2, 4));
        assert_eq!(path, [(1, 1), (1, 2), (2, 3)]);
        assert!(!g.is_path_blocked(&path));
        g.set(2, 3, Cell::Node(NodeId(9)));
        g.fill_path(&path, Slant::DownRight);
        assert!(g.is_path_blocked(&path));
        assert_eq!(g.get(1, 2), Cell::Path(Slant::DownRight));
        assert_eq!(g.get(2, 3), Cell::Node(NodeId(9)));
        assert_eq!(Slant::between(3, 3), Slant::Down);
    }

    #[test]
    fn sized_cells_reserve_a_block() {
        let mut g = Grid::new();
        g.set_sized(0, 0, Cell::Node(NodeId(4)), 3, 1);
        assert_eq!(g.get(-1, 0), Cell::Filler);
        assert_eq!(g.get(0, 0), Cell::Node(NodeId(4)));
        assert_eq!(g.get(1, 0), Cell::Filler);
    }

    #[test]
    fn display_draws_ascii() {
        let mut g = Grid::new();
        g.set(1, 0, Cell::Node(NodeId(0)));
        g.fill_path(&[(0, 1)], Slant::DownLeft);
        g.set(2, 1, Cell::Path(Slant::DownRight));
        assert_eq!(g.to_string(), ".O.\n/.\\\n");
    }
}
