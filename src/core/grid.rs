//! Terminal Grid
//!
//! The read-only grid contract the engine draws from, plus a small owned
//! grid used by the headless runner and tests.

use serde::{Deserialize, Serialize};

use super::cell::{Cell, CellStyle};

/// Read access to a terminal screen's cells
///
/// Lines may be shorter than the screen width; missing cells read as
/// default blanks.
pub trait GridView {
    /// Number of columns
    fn cols(&self) -> usize;

    /// Number of visible rows
    fn rows(&self) -> usize;

    /// The stored cells of a visible row
    fn line(&self, row: usize) -> &[Cell];

    /// A single cell, default when outside the stored line
    fn cell_at(&self, row: usize, col: usize) -> Cell {
        self.line(row).get(col).copied().unwrap_or_default()
    }
}

/// A row of cells in the grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    /// The cells in this row
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cols: usize) -> Self {
        Self {
            cells: vec![Cell::default(); cols],
        }
    }

    pub fn resize(&mut self, cols: usize) {
        self.cells.resize(cols, Cell::default());
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = Cell::default();
        }
    }
}

/// An owned grid of cells
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    rows: Vec<Row>,
    cols: usize,
}

impl Grid {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            rows: (0..rows).map(|_| Row::new(cols)).collect(),
            cols,
        }
    }

    /// Get a reference to a cell
    pub fn cell(&self, col: usize, row: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }

    /// Get a mutable reference to a cell
    pub fn cell_mut(&mut self, col: usize, row: usize) -> Option<&mut Cell> {
        self.rows.get_mut(row).and_then(|r| r.cells.get_mut(col))
    }

    /// Write a string starting at a position, clipped at the right edge
    pub fn write_str(&mut self, col: usize, row: usize, text: &str, style: CellStyle) {
        for (i, c) in text.chars().enumerate() {
            if let Some(cell) = self.cell_mut(col + i, row) {
                *cell = Cell::with_style(c, style);
            }
        }
    }

    /// Resize the grid, keeping existing content
    pub fn resize(&mut self, cols: usize, rows: usize) {
        for row in &mut self.rows {
            row.resize(cols);
        }
        self.rows.resize_with(rows, || Row::new(cols));
        self.cols = cols;
    }

    /// Scroll rows `top..=bottom` by `n` lines: positive moves content up,
    /// negative moves it down. Vacated rows are blank.
    pub fn scroll(&mut self, top: usize, bottom: usize, n: i32) {
        if top > bottom || bottom >= self.rows.len() {
            return;
        }
        let region = &mut self.rows[top..=bottom];
        let count = (n.unsigned_abs() as usize).min(region.len());
        if n > 0 {
            region.rotate_left(count);
            let len = region.len();
            for row in &mut region[len - count..] {
                row.clear();
            }
        } else if n < 0 {
            region.rotate_right(count);
            for row in &mut region[..count] {
                row.clear();
            }
        }
    }
}

impl GridView for Grid {
    fn cols(&self) -> usize {
        self.cols
    }

    fn rows(&self) -> usize {
        self.rows.len()
    }

    fn line(&self, row: usize) -> &[Cell] {
        self.rows.get(row).map(|r| r.cells.as_slice()).unwrap_or(&[])
    }
}
