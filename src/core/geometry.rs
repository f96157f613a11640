//! Cell-addressed geometry
//!
//! Rectangles and positions measured in grid cells. Pixel geometry lives
//! with the native layer; conversion happens in the connection.

use serde::{Deserialize, Serialize};

/// A cell position (column, row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CellPos {
    pub col: u32,
    pub row: u32,
}

impl CellPos {
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

/// A cell-addressed rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub col: u32,
    pub row: u32,
    pub width: u32,
    pub height: u32,
}

/// Half-open interval overlap on one axis
fn spans_overlap(a: u32, a_len: u32, b: u32, b_len: u32) -> bool {
    a < b.saturating_add(b_len) && a.saturating_add(a_len) > b
}

impl Rect {
    pub const fn new(col: u32, row: u32, width: u32, height: u32) -> Self {
        Self {
            col,
            row,
            width,
            height,
        }
    }

    /// A single row span
    pub const fn span(col: u32, row: u32, width: u32) -> Self {
        Self::new(col, row, width, 1)
    }

    /// A single cell
    pub const fn cell(pos: CellPos) -> Self {
        Self::new(pos.col, pos.row, 1, 1)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.col.saturating_add(self.width)
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.row.saturating_add(self.height)
    }

    pub fn origin(&self) -> CellPos {
        CellPos::new(self.col, self.row)
    }

    /// Whether the cell lies inside this rectangle
    pub fn contains(&self, pos: CellPos) -> bool {
        pos.col >= self.col && pos.col < self.right() && pos.row >= self.row && pos.row < self.bottom()
    }

    /// Whether the two rectangles share at least one cell
    pub fn overlaps(&self, other: &Rect) -> bool {
        spans_overlap(self.col, self.width, other.col, other.width)
            && spans_overlap(self.row, self.height, other.row, other.height)
    }

    /// Whether `self` lies entirely inside `outer`
    pub fn within(&self, outer: &Rect) -> bool {
        self.col >= outer.col
            && self.right() <= outer.right()
            && self.row >= outer.row
            && self.bottom() <= outer.bottom()
    }

    /// The cells shared by both rectangles, if any
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let col = self.col.max(other.col);
        let row = self.row.max(other.row);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= col || bottom <= row {
            return None;
        }
        Some(Rect::new(col, row, right - col, bottom - row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        let r = Rect::new(2, 3, 4, 2);
        assert!(r.contains(CellPos::new(2, 3)));
        assert!(r.contains(CellPos::new(5, 4)));
        assert!(!r.contains(CellPos::new(6, 4)));
        assert!(!r.contains(CellPos::new(2, 5)));
    }

    #[test]
    fn test_overlaps_and_within() {
        let region = Rect::new(0, 0, 80, 24);
        let run = Rect::span(10, 5, 3);
        assert!(run.within(&region));
        assert!(run.overlaps(&region));

        let beside = Rect::span(13, 5, 2);
        assert!(!run.overlaps(&beside));
        assert!(!Rect::new(0, 6, 80, 1).overlaps(&run));
    }

    #[test]
    fn test_empty_rect_overlaps_nothing() {
        let empty = Rect::new(5, 5, 0, 3);
        assert!(empty.is_empty());
        assert!(!empty.overlaps(&Rect::new(0, 0, 80, 24)));
    }

    #[test]
    fn test_intersect() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 8, 10, 10);
        assert_eq!(a.intersect(&b), Some(Rect::new(5, 8, 5, 2)));
        assert_eq!(a.intersect(&Rect::new(10, 0, 2, 2)), None);
    }
}
