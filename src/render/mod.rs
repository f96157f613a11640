//! Rendering Engine Parts
//!
//! The pieces a display connection draws with:
//! - `ColorTable`: cell colours to native pixels
//! - `FontSet`: font variants, coverage and fallback
//! - `PutcBuffer`: coalescing of character writes into runs
//! - `ScrollBuffer`: coalescing of scrolls into one copy and clear
//! - `CursorShadow`: the drawn cursor overlay
//! - run painting and exposure planning

mod color;
mod cursor;
mod draw;
mod font;
mod putc;
mod redraw;
mod scroll;

use serde::{Deserialize, Serialize};

use crate::core::{CellPos, Rect};
use crate::native::PixelRect;

pub use color::{standard_rgb, ColorTable, ResolvedColours, PALETTE_SIZE};
pub use cursor::{CursorShadow, CursorShape, CursorState, CursorStyle, CursorUpdate};
pub use draw::paint_run;
pub use font::{line_drawing, xlfd_with_field, FontKind, FontSet, FontVariant, GlyphCoverage, LoadOutcome};
pub use putc::{PutcBuffer, Run, PUTC_CAPACITY};
pub use redraw::{layer_slices, line_runs, plan_expose, ExposePlan, LayerSlice};
pub use scroll::{AreaCopy, PendingScroll, ScrollBuffer, ScrollPlan};

/// Pixel size of one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellMetrics {
    pub width: u32,
    pub height: u32,
}

impl CellMetrics {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Left edge of a column
    pub fn x(&self, col: u32) -> i32 {
        (col * self.width) as i32
    }

    /// Top edge of a row
    pub fn y(&self, row: u32) -> i32 {
        (row * self.height) as i32
    }

    pub fn cell(&self, pos: CellPos) -> PixelRect {
        PixelRect::new(self.x(pos.col), self.y(pos.row), self.width, self.height)
    }

    pub fn rect(&self, area: &Rect) -> PixelRect {
        PixelRect::new(
            self.x(area.col),
            self.y(area.row),
            area.width * self.width,
            area.height * self.height,
        )
    }

    /// Whole cells fitting in a pixel size: (columns, rows)
    pub fn grid_size(&self, width: u32, height: u32) -> (u32, u32) {
        if self.width == 0 || self.height == 0 {
            return (0, 0);
        }
        (width / self.width, height / self.height)
    }

    /// Pixel size of a grid
    pub fn window_size(&self, cols: u32, rows: u32) -> (u32, u32) {
        (cols * self.width, rows * self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_metrics() {
        let metrics = CellMetrics::new(6, 13);
        assert_eq!(metrics.cell(CellPos::new(2, 1)), PixelRect::new(12, 13, 6, 13));
        assert_eq!(metrics.rect(&Rect::new(1, 2, 3, 4)), PixelRect::new(6, 26, 18, 52));
        assert_eq!(metrics.grid_size(487, 320), (81, 24));
        assert_eq!(metrics.window_size(80, 24), (480, 312));
        assert_eq!(CellMetrics::new(0, 0).grid_size(100, 100), (0, 0));
    }
}
