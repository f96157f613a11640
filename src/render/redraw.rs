//! Redraw planning
//!
//! Exposures arrive in pixels and are widened to whole cells; the strips
//! between the exposed pixels and the cell borders are cleared so the
//! widened cells can be redrawn cleanly. Redraws then walk the scene's
//! layers row by row, drawing one run per style change.

use std::ops::Range;

use super::CellMetrics;
use crate::core::{Cell, CellPos, CellStyle, Rect};
use crate::host::Layer;
use crate::native::PixelRect;

/// Work for one exposure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposePlan {
    /// Cells touched by the exposure
    pub cells: Rect,
    /// Pixels inside those cells but outside the exposure, to clear
    pub borders: Vec<PixelRect>,
}

/// Widen an exposed pixel area to whole cells
pub fn plan_expose(metrics: CellMetrics, area: PixelRect) -> ExposePlan {
    if metrics.width == 0 || metrics.height == 0 {
        return ExposePlan {
            cells: Rect::default(),
            borders: Vec::new(),
        };
    }
    let (cw, ch) = (metrics.width as i64, metrics.height as i64);
    let px1 = (area.x as i64).max(0);
    let py1 = (area.y as i64).max(0);
    let px2 = (area.x as i64 + area.width as i64).max(px1);
    let py2 = (area.y as i64 + area.height as i64).max(py1);
    let cx1 = px1 / cw;
    let cy1 = py1 / ch;
    let cx2 = (px2 + cw - 1) / cw;
    let cy2 = (py2 + ch - 1) / ch;

    let (left, top, right, bottom) = (cx1 * cw, cy1 * ch, cx2 * cw, cy2 * ch);
    let strip = |x1: i64, x2: i64, y1: i64, y2: i64| PixelRect::new(x1 as i32, y1 as i32, (x2 - x1) as u32, (y2 - y1) as u32);

    let mut borders = Vec::new();
    if left < px1 {
        borders.push(strip(left, px1, top, bottom));
    }
    if top < py1 {
        borders.push(strip(px1, right, top, py1));
    }
    if px2 < right {
        borders.push(strip(px2, right, py1, bottom));
    }
    if py2 < bottom {
        borders.push(strip(px1, px2, py2, bottom));
    }

    ExposePlan {
        cells: Rect::new(cx1 as u32, cy1 as u32, (cx2 - cx1) as u32, (cy2 - cy1) as u32),
        borders,
    }
}

/// One row of a layer to redraw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSlice {
    /// Row in the layer's grid
    pub row: usize,
    /// Grid columns to draw
    pub cols: Range<usize>,
    /// Window cell the first column lands on
    pub at: CellPos,
}

/// Rows of `layer` visible inside the window area `area`
pub fn layer_slices(layer: &Layer<'_>, area: &Rect) -> Vec<LayerSlice> {
    let bounds = Rect::new(layer.origin.col, layer.origin.row, layer.cols, layer.rows);
    let Some(clip) = bounds.intersect(area) else {
        return Vec::new();
    };
    let first = (clip.col - layer.origin.col) as usize;
    let last = (clip.right() - layer.origin.col) as usize;
    (clip.row..clip.bottom())
        .map(|row| LayerSlice {
            row: (row - layer.origin.row) as usize,
            cols: first..last,
            at: CellPos::new(clip.col, row),
        })
        .collect()
}

/// Split the stored cells of `cols` into same-style runs
///
/// Columns past the end of the stored line are left out; they show the
/// cleared background.
pub fn line_runs(cells: &[Cell], cols: Range<usize>) -> Vec<(Range<usize>, CellStyle)> {
    let end = cols.end.min(cells.len());
    let mut runs: Vec<(Range<usize>, CellStyle)> = Vec::new();
    for col in cols.start..end {
        let style = cells[col].style;
        match runs.last_mut() {
            Some((range, current)) if *current == style => range.end = col + 1,
            _ => runs.push((col..col + 1, style)),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Attrs, Grid, GridView};

    const METRICS: CellMetrics = CellMetrics::new(6, 13);

    #[test]
    fn test_aligned_expose_has_no_borders() {
        let plan = plan_expose(METRICS, PixelRect::new(6, 13, 12, 26));
        assert_eq!(plan.cells, Rect::new(1, 1, 2, 2));
        assert!(plan.borders.is_empty());
    }

    #[test]
    fn test_unaligned_expose_widens_and_clears_strips() {
        let plan = plan_expose(METRICS, PixelRect::new(8, 15, 5, 5));
        assert_eq!(plan.cells, Rect::new(1, 1, 2, 1));
        assert_eq!(
            plan.borders,
            vec![
                PixelRect::new(6, 13, 2, 13),
                PixelRect::new(8, 13, 10, 2),
                PixelRect::new(13, 15, 5, 11),
                PixelRect::new(8, 20, 5, 6),
            ]
        );
    }

    #[test]
    fn test_layer_slices_clip() {
        let grid = Grid::new(10, 5);
        let layer = Layer::new(CellPos::new(2, 1), &grid);
        let slices = layer_slices(&layer, &Rect::new(0, 0, 5, 3));
        assert_eq!(slices.len(), 2);
        assert_eq!(
            slices[0],
            LayerSlice {
                row: 0,
                cols: 0..3,
                at: CellPos::new(2, 1)
            }
        );
        assert_eq!(slices[1].row, 1);
        assert!(layer_slices(&layer, &Rect::new(20, 0, 5, 5)).is_empty());
    }

    #[test]
    fn test_line_runs_split_on_style() {
        let mut grid = Grid::new(8, 1);
        grid.write_str(0, 0, "ab", CellStyle::default());
        grid.write_str(2, 0, "cd", CellStyle::with_attrs(Attrs::BOLD));
        let runs = line_runs(grid.line(0), 1..20);
        let ranges: Vec<_> = runs.iter().map(|(r, _)| r.clone()).collect();
        assert_eq!(ranges, vec![1..2, 2..4, 4..8]);
    }
}
