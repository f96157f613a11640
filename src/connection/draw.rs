//! Drawing entry points
//!
//! Character writes are buffered into one run; scrolls into one pending
//! scroll. Anything about to overwrite an area first draws or drops the
//! pending run and takes the cursor overlay off that area, so the screen
//! always shows output in the order it was emitted.
//!
//! Area copies wait for the previous copy's acknowledgement. Exposures
//! reported while waiting are redrawn from the scene; when no
//! acknowledgement arrives the copy is skipped and its destination redrawn
//! instead.

use std::ops::Range;
use std::time::{Duration, Instant};

use super::{DisplayConnection, TtyMode};
use crate::core::{CellPos, CellStyle, GlyphCode, GridView, Rect};
use crate::error::Result;
use crate::host::Scene;
use crate::native::{EventKind, NativeEvent, PixelRect, Surface};
use crate::render::{layer_slices, line_runs, paint_run, plan_expose, AreaCopy, CursorStyle, PendingScroll};

impl<S: Surface> DisplayConnection<S> {
    /// Write one glyph at `pos`
    ///
    /// Control codes are ignored. The glyph joins the pending run when it
    /// continues it; otherwise the pending run is drawn first.
    pub fn put_char(&mut self, scene: &dyn Scene, pos: CellPos, glyph: GlyphCode, style: CellStyle) -> Result<()> {
        self.guarded(|this| {
            if glyph < 0x20 || glyph == 0x7f {
                return Ok(());
            }
            this.flush_scroll(scene)?;
            if !this.putc.extends(pos, &style) {
                this.flush_putc()?;
                this.putc.start(pos, style);
            }
            this.putc.push(glyph);
            this.mark_dirty();
            Ok(())
        })
    }

    /// Scroll `region` by `lines`; positive moves content up
    ///
    /// Consecutive scrolls of the same region in the same direction are
    /// drawn as one.
    pub fn scroll(&mut self, scene: &dyn Scene, region: Rect, lines: i32) -> Result<()> {
        self.guarded(|this| {
            if let Some(previous) = this.scroll.push(region, lines) {
                this.run_scroll(scene, previous)?;
            }
            this.mark_dirty();
            Ok(())
        })
    }

    /// Reset an area to the default background
    pub fn clear_region(&mut self, scene: &dyn Scene, area: Rect) -> Result<()> {
        self.guarded(|this| {
            this.flush_scroll(scene)?;
            this.clear_cells(&area)?;
            this.mark_dirty();
            Ok(())
        })
    }

    /// Insert `count` blank cells at `at`, shifting the `width` cells from
    /// `at` to the end of the line right
    pub fn insert_chars(&mut self, scene: &dyn Scene, at: CellPos, width: u32, count: u32) -> Result<()> {
        self.guarded(|this| {
            let count = count.min(width);
            if count == 0 {
                return Ok(());
            }
            this.flush_scroll(scene)?;
            if count < width {
                let src = Rect::span(at.col, at.row, width - count);
                this.copy_cells(scene, src, CellPos::new(at.col + count, at.row))?;
            }
            this.clear_cells(&Rect::span(at.col, at.row, count))?;
            this.mark_dirty();
            Ok(())
        })
    }

    /// Delete `count` cells at `at`, shifting the rest of the `width` cells
    /// left and blanking the end of the line
    pub fn delete_chars(&mut self, scene: &dyn Scene, at: CellPos, width: u32, count: u32) -> Result<()> {
        self.guarded(|this| {
            let count = count.min(width);
            if count == 0 {
                return Ok(());
            }
            this.flush_scroll(scene)?;
            if count < width {
                let src = Rect::span(at.col + count, at.row, width - count);
                this.copy_cells(scene, src, at)?;
            }
            this.clear_cells(&Rect::span(at.col + width - count, at.row, count))?;
            this.mark_dirty();
            Ok(())
        })
    }

    /// Redraw row `row` of `grid` with its first cell at window cell `at`
    pub fn redraw_line(&mut self, scene: &dyn Scene, grid: &dyn GridView, row: usize, at: CellPos) -> Result<()> {
        self.guarded(|this| {
            this.flush_scroll(scene)?;
            this.draw_line(grid, row, 0..grid.cols(), at)?;
            this.mark_dirty();
            Ok(())
        })
    }

    /// Clear an area and redraw it from the scene
    pub fn redraw_region(&mut self, scene: &dyn Scene, area: Rect) -> Result<()> {
        self.guarded(|this| {
            this.flush_scroll(scene)?;
            this.redraw_area(scene, &area)?;
            this.mark_dirty();
            Ok(())
        })
    }

    /// Set where the terminal cursor is; drawn on the next flush
    pub fn move_cursor(&mut self, pos: CellPos) -> Result<()> {
        self.guarded(|this| {
            this.cursor_pos = pos;
            this.mark_dirty();
            Ok(())
        })
    }

    pub fn set_mode(&mut self, mode: TtyMode) -> Result<()> {
        self.guarded(|this| {
            this.mode = mode;
            this.mark_dirty();
            Ok(())
        })
    }

    pub fn set_cursor_style(&mut self, style: CursorStyle) -> Result<()> {
        self.guarded(|this| {
            if this.cursor_style != style {
                this.erase_cursor()?;
                this.cursor_style = style;
                this.mark_dirty();
            }
            Ok(())
        })
    }

    /// Set the cursor colour by name; empty or unknown names invert
    pub fn set_cursor_colour(&mut self, name: &str) -> Result<()> {
        self.guarded(|this| {
            this.erase_cursor()?;
            this.cursor_xor = this.colors.cursor_xor(&mut this.surface, name)?;
            tracing::debug!("cursor colour {:?} = {:06x}", name, this.cursor_xor.0);
            this.mark_dirty();
            Ok(())
        })
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.guarded(|this| {
            this.surface.set_title(title)?;
            this.mark_dirty();
            Ok(())
        })
    }

    pub fn bell(&mut self) -> Result<()> {
        self.guarded(|this| {
            this.surface.bell()?;
            this.mark_dirty();
            Ok(())
        })
    }

    /// Draw everything buffered, update the cursor and push it all to the
    /// display
    pub fn flush(&mut self, scene: &dyn Scene) -> Result<()> {
        self.guarded(|this| this.flush_all(scene))
    }

    // --- internals ---

    pub(super) fn flush_all(&mut self, scene: &dyn Scene) -> Result<()> {
        self.flush_scroll(scene)?;
        self.flush_putc()?;
        self.update_cursor()?;
        self.surface.flush()?;
        self.dirty_since = None;
        Ok(())
    }

    pub(super) fn flush_scroll(&mut self, scene: &dyn Scene) -> Result<()> {
        match self.scroll.take() {
            Some(pending) => self.run_scroll(scene, pending),
            None => Ok(()),
        }
    }

    fn run_scroll(&mut self, scene: &dyn Scene, pending: PendingScroll) -> Result<()> {
        self.flush_area(&pending.region)?;
        let plan = pending.plan();
        if let Some(copy) = plan.copy {
            self.do_copy(scene, copy)?;
        }
        self.clear_cells(&plan.clear)
    }

    /// Draw the pending run
    pub(super) fn flush_putc(&mut self) -> Result<()> {
        let Some(run) = self.putc.take() else {
            return Ok(());
        };
        // The run paints its full cells, overlay included
        self.cursor.overwrite(&run.span());
        let painted = paint_run(
            &mut self.surface,
            &self.colors,
            &self.fonts,
            run.origin,
            &run.glyphs,
            &run.style,
            false,
        );
        self.putc.recycle(run);
        Ok(painted?)
    }

    /// Draw what is buffered for `area` and take the cursor overlay off it
    fn flush_area(&mut self, area: &Rect) -> Result<()> {
        if self.putc.overlaps(area) {
            self.flush_putc()?;
        }
        if self.cursor.drawn_inside(area).is_some() {
            self.erase_cursor()?;
        }
        Ok(())
    }

    /// Prepare to overwrite all of `area`
    ///
    /// A pending run entirely inside is dropped, one partly inside is
    /// drawn. The cursor overlay in the area is forgotten, and its cell
    /// cleared when `clear_cursor` is set. Returns whether the cursor was
    /// inside.
    fn write_area(&mut self, area: &Rect, clear_cursor: bool) -> Result<bool> {
        self.putc.discard_within(area);
        let hit = match self.cursor.overwrite(area) {
            Some(pos) => {
                if clear_cursor {
                    let metrics = self.metrics()?;
                    self.surface.clear_area(metrics.cell(pos))?;
                }
                true
            }
            None => false,
        };
        self.flush_area(area)?;
        Ok(hit)
    }

    pub(super) fn clear_cells(&mut self, area: &Rect) -> Result<()> {
        if area.is_empty() {
            return Ok(());
        }
        self.write_area(area, false)?;
        let metrics = self.metrics()?;
        self.surface.clear_area(metrics.rect(area))?;
        Ok(())
    }

    fn redraw_area(&mut self, scene: &dyn Scene, area: &Rect) -> Result<()> {
        if area.is_empty() {
            return Ok(());
        }
        self.write_area(area, false)?;
        let metrics = self.metrics()?;
        self.surface.clear_area(metrics.rect(area))?;
        self.draw_scene(scene, area)
    }

    /// Redraw every layer of the scene inside `area`
    fn draw_scene(&mut self, scene: &dyn Scene, area: &Rect) -> Result<()> {
        for layer in scene.layers() {
            for slice in layer_slices(&layer, area) {
                self.draw_line(layer.grid, slice.row, slice.cols, slice.at)?;
            }
        }
        Ok(())
    }

    fn draw_line(&mut self, grid: &dyn GridView, row: usize, cols: Range<usize>, at: CellPos) -> Result<()> {
        if cols.is_empty() {
            return Ok(());
        }
        self.clear_cells(&Rect::span(at.col, at.row, cols.len() as u32))?;
        let line = grid.line(row);
        for (range, style) in line_runs(line, cols.clone()) {
            let origin = CellPos::new(at.col + (range.start - cols.start) as u32, at.row);
            let span = Rect::span(origin.col, origin.row, range.len() as u32);
            let cleared = self.cursor.drawn_inside(&span).is_none();
            let glyphs: Vec<GlyphCode> = line[range].iter().map(|cell| cell.glyph).collect();
            paint_run(&mut self.surface, &self.colors, &self.fonts, origin, &glyphs, &style, cleared)?;
        }
        Ok(())
    }

    fn copy_cells(&mut self, scene: &dyn Scene, src: Rect, dst: CellPos) -> Result<()> {
        let copy = AreaCopy { src, dst };
        self.flush_area(&src)?;
        self.flush_area(&copy.dst_rect())?;
        self.do_copy(scene, copy)
    }

    fn do_copy(&mut self, scene: &dyn Scene, copy: AreaCopy) -> Result<()> {
        let dst_rect = copy.dst_rect();
        if !self.await_copies(scene)? {
            return self.redraw_area(scene, &dst_rect);
        }

        if self.cursor.drawn_inside(&copy.src).is_some() {
            self.erase_cursor()?;
        } else if self.cursor.drawn_inside(&dst_rect).is_some() {
            self.cursor.forget();
        }

        let metrics = self.metrics()?;
        self.copies_outstanding += 1;
        self.surface
            .copy_area(metrics.rect(&copy.src), (metrics.x(copy.dst.col), metrics.y(copy.dst.row)))?;
        Ok(())
    }

    /// Wait until no copy is outstanding, redrawing reported exposures
    ///
    /// Returns `false` when the acknowledgement did not arrive within the
    /// configured retries and timeout. The copy stays outstanding until its
    /// late acknowledgement is seen, so no second copy is issued meanwhile.
    fn await_copies(&mut self, scene: &dyn Scene) -> Result<bool> {
        let deadline = Instant::now() + Duration::from_millis(self.config.copy_ack_timeout_ms);
        let mut misses = 0;
        while self.copies_outstanding > 0 {
            self.guard.check()?;
            self.surface.sync()?;
            if let Some(NativeEvent::GraphicsExpose { area, count }) = self.surface.take_event(EventKind::GraphicsExpose)? {
                self.expose(scene, area, Some(count))?;
            } else if self.surface.take_event(EventKind::NoExpose)?.is_some() {
                self.copies_outstanding -= 1;
            } else {
                misses += 1;
                if misses > self.config.copy_ack_retries || Instant::now() >= deadline {
                    tracing::warn!(
                        outstanding = self.copies_outstanding,
                        "no acknowledgement for area copy; redrawing instead"
                    );
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Repaint an exposed pixel area
    ///
    /// `graphics_count` is set for exposures answering an area copy; the
    /// last of them (count 0) acknowledges the copy.
    pub(super) fn expose(&mut self, scene: &dyn Scene, area: PixelRect, graphics_count: Option<u32>) -> Result<()> {
        if graphics_count == Some(0) && self.copies_outstanding > 0 {
            self.copies_outstanding -= 1;
        }
        let metrics = self.metrics()?;
        let plan = plan_expose(metrics, area);
        if plan.cells.is_empty() {
            return Ok(());
        }
        tracing::trace!("expose {:?} -> cells {:?}", area, plan.cells);

        self.write_area(&plan.cells, true)?;
        for strip in &plan.borders {
            self.surface.clear_area(*strip)?;
        }
        self.draw_scene(scene, &plan.cells)?;
        if plan.cells.contains(self.cursor_pos) {
            self.update_cursor()?;
        }
        Ok(())
    }

    // --- cursor ---

    fn xor_cursor(&mut self, pos: CellPos) -> Result<()> {
        let metrics = self.metrics()?;
        let rects = self.cursor_style.shape(self.focused).rects(metrics.cell(pos));
        if !rects.is_empty() {
            self.surface.xor_rects(&rects, self.cursor_xor)?;
        }
        Ok(())
    }

    /// Take the cursor overlay off the screen
    pub(super) fn erase_cursor(&mut self) -> Result<()> {
        match self.cursor.erase() {
            Some(pos) => self.xor_cursor(pos),
            None => Ok(()),
        }
    }

    /// Bring the overlay in line with the cursor position and mode;
    /// returns whether anything was drawn
    pub(super) fn update_cursor(&mut self) -> Result<bool> {
        let visible = self.mode.contains(TtyMode::CURSOR)
            && self.cursor_pos.col < self.cols
            && self.cursor_pos.row < self.rows;
        let update = self.cursor.move_to(visible.then_some(self.cursor_pos));
        if let Some(pos) = update.erase {
            self.xor_cursor(pos)?;
        }
        if let Some(pos) = update.draw {
            self.xor_cursor(pos)?;
        }
        Ok(update.changed())
    }

    /// Focus moved; the overlay changes shape
    pub(super) fn set_focus(&mut self, focused: bool) -> Result<()> {
        if self.focused != focused {
            self.erase_cursor()?;
            self.focused = focused;
            self.mark_dirty();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::DisplayConfig;
    use crate::core::{Attrs, Grid};
    use crate::guard::ConnectionRegistry;
    use crate::native::{AckMode, LinkId, NativeOp, RecordingSurface};
    use crate::render::CursorState;

    fn open() -> (ConnectionRegistry, DisplayConnection<RecordingSurface>, Grid) {
        let registry = ConnectionRegistry::new();
        let mut conn = DisplayConnection::open(RecordingSurface::with_fixed_font(LinkId(1)), DisplayConfig::default(), &registry)
            .unwrap();
        conn.surface_mut().take_ops();
        (registry, conn, Grid::new(80, 24))
    }

    fn texts(conn: &DisplayConnection<RecordingSurface>) -> Vec<String> {
        conn.surface().ops().iter().filter_map(NativeOp::text).collect()
    }

    fn put_str(conn: &mut DisplayConnection<RecordingSurface>, grid: &Grid, col: u32, row: u32, text: &str, style: CellStyle) {
        for (i, c) in text.chars().enumerate() {
            conn.put_char(grid, CellPos::new(col + i as u32, row), c as GlyphCode, style).unwrap();
        }
    }

    #[test]
    fn test_contiguous_chars_make_one_draw() {
        let (_r, mut conn, grid) = open();
        put_str(&mut conn, &grid, 0, 0, "AB", CellStyle::default());
        put_str(&mut conn, &grid, 2, 0, "C", CellStyle::default());
        assert_eq!(conn.pending_run().len(), 3);
        conn.flush(&grid).unwrap();
        assert_eq!(texts(&conn), vec!["ABC"]);
    }

    #[test]
    fn test_style_change_and_gap_split_runs() {
        let (_r, mut conn, grid) = open();
        put_str(&mut conn, &grid, 0, 0, "ab", CellStyle::default());
        put_str(&mut conn, &grid, 2, 0, "cd", CellStyle::with_attrs(Attrs::UNDERLINE));
        put_str(&mut conn, &grid, 10, 0, "ef", CellStyle::with_attrs(Attrs::UNDERLINE));
        conn.flush(&grid).unwrap();
        assert_eq!(texts(&conn), vec!["ab", "cd", "ef"]);
    }

    #[test]
    fn test_control_codes_are_ignored() {
        let (_r, mut conn, grid) = open();
        conn.put_char(&grid, CellPos::new(0, 0), 0x07, CellStyle::default()).unwrap();
        conn.put_char(&grid, CellPos::new(0, 0), 0x7f, CellStyle::default()).unwrap();
        assert!(conn.pending_run().is_empty());
    }

    #[test]
    fn test_clear_drops_covered_run() {
        let (_r, mut conn, grid) = open();
        put_str(&mut conn, &grid, 2, 3, "gone", CellStyle::default());
        conn.clear_region(&grid, Rect::new(0, 3, 80, 1)).unwrap();
        conn.flush(&grid).unwrap();
        assert!(texts(&conn).is_empty());
        assert!(conn
            .surface()
            .ops()
            .contains(&NativeOp::ClearArea { area: PixelRect::new(0, 39, 480, 13) }));
    }

    #[test]
    fn test_clear_draws_partly_covered_run_first() {
        let (_r, mut conn, grid) = open();
        put_str(&mut conn, &grid, 0, 0, "keep", CellStyle::default());
        conn.clear_region(&grid, Rect::span(2, 0, 10)).unwrap();
        let ops = conn.surface().ops();
        let text = ops.iter().position(|op| op.text().is_some()).unwrap();
        let clear = ops.iter().position(|op| matches!(op, NativeOp::ClearArea { .. })).unwrap();
        assert!(text < clear);
    }

    #[test]
    fn test_scrolls_coalesce_into_one_copy() {
        let (_r, mut conn, grid) = open();
        let screen = Rect::new(0, 0, 80, 24);
        conn.scroll(&grid, screen, 2).unwrap();
        conn.scroll(&grid, screen, 3).unwrap();
        conn.flush(&grid).unwrap();
        let copies: Vec<_> = conn
            .surface()
            .ops()
            .iter()
            .filter_map(|op| match op {
                NativeOp::CopyArea { src, dst } => Some((*src, *dst)),
                _ => None,
            })
            .collect();
        assert_eq!(copies, vec![(PixelRect::new(0, 65, 480, 19 * 13), (0, 0))]);
        assert!(conn
            .surface()
            .ops()
            .contains(&NativeOp::ClearArea { area: PixelRect::new(0, 19 * 13, 480, 5 * 13) }));
    }

    #[test]
    fn test_opposite_scrolls_draw_separately() {
        let (_r, mut conn, grid) = open();
        let screen = Rect::new(0, 0, 80, 24);
        conn.scroll(&grid, screen, 1).unwrap();
        conn.scroll(&grid, screen, -1).unwrap();
        conn.flush(&grid).unwrap();
        assert_eq!(conn.surface().count_ops(|op| matches!(op, NativeOp::CopyArea { .. })), 2);
        // The second copy waited for the first one's acknowledgement
        assert!(conn.surface().count_ops(|op| matches!(op, NativeOp::Sync)) >= 1);
        assert_eq!(conn.copies_outstanding(), 1);
    }

    #[test]
    fn test_scroll_of_whole_region_only_clears() {
        let (_r, mut conn, grid) = open();
        conn.scroll(&grid, Rect::new(0, 0, 80, 4), 9).unwrap();
        conn.flush(&grid).unwrap();
        assert_eq!(conn.surface().count_ops(|op| matches!(op, NativeOp::CopyArea { .. })), 0);
        assert!(conn
            .surface()
            .ops()
            .contains(&NativeOp::ClearArea { area: PixelRect::new(0, 0, 480, 52) }));
    }

    #[test]
    fn test_cursor_overwritten_by_run_is_redrawn() {
        let (_r, mut conn, grid) = open();
        conn.move_cursor(CellPos::new(5, 5)).unwrap();
        conn.flush(&grid).unwrap();
        assert_eq!(conn.cursor().state(), CursorState::Shown(CellPos::new(5, 5)));

        put_str(&mut conn, &grid, 4, 5, "xyz", CellStyle::default());
        conn.surface_mut().take_ops();
        conn.flush(&grid).unwrap();
        let ops = conn.surface().ops();
        // Drawn once over the new text, never erased first
        assert_eq!(conn.surface().count_ops(|op| matches!(op, NativeOp::XorRects { .. })), 1);
        assert!(matches!(ops.last(), Some(NativeOp::Flush)));
        assert_eq!(conn.cursor().state(), CursorState::Shown(CellPos::new(5, 5)));
    }

    #[test]
    fn test_cursor_move_erases_old_overlay() {
        let (_r, mut conn, grid) = open();
        conn.move_cursor(CellPos::new(1, 1)).unwrap();
        conn.flush(&grid).unwrap();
        conn.move_cursor(CellPos::new(2, 1)).unwrap();
        conn.surface_mut().take_ops();
        conn.flush(&grid).unwrap();
        let xors: Vec<_> = conn
            .surface()
            .ops()
            .iter()
            .filter_map(|op| match op {
                NativeOp::XorRects { rects, .. } => Some(rects[0]),
                _ => None,
            })
            .collect();
        assert_eq!(xors, vec![PixelRect::new(6, 13, 6, 13), PixelRect::new(12, 13, 6, 13)]);
    }

    #[test]
    fn test_cursor_mode_off_hides_overlay() {
        let (_r, mut conn, grid) = open();
        conn.flush(&grid).unwrap();
        assert!(matches!(conn.cursor().state(), CursorState::Shown(_)));
        conn.set_mode(TtyMode::empty()).unwrap();
        conn.flush(&grid).unwrap();
        assert_eq!(conn.cursor().state(), CursorState::Hidden);
    }

    #[test]
    fn test_insert_and_delete_chars() {
        let (_r, mut conn, grid) = open();
        conn.insert_chars(&grid, CellPos::new(10, 2), 70, 3).unwrap();
        assert!(conn.surface().ops().contains(&NativeOp::CopyArea {
            src: PixelRect::new(60, 26, 67 * 6, 13),
            dst: (78, 26),
        }));
        assert!(conn
            .surface()
            .ops()
            .contains(&NativeOp::ClearArea { area: PixelRect::new(60, 26, 18, 13) }));

        conn.surface_mut().take_ops();
        conn.delete_chars(&grid, CellPos::new(10, 2), 70, 3).unwrap();
        assert!(conn.surface().ops().contains(&NativeOp::CopyArea {
            src: PixelRect::new(78, 26, 67 * 6, 13),
            dst: (60, 26),
        }));
        assert!(conn
            .surface()
            .ops()
            .contains(&NativeOp::ClearArea { area: PixelRect::new(77 * 6, 26, 18, 13) }));
    }

    #[test]
    fn test_missing_acknowledgement_redraws_destination() {
        let (_r, mut conn, mut grid) = open();
        // Row 1 after the scroll down
        grid.write_str(0, 1, "top", CellStyle::default());
        conn.surface_mut().set_ack_mode(AckMode::Withheld);
        let region = Rect::new(0, 0, 80, 10);
        conn.scroll(&grid, region, 1).unwrap();
        conn.flush(&grid).unwrap();
        assert_eq!(conn.copies_outstanding(), 1);

        conn.scroll(&grid, region, -1).unwrap();
        conn.flush(&grid).unwrap();
        assert_eq!(conn.surface().count_ops(|op| matches!(op, NativeOp::CopyArea { .. })), 1);
        assert_eq!(conn.copies_outstanding(), 1);
        assert!(texts(&conn).iter().any(|t| t.starts_with("top")));
    }

    #[test]
    fn test_late_acknowledgement_settles_abandoned_copy() {
        let (_r, mut conn, grid) = open();
        conn.surface_mut().set_ack_mode(AckMode::Withheld);
        let region = Rect::new(0, 0, 80, 10);
        conn.scroll(&grid, region, 1).unwrap();
        conn.flush(&grid).unwrap();
        conn.scroll(&grid, region, -1).unwrap();
        conn.flush(&grid).unwrap();
        assert_eq!(conn.copies_outstanding(), 1);
        assert_eq!(conn.surface().copies_in_flight(), 1);

        // The withheld acknowledgement turns up; later copies wait for it
        conn.surface_mut().set_ack_mode(AckMode::NoExpose);
        for lines in [1, -1, 1] {
            conn.scroll(&grid, region, lines).unwrap();
            conn.flush(&grid).unwrap();
            assert!(conn.surface().copies_in_flight() <= 1);
            assert!(conn.copies_outstanding() >= conn.surface().copies_in_flight());
            assert_eq!(conn.copies_outstanding(), 1);
        }
        assert_eq!(conn.surface().count_ops(|op| matches!(op, NativeOp::CopyArea { .. })), 4);
    }

    #[test]
    fn test_graphics_exposures_are_redrawn_while_waiting() {
        let (_r, mut conn, mut grid) = open();
        grid.write_str(0, 3, "hidden", CellStyle::default());
        conn.surface_mut()
            .set_ack_mode(AckMode::Exposures(vec![PixelRect::new(0, 39, 36, 13)]));
        let region = Rect::new(0, 0, 80, 24);
        conn.scroll(&grid, region, 1).unwrap();
        conn.scroll(&grid, region, -1).unwrap();
        conn.flush(&grid).unwrap();
        assert_eq!(conn.surface().count_ops(|op| matches!(op, NativeOp::CopyArea { .. })), 2);
        assert!(texts(&conn).contains(&"hidden".to_string()));
    }

    #[test]
    fn test_redraw_line_splits_styles() {
        let (_r, mut conn, mut grid) = open();
        grid.write_str(0, 1, "plain", CellStyle::default());
        grid.write_str(5, 1, "BOLD", CellStyle::with_attrs(Attrs::BOLD));
        conn.redraw_line(&grid, &grid, 1, CellPos::new(0, 1)).unwrap();
        // The blank rest of the line draws no text
        let drawn = texts(&conn);
        assert_eq!(drawn[0], "plain");
        assert_eq!(drawn[1], "BOLD");
        assert_eq!(drawn.len(), 2);
    }

    #[test]
    fn test_cursor_style_change_erases_with_old_shape() {
        let (_r, mut conn, grid) = open();
        conn.flush(&grid).unwrap();
        conn.surface_mut().take_ops();
        conn.set_cursor_style(CursorStyle(5)).unwrap();
        assert_eq!(
            conn.surface().ops(),
            &[NativeOp::XorRects {
                rects: vec![PixelRect::new(0, 0, 6, 13)],
                color: conn.cursor_xor,
            }]
        );
        conn.flush(&grid).unwrap();
        assert!(conn.surface().ops().contains(&NativeOp::XorRects {
            rects: vec![PixelRect::new(0, 0, 1, 13)],
            color: conn.cursor_xor,
        }));
    }
}
