//! Character Run Buffer
//!
//! Coalesces contiguous same-style character writes on one row into a
//! single pending run, so a line of output costs one text draw instead of
//! one per character.

use crate::core::{CellPos, CellStyle, GlyphCode, Rect};

/// Maximum glyphs in one pending run
pub const PUTC_CAPACITY: usize = 255;

/// A run taken out of the buffer for drawing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub origin: CellPos,
    pub style: CellStyle,
    pub glyphs: Vec<GlyphCode>,
}

impl Run {
    /// Cells covered by the run
    pub fn span(&self) -> Rect {
        Rect::span(self.origin.col, self.origin.row, self.glyphs.len() as u32)
    }
}

/// The single pending run of a connection
#[derive(Debug)]
pub struct PutcBuffer {
    origin: CellPos,
    style: CellStyle,
    glyphs: Vec<GlyphCode>,
}

impl Default for PutcBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PutcBuffer {
    pub fn new() -> Self {
        Self {
            origin: CellPos::default(),
            style: CellStyle::default(),
            glyphs: Vec::with_capacity(PUTC_CAPACITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Whether a glyph at `pos` with `style` extends the pending run
    pub fn extends(&self, pos: CellPos, style: &CellStyle) -> bool {
        !self.glyphs.is_empty()
            && self.glyphs.len() < PUTC_CAPACITY
            && self.origin.row == pos.row
            && self.origin.col + self.glyphs.len() as u32 == pos.col
            && self.style == *style
    }

    /// Start a new run; the buffer must be empty
    pub fn start(&mut self, pos: CellPos, style: CellStyle) {
        debug_assert!(self.glyphs.is_empty(), "pending run not flushed");
        self.glyphs.clear();
        self.origin = pos;
        self.style = style;
    }

    /// Append a glyph to the run
    pub fn push(&mut self, glyph: GlyphCode) {
        debug_assert!(self.glyphs.len() < PUTC_CAPACITY);
        self.glyphs.push(glyph);
    }

    /// Cells covered by the pending run
    pub fn span(&self) -> Option<Rect> {
        if self.glyphs.is_empty() {
            None
        } else {
            Some(Rect::span(self.origin.col, self.origin.row, self.glyphs.len() as u32))
        }
    }

    /// Whether the pending run shares a cell with `area`
    pub fn overlaps(&self, area: &Rect) -> bool {
        self.span().map(|s| s.overlaps(area)).unwrap_or(false)
    }

    /// Drop the pending run if `area` will overwrite all of it
    pub fn discard_within(&mut self, area: &Rect) -> bool {
        match self.span() {
            Some(span) if span.within(area) => {
                self.glyphs.clear();
                true
            }
            _ => false,
        }
    }

    /// Drop the pending run
    pub fn clear(&mut self) {
        self.glyphs.clear();
    }

    /// Take the pending run out for drawing; hand the glyph storage back
    /// with `recycle`
    pub fn take(&mut self) -> Option<Run> {
        if self.glyphs.is_empty() {
            return None;
        }
        let glyphs = std::mem::take(&mut self.glyphs);
        Some(Run {
            origin: self.origin,
            style: self.style,
            glyphs,
        })
    }

    /// Reuse a drawn run's storage
    pub fn recycle(&mut self, mut run: Run) {
        if self.glyphs.is_empty() && run.glyphs.capacity() >= PUTC_CAPACITY {
            run.glyphs.clear();
            self.glyphs = run.glyphs;
        } else if self.glyphs.capacity() < PUTC_CAPACITY {
            self.glyphs.reserve(PUTC_CAPACITY - self.glyphs.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Attrs, Colour};

    fn fill(buffer: &mut PutcBuffer, col: u32, row: u32, text: &str, style: CellStyle) -> usize {
        let mut flushes = 0;
        for (i, c) in text.chars().enumerate() {
            let pos = CellPos::new(col + i as u32, row);
            if !buffer.extends(pos, &style) {
                if let Some(run) = buffer.take() {
                    flushes += 1;
                    buffer.recycle(run);
                }
                buffer.start(pos, style);
            }
            buffer.push(c as GlyphCode);
        }
        flushes
    }

    #[test]
    fn test_contiguous_same_style_coalesces() {
        let mut buffer = PutcBuffer::new();
        let style = CellStyle::default();
        assert_eq!(fill(&mut buffer, 0, 0, "AB", style), 0);
        assert_eq!(fill(&mut buffer, 2, 0, "C", style), 0);
        let run = buffer.take().unwrap();
        assert_eq!(run.glyphs, vec!['A' as u32, 'B' as u32, 'C' as u32]);
        assert_eq!(run.span(), Rect::span(0, 0, 3));
    }

    #[test]
    fn test_style_change_breaks_run() {
        let mut buffer = PutcBuffer::new();
        fill(&mut buffer, 0, 0, "AB", CellStyle::default());
        let bold = CellStyle::new(Colour::DEFAULT, Colour::DEFAULT, Attrs::BOLD);
        assert_eq!(fill(&mut buffer, 2, 0, "C", bold), 1);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_gap_and_row_change_break_run() {
        let mut buffer = PutcBuffer::new();
        let style = CellStyle::default();
        fill(&mut buffer, 0, 0, "A", style);
        assert!(!buffer.extends(CellPos::new(2, 0), &style));
        assert!(!buffer.extends(CellPos::new(1, 1), &style));
        assert!(buffer.extends(CellPos::new(1, 0), &style));
    }

    #[test]
    fn test_capacity_forces_flush() {
        let mut buffer = PutcBuffer::new();
        let text: String = std::iter::repeat('x').take(PUTC_CAPACITY + 1).collect();
        assert_eq!(fill(&mut buffer, 0, 0, &text, CellStyle::default()), 1);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.span(), Some(Rect::span(PUTC_CAPACITY as u32, 0, 1)));
    }

    #[test]
    fn test_discard_within() {
        let mut buffer = PutcBuffer::new();
        fill(&mut buffer, 4, 2, "abc", CellStyle::default());
        assert!(!buffer.discard_within(&Rect::new(5, 2, 10, 1)));
        assert!(buffer.overlaps(&Rect::new(5, 2, 10, 1)));
        assert!(buffer.discard_within(&Rect::new(0, 0, 80, 24)));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_recycle_keeps_capacity() {
        let mut buffer = PutcBuffer::new();
        fill(&mut buffer, 0, 0, "abc", CellStyle::default());
        let run = buffer.take().unwrap();
        buffer.recycle(run);
        assert!(buffer.is_empty());
        assert!(buffer.glyphs.capacity() >= PUTC_CAPACITY);
    }
}
