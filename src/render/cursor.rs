//! Cursor Shadow
//!
//! Tracks where the cursor overlay is physically drawn. The overlay is an
//! XOR, so erasing it means drawing it again on the same cell. Anything
//! that overwrites the cell makes the overlay vanish with it; the shadow
//! then goes hidden so the next move draws it afresh.

use serde::{Deserialize, Serialize};

use crate::core::{CellPos, Rect};
use crate::native::PixelRect;

/// Whether the overlay is on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Hidden,
    Shown(CellPos),
}

/// Native work for a cursor move
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorUpdate {
    /// Cell to XOR again to remove the old overlay
    pub erase: Option<CellPos>,
    /// Cell to XOR to draw the new overlay
    pub draw: Option<CellPos>,
}

impl CursorUpdate {
    pub fn changed(&self) -> bool {
        self.erase.is_some() || self.draw.is_some()
    }
}

/// Record of the drawn cursor overlay
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorShadow {
    /// Cell the overlay was last placed on
    pos: Option<CellPos>,
    /// Whether the overlay is still on that cell
    drawn: bool,
}

impl CursorShadow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CursorState {
        match self.pos {
            Some(pos) if self.drawn => CursorState::Shown(pos),
            _ => CursorState::Hidden,
        }
    }

    /// Move the overlay; `None` hides it
    ///
    /// A move to the cell where the overlay is still drawn is a no-op.
    pub fn move_to(&mut self, target: Option<CellPos>) -> CursorUpdate {
        let Some(target) = target else {
            return CursorUpdate {
                erase: self.erase(),
                draw: None,
            };
        };
        if self.drawn && self.pos == Some(target) {
            return CursorUpdate::default();
        }
        let erase = self.erase();
        self.pos = Some(target);
        self.drawn = true;
        CursorUpdate {
            erase,
            draw: Some(target),
        }
    }

    /// Take the overlay off; returns the cell to XOR again
    pub fn erase(&mut self) -> Option<CellPos> {
        let drawn = self.drawn;
        self.drawn = false;
        if drawn {
            self.pos
        } else {
            None
        }
    }

    /// `area` is about to be overwritten: if the overlay's cell is inside,
    /// forget the overlay and return that cell
    ///
    /// The cell is returned even when the overlay is not drawn, since an
    /// erase may still be in flight against exposure events.
    pub fn overwrite(&mut self, area: &Rect) -> Option<CellPos> {
        let pos = self.pos.filter(|p| area.contains(*p))?;
        self.drawn = false;
        Some(pos)
    }

    /// The cell of a drawn overlay inside `area`
    pub fn drawn_inside(&self, area: &Rect) -> Option<CellPos> {
        match self.state() {
            CursorState::Shown(pos) if area.contains(pos) => Some(pos),
            _ => None,
        }
    }

    /// Forget the overlay without erasing it; its pixels are gone
    pub fn forget(&mut self) {
        self.drawn = false;
    }

    /// Forget everything, including the last position
    pub fn reset(&mut self) {
        self.pos = None;
        self.drawn = false;
    }
}

/// Overlay shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CursorShape {
    Block,
    Underline,
    Bar,
    Outline,
    BottomHalf,
    LeftHalf,
    Blank,
}

/// Cursor style number: low nibble when focused, high nibble when not
///
/// Odd/even pairs select blinking/steady variants of one shape; blinking
/// is drawn steady. Zero selects the default: block when focused,
/// outline when not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CursorStyle(pub u8);

impl CursorStyle {
    pub fn shape(self, focused: bool) -> CursorShape {
        let mut style = if focused { self.0 & 0x0f } else { self.0 >> 4 };
        if style == 0 {
            style = if focused { 2 } else { 8 };
        }
        match style {
            3 | 4 => CursorShape::Underline,
            5 | 6 => CursorShape::Bar,
            7 | 8 => CursorShape::Outline,
            9 | 10 => CursorShape::BottomHalf,
            11 | 12 => CursorShape::LeftHalf,
            15 => CursorShape::Blank,
            _ => CursorShape::Block,
        }
    }
}

impl CursorShape {
    /// Rectangles to XOR for a cell; they never overlap, so a second XOR
    /// restores every pixel
    pub fn rects(self, cell: PixelRect) -> Vec<PixelRect> {
        let PixelRect { x, y, width: w, height: h } = cell;
        if w == 0 || h == 0 {
            return Vec::new();
        }
        match self {
            CursorShape::Block => vec![cell],
            CursorShape::Underline => vec![PixelRect::new(x, y + h as i32 - 1, w, 1)],
            CursorShape::Bar => vec![PixelRect::new(x, y, 1, h)],
            CursorShape::Outline if w < 3 || h < 3 => vec![cell],
            CursorShape::Outline => vec![
                PixelRect::new(x, y, w, 1),
                PixelRect::new(x, y + h as i32 - 1, w, 1),
                PixelRect::new(x, y + 1, 1, h - 2),
                PixelRect::new(x + w as i32 - 1, y + 1, 1, h - 2),
            ],
            CursorShape::BottomHalf => vec![PixelRect::new(x, y + (h / 2) as i32, w, (h + 1) / 2)],
            CursorShape::LeftHalf => vec![PixelRect::new(x, y, (w / 2).max(1), h)],
            CursorShape::Blank => Vec::new(),
        }
    }
}
