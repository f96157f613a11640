//! Terminal Cell
//!
//! The engine's read-only view of one grid cell: a glyph code plus the
//! colours and attributes it is drawn with. Cells are owned by the
//! terminal core; the engine only copies their style into pending runs.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// A glyph code as drawn by the native layer (a Unicode scalar value).
pub type GlyphCode = u32;

/// The blank glyph.
pub const SPACE: GlyphCode = b' ' as GlyphCode;

bitflags! {
    /// Text attributes carried by a cell
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Attrs: u16 {
        /// Bold, also used as "bright" for the low eight colours
        const BOLD      = 0x0001;
        const DIM       = 0x0002;
        const UNDERLINE = 0x0004;
        const BLINK     = 0x0008;
        const REVERSE   = 0x0010;
        const HIDDEN    = 0x0020;
        const ITALICS   = 0x0040;
        /// Legacy line-drawing character set selected
        const CHARSET   = 0x0080;
    }
}

/// Colour reference stored in a cell
///
/// `Code` keeps the classic numbering: 0-7 normal colours, 8 the terminal
/// default, 90-97 bright foregrounds and 100-107 bright backgrounds.
/// `Palette` addresses the 256-colour table directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Colour {
    /// Classic colour code (see type docs)
    Code(u8),
    /// 256-colour palette slot
    Palette(u8),
    /// 24-bit colour
    Rgb(u8, u8, u8),
}

impl Colour {
    /// The terminal default colour
    pub const DEFAULT: Colour = Colour::Code(8);

    pub const BLACK: Colour = Colour::Code(0);
    pub const RED: Colour = Colour::Code(1);
    pub const GREEN: Colour = Colour::Code(2);
    pub const YELLOW: Colour = Colour::Code(3);
    pub const BLUE: Colour = Colour::Code(4);
    pub const MAGENTA: Colour = Colour::Code(5);
    pub const CYAN: Colour = Colour::Code(6);
    pub const WHITE: Colour = Colour::Code(7);

    /// Whether this is the terminal default colour
    pub fn is_default(&self) -> bool {
        *self == Colour::DEFAULT
    }
}

impl Default for Colour {
    fn default() -> Self {
        Colour::DEFAULT
    }
}

/// Everything about a cell except its glyph
///
/// Two cells can share one batched text draw only when their styles are
/// equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CellStyle {
    #[serde(default)]
    pub fg: Colour,
    #[serde(default)]
    pub bg: Colour,
    #[serde(default)]
    pub attrs: Attrs,
}

impl CellStyle {
    pub fn new(fg: Colour, bg: Colour, attrs: Attrs) -> Self {
        Self { fg, bg, attrs }
    }

    /// Default colours with the given attributes
    pub fn with_attrs(attrs: Attrs) -> Self {
        Self {
            attrs,
            ..Default::default()
        }
    }
}

/// A single cell in the terminal grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// The glyph drawn in this cell
    pub glyph: GlyphCode,
    /// Colours and attributes
    pub style: CellStyle,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            glyph: SPACE,
            style: CellStyle::default(),
        }
    }
}

impl Cell {
    /// Create a default-styled cell holding a character
    pub fn new(c: char) -> Self {
        Self {
            glyph: c as GlyphCode,
            ..Default::default()
        }
    }

    /// Create a cell with content and style
    pub fn with_style(c: char, style: CellStyle) -> Self {
        Self {
            glyph: c as GlyphCode,
            style,
        }
    }

    /// Check if this cell draws nothing but background
    pub fn is_blank(&self) -> bool {
        self.glyph == SPACE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_default() {
        let cell = Cell::default();
        assert!(cell.is_blank());
        assert!(cell.style.fg.is_default());
        assert!(cell.style.bg.is_default());
        assert!(cell.style.attrs.is_empty());
    }

    #[test]
    fn test_cell_new() {
        let cell = Cell::new('A');
        assert_eq!(cell.glyph, 0x41);
        assert!(!cell.is_blank());
    }

    #[test]
    fn test_style_equality_drives_batching() {
        let a = CellStyle::new(Colour::RED, Colour::DEFAULT, Attrs::BOLD);
        let b = CellStyle::new(Colour::RED, Colour::DEFAULT, Attrs::BOLD);
        let c = CellStyle::new(Colour::RED, Colour::DEFAULT, Attrs::BOLD | Attrs::UNDERLINE);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_attrs_serde_round_trip() {
        let attrs = Attrs::BOLD | Attrs::ITALICS;
        let json = serde_json::to_string(&attrs).unwrap();
        let back: Attrs = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attrs);
    }
}
