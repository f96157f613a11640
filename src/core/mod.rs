//! Terminal Core Types
//!
//! The engine's read-only model of what it draws:
//! - Cells with glyph codes, colours and attributes
//! - Cell-addressed rectangles and positions
//! - The grid view contract and a small owned grid
//!
//! The engine never mutates grid storage; the terminal core owns it.

mod cell;
mod geometry;
mod grid;

pub use cell::{Attrs, Cell, CellStyle, Colour, GlyphCode, SPACE};
pub use geometry::{CellPos, Rect};
pub use grid::{Grid, GridView, Row};
