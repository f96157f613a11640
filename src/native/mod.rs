//! Native Windowing Layer
//!
//! The contract between the engine and a pixel-addressed windowing system.
//! A `Surface` owns one window on one native link and exposes the drawing,
//! resource, event and selection calls the engine needs. Every call may
//! fail; `NativeError::Io` means the link is dead and is fatal for every
//! connection sharing it.
//!
//! `RecordingSurface` implements the contract in memory for tests and the
//! headless runner.

mod event;
mod font;
mod recording;

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

pub use event::{
    ButtonEvent, ButtonKind, EventKind, KeyEvent, Modifiers, NativeEvent, SelectionNotify,
    SelectionRequest,
};
pub use font::{FontError, GlyphExtents, GlyphTable, LoadedFont};
pub use recording::{AckMode, NativeOp, RecordingSurface};

/// Result of a native call
pub type NativeResult<T> = Result<T, NativeError>;

/// Native layer failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NativeError {
    /// The link to the windowing system is gone
    #[error("native I/O failure: {0}")]
    Io(String),

    /// A single request was rejected; the link is still usable
    #[error("native request {request} failed with code {code}")]
    Request { request: &'static str, code: u8 },
}

impl NativeError {
    /// Whether this error kills the link
    pub fn is_fatal(&self) -> bool {
        matches!(self, NativeError::Io(_))
    }
}

/// Identifies one native link (display connection); several engine
/// connections may share a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkId(pub u32);

/// Native font handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontId(pub u32);

/// Native pixel value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pixel(pub u32);

impl Pixel {
    /// Pixel for a 24-bit colour on a TrueColor visual
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Pixel(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }
}

impl std::ops::BitXor for Pixel {
    type Output = Pixel;

    fn bitxor(self, rhs: Pixel) -> Pixel {
        Pixel(self.0 ^ rhs.0)
    }
}

/// 24-bit colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Server timestamp attached to input and selection events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

/// A pixel-addressed rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A window the engine can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowRef {
    /// The connection's own window
    Own,
    /// The root window of the screen
    Root,
    /// Another client's window
    Other(u64),
}

/// Interned property/target name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atom(pub Cow<'static, str>);

impl Atom {
    pub const STRING: Atom = Atom(Cow::Borrowed("STRING"));
    pub const TEXT: Atom = Atom(Cow::Borrowed("TEXT"));
    pub const TARGETS: Atom = Atom(Cow::Borrowed("TARGETS"));
    pub const ATOM: Atom = Atom(Cow::Borrowed("ATOM"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Atom(name.into())
    }

    /// Root window property holding legacy cut buffer `n` (0-7)
    pub fn cut_buffer(n: u8) -> Self {
        Atom(Cow::Owned(format!("CUT_BUFFER{}", n.min(7))))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Selections the engine reads and owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selection {
    Primary,
    Secondary,
    Clipboard,
}

/// Data stored in a window property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// 8-bit data of the given type
    Bytes { kind: Atom, data: Vec<u8> },
    /// A list of atoms
    Atoms(Vec<Atom>),
}

/// One batched text draw
#[derive(Debug, Clone, Copy)]
pub struct TextRun<'a> {
    /// Left edge of the first glyph
    pub x: i32,
    /// Baseline
    pub y: i32,
    pub font: FontId,
    pub glyphs: &'a [u32],
    pub fg: Pixel,
    /// Background to paint behind the glyphs; `None` leaves it untouched
    pub bg: Option<Pixel>,
}

/// Window creation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSetup {
    pub width: u32,
    pub height: u32,
    pub background: Pixel,
    /// Resize increment and minimum size, in pixels
    pub cell_width: u32,
    pub cell_height: u32,
    /// Resource name and class hints
    pub name: String,
    pub class: String,
}

/// The native windowing surface
///
/// All coordinates are pixels relative to the connection's window.
pub trait Surface {
    /// The link this surface belongs to
    fn link(&self) -> LinkId;

    // --- resources ---

    /// Load a font by name; `Ok(None)` when no such font exists
    fn load_font(&mut self, name: &str) -> NativeResult<Option<LoadedFont>>;

    fn unload_font(&mut self, font: FontId) -> NativeResult<()>;

    /// Allocate a colour cell; `Ok(None)` when the colormap is exhausted
    fn alloc_color(&mut self, rgb: Rgb) -> NativeResult<Option<Pixel>>;

    /// Look a colour name up in the native colour database
    fn lookup_color(&mut self, name: &str) -> NativeResult<Option<Rgb>>;

    fn free_colors(&mut self, pixels: &[Pixel]) -> NativeResult<()>;

    fn black_pixel(&self) -> Pixel;

    fn white_pixel(&self) -> Pixel;

    // --- window ---

    fn create_window(&mut self, setup: &WindowSetup) -> NativeResult<()>;

    /// Update size hints and class of an existing window
    fn configure_window(&mut self, setup: &WindowSetup) -> NativeResult<()>;

    /// Current window size in pixels
    fn window_size(&mut self) -> NativeResult<(u32, u32)>;

    fn set_background(&mut self, pixel: Pixel) -> NativeResult<()>;

    fn map_window(&mut self) -> NativeResult<()>;

    fn destroy_window(&mut self) -> NativeResult<()>;

    fn set_title(&mut self, title: &str) -> NativeResult<()>;

    fn bell(&mut self) -> NativeResult<()>;

    // --- drawing ---

    /// Reset an area to the window background
    fn clear_area(&mut self, area: PixelRect) -> NativeResult<()>;

    fn fill_rect(&mut self, area: PixelRect, color: Pixel) -> NativeResult<()>;

    fn draw_text(&mut self, run: &TextRun<'_>) -> NativeResult<()>;

    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Pixel) -> NativeResult<()>;

    /// Copy window content; answered later by `GraphicsExpose` events
    /// (last with count 0) or a single `NoExpose`
    fn copy_area(&mut self, src: PixelRect, dst: (i32, i32)) -> NativeResult<()>;

    /// XOR the rectangles with a colour; applying it twice restores the pixels
    fn xor_rects(&mut self, rects: &[PixelRect], color: Pixel) -> NativeResult<()>;

    /// Push buffered requests to the windowing system
    fn flush(&mut self) -> NativeResult<()>;

    // --- events ---

    /// Flush and wait until every request has been processed
    fn sync(&mut self) -> NativeResult<()>;

    /// Next queued event, without blocking
    fn next_event(&mut self) -> NativeResult<Option<NativeEvent>>;

    /// Remove the first queued event of a kind, leaving others queued
    fn take_event(&mut self, kind: EventKind) -> NativeResult<Option<NativeEvent>>;

    // --- selections and properties ---

    /// Try to own a selection; returns whether this window now owns it
    fn set_selection_owner(&mut self, selection: Selection, time: Timestamp) -> NativeResult<bool>;

    fn owns_selection(&mut self, selection: Selection) -> NativeResult<bool>;

    /// Ask the selection owner to convert into a property on our window
    fn convert_selection(
        &mut self,
        selection: Selection,
        target: &Atom,
        property: &Atom,
        time: Timestamp,
    ) -> NativeResult<()>;

    fn read_property(&mut self, window: WindowRef, property: &Atom) -> NativeResult<Option<PropertyValue>>;

    fn write_property(&mut self, window: WindowRef, property: &Atom, value: PropertyValue) -> NativeResult<()>;

    fn delete_property(&mut self, window: WindowRef, property: &Atom) -> NativeResult<()>;

    fn send_selection_notify(&mut self, notify: &SelectionNotify) -> NativeResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_from_rgb() {
        assert_eq!(Pixel::from_rgb(0x12, 0x34, 0x56), Pixel(0x123456));
        assert_eq!(Pixel(0xff) ^ Pixel(0x0f), Pixel(0xf0));
    }

    #[test]
    fn test_cut_buffer_atoms() {
        assert_eq!(Atom::cut_buffer(3).name(), "CUT_BUFFER3");
        assert_eq!(Atom::cut_buffer(12).name(), "CUT_BUFFER7");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(NativeError::Io("broken pipe".into()).is_fatal());
        assert!(!NativeError::Request {
            request: "CopyArea",
            code: 9
        }
        .is_fatal());
    }
}
