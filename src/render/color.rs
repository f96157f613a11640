//! Colour Table
//!
//! Resolves cell colours to native pixels. The 256-entry palette is built
//! from the 16 ANSI colours, a 6x6x6 colour cube and a 24-step grey ramp,
//! then patched with user overrides. The terminal default foreground and
//! background are resolved separately from palette slot 8.

use crate::core::{Attrs, CellStyle, Colour};
use crate::native::{NativeResult, Pixel, Rgb, Surface};

/// Number of palette entries
pub const PALETTE_SIZE: usize = 256;

/// xterm's ANSI colours
const ANSI: [Rgb; 16] = [
    Rgb(0, 0, 0),       // Black
    Rgb(205, 0, 0),     // Red
    Rgb(0, 205, 0),     // Green
    Rgb(205, 205, 0),   // Yellow
    Rgb(0, 0, 238),     // Blue
    Rgb(205, 0, 205),   // Magenta
    Rgb(0, 205, 205),   // Cyan
    Rgb(229, 229, 229), // White
    Rgb(127, 127, 127), // Bright Black
    Rgb(255, 0, 0),     // Bright Red
    Rgb(0, 255, 0),     // Bright Green
    Rgb(255, 255, 0),   // Bright Yellow
    Rgb(92, 92, 255),   // Bright Blue
    Rgb(255, 0, 255),   // Bright Magenta
    Rgb(0, 255, 255),   // Bright Cyan
    Rgb(255, 255, 255), // Bright White
];

const COLOUR_NAMES: [&str; 8] = ["black", "red", "green", "yellow", "blue", "magenta", "cyan", "white"];

/// The standard RGB value of a palette slot
pub fn standard_rgb(index: u8) -> Rgb {
    match index {
        0..=15 => ANSI[index as usize],
        16..=231 => {
            let n = index - 16;
            let b = n % 6;
            let g = (n / 6) % 6;
            let r = n / 36;
            let to_component = |c: u8| if c == 0 { 0 } else { 55 + c * 40 };
            Rgb(to_component(r), to_component(g), to_component(b))
        }
        232..=255 => {
            let gray = 8 + (index - 232) * 10;
            Rgb(gray, gray, gray)
        }
    }
}

/// Parse a `colourN`, `colorN` or bare `N` palette reference
fn palette_reference(name: &str) -> Option<u8> {
    let lower = name.to_ascii_lowercase();
    let digits = lower
        .strip_prefix("colour")
        .or_else(|| lower.strip_prefix("color"))
        .unwrap_or(&lower);
    digits.parse::<u8>().ok()
}

/// Palette slot named by an override key: a palette reference or one of
/// the ANSI colour names, optionally prefixed with `bright`
fn override_slot(key: &str) -> Option<u8> {
    if let Some(index) = palette_reference(key) {
        return Some(index);
    }
    let lower = key.to_ascii_lowercase();
    let (base, name) = match lower.strip_prefix("bright") {
        Some(rest) => (8, rest),
        None => (0, lower.as_str()),
    };
    COLOUR_NAMES
        .iter()
        .position(|n| *n == name)
        .map(|i| base + i as u8)
}

/// Where a resolved colour came from, for the bright rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Default,
    /// One of the eight classic colours
    Basic(u8),
    Other,
}

/// Pixels to draw a cell with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColours {
    pub fg: Pixel,
    pub bg: Pixel,
}

/// Palette index to native pixel mapping
///
/// The default table is empty until built; every lookup yields pixel 0.
#[derive(Debug, Clone, Default)]
pub struct ColorTable {
    pixels: Vec<Pixel>,
    fg: Pixel,
    bg: Pixel,
    /// Pixels allocated from the native colormap, freed on rebuild
    allocated: Vec<Pixel>,
}

impl ColorTable {
    /// Allocate the standard palette, apply `overrides` and resolve the
    /// default colours
    ///
    /// `overrides` is a list of `key=value` pairs separated by `;`, `,` or
    /// spaces. Keys are palette references (`colour9`, `9`) or colour names
    /// (`red`, `brightred`); values are palette references or native colour
    /// names. Unparseable entries are skipped.
    pub fn build<S: Surface>(surface: &mut S, overrides: &str, fg: &str, bg: &str) -> NativeResult<Self> {
        let mut table = Self {
            pixels: Vec::with_capacity(PALETTE_SIZE),
            fg: surface.white_pixel(),
            bg: surface.black_pixel(),
            allocated: Vec::new(),
        };
        table.fill(surface, overrides, fg, bg)?;
        Ok(table)
    }

    /// Free the current allocation and build again
    pub fn rebuild<S: Surface>(&mut self, surface: &mut S, overrides: &str, fg: &str, bg: &str) -> NativeResult<()> {
        self.release(surface)?;
        self.fill(surface, overrides, fg, bg)
    }

    fn fill<S: Surface>(&mut self, surface: &mut S, overrides: &str, fg: &str, bg: &str) -> NativeResult<()> {
        self.pixels.clear();
        for index in 0..PALETTE_SIZE {
            let pixel = match surface.alloc_color(standard_rgb(index as u8))? {
                Some(pixel) => {
                    self.allocated.push(pixel);
                    pixel
                }
                // Alternate black and white so neighbouring colours stay apart
                None if index & 1 == 1 => surface.white_pixel(),
                None => surface.black_pixel(),
            };
            self.pixels.push(pixel);
        }

        for entry in overrides.split([';', ',', ' ']) {
            let Some((key, value)) = entry.split_once('=') else {
                continue;
            };
            let Some(slot) = override_slot(key) else {
                tracing::debug!("ignoring colour override for unknown slot {:?}", key);
                continue;
            };
            let current = self.pixels[slot as usize];
            self.pixels[slot as usize] = self.parse_color(surface, value, current)?;
        }

        let black = surface.black_pixel();
        let white = surface.white_pixel();
        self.bg = self.parse_color(surface, bg, black)?;
        self.fg = self.parse_color(surface, fg, white)?;
        tracing::debug!(
            "colour table built: {} allocated, fg {:06x}, bg {:06x}",
            self.allocated.len(),
            self.fg.0,
            self.bg.0
        );
        Ok(())
    }

    /// Resolve a colour name: a palette reference, or a native colour name
    /// allocated on demand; `fallback` when neither works
    pub fn parse_color<S: Surface>(&mut self, surface: &mut S, name: &str, fallback: Pixel) -> NativeResult<Pixel> {
        if let Some(index) = palette_reference(name) {
            return Ok(self.pixel(index));
        }
        if name.is_empty() {
            return Ok(fallback);
        }
        let Some(rgb) = surface.lookup_color(name)? else {
            return Ok(fallback);
        };
        match surface.alloc_color(rgb)? {
            Some(pixel) => {
                self.allocated.push(pixel);
                Ok(pixel)
            }
            None => Ok(fallback),
        }
    }

    /// XOR value drawing the cursor in `name` over the default background;
    /// an unknown or empty name inverts
    pub fn cursor_xor<S: Surface>(&mut self, surface: &mut S, name: &str) -> NativeResult<Pixel> {
        let inverse = self.bg ^ surface.white_pixel();
        let colour = self.parse_color(surface, name, inverse)?;
        Ok(self.bg ^ colour)
    }

    /// Return every allocated pixel to the colormap
    pub fn release<S: Surface>(&mut self, surface: &mut S) -> NativeResult<()> {
        if !self.allocated.is_empty() {
            surface.free_colors(&self.allocated)?;
            self.allocated.clear();
        }
        Ok(())
    }

    /// The pixel of a palette slot
    pub fn pixel(&self, index: u8) -> Pixel {
        self.pixels.get(index as usize).copied().unwrap_or_default()
    }

    pub fn default_fg(&self) -> Pixel {
        self.fg
    }

    pub fn default_bg(&self) -> Pixel {
        self.bg
    }

    pub fn allocated(&self) -> &[Pixel] {
        &self.allocated
    }

    /// `bright` is the first bright code for this side: 90 for foreground,
    /// 100 for background.
    fn lookup(&self, colour: Colour, default: Pixel, bright: u8) -> (Pixel, Source) {
        match colour {
            Colour::Code(8) => (default, Source::Default),
            Colour::Code(n @ 0..=7) => (self.pixel(n), Source::Basic(n)),
            // Bright codes fold onto palette slots 8-15
            Colour::Code(n) if (bright..bright + 8).contains(&n) => (self.pixel(n - bright + 8), Source::Other),
            Colour::Code(n) | Colour::Palette(n) => (self.pixel(n), Source::Other),
            Colour::Rgb(r, g, b) => (Pixel::from_rgb(r, g, b), Source::Other),
        }
    }

    /// Resolve a cell's colours
    ///
    /// `bold_weight` says whether the font variant drawing the cell already
    /// conveys bold by weight. Without it, a bold cell with one of the eight
    /// classic foreground colours is promoted to the bright colour; the
    /// promotion also happens when foreground and background would
    /// otherwise be identical.
    pub fn resolve(&self, style: &CellStyle, bold_weight: bool) -> ResolvedColours {
        let (mut fg, mut fg_source) = self.lookup(style.fg, self.fg, 90);
        let (mut bg, mut bg_source) = self.lookup(style.bg, self.bg, 100);

        if style.attrs.contains(Attrs::REVERSE) {
            std::mem::swap(&mut fg, &mut bg);
            std::mem::swap(&mut fg_source, &mut bg_source);
        }

        if style.attrs.contains(Attrs::BOLD) {
            if let Source::Basic(n) = fg_source {
                if fg == bg || !bold_weight {
                    fg = self.pixel(n + 8);
                }
            }
        }

        ResolvedColours { fg, bg }
    }
}
