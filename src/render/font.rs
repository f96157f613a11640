//! Font Set
//!
//! The four font variants a connection draws with, their shared cell
//! metrics and per-glyph coverage. Bold, italic and bold-italic variants
//! must match the base variant's cell size. Glyph lookup falls back along
//! a fixed chain: bold-italic, italic, bold, base.

use serde::{Deserialize, Serialize};

use super::CellMetrics;
use crate::core::{GlyphCode, SPACE};
use crate::error::{DisplayError, Result};
use crate::native::{FontId, GlyphTable, NativeResult, Surface};

/// Font variants, in fallback order from last to first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontKind {
    Base,
    Bold,
    Italic,
    BoldItalic,
}

impl FontKind {
    pub const ALL: [FontKind; 4] = [FontKind::Base, FontKind::Bold, FontKind::Italic, FontKind::BoldItalic];

    /// Lookup order starting at this variant when it lacks a glyph
    ///
    /// Only bold-italic tries the other styled variants; bold and italic
    /// go straight to the base font.
    fn fallback(self) -> &'static [FontKind] {
        match self {
            FontKind::BoldItalic => &[FontKind::BoldItalic, FontKind::Italic, FontKind::Bold, FontKind::Base],
            FontKind::Italic => &[FontKind::Italic, FontKind::Base],
            FontKind::Bold => &[FontKind::Bold, FontKind::Base],
            FontKind::Base => &[FontKind::Base],
        }
    }

    fn slot(self) -> usize {
        match self {
            FontKind::Base => 0,
            FontKind::Bold => 1,
            FontKind::Italic => 2,
            FontKind::BoldItalic => 3,
        }
    }

    pub fn is_bold(self) -> bool {
        matches!(self, FontKind::Bold | FontKind::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, FontKind::Italic | FontKind::BoldItalic)
    }
}

/// Set of glyph codes a font can draw
///
/// One bit per code up to the highest covered code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphCoverage {
    words: Vec<u64>,
    count: usize,
}

impl GlyphCoverage {
    /// Coverage of a native glyph table: every code in a uniform range, or
    /// every code with non-empty extents
    pub fn from_table(table: &GlyphTable) -> Self {
        let mut coverage = Self::default();
        match table {
            GlyphTable::Uniform { first, last } => {
                for code in *first..=*last {
                    coverage.insert(code);
                }
            }
            GlyphTable::PerGlyph(glyphs) => {
                for (code, extents) in glyphs {
                    if !extents.is_empty() {
                        coverage.insert(*code);
                    }
                }
            }
        }
        coverage
    }

    fn insert(&mut self, code: GlyphCode) {
        let word = (code / 64) as usize;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let bit = 1u64 << (code % 64);
        if self.words[word] & bit == 0 {
            self.words[word] |= bit;
            self.count += 1;
        }
    }

    pub fn contains(&self, code: GlyphCode) -> bool {
        self.words
            .get((code / 64) as usize)
            .map(|w| w & (1u64 << (code % 64)) != 0)
            .unwrap_or(false)
    }

    /// Number of covered codes
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Highest covered code
    pub fn max_code(&self) -> Option<GlyphCode> {
        let (i, word) = self.words.iter().enumerate().rev().find(|(_, w)| **w != 0)?;
        Some(i as GlyphCode * 64 + 63 - word.leading_zeros())
    }
}

/// One loaded font variant
#[derive(Debug, Clone)]
pub struct FontVariant {
    pub font: FontId,
    pub name: String,
    pub ascent: u16,
    pub descent: u16,
    pub coverage: GlyphCoverage,
}

/// What `load_variant` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// The variant already uses this font
    Unchanged,
}

/// Unicode replacements for the legacy line-drawing set
pub fn line_drawing(code: GlyphCode) -> Option<GlyphCode> {
    let c = char::from_u32(code)?;
    let mapped = match c {
        '+' => 0x2192,
        ',' => 0x2190,
        '-' => 0x2191,
        '.' => 0x2193,
        '0' => 0x2588,
        '`' => 0x25c6,
        'a' => 0x2592,
        'f' => 0x00b0,
        'g' => 0x00b1,
        'h' => 0x259a,
        'i' => 0x2603,
        'j' => 0x2518,
        'k' => 0x2510,
        'l' => 0x250c,
        'm' => 0x2514,
        'n' => 0x253c,
        'o' => 0x23ba,
        'p' => 0x23bb,
        'q' => 0x2500,
        'r' => 0x23bc,
        's' => 0x23bd,
        't' => 0x251c,
        'u' => 0x2524,
        'v' => 0x2534,
        'w' => 0x252c,
        'x' => 0x2502,
        'y' => 0x2264,
        'z' => 0x2265,
        '{' => 0x03c0,
        '|' => 0x2260,
        '}' => 0x00a3,
        '~' => 0x00b7,
        _ => return None,
    };
    Some(mapped)
}

/// Replace one dash-separated field of an XLFD font name
///
/// Field 3 is the weight, field 4 the slant. Returns `None` when the name
/// is not an XLFD name or already carries `value`.
pub fn xlfd_with_field(name: &str, field: usize, value: &str) -> Option<String> {
    if !name.starts_with('-') || field == 0 {
        return None;
    }
    let mut parts: Vec<&str> = name.split('-').collect();
    // The field must be followed by another dash
    if parts.len() <= field + 1 {
        return None;
    }
    if parts[field].eq_ignore_ascii_case(value) {
        return None;
    }
    parts[field] = value;
    Some(parts.join("-"))
}

/// The font variants of one connection
#[derive(Debug, Default)]
pub struct FontSet {
    variants: [Option<FontVariant>; 4],
    metrics: Option<CellMetrics>,
}

impl FontSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell size set by the base variant
    pub fn metrics(&self) -> Option<CellMetrics> {
        self.metrics
    }

    pub fn variant(&self, kind: FontKind) -> Option<&FontVariant> {
        self.variants[kind.slot()].as_ref()
    }

    pub fn has_variant(&self, kind: FontKind) -> bool {
        self.variants[kind.slot()].is_some()
    }

    /// Whether `kind` is loaded and covers `code`
    pub fn covers(&self, kind: FontKind, code: GlyphCode) -> bool {
        self.variant(kind).map(|v| v.coverage.contains(code)).unwrap_or(false)
    }

    /// Load a font into a variant slot
    ///
    /// The base variant sets the cell metrics; any other variant must match
    /// them. On failure the previously loaded variant stays in place.
    pub fn load_variant<S: Surface>(&mut self, surface: &mut S, kind: FontKind, name: &str) -> Result<LoadOutcome> {
        let Some(font) = surface.load_font(name)? else {
            tracing::warn!("font not found: {}", name);
            return Err(DisplayError::FontNotFound(name.to_string()));
        };

        if self.variant(kind).map(|v| v.name == font.name).unwrap_or(false) {
            surface.unload_font(font.id)?;
            return Ok(LoadOutcome::Unchanged);
        }

        let (width, height) = font.cell_size();
        let loaded = CellMetrics::new(width as u32, height as u32);
        if kind != FontKind::Base {
            match self.metrics {
                None => {
                    surface.unload_font(font.id)?;
                    return Err(DisplayError::NoBaseFont);
                }
                Some(base) if base != loaded => {
                    tracing::warn!("font extents mismatch: {} is {:?}, cells are {:?}", name, loaded, base);
                    surface.unload_font(font.id)?;
                    return Err(DisplayError::MetricsMismatch {
                        name: name.to_string(),
                        expected: base,
                        found: loaded,
                    });
                }
                Some(_) => {}
            }
        }

        self.unload(surface, kind)?;

        if kind == FontKind::Base && self.metrics != Some(loaded) {
            self.metrics = Some(loaded);
            // Variants sized for the old cells no longer fit
            for other in [FontKind::Bold, FontKind::Italic, FontKind::BoldItalic] {
                self.unload(surface, other)?;
            }
        }

        let coverage = GlyphCoverage::from_table(&font.glyphs);
        tracing::debug!("font loaded with {} characters: {}", coverage.len(), font.name);
        self.variants[kind.slot()] = Some(FontVariant {
            font: font.id,
            name: font.name,
            ascent: font.ascent,
            descent: font.descent,
            coverage,
        });
        Ok(LoadOutcome::Loaded)
    }

    /// Unload one variant
    pub fn unload<S: Surface>(&mut self, surface: &mut S, kind: FontKind) -> NativeResult<()> {
        if let Some(variant) = self.variants[kind.slot()].take() {
            surface.unload_font(variant.font)?;
        }
        Ok(())
    }

    /// Unload every variant
    pub fn release<S: Surface>(&mut self, surface: &mut S) -> NativeResult<()> {
        for kind in FontKind::ALL {
            self.unload(surface, kind)?;
        }
        Ok(())
    }

    /// Forget every variant without native calls, after the link died
    pub fn abandon(&mut self) {
        self.variants = Default::default();
    }

    /// The variant to draw cells with these bold/italic flags
    pub fn variant_for(&self, bold: bool, italic: bool) -> FontKind {
        if italic && bold && self.has_variant(FontKind::BoldItalic) {
            FontKind::BoldItalic
        } else if italic && self.has_variant(FontKind::Italic) {
            FontKind::Italic
        } else if bold && self.has_variant(FontKind::Bold) {
            FontKind::Bold
        } else {
            FontKind::Base
        }
    }

    /// The variant drawing `code` for a cell wanting `kind`
    ///
    /// Starts at `kind` and walks its fallback chain. `None` for spaces and
    /// for glyphs no variant in the chain covers.
    pub fn pick(&self, kind: FontKind, code: GlyphCode) -> Option<FontKind> {
        if code == SPACE {
            return None;
        }
        kind.fallback().iter().copied().find(|k| self.covers(*k, code))
    }

    /// Map a glyph of the legacy line-drawing set
    ///
    /// Codes `` ` `` to `~` use the font's own graphics slots (code - 0x5F)
    /// when it has them, otherwise the Unicode replacement.
    pub fn substitute(&self, kind: FontKind, code: GlyphCode) -> GlyphCode {
        if (0x60..=0x7e).contains(&code) && self.pick(kind, code - 0x5f).is_some() {
            return code - 0x5f;
        }
        line_drawing(code).unwrap_or(code)
    }
}
