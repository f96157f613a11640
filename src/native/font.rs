//! Native Font Descriptions
//!
//! What the native layer reports about a loaded font: its handle, name,
//! vertical metrics, cell advance and per-glyph extents. The engine builds
//! its coverage masks from this. Surfaces that rasterise client side can
//! build a description from font file data with fontdue.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::FontId;
use crate::core::GlyphCode;

/// Ink extents of one glyph; all zero means the font has no shape for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GlyphExtents {
    pub lbearing: i16,
    pub rbearing: i16,
    pub width: i16,
    pub ascent: i16,
    pub descent: i16,
}

impl GlyphExtents {
    /// Extents of an ordinary glyph filling a cell
    pub fn cell(width: i16, ascent: i16, descent: i16) -> Self {
        Self {
            lbearing: 0,
            rbearing: width,
            width,
            ascent,
            descent,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lbearing == 0 && self.rbearing == 0 && self.width == 0 && self.ascent == 0 && self.descent == 0
    }
}

/// Per-glyph information of a font
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlyphTable {
    /// No per-glyph information: every code in range is drawable
    Uniform { first: GlyphCode, last: GlyphCode },
    /// Extents for each code the font defines, sorted by code
    PerGlyph(Vec<(GlyphCode, GlyphExtents)>),
}

/// A font as loaded by the native layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedFont {
    pub id: FontId,
    /// Fully resolved font name
    pub name: String,
    pub ascent: u16,
    pub descent: u16,
    /// Widest advance; the cell width for monospace fonts
    pub max_advance: u16,
    pub glyphs: GlyphTable,
}

impl LoadedFont {
    /// Cell size this font implies: (width, height)
    pub fn cell_size(&self) -> (u16, u16) {
        (self.max_advance, self.ascent + self.descent)
    }

    /// A monospace font defining exactly the given codes
    pub fn monospace(
        id: FontId,
        name: impl Into<String>,
        cell_width: u16,
        ascent: u16,
        descent: u16,
        codes: impl IntoIterator<Item = GlyphCode>,
    ) -> Self {
        let extents = GlyphExtents::cell(cell_width as i16, ascent as i16, descent as i16);
        let mut glyphs: Vec<_> = codes.into_iter().map(|c| (c, extents)).collect();
        glyphs.sort_by_key(|(c, _)| *c);
        glyphs.dedup_by_key(|(c, _)| *c);
        Self {
            id,
            name: name.into(),
            ascent,
            descent,
            max_advance: cell_width,
            glyphs: GlyphTable::PerGlyph(glyphs),
        }
    }

    /// Describe a TrueType/OpenType font file rasterised at `px` pixels
    pub fn from_font_file(id: FontId, path: &Path, px: f32) -> Result<Self, FontError> {
        let data = std::fs::read(path).map_err(|e| FontError::Io(e.to_string()))?;
        Self::from_font_bytes(id, &path.display().to_string(), &data, px)
    }

    /// Describe font data rasterised at `px` pixels
    pub fn from_font_bytes(id: FontId, name: &str, data: &[u8], px: f32) -> Result<Self, FontError> {
        let font = fontdue::Font::from_bytes(data, fontdue::FontSettings::default())
            .map_err(|e| FontError::Parse(e.to_string()))?;

        let line = font
            .horizontal_line_metrics(px)
            .ok_or_else(|| FontError::Parse("no horizontal line metrics".to_string()))?;
        let ascent = line.ascent.ceil().max(0.0) as u16;
        let descent = (-line.descent).ceil().max(0.0) as u16;
        // 'M' is the reference advance for monospace faces
        let max_advance = font.metrics('M', px).advance_width.ceil().max(1.0) as u16;

        let mut glyphs: Vec<(GlyphCode, GlyphExtents)> = font
            .chars()
            .iter()
            .map(|(&c, &index)| {
                let m = font.metrics_indexed(index.get(), px);
                let top = m.ymin + m.height as i32;
                let extents = GlyphExtents {
                    lbearing: m.xmin as i16,
                    rbearing: (m.xmin + m.width as i32) as i16,
                    width: m.advance_width.round() as i16,
                    ascent: top as i16,
                    descent: (-m.ymin) as i16,
                };
                (c as GlyphCode, extents)
            })
            .collect();
        glyphs.sort_by_key(|(c, _)| *c);

        tracing::debug!("described font {} with {} glyphs at {}px", name, glyphs.len(), px);

        Ok(Self {
            id,
            name: name.to_string(),
            ascent,
            descent,
            max_advance,
            glyphs: GlyphTable::PerGlyph(glyphs),
        })
    }

    /// Try the usual system monospace fonts
    pub fn with_default_font(id: FontId, px: f32) -> Result<Self, FontError> {
        let font_paths = [
            "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
            "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
            "/usr/share/fonts/truetype/ubuntu/UbuntuMono-R.ttf",
            "/usr/share/fonts/truetype/freefont/FreeMono.ttf",
        ];

        for path in &font_paths {
            if let Ok(font) = Self::from_font_file(id, Path::new(path), px) {
                tracing::info!("Loaded font: {}", path);
                return Ok(font);
            }
        }

        Err(FontError::NoFontFound)
    }
}

/// Font file errors
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("Font IO error: {0}")]
    Io(String),
    #[error("Font parse error: {0}")]
    Parse(String),
    #[error("No suitable font found")]
    NoFontFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monospace_description() {
        let font = LoadedFont::monospace(FontId(1), "fixed", 6, 10, 3, ['b' as u32, 'a' as u32, 'a' as u32]);
        assert_eq!(font.cell_size(), (6, 13));
        match &font.glyphs {
            GlyphTable::PerGlyph(glyphs) => {
                let codes: Vec<_> = glyphs.iter().map(|(c, _)| *c).collect();
                assert_eq!(codes, vec!['a' as u32, 'b' as u32]);
            }
            GlyphTable::Uniform { .. } => panic!("expected per-glyph table"),
        }
    }

    #[test]
    fn test_empty_extents() {
        assert!(GlyphExtents::default().is_empty());
        assert!(!GlyphExtents::cell(6, 10, 3).is_empty());
    }

    #[test]
    fn test_system_font_description() {
        // Only meaningful where a system monospace font is installed
        if let Ok(font) = LoadedFont::with_default_font(FontId(1), 16.0) {
            let (width, height) = font.cell_size();
            assert!(width > 0);
            assert!(height > 0);
            match &font.glyphs {
                GlyphTable::PerGlyph(glyphs) => {
                    assert!(glyphs.iter().any(|(c, e)| *c == 'A' as u32 && !e.is_empty()));
                }
                GlyphTable::Uniform { .. } => panic!("expected per-glyph table"),
            }
        }
    }

    #[test]
    fn test_garbage_font_data_is_rejected() {
        let err = LoadedFont::from_font_bytes(FontId(1), "junk", b"not a font", 12.0).unwrap_err();
        assert!(matches!(err, FontError::Parse(_)));
    }
}
