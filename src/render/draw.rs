//! Run painting
//!
//! Draws one run of same-style glyphs: resolves colours and the font
//! variant, substitutes line-drawing glyphs, splits the run where glyph
//! fallback changes font and adds underline/blink decoration.

use std::borrow::Cow;

use super::{ColorTable, FontKind, FontSet, ResolvedColours};
use crate::core::{Attrs, CellPos, CellStyle, GlyphCode, Rect, SPACE};
use crate::native::{NativeResult, Pixel, Surface, TextRun};

/// Draw `glyphs` starting at `origin`
///
/// `cleared` says the cells already show the default background, so text
/// in default colours can skip painting its background.
pub fn paint_run<S: Surface>(
    surface: &mut S,
    colors: &ColorTable,
    fonts: &FontSet,
    origin: CellPos,
    glyphs: &[GlyphCode],
    style: &CellStyle,
    cleared: bool,
) -> NativeResult<()> {
    let Some(metrics) = fonts.metrics() else {
        return Ok(());
    };
    if glyphs.is_empty() {
        return Ok(());
    }

    let area = metrics.rect(&Rect::span(origin.col, origin.row, glyphs.len() as u32));
    let attrs = style.attrs;
    let kind = fonts.variant_for(attrs.contains(Attrs::BOLD), attrs.contains(Attrs::ITALICS));
    let ResolvedColours { mut fg, mut bg } = colors.resolve(style, kind.is_bold());
    let default_bg = colors.default_bg();

    if attrs.contains(Attrs::HIDDEN) || glyphs.iter().all(|&g| g == SPACE) {
        if bg != default_bg {
            surface.fill_rect(area, bg)?;
        } else if !cleared {
            surface.clear_area(area)?;
        }
    } else {
        // Without an italic face, italics show as inverse
        if attrs.contains(Attrs::ITALICS) && !kind.is_italic() {
            std::mem::swap(&mut fg, &mut bg);
        }
        let background = if cleared && bg == default_bg { None } else { Some(bg) };

        let codes: Cow<'_, [GlyphCode]> = if attrs.contains(Attrs::CHARSET) {
            Cow::Owned(glyphs.iter().map(|&g| fonts.substitute(kind, g)).collect())
        } else {
            Cow::Borrowed(glyphs)
        };

        let mut current = kind;
        let mut start = 0;
        for (i, &code) in codes.iter().enumerate() {
            // Glyphs nobody covers stay with the current font
            let Some(picked) = fonts.pick(kind, code) else {
                continue;
            };
            if picked != current {
                if i > start {
                    draw_segment(surface, fonts, origin, start, &codes[start..i], current, fg, background)?;
                    start = i;
                }
                current = picked;
            }
        }
        draw_segment(surface, fonts, origin, start, &codes[start..], current, fg, background)?;
    }

    let decoration = attrs & (Attrs::UNDERLINE | Attrs::BLINK);
    let right = area.x + area.width as i32 - 1;
    if decoration == Attrs::UNDERLINE || decoration == Attrs::BLINK {
        if let Some(variant) = fonts.variant(kind) {
            let mut y = area.y + variant.ascent as i32;
            if variant.descent > 1 {
                y += 1;
            }
            surface.draw_line((area.x, y), (right, y), fg)?;
        }
    }
    if attrs.contains(Attrs::BLINK) {
        surface.draw_line((area.x, area.y), (right, area.y), fg)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn draw_segment<S: Surface>(
    surface: &mut S,
    fonts: &FontSet,
    origin: CellPos,
    offset: usize,
    codes: &[GlyphCode],
    kind: FontKind,
    fg: Pixel,
    bg: Option<Pixel>,
) -> NativeResult<()> {
    let (Some(metrics), Some(variant)) = (fonts.metrics(), fonts.variant(kind)) else {
        return Ok(());
    };
    if codes.is_empty() {
        return Ok(());
    }
    surface.draw_text(&TextRun {
        x: metrics.x(origin.col + offset as u32),
        y: metrics.y(origin.row) + variant.ascent as i32,
        font: variant.font,
        glyphs: codes,
        fg,
        bg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Colour;
    use crate::native::{FontId, LinkId, LoadedFont, NativeOp, PixelRect, RecordingSurface};

    struct Rig {
        surface: RecordingSurface,
        colors: ColorTable,
        fonts: FontSet,
    }

    fn rig(with_bold: bool) -> Rig {
        let mut surface = RecordingSurface::new(LinkId(1));
        surface.add_font(LoadedFont::monospace(FontId(0), "base", 6, 10, 3, 0x21..0x7f));
        surface.add_font(LoadedFont::monospace(FontId(0), "bold", 6, 10, 3, 0x41..0x5b));
        surface.add_font(LoadedFont::monospace(FontId(0), "lines", 6, 10, 3, [0x2500, 0x2502]));
        let mut fonts = FontSet::new();
        fonts.load_variant(&mut surface, FontKind::Base, "base").unwrap();
        if with_bold {
            fonts.load_variant(&mut surface, FontKind::Bold, "bold").unwrap();
        }
        let colors = ColorTable::build(&mut surface, "", "", "").unwrap();
        surface.take_ops();
        Rig { surface, colors, fonts }
    }

    impl Rig {
        fn paint(&mut self, text: &str, style: CellStyle, cleared: bool) -> Vec<NativeOp> {
            let glyphs: Vec<GlyphCode> = text.chars().map(|c| c as GlyphCode).collect();
            paint_run(&mut self.surface, &self.colors, &self.fonts, CellPos::new(2, 1), &glyphs, &style, cleared)
                .unwrap();
            self.surface.take_ops()
        }
    }

    #[test]
    fn test_plain_text_on_cleared_cells() {
        let mut rig = rig(false);
        let ops = rig.paint("abc", CellStyle::default(), true);
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            NativeOp::DrawText { x, y, bg, fg, .. } => {
                assert_eq!((*x, *y), (12, 23));
                assert_eq!(*bg, None);
                assert_eq!(*fg, rig.colors.default_fg());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(ops[0].text().as_deref(), Some("abc"));
    }

    #[test]
    fn test_uncleared_text_paints_background() {
        let mut rig = rig(false);
        let ops = rig.paint("abc", CellStyle::default(), false);
        assert!(matches!(&ops[0], NativeOp::DrawText { bg: Some(_), .. }));
    }

    #[test]
    fn test_blank_run_clears_or_fills() {
        let mut rig = rig(false);
        assert!(rig.paint("   ", CellStyle::default(), true).is_empty());
        assert_eq!(
            rig.paint("   ", CellStyle::default(), false),
            vec![NativeOp::ClearArea {
                area: PixelRect::new(12, 13, 18, 13)
            }]
        );
        let red_bg = CellStyle::new(Colour::DEFAULT, Colour::RED, Attrs::empty());
        let ops = rig.paint("   ", red_bg, true);
        assert!(matches!(&ops[0], NativeOp::FillRect { color, .. } if *color == rig.colors.pixel(1)));
    }

    #[test]
    fn test_hidden_text_is_not_drawn() {
        let mut rig = rig(false);
        let ops = rig.paint("secret", CellStyle::with_attrs(Attrs::HIDDEN), false);
        assert!(matches!(ops.as_slice(), [NativeOp::ClearArea { .. }]));
    }

    #[test]
    fn test_fallback_splits_run() {
        let mut rig = rig(true);
        // Bold covers capitals only; lower case falls back to base
        let ops = rig.paint("ABcD", CellStyle::with_attrs(Attrs::BOLD), true);
        let texts: Vec<String> = ops.iter().filter_map(|op| op.text()).collect();
        assert_eq!(texts, vec!["AB", "c", "D"]);
    }

    #[test]
    fn test_spaces_do_not_split_run() {
        let mut rig = rig(true);
        let ops = rig.paint("A B", CellStyle::with_attrs(Attrs::BOLD), true);
        assert_eq!(ops.iter().filter_map(|op| op.text()).collect::<Vec<_>>(), vec!["A B"]);
    }

    #[test]
    fn test_charset_substitution() {
        let mut rig = rig(false);
        rig.fonts.load_variant(&mut rig.surface, FontKind::Bold, "lines").unwrap();
        rig.surface.take_ops();
        let ops = rig.paint("qx", CellStyle::with_attrs(Attrs::CHARSET), true);
        match &ops[0] {
            NativeOp::DrawText { glyphs, .. } => assert_eq!(glyphs, &vec![0x2500, 0x2502]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_italic_without_face_swaps_colours() {
        let mut rig = rig(false);
        let ops = rig.paint("a", CellStyle::with_attrs(Attrs::ITALICS), true);
        match &ops[0] {
            NativeOp::DrawText { fg, bg, .. } => {
                assert_eq!(*fg, rig.colors.default_bg());
                assert_eq!(*bg, Some(rig.colors.default_fg()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_underline_and_blink() {
        let mut rig = rig(false);
        let ops = rig.paint("ab", CellStyle::with_attrs(Attrs::UNDERLINE), true);
        assert_eq!(
            ops.last(),
            Some(&NativeOp::DrawLine {
                from: (12, 24),
                to: (23, 24),
                color: rig.colors.default_fg()
            })
        );

        let ops = rig.paint("ab", CellStyle::with_attrs(Attrs::BLINK), true);
        let lines = ops.iter().filter(|op| matches!(op, NativeOp::DrawLine { .. })).count();
        assert_eq!(lines, 2);

        // Both together cancel the underline
        let ops = rig.paint("ab", CellStyle::with_attrs(Attrs::BLINK | Attrs::UNDERLINE), true);
        let lines = ops.iter().filter(|op| matches!(op, NativeOp::DrawLine { .. })).count();
        assert_eq!(lines, 1);
    }
}
