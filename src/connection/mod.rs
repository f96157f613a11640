//! Display Connection
//!
//! One client's window on a native link, and every entry point the
//! multiplexer drives it through. A connection owns its colours, fonts,
//! pending character run, pending scroll, cursor overlay and paste
//! exchange.
//!
//! Every entry point runs inside the connection's guard. A fatal native
//! error marks every connection on the link dead; a dead connection drops
//! its pending state and answers every later call with
//! `DisplayError::ConnectionDead` until it is closed.

mod draw;
mod pump;
mod select;

use std::time::{Duration, Instant};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::app::DisplayConfig;
use crate::core::CellPos;
use crate::error::{DisplayError, Result};
use crate::guard::{ConnectionRegistry, Guard};
use crate::native::{Modifiers, NativeResult, Pixel, PixelRect, Surface, Timestamp, WindowSetup};
use crate::paste::PasteExchange;
use crate::render::{
    xlfd_with_field, CellMetrics, ColorTable, CursorShadow, CursorStyle, FontKind, FontSet, PutcBuffer,
    ScrollBuffer,
};

bitflags! {
    /// Terminal modes the engine honours
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct TtyMode: u8 {
        /// Cursor visible
        const CURSOR       = 0x01;
        /// Report motion while a button is held
        const MOUSE_BUTTON = 0x02;
        /// Report all motion
        const MOUSE_ANY    = 0x04;
    }
}

impl Default for TtyMode {
    fn default() -> Self {
        TtyMode::CURSOR
    }
}

/// A client's display connection
pub struct DisplayConnection<S: Surface> {
    surface: S,
    guard: Guard,
    config: DisplayConfig,
    colors: ColorTable,
    fonts: FontSet,
    putc: PutcBuffer,
    scroll: ScrollBuffer,
    cursor: CursorShadow,
    /// Where the terminal wants the cursor
    cursor_pos: CellPos,
    mode: TtyMode,
    cursor_style: CursorStyle,
    /// XOR value of the cursor overlay
    cursor_xor: Pixel,
    focused: bool,
    mapped: bool,
    prefix: Modifiers,
    paste: PasteExchange,
    /// Area copies issued but not yet acknowledged
    copies_outstanding: usize,
    /// Timestamp of the latest input event
    last_time: Timestamp,
    cols: u32,
    rows: u32,
    last_motion: Option<CellPos>,
    /// When buffered drawing first went unflushed
    dirty_since: Option<Instant>,
    exit_notified: bool,
    has_window: bool,
    closed: bool,
}

impl<S: Surface> std::fmt::Debug for DisplayConnection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayConnection")
            .field("link", &self.guard.link())
            .field("cols", &self.cols)
            .field("rows", &self.rows)
            .field("mode", &self.mode)
            .field("copies_outstanding", &self.copies_outstanding)
            .field("closed", &self.closed)
            .finish()
    }
}

impl<S: Surface> DisplayConnection<S> {
    /// Open a connection: load fonts and colours, create and map the window
    ///
    /// Fails with `DisplayError::NoFont` when neither the configured base
    /// font nor `fixed` loads.
    pub fn open(surface: S, config: DisplayConfig, registry: &ConnectionRegistry) -> Result<Self> {
        let guard = registry.register(surface.link());
        let cols = config.window.columns.max(1);
        let rows = config.window.rows.max(1);
        let mut conn = Self {
            surface,
            guard,
            colors: ColorTable::default(),
            fonts: FontSet::new(),
            putc: PutcBuffer::new(),
            scroll: ScrollBuffer::new(),
            cursor: CursorShadow::new(),
            cursor_pos: CellPos::default(),
            mode: TtyMode::default(),
            cursor_style: config.colors.cursor_style,
            cursor_xor: Pixel(0),
            focused: true,
            mapped: false,
            prefix: config.prefix_modifiers(),
            paste: PasteExchange::new(),
            copies_outstanding: 0,
            last_time: Timestamp::default(),
            cols,
            rows,
            last_motion: None,
            dirty_since: None,
            exit_notified: false,
            has_window: false,
            closed: false,
            config: config.clone(),
        };

        conn.guarded(|this| {
            this.apply_config(&config)?;
            let metrics = this.metrics()?;
            let (width, height) = metrics.window_size(this.cols, this.rows);
            let setup = this.window_setup(width, height);
            this.surface.create_window(&setup)?;
            this.has_window = true;
            this.surface.map_window()?;
            tracing::info!("opened {}x{} window on link {:?}", this.cols, this.rows, this.guard.link());
            Ok(())
        })?;
        Ok(conn)
    }

    /// Re-apply a configuration to the open connection
    ///
    /// Reloads fonts, rebuilds the colour table and updates the window
    /// hints. When the cell size changed the window is cleared and the grid
    /// resized to it; returns whether that happened, in which case the
    /// caller must redraw.
    pub fn setup(&mut self, config: DisplayConfig) -> Result<bool> {
        self.guarded(|this| {
            let before = this.fonts.metrics();
            this.apply_config(&config)?;
            this.config = config;
            let metrics = this.metrics()?;
            let (width, height) = this.surface.window_size()?;
            let setup = this.window_setup(width, height);
            this.surface.configure_window(&setup)?;
            if before == Some(metrics) {
                return Ok(false);
            }
            let (cols, rows) = metrics.grid_size(width, height);
            this.cols = cols.max(1);
            this.rows = rows.max(1);
            this.putc.clear();
            this.scroll.clear();
            this.cursor.forget();
            this.surface.clear_area(PixelRect::new(0, 0, width, height))?;
            tracing::debug!("cell size now {:?}, grid {}x{}", metrics, this.cols, this.rows);
            Ok(true)
        })
    }

    fn apply_config(&mut self, config: &DisplayConfig) -> Result<()> {
        // The overlay is drawn with the old shape, cell size and colour
        self.erase_cursor()?;
        self.load_fonts(config)?;

        self.colors.rebuild(
            &mut self.surface,
            &config.colors.palette,
            &config.colors.foreground,
            &config.colors.background,
        )?;
        self.cursor_xor = self.colors.cursor_xor(&mut self.surface, &config.colors.cursor)?;
        self.cursor_style = config.colors.cursor_style;
        self.surface.set_background(self.colors.default_bg())?;
        self.prefix = config.prefix_modifiers();
        Ok(())
    }

    fn load_fonts(&mut self, config: &DisplayConfig) -> Result<()> {
        let fonts = &config.fonts;
        if let Err(e) = self.fonts.load_variant(&mut self.surface, FontKind::Base, &fonts.base) {
            if e.is_fatal() {
                return Err(e);
            }
            if self.fonts.metrics().is_none() {
                match self.fonts.load_variant(&mut self.surface, FontKind::Base, "fixed") {
                    Ok(_) => {}
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(_) => return Err(DisplayError::NoFont),
                }
            }
        }
        let base = self.fonts.variant(FontKind::Base).map(|v| v.name.clone()).unwrap_or_default();

        let bold = pick_name(&fonts.bold, || xlfd_with_field(&base, 3, "bold"));
        self.try_variant(FontKind::Bold, bold.as_deref())?;

        if fonts.italic.is_empty() {
            let oblique = xlfd_with_field(&base, 4, "o");
            if !self.try_variant(FontKind::Italic, oblique.as_deref())? {
                let italic = xlfd_with_field(&base, 4, "i");
                self.try_variant(FontKind::Italic, italic.as_deref())?;
            }
        } else {
            self.try_variant(FontKind::Italic, Some(&fonts.italic))?;
        }

        let italic = self.fonts.variant(FontKind::Italic).map(|v| v.name.clone());
        let bold_italic = pick_name(&fonts.bold_italic, || italic.and_then(|name| xlfd_with_field(&name, 3, "bold")));
        self.try_variant(FontKind::BoldItalic, bold_italic.as_deref())?;
        Ok(())
    }

    /// Load an optional variant; load failures are logged and leave the
    /// previous variant in place
    fn try_variant(&mut self, kind: FontKind, name: Option<&str>) -> Result<bool> {
        let Some(name) = name else {
            return Ok(false);
        };
        match self.fonts.load_variant(&mut self.surface, kind, name) {
            Ok(_) => Ok(true),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::debug!("no {:?} variant from {}: {}", kind, name, e);
                Ok(false)
            }
        }
    }

    fn window_setup(&self, width: u32, height: u32) -> WindowSetup {
        let metrics = self.fonts.metrics().unwrap_or(CellMetrics::new(1, 1));
        WindowSetup {
            width,
            height,
            background: self.colors.default_bg(),
            cell_width: metrics.width,
            cell_height: metrics.height,
            name: self.config.window.name.clone(),
            class: self.config.window.class.clone(),
        }
    }

    fn metrics(&self) -> Result<CellMetrics> {
        self.fonts.metrics().ok_or(DisplayError::NoFont)
    }

    /// Release every native resource and destroy the window
    ///
    /// Safe to call more than once. On a dead link resources are dropped
    /// without touching the link.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.putc.clear();
        self.scroll.clear();
        self.cursor.reset();
        self.paste.cancel();
        if self.guard.state().is_fatal() {
            self.fonts.abandon();
            tracing::debug!("closed dead connection on link {:?}", self.guard.link());
            return;
        }
        if let Err(e) = self.release_resources() {
            tracing::warn!("error closing display connection: {}", e);
            self.fonts.abandon();
            if e.is_fatal() {
                self.guard.report_fatal();
            }
        }
    }

    fn release_resources(&mut self) -> NativeResult<()> {
        self.colors.release(&mut self.surface)?;
        self.fonts.release(&mut self.surface)?;
        if self.has_window {
            self.has_window = false;
            self.surface.destroy_window()?;
        }
        self.surface.flush()
    }

    /// Run an entry point under the guard
    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.closed {
            return Err(DisplayError::ConnectionDead);
        }
        let _token = self.guard.enter()?;
        match f(self) {
            Ok(value) => Ok(value),
            Err(e) if e.is_fatal() => {
                if !self.guard.state().is_fatal() {
                    tracing::error!("display connection lost: {}", e);
                    self.guard.report_fatal();
                }
                self.drop_pending();
                Err(DisplayError::ConnectionDead)
            }
            Err(DisplayError::Native(e)) => {
                tracing::warn!("display request failed: {}", e);
                self.guard.report_error();
                Err(DisplayError::Native(e))
            }
            Err(e) => Err(e),
        }
    }

    /// Forget state that can no longer reach the display
    fn drop_pending(&mut self) {
        self.putc.clear();
        self.scroll.clear();
        self.cursor.reset();
        self.paste.cancel();
        self.copies_outstanding = 0;
        self.dirty_since = None;
    }

    fn mark_dirty(&mut self) {
        if self.dirty_since.is_none() {
            self.dirty_since = Some(Instant::now());
        }
    }

    /// Time until buffered drawing should be flushed; `None` when nothing
    /// is buffered
    pub fn next_flush_in(&self) -> Option<Duration> {
        let since = self.dirty_since?;
        let delay = Duration::from_millis(self.config.flush_delay_ms);
        Some(delay.saturating_sub(since.elapsed()))
    }

    // --- accessors ---

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn colors(&self) -> &ColorTable {
        &self.colors
    }

    pub fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    pub fn cursor(&self) -> &CursorShadow {
        &self.cursor
    }

    pub fn paste(&self) -> &PasteExchange {
        &self.paste
    }

    pub fn pending_scroll(&self) -> &ScrollBuffer {
        &self.scroll
    }

    pub fn pending_run(&self) -> &PutcBuffer {
        &self.putc
    }

    /// Grid size in cells: (columns, rows)
    pub fn size(&self) -> (u32, u32) {
        (self.cols, self.rows)
    }

    pub fn mode(&self) -> TtyMode {
        self.mode
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    pub fn copies_outstanding(&self) -> usize {
        self.copies_outstanding
    }

    pub fn last_time(&self) -> Timestamp {
        self.last_time
    }

    /// Whether the connection hit a fatal error
    pub fn is_dead(&self) -> bool {
        self.guard.state().is_fatal()
    }

    /// Whether the client should exit
    pub fn is_exit_requested(&self) -> bool {
        self.guard.state().is_exit_requested()
    }
}

impl<S: Surface> Drop for DisplayConnection<S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// The configured name, or a derived one when unset
fn pick_name(configured: &str, derive: impl FnOnce() -> Option<String>) -> Option<String> {
    if configured.is_empty() {
        derive()
    } else {
        Some(configured.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{FontId, LinkId, LoadedFont, NativeOp, RecordingSurface};

    const BASE: &str = "-misc-fixed-medium-r-normal--13-120-75-75-c-70-iso10646-1";
    const BOLD: &str = "-misc-fixed-bold-r-normal--13-120-75-75-c-70-iso10646-1";
    const OBLIQUE: &str = "-misc-fixed-medium-o-normal--13-120-75-75-c-70-iso10646-1";
    const BOLD_OBLIQUE: &str = "-misc-fixed-bold-o-normal--13-120-75-75-c-70-iso10646-1";

    fn xlfd_surface() -> RecordingSurface {
        let mut surface = RecordingSurface::new(LinkId(1));
        for name in [BASE, BOLD, OBLIQUE, BOLD_OBLIQUE] {
            surface.add_font(LoadedFont::monospace(FontId(0), name, 6, 10, 3, 0x20..0x7f));
        }
        surface
    }

    fn config(base: &str) -> DisplayConfig {
        let mut config = DisplayConfig::default();
        config.fonts.base = base.to_string();
        config
    }

    #[test]
    fn test_open_creates_and_maps_window() {
        let registry = ConnectionRegistry::new();
        let conn = DisplayConnection::open(RecordingSurface::with_fixed_font(LinkId(1)), DisplayConfig::default(), &registry)
            .unwrap();
        assert_eq!(conn.size(), (80, 24));
        assert_eq!(conn.fonts().metrics(), Some(CellMetrics::new(6, 13)));
        assert!(conn.surface().is_mapped());
        assert!(conn
            .surface()
            .ops()
            .contains(&NativeOp::CreateWindow { width: 480, height: 312 }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_variants_derive_from_xlfd_name() {
        let registry = ConnectionRegistry::new();
        let conn = DisplayConnection::open(xlfd_surface(), config(BASE), &registry).unwrap();
        let name = |kind| conn.fonts().variant(kind).map(|v| v.name.clone());
        assert_eq!(name(FontKind::Bold).as_deref(), Some(BOLD));
        assert_eq!(name(FontKind::Italic).as_deref(), Some(OBLIQUE));
        assert_eq!(name(FontKind::BoldItalic).as_deref(), Some(BOLD_OBLIQUE));
    }

    #[test]
    fn test_base_falls_back_to_fixed() {
        let registry = ConnectionRegistry::new();
        let conn = DisplayConnection::open(RecordingSurface::with_fixed_font(LinkId(1)), config("missing"), &registry)
            .unwrap();
        assert_eq!(conn.fonts().variant(FontKind::Base).map(|v| v.name.as_str()), Some("fixed"));
    }

    #[test]
    fn test_open_without_any_font_fails() {
        let registry = ConnectionRegistry::new();
        let result = DisplayConnection::open(RecordingSurface::new(LinkId(1)), config("missing"), &registry);
        assert!(matches!(result, Err(DisplayError::NoFont)));
    }

    #[test]
    fn test_close_is_idempotent_and_releases() {
        let registry = ConnectionRegistry::new();
        let mut conn = DisplayConnection::open(xlfd_surface(), config(BASE), &registry).unwrap();
        conn.close();
        conn.close();
        assert!(conn.surface().live_fonts().is_empty());
        assert_eq!(conn.surface().count_ops(|op| matches!(op, NativeOp::DestroyWindow)), 1);
        assert!(matches!(conn.bell(), Err(DisplayError::ConnectionDead)));
    }

    #[test]
    fn test_setup_rebuilds_colours() {
        let registry = ConnectionRegistry::new();
        let mut conn = DisplayConnection::open(RecordingSurface::with_fixed_font(LinkId(1)), DisplayConfig::default(), &registry)
            .unwrap();
        let mut config = DisplayConfig::default();
        config.colors.background = "blue".to_string();
        assert!(!conn.setup(config).unwrap());
        assert_eq!(conn.colors().default_bg(), Pixel(0x0000ff));
        assert_eq!(conn.config().colors.background, "blue");
        assert!(conn.surface().ops().contains(&NativeOp::SetBackground { pixel: Pixel(0x0000ff) }));
    }
}
