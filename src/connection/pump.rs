//! Event pump
//!
//! Drains the native event queue: input goes to the client, exposures are
//! redrawn from the scene, resizes become whole-cell grid sizes, and
//! selection traffic goes to the paste exchange.

use super::{DisplayConnection, TtyMode};
use crate::core::CellPos;
use crate::error::Result;
use crate::host::{Host, MouseEvent};
use crate::native::{ButtonEvent, ButtonKind, NativeEvent, Surface};

impl<S: Surface> DisplayConnection<S> {
    /// Flush, then handle every queued native event
    ///
    /// Returns how many events were handled. When the client must go away
    /// (window destroyed, request failure, lost link) `host.exit_requested`
    /// is called once.
    pub fn pump<H: Host>(&mut self, host: &mut H) -> Result<usize> {
        let result = self.guarded(|this| {
            this.flush_all(&*host)?;
            let mut handled = 0;
            let mut configure = None;
            while let Some(event) = this.surface.next_event()? {
                handled += 1;
                match event {
                    // Back-to-back resizes collapse into the last one
                    NativeEvent::Configure { width, height } => configure = Some((width, height)),
                    event => {
                        if let Some((width, height)) = configure.take() {
                            this.configure(host, width, height)?;
                        }
                        this.dispatch(host, event)?;
                    }
                }
            }
            if let Some((width, height)) = configure {
                this.configure(host, width, height)?;
            }
            if handled > 0 {
                this.flush_all(&*host)?;
            }
            Ok(handled)
        });

        if self.is_exit_requested() && !self.exit_notified {
            self.exit_notified = true;
            tracing::info!("client on link {:?} must exit", self.guard.link());
            host.exit_requested();
        }
        result
    }

    fn dispatch<H: Host>(&mut self, host: &mut H, event: NativeEvent) -> Result<()> {
        match event {
            NativeEvent::Key(key) => {
                self.last_time = key.time;
                host.key(&key);
            }
            NativeEvent::Button(button) => self.button(host, button)?,
            NativeEvent::Expose { area, .. } => self.expose(&*host, area, None)?,
            NativeEvent::GraphicsExpose { area, count } => self.expose(&*host, area, Some(count))?,
            NativeEvent::NoExpose => {
                self.copies_outstanding = self.copies_outstanding.saturating_sub(1);
            }
            NativeEvent::Focus { focused } => self.set_focus(focused)?,
            NativeEvent::Configure { width, height } => self.configure(host, width, height)?,
            NativeEvent::Map { mapped } => self.mapped = mapped,
            NativeEvent::MappingChange => tracing::debug!("keyboard mapping changed"),
            NativeEvent::SelectionClear { time } => {
                self.last_time = time;
                tracing::debug!("lost selection ownership");
            }
            NativeEvent::SelectionRequest(request) => self.serve_selection(&*host, &request)?,
            NativeEvent::SelectionNotify(notify) => self.receive_paste(host, &notify)?,
            NativeEvent::Destroy => {
                tracing::info!("window destroyed");
                self.mapped = false;
                self.has_window = false;
                self.guard.state().request_exit();
            }
        }
        Ok(())
    }

    fn button<H: Host>(&mut self, host: &mut H, event: ButtonEvent) -> Result<()> {
        self.last_time = event.time;
        let metrics = self.metrics()?;
        let col = (event.x.max(0) as u32 / metrics.width).min(self.cols.saturating_sub(1));
        let row = (event.y.max(0) as u32 / metrics.height).min(self.rows.saturating_sub(1));
        let pos = CellPos::new(col, row);

        if event.kind == ButtonKind::Motion {
            let tracking = self.mode.intersects(TtyMode::MOUSE_BUTTON | TtyMode::MOUSE_ANY)
                || (!self.prefix.is_empty() && event.modifiers.contains(self.prefix));
            // Motion within one cell is not news
            if !tracking || self.last_motion == Some(pos) {
                return Ok(());
            }
        }
        self.last_motion = Some(pos);
        host.mouse(MouseEvent {
            kind: event.kind,
            button: event.button,
            col,
            row,
            modifiers: event.modifiers,
        });
        Ok(())
    }

    /// The window changed size; the grid follows in whole cells and the
    /// cursor goes home
    fn configure<H: Host>(&mut self, host: &mut H, width: u32, height: u32) -> Result<()> {
        let metrics = self.metrics()?;
        let (cols, rows) = metrics.grid_size(width, height);
        let (cols, rows) = (cols.max(1), rows.max(1));
        if (cols, rows) == (self.cols, self.rows) {
            return Ok(());
        }
        tracing::debug!("resized to {}x{} cells", cols, rows);
        self.erase_cursor()?;
        self.cols = cols;
        self.rows = rows;
        self.cursor_pos = CellPos::default();
        self.last_motion = None;
        self.mark_dirty();
        host.resized(cols, rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::DisplayConfig;
    use crate::core::{CellStyle, Grid, GridView};
    use crate::guard::ConnectionRegistry;
    use crate::host::{ClientSink, ClipboardStore, Layer, PaneId, PaneRegistry, Scene};
    use crate::native::{KeyEvent, LinkId, Modifiers, NativeOp, PixelRect, RecordingSurface, Timestamp};
    use crate::render::CursorState;

    #[derive(Default)]
    struct TestHost {
        grid: Option<Grid>,
        keys: Vec<KeyEvent>,
        mice: Vec<MouseEvent>,
        sizes: Vec<(u32, u32)>,
        exits: usize,
    }

    impl Scene for TestHost {
        fn layers(&self) -> Vec<Layer<'_>> {
            self.grid
                .iter()
                .map(|g| Layer::new(CellPos::default(), g as &dyn GridView))
                .collect()
        }
    }

    impl PaneRegistry for TestHost {
        fn is_live_pane(&self, _pane: PaneId) -> bool {
            true
        }

        fn active_pane(&self) -> Option<PaneId> {
            None
        }

        fn send_to_pane(&mut self, _pane: PaneId, _data: &[u8]) {}
    }

    impl ClipboardStore for TestHost {
        fn top_buffer(&self) -> Option<&[u8]> {
            None
        }
    }

    impl ClientSink for TestHost {
        fn key(&mut self, key: &KeyEvent) {
            self.keys.push(key.clone());
        }

        fn mouse(&mut self, event: MouseEvent) {
            self.mice.push(event);
        }

        fn resized(&mut self, cols: u32, rows: u32) {
            self.sizes.push((cols, rows));
        }

        fn exit_requested(&mut self) {
            self.exits += 1;
        }
    }

    fn open() -> (ConnectionRegistry, DisplayConnection<RecordingSurface>) {
        let registry = ConnectionRegistry::new();
        let conn = DisplayConnection::open(RecordingSurface::with_fixed_font(LinkId(1)), DisplayConfig::default(), &registry)
            .unwrap();
        (registry, conn)
    }

    fn motion(x: i32, y: i32, modifiers: Modifiers) -> NativeEvent {
        NativeEvent::Button(ButtonEvent {
            time: Timestamp(7),
            kind: ButtonKind::Motion,
            button: 0,
            x,
            y,
            modifiers,
        })
    }

    #[test]
    fn test_keys_reach_client_and_set_time() {
        let (_r, mut conn) = open();
        let mut host = TestHost::default();
        conn.surface_mut().push_event(NativeEvent::Key(KeyEvent {
            time: Timestamp(42),
            keysym: 0x61,
            modifiers: Modifiers::empty(),
            text: "a".to_string(),
        }));
        conn.pump(&mut host).unwrap();
        assert_eq!(host.keys.len(), 1);
        assert_eq!(conn.last_time(), Timestamp(42));
        assert!(conn.is_mapped());
    }

    #[test]
    fn test_configure_coalesces_and_homes_cursor() {
        let (_r, mut conn) = open();
        let mut host = TestHost::default();
        conn.move_cursor(CellPos::new(3, 3)).unwrap();
        conn.surface_mut().resize(600, 400);
        conn.surface_mut().resize(606, 404);
        conn.pump(&mut host).unwrap();
        assert_eq!(host.sizes, vec![(101, 31)]);
        assert_eq!(conn.size(), (101, 31));
        assert_eq!(conn.cursor().state(), CursorState::Shown(CellPos::new(0, 0)));
    }

    #[test]
    fn test_configure_applies_before_later_events() {
        let (_r, mut conn) = open();
        let mut host = TestHost::default();
        conn.surface_mut().resize(606, 404);
        conn.surface_mut().push_event(NativeEvent::Button(ButtonEvent {
            time: Timestamp(9),
            kind: ButtonKind::Press,
            button: 1,
            x: 600,
            y: 390,
            modifiers: Modifiers::empty(),
        }));
        conn.surface_mut().resize(480, 312);
        conn.pump(&mut host).unwrap();

        assert_eq!(host.sizes, vec![(101, 31), (80, 24)]);
        assert_eq!(host.mice.len(), 1);
        assert_eq!((host.mice[0].col, host.mice[0].row), (100, 30));
        assert_eq!(conn.size(), (80, 24));
    }

    #[test]
    fn test_same_size_configure_is_ignored() {
        let (_r, mut conn) = open();
        let mut host = TestHost::default();
        conn.surface_mut().resize(485, 315);
        conn.pump(&mut host).unwrap();
        assert!(host.sizes.is_empty());
    }

    #[test]
    fn test_motion_needs_tracking_and_cell_change() {
        let (_r, mut conn) = open();
        let mut host = TestHost::default();
        conn.surface_mut().push_event(motion(10, 10, Modifiers::empty()));
        conn.pump(&mut host).unwrap();
        assert!(host.mice.is_empty());

        conn.set_mode(TtyMode::CURSOR | TtyMode::MOUSE_BUTTON).unwrap();
        conn.surface_mut().push_event(motion(10, 10, Modifiers::empty()));
        conn.surface_mut().push_event(motion(11, 12, Modifiers::empty()));
        conn.surface_mut().push_event(motion(20, 12, Modifiers::empty()));
        conn.pump(&mut host).unwrap();
        let cells: Vec<_> = host.mice.iter().map(|m| (m.col, m.row)).collect();
        assert_eq!(cells, vec![(1, 0), (3, 0)]);
    }

    #[test]
    fn test_prefix_enables_motion() {
        let registry = ConnectionRegistry::new();
        let mut config = DisplayConfig::default();
        config.prefix = "mod4".to_string();
        let mut conn = DisplayConnection::open(RecordingSurface::with_fixed_font(LinkId(1)), config, &registry).unwrap();
        let mut host = TestHost::default();
        conn.surface_mut().push_event(motion(30, 30, Modifiers::MOD4 | Modifiers::BUTTON1));
        conn.pump(&mut host).unwrap();
        assert_eq!(host.mice.len(), 1);
    }

    #[test]
    fn test_expose_redraws_scene() {
        let (_r, mut conn) = open();
        let mut grid = Grid::new(80, 24);
        grid.write_str(0, 2, "exposed", CellStyle::default());
        let mut host = TestHost {
            grid: Some(grid),
            ..Default::default()
        };
        conn.pump(&mut host).unwrap();
        conn.surface_mut().take_ops();
        conn.surface_mut().push_event(NativeEvent::Expose {
            area: PixelRect::new(0, 26, 42, 13),
            count: 0,
        });
        conn.pump(&mut host).unwrap();
        let texts: Vec<String> = conn.surface().ops().iter().filter_map(NativeOp::text).collect();
        assert_eq!(texts, vec!["exposed"]);
    }

    #[test]
    fn test_focus_change_reshapes_cursor() {
        let (_r, mut conn) = open();
        let mut host = TestHost::default();
        conn.pump(&mut host).unwrap();
        conn.surface_mut().take_ops();
        conn.surface_mut().push_event(NativeEvent::Focus { focused: false });
        conn.pump(&mut host).unwrap();
        assert!(!conn.is_focused());
        // Block erased, outline drawn
        let xors: Vec<usize> = conn
            .surface()
            .ops()
            .iter()
            .filter_map(|op| match op {
                NativeOp::XorRects { rects, .. } => Some(rects.len()),
                _ => None,
            })
            .collect();
        assert_eq!(xors, vec![1, 4]);
    }

    #[test]
    fn test_destroy_requests_exit_once() {
        let (_r, mut conn) = open();
        let mut host = TestHost::default();
        conn.surface_mut().push_event(NativeEvent::Destroy);
        conn.pump(&mut host).unwrap();
        conn.pump(&mut host).unwrap();
        assert_eq!(host.exits, 1);
        assert!(conn.is_exit_requested());
    }
}
