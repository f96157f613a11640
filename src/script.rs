//! Headless Replay
//!
//! Runs a JSON script of engine commands against a `RecordingSurface` and
//! reports every native operation the engine issued. The script also keeps
//! a grid of what the terminal shows, so exposures and failed copies are
//! redrawn from real content.
//!
//! ```json
//! {
//!   "columns": 20, "rows": 5,
//!   "commands": [
//!     { "cmd": "put_str", "col": 0, "row": 0, "text": "hello" },
//!     { "cmd": "scroll", "top": 0, "bottom": 4, "lines": 1 },
//!     { "cmd": "flush" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::app::DisplayConfig;
use crate::connection::{DisplayConnection, TtyMode};
use crate::core::{CellPos, CellStyle, GlyphCode, Grid, Rect};
use crate::error::DisplayError;
use crate::guard::ConnectionRegistry;
use crate::host::{ClientSink, ClipboardStore, Layer, MouseEvent, PaneId, PaneRegistry, Scene};
use crate::native::{
    AckMode, ButtonEvent, ButtonKind, KeyEvent, LinkId, Modifiers, NativeEvent, NativeOp, PixelRect,
    RecordingSurface, Selection, Timestamp,
};
use crate::render::CursorStyle;

/// The pane pastes go to
const SCRIPT_PANE: PaneId = PaneId(0);

/// A replay script
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    pub config: DisplayConfig,
    /// Grid size; overrides the configured window size when set
    pub columns: Option<u32>,
    pub rows: Option<u32>,
    pub commands: Vec<Command>,
}

impl Script {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// One scripted step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Write text into the grid and through the engine
    PutStr {
        col: u32,
        row: u32,
        text: String,
        #[serde(default)]
        style: CellStyle,
    },
    /// Scroll full-width rows `top..=bottom`; positive moves content up
    Scroll { top: u32, bottom: u32, lines: i32 },
    Clear { area: Rect },
    InsertChars { col: u32, row: u32, count: u32 },
    DeleteChars { col: u32, row: u32, count: u32 },
    MoveCursor { col: u32, row: u32 },
    SetMode { mode: TtyMode },
    CursorStyle { style: CursorStyle },
    CursorColour { name: String },
    Title { title: String },
    Bell,
    Flush,
    /// Queue an exposure and pump
    Expose { area: PixelRect },
    /// Resize the window and pump
    Resize { width: u32, height: u32 },
    Focus { focused: bool },
    /// Queue a key press and pump
    Key { text: String },
    /// Queue a pointer event at a pixel position and pump
    Pointer {
        kind: ButtonKind,
        #[serde(default)]
        button: u8,
        x: i32,
        y: i32,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Choose how copies are acknowledged from now on
    Acks { mode: AckMode },
    /// Make the multiplexer clipboard hold `text` and take the selection
    SetSelection { text: String },
    /// Give a selection to another client
    ForeignSelection { selection: Selection, text: Option<String> },
    Paste {
        #[serde(default)]
        which: String,
        separator: Option<String>,
    },
    /// Handle queued events
    Pump,
    /// Lose the native link
    Sever,
    Reconfigure { config: DisplayConfig },
}

/// What a script did
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub ops: Vec<NativeOp>,
    /// Text delivered to the pane by pastes
    pub pasted: Vec<String>,
    pub keys: Vec<String>,
    pub mouse: Vec<MouseEvent>,
    pub size: (u32, u32),
    pub exit_requested: bool,
    /// Failed commands as "index: error"
    pub errors: Vec<String>,
}

impl Report {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// The multiplexer side of a replay
struct ScriptHost {
    grid: Grid,
    clipboard: Option<Vec<u8>>,
    pasted: Vec<String>,
    keys: Vec<String>,
    mouse: Vec<MouseEvent>,
    exit_requested: bool,
}

impl Scene for ScriptHost {
    fn layers(&self) -> Vec<Layer<'_>> {
        vec![Layer::new(CellPos::default(), &self.grid)]
    }
}

impl PaneRegistry for ScriptHost {
    fn is_live_pane(&self, pane: PaneId) -> bool {
        pane == SCRIPT_PANE
    }

    fn active_pane(&self) -> Option<PaneId> {
        Some(SCRIPT_PANE)
    }

    fn send_to_pane(&mut self, _pane: PaneId, data: &[u8]) {
        self.pasted.push(String::from_utf8_lossy(data).into_owned());
    }
}

impl ClipboardStore for ScriptHost {
    fn top_buffer(&self) -> Option<&[u8]> {
        self.clipboard.as_deref()
    }
}

impl ClientSink for ScriptHost {
    fn key(&mut self, key: &KeyEvent) {
        self.keys.push(key.text.clone());
    }

    fn mouse(&mut self, event: MouseEvent) {
        self.mouse.push(event);
    }

    fn resized(&mut self, cols: u32, rows: u32) {
        self.grid.resize(cols as usize, rows as usize);
    }

    fn exit_requested(&mut self) {
        self.exit_requested = true;
    }
}

/// Run a script; fails only when the connection cannot be opened
pub fn run(script: &Script) -> Result<Report, DisplayError> {
    let mut config = script.config.clone();
    if let Some(columns) = script.columns {
        config.window.columns = columns;
    }
    if let Some(rows) = script.rows {
        config.window.rows = rows;
    }

    let registry = ConnectionRegistry::new();
    let mut conn = DisplayConnection::open(RecordingSurface::with_fixed_font(LinkId(0)), config, &registry)?;
    let (cols, rows) = conn.size();
    let mut host = ScriptHost {
        grid: Grid::new(cols as usize, rows as usize),
        clipboard: None,
        pasted: Vec::new(),
        keys: Vec::new(),
        mouse: Vec::new(),
        exit_requested: false,
    };
    let mut clock = 0u64;
    let mut errors = Vec::new();

    for (index, command) in script.commands.iter().enumerate() {
        tracing::trace!("command {}: {:?}", index, command);
        if let Err(e) = step(&mut conn, &mut host, &mut clock, command) {
            tracing::debug!("command {} failed: {}", index, e);
            errors.push(format!("{}: {}", index, e));
        }
    }
    if let Err(e) = conn.flush(&host) {
        errors.push(format!("final flush: {}", e));
    }
    conn.close();

    Ok(Report {
        ops: conn.surface_mut().take_ops(),
        pasted: host.pasted,
        keys: host.keys,
        mouse: host.mouse,
        size: conn.size(),
        exit_requested: host.exit_requested,
        errors,
    })
}

fn step(
    conn: &mut DisplayConnection<RecordingSurface>,
    host: &mut ScriptHost,
    clock: &mut u64,
    command: &Command,
) -> Result<(), DisplayError> {
    let (cols, _) = conn.size();
    match command {
        Command::PutStr { col, row, text, style } => {
            host.grid.write_str(*col as usize, *row as usize, text, *style);
            for (i, c) in text.chars().enumerate() {
                conn.put_char(&*host, CellPos::new(col + i as u32, *row), c as GlyphCode, *style)?;
            }
        }
        Command::Scroll { top, bottom, lines } => {
            host.grid.scroll(*top as usize, *bottom as usize, *lines);
            let region = Rect::new(0, *top, cols, bottom.saturating_sub(*top) + 1);
            conn.scroll(&*host, region, *lines)?;
        }
        Command::Clear { area } => {
            for row in area.row..area.bottom() {
                for col in area.col..area.right() {
                    if let Some(cell) = host.grid.cell_mut(col as usize, row as usize) {
                        *cell = Default::default();
                    }
                }
            }
            conn.clear_region(&*host, *area)?;
        }
        Command::InsertChars { col, row, count } => {
            let width = cols.saturating_sub(*col);
            shift_row(&mut host.grid, *col, *row, width, *count as i32);
            conn.insert_chars(&*host, CellPos::new(*col, *row), width, *count)?;
        }
        Command::DeleteChars { col, row, count } => {
            let width = cols.saturating_sub(*col);
            shift_row(&mut host.grid, *col, *row, width, -(*count as i32));
            conn.delete_chars(&*host, CellPos::new(*col, *row), width, *count)?;
        }
        Command::MoveCursor { col, row } => conn.move_cursor(CellPos::new(*col, *row))?,
        Command::SetMode { mode } => conn.set_mode(*mode)?,
        Command::CursorStyle { style } => conn.set_cursor_style(*style)?,
        Command::CursorColour { name } => conn.set_cursor_colour(name)?,
        Command::Title { title } => conn.set_title(title)?,
        Command::Bell => conn.bell()?,
        Command::Flush => conn.flush(&*host)?,
        Command::Expose { area } => {
            conn.surface_mut().push_event(NativeEvent::Expose { area: *area, count: 0 });
            conn.pump(host)?;
        }
        Command::Resize { width, height } => {
            conn.surface_mut().resize(*width, *height);
            conn.pump(host)?;
        }
        Command::Focus { focused } => {
            conn.surface_mut().push_event(NativeEvent::Focus { focused: *focused });
            conn.pump(host)?;
        }
        Command::Key { text } => {
            *clock += 1;
            conn.surface_mut().push_event(NativeEvent::Key(KeyEvent {
                time: Timestamp(*clock),
                keysym: text.chars().next().map_or(0, |c| c as u32),
                modifiers: Modifiers::empty(),
                text: text.clone(),
            }));
            conn.pump(host)?;
        }
        Command::Pointer {
            kind,
            button,
            x,
            y,
            modifiers,
        } => {
            *clock += 1;
            conn.surface_mut().push_event(NativeEvent::Button(ButtonEvent {
                time: Timestamp(*clock),
                kind: *kind,
                button: *button,
                x: *x,
                y: *y,
                modifiers: *modifiers,
            }));
            conn.pump(host)?;
        }
        Command::Acks { mode } => conn.surface_mut().set_ack_mode(mode.clone()),
        Command::SetSelection { text } => {
            host.clipboard = Some(text.as_bytes().to_vec());
            conn.set_selection(text.as_bytes())?;
        }
        Command::ForeignSelection { selection, text } => {
            let data = text.as_ref().map(|t| t.as_bytes().to_vec());
            conn.surface_mut().set_foreign_selection(*selection, data);
        }
        Command::Paste { which, separator } => {
            conn.request_paste(host, SCRIPT_PANE, which, separator.as_deref())?;
            conn.pump(host)?;
        }
        Command::Pump => {
            conn.pump(host)?;
        }
        Command::Sever => conn.surface_mut().sever(),
        Command::Reconfigure { config } => {
            if conn.setup(config.clone())? {
                let (cols, rows) = conn.size();
                host.grid.resize(cols as usize, rows as usize);
                conn.redraw_region(&*host, Rect::new(0, 0, cols, rows))?;
            }
        }
    }
    Ok(())
}

/// Move the `width` cells from `col` right (positive) or left (negative)
/// by `count`, blanking the vacated cells
fn shift_row(grid: &mut Grid, col: u32, row: u32, width: u32, count: i32) {
    let (col, row, width) = (col as usize, row as usize, width as usize);
    let mut cells: Vec<_> = (col..col + width)
        .filter_map(|c| grid.cell(c, row).copied())
        .collect();
    let n = (count.unsigned_abs() as usize).min(cells.len());
    let len = cells.len();
    if count > 0 {
        cells.rotate_right(n);
        cells[..n].iter_mut().for_each(|cell| *cell = Default::default());
    } else {
        cells.rotate_left(n);
        cells[len - n..].iter_mut().for_each(|cell| *cell = Default::default());
    }
    for (i, cell) in cells.into_iter().enumerate() {
        if let Some(slot) = grid.cell_mut(col + i, row) {
            *slot = cell;
        }
    }
}
