//! Host Collaborators
//!
//! What the engine needs from the multiplexer around it: the scene to
//! redraw from, the pane registry for paste delivery, the clipboard store
//! for selection serving, and a sink for client input and lifecycle.

use serde::{Deserialize, Serialize};

use crate::core::{CellPos, Grid, GridView};
use crate::native::{ButtonKind, KeyEvent, Modifiers};

/// A pane reference, stable for the pane's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaneId(pub u32);

/// One grid placed on the client's window
#[derive(Clone, Copy)]
pub struct Layer<'a> {
    /// Window cell of the grid's top-left cell
    pub origin: CellPos,
    /// Visible size; may be smaller than the grid
    pub cols: u32,
    pub rows: u32,
    pub grid: &'a dyn GridView,
}

impl<'a> Layer<'a> {
    /// A whole grid at `origin`
    pub fn new(origin: CellPos, grid: &'a dyn GridView) -> Self {
        Self {
            origin,
            cols: grid.cols() as u32,
            rows: grid.rows() as u32,
            grid,
        }
    }
}

impl std::fmt::Debug for Layer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("origin", &self.origin)
            .field("cols", &self.cols)
            .field("rows", &self.rows)
            .finish()
    }
}

/// Everything visible on a client's window: panes and status line
pub trait Scene {
    fn layers(&self) -> Vec<Layer<'_>>;
}

impl Scene for Grid {
    fn layers(&self) -> Vec<Layer<'_>> {
        vec![Layer::new(CellPos::default(), self)]
    }
}

/// Live panes and paste delivery
pub trait PaneRegistry {
    fn is_live_pane(&self, pane: PaneId) -> bool;

    /// The pane input goes to
    fn active_pane(&self) -> Option<PaneId>;

    /// Write pasted bytes to a pane's input
    fn send_to_pane(&mut self, pane: PaneId, data: &[u8]);
}

/// The named-buffer clipboard store
pub trait ClipboardStore {
    /// The most recent buffer
    fn top_buffer(&self) -> Option<&[u8]>;
}

/// Pointer input translated to cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseEvent {
    pub kind: ButtonKind,
    pub button: u8,
    pub col: u32,
    pub row: u32,
    pub modifiers: Modifiers,
}

/// Receives the client's input and lifecycle changes
pub trait ClientSink {
    fn key(&mut self, key: &KeyEvent);

    fn mouse(&mut self, event: MouseEvent);

    /// The window now holds `cols` x `rows` cells
    fn resized(&mut self, cols: u32, rows: u32);

    /// The client must go away (window destroyed or link lost)
    fn exit_requested(&mut self);
}

/// Everything the event pump talks to
pub trait Host: Scene + PaneRegistry + ClipboardStore + ClientSink {}

impl<T: Scene + PaneRegistry + ClipboardStore + ClientSink> Host for T {}
