//! Native events delivered to the engine's event pump

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::{Atom, PixelRect, Selection, Timestamp, WindowRef};

bitflags! {
    /// Keyboard and pointer-button modifier state
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Modifiers: u16 {
        const SHIFT   = 0x0001;
        const LOCK    = 0x0002;
        const CONTROL = 0x0004;
        const MOD1    = 0x0008;
        const MOD2    = 0x0010;
        const MOD3    = 0x0020;
        const MOD4    = 0x0040;
        const MOD5    = 0x0080;
        const BUTTON1 = 0x0100;
        const BUTTON2 = 0x0200;
        const BUTTON3 = 0x0400;
    }
}

/// A key press, already looked up by the native input method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub time: Timestamp,
    /// Native key symbol
    pub keysym: u32,
    pub modifiers: Modifiers,
    /// Text produced by the key, possibly empty
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonKind {
    Press,
    Release,
    Motion,
}

/// Pointer button or motion in window pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub time: Timestamp,
    pub kind: ButtonKind,
    /// Button number, 1-based; 0 for motion
    pub button: u8,
    pub x: i32,
    pub y: i32,
    pub modifiers: Modifiers,
}

/// Someone asks us, as selection owner, to convert the selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub requestor: WindowRef,
    pub selection: Selection,
    pub target: Atom,
    /// `None` from obsolete clients; the target name is used instead
    pub property: Option<Atom>,
    pub time: Timestamp,
}

/// Answer to a selection conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionNotify {
    pub requestor: WindowRef,
    pub selection: Selection,
    pub target: Atom,
    /// `None` when the conversion was refused
    pub property: Option<Atom>,
    pub time: Timestamp,
}

/// Events the native layer delivers to the connection's window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NativeEvent {
    Key(KeyEvent),
    Button(ButtonEvent),
    /// Part of the window lost its content; `count` more follow
    Expose { area: PixelRect, count: u32 },
    /// Part of a copy's source was unavailable; `count` more follow
    GraphicsExpose { area: PixelRect, count: u32 },
    /// A copy completed with nothing to repaint
    NoExpose,
    Focus { focused: bool },
    Configure { width: u32, height: u32 },
    Map { mapped: bool },
    MappingChange,
    SelectionClear { time: Timestamp },
    SelectionRequest(SelectionRequest),
    SelectionNotify(SelectionNotify),
    Destroy,
}

/// Event classes, for typed extraction from the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Key,
    Button,
    Expose,
    GraphicsExpose,
    NoExpose,
    Focus,
    Configure,
    Map,
    MappingChange,
    SelectionClear,
    SelectionRequest,
    SelectionNotify,
    Destroy,
}

impl NativeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            NativeEvent::Key(_) => EventKind::Key,
            NativeEvent::Button(_) => EventKind::Button,
            NativeEvent::Expose { .. } => EventKind::Expose,
            NativeEvent::GraphicsExpose { .. } => EventKind::GraphicsExpose,
            NativeEvent::NoExpose => EventKind::NoExpose,
            NativeEvent::Focus { .. } => EventKind::Focus,
            NativeEvent::Configure { .. } => EventKind::Configure,
            NativeEvent::Map { .. } => EventKind::Map,
            NativeEvent::MappingChange => EventKind::MappingChange,
            NativeEvent::SelectionClear { .. } => EventKind::SelectionClear,
            NativeEvent::SelectionRequest(_) => EventKind::SelectionRequest,
            NativeEvent::SelectionNotify(_) => EventKind::SelectionNotify,
            NativeEvent::Destroy => EventKind::Destroy,
        }
    }
}
