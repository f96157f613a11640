//! In-memory Surface
//!
//! `RecordingSurface` answers every native call from memory and records the
//! drawing, window and selection requests it receives. Tests and the
//! headless runner drive the engine through it and inspect the recorded
//! operations afterwards.
//!
//! Copy acknowledgements are simulated: each `copy_area` goes in flight and
//! is answered on the next `sync` according to the configured `AckMode`.
//! The link can be severed, immediately or after a number of calls, after
//! which every call fails with `NativeError::Io`.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::{
    Atom, EventKind, FontId, LinkId, LoadedFont, NativeError, NativeEvent, NativeResult, Pixel,
    PixelRect, PropertyValue, Rgb, Selection, SelectionNotify, Surface, TextRun, Timestamp,
    WindowRef, WindowSetup,
};

/// How the simulated server answers area copies
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AckMode {
    /// Every copy is answered with a single `NoExpose`
    #[default]
    NoExpose,
    /// Every copy is answered with these graphics exposures, the last
    /// carrying count 0
    Exposures(Vec<PixelRect>),
    /// Copies are never answered
    Withheld,
    /// An unrelated event arrives instead of the answer
    Unexpected,
}

/// A request recorded by `RecordingSurface`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum NativeOp {
    LoadFont { name: String, found: bool },
    UnloadFont { font: FontId },
    FreeColors { count: usize },
    CreateWindow { width: u32, height: u32 },
    ConfigureWindow { cell_width: u32, cell_height: u32 },
    SetBackground { pixel: Pixel },
    MapWindow,
    DestroyWindow,
    SetTitle { title: String },
    Bell,
    ClearArea { area: PixelRect },
    FillRect { area: PixelRect, color: Pixel },
    DrawText {
        x: i32,
        y: i32,
        font: FontId,
        glyphs: Vec<u32>,
        fg: Pixel,
        bg: Option<Pixel>,
    },
    DrawLine { from: (i32, i32), to: (i32, i32), color: Pixel },
    CopyArea { src: PixelRect, dst: (i32, i32) },
    XorRects { rects: Vec<PixelRect>, color: Pixel },
    Flush,
    Sync,
    SetSelectionOwner { selection: Selection, time: Timestamp },
    ConvertSelection {
        selection: Selection,
        target: Atom,
        property: Atom,
        time: Timestamp,
    },
    WriteProperty { window: WindowRef, property: Atom },
    DeleteProperty { window: WindowRef, property: Atom },
    SelectionNotify(SelectionNotify),
}

impl NativeOp {
    /// Whether the op changes window pixels
    pub fn is_drawing(&self) -> bool {
        matches!(
            self,
            NativeOp::ClearArea { .. }
                | NativeOp::FillRect { .. }
                | NativeOp::DrawText { .. }
                | NativeOp::DrawLine { .. }
                | NativeOp::CopyArea { .. }
                | NativeOp::XorRects { .. }
        )
    }

    /// Glyphs of a text draw as a string
    pub fn text(&self) -> Option<String> {
        match self {
            NativeOp::DrawText { glyphs, .. } => {
                Some(glyphs.iter().filter_map(|&g| char::from_u32(g)).collect())
            }
            _ => None,
        }
    }
}

type FatalHook = Box<dyn FnMut(LinkId)>;

/// An in-memory native layer
pub struct RecordingSurface {
    link: LinkId,
    ops: Vec<NativeOp>,
    events: VecDeque<NativeEvent>,
    fonts: HashMap<String, LoadedFont>,
    live_fonts: Vec<FontId>,
    next_font: u32,
    colors_exhausted: bool,
    color_names: HashMap<String, Rgb>,
    size: (u32, u32),
    mapped: bool,
    title: String,
    properties: HashMap<(WindowRef, Atom), PropertyValue>,
    owned: HashSet<Selection>,
    foreign: HashMap<Selection, Vec<u8>>,
    ack_mode: AckMode,
    in_flight: usize,
    severed: bool,
    calls_left: Option<usize>,
    failing_requests: HashSet<&'static str>,
    fatal_hook: Option<FatalHook>,
}

impl std::fmt::Debug for RecordingSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSurface")
            .field("link", &self.link)
            .field("ops", &self.ops.len())
            .field("events", &self.events.len())
            .field("size", &self.size)
            .field("in_flight", &self.in_flight)
            .field("severed", &self.severed)
            .finish()
    }
}

impl RecordingSurface {
    pub fn new(link: LinkId) -> Self {
        let color_names = [
            ("black", Rgb(0, 0, 0)),
            ("white", Rgb(255, 255, 255)),
            ("red", Rgb(255, 0, 0)),
            ("green", Rgb(0, 255, 0)),
            ("blue", Rgb(0, 0, 255)),
            ("yellow", Rgb(255, 255, 0)),
            ("magenta", Rgb(255, 0, 255)),
            ("cyan", Rgb(0, 255, 255)),
            ("grey", Rgb(190, 190, 190)),
            ("gray", Rgb(190, 190, 190)),
            ("orange", Rgb(255, 165, 0)),
        ]
        .into_iter()
        .map(|(name, rgb)| (name.to_string(), rgb))
        .collect();

        Self {
            link,
            ops: Vec::new(),
            events: VecDeque::new(),
            fonts: HashMap::new(),
            live_fonts: Vec::new(),
            next_font: 1,
            colors_exhausted: false,
            color_names,
            size: (0, 0),
            mapped: false,
            title: String::new(),
            properties: HashMap::new(),
            owned: HashSet::new(),
            foreign: HashMap::new(),
            ack_mode: AckMode::default(),
            in_flight: 0,
            severed: false,
            calls_left: None,
            failing_requests: HashSet::new(),
            fatal_hook: None,
        }
    }

    /// A surface offering a single 6x13 font named `fixed` covering ASCII
    pub fn with_fixed_font(link: LinkId) -> Self {
        let mut surface = Self::new(link);
        surface.add_font(LoadedFont::monospace(FontId(0), "fixed", 6, 10, 3, 0x20..0x7f));
        surface
    }

    // --- scripting ---

    /// Make a font loadable under its name
    pub fn add_font(&mut self, font: LoadedFont) {
        self.fonts.insert(font.name.clone(), font);
    }

    pub fn set_ack_mode(&mut self, mode: AckMode) {
        self.ack_mode = mode;
    }

    /// Make colour allocation fail from now on
    pub fn exhaust_colors(&mut self) {
        self.colors_exhausted = true;
    }

    pub fn push_event(&mut self, event: NativeEvent) {
        self.events.push_back(event);
    }

    /// Change the window size and queue the matching configure event
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.events.push_back(NativeEvent::Configure { width, height });
    }

    /// Hand a selection to another client holding `data`; `None` makes the
    /// owner refuse conversions
    pub fn set_foreign_selection(&mut self, selection: Selection, data: Option<Vec<u8>>) {
        if self.owned.remove(&selection) {
            self.events.push_back(NativeEvent::SelectionClear {
                time: Timestamp::default(),
            });
        }
        match data {
            Some(data) => {
                self.foreign.insert(selection, data);
            }
            None => {
                self.foreign.remove(&selection);
            }
        }
    }

    /// Store a property directly, as another client would
    pub fn set_property(&mut self, window: WindowRef, property: Atom, value: PropertyValue) {
        self.properties.insert((window, property), value);
    }

    pub fn property(&self, window: WindowRef, property: &Atom) -> Option<&PropertyValue> {
        self.properties.get(&(window, property.clone()))
    }

    /// Fail every call from now on
    pub fn sever(&mut self) {
        self.severed = true;
    }

    /// Fail every call after the next `calls` succeed
    pub fn sever_after(&mut self, calls: usize) {
        self.calls_left = Some(calls);
    }

    /// Reject calls of the named request with a non-fatal error
    pub fn fail_request(&mut self, request: &'static str) {
        self.failing_requests.insert(request);
    }

    /// Called once, out of band, when the link dies
    pub fn on_fatal(&mut self, hook: impl FnMut(LinkId) + 'static) {
        self.fatal_hook = Some(Box::new(hook));
    }

    // --- inspection ---

    pub fn ops(&self) -> &[NativeOp] {
        &self.ops
    }

    /// Drain the recorded ops
    pub fn take_ops(&mut self) -> Vec<NativeOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn count_ops(&self, pred: impl Fn(&NativeOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn live_fonts(&self) -> &[FontId] {
        &self.live_fonts
    }

    pub fn copies_in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_severed(&self) -> bool {
        self.severed
    }

    // --- internals ---

    fn enter(&mut self, request: &'static str) -> NativeResult<()> {
        if let Some(left) = self.calls_left {
            if left == 0 {
                self.calls_left = None;
                self.severed = true;
            } else {
                self.calls_left = Some(left - 1);
            }
        }
        if self.severed {
            if let Some(mut hook) = self.fatal_hook.take() {
                hook(self.link);
            }
            return Err(NativeError::Io(format!("{}: connection lost", request)));
        }
        if self.failing_requests.contains(request) {
            return Err(NativeError::Request { request, code: 8 });
        }
        Ok(())
    }

    fn deliver_acks(&mut self) {
        for _ in 0..self.in_flight {
            match &self.ack_mode {
                AckMode::NoExpose => self.events.push_back(NativeEvent::NoExpose),
                AckMode::Exposures(areas) if !areas.is_empty() => {
                    let last = areas.len() - 1;
                    for (i, area) in areas.iter().enumerate() {
                        self.events.push_back(NativeEvent::GraphicsExpose {
                            area: *area,
                            count: (last - i) as u32,
                        });
                    }
                }
                AckMode::Exposures(_) => self.events.push_back(NativeEvent::NoExpose),
                AckMode::Withheld => {}
                AckMode::Unexpected => self.events.push_back(NativeEvent::MappingChange),
            }
        }
        if self.ack_mode != AckMode::Withheld {
            self.in_flight = 0;
        }
    }
}

fn parse_hex_color(name: &str) -> Option<Rgb> {
    let hex = name.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    Some(Rgb((value >> 16) as u8, (value >> 8) as u8, value as u8))
}

impl Surface for RecordingSurface {
    fn link(&self) -> LinkId {
        self.link
    }

    fn load_font(&mut self, name: &str) -> NativeResult<Option<LoadedFont>> {
        self.enter("OpenFont")?;
        let found = self.fonts.get(name).cloned().map(|mut font| {
            font.id = FontId(self.next_font);
            self.next_font += 1;
            self.live_fonts.push(font.id);
            font
        });
        self.ops.push(NativeOp::LoadFont {
            name: name.to_string(),
            found: found.is_some(),
        });
        Ok(found)
    }

    fn unload_font(&mut self, font: FontId) -> NativeResult<()> {
        self.enter("CloseFont")?;
        self.live_fonts.retain(|id| *id != font);
        self.ops.push(NativeOp::UnloadFont { font });
        Ok(())
    }

    fn alloc_color(&mut self, rgb: Rgb) -> NativeResult<Option<Pixel>> {
        self.enter("AllocColor")?;
        if self.colors_exhausted {
            return Ok(None);
        }
        Ok(Some(Pixel::from_rgb(rgb.0, rgb.1, rgb.2)))
    }

    fn lookup_color(&mut self, name: &str) -> NativeResult<Option<Rgb>> {
        self.enter("LookupColor")?;
        Ok(parse_hex_color(name).or_else(|| self.color_names.get(&name.to_ascii_lowercase()).copied()))
    }

    fn free_colors(&mut self, pixels: &[Pixel]) -> NativeResult<()> {
        self.enter("FreeColors")?;
        self.ops.push(NativeOp::FreeColors { count: pixels.len() });
        Ok(())
    }

    fn black_pixel(&self) -> Pixel {
        Pixel(0)
    }

    fn white_pixel(&self) -> Pixel {
        Pixel(0xffffff)
    }

    fn create_window(&mut self, setup: &WindowSetup) -> NativeResult<()> {
        self.enter("CreateWindow")?;
        self.size = (setup.width, setup.height);
        self.ops.push(NativeOp::CreateWindow {
            width: setup.width,
            height: setup.height,
        });
        Ok(())
    }

    fn configure_window(&mut self, setup: &WindowSetup) -> NativeResult<()> {
        self.enter("ConfigureWindow")?;
        self.ops.push(NativeOp::ConfigureWindow {
            cell_width: setup.cell_width,
            cell_height: setup.cell_height,
        });
        Ok(())
    }

    fn window_size(&mut self) -> NativeResult<(u32, u32)> {
        self.enter("GetGeometry")?;
        Ok(self.size)
    }

    fn set_background(&mut self, pixel: Pixel) -> NativeResult<()> {
        self.enter("ChangeWindowAttributes")?;
        self.ops.push(NativeOp::SetBackground { pixel });
        Ok(())
    }

    fn map_window(&mut self) -> NativeResult<()> {
        self.enter("MapWindow")?;
        self.mapped = true;
        self.ops.push(NativeOp::MapWindow);
        self.events.push_back(NativeEvent::Map { mapped: true });
        Ok(())
    }

    fn destroy_window(&mut self) -> NativeResult<()> {
        self.enter("DestroyWindow")?;
        self.mapped = false;
        self.ops.push(NativeOp::DestroyWindow);
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> NativeResult<()> {
        self.enter("StoreName")?;
        self.title = title.to_string();
        self.ops.push(NativeOp::SetTitle {
            title: title.to_string(),
        });
        Ok(())
    }

    fn bell(&mut self) -> NativeResult<()> {
        self.enter("Bell")?;
        self.ops.push(NativeOp::Bell);
        Ok(())
    }

    fn clear_area(&mut self, area: PixelRect) -> NativeResult<()> {
        self.enter("ClearArea")?;
        self.ops.push(NativeOp::ClearArea { area });
        Ok(())
    }

    fn fill_rect(&mut self, area: PixelRect, color: Pixel) -> NativeResult<()> {
        self.enter("PolyFillRectangle")?;
        self.ops.push(NativeOp::FillRect { area, color });
        Ok(())
    }

    fn draw_text(&mut self, run: &TextRun<'_>) -> NativeResult<()> {
        self.enter("PolyText16")?;
        self.ops.push(NativeOp::DrawText {
            x: run.x,
            y: run.y,
            font: run.font,
            glyphs: run.glyphs.to_vec(),
            fg: run.fg,
            bg: run.bg,
        });
        Ok(())
    }

    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Pixel) -> NativeResult<()> {
        self.enter("PolySegment")?;
        self.ops.push(NativeOp::DrawLine { from, to, color });
        Ok(())
    }

    fn copy_area(&mut self, src: PixelRect, dst: (i32, i32)) -> NativeResult<()> {
        self.enter("CopyArea")?;
        self.in_flight += 1;
        self.ops.push(NativeOp::CopyArea { src, dst });
        Ok(())
    }

    fn xor_rects(&mut self, rects: &[PixelRect], color: Pixel) -> NativeResult<()> {
        self.enter("PolyFillRectangle")?;
        self.ops.push(NativeOp::XorRects {
            rects: rects.to_vec(),
            color,
        });
        Ok(())
    }

    fn flush(&mut self) -> NativeResult<()> {
        self.enter("Flush")?;
        self.ops.push(NativeOp::Flush);
        Ok(())
    }

    fn sync(&mut self) -> NativeResult<()> {
        self.enter("Sync")?;
        self.ops.push(NativeOp::Sync);
        self.deliver_acks();
        Ok(())
    }

    fn next_event(&mut self) -> NativeResult<Option<NativeEvent>> {
        self.enter("NextEvent")?;
        Ok(self.events.pop_front())
    }

    fn take_event(&mut self, kind: EventKind) -> NativeResult<Option<NativeEvent>> {
        self.enter("CheckTypedEvent")?;
        let index = self.events.iter().position(|e| e.kind() == kind);
        Ok(index.and_then(|i| self.events.remove(i)))
    }

    fn set_selection_owner(&mut self, selection: Selection, time: Timestamp) -> NativeResult<bool> {
        self.enter("SetSelectionOwner")?;
        self.foreign.remove(&selection);
        self.owned.insert(selection);
        self.ops.push(NativeOp::SetSelectionOwner { selection, time });
        Ok(true)
    }

    fn owns_selection(&mut self, selection: Selection) -> NativeResult<bool> {
        self.enter("GetSelectionOwner")?;
        Ok(self.owned.contains(&selection))
    }

    fn convert_selection(
        &mut self,
        selection: Selection,
        target: &Atom,
        property: &Atom,
        time: Timestamp,
    ) -> NativeResult<()> {
        self.enter("ConvertSelection")?;
        self.ops.push(NativeOp::ConvertSelection {
            selection,
            target: target.clone(),
            property: property.clone(),
            time,
        });

        // The foreign owner answers straight away
        let answered = match self.foreign.get(&selection) {
            Some(data) => {
                let value = PropertyValue::Bytes {
                    kind: Atom::STRING,
                    data: data.clone(),
                };
                self.properties.insert((WindowRef::Own, property.clone()), value);
                Some(property.clone())
            }
            None => None,
        };
        self.events.push_back(NativeEvent::SelectionNotify(SelectionNotify {
            requestor: WindowRef::Own,
            selection,
            target: target.clone(),
            property: answered,
            time,
        }));
        Ok(())
    }

    fn read_property(&mut self, window: WindowRef, property: &Atom) -> NativeResult<Option<PropertyValue>> {
        self.enter("GetProperty")?;
        Ok(self.properties.get(&(window, property.clone())).cloned())
    }

    fn write_property(&mut self, window: WindowRef, property: &Atom, value: PropertyValue) -> NativeResult<()> {
        self.enter("ChangeProperty")?;
        self.properties.insert((window, property.clone()), value);
        self.ops.push(NativeOp::WriteProperty {
            window,
            property: property.clone(),
        });
        Ok(())
    }

    fn delete_property(&mut self, window: WindowRef, property: &Atom) -> NativeResult<()> {
        self.enter("DeleteProperty")?;
        self.properties.remove(&(window, property.clone()));
        self.ops.push(NativeOp::DeleteProperty {
            window,
            property: property.clone(),
        });
        Ok(())
    }

    fn send_selection_notify(&mut self, notify: &SelectionNotify) -> NativeResult<()> {
        self.enter("SendEvent")?;
        self.ops.push(NativeOp::SelectionNotify(notify.clone()));
        Ok(())
    }
}
