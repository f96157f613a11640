//! Paste Exchange
//!
//! At most one paste request is outstanding per connection. Asking for a
//! new paste drops the previous one; an answer is accepted only when it
//! matches the outstanding request's window, timestamp, target and
//! property. Also serves other clients' requests for our selection.

use serde::{Deserialize, Serialize};

use crate::host::PaneId;
use crate::native::{Atom, PropertyValue, Selection, SelectionNotify, SelectionRequest, Timestamp, WindowRef};

/// Separator written in place of each line feed unless told otherwise
pub const DEFAULT_SEPARATOR: &str = "\r";

/// Where pasted text comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PasteSource {
    Selection(Selection),
    /// Legacy cut buffer 0-7 on the root window
    CutBuffer(u8),
}

impl PasteSource {
    /// Parse a source name: a case-insensitive prefix of `primary`,
    /// `secondary` or `clipboard`, or a cut buffer number. Empty means
    /// primary.
    pub fn parse(which: &str) -> Option<Self> {
        let lower = which.to_ascii_lowercase();
        if "primary".starts_with(&lower) {
            return Some(PasteSource::Selection(Selection::Primary));
        }
        if "secondary".starts_with(&lower) {
            return Some(PasteSource::Selection(Selection::Secondary));
        }
        if "clipboard".starts_with(&lower) {
            return Some(PasteSource::Selection(Selection::Clipboard));
        }
        match lower.parse::<u8>() {
            Ok(n) if n <= 7 => Some(PasteSource::CutBuffer(n)),
            _ => None,
        }
    }
}

/// The outstanding paste request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPaste {
    /// Timestamp the conversion was requested with
    pub time: Timestamp,
    pub pane: PaneId,
    pub separator: String,
    pub selection: Selection,
}

/// How an incoming selection notify relates to the pending paste
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyMatch {
    /// Not an answer to our request
    Unrelated,
    /// The owner refused the conversion; the request is dropped
    Refused(PendingPaste),
    /// Data is waiting in the property
    Ready { paste: PendingPaste, property: Atom },
}

/// Single-outstanding paste state machine
#[derive(Debug, Default)]
pub struct PasteExchange {
    pending: Option<PendingPaste>,
}

impl PasteExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&PendingPaste> {
        self.pending.as_ref()
    }

    /// Make `paste` the outstanding request; returns the one it replaces
    pub fn begin(&mut self, paste: PendingPaste) -> Option<PendingPaste> {
        let previous = self.pending.replace(paste);
        if let Some(previous) = &previous {
            tracing::debug!("paste for pane {:?} superseded", previous.pane);
        }
        previous
    }

    pub fn cancel(&mut self) -> Option<PendingPaste> {
        self.pending.take()
    }

    /// Match a selection notify against the outstanding request; a match
    /// ends the request
    pub fn accept(&mut self, notify: &SelectionNotify) -> NotifyMatch {
        let matches = match &self.pending {
            Some(pending) => {
                notify.requestor == WindowRef::Own
                    && notify.time == pending.time
                    && notify.selection == pending.selection
                    && notify.target == Atom::STRING
            }
            None => false,
        };
        if !matches {
            return NotifyMatch::Unrelated;
        }
        match (&notify.property, self.pending.take()) {
            (Some(property), Some(paste)) if *property == Atom::STRING => NotifyMatch::Ready {
                paste,
                property: property.clone(),
            },
            (_, Some(paste)) => NotifyMatch::Refused(paste),
            (_, None) => NotifyMatch::Unrelated,
        }
    }
}

/// Replace each line feed with `separator`; the tail after the last line
/// feed is kept verbatim
pub fn translate_line_endings(data: &[u8], separator: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut segments = data.split(|&b| b == b'\n').peekable();
    while let Some(segment) = segments.next() {
        out.extend_from_slice(segment);
        if segments.peek().is_some() {
            out.extend_from_slice(separator);
        }
    }
    out
}

/// Our answer to a selection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionReply {
    /// Property to store on the requestor before notifying
    pub write: Option<(Atom, PropertyValue)>,
    pub notify: SelectionNotify,
}

impl SelectionReply {
    /// A reply refusing the conversion
    pub fn refusal(request: &SelectionRequest) -> Self {
        Self {
            write: None,
            notify: SelectionNotify {
                requestor: request.requestor,
                selection: request.selection,
                target: request.target.clone(),
                property: None,
                time: request.time,
            },
        }
    }
}

/// Answer a request for our primary selection
///
/// `STRING` and `TEXT` get the top clipboard buffer, `TARGETS` the list of
/// supported targets. Anything else, or an empty clipboard, is refused.
/// Requests for other selections are ignored.
pub fn serve_request(request: &SelectionRequest, top_buffer: Option<&[u8]>) -> Option<SelectionReply> {
    if request.selection != Selection::Primary {
        return None;
    }
    // Obsolete clients leave the property empty and mean the target
    let property = request.property.clone().unwrap_or_else(|| request.target.clone());

    let value = if request.target == Atom::STRING || request.target == Atom::TEXT {
        top_buffer.map(|data| PropertyValue::Bytes {
            kind: Atom::STRING,
            data: data.to_vec(),
        })
    } else if request.target == Atom::TARGETS {
        Some(PropertyValue::Atoms(vec![Atom::STRING, Atom::TARGETS]))
    } else {
        None
    };

    let notify = SelectionNotify {
        requestor: request.requestor,
        selection: request.selection,
        target: request.target.clone(),
        property: value.as_ref().map(|_| property.clone()),
        time: request.time,
    };
    Some(SelectionReply {
        write: value.map(|v| (property, v)),
        notify,
    })
}
