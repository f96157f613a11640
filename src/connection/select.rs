//! Selection and paste
//!
//! Pastes into panes from a selection or a cut buffer, owns the primary
//! selection for the multiplexer's clipboard, and answers other clients
//! asking for it.

use super::DisplayConnection;
use crate::error::{DisplayError, Result};
use crate::host::{ClipboardStore, PaneId, PaneRegistry};
use crate::native::{Atom, PropertyValue, Selection, SelectionNotify, SelectionRequest, Surface, WindowRef};
use crate::paste::{
    serve_request, translate_line_endings, NotifyMatch, PasteSource, PendingPaste, SelectionReply, DEFAULT_SEPARATOR,
};

impl<S: Surface> DisplayConnection<S> {
    /// Paste into `pane` from the selection or cut buffer named by `which`
    ///
    /// Cut buffers and a selection we own are delivered at once; any other
    /// selection is requested from its owner and delivered when the answer
    /// arrives. A newer request replaces one still waiting. Line feeds are
    /// replaced with `separator` (carriage return by default).
    pub fn request_paste<H>(&mut self, host: &mut H, pane: PaneId, which: &str, separator: Option<&str>) -> Result<()>
    where
        H: PaneRegistry + ClipboardStore,
    {
        self.guarded(|this| {
            let source = PasteSource::parse(which).ok_or_else(|| DisplayError::UnknownSelection(which.to_string()))?;
            let separator = separator.unwrap_or(DEFAULT_SEPARATOR);

            let selection = match source {
                PasteSource::CutBuffer(n) => {
                    this.paste.cancel();
                    return match this.surface.read_property(WindowRef::Root, &Atom::cut_buffer(n))? {
                        Some(PropertyValue::Bytes { data, .. }) => {
                            deliver(host, pane, &data, separator);
                            Ok(())
                        }
                        _ => Err(DisplayError::NothingToPaste),
                    };
                }
                PasteSource::Selection(selection) => selection,
            };

            if this.surface.owns_selection(selection)? {
                this.paste.cancel();
                // An empty clipboard pastes nothing
                if let Some(data) = host.top_buffer().map(<[u8]>::to_vec) {
                    deliver(host, pane, &data, separator);
                }
                return Ok(());
            }

            let time = this.last_time;
            this.paste.begin(PendingPaste {
                time,
                pane,
                separator: separator.to_string(),
                selection,
            });
            this.surface.convert_selection(selection, &Atom::STRING, &Atom::STRING, time)?;
            this.surface.flush()?;
            Ok(())
        })
    }

    /// Take the primary selection for `data`, the multiplexer's newest
    /// clipboard buffer; cut buffer 0 gets a copy for older clients
    ///
    /// Returns whether the selection was taken.
    pub fn set_selection(&mut self, data: &[u8]) -> Result<bool> {
        self.guarded(|this| {
            if !this.surface.set_selection_owner(Selection::Primary, this.last_time)? {
                tracing::debug!("primary selection not taken");
                return Ok(false);
            }
            this.surface.write_property(
                WindowRef::Root,
                &Atom::cut_buffer(0),
                PropertyValue::Bytes {
                    kind: Atom::STRING,
                    data: data.to_vec(),
                },
            )?;
            this.surface.flush()?;
            Ok(true)
        })
    }

    /// Answer another client's request for a selection we hold
    pub(super) fn serve_selection<H: ClipboardStore + ?Sized>(
        &mut self,
        host: &H,
        request: &SelectionRequest,
    ) -> Result<()> {
        let reply = if self.surface.owns_selection(request.selection)? {
            serve_request(request, host.top_buffer())
        } else {
            None
        };
        let reply = reply.unwrap_or_else(|| SelectionReply::refusal(request));
        tracing::debug!("selection request for {:?}: {:?}", request.target, reply.notify.property);

        if let Some((property, value)) = reply.write {
            self.surface.write_property(request.requestor, &property, value)?;
        }
        self.surface.send_selection_notify(&reply.notify)?;
        Ok(())
    }

    /// A selection owner answered a conversion request
    pub(super) fn receive_paste<H: PaneRegistry + ?Sized>(&mut self, host: &mut H, notify: &SelectionNotify) -> Result<()> {
        match self.paste.accept(notify) {
            NotifyMatch::Ready { paste, property } => {
                let value = self.surface.read_property(WindowRef::Own, &property)?;
                self.surface.delete_property(WindowRef::Own, &property)?;
                match value {
                    Some(PropertyValue::Bytes { data, .. }) => deliver(host, paste.pane, &data, &paste.separator),
                    _ => tracing::warn!("selection {:?} answered without text", paste.selection),
                }
            }
            NotifyMatch::Refused(paste) => {
                tracing::debug!("selection {:?} owner refused the paste", paste.selection);
            }
            NotifyMatch::Unrelated => {
                tracing::trace!("ignoring unrelated selection notify");
            }
        }
        Ok(())
    }
}

/// Write pasted text to a pane that still exists
fn deliver<H: PaneRegistry + ?Sized>(host: &mut H, pane: PaneId, data: &[u8], separator: &str) {
    if !host.is_live_pane(pane) {
        tracing::debug!("pane {:?} went away; paste dropped", pane);
        return;
    }
    let translated = translate_line_endings(data, separator.as_bytes());
    host.send_to_pane(pane, &translated);
}
