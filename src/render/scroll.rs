//! Scroll Coalescing
//!
//! Consecutive scrolls of one region in one direction merge into a single
//! pending scroll, executed as one area copy plus one clear.

use serde::{Deserialize, Serialize};

use crate::core::{CellPos, Rect};

/// A scroll waiting to be drawn
///
/// Positive `lines` move content up (lines appear at the bottom),
/// negative move it down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingScroll {
    pub region: Rect,
    pub lines: i32,
}

/// The copy part of a scroll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaCopy {
    pub src: Rect,
    pub dst: CellPos,
}

impl AreaCopy {
    /// Cells written by the copy
    pub fn dst_rect(&self) -> Rect {
        Rect::new(self.dst.col, self.dst.row, self.src.width, self.src.height)
    }
}

/// Native work for a scroll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPlan {
    /// Surviving rows, absent when the whole region scrolls away
    pub copy: Option<AreaCopy>,
    /// Rows left vacant
    pub clear: Rect,
}

impl PendingScroll {
    pub fn plan(&self) -> ScrollPlan {
        let r = self.region;
        let n = self.lines.unsigned_abs();
        if n >= r.height {
            return ScrollPlan { copy: None, clear: r };
        }
        let kept = r.height - n;
        if self.lines > 0 {
            ScrollPlan {
                copy: Some(AreaCopy {
                    src: Rect::new(r.col, r.row + n, r.width, kept),
                    dst: r.origin(),
                }),
                clear: Rect::new(r.col, r.row + kept, r.width, n),
            }
        } else {
            ScrollPlan {
                copy: Some(AreaCopy {
                    src: Rect::new(r.col, r.row, r.width, kept),
                    dst: CellPos::new(r.col, r.row + n),
                }),
                clear: Rect::new(r.col, r.row, r.width, n),
            }
        }
    }
}

/// The single pending scroll of a connection
#[derive(Debug, Default)]
pub struct ScrollBuffer {
    pending: Option<PendingScroll>,
}

impl ScrollBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&PendingScroll> {
        self.pending.as_ref()
    }

    /// Queue a scroll of `region` by `lines`
    ///
    /// Merges with the pending scroll when the region and direction match.
    /// Otherwise the pending scroll is returned, to be drawn before the new
    /// one, which becomes pending.
    pub fn push(&mut self, region: Rect, lines: i32) -> Option<PendingScroll> {
        if lines == 0 || region.is_empty() {
            return None;
        }
        let limit = region.height.min(i32::MAX as u32) as i32;
        let clamp = |n: i32| n.clamp(-limit, limit);

        if let Some(pending) = &mut self.pending {
            if pending.region == region && (pending.lines > 0) == (lines > 0) {
                pending.lines = clamp(pending.lines.saturating_add(lines));
                return None;
            }
        }
        self.pending.replace(PendingScroll {
            region,
            lines: clamp(lines),
        })
    }

    pub fn take(&mut self) -> Option<PendingScroll> {
        self.pending.take()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}
