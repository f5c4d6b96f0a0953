// src/engine/queue.rs

//! The single pending-cycle slot.

use crate::engine::CycleKind;

/// Holds at most one cycle requested while another is in flight.
///
/// Any number of requests collapse into one; a restart request dominates
/// a rebuild request since a restart rebuilds everything anyway.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingCycle {
    slot: Option<CycleKind>,
}

impl PendingCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: CycleKind) {
        self.slot = match (self.slot, kind) {
            (Some(CycleKind::Restart), _) | (_, CycleKind::Restart) => Some(CycleKind::Restart),
            _ => Some(CycleKind::Rebuild),
        };
    }

    pub fn take(&mut self) -> Option<CycleKind> {
        self.slot.take()
    }

    pub fn peek(&self) -> Option<CycleKind> {
        self.slot
    }
}
