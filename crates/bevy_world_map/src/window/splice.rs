//! Deferred splicing of downloaded payloads. A finished download waits here
//! until the [`SpliceGate`] opens.

use super::slot::SlotId;
use crate::loader::SegmentPayload;

/// Frame conditions that hold a splice back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpliceGate {
  pub dragging: bool,
  pub paused: bool,
  /// Debug switch; `false` freezes all splicing.
  pub load_enabled: bool,
}

impl SpliceGate {
  pub fn open() -> Self {
    Self {
      dragging: false,
      paused: false,
      load_enabled: true,
    }
  }

  pub fn is_open(&self) -> bool {
    !self.dragging && !self.paused && self.load_enabled
  }
}

/// Outcome of one resume attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpliceStep {
  /// Gate closed; try again next frame.
  Continue,
  /// Gate open and slot still present; splice now.
  Resumed,
  /// Slot left the window; payload is dropped.
  Abandoned,
}

/// A downloaded payload waiting for its slot.
#[derive(Debug)]
pub struct PendingSplice {
  pub slot: SlotId,
  pub payload: SegmentPayload,
}

impl PendingSplice {
  pub fn maybe_resume(&self, gate: &SpliceGate, still_member: bool) -> SpliceStep {
    if !still_member {
      SpliceStep::Abandoned
    } else if gate.is_open() {
      SpliceStep::Resumed
    } else {
      SpliceStep::Continue
    }
  }
}
