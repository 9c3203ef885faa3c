//! Window slots and their lifecycle.

use std::fmt;

use crate::catalog::SegmentId;
use crate::loader::SegmentPayload;

/// Identity of a window slot. Allocated monotonically and never reused, so
/// holding one across frames is safe: if the slot left the window the lookup
/// simply fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

impl SlotId {
  pub(crate) fn new(raw: u64) -> Self {
    Self(raw)
  }
}

impl fmt::Display for SlotId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Lifecycle of a slot.
///
/// ```text
/// Empty -> Loading -> Failed -(retry)-> Loading
///                  -> Initializing -> Ready -> (removed)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SegmentState {
  /// No content. Placeholders beyond a chain end stay here forever.
  Empty,
  /// Load in flight, or downloaded and waiting for its splice.
  Loading,
  /// Last load failed; waits for an explicit retry.
  Failed,
  /// Payload spliced in, extent not computed yet.
  Initializing,
  /// Extent known; takes part in layout and bounds.
  Ready,
}

/// Size of a ready segment along the scroll axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentExtent {
  /// World width after scaling and stub removal.
  pub width: f32,
  /// Payload units to world units.
  pub scale: f32,
  /// Payload units trimmed from the left edge.
  pub stub: f32,
}

impl SegmentExtent {
  /// Converts a payload-local x coordinate into an offset from the segment's
  /// left world edge.
  pub fn local_to_offset(&self, x: f32) -> f32 {
    (x - self.stub) * self.scale
  }
}

/// One position of the window.
#[derive(Debug)]
pub struct Segment {
  slot: SlotId,
  id: Option<SegmentId>,
  state: SegmentState,
  payload: Option<SegmentPayload>,
  extent: Option<SegmentExtent>,
  size_bytes: Option<u64>,
  load_attempts: u32,
}

impl Segment {
  pub(crate) fn new(slot: SlotId, id: Option<SegmentId>) -> Self {
    Self {
      slot,
      id,
      state: SegmentState::Empty,
      payload: None,
      extent: None,
      size_bytes: None,
      load_attempts: 0,
    }
  }

  pub fn slot(&self) -> SlotId {
    self.slot
  }

  /// `None` for a placeholder beyond a chain end.
  pub fn id(&self) -> Option<&SegmentId> {
    self.id.as_ref()
  }

  pub fn state(&self) -> SegmentState {
    self.state
  }

  pub fn is_ready(&self) -> bool {
    self.state == SegmentState::Ready
  }

  /// Payload, once spliced in.
  pub fn payload(&self) -> Option<&SegmentPayload> {
    self.payload.as_ref()
  }

  /// Extent. Only available in `Ready`.
  pub fn extent(&self) -> Option<SegmentExtent> {
    if self.state == SegmentState::Ready {
      self.extent
    } else {
      None
    }
  }

  /// Download size, once the loader reported it.
  pub fn size_bytes(&self) -> Option<u64> {
    self.size_bytes
  }

  /// Number of loads issued for this slot.
  pub fn load_attempts(&self) -> u32 {
    self.load_attempts
  }

  pub(crate) fn begin_load(&mut self) {
    debug_assert!(
      matches!(self.state, SegmentState::Empty | SegmentState::Failed),
      "load issued for {} in {:?}",
      self.slot,
      self.state
    );
    self.state = SegmentState::Loading;
    self.load_attempts += 1;
  }

  pub(crate) fn fail(&mut self) {
    debug_assert_eq!(self.state, SegmentState::Loading);
    self.state = SegmentState::Failed;
  }

  pub(crate) fn splice(&mut self, payload: SegmentPayload) {
    debug_assert_eq!(self.state, SegmentState::Loading);
    self.payload = Some(payload);
    self.state = SegmentState::Initializing;
  }

  pub(crate) fn finish(&mut self, extent: SegmentExtent) {
    debug_assert_eq!(self.state, SegmentState::Initializing);
    self.extent = Some(extent);
    self.state = SegmentState::Ready;
  }

  pub(crate) fn set_size(&mut self, bytes: u64) {
    self.size_bytes = Some(bytes);
  }

  /// Drops the payload and returns to `Empty`. Returns whether the asset has
  /// to be released through the loader. `Empty` and `Failed` slots hold no
  /// reference.
  pub(crate) fn release(&mut self) -> bool {
    let held = !matches!(self.state, SegmentState::Empty | SegmentState::Failed);
    self.payload = None;
    self.extent = None;
    self.state = SegmentState::Empty;
    held
  }
}
