//! Asynchronous segment loading.
//!
//! The window never blocks on a load. Requests are fire-and-forget and their
//! completions come back as [`LoaderEvent`]s, drained once per frame by the
//! window. Each request carries the requesting slot's [`SlotId`] as a ticket,
//! so a completion that arrives after its slot was removed can be recognized
//! and dropped.

mod manual;
#[cfg(not(target_family = "wasm"))]
mod native;

use std::fmt;

pub use manual::ManualLoader;
#[cfg(not(target_family = "wasm"))]
pub use native::FileSegmentLoader;
use serde::{Deserialize, Serialize};

use crate::catalog::LevelId;
use crate::window::SlotId;

/// Position of a level button in payload-local units.
///
/// `x` is measured from the payload's left edge (including any leading stub),
/// `y` from its bottom.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ButtonAnchor {
  pub level: LevelId,
  pub x: f32,
  pub y: f32,
}

/// Loaded segment content as far as the streaming logic is concerned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentPayload {
  /// Native width in payload units.
  pub width: f32,
  /// Native height in payload units. The segment is scaled so this fills the
  /// viewport height.
  pub height: f32,
  /// Decorative lead-in cut off when the segment opens the chain.
  #[serde(default)]
  pub leading_stub: f32,
  #[serde(default)]
  pub buttons: Vec<ButtonAnchor>,
}

impl SegmentPayload {
  pub fn anchor(&self, level: LevelId) -> Option<&ButtonAnchor> {
    self.buttons.iter().find(|anchor| anchor.level == level)
  }
}

/// Reason a load did not produce a payload.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadFailure {
  pub name: String,
  pub reason: String,
}

impl LoadFailure {
  pub fn new(name: impl Into<String>, reason: impl fmt::Display) -> Self {
    Self {
      name: name.into(),
      reason: reason.to_string(),
    }
  }
}

impl fmt::Display for LoadFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "failed to load '{}': {}", self.name, self.reason)
  }
}

impl std::error::Error for LoadFailure {}

/// Completion reported by a loader.
#[derive(Debug)]
pub enum LoaderEvent {
  /// A `request_load` finished.
  Loaded {
    ticket: SlotId,
    result: Result<SegmentPayload, LoadFailure>,
  },
  /// Download size became known for a `request_size`.
  Sized { ticket: SlotId, bytes: u64 },
}

impl LoaderEvent {
  pub fn ticket(&self) -> SlotId {
    match self {
      LoaderEvent::Loaded { ticket, .. } | LoaderEvent::Sized { ticket, .. } => *ticket,
    }
  }
}

/// Opaque asynchronous loader keyed by asset name.
///
/// Implementations must not call back into the window; every outcome goes
/// through [`SegmentLoader::try_recv`].
pub trait SegmentLoader: Send + Sync {
  /// Starts loading `name`. Exactly one `Loaded` event follows per call.
  fn request_load(&mut self, ticket: SlotId, name: &str);

  /// Asks for the download size of `name`. At most one `Sized` event follows.
  fn request_size(&mut self, ticket: SlotId, name: &str);

  /// Progress of the newest outstanding load of `name` in `0.0..=1.0`.
  fn progress(&self, name: &str) -> f32;

  /// Releases one reference to `name`.
  fn unload(&mut self, name: &str);

  fn try_recv(&mut self) -> Option<LoaderEvent>;
}
