//! World Map - scroll-driven segment streaming for Bevy.
//!
//! The map is a horizontal chain of segments. A sliding window keeps a few
//! of them loaded around the player, splices finished downloads in when the
//! finger is up, and derives level buttons from the player's progress.

pub mod buttons;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod coords;
pub mod curve;
pub mod loader;
pub mod plugin;
pub mod progress;
#[cfg(test)]
mod test_support;
pub mod viewport;
pub mod window;

pub use buttons::{
  ButtonStateEngine, ButtonTier, ButtonVisual, ClickOutcome, LevelButton, SegmentButtons,
  is_current_segment,
};
pub use catalog::{
  CatalogConfig, CatalogError, LevelEntry, LevelId, LevelMeta, SegmentCatalog, SegmentEntry,
  SegmentId, StaticCatalog,
};
pub use config::{ConfigError, WorldMapConfig};
pub use controller::{FrameReport, MapError, MapEvent, RetryPrompt, WorldMap};
pub use coords::{Direction, Span};
pub use curve::KeyframeCurve;
#[cfg(not(target_family = "wasm"))]
pub use loader::FileSegmentLoader;
pub use loader::{
  ButtonAnchor, LoadFailure, LoaderEvent, ManualLoader, SegmentLoader, SegmentPayload,
};
pub use plugin::{
  CompleteIndicatorClicked, CurrentSegmentChanged, LevelButtonClicked, LevelStartRequested,
  MapCamera, MapControl, MapFrame, MapViewport, NotEnoughStars, OpenWorldMap, ReloadRequested,
  RetryDecisionMade, RetryPromptRequested, SegmentActivation, SegmentLoadFailed, WindowChanged,
  WorldMapFailed, WorldMapPlugin, WorldMapReady, WorldMapSet,
};
pub use progress::{LevelProgress, ProfileProgress, ProgressOracle, cursor_level};
pub use viewport::{
  Activation, CompleteView, IndicatorState, MotionType, PreloaderView, ScrollBounds, Viewport,
  ViewportTracker, WindowCommand,
};
pub use window::{
  InitError, InitPoll, InitTask, RetryDecision, Segment, SegmentExtent, SegmentState,
  SegmentWindow, SlotId, SpliceGate, WindowEvent,
};
