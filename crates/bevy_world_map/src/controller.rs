//! Per-frame driver of the world map.
//!
//! [`WorldMap`] owns the segment window, the viewport tracker and the button
//! engine. It is the only caller of window mutations: tracker decisions come
//! back as [`WindowCommand`]s and are applied here, in a fixed order:
//!
//! 1. drain loader events
//! 2. poll the init task
//! 3. splice promotion (gate checked once)
//! 4. current-segment change and rebalance
//! 5. bounds computation
//! 6. positioning and activation
//! 7. scroll bounds and edge-swipe retry
//! 8. preloader and load-complete indicator

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bevy::log::{debug, error, info, warn};
use bevy::math::Vec2;
use bevy::prelude::Resource;

use crate::buttons::{ButtonStateEngine, ClickOutcome, SegmentButtons};
use crate::catalog::{CatalogError, LevelId, SegmentCatalog, SegmentId};
use crate::config::WorldMapConfig;
use crate::coords::Direction;
use crate::loader::SegmentLoader;
use crate::progress::{ProgressOracle, cursor_level};
use crate::viewport::{
  Activation, CompleteView, IndicatorState, PreloaderView, ScrollBounds, Viewport,
  ViewportTracker, WindowCommand,
};
use crate::window::{
  InitError, InitPoll, InitTask, RetryDecision, SegmentWindow, SlotId, SpliceGate, WindowEvent,
};

/// Fatal map errors. The map stops ticking until restarted with
/// [`WorldMap::begin`].
#[derive(Debug, Clone, PartialEq)]
pub enum MapError {
  Catalog(CatalogError),
  Init(InitError),
}

impl fmt::Display for MapError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MapError::Catalog(e) => write!(f, "world map data error: {e}"),
      MapError::Init(e) => write!(f, "world map init failed: {e}"),
    }
  }
}

impl std::error::Error for MapError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      MapError::Catalog(e) => Some(e),
      MapError::Init(e) => Some(e),
    }
  }
}

impl From<CatalogError> for MapError {
  fn from(e: CatalogError) -> Self {
    MapError::Catalog(e)
  }
}

impl From<InitError> for MapError {
  fn from(e: InitError) -> Self {
    MapError::Init(e)
  }
}

/// Retry prompt for the dialog layer.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPrompt {
  pub segments: Vec<SegmentId>,
  /// Init prompts block the map until [`WorldMap::decide_retry`] is called.
  pub blocking: bool,
}

impl RetryPrompt {
  pub fn message(&self) -> String {
    match self.segments.as_slice() {
      [single] => format!("Failed to load map fragment {single}"),
      many => {
        let names: Vec<&str> = many.iter().map(SegmentId::as_str).collect();
        format!("Failed to load map fragments {}", names.join(", "))
      }
    }
  }
}

/// Something that happened during a tick.
#[derive(Clone, Debug, PartialEq)]
pub enum MapEvent {
  /// Init finished; the map is interactive.
  Ready { cursor: LevelId },
  CurrentSegmentChanged { slot: SlotId, segment: Option<SegmentId> },
  WindowChanged { is_init: bool, newly_ready: Vec<SlotId> },
  SegmentLoadFailed { slot: SlotId, segment: SegmentId },
  ReloadRequested { direction: Direction, segment: Option<SegmentId> },
  RetryPrompt(RetryPrompt),
  Activation(Activation),
  SegmentRemoved { slot: SlotId },
}

/// Output of one [`WorldMap::tick`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
  pub events: Vec<MapEvent>,
  pub scroll: Option<ScrollBounds>,
  /// Present while the preloader is on screen.
  pub preloader: Option<PreloaderView>,
  pub complete: Option<CompleteView>,
  /// Viewport center the camera must take this frame.
  pub forced_center: Option<f32>,
  pub input_locked: bool,
}

#[derive(Debug)]
enum Phase {
  Idle,
  Initializing { task: InitTask, cursor: LevelId },
  Running,
  Failed,
}

/// The world map state, inserted as a resource by the app.
#[derive(Resource)]
pub struct WorldMap {
  window: SegmentWindow,
  tracker: ViewportTracker,
  engine: ButtonStateEngine,
  buttons: HashMap<SlotId, SegmentButtons>,
  phase: Phase,
  paused: bool,
  load_enabled: bool,
}

impl WorldMap {
  pub fn new(
    config: &WorldMapConfig,
    catalog: Arc<dyn SegmentCatalog>,
    progress: Arc<dyn ProgressOracle>,
    loader: Box<dyn SegmentLoader>,
  ) -> Self {
    Self {
      window: SegmentWindow::from_config(config, catalog.clone(), loader),
      tracker: ViewportTracker::new(config),
      engine: ButtonStateEngine::new(catalog, progress),
      buttons: HashMap::new(),
      phase: Phase::Idle,
      paused: false,
      load_enabled: true,
    }
  }

  /// Opens the map on the cursor level and starts loading its window.
  pub fn begin(&mut self, last_played: Option<LevelId>) -> Result<LevelId, CatalogError> {
    let catalog = self.engine.catalog();
    let cursor = cursor_level(last_played, self.engine.progress(), catalog).ok_or(CatalogError::Empty)?;
    let meta = catalog
      .level_meta(cursor)
      .ok_or(CatalogError::UnknownLevel(cursor))?;

    info!("opening world map on level {} in {}", cursor, meta.segment);
    self.tracker.reset();
    self.buttons.clear();
    let task = self.window.initialize(meta.segment);
    self.phase = Phase::Initializing { task, cursor };
    Ok(cursor)
  }

  /// Runs one frame.
  pub fn tick(&mut self, viewport: &Viewport, dt: f32) -> Result<FrameReport, MapError> {
    let mut report = FrameReport::default();
    if matches!(self.phase, Phase::Idle | Phase::Failed) {
      return Ok(report);
    }

    self.window.drain_loader();

    let result = self.frame(viewport, dt, &mut report);
    if let Err(e) = &result {
      error!("{}", e);
      self.phase = Phase::Failed;
    }
    result.map(|()| report)
  }

  fn frame(&mut self, viewport: &Viewport, dt: f32, report: &mut FrameReport) -> Result<(), MapError> {
    let mut init_done = None;
    if let Phase::Initializing { task, cursor } = &mut self.phase {
      match task.poll(&mut self.window)? {
        InitPoll::Pending => {}
        InitPoll::Prompt(failed) => report.events.push(MapEvent::RetryPrompt(RetryPrompt {
          segments: failed,
          blocking: true,
        })),
        InitPoll::Complete => init_done = Some(*cursor),
      }
    }

    let gate = SpliceGate {
      dragging: viewport.dragging,
      paused: self.paused,
      load_enabled: self.load_enabled,
    };
    self.window.promote_pending(&gate);

    if let Some(cursor) = init_done {
      self.finish_init(cursor, viewport, report)?;
    }
    if !matches!(self.phase, Phase::Running) || self.paused {
      return Ok(());
    }

    if let Some(WindowCommand::Rebalance(slot)) = self.tracker.detect_current_change(&self.window, viewport) {
      self.window.rebalance(slot);
      let segment = self.window.get(slot).and_then(|s| s.id().cloned());
      debug!("current segment is now {:?} in {}", segment, slot);
      report
        .events
        .push(MapEvent::CurrentSegmentChanged { slot, segment });
    }
    self.handle_window_events(report);

    let change = self.window.on_window_changed(false, viewport.height);
    self.build_buttons(&change.newly_ready)?;
    self.tracker.place(&self.window, viewport);
    if !change.newly_ready.is_empty() {
      self.tracker.after_window_changed(&self.window, viewport);
      report.events.push(MapEvent::WindowChanged {
        is_init: false,
        newly_ready: change.newly_ready,
      });
    }

    for activation in self.tracker.update_activation(&self.window, viewport) {
      report.events.push(MapEvent::Activation(activation));
    }

    report.scroll = self.tracker.scroll_bounds(&self.window, viewport);
    if let Some(WindowCommand::Reload(direction)) = self.tracker.reload_swipe(&self.window, viewport)
      && self.window.reload(direction)
    {
      let segment = self.window.neighbor(direction).and_then(|s| s.id().cloned());
      info!("retrying {:?} neighbor {:?} after edge swipe", direction, segment);
      report
        .events
        .push(MapEvent::ReloadRequested { direction, segment });
    }

    let preloader = self
      .tracker
      .update_preloader(&self.window, report.scroll.as_ref(), viewport, dt);
    report.preloader = (preloader.state != IndicatorState::Hidden).then_some(preloader);
    report.complete = self.tracker.update_complete(&self.window, viewport);
    report.forced_center = self.tracker.advance_scroll(dt);
    report.input_locked = self.tracker.is_input_locked();
    Ok(())
  }

  fn finish_init(&mut self, cursor: LevelId, viewport: &Viewport, report: &mut FrameReport) -> Result<(), MapError> {
    let change = self.window.on_window_changed(true, viewport.height);
    self.build_buttons(&change.newly_ready)?;

    let current = self
      .window
      .current_segment()
      .filter(|s| s.id().is_some())
      .ok_or(CatalogError::UnknownLevel(cursor))?;
    let segment = current.id().cloned().ok_or(CatalogError::UnknownLevel(cursor))?;
    let anchor = current
      .payload()
      .and_then(|p| p.anchor(cursor))
      .ok_or_else(|| CatalogError::MissingButton {
        level: cursor,
        segment: segment.clone(),
      })?;
    let anchor_x = anchor.x;
    self.tracker.anchor_local_x(&self.window, anchor_x, viewport);
    self.tracker.place(&self.window, viewport);

    self.phase = Phase::Running;
    info!("world map ready on {} (level {})", segment, cursor);
    report.events.push(MapEvent::Ready { cursor });
    report.events.push(MapEvent::WindowChanged {
      is_init: true,
      newly_ready: change.newly_ready,
    });
    Ok(())
  }

  fn handle_window_events(&mut self, report: &mut FrameReport) {
    let preloader_visible = self.tracker.loading().is_visible();
    for event in self.window.drain_events() {
      match event {
        WindowEvent::LoadFailed { slot, segment } => {
          warn!("map fragment {} failed to load", segment);
          if preloader_visible {
            report.events.push(MapEvent::RetryPrompt(RetryPrompt {
              segments: vec![segment.clone()],
              blocking: false,
            }));
          }
          report
            .events
            .push(MapEvent::SegmentLoadFailed { slot, segment });
        }
        WindowEvent::Removed { slot, .. } => {
          self.buttons.remove(&slot);
          report.events.push(MapEvent::SegmentRemoved { slot });
        }
        WindowEvent::Spliced { .. } => {}
      }
    }
  }

  fn build_buttons(&mut self, slots: &[SlotId]) -> Result<(), CatalogError> {
    for &slot in slots {
      let Some(segment) = self.window.get(slot) else {
        continue;
      };
      let (Some(id), Some(payload)) = (segment.id(), segment.payload()) else {
        continue;
      };
      let buttons = SegmentButtons::build(id, &payload.buttons, &self.engine)?;
      self.buttons.insert(slot, buttons);
    }
    Ok(())
  }

  /// Answers a retry prompt. During init an abort is fatal; afterwards a
  /// retry re-issues every failed load and an abort is a no-op.
  pub fn decide_retry(&mut self, decision: RetryDecision) -> Result<(), MapError> {
    match &mut self.phase {
      Phase::Initializing { task, .. } => {
        if let Err(e) = task.decide(&mut self.window, decision) {
          error!("{}", e);
          self.phase = Phase::Failed;
          return Err(e.into());
        }
      }
      Phase::Running if decision == RetryDecision::Retry => {
        let reissued = self.window.retry_failed();
        info!("retrying {} failed map fragment(s)", reissued);
      }
      _ => {}
    }
    Ok(())
  }

  /// Resolves a tap on a level button.
  pub fn click_level(&self, level: LevelId) -> Result<ClickOutcome, CatalogError> {
    if self.tracker.is_input_locked() || !self.is_running() {
      return Ok(ClickOutcome::Ignored);
    }
    let meta = self
      .engine
      .catalog()
      .level_meta(level)
      .ok_or(CatalogError::UnknownLevel(level))?;
    let Some(buttons) = self
      .window
      .find_segment(&meta.segment)
      .and_then(|s| self.buttons.get(&s.slot()))
    else {
      debug!("click on level {} of unloaded segment {}", level, meta.segment);
      return Ok(ClickOutcome::Ignored);
    };
    buttons.click(level)
  }

  /// World position of a level's button center, with y measured from the
  /// map's vertical middle.
  pub fn button_world_position(&self, level: LevelId) -> Result<Vec2, CatalogError> {
    let meta = self
      .engine
      .catalog()
      .level_meta(level)
      .ok_or(CatalogError::UnknownLevel(level))?;
    let missing = || CatalogError::MissingButton {
      level,
      segment: meta.segment.clone(),
    };

    let segment = self.window.find_segment(&meta.segment).ok_or_else(missing)?;
    let extent = segment.extent().ok_or_else(missing)?;
    let payload = segment.payload().ok_or_else(missing)?;
    let anchor = payload.anchor(level).ok_or_else(missing)?;
    let center = self
      .tracker
      .layout()
      .placement(segment.slot())
      .ok_or_else(missing)?;

    Ok(Vec2::new(
      center - extent.width * 0.5 + extent.local_to_offset(anchor.x),
      (anchor.y - payload.height * 0.5) * extent.scale,
    ))
  }

  /// Starts the scroll towards the freshly loaded neighbor.
  pub fn complete_indicator_clicked(&mut self, viewport: &Viewport) -> bool {
    self.is_running() && self.tracker.click_complete(&self.window, viewport)
  }

  pub fn set_paused(&mut self, paused: bool) {
    self.paused = paused;
  }

  pub fn set_load_enabled(&mut self, enabled: bool) {
    self.load_enabled = enabled;
  }

  /// Unloads everything and returns to idle.
  pub fn shutdown(&mut self) {
    self.window.release_all();
    self.window.drain_events();
    self.tracker.reset();
    self.buttons.clear();
    self.phase = Phase::Idle;
  }

  pub fn is_running(&self) -> bool {
    matches!(self.phase, Phase::Running)
  }

  pub fn is_initializing(&self) -> bool {
    matches!(self.phase, Phase::Initializing { .. })
  }

  pub fn is_failed(&self) -> bool {
    matches!(self.phase, Phase::Failed)
  }

  pub fn is_paused(&self) -> bool {
    self.paused
  }

  pub fn window(&self) -> &SegmentWindow {
    &self.window
  }

  pub fn tracker(&self) -> &ViewportTracker {
    &self.tracker
  }

  pub fn engine(&self) -> &ButtonStateEngine {
    &self.engine
  }

  pub fn buttons(&self, slot: SlotId) -> Option<&SegmentButtons> {
    self.buttons.get(&slot)
  }

  /// Button models of every ready segment with their world centers.
  pub fn placed_buttons(&self) -> impl Iterator<Item = (f32, &SegmentButtons)> {
    self.buttons.iter().filter_map(|(slot, buttons)| {
      self
        .tracker
        .layout()
        .placement(*slot)
        .map(|x| (x, buttons))
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::loader::ManualLoader;
  use crate::progress::ProfileProgress;
  use crate::test_support::{asset, chain_catalog, chain_catalog_with_wall, payload_with_levels};
  use crate::window::SegmentState;

  const DT: f32 = 1.0 / 60.0;

  fn viewport(center_x: f32) -> Viewport {
    Viewport::new(center_x, 100.0, 100.0)
  }

  /// Six segments of two levels each: `s<i>` holds levels `2i+1` and `2i+2`.
  fn map(progress: ProfileProgress, catalog: crate::catalog::StaticCatalog) -> (WorldMap, ManualLoader) {
    let loader = ManualLoader::new();
    let config = WorldMapConfig {
      behind_count: 1,
      ahead_count: 1,
      ..WorldMapConfig::default()
    };
    let map = WorldMap::new(
      &config,
      Arc::new(catalog),
      Arc::new(progress),
      Box::new(loader.clone()),
    );
    (map, loader)
  }

  fn levels_of(segment: usize) -> [u32; 2] {
    let first = segment as u32 * 2 + 1;
    [first, first + 1]
  }

  fn complete(loader: &ManualLoader, segment: usize) {
    loader.complete(&asset(segment), payload_with_levels(200.0, levels_of(segment)));
  }

  /// Ticks until the map reports ready.
  fn run_until_ready(map: &mut WorldMap, vp: &Viewport) -> Vec<MapEvent> {
    let mut events = Vec::new();
    for _ in 0..5 {
      events.extend(map.tick(vp, DT).unwrap().events);
      if map.is_running() {
        break;
      }
    }
    events
  }

  #[test]
  fn opens_on_cursor_with_button_under_center() {
    let progress = ProfileProgress::new()
      .with_completed(LevelId(1), 3)
      .with_completed(LevelId(2), 3)
      .with_completed(LevelId(3), 1);
    let (mut map, loader) = map(progress, chain_catalog(6, 2));

    // level 4 is the second level of s1
    assert_eq!(map.begin(None), Ok(LevelId(4)));
    assert_eq!(loader.load_requests(), vec![asset(1), asset(0), asset(2)]);
    for segment in 0..3 {
      complete(&loader, segment);
    }

    let vp = viewport(0.0);
    let events = run_until_ready(&mut map, &vp);
    assert!(map.is_running());
    assert!(events.contains(&MapEvent::Ready { cursor: LevelId(4) }));

    let position = map.button_world_position(LevelId(4)).unwrap();
    assert!(position.x.abs() < 1e-4);
    assert_eq!(position.y, 0.0);
    assert_eq!(map.click_level(LevelId(4)), Ok(ClickOutcome::StartLevel {
      level: LevelId(4),
      stars: 0
    }));
    assert_eq!(map.click_level(LevelId(6)), Ok(ClickOutcome::Ignored));
  }

  #[test]
  fn init_failure_prompts_once_and_abort_is_fatal() {
    let (mut map, loader) = map(ProfileProgress::new(), chain_catalog(6, 2));
    map.begin(Some(LevelId(5))).unwrap();
    complete(&loader, 2);
    complete(&loader, 1);
    loader.fail(&asset(3), "offline");

    // first frame splices, second settles
    let vp = viewport(0.0);
    let events: Vec<MapEvent> = (0..2)
      .flat_map(|_| map.tick(&vp, DT).unwrap().events)
      .collect();
    let prompt = RetryPrompt {
      segments: vec![crate::test_support::segment(3)],
      blocking: true,
    };
    assert_eq!(events, vec![MapEvent::RetryPrompt(prompt.clone())]);
    assert_eq!(prompt.message(), "Failed to load map fragment s3");
    assert!(map.tick(&vp, DT).unwrap().events.is_empty());

    let err = map.decide_retry(RetryDecision::Abort).unwrap_err();
    assert!(matches!(err, MapError::Init(InitError::Aborted { .. })));
    assert!(map.is_failed());
    assert_eq!(map.tick(&vp, DT), Ok(FrameReport::default()));
  }

  #[test]
  fn init_retry_reloads_only_failed() {
    let (mut map, loader) = map(ProfileProgress::new(), chain_catalog(6, 2));
    map.begin(Some(LevelId(5))).unwrap();
    complete(&loader, 2);
    complete(&loader, 1);
    loader.fail(&asset(3), "offline");
    let vp = viewport(0.0);
    map.tick(&vp, DT).unwrap();
    map.tick(&vp, DT).unwrap();

    loader.clear_history();
    map.decide_retry(RetryDecision::Retry).unwrap();
    assert_eq!(loader.load_requests(), vec![asset(3)]);

    complete(&loader, 3);
    run_until_ready(&mut map, &vp);
    assert!(map.is_running());
  }

  #[test]
  fn missing_cursor_button_is_fatal() {
    let (mut map, loader) = map(ProfileProgress::new(), chain_catalog(3, 2));
    map.begin(Some(LevelId(3))).unwrap();
    loader.complete(&asset(1), payload_with_levels(200.0, [4]));
    complete(&loader, 0);
    complete(&loader, 2);

    let vp = viewport(0.0);
    let mut result = Ok(FrameReport::default());
    for _ in 0..3 {
      result = map.tick(&vp, DT);
      if result.is_err() {
        break;
      }
    }
    assert_eq!(
      result,
      Err(MapError::Catalog(CatalogError::MissingButton {
        level: LevelId(3),
        segment: crate::test_support::segment(1),
      }))
    );
    assert!(map.is_failed());
  }

  #[test]
  fn scrolling_right_rebalances_after_release() {
    let (mut map, loader) = map(ProfileProgress::new(), chain_catalog(6, 2));
    map.begin(Some(LevelId(5))).unwrap();
    for segment in 1..4 {
      complete(&loader, segment);
    }
    run_until_ready(&mut map, &viewport(0.0));
    let right = map.window().slots()[2].slot();

    // level 5 sits at local x 66.67 of s2; its span starts near -66.67
    let mut vp = viewport(200.0);
    vp.dragging = true;
    let report = map.tick(&vp, DT).unwrap();
    assert!(!report.events.iter().any(|e| matches!(e, MapEvent::CurrentSegmentChanged { .. })));

    loader.clear_history();
    vp.dragging = false;
    let report = map.tick(&vp, DT).unwrap();
    assert!(report.events.contains(&MapEvent::CurrentSegmentChanged {
      slot: right,
      segment: Some(crate::test_support::segment(3)),
    }));
    assert_eq!(map.window().current(), Some(right));
    assert_eq!(loader.unloads(), vec![asset(1)]);
    assert_eq!(loader.load_requests(), vec![asset(4)]);
  }

  #[test]
  fn steady_failure_prompts_only_with_preloader() {
    let (mut map, loader) = map(ProfileProgress::new(), chain_catalog(6, 2));
    map.begin(Some(LevelId(5))).unwrap();
    for segment in 1..4 {
      complete(&loader, segment);
    }
    run_until_ready(&mut map, &viewport(0.0));
    let right = map.window().slots()[2].slot();
    map.tick(&viewport(200.0), DT).unwrap();
    assert_eq!(map.window().current(), Some(right));

    loader.fail(&asset(4), "offline");
    let report = map.tick(&viewport(200.0), DT).unwrap();
    assert!(report.events.iter().any(|e| matches!(
      e,
      MapEvent::SegmentLoadFailed { segment, .. } if *segment == crate::test_support::segment(4)
    )));
    assert!(!report.events.iter().any(|e| matches!(e, MapEvent::RetryPrompt(_))));
    assert_eq!(
      map.window().neighbor(Direction::Right).map(|s| s.state()),
      Some(SegmentState::Failed)
    );
  }

  #[test]
  fn star_wall_blocks_gate_button() {
    let progress = ProfileProgress::new().with_completed(LevelId(1), 1);
    let (mut map, loader) = map(progress, chain_catalog_with_wall(3, 2, 5));
    map.begin(None).unwrap();
    for segment in 0..2 {
      complete(&loader, segment);
    }
    run_until_ready(&mut map, &viewport(0.0));

    assert_eq!(
      map.click_level(LevelId(2)),
      Ok(ClickOutcome::NotEnoughStars {
        level: LevelId(2),
        remaining: 4
      })
    );
    assert_eq!(map.click_level(LevelId(99)), Err(CatalogError::UnknownLevel(LevelId(99))));
  }

  #[test]
  fn shutdown_unloads_everything() {
    let (mut map, loader) = map(ProfileProgress::new(), chain_catalog(6, 2));
    map.begin(Some(LevelId(5))).unwrap();
    for segment in 1..4 {
      complete(&loader, segment);
    }
    run_until_ready(&mut map, &viewport(0.0));

    map.shutdown();
    let mut unloads = loader.unloads();
    unloads.sort();
    assert_eq!(unloads, vec![asset(1), asset(2), asset(3)]);
    assert!(!map.is_running());
    assert!(map.window().slots().is_empty());
  }
}
