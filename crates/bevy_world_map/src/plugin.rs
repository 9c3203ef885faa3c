//! Bevy integration for [`WorldMap`].
//!
//! The app inserts a [`WorldMap`] resource built from its catalog, progress
//! and loader, then sends [`OpenWorldMap`]. Every frame the plugin syncs the
//! viewport from the [`MapCamera`], applies control and input messages, ticks
//! the map and turns its report into messages.

use bevy::ecs::message::{MessageReader, MessageWriter};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::buttons::ClickOutcome;
use crate::catalog::{LevelId, SegmentId};
use crate::controller::{FrameReport, MapEvent, WorldMap};
use crate::coords::Direction;
use crate::viewport::Viewport;
use crate::window::{RetryDecision, SlotId};

/// Marker for the camera whose view drives the map.
#[derive(Component)]
pub struct MapCamera;

/// Viewport the map is ticked with.
///
/// Synced from the [`MapCamera`]'s orthographic area when one exists. The
/// input layer owns `dragging`.
#[derive(Resource, Clone, Copy, Debug)]
pub struct MapViewport(pub Viewport);

impl Default for MapViewport {
  fn default() -> Self {
    Self(Viewport::new(0.0, 1280.0, 720.0))
  }
}

/// Pauses the map or stops splicing new segments in.
///
/// While paused the map drains loads but neither splices nor tracks the
/// viewport.
#[derive(Resource, Debug)]
pub struct MapControl {
  paused: bool,
  load_enabled: bool,
}

impl Default for MapControl {
  fn default() -> Self {
    Self {
      paused: false,
      load_enabled: true,
    }
  }
}

impl MapControl {
  pub fn is_paused(&self) -> bool {
    self.paused
  }

  pub fn pause(&mut self) {
    self.paused = true;
  }

  pub fn resume(&mut self) {
    self.paused = false;
  }

  pub fn toggle(&mut self) {
    self.paused = !self.paused;
  }

  pub fn set_load_enabled(&mut self, enabled: bool) {
    self.load_enabled = enabled;
  }

  pub fn is_load_enabled(&self) -> bool {
    self.load_enabled
  }
}

/// Last frame's report, for presentation systems.
#[derive(Resource, Debug, Default)]
pub struct MapFrame(pub FrameReport);

/// Opens (or reopens) the map on the cursor level.
#[derive(Message, Clone, Debug, Default)]
pub struct OpenWorldMap {
  pub last_played: Option<LevelId>,
}

/// Answer to a [`RetryPromptRequested`].
#[derive(Message, Clone, Copy, Debug)]
pub struct RetryDecisionMade(pub RetryDecision);

#[derive(Message, Clone, Copy, Debug)]
pub struct LevelButtonClicked {
  pub level: LevelId,
}

#[derive(Message, Clone, Copy, Debug, Default)]
pub struct CompleteIndicatorClicked;

#[derive(Message, Clone, Debug)]
pub struct WorldMapReady {
  pub cursor: LevelId,
}

/// The map hit a fatal error and stopped.
#[derive(Message, Clone, Debug)]
pub struct WorldMapFailed {
  pub reason: String,
}

#[derive(Message, Clone, Debug)]
pub struct CurrentSegmentChanged {
  pub slot: SlotId,
  pub segment: Option<SegmentId>,
}

#[derive(Message, Clone, Debug)]
pub struct WindowChanged {
  pub is_init: bool,
  pub newly_ready: Vec<SlotId>,
}

#[derive(Message, Clone, Debug)]
pub struct SegmentLoadFailed {
  pub slot: SlotId,
  pub segment: SegmentId,
}

#[derive(Message, Clone, Debug)]
pub struct ReloadRequested {
  pub direction: Direction,
  pub segment: Option<SegmentId>,
}

#[derive(Message, Clone, Debug)]
pub struct RetryPromptRequested {
  pub segments: Vec<SegmentId>,
  pub message: String,
  /// Needs a [`RetryDecisionMade`] before the map continues.
  pub blocking: bool,
}

#[derive(Message, Clone, Copy, Debug)]
pub struct SegmentActivation {
  pub slot: SlotId,
  pub active: bool,
}

#[derive(Message, Clone, Copy, Debug)]
pub struct LevelStartRequested {
  pub level: LevelId,
  pub stars: u32,
}

#[derive(Message, Clone, Copy, Debug)]
pub struct NotEnoughStars {
  pub level: LevelId,
  pub remaining: u32,
}

/// System set of the per-frame map chain.
///
/// Runs in `Update`. Schedule camera and input systems **before** this set
/// so the map sees this frame's viewport.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorldMapSet;

/// Registers map messages, resources and the per-frame system chain.
///
/// Systems only run while a [`WorldMap`] resource exists.
pub struct WorldMapPlugin;

impl Plugin for WorldMapPlugin {
  fn build(&self, app: &mut App) {
    app
      .init_resource::<MapViewport>()
      .init_resource::<MapControl>()
      .init_resource::<MapFrame>()
      .add_message::<OpenWorldMap>()
      .add_message::<RetryDecisionMade>()
      .add_message::<LevelButtonClicked>()
      .add_message::<CompleteIndicatorClicked>()
      .add_message::<WorldMapReady>()
      .add_message::<WorldMapFailed>()
      .add_message::<CurrentSegmentChanged>()
      .add_message::<WindowChanged>()
      .add_message::<SegmentLoadFailed>()
      .add_message::<ReloadRequested>()
      .add_message::<RetryPromptRequested>()
      .add_message::<SegmentActivation>()
      .add_message::<LevelStartRequested>()
      .add_message::<NotEnoughStars>();

    app.add_systems(
      Update,
      (
        sync_viewport,
        apply_control,
        handle_inputs,
        tick_world_map,
        apply_forced_scroll,
      )
        .chain()
        .in_set(WorldMapSet)
        .run_if(resource_exists::<WorldMap>),
    );
  }
}

/// Map output messages, grouped to keep system signatures short.
#[derive(SystemParam)]
struct MapWriters<'w> {
  ready: MessageWriter<'w, WorldMapReady>,
  failed: MessageWriter<'w, WorldMapFailed>,
  current: MessageWriter<'w, CurrentSegmentChanged>,
  window: MessageWriter<'w, WindowChanged>,
  load_failed: MessageWriter<'w, SegmentLoadFailed>,
  reload: MessageWriter<'w, ReloadRequested>,
  prompt: MessageWriter<'w, RetryPromptRequested>,
  activation: MessageWriter<'w, SegmentActivation>,
}

/// System: copies the camera's visible area into [`MapViewport`].
fn sync_viewport(
  camera: Query<(&Transform, &Projection), With<MapCamera>>,
  mut viewport: ResMut<MapViewport>,
) {
  let Ok((transform, projection)) = camera.single() else {
    return;
  };
  let Projection::Orthographic(ortho) = projection else {
    return;
  };

  let width = ortho.area.max.x - ortho.area.min.x;
  let height = ortho.area.max.y - ortho.area.min.y;
  // area is computed after the first frame
  if width <= 0.0 || height <= 0.0 {
    return;
  }

  let vp = &mut viewport.0;
  vp.center_x = transform.translation.x;
  vp.width = width;
  vp.height = height;
}

/// System: open requests, retry answers and the pause switches.
fn apply_control(
  mut map: ResMut<WorldMap>,
  control: Res<MapControl>,
  mut open: MessageReader<OpenWorldMap>,
  mut decisions: MessageReader<RetryDecisionMade>,
  mut failed: MessageWriter<WorldMapFailed>,
) {
  map.set_paused(control.paused);
  map.set_load_enabled(control.load_enabled);

  if let Some(request) = open.read().last()
    && let Err(e) = map.begin(request.last_played)
  {
    error!("cannot open world map: {}", e);
    failed.write(WorldMapFailed {
      reason: e.to_string(),
    });
  }

  for RetryDecisionMade(decision) in decisions.read() {
    if let Err(e) = map.decide_retry(*decision) {
      failed.write(WorldMapFailed {
        reason: e.to_string(),
      });
    }
  }
}

/// System: button taps and the load-complete arrow.
fn handle_inputs(
  mut map: ResMut<WorldMap>,
  viewport: Res<MapViewport>,
  mut clicks: MessageReader<LevelButtonClicked>,
  mut complete_clicks: MessageReader<CompleteIndicatorClicked>,
  mut start: MessageWriter<LevelStartRequested>,
  mut not_enough: MessageWriter<NotEnoughStars>,
  mut failed: MessageWriter<WorldMapFailed>,
) {
  for click in clicks.read() {
    match map.click_level(click.level) {
      Ok(ClickOutcome::StartLevel { level, stars }) => {
        info!("starting level {}", level);
        start.write(LevelStartRequested { level, stars });
      }
      Ok(ClickOutcome::NotEnoughStars { level, remaining }) => {
        not_enough.write(NotEnoughStars { level, remaining });
      }
      Ok(ClickOutcome::Ignored) => {}
      Err(e) => {
        error!("level click failed: {}", e);
        map.shutdown();
        failed.write(WorldMapFailed {
          reason: e.to_string(),
        });
      }
    }
  }

  if complete_clicks.read().count() > 0 && !map.complete_indicator_clicked(&viewport.0) {
    debug!("load-complete indicator click ignored");
  }
}

/// System: runs one map frame and publishes its events.
fn tick_world_map(
  mut map: ResMut<WorldMap>,
  viewport: Res<MapViewport>,
  time: Res<Time>,
  mut frame: ResMut<MapFrame>,
  mut writers: MapWriters,
) {
  let report = match map.tick(&viewport.0, time.delta_secs()) {
    Ok(report) => report,
    Err(e) => {
      writers.failed.write(WorldMapFailed {
        reason: e.to_string(),
      });
      frame.0 = FrameReport::default();
      return;
    }
  };

  for event in &report.events {
    match event.clone() {
      MapEvent::Ready { cursor } => {
        writers.ready.write(WorldMapReady { cursor });
      }
      MapEvent::CurrentSegmentChanged { slot, segment } => {
        writers.current.write(CurrentSegmentChanged { slot, segment });
      }
      MapEvent::WindowChanged {
        is_init,
        newly_ready,
      } => {
        writers.window.write(WindowChanged {
          is_init,
          newly_ready,
        });
      }
      MapEvent::SegmentLoadFailed { slot, segment } => {
        writers.load_failed.write(SegmentLoadFailed { slot, segment });
      }
      MapEvent::ReloadRequested { direction, segment } => {
        writers.reload.write(ReloadRequested { direction, segment });
      }
      MapEvent::RetryPrompt(prompt) => {
        writers.prompt.write(RetryPromptRequested {
          message: prompt.message(),
          segments: prompt.segments,
          blocking: prompt.blocking,
        });
      }
      MapEvent::Activation(activation) => {
        writers.activation.write(SegmentActivation {
          slot: activation.slot,
          active: activation.active,
        });
      }
      MapEvent::SegmentRemoved { .. } => {}
    }
  }
  frame.0 = report;
}

/// System: moves the camera while a scroll-to-seam runs.
fn apply_forced_scroll(
  frame: Res<MapFrame>,
  mut viewport: ResMut<MapViewport>,
  mut camera: Query<&mut Transform, With<MapCamera>>,
) {
  let Some(center) = frame.0.forced_center else {
    return;
  };
  viewport.0.center_x = center;
  for mut transform in &mut camera {
    transform.translation.x = center;
  }
}
