//! Taps on buttons and indicators, keyboard commands and map feedback.

use bevy::{ecs::message::MessageReader, prelude::*, window::PrimaryWindow};
use bevy_enhanced_input::prelude::*;
use bevy_world_map::{
  CompleteIndicatorClicked, CurrentSegmentChanged, LevelButtonClicked, LevelStartRequested,
  MapCamera, MapControl, MapFrame, MapViewport, NotEnoughStars, OpenWorldMap, ReloadRequested,
  RetryDecision, RetryDecisionMade, RetryPromptRequested, SegmentActivation, SegmentLoadFailed,
  WindowChanged, WorldMap, WorldMapFailed, WorldMapReady,
};

use super::MapSources;
use super::draw::{BUTTON_RADIUS, INDICATOR_RADIUS, complete_indicator_position};
use super::scroll::ScrollDevice;
use crate::config::ConfigLoaded;
use crate::input::{Abort, MapInput, Reopen, Retry, ToggleLoading, TogglePause, is_held};

/// Retry prompt waiting for an answer.
#[derive(Resource, Debug, Default)]
pub struct PendingPrompt(pub Option<RetryPromptRequested>);

/// Held state of each one-shot key last frame.
#[derive(Default)]
pub struct HeldKeys {
  retry: bool,
  abort: bool,
  pause: bool,
  loading: bool,
  reopen: bool,
}

fn rising(held: &mut bool, now: bool) -> bool {
  let pressed = now && !*held;
  *held = now;
  pressed
}

/// System: turns a released tap into a button or indicator click.
#[allow(clippy::too_many_arguments)]
pub fn pick_taps(
  map: Res<WorldMap>,
  frame: Res<MapFrame>,
  viewport: Res<MapViewport>,
  config: Res<ConfigLoaded>,
  device: Res<ScrollDevice>,
  mouse_buttons: Res<ButtonInput<MouseButton>>,
  window_query: Query<&Window, With<PrimaryWindow>>,
  camera_query: Query<(&Camera, &GlobalTransform), With<MapCamera>>,
  mut level_clicks: MessageWriter<LevelButtonClicked>,
  mut complete_clicks: MessageWriter<CompleteIndicatorClicked>,
) {
  if !mouse_buttons.just_released(MouseButton::Left) || !device.is_tap() {
    return;
  }
  let Ok(window) = window_query.single() else {
    return;
  };
  let Ok((camera, camera_transform)) = camera_query.single() else {
    return;
  };
  let Some(cursor_pos) = window.cursor_position() else {
    return;
  };
  let Ok(world_pos) = camera.viewport_to_world_2d(camera_transform, cursor_pos) else {
    return;
  };

  if let Some(complete) = frame.0.complete
    && complete.clickable
  {
    let at = complete_indicator_position(
      &viewport.0,
      complete.side,
      config.map.preloader_edge_spacing,
    );
    if at.distance(world_pos) <= INDICATOR_RADIUS {
      complete_clicks.write(CompleteIndicatorClicked);
      return;
    }
  }

  let hit = map
    .placed_buttons()
    .flat_map(|(_, segment)| segment.buttons().iter().map(|b| b.meta.id))
    .find(|level| {
      map
        .button_world_position(*level)
        .is_ok_and(|at| at.distance(world_pos) <= BUTTON_RADIUS)
    });
  if let Some(level) = hit {
    level_clicks.write(LevelButtonClicked { level });
  }
}

/// System: retry/abort answers, pause and load switches, reopen.
#[allow(clippy::too_many_arguments)]
pub fn keyboard_commands(
  mut held: Local<HeldKeys>,
  mut prompt: ResMut<PendingPrompt>,
  mut control: ResMut<MapControl>,
  sources: Res<MapSources>,
  inputs: Query<&Actions<MapInput>>,
  retry: Query<&ActionState, With<Action<Retry>>>,
  abort: Query<&ActionState, With<Action<Abort>>>,
  pause: Query<&ActionState, With<Action<TogglePause>>>,
  loading: Query<&ActionState, With<Action<ToggleLoading>>>,
  reopen: Query<&ActionState, With<Action<Reopen>>>,
  mut decisions: MessageWriter<RetryDecisionMade>,
  mut open: MessageWriter<OpenWorldMap>,
) {
  let Ok(actions) = inputs.single() else {
    return;
  };

  let retry_pressed = rising(&mut held.retry, is_held(actions, &retry));
  let abort_pressed = rising(&mut held.abort, is_held(actions, &abort));
  if let Some(blocking) = prompt.0.as_ref().map(|p| p.blocking) {
    let decision = match (retry_pressed, abort_pressed) {
      (true, _) => Some(RetryDecision::Retry),
      (false, true) if blocking => Some(RetryDecision::Abort),
      _ => None,
    };
    if let Some(decision) = decision {
      info!("retry prompt answered: {:?}", decision);
      decisions.write(RetryDecisionMade(decision));
      prompt.0 = None;
    } else if abort_pressed {
      // steady prompts are dismissed without an answer
      prompt.0 = None;
    }
  }

  if rising(&mut held.pause, is_held(actions, &pause)) {
    control.toggle();
    info!("world map paused: {}", control.is_paused());
  }
  if rising(&mut held.loading, is_held(actions, &loading)) {
    let enabled = !control.is_load_enabled();
    control.set_load_enabled(enabled);
    info!("segment splicing enabled: {}", enabled);
  }
  if rising(&mut held.reopen, is_held(actions, &reopen)) {
    prompt.0 = None;
    open.write(OpenWorldMap {
      last_played: sources.last_played,
    });
  }
}

/// System: records retry prompts for the keyboard to answer.
pub fn track_prompts(
  mut prompt: ResMut<PendingPrompt>,
  mut prompts: MessageReader<RetryPromptRequested>,
) {
  for request in prompts.read() {
    if request.blocking {
      warn!("{} (R: retry, Esc: abort)", request.message);
    } else {
      warn!("{} (R: retry, Esc: dismiss)", request.message);
    }
    prompt.0 = Some(request.clone());
  }
}

/// Map output the demo only reports.
#[derive(bevy::ecs::system::SystemParam)]
pub struct MapReports<'w, 's> {
  ready: MessageReader<'w, 's, WorldMapReady>,
  failed: MessageReader<'w, 's, WorldMapFailed>,
  current: MessageReader<'w, 's, CurrentSegmentChanged>,
  window: MessageReader<'w, 's, WindowChanged>,
  load_failed: MessageReader<'w, 's, SegmentLoadFailed>,
  reload: MessageReader<'w, 's, ReloadRequested>,
  activation: MessageReader<'w, 's, SegmentActivation>,
  start: MessageReader<'w, 's, LevelStartRequested>,
  not_enough: MessageReader<'w, 's, NotEnoughStars>,
}

/// System: logs what the map reports.
pub fn log_map_messages(mut reports: MapReports, mut prompt: ResMut<PendingPrompt>) {
  for ready in reports.ready.read() {
    info!("world map ready on level {}", ready.cursor);
  }
  for failed in reports.failed.read() {
    error!("world map failed: {}", failed.reason);
    prompt.0 = None;
  }
  for change in reports.current.read() {
    match &change.segment {
      Some(segment) => info!("current segment is now {}", segment),
      None => info!("current segment is now an empty slot"),
    }
  }
  for change in reports.window.read() {
    debug!(
      "window changed (init: {}), {} segment(s) became ready",
      change.is_init,
      change.newly_ready.len()
    );
  }
  for failure in reports.load_failed.read() {
    warn!("segment {} failed to load", failure.segment);
  }
  for reload in reports.reload.read() {
    if let Some(segment) = &reload.segment {
      info!("reloading {} on the {:?} side", segment, reload.direction);
    }
  }
  for activation in reports.activation.read() {
    trace!("slot {:?} active: {}", activation.slot, activation.active);
  }
  for start in reports.start.read() {
    info!("start level {} (best: {} stars)", start.level, start.stars);
  }
  for wall in reports.not_enough.read() {
    info!(
      "level {} is behind a star wall, {} more star(s) needed",
      wall.level, wall.remaining
    );
  }
}
