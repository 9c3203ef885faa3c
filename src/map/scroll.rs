//! Scroll device: keyboard pan, mouse drag with inertia and the border
//! behavior the map asks for.

use bevy::{input::mouse::AccumulatedMouseMotion, prelude::*, window::PrimaryWindow};
use bevy_enhanced_input::prelude::*;
use bevy_world_map::{MapCamera, MapFrame, MapViewport, MotionType, ScrollBounds};

use crate::config::ConfigLoaded;
use crate::input::{MapInput, Pan};

/// Velocity decay per second after a drag is released.
const INERTIA_DECAY: f32 = 4.0;
/// Velocities below this (world units per second) stop the glide.
const MIN_VELOCITY: f32 = 1.0;
/// Cursor travel (logical pixels) under which a press counts as a tap.
pub const TAP_SLOP: f32 = 8.0;

#[derive(Resource, Debug, Default)]
pub struct ScrollDevice {
  pub velocity: f32,
  /// Cursor travel since the mouse went down.
  pub travel: f32,
  pub dragging: bool,
}

impl ScrollDevice {
  pub fn is_tap(&self) -> bool {
    self.travel < TAP_SLOP
  }
}

/// Range the camera center may take so the viewport stays inside `bounds`.
///
/// Content narrower than the viewport pins the center to its middle.
pub fn center_limits(bounds: &ScrollBounds, width: f32) -> (f32, f32) {
  let half = width * 0.5;
  let lo = bounds.span.min + half;
  let hi = bounds.span.max - half;
  if lo > hi {
    let center = bounds.span.center();
    (center, center)
  } else {
    (lo, hi)
  }
}

/// Applies the border rule to a proposed camera center.
///
/// Clamped borders stop hard. Elastic borders allow overscroll while the
/// finger is down and spring back once it is up.
pub fn constrain(
  center: f32,
  width: f32,
  bounds: Option<&ScrollBounds>,
  dragging: bool,
  spring: f32,
  dt: f32,
) -> f32 {
  let Some(bounds) = bounds else {
    return center;
  };
  let (lo, hi) = center_limits(bounds, width);
  let target = center.clamp(lo, hi);
  match bounds.motion {
    MotionType::Clamped => target,
    MotionType::Elastic if dragging => center,
    MotionType::Elastic => {
      let next = center + (target - center) * (spring * dt).min(1.0);
      if (next - target).abs() < 0.5 { target } else { next }
    }
  }
}

/// System: mouse drag, keyboard pan and inertia.
#[allow(clippy::too_many_arguments)]
pub fn scroll_camera(
  mut device: ResMut<ScrollDevice>,
  mut viewport: ResMut<MapViewport>,
  frame: Res<MapFrame>,
  config: Res<ConfigLoaded>,
  time: Res<Time>,
  mouse_buttons: Res<ButtonInput<MouseButton>>,
  motion: Res<AccumulatedMouseMotion>,
  windows: Query<&Window, With<PrimaryWindow>>,
  inputs: Query<&Actions<MapInput>>,
  pan_actions: Query<(&Action<Pan>, &ActionState)>,
  mut camera: Query<&mut Transform, With<MapCamera>>,
) {
  let Ok(mut transform) = camera.single_mut() else {
    return;
  };
  let dt = time.delta_secs();
  let width = viewport.0.width;
  let locked = frame.0.input_locked;

  if mouse_buttons.just_pressed(MouseButton::Left) {
    device.travel = 0.0;
    device.velocity = 0.0;
  }
  device.dragging = mouse_buttons.pressed(MouseButton::Left) && !locked;

  let mut center = transform.translation.x;
  if device.dragging {
    let world_per_pixel = windows
      .single()
      .map(|w| viewport.0.height / w.height().max(1.0))
      .unwrap_or(1.0);
    let delta = -motion.delta.x * world_per_pixel;
    device.travel += motion.delta.x.abs();
    center += delta;
    if dt > 0.0 {
      device.velocity = delta / dt;
    }
  } else if !locked {
    let mut pan = 0.0;
    for actions in &inputs {
      for entity in actions.iter() {
        if let Ok((action, state)) = pan_actions.get(entity)
          && matches!(state, ActionState::Fired | ActionState::Ongoing)
        {
          pan = **action;
        }
      }
    }
    if pan != 0.0 {
      device.velocity = 0.0;
      center += pan * config.camera.pan_speed * width * dt;
    } else {
      center += device.velocity * dt;
      device.velocity *= (-INERTIA_DECAY * dt).exp();
      if device.velocity.abs() < MIN_VELOCITY {
        device.velocity = 0.0;
      }
    }
  }

  let bounds = frame.0.scroll.as_ref();
  if bounds.is_some_and(|b| b.halt_velocity) {
    device.velocity = 0.0;
  }
  if !locked {
    center = constrain(center, width, bounds, device.dragging, config.camera.spring, dt);
  }

  transform.translation.x = center;
  viewport.0.center_x = center;
  viewport.0.dragging = device.dragging;
}

#[cfg(test)]
mod tests {
  use bevy_world_map::Span;

  use super::*;

  fn bounds(motion: MotionType) -> ScrollBounds {
    ScrollBounds {
      span: Span::new(-100.0, 500.0),
      motion,
      halt_velocity: false,
    }
  }

  #[test]
  fn limits_keep_viewport_inside_content() {
    assert_eq!(center_limits(&bounds(MotionType::Elastic), 200.0), (0.0, 400.0));
    assert_eq!(center_limits(&bounds(MotionType::Elastic), 800.0), (200.0, 200.0));
  }

  #[test]
  fn clamped_border_stops_hard() {
    let b = bounds(MotionType::Clamped);
    assert_eq!(constrain(450.0, 200.0, Some(&b), true, 10.0, 0.016), 400.0);
  }

  #[test]
  fn elastic_border_overscrolls_then_springs_back() {
    let b = bounds(MotionType::Elastic);
    assert_eq!(constrain(450.0, 200.0, Some(&b), true, 10.0, 0.016), 450.0);

    let released = constrain(450.0, 200.0, Some(&b), false, 10.0, 0.05);
    assert!(released < 450.0 && released > 400.0);
    assert_eq!(constrain(400.2, 200.0, Some(&b), false, 10.0, 0.05), 400.0);
  }

  #[test]
  fn no_bounds_leaves_center_alone() {
    assert_eq!(constrain(1e4, 200.0, None, false, 10.0, 0.016), 1e4);
  }
}
