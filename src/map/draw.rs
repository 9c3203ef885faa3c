//! Gizmo rendering of segments, level buttons and the two indicators.

use bevy::prelude::*;
use bevy_world_map::{
  ButtonTier, Direction, IndicatorState, MapFrame, MapViewport, SegmentState, Viewport, WorldMap,
};

use crate::config::ConfigLoaded;

pub const BUTTON_RADIUS: f32 = 28.0;
pub const INDICATOR_RADIUS: f32 = 24.0;
const GATE_SCALE: f32 = 1.4;
const STAR_SPACING: f32 = 12.0;

fn tier_color(tier: ButtonTier) -> Color {
  match tier {
    ButtonTier::Completed => Color::srgb(0.95, 0.8, 0.2),
    ButtonTier::Current => Color::srgb(0.3, 0.9, 0.4),
    ButtonTier::Next => Color::srgb(0.3, 0.6, 0.9),
    ButtonTier::NextToNext => Color::srgb(0.25, 0.4, 0.6),
    ButtonTier::FarAway => Color::srgb(0.35, 0.35, 0.4),
  }
}

fn state_color(state: SegmentState) -> Color {
  match state {
    SegmentState::Ready => Color::srgb(0.4, 0.7, 0.5),
    SegmentState::Initializing => Color::srgb(0.6, 0.7, 0.4),
    SegmentState::Loading => Color::srgb(0.9, 0.7, 0.2),
    SegmentState::Failed => Color::srgb(0.9, 0.25, 0.2),
    SegmentState::Empty => Color::srgb(0.3, 0.3, 0.3),
  }
}

/// Where the load-complete arrow sits for the given side.
pub fn complete_indicator_position(viewport: &Viewport, side: Direction, spacing: f32) -> Vec2 {
  let edge = match side {
    Direction::Left => viewport.left(),
    Direction::Right => viewport.right(),
  };
  Vec2::new(edge - side.sign() * (spacing + INDICATOR_RADIUS), 0.0)
}

/// System: outlines every placed ready segment.
pub fn draw_segments(map: Res<WorldMap>, viewport: Res<MapViewport>, mut gizmos: Gizmos) {
  let window = map.window();
  let layout = map.tracker().layout();
  let current = window.current();

  for segment in window.slots() {
    let Some(span) = layout.span(window, segment.slot()) else {
      continue;
    };
    let mut color = state_color(segment.state());
    if Some(segment.slot()) != current {
      color = color.with_alpha(0.5);
    }
    gizmos.rect_2d(
      Vec2::new(span.center(), 0.0),
      Vec2::new(span.width(), viewport.0.height),
      color,
    );
  }
}

/// System: draws level buttons with their tier, stars and star-wall counter.
pub fn draw_buttons(map: Res<WorldMap>, mut gizmos: Gizmos) {
  for (_, segment) in map.placed_buttons() {
    for button in segment.buttons() {
      let Ok(at) = map.button_world_position(button.meta.id) else {
        continue;
      };
      let visual = segment.visual(button);
      let color = tier_color(visual.tier);
      let radius = if visual.enlarged {
        BUTTON_RADIUS * GATE_SCALE
      } else {
        BUTTON_RADIUS
      };

      if visual.extra {
        gizmos.rect_2d(at, Vec2::splat(radius * 1.6), color);
      } else {
        gizmos.circle_2d(at, radius, color);
      }

      if let Some(stars) = visual.star_badge {
        let first = at.x - STAR_SPACING * (stars.max(1) as f32 - 1.0) * 0.5;
        for i in 0..stars {
          let star = Vec2::new(first + STAR_SPACING * i as f32, at.y + radius + 8.0);
          gizmos.circle_2d(star, 4.0, Color::srgb(1.0, 0.9, 0.3));
        }
      }

      if let Some(missing) = visual.wall_counter {
        // one tick per missing star, capped to the button width
        let ticks = missing.min(10);
        for i in 0..ticks {
          let x = at.x - radius + (i as f32 + 0.5) * (2.0 * radius / ticks as f32);
          let y = at.y - radius - 10.0;
          gizmos.line_2d(Vec2::new(x, y), Vec2::new(x, y - 8.0), Color::srgb(0.9, 0.3, 0.3));
        }
      }
    }
  }
}

/// System: loading preloader and load-complete arrow.
pub fn draw_indicators(
  frame: Res<MapFrame>,
  viewport: Res<MapViewport>,
  config: Res<ConfigLoaded>,
  mut gizmos: Gizmos,
) {
  let vp = &viewport.0;
  let spacing = config.map.preloader_edge_spacing;

  if let Some(preloader) = frame.0.preloader
    && preloader.state != IndicatorState::Hidden
  {
    let edge = match preloader.side {
      Direction::Left => vp.left(),
      Direction::Right => vp.right(),
    };
    let sign = preloader.side.sign();
    // slides in from beyond the edge
    let x = edge + sign * (INDICATOR_RADIUS - (spacing + 2.0 * INDICATOR_RADIUS) * preloader.slide);
    let at = Vec2::new(x, 0.0);
    gizmos.circle_2d(at, INDICATOR_RADIUS, Color::srgb(0.8, 0.8, 0.8));
    if preloader.progress > 0.0 {
      gizmos.arc_2d(
        at,
        std::f32::consts::TAU * preloader.progress.clamp(0.0, 1.0),
        INDICATOR_RADIUS * 0.7,
        Color::srgb(0.3, 0.9, 0.4),
      );
    }
  }

  if let Some(complete) = frame.0.complete
    && complete.opacity > 0.0
  {
    let at = complete_indicator_position(vp, complete.side, spacing);
    let color = Color::srgb(0.3, 0.9, 0.4).with_alpha(complete.opacity.clamp(0.0, 1.0));
    let sign = complete.side.sign();
    let tip = at + Vec2::new(sign * INDICATOR_RADIUS, 0.0);
    let back = at - Vec2::new(sign * INDICATOR_RADIUS * 0.5, 0.0);
    gizmos.line_2d(back + Vec2::Y * INDICATOR_RADIUS, tip, color);
    gizmos.line_2d(back - Vec2::Y * INDICATOR_RADIUS, tip, color);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn complete_arrow_sits_inside_the_viewport() {
    let vp = Viewport::new(0.0, 200.0, 100.0);
    assert_eq!(
      complete_indicator_position(&vp, Direction::Right, 10.0),
      Vec2::new(100.0 - 10.0 - INDICATOR_RADIUS, 0.0)
    );
    assert_eq!(
      complete_indicator_position(&vp, Direction::Left, 10.0),
      Vec2::new(-100.0 + 10.0 + INDICATOR_RADIUS, 0.0)
    );
  }
}
