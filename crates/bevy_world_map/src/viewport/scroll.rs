//! Scroll limits and programmatic scrolling.

use crate::coords::Span;
use crate::curve::KeyframeCurve;

/// How the scroll device treats the content border.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionType {
  /// Hard stop at the border. Used while a neighbor is still loading.
  Clamped,
  /// Overscroll allowed with spring-back.
  Elastic,
}

/// Scrollable range handed to the scroll device each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollBounds {
  pub span: Span,
  pub motion: MotionType,
  /// Kill inertia now: the viewport hit a border while the preloader shows.
  pub halt_velocity: bool,
}

/// Eased scroll of the viewport center towards a target.
#[derive(Clone, Debug, PartialEq)]
pub struct ScrollToPoint {
  from: f32,
  distance: f32,
  elapsed: f32,
  duration: f32,
}

impl ScrollToPoint {
  pub fn new(from: f32, target: f32, duration: f32) -> Self {
    Self {
      from,
      distance: target - from,
      elapsed: 0.0,
      duration: duration.max(f32::EPSILON),
    }
  }

  /// Advances by `dt` and returns the viewport center for this frame.
  pub fn advance(&mut self, dt: f32, curve: &KeyframeCurve) -> f32 {
    self.elapsed += dt;
    self.from + self.distance * curve.sample(self.elapsed / self.duration)
  }

  pub fn is_finished(&self) -> bool {
    self.elapsed >= self.duration
  }

  pub fn target(&self) -> f32 {
    self.from + self.distance
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reaches_target_after_duration() {
    let curve = KeyframeCurve::linear();
    let mut scroll = ScrollToPoint::new(10.0, 30.0, 1.0);

    assert_eq!(scroll.advance(0.5, &curve), 20.0);
    assert!(!scroll.is_finished());
    assert_eq!(scroll.advance(0.6, &curve), 30.0);
    assert!(scroll.is_finished());
    assert_eq!(scroll.target(), 30.0);
  }
}
