//! Horizontal map coordinates.
//!
//! The map is a one-dimensional strip: segments sit side by side along X and
//! every quantity the streaming logic cares about is a position or an extent
//! on that axis. Vertical layout is owned by the presentation layer.

use serde::{Deserialize, Serialize};

/// Direction along the segment chain.
///
/// `Left` walks towards predecessors (earlier levels), `Right` towards
/// successors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
  Left,
  Right,
}

impl Direction {
  pub fn opposite(self) -> Self {
    match self {
      Direction::Left => Direction::Right,
      Direction::Right => Direction::Left,
    }
  }

  /// -1 for left, +1 for right.
  pub fn sign(self) -> f32 {
    match self {
      Direction::Left => -1.0,
      Direction::Right => 1.0,
    }
  }
}

/// Closed horizontal interval `[min, max]` in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Span {
  pub min: f32,
  pub max: f32,
}

impl Span {
  pub const fn new(min: f32, max: f32) -> Self {
    Self { min, max }
  }

  /// Span of the given width centered on `center`.
  pub fn centered(center: f32, width: f32) -> Self {
    let half = width * 0.5;
    Self::new(center - half, center + half)
  }

  pub fn width(&self) -> f32 {
    self.max - self.min
  }

  pub fn center(&self) -> f32 {
    (self.min + self.max) * 0.5
  }

  pub fn contains(&self, x: f32) -> bool {
    x >= self.min && x <= self.max
  }

  /// The border facing `direction`.
  pub fn edge(&self, direction: Direction) -> f32 {
    match direction {
      Direction::Left => self.min,
      Direction::Right => self.max,
    }
  }
}
