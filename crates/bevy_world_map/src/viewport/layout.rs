//! World placement of ready segments.

use std::collections::HashMap;

use crate::coords::{Direction, Span};
use crate::window::{SegmentWindow, SlotId};

use super::Viewport;

/// Segment centers along X, anchored on the current segment.
///
/// The anchor is set on initialization and handed over when the current
/// segment changes; the new current keeps the placement it already had.
#[derive(Debug, Default)]
pub struct Layout {
  placements: HashMap<SlotId, f32>,
  anchor: Option<(SlotId, f32)>,
}

impl Layout {
  pub fn reset(&mut self) {
    self.placements.clear();
    self.anchor = None;
  }

  /// Pins `slot`'s center at `x`.
  pub fn anchor_on(&mut self, slot: SlotId, x: f32) {
    self.anchor = Some((slot, x));
    self.placements.insert(slot, x);
  }

  /// Moves the anchor to `slot`, keeping its current placement.
  pub fn reanchor(&mut self, slot: SlotId) -> bool {
    match self.placements.get(&slot) {
      Some(&x) => {
        self.anchor = Some((slot, x));
        true
      }
      None => false,
    }
  }

  pub fn anchor(&self) -> Option<SlotId> {
    self.anchor.map(|(slot, _)| slot)
  }

  pub fn placement(&self, slot: SlotId) -> Option<f32> {
    self.placements.get(&slot).copied()
  }

  /// World span of a placed, ready slot.
  pub fn span(&self, window: &SegmentWindow, slot: SlotId) -> Option<Span> {
    let x = self.placement(slot)?;
    let extent = window.get(slot)?.extent()?;
    Some(Span::centered(x, extent.width))
  }

  /// Recomputes placements of every ready slot outward from the anchor.
  ///
  /// Neighbors sit edge to edge. A slot that is not ready yet counts as a gap
  /// one viewport wide.
  pub fn place(&mut self, window: &SegmentWindow, viewport: &Viewport) {
    self.placements.clear();
    let Some((anchor_slot, anchor_x)) = self.anchor else {
      return;
    };
    let Some(anchor_index) = window.index_of(anchor_slot) else {
      return;
    };
    let Some(anchor_extent) = window.slots()[anchor_index].extent() else {
      return;
    };
    self.placements.insert(anchor_slot, anchor_x);

    for direction in [Direction::Left, Direction::Right] {
      let mut edge = anchor_x + direction.sign() * anchor_extent.width * 0.5;
      let indices: Vec<usize> = match direction {
        Direction::Left => (0..anchor_index).rev().collect(),
        Direction::Right => (anchor_index + 1..window.slots().len()).collect(),
      };
      for index in indices {
        let segment = &window.slots()[index];
        let width = match segment.extent() {
          Some(extent) => {
            self
              .placements
              .insert(segment.slot(), edge + direction.sign() * extent.width * 0.5);
            extent.width
          }
          None => viewport.width,
        };
        edge += direction.sign() * width;
      }
    }
  }

  /// Ready slot whose center is nearest `x`.
  pub fn nearest(&self, window: &SegmentWindow, x: f32) -> Option<SlotId> {
    window
      .slots()
      .iter()
      .filter(|s| s.is_ready())
      .filter_map(|s| self.placement(s.slot()).map(|p| (s.slot(), (p - x).abs())))
      .min_by(|a, b| a.1.total_cmp(&b.1))
      .map(|(slot, _)| slot)
  }
}
