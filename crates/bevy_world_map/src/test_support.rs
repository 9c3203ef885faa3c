//! Fixtures shared by unit tests.

use crate::catalog::{CatalogConfig, LevelEntry, LevelId, SegmentEntry, SegmentId, StaticCatalog};
use crate::loader::{ButtonAnchor, SegmentPayload};

/// `segments` segments named `s0..`, each holding `levels_per` basic levels
/// numbered from 1 in game order.
pub fn chain_catalog(segments: usize, levels_per: usize) -> StaticCatalog {
  chain_catalog_with_wall(segments, levels_per, 0)
}

pub fn chain_catalog_with_wall(segments: usize, levels_per: usize, star_wall: u32) -> StaticCatalog {
  let mut next_level = 1;
  let config = CatalogConfig {
    segments: (0..segments)
      .map(|s| SegmentEntry {
        id: segment(s),
        star_wall,
        levels: (0..levels_per)
          .map(|_| {
            let id = LevelId(next_level);
            next_level += 1;
            LevelEntry {
              id,
              extra: false,
              disabled: false,
            }
          })
          .collect(),
      })
      .collect(),
  };
  StaticCatalog::new(config).unwrap()
}

pub fn segment(index: usize) -> SegmentId {
  SegmentId::new(format!("s{index}"))
}

pub fn asset(index: usize) -> String {
  format!("biome_map_s{index}")
}

/// Payload 100 units tall with no buttons.
pub fn payload(width: f32) -> SegmentPayload {
  SegmentPayload {
    width,
    height: 100.0,
    leading_stub: 0.0,
    buttons: Vec::new(),
  }
}

/// Payload 100 units tall with one button per level, evenly spread.
pub fn payload_with_levels(width: f32, levels: impl IntoIterator<Item = u32>) -> SegmentPayload {
  let levels: Vec<u32> = levels.into_iter().collect();
  let step = width / (levels.len() as f32 + 1.0);
  SegmentPayload {
    width,
    height: 100.0,
    leading_stub: 0.0,
    buttons: levels
      .iter()
      .enumerate()
      .map(|(i, level)| ButtonAnchor {
        level: LevelId(*level),
        x: step * (i as f32 + 1.0),
        y: 50.0,
      })
      .collect(),
  }
}
