//! Level button state derived from player progress.
//!
//! A button's tier is its distance, in levels, from the nearest completed
//! level before it. The first level of the game counts as reachable from
//! nothing, so a fresh profile sees it as `Current`.

use std::sync::Arc;

use bevy::log::warn;

use crate::catalog::{CatalogError, LevelId, LevelMeta, SegmentCatalog, SegmentId};
use crate::loader::ButtonAnchor;
use crate::progress::{LevelProgress, ProgressOracle};

/// Levels walked back looking for a completed predecessor.
const TIER_LOOKBACK: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ButtonTier {
  Completed,
  /// Playable now.
  Current,
  Next,
  NextToNext,
  FarAway,
}

impl ButtonTier {
  /// Tier of a level `distance` steps after the nearest completed one.
  pub fn at_distance(distance: u32) -> Self {
    match distance {
      0 => ButtonTier::Completed,
      1 => ButtonTier::Current,
      2 => ButtonTier::Next,
      3 => ButtonTier::NextToNext,
      _ => ButtonTier::FarAway,
    }
  }

  /// Whether clicking the button may start the level.
  pub fn is_playable(self) -> bool {
    matches!(self, ButtonTier::Completed | ButtonTier::Current)
  }
}

/// Classifies levels against the catalog and the player's progress.
#[derive(Clone)]
pub struct ButtonStateEngine {
  catalog: Arc<dyn SegmentCatalog>,
  progress: Arc<dyn ProgressOracle>,
}

impl ButtonStateEngine {
  pub fn new(catalog: Arc<dyn SegmentCatalog>, progress: Arc<dyn ProgressOracle>) -> Self {
    Self { catalog, progress }
  }

  pub fn catalog(&self) -> &dyn SegmentCatalog {
    self.catalog.as_ref()
  }

  pub fn progress(&self) -> &dyn ProgressOracle {
    self.progress.as_ref()
  }

  pub fn classify(&self, level: LevelId) -> Result<ButtonTier, CatalogError> {
    if self.progress.is_completed(level) {
      return Ok(ButtonTier::Completed);
    }

    let mut cursor = level;
    for step in 1..=TIER_LOOKBACK {
      match self.catalog.previous_level(cursor) {
        None => {
          // start of the chain: nothing to complete before this level
          if self.catalog.level_meta(cursor).is_none() {
            return Err(CatalogError::UnknownLevel(cursor));
          }
          return Ok(ButtonTier::at_distance(step));
        }
        Some(previous) if self.progress.is_completed(previous) => {
          return Ok(ButtonTier::at_distance(step));
        }
        Some(previous) => cursor = previous,
      }
    }
    Ok(ButtonTier::FarAway)
  }

  /// A level closes its segment when it is basic and no basic level follows
  /// it inside the same segment.
  pub fn is_last_on_segment(&self, meta: &LevelMeta) -> bool {
    if meta.is_extra {
      return false;
    }
    match self.catalog.next_basic_level(meta.id) {
      None => true,
      Some(next) => self
        .catalog
        .level_meta(next)
        .is_none_or(|next| next.segment != meta.segment),
    }
  }
}

/// Whether a segment is the one the player is working through: its first
/// basic level is reachable and its last basic level is not completed.
pub fn is_current_segment(first: ButtonTier, last: ButtonTier) -> bool {
  first.is_playable() && last != ButtonTier::Completed
}

/// One button of a loaded segment.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelButton {
  pub meta: LevelMeta,
  pub anchor: ButtonAnchor,
  pub progress: LevelProgress,
  pub tier: ButtonTier,
  /// The segment's last basic level, guarded by the star wall.
  pub is_gate: bool,
}

/// Presentation variant of a button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonVisual {
  pub tier: ButtonTier,
  pub extra: bool,
  /// Stars shown on completed buttons of the current segment.
  pub star_badge: Option<u32>,
  /// Stars still missing, shown on the gate button.
  pub wall_counter: Option<u32>,
  /// Gate buttons are drawn larger.
  pub enlarged: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
  StartLevel { level: LevelId, stars: u32 },
  NotEnoughStars { level: LevelId, remaining: u32 },
  /// Button is locked.
  Ignored,
}

/// Button model of one ready segment.
#[derive(Clone, Debug)]
pub struct SegmentButtons {
  segment: SegmentId,
  buttons: Vec<LevelButton>,
  gained_stars: u32,
  star_wall: u32,
  is_current: bool,
}

impl SegmentButtons {
  /// Builds buttons for the anchors of a payload. Anchors for unknown,
  /// disabled or foreign levels are skipped.
  pub fn build(
    segment: &SegmentId,
    anchors: &[ButtonAnchor],
    engine: &ButtonStateEngine,
  ) -> Result<Self, CatalogError> {
    let mut buttons = Vec::with_capacity(anchors.len());
    for anchor in anchors {
      let Some(meta) = engine.catalog().level_meta(anchor.level) else {
        warn!(
          "segment {} has a button for unknown level {}",
          segment, anchor.level
        );
        continue;
      };
      if meta.is_disabled {
        continue;
      }
      if &meta.segment != segment {
        warn!(
          "segment {} has a button for level {} of segment {}",
          segment, anchor.level, meta.segment
        );
        continue;
      }

      let tier = engine.classify(meta.id)?;
      let is_gate = engine.is_last_on_segment(&meta);
      buttons.push(LevelButton {
        progress: LevelProgress::read(engine.progress(), meta.id),
        anchor: *anchor,
        meta,
        tier,
        is_gate,
      });
    }

    let gained_stars = buttons.iter().map(|b| b.progress.stars).sum();
    let star_wall = buttons
      .first()
      .map(|b| b.meta.star_wall_height)
      .unwrap_or(0);

    let basic = || buttons.iter().filter(|b| !b.meta.is_extra);
    let first = basic().min_by_key(|b| b.meta.ordinal);
    let last = basic().max_by_key(|b| b.meta.ordinal);
    let is_current = match (first, last) {
      (Some(first), Some(last)) => is_current_segment(first.tier, last.tier),
      _ => false,
    };

    Ok(Self {
      segment: segment.clone(),
      buttons,
      gained_stars,
      star_wall,
      is_current,
    })
  }

  pub fn segment(&self) -> &SegmentId {
    &self.segment
  }

  pub fn buttons(&self) -> &[LevelButton] {
    &self.buttons
  }

  pub fn get(&self, level: LevelId) -> Option<&LevelButton> {
    self.buttons.iter().find(|b| b.meta.id == level)
  }

  pub fn gained_stars(&self) -> u32 {
    self.gained_stars
  }

  /// Stars still needed to open the gate.
  pub fn remaining_stars(&self) -> u32 {
    self.star_wall.saturating_sub(self.gained_stars)
  }

  pub fn is_current(&self) -> bool {
    self.is_current
  }

  pub fn click(&self, level: LevelId) -> Result<ClickOutcome, CatalogError> {
    let button = self.get(level).ok_or_else(|| CatalogError::MissingButton {
      level,
      segment: self.segment.clone(),
    })?;

    if !button.tier.is_playable() {
      return Ok(ClickOutcome::Ignored);
    }
    let remaining = self.remaining_stars();
    if button.is_gate && remaining > 0 {
      return Ok(ClickOutcome::NotEnoughStars { level, remaining });
    }
    Ok(ClickOutcome::StartLevel {
      level,
      stars: button.progress.stars,
    })
  }

  pub fn visual(&self, button: &LevelButton) -> ButtonVisual {
    let star_badge = (button.tier == ButtonTier::Completed
      && button.progress.stars > 0
      && self.is_current)
      .then_some(button.progress.stars);
    let walled = button.is_gate && self.star_wall > 0;
    let remaining = self.remaining_stars();
    ButtonVisual {
      tier: button.tier,
      extra: button.meta.is_extra,
      star_badge,
      wall_counter: (walled && remaining > 0).then_some(remaining),
      enlarged: walled,
    }
  }
}
