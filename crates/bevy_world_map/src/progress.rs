//! Player progress as seen by the map.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::{LevelId, SegmentCatalog};
use crate::config::ConfigError;

/// Source of per-level completion data.
pub trait ProgressOracle: Send + Sync {
  fn is_completed(&self, level: LevelId) -> bool;

  fn stars_acquired(&self, level: LevelId) -> u32;

  /// Most recently completed level, if any.
  fn last_completed_level(&self) -> Option<LevelId>;
}

/// Snapshot of one level's progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelProgress {
  pub level: LevelId,
  pub completed: bool,
  pub stars: u32,
}

impl LevelProgress {
  pub fn read(oracle: &dyn ProgressOracle, level: LevelId) -> Self {
    Self {
      level,
      completed: oracle.is_completed(level),
      stars: oracle.stars_acquired(level),
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct CompletedLevel {
  level: LevelId,
  #[serde(default)]
  stars: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct ProfileFile {
  #[serde(default)]
  completed: Vec<CompletedLevel>,
}

/// In-memory profile. Completion order is preserved so the last entry is the
/// last completed level.
#[derive(Clone, Debug, Default)]
pub struct ProfileProgress {
  stars: HashMap<LevelId, u32>,
  last_completed: Option<LevelId>,
}

impl ProfileProgress {
  pub fn new() -> Self {
    Self::default()
  }

  /// Records a completion. Replaying a level keeps the best star count.
  pub fn complete(&mut self, level: LevelId, stars: u32) {
    let best = self.stars.entry(level).or_insert(0);
    *best = (*best).max(stars);
    self.last_completed = Some(level);
  }

  pub fn with_completed(mut self, level: LevelId, stars: u32) -> Self {
    self.complete(level, stars);
    self
  }

  /// Parses `[[completed]]` entries (`level`, `stars`) listed in completion
  /// order.
  pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
    let file: ProfileFile = toml::from_str(source)?;
    let mut progress = Self::new();
    for entry in file.completed {
      progress.complete(entry.level, entry.stars);
    }
    Ok(progress)
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let source = std::fs::read_to_string(path)?;
    Self::from_toml_str(&source)
  }
}

impl ProgressOracle for ProfileProgress {
  fn is_completed(&self, level: LevelId) -> bool {
    self.stars.contains_key(&level)
  }

  fn stars_acquired(&self, level: LevelId) -> u32 {
    self.stars.get(&level).copied().unwrap_or(0)
  }

  fn last_completed_level(&self) -> Option<LevelId> {
    self.last_completed
  }
}

/// Level the map opens on.
///
/// The last played level wins. Otherwise the basic level following the last
/// completed one (or the last completed one itself at the end of the game),
/// otherwise the first level. `None` only for an empty catalog.
pub fn cursor_level(
  last_played: Option<LevelId>,
  progress: &dyn ProgressOracle,
  catalog: &dyn SegmentCatalog,
) -> Option<LevelId> {
  if let Some(level) = last_played.filter(|level| catalog.level_meta(*level).is_some()) {
    return Some(level);
  }
  match progress.last_completed_level() {
    Some(last) => Some(catalog.next_basic_level(last).unwrap_or(last)),
    None => catalog.first_level(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::chain_catalog;

  #[test]
  fn replay_keeps_best_stars() {
    let progress = ProfileProgress::new()
      .with_completed(LevelId(1), 3)
      .with_completed(LevelId(2), 1)
      .with_completed(LevelId(1), 2);
    assert_eq!(progress.stars_acquired(LevelId(1)), 3);
    assert_eq!(progress.last_completed_level(), Some(LevelId(1)));
    assert!(!progress.is_completed(LevelId(3)));
    assert_eq!(progress.stars_acquired(LevelId(3)), 0);
  }

  #[test]
  fn parses_profile_file() {
    let progress = ProfileProgress::from_toml_str(
      r#"
[[completed]]
level = 1
stars = 2

[[completed]]
level = 2
"#,
    )
    .unwrap();
    assert_eq!(progress.last_completed_level(), Some(LevelId(2)));
    assert_eq!(
      LevelProgress::read(&progress, LevelId(1)),
      LevelProgress {
        level: LevelId(1),
        completed: true,
        stars: 2
      }
    );
  }

  #[test]
  fn cursor_prefers_last_played() {
    let catalog = chain_catalog(3, 3);
    let progress = ProfileProgress::new().with_completed(LevelId(1), 1);
    assert_eq!(
      cursor_level(Some(LevelId(5)), &progress, &catalog),
      Some(LevelId(5))
    );
  }

  #[test]
  fn cursor_follows_last_completed() {
    let catalog = chain_catalog(3, 3);
    let progress = ProfileProgress::new().with_completed(LevelId(3), 1);
    // level 3 closes the first segment; the cursor moves into the next one
    assert_eq!(cursor_level(None, &progress, &catalog), Some(LevelId(4)));
  }

  #[test]
  fn cursor_stays_on_final_level() {
    let catalog = chain_catalog(2, 2);
    let progress = ProfileProgress::new().with_completed(LevelId(4), 3);
    assert_eq!(cursor_level(None, &progress, &catalog), Some(LevelId(4)));
  }

  #[test]
  fn cursor_defaults_to_first_level() {
    let catalog = chain_catalog(2, 2);
    let progress = ProfileProgress::new();
    assert_eq!(cursor_level(None, &progress, &catalog), Some(LevelId(1)));
    assert_eq!(
      cursor_level(Some(LevelId(99)), &progress, &catalog),
      Some(LevelId(1))
    );
  }
}
