//! Static segment/level catalog.
//!
//! Segments form a linear chain known up front. Every level belongs to exactly
//! one segment; the game order of levels is the chain order of their segments,
//! then the order the levels are listed in within a segment.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Identifier of a map segment ("biome").
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub String);

impl SegmentId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for SegmentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Global level identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelId(pub u32);

impl fmt::Display for LevelId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Static metadata of one level.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelMeta {
  pub id: LevelId,
  pub segment: SegmentId,
  /// 1-based position within the segment.
  pub ordinal: u32,
  /// Optional side level; never part of the main path.
  pub is_extra: bool,
  pub is_disabled: bool,
  /// Stars needed to pass the segment's last basic level. Zero disables the
  /// wall.
  pub star_wall_height: u32,
}

/// Errors raised by catalog lookups. All of them indicate inconsistent game
/// data and are fatal for the map view.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
  /// A level id with no catalog entry.
  UnknownLevel(LevelId),
  /// A segment id with no catalog entry.
  UnknownSegment(SegmentId),
  /// A loaded segment payload has no button for the level.
  MissingButton { level: LevelId, segment: SegmentId },
  DuplicateLevel(LevelId),
  DuplicateSegment(SegmentId),
  /// The catalog has no levels at all.
  Empty,
}

impl fmt::Display for CatalogError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CatalogError::UnknownLevel(level) => write!(f, "unknown level {level}"),
      CatalogError::UnknownSegment(segment) => write!(f, "unknown segment {segment}"),
      CatalogError::MissingButton { level, segment } => {
        write!(f, "segment {segment} has no button for level {level}")
      }
      CatalogError::DuplicateLevel(level) => write!(f, "level {level} listed twice"),
      CatalogError::DuplicateSegment(segment) => write!(f, "segment {segment} listed twice"),
      CatalogError::Empty => write!(f, "catalog contains no levels"),
    }
  }
}

impl std::error::Error for CatalogError {}

/// Read-only view of the segment chain and level metadata.
pub trait SegmentCatalog: Send + Sync {
  fn previous_segment(&self, segment: &SegmentId) -> Option<SegmentId>;

  fn next_segment(&self, segment: &SegmentId) -> Option<SegmentId>;

  fn level_meta(&self, level: LevelId) -> Option<LevelMeta>;

  /// Previous level in game order, crossing segment boundaries. `None` for
  /// the very first level or an unknown id.
  fn previous_level(&self, level: LevelId) -> Option<LevelId>;

  /// Next non-extra level after `level` in game order.
  fn next_basic_level(&self, level: LevelId) -> Option<LevelId>;

  fn first_level(&self) -> Option<LevelId>;

  fn is_first_segment(&self, segment: &SegmentId) -> bool {
    self.previous_segment(segment).is_none()
  }

  /// Name the loader resolves for a segment.
  fn asset_name(&self, segment: &SegmentId) -> String {
    format!("biome_map_{segment}")
  }
}

/// TOML description of the chain.
///
/// ```toml
/// [[segments]]
/// id = "meadow"
/// star_wall = 12
///
/// [[segments.levels]]
/// id = 1
///
/// [[segments.levels]]
/// id = 101
/// extra = true
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
  #[serde(default)]
  pub segments: Vec<SegmentEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmentEntry {
  pub id: SegmentId,
  #[serde(default)]
  pub star_wall: u32,
  #[serde(default)]
  pub levels: Vec<LevelEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelEntry {
  pub id: LevelId,
  #[serde(default)]
  pub extra: bool,
  #[serde(default)]
  pub disabled: bool,
}

/// In-memory catalog built from a [`CatalogConfig`].
#[derive(Debug)]
pub struct StaticCatalog {
  segments: Vec<SegmentId>,
  segment_index: HashMap<SegmentId, usize>,
  /// All levels in game order.
  levels: Vec<LevelMeta>,
  level_index: HashMap<LevelId, usize>,
}

impl StaticCatalog {
  pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
    let mut segments = Vec::with_capacity(config.segments.len());
    let mut segment_index = HashMap::new();
    let mut levels = Vec::new();
    let mut level_index = HashMap::new();

    for entry in config.segments {
      if segment_index.insert(entry.id.clone(), segments.len()).is_some() {
        return Err(CatalogError::DuplicateSegment(entry.id));
      }
      for (i, level) in entry.levels.iter().enumerate() {
        if level_index.insert(level.id, levels.len()).is_some() {
          return Err(CatalogError::DuplicateLevel(level.id));
        }
        levels.push(LevelMeta {
          id: level.id,
          segment: entry.id.clone(),
          ordinal: i as u32 + 1,
          is_extra: level.extra,
          is_disabled: level.disabled,
          star_wall_height: entry.star_wall,
        });
      }
      segments.push(entry.id);
    }

    Ok(Self {
      segments,
      segment_index,
      levels,
      level_index,
    })
  }

  pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
    let config: CatalogConfig = toml::from_str(source)?;
    Ok(Self::new(config)?)
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let source = std::fs::read_to_string(path)?;
    Self::from_toml_str(&source)
  }

  /// Segment ids in chain order.
  pub fn segments(&self) -> &[SegmentId] {
    &self.segments
  }

  /// Levels of one segment in listed order.
  pub fn levels_of<'a>(&'a self, segment: &'a SegmentId) -> impl Iterator<Item = &'a LevelMeta> {
    self.levels.iter().filter(move |meta| &meta.segment == segment)
  }
}

impl SegmentCatalog for StaticCatalog {
  fn previous_segment(&self, segment: &SegmentId) -> Option<SegmentId> {
    let index = *self.segment_index.get(segment)?;
    index.checked_sub(1).map(|i| self.segments[i].clone())
  }

  fn next_segment(&self, segment: &SegmentId) -> Option<SegmentId> {
    let index = *self.segment_index.get(segment)?;
    self.segments.get(index + 1).cloned()
  }

  fn level_meta(&self, level: LevelId) -> Option<LevelMeta> {
    self.level_index.get(&level).map(|&i| self.levels[i].clone())
  }

  fn previous_level(&self, level: LevelId) -> Option<LevelId> {
    let index = *self.level_index.get(&level)?;
    index.checked_sub(1).map(|i| self.levels[i].id)
  }

  fn next_basic_level(&self, level: LevelId) -> Option<LevelId> {
    let index = *self.level_index.get(&level)?;
    self.levels[index + 1..]
      .iter()
      .find(|meta| !meta.is_extra)
      .map(|meta| meta.id)
  }

  fn first_level(&self) -> Option<LevelId> {
    self.levels.first().map(|meta| meta.id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const CHAIN: &str = r#"
[[segments]]
id = "meadow"
star_wall = 4

[[segments.levels]]
id = 1

[[segments.levels]]
id = 2

[[segments.levels]]
id = 50
extra = true

[[segments]]
id = "desert"

[[segments.levels]]
id = 3

[[segments.levels]]
id = 4
disabled = true
"#;

  fn catalog() -> StaticCatalog {
    StaticCatalog::from_toml_str(CHAIN).unwrap()
  }

  #[test]
  fn walks_segment_chain() {
    let catalog = catalog();
    let meadow = SegmentId::new("meadow");
    let desert = SegmentId::new("desert");

    assert_eq!(catalog.next_segment(&meadow), Some(desert.clone()));
    assert_eq!(catalog.previous_segment(&desert), Some(meadow.clone()));
    assert_eq!(catalog.previous_segment(&meadow), None);
    assert_eq!(catalog.next_segment(&desert), None);
    assert!(catalog.is_first_segment(&meadow));
    assert!(!catalog.is_first_segment(&desert));
    assert_eq!(catalog.next_segment(&SegmentId::new("tundra")), None);
  }

  #[test]
  fn previous_level_crosses_segments() {
    let catalog = catalog();
    assert_eq!(catalog.previous_level(LevelId(3)), Some(LevelId(50)));
    assert_eq!(catalog.previous_level(LevelId(2)), Some(LevelId(1)));
    assert_eq!(catalog.previous_level(LevelId(1)), None);
    assert_eq!(catalog.previous_level(LevelId(999)), None);
  }

  #[test]
  fn next_basic_level_skips_extras() {
    let catalog = catalog();
    assert_eq!(catalog.next_basic_level(LevelId(2)), Some(LevelId(3)));
    assert_eq!(catalog.next_basic_level(LevelId(4)), None);
    assert_eq!(catalog.first_level(), Some(LevelId(1)));
  }

  #[test]
  fn level_meta_carries_segment_settings() {
    let catalog = catalog();
    let meta = catalog.level_meta(LevelId(50)).unwrap();
    assert_eq!(meta.segment, SegmentId::new("meadow"));
    assert_eq!(meta.ordinal, 3);
    assert!(meta.is_extra);
    assert_eq!(meta.star_wall_height, 4);

    let disabled = catalog.level_meta(LevelId(4)).unwrap();
    assert!(disabled.is_disabled);
    assert_eq!(disabled.star_wall_height, 0);
  }

  #[test]
  fn rejects_duplicate_levels() {
    let source = r#"
[[segments]]
id = "a"
levels = [{ id = 1 }]

[[segments]]
id = "b"
levels = [{ id = 1 }]
"#;
    let err = StaticCatalog::from_toml_str(source).unwrap_err();
    assert!(matches!(
      err,
      ConfigError::Catalog(CatalogError::DuplicateLevel(LevelId(1)))
    ));
  }

  #[test]
  fn asset_name_is_prefixed() {
    let catalog = catalog();
    assert_eq!(catalog.asset_name(&SegmentId::new("meadow")), "biome_map_meadow");
  }
}
