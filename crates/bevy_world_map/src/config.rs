//! Map configuration loaded from TOML.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogError;
use crate::curve::KeyframeCurve;

/// Tunables of the streaming window and its viewport feedback.
///
/// Every field has a default, so a config file only lists what it overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldMapConfig {
  /// Segments kept loaded before the current one.
  pub behind_count: usize,
  /// Segments kept loaded after the current one.
  pub ahead_count: usize,
  /// Overscroll past the current segment edge, as a fraction of the viewport
  /// width, that retries a failed neighbor.
  pub reload_swipe_fraction: f32,
  /// How far beyond the viewport edge (fraction of the viewport width) the
  /// content border may be while the loading preloader is shown.
  pub preloader_show_fraction: f32,
  /// Distance under which a content border counts as touching the viewport
  /// edge.
  pub border_epsilon: f32,
  /// Margin between the preloader widget and the viewport edge.
  pub preloader_edge_spacing: f32,
  /// Slide-in/out curve of the preloader over normalized time 0..1.
  pub preloader_slide: KeyframeCurve,
  /// Opacity of the load-complete indicator over the normalized scroll
  /// distance since the neighbor finished loading.
  pub complete_fade: KeyframeCurve,
  /// Easing of the scroll-to-seam animation.
  pub scroll_swipe: KeyframeCurve,
  pub scroll_duration_secs: f32,
}

impl Default for WorldMapConfig {
  fn default() -> Self {
    Self {
      behind_count: 1,
      ahead_count: 2,
      reload_swipe_fraction: 0.01,
      preloader_show_fraction: 0.5,
      border_epsilon: 0.01,
      preloader_edge_spacing: 36.0,
      preloader_slide: KeyframeCurve::linear(),
      complete_fade: KeyframeCurve::new(vec![[-1.0, -0.01], [0.0, 1.0], [1.0, -0.01]]),
      scroll_swipe: KeyframeCurve::new(vec![
        [0.0, 0.0],
        [0.25, 0.45],
        [0.5, 0.78],
        [0.75, 0.95],
        [1.0, 1.0],
      ]),
      scroll_duration_secs: 1.0,
    }
  }
}

impl WorldMapConfig {
  pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
    let config: WorldMapConfig = toml::from_str(source)?;
    config.validate()?;
    Ok(config)
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let source = std::fs::read_to_string(path)?;
    Self::from_toml_str(&source)
  }

  /// Segments held by a full window.
  pub fn window_len(&self) -> usize {
    self.behind_count + self.ahead_count + 1
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.behind_count == 0 || self.ahead_count == 0 {
      return Err(ConfigError::Invalid(
        "behind_count and ahead_count must be at least 1".into(),
      ));
    }
    if self.scroll_duration_secs <= 0.0 {
      return Err(ConfigError::Invalid(
        "scroll_duration_secs must be positive".into(),
      ));
    }
    Ok(())
  }
}

/// Error loading map or catalog configuration.
#[derive(Debug)]
pub enum ConfigError {
  Io(io::Error),
  Parse(toml::de::Error),
  Catalog(CatalogError),
  Invalid(String),
}

impl From<io::Error> for ConfigError {
  fn from(err: io::Error) -> Self {
    Self::Io(err)
  }
}

impl From<toml::de::Error> for ConfigError {
  fn from(err: toml::de::Error) -> Self {
    Self::Parse(err)
  }
}

impl From<CatalogError> for ConfigError {
  fn from(err: CatalogError) -> Self {
    Self::Catalog(err)
  }
}

impl std::fmt::Display for ConfigError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Io(e) => write!(f, "I/O error: {}", e),
      Self::Parse(e) => write!(f, "parse error: {}", e),
      Self::Catalog(e) => write!(f, "catalog error: {}", e),
      Self::Invalid(msg) => write!(f, "invalid config: {}", msg),
    }
  }
}

impl std::error::Error for ConfigError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Io(e) => Some(e),
      Self::Parse(e) => Some(e),
      Self::Catalog(e) => Some(e),
      Self::Invalid(_) => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_file_keeps_defaults() {
    let config = WorldMapConfig::from_toml_str("ahead_count = 3\n").unwrap();
    assert_eq!(config.ahead_count, 3);
    assert_eq!(config.behind_count, 1);
    assert_eq!(config.reload_swipe_fraction, 0.01);
    assert_eq!(config.window_len(), 5);
  }

  #[test]
  fn empty_window_side_is_rejected() {
    let err = WorldMapConfig::from_toml_str("behind_count = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
  }

  #[test]
  fn malformed_file_is_parse_error() {
    let err = WorldMapConfig::from_toml_str("ahead_count = \"two\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
  }

  #[test]
  fn curves_override_from_file() {
    let config = WorldMapConfig::from_toml_str("scroll_swipe = [[0.0, 0.0], [1.0, 2.0]]\n").unwrap();
    assert_eq!(config.scroll_swipe.sample(0.5), 1.0);
  }

  #[test]
  fn missing_file_is_io_error() {
    let err = WorldMapConfig::load("/nonexistent/world_map.config.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
  }
}
