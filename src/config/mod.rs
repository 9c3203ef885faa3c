mod plugin;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use bevy::{asset::Asset, prelude::*, reflect::TypePath};
use bevy_world_map::{ConfigError, WorldMapConfig};
pub use plugin::ConfigPlugin;
use serde::Deserialize;

/// Asset path of the demo config, relative to `assets/`.
pub const CONFIG_ASSET: &str = "config/bubble_map.config.toml";

#[derive(Asset, TypePath, Deserialize, Debug, Clone)]
pub struct DemoConfig {
  pub window: WindowConfig,
  pub camera: CameraConfig,
  #[serde(default)]
  pub map: WorldMapConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct WindowConfig {
  pub width: u32,
  pub height: u32,
  pub title: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CameraConfig {
  /// World units visible vertically; segments are scaled to fill it.
  pub viewport_height: f32,
  /// Keyboard pan speed in viewport widths per second.
  pub pan_speed: f32,
  /// Rate at which an overscrolled camera springs back into bounds.
  pub spring: f32,
}

impl DemoConfig {
  pub fn load(path: &Path) -> Result<Self, StartupError> {
    let source = std::fs::read_to_string(path).map_err(|source| StartupError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config: DemoConfig = toml::from_str(&source).map_err(|source| StartupError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    config.map.validate().map_err(|source| StartupError::Map {
      path: path.to_path_buf(),
      source,
    })?;
    Ok(config)
  }
}

/// Anything that keeps the demo from starting.
#[derive(Debug)]
pub enum StartupError {
  Read { path: PathBuf, source: io::Error },
  Parse { path: PathBuf, source: toml::de::Error },
  Map { path: PathBuf, source: ConfigError },
}

impl fmt::Display for StartupError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StartupError::Read { path, source } => write!(f, "cannot read {}: {}", path.display(), source),
      StartupError::Parse { path, source } => {
        write!(f, "cannot parse {}: {}", path.display(), source)
      }
      StartupError::Map { path, source } => write!(f, "invalid {}: {}", path.display(), source),
    }
  }
}

impl std::error::Error for StartupError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      StartupError::Read { source, .. } => Some(source),
      StartupError::Parse { source, .. } => Some(source),
      StartupError::Map { source, .. } => Some(source),
    }
  }
}

#[derive(Resource)]
pub struct ConfigHandle(pub Handle<DemoConfig>);

#[derive(Resource, Debug, Clone)]
pub struct ConfigLoaded {
  pub window: WindowConfig,
  pub camera: CameraConfig,
  pub map: WorldMapConfig,
}

impl From<DemoConfig> for ConfigLoaded {
  fn from(config: DemoConfig) -> Self {
    Self {
      window: config.window,
      camera: config.camera,
      map: config.map,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn map_section_is_optional() {
    let config: DemoConfig = toml::from_str(
      r#"
[window]
width = 1280
height = 720
title = "map"

[camera]
viewport_height = 720.0
pan_speed = 1.5
spring = 10.0
"#,
    )
    .unwrap();
    assert_eq!(config.map, WorldMapConfig::default());
  }

  #[test]
  fn shipped_config_parses() {
    let config = DemoConfig::load(Path::new("assets").join(CONFIG_ASSET).as_path()).unwrap();
    assert!(config.camera.viewport_height > 0.0);
    assert!(config.map.window_len() >= 2);
  }
}
