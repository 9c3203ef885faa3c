mod config;
mod input;
mod map;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bevy::{
  prelude::*,
  window::{PresentMode, WindowResolution},
};
use bevy_world_map::{LevelId, ProfileProgress, StaticCatalog, WorldMapPlugin};
use clap::Parser;

use crate::config::{ConfigLoaded, DemoConfig};
use crate::map::MapSources;

/// Scrollable world map over segment descriptors on disk.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
  /// Demo config (window, camera and map tunables).
  #[arg(long, default_value = "assets/config/bubble_map.config.toml")]
  config: PathBuf,
  /// Segment chain and level list.
  #[arg(long, default_value = "assets/config/catalog.toml")]
  catalog: PathBuf,
  /// Completed levels and their stars.
  #[arg(long, default_value = "assets/config/profile.toml")]
  profile: PathBuf,
  /// Directory holding `<asset>.segment.toml` descriptors.
  #[arg(long, default_value = "assets/segments")]
  segments: PathBuf,
  /// Simulated download time per segment.
  #[arg(long, default_value_t = 1500)]
  latency_ms: u64,
  /// Level the player played last.
  #[arg(long)]
  last_played: Option<u32>,
}

fn main() -> AppExit {
  let args = Args::parse();

  let config = match DemoConfig::load(&args.config) {
    Ok(config) => config,
    Err(e) => {
      eprintln!("bubble_map: {e}");
      return AppExit::error();
    }
  };
  let catalog = match StaticCatalog::load(&args.catalog) {
    Ok(catalog) => catalog,
    Err(e) => {
      eprintln!("bubble_map: cannot load {}: {e}", args.catalog.display());
      return AppExit::error();
    }
  };
  let progress = match ProfileProgress::load(&args.profile) {
    Ok(progress) => progress,
    Err(e) => {
      eprintln!("bubble_map: cannot load {}: {e}", args.profile.display());
      return AppExit::error();
    }
  };

  let sources = MapSources {
    catalog: Arc::new(catalog),
    progress: Arc::new(progress),
    segments_dir: args.segments,
    latency: Duration::from_millis(args.latency_ms),
    last_played: args.last_played.map(LevelId),
  };
  let world_map = sources.build(&config.map);

  let mut app = App::new();
  app
    .add_plugins(DefaultPlugins.set(WindowPlugin {
      primary_window: Some(Window {
        resolution: WindowResolution::new(config.window.width, config.window.height),
        title: config.window.title.clone(),
        present_mode: PresentMode::AutoVsync,
        ..default()
      }),
      ..default()
    }))
    .insert_resource(ConfigLoaded::from(config))
    .insert_resource(sources)
    .insert_resource(world_map)
    .add_plugins(config::ConfigPlugin)
    .add_plugins(input::InputPlugin)
    .add_plugins(WorldMapPlugin)
    .add_plugins(map::MapDemoPlugin);

  app.run()
}
