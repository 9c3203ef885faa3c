//! Demo presentation of the world map: camera, scrolling, taps and gizmos.

mod draw;
mod interact;
mod scroll;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bevy::{camera::ScalingMode, prelude::*};
use bevy_world_map::{
  FileSegmentLoader, LevelId, MapCamera, OpenWorldMap, ProgressOracle, SegmentCatalog, WorldMap,
  WorldMapConfig, WorldMapSet,
};

use crate::config::ConfigLoaded;
pub use interact::PendingPrompt;
pub use scroll::ScrollDevice;

/// Everything needed to build a fresh [`WorldMap`].
#[derive(Resource, Clone)]
pub struct MapSources {
  pub catalog: Arc<dyn SegmentCatalog>,
  pub progress: Arc<dyn ProgressOracle>,
  pub segments_dir: PathBuf,
  pub latency: Duration,
  pub last_played: Option<LevelId>,
}

impl MapSources {
  pub fn build(&self, config: &WorldMapConfig) -> WorldMap {
    WorldMap::new(
      config,
      self.catalog.clone(),
      self.progress.clone(),
      Box::new(FileSegmentLoader::with_latency(
        self.segments_dir.clone(),
        self.latency,
      )),
    )
  }
}

pub struct MapDemoPlugin;

impl Plugin for MapDemoPlugin {
  fn build(&self, app: &mut App) {
    app
      .init_resource::<ScrollDevice>()
      .init_resource::<PendingPrompt>()
      .add_systems(Startup, (setup_camera, open_map))
      .add_systems(
        Update,
        (
          rebuild_on_config_change,
          scroll::scroll_camera,
          interact::pick_taps,
          interact::keyboard_commands,
        )
          .chain()
          .before(WorldMapSet)
          .run_if(resource_exists::<WorldMap>),
      )
      .add_systems(
        Update,
        (
          interact::track_prompts,
          interact::log_map_messages,
          draw::draw_segments,
          draw::draw_buttons,
          draw::draw_indicators,
        )
          .after(WorldMapSet)
          .run_if(resource_exists::<WorldMap>),
      );
  }
}

fn setup_camera(mut commands: Commands, config: Res<ConfigLoaded>) {
  commands.spawn((
    MapCamera,
    Camera2d,
    Camera {
      clear_color: ClearColorConfig::Custom(Color::srgb(0.08, 0.1, 0.14)),
      ..default()
    },
    Projection::Orthographic(OrthographicProjection {
      scaling_mode: ScalingMode::FixedVertical {
        viewport_height: config.camera.viewport_height,
      },
      ..OrthographicProjection::default_2d()
    }),
  ));
}

fn open_map(sources: Res<MapSources>, mut open: MessageWriter<OpenWorldMap>) {
  open.write(OpenWorldMap {
    last_played: sources.last_played,
  });
}

/// Rebuilds the map with the reloaded tunables and reopens it.
fn rebuild_on_config_change(
  mut commands: Commands,
  config: Res<ConfigLoaded>,
  sources: Res<MapSources>,
  mut prompt: ResMut<PendingPrompt>,
  mut map: ResMut<WorldMap>,
  mut open: MessageWriter<OpenWorldMap>,
) {
  if !config.is_changed() || config.is_added() {
    return;
  }
  info!("rebuilding world map with new config");
  map.shutdown();
  prompt.0 = None;
  commands.insert_resource(sources.build(&config.map));
  open.write(OpenWorldMap {
    last_played: sources.last_played,
  });
}
