use bevy::{
  asset::AssetEvent, camera::ScalingMode, ecs::message::MessageReader, prelude::*,
  window::PrimaryWindow,
};
use bevy_common_assets::toml::TomlAssetPlugin;

use super::{CONFIG_ASSET, ConfigHandle, ConfigLoaded, DemoConfig};

/// Watches the config asset and pushes edits into [`ConfigLoaded`].
///
/// The initial [`ConfigLoaded`] is inserted by `main` before the app runs.
pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
  fn build(&self, app: &mut App) {
    app
      .add_plugins(TomlAssetPlugin::<DemoConfig>::new(&["config.toml"]))
      .add_systems(PreStartup, watch_config_asset)
      .add_systems(
        Update,
        (
          watch_config_changes,
          update_window_on_config_change,
          update_camera_on_config_change,
        )
          .chain(),
      );
  }
}

fn watch_config_asset(mut commands: Commands, asset_server: Res<AssetServer>) {
  let handle: Handle<DemoConfig> = asset_server.load(CONFIG_ASSET);
  commands.insert_resource(ConfigHandle(handle));
}

fn watch_config_changes(
  mut commands: Commands,
  config_handle: Res<ConfigHandle>,
  mut messages: MessageReader<AssetEvent<DemoConfig>>,
  configs: Res<Assets<DemoConfig>>,
) {
  for event in messages.read() {
    if let AssetEvent::Modified { id } = event
      && config_handle.0.id() == *id
      && let Some(config) = configs.get(&config_handle.0)
    {
      if let Err(e) = config.map.validate() {
        warn!("Config reload rejected: {}", e);
        continue;
      }
      info!("Config reloaded!");
      commands.insert_resource(ConfigLoaded::from(config.clone()));
    }
  }
}

fn update_window_on_config_change(
  config: Res<ConfigLoaded>,
  mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
  if config.is_changed()
    && let Ok(mut window) = windows.single_mut()
  {
    window
      .resolution
      .set(config.window.width as f32, config.window.height as f32);
    window.title.clone_from(&config.window.title);
  }
}

fn update_camera_on_config_change(
  config: Res<ConfigLoaded>,
  mut camera_query: Query<&mut Projection, With<Camera2d>>,
) {
  if config.is_changed() {
    for mut projection in camera_query.iter_mut() {
      if let Projection::Orthographic(ref mut ortho) = *projection {
        ortho.scaling_mode = ScalingMode::FixedVertical {
          viewport_height: config.camera.viewport_height,
        };
      }
    }
  }
}
