pub mod actions;
mod bindings;

pub use actions::{Abort, MapInput, Pan, Reopen, Retry, ToggleLoading, TogglePause};
use bevy::prelude::*;
use bevy_enhanced_input::prelude::*;
pub use bindings::map_input_actions;

pub struct InputPlugin;

impl Plugin for InputPlugin {
  fn build(&self, app: &mut App) {
    app
      .add_plugins(EnhancedInputPlugin)
      .add_input_context::<MapInput>()
      .add_systems(Startup, spawn_map_input);
  }
}

fn spawn_map_input(mut commands: Commands) {
  commands.spawn((MapInput, map_input_actions()));
}

/// Whether any action of type `A` in the context is held this frame.
pub fn is_held<A: InputAction>(
  actions: &Actions<MapInput>,
  states: &Query<&ActionState, With<Action<A>>>,
) -> bool {
  actions.iter().any(|entity| {
    states
      .get(entity)
      .is_ok_and(|state| matches!(state, ActionState::Fired | ActionState::Ongoing))
  })
}
