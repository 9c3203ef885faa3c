use bevy::prelude::*;
use bevy_enhanced_input::prelude::*;

#[derive(Component)]
pub struct MapInput;

/// Horizontal camera pan, -1 to 1.
#[derive(Debug, InputAction)]
#[action_output(f32)]
pub struct Pan;

/// Answers a retry prompt with "retry".
#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct Retry;

/// Answers a retry prompt with "abort".
#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct Abort;

#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct TogglePause;

/// Switches splicing of finished downloads on and off.
#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct ToggleLoading;

/// Reopens the map from scratch.
#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct Reopen;
