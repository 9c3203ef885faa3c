use bevy::prelude::*;
use bevy_enhanced_input::prelude::*;

use super::actions::{Abort, MapInput, Pan, Reopen, Retry, ToggleLoading, TogglePause};

pub fn map_input_actions() -> impl Bundle {
  actions!(MapInput[
      (
          Action::<Pan>::new(),
          Bindings::spawn((
              Bidirectional::ad_keys(),
              Bidirectional::left_right_arrow(),
          )),
      ),
      (
          Action::<Retry>::new(),
          bindings![KeyCode::KeyR],
      ),
      (
          Action::<Abort>::new(),
          bindings![KeyCode::Escape],
      ),
      (
          Action::<TogglePause>::new(),
          bindings![KeyCode::KeyP],
      ),
      (
          Action::<ToggleLoading>::new(),
          bindings![KeyCode::KeyL],
      ),
      (
          Action::<Reopen>::new(),
          bindings![KeyCode::F5],
      ),
  ])
}
