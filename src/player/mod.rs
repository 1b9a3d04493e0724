//! Player module - the player character, its input, camera and movement.

mod components;
mod debug;
mod input;
mod movement;
mod plugin;
mod state;

pub use components::*;
pub use input::{can_basic_attack, can_charge, can_charged_attack, can_dash, can_jump};
pub use movement::{spawn_player, step_locomotion, LocomotionStep, LocomotionView};
pub use plugin::PlayerPlugin;
pub use state::*;
