//! Player plugin - input, camera, locomotion and player death.

use bevy::prelude::*;

use super::components::*;
use super::debug::{debug_level_up, debug_toggle_invincible};
use super::input::read_player_input;
use super::movement::{grab_cursor, mouse_look, player_locomotion, release_cursor};
use crate::core::{DeathEvent, GameState, GameplaySet};

/// Player plugin - handles player input, movement, and camera.
pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PlayerConfig>()
            .add_systems(OnEnter(GameState::InGame), grab_cursor)
            .add_systems(OnExit(GameState::InGame), release_cursor)
            .add_systems(
                Update,
                (mouse_look, read_player_input, player_locomotion)
                    .chain()
                    .in_set(GameplaySet::Input),
            )
            .add_systems(
                Update,
                (debug_level_up, debug_toggle_invincible).in_set(GameplaySet::Input),
            )
            .add_systems(Update, end_run_on_player_death.in_set(GameplaySet::States));
    }
}

/// The run is over once the player dies.
fn end_run_on_player_death(
    mut deaths: EventReader<DeathEvent>,
    players: Query<(), With<Player>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    for death in deaths.read() {
        if players.contains(death.entity) {
            info!("Player died, game over");
            next_state.set(GameState::GameOver);
        }
    }
}
