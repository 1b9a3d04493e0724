//! Core plugin that sets up game states, events, and fundamental systems.

use bevy::prelude::*;

use super::events::*;
use super::sets::configure_gameplay_sets;
use super::states::*;

/// Core plugin - must be added first as other plugins depend on it.
///
/// This plugin sets up:
/// - Game states (Loading, InGame, etc.) and the run sub-states
/// - Global events (DamageEvent, DeathEvent, etc.)
/// - Pause handling
pub struct CorePlugin;

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        app
            // Initialize game states
            .init_state::<GameState>()
            .add_sub_state::<PlayState>()

            // Register global events
            .add_event::<DamageEvent>()
            .add_event::<DamageTakenEvent>()
            .add_event::<DamageDealtEvent>()
            .add_event::<HealEvent>()
            .add_event::<DeathEvent>()
            .add_event::<KillEvent>()
            .add_event::<EntityDestroyedEvent>()
            .add_event::<StunEvent>()
            .add_event::<LaunchEvent>()
            .add_event::<ExecuteEvent>()
            .add_event::<LevelUpEvent>();

        // Gameplay phase ordering
        configure_gameplay_sets(app);

        app
            // Registries load during Startup, so the first frame can leave Loading
            .add_systems(Update, finish_loading.run_if(in_state(GameState::Loading)))

            // Pause/unpause with Escape key
            .add_systems(
                Update,
                handle_pause_input.run_if(in_state(GameState::InGame).or(in_state(GameState::Paused))),
            );
    }
}

/// Move from Loading into the run once Startup data loading has happened.
fn finish_loading(mut next_state: ResMut<NextState<GameState>>) {
    info!("Data loaded, starting run");
    next_state.set(GameState::InGame);
}

/// Handle Escape key to pause/unpause the game.
fn handle_pause_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    current_state: Res<State<GameState>>,
    play_state: Option<Res<State<PlayState>>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if keyboard.just_pressed(KeyCode::Escape) {
        match current_state.get() {
            // Resuming re-enters the run in Playing, so only pause from there
            GameState::InGame => {
                if play_state.is_some_and(|phase| *phase.get() == PlayState::Playing) {
                    next_state.set(GameState::Paused);
                }
            }
            GameState::Paused => next_state.set(GameState::InGame),
            _ => {}
        }
    }
}
