//! System ordering shared by every gameplay plugin.

use bevy::prelude::*;

use super::states::{GameState, PlayState};

/// Frame phases for gameplay. Events sent in one phase are read by the
/// phases after it in the same frame.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum GameplaySet {
    /// Player input and combo tokens
    Input,
    /// Enemy behaviour states
    Ai,
    /// Attacks, hit detection, contact damage
    Action,
    /// Status effect updates and on-hit passives
    Effects,
    /// Damage, healing, stuns, launches and deaths
    Damage,
    /// State timers and transition bookkeeping
    States,
    /// Spawners and world events
    World,
    /// Velocity integration into the character controllers
    Motion,
}

/// Configure the gameplay phases. They only run while an event is playing.
pub fn configure_gameplay_sets(app: &mut App) {
    app.configure_sets(
        Update,
        (
            GameplaySet::Input,
            GameplaySet::Ai,
            GameplaySet::Action,
            GameplaySet::Effects,
            GameplaySet::Damage,
            GameplaySet::States,
            GameplaySet::World,
            GameplaySet::Motion,
        )
            .chain()
            .run_if(in_state(GameState::InGame))
            .run_if(in_state(PlayState::Playing)),
    );
}
