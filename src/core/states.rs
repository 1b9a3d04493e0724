//! Game state definitions that control the overall flow of the game.
//!
//! States determine which systems run at any given time. Combat and AI only
//! run while a world event is being played, while land placement and aspect
//! selection happen between events.

use bevy::prelude::*;

/// Main game states - controls overall game flow.
///
/// - Start in `Loading` while data files are read
/// - Enter `InGame` once registries are ready
/// - `Paused` freezes gameplay but keeps the world visible
/// - `GameOver` when the player dies or an event is failed
#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum GameState {
    /// Initial state - loading data files
    #[default]
    Loading,
    /// Active run
    InGame,
    /// Game is paused (overlay on gameplay)
    Paused,
    /// Player has died or an event was failed
    GameOver,
}

/// Sub-states of a run - only active when GameState::InGame.
///
/// A run cycles through these phases:
/// `Playing` -> `AspectSelection` -> `LandPlacement` -> `LandEmpowerment`
/// -> `EventSelection` -> `Playing`.
#[derive(SubStates, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
#[source(GameState = GameState::InGame)]
pub enum PlayState {
    /// A world event is running - movement, combat, spawning
    #[default]
    Playing,
    /// Event cleared, the player spends aspect tokens
    AspectSelection,
    /// Choosing where the next land goes
    LandPlacement,
    /// Spending empower/weaken tokens on placed lands
    LandEmpowerment,
    /// Choosing the next world event
    EventSelection,
}

impl PlayState {
    /// The phase that follows this one in the run loop.
    pub fn next(self) -> Self {
        match self {
            PlayState::Playing => PlayState::AspectSelection,
            PlayState::AspectSelection => PlayState::LandPlacement,
            PlayState::LandPlacement => PlayState::LandEmpowerment,
            PlayState::LandEmpowerment => PlayState::EventSelection,
            PlayState::EventSelection => PlayState::Playing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_phases_loop_back_to_playing() {
        let mut phase = PlayState::Playing;
        for _ in 0..5 {
            phase = phase.next();
        }
        assert_eq!(phase, PlayState::Playing);
        assert_eq!(PlayState::Playing.next(), PlayState::AspectSelection);
    }
}
