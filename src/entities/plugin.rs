//! Entities plugin - health, damage, base states and motion for all actors.

use bevy::prelude::*;

use super::state::StateChangedEvent;
use super::systems::*;
use crate::core::GameplaySet;

/// Entities plugin - handles everything an actor does regardless of who controls it.
pub struct EntitiesPlugin;

impl Plugin for EntitiesPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<StateChangedEvent>()
            .add_event::<SpawnFinishedEvent>()
            .add_systems(
                Update,
                (
                    apply_damage,
                    apply_executions,
                    apply_heals,
                    apply_stuns,
                    apply_launches,
                )
                    .chain()
                    .in_set(GameplaySet::Damage),
            )
            .add_systems(
                Update,
                (tick_base_states, emit_state_changes)
                    .chain()
                    .in_set(GameplaySet::States),
            )
            .add_systems(
                Update,
                (integrate_motion, sync_size).in_set(GameplaySet::Motion),
            );
    }
}
