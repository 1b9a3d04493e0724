//! Enemy plugin - registers all enemy systems.

use bevy::prelude::*;

use super::ai;
use super::data::{load_enemy_definitions, EnemyRegistry};
use crate::core::GameplaySet;

/// Enemy plugin - handles enemy definitions, targeting and behaviour.
pub struct EnemyPlugin;

impl Plugin for EnemyPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<EnemyRegistry>()
            .add_systems(Startup, load_enemy_definitions)
            .add_systems(
                Update,
                (
                    ai::acquire_targets,
                    ai::leaper_behaviour,
                    ai::grunt_behaviour,
                    ai::charger_behaviour,
                )
                    .chain()
                    .in_set(GameplaySet::Ai),
            )
            .add_systems(
                Update,
                (ai::leaper_contact_damage, ai::charger_contacts).in_set(GameplaySet::Action),
            );
    }
}
