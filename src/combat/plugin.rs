//! Combat plugin - combos, weapon hits and impact frames.

use bevy::prelude::*;

use super::components::*;
use super::data::*;
use super::systems::*;
use crate::core::GameplaySet;

/// Combat plugin - handles all combat systems.
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ComboRegistry>()
            .init_resource::<WeaponRegistry>()
            .add_event::<ComboInputEvent>()
            .add_event::<ComboExecutedEvent>()
            .add_event::<WeaponHitEvent>()
            .add_event::<ChargeReleasedEvent>()
            .add_event::<ImpactFramesEvent>()
            .add_systems(
                Startup,
                (load_combo_definitions, load_weapon_definitions).chain(),
            )
            .add_systems(
                Update,
                (
                    tick_combo_trackers,
                    resolve_combo_inputs,
                    advance_attacks,
                    start_impact_frames,
                    tick_impact_frames,
                )
                    .chain()
                    .in_set(GameplaySet::Action),
            );
    }
}
