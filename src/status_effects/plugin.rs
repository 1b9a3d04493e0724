use bevy::prelude::*;

use super::systems::*;
use crate::core::GameplaySet;

/// Status effects plugin - applies, ticks and expires effects on actors.
pub struct StatusEffectsPlugin;

impl Plugin for StatusEffectsPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ApplyStatusEffectEvent>()
            .add_event::<RemoveStatusEffectEvent>()
            .add_event::<StatusEffectExpiredEvent>()
            .add_systems(
                Update,
                (
                    apply_on_hit_passives,
                    explode_charged_hits,
                    fear_stacks_on_stun,
                    rage_charged_attacks,
                    life_steal_on_damage_dealt,
                    trigger_death_effects,
                    apply_status_effect_requests,
                    remove_status_effect_requests,
                    update_status_effects,
                )
                    .chain()
                    .in_set(GameplaySet::Effects),
            );
    }
}
