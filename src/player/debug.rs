//! Developer shortcuts for testing runs.

use bevy::prelude::*;

use super::components::Player;
use crate::aspects::LevelSystem;
use crate::core::LevelUpEvent;
use crate::entities::{EntityStats, Health, Invincible};

/// `L` grants the player a level.
pub fn debug_level_up(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut players: Query<(Entity, &mut LevelSystem), With<Player>>,
    mut level_ups: EventWriter<LevelUpEvent>,
) {
    if !keyboard.just_pressed(KeyCode::KeyL) {
        return;
    }

    for (entity, mut levels) in &mut players {
        let new_level = levels.level_up();
        warn!("Debug: player levelled up to {}", new_level);
        level_ups.send(LevelUpEvent { entity, new_level });
    }
}

/// `H` heals the player to full and toggles invincibility.
pub fn debug_toggle_invincible(
    mut commands: Commands,
    keyboard: Res<ButtonInput<KeyCode>>,
    mut players: Query<(Entity, &mut Health, &EntityStats, Has<Invincible>), With<Player>>,
) {
    if !keyboard.just_pressed(KeyCode::KeyH) {
        return;
    }

    for (entity, mut health, stats, invincible) in &mut players {
        health.current = stats.max_health.int_value();
        if invincible {
            commands.entity(entity).remove::<Invincible>();
        } else {
            commands.entity(entity).insert(Invincible);
        }
        warn!("Debug: player healed, invincible = {}", !invincible);
    }
}
