//! Riftlands - a first-person action roguelite on a growing grid of lands.
//!
//! A run starts on four lands. Each world event spawns enemies from the
//! lands' spawners; clearing it earns aspect picks, a new land and tokens to
//! make lands stronger or weaker before choosing the next event.
//!
//! # Architecture
//!
//! The game is organized into plugins, each handling a specific aspect:
//!
//! - **Core**: Game states, run phases, global events, data loading
//! - **Stats**: Buffable numeric stats
//! - **Entities**: Health, teams and the per-actor state machine
//! - **Status effects**: Timed buffs, debuffs and passives
//! - **Combat**: Weapons, combos and hit detection
//! - **Aspects**: Experience, level-ups and upgrade trees
//! - **Player**: First-person movement, camera and input
//! - **Enemies**: Enemy definitions and behaviours
//! - **World**: Lands, spawners, world events and the run loop

pub mod aspects;
pub mod combat;
pub mod core;
pub mod enemies;
pub mod entities;
pub mod player;
pub mod stats;
pub mod status_effects;
pub mod world;

use bevy::prelude::*;

/// Main game plugin that adds all sub-plugins.
pub struct RiftlandsPlugin;

impl Plugin for RiftlandsPlugin {
    fn build(&self, app: &mut App) {
        app
            // Core systems (must be first)
            .add_plugins(core::CorePlugin)

            // Shared actor model
            .add_plugins(entities::EntitiesPlugin)
            .add_plugins(status_effects::StatusEffectsPlugin)

            // Combat and progression
            .add_plugins(combat::CombatPlugin)
            .add_plugins(aspects::AspectsPlugin)

            // Actors
            .add_plugins(player::PlayerPlugin)
            .add_plugins(enemies::EnemyPlugin)

            // Lands, spawners and world events
            .add_plugins(world::WorldPlugin);
    }
}
