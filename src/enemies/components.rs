//! Enemy-related components.

use bevy::prelude::*;

/// Marker and rewards for every enemy.
#[derive(Component, Debug, Clone, Copy)]
pub struct Enemy {
    /// Spawner currency spent to spawn this enemy
    pub cost: u32,
    /// Exp granted to whoever kills it
    pub exp_value: u32,
}

/// Enemy type identifier (matches the registry key).
#[derive(Component, Debug, Clone)]
pub struct EnemyType(pub String);

/// The land whose spawner owns this enemy.
#[derive(Component, Debug, Clone, Copy)]
pub struct SpawnedBy {
    pub land: IVec2,
}

/// The hostile this enemy is currently going after.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Target(pub Option<Entity>);

/// How an enemy looks for targets.
#[derive(Component, Debug, Clone, Copy)]
pub enum Detection {
    /// Anything hostile within the radius
    Radius(f32),
    /// A forward cone, falling back to a small radius around the enemy
    Cone {
        distance: f32,
        half_angle: f32,
        close_radius: f32,
    },
}
