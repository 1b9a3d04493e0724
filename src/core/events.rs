//! Global events used for cross-system communication.
//!
//! Entities never call into each other directly. Damage, healing and
//! life-cycle changes are sent as events and applied by the systems that own
//! the affected components, in system order.

use bevy::prelude::*;

/// Request to damage an entity.
///
/// The entities damage system applies defense, invincibility and stagger
/// before reducing health.
#[derive(Event, Debug, Clone)]
pub struct DamageEvent {
    /// Entity receiving damage
    pub target: Entity,
    /// Entity that caused the damage (None for environmental damage)
    pub source: Option<Entity>,
    /// Damage before defense
    pub amount: i32,
    /// World-space point of impact
    pub hit_point: Vec3,
    /// Whether the hit may interrupt the target with a stagger
    pub try_stagger: bool,
    /// Skip the target's defense stat
    pub ignore_defense: bool,
    /// Direct hits (weapons, contact, explosions) count as damage dealt by
    /// the source; damage over time does not
    pub direct: bool,
}

impl DamageEvent {
    pub fn new(target: Entity, source: Option<Entity>, amount: i32) -> Self {
        Self {
            target,
            source,
            amount,
            hit_point: Vec3::ZERO,
            try_stagger: true,
            ignore_defense: false,
            direct: true,
        }
    }

    pub fn at(mut self, hit_point: Vec3) -> Self {
        self.hit_point = hit_point;
        self
    }

    /// Damage over time shouldn't interrupt the target or trigger the
    /// source's on-damage-dealt effects.
    pub fn over_time(mut self) -> Self {
        self.try_stagger = false;
        self.direct = false;
        self
    }

    pub fn ignoring_defense(mut self) -> Self {
        self.ignore_defense = true;
        self
    }
}

/// Sent after damage has been applied to a target.
#[derive(Event, Debug, Clone)]
pub struct DamageTakenEvent {
    pub entity: Entity,
    pub source: Option<Entity>,
    pub amount: i32,
    pub hit_point: Vec3,
}

/// Sent when an entity deals direct damage to another (weapon hits,
/// contact damage). Damage over time does not count.
#[derive(Event, Debug, Clone)]
pub struct DamageDealtEvent {
    pub attacker: Entity,
    pub victim: Entity,
    pub amount: i32,
}

/// Request to heal an entity, clamped to its max health.
#[derive(Event, Debug, Clone)]
pub struct HealEvent {
    pub target: Entity,
    pub amount: i32,
}

/// Sent when an entity dies (health reaches 0) and enters its death state.
#[derive(Event, Debug, Clone)]
pub struct DeathEvent {
    /// Entity that died
    pub entity: Entity,
    /// Entity that landed the last hit (if any)
    pub killed_by: Option<Entity>,
}

/// Request to kill an entity outright, ignoring invincibility.
#[derive(Event, Debug, Clone)]
pub struct ExecuteEvent {
    pub target: Entity,
    pub source: Option<Entity>,
}

/// Sent to notify the killer that it killed something.
#[derive(Event, Debug, Clone)]
pub struct KillEvent {
    pub killer: Entity,
    pub victim: Entity,
}

/// Sent once a dead entity's death state finishes, right before despawn.
#[derive(Event, Debug, Clone)]
pub struct EntityDestroyedEvent {
    pub entity: Entity,
    pub killed_by: Option<Entity>,
}

/// Request to stun an entity for a duration.
#[derive(Event, Debug, Clone)]
pub struct StunEvent {
    pub target: Entity,
    pub stunner: Option<Entity>,
    pub duration: f32,
}

/// Request to launch an entity into the air.
#[derive(Event, Debug, Clone)]
pub struct LaunchEvent {
    pub target: Entity,
    pub launcher: Option<Entity>,
    pub direction: Vec3,
    pub force: f32,
    pub stun_duration: f32,
    /// Launch even if the target is already airborne from a launch
    pub force_change: bool,
}

/// Sent when an entity gains a level.
#[derive(Event, Debug, Clone)]
pub struct LevelUpEvent {
    pub entity: Entity,
    pub new_level: u32,
}
