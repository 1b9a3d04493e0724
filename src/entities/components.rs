//! Components shared by every combat actor - the player and all enemies.

use bevy::prelude::*;
use rand::Rng;

use super::state::StateLabel;
use crate::stats::Stat;

/// Team the player fights for.
pub const PLAYER_TEAM: Team = Team(0);
/// Team every spawned enemy fights for.
pub const ENEMY_TEAM: Team = Team(1);

/// Modifiable stats of a combat actor.
#[derive(Component, Debug, Clone)]
pub struct EntityStats {
    pub max_health: Stat,
    pub defense: Stat,
    /// Multiplies movement speed (slows, hastes)
    pub status_speed: Stat,
    pub damage_modifier: Stat,
    /// Scales how long debuffs applied *by* this entity last
    pub debuff_apply_duration: Stat,
    /// Scales how long buffs applied *by* this entity last
    pub buff_apply_duration: Stat,
    /// Per-entity time dilation, used by impact frames and slowing elites
    pub local_time_scale: Stat,
    pub size_scale: Stat,
    /// Inclusive damage range before multipliers
    pub base_damage_range: (i32, i32),
    /// Movement speed in units per second
    pub base_speed: f32,
}

impl Default for EntityStats {
    fn default() -> Self {
        Self {
            max_health: Stat::new(100.0),
            defense: Stat::new(0.0),
            status_speed: Stat::new(1.0),
            damage_modifier: Stat::new(1.0),
            debuff_apply_duration: Stat::new(1.0),
            buff_apply_duration: Stat::new(1.0),
            local_time_scale: Stat::new(1.0),
            size_scale: Stat::new(1.0),
            base_damage_range: (10, 15),
            base_speed: 5.0,
        }
    }
}

impl EntityStats {
    pub fn with_max_health(mut self, max_health: f32) -> Self {
        self.max_health.set_base_value(max_health);
        self
    }

    pub fn with_damage_range(mut self, min: i32, max: i32) -> Self {
        self.base_damage_range = (min, max);
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.base_speed = speed;
        self
    }

    /// Frame delta as experienced by this entity.
    pub fn local_delta(&self, delta: f32) -> f32 {
        delta * self.local_time_scale.value()
    }

    pub fn movement_speed(&self) -> f32 {
        self.status_speed.value() * self.base_speed
    }

    /// Roll damage for an attack with the given multiplier.
    pub fn calculate_damage(&self, multiplier: f32, rng: &mut impl Rng) -> i32 {
        let scale = multiplier * self.damage_modifier.value();
        let (min, max) = self.base_damage_range;
        let low = (min as f32 * scale).round() as i32;
        let high = (max as f32 * scale).round() as i32;

        if high <= low {
            return low.max(0);
        }
        rng.gen_range(low..=high).max(0)
    }
}

/// Current health. The maximum lives in [`EntityStats::max_health`].
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    pub current: i32,
}

impl Health {
    pub fn full(stats: &EntityStats) -> Self {
        Self {
            current: stats.max_health.int_value(),
        }
    }

    pub fn take_damage(&mut self, amount: i32) {
        self.current = (self.current - amount.max(0)).max(0);
    }

    pub fn heal(&mut self, amount: i32, max: i32) {
        self.current = (self.current + amount.max(0)).min(max);
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0
    }

    pub fn percentage(&self, max: i32) -> f32 {
        if max <= 0 {
            return 0.0;
        }
        self.current as f32 / max as f32
    }

    /// Whether `damage` would bring this entity to zero health.
    pub fn will_die_from(&self, damage: i32, max: i32) -> bool {
        max > 0 && self.current - damage <= 0
    }
}

/// Combat allegiance. Entities never target their own team.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Team(pub u8);

/// Takes hits but loses no health.
#[derive(Component, Debug, Default)]
pub struct Invincible;

/// Soaks light hits while the owner is in one of `states`. Hits of at least
/// `stagger_threshold` get through whole and may stagger.
#[derive(Component, Debug, Clone)]
pub struct SuperArmor {
    pub states: Vec<StateLabel>,
    pub stagger_threshold: i32,
    pub damage_multiplier: f32,
}

impl SuperArmor {
    /// Damage that gets through and whether the hit may stagger.
    pub fn absorb(&self, state: StateLabel, damage: i32) -> (i32, bool) {
        if !self.states.contains(&state) || damage >= self.stagger_threshold {
            return (damage, true);
        }
        ((damage as f32 * self.damage_multiplier).round() as i32, false)
    }
}

/// Marker added the frame an entity dies.
#[derive(Component, Debug)]
pub struct Dead;

/// The last entity that damaged this one, credited with the kill.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct LastHitSource(pub Option<Entity>);

/// Kinematic velocity, integrated into the character controller each frame.
#[derive(Component, Debug, Clone)]
pub struct Motion {
    pub velocity: Vec3,
    pub grounded: bool,
    pub gravity: f32,
    pub mass: f32,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            grounded: true,
            gravity: 15.0,
            mass: 1.0,
        }
    }
}

impl Motion {
    /// Replace the velocity with an impulse of `force` along `direction`.
    pub fn launch(&mut self, direction: Vec3, force: f32) {
        self.velocity = direction.normalize_or_zero() * force / self.mass.max(f32::EPSILON);
        self.grounded = false;
    }

    /// Set the horizontal velocity, keeping the vertical component.
    pub fn set_horizontal(&mut self, horizontal: Vec3) {
        self.velocity.x = horizontal.x;
        self.velocity.z = horizontal.z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::stats::BuffSource;

    #[test]
    fn damage_roll_stays_in_scaled_range() {
        let mut stats = EntityStats::default().with_damage_range(10, 15);
        stats.damage_modifier.add_multiplier(2.0, BuffSource::Named("test"));
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let damage = stats.calculate_damage(1.5, &mut rng);
            assert!((30..=45).contains(&damage), "rolled {damage}");
        }
    }

    #[test]
    fn zero_multiplier_rolls_zero() {
        let stats = EntityStats::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(stats.calculate_damage(0.0, &mut rng), 0);
    }

    #[test]
    fn local_delta_follows_time_scale() {
        let mut stats = EntityStats::default();
        stats.local_time_scale.add_multiplier(0.5, BuffSource::ImpactFrames);
        assert!((stats.local_delta(0.2) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn health_clamps_between_zero_and_max() {
        let mut health = Health { current: 10 };
        health.take_damage(25);
        assert_eq!(health.current, 0);
        assert!(health.is_dead());

        health.heal(500, 80);
        assert_eq!(health.current, 80);
        assert!(health.will_die_from(80, 80));
        assert!(!health.will_die_from(79, 80));
    }

    #[test]
    fn armor_halves_light_hits_only_while_braced() {
        let armor = SuperArmor {
            states: vec![StateLabel::Charging],
            stagger_threshold: 40,
            damage_multiplier: 0.5,
        };
        assert_eq!(armor.absorb(StateLabel::Charging, 25), (13, false));
        assert_eq!(armor.absorb(StateLabel::Charging, 40), (40, true));
        assert_eq!(armor.absorb(StateLabel::Dazed, 25), (25, true));
    }

    #[test]
    fn launch_normalizes_direction() {
        let mut motion = Motion::default();
        motion.launch(Vec3::new(0.0, 3.0, 0.0), 12.0);
        assert_eq!(motion.velocity, Vec3::new(0.0, 12.0, 0.0));
        assert!(!motion.grounded);
    }
}
