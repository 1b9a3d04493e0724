//! Combat components and events.

use bevy::prelude::*;

use super::combo::{ComboAction, ComboDefinition};

/// Share of an attack's duration at which the hit lands.
pub const HIT_FRACTION: f32 = 0.4;
/// Share of an attack's duration after which the next combo may be queued.
pub const COMBO_WINDOW_FRACTION: f32 = 0.5;
/// Stun applied alongside a combo launch.
pub const LAUNCH_STUN_DURATION: f32 = 2.0;

/// Weapon carried by an attacker.
#[derive(Component, Debug, Clone)]
pub struct Weapon {
    pub name: String,
    pub combos: Vec<ComboDefinition>,
    /// Multiplies every combo's damage multiplier
    pub base_damage_multiplier: f32,
}

impl Default for Weapon {
    fn default() -> Self {
        Self {
            name: "Fists".to_string(),
            combos: Vec::new(),
            base_damage_multiplier: 1.0,
        }
    }
}

impl Weapon {
    pub fn new(name: &str, combos: Vec<ComboDefinition>) -> Self {
        Self {
            name: name.to_string(),
            combos,
            ..Default::default()
        }
    }

    /// Combos usable on the ground or in the air.
    pub fn combos(&self, air: bool) -> Vec<&ComboDefinition> {
        self.combos
            .iter()
            .filter(|combo| combo.air_combo == air)
            .collect()
    }

    pub fn add_combo(&mut self, combo: ComboDefinition) {
        self.combos.push(combo);
    }

    /// Remove the first combo called `name`.
    pub fn remove_combo(&mut self, name: &str) -> bool {
        match self.combos.iter().position(|combo| combo.name == name) {
            Some(index) => {
                self.combos.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn has_combo(&self, name: &str) -> bool {
        self.combos.iter().any(|combo| combo.name == name)
    }
}

/// Hit-stop on one entity: its local time runs at `time_scale` until
/// `remaining` real seconds have passed.
#[derive(Component, Debug, Clone)]
pub struct ImpactFrames {
    pub time_scale: f32,
    pub remaining: f32,
    pub applied: bool,
}

/// Request to start (or extend) impact frames on an entity.
#[derive(Event, Debug, Clone)]
pub struct ImpactFramesEvent {
    pub entity: Entity,
    pub time_scale: f32,
    pub duration: f32,
}

/// A combo input from whoever controls the attacker.
#[derive(Event, Debug, Clone)]
pub struct ComboInputEvent {
    pub entity: Entity,
    pub action: ComboAction,
}

/// Sent when an attacker starts a combo.
#[derive(Event, Debug, Clone)]
pub struct ComboExecutedEvent {
    pub entity: Entity,
    pub combo: String,
}

/// Sent when a weapon swing connects.
#[derive(Event, Debug, Clone)]
pub struct WeaponHitEvent {
    pub attacker: Entity,
    pub victim: Entity,
    pub hit_point: Vec3,
    pub damage: i32,
    /// The swing came out of a held charge
    pub charged: bool,
}

/// Sent when a held charge is released into a charged combo.
#[derive(Event, Debug, Clone)]
pub struct ChargeReleasedEvent {
    pub entity: Entity,
    pub charge_duration: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combos_split_by_air() {
        let weapon = Weapon::new(
            "Sword",
            vec![
                ComboDefinition::new("ground", &[ComboAction::Attack1]),
                ComboDefinition::new("air", &[ComboAction::Attack1]).airborne(),
            ],
        );

        let ground: Vec<_> = weapon.combos(false).iter().map(|c| c.name.clone()).collect();
        let air: Vec<_> = weapon.combos(true).iter().map(|c| c.name.clone()).collect();
        assert_eq!(ground, vec!["ground"]);
        assert_eq!(air, vec!["air"]);
    }

    #[test]
    fn remove_combo_by_name() {
        let mut weapon = Weapon::default();
        weapon.add_combo(ComboDefinition::new("spin", &[ComboAction::Attack2]));
        assert!(weapon.has_combo("spin"));
        assert!(weapon.remove_combo("spin"));
        assert!(!weapon.remove_combo("spin"));
    }
}
