//! Combo and weapon definitions loaded from `assets/data`.

use bevy::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;

use super::combo::{ComboAction, ComboDefinition};
use super::components::Weapon;
use crate::core::{load_ron_dir, DataLoadError};

const COMBOS_DIR: &str = "assets/data/combos";
const WEAPONS_DIR: &str = "assets/data/weapons";
/// Weapon the player starts a run with.
pub const STARTER_WEAPON: &str = "sword";

/// Every combo definition, by name.
#[derive(Resource, Debug, Default)]
pub struct ComboRegistry {
    pub combos: HashMap<String, ComboDefinition>,
}

impl ComboRegistry {
    pub fn get(&self, name: &str) -> Option<&ComboDefinition> {
        self.combos.get(name)
    }

    pub fn insert(&mut self, combo: ComboDefinition) -> Result<(), DataLoadError> {
        if self.combos.contains_key(&combo.name) {
            return Err(DataLoadError::DuplicateEntry {
                name: combo.name,
                path: COMBOS_DIR.to_string(),
            });
        }
        self.combos.insert(combo.name.clone(), combo);
        Ok(())
    }

    /// Combos shipped with the game when no data files are present.
    pub fn builtin() -> Self {
        use ComboAction::*;

        let mut slash = ComboDefinition::new("slash", &[Attack1]);
        slash.clip_duration = 0.5;

        let mut double_slash = ComboDefinition::new("double_slash", &[Attack1, Attack1]);
        double_slash.clip_duration = 0.55;
        double_slash.damage_multiplier = 1.2;

        let mut finisher = ComboDefinition::new("finisher", &[Attack1, Attack1, Attack1]);
        finisher.clip_duration = 0.8;
        finisher.damage_multiplier = 1.8;
        finisher.stun = true;
        finisher.stun_duration = 1.0;

        let mut thrust = ComboDefinition::new("thrust", &[Attack2]);
        thrust.clip_duration = 0.6;
        thrust.hit_reach = 1.75;

        let mut uppercut = ComboDefinition::new("uppercut", &[Attack2, Attack2]);
        uppercut.clip_duration = 0.7;
        uppercut.launch_upwards = true;
        uppercut.air_launch_force = 12.0;

        let mut heavy = ComboDefinition::new("heavy", &[ChargedAttack1]);
        heavy.clip_duration = 0.9;
        heavy.damage_multiplier = 2.5;
        heavy.impact_duration = 0.35;

        let mut dash_strike = ComboDefinition::new("dash_strike", &[Dash, Attack1]);
        dash_strike.clip_duration = 0.5;
        dash_strike.damage_multiplier = 1.4;

        let mut air_slash = ComboDefinition::new("air_slash", &[Attack1]).airborne();
        air_slash.clip_duration = 0.45;
        air_slash.air_launch_force = 4.0;

        // Unlocked through aspects
        let mut rage_slam = ComboDefinition::new("rage_slam", &[Attack2, Attack1, Attack2]);
        rage_slam.clip_duration = 0.85;
        rage_slam.damage_multiplier = 2.0;
        rage_slam.hit_radius = 2.5;
        rage_slam.weapon_scale = 1.5;
        rage_slam.weapon_scale_duration = 0.4;

        let mut dread_sweep = ComboDefinition::new("dread_sweep", &[Attack1, Attack2]);
        dread_sweep.clip_duration = 0.6;
        dread_sweep.hit_radius = 2.0;
        dread_sweep.stun = true;
        dread_sweep.stun_duration = 0.5;

        let mut registry = Self::default();
        for combo in [
            slash,
            double_slash,
            finisher,
            thrust,
            uppercut,
            heavy,
            dash_strike,
            air_slash,
            rage_slam,
            dread_sweep,
        ] {
            registry.combos.insert(combo.name.clone(), combo);
        }
        registry
    }
}

/// A weapon and the names of the combos it starts with.
#[derive(Deserialize, Clone, Debug)]
pub struct WeaponDefinition {
    pub name: String,
    pub combos: Vec<String>,
    #[serde(default = "default_damage_multiplier")]
    pub base_damage_multiplier: f32,
}

fn default_damage_multiplier() -> f32 {
    1.0
}

#[derive(Resource, Debug, Default)]
pub struct WeaponRegistry {
    pub weapons: HashMap<String, WeaponDefinition>,
}

impl WeaponRegistry {
    pub fn get(&self, name: &str) -> Option<&WeaponDefinition> {
        self.weapons.get(name)
    }

    pub fn builtin() -> Self {
        let sword = WeaponDefinition {
            name: "Sword".to_string(),
            combos: [
                "slash",
                "double_slash",
                "finisher",
                "thrust",
                "uppercut",
                "heavy",
                "dash_strike",
                "air_slash",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
            base_damage_multiplier: 1.0,
        };

        let mut weapons = HashMap::new();
        weapons.insert(STARTER_WEAPON.to_string(), sword);
        Self { weapons }
    }

    /// Build the weapon component for `name`, resolving its combos.
    /// Unknown combos are skipped with a warning.
    pub fn build(&self, name: &str, combos: &ComboRegistry) -> Option<Weapon> {
        let definition = self.get(name)?;

        let resolved = definition
            .combos
            .iter()
            .filter_map(|combo_name| {
                let combo = combos.get(combo_name).cloned();
                if combo.is_none() {
                    warn!("Weapon '{}' references unknown combo '{}'", name, combo_name);
                }
                combo
            })
            .collect();

        Some(Weapon {
            name: definition.name.clone(),
            combos: resolved,
            base_damage_multiplier: definition.base_damage_multiplier,
        })
    }
}

/// Fill the combo registry from disk, falling back to the built-in set.
pub fn load_combo_definitions(mut registry: ResMut<ComboRegistry>) {
    match load_ron_dir::<ComboDefinition>(COMBOS_DIR) {
        Ok(definitions) if !definitions.is_empty() => {
            for (file, combo) in definitions {
                info!("Loaded combo definition: {} ({})", combo.name, file);
                if let Err(e) = registry.insert(combo) {
                    error!("{}", e);
                }
            }
        }
        Ok(_) => {
            warn!("No combo definitions in {}, using built-in combos", COMBOS_DIR);
            *registry = ComboRegistry::builtin();
        }
        Err(e) => {
            warn!("{}, using built-in combos", e);
            *registry = ComboRegistry::builtin();
        }
    }
}

/// Fill the weapon registry from disk, falling back to the built-in set.
pub fn load_weapon_definitions(mut registry: ResMut<WeaponRegistry>) {
    match load_ron_dir::<WeaponDefinition>(WEAPONS_DIR) {
        Ok(definitions) if !definitions.is_empty() => {
            for (file, weapon) in definitions {
                info!("Loaded weapon definition: {} ({})", weapon.name, file);
                registry.weapons.insert(file, weapon);
            }
        }
        Ok(_) => *registry = WeaponRegistry::builtin(),
        Err(e) => {
            warn!("{}, using built-in weapons", e);
            *registry = WeaponRegistry::builtin();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_sword_resolves_every_combo() {
        let combos = ComboRegistry::builtin();
        let weapons = WeaponRegistry::builtin();

        let sword = weapons.build(STARTER_WEAPON, &combos).unwrap();
        assert_eq!(sword.combos.len(), 8);
        assert_eq!(sword.combos(true).len(), 1);
    }

    #[test]
    fn duplicate_combo_names_are_rejected() {
        let mut registry = ComboRegistry::default();
        registry
            .insert(ComboDefinition::new("slash", &[ComboAction::Attack1]))
            .unwrap();
        let err = registry
            .insert(ComboDefinition::new("slash", &[ComboAction::Attack2]))
            .unwrap_err();
        assert!(matches!(err, DataLoadError::DuplicateEntry { .. }));
    }

    #[test]
    fn combo_definition_parses_with_defaults() {
        let combo: ComboDefinition = crate::core::parse_ron(
            "spin.ron",
            "(name: \"spin\", inputs: [Attack2, Attack1], damage_multiplier: 1.5)",
        )
        .unwrap();

        assert_eq!(combo.inputs, vec![ComboAction::Attack2, ComboAction::Attack1]);
        assert_eq!(combo.impact_time_scale, 0.05);
        assert!(!combo.air_combo);
    }
}
