//! Enemy definitions loaded from RON files.

use bevy::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;

use super::charger::ChargerConfig;
use super::grunt::GruntConfig;
use super::leaper::LeaperConfig;
use crate::core::load_ron_dir;
use crate::entities::EntityStats;

const ENEMIES_DIR: &str = "assets/data/enemies";

/// Which behaviour an enemy runs.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnemyKind {
    Basic,
    Leaper,
    Charger,
}

/// Collider configuration for an enemy type.
#[derive(Deserialize, Clone, Debug)]
pub struct ColliderConfig {
    pub half_height: f32,
    pub radius: f32,
}

impl Default for ColliderConfig {
    fn default() -> Self {
        Self {
            half_height: 0.5,
            radius: 0.3,
        }
    }
}

/// Enemy definition loaded from RON file.
#[derive(Deserialize, Clone, Debug)]
pub struct EnemyDefinition {
    pub name: String,
    pub kind: EnemyKind,
    pub max_health: f32,
    pub cost: u32,
    pub exp_value: u32,
    pub damage_range: (i32, i32),
    pub move_speed: f32,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default)]
    pub collider: ColliderConfig,
    #[serde(default)]
    pub leaper: LeaperConfig,
    #[serde(default)]
    pub grunt: GruntConfig,
    #[serde(default)]
    pub charger: ChargerConfig,
}

fn default_scale() -> f32 {
    1.0
}

impl EnemyDefinition {
    /// Convert to the shared actor stats.
    pub fn to_stats(&self) -> EntityStats {
        let mut stats = EntityStats::default()
            .with_max_health(self.max_health)
            .with_damage_range(self.damage_range.0, self.damage_range.1)
            .with_speed(self.move_speed);
        stats.size_scale.set_base_value(self.scale);
        stats
    }

    fn basic(name: &str, max_health: f32, cost: u32, exp_value: u32, damage: (i32, i32), speed: f32) -> Self {
        Self {
            name: name.to_string(),
            kind: EnemyKind::Basic,
            max_health,
            cost,
            exp_value,
            damage_range: damage,
            move_speed: speed,
            scale: 1.0,
            collider: ColliderConfig::default(),
            leaper: LeaperConfig::default(),
            grunt: GruntConfig::default(),
            charger: ChargerConfig::default(),
        }
    }
}

/// Resource holding all loaded enemy definitions.
#[derive(Resource, Default)]
pub struct EnemyRegistry {
    pub definitions: HashMap<String, EnemyDefinition>,
}

impl EnemyRegistry {
    /// Get an enemy definition by type name.
    pub fn get(&self, enemy_type: &str) -> Option<&EnemyDefinition> {
        self.definitions.get(enemy_type)
    }

    /// Every registered type with its cost, sorted by name.
    pub fn pool(&self) -> Vec<(String, u32)> {
        let mut pool: Vec<(String, u32)> = self
            .definitions
            .iter()
            .map(|(key, definition)| (key.clone(), definition.cost))
            .collect();
        pool.sort();
        pool
    }

    pub fn builtin() -> Self {
        let grunt = EnemyDefinition::basic("Grunt", 40.0, 1, 3, (5, 8), 3.5);

        let mut leaper = EnemyDefinition::basic("Leaper", 30.0, 2, 5, (6, 10), 0.0);
        leaper.kind = EnemyKind::Leaper;
        leaper.collider.half_height = 0.3;

        let mut brute = EnemyDefinition::basic("Brute", 120.0, 5, 12, (12, 18), 2.5);
        brute.scale = 1.5;
        brute.grunt.attack_range = 2.5;
        brute.grunt.attack_cooldown = 2.2;
        brute.grunt.damage_multiplier = 1.25;

        let mut charger = EnemyDefinition::basic("Charger", 150.0, 6, 15, (10, 14), 3.0);
        charger.kind = EnemyKind::Charger;
        charger.scale = 1.3;
        charger.collider = ColliderConfig {
            half_height: 0.6,
            radius: 0.45,
        };

        let definitions = [
            ("grunt", grunt),
            ("leaper", leaper),
            ("brute", brute),
            ("charger", charger),
        ]
            .into_iter()
            .map(|(key, definition)| (key.to_string(), definition))
            .collect();
        Self { definitions }
    }
}

/// Load all enemy definitions from the assets/data/enemies/ directory.
pub fn load_enemy_definitions(mut registry: ResMut<EnemyRegistry>) {
    match load_ron_dir::<EnemyDefinition>(ENEMIES_DIR) {
        Ok(definitions) => {
            for (enemy_type, definition) in definitions {
                info!("Loaded enemy definition: {} ({})", definition.name, enemy_type);
                registry.definitions.insert(enemy_type, definition);
            }
        }
        Err(e) => warn!("{}", e),
    }

    if registry.definitions.is_empty() {
        warn!("No enemy definitions found, using built-in enemies");
        *registry = EnemyRegistry::builtin();
    }

    info!("Loaded {} enemy definitions", registry.definitions.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_parses_with_default_tuning() {
        let definition: EnemyDefinition = crate::core::parse_ron(
            "hopper.ron",
            r#"(
                name: "Hopper",
                kind: Leaper,
                max_health: 25.0,
                cost: 2,
                exp_value: 4,
                damage_range: (3, 6),
                move_speed: 0.0,
                leaper: (ready_hop_count: 3),
            )"#,
        )
        .unwrap();

        assert_eq!(definition.kind, EnemyKind::Leaper);
        assert_eq!(definition.leaper.ready_hop_count, 3);
        assert_eq!(definition.leaper.detection_distance, 15.0);
        assert_eq!(definition.to_stats().max_health.value(), 25.0);
    }

    #[test]
    fn shipped_definitions_match_builtin_pool() {
        let loaded = load_ron_dir::<EnemyDefinition>(ENEMIES_DIR).unwrap();
        let mut registry = EnemyRegistry::default();
        registry.definitions.extend(loaded);

        assert_eq!(registry.pool(), EnemyRegistry::builtin().pool());
        assert_eq!(registry.get("leaper").map(|d| d.kind), Some(EnemyKind::Leaper));
        assert_eq!(registry.get("brute").map(|d| d.grunt.leash_range), Some(15.0));
        assert_eq!(
            registry.get("charger").map(|d| (d.kind, d.charger.jab_count)),
            Some((EnemyKind::Charger, 5))
        );
    }

    #[test]
    fn builtin_pool_is_sorted() {
        let pool = EnemyRegistry::builtin().pool();
        assert_eq!(
            pool,
            vec![
                ("brute".to_string(), 5),
                ("charger".to_string(), 6),
                ("grunt".to_string(), 1),
                ("leaper".to_string(), 2)
            ]
        );
    }
}
