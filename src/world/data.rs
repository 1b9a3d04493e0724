//! World tuning loaded from `assets/data/world.ron`.

use bevy::prelude::*;
use serde::Deserialize;

use super::spawner::SpawnerConfig;
use crate::core::{load_ron_file, DataLoadError};

/// Where the world tuning file lives.
pub const WORLD_CONFIG_PATH: &str = "assets/data/world.ron";

/// Everything the land grid and world events are tuned by.
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub spawner: SpawnerConfig,
    /// Enemies spawned per interval before player count is added
    pub base_spawn_amount: u32,
    pub survival: SurvivalConfig,
    pub priorities: PrioritiesConfig,
    pub zones: ZonesConfig,
    pub visit_all: VisitAllConfig,
    pub defend: DefendConfig,
    pub escort: EscortConfig,
    pub tutorial: TutorialConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            spawner: SpawnerConfig::default(),
            base_spawn_amount: 2,
            survival: SurvivalConfig::default(),
            priorities: PrioritiesConfig::default(),
            zones: ZonesConfig::default(),
            visit_all: VisitAllConfig::default(),
            defend: DefendConfig::default(),
            escort: EscortConfig::default(),
            tutorial: TutorialConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SurvivalConfig {
    pub base_time_limit: f32,
    /// Added for every two lands past the first
    pub time_increment: f32,
    pub intervals: u32,
}

impl Default for SurvivalConfig {
    fn default() -> Self {
        Self {
            base_time_limit: 40.0,
            time_increment: 10.0,
            intervals: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrioritiesConfig {
    /// Lands needed for each extra priority land
    pub lands_per_top_land: u32,
    pub burst_interval: f32,
    pub base_spawn_interval: f32,
}

impl Default for PrioritiesConfig {
    fn default() -> Self {
        Self {
            lands_per_top_land: 4,
            burst_interval: 0.1,
            base_spawn_interval: 3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ZonesConfig {
    pub base_spawn_interval: f32,
    /// Grow the zone outward from a weighted epicentre instead of a 3x3 block
    pub epicentre: bool,
    pub max_search_layer: i32,
}

impl Default for ZonesConfig {
    fn default() -> Self {
        Self {
            base_spawn_interval: 3.0,
            epicentre: false,
            max_search_layer: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisitAllConfig {
    pub count_modifier: f32,
    pub y_intercept: f32,
    pub radius_decay_rate: f32,
    pub minimum_radius: f32,
    pub base_spawn_interval: f32,
}

impl Default for VisitAllConfig {
    fn default() -> Self {
        Self {
            count_modifier: 0.75,
            y_intercept: 10.0,
            radius_decay_rate: 0.15,
            minimum_radius: 2.0,
            base_spawn_interval: 3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefendConfig {
    pub base_time_limit: f32,
    pub time_increment: f32,
    /// Manhattan rings around the objective that spawn enemies
    pub end_layer: i32,
    pub intervals: u32,
    pub objective_health: f32,
}

impl Default for DefendConfig {
    fn default() -> Self {
        Self {
            base_time_limit: 40.0,
            time_increment: 20.0,
            end_layer: 2,
            intervals: 3,
            objective_health: 200.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EscortConfig {
    pub base_spawn_interval: f32,
    pub objective_health: f32,
    pub walk_speed: f32,
}

impl Default for EscortConfig {
    fn default() -> Self {
        Self {
            base_spawn_interval: 8.0,
            objective_health: 200.0,
            walk_speed: 2.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TutorialConfig {
    pub spawn_interval: f32,
}

impl Default for TutorialConfig {
    fn default() -> Self {
        Self {
            spawn_interval: 3.0,
        }
    }
}

impl WorldConfig {
    pub fn load(path: &str) -> Result<Self, DataLoadError> {
        load_ron_file(path)
    }
}

/// Startup system: read the world tuning, keeping defaults if it's missing.
pub fn load_world_config(mut commands: Commands) {
    let config = match WorldConfig::load(WORLD_CONFIG_PATH) {
        Ok(config) => {
            info!("Loaded world config from {}", WORLD_CONFIG_PATH);
            config
        }
        Err(e) => {
            warn!("{}, using default world config", e);
            WorldConfig::default()
        }
    };
    commands.insert_resource(config);
}
