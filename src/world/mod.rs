//! World module - the land grid, per-land enemy spawners, world events and
//! the phases a run moves through between them.

mod data;
mod debug;
mod events;
mod flow;
mod geometry;
mod land;
mod manager;
mod plugin;
mod progression;
mod spawner;
mod systems;

pub use data::WorldConfig;
pub use events::{formatted_time, EventStatus, WorldEvent, WorldEventKind};
pub use flow::{EmpowerLandRequest, LandCursor, PlaceLandRequest, SelectWorldEvent};
pub use geometry::{LandFloor, WorldGeometry};
pub use land::{Land, LandError, LandGrid, LAND_SCALE, MAX_LAND_LEVEL, MIN_LAND_LEVEL};
pub use manager::EventManager;
pub use plugin::WorldPlugin;
pub use progression::Progression;
pub use spawner::{EnemySpawner, SpawnRequest, SpawnerConfig, SpawnerNotice};
pub use systems::{EscortPath, EventObjective};
