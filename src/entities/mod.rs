//! Entities module - the shared actor model: stats, health, teams, the state
//! machine and target queries.

mod components;
mod plugin;
mod state;
mod systems;
pub mod targeting;

pub use components::*;
pub use plugin::EntitiesPlugin;
pub use state::*;
pub use systems::{actor_bundle, SpawnFinishedEvent};
pub use targeting::{TargetCandidate, TARGET_DETECTION_RADIUS};
