//! Enemies module - enemy definitions, targeting and the grunt, leaper and
//! charger behaviours.

mod ai;
pub mod charger;
mod components;
pub mod data;
pub mod grunt;
pub mod leaper;
mod plugin;
mod spawning;

pub use charger::{ChargerConfig, ChargerState};
pub use components::*;
pub use data::{EnemyDefinition, EnemyKind, EnemyRegistry};
pub use grunt::{GruntConfig, GruntState};
pub use leaper::{LeaperConfig, LeaperState};
pub use plugin::EnemyPlugin;
pub use spawning::{default_state, spawn_enemy};
