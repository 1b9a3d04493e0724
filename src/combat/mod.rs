//! Combat module - combo resolution, weapons and hit handling.

pub mod combo;
mod components;
mod data;
mod plugin;
mod systems;
mod tracker;

pub use combo::{ComboAction, ComboDefinition};
pub use components::*;
pub use data::{ComboRegistry, WeaponDefinition, WeaponRegistry, STARTER_WEAPON};
pub use plugin::CombatPlugin;
pub use tracker::{ComboResolution, ComboTracker};
