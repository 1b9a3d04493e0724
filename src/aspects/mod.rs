//! Aspects module - branching upgrade trees unlocked with tokens earned by
//! levelling up.

mod data;
mod manager;
mod plugin;
mod systems;
mod tree;

pub use data::AspectRegistry;
pub use manager::{AspectError, AspectsManager, LevelSystem, ASPECT_SLOTS};
pub use plugin::AspectsPlugin;
pub use systems::{AspectChoiceEvent, AspectUnlockedEvent};
pub use tree::{AspectNode, AspectReward, AspectTree};
