//! Core game module - states, events, data loading and fundamental systems.
//!
//! This module provides the foundation that all other game systems build upon.

mod data;
mod error;
mod events;
mod plugin;
mod sets;
mod states;

pub use data::{load_ron_dir, load_ron_file, parse_ron};
pub use error::DataLoadError;
pub use events::*;
pub use plugin::CorePlugin;
pub use sets::GameplaySet;
pub use states::*;
