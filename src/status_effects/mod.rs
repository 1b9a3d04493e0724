//! Status effects module - timed, ticking and permanent modifiers carried by
//! actors, with per-kind stacking rules.

mod effect;
mod effector;
mod plugin;
mod systems;

pub use effect::*;
pub use effector::{ApplyOutcome, StatusEffector};
pub use plugin::StatusEffectsPlugin;
pub use systems::{
    ApplyStatusEffectEvent, EffectOutbox, RemoveStatusEffectEvent, StatusEffectExpiredEvent,
};
