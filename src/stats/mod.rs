//! Stats module - base values with per-source multipliers and flat bonuses.

mod stat;

pub use stat::{BuffSource, Buffs, Stat};
