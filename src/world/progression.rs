//! Empower and weaken tokens spent on lands between events.

use bevy::prelude::*;

use super::land::{LandError, LandGrid};

pub const BASE_EMPOWER_TOKENS: i32 = 2;
pub const BASE_WEAKEN_TOKENS: i32 = 1;

#[derive(Resource, Debug, Clone)]
pub struct Progression {
    pub empower_tokens: i32,
    pub weaken_tokens: i32,
}

impl Default for Progression {
    fn default() -> Self {
        Self {
            empower_tokens: BASE_EMPOWER_TOKENS,
            weaken_tokens: BASE_WEAKEN_TOKENS,
        }
    }
}

impl Progression {
    /// Hand out the tokens for one empowerment phase.
    pub fn restock(&mut self) {
        self.empower_tokens = BASE_EMPOWER_TOKENS;
        self.weaken_tokens = BASE_WEAKEN_TOKENS;
    }

    /// Raise a land by one level. Empowering a land weakened this phase
    /// undoes the weakening instead of spending a token.
    pub fn empower(&mut self, grid: &mut LandGrid, position: IVec2) -> Result<bool, LandError> {
        let land = grid.land_mut(position).ok_or(LandError::NoLand(position))?;
        let refund = land.level_difference < 0;
        if !refund && self.empower_tokens <= 0 {
            return Ok(false);
        }
        if !land.try_add_level(1) {
            return Ok(false);
        }

        if refund {
            self.weaken_tokens += 1;
        } else {
            self.empower_tokens -= 1;
        }
        Ok(true)
    }

    /// Lower a land by one level. Weakening a land empowered this phase
    /// undoes the empowering instead of spending a token.
    pub fn weaken(&mut self, grid: &mut LandGrid, position: IVec2) -> Result<bool, LandError> {
        let land = grid.land_mut(position).ok_or(LandError::NoLand(position))?;
        let refund = land.level_difference > 0;
        if !refund && self.weaken_tokens <= 0 {
            return Ok(false);
        }
        if !land.try_add_level(-1) {
            return Ok(false);
        }

        if refund {
            self.empower_tokens += 1;
        } else {
            self.weaken_tokens -= 1;
        }
        Ok(true)
    }

    /// Every token is spent, or there is nothing left to spend them on.
    pub fn can_proceed(&self, grid: &LandGrid) -> bool {
        let empower_possible = self.empower_tokens > 0
            && grid.lands.values().any(|land| land.level < land.max_level);
        let weaken_possible = self.weaken_tokens > 0
            && grid.lands.values().any(|land| land.level > land.min_level);
        !empower_possible && !weaken_possible
    }

    /// Confirm this phase's changes.
    pub fn confirm(&self, grid: &mut LandGrid) {
        for land in grid.lands.values_mut() {
            land.reset_level_difference();
        }
    }

    /// Undo every unconfirmed change and take the tokens back.
    pub fn refund(&mut self, grid: &mut LandGrid) {
        for land in grid.lands.values_mut() {
            if land.level_difference > 0 {
                self.empower_tokens += land.level_difference;
            } else {
                self.weaken_tokens -= land.level_difference;
            }
            land.undo_level_changes();
        }
    }
}
