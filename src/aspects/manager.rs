//! Per-owner aspect slots, tokens and experience.

use bevy::prelude::*;
use thiserror::Error;

use super::tree::{AspectReward, AspectTree};

/// How many aspects an owner can equip at once.
pub const ASPECT_SLOTS: usize = 2;

#[derive(Debug, Error, PartialEq)]
pub enum AspectError {
    #[error("Aspect '{0}' is already equipped")]
    Duplicate(String),
    #[error("No free aspect slot for '{0}'")]
    SlotsFull(String),
    #[error("Aspect '{0}' is not equipped")]
    NotEquipped(String),
    #[error("Node {node} of '{aspect}' cannot be unlocked")]
    NodeUnavailable { aspect: String, node: usize },
    #[error("No aspect tokens left")]
    NoTokens,
}

/// Equipped aspect trees and the tokens spent to unlock their nodes.
#[derive(Component, Debug, Default, Clone)]
pub struct AspectsManager {
    equipped: [Option<AspectTree>; ASPECT_SLOTS],
    pub tokens: u32,
}

impl AspectsManager {
    /// Equip a fresh copy of `tree` in the first free slot.
    pub fn equip(&mut self, tree: &AspectTree) -> Result<usize, AspectError> {
        if self.equipped_tree(&tree.name).is_some() {
            return Err(AspectError::Duplicate(tree.name.clone()));
        }

        let slot = self
            .equipped
            .iter()
            .position(Option::is_none)
            .ok_or_else(|| AspectError::SlotsFull(tree.name.clone()))?;
        self.equipped[slot] = Some(tree.instantiate());
        Ok(slot)
    }

    pub fn equipped(&self) -> impl Iterator<Item = &AspectTree> {
        self.equipped.iter().flatten()
    }

    pub fn equipped_tree(&self, name: &str) -> Option<&AspectTree> {
        self.equipped().find(|tree| tree.name == name)
    }

    pub fn has_free_slot(&self) -> bool {
        self.equipped.iter().any(Option::is_none)
    }

    /// Trees from `all` that are not equipped yet.
    pub fn available_unequipped<'a>(&self, all: &'a [AspectTree]) -> Vec<&'a AspectTree> {
        all.iter()
            .filter(|tree| self.equipped_tree(&tree.name).is_none())
            .collect()
    }

    /// True only when every slot holds a completed tree.
    pub fn all_equipped_completed(&self) -> bool {
        self.equipped
            .iter()
            .all(|slot| slot.as_ref().is_some_and(AspectTree::is_completed))
    }

    /// Whether a token could be spent on anything right now.
    pub fn has_choices(&self, all: &[AspectTree]) -> bool {
        if self.tokens == 0 {
            return false;
        }
        let can_equip = self.has_free_slot() && !self.available_unequipped(all).is_empty();
        let can_unlock = self.equipped().any(|tree| {
            tree.next_unapplied()
                .into_iter()
                .any(|node| tree.can_choose(node))
        });
        can_equip || can_unlock
    }

    /// Every (aspect, node) a token could be spent on, equipped aspects first.
    /// Unequipped aspects offer their root while a slot is free.
    pub fn choices(&self, all: &[AspectTree]) -> Vec<(String, usize)> {
        let mut choices: Vec<(String, usize)> = self
            .equipped()
            .flat_map(|tree| {
                tree.next_unapplied()
                    .into_iter()
                    .filter(|node| tree.can_choose(*node))
                    .map(|node| (tree.name.clone(), node))
            })
            .collect();

        if self.has_free_slot() {
            for tree in self.available_unequipped(all) {
                if let Some(root) = tree.root() {
                    choices.push((tree.name.clone(), root));
                }
            }
        }
        choices
    }

    /// Spend a token on `node` of an equipped aspect and return its reward.
    pub fn unlock(&mut self, aspect: &str, node: usize) -> Result<AspectReward, AspectError> {
        if self.tokens == 0 {
            return Err(AspectError::NoTokens);
        }

        let tree = self
            .equipped
            .iter_mut()
            .flatten()
            .find(|tree| tree.name == aspect)
            .ok_or_else(|| AspectError::NotEquipped(aspect.to_string()))?;

        if !tree.next_unapplied().contains(&node) || !tree.can_choose(node) {
            return Err(AspectError::NodeUnavailable {
                aspect: aspect.to_string(),
                node,
            });
        }

        let chosen = &mut tree.nodes[node];
        chosen.applied = true;
        self.tokens -= 1;
        Ok(chosen.reward.clone())
    }
}

/// Experience and level of an entity that gains exp from kills.
#[derive(Component, Debug, Clone)]
pub struct LevelSystem {
    pub level: u32,
    pub current_exp: u32,
    pub max_exp: u32,
}

impl Default for LevelSystem {
    fn default() -> Self {
        Self {
            level: 1,
            current_exp: 0,
            max_exp: Self::max_exp_for(1),
        }
    }
}

impl LevelSystem {
    const BASE_MAX_EXP: u32 = 10;
    const LINEAR_GROWTH: u32 = 10;
    const EXPONENTIAL_GROWTH: f32 = 1.2;

    /// Exp needed to finish `level`.
    pub fn max_exp_for(level: u32) -> u32 {
        let level = level.max(1);
        let linear = Self::LINEAR_GROWTH * (level - 1);
        let exponential = if level > 1 {
            Self::EXPONENTIAL_GROWTH.powi(level as i32 - 1).floor() as u32
        } else {
            0
        };
        Self::BASE_MAX_EXP + linear + exponential
    }

    /// Add exp, levelling up as many times as it overflows.
    /// Returns the levels reached, in order.
    pub fn add_exp(&mut self, amount: u32) -> Vec<u32> {
        self.current_exp += amount;

        let mut reached = Vec::new();
        while self.current_exp >= self.max_exp {
            self.current_exp -= self.max_exp;
            reached.push(self.level_up());
        }
        reached
    }

    /// Gain a level outright, keeping the current exp.
    pub fn level_up(&mut self) -> u32 {
        self.level += 1;
        self.max_exp = Self::max_exp_for(self.level);
        self.level
    }
}
