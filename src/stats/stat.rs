//! A single modifiable stat.
//!
//! Every buff is filed under the source that applied it, so a status effect
//! or an impact-frame freeze can remove exactly its own contribution without
//! touching anyone else's.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::status_effects::StatusEffectKind;

/// Identity of whatever applied a buff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuffSource {
    /// A status effect on the stat owner
    Effect(StatusEffectKind),
    /// Another entity (auras, elites spawned by a spawner)
    Entity(Entity),
    /// The hit-stop slowdown applied by combo impacts
    ImpactFrames,
    /// Anything else, keyed by name (debug tools, tests)
    Named(&'static str),
}

/// Contributions from one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buffs {
    pub multipliers: Vec<f32>,
    pub flat: f32,
}

/// A base value modified by multipliers and flat increases.
///
/// The final value is `base * product(all multipliers) + sum(all flats)`.
#[derive(Debug, Clone, Default)]
pub struct Stat {
    base: f32,
    buffs: HashMap<BuffSource, Buffs>,
}

impl Stat {
    pub fn new(base: f32) -> Self {
        Self {
            base,
            buffs: HashMap::new(),
        }
    }

    pub fn base_value(&self) -> f32 {
        self.base
    }

    pub fn set_base_value(&mut self, base: f32) {
        self.base = base;
    }

    pub fn add_multiplier(&mut self, multiplier: f32, source: BuffSource) {
        self.buffs.entry(source).or_default().multipliers.push(multiplier);
    }

    /// Remove one multiplier equal to `multiplier` from `source`.
    /// Returns false if the source never applied it.
    pub fn remove_multiplier(&mut self, multiplier: f32, source: BuffSource) -> bool {
        let Some(buffs) = self.buffs.get_mut(&source) else {
            return false;
        };

        match buffs.multipliers.iter().position(|m| *m == multiplier) {
            Some(index) => {
                buffs.multipliers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear_multipliers_from_source(&mut self, source: BuffSource) {
        if let Some(buffs) = self.buffs.get_mut(&source) {
            buffs.multipliers.clear();
        }
    }

    /// Flat amounts from the same source accumulate.
    pub fn add_flat_amount(&mut self, amount: f32, source: BuffSource) {
        self.buffs.entry(source).or_default().flat += amount;
    }

    pub fn clear_flat_increase_from_source(&mut self, source: BuffSource) {
        if let Some(buffs) = self.buffs.get_mut(&source) {
            buffs.flat = 0.0;
        }
    }

    /// Drop every contribution from `source`. Safe to call repeatedly.
    pub fn clear_buffs_from_source(&mut self, source: BuffSource) {
        self.buffs.remove(&source);
    }

    pub fn clear_all_buffs(&mut self) {
        self.buffs.clear();
    }

    pub fn buffs_from(&self, source: BuffSource) -> Option<&Buffs> {
        self.buffs.get(&source)
    }

    pub fn total_multiplier(&self) -> f32 {
        self.buffs
            .values()
            .flat_map(|buffs| buffs.multipliers.iter())
            .product()
    }

    pub fn total_flat_increase(&self) -> f32 {
        self.buffs.values().map(|buffs| buffs.flat).sum()
    }

    pub fn value(&self) -> f32 {
        self.base * self.total_multiplier() + self.total_flat_increase()
    }

    pub fn int_value(&self) -> i32 {
        self.value().round() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAGE: BuffSource = BuffSource::Named("rage");
    const HASTE: BuffSource = BuffSource::Named("haste");

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn unmodified_stat_is_its_base() {
        let stat = Stat::new(12.5);
        assert_eq!(stat.value(), 12.5);
        assert_eq!(stat.total_multiplier(), 1.0);
        assert_eq!(stat.total_flat_increase(), 0.0);
    }

    #[test]
    fn multipliers_apply_before_flats() {
        let mut stat = Stat::new(10.0);
        stat.add_multiplier(2.0, RAGE);
        stat.add_multiplier(1.5, HASTE);
        stat.add_flat_amount(3.0, RAGE);
        stat.add_flat_amount(1.0, HASTE);

        // 10 * 2 * 1.5 + 3 + 1
        assert!(approx(stat.value(), 34.0));
        assert_eq!(stat.int_value(), 34);
    }

    #[test]
    fn flat_amounts_from_one_source_accumulate() {
        let mut stat = Stat::new(0.0);
        stat.add_flat_amount(2.0, RAGE);
        stat.add_flat_amount(2.5, RAGE);
        assert!(approx(stat.total_flat_increase(), 4.5));

        stat.clear_flat_increase_from_source(RAGE);
        assert_eq!(stat.total_flat_increase(), 0.0);
    }

    #[test]
    fn remove_multiplier_removes_a_single_match() {
        let mut stat = Stat::new(1.0);
        stat.add_multiplier(2.0, RAGE);
        stat.add_multiplier(2.0, RAGE);

        assert!(stat.remove_multiplier(2.0, RAGE));
        assert!(approx(stat.value(), 2.0));
        assert!(!stat.remove_multiplier(3.0, RAGE));
        assert!(!stat.remove_multiplier(2.0, HASTE));
    }

    #[test]
    fn clearing_one_source_leaves_others_untouched() {
        let mut stat = Stat::new(4.0);
        stat.add_multiplier(0.5, RAGE);
        stat.add_flat_amount(1.0, RAGE);
        stat.add_multiplier(3.0, HASTE);

        stat.clear_buffs_from_source(RAGE);
        let once = stat.value();
        stat.clear_buffs_from_source(RAGE);

        assert!(approx(once, 12.0));
        assert_eq!(once, stat.value());
        assert!(stat.buffs_from(HASTE).is_some());
    }

    #[test]
    fn clear_multipliers_keeps_flat_from_same_source() {
        let mut stat = Stat::new(2.0);
        stat.add_multiplier(4.0, RAGE);
        stat.add_flat_amount(1.0, RAGE);

        stat.clear_multipliers_from_source(RAGE);
        assert!(approx(stat.value(), 3.0));
    }

    #[test]
    fn value_matches_formula_over_mixed_operations() {
        let sources = [RAGE, HASTE, BuffSource::ImpactFrames];
        let mut stat = Stat::new(7.0);
        let mut expected_mults: Vec<(BuffSource, f32)> = Vec::new();
        let mut expected_flats: Vec<(BuffSource, f32)> = Vec::new();

        for step in 0..30 {
            let source = sources[step % sources.len()];
            let amount = 1.0 + (step % 4) as f32 * 0.25;
            match step % 5 {
                0 | 3 => {
                    stat.add_multiplier(amount, source);
                    expected_mults.push((source, amount));
                }
                1 => {
                    stat.add_flat_amount(amount, source);
                    expected_flats.push((source, amount));
                }
                2 => {
                    if let Some(index) = expected_mults
                        .iter()
                        .position(|(s, m)| *s == source && *m == amount)
                    {
                        assert!(stat.remove_multiplier(amount, source));
                        expected_mults.remove(index);
                    }
                }
                _ => {
                    stat.clear_buffs_from_source(source);
                    expected_mults.retain(|(s, _)| *s != source);
                    expected_flats.retain(|(s, _)| *s != source);
                }
            }

            let product: f32 = expected_mults.iter().map(|(_, m)| m).product();
            let sum: f32 = expected_flats.iter().map(|(_, f)| f).sum();
            assert!(approx(stat.value(), 7.0 * product + sum), "step {step}");
        }
    }

    #[test]
    fn clear_all_buffs_restores_base() {
        let mut stat = Stat::new(9.0);
        stat.add_multiplier(2.0, RAGE);
        stat.add_flat_amount(5.0, HASTE);
        stat.clear_all_buffs();
        assert_eq!(stat.value(), 9.0);

        stat.set_base_value(3.0);
        assert_eq!(stat.int_value(), 3);
    }
}
