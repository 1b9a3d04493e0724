use bevy::prelude::*;
use std::collections::BTreeMap;

use super::effect::{EffectContext, StatusEffect, StatusEffectKind};

/// What happened when an effect was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Stacked,
    /// A non-stackable effect of the same kind was cancelled first
    Replaced,
    Rejected,
}

/// Holds the status effects on an entity, at most one per kind.
#[derive(Component, Debug, Default, Clone)]
pub struct StatusEffector {
    effects: BTreeMap<StatusEffectKind, StatusEffect>,
}

impl StatusEffector {
    pub fn apply(
        &mut self,
        mut effect: StatusEffect,
        source: Option<Entity>,
        ctx: &mut EffectContext,
    ) -> ApplyOutcome {
        effect.source = source;
        let kind = effect.kind();

        let mut outcome = ApplyOutcome::Applied;
        if let Some(existing) = self.effects.get_mut(&kind) {
            if effect.stackable {
                return match existing.stack(effect, ctx) {
                    Ok(()) => ApplyOutcome::Stacked,
                    Err(err) => {
                        error!("{}", err);
                        ApplyOutcome::Rejected
                    }
                };
            }
            self.remove(kind, true, ctx);
            outcome = ApplyOutcome::Replaced;
        }

        if let Err(err) = effect.on_apply(ctx) {
            error!("{}", err);
            effect.on_cancel(ctx);
            return ApplyOutcome::Rejected;
        }

        self.effects.insert(kind, effect);
        outcome
    }

    /// Remove an effect. `cancel` skips the expiry path.
    pub fn remove(&mut self, kind: StatusEffectKind, cancel: bool, ctx: &mut EffectContext) -> bool {
        let Some(mut effect) = self.effects.remove(&kind) else {
            return false;
        };

        if cancel {
            effect.on_cancel(ctx);
        } else {
            effect.on_expire(ctx);
        }
        true
    }

    pub fn cancel_all(&mut self, ctx: &mut EffectContext) {
        let kinds: Vec<_> = self.effects.keys().copied().collect();
        for kind in kinds {
            self.remove(kind, true, ctx);
        }
    }

    /// Advance every effect, expiring the ones that ran out.
    pub fn update(&mut self, delta: f32, ctx: &mut EffectContext) {
        // Hooks may remove effects, so walk a snapshot
        let kinds: Vec<_> = self.effects.keys().copied().collect();
        for kind in kinds {
            let Some(effect) = self.effects.get_mut(&kind) else {
                continue;
            };
            if effect.update(delta, ctx) {
                self.remove(kind, false, ctx);
            }
        }
    }

    pub fn get(&self, kind: StatusEffectKind) -> Option<&StatusEffect> {
        self.effects.get(&kind)
    }

    pub fn get_mut(&mut self, kind: StatusEffectKind) -> Option<&mut StatusEffect> {
        self.effects.get_mut(&kind)
    }

    pub fn has(&self, kind: StatusEffectKind) -> bool {
        self.effects.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityStats;
    use crate::status_effects::EffectSignal;
    use std::collections::HashMap;

    fn owner() -> Entity {
        Entity::from_raw(3)
    }

    #[test]
    fn duration_effects_stack_additively() {
        let sources = HashMap::new();
        let mut stats = EntityStats::default();
        let mut ctx = EffectContext::new(owner(), &mut stats, 100, &sources);
        let mut effector = StatusEffector::default();

        effector.apply(StatusEffect::temporary_speed(1.2, 2.0), None, &mut ctx);
        let outcome = effector.apply(StatusEffect::temporary_speed(1.5, 3.0), None, &mut ctx);

        assert_eq!(outcome, ApplyOutcome::Stacked);
        let haste = effector.get(StatusEffectKind::TemporarySpeed).unwrap();
        assert_eq!(haste.remaining_duration(), Some(5.0));
        assert!((ctx.stats.status_speed.value() - 1.8).abs() < 1e-5);
    }

    #[test]
    fn non_stackable_effects_are_replaced() {
        let sources = HashMap::new();
        let mut stats = EntityStats::default();
        let mut ctx = EffectContext::new(owner(), &mut stats, 100, &sources);
        let mut effector = StatusEffector::default();

        effector.apply(StatusEffect::unbreakable_shield(1.0), None, &mut ctx);
        let outcome = effector.apply(StatusEffect::unbreakable_shield(4.0), None, &mut ctx);

        assert_eq!(outcome, ApplyOutcome::Replaced);
        let shield = effector.get(StatusEffectKind::UnbreakableShield).unwrap();
        assert_eq!(shield.remaining_duration(), Some(4.0));

        // on, off (old one cancelled), on
        let toggles: Vec<_> = ctx
            .signals
            .iter()
            .filter_map(|s| match s {
                EffectSignal::SetInvincible { invincible, .. } => Some(*invincible),
                _ => None,
            })
            .collect();
        assert_eq!(toggles, vec![true, false, true]);
    }

    #[test]
    fn incoming_flag_decides_stacking() {
        let sources = HashMap::new();
        let mut stats = EntityStats::default();
        let mut ctx = EffectContext::new(owner(), &mut stats, 100, &sources);
        let mut effector = StatusEffector::default();

        effector.apply(StatusEffect::unbreakable_shield(1.0), None, &mut ctx);
        let outcome = effector.apply(
            StatusEffect::unbreakable_shield(2.0).stackable(),
            None,
            &mut ctx,
        );
        assert_eq!(outcome, ApplyOutcome::Stacked);
        let shield = effector.get(StatusEffectKind::UnbreakableShield).unwrap();
        assert_eq!(shield.remaining_duration(), Some(3.0));

        // A non-stackable arrival replaces a stackable instance
        let outcome = effector.apply(StatusEffect::unbreakable_shield(4.0), None, &mut ctx);
        assert_eq!(outcome, ApplyOutcome::Replaced);
        let shield = effector.get(StatusEffectKind::UnbreakableShield).unwrap();
        assert_eq!(shield.remaining_duration(), Some(4.0));
    }

    #[test]
    fn cancel_skips_expiry() {
        let sources = HashMap::new();
        let mut stats = EntityStats::default();
        let mut ctx = EffectContext::new(owner(), &mut stats, 100, &sources);
        let mut effector = StatusEffector::default();

        effector.apply(StatusEffect::temporary_speed(2.0, 1.0), None, &mut ctx);
        assert!(effector.remove(StatusEffectKind::TemporarySpeed, true, &mut ctx));

        assert!(!ctx
            .signals
            .iter()
            .any(|s| matches!(s, EffectSignal::Expired { .. })));
        assert_eq!(ctx.stats.status_speed.value(), 1.0);
        assert!(!effector.remove(StatusEffectKind::TemporarySpeed, true, &mut ctx));
    }

    #[test]
    fn expired_effects_are_removed_and_cleaned_up() {
        let sources = HashMap::new();
        let mut stats = EntityStats::default();
        let mut ctx = EffectContext::new(owner(), &mut stats, 100, &sources);
        let mut effector = StatusEffector::default();

        effector.apply(StatusEffect::temporary_speed(2.0, 1.0), None, &mut ctx);
        effector.update(0.5, &mut ctx);
        assert!(effector.has(StatusEffectKind::TemporarySpeed));

        effector.update(0.6, &mut ctx);
        assert!(!effector.has(StatusEffectKind::TemporarySpeed));
        assert_eq!(ctx.stats.status_speed.value(), 1.0);
        assert!(ctx.signals.contains(&EffectSignal::Expired {
            target: owner(),
            kind: StatusEffectKind::TemporarySpeed,
        }));
    }

    #[test]
    fn burn_deals_damage_each_tick_then_expires() {
        let sources = HashMap::new();
        let mut stats = EntityStats::default();
        let mut ctx = EffectContext::new(owner(), &mut stats, 100, &sources);
        let mut effector = StatusEffector::default();

        effector.apply(StatusEffect::burn(), None, &mut ctx);
        for _ in 0..4 {
            effector.update(0.3, &mut ctx);
        }

        let ticks = ctx
            .signals
            .iter()
            .filter(|s| matches!(s, EffectSignal::Damage { amount: 1, .. }))
            .count();
        assert_eq!(ticks, 2);
        assert!(effector.is_empty());
    }

    #[test]
    fn cancel_all_clears_every_effect() {
        let sources = HashMap::new();
        let mut stats = EntityStats::default();
        let mut ctx = EffectContext::new(owner(), &mut stats, 100, &sources);
        let mut effector = StatusEffector::default();

        effector.apply(StatusEffect::permanent_speed(1.5), None, &mut ctx);
        effector.apply(StatusEffect::max_health_increase(20.0), None, &mut ctx);
        effector.cancel_all(&mut ctx);

        assert!(effector.is_empty());
        assert_eq!(ctx.stats.status_speed.value(), 1.0);
        assert_eq!(ctx.stats.max_health.value(), 100.0);
    }
}
