//! Status effect instances and their lifecycle hooks.
//!
//! A [`StatusEffect`] doubles as its own template: definitions are loaded or
//! built with their initial timing, cloned per application, and reset in
//! `on_apply`. Per-kind behaviour lives in [`EffectParams`].

use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::entities::EntityStats;
use crate::stats::{BuffSource, Stat};

/// Identity of an effect. An entity holds at most one effect per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum StatusEffectKind {
    Burn,
    TemporarySpeed,
    PermanentSpeed,
    LifeSteal,
    UnbreakableShield,
    MaxHealthIncrease,
    ExtendedDebuffs,
    BurningRage,
    GhastlyGrievance,
    RagePassive,
    FearPassive,
    RagePassiveB,
    FearPassiveB,
    EliteBrute,
}

/// Whether an effect helps or hurts its owner. Decides which of the source's
/// apply-duration stats scales it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Polarity {
    #[default]
    None,
    Buff,
    Debuff,
}

/// A stat the fear passive can raise once its stacks fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum FearBuff {
    Damage,
    Speed,
    Defense,
}

impl FearBuff {
    pub const ALL: [FearBuff; 3] = [FearBuff::Damage, FearBuff::Speed, FearBuff::Defense];

    fn stat(self, stats: &mut EntityStats) -> &mut Stat {
        match self {
            FearBuff::Damage => &mut stats.damage_modifier,
            FearBuff::Speed => &mut stats.status_speed,
            FearBuff::Defense => &mut stats.defense,
        }
    }
}

/// How an effect runs out.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum EffectTiming {
    /// Lasts until removed
    Permanent,
    /// Counts down `remaining` from `duration`
    Duration {
        duration: f32,
        #[serde(default)]
        remaining: f32,
    },
    /// Fires `ticks` ticks, one every `tick_duration`
    Tick {
        ticks: u32,
        tick_duration: f32,
        #[serde(default)]
        timer: f32,
        #[serde(default)]
        current: u32,
    },
}

impl EffectTiming {
    pub fn duration(duration: f32) -> Self {
        EffectTiming::Duration {
            duration,
            remaining: duration,
        }
    }

    pub fn ticks(ticks: u32, tick_duration: f32) -> Self {
        EffectTiming::Tick {
            ticks,
            tick_duration,
            timer: 0.0,
            current: 0,
        }
    }

    fn reset(&mut self) {
        match self {
            EffectTiming::Permanent => {}
            EffectTiming::Duration {
                duration,
                remaining,
            } => *remaining = *duration,
            EffectTiming::Tick { timer, current, .. } => {
                *timer = 0.0;
                *current = 0;
            }
        }
    }

    /// Default stacking: durations add up, tick counts add up and the
    /// incoming tick rate wins.
    fn stack(&mut self, incoming: &EffectTiming) {
        match (self, incoming) {
            (
                EffectTiming::Duration { remaining, .. },
                EffectTiming::Duration { duration, .. },
            ) => *remaining += *duration,
            (
                EffectTiming::Tick {
                    ticks,
                    tick_duration,
                    ..
                },
                EffectTiming::Tick {
                    ticks: new_ticks,
                    tick_duration: new_tick_duration,
                    ..
                },
            ) => {
                *ticks += *new_ticks;
                *tick_duration = *new_tick_duration;
            }
            _ => {}
        }
    }
}

/// Per-kind configuration and runtime counters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum EffectParams {
    Burn {
        damage_per_tick: i32,
        #[serde(default)]
        extra_tick_on_apply: bool,
    },
    TemporarySpeed {
        multiplier: f32,
    },
    PermanentSpeed {
        multiplier: f32,
    },
    LifeSteal {
        heal_percent: f32,
    },
    UnbreakableShield,
    MaxHealthIncrease {
        amount: f32,
    },
    ExtendedDebuffs {
        multiplier: f32,
    },
    BurningRage {
        #[serde(default)]
        stacks: u32,
        max_stacks: u32,
        tick_damage_per_stack: f32,
        combust_radius: f32,
        combust_radius_growth: f32,
        combust_damage_per_stack: f32,
    },
    GhastlyGrievance {
        #[serde(default)]
        stacks: u32,
        max_stacks: u32,
        base_threshold: f32,
        threshold_per_stack: f32,
    },
    /// Weapon hits apply `burning_rage` to the victim
    RagePassive {
        burning_rage: Box<StatusEffect>,
    },
    /// Weapon hits apply `grievance` to the victim
    FearPassive {
        grievance: Box<StatusEffect>,
    },
    /// Charged releases scale with charge time and charged hits explode
    /// into the victim's allies
    RagePassiveB {
        max_charge_duration: f32,
        /// Bonus per charge interval, the first interval earns nothing
        charge_bonus_multipliers: Vec<f32>,
        explosion_damage_multiplier: f32,
        explosion_radius: f32,
        /// Releasing within this long after a full charge is perfect timing
        perfect_window: f32,
        perfect_bonus_multiplier: f32,
        perfect_radius_multiplier: f32,
        #[serde(default)]
        perfect_swing: bool,
    },
    /// Every stun dealt adds a stack. A full set of stacks raises one more
    /// stat until `stack_reset` seconds pass without a stun.
    FearPassiveB {
        max_stacks: u32,
        stack_reset: f32,
        damage_multiplier: f32,
        speed_multiplier: f32,
        defense_multiplier: f32,
        #[serde(default)]
        stacks: u32,
        #[serde(default)]
        timer: f32,
        #[serde(default)]
        active: Vec<FearBuff>,
    },
    EliteBrute {
        time_scale_multiplier: f32,
    },
}

impl EffectParams {
    pub fn kind(&self) -> StatusEffectKind {
        match self {
            EffectParams::Burn { .. } => StatusEffectKind::Burn,
            EffectParams::TemporarySpeed { .. } => StatusEffectKind::TemporarySpeed,
            EffectParams::PermanentSpeed { .. } => StatusEffectKind::PermanentSpeed,
            EffectParams::LifeSteal { .. } => StatusEffectKind::LifeSteal,
            EffectParams::UnbreakableShield => StatusEffectKind::UnbreakableShield,
            EffectParams::MaxHealthIncrease { .. } => StatusEffectKind::MaxHealthIncrease,
            EffectParams::ExtendedDebuffs { .. } => StatusEffectKind::ExtendedDebuffs,
            EffectParams::BurningRage { .. } => StatusEffectKind::BurningRage,
            EffectParams::GhastlyGrievance { .. } => StatusEffectKind::GhastlyGrievance,
            EffectParams::RagePassive { .. } => StatusEffectKind::RagePassive,
            EffectParams::FearPassive { .. } => StatusEffectKind::FearPassive,
            EffectParams::RagePassiveB { .. } => StatusEffectKind::RagePassiveB,
            EffectParams::FearPassiveB { .. } => StatusEffectKind::FearPassiveB,
            EffectParams::EliteBrute { .. } => StatusEffectKind::EliteBrute,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum StackError {
    #[error("cannot stack {incoming:?} onto {existing:?}")]
    KindMismatch {
        existing: StatusEffectKind,
        incoming: StatusEffectKind,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum EffectError {
    #[error("{0:?} needs its owner to carry a weapon")]
    MissingWeapon(StatusEffectKind),
}

/// Something an effect wants done outside its owner's stats.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectSignal {
    /// Damage over time to the owner
    Damage {
        target: Entity,
        amount: i32,
        source: Option<Entity>,
    },
    Heal {
        target: Entity,
        amount: i32,
    },
    Execute {
        target: Entity,
        source: Option<Entity>,
    },
    SetInvincible {
        target: Entity,
        invincible: bool,
    },
    /// Sent only on natural expiry, never on cancel
    Expired {
        target: Entity,
        kind: StatusEffectKind,
    },
}

/// Apply-duration stats of an entity that applies effects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceMultipliers {
    pub buff: f32,
    pub debuff: f32,
}

impl SourceMultipliers {
    pub fn of(stats: &EntityStats) -> Self {
        Self {
            buff: stats.buff_apply_duration.value(),
            debuff: stats.debuff_apply_duration.value(),
        }
    }
}

/// Everything a hook may touch.
pub struct EffectContext<'a> {
    pub owner: Entity,
    pub stats: &'a mut EntityStats,
    pub health: i32,
    pub has_weapon: bool,
    pub sources: &'a HashMap<Entity, SourceMultipliers>,
    pub signals: Vec<EffectSignal>,
}

impl<'a> EffectContext<'a> {
    pub fn new(
        owner: Entity,
        stats: &'a mut EntityStats,
        health: i32,
        sources: &'a HashMap<Entity, SourceMultipliers>,
    ) -> Self {
        Self {
            owner,
            stats,
            health,
            has_weapon: false,
            sources,
            signals: Vec::new(),
        }
    }

    pub fn with_weapon(mut self, has_weapon: bool) -> Self {
        self.has_weapon = has_weapon;
        self
    }
}

/// A status effect, either as a template or applied to an owner.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusEffect {
    #[serde(default)]
    pub polarity: Polarity,
    #[serde(default)]
    pub stackable: bool,
    pub timing: EffectTiming,
    pub params: EffectParams,
    #[serde(skip)]
    pub source: Option<Entity>,
}

impl StatusEffect {
    pub fn new(params: EffectParams, timing: EffectTiming) -> Self {
        Self {
            polarity: Polarity::None,
            stackable: false,
            timing,
            params,
            source: None,
        }
    }

    pub fn buff(mut self) -> Self {
        self.polarity = Polarity::Buff;
        self
    }

    pub fn debuff(mut self) -> Self {
        self.polarity = Polarity::Debuff;
        self
    }

    pub fn stackable(mut self) -> Self {
        self.stackable = true;
        self
    }

    pub fn from_source(mut self, source: Option<Entity>) -> Self {
        self.source = source;
        self
    }

    pub fn burn() -> Self {
        StatusEffect::new(
            EffectParams::Burn {
                damage_per_tick: 1,
                extra_tick_on_apply: false,
            },
            EffectTiming::ticks(2, 0.5),
        )
        .debuff()
        .stackable()
    }

    pub fn temporary_speed(multiplier: f32, duration: f32) -> Self {
        StatusEffect::new(
            EffectParams::TemporarySpeed { multiplier },
            EffectTiming::duration(duration),
        )
        .buff()
        .stackable()
    }

    pub fn permanent_speed(multiplier: f32) -> Self {
        StatusEffect::new(EffectParams::PermanentSpeed { multiplier }, EffectTiming::Permanent)
            .buff()
            .stackable()
    }

    pub fn life_steal(heal_percent: f32) -> Self {
        StatusEffect::new(EffectParams::LifeSteal { heal_percent }, EffectTiming::Permanent).buff()
    }

    pub fn unbreakable_shield(duration: f32) -> Self {
        StatusEffect::new(EffectParams::UnbreakableShield, EffectTiming::duration(duration)).buff()
    }

    pub fn max_health_increase(amount: f32) -> Self {
        StatusEffect::new(EffectParams::MaxHealthIncrease { amount }, EffectTiming::Permanent)
            .buff()
            .stackable()
    }

    pub fn extended_debuffs(multiplier: f32) -> Self {
        StatusEffect::new(
            EffectParams::ExtendedDebuffs { multiplier },
            EffectTiming::Permanent,
        )
        .buff()
    }

    pub fn burning_rage(tick_damage_per_stack: f32) -> Self {
        StatusEffect::new(
            EffectParams::BurningRage {
                stacks: 0,
                max_stacks: 5,
                tick_damage_per_stack,
                combust_radius: 7.5,
                combust_radius_growth: 1.1,
                combust_damage_per_stack: 5.0,
            },
            EffectTiming::ticks(4, 1.0),
        )
        .debuff()
        .stackable()
    }

    pub fn ghastly_grievance(duration: f32) -> Self {
        StatusEffect::new(
            EffectParams::GhastlyGrievance {
                stacks: 0,
                max_stacks: 3,
                base_threshold: 0.1,
                threshold_per_stack: 0.05,
            },
            EffectTiming::duration(duration),
        )
        .debuff()
        .stackable()
    }

    pub fn rage_passive(burning_rage: StatusEffect) -> Self {
        StatusEffect::new(
            EffectParams::RagePassive {
                burning_rage: Box::new(burning_rage),
            },
            EffectTiming::Permanent,
        )
        .stackable()
    }

    pub fn fear_passive(grievance: StatusEffect) -> Self {
        StatusEffect::new(
            EffectParams::FearPassive {
                grievance: Box::new(grievance),
            },
            EffectTiming::Permanent,
        )
        .stackable()
    }

    pub fn rage_passive_b() -> Self {
        StatusEffect::new(
            EffectParams::RagePassiveB {
                max_charge_duration: 5.0,
                charge_bonus_multipliers: vec![1.5, 2.0],
                explosion_damage_multiplier: 1.0,
                explosion_radius: 5.0,
                perfect_window: 0.5,
                perfect_bonus_multiplier: 2.0,
                perfect_radius_multiplier: 2.0,
                perfect_swing: false,
            },
            EffectTiming::Permanent,
        )
        .stackable()
    }

    pub fn fear_passive_b() -> Self {
        StatusEffect::new(
            EffectParams::FearPassiveB {
                max_stacks: 5,
                stack_reset: 5.0,
                damage_multiplier: 1.25,
                speed_multiplier: 1.15,
                defense_multiplier: 1.25,
                stacks: 0,
                timer: 0.0,
                active: Vec::new(),
            },
            EffectTiming::Permanent,
        )
        .stackable()
    }

    pub fn elite_brute() -> Self {
        StatusEffect::new(
            EffectParams::EliteBrute {
                time_scale_multiplier: 0.5,
            },
            EffectTiming::Permanent,
        )
    }

    pub fn kind(&self) -> StatusEffectKind {
        self.params.kind()
    }

    fn buff_source(&self) -> BuffSource {
        BuffSource::Effect(self.kind())
    }

    /// The source's apply-duration multiplier for this effect's polarity.
    /// Missing sources count as 1.
    pub fn source_duration_multiplier(&self, sources: &HashMap<Entity, SourceMultipliers>) -> f32 {
        let Some(multipliers) = self.source.and_then(|source| sources.get(&source)) else {
            return 1.0;
        };

        match self.polarity {
            Polarity::None => 1.0,
            Polarity::Buff => multipliers.buff,
            Polarity::Debuff => multipliers.debuff,
        }
    }

    /// Divisor for duration countdowns. A zero multiplier counts as 1 here
    /// only, tick counts scale by the raw value.
    pub fn duration_divisor(&self, sources: &HashMap<Entity, SourceMultipliers>) -> f32 {
        let multiplier = self.source_duration_multiplier(sources);
        if multiplier == 0.0 {
            1.0
        } else {
            multiplier
        }
    }

    /// Ticks this effect runs for after source scaling.
    pub fn total_ticks(&self, sources: &HashMap<Entity, SourceMultipliers>) -> Option<u32> {
        match &self.timing {
            EffectTiming::Tick { ticks, .. } => {
                Some((*ticks as f32 * self.source_duration_multiplier(sources)).round() as u32)
            }
            _ => None,
        }
    }

    pub fn remaining_duration(&self) -> Option<f32> {
        match &self.timing {
            EffectTiming::Duration { remaining, .. } => Some(*remaining),
            _ => None,
        }
    }

    pub fn stacks(&self) -> Option<u32> {
        match &self.params {
            EffectParams::BurningRage { stacks, .. }
            | EffectParams::GhastlyGrievance { stacks, .. }
            | EffectParams::FearPassiveB { stacks, .. } => Some(*stacks),
            _ => None,
        }
    }

    /// A fresh copy suitable for applying to another entity.
    pub fn as_template(&self) -> StatusEffect {
        let mut template = self.clone();
        template.timing.reset();
        match &mut template.params {
            EffectParams::BurningRage { stacks, .. }
            | EffectParams::GhastlyGrievance { stacks, .. } => *stacks = 0,
            EffectParams::FearPassiveB {
                stacks,
                timer,
                active,
                ..
            } => {
                *stacks = 0;
                *timer = 0.0;
                active.clear();
            }
            EffectParams::RagePassiveB { perfect_swing, .. } => *perfect_swing = false,
            _ => {}
        }
        template
    }

    pub(crate) fn on_apply(&mut self, ctx: &mut EffectContext) -> Result<(), EffectError> {
        self.timing.reset();
        let kind = self.kind();
        let source = self.buff_source();
        let owner = ctx.owner;

        match &mut self.params {
            EffectParams::Burn {
                damage_per_tick,
                extra_tick_on_apply,
            } => {
                if *extra_tick_on_apply {
                    ctx.signals.push(EffectSignal::Damage {
                        target: owner,
                        amount: *damage_per_tick,
                        source: self.source,
                    });
                }
            }
            EffectParams::TemporarySpeed { multiplier } | EffectParams::PermanentSpeed { multiplier } => {
                ctx.stats.status_speed.add_multiplier(*multiplier, source);
            }
            EffectParams::LifeSteal { .. } => {}
            EffectParams::UnbreakableShield => {
                ctx.signals.push(EffectSignal::SetInvincible {
                    target: owner,
                    invincible: true,
                });
            }
            EffectParams::MaxHealthIncrease { amount } => {
                ctx.stats.max_health.add_flat_amount(*amount, source);
                ctx.signals.push(EffectSignal::Heal {
                    target: owner,
                    amount: amount.round() as i32,
                });
            }
            EffectParams::ExtendedDebuffs { multiplier } => {
                ctx.stats.debuff_apply_duration.add_multiplier(*multiplier, source);
            }
            EffectParams::BurningRage { stacks, .. } => *stacks = 1,
            EffectParams::GhastlyGrievance { stacks, .. } => *stacks = 1,
            EffectParams::RagePassive { .. }
            | EffectParams::FearPassive { .. }
            | EffectParams::RagePassiveB { .. } => {
                if !ctx.has_weapon {
                    return Err(EffectError::MissingWeapon(kind));
                }
            }
            EffectParams::FearPassiveB { .. } => {}
            EffectParams::EliteBrute {
                time_scale_multiplier,
            } => {
                ctx.stats
                    .local_time_scale
                    .add_multiplier(*time_scale_multiplier, source);
            }
        }

        self.check_execution(ctx);
        Ok(())
    }

    /// Merge `incoming` into this effect.
    pub(crate) fn stack(
        &mut self,
        incoming: StatusEffect,
        ctx: &mut EffectContext,
    ) -> Result<(), StackError> {
        if incoming.kind() != self.kind() {
            return Err(StackError::KindMismatch {
                existing: self.kind(),
                incoming: incoming.kind(),
            });
        }

        let source = self.buff_source();
        let owner = ctx.owner;

        match (&mut self.params, incoming.params) {
            (
                EffectParams::Burn {
                    damage_per_tick,
                    extra_tick_on_apply,
                },
                EffectParams::Burn {
                    damage_per_tick: new_damage,
                    extra_tick_on_apply: new_extra,
                },
            ) => {
                self.timing.stack(&incoming.timing);
                *damage_per_tick = new_damage;
                *extra_tick_on_apply = new_extra;
            }
            (
                EffectParams::TemporarySpeed { multiplier },
                EffectParams::TemporarySpeed {
                    multiplier: new_multiplier,
                },
            )
            | (
                EffectParams::PermanentSpeed { multiplier },
                EffectParams::PermanentSpeed {
                    multiplier: new_multiplier,
                },
            ) => {
                self.timing.stack(&incoming.timing);
                *multiplier *= new_multiplier;
                ctx.stats.status_speed.clear_multipliers_from_source(source);
                ctx.stats.status_speed.add_multiplier(*multiplier, source);
            }
            (
                EffectParams::LifeSteal { heal_percent },
                EffectParams::LifeSteal {
                    heal_percent: new_percent,
                },
            ) => *heal_percent = new_percent,
            (
                EffectParams::MaxHealthIncrease { amount },
                EffectParams::MaxHealthIncrease { amount: new_amount },
            ) => {
                *amount += new_amount;
                ctx.stats.max_health.add_flat_amount(new_amount, source);
                ctx.signals.push(EffectSignal::Heal {
                    target: owner,
                    amount: new_amount.round() as i32,
                });
            }
            (
                EffectParams::ExtendedDebuffs { multiplier },
                EffectParams::ExtendedDebuffs {
                    multiplier: new_multiplier,
                },
            ) => {
                *multiplier *= new_multiplier;
                ctx.stats.debuff_apply_duration.clear_multipliers_from_source(source);
                ctx.stats.debuff_apply_duration.add_multiplier(*multiplier, source);
            }
            (
                EffectParams::BurningRage {
                    stacks,
                    max_stacks,
                    tick_damage_per_stack,
                    ..
                },
                EffectParams::BurningRage {
                    tick_damage_per_stack: new_tick_damage,
                    ..
                },
            ) => {
                // Refresh rather than extend so the tick count never snowballs
                if let (
                    EffectTiming::Tick { ticks, current, .. },
                    EffectTiming::Tick {
                        ticks: new_ticks, ..
                    },
                ) = (&mut self.timing, &incoming.timing)
                {
                    *ticks = *new_ticks;
                    *current = 0;
                }
                *tick_damage_per_stack = new_tick_damage;
                if *stacks < *max_stacks {
                    *stacks += 1;
                }
            }
            (
                EffectParams::GhastlyGrievance {
                    stacks, max_stacks, ..
                },
                EffectParams::GhastlyGrievance { .. },
            ) => {
                // Reset rather than extend
                if let (
                    EffectTiming::Duration { remaining, .. },
                    EffectTiming::Duration { duration, .. },
                ) = (&mut self.timing, &incoming.timing)
                {
                    *remaining = *duration;
                }
                if *stacks < *max_stacks {
                    *stacks += 1;
                }
            }
            (
                EffectParams::RagePassive { burning_rage },
                EffectParams::RagePassive {
                    burning_rage: new_template,
                },
            ) => *burning_rage = new_template,
            (
                EffectParams::FearPassive { grievance },
                EffectParams::FearPassive {
                    grievance: new_template,
                },
            ) => *grievance = new_template,
            (
                EffectParams::RagePassiveB {
                    max_charge_duration,
                    charge_bonus_multipliers,
                    explosion_damage_multiplier,
                    explosion_radius,
                    perfect_window,
                    perfect_bonus_multiplier,
                    perfect_radius_multiplier,
                    ..
                },
                EffectParams::RagePassiveB {
                    max_charge_duration: new_max_charge,
                    charge_bonus_multipliers: new_bonuses,
                    explosion_damage_multiplier: new_explosion_damage,
                    explosion_radius: new_radius,
                    perfect_window: new_window,
                    perfect_bonus_multiplier: new_perfect_bonus,
                    perfect_radius_multiplier: new_perfect_radius,
                    ..
                },
            ) => {
                *max_charge_duration = new_max_charge;
                *charge_bonus_multipliers = new_bonuses;
                *explosion_damage_multiplier = new_explosion_damage;
                *explosion_radius = new_radius;
                *perfect_window = new_window;
                *perfect_bonus_multiplier = new_perfect_bonus;
                *perfect_radius_multiplier = new_perfect_radius;
            }
            (
                EffectParams::FearPassiveB {
                    max_stacks,
                    stack_reset,
                    damage_multiplier,
                    speed_multiplier,
                    defense_multiplier,
                    ..
                },
                EffectParams::FearPassiveB {
                    max_stacks: new_max,
                    stack_reset: new_reset,
                    damage_multiplier: new_damage,
                    speed_multiplier: new_speed,
                    defense_multiplier: new_defense,
                    ..
                },
            ) => {
                // Stacks and raised stats carry over
                *max_stacks = new_max;
                *stack_reset = new_reset;
                *damage_multiplier = new_damage;
                *speed_multiplier = new_speed;
                *defense_multiplier = new_defense;
            }
            _ => self.timing.stack(&incoming.timing),
        }

        self.check_execution(ctx);
        Ok(())
    }

    /// Advance by `delta` seconds. Returns true once the effect has run out.
    pub(crate) fn update(&mut self, delta: f32, ctx: &mut EffectContext) -> bool {
        let divisor = self.duration_divisor(ctx.sources);
        let total_ticks = self.total_ticks(ctx.sources);

        let expired = match &mut self.timing {
            EffectTiming::Permanent => false,
            EffectTiming::Duration { remaining, .. } => {
                *remaining -= delta / divisor;
                *remaining <= 0.0
            }
            EffectTiming::Tick {
                tick_duration,
                timer,
                current,
                ..
            } => {
                *timer += delta;
                let mut ticked = false;
                if *timer > *tick_duration {
                    *timer = 0.0;
                    *current += 1;
                    ticked = true;
                }
                let done = *current >= total_ticks.unwrap_or(0);
                if ticked {
                    self.on_tick(ctx);
                }
                done
            }
        };

        self.advance_fear_stacks(delta, ctx);
        self.check_execution(ctx);
        expired
    }

    fn advance_fear_stacks(&mut self, delta: f32, ctx: &mut EffectContext) {
        let EffectParams::FearPassiveB {
            stack_reset, timer, ..
        } = &mut self.params
        else {
            return;
        };
        if *timer <= *stack_reset {
            *timer += delta;
        }
        if *timer > *stack_reset {
            self.reset_fear_stacks(ctx);
        }
    }

    fn reset_fear_stacks(&mut self, ctx: &mut EffectContext) {
        let source = self.buff_source();
        if let EffectParams::FearPassiveB {
            stacks,
            timer,
            active,
            ..
        } = &mut self.params
        {
            *stacks = 0;
            *timer = 0.0;
            for buff in active.drain(..) {
                buff.stat(ctx.stats).clear_multipliers_from_source(source);
            }
        }
    }

    /// The owner stunned something. Fills a fear stack and, on a full set,
    /// raises a stat that is not raised yet.
    pub(crate) fn on_stun_dealt(&mut self, ctx: &mut EffectContext, rng: &mut impl Rng) {
        let source = self.buff_source();
        let EffectParams::FearPassiveB {
            max_stacks,
            damage_multiplier,
            speed_multiplier,
            defense_multiplier,
            stacks,
            timer,
            active,
            ..
        } = &mut self.params
        else {
            return;
        };

        *timer = 0.0;
        *stacks += 1;
        if *stacks < *max_stacks {
            return;
        }
        *stacks = 0;

        let inactive: Vec<FearBuff> = FearBuff::ALL
            .into_iter()
            .filter(|buff| !active.contains(buff))
            .collect();
        let Some(&buff) = inactive.choose(rng) else {
            return;
        };
        let multiplier = match buff {
            FearBuff::Damage => *damage_multiplier,
            FearBuff::Speed => *speed_multiplier,
            FearBuff::Defense => *defense_multiplier,
        };
        buff.stat(ctx.stats).add_multiplier(multiplier, source);
        active.push(buff);
        debug!("Fear stacks raised {:?} on {:?}", buff, ctx.owner);
    }

    /// A held charge was released. Sets the damage bonus for the swing it
    /// starts.
    pub(crate) fn on_charge_release(&mut self, charge_duration: f32, ctx: &mut EffectContext) {
        let source = self.buff_source();
        let EffectParams::RagePassiveB {
            max_charge_duration,
            charge_bonus_multipliers,
            perfect_window,
            perfect_bonus_multiplier,
            perfect_swing,
            ..
        } = &mut self.params
        else {
            return;
        };

        let perfect = is_perfect_timing(*max_charge_duration, *perfect_window, charge_duration);
        let mut multiplier =
            charge_bonus(charge_bonus_multipliers, *max_charge_duration, charge_duration);
        if perfect {
            multiplier *= *perfect_bonus_multiplier;
        }
        *perfect_swing = perfect;

        ctx.stats.damage_modifier.clear_multipliers_from_source(source);
        ctx.stats.damage_modifier.add_multiplier(multiplier, source);
    }

    /// The swing a charge started is over.
    pub(crate) fn on_swing_end(&mut self, ctx: &mut EffectContext) {
        let source = self.buff_source();
        if let EffectParams::RagePassiveB { perfect_swing, .. } = &mut self.params {
            *perfect_swing = false;
            ctx.stats.damage_modifier.clear_multipliers_from_source(source);
        }
    }

    /// Radius and damage multiplier of a charged hit's explosion.
    pub fn charged_explosion(&self) -> Option<(f32, f32)> {
        match &self.params {
            EffectParams::RagePassiveB {
                explosion_damage_multiplier,
                explosion_radius,
                perfect_radius_multiplier,
                perfect_swing,
                ..
            } => {
                let radius = if *perfect_swing {
                    explosion_radius * perfect_radius_multiplier
                } else {
                    *explosion_radius
                };
                Some((radius, *explosion_damage_multiplier))
            }
            _ => None,
        }
    }

    fn on_tick(&mut self, ctx: &mut EffectContext) {
        let damage = match &self.params {
            EffectParams::Burn {
                damage_per_tick, ..
            } => *damage_per_tick,
            EffectParams::BurningRage {
                stacks,
                tick_damage_per_stack,
                ..
            } => (*stacks as f32 * tick_damage_per_stack) as i32,
            _ => 0,
        };

        if damage > 0 {
            ctx.signals.push(EffectSignal::Damage {
                target: ctx.owner,
                amount: damage,
                source: self.source,
            });
        }
    }

    /// Grievance executes its owner once health drops under the threshold.
    fn check_execution(&self, ctx: &mut EffectContext) {
        if let EffectParams::GhastlyGrievance {
            stacks,
            base_threshold,
            threshold_per_stack,
            ..
        } = &self.params
        {
            let threshold = base_threshold + *stacks as f32 * threshold_per_stack;
            let limit = (ctx.stats.max_health.value() * threshold).round() as i32;
            if ctx.health < limit {
                ctx.signals.push(EffectSignal::Execute {
                    target: ctx.owner,
                    source: self.source,
                });
            }
        }
    }

    /// Undo everything the effect did to its owner. Shared by expiry and
    /// cancellation.
    fn cleanup(&mut self, ctx: &mut EffectContext) {
        let source = self.buff_source();
        match &self.params {
            EffectParams::TemporarySpeed { .. } | EffectParams::PermanentSpeed { .. } => {
                ctx.stats.status_speed.clear_buffs_from_source(source);
            }
            EffectParams::UnbreakableShield => {
                ctx.signals.push(EffectSignal::SetInvincible {
                    target: ctx.owner,
                    invincible: false,
                });
            }
            EffectParams::MaxHealthIncrease { .. } => {
                ctx.stats.max_health.clear_buffs_from_source(source);
            }
            EffectParams::ExtendedDebuffs { .. } => {
                ctx.stats.debuff_apply_duration.clear_buffs_from_source(source);
            }
            EffectParams::EliteBrute { .. } => {
                ctx.stats.local_time_scale.clear_buffs_from_source(source);
            }
            EffectParams::FearPassiveB { .. } => self.reset_fear_stacks(ctx),
            EffectParams::RagePassiveB { .. } => {
                ctx.stats.damage_modifier.clear_multipliers_from_source(source);
            }
            _ => {}
        }
    }

    /// Natural end of the effect.
    pub(crate) fn on_expire(&mut self, ctx: &mut EffectContext) {
        self.cleanup(ctx);
        ctx.signals.push(EffectSignal::Expired {
            target: ctx.owner,
            kind: self.kind(),
        });
    }

    /// Hard removal. Never runs the expiry path.
    pub(crate) fn on_cancel(&mut self, ctx: &mut EffectContext) {
        self.cleanup(ctx);
    }
}

/// Damage multiplier for a charge of `charge_duration` seconds. The full
/// charge is split into one interval per bonus and the first interval
/// earns none.
fn charge_bonus(bonuses: &[f32], max_charge_duration: f32, charge_duration: f32) -> f32 {
    let Some(last) = bonuses.last() else {
        return 1.0;
    };
    let interval = max_charge_duration / bonuses.len() as f32;
    if charge_duration <= interval {
        return 1.0;
    }

    bonuses
        .iter()
        .enumerate()
        .find(|(index, _)| charge_duration <= interval * (*index as f32 + 2.0))
        .map_or(*last, |(_, bonus)| *bonus)
}

fn is_perfect_timing(max_charge_duration: f32, window: f32, charge_duration: f32) -> bool {
    window > 0.0
        && charge_duration >= max_charge_duration
        && charge_duration <= max_charge_duration + window
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Entity {
        Entity::from_raw(1)
    }

    #[test]
    fn tick_count_scales_with_source_debuff_duration() {
        let source = Entity::from_raw(9);
        let mut sources = HashMap::new();
        sources.insert(
            source,
            SourceMultipliers {
                buff: 1.0,
                debuff: 1.5,
            },
        );

        let burn = StatusEffect::burn().from_source(Some(source));
        assert_eq!(burn.total_ticks(&sources), Some(3));

        let unsourced = StatusEffect::burn();
        assert_eq!(unsourced.total_ticks(&sources), Some(2));
    }

    #[test]
    fn zero_source_multiplier_only_guards_durations() {
        let source = Entity::from_raw(9);
        let mut sources = HashMap::new();
        sources.insert(
            source,
            SourceMultipliers {
                buff: 0.0,
                debuff: 0.0,
            },
        );
        let shield = StatusEffect::unbreakable_shield(2.0)
            .buff()
            .from_source(Some(source));
        assert_eq!(shield.source_duration_multiplier(&sources), 0.0);
        assert_eq!(shield.duration_divisor(&sources), 1.0);

        // Tick counts scale by the raw multiplier
        let burn = StatusEffect::burn().from_source(Some(source));
        assert_eq!(burn.total_ticks(&sources), Some(0));
    }

    #[test]
    fn buff_durations_tick_slower_with_longer_source_multiplier() {
        let source = Entity::from_raw(9);
        let mut sources = HashMap::new();
        sources.insert(
            source,
            SourceMultipliers {
                buff: 2.0,
                debuff: 1.0,
            },
        );
        let mut stats = EntityStats::default();
        let mut ctx = EffectContext::new(owner(), &mut stats, 100, &sources);

        let mut haste = StatusEffect::temporary_speed(1.1, 1.0).from_source(Some(source));
        haste.on_apply(&mut ctx).unwrap();

        assert!(!haste.update(1.5, &mut ctx));
        assert!(haste.update(0.6, &mut ctx));
    }

    #[test]
    fn burning_rage_stacks_cap_and_refresh_ticks() {
        let sources = HashMap::new();
        let mut stats = EntityStats::default();
        let mut ctx = EffectContext::new(owner(), &mut stats, 100, &sources);

        let mut rage = StatusEffect::burning_rage(2.0);
        rage.on_apply(&mut ctx).unwrap();
        rage.update(1.1, &mut ctx);

        for _ in 0..10 {
            rage.stack(StatusEffect::burning_rage(2.0), &mut ctx).unwrap();
        }

        assert_eq!(rage.stacks(), Some(5));
        assert!(matches!(
            rage.timing,
            EffectTiming::Tick {
                ticks: 4,
                current: 0,
                ..
            }
        ));
    }

    #[test]
    fn burning_rage_ticks_scale_with_stacks() {
        let sources = HashMap::new();
        let mut stats = EntityStats::default();
        let mut ctx = EffectContext::new(owner(), &mut stats, 100, &sources);

        let mut rage = StatusEffect::burning_rage(2.0);
        rage.on_apply(&mut ctx).unwrap();
        rage.stack(StatusEffect::burning_rage(2.0), &mut ctx).unwrap();
        rage.update(1.1, &mut ctx);

        assert!(ctx.signals.contains(&EffectSignal::Damage {
            target: owner(),
            amount: 4,
            source: None,
        }));
    }

    #[test]
    fn grievance_executes_below_threshold() {
        let sources = HashMap::new();
        let mut stats = EntityStats::default().with_max_health(100.0);

        let mut healthy = EffectContext::new(owner(), &mut stats, 50, &sources);
        let mut grievance = StatusEffect::ghastly_grievance(5.0);
        grievance.on_apply(&mut healthy).unwrap();
        assert!(healthy.signals.is_empty());

        // One stack: 15% of 100
        let mut wounded = EffectContext::new(owner(), &mut stats, 14, &sources);
        grievance.update(0.1, &mut wounded);
        assert!(wounded
            .signals
            .iter()
            .any(|s| matches!(s, EffectSignal::Execute { .. })));
    }

    #[test]
    fn grievance_stack_resets_duration_instead_of_adding() {
        let sources = HashMap::new();
        let mut stats = EntityStats::default();
        let mut ctx = EffectContext::new(owner(), &mut stats, 100, &sources);

        let mut grievance = StatusEffect::ghastly_grievance(4.0);
        grievance.on_apply(&mut ctx).unwrap();
        grievance.update(3.0, &mut ctx);
        grievance
            .stack(StatusEffect::ghastly_grievance(4.0), &mut ctx)
            .unwrap();

        assert_eq!(grievance.remaining_duration(), Some(4.0));
        assert_eq!(grievance.stacks(), Some(2));
    }

    #[test]
    fn passives_need_a_weapon() {
        let sources = HashMap::new();
        let mut stats = EntityStats::default();
        let mut ctx = EffectContext::new(owner(), &mut stats, 100, &sources);

        let mut passive = StatusEffect::rage_passive(StatusEffect::burning_rage(0.0));
        assert_eq!(
            passive.on_apply(&mut ctx),
            Err(EffectError::MissingWeapon(StatusEffectKind::RagePassive))
        );
    }

    #[test]
    fn stacking_different_kinds_is_rejected() {
        let sources = HashMap::new();
        let mut stats = EntityStats::default();
        let mut ctx = EffectContext::new(owner(), &mut stats, 100, &sources);

        let mut burn = StatusEffect::burn();
        let err = burn
            .stack(StatusEffect::temporary_speed(1.1, 1.0), &mut ctx)
            .unwrap_err();
        assert_eq!(
            err,
            StackError::KindMismatch {
                existing: StatusEffectKind::Burn,
                incoming: StatusEffectKind::TemporarySpeed,
            }
        );
    }

    fn fear_buffs(effect: &StatusEffect) -> Vec<FearBuff> {
        match &effect.params {
            EffectParams::FearPassiveB { active, .. } => active.clone(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn full_fear_stacks_raise_each_stat_once() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let sources = HashMap::new();
        let mut stats = EntityStats::default();
        let mut ctx = EffectContext::new(owner(), &mut stats, 100, &sources);
        let mut rng = StdRng::seed_from_u64(7);
        let mut fear = StatusEffect::fear_passive_b();

        for _ in 0..4 {
            fear.on_stun_dealt(&mut ctx, &mut rng);
        }
        assert_eq!(fear.stacks(), Some(4));
        assert!(fear_buffs(&fear).is_empty());

        fear.on_stun_dealt(&mut ctx, &mut rng);
        assert_eq!(fear.stacks(), Some(0));
        assert_eq!(fear_buffs(&fear).len(), 1);

        for _ in 0..15 {
            fear.on_stun_dealt(&mut ctx, &mut rng);
        }
        let mut raised = fear_buffs(&fear);
        raised.sort_by_key(|buff| *buff as u8);
        assert_eq!(raised, FearBuff::ALL.to_vec());
        assert!((ctx.stats.damage_modifier.value() - 1.25).abs() < 1e-6);
        assert!((ctx.stats.status_speed.value() - 1.15).abs() < 1e-6);

        // No stun for longer than the reset window drops everything
        fear.update(6.0, &mut ctx);
        assert!(fear_buffs(&fear).is_empty());
        assert_eq!(ctx.stats.damage_modifier.value(), 1.0);
        assert_eq!(ctx.stats.status_speed.value(), 1.0);
    }

    #[test]
    fn charge_bonus_follows_charge_intervals() {
        let bonuses = [1.5, 2.0];
        assert_eq!(charge_bonus(&bonuses, 5.0, 2.0), 1.0);
        assert_eq!(charge_bonus(&bonuses, 5.0, 4.0), 1.5);
        assert_eq!(charge_bonus(&bonuses, 5.0, 6.0), 2.0);
        assert_eq!(charge_bonus(&bonuses, 5.0, 20.0), 2.0);
        assert_eq!(charge_bonus(&[], 5.0, 4.0), 1.0);

        assert!(is_perfect_timing(5.0, 0.5, 5.2));
        assert!(!is_perfect_timing(5.0, 0.5, 5.6));
        assert!(!is_perfect_timing(5.0, 0.0, 5.0));
    }

    #[test]
    fn charged_release_bonus_lasts_one_swing() {
        let sources = HashMap::new();
        let mut stats = EntityStats::default();
        let mut ctx = EffectContext::new(owner(), &mut stats, 100, &sources);
        let mut rage = StatusEffect::rage_passive_b();

        rage.on_charge_release(4.0, &mut ctx);
        assert!((ctx.stats.damage_modifier.value() - 1.5).abs() < 1e-6);
        assert_eq!(rage.charged_explosion(), Some((5.0, 1.0)));

        // Perfect timing doubles both the bonus and the blast
        rage.on_charge_release(5.2, &mut ctx);
        assert!((ctx.stats.damage_modifier.value() - 4.0).abs() < 1e-6);
        assert_eq!(rage.charged_explosion(), Some((10.0, 1.0)));

        rage.on_swing_end(&mut ctx);
        assert_eq!(ctx.stats.damage_modifier.value(), 1.0);
        assert_eq!(rage.charged_explosion(), Some((5.0, 1.0)));
    }
}
