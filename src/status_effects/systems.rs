//! Status effect systems: requests, per-frame updates and the triggers that
//! react to combat events.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use std::collections::HashMap;

use super::effect::*;
use super::effector::StatusEffector;
use crate::combat::{ChargeReleasedEvent, Weapon, WeaponHitEvent};
use crate::core::{DamageDealtEvent, DamageEvent, DeathEvent, ExecuteEvent, HealEvent, StunEvent};
use crate::entities::targeting::allies_in_radius;
use crate::entities::{
    Dead, EntityStats, Health, Invincible, StateChangedEvent, StateLabel, TargetCandidate, Team,
};

/// Request to apply an effect to an entity.
#[derive(Event, Debug, Clone)]
pub struct ApplyStatusEffectEvent {
    pub target: Entity,
    pub effect: StatusEffect,
    pub source: Option<Entity>,
}

impl ApplyStatusEffectEvent {
    pub fn new(target: Entity, effect: StatusEffect, source: Option<Entity>) -> Self {
        Self {
            target,
            effect,
            source,
        }
    }
}

/// Request to remove an effect. `cancel` skips the expiry path.
#[derive(Event, Debug, Clone)]
pub struct RemoveStatusEffectEvent {
    pub target: Entity,
    pub kind: StatusEffectKind,
    pub cancel: bool,
}

/// Sent when an effect runs out on its own.
#[derive(Event, Debug, Clone)]
pub struct StatusEffectExpiredEvent {
    pub entity: Entity,
    pub kind: StatusEffectKind,
}

/// Turns effect signals into the events and components that carry them out.
#[derive(SystemParam)]
pub struct EffectOutbox<'w, 's> {
    commands: Commands<'w, 's>,
    damage: EventWriter<'w, DamageEvent>,
    heals: EventWriter<'w, HealEvent>,
    executions: EventWriter<'w, ExecuteEvent>,
    expired: EventWriter<'w, StatusEffectExpiredEvent>,
}

impl EffectOutbox<'_, '_> {
    pub fn dispatch(&mut self, signals: Vec<EffectSignal>) {
        for signal in signals {
            match signal {
                EffectSignal::Damage {
                    target,
                    amount,
                    source,
                } => {
                    self.damage
                        .send(DamageEvent::new(target, source, amount).over_time());
                }
                EffectSignal::Heal { target, amount } => {
                    self.heals.send(HealEvent { target, amount });
                }
                EffectSignal::Execute { target, source } => {
                    self.executions.send(ExecuteEvent { target, source });
                }
                EffectSignal::SetInvincible { target, invincible } => {
                    if let Some(mut entity) = self.commands.get_entity(target) {
                        if invincible {
                            entity.insert(Invincible);
                        } else {
                            entity.remove::<Invincible>();
                        }
                    }
                }
                EffectSignal::Expired { target, kind } => {
                    debug!("{:?} expired on {:?}", kind, target);
                    self.expired.send(StatusEffectExpiredEvent {
                        entity: target,
                        kind,
                    });
                }
            }
        }
    }
}

fn source_multipliers<'a>(
    stats: impl Iterator<Item = (Entity, &'a EntityStats)>,
) -> HashMap<Entity, SourceMultipliers> {
    stats
        .map(|(entity, stats)| (entity, SourceMultipliers::of(stats)))
        .collect()
}

/// Apply requested effects, stacking or replacing as each kind dictates.
pub fn apply_status_effect_requests(
    mut requests: EventReader<ApplyStatusEffectEvent>,
    mut actors: Query<
        (
            Entity,
            &mut StatusEffector,
            &mut EntityStats,
            &Health,
            Option<&Weapon>,
        ),
        Without<Dead>,
    >,
    mut outbox: EffectOutbox,
) {
    if requests.is_empty() {
        return;
    }

    let sources = source_multipliers(actors.iter().map(|(entity, _, stats, ..)| (entity, stats)));

    for request in requests.read() {
        let Ok((entity, mut effector, mut stats, health, weapon)) = actors.get_mut(request.target)
        else {
            continue;
        };

        let mut ctx = EffectContext::new(entity, &mut stats, health.current, &sources)
            .with_weapon(weapon.is_some());
        let outcome = effector.apply(request.effect.clone(), request.source, &mut ctx);
        debug!(
            "{:?} on {:?}: {:?}",
            request.effect.kind(),
            entity,
            outcome
        );
        outbox.dispatch(ctx.signals);
    }
}

pub fn remove_status_effect_requests(
    mut requests: EventReader<RemoveStatusEffectEvent>,
    mut actors: Query<(Entity, &mut StatusEffector, &mut EntityStats, &Health)>,
    mut outbox: EffectOutbox,
) {
    let sources = HashMap::new();
    for request in requests.read() {
        let Ok((entity, mut effector, mut stats, health)) = actors.get_mut(request.target) else {
            continue;
        };

        let mut ctx = EffectContext::new(entity, &mut stats, health.current, &sources);
        effector.remove(request.kind, request.cancel, &mut ctx);
        outbox.dispatch(ctx.signals);
    }
}

/// Advance every effect on every living actor.
pub fn update_status_effects(
    time: Res<Time>,
    mut actors: Query<
        (
            Entity,
            &mut StatusEffector,
            &mut EntityStats,
            &Health,
            Option<&Weapon>,
        ),
        Without<Dead>,
    >,
    mut outbox: EffectOutbox,
) {
    let delta = time.delta_secs();
    let sources = source_multipliers(actors.iter().map(|(entity, _, stats, ..)| (entity, stats)));

    for (entity, mut effector, mut stats, health, weapon) in &mut actors {
        if effector.is_empty() {
            continue;
        }

        let mut ctx = EffectContext::new(entity, &mut stats, health.current, &sources)
            .with_weapon(weapon.is_some());
        effector.update(delta, &mut ctx);
        outbox.dispatch(ctx.signals);
    }
}

/// Life steal heals the attacker for a share of direct damage dealt.
pub fn life_steal_on_damage_dealt(
    mut dealt: EventReader<DamageDealtEvent>,
    effectors: Query<&StatusEffector>,
    mut heals: EventWriter<HealEvent>,
) {
    for event in dealt.read() {
        let Ok(effector) = effectors.get(event.attacker) else {
            continue;
        };
        let Some(EffectParams::LifeSteal { heal_percent }) = effector
            .get(StatusEffectKind::LifeSteal)
            .map(|effect| &effect.params)
        else {
            continue;
        };

        let amount = (event.amount as f32 * heal_percent).round() as i32;
        if amount > 0 {
            heals.send(HealEvent {
                target: event.attacker,
                amount,
            });
        }
    }
}

/// Weapon passives apply their payload to whatever the weapon hits.
pub fn apply_on_hit_passives(
    mut hits: EventReader<WeaponHitEvent>,
    effectors: Query<&StatusEffector>,
    mut requests: EventWriter<ApplyStatusEffectEvent>,
) {
    for hit in hits.read() {
        let Ok(effector) = effectors.get(hit.attacker) else {
            continue;
        };

        for effect in effector.iter() {
            let payload = match &effect.params {
                EffectParams::RagePassive { burning_rage } => burning_rage,
                EffectParams::FearPassive { grievance } => grievance,
                _ => continue,
            };
            requests.send(ApplyStatusEffectEvent::new(
                hit.victim,
                payload.as_template(),
                Some(hit.attacker),
            ));
        }
    }
}

/// Stuns dealt feed the stunner's fear stacks.
pub fn fear_stacks_on_stun(
    mut stuns: EventReader<StunEvent>,
    mut owners: Query<(Entity, &mut StatusEffector, &mut EntityStats, &Health), Without<Dead>>,
) {
    let sources = HashMap::new();
    let mut rng = rand::thread_rng();

    for stun in stuns.read() {
        let Some(stunner) = stun.stunner else {
            continue;
        };
        let Ok((entity, mut effector, mut stats, health)) = owners.get_mut(stunner) else {
            continue;
        };
        let Some(effect) = effector.get_mut(StatusEffectKind::FearPassiveB) else {
            continue;
        };

        let mut ctx = EffectContext::new(entity, &mut stats, health.current, &sources);
        effect.on_stun_dealt(&mut ctx, &mut rng);
    }
}

/// Charged releases set the rage bonus for their swing, and leaving an
/// attack clears it.
pub fn rage_charged_attacks(
    mut releases: EventReader<ChargeReleasedEvent>,
    mut changes: EventReader<StateChangedEvent>,
    mut owners: Query<(Entity, &mut StatusEffector, &mut EntityStats, &Health), Without<Dead>>,
) {
    let sources = HashMap::new();

    for change in changes.read() {
        if change.from != StateLabel::Attack {
            continue;
        }
        let Ok((entity, mut effector, mut stats, health)) = owners.get_mut(change.entity) else {
            continue;
        };
        if let Some(effect) = effector.get_mut(StatusEffectKind::RagePassiveB) {
            let mut ctx = EffectContext::new(entity, &mut stats, health.current, &sources);
            effect.on_swing_end(&mut ctx);
        }
    }

    for release in releases.read() {
        let Ok((entity, mut effector, mut stats, health)) = owners.get_mut(release.entity) else {
            continue;
        };
        if let Some(effect) = effector.get_mut(StatusEffectKind::RagePassiveB) {
            {
                let mut ctx = EffectContext::new(entity, &mut stats, health.current, &sources);
                effect.on_charge_release(release.charge_duration, &mut ctx);
            }
            debug!(
                "Charged release after {:.2}s, damage x{:.2}",
                release.charge_duration,
                stats.damage_modifier.value()
            );
        }
    }
}

/// Charged hits explode, damaging the victim's allies around the hit.
pub fn explode_charged_hits(
    mut hits: EventReader<WeaponHitEvent>,
    attackers: Query<(&StatusEffector, &EntityStats)>,
    candidates: Query<(Entity, &Transform, &Team), Without<Dead>>,
    mut damage: EventWriter<DamageEvent>,
) {
    let mut rng = rand::thread_rng();

    for hit in hits.read().filter(|hit| hit.charged) {
        let Ok((effector, stats)) = attackers.get(hit.attacker) else {
            continue;
        };
        let Some((radius, multiplier)) = effector
            .get(StatusEffectKind::RagePassiveB)
            .and_then(StatusEffect::charged_explosion)
        else {
            continue;
        };
        let Ok((_, _, victim_team)) = candidates.get(hit.victim) else {
            continue;
        };

        let pool = candidates.iter().map(|(entity, transform, team)| TargetCandidate {
            entity,
            position: transform.translation,
            team: *team,
        });
        for ally in allies_in_radius(hit.hit_point, radius, *victim_team, hit.victim, pool) {
            let amount = stats.calculate_damage(multiplier, &mut rng);
            damage.send(DamageEvent::new(ally.entity, Some(hit.attacker), amount).at(hit.hit_point));
        }
    }
}

/// Run on-death triggers, then cancel everything the dead entity carried.
///
/// Burning rage combusts, damaging the owner's allies around it, and passes
/// its stacks on to the nearest one.
pub fn trigger_death_effects(
    mut deaths: EventReader<DeathEvent>,
    mut owners: Query<(
        &mut StatusEffector,
        &mut EntityStats,
        &Health,
        &Transform,
        &Team,
    )>,
    candidates: Query<(Entity, &Transform, &Team), Without<Dead>>,
    mut requests: EventWriter<ApplyStatusEffectEvent>,
    mut outbox: EffectOutbox,
) {
    let sources = HashMap::new();

    for death in deaths.read() {
        let Ok((mut effector, mut stats, health, transform, team)) = owners.get_mut(death.entity)
        else {
            continue;
        };
        let position = transform.translation;

        if let Some(rage) = effector.get(StatusEffectKind::BurningRage) {
            if let EffectParams::BurningRage {
                stacks,
                tick_damage_per_stack,
                combust_radius,
                combust_radius_growth,
                combust_damage_per_stack,
                ..
            } = rage.params
            {
                let radius = combust_radius * combust_radius_growth.powi(stacks as i32);
                let damage = (combust_damage_per_stack * stacks as f32).round() as i32;

                let pool = candidates.iter().map(|(entity, transform, team)| TargetCandidate {
                    entity,
                    position: transform.translation,
                    team: *team,
                });
                let allies = allies_in_radius(position, radius, *team, death.entity, pool);
                info!(
                    "Burning rage combusts with {} stacks, hitting {} allies",
                    stacks,
                    allies.len()
                );

                for ally in &allies {
                    let mut event = DamageEvent::new(ally.entity, rage.source, damage).at(position);
                    event.direct = rage.source.is_some();
                    outbox.damage.send(event);
                }

                if tick_damage_per_stack > 0.0 {
                    if let Some(nearest) = allies.first() {
                        for _ in 0..stacks {
                            requests.send(ApplyStatusEffectEvent::new(
                                nearest.entity,
                                rage.as_template(),
                                rage.source,
                            ));
                        }
                    }
                }
            }
        }

        let mut ctx = EffectContext::new(death.entity, &mut stats, health.current, &sources);
        effector.cancel_all(&mut ctx);
        outbox.dispatch(ctx.signals);
    }
}
