//! Health, damage and base-state systems shared by all actors.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use std::collections::HashSet;

use super::components::*;
use super::state::*;
use crate::core::{
    DamageDealtEvent, DamageEvent, DamageTakenEvent, DeathEvent, EntityDestroyedEvent, ExecuteEvent,
    HealEvent, KillEvent, LaunchEvent, StunEvent,
};
use crate::status_effects::StatusEffector;

/// Sent when an entity leaves its spawn state and becomes active.
#[derive(Event, Debug, Clone)]
pub struct SpawnFinishedEvent {
    pub entity: Entity,
}

/// Components every combat actor starts with, at full health.
pub fn actor_bundle(
    stats: EntityStats,
    team: Team,
    initial: EntityState,
    default: EntityState,
) -> impl Bundle {
    (
        Health::full(&stats),
        stats,
        team,
        StateMachine::new(initial, default),
        LastHitSource::default(),
        Motion::default(),
        StatusEffector::default(),
    )
}

/// Put an entity into its death state and announce it.
fn enter_death(
    commands: &mut Commands,
    entity: Entity,
    killer: Option<Entity>,
    health: &mut Health,
    stats: &mut EntityStats,
    machine: &mut StateMachine,
    death_events: &mut EventWriter<DeathEvent>,
    kill_events: &mut EventWriter<KillEvent>,
) {
    health.current = 0;
    machine.change_state(EntityState::death(), false);
    // Frozen corpses would never finish dying
    stats.local_time_scale.clear_all_buffs();

    commands.entity(entity).insert(Dead);
    death_events.send(DeathEvent {
        entity,
        killed_by: killer,
    });
    if let Some(killer) = killer {
        kill_events.send(KillEvent {
            killer,
            victim: entity,
        });
    }
}

/// Apply damage requests.
pub fn apply_damage(
    mut commands: Commands,
    mut damage_events: EventReader<DamageEvent>,
    mut actors: Query<
        (
            &mut Health,
            &mut EntityStats,
            &mut StateMachine,
            &mut LastHitSource,
            Option<&Invincible>,
            Option<&SuperArmor>,
        ),
        Without<Dead>,
    >,
    mut taken_events: EventWriter<DamageTakenEvent>,
    mut dealt_events: EventWriter<DamageDealtEvent>,
    mut death_events: EventWriter<DeathEvent>,
    mut kill_events: EventWriter<KillEvent>,
) {
    // Track entities that died this frame to avoid duplicate death events
    let mut died_this_frame = HashSet::new();

    for event in damage_events.read() {
        if died_this_frame.contains(&event.target) {
            continue;
        }

        let Ok((mut health, mut stats, mut machine, mut last_hit, invincible, armor)) =
            actors.get_mut(event.target)
        else {
            continue;
        };

        if machine.is_dead() {
            continue;
        }

        let (amount, may_stagger) = match armor {
            Some(armor) => armor.absorb(machine.label(), event.amount),
            None => (event.amount, true),
        };
        if event.try_stagger
            && may_stagger
            && !matches!(machine.label(), StateLabel::Launch | StateLabel::Stunned)
        {
            machine.change_state(EntityState::staggered(), true);
        }

        let damage = if event.ignore_defense {
            amount
        } else {
            (amount - stats.defense.int_value()).max(0)
        };

        if event.direct {
            if let Some(attacker) = event.source {
                dealt_events.send(DamageDealtEvent {
                    attacker,
                    victim: event.target,
                    amount: damage,
                });
            }
        }

        if invincible.is_none() {
            health.take_damage(damage);
        }

        taken_events.send(DamageTakenEvent {
            entity: event.target,
            source: event.source,
            amount: damage,
            hit_point: event.hit_point,
        });

        if event.source.is_some() {
            last_hit.0 = event.source;
        }

        if health.is_dead() && invincible.is_none() {
            died_this_frame.insert(event.target);
            enter_death(
                &mut commands,
                event.target,
                last_hit.0,
                &mut health,
                &mut stats,
                &mut machine,
                &mut death_events,
                &mut kill_events,
            );
        }
    }
}

/// Kill requested targets outright.
pub fn apply_executions(
    mut commands: Commands,
    mut execute_events: EventReader<ExecuteEvent>,
    mut actors: Query<
        (
            &mut Health,
            &mut EntityStats,
            &mut StateMachine,
            &mut LastHitSource,
            Option<&Invincible>,
        ),
        Without<Dead>,
    >,
    mut death_events: EventWriter<DeathEvent>,
    mut kill_events: EventWriter<KillEvent>,
) {
    let mut executed = HashSet::new();

    for event in execute_events.read() {
        if !executed.insert(event.target) {
            continue;
        }
        let Ok((mut health, mut stats, mut machine, mut last_hit, _)) = actors.get_mut(event.target)
        else {
            continue;
        };
        if machine.is_dead() {
            continue;
        }

        if event.source.is_some() {
            last_hit.0 = event.source;
        }
        enter_death(
            &mut commands,
            event.target,
            last_hit.0,
            &mut health,
            &mut stats,
            &mut machine,
            &mut death_events,
            &mut kill_events,
        );
    }
}

/// Apply heal requests, clamped to max health.
pub fn apply_heals(
    mut heal_events: EventReader<HealEvent>,
    mut actors: Query<(&mut Health, &EntityStats), Without<Dead>>,
) {
    for event in heal_events.read() {
        if let Ok((mut health, stats)) = actors.get_mut(event.target) {
            health.heal(event.amount, stats.max_health.int_value());
        }
    }
}

/// Force stunned targets into their stun state.
pub fn apply_stuns(
    mut stun_events: EventReader<StunEvent>,
    mut actors: Query<&mut StateMachine, Without<Dead>>,
) {
    for event in stun_events.read() {
        if let Ok(mut machine) = actors.get_mut(event.target) {
            machine.change_state(
                EntityState::Stunned {
                    remaining: event.duration,
                    stunner: event.stunner,
                },
                true,
            );
        }
    }
}

/// Throw launched targets into the air.
pub fn apply_launches(
    mut launch_events: EventReader<LaunchEvent>,
    mut actors: Query<(&mut StateMachine, &mut Motion), Without<Dead>>,
) {
    for event in launch_events.read() {
        let Ok((mut machine, mut motion)) = actors.get_mut(event.target) else {
            continue;
        };

        if !event.force_change && machine.is_in(StateLabel::Launch) {
            continue;
        }

        let launched = machine.change_state(
            EntityState::Launch {
                direction: event.direction,
                force: event.force,
                stun_duration: event.stun_duration,
                elapsed: 0.0,
            },
            true,
        );
        if launched {
            motion.launch(event.direction, event.force);
        }
    }
}

/// Advance the timed base states (spawn, stagger, stun, launch, death).
pub fn tick_base_states(
    mut commands: Commands,
    time: Res<Time>,
    mut actors: Query<(Entity, &mut StateMachine, &EntityStats, &LastHitSource)>,
    mut destroyed_events: EventWriter<EntityDestroyedEvent>,
) {
    for (entity, mut machine, stats, last_hit) in actors.iter_mut() {
        let dt = stats.local_delta(time.delta_secs());

        let mut finished = false;
        match machine.current_mut() {
            EntityState::Spawn { elapsed } => {
                *elapsed += dt;
                finished = *elapsed >= SPAWN_DURATION;
            }
            EntityState::Staggered { elapsed } => {
                *elapsed += dt;
                finished = *elapsed >= STAGGER_DURATION;
            }
            EntityState::Stunned { remaining, .. } => {
                *remaining -= dt;
                finished = *remaining <= 0.0;
            }
            EntityState::Launch {
                elapsed,
                stun_duration,
                ..
            } => {
                *elapsed += dt;
                finished = *elapsed > *stun_duration;
            }
            EntityState::Death {
                elapsed,
                finished: died,
            } => {
                *elapsed += dt;
                if *elapsed >= DEATH_DURATION && !*died {
                    *died = true;
                    destroyed_events.send(EntityDestroyedEvent {
                        entity,
                        killed_by: last_hit.0,
                    });
                    commands.entity(entity).despawn_recursive();
                }
            }
            _ => {}
        }

        if finished {
            machine.to_default(false);
        }
    }
}

/// Turn recorded transitions into events.
pub fn emit_state_changes(
    mut actors: Query<(Entity, &mut StateMachine)>,
    mut changed_events: EventWriter<StateChangedEvent>,
    mut spawn_events: EventWriter<SpawnFinishedEvent>,
) {
    for (entity, mut machine) in actors.iter_mut() {
        for transition in machine.drain_transitions() {
            debug!("{:?}: {:?} -> {:?}", entity, transition.from, transition.to);

            if transition.from == StateLabel::Spawn {
                spawn_events.send(SpawnFinishedEvent { entity });
            }
            changed_events.send(StateChangedEvent {
                entity,
                from: transition.from,
                to: transition.to,
            });
        }
    }
}

/// Feed velocities into the kinematic character controllers.
pub fn integrate_motion(
    time: Res<Time>,
    mut actors: Query<(
        &mut Motion,
        &EntityStats,
        &mut KinematicCharacterController,
        Option<&KinematicCharacterControllerOutput>,
    )>,
) {
    for (mut motion, stats, mut controller, output) in actors.iter_mut() {
        let dt = stats.local_delta(time.delta_secs());

        let grounded = output.is_some_and(|o| o.grounded) && motion.velocity.y <= 0.0;
        motion.grounded = grounded;

        if grounded {
            motion.velocity.y = 0.0;
        } else {
            motion.velocity.y -= motion.gravity * dt;
        }

        controller.translation = Some(motion.velocity * dt);
    }
}

/// Keep transforms scaled by the size stat.
pub fn sync_size(mut actors: Query<(&EntityStats, &mut Transform), Changed<EntityStats>>) {
    for (stats, mut transform) in actors.iter_mut() {
        transform.scale = Vec3::splat(stats.size_scale.value());
    }
}
