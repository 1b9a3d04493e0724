//! Enemy AI behavior systems.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use super::charger::{resolve_charge_contacts, ChargerConfig, ChargerState, ChargerView, Contact};
use super::components::{Detection, Enemy, Target};
use super::grunt::GruntConfig;
use super::leaper::{LeaperConfig, LeaperState, LeaperView, TargetView};
use crate::core::{DamageEvent, LaunchEvent};
use crate::entities::targeting::{in_view_cone, nearby_targets};
use crate::entities::{
    Dead, EntityState, EntityStats, Motion, StateLabel, StateMachine, TargetCandidate, Team,
};

/// Radius of the leaper's contact hitbox during a leap.
const LEAP_CONTACT_RADIUS: f32 = 0.75;
/// Radius of the charger's contact hitbox, centred just ahead of it.
const CHARGE_CONTACT_RADIUS: f32 = 0.9;
/// How far ahead a charging charger looks for walls.
const CHARGE_WALL_REACH: f32 = 0.9;

/// Pick the nearest visible hostile for `detection`.
pub fn find_target(
    origin: Vec3,
    forward: Vec3,
    team: Team,
    detection: Detection,
    candidates: &[TargetCandidate],
) -> Option<Entity> {
    match detection {
        Detection::Radius(radius) => nearby_targets(origin, team, radius, candidates.iter().copied())
            .first()
            .map(|(entity, _)| *entity),
        Detection::Cone {
            distance,
            half_angle,
            close_radius,
        } => {
            let in_range = nearby_targets(origin, team, distance, candidates.iter().copied());
            let position_of = |entity: Entity| {
                candidates
                    .iter()
                    .find(|c| c.entity == entity)
                    .map(|c| c.position)
            };

            let in_cone = in_range.iter().find(|(entity, _)| {
                position_of(*entity)
                    .is_some_and(|p| in_view_cone(origin, forward, p, distance, half_angle))
            });
            if let Some((entity, _)) = in_cone {
                return Some(*entity);
            }

            in_range
                .iter()
                .find(|(_, d)| *d <= close_radius)
                .map(|(entity, _)| *entity)
        }
    }
}

/// Refresh every active enemy's target.
pub fn acquire_targets(
    mut enemies: Query<(&Transform, &Team, &Detection, &StateMachine, &mut Target), (With<Enemy>, Without<Dead>)>,
    candidates: Query<(Entity, &Transform, &Team), Without<Dead>>,
) {
    let candidates: Vec<TargetCandidate> = candidates
        .iter()
        .map(|(entity, transform, team)| TargetCandidate {
            entity,
            position: transform.translation,
            team: *team,
        })
        .collect();

    for (transform, team, detection, machine, mut target) in enemies.iter_mut() {
        if matches!(machine.label(), StateLabel::Spawn | StateLabel::Death) {
            continue;
        }
        target.0 = find_target(
            transform.translation,
            transform.forward().as_vec3(),
            *team,
            *detection,
            &candidates,
        );
    }
}

fn face(transform: &mut Transform, point: Vec3) {
    let look_target = Vec3::new(point.x, transform.translation.y, point.z);
    if look_target.distance_squared(transform.translation) > 1e-4 {
        transform.look_at(look_target, Vec3::Y);
    }
}

fn turn_toward(transform: &mut Transform, direction: Vec3, amount: f32) {
    let flat = Vec3::new(direction.x, 0.0, direction.z);
    if flat.length_squared() < 1e-6 {
        return;
    }
    let goal = Transform::default().looking_to(flat, Vec3::Y).rotation;
    transform.rotation = transform.rotation.slerp(goal, amount.clamp(0.0, 1.0));
}

/// Run the leaper behaviour on grounded decisions and hops.
pub fn leaper_behaviour(
    time: Res<Time>,
    mut leapers: Query<
        (
            &mut StateMachine,
            &mut Motion,
            &mut Transform,
            &EntityStats,
            &LeaperConfig,
            &Target,
        ),
        (With<Enemy>, Without<Dead>),
    >,
    targets: Query<(&Transform, &EntityStats), Without<LeaperConfig>>,
) {
    let mut rng = rand::thread_rng();

    for (mut machine, mut motion, mut transform, stats, config, target) in leapers.iter_mut() {
        let EntityState::Leaper(state) = machine.current_mut() else {
            continue;
        };

        let tracked = state.remembered_target().or(target.0);
        let seen = tracked.and_then(|entity| {
            targets.get(entity).ok().map(|(target_transform, target_stats)| TargetView {
                entity,
                position: target_transform.translation,
                forward: target_transform.forward().as_vec3(),
                speed: target_stats.movement_speed() * target_stats.local_time_scale.value(),
            })
        });

        let view = LeaperView {
            position: transform.translation,
            grounded: motion.grounded,
            delta: stats.local_delta(time.delta_secs()),
            gravity: motion.gravity,
            target: seen,
        };
        let step = state.step(&view, config, &mut rng);

        match step.hop {
            Some(velocity) => {
                motion.velocity = velocity;
                motion.grounded = false;
            }
            None if motion.grounded => motion.set_horizontal(Vec3::ZERO),
            None => {}
        }
        if let Some(point) = step.facing {
            face(&mut transform, point);
        }
        if let Some(next) = step.next {
            machine.change_state(EntityState::Leaper(next), true);
        }
    }
}

/// Leaping leapers damage every hostile they touch, once per leap.
pub fn leaper_contact_damage(
    rapier_context: Query<&RapierContext>,
    mut leapers: Query<
        (Entity, &mut StateMachine, &Transform, &Team, &EntityStats, &LeaperConfig, &Motion),
        Without<Dead>,
    >,
    victims: Query<&Team, Without<Dead>>,
    mut damage_events: EventWriter<DamageEvent>,
) {
    let Ok(context) = rapier_context.get_single() else {
        return;
    };
    let mut rng = rand::thread_rng();

    for (entity, mut machine, transform, team, stats, config, motion) in leapers.iter_mut() {
        if motion.grounded {
            continue;
        }
        let EntityState::Leaper(LeaperState::Attack {
            destination: Some(_),
            hits,
            ..
        }) = machine.current_mut()
        else {
            continue;
        };

        let mut touched = Vec::new();
        context.intersections_with_shape(
            transform.translation,
            Quat::IDENTITY,
            &Collider::ball(LEAP_CONTACT_RADIUS),
            QueryFilter::default().exclude_collider(entity),
            |hit_entity| {
                touched.push(hit_entity);
                true
            },
        );

        for victim in touched {
            if hits.contains(&victim) {
                continue;
            }
            let Ok(victim_team) = victims.get(victim) else {
                continue;
            };
            if victim_team == team {
                continue;
            }

            hits.push(victim);
            let damage = stats.calculate_damage(config.contact_damage_multiplier, &mut rng);
            damage_events.send(DamageEvent::new(victim, Some(entity), damage).at(transform.translation));
        }
    }
}

/// Walk basic enemies toward their targets and swing when in range.
pub fn grunt_behaviour(
    time: Res<Time>,
    mut grunts: Query<
        (
            Entity,
            &mut StateMachine,
            &mut Motion,
            &mut Transform,
            &EntityStats,
            &GruntConfig,
            &Target,
        ),
        (With<Enemy>, Without<Dead>),
    >,
    targets: Query<&Transform, Without<GruntConfig>>,
    mut damage_events: EventWriter<DamageEvent>,
) {
    let mut rng = rand::thread_rng();

    for (entity, mut machine, mut motion, mut transform, stats, config, target) in grunts.iter_mut() {
        let EntityState::Grunt(state) = machine.current_mut() else {
            continue;
        };

        let target_position = target
            .0
            .and_then(|entity| targets.get(entity).ok())
            .map(|t| t.translation);
        let step = state.step(
            transform.translation,
            target_position,
            stats.local_delta(time.delta_secs()),
            config,
        );

        motion.set_horizontal(step.move_direction * stats.movement_speed());
        if let Some(direction) = step.facing {
            let point = transform.translation + direction;
            face(&mut transform, point);
        }

        if step.strike {
            if let (Some(victim), Some(position)) = (target.0, target_position) {
                let damage = stats.calculate_damage(config.damage_multiplier, &mut rng);
                damage_events.send(DamageEvent::new(victim, Some(entity), damage).at(position));
            }
        }
        if let Some(next) = step.next {
            machine.change_state(EntityState::Grunt(next), true);
        }
    }
}

/// Drive chargers through wandering, bracing, charging and jabbing.
pub fn charger_behaviour(
    time: Res<Time>,
    mut chargers: Query<
        (
            Entity,
            &mut StateMachine,
            &mut Motion,
            &mut Transform,
            &EntityStats,
            &ChargerConfig,
            &Target,
        ),
        (With<Enemy>, Without<Dead>),
    >,
    targets: Query<&Transform, Without<ChargerConfig>>,
    mut damage_events: EventWriter<DamageEvent>,
) {
    let mut rng = rand::thread_rng();

    for (entity, mut machine, mut motion, mut transform, stats, config, target) in chargers.iter_mut() {
        let EntityState::Charger(state) = machine.current_mut() else {
            continue;
        };

        let tracked = state.remembered_target().or(target.0);
        let seen = tracked.and_then(|entity| targets.get(entity).ok().map(|t| (entity, t.translation)));
        let delta = stats.local_delta(time.delta_secs());
        let view = ChargerView {
            position: transform.translation,
            forward: transform.forward().as_vec3(),
            delta,
            target: seen,
        };
        let step = state.step(&view, config, &mut rng);

        motion.set_horizontal(step.velocity * stats.movement_speed());
        if let Some(direction) = step.facing {
            match step.turn_speed {
                Some(rate) => turn_toward(&mut transform, direction, rate * delta),
                None => {
                    let point = transform.translation + direction;
                    face(&mut transform, point);
                }
            }
        }

        if step.jab {
            if let Some((victim, position)) = seen {
                let damage = stats.calculate_damage(config.jab_damage_multiplier, &mut rng);
                damage_events.send(DamageEvent::new(victim, Some(entity), damage).at(position));
            }
        }
        if let Some(next) = step.next {
            machine.change_state(EntityState::Charger(next), true);
        }
    }
}

/// Charging chargers get dazed by walls and throw aside whoever they run into.
pub fn charger_contacts(
    rapier_context: Query<&RapierContext>,
    mut chargers: Query<
        (Entity, &mut StateMachine, &Transform, &Team, &EntityStats, &ChargerConfig),
        (With<Enemy>, Without<Dead>),
    >,
    actors: Query<(&Transform, &Team), Without<Dead>>,
    mut damage_events: EventWriter<DamageEvent>,
    mut launch_events: EventWriter<LaunchEvent>,
) {
    let Ok(context) = rapier_context.get_single() else {
        return;
    };
    let mut rng = rand::thread_rng();

    for (entity, mut machine, transform, team, stats, config) in chargers.iter_mut() {
        let EntityState::Charger(state) = machine.current() else {
            continue;
        };
        if !state.checks_walls(config) {
            continue;
        }
        let charging = matches!(state, ChargerState::Charge { .. });
        let position = transform.translation;
        let forward = transform.forward().as_vec3();
        let filter = QueryFilter::default().exclude_collider(entity);

        let mut contacts = Vec::new();
        // Anything solid without a team is level geometry
        if let Some((hit, _)) = context.cast_ray(position, forward, CHARGE_WALL_REACH, true, filter) {
            if actors.get(hit).is_err() {
                contacts.push(Contact::Wall);
            }
        }

        let mut touched = Vec::new();
        context.intersections_with_shape(
            position + forward * 0.5,
            Quat::IDENTITY,
            &Collider::ball(CHARGE_CONTACT_RADIUS),
            filter,
            |hit| {
                touched.push(hit);
                true
            },
        );
        let mut actors_hit: Vec<(Entity, Vec3, Team)> = touched
            .into_iter()
            .filter_map(|hit| actors.get(hit).ok().map(|(t, team)| (hit, t.translation, *team)))
            .collect();
        actors_hit.sort_by(|a, b| a.1.distance_squared(position).total_cmp(&b.1.distance_squared(position)));
        contacts.extend(
            actors_hit
                .iter()
                .map(|(hit, _, other)| Contact::Actor { entity: *hit, team: *other }),
        );

        let impact = resolve_charge_contacts(*team, charging, contacts);
        for victim in &impact.launched {
            let Some((_, victim_position, _)) = actors_hit.iter().find(|(hit, ..)| hit == victim) else {
                continue;
            };
            launch_events.send(LaunchEvent {
                target: *victim,
                launcher: Some(entity),
                direction: (*victim_position - position).normalize_or_zero(),
                force: config.charge_launch_force,
                stun_duration: config.charge_stun_duration,
                force_change: false,
            });
        }
        if let Some(victim) = impact.struck {
            let damage = stats.calculate_damage(config.charge_damage_multiplier, &mut rng);
            let mut event = DamageEvent::new(victim, Some(entity), damage).at(position + forward * 0.5);
            event.try_stagger = false;
            damage_events.send(event);
        }
        if let Some(next) = impact.next {
            debug!("charger {entity:?} charge ended in {:?}", next.label());
            machine.change_state(EntityState::Charger(next), true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enemies::GruntState;
    use crate::entities::{ENEMY_TEAM, PLAYER_TEAM};
    use std::time::Duration;

    fn candidate(index: u32, position: Vec3, team: Team) -> TargetCandidate {
        TargetCandidate {
            entity: Entity::from_raw(index),
            position,
            team,
        }
    }

    #[test]
    fn cone_detection_prefers_targets_in_front() {
        let cone = Detection::Cone {
            distance: 15.0,
            half_angle: 40.0,
            close_radius: 3.0,
        };
        let candidates = [
            candidate(1, Vec3::new(0.0, 0.0, 5.0), PLAYER_TEAM),
            candidate(2, Vec3::new(0.0, 0.0, -12.0), PLAYER_TEAM),
        ];

        let found = find_target(Vec3::ZERO, Vec3::NEG_Z, ENEMY_TEAM, cone, &candidates);
        assert_eq!(found, Some(Entity::from_raw(2)));

        // behind and far: invisible
        let behind = [candidate(1, Vec3::new(0.0, 0.0, 5.0), PLAYER_TEAM)];
        assert_eq!(find_target(Vec3::ZERO, Vec3::NEG_Z, ENEMY_TEAM, cone, &behind), None);

        // behind but close: sensed anyway
        let close = [candidate(1, Vec3::new(0.0, 0.0, 2.0), PLAYER_TEAM)];
        assert_eq!(
            find_target(Vec3::ZERO, Vec3::NEG_Z, ENEMY_TEAM, cone, &close),
            Some(Entity::from_raw(1))
        );
    }

    #[test]
    fn radius_detection_ignores_allies() {
        let candidates = [
            candidate(1, Vec3::new(1.0, 0.0, 0.0), ENEMY_TEAM),
            candidate(2, Vec3::new(4.0, 0.0, 0.0), PLAYER_TEAM),
        ];
        let found = find_target(
            Vec3::ZERO,
            Vec3::NEG_Z,
            ENEMY_TEAM,
            Detection::Radius(10.0),
            &candidates,
        );
        assert_eq!(found, Some(Entity::from_raw(2)));
    }

    #[test]
    fn grunt_in_range_hits_its_target() {
        let mut app = App::new();
        app.init_resource::<Time>()
            .add_event::<DamageEvent>()
            .add_systems(Update, grunt_behaviour);

        let player = app
            .world_mut()
            .spawn(Transform::from_xyz(1.0, 0.0, 0.0))
            .id();
        let grunt = app
            .world_mut()
            .spawn((
                Enemy {
                    cost: 1,
                    exp_value: 1,
                },
                StateMachine::new(
                    EntityState::Grunt(GruntState::Attack { cooldown: 0.0 }),
                    EntityState::Grunt(GruntState::Idle),
                ),
                Motion::default(),
                Transform::default(),
                EntityStats::default(),
                GruntConfig::default(),
                Target(Some(player)),
            ))
            .id();

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(0.1));
        app.update();

        let events = app.world().resource::<Events<DamageEvent>>();
        let hits: Vec<_> = events.iter_current_update_events().collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, player);
        assert_eq!(hits[0].source, Some(grunt));
    }

    #[test]
    fn jabbing_charger_hits_a_close_target() {
        let mut app = App::new();
        app.init_resource::<Time>()
            .add_event::<DamageEvent>()
            .add_systems(Update, charger_behaviour);

        let player = app
            .world_mut()
            .spawn(Transform::from_xyz(1.0, 0.0, 0.0))
            .id();
        let charger = app
            .world_mut()
            .spawn((
                Enemy {
                    cost: 6,
                    exp_value: 15,
                },
                StateMachine::new(
                    EntityState::Charger(ChargerState::Jab {
                        target: player,
                        remaining: 5,
                        elapsed: 0.0,
                        hit_done: false,
                    }),
                    EntityState::Charger(ChargerState::wander()),
                ),
                Motion::default(),
                Transform::default(),
                EntityStats::default(),
                ChargerConfig::default(),
                Target(None),
            ))
            .id();

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(0.3));
        app.update();

        let events = app.world().resource::<Events<DamageEvent>>();
        let hits: Vec<_> = events.iter_current_update_events().collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, player);
        assert_eq!(hits[0].source, Some(charger));

        // Still jabbing, and turning toward the target
        let machine = app.world().get::<StateMachine>(charger).unwrap();
        assert_eq!(machine.label(), StateLabel::Jab);
        let facing = app.world().get::<Transform>(charger).unwrap().forward().as_vec3();
        assert!(facing.x > 0.0);
    }
}
