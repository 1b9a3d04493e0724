//! Combat systems - combo resolution, attack timing, hit detection and
//! impact frames.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use super::components::*;
use super::combo::ComboAction;
use super::tracker::{ComboResolution, ComboTracker, ATTACK_RESET_DELAY};
use crate::core::{DamageEvent, LaunchEvent, StunEvent};
use crate::entities::{
    Dead, EntityState, EntityStats, Health, Motion, StateLabel, StateMachine, Team,
};
use crate::player::{can_basic_attack, can_charged_attack, PlayerState};
use crate::stats::BuffSource;

/// Count down delayed combo resets. Attacks and charges hold the history.
pub fn tick_combo_trackers(time: Res<Time>, mut trackers: Query<(&mut ComboTracker, &StateMachine)>) {
    for (mut tracker, machine) in &mut trackers {
        let hold = machine.is_in(StateLabel::Attack) || machine.is_in(StateLabel::Charge);
        tracker.tick(time.delta_secs(), hold);
    }
}

fn can_execute_combo(machine: &StateMachine) -> bool {
    !machine.is_in(StateLabel::Slide) && !machine.is_in(StateLabel::Staggered)
}

/// Feed combo inputs to their trackers and start any combo that resolves.
pub fn resolve_combo_inputs(
    mut inputs: EventReader<ComboInputEvent>,
    mut attackers: Query<(&mut ComboTracker, &Weapon, &mut StateMachine, &Motion)>,
    mut executed: EventWriter<ComboExecutedEvent>,
    mut releases: EventWriter<ChargeReleasedEvent>,
) {
    for input in inputs.read() {
        let Ok((mut tracker, weapon, mut machine, motion)) = attackers.get_mut(input.entity) else {
            continue;
        };
        if !tracker.is_enabled() {
            continue;
        }
        let allowed = match input.action {
            ComboAction::Attack1 | ComboAction::Attack2 => can_basic_attack(&machine, &tracker),
            ComboAction::ChargedAttack1 | ComboAction::ChargedAttack2 => can_charged_attack(&machine),
            ComboAction::Dash | ComboAction::Jump => true,
        };
        if !allowed {
            debug!("{:?} cannot {:?} right now", input.entity, input.action);
            continue;
        }

        let combos = weapon.combos(!motion.grounded);
        match tracker.push(input.action, &combos) {
            ComboResolution::Recorded => {}
            ComboResolution::Execute(combo) if can_execute_combo(&machine) => {
                debug!("{:?} executes combo '{}'", input.entity, combo.name);
                executed.send(ComboExecutedEvent {
                    entity: input.entity,
                    combo: combo.name.clone(),
                });
                if let EntityState::Player(PlayerState::Charge { elapsed }) = machine.current() {
                    releases.send(ChargeReleasedEvent {
                        entity: input.entity,
                        charge_duration: *elapsed,
                    });
                }
                tracker.can_combo = false;
                machine.change_state(EntityState::Player(PlayerState::attack(combo)), true);
            }
            _ => {
                // A rejected charged release drops the charge
                if machine.is_in(StateLabel::Charge) {
                    machine.to_default(false);
                }
            }
        }
    }
}

/// Advance attacks, landing the hit part way through and returning to the
/// default state once the attack ends.
pub fn advance_attacks(
    time: Res<Time>,
    mut attackers: Query<
        (
            Entity,
            &mut StateMachine,
            &mut ComboTracker,
            &mut Motion,
            &EntityStats,
            &Transform,
            &Team,
            &Weapon,
        ),
        Without<Dead>,
    >,
    victims: Query<(&Team, &Health, &EntityStats, &Motion), (Without<ComboTracker>, Without<Dead>)>,
    rapier_context: Query<&RapierContext>,
    mut damage_events: EventWriter<DamageEvent>,
    mut hit_events: EventWriter<WeaponHitEvent>,
    mut stun_events: EventWriter<StunEvent>,
    mut launch_events: EventWriter<LaunchEvent>,
    mut impact_events: EventWriter<ImpactFramesEvent>,
) {
    let mut rng = rand::thread_rng();

    for (entity, mut machine, mut tracker, mut motion, stats, transform, team, weapon) in
        &mut attackers
    {
        let delta = stats.local_delta(time.delta_secs());

        let (strike, finished) = {
            let EntityState::Player(PlayerState::Attack {
                combo,
                elapsed,
                hit_done,
            }) = machine.current_mut()
            else {
                continue;
            };

            *elapsed += delta;
            let duration = combo.duration();
            if *elapsed >= duration * COMBO_WINDOW_FRACTION {
                tracker.can_combo = true;
            }

            let strike = if !*hit_done && *elapsed >= duration * HIT_FRACTION {
                *hit_done = true;
                Some(combo.clone())
            } else {
                None
            };
            (strike, *elapsed > duration)
        };

        if let Some(combo) = strike {
            let forward = transform.forward().as_vec3();
            let center = transform.translation + forward * combo.hit_reach + Vec3::Y * 0.5;

            let mut struck = Vec::new();
            if let Ok(context) = rapier_context.get_single() {
                context.intersections_with_shape(
                    center,
                    Quat::IDENTITY,
                    &Collider::ball(combo.hit_radius),
                    QueryFilter::default().exclude_collider(entity),
                    |hit_entity| {
                        struck.push(hit_entity);
                        true
                    },
                );
            }
            struck.sort();
            struck.dedup();

            for victim in struck {
                let Ok((victim_team, health, victim_stats, victim_motion)) = victims.get(victim)
                else {
                    continue;
                };
                if victim_team == team {
                    continue;
                }

                let damage = stats.calculate_damage(
                    combo.damage_multiplier * weapon.base_damage_multiplier,
                    &mut rng,
                );
                let will_die = health.will_die_from(damage, victim_stats.max_health.int_value());

                damage_events.send(DamageEvent::new(victim, Some(entity), damage).at(center));
                hit_events.send(WeaponHitEvent {
                    attacker: entity,
                    victim,
                    hit_point: center,
                    damage,
                    charged: combo.is_charged(),
                });

                for frozen in [entity, victim] {
                    impact_events.send(ImpactFramesEvent {
                        entity: frozen,
                        time_scale: combo.impact_time_scale,
                        duration: combo.impact_duration,
                    });
                }

                if combo.stun {
                    stun_events.send(StunEvent {
                        target: victim,
                        stunner: Some(entity),
                        duration: combo.stun_duration,
                    });
                }

                let air_combo = !motion.grounded && !victim_motion.grounded;
                if (combo.launch_upwards || air_combo) && !will_die {
                    launch_events.send(LaunchEvent {
                        target: victim,
                        launcher: Some(entity),
                        direction: Vec3::Y,
                        force: combo.air_launch_force,
                        stun_duration: LAUNCH_STUN_DURATION,
                        force_change: true,
                    });
                }

                // Keep the attacker up with an airborne victim
                if air_combo {
                    if combo.air_launch_force > 0.0 {
                        motion.launch(Vec3::Y, combo.air_launch_force);
                    } else {
                        motion.velocity.y = 0.0;
                    }
                }
            }
        }

        if finished {
            machine.to_default(false);
            tracker.can_combo = false;
            tracker.schedule_reset(ATTACK_RESET_DELAY);
            motion.set_horizontal(Vec3::ZERO);
        }
    }
}

/// Start impact frames, or extend ones already running.
pub fn start_impact_frames(
    mut commands: Commands,
    mut requests: EventReader<ImpactFramesEvent>,
    mut frozen: Query<&mut ImpactFrames>,
) {
    for request in requests.read() {
        if request.duration <= 0.0 {
            continue;
        }

        if let Ok(mut frames) = frozen.get_mut(request.entity) {
            frames.remaining = frames.remaining.max(request.duration);
            continue;
        }

        if let Some(mut entity) = commands.get_entity(request.entity) {
            entity.insert(ImpactFrames {
                time_scale: request.time_scale,
                remaining: request.duration,
                applied: false,
            });
        }
    }
}

/// Slow frozen entities down and restore them when the freeze runs out.
pub fn tick_impact_frames(
    mut commands: Commands,
    time: Res<Time>,
    mut frozen: Query<(Entity, &mut ImpactFrames, &mut EntityStats, Has<Dead>)>,
) {
    for (entity, mut frames, mut stats, dead) in &mut frozen {
        if !frames.applied && !dead {
            stats
                .local_time_scale
                .add_multiplier(frames.time_scale, BuffSource::ImpactFrames);
            frames.applied = true;
        }

        // Real time, not the frozen entity's local time
        frames.remaining -= time.delta_secs();
        if frames.remaining <= 0.0 || dead {
            stats
                .local_time_scale
                .clear_buffs_from_source(BuffSource::ImpactFrames);
            commands.entity(entity).remove::<ImpactFrames>();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{ComboAction, ComboDefinition};
    use crate::core::DamageEvent;
    use std::time::Duration;

    fn sword() -> Weapon {
        let mut slash = ComboDefinition::new("slash", &[ComboAction::Attack1]);
        slash.clip_duration = 0.5;
        Weapon::new("Sword", vec![slash])
    }

    fn test_app() -> App {
        let mut app = App::new();
        app.init_resource::<Time>()
            .add_event::<ComboInputEvent>()
            .add_event::<ComboExecutedEvent>()
            .add_event::<ChargeReleasedEvent>()
            .add_event::<WeaponHitEvent>()
            .add_event::<ImpactFramesEvent>()
            .add_event::<DamageEvent>()
            .add_event::<StunEvent>()
            .add_event::<LaunchEvent>()
            .add_systems(
                Update,
                (
                    tick_combo_trackers,
                    resolve_combo_inputs,
                    advance_attacks,
                    start_impact_frames,
                    tick_impact_frames,
                )
                    .chain(),
            );
        app
    }

    fn spawn_attacker(app: &mut App, state: PlayerState) -> Entity {
        app.world_mut()
            .spawn((
                ComboTracker::default(),
                sword(),
                StateMachine::new(
                    EntityState::Player(state),
                    EntityState::Player(PlayerState::Idle),
                ),
                Motion {
                    grounded: true,
                    ..Default::default()
                },
                EntityStats::default(),
                Transform::default(),
                Team(0),
            ))
            .id()
    }

    fn press(app: &mut App, entity: Entity, action: ComboAction) {
        app.world_mut()
            .send_event(ComboInputEvent { entity, action });
        app.update();
    }

    fn label(app: &App, entity: Entity) -> StateLabel {
        app.world().get::<StateMachine>(entity).unwrap().label()
    }

    #[test]
    fn attack_input_starts_combo() {
        let mut app = test_app();
        let player = spawn_attacker(&mut app, PlayerState::Idle);

        press(&mut app, player, ComboAction::Attack1);

        assert_eq!(label(&app, player), StateLabel::Attack);
        let executed = app.world().resource::<Events<ComboExecutedEvent>>();
        assert_eq!(executed.iter_current_update_events().count(), 1);
    }

    #[test]
    fn sliding_blocks_combos() {
        let mut app = test_app();
        let player = spawn_attacker(&mut app, PlayerState::Slide { elapsed: 0.0 });

        press(&mut app, player, ComboAction::Attack1);

        assert_eq!(label(&app, player), StateLabel::Slide);
    }

    #[test]
    fn stunned_player_cannot_start_combos() {
        let mut app = test_app();
        let player = spawn_attacker(&mut app, PlayerState::Idle);
        app.world_mut()
            .get_mut::<StateMachine>(player)
            .unwrap()
            .change_state(
                EntityState::Stunned {
                    remaining: 2.0,
                    stunner: None,
                },
                true,
            );

        press(&mut app, player, ComboAction::Attack1);

        assert_eq!(label(&app, player), StateLabel::Stunned);
        let executed = app.world().resource::<Events<ComboExecutedEvent>>();
        assert_eq!(executed.iter_current_update_events().count(), 0);
    }

    #[test]
    fn launched_player_cannot_start_combos() {
        let mut app = test_app();
        let player = spawn_attacker(&mut app, PlayerState::Idle);
        app.world_mut()
            .get_mut::<StateMachine>(player)
            .unwrap()
            .change_state(
                EntityState::Launch {
                    direction: Vec3::Y,
                    force: 5.0,
                    stun_duration: 0.5,
                    elapsed: 0.0,
                },
                true,
            );

        press(&mut app, player, ComboAction::Attack1);

        assert_eq!(label(&app, player), StateLabel::Launch);
    }

    #[test]
    fn attack_before_combo_window_does_not_restart() {
        let mut app = test_app();
        let player = spawn_attacker(&mut app, PlayerState::Idle);
        press(&mut app, player, ComboAction::Attack1);

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(0.1));
        app.update();
        assert!(!app.world().get::<ComboTracker>(player).unwrap().can_combo);

        press(&mut app, player, ComboAction::Attack1);

        let executed = app.world().resource::<Events<ComboExecutedEvent>>();
        assert_eq!(executed.iter_current_update_events().count(), 0);
        let machine = app.world().get::<StateMachine>(player).unwrap();
        let EntityState::Player(PlayerState::Attack { elapsed, .. }) = machine.current() else {
            panic!("expected the attack to continue");
        };
        assert!((elapsed - 0.2).abs() < 1e-4);
    }

    #[test]
    fn attack_inside_combo_window_chains() {
        let mut app = test_app();
        let player = spawn_attacker(&mut app, PlayerState::Idle);
        press(&mut app, player, ComboAction::Attack1);

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(0.3));
        app.update();
        assert!(app.world().get::<ComboTracker>(player).unwrap().can_combo);

        press(&mut app, player, ComboAction::Attack1);

        let executed = app.world().resource::<Events<ComboExecutedEvent>>();
        assert_eq!(executed.iter_current_update_events().count(), 1);
    }

    #[test]
    fn unmatched_charged_release_drops_charge() {
        let mut app = test_app();
        let player = spawn_attacker(&mut app, PlayerState::Charge { elapsed: 1.0 });

        press(&mut app, player, ComboAction::ChargedAttack1);

        assert_eq!(label(&app, player), StateLabel::Idle);
    }

    #[test]
    fn attack_returns_to_default_and_schedules_reset() {
        let mut app = test_app();
        let player = spawn_attacker(&mut app, PlayerState::Idle);
        press(&mut app, player, ComboAction::Attack1);

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(0.3));
        app.update();
        assert_eq!(label(&app, player), StateLabel::Attack);
        assert!(app.world().get::<ComboTracker>(player).unwrap().can_combo);

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(0.3));
        app.update();
        assert_eq!(label(&app, player), StateLabel::Idle);

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(0.2));
        app.update();
        let tracker = app.world().get::<ComboTracker>(player).unwrap();
        assert!(tracker.current_inputs().is_empty());
    }

    #[test]
    fn impact_frames_slow_then_restore() {
        let mut app = test_app();
        let target = app.world_mut().spawn(EntityStats::default()).id();

        app.world_mut().send_event(ImpactFramesEvent {
            entity: target,
            time_scale: 0.05,
            duration: 0.25,
        });
        app.update();
        app.update();
        let scale = app
            .world()
            .get::<EntityStats>(target)
            .unwrap()
            .local_time_scale
            .value();
        assert!((scale - 0.05).abs() < 1e-6);

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(0.3));
        app.update();
        let stats = app.world().get::<EntityStats>(target).unwrap();
        assert_eq!(stats.local_time_scale.value(), 1.0);
        assert!(app.world().get::<ImpactFrames>(target).is_none());
    }
}
