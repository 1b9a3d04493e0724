//! Leaper behaviour - an enemy that only moves by hopping.
//!
//! It wanders with long idle hops, chases with short ones, backs off twice
//! before committing and then leaps at where its target is about to be.
//! Decisions are made only while grounded. Flight is left to gravity.

use bevy::prelude::*;
use rand::Rng;
use serde::Deserialize;

use crate::entities::targeting::horizontal_distance;
use crate::entities::StateLabel;

/// Tuning for a leaper, loaded from its enemy definition.
#[derive(Component, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LeaperConfig {
    pub detection_distance: f32,
    pub detection_half_angle: f32,
    pub wander_interval: (f32, f32),
    pub wander_radius: (f32, f32),
    pub wander_hop_height: f32,
    pub chase_hop_height: f32,
    pub chase_hop_distance: f32,
    pub ready_attack_distance: f32,
    pub ready_hop_count: u32,
    pub ready_hop_distance: f32,
    pub ready_hop_height: f32,
    pub ready_delay: f32,
    pub leap_height_ratio: f32,
    pub contact_damage_multiplier: f32,
}

impl Default for LeaperConfig {
    fn default() -> Self {
        Self {
            detection_distance: 15.0,
            detection_half_angle: 40.0,
            wander_interval: (3.0, 5.0),
            wander_radius: (3.0, 5.0),
            wander_hop_height: 2.0,
            chase_hop_height: 1.25,
            chase_hop_distance: 2.0,
            ready_attack_distance: 2.0,
            ready_hop_count: 2,
            ready_hop_distance: 1.5,
            ready_hop_height: 0.75,
            ready_delay: 0.75,
            leap_height_ratio: 0.2,
            contact_damage_multiplier: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeaperState {
    Wander {
        elapsed: f32,
        interval: f32,
        destination: Option<Vec3>,
    },
    Chase {
        target: Entity,
        direction: Vec3,
    },
    ReadyAttack {
        target: Entity,
        hops_done: u32,
        delay: f32,
    },
    /// The leap itself. Contact damage is dealt until landing.
    Attack {
        target: Entity,
        destination: Option<Vec3>,
        hits: Vec<Entity>,
    },
}

impl LeaperState {
    /// Wander with the midpoint interval, used as the default state.
    pub fn wander() -> Self {
        let config = LeaperConfig::default();
        LeaperState::Wander {
            elapsed: 0.0,
            interval: (config.wander_interval.0 + config.wander_interval.1) / 2.0,
            destination: None,
        }
    }

    pub fn wander_random(config: &LeaperConfig, rng: &mut impl Rng) -> Self {
        LeaperState::Wander {
            elapsed: 0.0,
            interval: random_in(config.wander_interval, rng),
            destination: None,
        }
    }

    pub fn chase(target: Entity) -> Self {
        LeaperState::Chase {
            target,
            direction: Vec3::ZERO,
        }
    }

    pub fn ready_attack(target: Entity) -> Self {
        LeaperState::ReadyAttack {
            target,
            hops_done: 0,
            delay: 0.0,
        }
    }

    pub fn attack(target: Entity) -> Self {
        LeaperState::Attack {
            target,
            destination: None,
            hits: Vec::new(),
        }
    }

    pub fn label(&self) -> StateLabel {
        match self {
            LeaperState::Wander { .. } => StateLabel::Wander,
            LeaperState::Chase { .. } => StateLabel::Chase,
            LeaperState::ReadyAttack { .. } => StateLabel::ReadyAttack,
            LeaperState::Attack { .. } => StateLabel::Leap,
        }
    }

    /// The target this state has locked onto, if any.
    pub fn remembered_target(&self) -> Option<Entity> {
        match self {
            LeaperState::Wander { .. } => None,
            LeaperState::Chase { target, .. }
            | LeaperState::ReadyAttack { target, .. }
            | LeaperState::Attack { target, .. } => Some(*target),
        }
    }
}

/// What a leaper can see of its target this frame.
#[derive(Debug, Clone, Copy)]
pub struct TargetView {
    pub entity: Entity,
    pub position: Vec3,
    pub forward: Vec3,
    /// Movement speed already scaled by the target's local time
    pub speed: f32,
}

/// What a leaper knows about itself this frame.
#[derive(Debug, Clone, Copy)]
pub struct LeaperView {
    pub position: Vec3,
    pub grounded: bool,
    pub delta: f32,
    pub gravity: f32,
    /// The remembered target in locked states, the acquired one otherwise
    pub target: Option<TargetView>,
}

/// Result of one behaviour step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeaperStep {
    /// Launch velocity for a hop started this frame
    pub hop: Option<Vec3>,
    pub next: Option<LeaperState>,
    /// Where to face while airborne
    pub facing: Option<Vec3>,
}

impl LeaperState {
    /// Advance the behaviour by one frame.
    pub fn step(&mut self, view: &LeaperView, config: &LeaperConfig, rng: &mut impl Rng) -> LeaperStep {
        let mut step = LeaperStep::default();

        match self {
            LeaperState::Wander {
                elapsed,
                interval,
                destination,
            } => {
                if view.grounded {
                    if let Some(target) = view.target {
                        step.next = Some(LeaperState::chase(target.entity));
                        return step;
                    }
                    *elapsed += view.delta;
                }

                if *elapsed > *interval {
                    *elapsed = 0.0;
                    *interval = random_in(config.wander_interval, rng);
                    let point = random_wander_point(view.position, config.wander_radius, rng);
                    *destination = Some(point);
                    step.hop = Some(hop_velocity(
                        point - view.position,
                        config.wander_hop_height,
                        view.gravity,
                    ));
                }
                step.facing = *destination;
            }
            LeaperState::Chase { target, direction } => {
                if view.grounded {
                    let Some(seen) = view.target.filter(|seen| seen.entity == *target) else {
                        step.next = Some(LeaperState::wander_random(config, rng));
                        return step;
                    };

                    if horizontal_distance(view.position, seen.position) < config.ready_attack_distance {
                        step.next = Some(LeaperState::ready_attack(*target));
                        return step;
                    }

                    *direction = flat_direction(view.position, seen.position);
                    let offset = *direction * config.chase_hop_distance;
                    step.hop = Some(hop_velocity(offset, config.chase_hop_height, view.gravity));
                }
                step.facing = Some(view.position + *direction);
            }
            LeaperState::ReadyAttack {
                target,
                hops_done,
                delay,
            } => {
                let Some(seen) = view.target.filter(|seen| seen.entity == *target) else {
                    step.next = Some(LeaperState::wander_random(config, rng));
                    return step;
                };

                if *hops_done >= config.ready_hop_count {
                    *delay += view.delta;
                }
                step.facing = Some(seen.position);

                if view.grounded {
                    if *hops_done >= config.ready_hop_count {
                        if *delay > config.ready_delay {
                            step.next = Some(if rng.gen_bool(0.5) {
                                LeaperState::attack(*target)
                            } else {
                                LeaperState::chase(*target)
                            });
                        }
                        return step;
                    }

                    let away = -flat_direction(view.position, seen.position) * config.ready_hop_distance;
                    step.hop = Some(hop_velocity(away, config.ready_hop_height, view.gravity));
                    *hops_done += 1;
                }
            }
            LeaperState::Attack {
                target,
                destination,
                ..
            } => match *destination {
                None => {
                    let Some(seen) = view.target.filter(|seen| seen.entity == *target) else {
                        step.next = Some(LeaperState::wander_random(config, rng));
                        return step;
                    };

                    let height = view.position.distance(seen.position) * config.leap_height_ratio;
                    let duration = hop_duration(height, seen.position.y - view.position.y, view.gravity);
                    let landing = predicted_landing(seen, duration);

                    *destination = Some(landing);
                    step.hop = Some(hop_velocity(landing - view.position, height, view.gravity));
                    step.facing = Some(landing);
                }
                Some(landing) => {
                    if view.grounded {
                        step.next = Some(LeaperState::wander_random(config, rng));
                    } else {
                        step.facing = Some(landing);
                    }
                }
            },
        }

        step
    }
}

/// Flight time of a hop peaking `height` above the start and landing `dy`
/// higher than it started. Unreachable landings count as no descent.
pub fn hop_duration(height: f32, dy: f32, gravity: f32) -> f32 {
    let v = (2.0 * gravity * height.abs()).sqrt();
    let to_apex = v / gravity;
    let mut to_land = (2.0 * (height - dy) / gravity).sqrt();
    if to_land.is_nan() {
        to_land = 0.0;
    }
    to_apex + to_land
}

/// Launch velocity that covers `displacement` with a hop of `height`.
pub fn hop_velocity(displacement: Vec3, height: f32, gravity: f32) -> Vec3 {
    let vertical = (2.0 * gravity * height.abs()).sqrt();
    let duration = hop_duration(height, displacement.y, gravity);

    let horizontal = Vec3::new(displacement.x, 0.0, displacement.z);
    let horizontal_velocity = if duration > 0.0 {
        horizontal / duration
    } else {
        Vec3::ZERO
    };
    horizontal_velocity + Vec3::Y * vertical
}

/// Where a target moving straight ahead will be after `duration`.
pub fn predicted_landing(target: TargetView, duration: f32) -> Vec3 {
    target.position + target.forward * target.speed * duration
}

fn flat_direction(from: Vec3, to: Vec3) -> Vec3 {
    Vec3::new(to.x - from.x, 0.0, to.z - from.z).normalize_or_zero()
}

fn random_in(range: (f32, f32), rng: &mut impl Rng) -> f32 {
    if range.1 > range.0 {
        rng.gen_range(range.0..range.1)
    } else {
        range.0
    }
}

fn random_wander_point(center: Vec3, radius: (f32, f32), rng: &mut impl Rng) -> Vec3 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let distance = random_in(radius, rng);
    center + Vec3::new(angle.cos(), 0.0, angle.sin()) * distance
}
