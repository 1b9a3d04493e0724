//! Charger behaviour - a heavy enemy that spots a target, braces, then
//! either barrels at it or throws a flurry of jabs when it is close.
//!
//! Bracing, charging and jabbing are armored. Running into a wall leaves it
//! dazed and open.

use bevy::prelude::*;
use rand::Rng;
use serde::Deserialize;

use crate::entities::targeting::horizontal_distance;
use crate::entities::{StateLabel, Team};

/// Tuning for a charger, loaded from its enemy definition.
#[derive(Component, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ChargerConfig {
    pub detection_distance: f32,
    pub detection_half_angle: f32,
    pub wander_interval: (f32, f32),
    pub wander_radius: (f32, f32),
    /// Bracing time after spotting a target
    pub brace_duration: f32,
    /// Targets closer than this get jabbed instead of charged
    pub jab_radius: f32,
    pub charge_speed_multiplier: f32,
    pub charge_duration: f32,
    pub charge_turn_speed: f32,
    pub charge_damage_multiplier: f32,
    pub charge_launch_force: f32,
    pub charge_stun_duration: f32,
    pub wind_down_duration: f32,
    pub dazed_duration: f32,
    pub jab_count: u32,
    pub jab_duration: f32,
    pub jab_damage_multiplier: f32,
    pub jab_reach: f32,
    /// Stop closing in once this near
    pub jab_stand_still_radius: f32,
    pub jab_turn_speed: f32,
    pub jab_recover_duration: f32,
    /// Hits this strong stagger through armor
    pub stagger_damage_threshold: i32,
    /// Share of lighter hits that gets through armor
    pub armored_damage_multiplier: f32,
}

impl Default for ChargerConfig {
    fn default() -> Self {
        Self {
            detection_distance: 15.0,
            detection_half_angle: 30.0,
            wander_interval: (3.0, 5.0),
            wander_radius: (3.0, 5.0),
            brace_duration: 2.0,
            jab_radius: 6.0,
            charge_speed_multiplier: 5.0,
            charge_duration: 20.0,
            charge_turn_speed: 5.0,
            charge_damage_multiplier: 2.0,
            charge_launch_force: 10.0,
            charge_stun_duration: 4.0,
            wind_down_duration: 2.0,
            dazed_duration: 5.0,
            jab_count: 5,
            jab_duration: 0.45,
            jab_damage_multiplier: 1.0,
            jab_reach: 2.0,
            jab_stand_still_radius: 1.5,
            jab_turn_speed: 25.0,
            jab_recover_duration: 2.0,
            stagger_damage_threshold: 40,
            armored_damage_multiplier: 0.5,
        }
    }
}

/// Close enough to a wander destination to stop walking.
const ARRIVE_DISTANCE: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub enum ChargerState {
    Wander {
        elapsed: f32,
        interval: f32,
        destination: Option<Vec3>,
    },
    Brace {
        target: Entity,
        elapsed: f32,
    },
    Charge {
        target: Entity,
        elapsed: f32,
    },
    WindDown {
        elapsed: f32,
    },
    Dazed {
        elapsed: f32,
    },
    Jab {
        target: Entity,
        remaining: u32,
        elapsed: f32,
        hit_done: bool,
    },
    JabRecover {
        elapsed: f32,
    },
}

impl ChargerState {
    /// States that soak light hits.
    pub const ARMORED: [StateLabel; 3] = [
        StateLabel::ChargerBrace,
        StateLabel::Charging,
        StateLabel::Jab,
    ];

    pub fn wander() -> Self {
        ChargerState::Wander {
            elapsed: 0.0,
            interval: 0.0,
            destination: None,
        }
    }

    pub fn label(&self) -> StateLabel {
        match self {
            ChargerState::Wander { .. } => StateLabel::Wander,
            ChargerState::Brace { .. } => StateLabel::ChargerBrace,
            ChargerState::Charge { .. } => StateLabel::Charging,
            ChargerState::WindDown { .. } => StateLabel::WindDown,
            ChargerState::Dazed { .. } => StateLabel::Dazed,
            ChargerState::Jab { .. } => StateLabel::Jab,
            ChargerState::JabRecover { .. } => StateLabel::JabRecover,
        }
    }

    pub fn remembered_target(&self) -> Option<Entity> {
        match self {
            ChargerState::Brace { target, .. }
            | ChargerState::Charge { target, .. }
            | ChargerState::Jab { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Whether running into a wall right now dazes the charger.
    pub fn checks_walls(&self, config: &ChargerConfig) -> bool {
        match self {
            ChargerState::Charge { .. } => true,
            ChargerState::WindDown { elapsed } => *elapsed < config.wind_down_duration / 2.0,
            _ => false,
        }
    }
}

/// What a charger knows about itself this frame.
#[derive(Debug, Clone, Copy)]
pub struct ChargerView {
    pub position: Vec3,
    pub forward: Vec3,
    pub delta: f32,
    /// The remembered target in locked states, the acquired one otherwise
    pub target: Option<(Entity, Vec3)>,
}

/// Result of one behaviour step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChargerStep {
    pub next: Option<ChargerState>,
    /// Horizontal movement in multiples of movement speed
    pub velocity: Vec3,
    /// Direction to face
    pub facing: Option<Vec3>,
    /// Turn rate toward `facing`, snapping when absent
    pub turn_speed: Option<f32>,
    /// A jab lands this frame
    pub jab: bool,
}

impl ChargerState {
    /// Advance the behaviour by one frame.
    pub fn step(&mut self, view: &ChargerView, config: &ChargerConfig, rng: &mut impl Rng) -> ChargerStep {
        let mut step = ChargerStep::default();
        let locked = self.remembered_target();
        let seen = view
            .target
            .filter(|(entity, _)| locked.map_or(true, |target| target == *entity));

        match self {
            ChargerState::Wander {
                elapsed,
                interval,
                destination,
            } => {
                if let Some((target, _)) = seen {
                    step.next = Some(ChargerState::Brace {
                        target,
                        elapsed: 0.0,
                    });
                    return step;
                }

                *elapsed += view.delta;
                if destination.is_none() || *elapsed > *interval {
                    *elapsed = 0.0;
                    *interval = random_in(config.wander_interval, rng);
                    *destination = Some(random_wander_point(view.position, config.wander_radius, rng));
                }

                if let Some(point) = *destination {
                    if horizontal_distance(view.position, point) > ARRIVE_DISTANCE {
                        let direction = flat_direction(view.position, point);
                        step.velocity = direction;
                        step.facing = Some(direction);
                    }
                }
            }
            ChargerState::Brace { target, elapsed } => {
                let Some((_, position)) = seen else {
                    step.next = Some(ChargerState::wander());
                    return step;
                };
                step.facing = Some(flat_direction(view.position, position));

                *elapsed += view.delta;
                if *elapsed > config.brace_duration {
                    let next = if view.position.distance(position) < config.jab_radius {
                        ChargerState::Jab {
                            target: *target,
                            remaining: config.jab_count,
                            elapsed: 0.0,
                            hit_done: false,
                        }
                    } else {
                        ChargerState::Charge {
                            target: *target,
                            elapsed: 0.0,
                        }
                    };
                    step.next = Some(next);
                }
            }
            ChargerState::Charge { elapsed, .. } => {
                let Some((_, position)) = seen else {
                    step.next = Some(ChargerState::WindDown { elapsed: 0.0 });
                    return step;
                };

                *elapsed += view.delta;
                if *elapsed > config.charge_duration {
                    step.next = Some(ChargerState::WindDown { elapsed: 0.0 });
                    return step;
                }

                step.velocity = view.forward * config.charge_speed_multiplier;
                step.facing = Some(flat_direction(view.position, position));
                step.turn_speed = Some(config.charge_turn_speed);
            }
            ChargerState::WindDown { elapsed } => {
                *elapsed += view.delta;
                if *elapsed > config.wind_down_duration {
                    step.next = Some(ChargerState::wander());
                    return step;
                }

                let half = config.wind_down_duration / 2.0;
                if *elapsed < half {
                    let speed = ease_out_quad(config.charge_speed_multiplier, 0.0, *elapsed / half);
                    step.velocity = view.forward * speed;
                }
            }
            ChargerState::Dazed { elapsed } => {
                *elapsed += view.delta;
                if *elapsed > config.dazed_duration {
                    step.next = Some(ChargerState::wander());
                }
            }
            ChargerState::Jab {
                remaining,
                elapsed,
                hit_done,
                ..
            } => {
                let Some((_, position)) = seen else {
                    step.next = Some(ChargerState::JabRecover { elapsed: 0.0 });
                    return step;
                };
                let distance = horizontal_distance(view.position, position);
                let direction = flat_direction(view.position, position);
                step.facing = Some(direction);
                step.turn_speed = Some(config.jab_turn_speed);
                if distance > config.jab_stand_still_radius {
                    step.velocity = direction;
                }

                *elapsed += view.delta;
                if !*hit_done && *elapsed >= config.jab_duration / 2.0 {
                    *hit_done = true;
                    *remaining = remaining.saturating_sub(1);
                    step.jab = distance <= config.jab_reach;
                }

                if *elapsed >= config.jab_duration {
                    if *remaining == 0 {
                        step.next = Some(ChargerState::JabRecover { elapsed: 0.0 });
                    } else {
                        *elapsed = 0.0;
                        *hit_done = false;
                    }
                }
            }
            ChargerState::JabRecover { elapsed } => {
                *elapsed += view.delta;
                if *elapsed > config.jab_recover_duration {
                    step.next = Some(ChargerState::wander());
                }
            }
        }

        step
    }
}

/// Something a charging charger ran into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contact {
    Wall,
    Actor { entity: Entity, team: Team },
}

/// What a charge's contacts add up to, in contact order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChargeImpact {
    /// Actors thrown aside, allies included
    pub launched: Vec<Entity>,
    /// The hostile that ended the charge
    pub struck: Option<Entity>,
    pub next: Option<ChargerState>,
}

/// Resolve this frame's contacts. A wall dazes and a hostile ends the charge,
/// either one stops the scan. Allies in the way are only launched. Actors
/// are ignored while winding down.
pub fn resolve_charge_contacts(
    team: Team,
    charging: bool,
    contacts: impl IntoIterator<Item = Contact>,
) -> ChargeImpact {
    let mut impact = ChargeImpact::default();

    for contact in contacts {
        match contact {
            Contact::Wall => {
                impact.next = Some(ChargerState::Dazed { elapsed: 0.0 });
                return impact;
            }
            Contact::Actor { .. } if !charging => {}
            Contact::Actor { entity, team: other } if other == team => impact.launched.push(entity),
            Contact::Actor { entity, .. } => {
                impact.launched.push(entity);
                impact.struck = Some(entity);
                impact.next = Some(ChargerState::WindDown { elapsed: 0.0 });
                return impact;
            }
        }
    }
    impact
}

fn ease_out_quad(from: f32, to: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    from + (to - from) * (1.0 - (1.0 - t) * (1.0 - t))
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
    center + Vec3::new(angle.cos(), 0.0, angle.sin()) * random_in(radius, rng)
}
