//! Basic enemy behaviour: walk up to the target and hit it on a cooldown.

use bevy::prelude::*;
use serde::Deserialize;

use crate::entities::targeting::horizontal_distance;
use crate::entities::StateLabel;

#[derive(Component, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GruntConfig {
    pub attack_range: f32,
    pub attack_cooldown: f32,
    pub damage_multiplier: f32,
    /// Give up the chase beyond this distance
    pub leash_range: f32,
}

impl Default for GruntConfig {
    fn default() -> Self {
        Self {
            attack_range: 2.0,
            attack_cooldown: 1.5,
            damage_multiplier: 1.0,
            leash_range: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GruntState {
    Idle,
    Chase,
    Attack { cooldown: f32 },
}

impl GruntState {
    pub fn label(&self) -> StateLabel {
        match self {
            GruntState::Idle => StateLabel::GruntIdle,
            GruntState::Chase => StateLabel::GruntChase,
            GruntState::Attack { .. } => StateLabel::GruntAttack,
        }
    }

    /// Advance one frame. `target` is the target's position, if any.
    pub fn step(&mut self, position: Vec3, target: Option<Vec3>, delta: f32, config: &GruntConfig) -> GruntStep {
        let mut step = GruntStep::default();

        let Some(target) = target else {
            if *self != GruntState::Idle {
                step.next = Some(GruntState::Idle);
            }
            return step;
        };
        let distance = horizontal_distance(position, target);
        let direction = Vec3::new(target.x - position.x, 0.0, target.z - position.z).normalize_or_zero();
        step.facing = Some(direction);

        match self {
            GruntState::Idle => step.next = Some(GruntState::Chase),
            GruntState::Chase => {
                if distance <= config.attack_range {
                    // first swing lands right away
                    step.next = Some(GruntState::Attack { cooldown: 0.0 });
                } else if distance > config.leash_range {
                    step.next = Some(GruntState::Idle);
                } else {
                    step.move_direction = direction;
                }
            }
            GruntState::Attack { cooldown } => {
                *cooldown -= delta;
                if *cooldown <= 0.0 {
                    if distance > config.attack_range {
                        step.next = Some(GruntState::Chase);
                    } else {
                        step.strike = true;
                        *cooldown = config.attack_cooldown;
                    }
                }
            }
        }
        step
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GruntStep {
    pub next: Option<GruntState>,
    /// Unit horizontal direction to walk in, zero to stand still
    pub move_direction: Vec3,
    pub facing: Option<Vec3>,
    pub strike: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_grunt_chases_any_target() {
        let config = GruntConfig::default();
        let mut state = GruntState::Idle;
        let step = state.step(Vec3::ZERO, Some(Vec3::new(5.0, 0.0, 0.0)), 0.1, &config);
        assert_eq!(step.next, Some(GruntState::Chase));
    }

    #[test]
    fn chase_walks_until_in_range() {
        let config = GruntConfig::default();
        let mut state = GruntState::Chase;

        let far = state.step(Vec3::ZERO, Some(Vec3::new(5.0, 0.0, 0.0)), 0.1, &config);
        assert_eq!(far.move_direction, Vec3::X);
        assert!(far.next.is_none());

        let near = state.step(Vec3::ZERO, Some(Vec3::new(1.0, 0.0, 0.0)), 0.1, &config);
        assert_eq!(near.next, Some(GruntState::Attack { cooldown: 0.0 }));
    }

    #[test]
    fn attack_strikes_on_cooldown() {
        let config = GruntConfig::default();
        let mut state = GruntState::Attack { cooldown: 0.0 };
        let target = Some(Vec3::new(1.0, 0.0, 0.0));

        assert!(state.step(Vec3::ZERO, target, 0.1, &config).strike);
        assert!(!state.step(Vec3::ZERO, target, 1.0, &config).strike);
        assert!(state.step(Vec3::ZERO, target, 0.6, &config).strike);
    }

    #[test]
    fn losing_the_target_goes_idle() {
        let config = GruntConfig::default();
        let mut state = GruntState::Chase;
        let step = state.step(Vec3::ZERO, None, 0.1, &config);
        assert_eq!(step.next, Some(GruntState::Idle));
    }
}
