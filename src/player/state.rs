//! Player-specific states.

use crate::combat::ComboDefinition;
use crate::entities::{EntityState, StateLabel};

pub const DASH_DURATION: f32 = 0.25;
pub const DASH_INITIAL_VELOCITY: f32 = 75.0;
pub const DASH_COOLDOWN: f32 = 1.0;
pub const JUMP_HEIGHT: f32 = 2.0;
/// How long an attack button must be held before charging.
pub const CHARGE_THRESHOLD: f32 = 0.25;

/// Which states an ability may be interrupted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityCancel {
    Always,
    /// Only the default state or another ability
    IntoDefaultOrAbility,
}

impl AbilityCancel {
    pub fn allows(&self, next: &EntityState, default: &EntityState) -> bool {
        match self {
            AbilityCancel::Always => true,
            AbilityCancel::IntoDefaultOrAbility => {
                next.label() == StateLabel::Ability || next.same_kind(default)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerState {
    Idle,
    Walk,
    Jump,
    Fall,
    Dash {
        elapsed: f32,
    },
    /// Sliding down a slope too steep to stand on
    Slide {
        elapsed: f32,
    },
    Charge {
        elapsed: f32,
    },
    Attack {
        combo: ComboDefinition,
        elapsed: f32,
        hit_done: bool,
    },
    Ability {
        name: String,
        elapsed: f32,
        duration: f32,
        cancel: AbilityCancel,
    },
}

impl PlayerState {
    pub fn attack(combo: ComboDefinition) -> Self {
        PlayerState::Attack {
            combo,
            elapsed: 0.0,
            hit_done: false,
        }
    }

    pub fn ability(name: &str, duration: f32, cancel: AbilityCancel) -> Self {
        PlayerState::Ability {
            name: name.to_string(),
            elapsed: 0.0,
            duration,
            cancel,
        }
    }

    pub fn label(&self) -> StateLabel {
        match self {
            PlayerState::Idle => StateLabel::Idle,
            PlayerState::Walk => StateLabel::Walk,
            PlayerState::Jump => StateLabel::Jump,
            PlayerState::Fall => StateLabel::Fall,
            PlayerState::Dash { .. } => StateLabel::Dash,
            PlayerState::Slide { .. } => StateLabel::Slide,
            PlayerState::Charge { .. } => StateLabel::Charge,
            PlayerState::Attack { .. } => StateLabel::Attack,
            PlayerState::Ability { .. } => StateLabel::Ability,
        }
    }
}

/// Speed during a dash, easing from the initial burst down to `max_speed`.
pub fn dash_speed(elapsed: f32, max_speed: f32) -> f32 {
    let t = (elapsed / DASH_DURATION).clamp(0.0, 1.0);
    let ease = 1.0 - (1.0 - (t - 1.0).powi(2)).sqrt();
    (DASH_INITIAL_VELOCITY - max_speed) * ease + max_speed
}

/// Upward speed needed to reach `height` under `gravity`.
pub fn jump_velocity(height: f32, gravity: f32) -> f32 {
    (2.0 * height * gravity).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::StateMachine;

    #[test]
    fn restricted_ability_only_yields_to_default_or_ability() {
        let default = EntityState::Player(PlayerState::Idle);
        let cancel = AbilityCancel::IntoDefaultOrAbility;

        assert!(cancel.allows(&default, &default));
        assert!(cancel.allows(
            &EntityState::Player(PlayerState::ability("leap", 1.0, AbilityCancel::Always)),
            &default
        ));
        assert!(!cancel.allows(&EntityState::Player(PlayerState::Walk), &default));
        assert!(!cancel.allows(&EntityState::staggered(), &default));
    }

    #[test]
    fn death_interrupts_any_ability() {
        let mut machine = StateMachine::new(
            EntityState::Player(PlayerState::ability(
                "shield",
                2.0,
                AbilityCancel::IntoDefaultOrAbility,
            )),
            EntityState::Player(PlayerState::Idle),
        );

        assert!(!machine.change_state(EntityState::staggered(), false));
        assert!(machine.change_state(EntityState::death(), false));
    }

    #[test]
    fn dash_speed_eases_to_max() {
        assert!((dash_speed(0.0, 5.0) - DASH_INITIAL_VELOCITY).abs() < 1e-4);
        assert!((dash_speed(DASH_DURATION, 5.0) - 5.0).abs() < 1e-4);
        assert!(dash_speed(DASH_DURATION * 0.5, 5.0) < DASH_INITIAL_VELOCITY);
    }

    #[test]
    fn jump_velocity_reaches_height() {
        let v = jump_velocity(JUMP_HEIGHT, 15.0);
        // v^2 / 2g
        assert!((v * v / 30.0 - JUMP_HEIGHT).abs() < 1e-4);
    }
}
