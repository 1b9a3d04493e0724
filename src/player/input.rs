//! Keyboard and mouse input turned into movement intent, state changes and
//! combo tokens.

use bevy::prelude::*;

use super::components::*;
use super::state::{jump_velocity, PlayerState, JUMP_HEIGHT};
use crate::combat::{ComboAction, ComboInputEvent, ComboTracker};
use crate::entities::{EntityState, Motion, StateLabel, StateMachine};

/// States that lock out every voluntary action.
fn is_incapacitated(label: StateLabel) -> bool {
    matches!(
        label,
        StateLabel::Spawn
            | StateLabel::Death
            | StateLabel::Staggered
            | StateLabel::Stunned
            | StateLabel::Launch
    )
}

pub fn can_jump(machine: &StateMachine, grounded: bool) -> bool {
    let label = machine.label();
    grounded
        && !is_incapacitated(label)
        && !matches!(label, StateLabel::Slide | StateLabel::Charge | StateLabel::Attack)
}

pub fn can_dash(machine: &StateMachine, controls: &PlayerControls) -> bool {
    let label = machine.label();
    controls.dash_ready()
        && !is_incapacitated(label)
        && !matches!(label, StateLabel::Charge | StateLabel::Dash)
}

pub fn can_charge(machine: &StateMachine) -> bool {
    let label = machine.label();
    !is_incapacitated(label)
        && !matches!(
            label,
            StateLabel::Dash | StateLabel::Slide | StateLabel::Charge | StateLabel::Ability
        )
}

/// Light attacks wait for the current attack's combo window.
pub fn can_basic_attack(machine: &StateMachine, tracker: &ComboTracker) -> bool {
    let label = machine.label();
    if is_incapacitated(label) || label == StateLabel::Charge {
        return false;
    }
    label != StateLabel::Attack || tracker.can_combo
}

/// Charged attacks only come out of a held charge.
pub fn can_charged_attack(machine: &StateMachine) -> bool {
    machine.is_in(StateLabel::Charge)
}

/// Try to perform a buffered action. Jumps and dashes change state here,
/// attacks are left to combo resolution.
fn perform_buffered(
    action: ComboAction,
    controls: &mut PlayerControls,
    machine: &mut StateMachine,
    motion: &mut Motion,
    tracker: &ComboTracker,
) -> bool {
    match action {
        ComboAction::Jump => {
            if !can_jump(machine, motion.grounded)
                || !machine.change_state(EntityState::Player(PlayerState::Jump), false)
            {
                return false;
            }
            motion.velocity.y = jump_velocity(JUMP_HEIGHT, motion.gravity);
            motion.grounded = false;
            true
        }
        ComboAction::Dash => {
            if !can_dash(machine, controls)
                || !machine.change_state(EntityState::Player(PlayerState::Dash { elapsed: 0.0 }), false)
            {
                return false;
            }
            controls.dash_timer = 0.0;
            true
        }
        ComboAction::Attack1 | ComboAction::Attack2 => can_basic_attack(machine, tracker),
        ComboAction::ChargedAttack1 | ComboAction::ChargedAttack2 => can_charged_attack(machine),
    }
}

/// Camera-relative WASD direction, flattened onto the ground.
fn movement_direction(keyboard: &ButtonInput<KeyCode>, transform: &Transform) -> Vec3 {
    let mut direction = Vec3::ZERO;
    if keyboard.pressed(KeyCode::KeyW) {
        direction.z -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyS) {
        direction.z += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyA) {
        direction.x -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyD) {
        direction.x += 1.0;
    }

    let yaw = transform.rotation.to_euler(EulerRot::YXZ).0;
    (Quat::from_rotation_y(yaw) * direction).normalize_or_zero()
}

/// Read the player's input for this frame. Presses are buffered and the
/// oldest one is performed as soon as the player is free to do it.
pub fn read_player_input(
    time: Res<Time>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    config: Res<PlayerConfig>,
    mut players: Query<
        (
            Entity,
            &Transform,
            &mut PlayerControls,
            &mut StateMachine,
            &mut Motion,
            &ComboTracker,
        ),
        With<Player>,
    >,
    mut combo_inputs: EventWriter<ComboInputEvent>,
) {
    let delta = time.delta_secs();
    let now = time.elapsed_secs();

    for (entity, transform, mut controls, mut machine, mut motion, tracker) in players.iter_mut() {
        controls.move_direction = movement_direction(&keyboard, transform);
        controls.dash_timer += delta;

        if keyboard.just_pressed(KeyCode::Space) {
            controls.buffer.push(ComboAction::Jump, now);
        }
        if keyboard.just_pressed(KeyCode::ShiftLeft) {
            controls.buffer.push(ComboAction::Dash, now);
        }

        let buttons = [
            (MouseButton::Left, ComboAction::Attack1, ComboAction::ChargedAttack1),
            (MouseButton::Right, ComboAction::Attack2, ComboAction::ChargedAttack2),
        ];
        for (index, (button, tap, charged)) in buttons.into_iter().enumerate() {
            let state = if index == 0 {
                &mut controls.attack1
            } else {
                &mut controls.attack2
            };
            let outcome = state.update(
                mouse.pressed(button),
                mouse.just_released(button),
                delta,
                config.charge_threshold,
            );

            let action = match outcome {
                ButtonOutcome::None => None,
                ButtonOutcome::StartCharge => {
                    if can_charge(&machine) {
                        machine.change_state(EntityState::Player(PlayerState::Charge { elapsed: 0.0 }), false);
                    }
                    None
                }
                ButtonOutcome::Tap => Some(tap),
                ButtonOutcome::ChargedRelease if machine.is_in(StateLabel::Charge) => Some(charged),
                ButtonOutcome::ChargedRelease => Some(tap),
            };
            if let Some(action) = action {
                controls.buffer.push(action, now);
            }
        }

        if machine.is_in(StateLabel::Death) {
            controls.buffer.clear();
            continue;
        }

        let Some(action) = controls.buffer.front(now, config.input_buffer_duration) else {
            continue;
        };
        if perform_buffered(action, &mut controls, &mut machine, &mut motion, tracker) {
            controls.buffer.pop();
            combo_inputs.send(ComboInputEvent { entity, action });
        }
    }
}
