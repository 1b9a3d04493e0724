//! Player-related components.

use bevy::prelude::*;
use std::collections::VecDeque;

use super::state::{CHARGE_THRESHOLD, DASH_COOLDOWN};
use crate::combat::ComboAction;

/// How long a pressed action waits to become performable.
pub const INPUT_BUFFER_DURATION: f32 = 0.3;

/// Marker component for the player entity.
#[derive(Component)]
pub struct Player;

/// Per-frame input state that outlives a single key press.
#[derive(Component, Debug, Clone)]
pub struct PlayerControls {
    /// World-space horizontal direction the player wants to move in
    pub move_direction: Vec3,
    pub attack1: AttackButton,
    pub attack2: AttackButton,
    /// Time since the last dash started
    pub dash_timer: f32,
    pub buffer: InputBuffer,
}

impl Default for PlayerControls {
    fn default() -> Self {
        Self {
            move_direction: Vec3::ZERO,
            attack1: AttackButton::default(),
            attack2: AttackButton::default(),
            dash_timer: DASH_COOLDOWN,
            buffer: InputBuffer::default(),
        }
    }
}

impl PlayerControls {
    pub fn dash_ready(&self) -> bool {
        self.dash_timer >= DASH_COOLDOWN
    }
}

/// Pressed actions waiting to be performed, oldest first. Each entry keeps
/// the time it was pressed at.
#[derive(Debug, Clone, Default)]
pub struct InputBuffer {
    queue: VecDeque<(ComboAction, f32)>,
}

impl InputBuffer {
    pub fn push(&mut self, action: ComboAction, now: f32) {
        self.queue.push_back((action, now));
    }

    /// The oldest action still inside `duration`. Older ones are dropped.
    pub fn front(&mut self, now: f32, duration: f32) -> Option<ComboAction> {
        while let Some((action, pressed_at)) = self.queue.front().copied() {
            if now - pressed_at > duration {
                self.queue.pop_front();
                continue;
            }
            return Some(action);
        }
        None
    }

    pub fn pop(&mut self) -> Option<ComboAction> {
        self.queue.pop_front().map(|(action, _)| action)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

/// What an attack button did this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonOutcome {
    None,
    /// Held past the charge threshold
    StartCharge,
    /// Released before the threshold
    Tap,
    /// Released after charging
    ChargedRelease,
}

/// Hold timer for one attack button.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttackButton {
    held: f32,
    charging: bool,
}

impl AttackButton {
    pub fn update(&mut self, pressed: bool, released: bool, delta: f32, threshold: f32) -> ButtonOutcome {
        if released {
            let outcome = if self.held < threshold {
                ButtonOutcome::Tap
            } else {
                ButtonOutcome::ChargedRelease
            };
            *self = Self::default();
            return outcome;
        }

        if pressed {
            self.held += delta;
            if self.held > threshold && !self.charging {
                self.charging = true;
                return ButtonOutcome::StartCharge;
            }
        }
        ButtonOutcome::None
    }
}

/// Marker component for the player's camera.
#[derive(Component, Default)]
pub struct PlayerCamera {
    /// Current pitch angle in radians (looking up/down)
    pub pitch: f32,
}

/// Tuning for the player character and its controls.
#[derive(Resource, Debug, Clone)]
pub struct PlayerConfig {
    /// Mouse sensitivity multiplier
    pub mouse_sensitivity: f32,
    /// Invert Y-axis for mouse look
    pub invert_y: bool,
    /// Base movement speed in units per second
    pub base_speed: f32,
    pub max_health: f32,
    pub damage_range: (i32, i32),
    /// Hold time before an attack button starts charging
    pub charge_threshold: f32,
    /// Ground steeper than this (degrees) can't be stood on
    pub slide_angle: f32,
    pub slide_speed: f32,
    pub input_buffer_duration: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            mouse_sensitivity: 1.5,
            invert_y: false,
            base_speed: 7.0,
            max_health: 100.0,
            damage_range: (10, 15),
            charge_threshold: CHARGE_THRESHOLD,
            slide_angle: 50.0,
            slide_speed: 10.0,
            input_buffer_duration: INPUT_BUFFER_DURATION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_release_is_a_tap() {
        let mut button = AttackButton::default();
        assert_eq!(button.update(true, false, 0.1, 0.25), ButtonOutcome::None);
        assert_eq!(button.update(false, true, 0.0, 0.25), ButtonOutcome::Tap);
    }

    #[test]
    fn buffered_actions_wait_then_expire() {
        let mut buffer = InputBuffer::default();
        buffer.push(ComboAction::Attack1, 0.0);
        buffer.push(ComboAction::Jump, 0.2);

        assert_eq!(buffer.front(0.25, 0.3), Some(ComboAction::Attack1));
        assert_eq!(buffer.len(), 2);

        // The attack is stale, the jump is not
        assert_eq!(buffer.front(0.4, 0.3), Some(ComboAction::Jump));
        assert_eq!(buffer.pop(), Some(ComboAction::Jump));
        assert!(buffer.front(0.4, 0.3).is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn holding_charges_once_then_releases_charged() {
        let mut button = AttackButton::default();
        button.update(true, false, 0.2, 0.25);
        assert_eq!(button.update(true, false, 0.1, 0.25), ButtonOutcome::StartCharge);
        assert_eq!(button.update(true, false, 0.1, 0.25), ButtonOutcome::None);
        assert_eq!(button.update(false, true, 0.0, 0.25), ButtonOutcome::ChargedRelease);
    }
}
