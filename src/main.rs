//! Riftlands - Entry Point
//!
//! Controls:
//! - WASD: Move
//! - Mouse: Look around
//! - Left/Right click: Attack, hold to charge
//! - Space: Jump
//! - Shift: Dash
//! - Escape: Pause/Unpause
//!
//! Between events:
//! - 1-9: Pick an aspect or an event
//! - Arrow keys: Choose a land, empower or weaken it
//! - R: Undo land changes (or restart after a game over)
//! - Enter: Confirm

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

fn main() {
    App::new()
        // Bevy default plugins
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Riftlands".to_string(),
                resolution: (1280.0, 720.0).into(),
                ..default()
            }),
            ..default()
        }))

        // Physics
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())

        // Our game plugin
        .add_plugins(riftlands::RiftlandsPlugin)

        .run();
}
