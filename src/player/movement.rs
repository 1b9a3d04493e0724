//! First-person camera, locomotion states and player spawning.

use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use bevy::window::{CursorGrabMode, PrimaryWindow};
use bevy_rapier3d::prelude::*;

use super::components::*;
use super::state::{dash_speed, PlayerState, DASH_DURATION};
use crate::aspects::{AspectsManager, LevelSystem};
use crate::combat::{ComboTracker, Weapon};
use crate::entities::{actor_bundle, EntityState, EntityStats, Motion, StateMachine, PLAYER_TEAM};

/// Grab and hide cursor when entering gameplay.
pub fn grab_cursor(mut window_query: Query<&mut Window, With<PrimaryWindow>>) {
    if let Ok(mut window) = window_query.get_single_mut() {
        window.cursor_options.grab_mode = CursorGrabMode::Locked;
        window.cursor_options.visible = false;
    }
}

/// Release cursor when leaving gameplay.
pub fn release_cursor(mut window_query: Query<&mut Window, With<PrimaryWindow>>) {
    if let Ok(mut window) = window_query.get_single_mut() {
        window.cursor_options.grab_mode = CursorGrabMode::None;
        window.cursor_options.visible = true;
    }
}

/// Yaw the player body and pitch the child camera.
pub fn mouse_look(
    mut mouse_motion: EventReader<MouseMotion>,
    config: Res<PlayerConfig>,
    mut player_query: Query<&mut Transform, With<Player>>,
    mut camera_query: Query<(&mut Transform, &mut PlayerCamera), Without<Player>>,
) {
    let delta: Vec2 = mouse_motion.read().map(|event| event.delta).sum();
    if delta == Vec2::ZERO {
        return;
    }

    let Ok(mut player_transform) = player_query.get_single_mut() else {
        return;
    };
    let Ok((mut camera_transform, mut camera)) = camera_query.get_single_mut() else {
        return;
    };

    let sensitivity = config.mouse_sensitivity * 0.001;
    let y_invert = if config.invert_y { -1.0 } else { 1.0 };

    player_transform.rotate_y(-delta.x * sensitivity);

    // About 80 degrees either way
    camera.pitch = (camera.pitch - delta.y * sensitivity * y_invert).clamp(-1.4, 1.4);
    camera_transform.rotation = Quat::from_rotation_x(camera.pitch);
}

/// What the locomotion step needs to know about the player this frame.
#[derive(Debug, Clone, Copy)]
pub struct LocomotionView {
    pub move_direction: Vec3,
    pub facing: Vec3,
    pub grounded: bool,
    pub vertical_velocity: f32,
    pub speed: f32,
    /// Ground normal, when standing on a slope too steep to hold
    pub steep_ground: Option<Vec3>,
}

/// Velocity changes and the state to switch to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocomotionStep {
    pub horizontal: Option<Vec3>,
    pub vertical: Option<f32>,
    pub next: Option<PlayerState>,
}

/// Horizontal direction a body slides down a surface with this normal.
pub fn downhill(normal: Vec3) -> Vec3 {
    let along = Vec3::NEG_Y - normal * normal.dot(Vec3::NEG_Y);
    Vec3::new(along.x, 0.0, along.z).normalize_or_zero()
}

fn grounded_state(view: &LocomotionView) -> PlayerState {
    if view.move_direction == Vec3::ZERO {
        PlayerState::Idle
    } else {
        PlayerState::Walk
    }
}

/// Advance one locomotion state by `delta` seconds of local time.
pub fn step_locomotion(
    state: &mut PlayerState,
    view: &LocomotionView,
    delta: f32,
    slide_speed: f32,
) -> LocomotionStep {
    let walking = Some(view.move_direction * view.speed);
    let falling = !view.grounded && view.vertical_velocity < 0.0;

    match state {
        PlayerState::Idle | PlayerState::Walk => {
            let next = if view.steep_ground.is_some() {
                Some(PlayerState::Slide { elapsed: 0.0 })
            } else if falling {
                Some(PlayerState::Fall)
            } else {
                Some(grounded_state(view)).filter(|next| *next != *state)
            };
            LocomotionStep {
                horizontal: walking,
                next,
                ..default()
            }
        }
        PlayerState::Jump => LocomotionStep {
            horizontal: walking,
            next: (view.vertical_velocity < 0.0).then_some(PlayerState::Fall),
            ..default()
        },
        PlayerState::Fall => LocomotionStep {
            horizontal: walking,
            next: view.grounded.then(|| grounded_state(view)),
            ..default()
        },
        PlayerState::Dash { elapsed } => {
            *elapsed += delta;
            let direction = if view.move_direction == Vec3::ZERO {
                Vec3::new(view.facing.x, 0.0, view.facing.z).normalize_or_zero()
            } else {
                view.move_direction
            };
            let next = (*elapsed >= DASH_DURATION).then(|| {
                if view.grounded {
                    PlayerState::Walk
                } else {
                    PlayerState::Fall
                }
            });
            LocomotionStep {
                horizontal: Some(direction * dash_speed(*elapsed, view.speed)),
                vertical: Some(0.0),
                next,
            }
        }
        PlayerState::Slide { elapsed } => {
            *elapsed += delta;
            match view.steep_ground {
                Some(normal) => LocomotionStep {
                    horizontal: Some(downhill(normal) * slide_speed),
                    ..default()
                },
                None => LocomotionStep {
                    horizontal: Some(Vec3::ZERO),
                    next: Some(if falling {
                        PlayerState::Fall
                    } else {
                        grounded_state(view)
                    }),
                    ..default()
                },
            }
        }
        PlayerState::Charge { elapsed } => {
            *elapsed += delta;
            LocomotionStep {
                horizontal: Some(Vec3::ZERO),
                ..default()
            }
        }
        // Attacks are driven by the combat systems
        PlayerState::Attack { .. } => LocomotionStep::default(),
        PlayerState::Ability {
            elapsed, duration, ..
        } => {
            *elapsed += delta;
            LocomotionStep {
                next: (*elapsed >= *duration).then(|| grounded_state(view)),
                ..default()
            }
        }
    }
}

/// Ground normal under the player when it is steeper than `max_angle` degrees.
fn steep_ground(
    context: &RapierContext,
    entity: Entity,
    position: Vec3,
    max_angle: f32,
) -> Option<Vec3> {
    // Capsule bottom sits 0.8 below the centre
    let (_, hit) = context.cast_ray_and_get_normal(
        position - Vec3::Y * 0.75,
        Vec3::NEG_Y,
        0.3,
        true,
        QueryFilter::default().exclude_collider(entity),
    )?;
    (hit.normal.angle_between(Vec3::Y).to_degrees() > max_angle).then_some(hit.normal)
}

/// Drive the player's movement states into its motion.
pub fn player_locomotion(
    time: Res<Time>,
    config: Res<PlayerConfig>,
    rapier_context: Query<&RapierContext>,
    mut players: Query<
        (
            Entity,
            &Transform,
            &PlayerControls,
            &EntityStats,
            &mut StateMachine,
            &mut Motion,
        ),
        With<Player>,
    >,
) {
    let context = rapier_context.get_single().ok();

    for (entity, transform, controls, stats, mut machine, mut motion) in &mut players {
        let delta = stats.local_delta(time.delta_secs());

        let steep = if motion.grounded {
            context.and_then(|context| {
                steep_ground(context, entity, transform.translation, config.slide_angle)
            })
        } else {
            None
        };
        let view = LocomotionView {
            move_direction: controls.move_direction,
            facing: transform.forward().as_vec3(),
            grounded: motion.grounded,
            vertical_velocity: motion.velocity.y,
            speed: stats.movement_speed(),
            steep_ground: steep,
        };

        let step = match machine.current_mut() {
            EntityState::Player(state) => step_locomotion(state, &view, delta, config.slide_speed),
            EntityState::Launch { .. } => continue,
            _ => LocomotionStep {
                horizontal: Some(Vec3::ZERO),
                ..default()
            },
        };

        if let Some(horizontal) = step.horizontal {
            motion.set_horizontal(horizontal);
        }
        if let Some(vertical) = step.vertical {
            motion.velocity.y = vertical;
        }
        if let Some(next) = step.next {
            machine.change_state(EntityState::Player(next), false);
        }
    }
}

/// Spawn the player entity with its camera.
pub fn spawn_player(
    commands: &mut Commands,
    position: Vec3,
    weapon: Weapon,
    config: &PlayerConfig,
) -> Entity {
    let stats = EntityStats::default()
        .with_max_health(config.max_health)
        .with_damage_range(config.damage_range.0, config.damage_range.1)
        .with_speed(config.base_speed);

    let player = commands
        .spawn((
            Player,
            PlayerControls::default(),
            weapon,
            ComboTracker::default(),
            AspectsManager::default(),
            LevelSystem::default(),
            actor_bundle(
                stats,
                PLAYER_TEAM,
                EntityState::Player(PlayerState::Idle),
                EntityState::Player(PlayerState::Idle),
            ),
            Transform::from_translation(position),
            Visibility::default(),
            RigidBody::KinematicPositionBased,
            Collider::capsule_y(0.5, 0.3),
            KinematicCharacterController {
                offset: CharacterLength::Absolute(0.01),
                autostep: Some(CharacterAutostep {
                    max_height: CharacterLength::Absolute(0.4),
                    min_width: CharacterLength::Absolute(0.3),
                    include_dynamic_bodies: false,
                }),
                max_slope_climb_angle: 45_f32.to_radians(),
                min_slope_slide_angle: 30_f32.to_radians(),
                snap_to_ground: Some(CharacterLength::Absolute(0.5)),
                ..default()
            },
        ))
        .id();

    // Eye level
    commands.entity(player).with_children(|parent| {
        parent.spawn((
            Camera3d::default(),
            PlayerCamera::default(),
            Transform::from_xyz(0.0, 0.4, 0.0),
        ));
    });

    info!("Spawned player at {:?}", position);
    player
}
