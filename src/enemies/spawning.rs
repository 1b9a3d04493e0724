//! Enemy spawning from registry definitions.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use super::charger::ChargerState;
use super::components::{Detection, Enemy, EnemyType, SpawnedBy, Target};
use super::data::{EnemyDefinition, EnemyKind};
use super::grunt::GruntState;
use super::leaper::LeaperState;
use crate::entities::{
    actor_bundle, EntityState, SuperArmor, ENEMY_TEAM, TARGET_DETECTION_RADIUS,
};

/// Default behaviour state for an enemy kind.
pub fn default_state(kind: EnemyKind) -> EntityState {
    match kind {
        EnemyKind::Basic => EntityState::Grunt(GruntState::Idle),
        EnemyKind::Leaper => EntityState::Leaper(LeaperState::wander()),
        EnemyKind::Charger => EntityState::Charger(ChargerState::wander()),
    }
}

/// Spawn an enemy of `enemy_type` at `position`, owned by the spawner of `land`.
/// Enemies start in their spawn state.
pub fn spawn_enemy(
    commands: &mut Commands,
    enemy_type: &str,
    definition: &EnemyDefinition,
    position: Vec3,
    land: Option<IVec2>,
) -> Entity {
    let collider = &definition.collider;
    let mut enemy = commands.spawn((
        Enemy {
            cost: definition.cost,
            exp_value: definition.exp_value,
        },
        EnemyType(enemy_type.to_string()),
        Target::default(),
        actor_bundle(
            definition.to_stats(),
            ENEMY_TEAM,
            EntityState::spawn(),
            default_state(definition.kind),
        ),
        Transform::from_translation(position).with_scale(Vec3::splat(definition.scale)),
        Visibility::default(),
        (
            RigidBody::KinematicPositionBased,
            Collider::capsule_y(collider.half_height, collider.radius),
            KinematicCharacterController {
                offset: CharacterLength::Absolute(0.01),
                snap_to_ground: Some(CharacterLength::Absolute(0.3)),
                ..default()
            },
        ),
    ));

    match definition.kind {
        EnemyKind::Basic => {
            enemy.insert((
                definition.grunt.clone(),
                Detection::Radius(TARGET_DETECTION_RADIUS),
            ));
        }
        EnemyKind::Leaper => {
            let config = definition.leaper.clone();
            enemy.insert((
                Detection::Cone {
                    distance: config.detection_distance,
                    half_angle: config.detection_half_angle,
                    close_radius: config.ready_attack_distance * 1.5,
                },
                config,
            ));
        }
        EnemyKind::Charger => {
            let config = definition.charger.clone();
            enemy.insert((
                Detection::Cone {
                    distance: config.detection_distance,
                    half_angle: config.detection_half_angle,
                    close_radius: 0.0,
                },
                SuperArmor {
                    states: ChargerState::ARMORED.to_vec(),
                    stagger_threshold: config.stagger_damage_threshold,
                    damage_multiplier: config.armored_damage_multiplier,
                },
                config,
            ));
        }
    }
    if let Some(land) = land {
        enemy.insert(SpawnedBy { land });
    }

    enemy.id()
}
