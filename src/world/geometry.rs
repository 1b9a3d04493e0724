//! Land floors and scene lighting.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use super::land::{LandGrid, MAX_LAND_LEVEL, MIN_LAND_LEVEL};

/// Thickness of a land's floor slab.
const FLOOR_DEPTH: f32 = 1.0;
/// Gap left between neighbouring floors so borders stay readable.
const FLOOR_MARGIN: f32 = 0.2;

/// Marks everything the world spawned for the run's scenery.
#[derive(Component)]
pub struct WorldGeometry;

/// The floor of one land.
#[derive(Component, Debug, Clone, Copy)]
pub struct LandFloor {
    pub grid_position: IVec2,
}

/// Floor colour for a land level, cold when weak and hot when strong.
pub fn level_color(level: i32) -> Color {
    let span = (MAX_LAND_LEVEL - MIN_LAND_LEVEL) as f32;
    let t = ((level - MIN_LAND_LEVEL) as f32 / span).clamp(0.0, 1.0);
    Color::srgb(0.25 + 0.5 * t, 0.3, 0.55 - 0.4 * t)
}

/// Spawn the floor slab of the land at `grid_position`. The top surface sits
/// at y = 0.
pub fn spawn_land_floor(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    grid: &LandGrid,
    grid_position: IVec2,
) -> Entity {
    let size = grid.land_scale - FLOOR_MARGIN;
    let level = grid.land(grid_position).map_or(1, |land| land.level);
    let center = grid.world_position(grid_position);

    commands
        .spawn((
            Mesh3d(meshes.add(Cuboid::new(size, FLOOR_DEPTH, size))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: level_color(level),
                perceptual_roughness: 0.9,
                ..default()
            })),
            Transform::from_xyz(center.x, -FLOOR_DEPTH / 2.0, center.z),
            Collider::cuboid(size / 2.0, FLOOR_DEPTH / 2.0, size / 2.0),
            LandFloor { grid_position },
            WorldGeometry,
        ))
        .id()
}

/// Ambient and directional light for the run.
pub fn spawn_lighting(commands: &mut Commands) {
    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.6, 0.6, 0.7),
        brightness: 300.0,
    });

    commands.spawn((
        DirectionalLight {
            color: Color::srgb(0.9, 0.88, 0.85),
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::XYZ,
            -std::f32::consts::FRAC_PI_3,
            std::f32::consts::FRAC_PI_6,
            0.0,
        )),
        WorldGeometry,
    ));
}

/// Recolour floors after land levels change.
pub fn tint_land_floors(
    grid: Res<LandGrid>,
    floors: Query<(&LandFloor, &MeshMaterial3d<StandardMaterial>)>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if !grid.is_changed() {
        return;
    }
    for (floor, material) in floors.iter() {
        let Some(land) = grid.land(floor.grid_position) else {
            continue;
        };
        if let Some(material) = materials.get_mut(&material.0) {
            material.base_color = level_color(land.level);
        }
    }
}
