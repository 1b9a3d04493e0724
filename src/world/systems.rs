//! Run setup, spawner ticking and world event systems.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use rand::Rng;

use super::data::WorldConfig;
use super::events::{EventContext, EventStatus, ObjectiveSpawn, WorldEventKind};
use super::geometry::{spawn_land_floor, spawn_lighting, WorldGeometry};
use super::land::LandGrid;
use super::manager::EventManager;
use super::progression::Progression;
use super::spawner::{EnemySpawner, SpawnerNotice};
use crate::combat::{ComboRegistry, WeaponRegistry, STARTER_WEAPON};
use crate::core::{DeathEvent, GameState, PlayState};
use crate::enemies::{spawn_enemy, EnemyRegistry, SpawnedBy};
use crate::entities::{actor_bundle, Dead, EntityState, EntityStats, PLAYER_TEAM};
use crate::player::{spawn_player, Player, PlayerConfig};
use crate::status_effects::{ApplyStatusEffectEvent, StatusEffect};

/// Where the player appears: the middle of the starting 2x2 block.
pub const PLAYER_START: Vec3 = Vec3::new(15.0, 2.0, 15.0);

/// Something the current world event needs kept alive.
#[derive(Component)]
pub struct EventObjective;

/// Walks an escort objective towards its destination.
#[derive(Component, Debug, Clone, Copy)]
pub struct EscortPath {
    pub destination: Vec3,
    pub speed: f32,
}

/// Start `kind` and return the phase the run should be in afterwards.
/// Events that clear on start skip straight to aspect selection.
pub fn begin_event(
    commands: &mut Commands,
    kind: WorldEventKind,
    manager: &mut EventManager,
    grid: &mut LandGrid,
    config: &WorldConfig,
    players: &[Vec3],
) -> PlayState {
    let mut rng = rand::thread_rng();
    let mut ctx = EventContext {
        grid: &mut *grid,
        config,
        players,
        objective: None,
        rng: &mut rng,
    };

    match manager.change_event(kind, &mut ctx) {
        EventStatus::Cleared => {
            despawn_all(commands, manager.clear_event(grid));
            PlayState::AspectSelection
        }
        EventStatus::Running | EventStatus::Failed => PlayState::Playing,
    }
}

pub(super) fn despawn_all(commands: &mut Commands, entities: Vec<Entity>) {
    for entity in entities {
        if let Some(entity) = commands.get_entity(entity) {
            entity.despawn_recursive();
        }
    }
}

/// Build the starting lands, the player and the tutorial. Resuming from
/// pause re-enters the run, so this only builds once.
#[allow(clippy::too_many_arguments)]
pub fn setup_run(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut grid: ResMut<LandGrid>,
    mut manager: ResMut<EventManager>,
    config: Res<WorldConfig>,
    enemies: Res<EnemyRegistry>,
    weapons: Res<WeaponRegistry>,
    combos: Res<ComboRegistry>,
    player_config: Res<PlayerConfig>,
    mut next_phase: ResMut<NextState<PlayState>>,
) {
    if !grid.is_empty() {
        return;
    }

    let pool = enemies.pool();
    grid.spawn_starting_lands(|| EnemySpawner::new(config.spawner.clone(), pool.clone()));
    for position in grid.positions() {
        spawn_land_floor(&mut commands, &mut meshes, &mut materials, &grid, position);
    }
    spawn_lighting(&mut commands);
    info!("Built {} starting lands", grid.len());

    let Some(weapon) = weapons.build(STARTER_WEAPON, &combos) else {
        error!("Starter weapon '{}' is missing, can't spawn the player", STARTER_WEAPON);
        return;
    };
    spawn_player(&mut commands, PLAYER_START, weapon, &player_config);

    let phase = begin_event(
        &mut commands,
        WorldEventKind::Tutorial,
        &mut manager,
        &mut grid,
        &config,
        &[PLAYER_START],
    );
    next_phase.set(phase);
}

/// Spawn the objective entity for `spawn`.
pub fn spawn_objective(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    spawn: &ObjectiveSpawn,
) -> Entity {
    let stats = EntityStats::default().with_max_health(spawn.max_health);
    let mut objective = commands.spawn((
        EventObjective,
        actor_bundle(stats, PLAYER_TEAM, EntityState::Empty, EntityState::Empty),
        Mesh3d(meshes.add(Capsule3d::new(0.6, 1.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.9, 0.8, 0.3),
            ..default()
        })),
        Transform::from_translation(spawn.position),
        RigidBody::KinematicPositionBased,
        Collider::capsule_y(0.5, 0.6),
    ));
    if let Some(destination) = spawn.destination {
        objective.insert(EscortPath {
            destination,
            speed: spawn.speed,
        });
    }
    objective.id()
}

/// Turn due spawner requests into enemies around each land's centre.
pub fn tick_spawners(
    mut commands: Commands,
    time: Res<Time>,
    mut grid: ResMut<LandGrid>,
    registry: Res<EnemyRegistry>,
    mut effects: EventWriter<ApplyStatusEffectEvent>,
) {
    let mut rng = rand::thread_rng();
    let delta = time.delta_secs();

    for position in grid.positions() {
        let center = grid.world_position(position);
        let Some(land) = grid.land_mut(position) else {
            continue;
        };
        let radius = land.spawner.config().spawn_radius;

        for request in land.spawner.tick(delta, &mut rng) {
            let Some(definition) = registry.get(&request.enemy_type) else {
                warn!("Spawner asked for unknown enemy '{}'", request.enemy_type);
                continue;
            };

            let offset = random_offset(radius, &mut rng);
            let spawn_at = center + Vec3::new(offset.x, 1.0, offset.y);
            let enemy = spawn_enemy(
                &mut commands,
                &request.enemy_type,
                definition,
                spawn_at,
                Some(position),
            );
            land.spawner.register_spawned(enemy);

            if request.elite {
                effects.send(ApplyStatusEffectEvent::new(
                    enemy,
                    StatusEffect::elite_brute(),
                    None,
                ));
            }
            debug!(
                "Land {:?} spawned {} (elite: {})",
                position, request.enemy_type, request.elite
            );
        }
    }
}

fn random_offset(radius: f32, rng: &mut impl Rng) -> Vec2 {
    if radius <= 0.0 {
        return Vec2::ZERO;
    }
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let distance = radius * rng.gen::<f32>().sqrt();
    Vec2::new(angle.cos(), angle.sin()) * distance
}

/// Dead enemies report back to the spawner that made them.
pub fn return_enemies_to_spawners(
    mut deaths: EventReader<DeathEvent>,
    spawned: Query<&SpawnedBy>,
    mut grid: ResMut<LandGrid>,
) {
    for death in deaths.read() {
        let Ok(spawned_by) = spawned.get(death.entity) else {
            continue;
        };
        let Some(land) = grid.land_mut(spawned_by.land) else {
            continue;
        };
        if let Some(SpawnerNotice::Depleted) = land.spawner.remove_enemy(death.entity) {
            debug!("Spawner on land {:?} depleted", spawned_by.land);
        }
    }
}

/// Drive the current world event and move the run on when it ends.
#[allow(clippy::too_many_arguments)]
pub fn update_world_event(
    mut commands: Commands,
    time: Res<Time>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut grid: ResMut<LandGrid>,
    mut manager: ResMut<EventManager>,
    config: Res<WorldConfig>,
    players: Query<&Transform, (With<Player>, Without<Dead>)>,
    objectives: Query<&Transform, With<EventObjective>>,
    mut next_phase: ResMut<NextState<PlayState>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Some(event) = manager.current_mut() else {
        return;
    };
    if let Some(spawn) = event.objective_spawn() {
        let objective = spawn_objective(&mut commands, &mut meshes, &mut materials, &spawn);
        event.set_objective(objective);
        info!("Spawned {} objective at {}", event.kind().name(), spawn.position);
    }
    let objective = event
        .objective()
        .and_then(|entity| objectives.get(entity).ok())
        .map(|transform| transform.translation);

    let player_positions: Vec<Vec3> = players.iter().map(|t| t.translation).collect();
    let mut rng = rand::thread_rng();
    let mut ctx = EventContext {
        grid: &mut grid,
        config: &config,
        players: &player_positions,
        objective,
        rng: &mut rng,
    };

    match manager.update(time.delta_secs(), &mut ctx) {
        EventStatus::Running => {}
        EventStatus::Cleared => {
            despawn_all(&mut commands, manager.clear_event(&mut grid));
            next_phase.set(PlayState::AspectSelection);
        }
        EventStatus::Failed => {
            manager.fail_event(&mut grid);
            next_state.set(GameState::GameOver);
        }
    }
}

/// Losing the objective fails the event and ends the run.
pub fn fail_event_on_objective_death(
    mut deaths: EventReader<DeathEvent>,
    objectives: Query<(), With<EventObjective>>,
    mut manager: ResMut<EventManager>,
    mut grid: ResMut<LandGrid>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    for death in deaths.read() {
        if objectives.contains(death.entity) {
            manager.fail_event(&mut grid);
            next_state.set(GameState::GameOver);
        }
    }
}

/// Walk escorts straight towards their destination.
pub fn move_escorts(
    time: Res<Time>,
    mut escorts: Query<(&mut Transform, &EscortPath, &EntityStats), Without<Dead>>,
) {
    for (mut transform, path, stats) in escorts.iter_mut() {
        let step = path.speed * stats.local_delta(time.delta_secs());
        transform.translation = step_towards(transform.translation, path.destination, step);
    }
}

/// Move horizontally from `from` towards `to` by at most `step`.
pub fn step_towards(from: Vec3, to: Vec3, step: f32) -> Vec3 {
    let offset = Vec3::new(to.x - from.x, 0.0, to.z - from.z);
    let distance = offset.length();
    if distance <= step || distance < f32::EPSILON {
        return Vec3::new(to.x, from.y, to.z);
    }
    from + offset / distance * step
}

/// Start a fresh run from the game over screen.
pub fn restart_run(keyboard: Res<ButtonInput<KeyCode>>, mut next_state: ResMut<NextState<GameState>>) {
    if keyboard.just_pressed(KeyCode::KeyR) {
        info!("Restarting run");
        next_state.set(GameState::InGame);
    }
}

/// Remove the run's scenery and actors when it ends.
pub fn cleanup_run(
    mut commands: Commands,
    geometry: Query<Entity, With<WorldGeometry>>,
    actors: Query<Entity, Or<(With<Player>, With<SpawnedBy>, With<EventObjective>)>>,
    mut grid: ResMut<LandGrid>,
    mut manager: ResMut<EventManager>,
    mut progression: ResMut<Progression>,
) {
    for entity in geometry.iter().chain(actors.iter()) {
        commands.entity(entity).despawn_recursive();
    }
    *grid = LandGrid::default();
    *manager = EventManager::default();
    *progression = Progression::default();
    info!("Run cleaned up");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::spawner::SpawnerConfig;

    #[test]
    fn escorts_step_without_overshooting() {
        let from = Vec3::new(0.0, 1.0, 0.0);
        let to = Vec3::new(10.0, 1.0, 0.0);
        assert_eq!(step_towards(from, to, 2.0), Vec3::new(2.0, 1.0, 0.0));
        assert_eq!(step_towards(Vec3::new(9.5, 1.0, 0.0), to, 2.0), to);
        // Height is kept
        assert_eq!(
            step_towards(Vec3::new(0.0, 3.0, 0.0), to, 1.0),
            Vec3::new(1.0, 3.0, 0.0)
        );
    }

    #[test]
    fn random_offsets_stay_inside_radius() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            assert!(random_offset(5.0, &mut rng).length() <= 5.0 + 1e-4);
        }
        assert_eq!(random_offset(0.0, &mut rng), Vec2::ZERO);
    }

    #[test]
    fn deaths_return_enemies_to_their_spawner() {
        let mut app = App::new();
        app.add_event::<DeathEvent>()
            .add_systems(Update, return_enemies_to_spawners);

        let mut grid = LandGrid::default();
        grid.spawn_starting_lands(|| {
            EnemySpawner::new(SpawnerConfig::default(), vec![("grunt".to_string(), 1)])
        });
        let enemy = app.world_mut().spawn(SpawnedBy { land: IVec2::X }).id();
        grid.land_mut(IVec2::X).unwrap().spawner.register_spawned(enemy);
        app.insert_resource(grid);

        app.world_mut().send_event(DeathEvent {
            entity: enemy,
            killed_by: None,
        });
        app.update();

        let grid = app.world().resource::<LandGrid>();
        let spawner = &grid.land(IVec2::X).unwrap().spawner;
        assert!(spawner.spawned().is_empty());
        assert!(spawner.is_depleted());
    }

    #[test]
    fn objective_death_fails_the_run() {
        let mut app = App::new();
        app.add_plugins(bevy::state::app::StatesPlugin)
            .init_state::<GameState>()
            .add_event::<DeathEvent>()
            .init_resource::<EventManager>()
            .init_resource::<LandGrid>()
            .add_systems(Update, fail_event_on_objective_death);

        let objective = app.world_mut().spawn(EventObjective).id();
        app.world_mut().send_event(DeathEvent {
            entity: objective,
            killed_by: None,
        });
        app.update();
        app.update();

        assert_eq!(
            *app.world().resource::<State<GameState>>().get(),
            GameState::GameOver
        );
    }
}
