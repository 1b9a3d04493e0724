//! The between-event phases of a run: land placement, land empowerment and
//! event selection.
//!
//! Each phase is driven by request events, so anything (keyboard shortcuts
//! here, a menu later) can steer the run.

use bevy::prelude::*;

use super::data::WorldConfig;
use super::events::WorldEventKind;
use super::geometry::spawn_land_floor;
use super::land::{LandGrid, CARDINAL_BORDERS};
use super::manager::EventManager;
use super::progression::Progression;
use super::spawner::EnemySpawner;
use super::systems::begin_event;
use crate::aspects::{AspectChoiceEvent, AspectRegistry, AspectsManager};
use crate::core::PlayState;
use crate::enemies::EnemyRegistry;
use crate::entities::Dead;
use crate::player::Player;

/// Place the next land at a free border.
#[derive(Event, Debug, Clone, Copy)]
pub struct PlaceLandRequest {
    pub position: IVec2,
}

/// Spend or take back empowerment tokens.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmpowerLandRequest {
    Empower(IVec2),
    Weaken(IVec2),
    /// Undo every change made this phase
    Reset,
    /// Confirm the changes and move on to event selection
    Continue,
}

/// Start one of the offered events.
#[derive(Event, Debug, Clone, Copy)]
pub struct SelectWorldEvent {
    pub kind: WorldEventKind,
}

/// The land or border currently highlighted between events.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct LandCursor {
    pub position: Option<IVec2>,
}

const DIGIT_KEYS: [KeyCode; 9] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
    KeyCode::Digit9,
];

fn pressed_digit(keyboard: &ButtonInput<KeyCode>) -> Option<usize> {
    DIGIT_KEYS.iter().position(|key| keyboard.just_pressed(*key))
}

/// Left/right arrow as a step through a list.
fn cursor_step(keyboard: &ButtonInput<KeyCode>) -> i32 {
    let mut step = 0;
    if keyboard.just_pressed(KeyCode::ArrowRight) {
        step += 1;
    }
    if keyboard.just_pressed(KeyCode::ArrowLeft) {
        step -= 1;
    }
    step
}

/// Move `current` by `step` through `options`, wrapping at either end.
pub fn cycle_position(options: &[IVec2], current: Option<IVec2>, step: i32) -> Option<IVec2> {
    if options.is_empty() {
        return None;
    }
    let len = options.len() as i32;
    let index = current
        .and_then(|current| options.iter().position(|option| *option == current))
        .map_or(0, |index| (index as i32 + step).rem_euclid(len));
    Some(options[index as usize])
}

/// The option closest to `from`, ties going to the first.
pub fn nearest_position(options: &[IVec2], from: IVec2) -> Option<IVec2> {
    options
        .iter()
        .copied()
        .min_by_key(|option| (*option - from).abs().element_sum())
}

fn player_grid_position(
    grid: &LandGrid,
    players: &Query<&Transform, (With<Player>, Without<Dead>)>,
) -> IVec2 {
    players
        .iter()
        .next()
        .map_or(IVec2::ZERO, |transform| grid.grid_position(transform.translation))
}

/// Digits spend an aspect token on the matching choice.
pub fn aspect_selection_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    registry: Res<AspectRegistry>,
    owners: Query<(Entity, &AspectsManager), With<Player>>,
    mut choices: EventWriter<AspectChoiceEvent>,
) {
    let Some(index) = pressed_digit(&keyboard) else {
        return;
    };
    for (entity, manager) in owners.iter() {
        let available = manager.choices(&registry.trees);
        if let Some((aspect, node)) = available.get(index) {
            choices.send(AspectChoiceEvent {
                entity,
                aspect: aspect.clone(),
                node: *node,
            });
        }
    }
}

/// Point the cursor at the free border nearest the player.
pub fn enter_land_placement(
    grid: Res<LandGrid>,
    players: Query<&Transform, (With<Player>, Without<Dead>)>,
    mut cursor: ResMut<LandCursor>,
) {
    let from = player_grid_position(&grid, &players);
    cursor.position = nearest_position(&grid.free_borders(), from);
    info!("Choose where the next land goes: {:?}", cursor.position);
}

/// Arrows pick a free border, Enter places the land there.
pub fn land_placement_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    grid: Res<LandGrid>,
    mut cursor: ResMut<LandCursor>,
    mut requests: EventWriter<PlaceLandRequest>,
) {
    let step = cursor_step(&keyboard);
    if step != 0 {
        cursor.position = cycle_position(&grid.free_borders(), cursor.position, step);
        info!("Land placement at {:?}", cursor.position);
    }
    if keyboard.just_pressed(KeyCode::Enter) {
        if let Some(position) = cursor.position {
            requests.send(PlaceLandRequest { position });
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn handle_place_land(
    mut commands: Commands,
    mut requests: EventReader<PlaceLandRequest>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut grid: ResMut<LandGrid>,
    config: Res<WorldConfig>,
    enemies: Res<EnemyRegistry>,
    mut next_phase: ResMut<NextState<PlayState>>,
) {
    for request in requests.read() {
        let spawner = EnemySpawner::new(config.spawner.clone(), enemies.pool());
        match grid.place_land(request.position, CARDINAL_BORDERS.to_vec(), spawner) {
            Ok(_) => {
                spawn_land_floor(&mut commands, &mut meshes, &mut materials, &grid, request.position);
                info!("Placed land at {:?} ({} lands)", request.position, grid.len());
                next_phase.set(PlayState::LandEmpowerment);
                break;
            }
            Err(e) => warn!("Can't place land: {}", e),
        }
    }
}

/// Hand out fresh tokens and select the player's land.
pub fn enter_land_empowerment(
    grid: Res<LandGrid>,
    players: Query<&Transform, (With<Player>, Without<Dead>)>,
    mut progression: ResMut<Progression>,
    mut cursor: ResMut<LandCursor>,
) {
    progression.restock();
    let from = player_grid_position(&grid, &players);
    cursor.position = nearest_position(&grid.positions(), from);
    info!(
        "Empower tokens: {}, weaken tokens: {}",
        progression.empower_tokens, progression.weaken_tokens
    );
}

/// Arrows left/right pick a land, up/down empower or weaken it, R resets and
/// Enter continues.
pub fn land_empowerment_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    grid: Res<LandGrid>,
    mut cursor: ResMut<LandCursor>,
    mut requests: EventWriter<EmpowerLandRequest>,
) {
    let step = cursor_step(&keyboard);
    if step != 0 {
        cursor.position = cycle_position(&grid.positions(), cursor.position, step);
        info!("Selected land {:?}", cursor.position);
    }

    if let Some(position) = cursor.position {
        if keyboard.just_pressed(KeyCode::ArrowUp) {
            requests.send(EmpowerLandRequest::Empower(position));
        }
        if keyboard.just_pressed(KeyCode::ArrowDown) {
            requests.send(EmpowerLandRequest::Weaken(position));
        }
    }
    if keyboard.just_pressed(KeyCode::KeyR) {
        requests.send(EmpowerLandRequest::Reset);
    }
    if keyboard.just_pressed(KeyCode::Enter) {
        requests.send(EmpowerLandRequest::Continue);
    }
}

pub fn handle_land_empowerment(
    mut requests: EventReader<EmpowerLandRequest>,
    mut grid: ResMut<LandGrid>,
    mut progression: ResMut<Progression>,
    mut next_phase: ResMut<NextState<PlayState>>,
) {
    for request in requests.read() {
        let result = match *request {
            EmpowerLandRequest::Empower(position) => progression.empower(&mut grid, position),
            EmpowerLandRequest::Weaken(position) => progression.weaken(&mut grid, position),
            EmpowerLandRequest::Reset => {
                progression.refund(&mut grid);
                Ok(true)
            }
            EmpowerLandRequest::Continue => {
                if progression.can_proceed(&grid) {
                    progression.confirm(&mut grid);
                    next_phase.set(PlayState::EventSelection);
                    break;
                }
                info!("Spend the remaining tokens before continuing");
                Ok(false)
            }
        };

        match result {
            Ok(true) => debug!(
                "{:?} done, {} empower and {} weaken tokens left",
                request, progression.empower_tokens, progression.weaken_tokens
            ),
            Ok(false) => debug!("{:?} changed nothing", request),
            Err(e) => warn!("{}", e),
        }
    }
}

/// Roll the events to choose between.
pub fn offer_world_events(mut manager: ResMut<EventManager>) {
    let offered = manager.offer_events(&mut rand::thread_rng()).to_vec();
    for (index, kind) in offered.iter().enumerate() {
        info!("[{}] {}: {}", index + 1, kind.name(), kind.description());
    }
}

/// Digits pick an offered event, Enter takes the first.
pub fn event_selection_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    manager: Res<EventManager>,
    mut requests: EventWriter<SelectWorldEvent>,
) {
    let index = if keyboard.just_pressed(KeyCode::Enter) {
        Some(0)
    } else {
        pressed_digit(&keyboard)
    };
    if let Some(kind) = index.and_then(|index| manager.offered().get(index)) {
        requests.send(SelectWorldEvent { kind: *kind });
    }
}

pub fn handle_event_selection(
    mut commands: Commands,
    mut requests: EventReader<SelectWorldEvent>,
    mut manager: ResMut<EventManager>,
    mut grid: ResMut<LandGrid>,
    config: Res<WorldConfig>,
    players: Query<&Transform, (With<Player>, Without<Dead>)>,
    mut next_phase: ResMut<NextState<PlayState>>,
) {
    for request in requests.read() {
        if !manager.offered().contains(&request.kind) {
            warn!("{} event wasn't offered", request.kind.name());
            continue;
        }

        let positions: Vec<Vec3> = players.iter().map(|t| t.translation).collect();
        let phase = begin_event(
            &mut commands,
            request.kind,
            &mut manager,
            &mut grid,
            &config,
            &positions,
        );
        next_phase.set(phase);
        break;
    }
}
