//! World plugin - the land grid, spawners, world events and the run loop.

use bevy::prelude::*;

use super::data::{load_world_config, WorldConfig};
use super::debug::debug_clear_event;
use super::flow::*;
use super::geometry::tint_land_floors;
use super::land::LandGrid;
use super::manager::EventManager;
use super::progression::Progression;
use super::systems::*;
use crate::core::{GameState, GameplaySet, PlayState};

/// World plugin - builds the run and moves it between phases.
pub struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WorldConfig>()
            .init_resource::<LandGrid>()
            .init_resource::<EventManager>()
            .init_resource::<Progression>()
            .init_resource::<LandCursor>()
            .add_event::<PlaceLandRequest>()
            .add_event::<EmpowerLandRequest>()
            .add_event::<SelectWorldEvent>()
            .add_systems(Startup, load_world_config)
            .add_systems(OnEnter(GameState::InGame), setup_run)
            .add_systems(OnExit(GameState::GameOver), cleanup_run)
            .add_systems(Update, restart_run.run_if(in_state(GameState::GameOver)));

        // Playing
        app.add_systems(
            Update,
            (
                tick_spawners,
                return_enemies_to_spawners,
                fail_event_on_objective_death,
                move_escorts,
                update_world_event,
                debug_clear_event,
            )
                .chain()
                .in_set(GameplaySet::World),
        );

        // Between events
        app.add_systems(
            Update,
            aspect_selection_input.run_if(in_state(PlayState::AspectSelection)),
        )
        .add_systems(OnEnter(PlayState::LandPlacement), enter_land_placement)
        .add_systems(
            Update,
            (land_placement_input, handle_place_land)
                .chain()
                .run_if(in_state(PlayState::LandPlacement)),
        )
        .add_systems(OnEnter(PlayState::LandEmpowerment), enter_land_empowerment)
        .add_systems(
            Update,
            (land_empowerment_input, handle_land_empowerment, tint_land_floors)
                .chain()
                .run_if(in_state(PlayState::LandEmpowerment)),
        )
        .add_systems(OnEnter(PlayState::EventSelection), offer_world_events)
        .add_systems(
            Update,
            (event_selection_input, handle_event_selection)
                .chain()
                .run_if(in_state(PlayState::EventSelection)),
        );
    }
}
