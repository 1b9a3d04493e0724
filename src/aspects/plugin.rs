use bevy::prelude::*;

use super::data::*;
use super::systems::*;
use crate::core::{GameState, GameplaySet, PlayState};

/// Aspects plugin - experience, level-ups and aspect tree unlocks.
pub struct AspectsPlugin;

impl Plugin for AspectsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AspectRegistry>()
            .add_event::<AspectChoiceEvent>()
            .add_event::<AspectUnlockedEvent>()
            .add_systems(Startup, load_aspect_trees)
            .add_systems(
                Update,
                (grant_kill_exp, grant_aspect_tokens)
                    .chain()
                    .in_set(GameplaySet::States),
            )
            .add_systems(
                Update,
                (handle_aspect_choices, finish_aspect_selection)
                    .chain()
                    .run_if(in_state(GameState::InGame))
                    .run_if(in_state(PlayState::AspectSelection)),
            );
    }
}
