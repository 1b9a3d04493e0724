//! Developer shortcuts for world events.

use bevy::prelude::*;

use super::land::LandGrid;
use super::manager::EventManager;
use super::systems::despawn_all;
use crate::core::PlayState;

/// `K` clears the running event as if it had been won.
pub fn debug_clear_event(
    mut commands: Commands,
    keyboard: Res<ButtonInput<KeyCode>>,
    mut manager: ResMut<EventManager>,
    mut grid: ResMut<LandGrid>,
    mut next_phase: ResMut<NextState<PlayState>>,
) {
    if !keyboard.just_pressed(KeyCode::KeyK) || manager.current().is_none() {
        return;
    }

    warn!("Debug: clearing the current event");
    despawn_all(&mut commands, manager.clear_event(&mut grid));
    next_phase.set(PlayState::AspectSelection);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GameState;
    use crate::world::data::WorldConfig;
    use crate::world::events::{EventContext, WorldEventKind};
    use crate::world::spawner::{EnemySpawner, SpawnerConfig};

    #[test]
    fn k_clears_the_running_event() {
        let mut grid = LandGrid::default();
        grid.spawn_starting_lands(|| {
            EnemySpawner::new(SpawnerConfig::default(), vec![("grunt".to_string(), 1)])
        });
        let mut manager = EventManager::default();
        let config = WorldConfig::default();
        let mut rng = rand::thread_rng();
        manager.change_event(
            WorldEventKind::Survival,
            &mut EventContext {
                grid: &mut grid,
                config: &config,
                players: &[Vec3::ZERO],
                objective: None,
                rng: &mut rng,
            },
        );

        let mut app = App::new();
        app.add_plugins(bevy::state::app::StatesPlugin)
            .init_state::<GameState>()
            .add_sub_state::<PlayState>()
            .init_resource::<ButtonInput<KeyCode>>()
            .insert_resource(grid)
            .insert_resource(manager)
            .add_systems(Update, debug_clear_event);

        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::KeyK);
        app.update();

        let manager = app.world().resource::<EventManager>();
        assert!(manager.current().is_none());
        assert_eq!(manager.cleared_count(), 1);
    }
}
