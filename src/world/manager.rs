//! Owns the running world event and the pool events are picked from.

use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;

use super::events::{EventContext, EventStatus, WorldEvent, WorldEventKind};
use super::land::LandGrid;

/// How many events are offered between lands.
pub const EVENT_CHOICES: usize = 3;

#[derive(Resource, Debug)]
pub struct EventManager {
    registered: Vec<WorldEventKind>,
    default_kind: WorldEventKind,
    current: Option<WorldEvent>,
    offered: Vec<WorldEventKind>,
    /// Events cleared this run
    cleared: u32,
}

impl Default for EventManager {
    fn default() -> Self {
        let mut manager = Self {
            registered: Vec::new(),
            default_kind: WorldEventKind::Survival,
            current: None,
            offered: Vec::new(),
            cleared: 0,
        };
        for kind in WorldEventKind::SELECTABLE {
            manager.register(kind);
        }
        manager
    }
}

impl EventManager {
    /// Add an event to the pool. Duplicates are skipped.
    pub fn register(&mut self, kind: WorldEventKind) -> bool {
        if self.registered.contains(&kind) {
            warn!("{} event is already registered", kind.name());
            return false;
        }
        self.registered.push(kind);
        true
    }

    pub fn registered(&self) -> &[WorldEventKind] {
        &self.registered
    }

    pub fn default_kind(&self) -> WorldEventKind {
        self.default_kind
    }

    pub fn current(&self) -> Option<&WorldEvent> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut WorldEvent> {
        self.current.as_mut()
    }

    pub fn cleared_count(&self) -> u32 {
        self.cleared
    }

    /// Any registered event, or the default if none are.
    pub fn random_event(&self, rng: &mut impl Rng) -> WorldEventKind {
        self.registered
            .choose(rng)
            .copied()
            .unwrap_or(self.default_kind)
    }

    /// Pick the events offered for the next round.
    pub fn offer_events(&mut self, rng: &mut impl Rng) -> &[WorldEventKind] {
        self.offered = self
            .registered
            .choose_multiple(rng, EVENT_CHOICES)
            .copied()
            .collect();
        if self.offered.is_empty() {
            self.offered.push(self.default_kind);
        }
        &self.offered
    }

    pub fn offered(&self) -> &[WorldEventKind] {
        &self.offered
    }

    /// Replace the current event with a fresh `kind` and start it.
    pub fn change_event<R: Rng>(
        &mut self,
        kind: WorldEventKind,
        ctx: &mut EventContext<R>,
    ) -> EventStatus {
        if let Some(mut previous) = self.current.take() {
            previous.stop_active_spawners(ctx.grid);
        }
        self.offered.clear();

        let mut event = WorldEvent::new(kind);
        let status = event.start(ctx);
        self.current = Some(event);
        status
    }

    pub fn update<R: Rng>(&mut self, delta: f32, ctx: &mut EventContext<R>) -> EventStatus {
        match self.current.as_mut() {
            Some(event) => event.update(delta, ctx),
            None => EventStatus::Running,
        }
    }

    /// End the current event as a success. Returns the entities it left
    /// behind for despawning.
    pub fn clear_event(&mut self, grid: &mut LandGrid) -> Vec<Entity> {
        let Some(mut event) = self.current.take() else {
            return Vec::new();
        };
        self.cleared += 1;
        info!("{} event cleared", event.kind().name());
        event.clear(grid)
    }

    /// End the current event as a failure.
    pub fn fail_event(&mut self, grid: &mut LandGrid) {
        if let Some(mut event) = self.current.take() {
            warn!("{} event failed", event.kind().name());
            event.stop_active_spawners(grid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::data::WorldConfig;
    use crate::world::spawner::{EnemySpawner, SpawnerConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn starting_grid() -> LandGrid {
        let mut grid = LandGrid::default();
        grid.spawn_starting_lands(|| {
            EnemySpawner::new(SpawnerConfig::default(), vec![("grunt".to_string(), 1)])
        });
        grid
    }

    #[test]
    fn duplicate_registration_is_skipped() {
        let mut manager = EventManager::default();
        assert_eq!(manager.registered().len(), 6);
        assert!(!manager.register(WorldEventKind::Zones));
        assert!(manager.register(WorldEventKind::Tutorial));
        assert_eq!(manager.registered().len(), 7);
    }

    #[test]
    fn offers_distinct_registered_events() {
        let mut manager = EventManager::default();
        let mut rng = StdRng::seed_from_u64(3);
        let offered = manager.offer_events(&mut rng).to_vec();

        assert_eq!(offered.len(), EVENT_CHOICES);
        for (i, kind) in offered.iter().enumerate() {
            assert!(WorldEventKind::SELECTABLE.contains(kind));
            assert!(!offered[i + 1..].contains(kind));
        }
    }

    #[test]
    fn empty_pool_falls_back_to_survival() {
        let manager = EventManager {
            registered: Vec::new(),
            ..EventManager::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(manager.random_event(&mut rng), WorldEventKind::Survival);
    }

    #[test]
    fn clearing_stops_spawners_and_counts() {
        let mut grid = starting_grid();
        let config = WorldConfig::default();
        let mut rng = StdRng::seed_from_u64(9);
        let players = [Vec3::new(15.0, 1.0, 15.0)];
        let mut manager = EventManager::default();

        let mut ctx = EventContext {
            grid: &mut grid,
            config: &config,
            players: &players,
            objective: None,
            rng: &mut rng,
        };
        assert_eq!(
            manager.change_event(WorldEventKind::Survival, &mut ctx),
            EventStatus::Running
        );
        assert!(ctx.grid.land(IVec2::ZERO).unwrap().spawner.is_running());

        manager.clear_event(&mut grid);
        assert!(manager.current().is_none());
        assert_eq!(manager.cleared_count(), 1);
        for position in grid.positions() {
            assert!(!grid.land(position).unwrap().spawner.is_running());
        }
    }

    #[test]
    fn failing_stops_spawners_without_counting() {
        let mut grid = starting_grid();
        let config = WorldConfig::default();
        let mut rng = StdRng::seed_from_u64(10);
        let players = [Vec3::ZERO];
        let mut manager = EventManager::default();

        let mut ctx = EventContext {
            grid: &mut grid,
            config: &config,
            players: &players,
            objective: None,
            rng: &mut rng,
        };
        manager.change_event(WorldEventKind::Defend, &mut ctx);
        manager.fail_event(&mut grid);

        assert!(manager.current().is_none());
        assert_eq!(manager.cleared_count(), 0);
        assert!(!grid.land(IVec2::ZERO).unwrap().spawner.is_running());
    }
}
