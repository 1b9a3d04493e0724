//! World events: the objective the player plays between land placements.
//!
//! An event starts spawners on some lands, watches the grid and the players
//! every frame, and reports back whether it is still running, cleared or
//! failed. Events don't touch the ECS themselves. Systems hand them a
//! [`EventContext`] and act on what they return.

use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;

use super::data::WorldConfig;
use super::land::LandGrid;
use crate::entities::targeting::horizontal_distance;

/// Height above the land centre objectives appear at.
const OBJECTIVE_HEIGHT: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorldEventKind {
    Tutorial,
    Survival,
    Priorities,
    Zones,
    VisitAll,
    Defend,
    Escort,
}

impl WorldEventKind {
    /// Events the player can pick between lands.
    pub const SELECTABLE: [WorldEventKind; 6] = [
        WorldEventKind::Survival,
        WorldEventKind::Priorities,
        WorldEventKind::Zones,
        WorldEventKind::VisitAll,
        WorldEventKind::Defend,
        WorldEventKind::Escort,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WorldEventKind::Tutorial => "Tutorial",
            WorldEventKind::Survival => "Survival",
            WorldEventKind::Priorities => "Priorities",
            WorldEventKind::Zones => "Zones",
            WorldEventKind::VisitAll => "Visit All",
            WorldEventKind::Defend => "Defend",
            WorldEventKind::Escort => "Escort",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            WorldEventKind::Tutorial => "Defeat the enemies on the starting land.",
            WorldEventKind::Survival => "Every land spawns enemies. Survive until the timer runs out.",
            WorldEventKind::Priorities => "Defeat every enemy from the highest level lands.",
            WorldEventKind::Zones => "A block of lands spawns enemies. Defeat them all.",
            WorldEventKind::VisitAll => "Reach the marker on every highlighted land.",
            WorldEventKind::Defend => "Keep the objective alive until the timer runs out.",
            WorldEventKind::Escort => "Keep the escort alive until it reaches the farthest land.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Running,
    Cleared,
    Failed,
}

/// An entity the event needs spawned, such as the thing to defend.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveSpawn {
    pub position: Vec3,
    pub max_health: f32,
    /// Where the objective walks to, if it moves
    pub destination: Option<Vec3>,
    pub speed: f32,
}

/// A land the player has to reach during Visit All.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisitIndicator {
    pub land: IVec2,
    pub position: Vec3,
    pub radius: f32,
}

/// World access handed to an event for one call.
pub struct EventContext<'a, R: Rng> {
    pub grid: &'a mut LandGrid,
    pub config: &'a WorldConfig,
    pub players: &'a [Vec3],
    /// Current position of the event's objective, once it exists
    pub objective: Option<Vec3>,
    pub rng: &'a mut R,
}

impl<R: Rng> EventContext<'_, R> {
    fn spawn_amount(&self) -> u32 {
        self.config.base_spawn_amount + self.players.len().saturating_sub(1) as u32
    }

    /// The land a randomly chosen player stands on.
    fn random_player_land(&mut self) -> Option<IVec2> {
        let player = self.players.choose(self.rng)?;
        let position = self.grid.grid_position(*player);
        if self.grid.land(position).is_some() {
            Some(position)
        } else {
            self.grid.random_land(self.rng)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum EventState {
    NotStarted,
    /// Waiting for every tracked land to run dry
    Deplete { lands: Vec<IVec2> },
    Timed { remaining: f32 },
    VisitAll {
        indicators: Vec<VisitIndicator>,
        total: usize,
    },
    Defend {
        remaining: f32,
        spawn: ObjectiveSpawn,
    },
    Escort {
        current_land: IVec2,
        destination: IVec2,
        spawn: ObjectiveSpawn,
    },
}

/// A running world event and the spawners it started.
#[derive(Debug, Clone)]
pub struct WorldEvent {
    kind: WorldEventKind,
    state: EventState,
    active_spawners: Vec<IVec2>,
    objective: Option<Entity>,
}

impl WorldEvent {
    pub fn new(kind: WorldEventKind) -> Self {
        Self {
            kind,
            state: EventState::NotStarted,
            active_spawners: Vec::new(),
            objective: None,
        }
    }

    pub fn kind(&self) -> WorldEventKind {
        self.kind
    }

    pub fn active_spawners(&self) -> &[IVec2] {
        &self.active_spawners
    }

    pub fn objective(&self) -> Option<Entity> {
        self.objective
    }

    pub fn set_objective(&mut self, entity: Entity) {
        self.objective = Some(entity);
    }

    /// The objective to spawn, until one has been registered.
    pub fn objective_spawn(&self) -> Option<ObjectiveSpawn> {
        if self.objective.is_some() {
            return None;
        }
        match &self.state {
            EventState::Defend { spawn, .. } | EventState::Escort { spawn, .. } => {
                Some(spawn.clone())
            }
            _ => None,
        }
    }

    pub fn visit_indicators(&self) -> &[VisitIndicator] {
        match &self.state {
            EventState::VisitAll { indicators, .. } => indicators,
            _ => &[],
        }
    }

    /// Short progress readout, a timer or a visited count.
    pub fn progress(&self) -> String {
        match &self.state {
            EventState::Timed { remaining } | EventState::Defend { remaining, .. } => {
                formatted_time(*remaining)
            }
            EventState::VisitAll { indicators, total } => {
                format!("{}/{}", total - indicators.len(), total)
            }
            _ => self.kind.name().to_uppercase(),
        }
    }

    fn start_currency<R: Rng>(
        &mut self,
        ctx: &mut EventContext<R>,
        position: IVec2,
        interval: f32,
        amount: u32,
        restock: bool,
    ) -> bool {
        let Some(land) = ctx.grid.land_mut(position) else {
            return false;
        };
        let level = land.level;
        let started = land
            .spawner
            .start_currency(level, (interval, interval), amount, restock, ctx.rng);
        if !self.active_spawners.contains(&position) {
            self.active_spawners.push(position);
        }
        started
    }

    fn start_duration<R: Rng>(
        &mut self,
        ctx: &mut EventContext<R>,
        position: IVec2,
        interval: f32,
        duration: f32,
        amount: u32,
    ) -> bool {
        let Some(land) = ctx.grid.land_mut(position) else {
            return false;
        };
        let level = land.level;
        let started = land
            .spawner
            .start_duration(level, (interval, interval), duration, amount, ctx.rng);
        if !self.active_spawners.contains(&position) {
            self.active_spawners.push(position);
        }
        started
    }

    /// Stop every spawner this event started.
    pub fn stop_active_spawners(&mut self, grid: &mut LandGrid) {
        for position in self.active_spawners.drain(..) {
            if let Some(land) = grid.land_mut(position) {
                land.spawner.stop();
            }
        }
    }

    /// Start the event. Events with nothing to do clear straight away.
    pub fn start<R: Rng>(&mut self, ctx: &mut EventContext<R>) -> EventStatus {
        self.active_spawners.clear();
        self.objective = None;

        let needs_players = !matches!(
            self.kind,
            WorldEventKind::Tutorial | WorldEventKind::Priorities | WorldEventKind::Zones
        );
        if needs_players && ctx.players.is_empty() {
            warn!("No players for {} event, clearing it", self.kind.name());
            return EventStatus::Cleared;
        }

        let state = match self.kind {
            WorldEventKind::Tutorial => self.start_tutorial(ctx),
            WorldEventKind::Survival => self.start_survival(ctx),
            WorldEventKind::Priorities => self.start_priorities(ctx),
            WorldEventKind::Zones => self.start_zones(ctx),
            WorldEventKind::VisitAll => self.start_visit_all(ctx),
            WorldEventKind::Defend => self.start_defend(ctx),
            WorldEventKind::Escort => self.start_escort(ctx),
        };

        let status = match &state {
            Some(EventState::Deplete { lands }) if lands.is_empty() => EventStatus::Cleared,
            Some(_) => EventStatus::Running,
            None => EventStatus::Cleared,
        };
        self.state = state.unwrap_or(EventState::NotStarted);
        info!("Started {} event: {:?}", self.kind.name(), status);
        status
    }

    fn start_tutorial<R: Rng>(&mut self, ctx: &mut EventContext<R>) -> Option<EventState> {
        let interval = ctx.config.tutorial.spawn_interval;
        let amount = ctx.config.base_spawn_amount;
        let started = self.start_currency(ctx, IVec2::ZERO, interval, amount, true);
        Some(EventState::Deplete {
            lands: if started { vec![IVec2::ZERO] } else { Vec::new() },
        })
    }

    fn start_survival<R: Rng>(&mut self, ctx: &mut EventContext<R>) -> Option<EventState> {
        let config = &ctx.config.survival;
        let lands = ctx.grid.positions();
        let steps = (lands.len().saturating_sub(1) / 2) as f32;
        let time_limit = config.base_time_limit + steps * config.time_increment;
        let interval = time_limit / config.intervals.max(1) as f32;
        let amount = ctx.spawn_amount();

        for position in lands {
            self.start_duration(ctx, position, interval, time_limit, amount);
        }
        Some(EventState::Timed {
            remaining: time_limit,
        })
    }

    fn start_priorities<R: Rng>(&mut self, ctx: &mut EventContext<R>) -> Option<EventState> {
        let config = ctx.config.priorities.clone();
        let amount = ctx.config.base_spawn_amount;
        let lands = ctx.grid.positions();
        let top_count = 1 + lands.len().saturating_sub(1) / config.lands_per_top_land.max(1) as usize;
        let top_lands = ctx.grid.top_lands_by_level(top_count);

        let mut tracked = Vec::new();
        for position in &top_lands {
            if self.start_currency(ctx, *position, config.burst_interval, amount, true) {
                tracked.push(*position);
            }
        }
        for position in lands.into_iter().filter(|p| !top_lands.contains(p)) {
            self.start_currency(ctx, position, config.base_spawn_interval, amount, true);
        }
        Some(EventState::Deplete { lands: tracked })
    }

    fn start_zones<R: Rng>(&mut self, ctx: &mut EventContext<R>) -> Option<EventState> {
        let config = ctx.config.zones.clone();
        let amount = ctx.config.base_spawn_amount;
        let zone = if config.epicentre {
            epicentre_zone(ctx.grid, config.max_search_layer, ctx.rng)
        } else {
            block_zone(ctx.grid, ctx.rng)
        };

        let mut tracked = Vec::new();
        for position in zone {
            if self.start_currency(ctx, position, config.base_spawn_interval, amount, true) {
                tracked.push(position);
            }
        }
        Some(EventState::Deplete { lands: tracked })
    }

    fn start_visit_all<R: Rng>(&mut self, ctx: &mut EventContext<R>) -> Option<EventState> {
        let config = ctx.config.visit_all.clone();
        let amount = ctx.config.base_spawn_amount;
        let lands = ctx.grid.positions();
        let count = indicator_count(config.count_modifier, lands.len());

        let chosen: Vec<IVec2> = lands.choose_multiple(ctx.rng, count).copied().collect();
        let mut indicators = Vec::with_capacity(chosen.len());
        for position in chosen {
            self.start_currency(ctx, position, config.base_spawn_interval, amount, true);
            let level = ctx.grid.land(position).map_or(1, |land| land.level);
            indicators.push(VisitIndicator {
                land: position,
                position: ctx.grid.world_position(position),
                radius: indicator_radius(
                    config.y_intercept,
                    config.radius_decay_rate,
                    config.minimum_radius,
                    level,
                ),
            });
        }

        // The land the player starts on counts as visited
        let standing: Vec<IVec2> = ctx
            .players
            .iter()
            .map(|player| ctx.grid.grid_position(*player))
            .collect();
        indicators.retain(|indicator| !standing.contains(&indicator.land));

        let total = indicators.len();
        Some(EventState::VisitAll { indicators, total })
    }

    fn start_defend<R: Rng>(&mut self, ctx: &mut EventContext<R>) -> Option<EventState> {
        let config = ctx.config.defend.clone();
        let land = ctx.random_player_land()?;
        let amount = ctx.spawn_amount();

        let active = ctx
            .grid
            .lands_with_manhattan_distance(land, config.end_layer, true);
        let steps = (active.len().saturating_sub(1) / (config.end_layer.max(0) as usize + 1)) as f32;
        let time_limit = config.base_time_limit + steps * config.time_increment;
        let interval = time_limit / config.intervals.max(1) as f32;
        for position in active {
            self.start_duration(ctx, position, interval, time_limit, amount);
        }

        Some(EventState::Defend {
            remaining: time_limit,
            spawn: ObjectiveSpawn {
                position: ctx.grid.world_position(land) + Vec3::Y * OBJECTIVE_HEIGHT,
                max_health: config.objective_health,
                destination: None,
                speed: 0.0,
            },
        })
    }

    fn start_escort<R: Rng>(&mut self, ctx: &mut EventContext<R>) -> Option<EventState> {
        let config = ctx.config.escort.clone();
        let land = ctx.random_player_land()?;
        let amount = ctx.config.base_spawn_amount;

        self.start_currency(ctx, land, config.base_spawn_interval, amount, true);
        let destination = ctx.grid.farthest_land(land).unwrap_or(land);

        Some(EventState::Escort {
            current_land: land,
            destination,
            spawn: ObjectiveSpawn {
                position: ctx.grid.world_position(land) + Vec3::Y * OBJECTIVE_HEIGHT,
                max_health: config.objective_health,
                destination: Some(ctx.grid.world_position(destination) + Vec3::Y * OBJECTIVE_HEIGHT),
                speed: config.walk_speed,
            },
        })
    }

    /// Advance the event by `delta` seconds.
    pub fn update<R: Rng>(&mut self, delta: f32, ctx: &mut EventContext<R>) -> EventStatus {
        let mut state = std::mem::replace(&mut self.state, EventState::NotStarted);
        let status = match &mut state {
            EventState::NotStarted => EventStatus::Running,
            EventState::Deplete { lands } => {
                let depleted = lands.iter().all(|position| {
                    ctx.grid
                        .land(*position)
                        .map_or(true, |land| land.spawner.is_depleted())
                });
                if depleted {
                    EventStatus::Cleared
                } else {
                    EventStatus::Running
                }
            }
            EventState::Timed { remaining } | EventState::Defend { remaining, .. } => {
                *remaining = (*remaining - delta).max(0.0);
                if *remaining <= 0.0 {
                    EventStatus::Cleared
                } else {
                    EventStatus::Running
                }
            }
            EventState::VisitAll { indicators, .. } => {
                if indicators.is_empty() {
                    EventStatus::Cleared
                } else {
                    indicators.retain(|indicator| {
                        !ctx.players.iter().any(|player| {
                            horizontal_distance(*player, indicator.position) <= indicator.radius
                        })
                    });
                    EventStatus::Running
                }
            }
            EventState::Escort {
                current_land,
                destination,
                ..
            } => match ctx.objective {
                Some(position) => {
                    let land = ctx.grid.grid_position(position);
                    if ctx.grid.land(land).is_some() && land != *current_land {
                        debug!("Escort moved onto land {:?}", land);
                        *current_land = land;
                        self.stop_active_spawners(ctx.grid);
                        let interval = ctx.config.escort.base_spawn_interval;
                        let amount = ctx.config.base_spawn_amount;
                        self.start_currency(ctx, land, interval, amount, false);
                    }
                    if *current_land == *destination {
                        EventStatus::Cleared
                    } else {
                        EventStatus::Running
                    }
                }
                None => EventStatus::Running,
            },
        };
        self.state = state;
        status
    }

    /// Stop the event's spawners and hand back every entity it leaves
    /// behind: spawned enemies on all lands and the objective.
    pub fn clear(&mut self, grid: &mut LandGrid) -> Vec<Entity> {
        self.stop_active_spawners(grid);

        let mut leftovers = Vec::new();
        for position in grid.positions() {
            if let Some(land) = grid.land_mut(position) {
                leftovers.extend(land.spawner.deactivate_all());
            }
        }
        leftovers.extend(self.objective.take());
        self.state = EventState::NotStarted;
        leftovers
    }
}

/// Visit All marker count for a grid of `land_count` lands.
pub fn indicator_count(count_modifier: f32, land_count: usize) -> usize {
    let count = (count_modifier * land_count as f32).sqrt().round().max(0.0) as usize;
    count.min(land_count)
}

/// Marker radius, shrinking as land level rises.
pub fn indicator_radius(y_intercept: f32, decay_rate: f32, minimum: f32, level: i32) -> f32 {
    // Shifted so the lowest land level still gives a non-negative exponent
    let exponent = (level + 5).max(0);
    y_intercept * (1.0 - decay_rate).powi(exponent) + minimum
}

/// A random land and whichever of its eight neighbours exist.
fn block_zone(grid: &LandGrid, rng: &mut impl Rng) -> Vec<IVec2> {
    let Some(center) = grid.random_land(rng) else {
        return Vec::new();
    };
    let mut zone = vec![center];
    for x in -1..=1 {
        for y in -1..=1 {
            let position = center + IVec2::new(x, y);
            if position != center && grid.land(position).is_some() {
                zone.push(position);
            }
        }
    }
    zone
}

/// Lands spiralling out in square rings from a weighted epicentre, up to the
/// largest square that fits the grid.
fn epicentre_zone(grid: &LandGrid, max_layer: i32, rng: &mut impl Rng) -> Vec<IVec2> {
    let Some(center) = grid.random_land_by_weight(rng) else {
        return Vec::new();
    };
    let side = (grid.len() as f32).sqrt().floor() as usize;
    let target = (side * side).max(1);

    let mut zone = vec![center];
    let mut layer = 1;
    while zone.len() < target && layer <= max_layer {
        let ring = (-layer..=layer)
            .map(|x| IVec2::new(x, layer))
            .chain((-layer..layer).rev().map(|y| IVec2::new(layer, y)))
            .chain((-layer..layer).rev().map(|x| IVec2::new(x, -layer)))
            .chain((-layer + 1..layer).map(|y| IVec2::new(-layer, y)));

        for offset in ring {
            let position = center + offset;
            if grid.land(position).is_some() && !zone.contains(&position) {
                zone.push(position);
                if zone.len() >= target {
                    return zone;
                }
            }
        }
        layer += 1;
    }
    zone
}

/// Seconds as `mm:ss`.
pub fn formatted_time(seconds: f32) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor() as u32;
    let rest = (seconds % 60.0).floor() as u32;
    format!("{:02}:{:02}", minutes, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::spawner::{EnemySpawner, SpawnerConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn spawner() -> EnemySpawner {
        EnemySpawner::new(SpawnerConfig::default(), vec![("grunt".to_string(), 1)])
    }

    fn starting_grid() -> LandGrid {
        let mut grid = LandGrid::default();
        grid.spawn_starting_lands(spawner);
        grid
    }

    fn start(
        kind: WorldEventKind,
        grid: &mut LandGrid,
        config: &WorldConfig,
        players: &[Vec3],
        rng: &mut StdRng,
    ) -> (WorldEvent, EventStatus) {
        let mut event = WorldEvent::new(kind);
        let mut ctx = EventContext {
            grid,
            config,
            players,
            objective: None,
            rng,
        };
        let status = event.start(&mut ctx);
        (event, status)
    }

    #[test]
    fn survival_runs_on_every_land_until_time_runs_out() {
        let mut grid = starting_grid();
        let config = WorldConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let players = [Vec3::new(15.0, 1.0, 15.0)];

        let (mut event, status) =
            start(WorldEventKind::Survival, &mut grid, &config, &players, &mut rng);
        assert_eq!(status, EventStatus::Running);
        assert_eq!(event.active_spawners().len(), 4);
        // 4 lands: 40 + floor(3 / 2) * 10
        assert_eq!(event.progress(), "00:50");

        let mut ctx = EventContext {
            grid: &mut grid,
            config: &config,
            players: &players,
            objective: None,
            rng: &mut rng,
        };
        assert_eq!(event.update(49.0, &mut ctx), EventStatus::Running);
        assert_eq!(event.update(1.5, &mut ctx), EventStatus::Cleared);
    }

    #[test]
    fn survival_without_players_clears_immediately() {
        let mut grid = starting_grid();
        let config = WorldConfig::default();
        let mut rng = StdRng::seed_from_u64(2);

        let (_, status) = start(WorldEventKind::Survival, &mut grid, &config, &[], &mut rng);
        assert_eq!(status, EventStatus::Cleared);
    }

    #[test]
    fn zones_with_no_positive_lands_clear_immediately() {
        let mut grid = starting_grid();
        for position in grid.positions() {
            grid.land_mut(position).unwrap().level_to(0);
        }
        let config = WorldConfig::default();
        let mut rng = StdRng::seed_from_u64(3);

        let (_, status) = start(WorldEventKind::Zones, &mut grid, &config, &[], &mut rng);
        assert_eq!(status, EventStatus::Cleared);
    }

    #[test]
    fn priorities_clear_once_top_lands_are_depleted() {
        let mut grid = starting_grid();
        grid.land_mut(IVec2::ONE).unwrap().level_to(3);
        let config = WorldConfig::default();
        let mut rng = StdRng::seed_from_u64(4);

        let (mut event, status) =
            start(WorldEventKind::Priorities, &mut grid, &config, &[], &mut rng);
        assert_eq!(status, EventStatus::Running);
        assert_eq!(event.active_spawners().len(), 4);

        // Drain the top land's queue, spawning and killing everything
        let land = grid.land_mut(IVec2::ONE).unwrap();
        let mut spawned = Vec::new();
        for _ in 0..200 {
            for _ in land.spawner.tick(1.0, &mut rng) {
                let entity = Entity::from_raw(spawned.len() as u32);
                land.spawner.register_spawned(entity);
                spawned.push(entity);
            }
        }
        assert!(!land.spawner.is_running());
        for entity in spawned {
            land.spawner.remove_enemy(entity);
        }

        let mut ctx = EventContext {
            grid: &mut grid,
            config: &config,
            players: &[],
            objective: None,
            rng: &mut rng,
        };
        assert_eq!(event.update(0.1, &mut ctx), EventStatus::Cleared);
    }

    #[test]
    fn visiting_every_marker_clears_visit_all() {
        let mut grid = starting_grid();
        let config = WorldConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        // Standing off the grid so no marker is pre-visited
        let far = [Vec3::new(500.0, 1.0, 500.0)];

        let (mut event, status) = start(WorldEventKind::VisitAll, &mut grid, &config, &far, &mut rng);
        assert_eq!(status, EventStatus::Running);
        // round(sqrt(0.75 * 4)) = 2
        assert_eq!(event.visit_indicators().len(), 2);

        let targets: Vec<Vec3> = event.visit_indicators().iter().map(|i| i.position).collect();
        for target in targets {
            let mut ctx = EventContext {
                grid: &mut grid,
                config: &config,
                players: &[target],
                objective: None,
                rng: &mut rng,
            };
            assert_eq!(event.update(0.1, &mut ctx), EventStatus::Running);
        }
        assert_eq!(event.progress(), "2/2");

        let mut ctx = EventContext {
            grid: &mut grid,
            config: &config,
            players: &far,
            objective: None,
            rng: &mut rng,
        };
        assert_eq!(event.update(0.1, &mut ctx), EventStatus::Cleared);
    }

    #[test]
    fn defend_asks_for_an_objective_on_the_player_land() {
        let mut grid = starting_grid();
        let config = WorldConfig::default();
        let mut rng = StdRng::seed_from_u64(6);
        let players = [Vec3::new(30.0, 1.0, 0.0)];

        let (mut event, status) = start(WorldEventKind::Defend, &mut grid, &config, &players, &mut rng);
        assert_eq!(status, EventStatus::Running);

        let spawn = event.objective_spawn().unwrap();
        assert_eq!(spawn.position, Vec3::new(30.0, OBJECTIVE_HEIGHT, 0.0));
        assert_eq!(spawn.max_health, 200.0);
        // All four starting lands are within two rings: 40 + floor(3 / 3) * 20
        assert_eq!(event.progress(), "01:00");

        event.set_objective(Entity::from_raw(99));
        assert!(event.objective_spawn().is_none());

        let leftovers = event.clear(&mut grid);
        assert!(leftovers.contains(&Entity::from_raw(99)));
        assert!(event.active_spawners().is_empty());
    }

    #[test]
    fn escort_clears_on_reaching_the_farthest_land() {
        let mut grid = starting_grid();
        let config = WorldConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let players = [Vec3::new(0.0, 1.0, 0.0)];

        let (mut event, status) = start(WorldEventKind::Escort, &mut grid, &config, &players, &mut rng);
        assert_eq!(status, EventStatus::Running);
        let spawn = event.objective_spawn().unwrap();
        assert_eq!(spawn.destination, Some(Vec3::new(30.0, OBJECTIVE_HEIGHT, 30.0)));

        let mut ctx = EventContext {
            grid: &mut grid,
            config: &config,
            players: &players,
            objective: Some(Vec3::new(30.0, 1.0, 0.0)),
            rng: &mut rng,
        };
        assert_eq!(event.update(0.1, &mut ctx), EventStatus::Running);
        assert_eq!(event.active_spawners(), &[IVec2::X]);

        ctx.objective = Some(Vec3::new(30.0, 1.0, 30.0));
        assert_eq!(event.update(0.1, &mut ctx), EventStatus::Cleared);
    }

    #[test]
    fn indicator_math() {
        assert_eq!(indicator_count(0.75, 4), 2);
        assert_eq!(indicator_count(0.75, 0), 0);
        assert_eq!(indicator_count(15.0, 2), 2);
        assert_eq!(indicator_radius(10.0, 0.5, 2.0, -5), 12.0);
        assert_eq!(indicator_radius(10.0, 0.5, 2.0, -4), 7.0);
    }

    #[test]
    fn epicentre_zone_fills_the_largest_square() {
        let mut grid = starting_grid();
        let _ = grid.place_land(IVec2::new(2, 0), CARDINAL.to_vec(), spawner());
        let mut rng = StdRng::seed_from_u64(8);

        // 5 lands fit a 2x2 square
        assert_eq!(epicentre_zone(&grid, 5, &mut rng).len(), 4);
    }

    const CARDINAL: [IVec2; 4] = crate::world::land::CARDINAL_BORDERS;

    #[test]
    fn times_format_as_minutes_and_seconds() {
        assert_eq!(formatted_time(0.0), "00:00");
        assert_eq!(formatted_time(65.7), "01:05");
        assert_eq!(formatted_time(-3.0), "00:00");
    }
}
