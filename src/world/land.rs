//! Lands and the sparse grid they sit on.
//!
//! The grid starts as a 2x2 block around the origin. New lands can only go
//! where an existing land has left a border marker, so a land's shape (which
//! borders it exposes) decides where the grid can grow.

use bevy::prelude::*;
use rand::Rng;
use std::collections::HashMap;
use thiserror::Error;

use super::spawner::EnemySpawner;

/// Distance between neighbouring land centres.
pub const LAND_SCALE: f32 = 30.0;
pub const MIN_LAND_LEVEL: i32 = -5;
pub const MAX_LAND_LEVEL: i32 = 10;

/// Borders of a plain square land, relative to its grid position.
pub const CARDINAL_BORDERS: [IVec2; 4] = [IVec2::X, IVec2::NEG_X, IVec2::Y, IVec2::NEG_Y];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LandError {
    #[error("No land border at {0}")]
    NoBorder(IVec2),

    #[error("A land already exists at {0}")]
    Occupied(IVec2),

    #[error("No land at {0}")]
    NoLand(IVec2),
}

/// One cell of the world grid.
#[derive(Debug, Clone)]
pub struct Land {
    pub grid_position: IVec2,
    pub level: i32,
    /// Level change since the last empowerment phase was confirmed
    pub level_difference: i32,
    pub min_level: i32,
    pub max_level: i32,
    /// Border positions relative to this land
    pub borders: Vec<IVec2>,
    pub spawner: EnemySpawner,
}

impl Land {
    pub fn new(grid_position: IVec2, borders: Vec<IVec2>, spawner: EnemySpawner) -> Self {
        Self {
            grid_position,
            level: 1,
            level_difference: 0,
            min_level: MIN_LAND_LEVEL,
            max_level: MAX_LAND_LEVEL,
            borders,
            spawner,
        }
    }

    /// Selection weight. Low-level lands are picked more often.
    pub fn weight(&self) -> f32 {
        1.0 / (1.0 + (self.max_level - self.level) as f32)
    }

    /// Change the level by `amount`, refusing anything that would leave
    /// `[min_level, max_level]`.
    pub fn try_add_level(&mut self, amount: i32) -> bool {
        let level = self.level + amount;
        if level < self.min_level || level > self.max_level {
            return false;
        }

        self.level = level;
        self.level_difference += amount;
        true
    }

    pub fn reset_level_difference(&mut self) {
        self.level_difference = 0;
    }

    pub fn undo_level_changes(&mut self) {
        self.try_add_level(-self.level_difference);
        self.reset_level_difference();
    }

    pub fn level_to(&mut self, level: i32) {
        self.level = level.clamp(self.min_level, self.max_level);
    }
}

/// All placed lands and the free border positions around them.
#[derive(Resource, Debug, Clone)]
pub struct LandGrid {
    pub lands: HashMap<IVec2, Land>,
    /// Free positions, each with the lands whose borders point at it
    pub borders: HashMap<IVec2, Vec<IVec2>>,
    pub land_scale: f32,
}

impl Default for LandGrid {
    fn default() -> Self {
        Self {
            lands: HashMap::new(),
            borders: HashMap::new(),
            land_scale: LAND_SCALE,
        }
    }
}

impl LandGrid {
    pub fn len(&self) -> usize {
        self.lands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lands.is_empty()
    }

    pub fn land(&self, position: IVec2) -> Option<&Land> {
        self.lands.get(&position)
    }

    pub fn land_mut(&mut self, position: IVec2) -> Option<&mut Land> {
        self.lands.get_mut(&position)
    }

    /// Land positions in a stable order.
    pub fn positions(&self) -> Vec<IVec2> {
        let mut positions: Vec<IVec2> = self.lands.keys().copied().collect();
        positions.sort_by_key(|position| (position.x, position.y));
        positions
    }

    /// Empty cells next to placed lands, in a stable order.
    pub fn free_borders(&self) -> Vec<IVec2> {
        let mut borders: Vec<IVec2> = self
            .borders
            .keys()
            .filter(|position| !self.lands.contains_key(position))
            .copied()
            .collect();
        borders.sort_by_key(|position| (position.x, position.y));
        borders
    }

    pub fn grid_position(&self, world: Vec3) -> IVec2 {
        let scaled = world / self.land_scale;
        IVec2::new(scaled.x.round() as i32, scaled.z.round() as i32)
    }

    pub fn world_position(&self, grid: IVec2) -> Vec3 {
        Vec3::new(
            grid.x as f32 * self.land_scale,
            0.0,
            grid.y as f32 * self.land_scale,
        )
    }

    pub fn land_at_world(&self, world: Vec3) -> Option<&Land> {
        self.land(self.grid_position(world))
    }

    pub fn can_spawn_at(&self, position: IVec2) -> bool {
        self.borders.contains_key(&position) && !self.lands.contains_key(&position)
    }

    /// Add a land, register its borders and drop the borders that now lead
    /// onto placed lands.
    pub fn spawn_land(
        &mut self,
        position: IVec2,
        relative_borders: Vec<IVec2>,
        spawner: EnemySpawner,
    ) -> Result<&mut Land, LandError> {
        if self.lands.contains_key(&position) {
            return Err(LandError::Occupied(position));
        }

        for border in &relative_borders {
            self.borders
                .entry(position + *border)
                .or_default()
                .push(position);
        }
        self.lands
            .insert(position, Land::new(position, relative_borders, spawner));
        self.remove_connected_borders();

        self.lands
            .get_mut(&position)
            .ok_or(LandError::NoLand(position))
    }

    /// Place a land at a free border, as the player does between events.
    pub fn place_land(
        &mut self,
        position: IVec2,
        relative_borders: Vec<IVec2>,
        spawner: EnemySpawner,
    ) -> Result<&mut Land, LandError> {
        if self.lands.contains_key(&position) {
            return Err(LandError::Occupied(position));
        }
        if !self.borders.contains_key(&position) {
            return Err(LandError::NoBorder(position));
        }
        self.spawn_land(position, relative_borders, spawner)
    }

    fn remove_connected_borders(&mut self) {
        let lands = &self.lands;
        self.borders.retain(|position, _| !lands.contains_key(position));
    }

    /// The 2x2 block every run starts with.
    pub fn spawn_starting_lands(&mut self, mut make_spawner: impl FnMut() -> EnemySpawner) {
        for position in [IVec2::ZERO, IVec2::X, IVec2::Y, IVec2::ONE] {
            if let Err(err) = self.spawn_land(position, CARDINAL_BORDERS.to_vec(), make_spawner()) {
                warn!("Starting land skipped: {}", err);
            }
        }
    }

    /// Lands in Manhattan rings around `center`, ring by ring.
    pub fn lands_with_manhattan_distance(
        &self,
        center: IVec2,
        end_layer: i32,
        include_center: bool,
    ) -> Vec<IVec2> {
        let mut found = Vec::new();
        if include_center && self.lands.contains_key(&center) {
            found.push(center);
        }

        for layer in 1..=end_layer {
            for x_offset in -layer..=layer {
                let remaining = layer - x_offset.abs();
                let candidates = if remaining > 0 {
                    vec![
                        center + IVec2::new(x_offset, remaining),
                        center + IVec2::new(x_offset, -remaining),
                    ]
                } else {
                    vec![center + IVec2::new(x_offset, 0)]
                };
                found.extend(
                    candidates
                        .into_iter()
                        .filter(|position| self.lands.contains_key(position)),
                );
            }
        }
        found
    }

    /// The land furthest from `from` by Manhattan distance.
    pub fn farthest_land(&self, from: IVec2) -> Option<IVec2> {
        let mut farthest = None;
        let mut best = 0;
        for position in self.positions() {
            let distance = (position - from).abs().element_sum();
            if position != from && distance > best {
                best = distance;
                farthest = Some(position);
            }
        }
        farthest
    }

    pub fn random_land(&self, rng: &mut impl Rng) -> Option<IVec2> {
        let positions = self.positions();
        if positions.is_empty() {
            return None;
        }
        Some(positions[rng.gen_range(0..positions.len())])
    }

    /// Pick a land with probability proportional to its weight.
    pub fn random_land_by_weight(&self, rng: &mut impl Rng) -> Option<IVec2> {
        let positions = self.positions();
        let total: f32 = positions
            .iter()
            .filter_map(|position| self.lands.get(position))
            .map(Land::weight)
            .sum();
        let roll = rng.gen_range(0.0..=total);

        let mut current = 0.0;
        for position in &positions {
            let Some(land) = self.lands.get(position) else {
                continue;
            };
            current += land.weight();
            if roll <= current {
                return Some(*position);
            }
        }
        positions.first().copied()
    }

    /// The `count` highest-level lands, highest first.
    pub fn top_lands_by_level(&self, count: usize) -> Vec<IVec2> {
        let mut positions = self.positions();
        positions.sort_by_key(|position| {
            std::cmp::Reverse(self.lands.get(position).map_or(i32::MIN, |land| land.level))
        });
        positions.truncate(count);
        positions
    }
}
