//! Per-land enemy spawner.
//!
//! A spawner owns a queue of enemies to spawn and the delays between them.
//! Systems tick it and turn the returned requests into enemies. The queue is
//! built up front, either from a currency budget (cheap enemies are more
//! likely, and the wave ends when the budget is spent) or from a duration
//! (batches at random intervals until time runs out).

use bevy::prelude::*;
use rand::Rng;
use serde::Deserialize;
use std::collections::VecDeque;

/// Delay between enemies in the same duration batch.
pub const BATCH_SPACING: f32 = 0.1;

/// Spawner tuning, shared by every land.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Higher values make expensive enemies rarer
    pub skew_power: f32,
    /// Random range for the delay between waves, in seconds
    pub spawn_interval: (f32, f32),
    pub base_currency: f32,
    pub growth_factor: f32,
    pub polynomial_degree: i32,
    /// Chance for each spawned enemy to become an elite
    pub elite_chance: f32,
    /// Spread around the land centre enemies appear in
    pub spawn_radius: f32,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            skew_power: 2.2,
            spawn_interval: (3.0, 6.0),
            base_currency: 4.0,
            growth_factor: 1.0,
            polynomial_degree: 2,
            elite_chance: 0.5,
            spawn_radius: 5.0,
        }
    }
}

impl SpawnerConfig {
    pub fn random_interval(&self, rng: &mut impl Rng) -> f32 {
        random_in(self.spawn_interval, rng)
    }
}

fn random_in((min, max): (f32, f32), rng: &mut impl Rng) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

/// One enemy the spawner wants spawned this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub enemy_type: String,
    pub elite: bool,
}

/// What removing a dead enemy meant for its spawner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnerNotice {
    EnemyDied,
    /// Nothing left to spawn and every spawned enemy is gone
    Depleted,
}

#[derive(Debug, Clone)]
struct QueuedSpawn {
    enemy_type: String,
    /// Wait after this spawn before the next one
    delay: f32,
    /// Budget left once this enemy is paid for
    remaining_currency: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct EnemySpawner {
    config: SpawnerConfig,
    /// Enemy types and their costs
    pool: Vec<(String, u32)>,
    weights: Vec<f32>,
    queue: VecDeque<QueuedSpawn>,
    wait: f32,
    running: bool,
    remaining_currency: f32,
    spawned: Vec<Entity>,
}

impl EnemySpawner {
    pub fn new(config: SpawnerConfig, pool: Vec<(String, u32)>) -> Self {
        let weights = normalized_weights(&pool, config.skew_power);
        Self {
            config,
            pool,
            weights,
            queue: VecDeque::new(),
            wait: 0.0,
            running: false,
            remaining_currency: 0.0,
            spawned: Vec::new(),
        }
    }

    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Budget for a wave on a land of `level`.
    pub fn currency(&self, level: i32) -> f32 {
        self.config.base_currency
            + self.config.growth_factor * (level as f32).powi(self.config.polynomial_degree)
    }

    pub fn remaining_currency(&self) -> f32 {
        self.remaining_currency
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn spawned(&self) -> &[Entity] {
        &self.spawned
    }

    /// Done spawning and every spawned enemy is gone.
    pub fn is_depleted(&self) -> bool {
        !self.running && self.spawned.is_empty()
    }

    fn random_enemy(&self, rng: &mut impl Rng) -> Option<&str> {
        let roll: f32 = rng.gen();
        let mut cumulative = 0.0;
        for ((name, _), weight) in self.pool.iter().zip(&self.weights) {
            cumulative += weight;
            if cumulative >= roll {
                return Some(name.as_str());
            }
        }
        // Float error can leave the total a hair under 1
        self.pool.last().map(|(name, _)| name.as_str())
    }

    fn cost_of(&self, enemy_type: &str) -> u32 {
        self.pool
            .iter()
            .find(|(name, _)| name == enemy_type)
            .map_or(1, |(_, cost)| (*cost).max(1))
    }

    /// Enemies bought with `currency`, paired with the budget left after each.
    pub fn currency_queue(&self, currency: f32, rng: &mut impl Rng) -> Vec<(String, f32)> {
        if self.weights.is_empty() {
            warn!("Spawner has no enemy weights, skipping currency queue");
            return Vec::new();
        }

        let mut queue = Vec::new();
        let mut remaining = currency;
        while remaining > 0.0 {
            let Some(enemy) = self.random_enemy(rng) else {
                return Vec::new();
            };
            remaining -= self.cost_of(enemy) as f32;
            queue.push((enemy.to_string(), remaining));
        }
        queue
    }

    /// Enemies to spawn over `duration`, each with the wait that follows it.
    pub fn duration_queue(
        &self,
        duration: f32,
        interval: (f32, f32),
        spawn_amount: u32,
        rng: &mut impl Rng,
    ) -> Vec<(String, f32)> {
        if self.weights.is_empty() {
            warn!("Spawner has no enemy weights, skipping duration queue");
            return Vec::new();
        }

        let delay = random_in(interval, rng);
        // A non-positive delay would never use up the duration
        if delay <= 0.0 {
            return Vec::new();
        }

        let mut queue = Vec::new();
        let mut remaining = duration;
        while remaining > delay {
            for i in 0..spawn_amount.max(1) {
                if remaining <= delay {
                    break;
                }
                let Some(enemy) = self.random_enemy(rng) else {
                    return Vec::new();
                };
                let wait = if i == 0 { delay } else { BATCH_SPACING };
                queue.push((enemy.to_string(), wait));
                remaining -= wait;
            }
        }
        queue
    }

    /// Start a currency wave. Does nothing on lands at level 0 or below.
    pub fn start_currency(
        &mut self,
        level: i32,
        interval: (f32, f32),
        spawn_amount: u32,
        restock: bool,
        rng: &mut impl Rng,
    ) -> bool {
        self.stop();
        if level <= 0 {
            return false;
        }

        let currency = if restock {
            self.currency(level)
        } else {
            self.remaining_currency
        };
        self.remaining_currency = currency;

        let delay = random_in(interval, rng);
        let spawn_amount = spawn_amount.max(1) as usize;
        self.queue = self
            .currency_queue(currency, rng)
            .into_iter()
            .enumerate()
            .map(|(index, (enemy_type, remaining))| QueuedSpawn {
                enemy_type,
                delay: if (index + 1) % spawn_amount == 0 { delay } else { 0.0 },
                remaining_currency: Some(remaining),
            })
            .collect();
        self.wait = 0.0;
        self.running = !self.queue.is_empty();
        self.running
    }

    /// Start spawning for `duration` seconds. Does nothing on lands at level 0
    /// or below.
    pub fn start_duration(
        &mut self,
        level: i32,
        interval: (f32, f32),
        duration: f32,
        spawn_amount: u32,
        rng: &mut impl Rng,
    ) -> bool {
        self.stop();
        if level <= 0 {
            return false;
        }

        self.queue = self
            .duration_queue(duration, interval, spawn_amount, rng)
            .into_iter()
            .map(|(enemy_type, delay)| QueuedSpawn {
                enemy_type,
                delay,
                remaining_currency: None,
            })
            .collect();
        self.wait = 0.0;
        self.running = !self.queue.is_empty();
        self.running
    }

    /// Advance the spawn timer, returning every enemy due this frame.
    pub fn tick(&mut self, delta: f32, rng: &mut impl Rng) -> Vec<SpawnRequest> {
        let mut requests = Vec::new();
        if !self.running {
            return requests;
        }

        self.wait -= delta;
        while self.wait <= 0.0 {
            let Some(next) = self.queue.pop_front() else {
                break;
            };
            if let Some(remaining) = next.remaining_currency {
                self.remaining_currency = remaining;
            }
            self.wait += next.delay;
            requests.push(SpawnRequest {
                enemy_type: next.enemy_type,
                elite: rng.gen::<f32>() < self.config.elite_chance,
            });
        }

        if self.queue.is_empty() {
            self.running = false;
        }
        requests
    }

    pub fn stop(&mut self) {
        self.queue.clear();
        self.wait = 0.0;
        self.running = false;
    }

    pub fn register_spawned(&mut self, entity: Entity) {
        self.spawned.push(entity);
    }

    /// Forget a dead enemy. `None` if this spawner never spawned it.
    pub fn remove_enemy(&mut self, entity: Entity) -> Option<SpawnerNotice> {
        let index = self.spawned.iter().position(|spawned| *spawned == entity)?;
        self.spawned.swap_remove(index);

        Some(if self.is_depleted() {
            SpawnerNotice::Depleted
        } else {
            SpawnerNotice::EnemyDied
        })
    }

    /// Enemies to kill outright. They report back through `remove_enemy`.
    pub fn kill_all(&self) -> Vec<Entity> {
        self.spawned.clone()
    }

    /// Enemies to remove without a kill. Forgotten immediately.
    pub fn deactivate_all(&mut self) -> Vec<Entity> {
        self.stop();
        std::mem::take(&mut self.spawned)
    }
}

/// Spawn chances proportional to `1 / cost^skew`, summing to one.
pub fn normalized_weights(pool: &[(String, u32)], skew: f32) -> Vec<f32> {
    let raw: Vec<f32> = pool
        .iter()
        .map(|(_, cost)| 1.0 / ((*cost).max(1) as f32).powf(skew))
        .collect();
    let total: f32 = raw.iter().sum();
    if total <= 0.0 {
        warn!("Can't compute spawn chances for an empty enemy pool");
        return Vec::new();
    }
    raw.into_iter().map(|weight| weight / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool() -> Vec<(String, u32)> {
        vec![("grunt".to_string(), 1), ("leaper".to_string(), 2)]
    }

    fn spawner() -> EnemySpawner {
        EnemySpawner::new(SpawnerConfig::default(), pool())
    }

    #[test]
    fn weights_favour_cheap_enemies() {
        let weights = normalized_weights(&pool(), 2.2);
        assert!((weights.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(weights[0] > weights[1]);
        assert!(normalized_weights(&[], 2.2).is_empty());
    }

    #[test]
    fn currency_grows_with_level() {
        let spawner = spawner();
        assert!((spawner.currency(1) - 5.0).abs() < 1e-5);
        assert!((spawner.currency(3) - 13.0).abs() < 1e-5);
    }

    #[test]
    fn currency_queue_spends_the_whole_budget() {
        let spawner = spawner();
        let mut rng = StdRng::seed_from_u64(3);
        let queue = spawner.currency_queue(6.0, &mut rng);

        assert!(!queue.is_empty());
        let last = queue.last().unwrap().1;
        assert!(last <= 0.0);
        assert!(queue[..queue.len() - 1].iter().all(|(_, remaining)| *remaining > 0.0));
    }

    #[test]
    fn duration_queue_batches_with_short_spacing() {
        let spawner = spawner();
        let mut rng = StdRng::seed_from_u64(9);
        let queue = spawner.duration_queue(20.0, (4.0, 4.0), 3, &mut rng);

        let delays: Vec<f32> = queue.iter().map(|(_, delay)| *delay).collect();
        assert_eq!(&delays[..3], &[4.0, BATCH_SPACING, BATCH_SPACING]);
        assert_eq!(delays[3], 4.0);
        assert!(delays.iter().sum::<f32>() <= 20.0);
    }

    #[test]
    fn nothing_starts_on_a_level_zero_land() {
        let mut spawner = spawner();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(!spawner.start_currency(0, (3.0, 6.0), 1, true, &mut rng));
        assert!(!spawner.start_duration(-2, (3.0, 6.0), 30.0, 1, &mut rng));
        assert!(spawner.is_depleted());
    }

    #[test]
    fn currency_wave_spawns_then_depletes() {
        let mut spawner = spawner();
        let mut rng = StdRng::seed_from_u64(5);
        assert!(spawner.start_currency(1, (0.1, 0.1), 100, true, &mut rng));

        let requests = spawner.tick(0.016, &mut rng);
        assert!(!requests.is_empty());
        assert!(!spawner.is_running());
        assert!(spawner.remaining_currency() <= 0.0);

        let entities: Vec<Entity> = (0..requests.len() as u32).map(Entity::from_raw).collect();
        for entity in &entities {
            spawner.register_spawned(*entity);
        }

        let (last, rest) = entities.split_last().unwrap();
        for entity in rest {
            assert_eq!(spawner.remove_enemy(*entity), Some(SpawnerNotice::EnemyDied));
        }
        assert_eq!(spawner.remove_enemy(*last), Some(SpawnerNotice::Depleted));
        assert_eq!(spawner.remove_enemy(*last), None);
    }

    #[test]
    fn spawns_wait_for_their_delay() {
        let mut spawner = spawner();
        let mut rng = StdRng::seed_from_u64(2);
        spawner.start_duration(1, (2.0, 2.0), 10.0, 1, &mut rng);

        assert_eq!(spawner.tick(0.0, &mut rng).len(), 1);
        assert!(spawner.tick(1.0, &mut rng).is_empty());
        assert_eq!(spawner.tick(1.0, &mut rng).len(), 1);
    }

    #[test]
    fn deactivate_forgets_everything() {
        let mut spawner = spawner();
        spawner.register_spawned(Entity::from_raw(1));
        assert_eq!(spawner.kill_all(), vec![Entity::from_raw(1)]);
        assert_eq!(spawner.deactivate_all(), vec![Entity::from_raw(1)]);
        assert!(spawner.is_depleted());
    }
}
