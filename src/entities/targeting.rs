//! Target queries over actor positions.

use bevy::prelude::*;

use super::components::Team;

/// Default radius for picking up nearby hostile targets.
pub const TARGET_DETECTION_RADIUS: f32 = 10.0;

/// A live actor that could be targeted.
#[derive(Debug, Clone, Copy)]
pub struct TargetCandidate {
    pub entity: Entity,
    pub position: Vec3,
    pub team: Team,
}

/// Hostile candidates within `radius` of `origin`, nearest first.
pub fn nearby_targets(
    origin: Vec3,
    team: Team,
    radius: f32,
    candidates: impl IntoIterator<Item = TargetCandidate>,
) -> Vec<(Entity, f32)> {
    let mut targets: Vec<(Entity, f32)> = candidates
        .into_iter()
        .filter(|candidate| candidate.team != team)
        .map(|candidate| (candidate.entity, candidate.position.distance(origin)))
        .filter(|(_, distance)| *distance <= radius)
        .collect();

    targets.sort_by(|a, b| a.1.total_cmp(&b.1));
    targets
}

/// Candidates of `team` within `radius` of `center`, excluding `exclude`.
pub fn allies_in_radius(
    center: Vec3,
    radius: f32,
    team: Team,
    exclude: Entity,
    candidates: impl IntoIterator<Item = TargetCandidate>,
) -> Vec<TargetCandidate> {
    let mut allies: Vec<TargetCandidate> = candidates
        .into_iter()
        .filter(|c| c.entity != exclude && c.team == team)
        .filter(|c| c.position.distance(center) <= radius)
        .collect();

    allies.sort_by(|a, b| {
        a.position
            .distance(center)
            .total_cmp(&b.position.distance(center))
    });
    allies
}

/// Whether `point` lies inside a horizontal view cone.
pub fn in_view_cone(
    origin: Vec3,
    forward: Vec3,
    point: Vec3,
    max_distance: f32,
    half_angle_degrees: f32,
) -> bool {
    let offset = point - origin;
    if offset.length() > max_distance {
        return false;
    }

    let flat_offset = Vec3::new(offset.x, 0.0, offset.z);
    let flat_forward = Vec3::new(forward.x, 0.0, forward.z);
    if flat_offset.length_squared() < f32::EPSILON {
        return true;
    }
    if flat_forward.length_squared() < f32::EPSILON {
        return false;
    }

    flat_forward.angle_between(flat_offset).to_degrees() <= half_angle_degrees
}

/// Horizontal distance, ignoring height differences.
pub fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    Vec3::new(a.x - b.x, 0.0, a.z - b.z).length()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ENEMY_TEAM, PLAYER_TEAM};

    fn candidate(index: u32, x: f32, team: Team) -> TargetCandidate {
        TargetCandidate {
            entity: Entity::from_raw(index),
            position: Vec3::new(x, 0.0, 0.0),
            team,
        }
    }

    #[test]
    fn nearby_targets_skip_own_team_and_sort_by_distance() {
        let candidates = [
            candidate(1, 8.0, ENEMY_TEAM),
            candidate(2, 2.0, ENEMY_TEAM),
            candidate(3, 1.0, PLAYER_TEAM),
            candidate(4, 30.0, ENEMY_TEAM),
        ];

        let targets = nearby_targets(Vec3::ZERO, PLAYER_TEAM, TARGET_DETECTION_RADIUS, candidates);
        let entities: Vec<_> = targets.iter().map(|(e, _)| e.index()).collect();
        assert_eq!(entities, vec![2, 1]);
    }

    #[test]
    fn allies_exclude_the_center_entity() {
        let candidates = [
            candidate(1, 0.0, ENEMY_TEAM),
            candidate(2, 3.0, ENEMY_TEAM),
            candidate(3, 1.0, ENEMY_TEAM),
            candidate(4, 1.0, PLAYER_TEAM),
        ];

        let allies = allies_in_radius(Vec3::ZERO, 5.0, ENEMY_TEAM, Entity::from_raw(1), candidates);
        let entities: Vec<_> = allies.iter().map(|c| c.entity.index()).collect();
        assert_eq!(entities, vec![3, 2]);
    }

    #[test]
    fn view_cone_checks_angle_and_distance() {
        let forward = Vec3::Z;
        assert!(in_view_cone(Vec3::ZERO, forward, Vec3::new(0.0, 0.0, 10.0), 15.0, 40.0));
        assert!(in_view_cone(Vec3::ZERO, forward, Vec3::new(3.0, 0.0, 10.0), 15.0, 40.0));
        assert!(!in_view_cone(Vec3::ZERO, forward, Vec3::new(10.0, 0.0, 1.0), 15.0, 40.0));
        assert!(!in_view_cone(Vec3::ZERO, forward, Vec3::new(0.0, 0.0, 20.0), 15.0, 40.0));
    }
}
