//! Combo definitions and the matching rules used to resolve them.

use serde::Deserialize;

/// Discrete input token fed to the combo tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ComboAction {
    Attack1,
    Attack2,
    ChargedAttack1,
    ChargedAttack2,
    Dash,
    Jump,
}

impl ComboAction {
    pub fn is_attack(self) -> bool {
        matches!(
            self,
            ComboAction::Attack1
                | ComboAction::Attack2
                | ComboAction::ChargedAttack1
                | ComboAction::ChargedAttack2
        )
    }
}

/// An input sequence bound to an attack and its hit parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ComboDefinition {
    pub name: String,
    pub description: String,
    pub inputs: Vec<ComboAction>,
    /// Length of the attack at speed 1, in seconds
    pub clip_duration: f32,
    /// Playback speed, clamped to 0.25..=5
    pub clip_speed: f32,
    pub root_motion: bool,
    /// Only available while airborne
    pub air_combo: bool,
    pub damage_multiplier: f32,
    /// Grounded victims get launched
    pub launch_upwards: bool,
    pub air_launch_force: f32,
    pub stun: bool,
    pub stun_duration: f32,
    pub impact_time_scale: f32,
    pub impact_duration: f32,
    pub weapon_scale: f32,
    pub weapon_scale_duration: f32,
    pub hit_radius: f32,
    /// Distance in front of the attacker where the hit lands
    pub hit_reach: f32,
}

impl Default for ComboDefinition {
    fn default() -> Self {
        Self {
            name: "Combo".to_string(),
            description: String::new(),
            inputs: Vec::new(),
            clip_duration: 0.6,
            clip_speed: 1.0,
            root_motion: true,
            air_combo: false,
            damage_multiplier: 1.0,
            launch_upwards: false,
            air_launch_force: 0.0,
            stun: false,
            stun_duration: 0.0,
            impact_time_scale: 0.05,
            impact_duration: 0.25,
            weapon_scale: 1.0,
            weapon_scale_duration: 0.1,
            hit_radius: 1.5,
            hit_reach: 1.25,
        }
    }
}

impl ComboDefinition {
    pub fn new(name: &str, inputs: &[ComboAction]) -> Self {
        Self {
            name: name.to_string(),
            inputs: inputs.to_vec(),
            ..Default::default()
        }
    }

    /// Whether the combo is finished by a charged release.
    pub fn is_charged(&self) -> bool {
        self.inputs.iter().any(|action| {
            matches!(action, ComboAction::ChargedAttack1 | ComboAction::ChargedAttack2)
        })
    }

    pub fn airborne(mut self) -> Self {
        self.air_combo = true;
        self
    }

    /// Seconds the attack lasts at normal time scale.
    pub fn duration(&self) -> f32 {
        self.clip_duration / self.clip_speed.clamp(0.25, 5.0)
    }
}

/// Whether `given` appears as a contiguous run inside `other`.
pub fn is_in(given: &[ComboAction], other: &[ComboAction]) -> bool {
    if given.len() > other.len() {
        return false;
    }
    if given.is_empty() {
        return !other.is_empty();
    }

    other.windows(given.len()).any(|window| window == given)
}

/// Whether `other` could still grow into `given`, i.e. `other` is a prefix
/// of `given`.
pub fn is_potentially_in(given: &[ComboAction], other: &[ComboAction]) -> bool {
    if other.len() > given.len() {
        return false;
    }

    is_in(&given[..other.len()], other)
}

/// The combo with the most inputs. The first one wins a tie.
pub fn longest_combo<'a>(
    combos: impl IntoIterator<Item = &'a ComboDefinition>,
) -> Option<&'a ComboDefinition> {
    combos.into_iter().fold(None, |longest, combo| match longest {
        Some(current) if combo.inputs.len() <= current.inputs.len() => Some(current),
        _ => Some(combo),
    })
}

/// The combo made of just `action`, if there is one.
pub fn single_action_combo<'a>(
    combos: impl IntoIterator<Item = &'a ComboDefinition>,
    action: ComboAction,
) -> Option<&'a ComboDefinition> {
    combos
        .into_iter()
        .find(|combo| combo.inputs.len() == 1 && combo.inputs[0] == action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ComboAction::*;

    #[test]
    fn is_in_matches_contiguous_runs() {
        assert!(is_in(&[Attack1, Attack2], &[Attack1, Attack2]));
        assert!(is_in(&[Attack2], &[Attack1, Attack2]));
        assert!(is_in(&[Attack2, Attack1], &[Jump, Attack2, Attack1]));
        assert!(!is_in(&[Attack1, Attack1], &[Attack1, Attack2, Attack1]));
        assert!(!is_in(&[Attack1, Attack2, Jump], &[Attack1, Attack2]));
    }

    #[test]
    fn potentially_in_requires_a_prefix() {
        let combo = [Attack1, Attack1, Attack2];
        assert!(is_potentially_in(&combo, &[Attack1]));
        assert!(is_potentially_in(&combo, &[Attack1, Attack1]));
        assert!(!is_potentially_in(&combo, &[Attack1, Attack2]));
        assert!(!is_potentially_in(&combo, &[Attack1, Attack1, Attack2, Attack1]));
    }

    #[test]
    fn longest_combo_prefers_first_on_tie() {
        let combos = [
            ComboDefinition::new("a", &[Attack1]),
            ComboDefinition::new("ab", &[Attack1, Attack2]),
            ComboDefinition::new("ba", &[Attack2, Attack1]),
        ];
        assert_eq!(longest_combo(&combos).unwrap().name, "ab");
        assert!(longest_combo(&Vec::<ComboDefinition>::new()).is_none());
    }

    #[test]
    fn single_action_combo_ignores_longer_ones() {
        let combos = [
            ComboDefinition::new("ab", &[Attack1, Attack2]),
            ComboDefinition::new("b", &[Attack2]),
        ];
        assert_eq!(single_action_combo(&combos, Attack2).unwrap().name, "b");
        assert!(single_action_combo(&combos, Attack1).is_none());
    }

    #[test]
    fn duration_clamps_speed() {
        let mut combo = ComboDefinition::new("slow", &[Attack1]);
        combo.clip_duration = 1.0;
        combo.clip_speed = 0.0;
        assert_eq!(combo.duration(), 4.0);
        combo.clip_speed = 2.0;
        assert_eq!(combo.duration(), 0.5);
    }
}
