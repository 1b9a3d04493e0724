//! Rolling combo input history.

use bevy::prelude::*;

use super::combo::{is_in, is_potentially_in, longest_combo, ComboAction, ComboDefinition};

/// Delay before a non-attack input clears the history.
pub const NON_ATTACK_RESET_DELAY: f32 = 1.0;
/// Delay before the history clears once an attack ends.
pub const ATTACK_RESET_DELAY: f32 = 0.1;

/// Outcome of pushing one input.
#[derive(Debug, Clone, PartialEq)]
pub enum ComboResolution {
    /// A non-attack input was recorded
    Recorded,
    /// An attack input matched this combo
    Execute(ComboDefinition),
    /// An attack input matched nothing
    NoMatch,
}

/// Input history and combo candidates for one attacker.
#[derive(Component, Debug, Clone)]
pub struct ComboTracker {
    current_inputs: Vec<ComboAction>,
    /// Combos fully contained in the history
    potential: Vec<ComboDefinition>,
    /// Combos the history is still a prefix of
    predicted: Vec<ComboDefinition>,
    /// Set once the current attack may be chained into the next
    pub can_combo: bool,
    reset_timer: f32,
    enabled: bool,
}

impl Default for ComboTracker {
    fn default() -> Self {
        Self {
            current_inputs: Vec::new(),
            potential: Vec::new(),
            predicted: Vec::new(),
            can_combo: false,
            reset_timer: 0.0,
            enabled: true,
        }
    }
}

impl ComboTracker {
    pub fn current_inputs(&self) -> &[ComboAction] {
        &self.current_inputs
    }

    pub fn potential(&self) -> &[ComboDefinition] {
        &self.potential
    }

    pub fn predicted(&self) -> &[ComboDefinition] {
        &self.predicted
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.reset();
    }

    /// Record `action` against the combos currently available and resolve
    /// it. Attack inputs pick the longest combo found in the history.
    pub fn push(&mut self, action: ComboAction, combos: &[&ComboDefinition]) -> ComboResolution {
        self.current_inputs.push(action);
        self.regenerate(combos);

        if !action.is_attack() {
            self.schedule_reset(NON_ATTACK_RESET_DELAY);
        }

        // Never get stuck on a history nothing can complete
        if self.predicted.is_empty() {
            self.current_inputs.clear();
            self.current_inputs.push(action);
            self.regenerate(combos);
        }

        if !action.is_attack() {
            return ComboResolution::Recorded;
        }

        match longest_combo(&self.potential) {
            Some(combo) => ComboResolution::Execute(combo.clone()),
            None => ComboResolution::NoMatch,
        }
    }

    fn regenerate(&mut self, combos: &[&ComboDefinition]) {
        self.potential.clear();
        self.predicted.clear();

        for combo in combos {
            if is_in(&combo.inputs, &self.current_inputs) {
                self.potential.push((*combo).clone());
            }
            if is_potentially_in(&combo.inputs, &self.current_inputs) {
                self.predicted.push((*combo).clone());
            }
        }
    }

    pub fn schedule_reset(&mut self, delay: f32) {
        self.reset_timer = delay;
    }

    /// Count down a scheduled reset. Held while `hold` is set, so attacks and
    /// charges keep their history.
    pub fn tick(&mut self, delta: f32, hold: bool) {
        if self.reset_timer <= 0.0 || hold {
            return;
        }

        self.reset_timer -= delta;
        if self.reset_timer <= 0.0 {
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        self.reset_timer = 0.0;
        self.current_inputs.clear();
        self.potential.clear();
        self.predicted.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ComboAction::*;

    fn combos() -> Vec<ComboDefinition> {
        vec![
            ComboDefinition::new("a", &[Attack1]),
            ComboDefinition::new("b", &[Attack2]),
            ComboDefinition::new("ab", &[Attack1, Attack2]),
            ComboDefinition::new("abc", &[Attack1, Attack2, ChargedAttack1]),
            ComboDefinition::new("dash-a", &[Dash, Attack1]),
        ]
    }

    fn executed(resolution: ComboResolution) -> String {
        match resolution {
            ComboResolution::Execute(combo) => combo.name,
            other => panic!("expected a combo, got {:?}", other),
        }
    }

    #[test]
    fn shorter_exact_match_wins_until_longer_completes() {
        let combos = combos();
        let refs: Vec<_> = combos.iter().collect();
        let mut tracker = ComboTracker::default();

        assert_eq!(executed(tracker.push(Attack1, &refs)), "a");
        assert_eq!(executed(tracker.push(Attack2, &refs)), "ab");
        assert_eq!(executed(tracker.push(ChargedAttack1, &refs)), "abc");
    }

    #[test]
    fn dead_end_history_restarts_from_newest_input() {
        let combos = combos();
        let refs: Vec<_> = combos.iter().collect();
        let mut tracker = ComboTracker::default();

        tracker.push(Attack2, &refs);
        assert_eq!(executed(tracker.push(Attack1, &refs)), "a");
        assert_eq!(tracker.current_inputs(), &[Attack1]);
    }

    #[test]
    fn non_attack_inputs_record_and_reset_later() {
        let combos = combos();
        let refs: Vec<_> = combos.iter().collect();
        let mut tracker = ComboTracker::default();

        assert_eq!(tracker.push(Dash, &refs), ComboResolution::Recorded);
        assert_eq!(executed(tracker.push(Attack1, &refs)), "dash-a");

        tracker.push(Dash, &refs);
        tracker.tick(0.6, false);
        assert!(!tracker.current_inputs().is_empty());
        tracker.tick(0.5, false);
        assert!(tracker.current_inputs().is_empty());
    }

    #[test]
    fn reset_is_held_while_attacking() {
        let combos = combos();
        let refs: Vec<_> = combos.iter().collect();
        let mut tracker = ComboTracker::default();

        tracker.push(Dash, &refs);
        tracker.tick(5.0, true);
        assert_eq!(tracker.current_inputs(), &[Dash]);
    }

    #[test]
    fn attack_without_combos_matches_nothing() {
        let mut tracker = ComboTracker::default();
        assert_eq!(tracker.push(Attack1, &[]), ComboResolution::NoMatch);
    }

    #[test]
    fn disable_clears_history() {
        let combos = combos();
        let refs: Vec<_> = combos.iter().collect();
        let mut tracker = ComboTracker::default();

        tracker.push(Attack1, &refs);
        tracker.disable();
        assert!(!tracker.is_enabled());
        assert!(tracker.current_inputs().is_empty());
    }
}
