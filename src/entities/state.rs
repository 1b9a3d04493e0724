//! The per-entity state machine.
//!
//! Every actor has exactly one current [`EntityState`]. States carry their own
//! per-activation data (timers, remembered targets), so entering a state means
//! constructing a fresh value. All transitions go through
//! [`StateMachine::change_state`].

use bevy::prelude::*;

use crate::enemies::{ChargerState, GruntState, LeaperState};
use crate::player::{AbilityCancel, PlayerState};

/// How long a staggered entity is interrupted.
pub const STAGGER_DURATION: f32 = 0.5;
/// Time between dying and despawning.
pub const DEATH_DURATION: f32 = 1.0;
/// Time a freshly spawned entity stays inert.
pub const SPAWN_DURATION: f32 = 1.5;

/// Behaviour state of an actor.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityState {
    /// Does nothing. Entities start here until told otherwise.
    Empty,
    Spawn {
        elapsed: f32,
    },
    Staggered {
        elapsed: f32,
    },
    Stunned {
        remaining: f32,
        stunner: Option<Entity>,
    },
    Launch {
        direction: Vec3,
        force: f32,
        stun_duration: f32,
        elapsed: f32,
    },
    /// Terminal. Nothing leaves this state.
    Death {
        elapsed: f32,
        finished: bool,
    },
    Player(PlayerState),
    Leaper(LeaperState),
    Grunt(GruntState),
    Charger(ChargerState),
}

/// Data-free name of a state, for comparisons and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateLabel {
    Empty,
    Spawn,
    Staggered,
    Stunned,
    Launch,
    Death,
    Idle,
    Walk,
    Jump,
    Fall,
    Dash,
    Slide,
    Charge,
    Attack,
    Ability,
    Wander,
    Chase,
    ReadyAttack,
    Leap,
    GruntIdle,
    GruntChase,
    GruntAttack,
    ChargerBrace,
    Charging,
    WindDown,
    Dazed,
    Jab,
    JabRecover,
}

impl EntityState {
    pub fn spawn() -> Self {
        EntityState::Spawn { elapsed: 0.0 }
    }

    pub fn staggered() -> Self {
        EntityState::Staggered { elapsed: 0.0 }
    }

    pub fn death() -> Self {
        EntityState::Death {
            elapsed: 0.0,
            finished: false,
        }
    }

    pub fn label(&self) -> StateLabel {
        match self {
            EntityState::Empty => StateLabel::Empty,
            EntityState::Spawn { .. } => StateLabel::Spawn,
            EntityState::Staggered { .. } => StateLabel::Staggered,
            EntityState::Stunned { .. } => StateLabel::Stunned,
            EntityState::Launch { .. } => StateLabel::Launch,
            EntityState::Death { .. } => StateLabel::Death,
            EntityState::Player(state) => state.label(),
            EntityState::Leaper(state) => state.label(),
            EntityState::Grunt(state) => state.label(),
            EntityState::Charger(state) => state.label(),
        }
    }

    /// Two states are "the same" when they are the same kind of state,
    /// whatever their per-activation data.
    pub fn same_kind(&self, other: &EntityState) -> bool {
        self.label() == other.label()
    }

    pub fn is_death(&self) -> bool {
        matches!(self, EntityState::Death { .. })
    }
}

/// A state change that happened this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: StateLabel,
    pub to: StateLabel,
}

/// Sent for every state change, after the fact.
#[derive(Event, Debug, Clone)]
pub struct StateChangedEvent {
    pub entity: Entity,
    pub from: StateLabel,
    pub to: StateLabel,
}

/// Current, previous and default state of an actor.
#[derive(Component, Debug, Clone)]
pub struct StateMachine {
    current: EntityState,
    previous: EntityState,
    default: EntityState,
    pending: Vec<StateTransition>,
}

impl StateMachine {
    pub fn new(initial: EntityState, default: EntityState) -> Self {
        Self {
            current: initial,
            previous: EntityState::Empty,
            default,
            pending: Vec::new(),
        }
    }

    pub fn current(&self) -> &EntityState {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut EntityState {
        &mut self.current
    }

    pub fn previous(&self) -> &EntityState {
        &self.previous
    }

    pub fn default_state(&self) -> &EntityState {
        &self.default
    }

    pub fn label(&self) -> StateLabel {
        self.current.label()
    }

    pub fn is_dead(&self) -> bool {
        self.current.is_death()
    }

    pub fn is_in(&self, label: StateLabel) -> bool {
        self.current.label() == label
    }

    /// Transition to `next`.
    ///
    /// Refused when already dead, when `next` is the current kind of state
    /// and `force` is false, or when the player is mid-ability and the
    /// ability doesn't allow being cancelled into `next`. Death always goes
    /// through. Returns whether the state changed.
    pub fn change_state(&mut self, next: EntityState, force: bool) -> bool {
        if self.current.is_death() {
            return false;
        }

        if !force && self.current.same_kind(&next) {
            return false;
        }

        if let EntityState::Player(PlayerState::Ability { cancel, .. }) = &self.current {
            if !next.is_death() && !cancel.allows(&next, &self.default) {
                return false;
            }
        }

        let transition = StateTransition {
            from: self.current.label(),
            to: next.label(),
        };
        self.previous = std::mem::replace(&mut self.current, next);
        self.pending.push(transition);
        true
    }

    /// Return to the default state.
    pub fn to_default(&mut self, force: bool) -> bool {
        let default = self.default.clone();
        self.change_state(default, force)
    }

    /// Take the transitions recorded since the last drain.
    pub fn drain_transitions(&mut self) -> Vec<StateTransition> {
        std::mem::take(&mut self.pending)
    }
}
