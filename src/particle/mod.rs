//! # Particle Module
//!
//! Ultra-cold neutron state and its life-cycle.
//!
//! ## State machine
//!
//! ```text
//!                 ┌──► Decayed
//!                 ├──► Absorbed
//!   Propagating ──┼──► Detected
//!                 ├──► Lost
//!                 └──► Bad       (unrecoverable navigation failure)
//! ```
//!
//! Every state other than `Propagating` is terminal and absorbs all further
//! events. Reaching the end of the run leaves a particle `Propagating`.

use std::fmt;

use crate::constants::kinetic_energy;
use crate::geometry::NodeId;
use crate::parabola;
use crate::types::Vec3;

// ============================================================================
// STATE MACHINE
// ============================================================================

/// Life-cycle state of a particle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Propagating,
    Decayed,
    Absorbed,
    Detected,
    Lost,
    Bad,
}

impl State {
    pub const ALL: [State; 6] = [
        State::Propagating,
        State::Decayed,
        State::Absorbed,
        State::Detected,
        State::Lost,
        State::Bad,
    ];

    pub fn is_terminal(&self) -> bool {
        *self != State::Propagating
    }

    pub fn name(&self) -> &'static str {
        match self {
            State::Propagating => "propagating",
            State::Decayed => "decayed",
            State::Absorbed => "absorbed",
            State::Detected => "detected",
            State::Lost => "lost",
            State::Bad => "bad",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Something that happened to a propagating particle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Decay,
    Absorb,
    Detect,
    Lose,
    Fail,
}

/// Pure transition function; terminal states absorb every event
pub fn transition(state: State, event: Event) -> State {
    if state.is_terminal() {
        return state;
    }
    match event {
        Event::Decay => State::Decayed,
        Event::Absorb => State::Absorbed,
        Event::Detect => State::Detected,
        Event::Lose => State::Lost,
        Event::Fail => State::Bad,
    }
}

// ============================================================================
// PARTICLE
// ============================================================================

/// Reflection tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BounceCounts {
    pub specular: u64,
    pub diffuse: u64,
}

impl BounceCounts {
    pub fn total(&self) -> u64 {
        self.specular + self.diffuse
    }
}

/// An ultra-cold neutron
#[derive(Debug, Clone)]
pub struct Particle {
    /// Index within its batch
    pub id: usize,
    /// Position (m)
    pub position: Vec3,
    /// Velocity (m/s)
    pub velocity: Vec3,
    /// Elapsed time (s)
    pub time: f64,
    /// Path length travelled (m)
    pub distance: f64,
    /// Volume currently containing the particle; `None` outside the world
    pub node: Option<NodeId>,
    /// Set while the particle sits on the boundary it just crossed
    pub on_boundary: bool,
    pub bounces: BounceCounts,
    /// Seed of the generator driving this particle's history
    pub seed: u64,
    pub state: State,
    /// Initial conditions, kept for replay
    initial: (Vec3, Vec3),
}

impl Particle {
    /// Create new particle
    pub fn new(id: usize, position: Vec3, velocity: Vec3) -> Self {
        Self {
            id,
            position,
            velocity,
            time: 0.0,
            distance: 0.0,
            node: None,
            on_boundary: false,
            bounces: BounceCounts::default(),
            seed: 0,
            state: State::Propagating,
            initial: (position, velocity),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fresh copy in the initial state, same seed
    pub fn reset(&self) -> Self {
        Self::new(self.id, self.initial.0, self.initial.1).with_seed(self.seed)
    }

    pub fn initial_position(&self) -> Vec3 {
        self.initial.0
    }

    pub fn speed(&self) -> f64 {
        self.velocity.mag()
    }

    /// Unit direction of motion
    pub fn direction(&self) -> Vec3 {
        self.velocity.normalize()
    }

    /// Replace the direction, keeping the speed
    pub fn set_direction(&mut self, dir: Vec3) {
        self.velocity = dir.normalize() * self.speed();
    }

    /// Kinetic energy (eV)
    pub fn kinetic_energy(&self) -> f64 {
        kinetic_energy(self.speed())
    }

    /// Advance along the parabola for `t` seconds under acceleration `field`
    pub fn advance(&mut self, t: f64, field: &Vec3) {
        self.distance += parabola::arc_length(&self.velocity, field, t);
        self.position = parabola::position_at(&self.position, &self.velocity, field, t);
        self.velocity = parabola::velocity_at(&self.velocity, field, t);
        self.time += t;
    }

    /// Apply an event to the life-cycle state
    pub fn apply(&mut self, event: Event) -> State {
        self.state = transition(self.state, event);
        self.state
    }
}

impl fmt::Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UCN {} [{}] t = {:.4} s, x = {}, |v| = {:.4} m/s, bounces = {}",
            self.id,
            self.state,
            self.time,
            self.position,
            self.speed(),
            self.bounces.total()
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
