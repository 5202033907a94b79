//! # UCNSIM-RS
//!
//! Ultra-Cold Neutron Trajectory Simulator
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                          UCNSIM-RS                                          │
//! │             Parabolic UCN transport through nested volumes                  │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │  LEVEL 1: NUMERICS   polynomial roots (≤ quartic), parabola arc length      │
//! │  LEVEL 2: GEOMETRY   box/tube boundary times, transforms, volume tree       │
//! │  LEVEL 3: NAVIGATION exit-vs-enter ordering, relocation, normals            │
//! │  LEVEL 4: PHYSICS    Fermi potential, wall losses, Lambert reflection       │
//! │  LEVEL 5: RUN        state machine, batch driver, sources, observers        │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Trajectories are exact under a constant acceleration: every boundary time
//! is the smallest positive root of a polynomial in t, never the result of
//! small straight-line steps.

pub mod constants;
pub mod types;
pub mod error;
pub mod stochastic;
pub mod polynomial;
pub mod parabola;
pub mod geometry;
pub mod materials;
pub mod field;
pub mod particle;
pub mod navigator;
pub mod bounce;
pub mod simulator;

// Re-exports
pub use constants::*;
pub use types::*;
pub use error::{ConfigError, GeometryError, NavigationError, ShapeError};
pub use field::GravField;
pub use geometry::{GeometryBuilder, GeometryTree, NodeId, Shape, Transform};
pub use materials::{Material, MaterialKind};
pub use navigator::{Navigator, StepResult};
pub use particle::{Particle, State};
pub use simulator::{BatchResult, Run, RunConfig, RunStats};

/// UCNSIM version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Information about the simulator
pub fn info() -> String {
    format!(
        "UCNSIM-RS v{}\n\
         Ultra-Cold Neutron Trajectory Simulator\n\
         Exact parabolic tracking through nested volumes",
        VERSION
    )
}
