//! # Field Module
//!
//! Uniform gravitational field acting on the neutrons.
//!
//! a = g·ĝ

use crate::constants::G_STANDARD;
use crate::types::Vec3;

/// Constant global acceleration; immutable once a run starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravField {
    direction: Vec3,
    magnitude: f64,
}

impl GravField {
    /// Field along `direction` (normalised here) with `magnitude` in m/s²
    pub fn new(direction: Vec3, magnitude: f64) -> Self {
        let direction = direction.normalize();
        let magnitude = if direction == Vec3::zero() { 0.0 } else { magnitude };
        Self { direction, magnitude }
    }

    /// Standard gravity along -z
    pub fn earth() -> Self {
        Self::new(Vec3::new(0.0, 0.0, -1.0), G_STANDARD)
    }

    /// No field at all
    pub fn off() -> Self {
        Self::new(Vec3::new(0.0, 0.0, -1.0), 0.0)
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn is_off(&self) -> bool {
        self.magnitude == 0.0
    }

    /// Acceleration vector (m/s²)
    pub fn acceleration(&self) -> Vec3 {
        self.direction * self.magnitude
    }
}

impl Default for GravField {
    fn default() -> Self {
        Self::earth()
    }
}
