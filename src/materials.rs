//! # UCN Materials Database
//!
//! Wall, detector and bulk media seen by ultra-cold neutrons.
//!
//! A UCN is totally reflected by a surface whenever the kinetic energy
//! associated with its motion perpendicular to that surface is below the
//! material's Fermi pseudo-potential V_F. Each reflection carries a small
//! probability of capture or upscattering, parametrised by the loss factor
//! η = W/V_F (imaginary over real part of the potential).
//!
//! ## Loss per bounce
//!
//! μ(E⊥) = 2η·√(E⊥ / (V_F - E⊥))   for E⊥ < V_F
//!
//! ## References
//!
//! [1] Golub, Richardson, Lamoreaux. "Ultra-Cold Neutrons", Adam Hilger, 1991
//! [2] Ignatovich, V.K. "The Physics of Ultracold Neutrons", Clarendon, 1990

use std::fmt;

use crate::constants::NEV;

/// How a medium interacts with a particle arriving at its surface
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaterialKind {
    /// Medium the particle propagates through (vacuum, gas)
    Tracking,
    /// Reflecting wall with losses
    Boundary,
    /// Wall that detects with a given efficiency, reflects otherwise
    Detector,
    /// Perfect absorber, the particle is lost on contact
    BlackHole,
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaterialKind::Tracking => write!(f, "Tracking"),
            MaterialKind::Boundary => write!(f, "Boundary"),
            MaterialKind::Detector => write!(f, "Detector"),
            MaterialKind::BlackHole => write!(f, "Black Hole"),
        }
    }
}

/// Surface properties of a medium
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Unique identifier
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Interaction class
    pub kind: MaterialKind,
    /// Fermi pseudo-potential V_F [eV]
    pub fermi_potential: f64,
    /// Loss factor η = W/V_F
    pub loss_factor: f64,
    /// Probability of detection on contact (detectors only)
    pub detection_efficiency: f64,
    /// Diffuse-reflection coefficient; diffuse probability is roughness·E⊥/V_F
    pub roughness: f64,
}

impl Material {
    /// Propagation medium
    pub const fn tracking(id: &'static str, name: &'static str) -> Self {
        Self {
            id,
            name,
            kind: MaterialKind::Tracking,
            fermi_potential: 0.0,
            loss_factor: 0.0,
            detection_efficiency: 0.0,
            roughness: 0.0,
        }
    }

    /// Reflecting wall
    pub const fn boundary(
        id: &'static str,
        name: &'static str,
        fermi_potential: f64,
        loss_factor: f64,
        roughness: f64,
    ) -> Self {
        Self {
            id,
            name,
            kind: MaterialKind::Boundary,
            fermi_potential,
            loss_factor,
            detection_efficiency: 0.0,
            roughness,
        }
    }

    /// Detecting wall; undetected particles see an ordinary boundary
    pub const fn detector(
        id: &'static str,
        name: &'static str,
        detection_efficiency: f64,
        fermi_potential: f64,
        loss_factor: f64,
        roughness: f64,
    ) -> Self {
        Self {
            id,
            name,
            kind: MaterialKind::Detector,
            fermi_potential,
            loss_factor,
            detection_efficiency,
            roughness,
        }
    }

    /// Perfect absorber
    pub const fn black_hole(id: &'static str, name: &'static str) -> Self {
        Self {
            id,
            name,
            kind: MaterialKind::BlackHole,
            fermi_potential: 0.0,
            loss_factor: 0.0,
            detection_efficiency: 0.0,
            roughness: 0.0,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.kind == MaterialKind::Tracking
    }

    /// Capture probability for a reflection with perpendicular energy `e_perp` [eV]
    ///
    /// Returns 1 when the particle is above the Fermi potential.
    pub fn loss_probability(&self, e_perp: f64) -> f64 {
        if e_perp >= self.fermi_potential {
            return 1.0;
        }
        if self.loss_factor == 0.0 {
            return 0.0;
        }
        let ratio = e_perp / (self.fermi_potential - e_perp);
        (2.0 * self.loss_factor * ratio.sqrt()).min(1.0)
    }

    /// Probability that a surviving reflection is diffuse
    pub fn diffuse_probability(&self, e_perp: f64) -> f64 {
        if self.fermi_potential <= 0.0 {
            return 0.0;
        }
        (self.roughness * e_perp / self.fermi_potential).clamp(0.0, 1.0)
    }

    /// Validate the physical ranges of all coefficients
    pub fn validate(&self) -> Result<(), String> {
        let unit = |v: f64| (0.0..=1.0).contains(&v);
        if !self.fermi_potential.is_finite() {
            return Err(format!("{}: Fermi potential must be finite", self.id));
        }
        if !(self.loss_factor >= 0.0 && self.loss_factor.is_finite()) {
            return Err(format!("{}: loss factor must be non-negative", self.id));
        }
        if !unit(self.detection_efficiency) {
            return Err(format!("{}: detection efficiency must lie in [0, 1]", self.id));
        }
        if !unit(self.roughness) {
            return Err(format!("{}: roughness must lie in [0, 1]", self.id));
        }
        Ok(())
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] V_F = {:.1} neV, η = {:.1e}",
            self.name,
            self.kind,
            self.fermi_potential / NEV,
            self.loss_factor
        )
    }
}

// ============================================================================
// PROPAGATION MEDIA
// ============================================================================

pub const VACUUM: Material = Material::tracking("vacuum", "Vacuum");

// ============================================================================
// WALL MATERIALS
// ============================================================================

pub const STAINLESS_STEEL: Material =
    Material::boundary("stainless_steel", "Stainless Steel", 188.0 * NEV, 1.0e-4, 0.05);

pub const BERYLLIUM: Material = Material::boundary("beryllium", "Beryllium", 252.0 * NEV, 3.0e-5, 0.02);

pub const NICKEL_58: Material = Material::boundary("nickel_58", "Nickel-58", 335.0 * NEV, 8.6e-5, 0.03);

/// Diamond-like carbon coating
pub const DLC: Material = Material::boundary("dlc", "Diamond-Like Carbon", 270.0 * NEV, 2.0e-4, 0.02);

pub const COPPER: Material = Material::boundary("copper", "Copper", 168.0 * NEV, 2.0e-4, 0.05);

pub const ALUMINIUM: Material = Material::boundary("aluminium", "Aluminium", 54.0 * NEV, 3.0e-5, 0.05);

pub const QUARTZ: Material = Material::boundary("quartz", "Quartz Glass", 90.0 * NEV, 1.0e-4, 0.01);

/// Idealised loss-free specular mirror
pub const PERFECT_MIRROR: Material = Material::boundary("perfect_mirror", "Perfect Mirror", 1.0, 0.0, 0.0);

// ============================================================================
// DETECTORS AND ABSORBERS
// ============================================================================

/// Aluminium-windowed counter
pub const DETECTOR_WINDOW: Material =
    Material::detector("detector_window", "Detector Window", 0.9, 54.0 * NEV, 3.0e-5, 0.05);

pub const BLACK_HOLE: Material = Material::black_hole("black_hole", "Black Hole");

pub const ALL_MATERIALS: &[&Material] = &[
    &VACUUM,
    &STAINLESS_STEEL,
    &BERYLLIUM,
    &NICKEL_58,
    &DLC,
    &COPPER,
    &ALUMINIUM,
    &QUARTZ,
    &PERFECT_MIRROR,
    &DETECTOR_WINDOW,
    &BLACK_HOLE,
];

/// Get material by ID
pub fn get_material(id: &str) -> Option<&'static Material> {
    ALL_MATERIALS.iter().find(|m| m.id == id).copied()
}

// ============================================================================
// TESTS
// ============================================================================
