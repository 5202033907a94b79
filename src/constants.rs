//! # Physical Constants
//!
//! Constants in SI units unless noted. Energies are carried in eV, so the
//! neutron mass is given in eV/c² divided by c², which makes ½·m·v² come out
//! directly in eV for v in m/s.

// ============================================================================
// FUNDAMENTAL CONSTANTS
// ============================================================================

/// Speed of light (m/s)
pub const C: f64 = 299_792_458.0;

/// Standard gravitational acceleration (m/s²)
pub const G_STANDARD: f64 = 9.806_65;

/// Neutron rest energy (eV)
pub const NEUTRON_REST_ENERGY_EV: f64 = 939.565_63e6;

/// Neutron mass (eV·s²/m²), i.e. rest energy / c²
pub const NEUTRON_MASS_EV: f64 = NEUTRON_REST_ENERGY_EV / (C * C);

/// Neutron mean lifetime (s)
pub const NEUTRON_LIFETIME: f64 = 885.7;

// ============================================================================
// UNITS
// ============================================================================

/// Nano-electronvolt in eV
pub const NEV: f64 = 1e-9;

/// Centimetre in m
pub const CM: f64 = 1e-2;

// ============================================================================
// NUMERICAL TOLERANCES
// ============================================================================

/// Geometric boundary tolerance (m, s)
pub const TOLERANCE: f64 = 1e-10;

/// Polynomial coefficients smaller than this are treated as zero
pub const COEFF_TOLERANCE: f64 = 1e-9;

/// Roots closer than this to zero are suspected to be the surface just left (s)
pub const ROOT_SNAP: f64 = 1e-8;

/// Corrective micro-step used during relocation (m)
pub const RELOCATION_STEP: f64 = 1e-10;

/// Maximum corrective micro-steps during relocation
pub const MAX_RELOCATION_STEPS: usize = 100;

/// Smallest |dir·n| accepted for a reflected direction
pub const TANGENT_TOLERANCE: f64 = 1e-6;

// ============================================================================
// DERIVED QUANTITIES
// ============================================================================

/// Kinetic energy (eV) of a neutron moving at `speed` (m/s)
#[inline]
pub fn kinetic_energy(speed: f64) -> f64 {
    0.5 * NEUTRON_MASS_EV * speed * speed
}

/// Speed (m/s) of a neutron with kinetic energy `energy` (eV)
#[inline]
pub fn speed_from_energy(energy: f64) -> f64 {
    (2.0 * energy.max(0.0) / NEUTRON_MASS_EV).sqrt()
}

// ============================================================================
// TESTS
// ============================================================================
