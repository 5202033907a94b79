//! # Bounce Module
//!
//! Interaction of a UCN with the surface of a non-tracking medium.
//!
//! ## Decision chain
//!
//! ```text
//!   BlackHole ─────────────────────────────► Lost
//!   Detector ── u < ε ─────────────────────► Detected
//!       │ otherwise
//!       ▼
//!   Boundary ── E⊥ ≥ V_F ──────────────────► Absorbed
//!       │  ── u < 2η·√(E⊥/(V_F − E⊥)) ─────► Absorbed
//!       │ otherwise
//!       ▼
//!   reflect: diffuse with probability roughness·E⊥/V_F, else specular
//! ```
//!
//! E⊥ = E·(n̂·d̂)² is the kinetic energy of the motion normal to the wall.
//!
//! Diffuse reflection follows Lambert's cosine law: cos²θ is uniform, with θ
//! measured from the normal. A cap of 0.499 on the uniform draw keeps the
//! new direction away from grazing. A specular reflection of a grazing
//! particle is tilted off the wall by the same tangent tolerance.

use std::f64::consts::PI;

use crate::constants::TANGENT_TOLERANCE;
use crate::materials::{Material, MaterialKind};
use crate::particle::Particle;
use crate::stochastic::RandomGenerator;
use crate::types::Vec3;

/// Upper bound of the uniform draw behind the diffuse polar angle
const DIFFUSE_DRAW_MAX: f64 = 0.499;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BounceKind {
    Specular,
    Diffuse,
}

/// Result of a surface interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BounceOutcome {
    /// Direction changed, particle continues
    Reflected(BounceKind),
    Absorbed,
    Detected,
    Lost,
    /// The medium is a tracking medium; nothing happens at its surface
    Transmitted,
}

/// Surface physics shared by all walls in a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BounceModel {
    /// Apply the η-based loss probability on reflections
    pub wall_losses: bool,
}

impl Default for BounceModel {
    fn default() -> Self {
        Self { wall_losses: true }
    }
}

impl BounceModel {
    pub fn new(wall_losses: bool) -> Self {
        Self { wall_losses }
    }

    /// Resolve the particle hitting `material` across a surface with global `normal`
    ///
    /// On reflection the particle's direction is updated in place and its
    /// bounce counters incremented; speed and position are untouched.
    pub fn interact(
        &self,
        material: &Material,
        particle: &mut Particle,
        normal: &Vec3,
        rng: &mut RandomGenerator,
    ) -> BounceOutcome {
        match material.kind {
            MaterialKind::Tracking => BounceOutcome::Transmitted,
            MaterialKind::BlackHole => BounceOutcome::Lost,
            MaterialKind::Detector => {
                if rng.uniform() < material.detection_efficiency {
                    BounceOutcome::Detected
                } else {
                    self.wall(material, particle, normal, rng)
                }
            }
            MaterialKind::Boundary => self.wall(material, particle, normal, rng),
        }
    }

    fn wall(&self, material: &Material, particle: &mut Particle, normal: &Vec3, rng: &mut RandomGenerator) -> BounceOutcome {
        let dir = particle.direction();
        let e_perp = perpendicular_energy(particle, normal);

        if e_perp >= material.fermi_potential {
            return BounceOutcome::Absorbed;
        }
        if self.wall_losses {
            let p = material.loss_probability(e_perp);
            if p > 0.0 && rng.uniform() < p {
                return BounceOutcome::Absorbed;
            }
        }

        // Normal facing back into the volume the particle came from
        let inward = if dir.dot(normal) > 0.0 { -*normal } else { *normal };

        let kind = if rng.uniform() < material.diffuse_probability(e_perp) {
            particle.set_direction(diffuse_direction(&inward, rng));
            particle.bounces.diffuse += 1;
            BounceKind::Diffuse
        } else {
            particle.set_direction(off_wall(&specular_direction(&dir, &inward), &inward));
            particle.bounces.specular += 1;
            BounceKind::Specular
        };
        BounceOutcome::Reflected(kind)
    }
}

/// Kinetic energy (eV) of the motion along `normal`
pub fn perpendicular_energy(particle: &Particle, normal: &Vec3) -> f64 {
    let cos = particle.direction().dot(&normal.normalize());
    particle.kinetic_energy() * cos * cos
}

/// Mirror reflection of `dir` in the plane with unit `normal`
pub fn specular_direction(dir: &Vec3, normal: &Vec3) -> Vec3 {
    *dir - *normal * (2.0 * dir.dot(normal))
}

/// `dir`, tilted towards the unit `normal` if it would graze the wall
///
/// # Panics
/// If the result is still tangent to or behind the wall.
fn off_wall(dir: &Vec3, normal: &Vec3) -> Vec3 {
    let cos = dir.dot(normal);
    let out = if cos > TANGENT_TOLERANCE {
        *dir
    } else {
        (*dir + *normal * (2.0 * TANGENT_TOLERANCE - cos)).normalize()
    };
    assert!(
        out.dot(normal) > TANGENT_TOLERANCE,
        "specular direction {} is tangent to or behind the wall {}",
        out,
        normal
    );
    out
}

/// Lambertian direction in the hemisphere of the unit `normal`
///
/// # Panics
/// If the sampled direction is not a unit vector pointing off the wall.
pub fn diffuse_direction(normal: &Vec3, rng: &mut RandomGenerator) -> Vec3 {
    let phi = 2.0 * PI * rng.uniform();
    let u = rng.uniform_range(0.0, DIFFUSE_DRAW_MAX);
    let theta = (1.0 - 2.0 * u).sqrt().acos();

    let axis = normal.any_perpendicular();
    let tilted = normal.rotate_about(&axis, theta);
    let dir = tilted.rotate_about(normal, phi).normalize();

    assert!((dir.mag() - 1.0).abs() < 1e-9, "diffuse direction {} is not unit", dir);
    assert!(
        dir.dot(normal) > TANGENT_TOLERANCE,
        "diffuse direction {} is tangent to or behind the wall {}",
        dir,
        normal
    );
    dir
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{speed_from_energy, NEV};
    use crate::materials::{BLACK_HOLE, PERFECT_MIRROR, STAINLESS_STEEL};

    fn ucn(energy_nev: f64, dir: Vec3) -> Particle {
        let v = dir.normalize() * speed_from_energy(energy_nev * NEV);
        Particle::new(0, Vec3::zero(), v)
    }

    #[test]
    fn test_specular_mirrors_normal_component() {
        let model = BounceModel::new(false);
        let mut rng = RandomGenerator::new(1);
        let dir = Vec3::new(0.6, 0.0, -0.8);
        let mut p = ucn(100.0, dir);
        let e0 = p.kinetic_energy();

        let n = Vec3::unit_z();
        let out = model.interact(&PERFECT_MIRROR, &mut p, &n, &mut rng);
        assert_eq!(out, BounceOutcome::Reflected(BounceKind::Specular));

        let d = p.direction();
        assert!((d - Vec3::new(0.6, 0.0, 0.8)).mag() < 1e-12, "d = {}", d);
        assert!((p.kinetic_energy() - e0).abs() < 1e-12 * e0);
        assert_eq!(p.bounces.specular, 1);
    }

    #[test]
    fn test_grazing_specular_leaves_the_wall() {
        let model = BounceModel::new(false);
        let mut rng = RandomGenerator::new(3);
        let mut p = ucn(100.0, Vec3::new(1.0, 0.0, -1e-9));
        let v0 = p.velocity.mag();

        let out = model.interact(&PERFECT_MIRROR, &mut p, &Vec3::unit_z(), &mut rng);
        assert_eq!(out, BounceOutcome::Reflected(BounceKind::Specular));

        let d = p.direction();
        assert!(d.z > TANGENT_TOLERANCE, "d = {}", d);
        assert!(d.z < 10.0 * TANGENT_TOLERANCE, "d = {}", d);
        assert!((p.velocity.mag() - v0).abs() < 1e-12 * v0);
    }

    #[test]
    fn test_normal_orientation_does_not_matter() {
        let dir = Vec3::new(0.3, -0.4, 0.5).normalize();
        let n = Vec3::new(0.0, 1.0, 1.0).normalize();
        let a = specular_direction(&dir, &n);
        let b = specular_direction(&dir, &-n);
        assert!((a - b).mag() < 1e-15);
        assert!((a.dot(&n) + dir.dot(&n)).abs() < 1e-15);
    }

    #[test]
    fn test_diffuse_never_tangent_or_backwards() {
        let mut rng = RandomGenerator::new(2024);
        let normals = [
            Vec3::unit_z(),
            -Vec3::unit_x(),
            Vec3::new(0.3, -0.5, 0.8).normalize(),
        ];
        for n in normals {
            for _ in 0..10_000 {
                let d = diffuse_direction(&n, &mut rng);
                assert!((d.mag() - 1.0).abs() < 1e-12);
                assert!(d.dot(&n) > TANGENT_TOLERANCE, "d = {}, n = {}", d, n);
            }
        }
    }

    #[test]
    fn test_diffuse_follows_cosine_law() {
        let mut rng = RandomGenerator::new(7);
        let n = Vec3::unit_z();
        let samples = 20_000;
        let mut sum_cos = 0.0;
        let mut sum_x = 0.0;
        for _ in 0..samples {
            let d = diffuse_direction(&n, &mut rng);
            sum_cos += d.dot(&n);
            sum_x += d.x;
        }
        // <cos θ> = 2/3 for a Lambertian source
        let mean_cos = sum_cos / samples as f64;
        assert!((mean_cos - 2.0 / 3.0).abs() < 0.01, "<cos> = {}", mean_cos);
        assert!((sum_x / samples as f64).abs() < 0.02);
    }

    #[test]
    fn test_above_fermi_potential_always_absorbed() {
        let model = BounceModel::new(false);
        let mut rng = RandomGenerator::new(3);
        // 250 neV straight into 188 neV steel
        for _ in 0..100 {
            let mut p = ucn(250.0, -Vec3::unit_z());
            let out = model.interact(&STAINLESS_STEEL, &mut p, &Vec3::unit_z(), &mut rng);
            assert_eq!(out, BounceOutcome::Absorbed);
        }
        // Same energy at grazing incidence only has ~10 neV perpendicular
        let mut p = ucn(250.0, Vec3::new(1.0, 0.0, -0.2));
        let out = model.interact(&STAINLESS_STEEL, &mut p, &Vec3::unit_z(), &mut rng);
        assert!(matches!(out, BounceOutcome::Reflected(_)));
    }

    #[test]
    fn test_wall_loss_rate() {
        let lossy = Material::boundary("lossy", "Lossy", 200.0 * NEV, 0.05, 0.0);
        let model = BounceModel::new(true);
        let mut rng = RandomGenerator::new(11);

        // E⊥ = V_F/2 gives μ = 2η = 0.1
        let trials = 20_000;
        let mut absorbed = 0;
        for _ in 0..trials {
            let mut p = ucn(100.0, -Vec3::unit_z());
            if model.interact(&lossy, &mut p, &Vec3::unit_z(), &mut rng) == BounceOutcome::Absorbed {
                absorbed += 1;
            }
        }
        let rate = absorbed as f64 / trials as f64;
        assert!((rate - 0.1).abs() < 0.01, "rate = {}", rate);

        // Losses switched off
        let off = BounceModel::new(false);
        for _ in 0..1000 {
            let mut p = ucn(100.0, -Vec3::unit_z());
            assert!(matches!(
                off.interact(&lossy, &mut p, &Vec3::unit_z(), &mut rng),
                BounceOutcome::Reflected(_)
            ));
        }
    }

    #[test]
    fn test_detector_and_black_hole() {
        let model = BounceModel::default();
        let mut rng = RandomGenerator::new(5);
        let n = Vec3::unit_z();

        let always = Material::detector("d1", "Perfect", 1.0, 100.0 * NEV, 0.0, 0.0);
        let mut p = ucn(50.0, -n);
        assert_eq!(model.interact(&always, &mut p, &n, &mut rng), BounceOutcome::Detected);

        let never = Material::detector("d0", "Blind", 0.0, 100.0 * NEV, 0.0, 0.0);
        let mut p = ucn(50.0, -n);
        assert_eq!(
            model.interact(&never, &mut p, &n, &mut rng),
            BounceOutcome::Reflected(BounceKind::Specular)
        );
        assert!(p.direction().z > 0.0);

        let mut p = ucn(50.0, -n);
        assert_eq!(model.interact(&BLACK_HOLE, &mut p, &n, &mut rng), BounceOutcome::Lost);
    }

    #[test]
    fn test_rough_wall_reflects_diffusely() {
        let rough = Material::boundary("rough", "Rough", 200.0 * NEV, 0.0, 1.0);
        let model = BounceModel::new(false);
        let mut rng = RandomGenerator::new(13);
        let n = Vec3::unit_z();

        // Diffuse probability = E⊥/V_F = 0.75
        let trials = 10_000;
        let mut diffuse = 0;
        for _ in 0..trials {
            let mut p = ucn(150.0, -n);
            if model.interact(&rough, &mut p, &n, &mut rng) == BounceOutcome::Reflected(BounceKind::Diffuse) {
                diffuse += 1;
                assert_eq!(p.bounces.diffuse, 1);
                assert!(p.direction().z > 0.0);
            }
        }
        let rate = diffuse as f64 / trials as f64;
        assert!((rate - 0.75).abs() < 0.02, "rate = {}", rate);
    }
}
