//! Initial particle sampling.
//!
//! Both sources fill phase space uniformly up to a maximum kinetic energy:
//! isotropic directions and speeds with density ∝ v², i.e. v = v_max·u^(1/3).

use rand::Rng;

use crate::constants::speed_from_energy;
use crate::geometry::{BoundaryTime, GeometryTree, NodeId};
use crate::particle::Particle;
use crate::stochastic::RandomGenerator;
use crate::types::Vec3;

/// Attempts before a volume source gives up on a single particle
const MAX_REJECTIONS: usize = 10_000;

/// Produces the initial state of particle `id`
pub trait ParticleSource: Sync {
    /// `None` if no valid starting point could be drawn
    fn sample(&self, tree: &GeometryTree, id: usize, rng: &mut RandomGenerator) -> Option<Particle>;
}

fn sample_velocity(max_energy: f64, rng: &mut RandomGenerator) -> Vec3 {
    let v_max = speed_from_energy(max_energy);
    let speed = v_max * rng.gen_range(0.0..1.0f64).cbrt();
    rng.isotropic_direction() * speed
}

/// All particles start at one point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSource {
    pub position: Vec3,
    /// Maximum kinetic energy (eV)
    pub max_energy: f64,
}

impl PointSource {
    pub fn new(position: Vec3, max_energy: f64) -> Self {
        Self { position, max_energy }
    }
}

impl ParticleSource for PointSource {
    fn sample(&self, _tree: &GeometryTree, id: usize, rng: &mut RandomGenerator) -> Option<Particle> {
        Some(Particle::new(id, self.position, sample_velocity(self.max_energy, rng)))
    }
}

/// Particles start uniformly inside one volume, excluding its daughters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSource {
    pub node: NodeId,
    /// Maximum kinetic energy (eV)
    pub max_energy: f64,
}

impl VolumeSource {
    pub fn new(node: NodeId, max_energy: f64) -> Self {
        Self { node, max_energy }
    }
}

impl ParticleSource for VolumeSource {
    fn sample(&self, tree: &GeometryTree, id: usize, rng: &mut RandomGenerator) -> Option<Particle> {
        let node = tree.node(self.node);
        let half = node.shape.bounding_box();
        let xf = node.global_transform();

        for _ in 0..MAX_REJECTIONS {
            let local = Vec3::new(
                rng.gen_range(-half.x..=half.x),
                rng.gen_range(-half.y..=half.y),
                rng.gen_range(-half.z..=half.z),
            );
            let position = xf.local_to_master(&local);
            if tree.is_same_location(self.node, &position) {
                return Some(Particle::new(id, position, sample_velocity(self.max_energy, rng)));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{kinetic_energy, NEV};
    use crate::geometry::{GeometryBuilder, Shape, Transform};
    use crate::materials::{BLACK_HOLE, DETECTOR_WINDOW, VACUUM};

    fn bottle() -> GeometryTree {
        let mut b = GeometryBuilder::new();
        let world = b.world("world", Shape::cuboid(1.0, 1.0, 1.0), BLACK_HOLE).unwrap();
        let bore = b
            .place(world, "bore", Shape::tube(0.0, 0.3, 0.5), VACUUM, Transform::translation(0.1, 0.0, 0.0))
            .unwrap();
        b.place(bore, "detector", Shape::cuboid(0.1, 0.1, 0.1), DETECTOR_WINDOW, Transform::identity())
            .unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_volume_source_fills_only_its_volume() {
        let tree = bottle();
        let bore = tree.find_by_name("bore").unwrap();
        let source = VolumeSource::new(bore, 200.0 * NEV);
        let mut rng = RandomGenerator::new(17);

        for id in 0..2000 {
            let p = source.sample(&tree, id, &mut rng).unwrap();
            assert_eq!(tree.find_node(&p.position), Some(bore));
            assert!(p.kinetic_energy() <= 200.0 * NEV * (1.0 + 1e-12));
            assert_eq!(p.id, id);
        }
    }

    #[test]
    fn test_speed_distribution() {
        let tree = bottle();
        let source = PointSource::new(Vec3::new(0.1, 0.0, 0.3), 100.0 * NEV);
        let mut rng = RandomGenerator::new(3);
        let v_max = speed_from_energy(100.0 * NEV);

        // <v> = 3/4·v_max for density ∝ v²
        let n = 20_000;
        let mean = (0..n)
            .map(|id| source.sample(&tree, id, &mut rng).unwrap().speed())
            .sum::<f64>()
            / n as f64;
        assert!((mean / v_max - 0.75).abs() < 0.01, "<v>/v_max = {}", mean / v_max);
        assert!((kinetic_energy(v_max) - 100.0 * NEV).abs() < 1e-18);
    }
}
