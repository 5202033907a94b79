//! # Navigator Module
//!
//! Moves a particle through the volume tree one boundary at a time.
//!
//! ## One step
//!
//! 1. Exit time of the current volume (inside → out, local frame)
//! 2. Entry time of every daughter (outside → in, each daughter's frame)
//! 3. The earliest candidate wins, compared in path length; a candidate
//!    must beat the current best by more than `TOLERANCE`, and the exit is
//!    considered first, so ties go to leaving the volume
//! 4. Analytic advance along the parabola
//! 5. The next volume is located just beyond the crossed surface and the
//!    particle is nudged until it is exclusively contained by it
//!
//! A particle outside the world is first brought to the world's surface.

use log::{debug, trace};

use crate::constants::{MAX_RELOCATION_STEPS, RELOCATION_STEP, TOLERANCE};
use crate::error::NavigationError;
use crate::field::GravField;
use crate::geometry::{BoundaryTime, GeometryTree, NodeId};
use crate::parabola::arc_length;
use crate::particle::Particle;
use crate::types::Vec3;

/// Distance beyond a crossed surface used to decide which volume comes next
const LOOKAHEAD_DISTANCE: f64 = 10.0 * RELOCATION_STEP;

/// Outcome of a single navigation step
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Volume the particle started the step in
    pub previous_node: Option<NodeId>,
    /// Volume the particle ends the step in; `None` outside the world
    pub next_node: Option<NodeId>,
    /// Volume whose surface was crossed
    pub crossed_node: Option<NodeId>,
    /// Time actually stepped (s)
    pub time: f64,
    /// Path length actually stepped (m)
    pub arc_length: f64,
    pub entering: bool,
    pub exiting: bool,
    pub on_boundary: bool,
    /// Global unit normal of the crossed surface, oriented along the motion
    pub normal: Option<Vec3>,
}

impl StepResult {
    fn free_flight(node: Option<NodeId>, time: f64, arc_length: f64) -> Self {
        Self {
            previous_node: node,
            next_node: node,
            crossed_node: None,
            time,
            arc_length,
            entering: false,
            exiting: false,
            on_boundary: false,
            normal: None,
        }
    }

    /// True if a boundary was crossed during the step
    pub fn crossed(&self) -> bool {
        self.entering || self.exiting
    }
}

/// Candidate crossing found during the search
struct Crossing {
    node: NodeId,
    time: f64,
    entering: bool,
}

/// Tree navigator for constant-acceleration trajectories
#[derive(Debug, Clone, Copy)]
pub struct Navigator<'a> {
    tree: &'a GeometryTree,
    field: Vec3,
}

impl<'a> Navigator<'a> {
    pub fn new(tree: &'a GeometryTree, field: &GravField) -> Self {
        Self {
            tree,
            field: field.acceleration(),
        }
    }

    pub fn tree(&self) -> &'a GeometryTree {
        self.tree
    }

    /// Global acceleration (m/s²)
    pub fn field(&self) -> Vec3 {
        self.field
    }

    /// Place a particle in the deepest volume containing it
    pub fn locate(&self, particle: &mut Particle) -> Option<NodeId> {
        particle.node = self.tree.find_node(&particle.position);
        particle.on_boundary = false;
        particle.node
    }

    /// Advance the particle to the next boundary or by `max_time`, whichever comes first
    pub fn step(&self, particle: &mut Particle, max_time: f64) -> Result<StepResult, NavigationError> {
        if max_time <= 0.0 {
            return Ok(StepResult::free_flight(particle.node, 0.0, 0.0));
        }
        let field = self.field;
        let step_max = arc_length(&particle.velocity, &field, max_time);

        let crossing = match particle.node {
            None => self.find_world_entry(particle, max_time)?,
            Some(current) => self.find_crossing(particle, current, max_time, step_max)?,
        };

        let Some(crossing) = crossing else {
            particle.advance(max_time, &field);
            particle.on_boundary = false;
            let result = StepResult::free_flight(particle.node, max_time, step_max);
            trace!("UCN {}: free flight {:.3e} s", particle.id, max_time);
            return Ok(result);
        };

        let previous = particle.node;
        let stepped = arc_length(&particle.velocity, &field, crossing.time);
        particle.advance(crossing.time, &field);
        particle.on_boundary = true;

        let normal = self.tree.normal(crossing.node, &particle.position, &particle.direction());
        let beyond = particle.position + normal * LOOKAHEAD_DISTANCE;
        let left = (!crossing.entering).then_some(crossing.node);
        particle.node = self.tree.find_node_from(crossing.node, &beyond, left);
        if particle.node.is_some() {
            self.relocate(particle, &normal)?;
        }

        trace!(
            "UCN {}: {} '{}' after {:.3e} s, now in {:?}",
            particle.id,
            if crossing.entering { "entered" } else { "left" },
            self.tree.node(crossing.node).name,
            crossing.time,
            particle.node.map(|n| self.tree.node(n).name.as_str())
        );

        Ok(StepResult {
            previous_node: previous,
            next_node: particle.node,
            crossed_node: Some(crossing.node),
            time: crossing.time,
            arc_length: stepped,
            entering: crossing.entering,
            exiting: !crossing.entering,
            on_boundary: true,
            normal: Some(normal),
        })
    }

    /// Nearest crossing from inside `current`, if any happens within `max_time`
    fn find_crossing(
        &self,
        particle: &Particle,
        current: NodeId,
        max_time: f64,
        step_max: f64,
    ) -> Result<Option<Crossing>, NavigationError> {
        let tree = self.tree;
        let node = tree.node(current);
        let xf = node.global_transform();

        let t_exit = node
            .shape
            .time_from_inside(
                &xf.master_to_local(&particle.position),
                &xf.master_to_local_vect(&particle.velocity),
                &xf.master_to_local_vect(&self.field),
                particle.on_boundary,
            )
            .map_err(|source| NavigationError::Shape { node: node.name.clone(), source })?;
        let s_exit = arc_length(&particle.velocity, &self.field, t_exit);

        // Already at the exit: leave without looking at daughters
        if s_exit <= TOLERANCE {
            return Ok(Some(Crossing { node: current, time: t_exit, entering: false }));
        }

        let mut best: Option<Crossing> = None;
        let mut t_best = max_time;
        let mut s_best = step_max;
        if s_exit < step_max - TOLERANCE {
            best = Some(Crossing { node: current, time: t_exit, entering: false });
            t_best = t_exit;
            s_best = s_exit;
        }

        for &d in &node.daughters {
            let daughter = tree.node(d);
            let dxf = daughter.global_transform();
            let t_enter = daughter
                .shape
                .time_from_outside(
                    &dxf.master_to_local(&particle.position),
                    &dxf.master_to_local_vect(&particle.velocity),
                    &dxf.master_to_local_vect(&self.field),
                    t_best,
                    particle.on_boundary,
                )
                .map_err(|source| NavigationError::Shape { node: daughter.name.clone(), source })?;
            if !t_enter.is_finite() {
                continue;
            }
            let s_enter = arc_length(&particle.velocity, &self.field, t_enter);
            if s_enter < s_best - TOLERANCE {
                best = Some(Crossing { node: d, time: t_enter, entering: true });
                t_best = t_enter;
                s_best = s_enter;
            }
        }
        Ok(best)
    }

    /// Entry into the world volume for a particle outside it
    fn find_world_entry(&self, particle: &Particle, max_time: f64) -> Result<Option<Crossing>, NavigationError> {
        let root = self.tree.root();
        let node = self.tree.node(root);
        let xf = node.global_transform();
        let t = node
            .shape
            .time_from_outside(
                &xf.master_to_local(&particle.position),
                &xf.master_to_local_vect(&particle.velocity),
                &xf.master_to_local_vect(&self.field),
                max_time,
                particle.on_boundary,
            )
            .map_err(|source| NavigationError::Shape { node: node.name.clone(), source })?;
        Ok((t <= max_time).then_some(Crossing { node: root, time: t, entering: true }))
    }

    /// Nudge the particle along `normal` until its volume exclusively contains it
    ///
    /// The normal is oriented along the current direction of travel. A
    /// particle that is already exclusively contained is left untouched.
    pub fn relocate(&self, particle: &mut Particle, normal: &Vec3) -> Result<(), NavigationError> {
        let Some(expected) = particle.node else {
            return Ok(());
        };
        if self.tree.is_same_location(expected, &particle.position) {
            return Ok(());
        }

        let n = if normal.dot(&particle.velocity) < 0.0 { -*normal } else { *normal };
        for k in 1..=MAX_RELOCATION_STEPS {
            particle.position += n * RELOCATION_STEP;
            if self.tree.is_same_location(expected, &particle.position) {
                debug!(
                    "UCN {}: relocated into '{}' after {} micro-steps",
                    particle.id,
                    self.tree.node(expected).name,
                    k
                );
                return Ok(());
            }
        }
        Err(NavigationError::RelocationExhausted {
            node: self.tree.path(expected),
            steps: MAX_RELOCATION_STEPS,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{G_STANDARD, NEUTRON_MASS_EV};
    use crate::geometry::{GeometryBuilder, Shape, Transform};
    use crate::materials::{STAINLESS_STEEL, VACUUM};

    /// World box [-1, 1]³ with a central box [-0.2, 0.2]³
    fn box_in_box() -> GeometryTree {
        let mut b = GeometryBuilder::new();
        let world = b.world("world", Shape::cuboid(1.0, 1.0, 1.0), VACUUM).unwrap();
        b.place(world, "inner", Shape::cuboid(0.2, 0.2, 0.2), STAINLESS_STEEL, Transform::identity())
            .unwrap();
        b.build().unwrap()
    }

    /// World box with a vertical tube whose axis sits at x = 0.3
    fn tube_in_box() -> GeometryTree {
        let mut b = GeometryBuilder::new();
        let world = b.world("world", Shape::cuboid(1.0, 1.0, 1.0), VACUUM).unwrap();
        b.place(world, "tube", Shape::tube(0.0, 0.2, 0.3), STAINLESS_STEEL, Transform::translation(0.3, 0.0, 0.0))
            .unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_box_in_box_round_trip() {
        let tree = box_in_box();
        let nav = Navigator::new(&tree, &GravField::off());
        let inner = tree.find_by_name("inner").unwrap();
        let world = tree.root();

        let mut p = Particle::new(0, Vec3::new(-0.5, 0.0, 0.0), Vec3::unit_x());
        assert_eq!(nav.locate(&mut p), Some(world));

        let s = nav.step(&mut p, 10.0).unwrap();
        assert!(s.entering && !s.exiting);
        assert_eq!(s.crossed_node, Some(inner));
        assert_eq!(s.next_node, Some(inner));
        assert!((s.time - 0.3).abs() < 1e-9, "t = {}", s.time);
        assert!(tree.is_same_location(inner, &p.position));

        let s = nav.step(&mut p, 10.0).unwrap();
        assert!(s.exiting && !s.entering);
        assert_eq!(s.crossed_node, Some(inner));
        assert_eq!(s.next_node, Some(world));
        assert!((p.position.x - 0.2).abs() < 1e-8);
        assert!(tree.is_same_location(world, &p.position));

        let s = nav.step(&mut p, 10.0).unwrap();
        assert!(s.exiting);
        assert_eq!(s.crossed_node, Some(world));
        assert_eq!(s.next_node, None);
        assert!((p.position.x - 1.0).abs() < 1e-8);
    }

    #[test]
    fn test_no_crossing_within_step() {
        let tree = box_in_box();
        let nav = Navigator::new(&tree, &GravField::off());
        let mut p = Particle::new(0, Vec3::new(-0.9, 0.5, 0.0), Vec3::unit_x());
        nav.locate(&mut p);
        let s = nav.step(&mut p, 0.1).unwrap();
        assert!(!s.crossed());
        assert_eq!(s.next_node, Some(tree.root()));
        assert!((p.position.x + 0.8).abs() < 1e-12);
        assert!((s.arc_length - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_drop_into_tube() {
        let tree = tube_in_box();
        let nav = Navigator::new(&tree, &GravField::earth());
        let tube = tree.find_by_name("tube").unwrap();

        let mut p = Particle::new(0, Vec3::new(0.35, 0.0, 0.8), Vec3::zero());
        nav.locate(&mut p);
        let s = nav.step(&mut p, 1.0).unwrap();
        assert!(s.entering);
        assert_eq!(s.next_node, Some(tube));
        let expected = (2.0 * 0.5 / G_STANDARD).sqrt();
        assert!((s.time - expected).abs() < 1e-9, "t = {}", s.time);
        // Normal of the top cap, oriented with the fall
        let n = s.normal.unwrap();
        assert!((n - Vec3::new(0.0, 0.0, -1.0)).mag() < 1e-12, "n = {}", n);
    }

    #[test]
    fn test_ties_favour_exit() {
        // Daughter flush with the world's +x face; the path meets both at (1, 0.5, 0)
        let mut b = GeometryBuilder::new();
        let world = b.world("world", Shape::cuboid(1.0, 1.0, 1.0), VACUUM).unwrap();
        b.place(world, "flush", Shape::cuboid(0.25, 0.1, 0.1), STAINLESS_STEEL, Transform::translation(0.75, 0.6, 0.0))
            .unwrap();
        let tree = b.build().unwrap();
        let nav = Navigator::new(&tree, &GravField::off());

        let mut p = Particle::new(0, Vec3::new(0.0, -0.5, 0.0), Vec3::new(1.0, 1.0, 0.0));
        nav.locate(&mut p);
        let s = nav.step(&mut p, 10.0).unwrap();
        assert!(s.exiting && !s.entering);
        assert_eq!(s.crossed_node, Some(world));
    }

    #[test]
    fn test_relocation_is_idempotent() {
        let tree = box_in_box();
        let nav = Navigator::new(&tree, &GravField::off());
        let mut p = Particle::new(0, Vec3::new(0.5, 0.5, 0.5), Vec3::unit_x());
        nav.locate(&mut p);
        let before = p.position;
        nav.relocate(&mut p, &Vec3::unit_x()).unwrap();
        assert_eq!(p.position, before);
    }

    #[test]
    fn test_relocation_pushes_across_surface() {
        let tree = box_in_box();
        let nav = Navigator::new(&tree, &GravField::off());
        let inner = tree.find_by_name("inner").unwrap();

        // Sitting on the inner box face, claiming to be in the world
        let mut p = Particle::new(0, Vec3::new(0.2, 0.0, 0.0), Vec3::unit_x());
        p.node = Some(tree.root());
        nav.relocate(&mut p, &-Vec3::unit_x()).unwrap();
        assert!(p.position.x > 0.2);
        assert!(!tree.contains(inner, &p.position));
    }

    #[test]
    fn test_relocation_exhausted() {
        let tree = box_in_box();
        let nav = Navigator::new(&tree, &GravField::off());
        // Deep inside the inner box, far from any surface
        let mut p = Particle::new(0, Vec3::zero(), Vec3::unit_x());
        p.node = Some(tree.root());
        let r = nav.relocate(&mut p, &Vec3::unit_x());
        assert!(matches!(r, Err(NavigationError::RelocationExhausted { steps: 100, .. })));
    }

    #[test]
    fn test_enter_world_from_outside() {
        let tree = box_in_box();
        let nav = Navigator::new(&tree, &GravField::earth());
        let mut p = Particle::new(0, Vec3::new(0.5, 0.5, 3.0), Vec3::zero());
        assert_eq!(nav.locate(&mut p), None);

        // Not reachable in 0.1 s
        let s = nav.step(&mut p, 0.1).unwrap();
        assert!(!s.crossed());
        assert_eq!(p.node, None);

        let s = nav.step(&mut p, 1.0).unwrap();
        assert!(s.entering);
        assert_eq!(s.next_node, Some(tree.root()));
        assert!((p.position.z - 1.0).abs() < 1e-8);
    }

    #[test]
    fn test_free_flight_in_vertical_tube_conserves_energy() {
        let mut b = GeometryBuilder::new();
        let world = b.world("world", Shape::cuboid(1.0, 1.0, 5.0), STAINLESS_STEEL).unwrap();
        b.place(world, "guide", Shape::tube(0.0, 0.5, 4.5), VACUUM, Transform::identity())
            .unwrap();
        let tree = b.build().unwrap();
        let nav = Navigator::new(&tree, &GravField::earth());

        let mut p = Particle::new(0, Vec3::new(0.0, 0.0, -4.0), Vec3::new(0.0, 0.0, 6.0));
        nav.locate(&mut p);
        let energy = |p: &Particle| p.kinetic_energy() + NEUTRON_MASS_EV * G_STANDARD * p.position.z;
        let e0 = energy(&p);
        for _ in 0..100 {
            let s = nav.step(&mut p, 0.01).unwrap();
            assert!(!s.crossed());
        }
        assert!((energy(&p) - e0).abs() < 1e-6 * e0, "drift {:e} eV", energy(&p) - e0);
    }
}
