//! # Simulator Module
//!
//! Propagation loop and batch driver.
//!
//! ## Loop
//!
//! ```text
//!   locate ──► step (navigator) ──► decay? ──► crossed? ──► medium
//!     ▲                                                       │
//!     │     tracking: continue        non-tracking: bounce ───┤
//!     └───────────────────────────────────────────────────────┘
//! ```
//!
//! A particle stops when it reaches a terminal state or the run time. Every
//! particle owns a seed drawn from the master generator before any
//! propagation starts, so a batch gives identical results sequentially, in
//! parallel, and under [`Run::replay`].

pub mod config;
pub mod observer;
pub mod source;

pub use config::RunConfig;
pub use observer::{BounceLog, BounceRecord, Observer, TrackPoint, TrackRecorder};
pub use source::{ParticleSource, PointSource, VolumeSource};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::bounce::{BounceModel, BounceOutcome};
use crate::constants::TOLERANCE;
use crate::error::{ConfigError, NavigationError};
use crate::field::GravField;
use crate::geometry::GeometryTree;
use crate::navigator::Navigator;
use crate::particle::{Event, Particle, State};
use crate::stochastic::RandomGenerator;
use crate::types::Vec3;

/// Remaining time below which a run counts as finished (s)
const END_OF_RUN: f64 = 1e-12;

/// Consecutive zero-length steps tolerated before a particle is declared stuck
const MAX_IDLE_STEPS: usize = 1000;

/// A configured propagation run over a fixed geometry
#[derive(Debug, Clone)]
pub struct Run<'a> {
    tree: &'a GeometryTree,
    field: GravField,
    bounce: BounceModel,
    config: RunConfig,
}

impl<'a> Run<'a> {
    pub fn new(tree: &'a GeometryTree, config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            tree,
            field: config.field(),
            bounce: BounceModel::new(config.wall_losses_on),
            config,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn tree(&self) -> &'a GeometryTree {
        self.tree
    }

    pub fn field(&self) -> &GravField {
        &self.field
    }

    pub fn navigator(&self) -> Navigator<'a> {
        Navigator::new(self.tree, &self.field)
    }

    /// Propagate one particle until it stops; returns its final state
    pub fn propagate(&self, particle: &mut Particle, rng: &mut RandomGenerator, observer: &mut dyn Observer) -> State {
        if particle.state.is_terminal() {
            observer.on_finish(particle);
            return particle.state;
        }

        let nav = self.navigator();
        if particle.node.is_none() {
            nav.locate(particle);
        }
        let in_tracking = particle
            .node
            .is_some_and(|id| self.tree.node(id).material.is_tracking());
        if !in_tracking {
            let err = NavigationError::InvalidStart {
                position: particle.position.to_string(),
            };
            self.fail(particle, &err);
            observer.on_finish(particle);
            return particle.state;
        }

        if let Err(err) = self.track(&nav, particle, rng, observer) {
            self.fail(particle, &err);
        }
        observer.on_finish(particle);
        particle.state
    }

    fn track(
        &self,
        nav: &Navigator<'a>,
        particle: &mut Particle,
        rng: &mut RandomGenerator,
        observer: &mut dyn Observer,
    ) -> Result<(), NavigationError> {
        let mut idle = 0;
        while !particle.state.is_terminal() {
            let remaining = self.config.run_time - particle.time;
            if remaining <= END_OF_RUN {
                break;
            }

            let step = nav.step(particle, remaining.min(self.config.max_step_time))?;
            observer.on_step(particle, &step);

            if step.time <= TOLERANCE {
                idle += 1;
                if idle > MAX_IDLE_STEPS {
                    return Err(NavigationError::Stuck {
                        node: particle.node.map_or_else(|| "<outside>".to_string(), |n| self.tree.path(n)),
                        steps: idle,
                    });
                }
            } else {
                idle = 0;
            }

            if self.config.decay_on && rng.uniform() < -(-step.time / self.config.lifetime).exp_m1() {
                particle.apply(Event::Decay);
                break;
            }
            if !step.crossed() {
                continue;
            }

            let Some(next) = step.next_node else {
                particle.apply(Event::Lose);
                break;
            };
            let material = self.tree.node(next).material;
            if material.is_tracking() {
                continue;
            }
            let normal = step.normal.unwrap_or_else(|| self.tree.normal(next, &particle.position, &particle.direction()));

            match self.bounce.interact(&material, particle, &normal, rng) {
                BounceOutcome::Reflected(kind) => {
                    particle.node = step.previous_node;
                    nav.relocate(particle, &normal)?;
                    debug!("UCN {}: {:?} bounce on '{}' at t = {:.4} s", particle.id, kind, material.name, particle.time);
                    observer.on_bounce(particle, kind);
                }
                BounceOutcome::Absorbed => {
                    particle.apply(Event::Absorb);
                }
                BounceOutcome::Detected => {
                    particle.apply(Event::Detect);
                }
                BounceOutcome::Lost => {
                    particle.apply(Event::Lose);
                }
                BounceOutcome::Transmitted => {}
            }
        }
        Ok(())
    }

    fn fail(&self, particle: &mut Particle, err: &NavigationError) {
        warn!("UCN {} (seed {}) marked bad at t = {:.6} s: {}", particle.id, particle.seed, particle.time, err);
        particle.apply(Event::Fail);
    }

    /// Propagate a particle with the generator seeded from its own seed
    pub fn propagate_seeded(&self, particle: &mut Particle, observer: &mut dyn Observer) -> State {
        let mut rng = RandomGenerator::new(particle.seed);
        self.propagate(particle, &mut rng, observer)
    }

    /// Re-run a particle from its initial conditions and seed
    pub fn replay(&self, particle: &Particle, observer: &mut dyn Observer) -> Particle {
        let mut fresh = particle.reset();
        self.propagate_seeded(&mut fresh, observer);
        fresh
    }

    /// Replay a particle, sampling its track every `track_interval` seconds
    pub fn trace(&self, particle: &Particle) -> (Particle, TrackRecorder) {
        let mut rec = TrackRecorder::new(self.config.track_interval);
        let fresh = self.replay(particle, &mut rec);
        (fresh, rec)
    }

    /// Draw the initial particles of a batch
    pub fn generate(&self, source: &dyn ParticleSource) -> Vec<Particle> {
        let mut master = RandomGenerator::new(self.config.seed);
        (0..self.config.n_particles)
            .map(|id| {
                let particle = source.sample(self.tree, id, &mut master);
                let seed = master.next_seed();
                match particle {
                    Some(p) => p.with_seed(seed),
                    None => {
                        warn!("UCN {}: source produced no starting point", id);
                        let mut p = Particle::new(id, Vec3::zero(), Vec3::zero()).with_seed(seed);
                        p.apply(Event::Fail);
                        p
                    }
                }
            })
            .collect()
    }

    /// Generate and propagate a whole batch
    pub fn run_batch(&self, source: &dyn ParticleSource) -> BatchResult {
        let initial = self.generate(source);
        info!(
            "Run '{}': {} particles, {:.1} s, gravity {}, {}",
            self.config.run_name,
            initial.len(),
            self.config.run_time,
            if self.config.gravity_on { "on" } else { "off" },
            if self.config.parallel { "parallel" } else { "sequential" }
        );

        let particles: Vec<Particle> = if self.config.parallel {
            initial
                .into_par_iter()
                .map(|mut p| {
                    self.propagate_seeded(&mut p, &mut ());
                    p
                })
                .collect()
        } else {
            initial
                .into_iter()
                .map(|mut p| {
                    self.propagate_seeded(&mut p, &mut ());
                    p
                })
                .collect()
        };

        let stats = RunStats::from_particles(&particles);
        info!("Run '{}' finished: {}", self.config.run_name, stats.brief());
        BatchResult { particles, stats }
    }
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Outcome counts of a batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub propagating: usize,
    pub decayed: usize,
    pub absorbed: usize,
    pub detected: usize,
    pub lost: usize,
    pub bad: usize,
    pub specular_bounces: u64,
    pub diffuse_bounces: u64,
    /// Sum of flight times (s)
    pub total_time: f64,
}

impl RunStats {
    pub fn from_particles(particles: &[Particle]) -> Self {
        let mut stats = Self::default();
        for p in particles {
            stats.record(p);
        }
        stats
    }

    pub fn record(&mut self, particle: &Particle) {
        match particle.state {
            State::Propagating => self.propagating += 1,
            State::Decayed => self.decayed += 1,
            State::Absorbed => self.absorbed += 1,
            State::Detected => self.detected += 1,
            State::Lost => self.lost += 1,
            State::Bad => self.bad += 1,
        }
        self.specular_bounces += particle.bounces.specular;
        self.diffuse_bounces += particle.bounces.diffuse;
        self.total_time += particle.time;
    }

    pub fn count(&self, state: State) -> usize {
        match state {
            State::Propagating => self.propagating,
            State::Decayed => self.decayed,
            State::Absorbed => self.absorbed,
            State::Detected => self.detected,
            State::Lost => self.lost,
            State::Bad => self.bad,
        }
    }

    pub fn total(&self) -> usize {
        State::ALL.iter().map(|&s| self.count(s)).sum()
    }

    /// Fraction of the batch in `state`
    pub fn fraction(&self, state: State) -> f64 {
        match self.total() {
            0 => 0.0,
            n => self.count(state) as f64 / n as f64,
        }
    }

    fn brief(&self) -> String {
        State::ALL
            .iter()
            .map(|&s| format!("{} {}", self.count(s), s))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Multi-line report
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str("=== UCN Run Summary ===\n");
        s.push_str(&format!("Particles: {}\n", self.total()));
        for state in State::ALL {
            s.push_str(&format!(
                "  {:<12} {:>8}  ({:5.1}%)\n",
                state.name(),
                self.count(state),
                100.0 * self.fraction(state)
            ));
        }
        s.push_str(&format!(
            "Bounces: {} specular, {} diffuse\n",
            self.specular_bounces, self.diffuse_bounces
        ));
        if self.total() > 0 {
            s.push_str(&format!("Mean flight time: {:.3} s\n", self.total_time / self.total() as f64));
        }
        s
    }
}

/// Particles of a batch in their final state, plus counts
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub particles: Vec<Particle>,
    pub stats: RunStats,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{NEUTRON_MASS_EV, G_STANDARD, NEV};
    use crate::geometry::{GeometryBuilder, NodeId, Shape, Transform};
    use crate::materials::{Material, BLACK_HOLE, DETECTOR_WINDOW, PERFECT_MIRROR, STAINLESS_STEEL, VACUUM};

    /// Box bottle: world, wall box of half-size 0.25, vacuum box of half-size 0.2
    fn bottle(wall: Material) -> (GeometryTree, NodeId) {
        let mut b = GeometryBuilder::new();
        let world = b.world("world", Shape::cuboid(1.0, 1.0, 1.0), BLACK_HOLE).unwrap();
        let shell = b
            .place(world, "wall", Shape::cuboid(0.25, 0.25, 0.25), wall, Transform::identity())
            .unwrap();
        let inner = b
            .place(shell, "vacuum", Shape::cuboid(0.2, 0.2, 0.2), VACUUM, Transform::identity())
            .unwrap();
        (b.build().unwrap(), inner)
    }

    fn quiet(n: usize) -> RunConfig {
        RunConfig {
            n_particles: n,
            run_time: 2.0,
            max_step_time: 0.5,
            decay_on: false,
            wall_losses_on: false,
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_mirror_bottle_times_out_and_conserves_energy() {
        let (tree, inner) = bottle(PERFECT_MIRROR);
        let run = Run::new(&tree, quiet(10)).unwrap();
        let source = VolumeSource::new(inner, 100.0 * NEV);

        let total = |p: &Particle| p.kinetic_energy() + NEUTRON_MASS_EV * G_STANDARD * p.position.z;
        let mut log = BounceLog::default();
        for p in run.generate(&source) {
            let e0 = total(&p);
            let mut p = p;
            let state = run.propagate_seeded(&mut p, &mut log);
            assert_eq!(state, State::Propagating);
            assert!((p.time - 2.0).abs() < 1e-9, "t = {}", p.time);
            assert!((total(&p) - e0).abs() < 1e-6 * e0, "drift {:e}", total(&p) - e0);
            assert!(tree.contains(inner, &p.position));
        }
        assert!(!log.bounces.is_empty());
        assert_eq!(log.count(crate::bounce::BounceKind::Diffuse), 0);
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let (tree, inner) = bottle(STAINLESS_STEEL);
        let source = VolumeSource::new(inner, 150.0 * NEV);
        let base = RunConfig {
            n_particles: 40,
            run_time: 5.0,
            ..RunConfig::default()
        };
        let seq = Run::new(&tree, base.clone()).unwrap().run_batch(&source);
        let par = Run::new(&tree, RunConfig { parallel: true, ..base })
            .unwrap()
            .run_batch(&source);

        assert_eq!(seq.stats, par.stats);
        for (a, b) in seq.particles.iter().zip(&par.particles) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.state, b.state);
            assert_eq!(a.position, b.position);
            assert_eq!(a.bounces, b.bounces);
        }
    }

    #[test]
    fn test_replay_reproduces_outcome() {
        let (tree, inner) = bottle(STAINLESS_STEEL);
        let config = RunConfig {
            n_particles: 20,
            run_time: 5.0,
            ..RunConfig::default()
        };
        let run = Run::new(&tree, config).unwrap();
        let batch = run.run_batch(&VolumeSource::new(inner, 150.0 * NEV));

        for p in &batch.particles {
            let again = run.replay(p, &mut ());
            assert_eq!(again.state, p.state);
            assert_eq!(again.time, p.time);
            assert_eq!(again.bounces, p.bounces);
            assert_eq!(again.position, p.position);
        }
    }

    #[test]
    fn test_detector_counts_hits() {
        let mut b = GeometryBuilder::new();
        let world = b.world("world", Shape::cuboid(1.0, 1.0, 1.0), BLACK_HOLE).unwrap();
        let shell = b
            .place(world, "wall", Shape::cuboid(0.25, 0.25, 0.25), STAINLESS_STEEL, Transform::identity())
            .unwrap();
        let inner = b
            .place(shell, "vacuum", Shape::cuboid(0.2, 0.2, 0.2), VACUUM, Transform::identity())
            .unwrap();
        b.place(
            inner,
            "detector",
            Shape::cuboid(0.15, 0.15, 0.02),
            DETECTOR_WINDOW,
            Transform::translation(0.0, 0.0, -0.17),
        )
        .unwrap();
        let tree = b.build().unwrap();

        let config = RunConfig {
            n_particles: 50,
            run_time: 30.0,
            decay_on: false,
            ..RunConfig::default()
        };
        let batch = Run::new(&tree, config).unwrap().run_batch(&VolumeSource::new(inner, 150.0 * NEV));
        assert!(batch.stats.detected > 0, "{}", batch.stats.summary());
        assert_eq!(batch.stats.total(), 50);
        assert_eq!(batch.stats.bad, 0);
    }

    #[test]
    fn test_black_hole_surroundings_lose_everything() {
        let mut b = GeometryBuilder::new();
        let world = b.world("world", Shape::cuboid(1.0, 1.0, 1.0), BLACK_HOLE).unwrap();
        let inner = b
            .place(world, "vacuum", Shape::cuboid(0.2, 0.2, 0.2), VACUUM, Transform::identity())
            .unwrap();
        let tree = b.build().unwrap();

        let batch = Run::new(&tree, quiet(20)).unwrap().run_batch(&VolumeSource::new(inner, 100.0 * NEV));
        assert_eq!(batch.stats.lost, 20, "{}", batch.stats.summary());
    }

    #[test]
    fn test_leaving_the_world_is_lost() {
        let mut b = GeometryBuilder::new();
        b.world("world", Shape::cuboid(0.2, 0.2, 0.2), VACUUM).unwrap();
        let tree = b.build().unwrap();
        let run = Run::new(&tree, quiet(1)).unwrap();

        let mut p = Particle::new(0, Vec3::zero(), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(run.propagate(&mut p, &mut RandomGenerator::new(1), &mut ()), State::Lost);
        assert!(p.node.is_none());
    }

    #[test]
    fn test_short_lifetime_decays() {
        let (tree, inner) = bottle(PERFECT_MIRROR);
        let config = RunConfig {
            lifetime: 1e-3,
            decay_on: true,
            ..quiet(30)
        };
        let batch = Run::new(&tree, config).unwrap().run_batch(&VolumeSource::new(inner, 100.0 * NEV));
        assert_eq!(batch.stats.decayed, 30, "{}", batch.stats.summary());
    }

    #[test]
    fn test_start_inside_wall_is_bad() {
        let (tree, _) = bottle(STAINLESS_STEEL);
        let run = Run::new(&tree, quiet(1)).unwrap();
        let mut p = Particle::new(0, Vec3::new(0.0, 0.0, 0.22), Vec3::unit_x());
        let mut rec = TrackRecorder::new(0.0);
        assert_eq!(run.propagate(&mut p, &mut RandomGenerator::new(1), &mut rec), State::Bad);
        assert_eq!(rec.final_state, Some(State::Bad));
    }

    #[test]
    fn test_track_recorder_follows_run() {
        let (tree, inner) = bottle(PERFECT_MIRROR);
        let run = Run::new(&tree, quiet(1)).unwrap();
        let mut p = run.generate(&VolumeSource::new(inner, 100.0 * NEV)).remove(0);
        let mut rec = TrackRecorder::new(0.1);
        run.propagate_seeded(&mut p, &mut rec);

        assert!(rec.points.len() >= 20);
        for w in rec.points.windows(2) {
            assert!(w[1].time >= w[0].time);
        }
        let wall = tree.find_by_name("wall").unwrap();
        assert!(rec.points.iter().all(|pt| tree.contains(wall, &pt.position)));
    }

    #[test]
    fn test_trace_uses_configured_interval() {
        let (tree, _) = bottle(PERFECT_MIRROR);
        let drift = Particle::new(0, Vec3::zero(), Vec3::new(0.01, 0.0, 0.0));
        let config = |interval: f64| RunConfig {
            gravity_on: false,
            max_step_time: 0.1,
            track_interval: interval,
            ..quiet(1)
        };

        let (p, every) = Run::new(&tree, config(0.0)).unwrap().trace(&drift);
        assert_eq!(p.state, State::Propagating);
        assert!(every.points.len() >= 20, "{} points", every.points.len());

        // t = 0.1, 0.6, 1.1, 1.6, then the final point at 2.0
        let (_, sparse) = Run::new(&tree, config(0.45)).unwrap().trace(&drift);
        assert_eq!(sparse.points.len(), 5);
        let sampled = &sparse.points[..sparse.points.len() - 1];
        for w in sampled.windows(2) {
            assert!(w[1].time - w[0].time >= 0.45, "gap {}", w[1].time - w[0].time);
        }
        assert!((sparse.points[4].time - 2.0).abs() < 1e-9);
        assert_eq!(sparse.final_state, Some(State::Propagating));
    }

    #[test]
    fn test_decay_rate_matches_lifetime() {
        let (tree, inner) = bottle(PERFECT_MIRROR);
        let config = RunConfig {
            lifetime: 2.0,
            decay_on: true,
            parallel: true,
            ..quiet(4000)
        };
        let batch = Run::new(&tree, config).unwrap().run_batch(&VolumeSource::new(inner, 100.0 * NEV));

        // run_time = lifetime, so 1 - 1/e should decay; 3 sigma is about 0.023
        let expected = -(-1.0f64).exp_m1();
        let frac = batch.stats.fraction(State::Decayed);
        assert!((frac - expected).abs() < 0.025, "decayed {} vs {}", frac, expected);
    }

    #[test]
    fn test_stats_summary() {
        let mut stats = RunStats::default();
        let mut p = Particle::new(0, Vec3::zero(), Vec3::unit_x());
        p.apply(Event::Detect);
        stats.record(&p);
        stats.record(&Particle::new(1, Vec3::zero(), Vec3::unit_x()));
        assert_eq!(stats.total(), 2);
        assert!((stats.fraction(State::Detected) - 0.5).abs() < 1e-12);
        let text = stats.summary();
        assert!(text.contains("detected"));
        assert!(text.contains("50.0%"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (tree, _) = bottle(STAINLESS_STEEL);
        let config = RunConfig {
            max_step_time: 0.0,
            ..RunConfig::default()
        };
        assert!(Run::new(&tree, config).is_err());
    }
}
