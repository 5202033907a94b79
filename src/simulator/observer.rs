//! Per-step diagnostics sinks.

use crate::bounce::BounceKind;
use crate::navigator::StepResult;
use crate::particle::{Particle, State};
use crate::types::Vec3;

/// Receives diagnostics while a particle is propagated
pub trait Observer {
    fn on_step(&mut self, _particle: &Particle, _step: &StepResult) {}
    fn on_bounce(&mut self, _particle: &Particle, _kind: BounceKind) {}
    fn on_finish(&mut self, _particle: &Particle) {}
}

/// Discards everything
impl Observer for () {}

/// A sampled point of a trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub time: f64,
    pub position: Vec3,
    pub velocity: Vec3,
}

impl TrackPoint {
    fn of(particle: &Particle) -> Self {
        Self {
            time: particle.time,
            position: particle.position,
            velocity: particle.velocity,
        }
    }
}

/// Records the trajectory, at most one point per `interval`
///
/// Boundary crossings are always recorded so the polyline follows the walls.
#[derive(Debug, Clone, Default)]
pub struct TrackRecorder {
    pub interval: f64,
    pub points: Vec<TrackPoint>,
    pub final_state: Option<State>,
}

impl TrackRecorder {
    pub fn new(interval: f64) -> Self {
        Self { interval, ..Self::default() }
    }

    fn due(&self, time: f64) -> bool {
        match self.points.last() {
            None => true,
            Some(last) => time - last.time >= self.interval,
        }
    }
}

impl Observer for TrackRecorder {
    fn on_step(&mut self, particle: &Particle, step: &StepResult) {
        if step.crossed() || self.due(particle.time) {
            self.points.push(TrackPoint::of(particle));
        }
    }

    fn on_finish(&mut self, particle: &Particle) {
        self.points.push(TrackPoint::of(particle));
        self.final_state = Some(particle.state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BounceRecord {
    pub time: f64,
    pub position: Vec3,
    pub kind: BounceKind,
}

/// Records every reflection
#[derive(Debug, Clone, Default)]
pub struct BounceLog {
    pub bounces: Vec<BounceRecord>,
}

impl BounceLog {
    pub fn count(&self, kind: BounceKind) -> usize {
        self.bounces.iter().filter(|b| b.kind == kind).count()
    }
}

impl Observer for BounceLog {
    fn on_bounce(&mut self, particle: &Particle, kind: BounceKind) {
        self.bounces.push(BounceRecord {
            time: particle.time,
            position: particle.position,
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(crossed: bool) -> StepResult {
        StepResult {
            previous_node: None,
            next_node: None,
            crossed_node: None,
            time: 0.1,
            arc_length: 0.1,
            entering: crossed,
            exiting: false,
            on_boundary: crossed,
            normal: None,
        }
    }

    #[test]
    fn test_track_recorder_interval() {
        let mut rec = TrackRecorder::new(0.25);
        let mut p = Particle::new(0, Vec3::zero(), Vec3::unit_x());
        for _ in 0..10 {
            p.advance(0.1, &Vec3::zero());
            rec.on_step(&p, &step(false));
        }
        // t = 0.1, 0.4, 0.7, 1.0
        assert_eq!(rec.points.len(), 4);

        p.advance(0.01, &Vec3::zero());
        rec.on_step(&p, &step(true));
        assert_eq!(rec.points.len(), 5);

        rec.on_finish(&p);
        assert_eq!(rec.final_state, Some(State::Propagating));
    }

    #[test]
    fn test_bounce_log() {
        let mut log = BounceLog::default();
        let p = Particle::new(0, Vec3::zero(), Vec3::unit_x());
        log.on_bounce(&p, BounceKind::Specular);
        log.on_bounce(&p, BounceKind::Diffuse);
        log.on_bounce(&p, BounceKind::Specular);
        assert_eq!(log.count(BounceKind::Specular), 2);
        assert_eq!(log.count(BounceKind::Diffuse), 1);
    }
}
