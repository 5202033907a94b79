//! Primitive solids and their boundary-time queries.
//!
//! All queries are posed in the shape's local frame for a point moving as
//! x(t) = x + v·t + ½·g·t². Planar faces reduce to quadratics in t, the
//! radial wall of a tube to a quartic.
//!
//! Roots are cleaned before selection:
//! - coefficients below `COEFF_TOLERANCE` are zeroed;
//! - on a boundary, a constant term within 10·`TOLERANCE` is zeroed and a
//!   single root within `ROOT_SNAP` of zero is snapped to zero, so the surface
//!   just left is never re-selected;
//! - more than one such near-zero root is reported as ambiguous.

use std::f64::consts::PI;

use crate::constants::{COEFF_TOLERANCE, ROOT_SNAP, TOLERANCE};
use crate::error::ShapeError;
use crate::parabola::position_at;
use crate::polynomial::{self, Roots};
use crate::types::Vec3;

/// Capability shared by every primitive solid
pub trait BoundaryTime {
    /// Short shape name for diagnostics
    fn name(&self) -> &'static str;

    /// Half-lengths of the local axis-aligned bounding box
    fn bounding_box(&self) -> Vec3;

    /// Volume (m³)
    fn capacity(&self) -> f64;

    /// Inclusive containment test
    fn contains(&self, point: &Vec3) -> bool;

    /// Signed distance to the nearest surface, positive inside
    fn safety(&self, point: &Vec3) -> f64;

    /// Unit normal of the surface nearest to `point`, oriented so n·dir ≥ 0
    fn compute_normal(&self, point: &Vec3, dir: &Vec3) -> Vec3;

    /// Time until a particle inside leaves the shape
    fn time_from_inside(
        &self,
        point: &Vec3,
        velocity: &Vec3,
        field: &Vec3,
        on_boundary: bool,
    ) -> Result<f64, ShapeError>;

    /// Time until a particle outside enters the shape; +∞ if it never does
    fn time_from_outside(
        &self,
        point: &Vec3,
        velocity: &Vec3,
        field: &Vec3,
        max_time: f64,
        on_boundary: bool,
    ) -> Result<f64, ShapeError>;
}

// ============================================================================
// ROOT HANDLING
// ============================================================================

#[inline]
fn snap_coeff(c: f64) -> f64 {
    if c.abs() < COEFF_TOLERANCE {
        0.0
    } else {
        c
    }
}

/// Crossing times of the plane coordinate = offset along one axis
fn plane_roots(g: f64, v: f64, c: f64, on_boundary: bool) -> Roots {
    let c = if on_boundary && c.abs() < 10.0 * TOLERANCE { 0.0 } else { c };
    polynomial::quadratic(snap_coeff(0.5 * g), snap_coeff(v), c)
}

/// Crossing times of the infinite cylinder x² + y² = radius²
fn cylinder_roots(point: &Vec3, velocity: &Vec3, field: &Vec3, radius: f64, on_boundary: bool) -> Roots {
    let a = 0.25 * (field.x * field.x + field.y * field.y);
    let b = velocity.x * field.x + velocity.y * field.y;
    let c = point.x * field.x + point.y * field.y + velocity.x * velocity.x + velocity.y * velocity.y;
    let d = 2.0 * (point.x * velocity.x + point.y * velocity.y);
    let mut e = point.x * point.x + point.y * point.y - radius * radius;

    if on_boundary && ((point.perp() - radius).abs() < 10.0 * TOLERANCE || e.abs() < 10.0 * TOLERANCE) {
        e = 0.0;
    }
    polynomial::quartic(snap_coeff(a), snap_coeff(b), snap_coeff(c), snap_coeff(d), e)
}

/// Snap the root belonging to the surface just left
fn snap_roots(
    roots: &mut Roots,
    on_boundary: bool,
    shape: &'static str,
    surface: &'static str,
) -> Result<(), ShapeError> {
    if !on_boundary {
        return Ok(());
    }
    let suspects = roots.iter().filter(|&r| r != 0.0 && r.abs() < ROOT_SNAP).count();
    if suspects > 1 {
        return Err(ShapeError::AmbiguousRoots { shape, surface, count: suspects });
    }
    for r in roots.as_mut_slice() {
        if r.abs() < ROOT_SNAP {
            *r = 0.0;
        }
    }
    Ok(())
}

/// Smallest strictly positive root accepted by `accept`
fn smallest_positive(roots: &Roots, accept: impl Fn(f64) -> bool) -> Option<f64> {
    roots
        .iter()
        .filter(|&t| t > 0.0 && accept(t))
        .fold(None, |best: Option<f64>, t| Some(best.map_or(t, |b| b.min(t))))
}

/// Flip `n` so that n·dir ≥ 0; a tangent direction falls back to the outward side
fn orient(n: Vec3, dir: &Vec3, point: &Vec3) -> Vec3 {
    let s = n.dot(dir);
    if s < 0.0 || (s == 0.0 && n.dot(point) < 0.0) {
        -n
    } else {
        n
    }
}

// ============================================================================
// BOX
// ============================================================================

const BOX_FACES: [[&str; 2]; 3] = [["+x", "-x"], ["+y", "-y"], ["+z", "-z"]];

/// Axis-aligned box centred on the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxShape {
    /// Half-lengths (m)
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl BoxShape {
    pub fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    pub fn half_lengths(&self) -> [f64; 3] {
        [self.dx, self.dy, self.dz]
    }

    fn within(&self, p: &Vec3, tol: f64) -> bool {
        p.x.abs() <= self.dx + tol && p.y.abs() <= self.dy + tol && p.z.abs() <= self.dz + tol
    }

    fn face_times(
        &self,
        point: &Vec3,
        velocity: &Vec3,
        field: &Vec3,
        on_boundary: bool,
        accept: impl Fn(f64) -> bool,
    ) -> Result<Option<f64>, ShapeError> {
        let d = self.half_lengths();
        let mut best: Option<f64> = None;
        for i in 0..3 {
            for (j, side) in [d[i], -d[i]].into_iter().enumerate() {
                let mut roots = plane_roots(field.axis(i), velocity.axis(i), point.axis(i) - side, on_boundary);
                snap_roots(&mut roots, on_boundary, "box", BOX_FACES[i][j])?;
                if let Some(t) = smallest_positive(&roots, &accept) {
                    best = Some(best.map_or(t, |b| b.min(t)));
                }
            }
        }
        Ok(best)
    }
}

impl BoundaryTime for BoxShape {
    fn name(&self) -> &'static str {
        "box"
    }

    fn bounding_box(&self) -> Vec3 {
        Vec3::new(self.dx, self.dy, self.dz)
    }

    fn capacity(&self) -> f64 {
        8.0 * self.dx * self.dy * self.dz
    }

    fn contains(&self, point: &Vec3) -> bool {
        self.within(point, 0.0)
    }

    fn safety(&self, point: &Vec3) -> f64 {
        (self.dx - point.x.abs())
            .min(self.dy - point.y.abs())
            .min(self.dz - point.z.abs())
    }

    fn compute_normal(&self, point: &Vec3, dir: &Vec3) -> Vec3 {
        let d = self.half_lengths();
        let mut axis = 0;
        let mut closest = f64::INFINITY;
        for (i, &di) in d.iter().enumerate() {
            let s = (di - point.axis(i).abs()).abs();
            if s < closest {
                closest = s;
                axis = i;
            }
        }
        let n = match axis {
            0 => Vec3::unit_x(),
            1 => Vec3::unit_y(),
            _ => Vec3::unit_z(),
        };
        orient(n, dir, point)
    }

    fn time_from_inside(
        &self,
        point: &Vec3,
        velocity: &Vec3,
        field: &Vec3,
        on_boundary: bool,
    ) -> Result<f64, ShapeError> {
        self.face_times(point, velocity, field, on_boundary, |_| true)?
            .ok_or(ShapeError::NoIntersectionFound { shape: "box" })
    }

    /// A box is its own bounding box, so `max_time` offers no early rejection
    fn time_from_outside(
        &self,
        point: &Vec3,
        velocity: &Vec3,
        field: &Vec3,
        _max_time: f64,
        on_boundary: bool,
    ) -> Result<f64, ShapeError> {
        let hit = self.face_times(point, velocity, field, on_boundary, |t| {
            self.within(&position_at(point, velocity, field, t), TOLERANCE)
        })?;
        Ok(hit.unwrap_or(f64::INFINITY))
    }
}

// ============================================================================
// TUBE
// ============================================================================

/// Cylindrical tube along the local z axis, optionally hollow
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TubeShape {
    /// Inner radius (m), zero for a solid cylinder
    pub rmin: f64,
    /// Outer radius (m)
    pub rmax: f64,
    /// Half-length (m)
    pub dz: f64,
}

impl TubeShape {
    pub fn new(rmin: f64, rmax: f64, dz: f64) -> Self {
        Self { rmin, rmax, dz }
    }

    fn radii(&self) -> impl Iterator<Item = (&'static str, f64)> {
        let inner = (self.rmin > 0.0).then_some(("rmin", self.rmin));
        std::iter::once(("rmax", self.rmax)).chain(inner)
    }
}

impl BoundaryTime for TubeShape {
    fn name(&self) -> &'static str {
        "tube"
    }

    fn bounding_box(&self) -> Vec3 {
        Vec3::new(self.rmax, self.rmax, self.dz)
    }

    fn capacity(&self) -> f64 {
        2.0 * self.dz * PI * (self.rmax * self.rmax - self.rmin * self.rmin)
    }

    fn contains(&self, point: &Vec3) -> bool {
        let r2 = point.x * point.x + point.y * point.y;
        point.z.abs() <= self.dz && r2 <= self.rmax * self.rmax && r2 >= self.rmin * self.rmin
    }

    fn safety(&self, point: &Vec3) -> f64 {
        let r = point.perp();
        let mut s = (self.dz - point.z.abs()).min(self.rmax - r);
        if self.rmin > 0.0 {
            s = s.min(r - self.rmin);
        }
        s
    }

    fn compute_normal(&self, point: &Vec3, dir: &Vec3) -> Vec3 {
        let r = point.perp();
        let s_z = (self.dz - point.z.abs()).abs();
        let s_rmax = (self.rmax - r).abs();
        let s_rmin = if self.rmin > 0.0 { (r - self.rmin).abs() } else { f64::INFINITY };

        let n = if s_z <= s_rmax && s_z <= s_rmin {
            Vec3::unit_z()
        } else if r > 0.0 {
            Vec3::new(point.x / r, point.y / r, 0.0)
        } else {
            Vec3::unit_x()
        };
        orient(n, dir, point)
    }

    fn time_from_inside(
        &self,
        point: &Vec3,
        velocity: &Vec3,
        field: &Vec3,
        on_boundary: bool,
    ) -> Result<f64, ShapeError> {
        let mut best = f64::INFINITY;

        for (surface, side) in [("+z", self.dz), ("-z", -self.dz)] {
            let mut roots = plane_roots(field.z, velocity.z, point.z - side, on_boundary);
            snap_roots(&mut roots, on_boundary, "tube", surface)?;
            if let Some(t) = smallest_positive(&roots, |_| true) {
                best = best.min(t);
            }
        }

        for (surface, radius) in self.radii() {
            let mut roots = cylinder_roots(point, velocity, field, radius, on_boundary);
            snap_roots(&mut roots, on_boundary, "tube", surface)?;
            if let Some(t) = smallest_positive(&roots, |_| true) {
                best = best.min(t);
            }
        }

        if best.is_finite() {
            Ok(best)
        } else {
            Err(ShapeError::NoIntersectionFound { shape: "tube" })
        }
    }

    fn time_from_outside(
        &self,
        point: &Vec3,
        velocity: &Vec3,
        field: &Vec3,
        max_time: f64,
        on_boundary: bool,
    ) -> Result<f64, ShapeError> {
        // Cheap rejection: the bounding box cannot be reached within the step
        let bbox = BoxShape::new(self.rmax, self.rmax, self.dz);
        if !bbox.contains(point)
            && matches!(
                bbox.time_from_outside(point, velocity, field, max_time, on_boundary),
                Ok(t) if t > max_time + TOLERANCE
            )
        {
            return Ok(f64::INFINITY);
        }

        let mut best = f64::INFINITY;

        for (surface, side) in [("+z", self.dz), ("-z", -self.dz)] {
            let mut roots = plane_roots(field.z, velocity.z, point.z - side, on_boundary);
            snap_roots(&mut roots, on_boundary, "tube", surface)?;
            let on_annulus = |t: f64| {
                let r = position_at(point, velocity, field, t).perp();
                r <= self.rmax + TOLERANCE && r >= self.rmin - TOLERANCE
            };
            if let Some(t) = smallest_positive(&roots, on_annulus) {
                best = best.min(t);
            }
        }

        for (surface, radius) in self.radii() {
            let mut roots = cylinder_roots(point, velocity, field, radius, on_boundary);
            snap_roots(&mut roots, on_boundary, "tube", surface)?;
            let within_length = |t: f64| position_at(point, velocity, field, t).z.abs() <= self.dz + TOLERANCE;
            if let Some(t) = smallest_positive(&roots, within_length) {
                best = best.min(t);
            }
        }

        Ok(best)
    }
}

// ============================================================================
// SHAPE DISPATCH
// ============================================================================

/// Closed set of supported solids
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Box(BoxShape),
    Tube(TubeShape),
}

impl Shape {
    /// Box with half-lengths
    pub fn cuboid(dx: f64, dy: f64, dz: f64) -> Self {
        Shape::Box(BoxShape::new(dx, dy, dz))
    }

    /// Tube with inner/outer radius and half-length
    pub fn tube(rmin: f64, rmax: f64, dz: f64) -> Self {
        Shape::Tube(TubeShape::new(rmin, rmax, dz))
    }

    fn inner(&self) -> &dyn BoundaryTime {
        match self {
            Shape::Box(b) => b,
            Shape::Tube(t) => t,
        }
    }

    /// Check dimensions are finite and ordered
    pub fn validate(&self) -> Result<(), String> {
        let positive = |v: f64| v > 0.0 && v.is_finite();
        match self {
            Shape::Box(b) => {
                if !(positive(b.dx) && positive(b.dy) && positive(b.dz)) {
                    return Err(format!("box half-lengths must be positive, got {:?}", b));
                }
            }
            Shape::Tube(t) => {
                if !(positive(t.rmax) && positive(t.dz)) {
                    return Err(format!("tube rmax and dz must be positive, got {:?}", t));
                }
                if !(t.rmin >= 0.0 && t.rmin < t.rmax) {
                    return Err(format!("tube needs 0 <= rmin < rmax, got {:?}", t));
                }
            }
        }
        Ok(())
    }
}

impl BoundaryTime for Shape {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn bounding_box(&self) -> Vec3 {
        self.inner().bounding_box()
    }

    fn capacity(&self) -> f64 {
        self.inner().capacity()
    }

    fn contains(&self, point: &Vec3) -> bool {
        self.inner().contains(point)
    }

    fn safety(&self, point: &Vec3) -> f64 {
        self.inner().safety(point)
    }

    fn compute_normal(&self, point: &Vec3, dir: &Vec3) -> Vec3 {
        self.inner().compute_normal(point, dir)
    }

    fn time_from_inside(
        &self,
        point: &Vec3,
        velocity: &Vec3,
        field: &Vec3,
        on_boundary: bool,
    ) -> Result<f64, ShapeError> {
        self.inner().time_from_inside(point, velocity, field, on_boundary)
    }

    fn time_from_outside(
        &self,
        point: &Vec3,
        velocity: &Vec3,
        field: &Vec3,
        max_time: f64,
        on_boundary: bool,
    ) -> Result<f64, ShapeError> {
        self.inner().time_from_outside(point, velocity, field, max_time, on_boundary)
    }
}

// ============================================================================
// TESTS
// ============================================================================
