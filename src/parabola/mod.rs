//! # Parabola Module
//!
//! Kinematics of a point moving under constant acceleration.
//!
//! x(t) = x₀ + v₀·t + ½·g·t²
//! v(t) = v₀ + g·t
//!
//! The arc length is the integral of the speed |v₀ + g·t|:
//!
//! s(t) = ∫₀ᵗ √(A·τ² + B·τ + C) dτ,  A = |g|², B = 2·v₀·g, C = |v₀|²
//!
//! It has the closed form
//!
//! F(τ) = (2Aτ + B)·√(Aτ² + Bτ + C) / 4A
//!      + (4AC - B²)/(8A^{3/2})·asinh((2Aτ + B)/√(4AC - B²))
//!
//! which breaks down when v₀ and g are collinear (4AC - B² = 0). That case
//! is integrated piecewise on the signed speed along g.

use crate::types::Vec3;

/// Position after time `t`
#[inline]
pub fn position_at(position: &Vec3, velocity: &Vec3, field: &Vec3, t: f64) -> Vec3 {
    *position + *velocity * t + *field * (0.5 * t * t)
}

/// Velocity after time `t`
#[inline]
pub fn velocity_at(velocity: &Vec3, field: &Vec3, t: f64) -> Vec3 {
    *velocity + *field * t
}

/// Path length travelled along the parabola in time `t` (t ≥ 0)
pub fn arc_length(velocity: &Vec3, field: &Vec3, t: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t.is_infinite() {
        return f64::INFINITY;
    }

    let a = field.mag_squared();
    let c = velocity.mag_squared();
    if a == 0.0 {
        return c.sqrt() * t;
    }
    let b = 2.0 * velocity.dot(field);
    let disc = 4.0 * a * c - b * b;

    if disc <= 1e-24 * a * c.max(1e-300) {
        return collinear_length(velocity, field, t);
    }

    let root_disc = disc.sqrt();
    let antiderivative = |tau: f64| {
        let speed = (a * tau * tau + b * tau + c).max(0.0).sqrt();
        let lin = 2.0 * a * tau + b;
        lin * speed / (4.0 * a) + disc / (8.0 * a * a.sqrt()) * (lin / root_disc).asinh()
    };
    (antiderivative(t) - antiderivative(0.0)).max(0.0)
}

/// Arc length when velocity and acceleration are parallel
fn collinear_length(velocity: &Vec3, field: &Vec3, t: f64) -> f64 {
    let g = field.mag();
    let u0 = velocity.dot(field) / g;
    let u1 = u0 + g * t;
    if u0 * u1 >= 0.0 {
        0.5 * (u0.abs() + u1.abs()) * t
    } else {
        // Turns around at u = 0
        (u0 * u0 + u1 * u1) / (2.0 * g)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Trapezoid-rule reference for the arc length
    fn numeric_length(v: &Vec3, g: &Vec3, t: f64) -> f64 {
        let n = 200_000;
        let h = t / n as f64;
        let speed = |tau: f64| velocity_at(v, g, tau).mag();
        let mut sum = 0.5 * (speed(0.0) + speed(t));
        for i in 1..n {
            sum += speed(i as f64 * h);
        }
        sum * h
    }

    #[test]
    fn test_straight_line() {
        let v = Vec3::new(3.0, 4.0, 0.0);
        let s = arc_length(&v, &Vec3::zero(), 2.0);
        assert!((s - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_general_parabola() {
        let v = Vec3::new(2.0, -1.0, 3.0);
        let g = Vec3::new(0.0, 0.0, -9.80665);
        let t = 1.3;
        let s = arc_length(&v, &g, t);
        let reference = numeric_length(&v, &g, t);
        assert!((s - reference).abs() < 1e-8, "s = {}, reference = {}", s, reference);
    }

    #[test]
    fn test_vertical_throw() {
        // Up at 4.9 m/s, apex after ~0.5 s, back down
        let g = Vec3::new(0.0, 0.0, -9.80665);
        let v = Vec3::new(0.0, 0.0, 4.903325);
        let t = 1.0;
        let s = arc_length(&v, &g, t);
        // Up then down the same height
        let h = v.z * v.z / (2.0 * 9.80665);
        assert!((s - 2.0 * h).abs() < 1e-9, "s = {}, 2h = {}", s, 2.0 * h);
    }

    #[test]
    fn test_falling_from_rest() {
        let g = Vec3::new(0.0, 0.0, -9.80665);
        let s = arc_length(&Vec3::zero(), &g, 0.5);
        assert!((s - 0.5 * 9.80665 * 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_times() {
        let v = Vec3::unit_x();
        let g = Vec3::new(0.0, 0.0, -9.8);
        assert_eq!(arc_length(&v, &g, 0.0), 0.0);
        assert!(arc_length(&v, &g, f64::INFINITY).is_infinite());
    }

    #[test]
    fn test_position_and_velocity() {
        let x0 = Vec3::new(0.0, 0.0, 1.0);
        let v0 = Vec3::new(1.0, 0.0, 0.0);
        let g = Vec3::new(0.0, 0.0, -2.0);
        let x = position_at(&x0, &v0, &g, 1.0);
        assert!((x - Vec3::new(1.0, 0.0, 0.0)).mag() < 1e-15);
        let v = velocity_at(&v0, &g, 1.0);
        assert!((v - Vec3::new(1.0, 0.0, -2.0)).mag() < 1e-15);
    }
}
