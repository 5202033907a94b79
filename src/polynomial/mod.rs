//! # Polynomial Module
//!
//! Closed-form real roots of polynomials up to quartic order.
//!
//! Every boundary-time query reduces to one of these equations: planar faces
//! give quadratics in t, the radial wall of a tube gives a quartic. The
//! solvers are stateless and never surface complex roots.
//!
//! ## Methods
//!
//! - Quadratic: numerically stable form q = -½(b + sgn(b)·√Δ)
//! - Cubic: depressed form y³ + p·y + q = 0 solved with the trigonometric
//!   (three real roots) or hyperbolic (one real root) substitution
//! - Quartic: Ferrari's method through the resolvent cubic
//!
//! A zero leading coefficient drops the order of the equation. A zero
//! constant term factors out an exact root at zero. Cubic and quartic roots
//! are polished with Newton iterations on the original polynomial.
//!
//! ## References
//!
//! [1] Press et al. "Numerical Recipes", 3rd ed., §5.6
//! [2] Nickalls, R.W.D. "A new approach to solving the cubic", Math. Gazette 77 (1993)

use std::f64::consts::PI;

/// Newton iterations applied to cubic and quartic roots
const POLISH_ITERATIONS: usize = 2;

// ============================================================================
// ROOT SET
// ============================================================================

/// Up to four real roots, sorted ascending
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roots {
    values: [f64; 4],
    len: usize,
}

impl Roots {
    pub const fn empty() -> Self {
        Self { values: [0.0; 4], len: 0 }
    }

    fn from_slice(values: &[f64]) -> Self {
        let mut roots = Self::empty();
        for &v in values {
            roots.push(v);
        }
        roots
    }

    fn push(&mut self, value: f64) {
        assert!(self.len < 4, "a polynomial of degree <= 4 has at most four roots");
        self.values[self.len] = value;
        self.len += 1;
    }

    fn sort(&mut self) {
        self.values[..self.len].sort_by(|a, b| a.total_cmp(b));
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values[..self.len]
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.as_slice().iter().copied()
    }

    /// Mutable access, used by callers that snap roots in place
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values[..self.len]
    }
}

impl std::ops::Index<usize> for Roots {
    type Output = f64;
    fn index(&self, i: usize) -> &f64 {
        &self.as_slice()[i]
    }
}

// ============================================================================
// SOLVERS
// ============================================================================

/// Real roots of a·t + b = 0
pub fn linear(a: f64, b: f64) -> Roots {
    if a == 0.0 {
        Roots::empty()
    } else {
        Roots::from_slice(&[-b / a])
    }
}

/// Real roots of a·t² + b·t + c = 0
pub fn quadratic(a: f64, b: f64, c: f64) -> Roots {
    if a == 0.0 {
        return linear(b, c);
    }
    if c == 0.0 {
        // t·(a·t + b) = 0
        let mut roots = if b == 0.0 {
            Roots::from_slice(&[0.0])
        } else {
            Roots::from_slice(&[0.0, -b / a])
        };
        roots.sort();
        return roots;
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Roots::empty();
    }
    if disc == 0.0 {
        return Roots::from_slice(&[-0.5 * b / a]);
    }

    let sign = if b < 0.0 { -1.0 } else { 1.0 };
    let q = -0.5 * (b + sign * disc.sqrt());
    let mut roots = Roots::from_slice(&[q / a, c / q]);
    roots.sort();
    roots
}

/// Real roots of a·t³ + b·t² + c·t + d = 0
///
/// # Panics
/// If the number of roots produced disagrees with the class predicted by the
/// discriminant. That can only happen through a defect in this function.
pub fn cubic(a: f64, b: f64, c: f64, d: f64) -> Roots {
    if a == 0.0 {
        return quadratic(b, c, d);
    }
    if d == 0.0 {
        let mut roots = quadratic(a, b, c);
        roots.push(0.0);
        roots.sort();
        return roots;
    }

    let a2 = b / a;
    let a1 = c / a;
    let a0 = d / a;

    // Depressed cubic y³ + p·y + q = 0 with t = y - a2/3
    let p = a1 - a2 * a2 / 3.0;
    let q = 2.0 * a2 * a2 * a2 / 27.0 - a2 * a1 / 3.0 + a0;
    let shift = -a2 / 3.0;
    let disc = p * p * p / 27.0 + q * q / 4.0;
    let expected = if disc > 0.0 { 1 } else { 3 };

    let mut roots = Roots::empty();
    if p == 0.0 {
        if q == 0.0 {
            for _ in 0..3 {
                roots.push(shift);
            }
        } else {
            roots.push(-q.cbrt() + shift);
        }
    } else {
        let m = 2.0 * (p.abs() / 3.0).sqrt();
        let ratio = 0.5 * q * (3.0 / p.abs()).powf(1.5);
        if disc > 0.0 {
            let y = if p > 0.0 {
                -m * (ratio.asinh() / 3.0).sinh()
            } else {
                -q.signum() * m * (ratio.abs().max(1.0).acosh() / 3.0).cosh()
            };
            roots.push(y + shift);
        } else {
            let theta = (-ratio).clamp(-1.0, 1.0).acos() / 3.0;
            for k in 0..3 {
                let y = m * (theta - 2.0 * PI * k as f64 / 3.0).cos();
                roots.push(y + shift);
            }
        }
    }

    assert_eq!(
        roots.len(),
        expected,
        "cubic root count {} disagrees with discriminant {:e}",
        roots.len(),
        disc
    );

    let coeffs = [a, b, c, d];
    for r in roots.as_mut_slice() {
        *r = polish(&coeffs, *r);
    }
    roots.sort();
    roots
}

/// Real roots of a·t⁴ + b·t³ + c·t² + d·t + e = 0
///
/// # Panics
/// If Ferrari's auxiliary quantity W² comes out clearly negative, which the
/// choice of the largest resolvent root rules out mathematically.
pub fn quartic(a: f64, b: f64, c: f64, d: f64, e: f64) -> Roots {
    if a == 0.0 {
        return cubic(b, c, d, e);
    }
    if e == 0.0 {
        let mut roots = cubic(a, b, c, d);
        roots.push(0.0);
        roots.sort();
        return roots;
    }

    let a3 = b / a;
    let a2 = c / a;
    let a1 = d / a;
    let a0 = e / a;

    let resolvent = cubic(
        1.0,
        -a2,
        a1 * a3 - 4.0 * a0,
        4.0 * a2 * a0 - a1 * a1 - a3 * a3 * a0,
    );
    // A monic cubic always has at least one real root
    let z0 = resolvent.iter().fold(f64::NEG_INFINITY, f64::max);

    let scale = 1.0f64.max(0.25 * a3 * a3).max(a2.abs()).max(z0.abs());
    let mut w2 = 0.25 * a3 * a3 - a2 + z0;
    assert!(
        w2 > -1e-9 * scale,
        "Ferrari W² = {:e} is negative for the largest resolvent root",
        w2
    );
    if w2 < 1e-14 * scale {
        w2 = 0.0;
    }
    let w = w2.sqrt();

    let base = 0.75 * a3 * a3 - 2.0 * a2;
    let (u2, v2) = if w == 0.0 {
        let s = z0 * z0 - 4.0 * a0;
        let t = if s > 0.0 { 2.0 * s.sqrt() } else { 0.0 };
        (base + t, base - t)
    } else {
        let k = 0.25 * (4.0 * a3 * a2 - 8.0 * a1 - a3 * a3 * a3) / w;
        (base - w2 + k, base - w2 - k)
    };

    let mut roots = Roots::empty();
    let centre = -0.25 * a3;
    if u2 >= 0.0 {
        let u = u2.sqrt();
        roots.push(centre + 0.5 * w + 0.5 * u);
        roots.push(centre + 0.5 * w - 0.5 * u);
    }
    if v2 >= 0.0 {
        let v = v2.sqrt();
        roots.push(centre - 0.5 * w + 0.5 * v);
        roots.push(centre - 0.5 * w - 0.5 * v);
    }

    let coeffs = [a, b, c, d, e];
    for r in roots.as_mut_slice() {
        *r = polish(&coeffs, *r);
    }
    roots.sort();
    roots
}

/// Evaluate a polynomial (highest power first) and its derivative
fn eval(coeffs: &[f64], t: f64) -> (f64, f64) {
    let mut f = 0.0;
    let mut df = 0.0;
    for &c in coeffs {
        df = df * t + f;
        f = f * t + c;
    }
    (f, df)
}

/// Newton refinement that never makes the residual worse
fn polish(coeffs: &[f64], mut t: f64) -> f64 {
    for _ in 0..POLISH_ITERATIONS {
        let (f, df) = eval(coeffs, t);
        if f == 0.0 || df == 0.0 {
            break;
        }
        let candidate = t - f / df;
        if !candidate.is_finite() {
            break;
        }
        if eval(coeffs, candidate).0.abs() <= f.abs() {
            t = candidate;
        } else {
            break;
        }
    }
    t
}

// ============================================================================
// TESTS
// ============================================================================
