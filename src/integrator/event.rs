//! Event descriptors and sub-step localization of level crossings

use serde::{Deserialize, Serialize};

use super::dense::DenseStep;

/// Direction of a level crossing that an event responds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// From above the level to at-or-below it
    Falling,
    /// From below the level to at-or-above it
    Rising,
    Either,
}

/// Event function `g(t, B) = B - level` plus how the integrator reacts to it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventDescriptor {
    pub level: f64,
    pub direction: Direction,
    /// Stop integrating at the first crossing
    pub terminal: bool,
}

impl EventDescriptor {
    /// Balance reaching zero from above; stops the run
    pub fn payoff() -> Self {
        Self {
            level: 0.0,
            direction: Direction::Falling,
            terminal: true,
        }
    }

    pub fn eval(&self, balance: f64) -> f64 {
        balance - self.level
    }

    /// Whether a step from `g_old` to `g_new` brackets a crossing this event honors
    pub fn triggers(&self, g_old: f64, g_new: f64) -> bool {
        let falling = g_old > 0.0 && g_new <= 0.0;
        let rising = g_old < 0.0 && g_new >= 0.0;
        match self.direction {
            Direction::Falling => falling,
            Direction::Rising => rising,
            Direction::Either => falling || rising,
        }
    }
}

/// A located crossing
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Crossing {
    pub t: f64,
    pub balance: f64,
    /// Root-finder iterations spent
    pub iterations: u32,
}

/// Stopping rule for the root finder
#[derive(Debug, Clone, Copy)]
pub struct LocalizerTolerance {
    /// Bracket width in months
    pub time: f64,
    /// Absolute value of g
    pub balance: f64,
    pub max_iterations: u32,
}

/// Refine the crossing inside an accepted step using its dense interpolant
pub fn localize(step: &DenseStep, event: &EventDescriptor, tol: &LocalizerTolerance) -> Crossing {
    let g = |t: f64| event.eval(step.eval(t));
    let g_start = event.eval(step.y_start());
    let g_end = event.eval(step.y_end());

    if g_end == 0.0 {
        return Crossing {
            t: step.t_end(),
            balance: step.y_end(),
            iterations: 0,
        };
    }

    let (t, _, iterations) = brent(g, step.t_start(), step.t_end(), g_start, g_end, tol);
    Crossing {
        t,
        balance: step.eval(t),
        iterations,
    }
}

/// Brent's method (inverse quadratic interpolation with bisection safeguard)
/// on a bracket `[a, b]` with `f(a)` and `f(b)` of opposite sign
///
/// Returns `(root, f(root), iterations)`.
fn brent<F: Fn(f64) -> f64>(
    f: F,
    a: f64,
    b: f64,
    fa: f64,
    fb: f64,
    tol: &LocalizerTolerance,
) -> (f64, f64, u32) {
    let (mut a, mut b, mut fa, mut fb) = (a, b, fa, fb);
    let (mut c, mut fc) = (b, fb);
    let mut d = b - a;
    let mut e = d;

    for iteration in 1..=tol.max_iterations {
        if (fb > 0.0 && fc > 0.0) || (fb < 0.0 && fc < 0.0) {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol1 = 2.0 * f64::EPSILON * b.abs() + 0.5 * tol.time;
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol1 || fb.abs() <= tol.balance {
            return (b, fb, iteration);
        }

        if e.abs() >= tol1 && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                (2.0 * xm * s, 1.0 - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * xm * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();

            let min1 = 3.0 * xm * q - (tol1 * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol1 { d } else { tol1.copysign(xm) };
        fb = f(b);
    }

    (b, fb, tol.max_iterations)
}
