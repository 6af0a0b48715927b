//! Continuous extension of an accepted step

use super::tableau::{P, STAGES};

/// Quartic interpolant of the balance over one accepted step `[t_start, t_end]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DenseStep {
    t_start: f64,
    t_end: f64,
    y_start: f64,
    y_end: f64,
    h: f64,
    q: [f64; 4],
}

impl DenseStep {
    /// Build the interpolant from the step's stage derivatives (FSAL stage last)
    pub fn new(t_start: f64, y_start: f64, t_end: f64, y_end: f64, k: &[f64; STAGES + 1]) -> Self {
        let mut q = [0.0; 4];
        for (j, qj) in q.iter_mut().enumerate() {
            *qj = k.iter().zip(P.iter()).map(|(ki, row)| ki * row[j]).sum();
        }
        Self {
            t_start,
            t_end,
            y_start,
            y_end,
            h: t_end - t_start,
            q,
        }
    }

    pub fn t_start(&self) -> f64 {
        self.t_start
    }

    pub fn t_end(&self) -> f64 {
        self.t_end
    }

    pub fn y_start(&self) -> f64 {
        self.y_start
    }

    pub fn y_end(&self) -> f64 {
        self.y_end
    }

    /// Interpolated balance at `t`; the step endpoints return the stored values exactly
    pub fn eval(&self, t: f64) -> f64 {
        if t == self.t_start {
            return self.y_start;
        }
        if t == self.t_end {
            return self.y_end;
        }
        let x = (t - self.t_start) / self.h;
        let mut power = x;
        let mut acc = 0.0;
        for qj in &self.q {
            acc += qj * power;
            power *= x;
        }
        self.y_start + self.h * acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::tableau::{B, C};
    use approx::assert_abs_diff_eq;

    /// One Dormand-Prince step of y' = f(t) built by hand
    fn step_of(f: impl Fn(f64) -> f64, h: f64) -> DenseStep {
        let mut k = [0.0; STAGES + 1];
        for i in 0..STAGES {
            k[i] = f(C[i] * h);
        }
        let y_end: f64 = h * B.iter().zip(k.iter()).map(|(b, ki)| b * ki).sum::<f64>();
        k[STAGES] = f(h);
        DenseStep::new(0.0, 0.0, h, y_end, &k)
    }

    #[test]
    fn test_interpolates_polynomial_quadrature() {
        // y' = 3t^2  =>  y = t^3, integrated exactly by the interpolant
        let step = step_of(|t| 3.0 * t * t, 2.0);
        for &t in &[0.25, 0.5, 1.0, 1.5, 1.9] {
            assert_abs_diff_eq!(step.eval(t), t * t * t, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_endpoints_exact() {
        let step = step_of(|t| 1.0 + t, 0.5);
        assert_eq!(step.eval(0.0), 0.0);
        assert_eq!(step.eval(0.5), step.y_end());
    }
}
