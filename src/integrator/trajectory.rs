//! Sampled balance path produced by an integration run

use serde::Serialize;

/// Evenly spaced reporting times `linspace(0, horizon, count)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportingGrid {
    end: f64,
    count: usize,
}

impl ReportingGrid {
    /// Grid over `[0, end]`; callers guarantee `end > 0` and `count >= 2`
    pub fn new(end: f64, count: usize) -> Self {
        Self { end, count }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Time of sample `i`; the last sample lands exactly on `end`
    pub fn time(&self, i: usize) -> f64 {
        if i + 1 >= self.count {
            self.end
        } else {
            self.end * i as f64 / (self.count - 1) as f64
        }
    }
}

/// Ordered (time, balance) samples with strictly increasing time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trajectory {
    times: Vec<f64>,
    balances: Vec<f64>,
}

impl Trajectory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            times: Vec::with_capacity(capacity),
            balances: Vec::with_capacity(capacity),
        }
    }

    /// Append a sample; ignored unless later than the last one
    pub fn push(&mut self, t: f64, balance: f64) -> bool {
        if self.times.last().is_some_and(|&last| t <= last) {
            return false;
        }
        self.times.push(t);
        self.balances.push(balance);
        true
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn balances(&self) -> &[f64] {
        &self.balances
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        Some((*self.times.last()?, *self.balances.last()?))
    }

    /// Iterate `(t, balance)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.balances.iter().copied())
    }

    /// Samples with `t <= until`
    pub fn up_to(&self, until: f64) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.iter().take_while(move |&(t, _)| t <= until)
    }
}
