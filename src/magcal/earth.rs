//! Earth-induction estimator
//!
//! Collects navigation-frame induction vectors while circling, split by
//! turning direction. Averaging over full circles in both directions
//! cancels heading-dependent deviation, so the combined mean estimates
//! the local Earth field. The scalar variance gates whether the estimate
//! is trustworthy enough to replace the configured field model.

use crate::math::Vec3;

/// Samples required in each bank before the estimate is usable
const MIN_SAMPLES: u32 = 500;

#[derive(Debug, Clone, Copy, Default)]
struct VectorStatistics {
    n: u32,
    sum: [f64; 3],
    sum_sq: [f64; 3],
}

impl VectorStatistics {
    fn add(&mut self, v: Vec3) {
        self.n += 1;
        for i in 0..3 {
            self.sum[i] += v[i] as f64;
            self.sum_sq[i] += (v[i] as f64) * (v[i] as f64);
        }
    }

    fn mean(&self) -> Vec3 {
        let n = self.n as f64;
        Vec3::new(
            (self.sum[0] / n) as f32,
            (self.sum[1] / n) as f32,
            (self.sum[2] / n) as f32,
        )
    }

    /// Sum over components of the per-component variance.
    fn variance(&self) -> f32 {
        let n = self.n as f64;
        let mut total = 0.0;
        for i in 0..3 {
            let mean = self.sum[i] / n;
            total += (self.sum_sq[i] / n - mean * mean).max(0.0);
        }
        total as f32
    }
}

/// Per-turn-direction induction statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct EarthInductionCollector {
    right: VectorStatistics,
    left: VectorStatistics,
}

impl EarthInductionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, induction_nav: Vec3, right_turn: bool) {
        if right_turn {
            self.right.add(induction_nav);
        } else {
            self.left.add(induction_nav);
        }
    }

    /// Both banks hold enough samples for a balanced estimate.
    pub fn data_valid(&self) -> bool {
        self.right.n >= MIN_SAMPLES && self.left.n >= MIN_SAMPLES
    }

    /// Mean induction, balanced over both turning directions.
    pub fn estimated_induction(&self) -> Vec3 {
        (self.right.mean() + self.left.mean()) * 0.5
    }

    /// Scalar variance of the estimate (averaged over both banks).
    pub fn variance(&self) -> f32 {
        0.5 * (self.right.variance() + self.left.variance())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
