//! Streaming linear least-squares accumulator

/// Minimum number of samples before a fit is attempted
const MIN_SAMPLES: u32 = 100;

/// Result of a straight-line fit `y = offset + slope * x`.
#[derive(Debug, Clone, Copy)]
pub struct Regression {
    pub offset: f32,
    pub slope: f32,
    /// Residual variance of the fit
    pub variance: f32,
}

/// Streaming linear regression over `(x, y)` pairs.
///
/// Accumulates in double precision: the sums of squares reach 1e11 for a
/// long circling phase, beyond single-precision resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearLeastSquares {
    n: u32,
    sx: f64,
    sy: f64,
    sxx: f64,
    sxy: f64,
    syy: f64,
}

impl LinearLeastSquares {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_value(&mut self, x: f32, y: f32) {
        let (x, y) = (x as f64, y as f64);
        self.n += 1;
        self.sx += x;
        self.sy += y;
        self.sxx += x * x;
        self.sxy += x * y;
        self.syy += y * y;
    }

    pub fn len(&self) -> u32 {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Fit the accumulated samples.
    ///
    /// Returns `None` below [`MIN_SAMPLES`] or when the x spread is too
    /// small to determine a slope.
    pub fn fit(&self) -> Option<Regression> {
        if self.n < MIN_SAMPLES {
            return None;
        }
        let n = self.n as f64;
        let det = n * self.sxx - self.sx * self.sx;
        if det < 1e-6 * n * self.sxx.max(1.0) {
            return None;
        }
        let slope = (n * self.sxy - self.sx * self.sy) / det;
        let offset = (self.sy - slope * self.sx) / n;

        // residual sum of squares of y against the fitted line
        let sse = self.syy - 2.0 * offset * self.sy - 2.0 * slope * self.sxy
            + n * offset * offset
            + 2.0 * offset * slope * self.sx
            + slope * slope * self.sxx;
        let variance = (sse / (n - 2.0)).max(0.0);

        Some(Regression {
            offset: offset as f32,
            slope: slope as f32,
            variance: variance as f32,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_few_samples_returns_none() {
        let mut r = LinearLeastSquares::new();
        for i in 0..(MIN_SAMPLES - 1) {
            r.add_value(i as f32, i as f32);
        }
        assert!(r.fit().is_none());
    }

    #[test]
    fn test_exact_line_is_recovered() {
        let mut r = LinearLeastSquares::new();
        for i in 0..200 {
            let x = i as f32 * 0.1 - 10.0;
            r.add_value(x, 3.0 + 1.5 * x);
        }
        let fit = r.fit().unwrap();
        assert!((fit.offset - 3.0).abs() < 1e-3, "offset = {}", fit.offset);
        assert!((fit.slope - 1.5).abs() < 1e-3, "slope = {}", fit.slope);
        assert!(fit.variance < 1e-6, "variance = {}", fit.variance);
    }

    #[test]
    fn test_noise_raises_variance() {
        let mut r = LinearLeastSquares::new();
        // deterministic +/-0.5 alternating disturbance
        for i in 0..400 {
            let x = i as f32 * 0.05;
            let noise = if i % 2 == 0 { 0.5 } else { -0.5 };
            r.add_value(x, 2.0 * x + noise);
        }
        let fit = r.fit().unwrap();
        assert!((fit.slope - 2.0).abs() < 0.01);
        assert!(fit.variance > 0.2, "variance = {}", fit.variance);
    }

    #[test]
    fn test_degenerate_x_returns_none() {
        let mut r = LinearLeastSquares::new();
        for _ in 0..200 {
            r.add_value(1.0, 2.0);
        }
        assert!(r.fit().is_none());
    }

    #[test]
    fn test_reset_clears_samples() {
        let mut r = LinearLeastSquares::new();
        for i in 0..200 {
            r.add_value(i as f32, i as f32);
        }
        r.reset();
        assert!(r.is_empty());
        assert!(r.fit().is_none());
    }
}
