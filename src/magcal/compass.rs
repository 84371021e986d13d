//! Per-axis magnetometer calibration and its data collectors

use super::regression::{LinearLeastSquares, Regression};
use crate::math::Vec3;

/// Plausibility window for the fitted sensor gain. A slope outside this
/// range indicates a disturbed data set, not a sensor property.
const SLOPE_MIN: f32 = 0.5;
const SLOPE_MAX: f32 = 2.0;

/// Calibration of one magnetometer axis: `corrected = (raw - bias) * scale`.
#[derive(Debug, Clone, Copy)]
pub struct AxisCalibration {
    pub bias: f32,
    pub scale: f32,
    /// Residual variance of the fit that produced this calibration;
    /// infinite for an identity or reloaded calibration of unknown quality.
    pub variance: f32,
}

impl Default for AxisCalibration {
    fn default() -> Self {
        Self {
            bias: 0.0,
            scale: 1.0,
            variance: f32::INFINITY,
        }
    }
}

/// Active magnetometer calibration, all three body axes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompassCalibration {
    axes: [AxisCalibration; 3],
    done: bool,
}

impl CompassCalibration {
    /// Restore a persisted calibration. The stored blob carries no
    /// quality figure, so the variance is unknown and any fresh
    /// in-flight fit is allowed to replace it.
    pub fn from_persisted(bias: Vec3, scale: Vec3) -> Self {
        let mut axes = [AxisCalibration::default(); 3];
        for i in 0..3 {
            axes[i].bias = bias[i];
            axes[i].scale = scale[i];
        }
        Self { axes, done: true }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn axes(&self) -> &[AxisCalibration; 3] {
        &self.axes
    }

    /// Apply the calibration to a raw sensor reading.
    pub fn calibrate(&self, raw: Vec3) -> Vec3 {
        Vec3::new(
            (raw.x - self.axes[0].bias) * self.axes[0].scale,
            (raw.y - self.axes[1].bias) * self.axes[1].scale,
            (raw.z - self.axes[2].bias) * self.axes[2].scale,
        )
    }

    /// Bias and scale triples for persistence.
    pub fn coefficients(&self) -> (Vec3, Vec3) {
        (
            Vec3::new(self.axes[0].bias, self.axes[1].bias, self.axes[2].bias),
            Vec3::new(self.axes[0].scale, self.axes[1].scale, self.axes[2].scale),
        )
    }

    fn quality(&self) -> f32 {
        self.axes.iter().map(|a| a.variance).sum()
    }

    /// Install a fresh fit if it improves on the active calibration.
    ///
    /// The regressions relate scaled expected induction `x` to scaled
    /// sensor reading `y = offset + slope * x`; the installed inverse is
    /// `corrected = (raw - offset / mag_scale) / slope`. Returns whether
    /// the calibration changed.
    pub fn set_calibration_if_improved(&mut self, fits: &[Regression; 3], mag_scale: f32) -> bool {
        for fit in fits {
            if fit.slope < SLOPE_MIN || fit.slope > SLOPE_MAX {
                return false;
            }
        }
        let new_quality: f32 = fits.iter().map(|f| f.variance).sum();
        if self.done && new_quality >= self.quality() {
            return false;
        }
        for (axis, fit) in self.axes.iter_mut().zip(fits.iter()) {
            axis.bias = fit.offset / mag_scale;
            axis.scale = 1.0 / fit.slope;
            axis.variance = fit.variance;
        }
        self.done = true;
        true
    }
}

/// Regression banks for the calibration data, one per turning direction.
///
/// Thermalling data is collected separately for left and right circles;
/// the commit fits the bank matching the turn that just ended.
#[derive(Debug, Clone, Default)]
pub struct MagCalibrationCollector {
    right: [LinearLeastSquares; 3],
    left: [LinearLeastSquares; 3],
}

impl MagCalibrationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one sample per axis: expected body-frame induction against
    /// the raw sensor reading, both scaled to sensor units.
    pub fn feed(&mut self, expected_body: Vec3, sensor: Vec3, mag_scale: f32, right_turn: bool) {
        let bank = if right_turn {
            &mut self.right
        } else {
            &mut self.left
        };
        for i in 0..3 {
            bank[i].add_value(mag_scale * expected_body[i], mag_scale * sensor[i]);
        }
    }

    /// Fit all three axes of one bank; `None` unless every axis fits.
    pub fn fit(&self, right_turn: bool) -> Option<[Regression; 3]> {
        let bank = if right_turn { &self.right } else { &self.left };
        Some([bank[0].fit()?, bank[1].fit()?, bank[2].fit()?])
    }

    pub fn reset(&mut self) {
        for r in self.right.iter_mut().chain(self.left.iter_mut()) {
            r.reset();
        }
    }
}
