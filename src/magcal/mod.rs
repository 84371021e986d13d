//! Magnetometer self-calibration and Earth-field estimation
//!
//! While the glider circles, the AHRS feeds this module pairs of
//! (expected body-frame induction, measured sensor value) per axis,
//! split by turning direction, plus the navigation-frame induction for
//! the Earth-field estimator. On leaving circling the collected
//! regressions are fitted and installed if they beat the quality of the
//! active calibration; the result is persisted through the
//! [`store::CalibrationStore`] capability.

mod compass;
mod earth;
mod regression;
pub mod store;

pub use compass::{AxisCalibration, CompassCalibration, MagCalibrationCollector};
pub use earth::EarthInductionCollector;
pub use regression::{LinearLeastSquares, Regression};

use crate::math::Vec3;

/// Which fusion mode triggered a calibration commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitSource {
    /// Committed from the dual-antenna GNSS compass update
    DgnssCompass,
    /// Committed from the magnetometer compass update
    MagCompass,
}

/// Snapshot emitted when the magnetic calibration changed.
///
/// Delivered through [`crate::ahrs::AhrsEngine::take_calibration_report`]
/// so the consumer (telemetry, CAN uplink) stays decoupled from the
/// attitude loop.
#[derive(Debug, Clone, Copy)]
pub struct MagneticInductionReport {
    /// Active per-axis sensor calibration
    pub calibration: [AxisCalibration; 3],
    /// Expected Earth induction in the navigation frame (unit vector)
    pub nav_induction: Vec3,
    /// Standard deviation of the Earth-field estimate, zero when the
    /// estimator had no valid data
    pub nav_induction_std_deviation: f32,
    /// Fusion mode that performed the commit
    pub source: CommitSource,
}
