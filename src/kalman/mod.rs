//! Fixed-structure linear Kalman filters
//!
//! Two 3-state filters cover the whole estimation need of the flight
//! observer; their structure is known at compile time, so everything is
//! built on `nalgebra` fixed-size 3x3 blocks and sequential scalar
//! measurement updates (no matrix inversion).
//!
//! - [`KalmanVarioPva`]: vertical position / velocity / observed
//!   acceleration in the NED down coordinate, one instance per altitude
//!   source (barometric, GNSS).
//! - [`KalmanVAOffset`]: horizontal air-relative velocity /
//!   acceleration / slow accelerometer offset, one instance per
//!   horizontal axis.

mod v_a_offset;
mod vario_pva;

pub use v_a_offset::{KalmanVAOffset, VAOffsetNoise, V_A_OFFSET_NOISE};
pub use vario_pva::{KalmanVarioPva, VarioNoise, GNSS_VARIO_NOISE, PRESSURE_VARIO_NOISE};

use crate::math::{Mat3, Vec3};

/// One scalar measurement update, `z = h * x + v`, `v ~ N(0, r)`.
///
/// Shared by both filters; `h` is the measurement row.
fn scalar_update(x: &mut Vec3, p: &mut Mat3, h: Vec3, z: f32, r: f32) {
    let ph = *p * h;
    let s = h.dot(&ph) + r;
    let k = ph / s;
    let innovation = z - h.dot(x);
    *x += k * innovation;
    *p -= k * ph.transpose();
}
