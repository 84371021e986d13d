//! Horizontal velocity / acceleration / acceleration-offset filter

use super::scalar_update;
use crate::math::{Mat3, Vec3};

/// Initial state variance
const P_INIT: f32 = 10.0;

/// Process / measurement noise shared by the north and east instances.
///
/// The offset state is modelled as nearly constant (tiny process noise)
/// so it absorbs only the slow accelerometer bias, not maneuvering.
#[derive(Debug, Clone, Copy)]
pub struct VAOffsetNoise {
    pub q: [f32; 3],
    pub r_velocity: f32,
    pub r_acceleration: f32,
}

pub const V_A_OFFSET_NOISE: VAOffsetNoise = VAOffsetNoise {
    q: [1e-6, 1e-3, 1e-9],
    r_velocity: 0.25,
    r_acceleration: 0.02,
};

/// 3-state filter for one horizontal axis in the air-relative frame.
///
/// State: [velocity, acceleration, acceleration offset]. The velocity
/// measurement is the wind-corrected GNSS velocity component, the
/// acceleration measurement is the AHRS navigation-frame acceleration,
/// which carries the slow bias captured by the offset state.
#[derive(Debug, Clone)]
pub struct KalmanVAOffset {
    ts: f32,
    x: Vec3,
    p: Mat3,
}

impl KalmanVAOffset {
    pub fn new(sample_time: f32) -> Self {
        Self {
            ts: sample_time,
            x: Vec3::zeros(),
            p: Mat3::identity() * P_INIT,
        }
    }

    pub fn reset(&mut self) {
        self.x = Vec3::zeros();
        self.p = Mat3::identity() * P_INIT;
    }

    pub fn update(&mut self, velocity_measured: f32, acceleration_measured: f32) {
        let ts = self.ts;

        // predict: velocity integrates acceleration, the other states hold
        self.x.x += ts * self.x.y;
        let f = Mat3::new(
            1.0, ts, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0,
        );
        self.p = f * self.p * f.transpose();
        self.p[(0, 0)] += V_A_OFFSET_NOISE.q[0];
        self.p[(1, 1)] += V_A_OFFSET_NOISE.q[1];
        self.p[(2, 2)] += V_A_OFFSET_NOISE.q[2];

        scalar_update(
            &mut self.x,
            &mut self.p,
            Vec3::new(1.0, 0.0, 0.0),
            velocity_measured,
            V_A_OFFSET_NOISE.r_velocity,
        );
        // the accelerometer measures true acceleration plus its offset
        scalar_update(
            &mut self.x,
            &mut self.p,
            Vec3::new(0.0, 1.0, 1.0),
            acceleration_measured,
            V_A_OFFSET_NOISE.r_acceleration,
        );
    }

    pub fn velocity(&self) -> f32 {
        self.x.x
    }

    pub fn acceleration(&self) -> f32 {
        self.x.y
    }

    pub fn acceleration_offset(&self) -> f32 {
        self.x.z
    }
}
