//! Vertical position / velocity / acceleration Kalman filter

use super::scalar_update;
use crate::math::{Mat3, Vec3};

/// Standard gravity, m/s^2
const GRAVITY: f32 = 9.81;

/// Initial state variance after a reset
const P_INIT: f32 = 100.0;

/// Noise set for one [`KalmanVarioPva`] instance.
#[derive(Debug, Clone, Copy)]
pub struct VarioNoise {
    /// Process noise diagonal (position, velocity, acceleration)
    pub q: [f32; 3],
    /// Altitude measurement variance, m^2
    pub r_altitude: f32,
    /// Vertical velocity measurement variance, (m/s)^2
    pub r_velocity: f32,
    /// Acceleration measurement variance, (m/s^2)^2
    pub r_acceleration: f32,
}

/// Barometric instance: the pressure altitude carries more short-term
/// noise than the GNSS solution.
pub const PRESSURE_VARIO_NOISE: VarioNoise = VarioNoise {
    q: [1e-8, 1e-6, 1e-3],
    r_altitude: 4.0,
    r_velocity: 0.04,
    r_acceleration: 0.01,
};

/// GNSS instance
pub const GNSS_VARIO_NOISE: VarioNoise = VarioNoise {
    q: [1e-8, 1e-6, 1e-3],
    r_altitude: 1.0,
    r_velocity: 0.04,
    r_acceleration: 0.01,
};

/// 3-state vertical filter in the NED down coordinate.
///
/// State: [altitude (down-negative), vertical velocity, observed
/// acceleration]. The observed-acceleration state tracks the measured
/// body-down specific force, so the kinematic vertical acceleration is
/// `x[2] + g`; in unaccelerated flight the state rests at `-9.81`.
#[derive(Debug, Clone)]
pub struct KalmanVarioPva {
    ts: f32,
    noise: VarioNoise,
    x: Vec3,
    p: Mat3,
}

impl KalmanVarioPva {
    pub fn new(sample_time: f32, noise: VarioNoise) -> Self {
        let mut filter = Self {
            ts: sample_time,
            noise,
            x: Vec3::zeros(),
            p: Mat3::identity(),
        };
        filter.reset(0.0, -GRAVITY);
        filter
    }

    /// Re-initialize at a known altitude and measured acceleration.
    pub fn reset(&mut self, altitude: f32, acceleration: f32) {
        self.x = Vec3::new(altitude, 0.0, acceleration);
        self.p = Mat3::identity() * P_INIT;
    }

    fn predict(&mut self) {
        let ts = self.ts;
        let kinematic_acc = self.x.z + GRAVITY;
        self.x.x += ts * self.x.y + 0.5 * ts * ts * kinematic_acc;
        self.x.y += ts * kinematic_acc;

        let f = Mat3::new(
            1.0, ts, 0.5 * ts * ts, //
            0.0, 1.0, ts, //
            0.0, 0.0, 1.0,
        );
        self.p = f * self.p * f.transpose();
        self.p[(0, 0)] += self.noise.q[0];
        self.p[(1, 1)] += self.noise.q[1];
        self.p[(2, 2)] += self.noise.q[2];
    }

    /// Fuse altitude and measured down acceleration; returns the vario
    /// state (negative while climbing).
    pub fn update(&mut self, altitude: f32, acceleration: f32) -> f32 {
        self.predict();
        scalar_update(
            &mut self.x,
            &mut self.p,
            Vec3::new(1.0, 0.0, 0.0),
            altitude,
            self.noise.r_altitude,
        );
        scalar_update(
            &mut self.x,
            &mut self.p,
            Vec3::new(0.0, 0.0, 1.0),
            acceleration,
            self.noise.r_acceleration,
        );
        self.x.y
    }

    /// Fuse altitude, down velocity and measured down acceleration;
    /// returns the vario state (negative while climbing).
    pub fn update_with_velocity(
        &mut self,
        altitude: f32,
        vertical_velocity: f32,
        acceleration: f32,
    ) -> f32 {
        self.predict();
        scalar_update(
            &mut self.x,
            &mut self.p,
            Vec3::new(1.0, 0.0, 0.0),
            altitude,
            self.noise.r_altitude,
        );
        scalar_update(
            &mut self.x,
            &mut self.p,
            Vec3::new(0.0, 1.0, 0.0),
            vertical_velocity,
            self.noise.r_velocity,
        );
        scalar_update(
            &mut self.x,
            &mut self.p,
            Vec3::new(0.0, 0.0, 1.0),
            acceleration,
            self.noise.r_acceleration,
        );
        self.x.y
    }

    pub fn altitude(&self) -> f32 {
        self.x.x
    }

    pub fn vario(&self) -> f32 {
        self.x.y
    }

    pub fn acceleration_observed(&self) -> f32 {
        self.x.z
    }
}
