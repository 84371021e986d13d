//! Attitude quaternion with small-angle propagation
//!
//! Scalar-first quaternion (w, x, y, z) mapping body-frame vectors into
//! the NED navigation frame. The gyro prediction step applies a
//! small-angle rotation and renormalizes, so the unit invariant holds
//! after every update.

use super::{Mat3, Vec3};
use nalgebra::{Quaternion, Rotation3, UnitQuaternion};

/// Body-to-nav attitude quaternion
#[derive(Debug, Clone, Copy)]
pub struct Attitude {
    q: Quaternion<f32>,
}

impl Default for Attitude {
    fn default() -> Self {
        Self {
            q: Quaternion::identity(),
        }
    }
}

impl Attitude {
    /// Build the attitude from three orthonormal navigation axes given in
    /// body coordinates (rows of the body-to-nav rotation matrix).
    pub fn from_axes(north: Vec3, east: Vec3, down: Vec3) -> Self {
        let m = Mat3::from_rows(&[north.transpose(), east.transpose(), down.transpose()]);
        let uq = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(m));
        Self { q: *uq.quaternion() }
    }

    /// Advance by a small body rotation.
    ///
    /// The arguments are half-angle increments (rate times Ts/2) around
    /// the body roll, pitch and yaw axes.
    pub fn rotate(&mut self, p: f32, q: f32, r: f32) {
        let delta = Quaternion::new(1.0, p, q, r);
        self.q = self.q * delta;
        self.normalize();
    }

    /// Renormalize to a unit quaternion.
    pub fn normalize(&mut self) {
        let norm = self.q.norm();
        if norm > 0.0 {
            self.q = Quaternion::from(self.q.coords / norm);
        }
    }

    /// Body-to-nav rotation matrix.
    pub fn rotation_matrix(&self) -> Mat3 {
        UnitQuaternion::new_unchecked(self.q)
            .to_rotation_matrix()
            .into_inner()
    }

    /// Euler angles (roll, pitch, yaw), ZYX convention.
    pub fn euler_angles(&self) -> (f32, f32, f32) {
        UnitQuaternion::new_unchecked(self.q).euler_angles()
    }

    /// Raw quaternion, scalar-first.
    pub fn quaternion(&self) -> Quaternion<f32> {
        self.q
    }

    /// Quaternion norm (1.0 up to floating point noise).
    pub fn norm(&self) -> f32 {
        self.q.norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::PI;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_default_is_identity() {
        let a = Attitude::default();
        let (roll, pitch, yaw) = a.euler_angles();
        assert!(roll.abs() < EPSILON);
        assert!(pitch.abs() < EPSILON);
        assert!(yaw.abs() < EPSILON);
        assert!((a.norm() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_from_axes_identity() {
        let a = Attitude::from_axes(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        let (roll, pitch, yaw) = a.euler_angles();
        assert!(roll.abs() < EPSILON);
        assert!(pitch.abs() < EPSILON);
        assert!(yaw.abs() < EPSILON);
    }

    #[test]
    fn test_from_axes_yawed_90() {
        // Aircraft pointing east: nav north is the body right axis.
        let a = Attitude::from_axes(
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        let (roll, pitch, yaw) = a.euler_angles();
        assert!(roll.abs() < EPSILON);
        assert!(pitch.abs() < EPSILON);
        assert!((yaw - PI / 2.0).abs() < EPSILON, "yaw = {}", yaw);
    }

    #[test]
    fn test_rotate_integrates_yaw_rate() {
        let mut a = Attitude::default();
        let rate = 0.1; // rad/s
        let ts = 0.01;
        for _ in 0..1000 {
            a.rotate(0.0, 0.0, rate * ts / 2.0);
        }
        let (_, _, yaw) = a.euler_angles();
        // 10 s at 0.1 rad/s = 1 rad, small-angle error stays tiny
        assert!((yaw - 1.0).abs() < 1e-3, "yaw = {}", yaw);
    }

    #[test]
    fn test_rotate_keeps_unit_norm() {
        let mut a = Attitude::default();
        for _ in 0..10_000 {
            a.rotate(1e-3, -2e-3, 3e-3);
            assert!((a.norm() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_rotation_matrix_is_orthonormal() {
        let mut a = Attitude::default();
        for _ in 0..500 {
            a.rotate(2e-3, 1e-3, -1e-3);
        }
        let r = a.rotation_matrix();
        let should_be_identity = r * r.transpose();
        let err = (should_be_identity - Mat3::identity()).norm();
        assert!(err < 1e-5, "Frobenius error = {}", err);
    }

    #[test]
    fn test_rotation_matrix_maps_body_to_nav() {
        // 90 degree yaw: body front axis points to nav east
        let mut a = Attitude::default();
        let steps = 10_000;
        let half = (PI / 2.0) / steps as f32 / 2.0;
        for _ in 0..steps {
            a.rotate(0.0, 0.0, half);
        }
        let r = a.rotation_matrix();
        let nav = r * Vec3::new(1.0, 0.0, 0.0);
        assert!(nav.x.abs() < 1e-3, "north component = {}", nav.x);
        assert!((nav.y - 1.0).abs() < 1e-3, "east component = {}", nav.y);
    }
}
