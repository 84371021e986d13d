//! Vector, matrix and quaternion primitives for the navigation engine
//!
//! All navigation math runs in single precision on `nalgebra` fixed-size
//! types. Two frames are used throughout:
//!
//! - NED navigation frame: x = North, y = East, z = Down
//! - Body frame: x = Front, y = Right, z = Down
//!
//! The [`Attitude`] quaternion maps body vectors into the navigation
//! frame; it is the single authoritative attitude representation, all
//! derived state (rotation matrix, Euler angles) is recomputed from it.

mod attitude;

pub use attitude::Attitude;

/// 3-vector in either frame
pub type Vec3 = nalgebra::Vector3<f32>;

/// 3x3 rotation matrix (body to nav when produced by [`Attitude`])
pub type Mat3 = nalgebra::Matrix3<f32>;

/// Navigation-frame component access for [`Vec3`]
pub trait NavFrame {
    fn north(&self) -> f32;
    fn east(&self) -> f32;
    fn down(&self) -> f32;
}

impl NavFrame for Vec3 {
    #[inline]
    fn north(&self) -> f32 {
        self.x
    }

    #[inline]
    fn east(&self) -> f32 {
        self.y
    }

    #[inline]
    fn down(&self) -> f32 {
        self.z
    }
}

/// Body-frame component access for [`Vec3`]
pub trait BodyFrame {
    fn front(&self) -> f32;
    fn right(&self) -> f32;
}

impl BodyFrame for Vec3 {
    #[inline]
    fn front(&self) -> f32 {
        self.x
    }

    #[inline]
    fn right(&self) -> f32 {
        self.y
    }
}

/// Wrap an angle into (-pi, pi]
pub fn wrap_pi(mut angle: f32) -> f32 {
    if angle > core::f32::consts::PI {
        angle -= 2.0 * core::f32::consts::PI;
    }
    if angle < -core::f32::consts::PI {
        angle += 2.0 * core::f32::consts::PI;
    }
    angle
}
