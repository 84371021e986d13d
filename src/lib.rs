//! glide_sense - navigation engine of a sailplane flight sensor
//!
//! This crate contains the platform-agnostic core of an airborne glider
//! sensor: attitude estimation, total-energy variometer, wind
//! observation, in-flight magnetometer calibration and the NMEA output
//! formatter. Everything runs on a plain 100 Hz tick and tests on the
//! host; platform services (calibration persistence) are injected
//! through traits, sensor drivers and scheduling live outside.
//!
//! # Design Principles
//!
//! - **No allocation on the tick path**: all state is fixed size
//! - **One authoritative attitude**: the quaternion; rotation matrix
//!   and Euler angles are recomputed from it every tick
//! - **Trait abstractions**: persistence injected via
//!   [`magcal::store::CalibrationStore`]
//!
//! # Modules
//!
//! - [`math`]: vector/matrix/quaternion primitives, NED frame helpers
//! - [`filters`]: IIR averagers, differentiator, decimator, blender
//! - [`kalman`]: fixed-structure vertical and horizontal filters
//! - [`magcal`]: magnetometer calibration, Earth-field estimation,
//!   persistence
//! - [`ahrs`]: circling classifier and the attitude engine
//! - [`observer`]: variometer, speed compensation, wind
//! - [`nmea`]: ASCII sentence formatting with XOR checksums
//! - [`config`]: tuning parameters and validation

#![no_std]

pub mod ahrs;
pub mod config;
pub mod filters;
pub mod kalman;
pub mod logging;
pub mod magcal;
pub mod math;
pub mod nmea;
pub mod observer;
