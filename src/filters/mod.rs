//! Scalar and vector signal conditioning
//!
//! Small fixed-rate building blocks used by the AHRS and the flight
//! observer: first-order IIR averagers, a backward-difference
//! differentiator, a 100 Hz to 10 Hz vector decimator and a
//! high-pass/low-pass fusion blender.
//!
//! All filters follow the same calling convention as the estimators:
//! `respond(input)` advances one sample tick and returns the new output,
//! `output()` reads it back without advancing.

mod decimator;
mod differentiator;
mod fusion;
mod lowpass;

pub use decimator::Decimator;
pub use differentiator::Differentiator;
pub use fusion::HpLpFusion;
pub use lowpass::LowPass;
