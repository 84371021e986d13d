//! Complementary high-pass / low-pass signal fusion

use super::LowPass;

/// Blends a fast channel with a long-term channel.
///
/// The output follows the fast input at high frequency while its DC
/// content is slewed toward the long-term input:
/// `y = fast + lowpass(slow - fast)`.
#[derive(Debug, Clone, Copy)]
pub struct HpLpFusion {
    lp: LowPass,
    y: f32,
}

impl HpLpFusion {
    pub fn new(gain: f32) -> Self {
        Self {
            lp: LowPass::new(gain),
            y: 0.0,
        }
    }

    pub fn respond(&mut self, fast: f32, slow: f32) -> f32 {
        self.y = fast + self.lp.respond(slow - fast);
        self.y
    }

    pub fn output(&self) -> f32 {
        self.y
    }
}
