// ============================================================
// Layer 3 — Learning-Rate Schedules
// ============================================================
// The orchestrator only asks "what is the rate for iteration i";
// the formula lives behind the LrSchedule trait.

use crate::domain::traits::LrSchedule;

/// lr(i) = base / (1 + decay * i)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseDecay {
    pub base:  f64,
    pub decay: f64,
}

impl InverseDecay {
    pub fn new(base: f64, decay: f64) -> Self {
        Self { base, decay }
    }
}

impl LrSchedule for InverseDecay {
    fn learning_rate(&self, iteration: usize) -> f64 {
        self.base / (1.0 + self.decay * iteration as f64)
    }
}

/// Keeps the base rate for the whole run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantRate(pub f64);

impl LrSchedule for ConstantRate {
    fn learning_rate(&self, _iteration: usize) -> f64 {
        self.0
    }
}
