// ============================================================
// Layer 3 — Loss Weight Configuration
// ============================================================
// Three stages, four loss families per stage:
//
//   stage s total = w_content[s] * content
//                 + w_remd[s]    * remd
//                 + w_moment[s]  * moment
//                 + w_color[s]   * color   (only when color is on)
//
// Fixed for the whole run: built once from the CLI flags and
// handed to the model at construction.

use serde::{Deserialize, Serialize};

use crate::domain::error::StyleError;

/// Number of coarse-to-fine stages in the model
pub const NUM_STAGES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageWeights {
    pub content: f64,
    pub remd:    f64,
    pub moment:  f64,
    pub color:   f64,
}

impl StageWeights {
    pub fn new(content: f64, remd: f64, moment: f64, color: f64) -> Self {
        Self { content, remd, moment, color }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossWeights {
    /// Index 0 is stage 1 (coarsest)
    pub stages:        [StageWeights; NUM_STAGES],
    pub color_enabled: bool,
}

impl Default for LossWeights {
    fn default() -> Self {
        Self {
            stages: [
                StageWeights::new(12.0, 2.0, 2.0, 0.25),
                StageWeights::new(9.0,  2.0, 2.0, 0.5),
                StageWeights::new(7.0,  2.0, 2.0, 1.0),
            ],
            color_enabled: true,
        }
    }
}

impl LossWeights {
    /// Color weight actually applied at `stage` (0-based).
    /// Zero when the color family is switched off.
    pub fn color(&self, stage: usize) -> f64 {
        if self.color_enabled { self.stages[stage].color } else { 0.0 }
    }

    /// Same weights with every color weight forced to zero
    /// and the color family left enabled.
    #[cfg(test)]
    pub fn with_zero_color(&self) -> Self {
        let mut out = self.clone();
        for s in out.stages.iter_mut() {
            s.color = 0.0;
        }
        out.color_enabled = true;
        out
    }

    /// Every weight must be finite and non-negative.
    pub fn validate(&self) -> Result<(), StyleError> {
        for (i, s) in self.stages.iter().enumerate() {
            let named = [
                ("content", s.content),
                ("remd",    s.remd),
                ("moment",  s.moment),
                ("color",   s.color),
            ];
            for (family, value) in named {
                if !value.is_finite() || value < 0.0 {
                    return Err(StyleError::NegativeWeight {
                        name: format!("w_{family}{}", i + 1),
                        value,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cli_defaults() {
        let w = LossWeights::default();
        assert_eq!(w.stages[0].content, 12.0);
        assert_eq!(w.stages[2].content, 7.0);
        assert_eq!(w.stages[1].color, 0.5);
        assert!(w.color_enabled);
    }

    #[test]
    fn test_color_disabled_reads_as_zero() {
        let mut w = LossWeights::default();
        w.color_enabled = false;
        for s in 0..NUM_STAGES {
            assert_eq!(w.color(s), 0.0);
        }
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let mut w = LossWeights::default();
        w.stages[1].remd = -1.0;
        let err = w.validate().unwrap_err();
        assert!(err.to_string().contains("w_remd2"));
    }

    #[test]
    fn test_nan_weight_is_rejected() {
        let mut w = LossWeights::default();
        w.stages[2].moment = f64::NAN;
        assert!(w.validate().is_err());
    }
}
