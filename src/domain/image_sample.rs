// ============================================================
// Layer 3 — ImageSample Domain Type
// ============================================================
// One image after decoding and resizing, ready to be stacked
// into a batch. Pixels are f32 in [0, 1], stored channel-major:
//
//   [R R R ... G G G ... B B B ...]   (3 × height × width)

use crate::domain::error::StyleError;

/// Number of colour channels every sample carries
pub const CHANNELS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageSample {
    pixels: Vec<f32>,
    height: usize,
    width:  usize,
}

impl ImageSample {
    /// Build a sample from CHW pixels.
    /// Fails if the buffer length does not match 3 × height × width.
    pub fn new(pixels: Vec<f32>, height: usize, width: usize) -> Result<Self, StyleError> {
        let expected = CHANNELS * height * width;
        if pixels.len() != expected {
            return Err(StyleError::ShapeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self { pixels, height, width })
    }

    pub fn pixels(&self) -> &[f32] { &self.pixels }

    pub fn into_pixels(self) -> Vec<f32> { self.pixels }

    pub fn height(&self) -> usize { self.height }

    pub fn width(&self) -> usize { self.width }

    /// (channels, height, width)
    #[cfg(test)]
    pub fn shape(&self) -> [usize; 3] {
        [CHANNELS, self.height, self.width]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_matching_buffer() {
        let s = ImageSample::new(vec![0.5; 3 * 4 * 2], 4, 2).unwrap();
        assert_eq!(s.shape(), [3, 4, 2]);
    }

    #[test]
    fn test_rejects_short_buffer() {
        let err = ImageSample::new(vec![0.0; 10], 4, 4).unwrap_err();
        assert!(matches!(err, StyleError::ShapeMismatch { expected: 48, actual: 10 }));
    }
}
