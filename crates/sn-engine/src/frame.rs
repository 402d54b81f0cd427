//! Audio frame type.

/// A stereo audio frame (normalized `f32`, nominally `-1.0..=1.0`).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Frame {
    pub left: f32,
    pub right: f32,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self { left: 0.0, right: 0.0 }
    }

    /// Create a mono frame (same value for both channels).
    pub const fn mono(value: f32) -> Self {
        Self {
            left: value,
            right: value,
        }
    }

    /// Scale both channels by `gain`.
    pub fn scaled(self, gain: f32) -> Self {
        Self {
            left: self.left * gain,
            right: self.right * gain,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }

    /// Convert to clamped 16-bit PCM `(left, right)`.
    pub fn to_i16(self) -> (i16, i16) {
        (to_pcm16(self.left), to_pcm16(self.right))
    }
}

fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_conversion_clamps() {
        assert_eq!(Frame::mono(1.0).to_i16(), (32767, 32767));
        assert_eq!(Frame::mono(-2.0).to_i16(), (-32767, -32767));
        assert_eq!(Frame::silence().to_i16(), (0, 0));
    }

    #[test]
    fn scaled_frames() {
        let f = Frame::mono(0.5).scaled(0.5);
        assert_eq!(f, Frame::mono(0.25));
        assert!(!f.is_silent());
        assert!(f.scaled(0.0).is_silent());
    }
}
