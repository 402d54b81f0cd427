//! Value-to-pitch mapping.
//!
//! A function value is treated as a continuous position on a piano-style
//! key table. Value 0 lands on the zero key; values outside the table wrap
//! around it. Keys are converted to Hz with 12-TET relative to the tuning
//! key. The key index is never rounded, so pitch glides continuously.

use sn_ir::pos_mod;

/// Parameters of the key table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PitchMap {
    /// Lowest key number (inclusive).
    pub first_key: i32,
    /// Highest key number; key indices stay strictly below it.
    pub last_key: i32,
    /// Key whose frequency is `tuning_freq`.
    pub tuning_key: i32,
    /// Frequency of the tuning key in Hz.
    pub tuning_freq: f64,
    /// Key that function value 0 maps to.
    pub zero_key: i32,
}

impl Default for PitchMap {
    /// 88-key piano, A4 (key 49) = 440 Hz, value 0 = C4 (key 40).
    fn default() -> Self {
        Self {
            first_key: 1,
            last_key: 88,
            tuning_key: 49,
            tuning_freq: 440.0,
            zero_key: 40,
        }
    }
}

impl PitchMap {
    /// Continuous key index for `value`, in `[first_key, last_key)`.
    ///
    /// Returns `None` for non-finite input (or a degenerate table), which
    /// callers treat as silence.
    pub fn key_index(&self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        let span = (self.last_key - self.first_key) as f64;
        let shifted = value + (self.zero_key - self.first_key) as f64;
        let key = pos_mod(shifted, span) + self.first_key as f64;
        key.is_finite().then_some(key)
    }

    /// Frequency in Hz of a (possibly fractional) key index.
    pub fn key_frequency(&self, key: f64) -> f64 {
        self.tuning_freq * libm::exp2((key - self.tuning_key as f64) / 12.0)
    }

    /// Playback frequency for a function value, or `None` for silence.
    pub fn frequency_of(&self, value: f64) -> Option<f64> {
        self.key_index(value).map(|key| self.key_frequency(key))
    }
}

/// [`PitchMap::frequency_of`] with the default table.
pub fn frequency_of(value: f64) -> Option<f64> {
    PitchMap::default().frequency_of(value)
}
