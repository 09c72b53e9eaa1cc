//! Frequency to blink cadence mapping shared by firmware and host targets.
//!
//! A requested tone frequency becomes an on/off blink pattern. The period is
//! inversely proportional to the frequency, and the lit phase is capped so a
//! low tone never holds the indicator at full brightness for long.

/// Lower bound (exclusive) of the audible range treated as a turn-on request.
pub const MIN_TONE_HZ: i32 = 20;
/// Upper bound (exclusive) of the audible range treated as a turn-on request.
pub const MAX_TONE_HZ: i32 = 32_767;

/// Blink period in milliseconds produced by a 1 Hz request.
pub const DEFAULT_PERIOD_SCALE_MS_HZ: u32 = 500_000;
/// Longest lit phase emitted for any pattern.
pub const DEFAULT_MAX_ON_MS: u32 = 250;

/// On/off cadence handed to the indicator while a blink session is active.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlinkPattern {
    pub on_millis: u32,
    pub off_millis: u32,
}

impl BlinkPattern {
    pub const fn new(on_millis: u32, off_millis: u32) -> Self {
        Self {
            on_millis,
            off_millis,
        }
    }

    /// Length of one full on+off cycle.
    #[must_use]
    pub const fn period_millis(&self) -> u32 {
        self.on_millis.saturating_add(self.off_millis)
    }
}

/// Returns `true` when `value` lies strictly inside the audible range.
#[must_use]
pub const fn is_tone_in_range(value: i32) -> bool {
    value > MIN_TONE_HZ && value < MAX_TONE_HZ
}

/// Tunables for the frequency to pattern mapping.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlinkCadence {
    /// Period in milliseconds for a 1 Hz request; the period for `f` Hz is `scale / f`.
    pub period_scale_ms_hz: u32,
    /// Ceiling on the lit phase of a pattern.
    pub max_on_ms: u32,
}

impl BlinkCadence {
    pub const DEFAULT: Self = Self::new(DEFAULT_PERIOD_SCALE_MS_HZ, DEFAULT_MAX_ON_MS);

    pub const fn new(period_scale_ms_hz: u32, max_on_ms: u32) -> Self {
        Self {
            period_scale_ms_hz,
            max_on_ms,
        }
    }

    /// Maps a requested frequency to a blink pattern.
    ///
    /// Returns `None` for values outside the audible range (including `0`),
    /// which callers treat as a request to turn the indicator off.
    #[must_use]
    pub fn map(&self, value: i32) -> Option<BlinkPattern> {
        if !is_tone_in_range(value) {
            return None;
        }

        // Range check above guarantees a positive divisor.
        let hz = value.unsigned_abs();
        let period = (self.period_scale_ms_hz / hz).max(2);
        let max_on = self.max_on_ms.max(1);

        let on = if period >= max_on.saturating_mul(2) {
            max_on
        } else {
            period / 2
        };

        Some(BlinkPattern::new(on.max(1), (period - on).max(1)))
    }
}

impl Default for BlinkCadence {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Maps a requested frequency to a blink pattern using [`BlinkCadence::DEFAULT`].
#[must_use]
pub fn map_frequency_to_pattern(value: i32) -> Option<BlinkPattern> {
    BlinkCadence::DEFAULT.map(value)
}
