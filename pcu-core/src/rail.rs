//! Classification of the downstream rail sense reading.

/// Raw ADC threshold above which the downstream rail counts as present.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RailThreshold {
    raw: u16,
    bits: u8,
}

impl RailThreshold {
    /// 950 counts of a 10-bit converter, roughly 1.9 V at the board's reference.
    pub const ORIGINAL_10_BIT: Self = Self { raw: 950, bits: 10 };

    /// Creates a threshold of `raw` counts for a `bits`-wide converter.
    #[must_use]
    pub const fn new(raw: u16, bits: u8) -> Self {
        Self { raw, bits }
    }

    #[must_use]
    pub const fn raw(self) -> u16 {
        self.raw
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.bits
    }

    /// Re-expresses the threshold for a converter with `bits` of resolution.
    ///
    /// Widths outside `1..=16` leave the threshold unchanged.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn rescale(self, bits: u8) -> Self {
        if bits == 0 || bits > 16 || bits == self.bits {
            return self;
        }

        let raw = if bits > self.bits {
            (self.raw as u32) << (bits - self.bits)
        } else {
            (self.raw as u32) >> (self.bits - bits)
        };
        let max = (1u32 << bits) - 1;
        let raw = if raw > max { max } else { raw };

        Self {
            raw: raw as u16,
            bits,
        }
    }

    /// `true` when `reading` is strictly above the threshold.
    #[must_use]
    pub const fn is_present(self, reading: u16) -> bool {
        reading > self.raw
    }
}

impl Default for RailThreshold {
    fn default() -> Self {
        Self::ORIGINAL_10_BIT
    }
}
