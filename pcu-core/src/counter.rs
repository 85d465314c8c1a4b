//! Saturating tick counters.
//!
//! Counters clamp at the maximum of their backing integer instead of wrapping,
//! so a counter left running in a long-lived state can never roll over and
//! satisfy a threshold a second time.

/// Integer widths usable as counter storage.
pub trait CounterValue: Copy + Ord + Default {
    /// Largest representable value; the counter stops here.
    const MAX: Self;

    /// Returns `self + 1`, clamped at [`Self::MAX`].
    #[must_use]
    fn saturating_increment(self) -> Self;

    /// Widens the value for reporting.
    fn widen(self) -> u32;
}

impl CounterValue for u8 {
    const MAX: Self = u8::MAX;

    fn saturating_increment(self) -> Self {
        self.saturating_add(1)
    }

    fn widen(self) -> u32 {
        u32::from(self)
    }
}

impl CounterValue for u16 {
    const MAX: Self = u16::MAX;

    fn saturating_increment(self) -> Self {
        self.saturating_add(1)
    }

    fn widen(self) -> u32 {
        u32::from(self)
    }
}

/// Tick counter that saturates at the maximum of `T`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SaturatingCounter<T: CounterValue> {
    value: T,
}

/// Eight-bit counter used for every sequencing delay except the shutdown timeout.
pub type TickCounter = SaturatingCounter<u8>;

/// Sixteen-bit counter used for the shutdown timeout.
pub type WideTickCounter = SaturatingCounter<u16>;

impl<T: CounterValue> SaturatingCounter<T> {
    /// Creates a counter holding `value`.
    pub const fn starting_at(value: T) -> Self {
        Self { value }
    }

    /// Advances the counter by one tick.
    pub fn advance(&mut self) {
        self.value = self.value.saturating_increment();
    }

    /// Returns the counter to zero.
    pub fn reset(&mut self) {
        self.value = T::default();
    }

    /// Current count.
    pub fn value(&self) -> T {
        self.value
    }

    /// Returns `true` once the count is strictly greater than `threshold`.
    pub fn exceeds(&self, threshold: T) -> bool {
        self.value > threshold
    }

    /// Returns `true` once the count is at least `threshold`.
    pub fn reached(&self, threshold: T) -> bool {
        self.value >= threshold
    }

    /// Returns `true` when the counter is pinned at its maximum.
    pub fn is_saturated(&self) -> bool {
        self.value == T::MAX
    }

    /// Returns `true` when the counter is at zero.
    pub fn is_zero(&self) -> bool {
        self.value == T::default()
    }
}
