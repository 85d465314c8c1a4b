//! Tick period and sequencing thresholds shared by firmware and host targets.
//!
//! Every threshold is expressed in ticks of [`TICK_PERIOD`]. The defaults
//! reproduce the timings the PCU shipped with: 0.1 s to power on, 0.5 s to
//! request a shutdown, and a 30 s ceiling on waiting for the CPU to drop its
//! rail after the shutdown pulse.

use core::time::Duration;

/// Firmware revision reported at boot.
pub const FIRMWARE_REVISION: &str = "R1.4";

/// Fixed period of the sequencer tick, in milliseconds.
pub const TICK_PERIOD_MS: u64 = 10;

/// Fixed period of the sequencer tick.
pub const TICK_PERIOD: Duration = Duration::from_millis(TICK_PERIOD_MS);

/// Press duration needed to power the system up.
pub const POWER_ON_THRESHOLD: u8 = 10;
/// Press duration needed to request a shutdown while running.
pub const SHUTDOWN_THRESHOLD: u8 = 50;
/// Grace period after power-up before shutdown events are polled.
pub const PRE_RUNNING_DELAY: u8 = 240;
/// Ticks a rail loss must persist before it is acted upon.
pub const VOLTAGE_LOSS_DEBOUNCE: u8 = 1;
/// Settling time after the rail is enabled.
pub const RAIL_STABILIZATION_DELAY: u8 = 10;
/// Length of the generated wake pulse.
pub const WAKE_PULSE_TIME: u8 = 10;
/// Length of the generated shutdown pulse.
pub const SHUTDOWN_PULSE_TIME: u8 = 10;
/// Longest wait after the shutdown pulse before the rail is cut regardless.
pub const SHUTDOWN_TIMEOUT: u16 = 3_000;

/// Threshold set consumed by the sequencer.
///
/// Values are fixed for the lifetime of a sequencer; the firmware always uses
/// [`SequencerTimings::DEFAULT`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SequencerTimings {
    /// Press ticks that must be exceeded to leave `Sleeping`.
    pub power_on_threshold: u8,
    /// Press ticks that must be exceeded to leave `Running` for a shutdown.
    pub shutdown_threshold: u8,
    /// Ticks that must be exceeded in `PreRunning`.
    pub pre_running_delay: u8,
    /// Ticks that must be reached in `VoltageLossCheck` before re-sampling.
    pub voltage_loss_debounce: u8,
    /// Ticks that must be exceeded in `PowerOnRequested`.
    pub rail_stabilization_delay: u8,
    /// Ticks that must be exceeded in `WakeupPulse`.
    pub wake_pulse_time: u8,
    /// Ticks that must be exceeded in `ShutdownPulse`.
    pub shutdown_pulse_time: u8,
    /// Ticks that must be exceeded in `ShutdownRequested` before forcing sleep.
    pub shutdown_timeout: u16,
}

impl SequencerTimings {
    /// Timings the PCU firmware ships with.
    pub const DEFAULT: Self = Self {
        power_on_threshold: POWER_ON_THRESHOLD,
        shutdown_threshold: SHUTDOWN_THRESHOLD,
        pre_running_delay: PRE_RUNNING_DELAY,
        voltage_loss_debounce: VOLTAGE_LOSS_DEBOUNCE,
        rail_stabilization_delay: RAIL_STABILIZATION_DELAY,
        wake_pulse_time: WAKE_PULSE_TIME,
        shutdown_pulse_time: SHUTDOWN_PULSE_TIME,
        shutdown_timeout: SHUTDOWN_TIMEOUT,
    };

    /// Shortened timings for interactive exploration in the emulator.
    pub const FAST: Self = Self {
        power_on_threshold: 2,
        shutdown_threshold: 5,
        pre_running_delay: 4,
        voltage_loss_debounce: 1,
        rail_stabilization_delay: 2,
        wake_pulse_time: 2,
        shutdown_pulse_time: 2,
        shutdown_timeout: 10,
    };

    /// Converts a tick count into wall-clock time.
    #[must_use]
    pub fn duration_of(ticks: u32) -> Duration {
        TICK_PERIOD * ticks
    }

    /// Minimum press time that powers the system up.
    #[must_use]
    pub fn power_on_press(&self) -> Duration {
        Self::duration_of(u32::from(self.power_on_threshold) + 1)
    }

    /// Minimum press time that requests a shutdown.
    #[must_use]
    pub fn shutdown_press(&self) -> Duration {
        Self::duration_of(u32::from(self.shutdown_threshold) + 1)
    }

    /// Ceiling on the wait for the CPU to power down after the shutdown pulse.
    #[must_use]
    pub fn shutdown_timeout_duration(&self) -> Duration {
        Self::duration_of(u32::from(self.shutdown_timeout) + 1)
    }
}

impl Default for SequencerTimings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_period_matches_millisecond_constant() {
        assert_eq!(TICK_PERIOD.as_millis(), u128::from(TICK_PERIOD_MS));
    }

    #[test]
    fn default_timings_match_shipped_firmware() {
        let timings = SequencerTimings::default();
        assert_eq!(timings.power_on_threshold, 10);
        assert_eq!(timings.shutdown_threshold, 50);
        assert_eq!(timings.pre_running_delay, 240);
        assert_eq!(timings.voltage_loss_debounce, 1);
        assert_eq!(timings.shutdown_timeout, 3_000);
    }

    #[test]
    fn thresholds_convert_to_wall_clock() {
        let timings = SequencerTimings::DEFAULT;
        assert_eq!(timings.power_on_press(), Duration::from_millis(110));
        assert_eq!(timings.shutdown_press(), Duration::from_millis(510));
        assert_eq!(timings.shutdown_timeout_duration(), Duration::from_millis(30_010));
    }

    #[test]
    fn shutdown_press_is_longer_than_power_on_press() {
        for timings in [SequencerTimings::DEFAULT, SequencerTimings::FAST] {
            assert!(timings.shutdown_threshold > timings.power_on_threshold);
        }
    }
}
