//! Power sequencing state machine.
//!
//! The sequencer is evaluated once per [`TICK_PERIOD`](crate::timing::TICK_PERIOD).
//! Each tick first advances every saturating counter, then evaluates the
//! current [`Mode`] exactly once, so a single tick performs at most one
//! transition. The machine is total: it has no error paths and every input
//! combination is handled in every mode.

use core::fmt;

use crate::counter::{TickCounter, WideTickCounter};
use crate::persistence::PowerIntent;
use crate::timing::SequencerTimings;

/// Operating mode of the power sequencer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Mode {
    /// Rail off, waiting for a power-on press.
    Sleeping = 0,
    /// Rail enabled, waiting for it to settle.
    PowerOnRequested = 1,
    /// Rail did not come up on its own; pulsing the CPU wake line.
    WakeupPulse = 2,
    /// Grace period before shutdown presses and rail loss are honoured.
    PreRunning = 3,
    /// System up.
    Running = 4,
    /// Rail dropped while running; debouncing before cutting power.
    VoltageLossCheck = 5,
    /// Pulsing the CPU shutdown line.
    ShutdownPulse = 6,
    /// Waiting for the CPU to drop its rail or for the timeout.
    ShutdownRequested = 7,
}

impl Mode {
    /// Every mode, in discriminant order.
    pub const ALL: [Mode; 8] = [
        Mode::Sleeping,
        Mode::PowerOnRequested,
        Mode::WakeupPulse,
        Mode::PreRunning,
        Mode::Running,
        Mode::VoltageLossCheck,
        Mode::ShutdownPulse,
        Mode::ShutdownRequested,
    ];

    /// Raw discriminant used in snapshots and telemetry codes.
    #[must_use]
    pub const fn to_raw(self) -> u8 {
        self as u8
    }

    /// Decodes a raw discriminant, returning `None` for unknown values.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Mode::Sleeping),
            1 => Some(Mode::PowerOnRequested),
            2 => Some(Mode::WakeupPulse),
            3 => Some(Mode::PreRunning),
            4 => Some(Mode::Running),
            5 => Some(Mode::VoltageLossCheck),
            6 => Some(Mode::ShutdownPulse),
            7 => Some(Mode::ShutdownRequested),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Mode::Sleeping => "sleeping",
            Mode::PowerOnRequested => "power-on-requested",
            Mode::WakeupPulse => "wakeup-pulse",
            Mode::PreRunning => "pre-running",
            Mode::Running => "running",
            Mode::VoltageLossCheck => "voltage-loss-check",
            Mode::ShutdownPulse => "shutdown-pulse",
            Mode::ShutdownRequested => "shutdown-requested",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs sampled once per tick.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Inputs {
    /// Debounced pushbutton level.
    pub button_pressed: bool,
    /// Downstream rail above the sense threshold.
    pub rail_voltage_present: bool,
}

impl Inputs {
    #[must_use]
    pub const fn new(button_pressed: bool, rail_voltage_present: bool) -> Self {
        Self {
            button_pressed,
            rail_voltage_present,
        }
    }
}

/// Levels of the three sequencer outputs.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct OutputLevels {
    pub power_rail: bool,
    pub wake_pulse: bool,
    pub shutdown_pulse: bool,
}

impl OutputLevels {
    /// All outputs low; the level driven before the first tick.
    pub const IDLE: Self = Self {
        power_rail: false,
        wake_pulse: false,
        shutdown_pulse: false,
    };

    /// Output levels held while `mode` is active.
    #[must_use]
    pub const fn for_mode(mode: Mode) -> Self {
        Self {
            power_rail: !matches!(mode, Mode::Sleeping),
            wake_pulse: matches!(mode, Mode::WakeupPulse),
            shutdown_pulse: matches!(mode, Mode::ShutdownPulse),
        }
    }
}

/// Mode change performed by a tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub from: Mode,
    pub to: Mode,
}

/// Result of a single [`tick`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TickOutcome {
    /// Levels to drive after this tick.
    pub outputs: OutputLevels,
    /// Intent to persist before the outputs are applied.
    pub persist: Option<PowerIntent>,
    /// Mode change, if the tick performed one.
    pub transition: Option<Transition>,
}

/// Plain-data image of a [`SequencerState`].
///
/// The mode is kept as its raw discriminant so an image read back from
/// retained memory can carry a value no [`Mode`] matches.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct StateSnapshot {
    pub mode: u8,
    pub press_ticks: u8,
    pub pre_running_ticks: u8,
    pub wake_pulse_ticks: u8,
    pub stabilization_ticks: u8,
    pub voltage_loss_ticks: u8,
    pub shutdown_pulse_ticks: u8,
    pub shutdown_timeout_ticks: u16,
    pub suppress_press_timer: bool,
}

/// A state rebuilt from a [`StateSnapshot`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Restored {
    pub state: SequencerState,
    /// `true` when the snapshot's mode was unknown and the state was reset.
    pub defensive_reset: bool,
}

/// Complete mutable state of the power sequencer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SequencerState {
    mode: Mode,
    timings: SequencerTimings,
    press: TickCounter,
    pre_running: TickCounter,
    wake_pulse: TickCounter,
    stabilization: TickCounter,
    voltage_loss: TickCounter,
    shutdown_pulse: TickCounter,
    shutdown_timeout: WideTickCounter,
    suppress_press_timer: bool,
}

impl SequencerState {
    /// Creates a sleeping sequencer with all counters at zero.
    #[must_use]
    pub const fn new(timings: SequencerTimings) -> Self {
        Self {
            mode: Mode::Sleeping,
            timings,
            press: TickCounter::starting_at(0),
            pre_running: TickCounter::starting_at(0),
            wake_pulse: TickCounter::starting_at(0),
            stabilization: TickCounter::starting_at(0),
            voltage_loss: TickCounter::starting_at(0),
            shutdown_pulse: TickCounter::starting_at(0),
            shutdown_timeout: WideTickCounter::starting_at(0),
            suppress_press_timer: false,
        }
    }

    /// Builds the boot state for the persisted `intent` using the shipped timings.
    #[must_use]
    pub const fn boot(intent: PowerIntent) -> Self {
        Self::boot_with(intent, SequencerTimings::DEFAULT)
    }

    /// Builds the boot state for the persisted `intent`.
    ///
    /// An `On` intent resumes straight into [`Mode::PowerOnRequested`] with the
    /// press timer suppressed, so a button still held from before the power
    /// loss cannot immediately request a shutdown.
    #[must_use]
    pub const fn boot_with(intent: PowerIntent, timings: SequencerTimings) -> Self {
        let mut state = Self::new(timings);
        if intent.is_on() {
            state.mode = Mode::PowerOnRequested;
            state.suppress_press_timer = true;
        }
        state
    }

    /// Rebuilds a state from a snapshot.
    ///
    /// An unknown mode byte triggers [`SequencerState::defensive_reset`].
    #[must_use]
    pub fn restore(snapshot: StateSnapshot, timings: SequencerTimings) -> Restored {
        let mut state = Self {
            mode: Mode::Sleeping,
            timings,
            press: TickCounter::starting_at(snapshot.press_ticks),
            pre_running: TickCounter::starting_at(snapshot.pre_running_ticks),
            wake_pulse: TickCounter::starting_at(snapshot.wake_pulse_ticks),
            stabilization: TickCounter::starting_at(snapshot.stabilization_ticks),
            voltage_loss: TickCounter::starting_at(snapshot.voltage_loss_ticks),
            shutdown_pulse: TickCounter::starting_at(snapshot.shutdown_pulse_ticks),
            shutdown_timeout: WideTickCounter::starting_at(snapshot.shutdown_timeout_ticks),
            suppress_press_timer: snapshot.suppress_press_timer,
        };

        let defensive_reset = match Mode::from_raw(snapshot.mode) {
            Some(mode) => {
                state.mode = mode;
                false
            }
            None => {
                state.defensive_reset();
                true
            }
        };

        Restored {
            state,
            defensive_reset,
        }
    }

    /// Captures the state as plain data.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            mode: self.mode.to_raw(),
            press_ticks: self.press.value(),
            pre_running_ticks: self.pre_running.value(),
            wake_pulse_ticks: self.wake_pulse.value(),
            stabilization_ticks: self.stabilization.value(),
            voltage_loss_ticks: self.voltage_loss.value(),
            shutdown_pulse_ticks: self.shutdown_pulse.value(),
            shutdown_timeout_ticks: self.shutdown_timeout.value(),
            suppress_press_timer: self.suppress_press_timer,
        }
    }

    /// Recovery from an unrecognized state: clear the press timer and sleep.
    pub fn defensive_reset(&mut self) {
        self.press.reset();
        self.mode = Mode::Sleeping;
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub const fn timings(&self) -> SequencerTimings {
        self.timings
    }

    /// Current press duration in ticks.
    #[must_use]
    pub fn press_ticks(&self) -> u8 {
        self.press.value()
    }

    #[must_use]
    pub const fn press_suppressed(&self) -> bool {
        self.suppress_press_timer
    }

    /// Output levels for the current mode.
    #[must_use]
    pub const fn outputs(&self) -> OutputLevels {
        OutputLevels::for_mode(self.mode)
    }

    /// `true` when nothing can happen until the button is pressed.
    ///
    /// The firmware stops ticking and waits for the button interrupt. A latched
    /// press keeps the ticker running until a released sample clears it, since
    /// the interrupt only fires on the next press.
    #[must_use]
    pub fn wants_sleep(&self) -> bool {
        self.mode == Mode::Sleeping && self.press.is_zero() && !self.suppress_press_timer
    }

    fn advance_counters(&mut self, button_pressed: bool) {
        if !button_pressed {
            self.press.reset();
            self.suppress_press_timer = false;
        } else if !self.suppress_press_timer {
            self.press.advance();
        }

        self.pre_running.advance();
        self.wake_pulse.advance();
        self.stabilization.advance();
        self.voltage_loss.advance();
        self.shutdown_pulse.advance();
        self.shutdown_timeout.advance();
    }

    /// Consumes the press and latches suppression until the button is released.
    fn consume_press(&mut self) {
        self.press.reset();
        self.suppress_press_timer = true;
    }

    fn evaluate(&mut self, inputs: Inputs) -> Option<PowerIntent> {
        let timings = self.timings;

        match self.mode {
            Mode::Sleeping => {
                if self.press.exceeds(timings.power_on_threshold) {
                    self.consume_press();
                    self.stabilization.reset();
                    self.mode = Mode::PowerOnRequested;
                    return Some(PowerIntent::On);
                }
            }
            Mode::PowerOnRequested => {
                if self.stabilization.exceeds(timings.rail_stabilization_delay) {
                    if inputs.rail_voltage_present {
                        self.pre_running.reset();
                        self.mode = Mode::PreRunning;
                    } else {
                        self.wake_pulse.reset();
                        self.mode = Mode::WakeupPulse;
                    }
                }
            }
            Mode::WakeupPulse => {
                if self.wake_pulse.exceeds(timings.wake_pulse_time) {
                    self.pre_running.reset();
                    self.mode = Mode::PreRunning;
                }
            }
            Mode::PreRunning => {
                if self.pre_running.exceeds(timings.pre_running_delay) {
                    self.mode = Mode::Running;
                }
            }
            Mode::Running => {
                if self.press.exceeds(timings.shutdown_threshold) {
                    self.consume_press();
                    self.shutdown_pulse.reset();
                    self.mode = Mode::ShutdownPulse;
                    return Some(PowerIntent::Off);
                } else if !inputs.rail_voltage_present {
                    self.voltage_loss.reset();
                    self.mode = Mode::VoltageLossCheck;
                }
            }
            Mode::VoltageLossCheck => {
                if self.voltage_loss.reached(timings.voltage_loss_debounce) {
                    self.press.reset();
                    self.mode = if inputs.rail_voltage_present {
                        Mode::Running
                    } else {
                        Mode::Sleeping
                    };
                }
            }
            Mode::ShutdownPulse => {
                if self.shutdown_pulse.exceeds(timings.shutdown_pulse_time) {
                    self.shutdown_timeout.reset();
                    self.mode = Mode::ShutdownRequested;
                }
            }
            Mode::ShutdownRequested => {
                if self.shutdown_timeout.exceeds(timings.shutdown_timeout)
                    || !inputs.rail_voltage_present
                {
                    self.press.reset();
                    self.mode = Mode::Sleeping;
                }
            }
        }

        None
    }
}

impl Default for SequencerState {
    fn default() -> Self {
        Self::new(SequencerTimings::DEFAULT)
    }
}

/// Advances the counters and evaluates the state machine once.
pub fn tick(state: &mut SequencerState, inputs: Inputs) -> TickOutcome {
    state.advance_counters(inputs.button_pressed);

    let from = state.mode;
    let persist = state.evaluate(inputs);
    let transition = (state.mode != from).then_some(Transition {
        from,
        to: state.mode,
    });

    TickOutcome {
        outputs: OutputLevels::for_mode(state.mode),
        persist,
        transition,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESSED: Inputs = Inputs::new(true, false);
    const PRESSED_RAIL_UP: Inputs = Inputs::new(true, true);
    const IDLE: Inputs = Inputs::new(false, false);
    const RAIL_UP: Inputs = Inputs::new(false, true);

    fn run(state: &mut SequencerState, inputs: Inputs, ticks: u32) -> Option<TickOutcome> {
        let mut last = None;
        for _ in 0..ticks {
            last = Some(tick(state, inputs));
        }
        last
    }

    fn running(timings: SequencerTimings) -> SequencerState {
        let snapshot = StateSnapshot {
            mode: Mode::Running.to_raw(),
            ..StateSnapshot::default()
        };
        SequencerState::restore(snapshot, timings).state
    }

    #[test]
    fn mode_discriminants_round_trip() {
        for mode in Mode::ALL {
            assert_eq!(Mode::from_raw(mode.to_raw()), Some(mode));
        }
        assert_eq!(Mode::from_raw(8), None);
    }

    #[test]
    fn outputs_follow_mode() {
        assert_eq!(OutputLevels::for_mode(Mode::Sleeping), OutputLevels::IDLE);
        assert!(OutputLevels::for_mode(Mode::WakeupPulse).wake_pulse);
        assert!(OutputLevels::for_mode(Mode::ShutdownPulse).shutdown_pulse);
        for mode in Mode::ALL.into_iter().skip(1) {
            assert!(OutputLevels::for_mode(mode).power_rail, "{mode}");
        }
    }

    #[test]
    fn boot_with_on_intent_suppresses_press() {
        let state = SequencerState::boot(PowerIntent::On);
        assert_eq!(state.mode(), Mode::PowerOnRequested);
        assert!(state.press_suppressed());

        let state = SequencerState::boot(PowerIntent::Off);
        assert_eq!(state.mode(), Mode::Sleeping);
        assert!(state.wants_sleep());
    }

    #[test]
    fn latched_press_keeps_ticking_until_release() {
        let timings = SequencerTimings::FAST;
        let mut state = SequencerState::boot_with(PowerIntent::On, timings);
        run(&mut state, RAIL_UP, 20);
        assert_eq!(state.mode(), Mode::Running);

        run(&mut state, PRESSED_RAIL_UP, 12);
        assert_eq!(state.mode(), Mode::ShutdownRequested);

        // The rail drops while the shutdown press is still held.
        tick(&mut state, PRESSED);
        assert_eq!(state.mode(), Mode::Sleeping);
        assert!(state.press_suppressed());
        assert!(!state.wants_sleep());

        tick(&mut state, IDLE);
        assert!(!state.press_suppressed());
        assert!(state.wants_sleep());
    }

    #[test]
    fn power_on_press_persists_on_once() {
        let mut state = SequencerState::default();
        let threshold = u32::from(state.timings().power_on_threshold);

        let before = run(&mut state, PRESSED, threshold).unwrap();
        assert_eq!(before.transition, None);
        assert!(!state.wants_sleep());

        let outcome = tick(&mut state, PRESSED);
        assert_eq!(outcome.persist, Some(PowerIntent::On));
        assert_eq!(
            outcome.transition,
            Some(Transition {
                from: Mode::Sleeping,
                to: Mode::PowerOnRequested,
            })
        );
        assert!(outcome.outputs.power_rail);
        assert!(state.press_suppressed());
        assert_eq!(state.press_ticks(), 0);
    }

    #[test]
    fn rail_already_up_skips_wake_pulse() {
        let timings = SequencerTimings::FAST;
        let mut state = SequencerState::boot_with(PowerIntent::On, timings);

        run(&mut state, RAIL_UP, u32::from(timings.rail_stabilization_delay));
        assert_eq!(state.mode(), Mode::PowerOnRequested);

        let outcome = tick(&mut state, RAIL_UP);
        assert_eq!(outcome.transition.map(|t| t.to), Some(Mode::PreRunning));
        assert!(!outcome.outputs.wake_pulse);
    }

    #[test]
    fn missing_rail_generates_wake_pulse() {
        let timings = SequencerTimings::FAST;
        let mut state = SequencerState::boot_with(PowerIntent::On, timings);

        run(&mut state, IDLE, u32::from(timings.rail_stabilization_delay) + 1);
        assert_eq!(state.mode(), Mode::WakeupPulse);
        assert!(state.outputs().wake_pulse);

        run(&mut state, IDLE, u32::from(timings.wake_pulse_time) + 1);
        assert_eq!(state.mode(), Mode::PreRunning);
        assert!(!state.outputs().wake_pulse);
    }

    #[test]
    fn shutdown_press_takes_priority_over_rail_loss() {
        let timings = SequencerTimings::FAST;
        let mut state = running(timings);

        run(&mut state, PRESSED_RAIL_UP, u32::from(timings.shutdown_threshold));
        assert_eq!(state.mode(), Mode::Running);

        // Rail absent on the same tick the press qualifies.
        let outcome = tick(&mut state, PRESSED);
        assert_eq!(outcome.persist, Some(PowerIntent::Off));
        assert_eq!(state.mode(), Mode::ShutdownPulse);
        assert!(outcome.outputs.shutdown_pulse);
    }

    #[test]
    fn shutdown_requested_ends_when_rail_drops() {
        let timings = SequencerTimings::FAST;
        let snapshot = StateSnapshot {
            mode: Mode::ShutdownRequested.to_raw(),
            ..StateSnapshot::default()
        };
        let mut state = SequencerState::restore(snapshot, timings).state;

        tick(&mut state, RAIL_UP);
        assert_eq!(state.mode(), Mode::ShutdownRequested);

        let outcome = tick(&mut state, IDLE);
        assert_eq!(outcome.transition.map(|t| t.to), Some(Mode::Sleeping));
        assert_eq!(outcome.outputs, OutputLevels::IDLE);
    }

    #[test]
    fn unknown_snapshot_mode_resets_to_sleeping() {
        let snapshot = StateSnapshot {
            mode: 0xA5,
            press_ticks: 7,
            ..StateSnapshot::default()
        };
        let restored = SequencerState::restore(snapshot, SequencerTimings::DEFAULT);

        assert!(restored.defensive_reset);
        assert_eq!(restored.state.mode(), Mode::Sleeping);
        assert_eq!(restored.state.press_ticks(), 0);
    }

    #[test]
    fn snapshot_restores_known_state() {
        let mut state = running(SequencerTimings::DEFAULT);
        run(&mut state, PRESSED_RAIL_UP, 3);

        let restored = SequencerState::restore(state.snapshot(), SequencerTimings::DEFAULT);
        assert!(!restored.defensive_reset);
        assert_eq!(restored.state, state);
    }
}
