//! Binds the pure sequencer to an intent store and the output pins.
//!
//! Each [`PowerSequencer::step`] runs one tick, records telemetry for what
//! happened, persists the intent when the tick decided a new one, and only
//! then drives the outputs. A power loss between the store and the pin update
//! therefore resumes in the state the user last asked for.

use core::convert::Infallible;
use core::fmt;

use crate::persistence::{IntentStore, PowerIntent};
use crate::sequencer::{
    self, Inputs, Mode, OutputLevels, SequencerState, StateSnapshot, TickOutcome,
};
use crate::telemetry::{TelemetryEvent, TelemetryRecorder};
use crate::timing::SequencerTimings;

/// Sink for the three sequencer outputs.
pub trait PowerOutputs {
    /// Pin-specific failure.
    type Error: fmt::Debug;

    /// Enables or disables the downstream power rail.
    fn set_power_rail(&mut self, on: bool) -> Result<(), Self::Error>;

    /// Drives the CPU wake line.
    fn set_wake_pulse(&mut self, asserted: bool) -> Result<(), Self::Error>;

    /// Drives the CPU shutdown request line.
    fn set_shutdown_pulse(&mut self, asserted: bool) -> Result<(), Self::Error>;
}

/// Output sink that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopOutputs;

impl NoopOutputs {
    /// Creates a new no-op output sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PowerOutputs for NoopOutputs {
    type Error = Infallible;

    fn set_power_rail(&mut self, _on: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_wake_pulse(&mut self, _asserted: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_shutdown_pulse(&mut self, _asserted: bool) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Failure surfaced by the driver. The state machine has advanced regardless.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DriveError<SE, OE> {
    /// The intent store could not be read or written.
    Persist(SE),
    /// At least one output could not be driven; carries the first error.
    Output(OE),
}

impl<SE: fmt::Debug, OE: fmt::Debug> fmt::Display for DriveError<SE, OE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveError::Persist(error) => write!(f, "intent store failed: {error:?}"),
            DriveError::Output(error) => write!(f, "output failed: {error:?}"),
        }
    }
}

/// Summary of a successful [`PowerSequencer::step`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TickReport {
    /// Index of the tick just evaluated, starting at 1.
    pub tick: u32,
    pub outcome: TickOutcome,
}

/// Shorthand for the driver's error type.
pub type DriverError<S, O> =
    DriveError<<S as IntentStore>::Error, <O as PowerOutputs>::Error>;

/// Power sequencer bound to its store, outputs and telemetry.
pub struct PowerSequencer<S: IntentStore, O: PowerOutputs> {
    state: SequencerState,
    store: S,
    outputs: O,
    telemetry: TelemetryRecorder,
    ticks: u32,
    booted_intent: Option<PowerIntent>,
}

impl<S: IntentStore, O: PowerOutputs> PowerSequencer<S, O> {
    /// Drives the outputs idle, loads the persisted intent and builds the state.
    ///
    /// A load failure boots as if the intent were off. Any failure is handed
    /// back alongside the sequencer so the caller can log it.
    pub fn boot(
        store: S,
        outputs: O,
        timings: SequencerTimings,
    ) -> (Self, Option<DriverError<S, O>>) {
        let mut sequencer = Self {
            state: SequencerState::new(timings),
            store,
            outputs,
            telemetry: TelemetryRecorder::new(),
            ticks: 0,
            booted_intent: None,
        };

        let idle = apply_outputs(&mut sequencer.outputs, OutputLevels::IDLE);
        let (intent, loaded) = match sequencer.store.load() {
            Ok(intent) => (intent, Ok(())),
            Err(error) => (PowerIntent::Off, Err(error)),
        };

        sequencer.state = SequencerState::boot_with(intent, timings);
        sequencer.booted_intent = Some(intent);
        sequencer
            .telemetry
            .record(TelemetryEvent::Booted(intent), sequencer.ticks);

        if idle.is_err() {
            sequencer
                .telemetry
                .record(TelemetryEvent::OutputFailed, sequencer.ticks);
        }

        let error = match (loaded, idle) {
            (Err(error), _) => Some(DriveError::Persist(error)),
            (Ok(()), Err(error)) => Some(DriveError::Output(error)),
            (Ok(()), Ok(())) => None,
        };

        (sequencer, error)
    }

    /// Rebuilds the sequencer from a snapshot kept in retained memory.
    ///
    /// The store is not consulted. An unknown mode in the snapshot is reset to
    /// [`Mode::Sleeping`] and recorded as [`TelemetryEvent::DefensiveReset`].
    /// The levels of the restored mode are driven immediately.
    pub fn resume(
        store: S,
        outputs: O,
        snapshot: StateSnapshot,
        timings: SequencerTimings,
    ) -> (Self, Option<DriverError<S, O>>) {
        let restored = SequencerState::restore(snapshot, timings);
        let mut sequencer = Self {
            state: restored.state,
            store,
            outputs,
            telemetry: TelemetryRecorder::new(),
            ticks: 0,
            booted_intent: None,
        };

        if restored.defensive_reset {
            sequencer
                .telemetry
                .record(TelemetryEvent::DefensiveReset, sequencer.ticks);
        }

        let levels = sequencer.state.outputs();
        let error = sequencer.drive(levels).err();
        (sequencer, error)
    }

    /// Runs one tick and applies its effects.
    ///
    /// # Errors
    ///
    /// [`DriveError::Persist`] when the intent could not be stored. The outputs
    /// are still applied in that case. [`DriveError::Output`] when any output
    /// failed; every output is attempted before the error is returned.
    pub fn step(&mut self, inputs: Inputs) -> Result<TickReport, DriverError<S, O>> {
        self.ticks = self.ticks.wrapping_add(1);
        let outcome = sequencer::tick(&mut self.state, inputs);

        if let Some(transition) = outcome.transition {
            self.telemetry.record(
                TelemetryEvent::ModeChanged {
                    from: transition.from,
                    to: transition.to,
                },
                self.ticks,
            );
        }

        let persisted = match outcome.persist {
            Some(intent) => self.persist(intent),
            None => Ok(()),
        };
        let driven = self.drive(outcome.outputs);

        persisted?;
        driven?;

        Ok(TickReport {
            tick: self.ticks,
            outcome,
        })
    }

    fn persist(&mut self, intent: PowerIntent) -> Result<(), DriverError<S, O>> {
        match self.store.store(intent) {
            Ok(()) => {
                self.telemetry
                    .record(TelemetryEvent::IntentPersisted(intent), self.ticks);
                Ok(())
            }
            Err(error) => {
                self.telemetry
                    .record(TelemetryEvent::PersistFailed(intent), self.ticks);
                Err(DriveError::Persist(error))
            }
        }
    }

    fn drive(&mut self, levels: OutputLevels) -> Result<(), DriverError<S, O>> {
        apply_outputs(&mut self.outputs, levels).map_err(|error| {
            self.telemetry
                .record(TelemetryEvent::OutputFailed, self.ticks);
            DriveError::Output(error)
        })
    }

    #[must_use]
    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    /// `true` when the caller may stop ticking until the button is pressed.
    #[must_use]
    pub fn wants_sleep(&self) -> bool {
        self.state.wants_sleep()
    }

    /// Intent the state was built from by [`PowerSequencer::boot`].
    ///
    /// A load failure reports [`PowerIntent::Off`]. `None` after
    /// [`PowerSequencer::resume`], which never reads the store.
    #[must_use]
    pub fn booted_intent(&self) -> Option<PowerIntent> {
        self.booted_intent
    }

    /// Number of ticks evaluated since boot.
    #[must_use]
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    #[must_use]
    pub fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the store, for fault injection on host targets.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    #[must_use]
    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    /// Tears the sequencer down, handing back the store and output sink.
    pub fn into_parts(self) -> (S, O) {
        (self.store, self.outputs)
    }
}

fn apply_outputs<O: PowerOutputs>(outputs: &mut O, levels: OutputLevels) -> Result<(), O::Error> {
    let rail = outputs.set_power_rail(levels.power_rail);
    let wake = outputs.set_wake_pulse(levels.wake_pulse);
    let shutdown = outputs.set_shutdown_pulse(levels.shutdown_pulse);
    rail.and(wake).and(shutdown)
}
