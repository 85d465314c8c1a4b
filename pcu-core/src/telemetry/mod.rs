//! Telemetry event catalog and the fixed-size history of sequencer activity.
//!
//! Events are strongly typed but encode to compact `u16` codes so the firmware
//! can log them cheaply and host tooling can decode captures. Records carry
//! the tick at which they were produced rather than a wall-clock timestamp;
//! multiply by [`TICK_PERIOD`](crate::timing::TICK_PERIOD) to recover time.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::persistence::PowerIntent;
use crate::sequencer::Mode;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Monotonic identifier assigned to every record.
pub type EventId = u32;

/// Events produced by the power sequencer and its driver.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEvent {
    /// Sequencer initialized from the persisted intent.
    Booted(PowerIntent),
    ModeChanged { from: Mode, to: Mode },
    IntentPersisted(PowerIntent),
    PersistFailed(PowerIntent),
    /// At least one output could not be driven.
    OutputFailed,
    /// An unrecognized state was reset to sleeping.
    DefensiveReset,
    Custom(u16),
}

impl TelemetryEvent {
    const BOOTED_BASE: u16 = 0x0000;
    const INTENT_PERSISTED_BASE: u16 = 0x0002;
    const PERSIST_FAILED_BASE: u16 = 0x0004;
    const OUTPUT_FAILED_CODE: u16 = 0x0006;
    const DEFENSIVE_RESET_CODE: u16 = 0x0007;
    const MODE_CHANGED_BASE: u16 = 0x0100;
    const MODE_CHANGED_END: u16 = Self::MODE_CHANGED_BASE + 0x0100;

    /// Encodes the event into a compact transport-friendly discriminant.
    ///
    /// Mode changes pack the source mode in bits 4..8 and the target mode in
    /// bits 0..4 above [`Self::MODE_CHANGED_BASE`].
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEvent::Booted(intent) => Self::BOOTED_BASE + intent_index(intent),
            TelemetryEvent::ModeChanged { from, to } => {
                Self::MODE_CHANGED_BASE | ((from.to_raw() as u16) << 4) | to.to_raw() as u16
            }
            TelemetryEvent::IntentPersisted(intent) => {
                Self::INTENT_PERSISTED_BASE + intent_index(intent)
            }
            TelemetryEvent::PersistFailed(intent) => {
                Self::PERSIST_FAILED_BASE + intent_index(intent)
            }
            TelemetryEvent::OutputFailed => Self::OUTPUT_FAILED_CODE,
            TelemetryEvent::DefensiveReset => Self::DEFENSIVE_RESET_CODE,
            TelemetryEvent::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant, falling back to [`TelemetryEvent::Custom`].
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        match code {
            Self::OUTPUT_FAILED_CODE => TelemetryEvent::OutputFailed,
            Self::DEFENSIVE_RESET_CODE => TelemetryEvent::DefensiveReset,
            value if (Self::BOOTED_BASE..Self::INTENT_PERSISTED_BASE).contains(&value) => {
                TelemetryEvent::Booted(intent_from_index(value - Self::BOOTED_BASE))
            }
            value if (Self::INTENT_PERSISTED_BASE..Self::PERSIST_FAILED_BASE).contains(&value) => {
                TelemetryEvent::IntentPersisted(intent_from_index(
                    value - Self::INTENT_PERSISTED_BASE,
                ))
            }
            value if (Self::PERSIST_FAILED_BASE..Self::OUTPUT_FAILED_CODE).contains(&value) => {
                TelemetryEvent::PersistFailed(intent_from_index(value - Self::PERSIST_FAILED_BASE))
            }
            value if (Self::MODE_CHANGED_BASE..Self::MODE_CHANGED_END).contains(&value) => {
                let packed = value - Self::MODE_CHANGED_BASE;
                let from = mode_from_nibble(packed >> 4);
                let to = mode_from_nibble(packed & 0x0F);
                match (from, to) {
                    (Some(from), Some(to)) => TelemetryEvent::ModeChanged { from, to },
                    _ => TelemetryEvent::Custom(value),
                }
            }
            other => TelemetryEvent::Custom(other),
        }
    }
}

impl fmt::Display for TelemetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEvent::Booted(intent) => write!(f, "booted intent={intent}"),
            TelemetryEvent::ModeChanged { from, to } => write!(f, "mode {from} -> {to}"),
            TelemetryEvent::IntentPersisted(intent) => write!(f, "intent-persisted {intent}"),
            TelemetryEvent::PersistFailed(intent) => write!(f, "persist-failed {intent}"),
            TelemetryEvent::OutputFailed => f.write_str("output-failed"),
            TelemetryEvent::DefensiveReset => f.write_str("defensive-reset"),
            TelemetryEvent::Custom(code) => write!(f, "custom({code:#06x})"),
        }
    }
}

const fn intent_index(intent: PowerIntent) -> u16 {
    match intent {
        PowerIntent::On => 0,
        PowerIntent::Off => 1,
    }
}

fn intent_from_index(index: u16) -> PowerIntent {
    if index == 0 {
        PowerIntent::On
    } else {
        PowerIntent::Off
    }
}

fn mode_from_nibble(nibble: u16) -> Option<Mode> {
    u8::try_from(nibble).ok().and_then(Mode::from_raw)
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub id: EventId,
    /// Sequencer tick at which the event occurred.
    pub tick: u32,
    pub event: TelemetryEvent,
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} t={} {}", self.id, self.tick, self.event)
    }
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer.
///
/// Once full, each new record overwrites the oldest one.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: TelemetryRing<CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Records `event` observed at `tick` and returns its identifier.
    pub fn record(&mut self, event: TelemetryEvent, tick: u32) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord { id, tick, event });

        id
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Total number of records ever written, including overwritten ones.
    pub fn total_recorded(&self) -> EventId {
        self.next_event_id
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAPACITY: usize> fmt::Debug for TelemetryRecorder<CAPACITY> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryRecorder")
            .field("len", &self.len())
            .field("next_event_id", &self.next_event_id)
            .finish()
    }
}
