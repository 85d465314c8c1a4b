#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! Lightweight atomics mirror what the sequencer task last observed so the
//! low-power entry log and any future debug link can report it without
//! borrowing the sequencer.

use pcu_core::persistence::PowerIntent;
use pcu_core::sequencer::Mode;
use portable_atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

/// Raw value stored before the sequencer has booted.
const UNKNOWN_MODE: u8 = u8::MAX;

static MODE: AtomicU8 = AtomicU8::new(UNKNOWN_MODE);
static TICKS: AtomicU32 = AtomicU32::new(0);
static INTENT_ON: AtomicBool = AtomicBool::new(false);
static PERSIST_FAILURES: AtomicU32 = AtomicU32::new(0);
static OUTPUT_FAILURES: AtomicU32 = AtomicU32::new(0);

/// Point-in-time copy of the shared status.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusSnapshot {
    pub mode: Option<Mode>,
    pub ticks: u32,
    pub intent: PowerIntent,
    pub persist_failures: u32,
    pub output_failures: u32,
}

/// Records the mode and tick count after a step.
pub fn record_step(mode: Mode, ticks: u32) {
    MODE.store(mode.to_raw(), Ordering::Relaxed);
    TICKS.store(ticks, Ordering::Relaxed);
}

/// Records the intent last known to be in flash.
pub fn record_intent(intent: PowerIntent) {
    INTENT_ON.store(intent.is_on(), Ordering::Relaxed);
}

pub fn record_persist_failure() {
    PERSIST_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_output_failure() {
    OUTPUT_FAILURES.fetch_add(1, Ordering::Relaxed);
}

/// Builds a [`StatusSnapshot`] using the stored values.
pub fn snapshot() -> StatusSnapshot {
    let intent = if INTENT_ON.load(Ordering::Relaxed) {
        PowerIntent::On
    } else {
        PowerIntent::Off
    };

    StatusSnapshot {
        mode: Mode::from_raw(MODE.load(Ordering::Relaxed)),
        ticks: TICKS.load(Ordering::Relaxed),
        intent,
        persist_failures: PERSIST_FAILURES.load(Ordering::Relaxed),
        output_failures: OUTPUT_FAILURES.load(Ordering::Relaxed),
    }
}
