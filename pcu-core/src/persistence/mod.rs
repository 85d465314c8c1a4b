//! Persisted power intent.
//!
//! The PCU remembers the last power state the user asked for so that a board
//! which loses supply while running comes back up on its own once power
//! returns. The intent is a single byte: `0x00` means on, anything else
//! (including the erased `0xFF` state) means off.

use core::fmt;

pub mod nor_flash;

pub use nor_flash::{IntentStoreError, NorFlashIntentStore};

/// Byte programmed when the intent is on.
pub const ON_STORED_BYTE: u8 = 0x00;
/// Byte left behind by an erase; decoded as off.
pub const ERASED_BYTE: u8 = 0xFF;

/// Last power state commanded by the user.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PowerIntent {
    On,
    #[default]
    Off,
}

impl PowerIntent {
    /// Decodes a stored byte. Unknown values decode as [`PowerIntent::Off`].
    #[must_use]
    pub const fn from_stored_byte(byte: u8) -> Self {
        match byte {
            ON_STORED_BYTE => PowerIntent::On,
            _ => PowerIntent::Off,
        }
    }

    /// Byte representation in non-volatile storage.
    #[must_use]
    pub const fn to_stored_byte(self) -> u8 {
        match self {
            PowerIntent::On => ON_STORED_BYTE,
            PowerIntent::Off => ERASED_BYTE,
        }
    }

    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, PowerIntent::On)
    }
}

impl fmt::Display for PowerIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerIntent::On => f.write_str("on"),
            PowerIntent::Off => f.write_str("off"),
        }
    }
}

/// Non-volatile home of the [`PowerIntent`].
///
/// Both operations are whole-operation: an implementation never exposes a
/// half-written byte to the sequencer.
pub trait IntentStore {
    /// Backend-specific failure.
    type Error: fmt::Debug;

    /// Reads the stored intent. An erased store reads as [`PowerIntent::Off`].
    fn load(&mut self) -> Result<PowerIntent, Self::Error>;

    /// Erases the slot and programs `intent`.
    fn store(&mut self, intent: PowerIntent) -> Result<(), Self::Error>;
}

/// Failure raised by [`MemoryIntentStore`] when a fault has been injected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MemoryStoreError {
    Injected,
}

impl fmt::Display for MemoryStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryStoreError::Injected => f.write_str("injected store failure"),
        }
    }
}

/// RAM-backed intent store used by host tooling and tests.
#[derive(Clone, Debug)]
pub struct MemoryIntentStore {
    byte: u8,
    writes: u32,
    fail_next_store: bool,
}

impl MemoryIntentStore {
    /// Creates a store in the erased state.
    #[must_use]
    pub const fn erased() -> Self {
        Self::with_byte(ERASED_BYTE)
    }

    /// Creates a store pre-loaded with a raw byte.
    #[must_use]
    pub const fn with_byte(byte: u8) -> Self {
        Self {
            byte,
            writes: 0,
            fail_next_store: false,
        }
    }

    /// Creates a store already holding `intent`.
    #[must_use]
    pub const fn holding(intent: PowerIntent) -> Self {
        Self::with_byte(intent.to_stored_byte())
    }

    /// Raw stored byte.
    #[must_use]
    pub const fn raw(&self) -> u8 {
        self.byte
    }

    /// Number of successful [`IntentStore::store`] calls.
    #[must_use]
    pub const fn writes(&self) -> u32 {
        self.writes
    }

    /// Makes the next [`IntentStore::store`] call fail without touching the byte.
    pub fn fail_next_store(&mut self) {
        self.fail_next_store = true;
    }
}

impl Default for MemoryIntentStore {
    fn default() -> Self {
        Self::erased()
    }
}

impl IntentStore for MemoryIntentStore {
    type Error = MemoryStoreError;

    fn load(&mut self) -> Result<PowerIntent, Self::Error> {
        Ok(PowerIntent::from_stored_byte(self.byte))
    }

    fn store(&mut self, intent: PowerIntent) -> Result<(), Self::Error> {
        if core::mem::take(&mut self.fail_next_store) {
            return Err(MemoryStoreError::Injected);
        }

        self.byte = intent.to_stored_byte();
        self.writes = self.writes.saturating_add(1);
        Ok(())
    }
}
