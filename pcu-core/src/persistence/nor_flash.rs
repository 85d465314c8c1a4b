//! [`IntentStore`] backed by one erase page of NOR flash.

use core::fmt;

use embedded_storage::nor_flash::{NorFlash, NorFlashError, NorFlashErrorKind};

use super::{ERASED_BYTE, IntentStore, PowerIntent};

/// Largest program granule the store can pad a write to.
pub const MAX_WRITE_SIZE: usize = 32;

/// Errors raised by [`NorFlashIntentStore`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IntentStoreError {
    /// The flash driver rejected an operation.
    Flash(NorFlashErrorKind),
    /// The configured page does not fit in the device, or its granules exceed
    /// [`MAX_WRITE_SIZE`].
    OutOfBounds,
}

impl fmt::Display for IntentStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentStoreError::Flash(kind) => write!(f, "flash error: {kind:?}"),
            IntentStoreError::OutOfBounds => f.write_str("intent page out of bounds"),
        }
    }
}

fn flash_error<E: NorFlashError>(error: E) -> IntentStoreError {
    IntentStoreError::Flash(error.kind())
}

/// Keeps the intent in the first byte of a dedicated erase page.
///
/// The page at `offset` is owned by the store; anything else written there is
/// lost on the next [`IntentStore::store`].
pub struct NorFlashIntentStore<F> {
    flash: F,
    offset: u32,
    page_end: u32,
}

impl<F: NorFlash> NorFlashIntentStore<F> {
    /// Wraps `flash`, reserving the erase page starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`IntentStoreError::Flash`] with [`NorFlashErrorKind::NotAligned`]
    /// when `offset` is not page aligned, and [`IntentStoreError::OutOfBounds`]
    /// when the page runs past the end of the device or the flash granules are
    /// larger than the store can buffer.
    pub fn new(flash: F, offset: u32) -> Result<Self, IntentStoreError> {
        let erase_size = u32::try_from(F::ERASE_SIZE).map_err(|_| IntentStoreError::OutOfBounds)?;
        if erase_size == 0 || offset % erase_size != 0 {
            return Err(IntentStoreError::Flash(NorFlashErrorKind::NotAligned));
        }

        let end = offset
            .checked_add(erase_size)
            .ok_or(IntentStoreError::OutOfBounds)?;
        let capacity = u32::try_from(flash.capacity()).unwrap_or(u32::MAX);
        if end > capacity || F::WRITE_SIZE > MAX_WRITE_SIZE || F::READ_SIZE > MAX_WRITE_SIZE {
            return Err(IntentStoreError::OutOfBounds);
        }

        Ok(Self {
            flash,
            offset,
            page_end: end,
        })
    }

    /// Offset of the reserved page, relative to the start of the device.
    #[must_use]
    pub const fn offset(&self) -> u32 {
        self.offset
    }

    /// Returns the wrapped flash driver.
    pub fn into_inner(self) -> F {
        self.flash
    }

    fn erase_and_program(&mut self, intent: PowerIntent) -> Result<(), IntentStoreError> {
        self.flash
            .erase(self.offset, self.page_end)
            .map_err(flash_error)?;

        if intent.to_stored_byte() == ERASED_BYTE {
            return Ok(());
        }

        let mut granule = [ERASED_BYTE; MAX_WRITE_SIZE];
        granule[0] = intent.to_stored_byte();
        self.flash
            .write(self.offset, &granule[..F::WRITE_SIZE.max(1)])
            .map_err(flash_error)
    }
}

impl<F: NorFlash> IntentStore for NorFlashIntentStore<F> {
    type Error = IntentStoreError;

    fn load(&mut self) -> Result<PowerIntent, Self::Error> {
        let mut granule = [ERASED_BYTE; MAX_WRITE_SIZE];
        self.flash
            .read(self.offset, &mut granule[..F::READ_SIZE.max(1)])
            .map_err(flash_error)?;
        Ok(PowerIntent::from_stored_byte(granule[0]))
    }

    /// Erases the page and, for [`PowerIntent::On`], programs the on byte.
    ///
    /// Interrupts stay masked for the whole erase and program sequence.
    fn store(&mut self, intent: PowerIntent) -> Result<(), Self::Error> {
        critical_section::with(|_| self.erase_and_program(intent))
    }
}
