//! Intent storage in the last page of on-chip flash.

use embassy_stm32::flash::{Blocking, FLASH_SIZE, Flash};
use embassy_stm32::peripherals::FLASH;
use embassy_stm32::Peri;
use embedded_storage::nor_flash::NorFlash;
use pcu_core::persistence::{IntentStoreError, NorFlashIntentStore};

pub type FlashIntentStore<'d> = NorFlashIntentStore<Flash<'d, Blocking>>;

/// Offset of the page reserved for the power intent.
#[allow(clippy::cast_possible_truncation)]
pub const INTENT_PAGE_OFFSET: u32 =
    (FLASH_SIZE - <Flash<'static, Blocking> as NorFlash>::ERASE_SIZE) as u32;

/// Opens the intent store on the reserved page.
///
/// # Errors
///
/// Returns [`IntentStoreError`] when the page does not fit the flash geometry.
pub fn open_intent_store(flash: Peri<'_, FLASH>) -> Result<FlashIntentStore<'_>, IntentStoreError> {
    NorFlashIntentStore::new(Flash::new_blocking(flash), INTENT_PAGE_OFFSET)
}
