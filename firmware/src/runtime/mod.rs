use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::adc::{Adc, AdcChannel};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use pcu_core::driver::PowerSequencer;
use pcu_core::timing::{FIRMWARE_REVISION, SequencerTimings};

use crate::hw::{self, BoardInputs, PinOutputs, RailSense};
use crate::logging;
use crate::status;

mod sequencer_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA0,
        PA1,
        PA4,
        PA5,
        PA6,
        EXTI0,
        ADC1,
        FLASH,
        ..
    } = hal::init(config);

    // Outputs go low before anything else so the rail stays off during boot.
    let outputs = PinOutputs::new(
        Output::new(PA4, Level::Low, Speed::Low),
        Output::new(PA5, Level::Low, Speed::Low),
        Output::new(PA6, Level::Low, Speed::Low),
    );

    let store = hw::open_intent_store(FLASH).expect("intent page outside flash");
    let inputs = BoardInputs::new(
        ExtiInput::new(PA0, EXTI0, Pull::Up),
        RailSense::new(Adc::new(ADC1), PA1.degrade_adc()),
    );

    let (sequencer, boot_error) = PowerSequencer::boot(store, outputs, SequencerTimings::DEFAULT);
    let intent = sequencer.booted_intent().unwrap_or_default();
    status::record_intent(intent);
    logging::log_boot(FIRMWARE_REVISION, intent);
    if let Some(error) = boot_error {
        sequencer_task::record_error(0, &error);
    }

    spawner
        .spawn(sequencer_task::run(sequencer, inputs))
        .expect("failed to spawn sequencer task");

    core::future::pending::<()>().await;
}
