use embassy_time::{Duration, Ticker};
use pcu_core::driver::{DriveError, DriverError, PowerSequencer};
use pcu_core::sequencer::Transition;
use pcu_core::timing::TICK_PERIOD_MS;

use crate::hw::{BoardInputs, FlashIntentStore, PinOutputs};
use crate::logging;
use crate::status;

pub type BoardSequencer = PowerSequencer<FlashIntentStore<'static>, PinOutputs<'static>>;
type BoardError = DriverError<FlashIntentStore<'static>, PinOutputs<'static>>;

pub fn record_error(tick: u32, error: &BoardError) {
    match error {
        DriveError::Persist(_) => status::record_persist_failure(),
        DriveError::Output(_) => status::record_output_failure(),
    }
    logging::log_drive_error(tick, error);
}

#[embassy_executor::task]
pub async fn run(mut sequencer: BoardSequencer, mut inputs: BoardInputs<'static>) -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(TICK_PERIOD_MS));

    loop {
        ticker.next().await;

        let before = sequencer.mode();
        let result = sequencer.step(inputs.sample());
        let tick = sequencer.ticks();
        let after = sequencer.mode();

        if before != after {
            logging::log_transition(tick, Transition { from: before, to: after });
        }

        match result {
            Ok(report) => {
                if let Some(intent) = report.outcome.persist {
                    status::record_intent(intent);
                }
            }
            Err(error) => record_error(tick, &error),
        }

        status::record_step(after, tick);

        if sequencer.wants_sleep() {
            logging::log_low_power_entry(status::snapshot());
            inputs.wait_for_press().await;
            ticker.reset();
        }
    }
}
