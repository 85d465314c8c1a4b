//! Board bindings for the PCU on the STM32G0.
//!
//! Pin map:
//!
//! | Signal            | Pin  | Notes                               |
//! |-------------------|------|-------------------------------------|
//! | Button            | PA0  | EXTI0, pull-up, active low          |
//! | Rail sense        | PA1  | ADC1, divided rail voltage          |
//! | Rail enable       | PA4  | push-pull, high enables the rail    |
//! | Wake pulse        | PA5  | push-pull, high while pulsing       |
//! | Shutdown pulse    | PA6  | push-pull, high while pulsing       |

pub mod flash;
pub mod outputs;
pub mod rail_sense;

use embassy_stm32::exti::ExtiInput;
use pcu_core::sequencer::Inputs;

pub use flash::{FlashIntentStore, open_intent_store};
pub use outputs::PinOutputs;
pub use rail_sense::RailSense;

/// Input side of the board: the button line and the rail sense channel.
pub struct BoardInputs<'d> {
    button: ExtiInput<'d>,
    rail: RailSense<'d>,
}

impl<'d> BoardInputs<'d> {
    pub fn new(button: ExtiInput<'d>, rail: RailSense<'d>) -> Self {
        Self { button, rail }
    }

    /// Samples both inputs for one tick.
    pub fn sample(&mut self) -> Inputs {
        Inputs::new(self.button.is_low(), self.rail.is_present())
    }

    /// Resolves on the next button press.
    pub async fn wait_for_press(&mut self) {
        self.button.wait_for_falling_edge().await;
    }
}
