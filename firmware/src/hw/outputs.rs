use core::convert::Infallible;

use embassy_stm32::gpio::Output;
use pcu_core::driver::PowerOutputs;

/// Push-pull outputs for the rail enable and the two pulse lines.
pub struct PinOutputs<'d> {
    power_rail: Output<'d>,
    wake_pulse: Output<'d>,
    shutdown_pulse: Output<'d>,
}

impl<'d> PinOutputs<'d> {
    pub fn new(power_rail: Output<'d>, wake_pulse: Output<'d>, shutdown_pulse: Output<'d>) -> Self {
        Self {
            power_rail,
            wake_pulse,
            shutdown_pulse,
        }
    }
}

fn drive(output: &mut Output<'_>, high: bool) {
    if high {
        output.set_high();
    } else {
        output.set_low();
    }
}

impl PowerOutputs for PinOutputs<'_> {
    type Error = Infallible;

    fn set_power_rail(&mut self, enabled: bool) -> Result<(), Self::Error> {
        drive(&mut self.power_rail, enabled);
        Ok(())
    }

    fn set_wake_pulse(&mut self, asserted: bool) -> Result<(), Self::Error> {
        drive(&mut self.wake_pulse, asserted);
        Ok(())
    }

    fn set_shutdown_pulse(&mut self, asserted: bool) -> Result<(), Self::Error> {
        drive(&mut self.shutdown_pulse, asserted);
        Ok(())
    }
}
