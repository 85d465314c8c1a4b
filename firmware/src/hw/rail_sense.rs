//! Rail presence detection on ADC1.
//!
//! The divided rail is sampled with a 12-bit conversion and compared against
//! the presence threshold rescaled from its 10-bit calibration.

use embassy_stm32::adc::{Adc, AnyAdcChannel, SampleTime};
use embassy_stm32::peripherals::ADC1;
use pcu_core::rail::RailThreshold;

/// Resolution the ADC runs at.
pub const ADC_BITS: u8 = 12;

/// Embassy ADC wrapper that classifies the rail sense channel.
pub struct RailSense<'d> {
    adc: Adc<'d, ADC1>,
    channel: AnyAdcChannel<ADC1>,
    threshold: RailThreshold,
}

impl<'d> RailSense<'d> {
    pub fn new(mut adc: Adc<'d, ADC1>, channel: AnyAdcChannel<ADC1>) -> Self {
        adc.set_sample_time(SampleTime::CYCLES160_5);
        Self {
            adc,
            channel,
            threshold: RailThreshold::ORIGINAL_10_BIT.rescale(ADC_BITS),
        }
    }

    /// Performs one blocking conversion of the rail sense channel.
    pub fn read(&mut self) -> u16 {
        self.adc.blocking_read(&mut self.channel)
    }

    pub fn is_present(&mut self) -> bool {
        let reading = self.read();
        self.threshold.is_present(reading)
    }
}
