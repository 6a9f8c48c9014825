//! Analog sense inputs and the heater PWM.

use defmt::trace;
use embassy_stm32::Peri;
use embassy_stm32::timer::simple_pwm::{SimplePwm, SimplePwmChannel};
use embassy_stm32::{adc, peripherals};
use porta_core::heater::DUTY_MAX;
use porta_core::sensor::{AnalogInputs, HeaterOutput, SensorSample};

/// ADC sample time for both sense inputs in cycles.
pub const ADC_SAMPLE_TIME: adc::SampleTime = adc::SampleTime::CYCLES92_5;

/// Bits dropped from a 12 bit conversion to arrive at the 10 bit raw domain.
const RESOLUTION_SHIFT: u16 = 2;

/// The type for the PWM heater channel.
type PwmHeaterChannel<'d> = SimplePwmChannel<'d, peripherals::TIM1>;

/// Sensors, resources for measurements.
pub struct Sensors {
    /// The ADC.
    pub adc: adc::Adc<'static, peripherals::ADC1>,
    /// The iron temperature sense input.
    pub pin_iron: adc::AnyAdcChannel<peripherals::ADC1>,
    /// The supply voltage sense input.
    pub pin_supply: adc::AnyAdcChannel<peripherals::ADC1>,
    /// The DMA for the ADC.
    pub adc_dma: Peri<'static, peripherals::DMA1_CH6>,
}

impl AnalogInputs for Sensors {
    async fn convert(&mut self) -> SensorSample {
        let mut adc_buffer = [0u16; 2];

        self.adc
            .read(
                self.adc_dma.reborrow(),
                [
                    (&mut self.pin_iron, ADC_SAMPLE_TIME),
                    (&mut self.pin_supply, ADC_SAMPLE_TIME),
                ]
                .into_iter(),
                &mut adc_buffer,
            )
            .await;

        trace!("Sense inputs, ADC values: {}", adc_buffer);

        SensorSample {
            iron: adc_buffer[0] >> RESOLUTION_SHIFT,
            supply: adc_buffer[1] >> RESOLUTION_SHIFT,
        }
    }
}

/// The PWM for driving the iron's heating element.
pub struct Heater {
    /// The timer in PWM mode. The heater is on channel 1.
    pub pwm: SimplePwm<'static, peripherals::TIM1>,
}

impl Heater {
    /// Get the PWM heater channel.
    fn channel(&mut self) -> PwmHeaterChannel<'_> {
        self.pwm.ch1()
    }

    /// Switch the output off and enable the channel.
    pub fn init(&mut self) {
        self.channel().set_duty_cycle_fully_off();
        self.channel().enable();
    }
}

impl HeaterOutput for Heater {
    fn set_duty(&mut self, duty: u16) {
        let max = self.channel().max_duty_cycle() as u32;
        let compare = duty.min(DUTY_MAX) as u32 * max / DUTY_MAX as u32;

        self.channel().set_duty_cycle(compare as u16);
    }
}
