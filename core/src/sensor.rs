//! Averaged sampling of the iron temperature and supply voltage sense inputs.
use embedded_hal_async::delay::DelayNs;

use crate::calibration::ADC_MAX;

/// The number of conversions that are averaged per sample.
pub const AVERAGE_COUNT: u32 = 10;

/// Settle time before each conversion in µs.
pub const SETTLE_TIME_US: u32 = 100;

/// One pair of raw readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSample {
    /// The iron temperature sensor.
    pub iron: u16,
    /// The supply voltage sense input.
    pub supply: u16,
}

impl SensorSample {
    /// True, if the reading indicates that no iron is connected.
    pub fn is_disconnected(&self) -> bool {
        self.iron >= ADC_MAX
    }
}

/// Analog inputs of the board.
#[allow(async_fn_in_trait)]
pub trait AnalogInputs {
    /// Convert both channels once. Readings are in the 10 bit raw domain.
    async fn convert(&mut self) -> SensorSample;
}

/// The heater's PWM output.
pub trait HeaterOutput {
    /// Set the PWM duty cycle (0 to [`crate::heater::DUTY_MAX`]).
    fn set_duty(&mut self, duty: u16);
}

/// Takes averaged samples from the analog inputs.
pub struct SensorPipeline<A> {
    /// The analog inputs.
    inputs: A,
}

impl<A: AnalogInputs> SensorPipeline<A> {
    /// Create a new pipeline.
    pub fn new(inputs: A) -> Self {
        Self { inputs }
    }

    /// Take an averaged sample.
    ///
    /// With `sense_when_off`, the heater output is switched off during sampling and restored to
    /// `duty` afterwards.
    pub async fn sample(
        &mut self,
        heater: &mut impl HeaterOutput,
        delay: &mut impl DelayNs,
        duty: u16,
        sense_when_off: bool,
    ) -> SensorSample {
        if sense_when_off {
            heater.set_duty(0);
        }

        let mut iron_sum = 0u32;
        let mut supply_sum = 0u32;

        for _ in 0..AVERAGE_COUNT {
            delay.delay_us(SETTLE_TIME_US).await;

            let conversion = self.inputs.convert().await;
            iron_sum += conversion.iron as u32;
            supply_sum += conversion.supply as u32;
        }

        if sense_when_off {
            heater.set_duty(duty);
        }

        SensorSample {
            iron: (iron_sum / AVERAGE_COUNT) as u16,
            supply: (supply_sum / AVERAGE_COUNT) as u16,
        }
    }

    /// Access the analog inputs.
    pub fn inputs_mut(&mut self) -> &mut A {
        &mut self.inputs
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bus::tests::FakeDelay;
    use embassy_futures::block_on;
    use std::vec::Vec;

    /// Returns readings from a list, repeating the last one.
    pub struct FakeInputs {
        pub readings: Vec<SensorSample>,
        pub conversions: usize,
    }

    impl FakeInputs {
        pub fn constant(iron: u16, supply: u16) -> Self {
            Self {
                readings: std::vec![SensorSample { iron, supply }],
                conversions: 0,
            }
        }
    }

    impl AnalogInputs for FakeInputs {
        async fn convert(&mut self) -> SensorSample {
            let index = self.conversions.min(self.readings.len() - 1);
            self.conversions += 1;
            self.readings[index]
        }
    }

    /// Records every duty cycle that was written.
    #[derive(Default)]
    pub struct FakeHeater {
        pub history: Vec<u16>,
    }

    impl FakeHeater {
        pub fn duty(&self) -> u16 {
            self.history.last().copied().unwrap_or(0)
        }
    }

    impl HeaterOutput for FakeHeater {
        fn set_duty(&mut self, duty: u16) {
            self.history.push(duty);
        }
    }

    #[test]
    fn averages_and_truncates() {
        let mut pipeline = SensorPipeline::new(FakeInputs {
            readings: (0..10)
                .map(|i| SensorSample {
                    iron: 600 + i,
                    supply: 400,
                })
                .collect(),
            conversions: 0,
        });
        let mut heater = FakeHeater::default();
        let mut delay = FakeDelay::default();

        let sample = block_on(pipeline.sample(&mut heater, &mut delay, 0, false));

        // (600 + ... + 609) / 10 = 604.5
        assert_eq!(sample, SensorSample { iron: 604, supply: 400 });
        assert_eq!(pipeline.inputs_mut().conversions, 10);
        assert_eq!(delay.total_ns, 10 * 100_000);
        assert!(heater.history.is_empty());
    }

    #[test]
    fn heater_is_off_while_sensing() {
        let mut pipeline = SensorPipeline::new(FakeInputs::constant(700, 500));
        let mut heater = FakeHeater::default();
        let mut delay = FakeDelay::default();

        block_on(pipeline.sample(&mut heater, &mut delay, 250, true));

        assert_eq!(heater.history, [0, 250]);
    }

    #[test]
    fn full_scale_sums_do_not_overflow() {
        let mut pipeline = SensorPipeline::new(FakeInputs::constant(1023, 1023));
        let sample = block_on(pipeline.sample(
            &mut FakeHeater::default(),
            &mut FakeDelay::default(),
            0,
            true,
        ));

        assert!(sample.is_disconnected());
        assert_eq!(sample.supply, 1023);
    }
}
