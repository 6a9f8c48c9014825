//! Handles user inputs by means of a rotary encoder with push switch.
use defmt::{debug, trace};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::Input;
use embassy_time::{Duration, Timer};
use porta_core::input::{ENCODER_DEBOUNCE_US, QuadratureDecoder};

use crate::INPUT;

/// The time the switch has to stay pressed to count as a press.
const SWITCH_DEBOUNCE: Duration = Duration::from_millis(25);

/// Resources for reading a rotary encoder.
pub struct RotaryEncoderResources {
    /// The pin for phase A, with edge detection.
    pub pin_a: ExtiInput<'static>,
    /// The pin for phase B.
    pub pin_b: Input<'static>,
}

/// Counts encoder steps.
///
/// Phase B is sampled shortly after each rising edge of phase A.
#[embassy_executor::task]
pub async fn rotary_encoder_task(mut resources: RotaryEncoderResources) {
    let mut decoder = QuadratureDecoder::new();
    decoder.detect(resources.pin_a.is_high());

    loop {
        resources.pin_a.wait_for_any_edge().await;

        if decoder.detect(resources.pin_a.is_high()) {
            Timer::after_micros(ENCODER_DEBOUNCE_US).await;

            let b_high = resources.pin_b.is_high();
            INPUT.steps.record(b_high);
            trace!("Encoder step (B {})", b_high);
        }
    }
}

/// Tracks the push switch (active low).
#[embassy_executor::task]
pub async fn switch_task(mut pin_sw: ExtiInput<'static>) {
    loop {
        pin_sw.wait_for_falling_edge().await;
        Timer::after(SWITCH_DEBOUNCE).await;

        if pin_sw.is_high() {
            // Bounce.
            continue;
        }

        INPUT.switch.press();
        debug!("Switch pressed");

        pin_sw.wait_for_high().await;
        Timer::after(SWITCH_DEBOUNCE).await;

        INPUT.switch.release();
        debug!("Switch released");
    }
}
