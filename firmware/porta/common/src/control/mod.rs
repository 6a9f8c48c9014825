//! Runs the control loop on the board's peripherals.

pub mod resources;

use core::mem::discriminant;

use defmt::{debug, warn};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::mode::Async;
use embassy_time::{Delay, Duration, Ticker};
use porta_core::bus::BusDriver;
use porta_core::control::{Controller, Resources};
use porta_core::sensor::SensorPipeline;

use crate::ui::display::Display;
use crate::{INPUT, REVISION};
use resources::{Heater, Sensors};

/// The control loop period in ms (about 30 Hz).
const CONTROL_LOOP_PERIOD_MS: u64 = 33;

/// The I2C bus with the settings EEPROM.
pub type SettingsBus = I2c<'static, Async, i2c::mode::Master>;

/// Resources the control loop owns.
pub struct ControlResources {
    /// The I2C bus with the settings EEPROM.
    pub i2c: SettingsBus,
    /// The sense inputs.
    pub sensors: Sensors,
    /// The heater PWM.
    pub heater: Heater,
    /// The initialized display.
    pub display: Display,
}

/// Run the control loop.
///
/// Samples, regulates and redraws once per period. With `recovery`, starts on the recovery screen.
#[embassy_executor::task]
pub async fn control_task(control_resources: ControlResources, recovery: bool) {
    let ControlResources {
        i2c,
        sensors,
        mut heater,
        display,
    } = control_resources;

    heater.init();

    let mut controller = Controller::new(
        Resources {
            storage: BusDriver::new(i2c, Delay),
            sensors: SensorPipeline::new(sensors),
            heater,
            display,
            delay: Delay,
        },
        &INPUT,
        REVISION,
        recovery,
    );

    let mut ticker = Ticker::every(Duration::from_millis(CONTROL_LOOP_PERIOD_MS));
    let mut screen = *controller.screen();
    debug!("Start on screen {}", screen);

    loop {
        if let Err(error) = controller.iterate().await {
            warn!("Control loop error: {}", error);
        }

        if discriminant(controller.screen()) != discriminant(&screen) {
            screen = *controller.screen();
            debug!("Screen {}", screen);
        }

        ticker.next().await;
    }
}
