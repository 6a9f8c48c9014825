//! Board setup and task startup.
use assign_resources::assign_resources;
use defmt::info;
use embassy_executor::Spawner;
use embassy_stm32::adc::{self, Adc, AdcChannel};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Input, Level, Output, OutputType, Pull, Speed};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::spi::{self, Spi};
use embassy_stm32::time::{Hertz, khz};
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_stm32::{Config, bind_interrupts, peripherals};

use crate::REVISION;
use crate::control::resources::{Heater, Sensors};
use crate::control::{ControlResources, SettingsBus, control_task};
use crate::ui::display::{Display, DisplayResources};
use crate::ui::encoder::{RotaryEncoderResources, rotary_encoder_task, switch_task};

use {defmt_rtt as _, panic_probe as _};

/// The heater PWM frequency.
const HEATER_PWM_FREQUENCY_KHZ: u32 = 20;

/// The EEPROM bus frequency.
const I2C_FREQUENCY_HZ: u32 = 100_000;

/// The display bus frequency.
const SPI_FREQUENCY_HZ: u32 = 8_000_000;

bind_interrupts!(struct Irqs {
    I2C1_EV => i2c::EventInterruptHandler<peripherals::I2C1>;
    I2C1_ER => i2c::ErrorInterruptHandler<peripherals::I2C1>;
});

assign_resources! {
    #[allow(missing_docs)]
    eeprom: EepromResources {
        i2c: I2C1,
        pin_scl: PA15,
        pin_sda: PB7,
        tx_dma: DMA1_CH1,
        rx_dma: DMA1_CH2,
    }
    #[allow(missing_docs)]
    sense: SenseResources {
        adc: ADC1,
        pin_iron: PA0,
        pin_supply: PA1,
        dma: DMA1_CH6,
    }
    #[allow(missing_docs)]
    heater: HeaterResources {
        timer: TIM1,
        pin_pwm: PA8,
    }
    #[allow(missing_docs)]
    display: DisplayPins {
        spi: SPI1,
        pin_sck: PA5,
        pin_mosi: PA7,
        tx_dma: DMA1_CH3,
        pin_cs: PA4,
        pin_dc: PB0,
        pin_reset: PB1,
    }
    #[allow(missing_docs)]
    encoder: EncoderResources {
        pin_a: PB4,
        exti_a: EXTI4,
        pin_b: PB5,
        pin_sw: PB3,
        exti_sw: EXTI3,
    }
}

/// Set up the settings EEPROM's bus.
fn init_i2c(r: EepromResources) -> SettingsBus {
    let mut config = i2c::Config::default();
    config.frequency = Hertz(I2C_FREQUENCY_HZ);

    I2c::new(
        r.i2c, r.pin_scl, r.pin_sda, Irqs, r.tx_dma, r.rx_dma, config,
    )
}

/// Set up the ADC and both sense inputs.
fn init_sensors(r: SenseResources) -> Sensors {
    let mut adc = Adc::new(r.adc);
    adc.set_resolution(adc::Resolution::BITS12);

    Sensors {
        adc,
        pin_iron: r.pin_iron.degrade_adc(),
        pin_supply: r.pin_supply.degrade_adc(),
        adc_dma: r.dma,
    }
}

/// Set up the heater PWM, with the output off.
fn init_heater(r: HeaterResources) -> Heater {
    let pin_pwm = PwmPin::new(r.pin_pwm, OutputType::PushPull);

    Heater {
        pwm: SimplePwm::new(
            r.timer,
            Some(pin_pwm),
            None,
            None,
            None,
            khz(HEATER_PWM_FREQUENCY_KHZ),
            CountingMode::EdgeAlignedUp,
        ),
    }
}

/// Set up the display's pins and bus.
fn display_resources(r: DisplayPins) -> DisplayResources {
    let mut config = spi::Config::default();
    config.frequency = Hertz(SPI_FREQUENCY_HZ);

    DisplayResources {
        spi: Spi::new_txonly(r.spi, r.pin_sck, r.pin_mosi, r.tx_dma, config),
        pin_cs: Output::new(r.pin_cs, Level::High, Speed::VeryHigh),
        pin_dc: Output::new(r.pin_dc, Level::Low, Speed::VeryHigh),
        pin_reset: Output::new(r.pin_reset, Level::High, Speed::Low),
    }
}

/// Start the soldering station.
///
/// Holding the switch during power-up opens the recovery screen.
#[embassy_executor::task]
pub async fn app(spawner: Spawner) {
    let p = embassy_stm32::init(Config::default());
    let r = split_resources!(p);

    info!(
        "Porta HW {} SW {} ({})",
        REVISION.hardware, REVISION.software, REVISION.build
    );

    let encoder = r.encoder;
    let pin_sw = ExtiInput::new(encoder.pin_sw, encoder.exti_sw, Pull::Up);
    let recovery = pin_sw.is_low();
    if recovery {
        info!("Switch held at power-up, offering recovery");
    }

    spawner.must_spawn(rotary_encoder_task(RotaryEncoderResources {
        pin_a: ExtiInput::new(encoder.pin_a, encoder.exti_a, Pull::Up),
        pin_b: Input::new(encoder.pin_b, Pull::Up),
    }));
    spawner.must_spawn(switch_task(pin_sw));

    let display = Display::new(display_resources(r.display)).await;

    spawner.must_spawn(control_task(
        ControlResources {
            i2c: init_i2c(r.eeprom),
            sensors: init_sensors(r.sense),
            heater: init_heater(r.heater),
            display,
        },
        recovery,
    ));
}
