//! The control loop: input, screens, sampling, heater control and rendering.
use embedded_hal_async::delay::DelayNs;
use uom::si::electric_potential::volt;
use uom::si::power::watt;

use crate::Revision;
use crate::bus::{BusError, ByteStore};
use crate::calibration::{
    CAL_HIGH_REFERENCE_RAW, CAL_LOW_REFERENCE_RAW, TemperatureUnit, clamp_set_raw,
};
use crate::display::{DisplaySink, Effect, draw_heater_bar, line};
use crate::heater;
use crate::input::{Countdown, InputChannel, LONG_PRESS_TIMEOUT_CYCLES, SAVE_TIMEOUT_CYCLES};
use crate::sensor::{AnalogInputs, HeaterOutput, SensorPipeline, SensorSample};
use crate::settings::{NUM_TEMP_PRESETS, Settings};
use crate::ui::menu::{MenuOutcome, MenuPage, MenuState};
use crate::ui::screen::{self, BANNER, BANNER_ROW, Screen};

/// Time the splash screen is shown, in ms.
const SPLASH_TIME_MS: u32 = 1000;

/// Time per column of the about screen animation, in ms.
const BANNER_COLUMN_TIME_MS: u32 = 18;

/// Actual temperatures below this are not shown as numbers.
const MIN_SHOWN_TEMPERATURE: i32 = 99;

/// Errors of a control loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Loading or storing settings failed.
    Storage(BusError),
}

impl From<BusError> for Error {
    fn from(value: BusError) -> Self {
        Self::Storage(value)
    }
}

/// How a new set-point is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetpointRequest {
    /// Print the new set-point.
    pub print: bool,
    /// The unit of the requested temperature. The active unit, if `None`.
    pub unit: Option<TemperatureUnit>,
    /// Apply even if the requested value equals the current one.
    pub force: bool,
}

/// The commanded set-point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Setpoint {
    /// Raw set-point for the heater controller.
    pub raw: u16,
    /// The set-point as shown to the user.
    pub temperature: i32,
    /// True if the last request changed the set-point.
    pub changed: bool,
}

/// Points captured by the calibration wizard.
#[derive(Debug, Clone, Copy, Default)]
struct Capture {
    /// Measured temperature at the low reference.
    low: Option<i32>,
    /// Measured temperature at the high reference.
    high: Option<i32>,
}

/// Peripherals used by the controller.
pub struct Resources<S, A, H, D, W> {
    /// Settings storage.
    pub storage: S,
    /// Analog inputs.
    pub sensors: SensorPipeline<A>,
    /// Heater PWM.
    pub heater: H,
    /// The display.
    pub display: D,
    /// Delays.
    pub delay: W,
}

/// Keep the first error.
fn keep_first(result: &mut Result<(), Error>, other: Result<(), Error>) {
    if result.is_ok() {
        *result = other;
    }
}

/// The control loop state.
pub struct Controller<'a, S, A, H, D, W> {
    /// Peripherals.
    resources: Resources<S, A, H, D, W>,
    /// Input shared with the handlers.
    input: &'a InputChannel,
    /// Revision information.
    revision: Revision,
    /// Settings store.
    settings: Settings,

    /// The active screen.
    screen: Screen,
    /// The active screen's entry actions are pending.
    needs_setup: bool,

    /// The commanded set-point.
    setpoint: Setpoint,
    /// The heater duty cycle.
    duty: u16,
    /// The latest sensor sample.
    sample: SensorSample,

    /// Persists a changed set-point after a while.
    save_timer: Countdown,
    /// Distinguishes a click from holding the switch.
    long_press: Countdown,
    /// The preset that was selected last by clicking.
    preset: Option<usize>,

    /// Calibration wizard captures.
    capture: Capture,
    /// The temperature the user reads on a reference thermometer, in the wizard.
    measured: i32,

    /// Settings are committed on the next entry of the main screen.
    save_pending: bool,
    /// Factory settings were loaded and need to be stored.
    defaults_loaded: bool,

    /// About screen animation state.
    banner: [u8; BANNER.len()],
}

impl<'a, S, A, H, D, W> Controller<'a, S, A, H, D, W>
where
    S: ByteStore,
    A: AnalogInputs,
    H: HeaterOutput,
    D: DisplaySink,
    W: DelayNs,
{
    /// Create a controller.
    ///
    /// With `recovery`, the recovery screen is shown first. Otherwise, the splash screen.
    pub fn new(
        resources: Resources<S, A, H, D, W>,
        input: &'a InputChannel,
        revision: Revision,
        recovery: bool,
    ) -> Self {
        let mut controller = Self {
            resources,
            input,
            revision,
            settings: Settings::defaults(),
            screen: if recovery {
                Screen::Recovery
            } else {
                Screen::Splash
            },
            needs_setup: true,
            setpoint: Setpoint::default(),
            duty: 0,
            sample: SensorSample::default(),
            save_timer: Countdown::idle(),
            long_press: Countdown::idle(),
            preset: None,
            capture: Capture::default(),
            measured: 0,
            save_pending: false,
            defaults_loaded: false,
            banner: BANNER,
        };

        controller.resources.heater.set_duty(0);
        controller
    }

    /// The active screen.
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// The settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The commanded set-point.
    pub fn setpoint(&self) -> &Setpoint {
        &self.setpoint
    }

    /// The heater duty cycle.
    pub fn duty(&self) -> u16 {
        self.duty
    }

    /// The latest sensor sample.
    pub fn sample(&self) -> &SensorSample {
        &self.sample
    }

    /// True while entry actions of the active screen are pending.
    pub fn needs_setup(&self) -> bool {
        self.needs_setup
    }

    /// The peripherals.
    pub fn resources(&self) -> &Resources<S, A, H, D, W> {
        &self.resources
    }

    /// Mutable access to the peripherals.
    pub fn resources_mut(&mut self) -> &mut Resources<S, A, H, D, W> {
        &mut self.resources
    }

    /// Switch to another screen.
    ///
    /// The heater is switched off and the display is cleared. Entry actions run on the next iteration.
    pub fn change_screen(&mut self, screen: Screen) {
        self.duty = 0;
        self.resources.heater.set_duty(0);
        self.resources.display.clear();
        self.long_press.cancel();

        self.screen = screen;
        self.needs_setup = true;
    }

    /// Run one control loop iteration.
    ///
    /// Storage errors do not interrupt the iteration. The first one is returned at the end.
    pub async fn iterate(&mut self) -> Result<(), Error> {
        let mut result = Ok(());

        if self.needs_setup {
            self.needs_setup = false;
            keep_first(&mut result, self.setup().await);

            // Steps during entry actions are discarded.
            self.input.steps.take();
        }

        let steps = self.input.steps.take();

        if self.input.switch.take_click() {
            self.click();
        }

        // A click may have changed the screen, whose entry actions come first.
        if !self.needs_setup {
            keep_first(&mut result, self.run(steps).await);
        }

        self.resources.display.flush().await;
        result
    }

    /// Entry actions of the active screen.
    async fn setup(&mut self) -> Result<(), Error> {
        let mut result = Ok(());

        match self.screen {
            Screen::Recovery => screen::draw_recovery(&mut self.resources.display),
            Screen::Splash => {
                screen::draw_splash(&mut self.resources.display, &self.revision);

                if self.defaults_loaded {
                    self.defaults_loaded = false;
                    keep_first(&mut result, self.commit().await);
                    screen::draw_defaults_loaded(&mut self.resources.display);
                }

                // On failure, the settings in memory stay in effect.
                keep_first(
                    &mut result,
                    self.settings
                        .load(&mut self.resources.storage)
                        .await
                        .map_err(Error::from),
                );

                self.resources.display.flush().await;
                self.resources.delay.delay_ms(SPLASH_TIME_MS).await;
            }
            Screen::Main => {
                if self.save_pending {
                    self.save_pending = false;
                    keep_first(&mut result, self.commit().await);
                }

                let unit = self.settings.temp_unit();
                let last = self.settings.record().last_set_temp;
                let temperature = self.settings.raw_to_temp(last.saturating_add(1), unit);

                self.set_temperature(
                    temperature,
                    SetpointRequest {
                        print: true,
                        unit: Some(unit),
                        force: true,
                    },
                );
                self.save_timer.cancel();
            }
            Screen::Menu(mut menu) => {
                menu.enter(MenuPage::Main, &self.settings, &mut self.resources.display);
                self.screen = Screen::Menu(menu);
            }
            Screen::Calibration => {
                screen::draw_calibration_title(&mut self.resources.display);
                self.set_raw_temperature(
                    self.calibration_target(),
                    SetpointRequest {
                        print: false,
                        unit: Some(TemperatureUnit::Celsius),
                        force: true,
                    },
                );
                self.draw_calibration_setpoint();
            }
            Screen::ConfirmCalibration => {
                screen::draw_confirm_calibration(
                    &mut self.resources.display,
                    self.capture.low.unwrap_or_default(),
                    self.capture.high.unwrap_or_default(),
                );
            }
            Screen::About => {
                self.banner = BANNER;
                screen::draw_about(&mut self.resources.display, &self.revision);
            }
        }

        result
    }

    /// React to a switch click.
    fn click(&mut self) {
        match self.screen {
            Screen::Recovery => {
                self.settings.load_defaults();
                self.defaults_loaded = true;
                self.change_screen(Screen::Splash);
            }
            Screen::Main => self.long_press.start(LONG_PRESS_TIMEOUT_CYCLES),
            Screen::Menu(mut menu) => {
                let outcome = menu.activate(&mut self.settings, &mut self.resources.display);
                self.screen = Screen::Menu(menu);

                match outcome {
                    MenuOutcome::Stay => {}
                    MenuOutcome::About => self.change_screen(Screen::About),
                    MenuOutcome::CalibrationWizard => self.change_screen(Screen::Calibration),
                    MenuOutcome::SaveAndExit => {
                        self.save_pending = true;
                        self.change_screen(Screen::Main);
                    }
                }
            }
            Screen::Calibration => {
                if self.capture.low.is_none() {
                    self.capture.low = Some(self.measured);
                } else {
                    self.capture.high = Some(self.measured);
                    self.change_screen(Screen::ConfirmCalibration);
                }
            }
            Screen::ConfirmCalibration => {
                let mut points = self.settings.record().calibration;
                points.low_deg_c = calibration_value(self.capture.low);
                points.high_deg_c = calibration_value(self.capture.high);
                self.settings.set_calibration(points);

                self.capture = Capture::default();
                self.save_pending = true;
                self.change_screen(Screen::Main);
            }
            Screen::About => self.change_screen(Screen::Menu(MenuState::new())),
            Screen::Splash => {}
        }
    }

    /// Per-iteration work of the active screen.
    async fn run(&mut self, steps: i32) -> Result<(), Error> {
        match self.screen {
            Screen::Splash => {
                self.change_screen(Screen::Main);
                Ok(())
            }
            Screen::Main => self.run_main(steps).await,
            Screen::Menu(mut menu) => {
                if steps != 0 {
                    if menu.is_editing() {
                        menu.edit(steps, &mut self.settings, &mut self.resources.display);
                    } else {
                        menu.navigate(steps, &self.settings, &mut self.resources.display);
                    }
                    self.screen = Screen::Menu(menu);
                }
                Ok(())
            }
            Screen::Calibration => {
                self.run_calibration(steps).await;
                Ok(())
            }
            Screen::About => {
                self.animate_banner().await;
                Ok(())
            }
            Screen::ConfirmCalibration | Screen::Recovery => Ok(()),
        }
    }

    /// Temperature control with set-point adjustment.
    async fn run_main(&mut self, steps: i32) -> Result<(), Error> {
        let mut result = Ok(());

        self.set_temperature(
            self.setpoint.temperature + steps,
            SetpointRequest {
                print: true,
                ..Default::default()
            },
        );

        if self.save_timer.tick() {
            self.settings.record_mut().last_set_temp = self.setpoint.raw;
            keep_first(&mut result, self.commit().await);
        }

        if self.long_press.is_running() {
            if self.long_press.tick() {
                self.settings.record_mut().last_set_temp = self.setpoint.raw;
                self.change_screen(Screen::Menu(MenuState::new()));
                return result;
            } else if !self.input.switch.is_held() {
                self.long_press.cancel();

                let preset = match self.preset {
                    Some(index) if index + 1 < NUM_TEMP_PRESETS => index + 1,
                    _ => 0,
                };
                self.preset = Some(preset);

                self.set_raw_temperature(
                    self.settings.record().temp_presets[preset],
                    SetpointRequest {
                        print: true,
                        ..Default::default()
                    },
                );
            }
        }

        self.control_heater().await;
        self.draw_info_panel();
        self.draw_actual_temperature();
        draw_heater_bar(&mut self.resources.display, self.duty);

        result
    }

    /// The calibration wizard: regulate to a reference reading and let the user enter the
    /// temperature measured externally.
    async fn run_calibration(&mut self, steps: i32) {
        self.set_raw_temperature(
            self.calibration_target(),
            SetpointRequest {
                print: false,
                unit: Some(TemperatureUnit::Celsius),
                force: false,
            },
        );

        self.control_heater().await;

        if self.setpoint.changed {
            self.draw_calibration_setpoint();
        }

        let display = &mut self.resources.display;
        let text = line(format_args!("Sense:    {} ", self.sample.iron));
        display.print_at(0, 2, &text, Effect::Normal);

        self.measured += steps;
        let text = line(format_args!(
            "Meas.:   {}  {}",
            self.measured,
            TemperatureUnit::Celsius.symbol()
        ));
        display.print_at(0, 4, &text, Effect::Normal);

        draw_heater_bar(display, self.duty);
    }

    /// Show the wizard's reference reading. The measured temperature starts at the model's value.
    fn draw_calibration_setpoint(&mut self) {
        let text = line(format_args!("Setpoint: {}  ", self.setpoint.raw));
        self.resources
            .display
            .print_at(0, 1, &text, Effect::Normal);
        self.measured = self.setpoint.temperature;
    }

    /// One pass of the about screen's inverting banner.
    async fn animate_banner(&mut self) {
        for (column, pattern) in self.banner.iter_mut().enumerate() {
            *pattern = !*pattern;

            let display = &mut self.resources.display;
            display.set_cursor(column as u8, BANNER_ROW);
            display.draw_byte(*pattern);
            display.flush().await;

            self.resources.delay.delay_ms(BANNER_COLUMN_TIME_MS).await;
        }
    }

    /// The reference reading the wizard regulates to.
    fn calibration_target(&self) -> u16 {
        if self.capture.low.is_none() {
            CAL_LOW_REFERENCE_RAW
        } else {
            CAL_HIGH_REFERENCE_RAW
        }
    }

    /// Sample the sensors and update the heater duty cycle.
    async fn control_heater(&mut self) {
        let resources = &mut self.resources;

        self.sample = resources
            .sensors
            .sample(
                &mut resources.heater,
                &mut resources.delay,
                self.duty,
                self.settings.record().sense_when_off,
            )
            .await;

        self.duty = heater::step(self.setpoint.raw, self.sample.iron, self.duty);
        resources.heater.set_duty(self.duty);
    }

    /// Heater power and supply voltage in the top row.
    fn draw_info_panel(&mut self) {
        let constants = self.settings.constants();
        let supply = constants.supply_potential(self.sample.supply);
        let power = constants.heater_power(supply, heater::duty_ratio(self.duty));

        let (power_int, power_dec) = split_decimal(power.get::<watt>());
        let (supply_int, supply_dec) = split_decimal(supply.get::<volt>());

        let text = line(format_args!(
            "{:02}.{}W    {:02}.{}V",
            power_int, power_dec, supply_int, supply_dec
        ));
        self.resources
            .display
            .print_at(0, 0, &text, Effect::Normal);
    }

    /// The measured iron temperature in row 3.
    fn draw_actual_temperature(&mut self) {
        let display = &mut self.resources.display;

        if self.sample.is_disconnected() {
            display.print_at(0, 3, " Disconnected ", Effect::Inverted);
            return;
        }

        let unit = self.settings.temp_unit();
        let temperature = self.settings.raw_to_temp(self.sample.iron, unit);

        let text = if temperature < MIN_SHOWN_TEMPERATURE {
            line(format_args!("Actual:  <{}{} ", MIN_SHOWN_TEMPERATURE, unit.symbol()))
        } else {
            line(format_args!("Actual:  {}{} ", temperature, unit.symbol()))
        };
        display.print_at(0, 3, &text, Effect::Normal);
    }

    /// Apply a set-point given as temperature.
    ///
    /// Out-of-range values are limited, and the shown temperature follows the limited raw value.
    /// Nothing happens if the temperature did not change, unless forced.
    pub fn set_temperature(&mut self, temperature: i32, request: SetpointRequest) {
        if temperature == self.setpoint.temperature && !request.force {
            self.setpoint.changed = false;
            return;
        }

        let unit = request.unit.unwrap_or(self.settings.temp_unit());
        let (raw, temperature) = self.settings.resolve_set_point(temperature, unit);

        self.setpoint = Setpoint {
            raw,
            temperature,
            changed: true,
        };

        if request.print {
            self.draw_setpoint(unit);
        }

        self.save_timer.start(SAVE_TIMEOUT_CYCLES);
    }

    /// Apply a set-point given as raw value.
    ///
    /// The value is limited to the valid set-point range. Only on the main screen, the change is
    /// persisted after a while.
    pub fn set_raw_temperature(&mut self, raw: u16, request: SetpointRequest) {
        let raw = clamp_set_raw(raw.into());
        if raw == self.setpoint.raw && !request.force {
            self.setpoint.changed = false;
            return;
        }

        let unit = request.unit.unwrap_or(self.settings.temp_unit());
        self.setpoint = Setpoint {
            raw,
            temperature: self.settings.raw_to_temp(raw, unit),
            changed: true,
        };

        if request.print {
            self.draw_setpoint(unit);
        }

        if self.screen == Screen::Main {
            self.save_timer.start(SAVE_TIMEOUT_CYCLES);
        }
    }

    /// The set-point in row 2.
    fn draw_setpoint(&mut self, unit: TemperatureUnit) {
        let text = line(format_args!(
            "Set:     {}{} ",
            self.setpoint.temperature,
            unit.symbol()
        ));
        self.resources
            .display
            .print_at(0, 2, &text, Effect::Normal);
    }

    /// Store the settings.
    async fn commit(&mut self) -> Result<(), Error> {
        self.settings.commit(&mut self.resources.storage).await?;
        Ok(())
    }
}

/// Convert a captured temperature to a stored calibration point.
fn calibration_value(capture: Option<i32>) -> u16 {
    capture.unwrap_or_default().clamp(0, crate::calibration::ADC_MAX as i32) as u16
}

/// Split a value into its integer part (0 to 99) and first decimal.
fn split_decimal(value: f32) -> (u8, u8) {
    let value = value.clamp(0.0, 99.9);
    let tenths = (value * 10.0) as u32;
    ((tenths / 10) as u8, (tenths % 10) as u8)
}
