//! Firmware of the Porta soldering station.
//!
//! Binds the hardware independent control core to the board: EEPROM on I2C, ADC sense inputs, heater
//! PWM, rotary encoder and the SSD1306 display.
#![no_std]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use porta_core::Revision;
use porta_core::input::InputChannel;

pub mod app;
pub mod control;
pub mod ui;

/// Revision information of this build.
pub const REVISION: Revision = Revision {
    hardware: 'A',
    software: env!("CARGO_PKG_VERSION"),
    build: env!("GIT_HASH"),
};

/// Encoder steps and switch state, written by the input tasks and consumed by the control loop.
pub static INPUT: InputChannel = InputChannel::new();
