//! Control core of the Porta soldering station.
//!
//! Everything in here is hardware independent. Peripherals are reached through small port traits
//! ([`bus::ByteStore`], [`sensor::AnalogInputs`], [`sensor::HeaterOutput`], [`display::DisplaySink`])
//! that the firmware implements for its board.
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

pub mod bus;
pub mod calibration;
pub mod control;
pub mod display;
pub mod heater;
pub mod input;
pub mod sensor;
pub mod settings;
pub mod ui;

/// Hardware and software revision of the device, shown on the about screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Revision {
    /// The hardware revision letter.
    pub hardware: char,
    /// The software version.
    pub software: &'static str,
    /// The build identifier (short commit hash).
    pub build: &'static str,
}
