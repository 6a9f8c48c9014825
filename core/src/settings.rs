//! Persistent user settings and calibration.
use uom::si::electric_potential::volt;
use uom::si::electrical_resistance::ohm;
use uom::si::f32::{ElectricPotential, ElectricalResistance, Power};

use crate::bus::{BusError, ByteStore};
use crate::calibration::{
    ADC_MAX, CalibrationModel, CalibrationPoints, TemperatureUnit, clamp_set_raw,
};

/// The number of temperature presets.
pub const NUM_TEMP_PRESETS: usize = 4;

/// Factory preset temperatures in °C.
const DEFAULT_PRESETS_DEG_C: [i32; NUM_TEMP_PRESETS] = [300, 320, 350, 425];

/// Factory set temperature in °C.
const DEFAULT_SET_TEMPERATURE_DEG_C: i32 = 250;

/// Byte addresses of the persisted fields. 16 bit fields are stored big-endian.
pub mod layout {
    use super::NUM_TEMP_PRESETS;

    /// First calibration point (2 bytes).
    pub const CAL_LOW: u8 = 0;
    /// Second calibration point (2 bytes).
    pub const CAL_HIGH: u8 = 2;
    /// Temperature unit (1 byte).
    pub const TEMP_UNIT: u8 = 4;
    /// Last commanded raw set-point (2 bytes).
    pub const LAST_SET_TEMP: u8 = 5;
    /// Sense-while-off flag (1 byte).
    pub const SENSE_WHEN_OFF: u8 = 7;
    /// First temperature preset (2 bytes each).
    pub const TEMP_PRESETS: u8 = 8;
    /// Total size of the settings image.
    pub const SIZE: usize = TEMP_PRESETS as usize + 2 * NUM_TEMP_PRESETS;
}

/// The persisted part of the settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SettingsRecord {
    /// Temperature presets as raw set-points.
    pub temp_presets: [u16; NUM_TEMP_PRESETS],
    /// Calibration points.
    pub calibration: CalibrationPoints,
    /// The unit for showing and entering temperatures.
    pub temp_unit: TemperatureUnit,
    /// The last commanded raw set-point.
    pub last_set_temp: u16,
    /// If true, the heater is switched off while the sensor is sampled.
    pub sense_when_off: bool,
}

impl SettingsRecord {
    /// Serialize into the storage image.
    pub fn to_image(&self) -> [u8; layout::SIZE] {
        let mut image = [0u8; layout::SIZE];

        let mut put = |address: u8, value: u16| {
            let index = address as usize;
            image[index..index + 2].copy_from_slice(&value.to_be_bytes());
        };

        put(layout::CAL_LOW, self.calibration.low_deg_c);
        put(layout::CAL_HIGH, self.calibration.high_deg_c);
        put(layout::LAST_SET_TEMP, self.last_set_temp);
        for (index, preset) in self.temp_presets.iter().enumerate() {
            put(layout::TEMP_PRESETS + 2 * index as u8, *preset);
        }

        image[layout::TEMP_UNIT as usize] = self.temp_unit as u8;
        image[layout::SENSE_WHEN_OFF as usize] = self.sense_when_off as u8;
        image
    }

    /// Deserialize from the storage image.
    ///
    /// An unknown unit identifier (e.g. from an erased EEPROM) decodes as Celsius. Raw set-points
    /// are limited to the set-point range ([`clamp_set_raw`]).
    pub fn from_image(image: &[u8; layout::SIZE]) -> Self {
        let get = |address: u8| {
            let index = address as usize;
            u16::from_be_bytes([image[index], image[index + 1]])
        };

        let mut temp_presets = [0u16; NUM_TEMP_PRESETS];
        for (index, preset) in temp_presets.iter_mut().enumerate() {
            *preset = clamp_set_raw(get(layout::TEMP_PRESETS + 2 * index as u8).into());
        }

        Self {
            temp_presets,
            calibration: CalibrationPoints {
                low_deg_c: get(layout::CAL_LOW),
                high_deg_c: get(layout::CAL_HIGH),
            },
            temp_unit: TemperatureUnit::from_u8(image[layout::TEMP_UNIT as usize])
                .unwrap_or_default(),
            last_set_temp: clamp_set_raw(get(layout::LAST_SET_TEMP).into()),
            sense_when_off: image[layout::SENSE_WHEN_OFF as usize] != 0,
        }
    }
}

/// Electrical properties of the board. Not persisted.
#[derive(Debug, Clone, Copy)]
pub struct BoardConstants {
    /// The ADC reference voltage.
    pub reference: ElectricPotential,
    /// The resistance of the iron's heating element.
    pub heater_resistance: ElectricalResistance,
    /// Ratio of the supply voltage divider (ADC input / supply).
    pub supply_divider_ratio: f32,
}

impl BoardConstants {
    /// Constants of hardware revision A.
    pub fn revision_a() -> Self {
        Self {
            reference: ElectricPotential::new::<volt>(3.253),
            heater_resistance: ElectricalResistance::new::<ohm>(12.36),
            supply_divider_ratio: 0.0929735,
        }
    }

    /// The supply voltage for a raw supply sense reading.
    pub fn supply_potential(&self, raw: u16) -> ElectricPotential {
        self.reference * (raw as f32 / ADC_MAX as f32) / self.supply_divider_ratio
    }

    /// The average heater power at a given supply voltage and PWM ratio (0 to 1).
    pub fn heater_power(&self, supply: ElectricPotential, pwm_ratio: f32) -> Power {
        supply * supply * pwm_ratio / self.heater_resistance
    }
}

/// The settings store.
///
/// Owns the record and the calibration model derived from it.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// The persisted record.
    record: SettingsRecord,
    /// Model derived from `record.calibration`.
    model: CalibrationModel,
    /// Board constants.
    constants: BoardConstants,
}

impl Settings {
    /// Factory settings. Nothing is read from or written to storage.
    pub fn defaults() -> Self {
        let calibration = CalibrationPoints::DEFAULT;
        let model = CalibrationModel::from_points(calibration);

        Self {
            record: SettingsRecord {
                temp_presets: DEFAULT_PRESETS_DEG_C
                    .map(|t| model.temp_to_raw(t, TemperatureUnit::Celsius)),
                calibration,
                temp_unit: TemperatureUnit::Celsius,
                last_set_temp: model
                    .temp_to_raw(DEFAULT_SET_TEMPERATURE_DEG_C, TemperatureUnit::Celsius),
                sense_when_off: true,
            },
            model,
            constants: BoardConstants::revision_a(),
        }
    }

    /// Replace everything with factory settings.
    pub fn load_defaults(&mut self) {
        *self = Self::defaults();
    }

    /// Load the record from storage and recalibrate.
    ///
    /// On a bus error, the settings are left unchanged.
    pub async fn load(&mut self, store: &mut impl ByteStore) -> Result<(), BusError> {
        let mut image = [0u8; layout::SIZE];
        for (address, byte) in image.iter_mut().enumerate() {
            *byte = store.read(address as u8).await?;
        }

        self.record = SettingsRecord::from_image(&image);
        self.constants = BoardConstants::revision_a();
        self.recalibrate();
        Ok(())
    }

    /// Write the record to storage, field by field.
    ///
    /// Stops at the first bus error.
    pub async fn commit(&self, store: &mut impl ByteStore) -> Result<(), BusError> {
        for (address, byte) in self.record.to_image().iter().enumerate() {
            store.write(address as u8, *byte).await?;
        }

        Ok(())
    }

    /// Recompute the calibration model from the calibration points.
    pub fn recalibrate(&mut self) {
        self.model = CalibrationModel::from_points(self.record.calibration);
    }

    /// Set new calibration points and recalibrate.
    pub fn set_calibration(&mut self, points: CalibrationPoints) {
        self.record.calibration = points;
        self.recalibrate();
    }

    /// Change the active temperature unit.
    pub fn set_temp_unit(&mut self, unit: TemperatureUnit) {
        self.record.temp_unit = unit;
    }

    /// The active temperature unit.
    pub fn temp_unit(&self) -> TemperatureUnit {
        self.record.temp_unit
    }

    /// Convert a raw reading to a temperature in `unit`.
    pub fn raw_to_temp(&self, raw: u16, unit: TemperatureUnit) -> i32 {
        self.model.raw_to_temp(raw, unit)
    }

    /// Convert a temperature in `unit` to a raw set-point, limited to the valid range.
    pub fn temp_to_raw(&self, temperature: i32, unit: TemperatureUnit) -> u16 {
        self.model.temp_to_raw(temperature, unit)
    }

    /// Convert a temperature to a raw set-point.
    ///
    /// Returns the limited raw value, and the temperature it really stands for. That is `temperature`
    /// itself, unless limiting took place.
    pub fn resolve_set_point(&self, temperature: i32, unit: TemperatureUnit) -> (u16, i32) {
        let unclamped = self.model.temp_to_raw_unclamped(temperature, unit);
        let raw = clamp_set_raw(unclamped);

        if raw as i32 == unclamped {
            (raw, temperature)
        } else {
            (raw, self.model.raw_to_temp(raw, unit))
        }
    }

    /// The persisted record.
    pub fn record(&self) -> &SettingsRecord {
        &self.record
    }

    /// Mutable access to the persisted record.
    ///
    /// Changes to the calibration points require [`Settings::recalibrate`].
    pub fn record_mut(&mut self) -> &mut SettingsRecord {
        &mut self.record
    }

    /// The board constants.
    pub fn constants(&self) -> &BoardConstants {
        &self.constants
    }
}
