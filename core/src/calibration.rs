//! Conversion between raw sensor readings and temperatures.
//!
//! The iron's sensor is read in raw ADC units (10 bit). Two calibration points, the temperatures
//! measured in °C while the controller regulates to two fixed reference raw readings, define a
//! linear fit in both directions.

/// The largest raw reading. A sensor reading at or above this value means no iron is connected.
pub const ADC_MAX: u16 = 1023;

/// The reference raw reading of the low calibration point.
pub const CAL_LOW_REFERENCE_RAW: u16 = 565;

/// The reference raw reading of the high calibration point.
pub const CAL_HIGH_REFERENCE_RAW: u16 = 785;

/// The smallest raw set-point.
pub const MIN_SET_RAW: u16 = 490;

/// The largest raw set-point.
pub const MAX_SET_RAW: u16 = 1000;

/// The unit in which temperatures are shown and entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TemperatureUnit {
    /// Degrees Celsius.
    #[default]
    Celsius = 0,
    /// Degrees Fahrenheit.
    Fahrenheit = 1,
    /// Kelvin.
    Kelvin = 2,
}

impl TemperatureUnit {
    /// All units, in the order of their stored identifiers.
    pub const ALL: [Self; 3] = [Self::Celsius, Self::Fahrenheit, Self::Kelvin];

    /// Decode a stored unit identifier.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// The symbol that follows a temperature value on screen.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
            Self::Kelvin => "°K",
        }
    }

    /// Express a temperature in °C in this unit.
    pub fn from_celsius(self, temperature_deg_c: f32) -> f32 {
        match self {
            Self::Celsius => temperature_deg_c,
            Self::Fahrenheit => 1.8 * temperature_deg_c + 32.0,
            Self::Kelvin => temperature_deg_c + 273.15,
        }
    }

    /// Express a temperature in this unit in °C.
    pub fn to_celsius(self, temperature: f32) -> f32 {
        match self {
            Self::Celsius => temperature,
            Self::Fahrenheit => (temperature - 32.0) / 1.8,
            Self::Kelvin => temperature - 273.15,
        }
    }
}

/// The two measured calibration temperatures in °C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationPoints {
    /// Temperature measured at [`CAL_LOW_REFERENCE_RAW`].
    pub low_deg_c: u16,
    /// Temperature measured at [`CAL_HIGH_REFERENCE_RAW`].
    ///
    /// Expected to be larger than `low_deg_c`. This is not validated.
    pub high_deg_c: u16,
}

impl CalibrationPoints {
    /// Factory calibration.
    pub const DEFAULT: Self = Self {
        low_deg_c: 270,
        high_deg_c: 415,
    };
}

/// A straight line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinearFit {
    /// Slope of the line.
    pub slope: f32,
    /// Value at `x = 0`.
    pub intercept: f32,
}

impl LinearFit {
    /// Fit a line through two points.
    pub fn through(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        let slope = (y2 - y1) / (x2 - x1);

        Self {
            slope,
            intercept: y1 - slope * x1,
        }
    }

    /// Evaluate the line.
    pub fn apply(&self, x: f32) -> f32 {
        self.slope * x + self.intercept
    }
}

/// Linear fits between raw readings and °C, in both directions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationModel {
    /// Raw reading to °C.
    raw_to_deg_c: LinearFit,
    /// °C to raw reading.
    deg_c_to_raw: LinearFit,
}

impl CalibrationModel {
    /// Derive the model from calibration points.
    ///
    /// Equal points produce infinite slopes. Conversions then saturate instead of failing.
    pub fn from_points(points: CalibrationPoints) -> Self {
        let low_raw = CAL_LOW_REFERENCE_RAW as f32;
        let high_raw = CAL_HIGH_REFERENCE_RAW as f32;
        let low_deg_c = points.low_deg_c as f32;
        let high_deg_c = points.high_deg_c as f32;

        Self {
            raw_to_deg_c: LinearFit::through(low_raw, low_deg_c, high_raw, high_deg_c),
            deg_c_to_raw: LinearFit::through(low_deg_c, low_raw, high_deg_c, high_raw),
        }
    }

    /// Convert a raw reading to a temperature, truncated toward zero.
    pub fn raw_to_temp(&self, raw: u16, unit: TemperatureUnit) -> i32 {
        unit.from_celsius(self.raw_to_deg_c.apply(raw as f32)) as i32
    }

    /// Convert a temperature to a raw reading, truncated toward zero, without limiting it.
    pub fn temp_to_raw_unclamped(&self, temperature: i32, unit: TemperatureUnit) -> i32 {
        self.deg_c_to_raw.apply(unit.to_celsius(temperature as f32)) as i32
    }

    /// Convert a temperature to a raw set-point within [`MIN_SET_RAW`] and [`MAX_SET_RAW`].
    pub fn temp_to_raw(&self, temperature: i32, unit: TemperatureUnit) -> u16 {
        clamp_set_raw(self.temp_to_raw_unclamped(temperature, unit))
    }
}

/// Limit a raw set-point to its valid range.
pub fn clamp_set_raw(raw: i32) -> u16 {
    raw.clamp(MIN_SET_RAW as i32, MAX_SET_RAW as i32) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_factory_presets() {
        let model = CalibrationModel::from_points(CalibrationPoints::DEFAULT);

        assert_eq!(model.temp_to_raw(300, TemperatureUnit::Celsius), 610);
        assert_eq!(model.temp_to_raw(250, TemperatureUnit::Celsius), 534);
        assert_eq!(model.raw_to_temp(CAL_LOW_REFERENCE_RAW, TemperatureUnit::Celsius), 270);
        assert!(model.raw_to_temp(CAL_HIGH_REFERENCE_RAW, TemperatureUnit::Celsius) >= 414);
    }

    fn assert_round_trip(points: CalibrationPoints, unit: TemperatureUnit, range: core::ops::RangeInclusive<i32>) {
        let model = CalibrationModel::from_points(points);

        for temperature in range {
            let raw = model.temp_to_raw(temperature, unit);
            let back = model.raw_to_temp(raw, unit);
            assert!(
                (temperature - back).abs() <= 1,
                "{temperature} {unit:?} -> raw {raw} -> {back}"
            );
        }
    }

    #[test]
    fn round_trip_celsius() {
        assert_round_trip(CalibrationPoints::DEFAULT, TemperatureUnit::Celsius, 225..=555);
    }

    #[test]
    fn round_trip_kelvin() {
        assert_round_trip(CalibrationPoints::DEFAULT, TemperatureUnit::Kelvin, 500..=825);
    }

    #[test]
    fn round_trip_fahrenheit() {
        // One raw step must stay below one °F for exact round trips.
        let points = CalibrationPoints {
            low_deg_c: 270,
            high_deg_c: 360,
        };
        assert_round_trip(points, TemperatureUnit::Fahrenheit, 470..=830);
    }

    #[test]
    fn set_points_are_clamped() {
        let model = CalibrationModel::from_points(CalibrationPoints::DEFAULT);

        for unit in TemperatureUnit::ALL {
            for temperature in (-500..=2000).step_by(7) {
                let raw = model.temp_to_raw(temperature, unit);
                assert!((MIN_SET_RAW..=MAX_SET_RAW).contains(&raw));
            }
        }

        assert_eq!(model.temp_to_raw(0, TemperatureUnit::Celsius), MIN_SET_RAW);
        assert_eq!(model.temp_to_raw(900, TemperatureUnit::Celsius), MAX_SET_RAW);
    }

    #[test]
    fn unit_conversion() {
        assert_eq!(TemperatureUnit::Fahrenheit.from_celsius(100.0), 212.0);
        assert_eq!(TemperatureUnit::Kelvin.from_celsius(0.0), 273.15);
        assert_eq!(TemperatureUnit::from_u8(1), Some(TemperatureUnit::Fahrenheit));
        assert_eq!(TemperatureUnit::from_u8(3), None);
    }

    #[test]
    fn equal_points_do_not_panic() {
        let model = CalibrationModel::from_points(CalibrationPoints {
            low_deg_c: 300,
            high_deg_c: 300,
        });

        let raw = model.temp_to_raw(310, TemperatureUnit::Celsius);
        assert!((MIN_SET_RAW..=MAX_SET_RAW).contains(&raw));
    }
}
