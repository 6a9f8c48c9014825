//! Closed-loop heater control.
//!
//! An asymmetric incremental controller: below the set-point the duty cycle rises in small steps,
//! at or above it the duty cycle falls in large steps.

/// The PWM period, and the largest duty cycle.
pub const DUTY_MAX: u16 = 500;

/// Duty increment while the iron is too cold.
pub const STEP_UP: u16 = 10;

/// Duty decrement once the iron reached its set-point.
pub const STEP_DOWN: u16 = 100;

/// Compute the next duty cycle.
pub fn step(setpoint_raw: u16, actual_raw: u16, duty: u16) -> u16 {
    if actual_raw < setpoint_raw {
        duty.saturating_add(STEP_UP).min(DUTY_MAX)
    } else {
        duty.saturating_sub(STEP_DOWN)
    }
}

/// The duty cycle as a ratio from 0 to 1.
pub fn duty_ratio(duty: u16) -> f32 {
    duty.min(DUTY_MAX) as f32 / DUTY_MAX as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heats_up_to_maximum() {
        let mut duty = 0;
        for _ in 0..100 {
            duty = step(700, 600, duty);
            assert!(duty <= DUTY_MAX);
        }
        assert_eq!(duty, DUTY_MAX);
    }

    #[test]
    fn cools_down_to_zero() {
        assert_eq!(step(600, 600, 500), 400);
        assert_eq!(step(600, 650, 50), 0);
        assert_eq!(step(600, 650, 0), 0);
    }

    #[test]
    fn monotonic_in_actual_reading() {
        for duty in (0..=DUTY_MAX).step_by(5) {
            let mut previous = u16::MAX;
            for actual in 0..=1023 {
                let next = step(600, actual, duty);
                assert!(next <= previous);
                assert!(next <= DUTY_MAX);
                previous = next;
            }
        }
    }

    #[test]
    fn ratio() {
        assert_eq!(duty_ratio(250), 0.5);
        assert_eq!(duty_ratio(DUTY_MAX), 1.0);
    }
}
