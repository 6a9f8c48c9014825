//! Rotary encoder and push switch state, shared between the input handlers and the control loop.
//!
//! Handlers only ever call the recording side ([`StepCounter::record`], [`SwitchState::press`],
//! [`SwitchState::release`]); the control loop only consumes ([`StepCounter::take`],
//! [`SwitchState::take_click`]). Every access runs in a short critical section.
use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// Control loop iterations without changes before a new set-point is persisted (about 6 s).
pub const SAVE_TIMEOUT_CYCLES: u16 = 180;

/// Control loop iterations of holding the switch that open the menu (about 2 s).
pub const LONG_PRESS_TIMEOUT_CYCLES: u16 = 50;

/// Debounce time between an encoder edge and sampling channel B, in µs.
pub const ENCODER_DEBOUNCE_US: u64 = 10;

/// Detects rising edges on encoder channel A.
#[derive(Debug, Default)]
pub struct QuadratureDecoder {
    /// The last observed level of channel A.
    a_was_high: bool,
}

impl QuadratureDecoder {
    /// Create a decoder that assumes channel A is low.
    pub const fn new() -> Self {
        Self { a_was_high: false }
    }

    /// Feed the current level of channel A. Returns true on a rising edge.
    ///
    /// After a rising edge, the handler samples channel B and records the step.
    pub fn detect(&mut self, a_high: bool) -> bool {
        let rising = a_high && !self.a_was_high;
        self.a_was_high = a_high;
        rising
    }
}

/// Accumulated encoder steps since the control loop last looked.
pub struct StepCounter {
    /// Signed step count.
    steps: Mutex<CriticalSectionRawMutex, Cell<i32>>,
}

impl StepCounter {
    /// Create an empty counter.
    pub const fn new() -> Self {
        Self {
            steps: Mutex::new(Cell::new(0)),
        }
    }

    /// Record one step, given channel B's level after a rising edge on channel A.
    ///
    /// Channel B high means clockwise rotation, which counts down.
    pub fn record(&self, b_high: bool) {
        let delta = if b_high { -1 } else { 1 };
        self.steps
            .lock(|steps| steps.set(steps.get().saturating_add(delta)));
    }

    /// Read and reset the counter in one critical section.
    pub fn take(&self) -> i32 {
        self.steps.lock(|steps| steps.replace(0))
    }
}

impl Default for StepCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Pending click and held level of the push switch.
#[derive(Debug, Clone, Copy, Default)]
struct SwitchFlags {
    /// A press happened that the control loop did not consume yet.
    clicked: bool,
    /// The switch is currently held down.
    held: bool,
}

/// The push switch.
pub struct SwitchState {
    /// Shared flags.
    flags: Mutex<CriticalSectionRawMutex, Cell<SwitchFlags>>,
}

impl SwitchState {
    /// Create a released switch.
    pub const fn new() -> Self {
        Self {
            flags: Mutex::new(Cell::new(SwitchFlags {
                clicked: false,
                held: false,
            })),
        }
    }

    /// The switch was pressed (falling edge).
    pub fn press(&self) {
        self.flags.lock(|flags| {
            flags.set(SwitchFlags {
                clicked: true,
                held: true,
            })
        });
    }

    /// The switch was released (rising edge).
    pub fn release(&self) {
        self.flags.lock(|flags| {
            let mut value = flags.get();
            value.held = false;
            flags.set(value);
        });
    }

    /// Consume a pending click.
    pub fn take_click(&self) -> bool {
        self.flags.lock(|flags| {
            let mut value = flags.get();
            let clicked = value.clicked;
            value.clicked = false;
            flags.set(value);
            clicked
        })
    }

    /// True while the switch is held down.
    pub fn is_held(&self) -> bool {
        self.flags.lock(|flags| flags.get().held)
    }
}

impl Default for SwitchState {
    fn default() -> Self {
        Self::new()
    }
}

/// All input state shared with the handlers.
#[derive(Default)]
pub struct InputChannel {
    /// Encoder steps.
    pub steps: StepCounter,
    /// The push switch.
    pub switch: SwitchState,
}

impl InputChannel {
    /// Create an idle channel, suitable for a `static`.
    pub const fn new() -> Self {
        Self {
            steps: StepCounter::new(),
            switch: SwitchState::new(),
        }
    }
}

/// A countdown that is decremented once per control loop iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Countdown {
    /// Remaining iterations. Zero when idle.
    remaining: u16,
}

impl Countdown {
    /// An idle countdown.
    pub const fn idle() -> Self {
        Self { remaining: 0 }
    }

    /// (Re)start with the given number of iterations.
    pub fn start(&mut self, cycles: u16) {
        self.remaining = cycles;
    }

    /// Stop without firing.
    pub fn cancel(&mut self) {
        self.remaining = 0;
    }

    /// True while counting down.
    pub fn is_running(&self) -> bool {
        self.remaining > 0
    }

    /// Advance by one iteration. Returns true exactly once, when reaching zero.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }

        self.remaining -= 1;
        self.remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed one full quadrature cycle. Channel B leads or lags channel A.
    fn turn(decoder: &mut QuadratureDecoder, counter: &StepCounter, clockwise: bool) {
        for (a, b) in [(false, clockwise), (true, clockwise), (true, !clockwise), (false, !clockwise)] {
            if decoder.detect(a) {
                counter.record(b);
            }
        }
    }

    #[test]
    fn clockwise_counts_down() {
        let mut decoder = QuadratureDecoder::new();
        let counter = StepCounter::new();

        for _ in 0..3 {
            turn(&mut decoder, &counter, true);
        }

        assert_eq!(counter.take(), -3);
    }

    #[test]
    fn counter_clockwise_counts_up() {
        let mut decoder = QuadratureDecoder::new();
        let counter = StepCounter::new();

        turn(&mut decoder, &counter, false);
        turn(&mut decoder, &counter, false);

        assert_eq!(counter.take(), 2);
    }

    #[test]
    fn take_resets() {
        let counter = StepCounter::new();

        counter.record(false);
        assert_eq!(counter.take(), 1);
        assert_eq!(counter.take(), 0);
        assert_eq!(counter.take(), 0);

        counter.record(true);
        counter.record(false);
        counter.record(true);
        assert_eq!(counter.take(), -1);
    }

    #[test]
    fn level_without_edge_is_ignored() {
        let mut decoder = QuadratureDecoder::new();

        assert!(decoder.detect(true));
        assert!(!decoder.detect(true));
        assert!(!decoder.detect(false));
        assert!(decoder.detect(true));
    }

    #[test]
    fn switch_click_and_hold() {
        let switch = SwitchState::new();
        assert!(!switch.take_click());

        switch.press();
        assert!(switch.is_held());
        assert!(switch.take_click());
        assert!(!switch.take_click());

        switch.release();
        assert!(!switch.is_held());
    }

    #[test]
    fn countdown_fires_once() {
        let mut countdown = Countdown::idle();
        assert!(!countdown.tick());

        countdown.start(3);
        assert!(!countdown.tick());
        assert!(!countdown.tick());
        assert!(countdown.tick());
        assert!(!countdown.is_running());
        assert!(!countdown.tick());

        countdown.start(2);
        countdown.cancel();
        assert!(!countdown.tick());
    }
}
