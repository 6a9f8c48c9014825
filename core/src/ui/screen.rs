//! Full-screen views and their static content.
use crate::Revision;
use crate::calibration::{CAL_HIGH_REFERENCE_RAW, CAL_LOW_REFERENCE_RAW};
use crate::display::{DisplaySink, Effect, WIDTH, line};
use crate::ui::menu::MenuState;

/// The active screen. The menu state only exists while the menu is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Screen {
    /// Boot screen. Loads the settings.
    Splash,
    /// Temperature control.
    Main,
    /// The settings menu.
    Menu(MenuState),
    /// The calibration wizard.
    Calibration,
    /// Confirmation of newly captured calibration points.
    ConfirmCalibration,
    /// Offered at boot, when the switch is held: reset all settings.
    Recovery,
    /// Revision information.
    About,
}

/// The text row of the about screen's banner.
pub const BANNER_ROW: u8 = 3;

/// Raw columns of the about screen's banner.
pub const BANNER: [u8; WIDTH as usize] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0xfe, 0x90, 0x90, 0x90, 0x60, // P
    0x00, 0x1c, 0x22, 0x22, 0x22, 0x1c, // o
    0x00, 0x3e, 0x10, 0x20, 0x20, 0x10, // r
    0x00, 0x20, 0xfc, 0x22, 0x02, 0x04, // t
    0x00, 0x04, 0x2a, 0x2a, 0x2a, 0x1e, // a
    0x00, 0x62, 0x92, 0x92, 0x92, 0x8c, // S
    0x00, 0x20, 0xfc, 0x22, 0x02, 0x04, // t
    0x00, 0x04, 0x2a, 0x2a, 0x2a, 0x1e, // a
    0x00, 0x20, 0xfc, 0x22, 0x02, 0x04, // t
    0x00, 0x00, 0x22, 0xbe, 0x02, 0x00, // i
    0x00, 0x1c, 0x22, 0x22, 0x22, 0x1c, // o
    0x00, 0x3e, 0x10, 0x20, 0x20, 0x1e, // n
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
];

/// Boot splash.
pub fn draw_splash(display: &mut impl DisplaySink, revision: &Revision) {
    display.print_at(0, 0, "  Porta", Effect::Normal);
    display.print_at(0, 1, "     Station", Effect::Normal);
    display.print_at(0, 3, "    Innove", Effect::Normal);
    display.print_at(0, 4, "   Workshop", Effect::Normal);

    let version = line(format_args!("v{}", revision.software));
    let column = (WIDTH as usize).saturating_sub(6 * version.chars().count()) as u8;
    display.print_at(column, 5, &version, Effect::Normal);
}

/// Marker shown on the splash screen after factory settings were stored.
pub fn draw_defaults_loaded(display: &mut impl DisplaySink) {
    display.print_at(0, 5, "DL", Effect::Normal);
}

/// A button-like "OK" in the bottom row.
fn draw_ok(display: &mut impl DisplaySink) {
    display.print_at(0, 5, "     ", Effect::Normal);
    display.print(" OK ", Effect::Inverted);
}

/// Prompt for resetting all settings.
pub fn draw_recovery(display: &mut impl DisplaySink) {
    display.print_at(0, 0, "   Recovery   ", Effect::Inverted);
    display.print_at(0, 1, "Do you wish to", Effect::Normal);
    display.print_at(0, 2, "reset all the", Effect::Normal);
    display.print_at(0, 3, "settings?", Effect::Normal);
    draw_ok(display);
}

/// Title of the calibration wizard.
pub fn draw_calibration_title(display: &mut impl DisplaySink) {
    display.print_at(0, 0, "  Calibration ", Effect::Inverted);
}

/// The captured calibration points, waiting for confirmation.
pub fn draw_confirm_calibration(display: &mut impl DisplaySink, low: i32, high: i32) {
    display.print_at(0, 0, "  Calibrated  ", Effect::Inverted);

    let text = line(format_args!("P1: ({}, {}) ", CAL_LOW_REFERENCE_RAW, low));
    display.print_at(0, 1, &text, Effect::Normal);
    let text = line(format_args!("P2: ({}, {}) ", CAL_HIGH_REFERENCE_RAW, high));
    display.print_at(0, 2, &text, Effect::Normal);

    draw_ok(display);
}

/// Revision information. The banner row is animated separately.
pub fn draw_about(display: &mut impl DisplaySink, revision: &Revision) {
    let text = line(format_args!("HW Rev.: {}", revision.hardware));
    display.print_at(0, 0, &text, Effect::Normal);
    let text = line(format_args!("SW Ver.: {}", revision.software));
    display.print_at(0, 1, &text, Effect::Normal);
    let text = line(format_args!("Build: {}", revision.build));
    display.print_at(0, 2, &text, Effect::Normal);

    display.print_at(0, BANNER_ROW, " PortaStation ", Effect::Normal);
    display.print_at(0, 4, "Made with love", Effect::Normal);
    display.print_at(0, 5, "by IWC in 2017", Effect::Normal);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::tests::RecordingDisplay;

    const REVISION: Revision = Revision {
        hardware: 'A',
        software: "1.0.0",
        build: "abc1234",
    };

    #[test]
    fn about_shows_revision() {
        let mut display = RecordingDisplay::default();
        draw_about(&mut display, &REVISION);

        assert!(display.shows("HW Rev.: A"));
        assert!(display.shows("SW Ver.: 1.0.0"));
        assert!(display.shows("Build: abc1234"));
        assert!(display.shows("Made with love"));
        assert!(display.shows("by IWC in 2017"));
    }

    #[test]
    fn splash_shows_maker_and_version() {
        let mut display = RecordingDisplay::default();
        draw_splash(&mut display, &REVISION);

        assert!(display.shows("  Porta"));
        assert!(display.shows("    Innove"));
        assert!(display.shows("   Workshop"));
        assert!(display.shows("v1.0.0"));
    }

    #[test]
    fn confirm_shows_both_points() {
        let mut display = RecordingDisplay::default();
        draw_confirm_calibration(&mut display, 280, 410);

        assert!(display.shows("P1: (565, 280)"));
        assert!(display.shows("P2: (785, 410)"));
        assert!(display.shows(" OK "));
    }
}
