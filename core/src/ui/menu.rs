//! The settings menu.
//!
//! Only exists while the menu screen is shown. The encoder either moves the selection or, while an
//! item is being edited, changes that item's value.
use crate::calibration::{ADC_MAX, MAX_SET_RAW, MIN_SET_RAW, TemperatureUnit};
use crate::display::{CHAR_WIDTH, DisplaySink, Effect, line};
use crate::settings::{NUM_TEMP_PRESETS, Settings};

/// Pixel column of preset values.
const PRESET_VALUE_COLUMN: u8 = 9 * CHAR_WIDTH;

/// Pixel column of calibration values.
const CALIBRATION_VALUE_COLUMN: u8 = 11 * CHAR_WIDTH;

/// A page of the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuPage {
    /// The top level.
    Main,
    /// The four temperature presets.
    TempPresets,
    /// Calibration wizard and calibration points.
    Calibration,
    /// Temperature unit selection.
    Units,
}

impl MenuPage {
    /// The page title, drawn inverted.
    pub fn title(self) -> &'static str {
        match self {
            Self::Main => "   Settings   ",
            Self::TempPresets => " Temp Presets ",
            Self::Calibration => "  Calibration ",
            Self::Units => "     Units    ",
        }
    }

    /// The item labels.
    pub fn items(self) -> &'static [&'static str] {
        match self {
            Self::Main => &["Temp. Presets", "Calibration", "Units", "About", "Save"],
            Self::TempPresets => &["Preset 1", "Preset 2", "Preset 3", "Preset 4", "Back"],
            Self::Calibration => &["Cal. Wizard", "Var. 1", "Var. 2", "Back"],
            Self::Units => &["Celsius", "Fahrenheit", "Kelvin", "Back"],
        }
    }

    /// The number of items.
    pub fn item_count(self) -> u8 {
        self.items().len() as u8
    }
}

/// What the control loop has to do after a click in the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuOutcome {
    /// Stay in the menu.
    Stay,
    /// Open the about screen.
    About,
    /// Start the calibration wizard.
    CalibrationWizard,
    /// Save the settings and return to the main screen.
    SaveAndExit,
}

/// The menu's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MenuState {
    /// The current page.
    page: MenuPage,
    /// Index of the selected item.
    selected: u8,
    /// If true, the encoder changes the selected item's value.
    editing: bool,
}

impl Default for MenuState {
    fn default() -> Self {
        Self::new()
    }
}

impl MenuState {
    /// The top level page with the first item selected.
    pub const fn new() -> Self {
        Self {
            page: MenuPage::Main,
            selected: 0,
            editing: false,
        }
    }

    /// The current page.
    pub fn page(&self) -> MenuPage {
        self.page
    }

    /// Index of the selected item.
    pub fn selected(&self) -> u8 {
        self.selected
    }

    /// True while the selected item's value is edited.
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Show a page, with its first item selected.
    pub fn enter(&mut self, page: MenuPage, settings: &Settings, display: &mut impl DisplaySink) {
        self.page = page;
        self.editing = false;
        self.navigate(0, settings, display);
    }

    /// Move the selection by one item in the direction of `delta`, within the page.
    ///
    /// A `delta` of zero selects the first item.
    pub fn navigate(&mut self, delta: i32, settings: &Settings, display: &mut impl DisplaySink) {
        let last = self.page.item_count() - 1;

        if delta > 0 {
            self.selected = (self.selected + 1).min(last);
        } else if delta < 0 {
            self.selected = self.selected.saturating_sub(1);
        } else {
            self.selected = 0;
        }

        display.clear();
        display.print_at(0, 0, self.page.title(), Effect::Inverted);
        self.draw_items(settings, display);
    }

    /// Change the edited value by one step in the direction of `delta`, within its range.
    ///
    /// Calibration changes take effect immediately.
    pub fn edit(&mut self, delta: i32, settings: &mut Settings, display: &mut impl DisplaySink) {
        let step = |value: u16, min: u16, max: u16| {
            if delta > 0 && value < max {
                value + 1
            } else if delta < 0 && value > min {
                value - 1
            } else {
                value
            }
        };

        match (self.page, self.selected as usize) {
            (MenuPage::TempPresets, index) if index < NUM_TEMP_PRESETS => {
                let preset = &mut settings.record_mut().temp_presets[index];
                *preset = step(*preset, MIN_SET_RAW, MAX_SET_RAW);
            }
            (MenuPage::Calibration, 1) => {
                let point = &mut settings.record_mut().calibration.low_deg_c;
                *point = step(*point, 0, ADC_MAX);
                settings.recalibrate();
            }
            (MenuPage::Calibration, 2) => {
                let point = &mut settings.record_mut().calibration.high_deg_c;
                *point = step(*point, 0, ADC_MAX);
                settings.recalibrate();
            }
            _ => {}
        }

        self.draw_items(settings, display);
    }

    /// Act on the selected item (switch click while not editing, or to finish editing).
    pub fn activate(&mut self, settings: &mut Settings, display: &mut impl DisplaySink) -> MenuOutcome {
        match (self.page, self.selected) {
            (MenuPage::Main, 0) => self.enter(MenuPage::TempPresets, settings, display),
            (MenuPage::Main, 1) => self.enter(MenuPage::Calibration, settings, display),
            (MenuPage::Main, 2) => self.enter(MenuPage::Units, settings, display),
            (MenuPage::Main, 3) => return MenuOutcome::About,
            (MenuPage::Main, _) => return MenuOutcome::SaveAndExit,

            (MenuPage::TempPresets, 0..=3) | (MenuPage::Calibration, 1..=2) => {
                self.editing = !self.editing;
                self.draw_items(settings, display);
            }
            (MenuPage::Calibration, 0) => return MenuOutcome::CalibrationWizard,

            (MenuPage::Units, index) if (index as usize) < TemperatureUnit::ALL.len() => {
                settings.set_temp_unit(TemperatureUnit::ALL[index as usize]);
                self.enter(MenuPage::Main, settings, display);
            }

            // "Back"
            _ => self.enter(MenuPage::Main, settings, display),
        }

        MenuOutcome::Stay
    }

    /// Draw the items and their values below the title.
    fn draw_items(&self, settings: &Settings, display: &mut impl DisplaySink) {
        let record = settings.record();
        let unit = settings.temp_unit();

        for (index, label) in self.page.items().iter().enumerate() {
            let row = index as u8 + 1;
            let is_selected = index == self.selected as usize;

            let label_effect = if is_selected && !self.editing {
                Effect::Inverted
            } else {
                Effect::Normal
            };
            let value_effect = if is_selected && self.editing {
                Effect::Underlined
            } else {
                Effect::Normal
            };

            display.print_at(0, row, label, label_effect);

            match self.page {
                MenuPage::TempPresets if index < NUM_TEMP_PRESETS => {
                    let value = settings.raw_to_temp(record.temp_presets[index], unit);
                    let text = line(format_args!("{}{}", value, unit.symbol()));
                    display.print_at(PRESET_VALUE_COLUMN, row, &text, value_effect);
                }
                MenuPage::Calibration if index == 1 || index == 2 => {
                    let value = if index == 1 {
                        record.calibration.low_deg_c
                    } else {
                        record.calibration.high_deg_c
                    };
                    let text = line(format_args!("{}", value));
                    display.print_at(CALIBRATION_VALUE_COLUMN, row, &text, value_effect);
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::tests::{Op, RecordingDisplay};

    fn setup() -> (MenuState, Settings, RecordingDisplay) {
        let settings = Settings::defaults();
        let mut display = RecordingDisplay::default();
        let mut menu = MenuState::new();
        menu.enter(MenuPage::Main, &settings, &mut display);
        (menu, settings, display)
    }

    fn effect_of(display: &RecordingDisplay, needle: &str) -> Option<Effect> {
        display.ops.iter().rev().find_map(|op| match op {
            Op::Text { text, effect, .. } if text.as_str() == needle => Some(*effect),
            _ => None,
        })
    }

    #[test]
    fn enter_draws_title_and_selects_first() {
        let (menu, _, display) = setup();

        assert_eq!(menu.selected(), 0);
        assert_eq!(effect_of(&display, "   Settings   "), Some(Effect::Inverted));
        assert_eq!(effect_of(&display, "Temp. Presets"), Some(Effect::Inverted));
        assert_eq!(effect_of(&display, "Calibration"), Some(Effect::Normal));
    }

    #[test]
    fn navigation_is_clamped() {
        let (mut menu, settings, mut display) = setup();

        menu.navigate(-1, &settings, &mut display);
        assert_eq!(menu.selected(), 0);

        for _ in 0..10 {
            menu.navigate(3, &settings, &mut display);
        }
        assert_eq!(menu.selected(), MenuPage::Main.item_count() - 1);

        menu.navigate(0, &settings, &mut display);
        assert_eq!(menu.selected(), 0);
    }

    #[test]
    fn edit_preset_within_range() {
        let (mut menu, mut settings, mut display) = setup();

        menu.activate(&mut settings, &mut display);
        assert_eq!(menu.page(), MenuPage::TempPresets);

        menu.activate(&mut settings, &mut display);
        assert!(menu.is_editing());

        let before = settings.record().temp_presets[0];
        menu.edit(5, &mut settings, &mut display);
        assert_eq!(settings.record().temp_presets[0], before + 1);

        settings.record_mut().temp_presets[0] = MIN_SET_RAW;
        menu.edit(-1, &mut settings, &mut display);
        assert_eq!(settings.record().temp_presets[0], MIN_SET_RAW);

        let shown = line(format_args!(
            "{}{}",
            settings.raw_to_temp(MIN_SET_RAW, TemperatureUnit::Celsius),
            TemperatureUnit::Celsius.symbol()
        ));
        assert_eq!(effect_of(&display, &shown), Some(Effect::Underlined));

        menu.activate(&mut settings, &mut display);
        assert!(!menu.is_editing());
        assert_eq!(effect_of(&display, "Preset 1"), Some(Effect::Inverted));
    }

    #[test]
    fn edit_calibration_recalibrates() {
        let (mut menu, mut settings, mut display) = setup();

        menu.navigate(1, &settings, &mut display);
        menu.activate(&mut settings, &mut display);
        assert_eq!(menu.page(), MenuPage::Calibration);

        menu.navigate(1, &settings, &mut display);
        menu.activate(&mut settings, &mut display);
        let before = settings.temp_to_raw(300, TemperatureUnit::Celsius);
        for _ in 0..20 {
            menu.edit(1, &mut settings, &mut display);
        }

        assert_eq!(settings.record().calibration.low_deg_c, 290);
        assert_ne!(settings.temp_to_raw(300, TemperatureUnit::Celsius), before);
    }

    #[test]
    fn units_page_sets_unit_and_returns() {
        let (mut menu, mut settings, mut display) = setup();

        menu.navigate(1, &settings, &mut display);
        menu.navigate(1, &settings, &mut display);
        menu.activate(&mut settings, &mut display);
        assert_eq!(menu.page(), MenuPage::Units);

        menu.navigate(1, &settings, &mut display);
        menu.navigate(1, &settings, &mut display);
        assert_eq!(menu.activate(&mut settings, &mut display), MenuOutcome::Stay);

        assert_eq!(settings.temp_unit(), TemperatureUnit::Kelvin);
        assert_eq!(menu.page(), MenuPage::Main);
        assert_eq!(menu.selected(), 0);
    }

    #[test]
    fn leaving_the_menu() {
        let (mut menu, mut settings, mut display) = setup();

        for _ in 0..3 {
            menu.navigate(1, &settings, &mut display);
        }
        assert_eq!(menu.activate(&mut settings, &mut display), MenuOutcome::About);

        menu.navigate(1, &settings, &mut display);
        assert_eq!(menu.activate(&mut settings, &mut display), MenuOutcome::SaveAndExit);

        menu.enter(MenuPage::Calibration, &settings, &mut display);
        assert_eq!(
            menu.activate(&mut settings, &mut display),
            MenuOutcome::CalibrationWizard
        );
    }

    #[test]
    fn back_returns_to_main_page() {
        let (mut menu, mut settings, mut display) = setup();

        menu.enter(MenuPage::TempPresets, &settings, &mut display);
        for _ in 0..4 {
            menu.navigate(1, &settings, &mut display);
        }
        menu.activate(&mut settings, &mut display);

        assert_eq!(menu.page(), MenuPage::Main);
    }
}
