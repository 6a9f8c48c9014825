//! The character raster the user interface draws on.
use core::fmt::Write;

use crate::heater::DUTY_MAX;

/// Display width in pixel columns.
pub const WIDTH: u8 = 84;

/// Number of 8 pixel high text rows.
pub const ROWS: u8 = 6;

/// Width of one character cell in pixels.
pub const CHAR_WIDTH: u8 = 6;

/// A line of text (14 characters, some of them multi-byte).
pub type Line = heapless::String<24>;

/// How text is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effect {
    /// Light text on dark background.
    Normal,
    /// Dark text on light background.
    Inverted,
    /// Text with a line below.
    Underlined,
}

/// A text and graphics sink.
///
/// The cursor is a pixel column and a text row. Printing and drawing advance the cursor.
#[allow(async_fn_in_trait)]
pub trait DisplaySink {
    /// Clear the display and move the cursor home.
    fn clear(&mut self);

    /// Move the cursor.
    fn set_cursor(&mut self, column: u8, row: u8);

    /// Print text at the cursor.
    fn print(&mut self, text: &str, effect: Effect);

    /// Draw one raw 8 pixel column at the cursor. Bit 0 is the top pixel.
    fn draw_byte(&mut self, pattern: u8);

    /// Show everything drawn so far.
    async fn flush(&mut self);

    /// Move the cursor and print.
    fn print_at(&mut self, column: u8, row: u8, text: &str, effect: Effect) {
        self.set_cursor(column, row);
        self.print(text, effect);
    }
}

/// Writes into a [`Line`], dropping whatever does not fit.
struct Truncating<'a>(&'a mut Line);

impl Write for Truncating<'_> {
    fn write_str(&mut self, text: &str) -> core::fmt::Result {
        for c in text.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Format a line of text. Text that does not fit is cut off.
pub fn line(args: core::fmt::Arguments<'_>) -> Line {
    let mut line = Line::new();
    let _ = Truncating(&mut line).write_fmt(args);
    line
}

/// The text row of the heater bar.
pub const HEATER_BAR_ROW: u8 = 5;

/// The raw column pattern of the heater bar at `column`.
///
/// The bar is framed. The fill grows with the duty cycle across the display width.
pub fn heater_bar_column(column: u8, duty: u16) -> u8 {
    let filled = (duty.min(DUTY_MAX) as u32 * WIDTH as u32) / DUTY_MAX as u32;

    if column == 0 || column == WIDTH {
        0b1111_1111
    } else if column == 1 || column == WIDTH - 1 {
        0b1000_0001
    } else if (column as u32) <= filled {
        0b1011_1101
    } else {
        0b1000_0001
    }
}

/// Draw the heater bar for a duty cycle.
pub fn draw_heater_bar(display: &mut impl DisplaySink, duty: u16) {
    display.set_cursor(0, HEATER_BAR_ROW);
    for column in 0..=WIDTH {
        display.draw_byte(heater_bar_column(column, duty));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::string::String;
    use std::vec::Vec;

    /// A drawing operation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Op {
        Clear,
        Text {
            column: u8,
            row: u8,
            text: String,
            effect: Effect,
        },
        Byte {
            column: u8,
            row: u8,
            pattern: u8,
        },
        Flush,
    }

    /// Records every drawing operation.
    #[derive(Default)]
    pub struct RecordingDisplay {
        pub ops: Vec<Op>,
        column: u8,
        row: u8,
    }

    impl RecordingDisplay {
        /// All text printed since the last clear.
        pub fn texts(&self) -> Vec<&str> {
            let start = self
                .ops
                .iter()
                .rposition(|op| *op == Op::Clear)
                .map_or(0, |index| index + 1);

            self.ops[start..]
                .iter()
                .filter_map(|op| match op {
                    Op::Text { text, .. } => Some(text.as_str()),
                    _ => None,
                })
                .collect()
        }

        /// True if any text since the last clear contains `needle`.
        pub fn shows(&self, needle: &str) -> bool {
            self.texts().iter().any(|text| text.contains(needle))
        }
    }

    impl DisplaySink for RecordingDisplay {
        fn clear(&mut self) {
            self.column = 0;
            self.row = 0;
            self.ops.push(Op::Clear);
        }

        fn set_cursor(&mut self, column: u8, row: u8) {
            self.column = column;
            self.row = row;
        }

        fn print(&mut self, text: &str, effect: Effect) {
            self.ops.push(Op::Text {
                column: self.column,
                row: self.row,
                text: text.into(),
                effect,
            });
            self.column = self
                .column
                .saturating_add(CHAR_WIDTH.saturating_mul(text.chars().count() as u8));
        }

        fn draw_byte(&mut self, pattern: u8) {
            self.ops.push(Op::Byte {
                column: self.column,
                row: self.row,
                pattern,
            });
            self.column = self.column.saturating_add(1);
        }

        async fn flush(&mut self) {
            self.ops.push(Op::Flush);
        }
    }

    #[test]
    fn heater_bar_frame_and_fill() {
        let empty: Vec<u8> = (0..=WIDTH).map(|c| heater_bar_column(c, 0)).collect();
        assert_eq!(empty[0], 0xFF);
        assert_eq!(empty[1], 0x81);
        assert_eq!(empty[2], 0x81);
        assert_eq!(empty[WIDTH as usize], 0xFF);

        let full: Vec<u8> = (0..=WIDTH).map(|c| heater_bar_column(c, DUTY_MAX)).collect();
        assert_eq!(full[2], 0xBD);
        assert_eq!(full[WIDTH as usize - 2], 0xBD);
        assert_eq!(full[WIDTH as usize - 1], 0x81);

        let half = heater_bar_column(42, DUTY_MAX / 2);
        assert_eq!(half, 0xBD);
        assert_eq!(heater_bar_column(43, DUTY_MAX / 2), 0x81);
    }

    #[test]
    fn heater_bar_is_drawn_in_its_row() {
        let mut display = RecordingDisplay::default();
        draw_heater_bar(&mut display, 100);

        assert_eq!(display.ops.len(), WIDTH as usize + 1);
        assert!(display.ops.iter().all(|op| matches!(
            op,
            Op::Byte {
                row: HEATER_BAR_ROW,
                ..
            }
        )));
    }

    #[test]
    fn long_lines_are_cut() {
        let text = line(format_args!("{}", "x".repeat(40)));
        assert_eq!(text.len(), 24);
    }
}
