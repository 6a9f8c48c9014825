//! The SSD1306 display, as a character raster for the control core.
use defmt::{Debug2Format, warn};
use display_interface::DisplayError;
use embassy_stm32::spi::Spi;
use embassy_stm32::{gpio::Output, mode::Async};
use embedded_graphics::mono_font::iso_8859_1::FONT_5X8;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::text::{Baseline, Text};
use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, PrimitiveStyleBuilder, Rectangle},
};
use embedded_hal_bus::spi::ExclusiveDevice;
use porta_core::display::{CHAR_WIDTH, DisplaySink, Effect, ROWS, WIDTH};
use ssd1306::Ssd1306Async;
use ssd1306::mode::BufferedGraphicsModeAsync;
use ssd1306::prelude::{Brightness, DisplayRotation, DisplaySize102x64, SPIInterface};

/// The inner display type (draw target).
type InnerDisplay = Ssd1306Async<
    SPIInterface<
        ExclusiveDevice<Spi<'static, Async>, Output<'static>, embassy_time::Delay>,
        Output<'static>,
    >,
    DisplaySize102x64,
    BufferedGraphicsModeAsync<DisplaySize102x64>,
>;

/// Display width in pixels (shown).
const DISPLAY_WIDTH: i32 = 102;

/// Display height in pixels.
const DISPLAY_HEIGHT: i32 = 64;

/// Height of a text row in pixels.
const ROW_HEIGHT: i32 = 8;

/// The raster's top left corner. The raster is centered on the display.
const ORIGIN: Point = Point::new(
    (DISPLAY_WIDTH - WIDTH as i32) / 2,
    (DISPLAY_HEIGHT - ROWS as i32 * ROW_HEIGHT) / 2,
);

/// Style for the background of inverted text.
const FILLED_STYLE: PrimitiveStyle<BinaryColor> = PrimitiveStyleBuilder::new()
    .fill_color(BinaryColor::On)
    .build();

/// Log a failed display operation.
fn log_error(operation: &str, error: DisplayError) {
    warn!("Display {} failed: {}", operation, Debug2Format(&error));
}

/// Resources for driving the display.
pub struct DisplayResources {
    /// The display SPI controller.
    pub spi: Spi<'static, Async>,
    /// The display chip select (for SPI)
    pub pin_cs: Output<'static>,
    /// The display data/control line.
    pub pin_dc: Output<'static>,
    /// The display reset line.
    pub pin_reset: Output<'static>,
}

/// A character raster of [`ROWS`] rows by [`WIDTH`] pixel columns.
pub struct Display {
    /// The inner display structure (draw target).
    inner: InnerDisplay,
    /// Cursor pixel column.
    column: u8,
    /// Cursor text row.
    row: u8,
}

impl Display {
    /// Reset and initialize the display.
    ///
    /// Initialization errors are logged. The display is returned anyway, since the station works
    /// without it.
    pub async fn new(mut display_resources: DisplayResources) -> Self {
        // Chip select is a push-pull output, which cannot fail.
        let spi = defmt::unwrap!(
            ExclusiveDevice::new(
                display_resources.spi,
                display_resources.pin_cs,
                embassy_time::Delay,
            )
            .ok()
        );
        let interface = SPIInterface::new(spi, display_resources.pin_dc);
        let mut inner = Ssd1306Async::new(interface, DisplaySize102x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();

        if inner
            .reset(
                &mut display_resources.pin_reset,
                &mut embassy_time::Delay {},
            )
            .await
            .is_err()
        {
            warn!("Display reset failed");
        }

        if let Err(error) = inner
            .init_with_addr_mode(ssd1306::command::AddrMode::Horizontal)
            .await
        {
            log_error("init", error);
        }
        if let Err(error) = inner.set_brightness(Brightness::BRIGHTEST).await {
            log_error("brightness", error);
        }

        let mut display = Self {
            inner,
            column: 0,
            row: 0,
        };
        display.clear();
        display.flush().await;
        display
    }

    /// The top left pixel of the cursor's cell.
    fn cursor_point(&self) -> Point {
        ORIGIN + Point::new(self.column as i32, self.row as i32 * ROW_HEIGHT)
    }

    /// Draw one character at the cursor.
    fn draw_char(&mut self, c: char, style: MonoTextStyle<'static, BinaryColor>, effect: Effect) {
        let point = self.cursor_point();

        if effect == Effect::Inverted {
            let _ = Rectangle::new(point, Size::new(CHAR_WIDTH as u32, ROW_HEIGHT as u32))
                .into_styled(FILLED_STYLE)
                .draw(&mut self.inner);
        }

        let mut buffer = [0u8; 4];
        let _ = Text::with_baseline(c.encode_utf8(&mut buffer), point, style, Baseline::Top)
            .draw(&mut self.inner);
    }
}

impl DisplaySink for Display {
    fn clear(&mut self) {
        self.inner.clear_buffer();
        self.column = 0;
        self.row = 0;
    }

    fn set_cursor(&mut self, column: u8, row: u8) {
        self.column = column;
        self.row = row;
    }

    fn print(&mut self, text: &str, effect: Effect) {
        let builder = MonoTextStyleBuilder::new().font(&FONT_5X8);
        let style = match effect {
            Effect::Normal => builder.text_color(BinaryColor::On).build(),
            Effect::Inverted => builder.text_color(BinaryColor::Off).build(),
            Effect::Underlined => builder
                .text_color(BinaryColor::On)
                .underline_with_color(BinaryColor::On)
                .build(),
        };

        for c in text.chars() {
            self.draw_char(c, style, effect);
            self.column = self.column.saturating_add(CHAR_WIDTH);
        }
    }

    fn draw_byte(&mut self, pattern: u8) {
        let point = self.cursor_point();

        let pixels = (0..8).map(|bit| {
            let color = if pattern & (1 << bit) != 0 {
                BinaryColor::On
            } else {
                BinaryColor::Off
            };
            Pixel(point + Point::new(0, bit), color)
        });
        let _ = self.inner.draw_iter(pixels);

        self.column = self.column.saturating_add(1);
    }

    async fn flush(&mut self) {
        if let Err(error) = self.inner.flush().await {
            log_error("flush", error);
        }
    }
}
