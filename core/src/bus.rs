//! Byte-addressed access to the settings EEPROM (24x01 class) over I2C.
use embedded_hal::i2c::{Error as _, ErrorKind};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

/// The EEPROM's 7-bit bus address.
pub const EEPROM_ADDRESS: u8 = 0b101_0000;

/// The time the EEPROM needs to finish an internal write cycle.
pub const WRITE_CYCLE_MS: u32 = 10;

/// Errors of a bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The device did not acknowledge. The transaction was aborted.
    Nack,
    /// Any other bus fault (arbitration loss, overrun, timeout).
    Bus,
}

impl BusError {
    /// Classify an I2C error.
    fn from_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NoAcknowledge(_) => Self::Nack,
            _ => Self::Bus,
        }
    }
}

/// Byte-addressed non-volatile storage.
#[allow(async_fn_in_trait)]
pub trait ByteStore {
    /// Read the byte at `address`.
    async fn read(&mut self, address: u8) -> Result<u8, BusError>;

    /// Write `data` to `address`. Returns once the byte is persisted.
    async fn write(&mut self, address: u8, data: u8) -> Result<(), BusError>;
}

/// EEPROM driver on an async I2C bus.
///
/// Holds the bus exclusively, so at most one transaction is ever in flight.
pub struct BusDriver<I, D> {
    /// The I2C bus.
    i2c: I,
    /// Delay for the write cycle.
    delay: D,
    /// The device's 7-bit address.
    address: u8,
}

impl<I: I2c, D: DelayNs> BusDriver<I, D> {
    /// Create a driver for the EEPROM at [`EEPROM_ADDRESS`].
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: EEPROM_ADDRESS,
        }
    }

    #[cfg(test)]
    pub(crate) fn bus(&self) -> &I {
        &self.i2c
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut I {
        &mut self.i2c
    }
}

impl<I: I2c, D: DelayNs> ByteStore for BusDriver<I, D> {
    async fn read(&mut self, address: u8) -> Result<u8, BusError> {
        let mut data = [0u8];

        // Set the cursor, then read one byte after a repeated start.
        self.i2c
            .write_read(self.address, &[address], &mut data)
            .await
            .map_err(|e| BusError::from_kind(e.kind()))?;

        Ok(data[0])
    }

    async fn write(&mut self, address: u8, data: u8) -> Result<(), BusError> {
        self.i2c
            .write(self.address, &[address, data])
            .await
            .map_err(|e| BusError::from_kind(e.kind()))?;

        self.delay.delay_ms(WRITE_CYCLE_MS).await;
        Ok(())
    }
}
