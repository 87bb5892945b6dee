//! The native driver surface consumed by the MPSSE engine.
//!
//! [`Transport`] is the complete set of low-level calls the engine needs from
//! whatever drives the chip: open/close, start/stop conditions, byte and bit
//! transfers, acknowledge control, and pin I/O. Calls report success the way
//! the C libmpsse API does, with a [`Status`] compared against
//! [`MPSSE_OK`](crate::constants::MPSSE_OK), or an `Option` for calls that
//! return data. The engine turns failures into [`Error`](crate::Error) values
//! and fetches [`Transport::error_string`] at the moment of failure.
//!
//! [`NativeTransport`](crate::mpsse::NativeTransport) implements this trait on
//! top of `nusb`. Tests substitute a recording fake.

use crate::device_info::DeviceFilter;
use crate::types::{ClockRate, Endianness, Interface, Level, Mode};

/// Status code returned by transport calls. `MPSSE_OK` (0) means success.
pub type Status = i32;

/// One MPSSE channel as seen by the engine.
///
/// Transports own their device handle outright; engines and protocol devices
/// hold them by value.
pub trait Transport: 'static {
    /// Open the first supported device with default selection.
    ///
    /// Returns `true` when a device was found, claimed, and configured.
    fn open_default(&mut self, mode: Mode, clock: ClockRate, endianness: Endianness) -> bool;

    /// Open the device selected by `filter` on `interface`.
    ///
    /// Returns `true` when a device was found, claimed, and configured.
    fn open_indexed(
        &mut self,
        filter: &DeviceFilter,
        interface: Interface,
        mode: Mode,
        clock: ClockRate,
        endianness: Endianness,
    ) -> bool;

    /// Release the device. Must tolerate being called on a closed channel.
    fn close(&mut self);

    /// USB vendor and product ID of the opened device, if known.
    fn usb_ids(&self) -> Option<(u16, u16)> {
        None
    }

    /// Emit a start condition (I2C) or assert chip select (SPI).
    fn start(&mut self) -> Status;

    /// Emit a stop condition (I2C) or deassert chip select (SPI).
    fn stop(&mut self) -> Status;

    /// Clock out `data`.
    fn write(&mut self, data: &[u8]) -> Status;

    /// Clock in `size` bytes. `None` on failure.
    fn read(&mut self, size: usize) -> Option<Vec<u8>>;

    /// Clock in `size` (1-8) bits, packed into one byte. `None` on failure.
    fn read_bits(&mut self, size: u8) -> Option<u8>;

    /// Full-duplex transfer of `data` (SPI modes). `None` on failure.
    fn transfer(&mut self, data: &[u8]) -> Option<Vec<u8>>;

    /// ACK bit received after the last written byte (0 = ACK, 1 = NACK).
    fn get_ack(&mut self) -> u8;

    /// ACK bit to send after each subsequently read byte.
    fn set_ack(&mut self, ack: u8);

    /// Send ACKs after read bytes.
    fn send_acks(&mut self);

    /// Send NACKs after read bytes.
    fn send_nacks(&mut self);

    /// Put the I/O lines in open-drain (tri-state) output mode.
    fn tristate(&mut self) -> Status;

    /// Set the bitbang pin directions (1 = output).
    fn set_direction(&mut self, direction: u8) -> Status;

    /// Drive GPIO `pin` high.
    fn pin_high(&mut self, pin: u8) -> Status;

    /// Drive GPIO `pin` low.
    fn pin_low(&mut self, pin: u8) -> Status;

    /// Write all bitbang pins at once.
    fn write_pins(&mut self, value: u8) -> Status;

    /// Read all bitbang pins at once. `None` on failure.
    fn read_pins(&mut self) -> Option<u8>;

    /// State of GPIO `pin`, taken from `state` if given, otherwise read
    /// from the device. `None` on failure.
    fn pin_state(&mut self, pin: u8, state: Option<u8>) -> Option<bool>;

    /// Enable or disable internal loopback.
    fn set_loopback(&mut self, enable: bool) -> Status;

    /// Set the chip-select idle level.
    fn set_cs_idle(&mut self, idle: Level);

    /// Human-readable description of the opened device.
    fn description(&self) -> String;

    /// Version of the driver layer.
    fn version(&self) -> String;

    /// Message describing the most recent failure.
    fn error_string(&self) -> String;
}
