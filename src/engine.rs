//! The MPSSE engine.
//!
//! [`Mpsse`] wraps one open [`DeviceContext`] and exposes the byte/bit level
//! operations the protocol layers are built from. It checks every status
//! returned by the transport and gates the bitbang-only pin calls on the
//! context mode.
//!
//! # Example
//!
//! ```no_run
//! use mpsse::{Mpsse, Mode, NativeTransport, OpenParams};
//!
//! let mut mpsse = Mpsse::open(NativeTransport::new(), &OpenParams::new(Mode::Spi0))?;
//! mpsse.start()?;
//! mpsse.write(&[0x9F])?;
//! let id = mpsse.read(3)?;
//! mpsse.stop()?;
//! # Ok::<(), mpsse::Error>(())
//! ```

use std::ops::{Deref, DerefMut};

use crate::constants::{ACK, MPSSE_FAIL, MPSSE_OK, NACK};
use crate::context::{DeviceContext, OpenParams};
use crate::error::{Error, Result};
use crate::serial::SerialProtocol;
use crate::transport::{Status, Transport};
use crate::types::{ClockRate, Endianness, Level, Loopback, Mode};

/// Highest GPIO pin number in MPSSE modes (GPIOL0-3, GPIOH0-7).
const MAX_GPIO_PIN: u8 = 11;
/// Highest pin number in bitbang mode.
const MAX_BITBANG_PIN: u8 = 7;

/// A context the engine either owns or borrows.
#[derive(Debug)]
enum ContextRef<'a, T: Transport> {
    Owned(DeviceContext<T>),
    Borrowed(&'a mut DeviceContext<T>),
}

impl<T: Transport> Deref for ContextRef<'_, T> {
    type Target = DeviceContext<T>;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Owned(ctx) => ctx,
            Self::Borrowed(ctx) => ctx,
        }
    }
}

impl<T: Transport> DerefMut for ContextRef<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Self::Owned(ctx) => ctx,
            Self::Borrowed(ctx) => ctx,
        }
    }
}

/// MPSSE engine bound to one device context.
///
/// An engine created by [`open`](Self::open) or
/// [`from_context`](Self::from_context) owns its context and closes the
/// device when dropped. An engine created by [`borrowed`](Self::borrowed)
/// never closes the context it was lent.
#[derive(Debug)]
pub struct Mpsse<'a, T: Transport> {
    ctx: ContextRef<'a, T>,
}

impl<T: Transport> Mpsse<'static, T> {
    /// Open a device through `transport` and take ownership of it.
    pub fn open(transport: T, params: &OpenParams) -> Result<Self> {
        Self::from_context(DeviceContext::open(transport, params))
    }

    /// Take ownership of an already opened context.
    pub fn from_context(ctx: DeviceContext<T>) -> Result<Self> {
        Self::init(ContextRef::Owned(ctx))
    }

    /// Close the device now instead of on drop.
    ///
    /// A borrowed context is left open for its owner.
    pub fn close(mut self) {
        if let ContextRef::Owned(ctx) = &mut self.ctx {
            ctx.close();
        }
    }
}

impl<'a, T: Transport> Mpsse<'a, T> {
    /// Drive a context owned elsewhere. The context is not closed when the
    /// engine is dropped.
    pub fn borrowed(ctx: &'a mut DeviceContext<T>) -> Result<Self> {
        Self::init(ContextRef::Borrowed(ctx))
    }

    fn init(ctx: ContextRef<'a, T>) -> Result<Self> {
        if !ctx.is_open() {
            return Err(Error::CannotOpen);
        }
        let mut mpsse = Self { ctx };
        if mpsse.ctx.mode() == Mode::I2c {
            // Shared SDA/SCL lines need open-drain outputs.
            let status = mpsse.ctx.transport_mut().tristate();
            mpsse.check(status)?;
        }
        Ok(mpsse)
    }

    /// The underlying context.
    pub fn context(&self) -> &DeviceContext<T> {
        &self.ctx
    }

    /// Protocol mode of the context.
    pub fn mode(&self) -> Mode {
        self.ctx.mode()
    }

    /// Clock rate the context was opened with.
    pub fn clock(&self) -> ClockRate {
        self.ctx.clock_rate()
    }

    /// Bit order of the context.
    pub fn endianness(&self) -> Endianness {
        self.ctx.endianness()
    }

    fn transport(&mut self) -> Result<&mut T> {
        if !self.ctx.is_open() {
            return Err(Error::CannotOpen);
        }
        Ok(self.ctx.transport_mut())
    }

    /// Turn a transport status into a result, fetching the error string now.
    fn check(&self, status: Status) -> Result<()> {
        if status == MPSSE_OK {
            return Ok(());
        }
        let message = self.ctx.transport().error_string();
        log::debug!("transport returned status {status}: {message}");
        Err(Error::StatusCode {
            code: status,
            message,
        })
    }

    fn failure(&self) -> Error {
        Error::StatusCode {
            code: MPSSE_FAIL,
            message: self.ctx.transport().error_string(),
        }
    }

    fn require_mode(&self, required: Mode) -> Result<()> {
        let current = self.ctx.mode();
        if current != required {
            log::warn!("{required:?}-only operation called in {current:?} mode");
            return Err(Error::InvalidMode { current, required });
        }
        Ok(())
    }

    fn check_pin(&self, pin: u8) -> Result<()> {
        let max = if self.ctx.mode() == Mode::Bitbang {
            MAX_BITBANG_PIN
        } else {
            MAX_GPIO_PIN
        };
        if pin > max {
            return Err(Error::InvalidArgument("GPIO pin number out of range"));
        }
        Ok(())
    }

    /// Emit a start condition (I2C) or assert chip select (SPI).
    pub fn start(&mut self) -> Result<()> {
        let status = self.transport()?.start();
        self.check(status)
    }

    /// Emit a stop condition (I2C) or deassert chip select (SPI).
    pub fn stop(&mut self) -> Result<()> {
        let status = self.transport()?.stop();
        self.check(status)
    }

    /// Clock out `data` in order.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        let status = self.transport()?.write(data);
        self.check(status)
    }

    /// Clock in exactly `size` bytes.
    ///
    /// A failed or short transfer is an error; partial data is never returned.
    pub fn read(&mut self, size: usize) -> Result<Vec<u8>> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let data = self.transport()?.read(size);
        match data {
            Some(data) if data.len() == size => Ok(data),
            Some(data) => {
                log::debug!("short read: wanted {size} bytes, got {}", data.len());
                Err(self.failure())
            }
            None => Err(self.failure()),
        }
    }

    /// Clock in `size` bits (1-8), packed into one byte.
    pub fn read_bits(&mut self, size: u8) -> Result<u8> {
        if !(1..=8).contains(&size) {
            return Err(Error::InvalidArgument("bit count must be between 1 and 8"));
        }
        let bits = self.transport()?.read_bits(size);
        match bits {
            Some(bits) => Ok(bits),
            None => Err(self.failure()),
        }
    }

    /// Full-duplex transfer; returns as many bytes as were written.
    pub fn transfer(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let rx = self.transport()?.transfer(data);
        match rx {
            Some(rx) if rx.len() == data.len() => Ok(rx),
            _ => Err(self.failure()),
        }
    }

    /// ACK bit received after the last written byte: 0 = ACK, 1 = NACK.
    pub fn ack(&mut self) -> Result<u8> {
        Ok(self.transport()?.get_ack())
    }

    /// Set the ACK bit sent after each subsequently read byte.
    pub fn set_ack(&mut self, ack: u8) -> Result<()> {
        if ack != ACK && ack != NACK {
            return Err(Error::InvalidArgument("ack must be 0 (ACK) or 1 (NACK)"));
        }
        self.transport()?.set_ack(ack);
        Ok(())
    }

    /// Acknowledge each subsequently read byte.
    pub fn send_acks(&mut self) -> Result<()> {
        self.transport()?.send_acks();
        Ok(())
    }

    /// NACK each subsequently read byte.
    pub fn send_nacks(&mut self) -> Result<()> {
        self.transport()?.send_nacks();
        Ok(())
    }

    /// Set the bitbang pin directions (1 = output). Bitbang mode only.
    pub fn direction(&mut self, direction: u8) -> Result<()> {
        self.require_mode(Mode::Bitbang)?;
        let status = self.transport()?.set_direction(direction);
        self.check(status)
    }

    /// Write all bitbang pins. Bitbang mode only.
    pub fn write_pins(&mut self, value: u8) -> Result<()> {
        self.require_mode(Mode::Bitbang)?;
        let status = self.transport()?.write_pins(value);
        self.check(status)
    }

    /// Read all bitbang pins. Bitbang mode only.
    pub fn read_pins(&mut self) -> Result<u8> {
        self.require_mode(Mode::Bitbang)?;
        let pins = self.transport()?.read_pins();
        match pins {
            Some(pins) => Ok(pins),
            None => Err(self.failure()),
        }
    }

    /// Drive GPIO `pin` to `level`.
    pub fn pin_mode(&mut self, pin: u8, level: Level) -> Result<()> {
        self.check_pin(pin)?;
        let transport = self.transport()?;
        let status = match level {
            Level::High => transport.pin_high(pin),
            Level::Low => transport.pin_low(pin),
        };
        self.check(status)
    }

    /// Level of GPIO `pin`, decoded from `state` if given, otherwise read
    /// from the device.
    pub fn pin_state(&mut self, pin: u8, state: Option<u8>) -> Result<Level> {
        self.check_pin(pin)?;
        let high = self.transport()?.pin_state(pin, state);
        match high {
            Some(high) => Ok(Level::from(high)),
            None => Err(self.failure()),
        }
    }

    /// Enable or disable internal loopback.
    pub fn loopback(&mut self, setting: Loopback) -> Result<()> {
        let status = self
            .transport()?
            .set_loopback(setting == Loopback::Enabled);
        self.check(status)
    }

    /// Set the chip-select idle level.
    pub fn cs_idle(&mut self, idle: Level) -> Result<()> {
        self.transport()?.set_cs_idle(idle);
        Ok(())
    }

    /// Description of the opened device.
    pub fn description(&self) -> String {
        self.ctx.transport().description()
    }

    /// Version of the driver layer.
    pub fn version(&self) -> String {
        self.ctx.transport().version()
    }

    /// Message describing the most recent transport failure.
    pub fn error_string(&self) -> String {
        self.ctx.transport().error_string()
    }
}

impl<T: Transport> SerialProtocol for Mpsse<'_, T> {
    fn start(&mut self) -> Result<()> {
        Mpsse::start(self)
    }

    fn stop(&mut self) -> Result<()> {
        Mpsse::stop(self)
    }
}
