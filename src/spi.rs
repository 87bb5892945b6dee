//! SPI peripherals.
//!
//! An [`SpiDevice`] owns an engine opened in one of the four SPI modes. There
//! is no addressing or acknowledge phase; framing is entirely chip-select
//! timing, which callers control with [`SerialProtocol::transaction`] or
//! explicit `start()`/`stop()` calls.
//!
//! # Example
//!
//! ```no_run
//! use mpsse::{ClockRate, Mode, NativeTransport, SerialProtocol, SpiConfig, SpiDevice};
//!
//! let config = SpiConfig::new(Mode::Spi0).clock_rate(ClockRate::Mhz1);
//! let mut flash = SpiDevice::open(NativeTransport::new(), &config)?;
//! let id = flash.transaction(|spi| {
//!     spi.write(0x9Fu8)?;
//!     spi.read(3)
//! })?;
//! # Ok::<(), mpsse::Error>(())
//! ```

use crate::context::{DeviceSelector, OpenParams};
use crate::engine::Mpsse;
use crate::error::{Error, Result};
use crate::serial::{Payload, SerialProtocol};
use crate::transport::Transport;
use crate::types::{ClockRate, Endianness, Level, Mode};

/// Configuration for an [`SpiDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiConfig {
    /// SPI mode (`Spi0`..`Spi3`).
    pub mode: Mode,
    /// Bus clock rate.
    pub clock_rate: ClockRate,
    /// Bit order.
    pub endianness: Endianness,
    /// Physical device selection.
    pub device: DeviceSelector,
}

impl SpiConfig {
    /// Configuration for `mode` at 1 MHz, MSB first, default device.
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            clock_rate: ClockRate::Mhz1,
            endianness: Endianness::MsbFirst,
            device: DeviceSelector::default(),
        }
    }

    /// Set the bus clock rate.
    pub fn clock_rate(mut self, clock_rate: ClockRate) -> Self {
        self.clock_rate = clock_rate;
        self
    }

    /// Set the bit order.
    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Set the device selection.
    pub fn device(mut self, device: DeviceSelector) -> Self {
        self.device = device;
        self
    }
}

/// One peripheral on an SPI bus.
#[derive(Debug)]
pub struct SpiDevice<T: Transport> {
    mpsse: Mpsse<'static, T>,
}

impl<T: Transport> SpiDevice<T> {
    /// Open a device through `transport` in the configured SPI mode.
    pub fn open(transport: T, config: &SpiConfig) -> Result<Self> {
        check_spi_mode(config.mode)?;
        let params = OpenParams::new(config.mode)
            .clock_rate(config.clock_rate)
            .endianness(config.endianness)
            .device(config.device.clone());
        Ok(Self {
            mpsse: Mpsse::open(transport, &params)?,
        })
    }

    /// Wrap an engine that is already open in an SPI mode.
    pub fn from_engine(mpsse: Mpsse<'static, T>) -> Result<Self> {
        check_spi_mode(mpsse.mode())?;
        Ok(Self { mpsse })
    }

    /// SPI mode of the device.
    pub fn mode(&self) -> Mode {
        self.mpsse.mode()
    }

    /// Bus clock rate.
    pub fn clock_rate(&self) -> ClockRate {
        self.mpsse.clock()
    }

    /// Bit order.
    pub fn endianness(&self) -> Endianness {
        self.mpsse.endianness()
    }

    /// The underlying engine.
    pub fn mpsse(&self) -> &Mpsse<'static, T> {
        &self.mpsse
    }

    /// The underlying engine, mutably.
    pub fn mpsse_mut(&mut self) -> &mut Mpsse<'static, T> {
        &mut self.mpsse
    }

    /// Release the engine.
    pub fn into_mpsse(self) -> Mpsse<'static, T> {
        self.mpsse
    }

    /// Write a single value (truncated to 8 bits) or a byte sequence.
    pub fn write<'p>(&mut self, data: impl Into<Payload<'p>>) -> Result<()> {
        match data.into() {
            Payload::Byte(b) => self.mpsse.write(&[b]),
            Payload::Bytes(bytes) => self.mpsse.write(bytes),
        }
    }

    /// Read `size` bytes.
    pub fn read(&mut self, size: usize) -> Result<Vec<u8>> {
        self.mpsse.read(size)
    }

    /// Write `data` while reading the same number of bytes.
    pub fn transfer(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.mpsse.transfer(data)
    }

    /// Set the chip-select idle level (high by default).
    pub fn cs_idle(&mut self, idle: Level) -> Result<()> {
        self.mpsse.cs_idle(idle)
    }
}

impl<T: Transport> SerialProtocol for SpiDevice<T> {
    fn start(&mut self) -> Result<()> {
        self.mpsse.start()
    }

    fn stop(&mut self) -> Result<()> {
        self.mpsse.stop()
    }
}

fn check_spi_mode(mode: Mode) -> Result<()> {
    if !mode.is_spi() {
        return Err(Error::InvalidArgument("SPI devices need an SPI mode"));
    }
    Ok(())
}
