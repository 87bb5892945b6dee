//! I2C slave devices.
//!
//! An [`I2cDevice`] owns an engine opened in I2C mode (MSB first) and talks to
//! a single 7-bit slave address. Every operation runs inside one
//! start/stop transaction.
//!
//! # Example
//!
//! ```no_run
//! use mpsse::{I2cConfig, I2cDevice, NativeTransport};
//!
//! let mut sensor = I2cDevice::open(NativeTransport::new(), &I2cConfig::new(0x76))?;
//! let chip_id = sensor.read8(0xD0)?;
//! sensor.write(0xF4, 0x27)?;
//! # Ok::<(), mpsse::Error>(())
//! ```

use crate::constants::ACK;
use crate::context::{DeviceSelector, OpenParams};
use crate::engine::Mpsse;
use crate::error::{Error, Result};
use crate::serial::{Payload, SerialProtocol};
use crate::transport::Transport;
use crate::types::{ClockRate, Endianness, Mode};

/// Highest 7-bit slave address.
const MAX_ADDRESS: u8 = 0x7F;

/// Configuration for an [`I2cDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cConfig {
    /// 7-bit slave address.
    pub address: u8,
    /// Bus clock rate.
    pub clock_rate: ClockRate,
    /// Physical device selection.
    pub device: DeviceSelector,
    /// Use a repeated start between the register and data phases of a read.
    /// When `false`, a stop and a fresh start are issued instead.
    pub repeated_start: bool,
}

impl I2cConfig {
    /// Configuration for `address` at 100 kHz with repeated start.
    pub fn new(address: u8) -> Self {
        Self {
            address,
            clock_rate: ClockRate::Khz100,
            device: DeviceSelector::default(),
            repeated_start: true,
        }
    }

    /// Set the bus clock rate.
    pub fn clock_rate(mut self, clock_rate: ClockRate) -> Self {
        self.clock_rate = clock_rate;
        self
    }

    /// Set the device selection.
    pub fn device(mut self, device: DeviceSelector) -> Self {
        self.device = device;
        self
    }

    /// Enable or disable repeated start.
    pub fn repeated_start(mut self, enabled: bool) -> Self {
        self.repeated_start = enabled;
        self
    }
}

/// Address byte for a write: `address << 1`.
#[inline]
pub fn write_address_byte(address: u8) -> u8 {
    address << 1
}

/// Address byte for a read: `(address << 1) | 1`.
#[inline]
pub fn read_address_byte(address: u8) -> u8 {
    (address << 1) | 1
}

/// Shift a masked register value down so the mask's lowest set bit lands on
/// bit 0.
///
/// `mask` must be non-zero. A zero `value` yields zero.
pub fn right_shift_lsb(value: u16, mask: u16) -> Result<u16> {
    if mask == 0 {
        return Err(Error::InvalidArgument("mask must not be zero"));
    }
    if value == 0 {
        return Ok(0);
    }
    Ok(value >> mask.trailing_zeros())
}

/// One slave on an I2C bus.
#[derive(Debug)]
pub struct I2cDevice<T: Transport> {
    mpsse: Mpsse<'static, T>,
    address: u8,
    repeated_start: bool,
}

impl<T: Transport> I2cDevice<T> {
    /// Open a device through `transport` in I2C mode.
    ///
    /// The address is validated before anything is opened.
    pub fn open(transport: T, config: &I2cConfig) -> Result<Self> {
        check_address(config.address)?;
        let params = OpenParams::new(Mode::I2c)
            .clock_rate(config.clock_rate)
            .endianness(Endianness::MsbFirst)
            .device(config.device.clone());
        let mpsse = Mpsse::open(transport, &params)?;
        Ok(Self {
            mpsse,
            address: config.address,
            repeated_start: config.repeated_start,
        })
    }

    /// Wrap an engine that is already open in I2C mode.
    pub fn from_engine(mpsse: Mpsse<'static, T>, address: u8, repeated_start: bool) -> Result<Self> {
        check_address(address)?;
        if mpsse.mode() != Mode::I2c {
            return Err(Error::InvalidMode {
                current: mpsse.mode(),
                required: Mode::I2c,
            });
        }
        Ok(Self {
            mpsse,
            address,
            repeated_start,
        })
    }

    /// 7-bit slave address.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Bus clock rate.
    pub fn clock_rate(&self) -> ClockRate {
        self.mpsse.clock()
    }

    /// Whether reads use a repeated start.
    pub fn repeated_start(&self) -> bool {
        self.repeated_start
    }

    /// The underlying engine.
    pub fn mpsse(&self) -> &Mpsse<'static, T> {
        &self.mpsse
    }

    /// The underlying engine, mutably.
    pub fn mpsse_mut(&mut self) -> &mut Mpsse<'static, T> {
        &mut self.mpsse
    }

    /// Release the engine, closing the device when dropped.
    pub fn into_mpsse(self) -> Mpsse<'static, T> {
        self.mpsse
    }

    /// Write `value` to `register`.
    ///
    /// Integer values are truncated to 8 bits; byte sequences follow the
    /// register byte unmodified. The slave's ACKs are not checked.
    pub fn write<'p>(&mut self, register: u8, value: impl Into<Payload<'p>>) -> Result<()> {
        let mut frame = vec![write_address_byte(self.address), register];
        value.into().extend_into(&mut frame);
        self.transaction(|dev| dev.mpsse.write(&frame))
    }

    /// Read `size` bytes starting at `register`.
    ///
    /// All bytes but the last are ACKed; the last is NACKed. A missing ACK
    /// for either address phase fails with [`Error::NoAckReceived`].
    pub fn read(&mut self, register: u8, size: usize) -> Result<Vec<u8>> {
        if size == 0 {
            return Err(Error::InvalidArgument("read size must be at least 1"));
        }
        self.transaction(|dev| {
            dev.mpsse
                .write(&[write_address_byte(dev.address), register])?;
            dev.ensure_ack()?;
            dev.restart()?;
            dev.mpsse.write(&[read_address_byte(dev.address)])?;
            dev.ensure_ack()?;

            let mut data = Vec::with_capacity(size);
            if size > 1 {
                dev.mpsse.send_acks()?;
                data.extend(dev.mpsse.read(size - 1)?);
            }
            dev.mpsse.send_nacks()?;
            data.extend(dev.mpsse.read(1)?);
            Ok(data)
        })
    }

    /// Read an 8-bit register.
    pub fn read8(&mut self, register: u8) -> Result<u8> {
        let data = self.read(register, 1)?;
        data.first()
            .copied()
            .ok_or(Error::InvalidArgument("empty read"))
    }

    /// Read a big-endian 16-bit register.
    pub fn read16(&mut self, register: u8) -> Result<u16> {
        match *self.read(register, 2)? {
            [first, last] => Ok(u16::from_be_bytes([first, last])),
            _ => Err(Error::InvalidArgument("short read")),
        }
    }

    /// Read the bitfield `mask` of an 8-bit register, shifted down to bit 0.
    pub fn read8_bits(&mut self, register: u8, mask: u8) -> Result<u8> {
        if mask == 0 {
            return Err(Error::InvalidArgument("mask must not be zero"));
        }
        let value = self.read8(register)? & mask;
        // The shifted value is never wider than the mask.
        right_shift_lsb(u16::from(value), u16::from(mask)).map(|v| v as u8)
    }

    /// Read the bitfield `mask` of a 16-bit register, shifted down to bit 0.
    pub fn read16_bits(&mut self, register: u8, mask: u16) -> Result<u16> {
        if mask == 0 {
            return Err(Error::InvalidArgument("mask must not be zero"));
        }
        let value = self.read16(register)? & mask;
        right_shift_lsb(value, mask)
    }

    /// ACK bit of the last written byte: 0 = ACK, 1 = NACK.
    pub fn ack(&mut self) -> Result<u8> {
        self.mpsse.ack()
    }

    /// Address the slave and report whether it acknowledged.
    ///
    /// A NACK is a normal `false`, not an error.
    pub fn ping(&mut self) -> Result<bool> {
        self.transaction(|dev| {
            dev.mpsse.write(&[write_address_byte(dev.address)])?;
            Ok(dev.mpsse.ack()? == ACK)
        })
    }

    fn ensure_ack(&mut self) -> Result<()> {
        if self.mpsse.ack()? != ACK {
            log::debug!("no ack from slave {:#04x}", self.address);
            return Err(Error::NoAckReceived);
        }
        Ok(())
    }

    fn restart(&mut self) -> Result<()> {
        if !self.repeated_start {
            self.mpsse.stop()?;
        }
        self.mpsse.start()
    }
}

impl<T: Transport> SerialProtocol for I2cDevice<T> {
    fn start(&mut self) -> Result<()> {
        self.mpsse.start()
    }

    fn stop(&mut self) -> Result<()> {
        self.mpsse.stop()
    }
}

fn check_address(address: u8) -> Result<()> {
    if address > MAX_ADDRESS {
        return Err(Error::InvalidArgument("I2C address must fit in 7 bits"));
    }
    Ok(())
}
