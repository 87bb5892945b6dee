//! `embedded-hal` 1.0 trait implementations.
//!
//! Enable the `embedded-hal` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! mpsse = { version = "0.1", features = ["embedded-hal"] }
//! ```
//!
//! # Provided implementations
//!
//! | Trait | Type | Notes |
//! |-------|------|-------|
//! | `embedded_hal::spi::SpiDevice` | [`SpiDevice`] | CS framed by `start`/`stop` |
//! | `embedded_hal::i2c::I2c` | [`Mpsse`] | Engine must be in I2C mode |
//!
//! Both traits name their entry point `transaction`, as does
//! [`SerialProtocol`]. When more than one of them is in scope, call through
//! the trait path, e.g. `embedded_hal::spi::SpiDevice::transaction(&mut dev, ops)`.

use std::time::Duration;

use embedded_hal::i2c::{self, NoAcknowledgeSource};
use embedded_hal::spi;

use crate::constants::ACK;
use crate::engine::Mpsse;
use crate::error::{Error, Result};
use crate::i2c::{read_address_byte, write_address_byte};
use crate::serial::SerialProtocol;
use crate::spi::SpiDevice;
use crate::transport::Transport;
use crate::types::Mode;

// ---- Error conversion ----

impl spi::Error for Error {
    fn kind(&self) -> spi::ErrorKind {
        // SPI has no acknowledge; nothing maps to a finer category.
        spi::ErrorKind::Other
    }
}

impl i2c::Error for Error {
    fn kind(&self) -> i2c::ErrorKind {
        match self {
            Error::NoAckReceived => i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            _ => i2c::ErrorKind::Other,
        }
    }
}

// ---- embedded-hal SPI ----

impl<T: Transport> spi::ErrorType for SpiDevice<T> {
    type Error = Error;
}

impl<T: Transport> spi::SpiDevice for SpiDevice<T> {
    fn transaction(&mut self, operations: &mut [spi::Operation<'_, u8>]) -> Result<()> {
        SerialProtocol::transaction(self, |dev| {
            for op in operations.iter_mut() {
                match op {
                    spi::Operation::Read(buf) => {
                        let data = dev.read(buf.len())?;
                        buf.copy_from_slice(&data);
                    }
                    spi::Operation::Write(buf) => dev.write(&**buf)?,
                    spi::Operation::Transfer(read, write) => {
                        let data = dev.transfer(write)?;
                        let n = read.len().min(data.len());
                        read[..n].copy_from_slice(&data[..n]);
                        // Clock in the rest of a longer read buffer.
                        if read.len() > n {
                            let rest = dev.read(read.len() - n)?;
                            read[n..].copy_from_slice(&rest);
                        }
                    }
                    spi::Operation::TransferInPlace(buf) => {
                        let data = dev.transfer(buf)?;
                        buf.copy_from_slice(&data);
                    }
                    spi::Operation::DelayNs(ns) => {
                        std::thread::sleep(Duration::from_nanos(u64::from(*ns)));
                    }
                }
            }
            Ok(())
        })
    }
}

// ---- embedded-hal I2C ----

impl<T: Transport> i2c::ErrorType for Mpsse<'_, T> {
    type Error = Error;
}

impl<T: Transport> i2c::I2c for Mpsse<'_, T> {
    fn transaction(&mut self, address: u8, operations: &mut [i2c::Operation<'_>]) -> Result<()> {
        if self.mode() != Mode::I2c {
            return Err(Error::InvalidMode {
                current: self.mode(),
                required: Mode::I2c,
            });
        }
        if address > 0x7F {
            return Err(Error::InvalidArgument("I2C address must fit in 7 bits"));
        }
        if operations.is_empty() {
            return Ok(());
        }

        SerialProtocol::transaction(self, |m| {
            let mut prev_is_read = None;
            for op in operations.iter_mut() {
                let is_read = matches!(op, i2c::Operation::Read(_));

                // Address phase on the first operation and on direction changes.
                if prev_is_read != Some(is_read) {
                    if prev_is_read.is_some() {
                        m.start()?;
                    }
                    let addr = if is_read {
                        read_address_byte(address)
                    } else {
                        write_address_byte(address)
                    };
                    m.write(&[addr])?;
                    if m.ack()? != ACK {
                        return Err(Error::NoAckReceived);
                    }
                }

                match op {
                    i2c::Operation::Read(buf) if !buf.is_empty() => {
                        let n = buf.len();
                        if n > 1 {
                            m.send_acks()?;
                            let data = m.read(n - 1)?;
                            buf[..n - 1].copy_from_slice(&data);
                        }
                        m.send_nacks()?;
                        let last = m.read(1)?;
                        buf[n - 1..].copy_from_slice(&last);
                    }
                    i2c::Operation::Read(_) => {}
                    i2c::Operation::Write(buf) => {
                        if !buf.is_empty() {
                            m.write(buf)?;
                            if m.ack()? != ACK {
                                return Err(Error::NoAckReceived);
                            }
                        }
                    }
                }

                prev_is_read = Some(is_read);
            }
            Ok(())
        })
    }
}
