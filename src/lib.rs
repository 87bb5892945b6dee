//! Pure Rust SPI, I2C and GPIO host driver for FTDI MPSSE chips.
//!
//! This crate drives the Multi-Protocol Synchronous Serial Engine of the
//! FT2232C/D/H, FT4232H and FT232H from the host. It uses
//! [nusb](https://crates.io/crates/nusb) as the USB backend, so no C
//! dependencies or `libusb` are required.
//!
//! # Layers
//!
//! - [`Transport`]: the native driver surface (open/close, start/stop, byte
//!   and bit transfers, acknowledge control, pin I/O). [`NativeTransport`]
//!   implements it over USB; tests can substitute their own.
//! - [`DeviceContext`]: one opened channel and its configuration, closed
//!   when dropped.
//! - [`Mpsse`]: the engine. Checks every transport status and gates the
//!   bitbang-only calls on the configured mode.
//! - [`I2cDevice`] and [`SpiDevice`]: protocol layers, framed with
//!   [`SerialProtocol::transaction`].
//!
//! # Quick Start
//!
//! ```no_run
//! use mpsse::{I2cConfig, I2cDevice, NativeTransport};
//!
//! let mut eeprom = I2cDevice::open(NativeTransport::new(), &I2cConfig::new(0x50))?;
//! if eeprom.ping()? {
//!     let word = eeprom.read16(0x00)?;
//!     println!("{word:#06x}");
//! }
//! # Ok::<(), mpsse::Error>(())
//! ```
//!
//! # Features
//!
//! - **`embedded-hal`**: `embedded_hal::spi::SpiDevice` for [`SpiDevice`]
//!   and `embedded_hal::i2c::I2c` for an I2C-mode [`Mpsse`].

pub mod constants;
pub mod context;
pub mod device_info;
pub mod engine;
pub mod error;
pub mod ftdi;
#[cfg(feature = "embedded-hal")]
pub mod hal;
pub mod i2c;
pub mod mpsse;
pub mod serial;
pub mod spi;
pub mod transport;
pub mod types;

// ---- Convenience re-exports ----

pub use constants::FTDI_VID;
pub use context::{DeviceContext, DeviceSelector, OpenParams};
pub use device_info::{find_device, find_devices, DeviceFilter};
pub use engine::Mpsse;
pub use error::{Error, Result};
pub use ftdi::FtdiDevice;
pub use i2c::{I2cConfig, I2cDevice};
pub use mpsse::NativeTransport;
pub use serial::{Payload, SerialProtocol};
pub use spi::{SpiConfig, SpiDevice};
pub use transport::{Status, Transport};
pub use types::*;
