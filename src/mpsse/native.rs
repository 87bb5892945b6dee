//! [`Transport`] implementation on top of `nusb`.

use crate::constants::{pid, FTDI_VID, MPSSE_FAIL, MPSSE_OK, LATENCY_MS};
use crate::device_info::DeviceFilter;
use crate::error::{Error, Result};
use crate::ftdi::FtdiDevice;
use crate::transport::{Status, Transport};
use crate::types::{BitMode, ChipType, ClockRate, Endianness, Interface, Level, Mode};

use super::{gpio, i2c, spi, MpsseContext};

/// A chip the default open path looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedDevice {
    /// USB vendor ID.
    pub vendor_id: u16,
    /// USB product ID.
    pub product_id: u16,
    /// Human-readable description.
    pub description: &'static str,
}

/// Devices tried, in order, by [`Transport::open_default`].
pub const SUPPORTED_DEVICES: &[SupportedDevice] = &[
    SupportedDevice {
        vendor_id: FTDI_VID,
        product_id: pid::FT2232,
        description: "FT2232 Future Technology Devices International, Ltd",
    },
    SupportedDevice {
        vendor_id: FTDI_VID,
        product_id: pid::FT4232,
        description: "FT4232 Future Technology Devices International, Ltd",
    },
    SupportedDevice {
        vendor_id: FTDI_VID,
        product_id: pid::FT232H,
        description: "FT232H Future Technology Devices International, Ltd",
    },
];

/// An opened device plus its MPSSE state.
#[derive(Debug)]
struct Channel {
    dev: FtdiDevice,
    ctx: MpsseContext,
    description: String,
}

/// The `nusb`-backed MPSSE driver.
///
/// A fresh transport is closed; hand it to [`DeviceContext::open`],
/// [`Mpsse::open`], [`I2cDevice::open`] or [`SpiDevice::open`] which run the
/// open sequence. Failures are recorded and reported by
/// [`error_string`](Transport::error_string).
///
/// [`DeviceContext::open`]: crate::DeviceContext::open
/// [`Mpsse::open`]: crate::Mpsse::open
/// [`I2cDevice::open`]: crate::I2cDevice::open
/// [`SpiDevice::open`]: crate::SpiDevice::open
#[derive(Debug, Default)]
pub struct NativeTransport {
    channel: Option<Channel>,
    last_error: Option<String>,
}

impl NativeTransport {
    /// A closed transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// The MPSSE state of the open channel.
    pub fn mpsse_context(&self) -> Option<&MpsseContext> {
        self.channel.as_ref().map(|ch| &ch.ctx)
    }

    /// Chip type of the open channel.
    pub fn chip_type(&self) -> Option<ChipType> {
        self.channel.as_ref().map(|ch| ch.dev.chip_type())
    }

    fn open_channel(
        filter: &DeviceFilter,
        interface: Interface,
        mode: Mode,
        clock: ClockRate,
        endianness: Endianness,
    ) -> Result<Channel> {
        let mut dev = FtdiDevice::open_with_filter(filter, interface)?;
        let chip = dev.chip_type();
        let mut ctx = MpsseContext::new(chip, mode, endianness)?;

        dev.set_latency_timer(LATENCY_MS)?;
        ctx.init(&mut dev, clock)?;

        let description = SUPPORTED_DEVICES
            .iter()
            .find(|d| d.vendor_id == dev.vendor_id() && d.product_id == dev.product_id())
            .map_or_else(|| chip.to_string(), |d| d.description.to_string());

        Ok(Channel {
            dev,
            ctx,
            description,
        })
    }

    fn record(&mut self, err: Error) {
        log::debug!("MPSSE operation failed: {err}");
        self.last_error = Some(err.to_string());
    }

    /// Run `op` on the open channel, recording any failure.
    fn run<R>(&mut self, op: impl FnOnce(&mut Channel) -> Result<R>) -> Option<R> {
        let result = match self.channel.as_mut() {
            Some(ch) => op(ch),
            None => Err(Error::DeviceUnavailable),
        };
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.record(err);
                None
            }
        }
    }

    /// Like [`run`](Self::run) for operations without a result.
    fn status(&mut self, op: impl FnOnce(&mut Channel) -> Result<()>) -> Status {
        match self.run(op) {
            Some(()) => MPSSE_OK,
            None => MPSSE_FAIL,
        }
    }

    fn require_mpsse(ch: &Channel, operation: &'static str) -> Result<()> {
        if ch.ctx.mode() == Mode::Bitbang {
            return Err(Error::InvalidArgument(operation));
        }
        Ok(())
    }
}

impl Transport for NativeTransport {
    fn open_default(&mut self, mode: Mode, clock: ClockRate, endianness: Endianness) -> bool {
        let mut last = None;
        for supported in SUPPORTED_DEVICES {
            let filter = DeviceFilter::new(supported.vendor_id, supported.product_id);
            match Self::open_channel(&filter, Interface::A, mode, clock, endianness) {
                Ok(channel) => {
                    self.channel = Some(channel);
                    self.last_error = None;
                    return true;
                }
                Err(err) => {
                    log::trace!(
                        "no usable {:04x}:{:04x}: {err}",
                        supported.vendor_id,
                        supported.product_id
                    );
                    last = Some(err);
                }
            }
        }
        self.record(last.unwrap_or(Error::DeviceNotFound));
        false
    }

    fn open_indexed(
        &mut self,
        filter: &DeviceFilter,
        interface: Interface,
        mode: Mode,
        clock: ClockRate,
        endianness: Endianness,
    ) -> bool {
        match Self::open_channel(filter, interface, mode, clock, endianness) {
            Ok(channel) => {
                self.channel = Some(channel);
                self.last_error = None;
                true
            }
            Err(err) => {
                self.record(err);
                false
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut ch) = self.channel.take() {
            if let Err(err) = ch.dev.set_bitmode(0, BitMode::Reset) {
                log::debug!("bitmode reset on close failed: {err}");
            }
        }
    }

    fn usb_ids(&self) -> Option<(u16, u16)> {
        self.channel
            .as_ref()
            .map(|ch| (ch.dev.vendor_id(), ch.dev.product_id()))
    }

    fn start(&mut self) -> Status {
        self.status(|ch| {
            Self::require_mpsse(ch, "start is not available in bitbang mode")?;
            let cmd = if ch.ctx.mode() == Mode::I2c {
                i2c::start_commands(&ch.ctx)
            } else {
                spi::start_commands(&ch.ctx)
            };
            ch.dev.write_all(&cmd)?;
            ch.ctx.set_started(true);
            Ok(())
        })
    }

    fn stop(&mut self) -> Status {
        self.status(|ch| {
            Self::require_mpsse(ch, "stop is not available in bitbang mode")?;
            let cmd = if ch.ctx.mode() == Mode::I2c {
                i2c::stop_commands(&ch.ctx)
            } else {
                spi::stop_commands(&ch.ctx)
            };
            // The bus counts as stopped even if the USB write fails.
            ch.ctx.set_started(false);
            ch.dev.write_all(&cmd)
        })
    }

    fn write(&mut self, data: &[u8]) -> Status {
        self.status(|ch| match ch.ctx.mode() {
            Mode::I2c => i2c::write(&mut ch.ctx, &mut ch.dev, data),
            Mode::Bitbang => Err(Error::InvalidArgument(
                "use write_pins in bitbang mode",
            )),
            _ => spi::write(&ch.ctx, &mut ch.dev, data),
        })
    }

    fn read(&mut self, size: usize) -> Option<Vec<u8>> {
        self.run(|ch| match ch.ctx.mode() {
            Mode::I2c => i2c::read(&ch.ctx, &mut ch.dev, size),
            Mode::Bitbang => Err(Error::InvalidArgument("use read_pins in bitbang mode")),
            _ => spi::read(&ch.ctx, &mut ch.dev, size),
        })
    }

    fn read_bits(&mut self, size: u8) -> Option<u8> {
        self.run(|ch| {
            Self::require_mpsse(ch, "bit reads are not available in bitbang mode")?;
            spi::read_bits(&ch.ctx, &mut ch.dev, size)
        })
    }

    fn transfer(&mut self, data: &[u8]) -> Option<Vec<u8>> {
        self.run(|ch| spi::transfer(&ch.ctx, &mut ch.dev, data))
    }

    fn get_ack(&mut self) -> u8 {
        self.channel.as_ref().map_or(0, |ch| ch.ctx.rack())
    }

    fn set_ack(&mut self, ack: u8) {
        if let Some(ch) = self.channel.as_mut() {
            ch.ctx.set_tack(ack);
        }
    }

    fn send_acks(&mut self) {
        self.set_ack(crate::constants::ACK);
    }

    fn send_nacks(&mut self) {
        self.set_ack(crate::constants::NACK);
    }

    fn tristate(&mut self) -> Status {
        self.status(|ch| {
            // Only the FT232H can drive its outputs open-drain.
            if ch.dev.chip_type() != ChipType::Ft232H {
                return Ok(());
            }
            ch.dev.write_all(&[
                crate::constants::mpsse::DRIVE_OPEN_COLLECTOR,
                0xFF,
                0xFF,
            ])
        })
    }

    fn set_direction(&mut self, direction: u8) -> Status {
        self.status(|ch| ch.dev.set_bitmode(direction, BitMode::BitBang))
    }

    fn pin_high(&mut self, pin: u8) -> Status {
        self.status(|ch| gpio::set_pin(&mut ch.ctx, &mut ch.dev, pin, true))
    }

    fn pin_low(&mut self, pin: u8) -> Status {
        self.status(|ch| gpio::set_pin(&mut ch.ctx, &mut ch.dev, pin, false))
    }

    fn write_pins(&mut self, value: u8) -> Status {
        self.status(|ch| {
            gpio::write_bitbang(&mut ch.dev, value)?;
            ch.ctx.set_bitbang(value);
            Ok(())
        })
    }

    fn read_pins(&mut self) -> Option<u8> {
        self.run(|ch| ch.dev.read_pins())
    }

    fn pin_state(&mut self, pin: u8, state: Option<u8>) -> Option<bool> {
        self.run(|ch| gpio::pin_state(&ch.ctx, &mut ch.dev, pin, state))
    }

    fn set_loopback(&mut self, enable: bool) -> Status {
        self.status(|ch| {
            Self::require_mpsse(ch, "loopback is not available in bitbang mode")?;
            ch.ctx.set_loopback(&mut ch.dev, enable)
        })
    }

    fn set_cs_idle(&mut self, idle: Level) {
        if let Some(ch) = self.channel.as_mut() {
            ch.ctx.set_cs_idle(idle);
        }
    }

    fn description(&self) -> String {
        self.channel
            .as_ref()
            .map(|ch| ch.description.clone())
            .unwrap_or_default()
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn error_string(&self) -> String {
        match (&self.last_error, &self.channel) {
            (Some(msg), _) => msg.clone(),
            (None, None) => "device not open".to_string(),
            (None, Some(_)) => String::new(),
        }
    }
}
