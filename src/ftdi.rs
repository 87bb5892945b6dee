//! USB plumbing for one FTDI port.
//!
//! [`FtdiDevice`] claims a single interface of an MPSSE-capable chip and
//! moves the command streams built in [`crate::mpsse`] over its bulk
//! endpoints. The chip prefixes every IN packet with two modem status bytes;
//! they are dropped before any data reaches the MPSSE layer.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use nusb::transfer::{Buffer, Bulk, ControlIn, ControlOut, ControlType, In, Out, Recipient};
use nusb::{DeviceInfo, MaybeFuture};

use crate::constants::{
    SIO_READ_PINS_REQUEST, SIO_RESET_REQUEST, SIO_RESET_SIO, SIO_SET_BITMODE_REQUEST,
    SIO_SET_LATENCY_TIMER_REQUEST, SIO_TCIFLUSH, SIO_TCOFLUSH,
};
use crate::device_info::{find_device, DeviceFilter};
use crate::error::{Error, Result};
use crate::types::{BitMode, ChipType, Interface, InterfaceConfig};

/// Timeout of a single USB transfer.
const USB_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest bulk OUT transfer submitted at once.
const MAX_WRITE: usize = 65535;

/// Target size of one bulk IN request; the request itself is rounded down
/// to whole packets.
const READ_CHUNK: usize = 4096;

/// Modem status bytes at the head of every IN packet.
const STATUS_LEN: usize = 2;

/// A claimed FTDI port.
///
/// Dropping it releases the interface and closes the device.
pub struct FtdiDevice {
    // Held so the device stays open for as long as the interface is claimed.
    _device: nusb::Device,
    interface: nusb::Interface,
    port: InterfaceConfig,
    chip_type: ChipType,
    vendor_id: u16,
    product_id: u16,
    packet_size: usize,
    /// Payload received from the chip but not yet handed out.
    pending: VecDeque<u8>,
}

impl std::fmt::Debug for FtdiDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:04x}:{:04x} port {} ({} byte packets)",
            self.chip_type,
            self.vendor_id,
            self.product_id,
            self.port.interface_num,
            self.packet_size
        )
    }
}

impl FtdiDevice {
    /// Open the device selected by `filter` and claim port `iface`.
    pub fn open_with_filter(filter: &DeviceFilter, iface: Interface) -> Result<Self> {
        let info = find_device(filter)?;
        Self::open_info(&info, iface.config())
    }

    fn open_info(info: &DeviceInfo, port: InterfaceConfig) -> Result<Self> {
        let device = info.open().wait()?;
        let interface = device
            .detach_and_claim_interface(port.interface_num)
            .wait()?;

        let chip_type = ChipType::from_bcd(device.device_descriptor().device_version());
        let packet_size = bulk_packet_size(&device, port.interface_num)
            .unwrap_or(if chip_type.is_h_type() { 512 } else { 64 });

        let dev = Self {
            _device: device,
            interface,
            port,
            chip_type,
            vendor_id: info.vendor_id(),
            product_id: info.product_id(),
            packet_size,
            pending: VecDeque::new(),
        };
        dev.vendor_out(SIO_RESET_REQUEST, SIO_RESET_SIO)?;
        log::debug!("claimed {dev:?}");
        Ok(dev)
    }

    /// Detected chip family.
    pub fn chip_type(&self) -> ChipType {
        self.chip_type
    }

    /// USB vendor ID.
    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    /// USB product ID.
    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    fn vendor_out(&self, request: u8, value: u16) -> Result<()> {
        let setup = ControlOut {
            control_type: ControlType::Vendor,
            recipient: Recipient::Device,
            request,
            value,
            index: self.port.usb_index,
            data: &[],
        };
        self.interface.control_out(setup, USB_TIMEOUT).wait()?;
        Ok(())
    }

    fn vendor_in(&self, request: u8, length: u16) -> Result<Vec<u8>> {
        let setup = ControlIn {
            control_type: ControlType::Vendor,
            recipient: Recipient::Device,
            request,
            value: 0,
            index: self.port.usb_index,
            length,
        };
        Ok(self.interface.control_in(setup, USB_TIMEOUT).wait()?)
    }

    /// Purge the chip's RX and TX buffers and anything received but unread.
    pub fn flush_all(&mut self) -> Result<()> {
        self.pending.clear();
        self.vendor_out(SIO_RESET_REQUEST, SIO_TCIFLUSH)?;
        self.vendor_out(SIO_RESET_REQUEST, SIO_TCOFLUSH)
    }

    /// Set the latency timer (1-255 ms).
    pub fn set_latency_timer(&self, latency_ms: u8) -> Result<()> {
        if latency_ms == 0 {
            return Err(Error::InvalidArgument("latency must be between 1 and 255"));
        }
        self.vendor_out(SIO_SET_LATENCY_TIMER_REQUEST, u16::from(latency_ms))
    }

    /// Switch the port into `mode`; `direction` has a 1 for every output pin.
    pub fn set_bitmode(&mut self, direction: u8, mode: BitMode) -> Result<()> {
        log::trace!("bitmode {mode:?}, direction {direction:#04x}");
        let value = u16::from_le_bytes([direction, mode.wire_value()]);
        self.vendor_out(SIO_SET_BITMODE_REQUEST, value)
    }

    /// Instantaneous state of the low-byte pins.
    pub fn read_pins(&self) -> Result<u8> {
        let data = self.vendor_in(SIO_READ_PINS_REQUEST, 1)?;
        data.first().copied().ok_or(Error::DeviceUnavailable)
    }

    /// Submit one bulk OUT transfer of up to 64 KiB; returns how much the
    /// chip accepted.
    pub fn write_data(&mut self, buf: &[u8]) -> Result<usize> {
        let mut ep = self.interface.endpoint::<Bulk, Out>(self.port.write_ep)?;
        let chunk = &buf[..buf.len().min(MAX_WRITE)];
        let mut out = Buffer::new(chunk.len());
        out.extend_from_slice(chunk);
        let done = ep.transfer_blocking(out, USB_TIMEOUT);
        done.status?;
        Ok(done.actual_len)
    }

    /// Write all of `buf`.
    pub fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        log::trace!("tx {buf:02x?}");
        while !buf.is_empty() {
            match self.write_data(buf)? {
                0 => return Err(Error::WriteZero),
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }

    /// Receive exactly `len` bytes.
    ///
    /// The chip answers MPSSE read commands asynchronously, so empty packets
    /// are expected while it works. Fails with
    /// [`DeviceUnavailable`](Error::DeviceUnavailable) if the data has not
    /// arrived within the USB timeout.
    pub fn read_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        let deadline = Instant::now() + USB_TIMEOUT;
        while self.pending.len() < len {
            if Instant::now() >= deadline {
                log::debug!("read timed out with {}/{len} bytes", self.pending.len());
                return Err(Error::DeviceUnavailable);
            }
            self.receive()?;
        }
        let data: Vec<u8> = self.pending.drain(..len).collect();
        log::trace!("rx {data:02x?}");
        Ok(data)
    }

    /// One bulk IN transfer, payload appended to `pending`.
    fn receive(&mut self) -> Result<()> {
        let mut ep = self.interface.endpoint::<Bulk, In>(self.port.read_ep)?;
        let request = read_request_len(self.packet_size);
        let done = ep.transfer_blocking(Buffer::new(request), USB_TIMEOUT);
        done.status?;
        let raw = done.buffer.into_vec();
        let len = done.actual_len.min(raw.len());
        self.pending.extend(payload(&raw[..len], self.packet_size));
        Ok(())
    }
}

/// Length of a bulk IN request: a nonzero multiple of the packet size.
fn read_request_len(packet_size: usize) -> usize {
    let packet_size = packet_size.max(1);
    (READ_CHUNK / packet_size).max(1) * packet_size
}

/// Payload bytes of a bulk IN transfer, skipping each packet's status header.
fn payload(raw: &[u8], packet_size: usize) -> impl Iterator<Item = u8> + '_ {
    raw.chunks(packet_size)
        .flat_map(|packet| packet.get(STATUS_LEN..).unwrap_or_default())
        .copied()
}

/// `wMaxPacketSize` of the port's first endpoint, if the descriptor says.
fn bulk_packet_size(device: &nusb::Device, interface_num: u8) -> Option<usize> {
    let config = device.active_configuration().ok()?;
    for group in config.interfaces() {
        if group.interface_number() != interface_num {
            continue;
        }
        let size = group
            .alt_settings()
            .find_map(|alt| alt.endpoints().next().map(|ep| ep.max_packet_size()))
            .filter(|&size| size > 0);
        if size.is_some() {
            return size;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(raw: &[u8], packet_size: usize) -> Vec<u8> {
        payload(raw, packet_size).collect()
    }

    #[test]
    fn read_requests_are_whole_packets() {
        assert_eq!(read_request_len(64), 4096);
        assert_eq!(read_request_len(512), 4096);
        assert_eq!(read_request_len(1000), 4000);
        assert_eq!(read_request_len(8192), 8192);
        for size in [64, 512, 1000, 8192] {
            let len = read_request_len(size);
            assert!(len > 0);
            assert_eq!(len % size, 0);
        }
    }

    #[test]
    fn status_only_transfer_has_no_payload() {
        assert!(strip(&[0x32, 0x60], 64).is_empty());
        assert!(strip(&[], 64).is_empty());
    }

    #[test]
    fn header_removed_from_every_packet() {
        let raw = [0x32, 0x60, 1, 2, 3, 0x32, 0x60, 4, 5, 6, 0x32, 0x60, 7];
        assert_eq!(strip(&raw, 5), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn trailing_status_packet_is_dropped() {
        let raw = [0x32, 0x60, 0xAA, 0xBB, 0x32, 0x60];
        assert_eq!(strip(&raw, 4), vec![0xAA, 0xBB]);
    }

    #[test]
    fn short_final_packet_keeps_its_payload() {
        let mut raw = vec![0x32, 0x60];
        raw.extend(0..62u8);
        raw.extend([0x32, 0x60, 0xFE]);
        let data = strip(&raw, 64);
        assert_eq!(data.len(), 63);
        assert_eq!(data[61], 61);
        assert_eq!(data[62], 0xFE);
    }
}
