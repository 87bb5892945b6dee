//! Opened MPSSE channels and their open parameters.
//!
//! A [`DeviceContext`] owns one [`Transport`] after its open sequence has run,
//! together with the configuration that was negotiated. The context closes
//! the transport when dropped. An engine either owns a context outright or
//! borrows one; only the owner ever releases it.

use crate::constants::{DEFAULT_PID, FTDI_VID};
use crate::device_info::DeviceFilter;
use crate::transport::Transport;
use crate::types::{ClockRate, Endianness, Interface, Mode};

/// Selects which physical device to open.
///
/// Every field is optional. When none is set the transport's default open
/// path is used; otherwise the indexed path scans for the Nth device
/// matching vendor/product (defaults `0x0403`/`0x6010`) on the given
/// interface.
///
/// # Example
///
/// ```
/// use mpsse::{DeviceSelector, Interface};
///
/// let selector = DeviceSelector::new()
///     .product_id(0x6014)
///     .interface(Interface::A)
///     .index(1);
/// assert!(!selector.is_default());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSelector {
    /// USB vendor ID.
    pub vendor_id: Option<u16>,
    /// USB product ID.
    pub product_id: Option<u16>,
    /// Chip interface (port).
    pub interface: Option<Interface>,
    /// Index among matching devices (0-based).
    pub index: Option<usize>,
    /// USB product description string.
    pub description: Option<String>,
    /// USB serial number string.
    pub serial: Option<String>,
}

impl DeviceSelector {
    /// An empty selector (default device).
    pub fn new() -> Self {
        Self::default()
    }

    /// Require this vendor ID.
    pub fn vendor_id(mut self, vid: u16) -> Self {
        self.vendor_id = Some(vid);
        self
    }

    /// Require this product ID.
    pub fn product_id(mut self, pid: u16) -> Self {
        self.product_id = Some(pid);
        self
    }

    /// Use this interface of a multi-port chip.
    pub fn interface(mut self, interface: Interface) -> Self {
        self.interface = Some(interface);
        self
    }

    /// Select the Nth matching device.
    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Require the product description to match.
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Require the serial number to match.
    pub fn serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// `true` when no field is set.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Resolve into a device filter and interface, filling in defaults.
    pub fn resolve(&self) -> (DeviceFilter, Interface) {
        let filter = DeviceFilter {
            vendor_id: self.vendor_id.unwrap_or(FTDI_VID),
            product_id: self.product_id.unwrap_or(DEFAULT_PID),
            description: self.description.clone(),
            serial: self.serial.clone(),
            index: self.index.unwrap_or(0),
        };
        (filter, self.interface.unwrap_or_default())
    }
}

/// Parameters for opening an MPSSE channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenParams {
    /// Protocol mode.
    pub mode: Mode,
    /// Bus clock rate.
    pub clock_rate: ClockRate,
    /// Bit order.
    pub endianness: Endianness,
    /// Physical device selection.
    pub device: DeviceSelector,
}

impl OpenParams {
    /// Parameters for `mode` at 400 kHz, MSB first, default device.
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            clock_rate: ClockRate::Khz400,
            endianness: Endianness::MsbFirst,
            device: DeviceSelector::default(),
        }
    }

    /// Set the clock rate.
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

/// One opened hardware channel plus its negotiated configuration.
///
/// Created by [`DeviceContext::open`]. `is_open()` is `false` when the open
/// sequence failed; engines refuse such contexts. The transport is closed
/// exactly once, either by [`close`](Self::close) or on drop.
#[derive(Debug)]
pub struct DeviceContext<T: Transport> {
    transport: T,
    mode: Mode,
    clock_rate: ClockRate,
    endianness: Endianness,
    vendor_id: u16,
    product_id: u16,
    interface: Interface,
    open: bool,
}

impl<T: Transport> DeviceContext<T> {
    /// Run the open sequence on `transport`.
    pub fn open(mut transport: T, params: &OpenParams) -> Self {
        let (filter, interface) = params.device.resolve();

        let open = if params.device.is_default() {
            transport.open_default(params.mode, params.clock_rate, params.endianness)
        } else {
            transport.open_indexed(
                &filter,
                interface,
                params.mode,
                params.clock_rate,
                params.endianness,
            )
        };

        let (vendor_id, product_id) = transport
            .usb_ids()
            .unwrap_or((filter.vendor_id, filter.product_id));

        if open {
            log::debug!(
                "opened {:04x}:{:04x} {:?} in {:?} at {}",
                vendor_id,
                product_id,
                interface,
                params.mode,
                params.clock_rate
            );
        } else {
            log::debug!("failed to open device: {}", transport.error_string());
        }

        Self {
            transport,
            mode: params.mode,
            clock_rate: params.clock_rate,
            endianness: params.endianness,
            vendor_id,
            product_id,
            interface,
            open,
        }
    }

    /// Whether the open sequence succeeded and the context is not closed.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Protocol mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Clock rate the channel was opened with.
    pub fn clock_rate(&self) -> ClockRate {
        self.clock_rate
    }

    /// Bit order.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// USB vendor ID of the opened device.
    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    /// USB product ID of the opened device.
    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    /// Interface (port) of the opened device.
    pub fn interface(&self) -> Interface {
        self.interface
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the device. Later calls are no-ops.
    pub fn close(&mut self) {
        if self.open {
            log::debug!("closing {:04x}:{:04x}", self.vendor_id, self.product_id);
            self.transport.close();
            self.open = false;
        }
    }
}

impl<T: Transport> Drop for DeviceContext<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selector_is_default() {
        assert!(DeviceSelector::new().is_default());
        assert!(!DeviceSelector::new().index(0).is_default());
    }

    #[test]
    fn resolve_fills_in_defaults() {
        let (filter, iface) = DeviceSelector::new().index(3).resolve();
        assert_eq!(filter.vendor_id, 0x0403);
        assert_eq!(filter.product_id, 0x6010);
        assert_eq!(filter.index, 3);
        assert_eq!(iface, Interface::Any);
    }

    #[test]
    fn resolve_keeps_explicit_fields() {
        let (filter, iface) = DeviceSelector::new()
            .vendor_id(0x1234)
            .product_id(0x5678)
            .interface(Interface::B)
            .serial("ABC")
            .resolve();
        assert_eq!(filter.vendor_id, 0x1234);
        assert_eq!(filter.product_id, 0x5678);
        assert_eq!(filter.serial.as_deref(), Some("ABC"));
        assert_eq!(filter.index, 0);
        assert_eq!(iface, Interface::B);
    }

    #[test]
    fn open_params_builder() {
        let params = OpenParams::new(Mode::Spi3)
            .clock_rate(ClockRate::Mhz10)
            .endianness(Endianness::LsbFirst);
        assert_eq!(params.mode, Mode::Spi3);
        assert_eq!(params.clock_rate, ClockRate::Mhz10);
        assert_eq!(params.endianness, Endianness::LsbFirst);
        assert!(params.device.is_default());
    }
}
