//! Locating MPSSE chips on the USB bus.

use std::time::Duration;

use nusb::{DeviceInfo, MaybeFuture};

use crate::constants::{DEFAULT_PID, FTDI_VID};
use crate::error::{Error, Result};

/// US English, the only language FTDI string descriptors carry.
const LANG_EN_US: u16 = 0x0409;

const STRING_TIMEOUT: Duration = Duration::from_secs(1);

/// Which device an indexed open should pick.
///
/// Devices are matched on vendor and product ID, then optionally on their
/// product description and serial number strings; `index` picks among the
/// devices that remain, in bus enumeration order.
///
/// ```no_run
/// use mpsse::DeviceFilter;
///
/// let second_ft232h = DeviceFilter::new(0x0403, 0x6014).index(1);
/// let by_serial = DeviceFilter::default().serial("FT5ZQ8KA");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Expected product description string.
    pub description: Option<String>,
    /// Expected serial number string.
    pub serial: Option<String>,
    pub index: usize,
}

impl Default for DeviceFilter {
    /// The first FT2232 on the bus.
    fn default() -> Self {
        Self::new(FTDI_VID, DEFAULT_PID)
    }
}

impl DeviceFilter {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            description: None,
            serial: None,
            index: 0,
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    fn needs_strings(&self) -> bool {
        self.description.is_some() || self.serial.is_some()
    }

    /// Whether `info` passes the string checks. Opens the device briefly.
    fn strings_match(&self, info: &DeviceInfo) -> Result<bool> {
        if !self.needs_strings() {
            return Ok(true);
        }
        let device = info.open().wait()?;
        let desc = device.device_descriptor();
        let read = |index| {
            device
                .get_string_descriptor(index, LANG_EN_US, STRING_TIMEOUT)
                .wait()
                .ok()
        };

        if let Some(expected) = &self.description {
            let found = desc.product_string_index().and_then(read);
            if found.as_ref() != Some(expected) {
                return Ok(false);
            }
        }
        if let Some(expected) = &self.serial {
            let found = desc.serial_number_string_index().and_then(read);
            if found.as_ref() != Some(expected) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Every device on the bus with this vendor and product ID.
///
/// ```no_run
/// use mpsse::{constants::{pid, FTDI_VID}, find_devices};
///
/// for dev in find_devices(FTDI_VID, pid::FT232H)? {
///     println!("{:04x}:{:04x} {}", dev.vendor_id(), dev.product_id(), dev.serial_number().unwrap_or("-"));
/// }
/// # Ok::<(), mpsse::Error>(())
/// ```
pub fn find_devices(vendor: u16, product: u16) -> Result<Vec<DeviceInfo>> {
    Ok(nusb::list_devices()
        .wait()?
        .filter(|d| d.vendor_id() == vendor && d.product_id() == product)
        .collect())
}

/// The device `filter` selects.
pub fn find_device(filter: &DeviceFilter) -> Result<DeviceInfo> {
    let mut remaining = filter.index;
    for info in find_devices(filter.vendor_id, filter.product_id)? {
        if !filter.strings_match(&info)? {
            continue;
        }
        if remaining == 0 {
            return Ok(info);
        }
        remaining -= 1;
    }
    log::debug!("no device matches {filter:?}");
    Err(Error::DeviceNotFound)
}
