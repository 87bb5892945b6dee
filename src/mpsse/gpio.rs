//! GPIO pin mapping and pin I/O.
//!
//! In the MPSSE modes twelve pins are available: GPIO 0-3 are GPIOL0-3 on
//! the low byte (ADBUS4-7) and GPIO 4-11 are GPIOH0-7 on the high byte
//! (ACBUS0-7). In bitbang mode GPIO 0-7 are the eight bits of the bitbang
//! byte.

use crate::error::{Error, Result};
use crate::ftdi::FtdiDevice;
use crate::types::Mode;

use super::MpsseContext;

/// Number of GPIOL pins on the low byte.
const NUM_GPIOL_PINS: u8 = 4;
/// Number of GPIO pins in the MPSSE modes.
const NUM_GPIO_PINS: u8 = 12;
/// Number of pins in bitbang mode.
const NUM_BITBANG_PINS: u8 = 8;

/// GPIO bank selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpioBank {
    /// Low byte GPIO (ADBUS4-7).
    Low,
    /// High byte GPIO (ACBUS0-7).
    High,
    /// The bitbang byte.
    Bitbang,
}

/// Where a GPIO pin number lives on the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinLocation {
    /// The byte holding the pin.
    pub bank: GpioBank,
    /// Bitmask of the pin within that byte.
    pub mask: u8,
}

/// Map GPIO `pin` to its bank and bitmask for `mode`.
pub fn pin_location(mode: Mode, pin: u8) -> Result<PinLocation> {
    let location = match mode {
        Mode::Bitbang if pin < NUM_BITBANG_PINS => PinLocation {
            bank: GpioBank::Bitbang,
            mask: 1 << pin,
        },
        Mode::Bitbang => return Err(Error::InvalidArgument("bitbang pin must be 0-7")),
        _ if pin < NUM_GPIOL_PINS => PinLocation {
            bank: GpioBank::Low,
            mask: 1 << (pin + NUM_GPIOL_PINS),
        },
        _ if pin < NUM_GPIO_PINS => PinLocation {
            bank: GpioBank::High,
            mask: 1 << (pin - NUM_GPIOL_PINS),
        },
        _ => return Err(Error::InvalidArgument("GPIO pin must be 0-11")),
    };
    Ok(location)
}

/// Drive GPIO `pin` high or low.
///
/// GPIOL pins share the low byte with the serial lines and can only change
/// while the bus is idle.
pub fn set_pin(ctx: &mut MpsseContext, dev: &mut FtdiDevice, pin: u8, high: bool) -> Result<()> {
    let PinLocation { bank, mask } = pin_location(ctx.mode(), pin)?;
    match bank {
        GpioBank::Bitbang => {
            ctx.set_bitbang_bit(mask, high);
            write_bitbang(dev, ctx.bitbang())
        }
        GpioBank::Low => {
            if ctx.is_started() {
                return Err(Error::InvalidArgument(
                    "GPIOL pins cannot change during a transfer",
                ));
            }
            ctx.set_low_pin_states(mask, high);
            dev.write_all(&ctx.set_bits_low(ctx.pstop()))
        }
        GpioBank::High => {
            ctx.set_gpioh_bit(mask, high);
            dev.write_all(&ctx.set_bits_high())
        }
    }
}

/// Write the whole bitbang byte.
pub fn write_bitbang(dev: &mut FtdiDevice, value: u8) -> Result<()> {
    let n = dev.write_data(&[value])?;
    if n == 0 {
        return Err(Error::WriteZero);
    }
    Ok(())
}

/// Level of GPIO `pin`.
///
/// `state` is the byte of the pin's bank if the caller already has it
/// (as returned by `read_pins` for the low byte and bitbang pins);
/// otherwise the bank is read from the device.
pub fn pin_state(
    ctx: &MpsseContext,
    dev: &mut FtdiDevice,
    pin: u8,
    state: Option<u8>,
) -> Result<bool> {
    let PinLocation { bank, mask } = pin_location(ctx.mode(), pin)?;
    let byte = match (state, bank) {
        (Some(state), _) => state,
        (None, GpioBank::High) => ctx.get_gpio_high(dev)?,
        (None, GpioBank::Low | GpioBank::Bitbang) => dev.read_pins()?,
    };
    Ok(byte & mask != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpiol_pins_map_to_upper_low_byte() {
        assert_eq!(
            pin_location(Mode::Spi0, 0).unwrap(),
            PinLocation {
                bank: GpioBank::Low,
                mask: 0x10
            }
        );
        assert_eq!(pin_location(Mode::I2c, 3).unwrap().mask, 0x80);
    }

    #[test]
    fn gpioh_pins_map_to_high_byte() {
        let loc = pin_location(Mode::Gpio, 4).unwrap();
        assert_eq!(loc.bank, GpioBank::High);
        assert_eq!(loc.mask, 0x01);
        assert_eq!(pin_location(Mode::Gpio, 11).unwrap().mask, 0x80);
    }

    #[test]
    fn bitbang_pins_map_directly() {
        let loc = pin_location(Mode::Bitbang, 5).unwrap();
        assert_eq!(loc.bank, GpioBank::Bitbang);
        assert_eq!(loc.mask, 0x20);
    }

    #[test]
    fn out_of_range_pins_rejected() {
        assert!(pin_location(Mode::Bitbang, 8).is_err());
        assert!(pin_location(Mode::Spi0, 12).is_err());
    }
}
