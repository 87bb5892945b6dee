//! Type definitions for MPSSE communication.
//!
//! These types model the chip variants and the symbolic configuration
//! options of an MPSSE channel: protocol mode, clock rate, bit order, and
//! pin levels. Every enumeration is closed; raw values that do not name a
//! variant are rejected when converted.

use std::fmt;
use std::str::FromStr;

use crate::constants::mpsse;
use crate::error::{Error, Result};

/// FTDI chip families, as far as the MPSSE engine is concerned.
///
/// Detected from the USB `bcdDevice` field when a device is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChipType {
    /// FT2232C/D/L: one MPSSE, 12 MHz master clock only.
    Ft2232C,
    /// FT2232H: two MPSSE channels.
    Ft2232H,
    /// FT4232H: MPSSE on ports A and B.
    Ft4232H,
    /// FT232H: one MPSSE channel with open-drain outputs.
    Ft232H,
    /// Any other FTDI part, identified by its `bcdDevice`.
    Other(u16),
}

impl ChipType {
    pub(crate) fn from_bcd(bcd: u16) -> Self {
        match bcd {
            0x0500 => Self::Ft2232C,
            0x0700 => Self::Ft2232H,
            0x0800 => Self::Ft4232H,
            0x0900 => Self::Ft232H,
            other => Self::Other(other),
        }
    }

    /// Hi-speed part with the 60 MHz master clock.
    #[inline]
    pub fn is_h_type(self) -> bool {
        matches!(self, Self::Ft2232H | Self::Ft4232H | Self::Ft232H)
    }

    /// Whether this chip has an MPSSE engine.
    #[inline]
    pub fn has_mpsse(self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for ChipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ft2232C => f.write_str("FT2232C"),
            Self::Ft2232H => f.write_str("FT2232H"),
            Self::Ft4232H => f.write_str("FT4232H"),
            Self::Ft232H => f.write_str("FT232H"),
            Self::Other(bcd) => write!(f, "FTDI device (bcdDevice {bcd:#06x})"),
        }
    }
}

/// Value of the SIO_SET_BITMODE request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitMode {
    /// MPSSE and bitbang off.
    #[default]
    Reset,
    /// Asynchronous bitbang on the low byte.
    BitBang,
    /// MPSSE command processor.
    Mpsse,
}

impl BitMode {
    pub(crate) fn wire_value(self) -> u8 {
        match self {
            Self::Reset => 0x00,
            Self::BitBang => 0x01,
            Self::Mpsse => 0x02,
        }
    }
}

/// Port of a multi-channel chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interface {
    /// Whatever port comes first (port A).
    #[default]
    Any,
    /// Port A.
    A,
    /// Port B.
    B,
    /// Port C (FT4232H, no MPSSE).
    C,
    /// Port D (FT4232H, no MPSSE).
    D,
}

/// USB numbers of one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InterfaceConfig {
    pub interface_num: u8,
    /// `wIndex` of vendor requests, 1-based.
    pub usb_index: u16,
    pub write_ep: u8,
    pub read_ep: u8,
}

impl Interface {
    fn port(self) -> u8 {
        match self {
            Self::Any | Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
        }
    }

    /// Endpoints are laid out in pairs: OUT 0x02, IN 0x81 for port A and so
    /// on up.
    pub(crate) fn config(self) -> InterfaceConfig {
        let port = self.port();
        InterfaceConfig {
            interface_num: port,
            usb_index: u16::from(port) + 1,
            write_ep: 0x02 + 2 * port,
            read_ep: 0x81 + 2 * port,
        }
    }
}

/// Protocol mode of an MPSSE channel.
///
/// SPI modes follow the Motorola numbering:
///
/// | Mode | CPOL | CPHA | Description |
/// |------|------|------|-------------|
/// | 0    | 0    | 0    | Clock idle low, sample on rising edge |
/// | 1    | 0    | 1    | Clock idle low, sample on falling edge |
/// | 2    | 1    | 0    | Clock idle high, sample on falling edge |
/// | 3    | 1    | 1    | Clock idle high, sample on rising edge |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// SPI, CPOL=0, CPHA=0.
    Spi0,
    /// SPI, CPOL=0, CPHA=1.
    Spi1,
    /// SPI, CPOL=1, CPHA=0.
    Spi2,
    /// SPI, CPOL=1, CPHA=1.
    Spi3,
    /// I2C master.
    I2c,
    /// GPIO only, no serial protocol.
    Gpio,
    /// Asynchronous bitbang on the whole low byte.
    Bitbang,
}

impl Mode {
    /// Whether this is one of the four SPI modes.
    pub fn is_spi(self) -> bool {
        matches!(self, Self::Spi0 | Self::Spi1 | Self::Spi2 | Self::Spi3)
    }

    /// Clock polarity: true = idle high. Only meaningful for SPI modes.
    pub fn cpol(self) -> bool {
        matches!(self, Self::Spi2 | Self::Spi3)
    }

    /// Clock phase: true = sample on second edge. Only meaningful for SPI modes.
    pub fn cpha(self) -> bool {
        matches!(self, Self::Spi1 | Self::Spi3)
    }
}

impl TryFrom<u8> for Mode {
    type Error = Error;

    /// Convert from the numeric mode values used by libmpsse (SPI0 = 1).
    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Spi0),
            2 => Ok(Self::Spi1),
            3 => Ok(Self::Spi2),
            4 => Ok(Self::Spi3),
            5 => Ok(Self::I2c),
            6 => Ok(Self::Gpio),
            7 => Ok(Self::Bitbang),
            _ => Err(Error::InvalidArgument("unknown MPSSE mode")),
        }
    }
}

/// Supported bus clock rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClockRate {
    /// 100 kHz (I2C standard mode).
    Khz100,
    /// 400 kHz (I2C fast mode).
    Khz400,
    /// 1 MHz.
    Mhz1,
    /// 2 MHz.
    Mhz2,
    /// 5 MHz.
    Mhz5,
    /// 6 MHz.
    Mhz6,
    /// 10 MHz.
    Mhz10,
    /// 12 MHz.
    Mhz12,
    /// 15 MHz.
    Mhz15,
    /// 30 MHz.
    Mhz30,
    /// 60 MHz.
    Mhz60,
}

impl ClockRate {
    /// All supported rates, slowest first.
    pub const ALL: [ClockRate; 11] = [
        Self::Khz100,
        Self::Khz400,
        Self::Mhz1,
        Self::Mhz2,
        Self::Mhz5,
        Self::Mhz6,
        Self::Mhz10,
        Self::Mhz12,
        Self::Mhz15,
        Self::Mhz30,
        Self::Mhz60,
    ];

    /// The rate in Hz.
    pub fn hz(self) -> u32 {
        match self {
            Self::Khz100 => 100_000,
            Self::Khz400 => 400_000,
            Self::Mhz1 => 1_000_000,
            Self::Mhz2 => 2_000_000,
            Self::Mhz5 => 5_000_000,
            Self::Mhz6 => 6_000_000,
            Self::Mhz10 => 10_000_000,
            Self::Mhz12 => 12_000_000,
            Self::Mhz15 => 15_000_000,
            Self::Mhz30 => 30_000_000,
            Self::Mhz60 => 60_000_000,
        }
    }
}

impl TryFrom<u32> for ClockRate {
    type Error = Error;

    fn try_from(hz: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|rate| rate.hz() == hz)
            .ok_or(Error::InvalidArgument("unsupported clock rate"))
    }
}

impl fmt::Display for ClockRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hz = self.hz();
        if hz >= 1_000_000 {
            write!(f, "{} MHz", hz / 1_000_000)
        } else {
            write!(f, "{} kHz", hz / 1_000)
        }
    }
}

/// Bit order on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endianness {
    /// Most significant bit first.
    #[default]
    MsbFirst,
    /// Least significant bit first.
    LsbFirst,
}

impl Endianness {
    /// The MPSSE shifting-command flag for this bit order.
    pub(crate) fn opcode_flag(self) -> u8 {
        match self {
            Self::MsbFirst => 0,
            Self::LsbFirst => mpsse::LSB,
        }
    }
}

/// A pin level, used for symbolic high/low arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Logic low.
    Low,
    /// Logic high.
    High,
}

impl Level {
    /// `true` for [`Level::High`].
    pub fn is_high(self) -> bool {
        self == Self::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "high" => Ok(Self::High),
            "low" => Ok(Self::Low),
            _ => Err(Error::InvalidArgument("level must be \"high\" or \"low\"")),
        }
    }
}

/// Loopback setting of the MPSSE engine (DO internally wired to DI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Loopback {
    /// Loopback on.
    Enabled,
    /// Loopback off (normal operation).
    Disabled,
}

impl FromStr for Loopback {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "enable" | "enabled" => Ok(Self::Enabled),
            "disable" | "disabled" => Ok(Self::Disabled),
            _ => Err(Error::InvalidArgument(
                "loopback must be \"enable\" or \"disable\"",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_rate_round_trips_through_hz() {
        for rate in ClockRate::ALL {
            assert_eq!(ClockRate::try_from(rate.hz()).unwrap(), rate);
        }
    }

    #[test]
    fn clock_rate_rejects_unknown_frequency() {
        assert!(matches!(
            ClockRate::try_from(123_456),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn clock_rate_display() {
        assert_eq!(ClockRate::Khz400.to_string(), "400 kHz");
        assert_eq!(ClockRate::Mhz30.to_string(), "30 MHz");
    }

    #[test]
    fn mode_from_libmpsse_numbers() {
        assert_eq!(Mode::try_from(1).unwrap(), Mode::Spi0);
        assert_eq!(Mode::try_from(5).unwrap(), Mode::I2c);
        assert_eq!(Mode::try_from(7).unwrap(), Mode::Bitbang);
        assert!(Mode::try_from(0).is_err());
        assert!(Mode::try_from(8).is_err());
    }

    #[test]
    fn spi_mode_polarity_and_phase() {
        assert!(!Mode::Spi0.cpol() && !Mode::Spi0.cpha());
        assert!(!Mode::Spi1.cpol() && Mode::Spi1.cpha());
        assert!(Mode::Spi2.cpol() && !Mode::Spi2.cpha());
        assert!(Mode::Spi3.cpol() && Mode::Spi3.cpha());
        assert!(!Mode::I2c.is_spi());
    }

    #[test]
    fn level_parses_symbols() {
        assert_eq!("high".parse::<Level>().unwrap(), Level::High);
        assert_eq!("low".parse::<Level>().unwrap(), Level::Low);
        assert!("middle".parse::<Level>().is_err());
    }

    #[test]
    fn loopback_parses_symbols() {
        assert_eq!("enable".parse::<Loopback>().unwrap(), Loopback::Enabled);
        assert_eq!("disable".parse::<Loopback>().unwrap(), Loopback::Disabled);
        assert!("on".parse::<Loopback>().is_err());
    }

    #[test]
    fn endianness_flag() {
        assert_eq!(Endianness::MsbFirst.opcode_flag(), 0);
        assert_eq!(Endianness::LsbFirst.opcode_flag(), mpsse::LSB);
    }

    #[test]
    fn chip_detection_from_bcd() {
        assert_eq!(ChipType::from_bcd(0x0700), ChipType::Ft2232H);
        assert_eq!(ChipType::from_bcd(0x0900), ChipType::Ft232H);
        assert_eq!(ChipType::from_bcd(0x0600), ChipType::Other(0x0600));
        assert!(ChipType::Ft4232H.has_mpsse());
        assert!(!ChipType::Other(0x0600).has_mpsse());
        assert!(!ChipType::Ft2232C.is_h_type());
    }

    #[test]
    fn interface_endpoints() {
        let a = Interface::Any.config();
        assert_eq!(a, Interface::A.config());
        assert_eq!((a.interface_num, a.usb_index, a.write_ep, a.read_ep), (0, 1, 0x02, 0x81));
        let d = Interface::D.config();
        assert_eq!((d.interface_num, d.usb_index, d.write_ep, d.read_ep), (3, 4, 0x08, 0x87));
    }
}
