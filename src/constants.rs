//! USB identifiers, status values, and MPSSE opcodes.

/// FTDI's USB vendor ID.
pub const FTDI_VID: u16 = 0x0403;

/// Product IDs of the MPSSE-capable chips.
pub mod pid {
    /// FT2232C/D/H.
    pub const FT2232: u16 = 0x6010;
    /// FT4232H.
    pub const FT4232: u16 = 0x6011;
    /// FT232H.
    pub const FT232H: u16 = 0x6014;
}

/// Product ID used by an indexed open when none is given.
pub const DEFAULT_PID: u16 = pid::FT2232;

/// Status returned by a transport call that succeeded.
pub const MPSSE_OK: i32 = 0;
/// Status returned by a transport call that failed.
pub const MPSSE_FAIL: i32 = -1;

/// ACK bit value (SDA pulled low by the receiver).
pub const ACK: u8 = 0;
/// NACK bit value (SDA left high by the receiver).
pub const NACK: u8 = 1;

// ---- USB vendor requests ----

pub(crate) const SIO_RESET_REQUEST: u8 = 0x00;
pub(crate) const SIO_SET_LATENCY_TIMER_REQUEST: u8 = 0x09;
pub(crate) const SIO_SET_BITMODE_REQUEST: u8 = 0x0B;
pub(crate) const SIO_READ_PINS_REQUEST: u8 = 0x0C;

/// `wValue`s of SIO_RESET_REQUEST.
pub(crate) const SIO_RESET_SIO: u16 = 0;
pub(crate) const SIO_TCOFLUSH: u16 = 1;
pub(crate) const SIO_TCIFLUSH: u16 = 2;

/// Latency timer programmed on open, in milliseconds.
pub(crate) const LATENCY_MS: u8 = 2;

/// MPSSE command opcodes.
///
/// Data shifting opcodes are built by OR-ing the flag bits below; the rest
/// are complete commands.
pub mod mpsse {
    /// Clock data out on the falling edge of SK.
    pub const WRITE_NEG: u8 = 0x01;
    /// Length is in bits rather than bytes.
    pub const BITMODE: u8 = 0x02;
    /// Sample DI on the falling edge of SK.
    pub const READ_NEG: u8 = 0x04;
    /// Shift least significant bit first.
    pub const LSB: u8 = 0x08;
    /// Drive DO.
    pub const DO_WRITE: u8 = 0x10;
    /// Sample DI.
    pub const DO_READ: u8 = 0x20;

    /// Set value and direction of ADBUS0-7.
    pub const SET_BITS_LOW: u8 = 0x80;
    /// Set value and direction of ACBUS0-7.
    pub const SET_BITS_HIGH: u8 = 0x82;
    /// Read ACBUS0-7.
    pub const GET_BITS_HIGH: u8 = 0x83;
    /// Wire DO to DI internally.
    pub const LOOPBACK_START: u8 = 0x84;
    pub const LOOPBACK_END: u8 = 0x85;
    /// Followed by the 16-bit little-endian clock divisor.
    pub const TCK_DIVISOR: u8 = 0x86;
    /// Flush the chip's read buffer to the host now.
    pub const SEND_IMMEDIATE: u8 = 0x87;

    // Hi-speed parts only.
    /// 60 MHz master clock.
    pub const DIS_DIV_5: u8 = 0x8A;
    /// 12 MHz master clock.
    pub const EN_DIV_5: u8 = 0x8B;
    /// Data valid on both edges (I2C).
    pub const EN_3_PHASE: u8 = 0x8C;
    pub const DIS_3_PHASE: u8 = 0x8D;
    pub const DIS_ADAPTIVE: u8 = 0x97;
    /// Open-drain outputs, FT232H only. Followed by the low and high byte masks.
    pub const DRIVE_OPEN_COLLECTOR: u8 = 0x9E;
}

/// ADBUS masks in the MPSSE modes.
pub mod pins {
    pub const SK: u8 = 0x01;
    pub const DO: u8 = 0x02;
    pub const DI: u8 = 0x04;
    pub const CS: u8 = 0x08;
    /// GPIOL0-3.
    pub const GPIO_LOW: u8 = 0xF0;

    /// Everything but DI is an output.
    pub const DEFAULT_TRIS: u8 = SK | DO | CS | GPIO_LOW;
    /// Idle state: SK and CS high.
    pub const DEFAULT_PORT: u8 = SK | CS;
}
