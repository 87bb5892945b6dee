//! Native MPSSE command layer.
//!
//! [`MpsseContext`] tracks the pin states and shifting opcodes of one channel
//! configured for a [`Mode`]; the `i2c`, `spi` and `gpio` submodules build the
//! command streams for each protocol on top of it. [`NativeTransport`] ties
//! them to an [`FtdiDevice`] and implements [`Transport`](crate::Transport).

pub mod gpio;
pub mod i2c;
mod native;
pub mod spi;

pub use native::{NativeTransport, SupportedDevice, SUPPORTED_DEVICES};

use std::time::Duration;

use crate::constants::{mpsse, pins, ACK, NACK};
use crate::error::{Error, Result};
use crate::ftdi::FtdiDevice;
use crate::types::{BitMode, ChipType, ClockRate, Endianness, Level, Mode};

/// Master clock with the divide-by-5 prescaler disabled (H-type only).
const MASTER_CLOCK_60MHZ: u32 = 60_000_000;
/// Master clock with the divide-by-5 prescaler enabled.
const MASTER_CLOCK_12MHZ: u32 = 12_000_000;
/// Highest frequency reachable from the 12 MHz master clock.
const SIX_MHZ: u32 = 6_000_000;

/// Time the chip needs after switching into MPSSE mode.
const SETUP_DELAY: Duration = Duration::from_millis(50);

/// Compute the clock commands for `hz`.
///
/// Returns the command bytes and the frequency the divisor actually yields.
/// The divisor is `((master / hz) / 2) - 1`, saturating at zero, so rates
/// above half the master clock run at the ceiling.
pub fn clock_commands(is_h_type: bool, hz: u32) -> (Vec<u8>, u32) {
    let mut cmd = Vec::with_capacity(4);
    let master = if is_h_type && hz > SIX_MHZ {
        cmd.push(mpsse::DIS_DIV_5);
        MASTER_CLOCK_60MHZ
    } else {
        if is_h_type {
            cmd.push(mpsse::EN_DIV_5);
        }
        MASTER_CLOCK_12MHZ
    };

    let divisor = ((master / hz.max(1)) / 2).saturating_sub(1).min(0xFFFF);
    cmd.extend_from_slice(&[mpsse::TCK_DIVISOR, divisor as u8, (divisor >> 8) as u8]);

    (cmd, master / ((1 + divisor) * 2))
}

/// Pin states and shifting opcodes of one configured channel.
#[derive(Debug, Clone)]
pub struct MpsseContext {
    mode: Mode,
    endianness: Endianness,
    is_h_type: bool,
    clock_hz: u32,
    /// Low byte while the bus is idle.
    pidle: u8,
    /// Low byte during a transfer.
    pstart: u8,
    /// Low byte that produces the stop condition.
    pstop: u8,
    /// Low byte direction.
    tris: u8,
    /// High byte value.
    gpioh: u8,
    /// High byte direction.
    trish: u8,
    /// Bitbang output byte.
    bitbang: u8,
    tx: u8,
    rx: u8,
    txrx: u8,
    /// Bit pattern driven after each byte read in I2C mode.
    tack: u8,
    /// ACK bit sampled after the last byte written in I2C mode.
    rack: u8,
    started: bool,
}

impl MpsseContext {
    /// Compute the pin states and opcodes for `mode` on `chip`.
    ///
    /// Nothing is sent to the device.
    pub fn new(chip: ChipType, mode: Mode, endianness: Endianness) -> Result<Self> {
        if !chip.has_mpsse() {
            return Err(Error::UnsupportedChip(chip));
        }
        if mode == Mode::I2c && !chip.is_h_type() {
            // I2C relies on 3-phase clocking.
            return Err(Error::UnsupportedChip(chip));
        }

        let flag = endianness.opcode_flag();
        let mut ctx = Self {
            mode,
            endianness,
            is_h_type: chip.is_h_type(),
            clock_hz: 0,
            pidle: pins::DEFAULT_PORT,
            pstart: pins::DEFAULT_PORT & !pins::CS,
            pstop: pins::DEFAULT_PORT,
            tris: pins::DEFAULT_TRIS,
            gpioh: 0x00,
            trish: 0xFF,
            bitbang: 0x00,
            tx: mpsse::DO_WRITE | flag,
            rx: mpsse::DO_READ | flag,
            txrx: mpsse::DO_WRITE | mpsse::DO_READ | flag,
            tack: 0x00,
            rack: ACK,
            started: false,
        };

        match mode {
            Mode::Spi0 => {
                ctx.clear_sk_all();
                ctx.write_on_falling_edge();
            }
            Mode::Spi3 => {
                ctx.pidle |= pins::SK;
                ctx.pstart |= pins::SK;
                // Clock stays low while CS rises so no extra bit is clocked.
                ctx.pstop &= !pins::SK;
                ctx.write_on_falling_edge();
            }
            Mode::Spi1 => {
                ctx.pidle &= !pins::SK;
                ctx.pstart &= !pins::SK;
                // Clock stays high while CS rises so no extra bit is clocked.
                ctx.pstop |= pins::SK;
                ctx.read_on_falling_edge();
            }
            Mode::Spi2 => {
                ctx.pidle |= pins::SK;
                ctx.pstart |= pins::SK;
                ctx.pstop |= pins::SK;
                ctx.read_on_falling_edge();
            }
            Mode::I2c => {
                ctx.tx |= mpsse::WRITE_NEG;
                ctx.rx &= !mpsse::READ_NEG;
                ctx.pidle |= pins::DO | pins::DI;
                // Start: SDA falls while SCL is high.
                ctx.pstart &= !(pins::DO | pins::DI);
                // Stop: SDA rises from here into the idle state.
                ctx.pstop &= !(pins::DO | pins::DI);
            }
            Mode::Gpio | Mode::Bitbang => {}
        }

        Ok(ctx)
    }

    fn clear_sk_all(&mut self) {
        self.pidle &= !pins::SK;
        self.pstart &= !pins::SK;
        self.pstop &= !pins::SK;
    }

    fn write_on_falling_edge(&mut self) {
        self.tx |= mpsse::WRITE_NEG;
        self.rx &= !mpsse::READ_NEG;
        self.txrx |= mpsse::WRITE_NEG;
        self.txrx &= !mpsse::READ_NEG;
    }

    fn read_on_falling_edge(&mut self) {
        self.tx &= !mpsse::WRITE_NEG;
        self.rx |= mpsse::READ_NEG;
        self.txrx |= mpsse::READ_NEG;
        self.txrx &= !mpsse::WRITE_NEG;
    }

    /// Commands that configure the engine for the mode, ending with the
    /// idle pin states of both bytes.
    pub fn setup_commands(&self) -> Vec<u8> {
        let mut cmd = Vec::with_capacity(12);
        cmd.push(mpsse::LOOPBACK_END);
        if self.is_h_type {
            cmd.push(mpsse::DIS_ADAPTIVE);
            cmd.push(if self.mode == Mode::I2c {
                mpsse::EN_3_PHASE
            } else {
                mpsse::DIS_3_PHASE
            });
        }
        cmd.extend_from_slice(&[mpsse::SET_BITS_LOW, self.pidle, self.tris]);
        cmd.extend_from_slice(&[mpsse::SET_BITS_HIGH, self.gpioh, self.trish]);
        cmd
    }

    /// Put the device into the configured mode at `clock`.
    ///
    /// Bitbang mode sets all eight pins as outputs and skips the MPSSE
    /// configuration entirely.
    pub fn init(&mut self, dev: &mut FtdiDevice, clock: ClockRate) -> Result<()> {
        dev.set_bitmode(0, BitMode::Reset)?;
        dev.flush_all()?;

        if self.mode == Mode::Bitbang {
            dev.set_bitmode(0xFF, BitMode::BitBang)?;
            self.clock_hz = clock.hz();
            return Ok(());
        }

        dev.set_bitmode(0, BitMode::Mpsse)?;
        std::thread::sleep(SETUP_DELAY);

        let (mut cmd, actual) = clock_commands(self.is_h_type, clock.hz());
        cmd.extend(self.setup_commands());
        dev.write_all(&cmd)?;
        self.clock_hz = actual;
        log::debug!("MPSSE {:?} at {} Hz (requested {})", self.mode, actual, clock);

        // Discard anything the engine echoed while being configured.
        dev.flush_all()
    }

    /// Configured mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Configured bit order.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Clock frequency the divisor yields, in Hz.
    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    /// Whether the chip is an H-type.
    pub fn is_h_type(&self) -> bool {
        self.is_h_type
    }

    /// Whether a start was issued without a matching stop.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Low byte idle state.
    pub fn pidle(&self) -> u8 {
        self.pidle
    }

    /// Low byte transfer state.
    pub fn pstart(&self) -> u8 {
        self.pstart
    }

    /// Low byte stop state.
    pub fn pstop(&self) -> u8 {
        self.pstop
    }

    /// Low byte direction.
    pub fn tris(&self) -> u8 {
        self.tris
    }

    /// Write opcode.
    pub fn tx(&self) -> u8 {
        self.tx
    }

    /// Read opcode.
    pub fn rx(&self) -> u8 {
        self.rx
    }

    /// Full-duplex opcode.
    pub fn txrx(&self) -> u8 {
        self.txrx
    }

    /// ACK sampled after the last I2C byte written.
    pub fn rack(&self) -> u8 {
        self.rack
    }

    pub(crate) fn set_rack(&mut self, ack: u8) {
        self.rack = ack & 0x01;
    }

    /// ACK bit (0 or 1) sent after each read byte.
    pub fn tack(&self) -> u8 {
        if self.tack == 0 {
            ACK
        } else {
            NACK
        }
    }

    /// Set the ACK bit sent after each read byte.
    pub fn set_tack(&mut self, ack: u8) {
        self.tack = if ack == NACK { 0xFF } else { 0x00 };
    }

    pub(crate) fn tack_pattern(&self) -> u8 {
        self.tack
    }

    pub(crate) fn set_started(&mut self, started: bool) {
        self.started = started;
    }

    /// Set the chip-select level held while idle. The start state drives the
    /// opposite level.
    pub fn set_cs_idle(&mut self, idle: Level) {
        if idle.is_high() {
            self.pidle |= pins::CS;
            self.pstop |= pins::CS;
            self.pstart &= !pins::CS;
        } else {
            self.pidle &= !pins::CS;
            self.pstop &= !pins::CS;
            self.pstart |= pins::CS;
        }
    }

    /// Set or clear `mask` in all three low-byte states.
    pub(crate) fn set_low_pin_states(&mut self, mask: u8, high: bool) {
        for state in [&mut self.pidle, &mut self.pstart, &mut self.pstop] {
            if high {
                *state |= mask;
            } else {
                *state &= !mask;
            }
        }
    }

    pub(crate) fn set_gpioh_bit(&mut self, mask: u8, high: bool) {
        if high {
            self.gpioh |= mask;
        } else {
            self.gpioh &= !mask;
        }
    }

    /// High byte value.
    pub fn gpioh(&self) -> u8 {
        self.gpioh
    }

    pub(crate) fn set_bitbang_bit(&mut self, mask: u8, high: bool) {
        if high {
            self.bitbang |= mask;
        } else {
            self.bitbang &= !mask;
        }
    }

    /// Bitbang output byte.
    pub fn bitbang(&self) -> u8 {
        self.bitbang
    }

    pub(crate) fn set_bitbang(&mut self, value: u8) {
        self.bitbang = value;
    }

    /// `SET_BITS_LOW` command driving `value` with the current direction.
    pub fn set_bits_low(&self, value: u8) -> [u8; 3] {
        [mpsse::SET_BITS_LOW, value, self.tris]
    }

    /// `SET_BITS_HIGH` command for the current high byte.
    pub fn set_bits_high(&self) -> [u8; 3] {
        [mpsse::SET_BITS_HIGH, self.gpioh, self.trish]
    }

    /// Read the high byte pins.
    pub fn get_gpio_high(&self, dev: &mut FtdiDevice) -> Result<u8> {
        dev.write_all(&[mpsse::GET_BITS_HIGH, mpsse::SEND_IMMEDIATE])?;
        let data = dev.read_exact(1)?;
        data.first().copied().ok_or(Error::DeviceUnavailable)
    }

    /// Enable or disable internal loopback.
    pub fn set_loopback(&self, dev: &mut FtdiDevice, enable: bool) -> Result<()> {
        let cmd = if enable {
            mpsse::LOOPBACK_START
        } else {
            mpsse::LOOPBACK_END
        };
        dev.write_all(&[cmd])
    }
}
