//! SPI command streams.
//!
//! Chip select is driven through the low-byte pin states of the
//! [`MpsseContext`]: `start` applies the transfer state, `stop` the stop and
//! idle states. Data commands never touch CS, so several reads and writes
//! can share one selection.
//!
//! # Pin Mapping
//!
//! | FTDI Pin | SPI Signal | ADBUS Bit |
//! |----------|-----------|-----------|
//! | SK       | SCLK      | 0         |
//! | DO       | MOSI      | 1         |
//! | DI       | MISO      | 2         |
//! | CS       | CS        | 3         |

use crate::constants::{mpsse, pins};
use crate::error::{Error, Result};
use crate::ftdi::FtdiDevice;
use crate::types::{Endianness, Mode};

use super::MpsseContext;

/// Maximum bytes per single MPSSE transfer command (2-byte length field, encoding len-1).
const MAX_MPSSE_TRANSFER: usize = 65536;

/// Encode a chunk length into the 2-byte MPSSE length field (len-1, little-endian).
#[inline]
fn encode_len(len: usize) -> (u8, u8) {
    let v = (len - 1) as u16;
    (v as u8, (v >> 8) as u8)
}

/// Emit `opcode` for `len` bytes, splitting into chunks as needed. When
/// `data` is given it follows each chunk header.
fn push_blocks(cmd: &mut Vec<u8>, opcode: u8, len: usize, data: Option<&[u8]>) {
    let mut offset = 0;
    while offset < len {
        let chunk_len = (len - offset).min(MAX_MPSSE_TRANSFER);
        let (lo, hi) = encode_len(chunk_len);
        cmd.extend_from_slice(&[opcode, lo, hi]);
        if let Some(data) = data {
            cmd.extend_from_slice(&data[offset..offset + chunk_len]);
        }
        offset += chunk_len;
    }
}

/// Assert chip select.
///
/// SPI1 and SPI3 additionally move the clock to the level the first data
/// edge starts from, which avoids a glitch on the FT2232.
pub fn start_commands(ctx: &MpsseContext) -> Vec<u8> {
    let mut cmd = Vec::with_capacity(6);
    cmd.extend_from_slice(&ctx.set_bits_low(ctx.pstart()));
    match ctx.mode() {
        Mode::Spi3 => cmd.extend_from_slice(&ctx.set_bits_low(ctx.pstart() & !pins::SK)),
        Mode::Spi1 => cmd.extend_from_slice(&ctx.set_bits_low(ctx.pstart() | pins::SK)),
        _ => {}
    }
    cmd
}

/// Deassert chip select and return the pins to idle.
pub fn stop_commands(ctx: &MpsseContext) -> Vec<u8> {
    let mut cmd = Vec::with_capacity(6);
    cmd.extend_from_slice(&ctx.set_bits_low(ctx.pstop()));
    cmd.extend_from_slice(&ctx.set_bits_low(ctx.pidle()));
    cmd
}

/// Commands that clock out `data`.
pub fn write_commands(ctx: &MpsseContext, data: &[u8]) -> Vec<u8> {
    let mut cmd = Vec::with_capacity(data.len() + 3);
    push_blocks(&mut cmd, ctx.tx(), data.len(), Some(data));
    cmd
}

/// Commands that clock in `len` bytes.
pub fn read_commands(ctx: &MpsseContext, len: usize) -> Vec<u8> {
    let mut cmd = Vec::with_capacity(4);
    push_blocks(&mut cmd, ctx.rx(), len, None);
    cmd.push(mpsse::SEND_IMMEDIATE);
    cmd
}

/// Commands for a full-duplex transfer of `data`.
pub fn transfer_commands(ctx: &MpsseContext, data: &[u8]) -> Vec<u8> {
    let mut cmd = Vec::with_capacity(data.len() + 4);
    push_blocks(&mut cmd, ctx.txrx(), data.len(), Some(data));
    cmd.push(mpsse::SEND_IMMEDIATE);
    cmd
}

/// Clock out `data`.
pub fn write(ctx: &MpsseContext, dev: &mut FtdiDevice, data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    dev.write_all(&write_commands(ctx, data))
}

/// Clock in exactly `len` bytes.
pub fn read(ctx: &MpsseContext, dev: &mut FtdiDevice, len: usize) -> Result<Vec<u8>> {
    if len == 0 {
        return Ok(Vec::new());
    }
    dev.write_all(&read_commands(ctx, len))?;
    dev.read_exact(len)
}

/// Full-duplex transfer; returns as many bytes as were written.
pub fn transfer(ctx: &MpsseContext, dev: &mut FtdiDevice, data: &[u8]) -> Result<Vec<u8>> {
    if !ctx.mode().is_spi() {
        return Err(Error::InvalidMode {
            current: ctx.mode(),
            required: Mode::Spi0,
        });
    }
    if data.is_empty() {
        return Ok(Vec::new());
    }
    dev.write_all(&transfer_commands(ctx, data))?;
    dev.read_exact(data.len())
}

/// Clock in `size` (1-8) bits.
///
/// Bits shift in at the LSB for MSB-first order and at the MSB for LSB-first
/// order; the result is aligned so the bits read occupy the low bits.
pub fn read_bits(ctx: &MpsseContext, dev: &mut FtdiDevice, size: u8) -> Result<u8> {
    if !(1..=8).contains(&size) {
        return Err(Error::InvalidArgument("bit count must be between 1 and 8"));
    }
    dev.write_all(&[ctx.rx() | mpsse::BITMODE, size - 1, mpsse::SEND_IMMEDIATE])?;
    let data = dev.read_exact(1)?;
    let raw = data.first().copied().ok_or(Error::DeviceUnavailable)?;
    Ok(align_bits(raw, size, ctx.endianness()))
}

fn align_bits(raw: u8, size: u8, endianness: Endianness) -> u8 {
    match endianness {
        Endianness::MsbFirst => raw,
        Endianness::LsbFirst => raw >> (8 - size),
    }
}
