//! I2C command streams.
//!
//! I2C is clocked with 3-phase data clocking, so it needs an H-type chip
//! (FT2232H, FT4232H, FT232H). Open-drain behaviour comes from switching DO
//! between output (drive SDA low) and input (release SDA) around each
//! acknowledge bit.
//!
//! # Pin Mapping
//!
//! | FTDI Pin | I2C Signal | ADBUS Bit |
//! |----------|-----------|-----------|
//! | SK       | SCL       | 0         |
//! | DO/DI    | SDA       | 1 & 2     |
//!
//! SDA requires DO (ADBUS1) and DI (ADBUS2) to be connected together
//! externally, with a pull-up resistor.

use crate::constants::{mpsse, pins};
use crate::error::{Error, Result};
use crate::ftdi::FtdiDevice;

use super::MpsseContext;

/// Times each level of a start/stop condition is driven, for setup and hold.
const CONDITION_HOLD: usize = 4;

fn push_state(cmd: &mut Vec<u8>, ctx: &MpsseContext, value: u8, times: usize) {
    for _ in 0..times {
        cmd.extend_from_slice(&ctx.set_bits_low(value));
    }
}

/// Start condition: SDA falls while SCL is high, then SCL goes low.
///
/// If the bus is already started, SDA and SCL are first returned to idle
/// with the clock low so the condition becomes a repeated start.
pub fn start_commands(ctx: &MpsseContext) -> Vec<u8> {
    let mut cmd = Vec::with_capacity(30);
    if ctx.is_started() {
        push_state(&mut cmd, ctx, ctx.pidle() & !pins::SK, 1);
        push_state(&mut cmd, ctx, ctx.pidle(), CONDITION_HOLD);
    }
    push_state(&mut cmd, ctx, ctx.pstart(), CONDITION_HOLD);
    push_state(&mut cmd, ctx, ctx.pstart() & !pins::SK, 1);
    cmd
}

/// Stop condition: SDA rises while SCL is high.
pub fn stop_commands(ctx: &MpsseContext) -> Vec<u8> {
    let mut cmd = Vec::with_capacity(40);
    // SDA goes low while SCL is low so no start condition is produced.
    push_state(&mut cmd, ctx, ctx.pidle() & !(pins::DO | pins::SK), CONDITION_HOLD);
    push_state(&mut cmd, ctx, ctx.pstop(), CONDITION_HOLD);
    push_state(&mut cmd, ctx, ctx.pidle(), CONDITION_HOLD);
    cmd
}

/// Clock out one byte and sample the slave's acknowledge bit.
///
/// The device answers with one byte whose bit 0 is the ACK bit.
pub fn write_byte_commands(ctx: &MpsseContext, byte: u8) -> Vec<u8> {
    let data_low = ctx.pstart() & !pins::SK;
    let mut cmd = Vec::with_capacity(14);

    // Drive SDA
    cmd.extend_from_slice(&[mpsse::SET_BITS_LOW, data_low, ctx.tris()]);
    cmd.extend_from_slice(&[ctx.tx() | mpsse::BITMODE, 7, byte]);

    // Release SDA for the ACK bit
    cmd.extend_from_slice(&[mpsse::SET_BITS_LOW, data_low, ctx.tris() & !pins::DO]);
    cmd.extend_from_slice(&[ctx.rx() | mpsse::BITMODE, 0]);

    cmd.push(mpsse::SEND_IMMEDIATE);
    cmd
}

/// Clock in `count` bytes, each followed by the configured ACK bit.
///
/// The device answers with `count` bytes.
pub fn read_commands(ctx: &MpsseContext, count: usize) -> Vec<u8> {
    let data_low = ctx.pstart() & !pins::SK;
    let mut cmd = Vec::with_capacity(count * 11 + 1);
    for _ in 0..count {
        // Release SDA while the slave drives it
        cmd.extend_from_slice(&[mpsse::SET_BITS_LOW, data_low, ctx.tris() & !pins::DO]);
        cmd.extend_from_slice(&[ctx.rx() | mpsse::BITMODE, 7]);

        // Drive the ACK/NACK bit
        cmd.extend_from_slice(&[mpsse::SET_BITS_LOW, data_low, ctx.tris()]);
        cmd.extend_from_slice(&[ctx.tx() | mpsse::BITMODE, 0, ctx.tack_pattern()]);
    }
    cmd.push(mpsse::SEND_IMMEDIATE);
    cmd
}

/// Write `data` one byte at a time, stopping at the first NACK.
///
/// The ACK bit of the last byte sent is latched in the context.
pub fn write(ctx: &mut MpsseContext, dev: &mut FtdiDevice, data: &[u8]) -> Result<()> {
    for (i, &byte) in data.iter().enumerate() {
        dev.write_all(&write_byte_commands(ctx, byte))?;
        let response = dev.read_exact(1)?;
        let ack = response.first().copied().ok_or(Error::DeviceUnavailable)? & 0x01;
        ctx.set_rack(ack);
        if ack != crate::constants::ACK {
            log::trace!("NACK after byte {} of {}", i + 1, data.len());
            break;
        }
    }
    Ok(())
}

/// Read `size` bytes, sending the configured ACK bit after each.
pub fn read(ctx: &MpsseContext, dev: &mut FtdiDevice, size: usize) -> Result<Vec<u8>> {
    if size == 0 {
        return Ok(Vec::new());
    }
    dev.write_all(&read_commands(ctx, size))?;
    dev.read_exact(size)
}
